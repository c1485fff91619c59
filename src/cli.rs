//! Command-line interface
//!
//! `serve` runs the HTTP server. `migrate` and `remind` are one-shot
//! maintenance commands; `remind` is what an external cron calls.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::{
    configuration::{get_configuration, set_configuration, Config, State},
    error::Error,
    handler::reminder::ReminderTrigger,
    provider::{DatabasePool, HTTP},
};

/// Cat spray reminder push service
#[derive(Parser)]
#[command(name = "spray-reminder")]
#[command(about = "Push notifications for the cat spray schedule", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default if no command specified)
    Serve,

    /// Create the database tables
    Migrate,

    /// Evaluate the scheduled times once and send due reminders
    Remind {
        /// Remind for this HH:MM slot now, ignoring the time window
        #[arg(long)]
        time: Option<String>,

        /// Date of the slot given with --time, defaults to today
        #[arg(long, requires = "time")]
        date: Option<NaiveDate>,
    },
}

pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

pub async fn run_migrate() -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;

    State::init_migrations(&database).await?;
    database.close().await;

    Ok(())
}

pub async fn run_remind(
    time: Option<String>,
    date: Option<NaiveDate>,
) -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;
    let http = HTTP::new(config.clone())?;
    let state = State::new(config, database, http).await?;

    let trigger = ReminderTrigger::new(
        &state.database,
        state.dispatcher(),
        state.config.reminder_window_minutes,
    );
    let now = Local::now().naive_local();

    let report = match time {
        Some(time) => {
            trigger.run_for(date.unwrap_or(now.date()), &time).await?
        },
        None => trigger.run(now).await?,
    };

    for detail in &report.details {
        tracing::info!("{} {:?}: {:?}", detail.time, detail.date, detail.status);
    }

    state.database.close().await;

    Ok(())
}
