use clap::Parser;
use tracing::{error, Level};

use spray_reminder::{
    cli::{self, Cli, Commands},
    configuration::{AppState, State},
    error::Error,
    provider::{DatabasePool, HTTP},
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let args = Cli::parse();

    match args.command {
        None | Some(Commands::Serve) => serve().await,
        Some(Commands::Migrate) => cli::run_migrate().await,
        Some(Commands::Remind { time, date }) => {
            cli::run_remind(time, date).await
        },
    }
}

async fn serve() -> Result<(), Error> {
    let config = match cli::init_config() {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let database = DatabasePool::new(&config).await?;
    let http = HTTP::new(config.clone())?;

    let state = State::new(config, database, http).await?;
    let app_state = AppState::new(state);

    tracing::info!(
        "Listening on {}:{}",
        app_state.config.server_host,
        app_state.config.port
    );

    let result = tokio::select! {
        result = server::server_task(&app_state) => result,
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            signal.map_err(Error::from)
        },
    };

    app_state.database.close().await;

    result
}
