use anyhow::Context;
use std::{env, fs, ops::Deref, path::Path, str::FromStr, sync::Arc};

use crate::{
    dao::get_path,
    error::Error,
    handler::send_push::Dispatcher,
    model::{Subscription, Table},
    provider::{DatabasePool, HTTP},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub database: DatabasePool,
    pub http: HTTP,
}

impl State {
    pub async fn new(
        config: Config,
        database: DatabasePool,
        http: HTTP,
    ) -> Result<State, Error> {
        Self::init_migrations(&database).await?;
        Ok(Self {
            config,
            database,
            http,
        })
    }

    pub fn dispatcher(&self) -> Dispatcher<'_, Table<Subscription>, HTTP> {
        Dispatcher::new(
            &self.database.subscription,
            &self.http,
            &self.config.status_code_to_delete,
            self.config.max_tasks,
        )
    }

    pub async fn init_migrations(database: &DatabasePool) -> Result<(), Error> {
        let files = vec![
            "subscription.sql",
            "appointment.sql",
            "notification_log.sql",
            "settings.sql",
        ];

        let dir = env!("CARGO_MANIFEST_DIR");

        for file in files {
            let data = fs::read_to_string(get_path(dir, file))?;
            sqlx::raw_sql(data.as_str()).execute(&database.pool).await?;
        }

        tracing::info!("Migrations applied");

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub static_dir: String,
    pub max_tasks: usize,
    pub timeout: u64,
    pub status_code_to_delete: Vec<u16>,
    pub mail_to: String,
    pub vapid_private_key: Vec<u8>,
    pub vapid_public_key: String,
    pub api_key: String,
    pub reminder_window_minutes: u32,
    pub push_ttl: i64,
}

fn parse_config_vapid_keys() -> Result<(Vec<u8>, String), Error> {
    let directory = env!("CARGO_MANIFEST_DIR");
    let private_key_dir = format!("{}/cert/vapid_private.pem", directory);
    let public_key_dir = format!("{}/cert/vapid_public.b64", directory);

    let private_key = fs::read(&private_key_dir).with_context(|| {
        format!("reading VAPID private key from {}", private_key_dir)
    })?;
    let public_key = fs::read_to_string(&public_key_dir)
        .with_context(|| {
            format!("reading VAPID public key from {}", public_key_dir)
        })?
        .trim()
        .to_owned();

    Ok((private_key, public_key))
}

fn var_or<T>(key: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    Error: From<T::Err>,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().parse()?),
        _ => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_status_codes(value: &str) -> Result<Vec<u16>, Error> {
    let mut codes = vec![];
    for code in split_list(value) {
        codes.push(code.parse::<u16>()?);
    }
    Ok(codes)
}

pub fn get_configuration() -> Result<Config, Error> {
    let database_url = env::var("DATABASE_URL")?;
    let max_connections: u32 = var_or("DB_MAX_CONNECTIONS", 10)?;
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = split_list(&env::var("ALLOWED_ORIGINS")?);
    let static_dir = format!(
        "{}/{}",
        env!("CARGO_MANIFEST_DIR"),
        env::var("STATIC_DIRECTORY")?
    );
    let max_tasks: usize = var_or("MAX_TASKS", 16)?;
    let timeout: u64 = var_or("TIMEOUT", 30)?;
    let status_code_to_delete = parse_status_codes(
        &env::var("STATUS_CODE_TO_DELETE")
            .unwrap_or_else(|_| String::from("404,410")),
    )?;
    let mail_to = env::var("MAIL_TO")?;
    let api_key = env::var("REMINDER_API_KEY")?;
    let reminder_window_minutes: u32 = var_or("REMINDER_WINDOW_MINUTES", 5)?;
    let push_ttl: i64 = var_or("PUSH_TTL", 24 * 60 * 60)?;

    if api_key.is_empty() {
        return Err(Error::ConfigurationError(String::from(
            "REMINDER_API_KEY must not be empty",
        )));
    }

    if max_tasks == 0 {
        return Err(Error::InvalidOption {
            option: String::from("MAX_TASKS must be greater than 0"),
        });
    }

    let (vapid_private_key, vapid_public_key) = parse_config_vapid_keys()?;

    let config = Config {
        database_url,
        max_connections,
        server_host,
        port,
        allowed_origins,
        static_dir,
        max_tasks,
        timeout,
        status_code_to_delete,
        mail_to,
        vapid_private_key,
        vapid_public_key,
        api_key,
        reminder_window_minutes,
        push_ttl,
    };

    Ok(config)
}

/// Loads `.env` from the crate directory into the process environment.
/// Variables already exported by the caller win over the file.
pub fn set_configuration() -> Result<(), Error> {
    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, ".env");

    if !Path::new(&path).exists() {
        tracing::info!("No .env file at {}, using process environment", path);
        return Ok(());
    }

    let config_string = fs::read_to_string(path)?;
    for (key, value) in parse_config_string(&config_string) {
        if env::var(&key).is_err() {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| {
            let value = v.trim().trim_matches('"');
            (k.trim().to_owned(), value.to_owned())
        })
        .collect()
}
