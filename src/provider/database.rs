use chrono::NaiveDate;

use crate::{
    configuration::Config,
    dao::{PoolOption, PoolType},
    error::Error,
    handler::reminder::ReminderStore,
    model::{Appointment, Notification_Log, Settings, Subscription, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub subscription: Table<Subscription>,
    pub appointment: Table<Appointment>,
    pub notification_log: Table<Notification_Log>,
    pub settings: Table<Settings>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            subscription: Table::new(pool.clone()),
            appointment: Table::new(pool.clone()),
            notification_log: Table::new(pool.clone()),
            settings: Table::new(pool.clone()),
            pool,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

impl ReminderStore for DatabasePool {
    async fn scheduled_times(&self) -> Result<Vec<String>, Error> {
        Ok(self.settings.get_scheduled_times().await?)
    }

    async fn is_completed(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<bool, Error> {
        Ok(self.appointment.exists_on(date, time).await?)
    }

    async fn claim(&self, date: NaiveDate, time: &str) -> Result<bool, Error> {
        Ok(self.notification_log.claim(date, time).await?)
    }

    async fn release(&self, date: NaiveDate, time: &str) -> Result<(), Error> {
        Ok(self.notification_log.release(date, time).await?)
    }
}
