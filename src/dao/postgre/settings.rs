use sqlx::Error;

use crate::model::{Settings, Table};

impl Table<Settings> {
    pub async fn get_one(&self, id: &str) -> Result<Option<Settings>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "settings"
        WHERE "id" = $1
        "#;

        sqlx::query_as(SQL).bind(id).fetch_optional(&self.pool).await
    }

    /// Scheduled reminder times, or the defaults when no settings row exists.
    pub async fn get_scheduled_times(&self) -> Result<Vec<String>, Error> {
        let times = match self.get_one(Settings::CAT_SPRAY).await? {
            Some(settings) if !settings.scheduled_times.is_empty() => {
                settings.scheduled_times
            },
            _ => Settings::default_scheduled_times(),
        };

        Ok(times)
    }
}
