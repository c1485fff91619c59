use chrono::NaiveDate;
use sqlx::Error;

use crate::model::{Notification_Log, Table};

impl Table<Notification_Log> {
    /// Inserts the log row unless it exists. True when this call created it.
    pub async fn claim(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<bool, Error> {
        const SQL: &str = r#"
        INSERT INTO "notification_log" (
            "appointment_date",
            "appointment_time"
        )
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING "appointment_date"
        "#;

        let row: Option<(NaiveDate,)> = sqlx::query_as(SQL)
            .bind(date)
            .bind(time)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn release(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<(), Error> {
        const SQL: &str = r#"
        DELETE FROM "notification_log"
        WHERE "appointment_date" = $1 AND "appointment_time" = $2
        "#;

        sqlx::query(SQL)
            .bind(date)
            .bind(time)
            .execute(&self.pool)
            .await
            .map(drop)
    }
}
