use chrono::NaiveDate;
use sqlx::Error;

use crate::model::{Appointment, Table};

impl Table<Appointment> {
    /// Whether the slot `time` on `date` has been logged as done.
    pub async fn exists_on(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<bool, Error> {
        const SQL: &str = r#"
        SELECT EXISTS(
            SELECT 1
            FROM "appointment"
            WHERE "date" = $1 AND "time" = $2
        )
        "#;

        let (exists,): (bool,) = sqlx::query_as(SQL)
            .bind(date)
            .bind(time)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
