use crate::{
    error::Error,
    handler::send_push::SubscriptionStore,
    model::{Subscription, Table},
    types::SubscriptionFilter,
};

pub(crate) const UPSERT_SQL: &str = r#"
    INSERT INTO "subscription" (
        "endpoint",
        "p256dh",
        "auth",
        "user_id",
        "platform",
        "user_agent",
        "expiration"
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT ("endpoint") DO UPDATE SET
        "p256dh" = EXCLUDED."p256dh",
        "auth" = EXCLUDED."auth",
        "user_id" = EXCLUDED."user_id",
        "platform" = EXCLUDED."platform",
        "user_agent" = EXCLUDED."user_agent",
        "expiration" = EXCLUDED."expiration",
        "updated_at" = NOW()
"#;

pub(crate) const QUERY_SQL: &str = r#"
    SELECT *
    FROM "subscription"
    WHERE ($1::TEXT IS NULL OR "user_id" = $1)
    AND ($2::TEXT IS NULL OR "user_id" IS DISTINCT FROM $2)
"#;

impl SubscriptionStore for Table<Subscription> {
    async fn upsert(&self, subscription: Subscription) -> Result<(), Error> {
        sqlx::query(UPSERT_SQL)
            .bind(&subscription.endpoint)
            .bind(&subscription.p256dh)
            .bind(&subscription.auth)
            .bind(&subscription.user_id)
            .bind(&subscription.platform)
            .bind(&subscription.user_agent)
            .bind(subscription.expiration)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove(&self, endpoint: &str) -> Result<u64, Error> {
        const SQL: &str = r#"
        DELETE FROM "subscription"
        WHERE "endpoint" = $1
        "#;

        let result = sqlx::query(SQL).bind(endpoint).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    async fn query(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(QUERY_SQL)
            .bind(&filter.user_id)
            .bind(&filter.exclude_user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(data)
    }
}
