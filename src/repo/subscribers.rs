use chrono::Utc;

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::model::{Recipient, Subscriber};

/// Repository for the `subscribers` table.
///
/// The table carries a unique index on `email`; every mutation below is a
/// single statement, so concurrent requests for the same address cannot
/// produce duplicate rows.
pub struct SubscriberRepo;

impl SubscriberRepo {
    #[tracing::instrument(name = "Fetch a subscriber by email", skip(executor))]
    pub async fn find_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<Subscriber>> {
        sqlx::query_as::<_, Subscriber>(
            "select id, email, subscribed_at, confirmed_at, unsubscribed_at \
             from subscribers where email = $1",
        )
        .bind(email.as_ref())
        .fetch_optional(executor)
        .await
    }

    /// Insert an unconfirmed record unless one already exists
    #[tracing::instrument(name = "Insert a pending subscriber", skip(executor))]
    pub async fn insert_pending<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "insert into subscribers (id, email, subscribed_at) values ($1, $2, $3) \
             on conflict (email) do nothing",
        )
        .bind(Uuid::new_v4())
        .bind(email.as_ref())
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Upsert-confirm: sets `confirmed_at` and clears `unsubscribed_at`, so
    /// a valid confirmation always lands in the subscribed state regardless
    /// of prior history
    #[tracing::instrument(name = "Confirm a subscriber", skip(executor))]
    pub async fn confirm<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "insert into subscribers (id, email, subscribed_at, confirmed_at) \
             values ($1, $2, $3, $3) \
             on conflict (email) do update \
             set confirmed_at = excluded.confirmed_at, unsubscribed_at = null",
        )
        .bind(Uuid::new_v4())
        .bind(email.as_ref())
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Mark a subscriber as unsubscribed. Returns whether a row changed;
    /// repeated calls and unknown addresses are no-ops.
    #[tracing::instrument(name = "Unsubscribe a subscriber", skip(executor))]
    pub async fn unsubscribe<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update subscribers set unsubscribed_at = $2 \
             where email = $1 and unsubscribed_at is null",
        )
        .bind(email.as_ref())
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Fetch all deliverable recipients", skip(executor))]
    pub async fn fetch_all_active<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            "select id, email from subscribers \
             where confirmed_at is not null and unsubscribed_at is null",
        )
        .fetch_all(executor)
        .await
    }
}
