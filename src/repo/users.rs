use secrecy::Secret;

use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};

use uuid::Uuid;

use crate::domain::EmailAddress;

#[derive(Debug)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password_hash: String,
}

#[derive(Debug)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: Secret<String>,
}

/// Repository for the `users` table backing the publish endpoint's auth
pub struct UsersRepo;

impl UsersRepo {
    #[tracing::instrument(name = "Insert a new user record", skip(executor, new_user))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_user: &NewUser,
    ) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query("insert into users (id, email, password_hash) values ($1, $2, $3)")
            .bind(id)
            .bind(new_user.email.as_ref())
            .bind(&new_user.password_hash)
            .execute(executor)
            .await?;

        Ok(id)
    }

    #[tracing::instrument(name = "Fetch user credentials by email", skip(executor))]
    pub async fn fetch_credentials_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<UserCredentials>> {
        sqlx::query("select id, password_hash from users where email = $1")
            .bind(email.as_ref())
            .map(|row: PgRow| UserCredentials {
                id: row.get("id"),
                password_hash: Secret::new(row.get("password_hash")),
            })
            .fetch_optional(executor)
            .await
    }
}
