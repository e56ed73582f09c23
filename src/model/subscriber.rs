use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

/// Stored subscriber record
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    /// When the address was first submitted
    pub subscribed_at: DateTime<Utc>,
    /// `None` until a confirmation link is used
    pub confirmed_at: Option<DateTime<Utc>>,
    /// `None` while the subscriber is actively subscribed; set by either
    /// unsubscribe path and cleared again when a confirmation link is used
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    pub fn is_subscribed(&self) -> bool {
        self.unsubscribed_at.is_none()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// Projection used when delivering an issue
#[derive(Debug, sqlx::FromRow)]
pub struct Recipient {
    pub id: Uuid,
    pub email: String,
}
