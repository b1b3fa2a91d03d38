//! Storage for the browser push subscriptions of each user.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{Error, auth::UserID, database_id::DatabaseId};

/// The keys the browser generates for encrypting push messages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A subscription as sent by the browser's `PushSubscription.toJSON()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// A saved push subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct PushSubscription {
    pub id: DatabaseId,
    pub user_id: UserID,
    /// The push service URL that messages are posted to.
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: OffsetDateTime,
}

impl PushSubscription {
    /// Whether the endpoint and both keys are present.
    pub fn is_complete(&self) -> bool {
        ![&self.endpoint, &self.p256dh, &self.auth]
            .iter()
            .any(|value| value.trim().is_empty())
    }
}

/// Create the push subscription table.
///
/// # Errors
/// Returns an error if the table cannot be created.
pub fn create_push_subscription_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS push_subscription (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                endpoint TEXT NOT NULL UNIQUE,
                p256dh TEXT NOT NULL,
                auth TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Save a subscription for `user_id`.
///
/// A browser re-subscribing with the same endpoint replaces the old keys and owner.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn save_subscription(
    user_id: UserID,
    subscription: &SubscriptionRequest,
    connection: &Connection,
) -> Result<PushSubscription, Error> {
    connection
        .prepare(
            "INSERT INTO push_subscription (user_id, endpoint, p256dh, auth, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(endpoint) DO UPDATE SET
                user_id = excluded.user_id,
                p256dh = excluded.p256dh,
                auth = excluded.auth,
                created_at = excluded.created_at
             RETURNING id, user_id, endpoint, p256dh, auth, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                &subscription.endpoint,
                &subscription.keys.p256dh,
                &subscription.keys.auth,
                OffsetDateTime::now_utc(),
            ),
            map_subscription_row,
        )
        .map_err(Error::from)
}

/// The most recently saved subscription for `user_id`, if any.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_subscription(
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<PushSubscription>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, endpoint, p256dh, auth, created_at FROM push_subscription
             WHERE user_id = :user_id
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_subscription_row)
        .optional()
        .map_err(Error::from)
}

/// Delete every subscription belonging to `user_id`, returning how many were removed.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn delete_subscriptions(user_id: UserID, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM push_subscription WHERE user_id = ?1",
            [user_id.as_i64()],
        )
        .map_err(Error::from)
}

fn map_subscription_row(row: &Row) -> Result<PushSubscription, rusqlite::Error> {
    Ok(PushSubscription {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        endpoint: row.get(2)?,
        p256dh: row.get(3)?,
        auth: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{SubscriptionKeys, SubscriptionRequest};

    pub(crate) fn subscription_request(endpoint: &str) -> SubscriptionRequest {
        SubscriptionRequest {
            endpoint: endpoint.to_owned(),
            keys: SubscriptionKeys {
                p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".to_owned(),
                auth: "tBHItJI5svbpez7KI4CCXg".to_owned(),
            },
        }
    }
}
