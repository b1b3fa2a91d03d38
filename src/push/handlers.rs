//! JSON endpoints used by the client script to manage push notifications.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, FormRejection};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::UserID,
    push::{
        NotificationData, PushRelay, PushSubscription, SubscriptionRequest,
        delete_subscriptions, dispatch_notification, get_subscription, save_subscription,
    },
    record::get_spending_since,
    timezone::{get_local_offset, local_today},
};

/// The state needed to save subscriptions and send notifications.
#[derive(Clone)]
pub struct PushState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub push_relay: Arc<dyn PushRelay>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for PushState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            push_relay: state.push_relay.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The body of every push endpoint response.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PushResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl PushResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            kind: None,
        }
    }

    fn sent(kind: &str) -> Self {
        Self {
            success: true,
            error: None,
            kind: Some(kind.to_owned()),
        }
    }

    fn failed(status: StatusCode, message: &str) -> Response {
        let body = Self {
            success: false,
            error: Some(message.to_owned()),
            kind: None,
        };

        (status, Json(body)).into_response()
    }
}

fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

/// Save the browser's push subscription for the current user.
pub async fn subscribe_user(
    State(state): State<PushState>,
    Extension(user_id): Extension<UserID>,
    Json(subscription): Json<SubscriptionRequest>,
) -> Response {
    if [
        &subscription.endpoint,
        &subscription.keys.p256dh,
        &subscription.keys.auth,
    ]
    .iter()
    .any(|value| value.trim().is_empty())
    {
        tracing::warn!("User {user_id} sent an incomplete push subscription");
        return PushResult::failed(StatusCode::BAD_REQUEST, "Invalid push subscription");
    }

    let result = lock_connection(&state.db_connection)
        .and_then(|connection| save_subscription(user_id, &subscription, &connection));

    match result {
        Ok(_) => {
            tracing::info!("User {user_id} subscribed to push notifications");
            Json(PushResult::ok()).into_response()
        }
        Err(error) => {
            tracing::error!("Could not save push subscription for user {user_id}: {error}");
            PushResult::failed(StatusCode::INTERNAL_SERVER_ERROR, "Failed to subscribe user")
        }
    }
}

/// Remove all of the current user's push subscriptions.
pub async fn unsubscribe_user(
    State(state): State<PushState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| delete_subscriptions(user_id, &connection));

    match result {
        Ok(count) => {
            tracing::info!("User {user_id} unsubscribed {count} push subscriptions");
            Json(PushResult::ok()).into_response()
        }
        Err(error) => {
            tracing::error!("Could not delete push subscriptions for user {user_id}: {error}");
            PushResult::failed(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to unsubscribe user",
            )
        }
    }
}

/// Form data for sending a test notification.
#[derive(Debug, Default, Deserialize)]
pub struct TestNotificationForm {
    pub message: Option<String>,
}

/// Send a test notification to the current user.
///
/// The form is optional, a request without one sends the default message.
pub async fn send_test_notification(
    State(state): State<PushState>,
    Extension(user_id): Extension<UserID>,
    form: Result<Form<TestNotificationForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();

    let subscription = match lock_connection(&state.db_connection)
        .and_then(|connection| get_subscription(user_id, &connection))
    {
        Ok(subscription) => subscription,
        Err(error) => return dispatch_failed(user_id, error),
    };

    send(
        &state,
        user_id,
        subscription,
        NotificationData::test(form.message.as_deref()),
    )
    .await
}

/// Send the current user a summary of their spending over the last seven days.
pub async fn send_weekly_summary(
    State(state): State<PushState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return dispatch_failed(
            user_id,
            Error::InvalidTimezoneError(state.local_timezone.clone()),
        );
    };
    let week_start = local_today(local_offset) - Duration::days(6);

    let lookup = lock_connection(&state.db_connection).and_then(|connection| {
        let spending = get_spending_since(user_id, week_start, &connection)?;
        let subscription = get_subscription(user_id, &connection)?;
        Ok((spending, subscription))
    });

    let ((total_spent, record_count), subscription) = match lookup {
        Ok(lookup) => lookup,
        Err(error) => return dispatch_failed(user_id, error),
    };

    send(
        &state,
        user_id,
        subscription,
        NotificationData::weekly_summary(total_spent, record_count),
    )
    .await
}

async fn send(
    state: &PushState,
    user_id: UserID,
    subscription: Option<PushSubscription>,
    data: NotificationData,
) -> Response {
    let kind = data.kind;

    match dispatch_notification(state.push_relay.as_ref(), subscription, data).await {
        Ok(()) => Json(PushResult::sent(kind.as_str())).into_response(),
        Err(error) => dispatch_failed(user_id, error),
    }
}

fn dispatch_failed(user_id: UserID, error: Error) -> Response {
    tracing::error!("Could not send notification to user {user_id}: {error}");

    match error {
        Error::MissingPushSubscription => PushResult::failed(
            StatusCode::NOT_FOUND,
            "No subscription available for user",
        ),
        Error::InvalidPushSubscription(_) => {
            PushResult::failed(StatusCode::BAD_REQUEST, "Invalid push subscription")
        }
        _ => PushResult::failed(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send notification",
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router,
        http::StatusCode,
        routing::post,
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{NewUser, PasswordHash, UserID, create_user},
        db::initialize,
        endpoints,
        push::{
            get_subscription, save_subscription,
            subscription::test_support::subscription_request, test_relay::StubRelay,
        },
        record::{Category, NewRecord, create_record},
    };

    use super::{
        PushResult, PushState, send_test_notification, send_weekly_summary, subscribe_user,
        unsubscribe_user,
    };

    struct Fixture {
        server: TestServer,
        connection: Arc<Mutex<Connection>>,
        relay: Arc<StubRelay>,
        user_id: UserID,
    }

    fn fixture(relay: StubRelay) -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user_id = create_user(
            NewUser {
                name: "Test".to_owned(),
                email: "test@example.com".to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            &conn,
        )
        .unwrap()
        .id;

        let connection = Arc::new(Mutex::new(conn));
        let relay = Arc::new(relay);
        let state = PushState {
            db_connection: connection.clone(),
            push_relay: relay.clone(),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let app = Router::new()
            .route(endpoints::PUSH_SUBSCRIBE, post(subscribe_user))
            .route(endpoints::PUSH_UNSUBSCRIBE, post(unsubscribe_user))
            .route(endpoints::PUSH_TEST, post(send_test_notification))
            .route(endpoints::PUSH_WEEKLY_SUMMARY, post(send_weekly_summary))
            .layer(Extension(user_id))
            .with_state(state);

        Fixture {
            server: TestServer::try_new(app).expect("Could not create test server."),
            connection,
            relay,
            user_id,
        }
    }

    fn subscribe(fixture: &Fixture) {
        let connection = fixture.connection.lock().unwrap();
        save_subscription(
            fixture.user_id,
            &subscription_request("https://push.example.com/abc"),
            &connection,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn subscribe_saves_subscription() {
        let fixture = fixture(StubRelay::default());

        let response = fixture
            .server
            .post(endpoints::PUSH_SUBSCRIBE)
            .json(&json!({
                "endpoint": "https://push.example.com/abc",
                "keys": {"p256dh": "key", "auth": "secret"}
            }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({"success": true}));
        let connection = fixture.connection.lock().unwrap();
        let saved = get_subscription(fixture.user_id, &connection).unwrap().unwrap();
        assert_eq!(saved.endpoint, "https://push.example.com/abc");
    }

    #[tokio::test]
    async fn subscribe_rejects_blank_keys() {
        let fixture = fixture(StubRelay::default());

        let response = fixture
            .server
            .post(endpoints::PUSH_SUBSCRIBE)
            .json(&json!({
                "endpoint": "https://push.example.com/abc",
                "keys": {"p256dh": "", "auth": "secret"}
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: PushResult = response.json();
        assert!(!body.success);
    }

    #[tokio::test]
    async fn unsubscribe_deletes_subscriptions() {
        let fixture = fixture(StubRelay::default());
        subscribe(&fixture);

        let response = fixture.server.post(endpoints::PUSH_UNSUBSCRIBE).await;

        response.assert_status_ok();
        let connection = fixture.connection.lock().unwrap();
        assert_eq!(get_subscription(fixture.user_id, &connection), Ok(None));
    }

    #[tokio::test]
    async fn test_notification_without_subscription_fails() {
        let fixture = fixture(StubRelay::default());

        let response = fixture.server.post(endpoints::PUSH_TEST).await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({
            "success": false,
            "error": "No subscription available for user"
        }));
        assert!(fixture.relay.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notification_is_sent() {
        let fixture = fixture(StubRelay::default());
        subscribe(&fixture);

        let response = fixture
            .server
            .post(endpoints::PUSH_TEST)
            .form(&[("message", "Hello there")])
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({"success": true, "type": "test"}));
        let sent = fixture.relay.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Hello there"));
    }

    #[tokio::test]
    async fn relay_failure_gives_generic_error() {
        let fixture = fixture(StubRelay::failing());
        subscribe(&fixture);

        let response = fixture.server.post(endpoints::PUSH_TEST).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({
            "success": false,
            "error": "Failed to send notification"
        }));
    }

    #[tokio::test]
    async fn weekly_summary_totals_last_seven_days() {
        let fixture = fixture(StubRelay::default());
        subscribe(&fixture);
        {
            let connection = fixture.connection.lock().unwrap();
            let today = OffsetDateTime::now_utc().date();
            for (amount, date) in [
                (10.0, today),
                (5.5, today - Duration::days(6)),
                (100.0, today - Duration::days(7)),
            ] {
                create_record(
                    NewRecord {
                        user_id: fixture.user_id,
                        text: "Thing".to_owned(),
                        amount,
                        category: Category::Other,
                        date,
                    },
                    &connection,
                )
                .unwrap();
            }
        }

        let response = fixture.server.post(endpoints::PUSH_WEEKLY_SUMMARY).await;

        response.assert_status_ok();
        response.assert_json(&json!({"success": true, "type": "weekly-summary"}));
        let sent = fixture.relay.sent();
        let payload: serde_json::Value = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(payload["body"], "You spent $15.50 this week across 2 expenses");
    }
}
