//! Defines the endpoint for logging a new expense record.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    push::{NotificationData, PushRelay, dispatch_notification, get_subscription},
    record::{Category, NewRecord, create_record},
    timezone::{get_local_offset, local_today},
};

/// The state needed to create a record and notify the user about it.
#[derive(Clone)]
pub struct CreateRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub push_relay: Arc<dyn PushRelay>,
}

impl FromRef<AppState> for CreateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            push_relay: state.push_relay.clone(),
        }
    }
}

/// The form data for creating a record.
///
/// Every field is optional so that a missing field gives a helpful alert
/// rather than a generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RecordForm {
    /// What the money was spent on.
    pub text: Option<String>,
    /// The amount in dollars, as typed by the user.
    pub amount: Option<String>,
    /// The category name, matched ignoring case.
    pub category: Option<String>,
    /// The date in the format YYYY-MM-DD.
    pub date: Option<String>,
}

fn required(field: &Option<String>) -> Result<&str, Error> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingRecordFields)
}

/// Validate `form` into a record for `user_id`.
///
/// `today` is the current date in the server's timezone, later dates are rejected.
///
/// # Errors
/// Returns:
/// - [Error::MissingRecordFields] if any field is missing or blank,
/// - [Error::InvalidAmount] if the amount is not a finite, non-negative number,
/// - [Error::InvalidCategory] if the category is unknown,
/// - [Error::InvalidDate] if the date cannot be parsed,
/// - [Error::FutureDate] if the date is after `today`.
pub fn parse_record_form(form: &RecordForm, user_id: UserID, today: Date) -> Result<NewRecord, Error> {
    let text = required(&form.text)?;
    let raw_amount = required(&form.amount)?;
    let raw_category = required(&form.category)?;
    let raw_date = required(&form.date)?;

    let amount = raw_amount
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or_else(|| Error::InvalidAmount(raw_amount.to_owned()))?;

    let category: Category = raw_category.parse()?;

    let date = Date::parse(raw_date, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDate(raw_date.to_owned()))?;

    if date > today {
        return Err(Error::FutureDate(date));
    }

    Ok(NewRecord {
        user_id,
        text: text.to_owned(),
        amount,
        category,
        date,
    })
}

/// A route handler for logging an expense, redirects to the dashboard on success.
///
/// If the user has a push subscription, they are sent an expense alert.
/// Failing to send the alert does not fail the request.
pub async fn create_record_endpoint(
    State(state): State<CreateRecordState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<RecordForm>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let new_record = match parse_record_form(&form, user_id, local_today(local_offset)) {
        Ok(new_record) => new_record,
        Err(error) => {
            tracing::warn!("User {user_id} sent an invalid expense record: {error}");
            return error.into_alert_response();
        }
    };

    let (record, subscription) = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        let record = match create_record(new_record, &connection) {
            Ok(record) => record,
            Err(error) => {
                tracing::error!("could not create expense record: {error}");
                return error.into_alert_response();
            }
        };

        let subscription = get_subscription(user_id, &connection)
            .inspect_err(|error| {
                tracing::error!("could not get push subscription for user {user_id}: {error}")
            })
            .ok()
            .flatten();

        (record, subscription)
    };

    tracing::info!("User {user_id} logged expense record {}", record.id);

    if subscription.is_some() {
        let alert = NotificationData::expense_alert(record.amount, record.category.as_str());

        if let Err(error) =
            dispatch_notification(state.push_relay.as_ref(), subscription, alert).await
        {
            tracing::warn!("Could not send expense alert to user {user_id}: {error}");
        }
    }

    (
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod parse_tests {
    use time::macros::date;

    use crate::{Error, auth::UserID, record::Category};

    use super::{RecordForm, parse_record_form};

    const TODAY: time::Date = date!(2025 - 10 - 05);

    fn form(text: &str, amount: &str, category: &str, date: &str) -> RecordForm {
        RecordForm {
            text: Some(text.to_owned()),
            amount: Some(amount.to_owned()),
            category: Some(category.to_owned()),
            date: Some(date.to_owned()),
        }
    }

    #[test]
    fn parses_valid_form() {
        let record = parse_record_form(
            &form(" Lunch ", "12.50", "food", "2025-10-04"),
            UserID::new(1),
            TODAY,
        )
        .unwrap();

        assert_eq!(record.text, "Lunch");
        assert_eq!(record.amount, 12.5);
        assert_eq!(record.category, Category::Food);
        assert_eq!(record.date, date!(2025 - 10 - 04));
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let mut missing_text = form("Lunch", "1", "Food", "2025-10-04");
        missing_text.text = None;
        let blank_amount = form("Lunch", "  ", "Food", "2025-10-04");

        for form in [missing_text, blank_amount, RecordForm::default()] {
            assert_eq!(
                parse_record_form(&form, UserID::new(1), TODAY),
                Err(Error::MissingRecordFields)
            );
        }
    }

    #[test]
    fn rejects_bad_amounts() {
        for amount in ["abc", "-1", "NaN", "inf"] {
            assert_eq!(
                parse_record_form(&form("Lunch", amount, "Food", "2025-10-04"), UserID::new(1), TODAY),
                Err(Error::InvalidAmount(amount.to_owned())),
                "amount {amount:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_amount_is_allowed() {
        let record =
            parse_record_form(&form("Freebie", "0", "Other", "2025-10-04"), UserID::new(1), TODAY)
                .unwrap();

        assert_eq!(record.amount, 0.0);
    }

    #[test]
    fn rejects_unknown_category() {
        assert_eq!(
            parse_record_form(&form("Lunch", "1", "Snacks", "2025-10-04"), UserID::new(1), TODAY),
            Err(Error::InvalidCategory("Snacks".to_owned()))
        );
    }

    #[test]
    fn rejects_bad_and_future_dates() {
        assert_eq!(
            parse_record_form(&form("Lunch", "1", "Food", "04/10/2025"), UserID::new(1), TODAY),
            Err(Error::InvalidDate("04/10/2025".to_owned()))
        );
        assert_eq!(
            parse_record_form(&form("Lunch", "1", "Food", "2025-10-06"), UserID::new(1), TODAY),
            Err(Error::FutureDate(date!(2025 - 10 - 06)))
        );
    }
}
