//! The notifications the app sends and the JSON payload the service worker receives.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::endpoints;

const DEFAULT_BADGE: &str = "/static/icons/badge-72x72.png";
const DEFAULT_URL: &str = "/";
const DEFAULT_TAG: &str = "expense-tracker";
/// The body of a test notification when the user does not supply one.
pub const DEFAULT_TEST_MESSAGE: &str = "Test notification from Expense Tracker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    ExpenseAlert,
    WeeklySummary,
    Test,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ExpenseAlert => "expense-alert",
            NotificationType::WeeklySummary => "weekly-summary",
            NotificationType::Test => "test",
        }
    }
}

/// A button shown on the notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_owned(),
            title: title.to_owned(),
            icon: None,
        }
    }
}

/// A notification before defaults are applied.
///
/// Fields left as `None` are filled in by [NotificationData::into_payload].
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationData {
    pub title: String,
    pub body: String,
    pub kind: NotificationType,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub require_interaction: bool,
    pub silent: bool,
    pub tag: Option<String>,
    pub renotify: Option<bool>,
    pub actions: Vec<NotificationAction>,
    pub custom_data: Map<String, Value>,
}

/// The JSON message delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub icon: String,
    pub badge: String,
    pub url: String,
    pub require_interaction: bool,
    pub silent: bool,
    pub tag: String,
    pub renotify: bool,
    pub actions: Vec<NotificationAction>,
    pub custom_data: Map<String, Value>,
}

impl NotificationData {
    fn new(title: &str, body: String, kind: NotificationType) -> Self {
        Self {
            title: title.to_owned(),
            body,
            kind,
            url: None,
            icon: None,
            badge: None,
            require_interaction: false,
            silent: false,
            tag: None,
            renotify: None,
            actions: Vec::new(),
            custom_data: Map::new(),
        }
    }

    /// Sent after the user logs an expense.
    pub fn expense_alert(amount: f64, category: &str) -> Self {
        let mut data = Self::new(
            "Expense Alert",
            format!("You spent ${amount:.2} on {category}"),
            NotificationType::ExpenseAlert,
        );
        data.url = Some(endpoints::HISTORY_VIEW.to_owned());
        data.actions = vec![NotificationAction::new("view-expense", "View Details")];
        data.custom_data = into_map(json!({ "amount": amount, "category": category }));

        data
    }

    /// Sent on request with the spending of the last seven days.
    pub fn weekly_summary(total_spent: f64, record_count: u32) -> Self {
        let expenses = if record_count == 1 { "expense" } else { "expenses" };
        let mut data = Self::new(
            "Weekly Summary",
            format!("You spent ${total_spent:.2} this week across {record_count} {expenses}"),
            NotificationType::WeeklySummary,
        );
        data.url = Some(endpoints::DASHBOARD_VIEW.to_owned());
        data.actions = vec![NotificationAction::new("view-dashboard", "View Dashboard")];
        data.custom_data = into_map(json!({
            "totalSpent": total_spent,
            "recordCount": record_count,
        }));

        data
    }

    pub fn test(message: Option<&str>) -> Self {
        let message = message
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_TEST_MESSAGE);
        let mut data = Self::new("Test Notification", message.to_owned(), NotificationType::Test);
        data.url = Some(DEFAULT_URL.to_owned());
        data.custom_data = into_map(json!({ "test": true }));

        data
    }

    /// Fill in the defaults for any optional fields.
    pub fn into_payload(self) -> NotificationPayload {
        NotificationPayload {
            icon: self
                .icon
                .unwrap_or_else(|| format!("/static/icons/{}-192x192.png", self.kind.as_str())),
            badge: self.badge.unwrap_or_else(|| DEFAULT_BADGE.to_owned()),
            url: self.url.unwrap_or_else(|| DEFAULT_URL.to_owned()),
            tag: self.tag.unwrap_or_else(|| DEFAULT_TAG.to_owned()),
            renotify: self.renotify.unwrap_or(true),
            title: self.title,
            body: self.body,
            kind: self.kind,
            require_interaction: self.require_interaction,
            silent: self.silent,
            actions: self.actions,
            custom_data: self.custom_data,
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
