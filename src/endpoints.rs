//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/records/{record_id}', use [format_endpoint].

/// The root route which shows the guest page or redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page listing all of a user's expense records.
pub const HISTORY_VIEW: &str = "/history";
/// The page for managing push notifications.
pub const NOTIFICATIONS_VIEW: &str = "/notifications";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";
/// The web app manifest for installing the app as a PWA.
pub const MANIFEST: &str = "/manifest.webmanifest";

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route to create expense records.
pub const RECORDS_API: &str = "/api/records";
/// The route to delete a single expense record.
pub const DELETE_RECORD: &str = "/api/records/{record_id}";
/// The route to ask the AI for a category for a description.
pub const SUGGEST_CATEGORY: &str = "/api/records/suggest_category";
/// The route to get the daily spending chart data as JSON.
pub const DAILY_CHART_API: &str = "/api/chart/daily";
/// The route to get AI insights about the user's spending.
pub const INSIGHTS_API: &str = "/api/insights";
/// The route to ask the AI a question about the user's spending.
pub const INSIGHTS_ANSWER_API: &str = "/api/insights/answer";
/// The route to save a push subscription.
pub const PUSH_SUBSCRIBE: &str = "/api/push/subscribe";
/// The route to delete the user's push subscriptions.
pub const PUSH_UNSUBSCRIBE: &str = "/api/push/unsubscribe";
/// The route to send a test notification.
pub const PUSH_TEST: &str = "/api/push/test";
/// The route to send a summary of the last week's spending.
pub const PUSH_WEEKLY_SUMMARY: &str = "/api/push/weekly_summary";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/records/{record_id}', '{record_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, it is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
