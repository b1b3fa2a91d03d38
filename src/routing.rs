//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    chart::get_daily_chart,
    dashboard::get_dashboard_page,
    endpoints,
    home::get_home_page,
    insights::{get_insights, post_insight_answer, suggest_category},
    internal_server_error::get_internal_server_error_page,
    manifest::get_manifest,
    not_found::get_404_not_found,
    push::{
        get_notifications_page, send_test_notification, send_weekly_summary, subscribe_user,
        unsubscribe_user,
    },
    record::{create_record_endpoint, delete_record_endpoint, get_history_page},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_home_page))
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::MANIFEST, get(get_manifest))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::HISTORY_VIEW, get(get_history_page))
        .route(endpoints::NOTIFICATIONS_VIEW, get(get_notifications_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are requested by HTMX or the client script, so auth redirects use HX-REDIRECT.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::RECORDS_API, post(create_record_endpoint))
            .route(endpoints::DELETE_RECORD, delete(delete_record_endpoint))
            .route(endpoints::SUGGEST_CATEGORY, post(suggest_category))
            .route(endpoints::DAILY_CHART_API, get(get_daily_chart))
            .route(endpoints::INSIGHTS_API, get(get_insights))
            .route(endpoints::INSIGHTS_ANSWER_API, post(post_insight_answer))
            .route(endpoints::PUSH_SUBSCRIBE, post(subscribe_user))
            .route(endpoints::PUSH_UNSUBSCRIBE, post(unsubscribe_user))
            .route(endpoints::PUSH_TEST, post(send_test_notification))
            .route(endpoints::PUSH_WEEKLY_SUMMARY, post(send_weekly_summary))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}
