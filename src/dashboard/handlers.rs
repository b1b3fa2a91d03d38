//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::{User, UserID, get_user_by_id},
    chart::{DashboardChart, charts_script, charts_view, daily_spending_dashboard_chart},
    dashboard::cards::summary_cards_view,
    endpoints,
    html::{CARD_STYLE, HeadElement, base, dollar_input_styles, link},
    insights::insights_panel,
    navigation::NavBar,
    record::{RecordSummary, add_record_form, get_chart_records, get_record_summary},
    timezone::{get_local_offset, local_today},
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the user's records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    user: User,
    summary: RecordSummary,
    chart: DashboardChart,
    today: Date,
}

/// Display a page with an overview of the user's spending.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let data = build_dashboard_data(user_id, local_today(local_offset), &connection)?;

    Ok(dashboard_view(&data).into_response())
}

fn build_dashboard_data(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<DashboardData, Error> {
    let user = get_user_by_id(user_id, connection)
        .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?;

    let summary = get_record_summary(user_id, connection)
        .inspect_err(|error| tracing::error!("could not get record summary: {error}"))?;

    let chart_records = get_chart_records(user_id, connection)
        .inspect_err(|error| tracing::error!("could not get chart records: {error}"))?;

    Ok(DashboardData {
        user,
        summary,
        chart: daily_spending_dashboard_chart(&chart_records),
        today,
    })
}

fn greeting(user: &User) -> Markup {
    html! {
        div class="w-full flex items-center gap-4"
        {
            img
                src=(user.image_url())
                alt={ (user.name) "'s avatar" }
                class="w-12 h-12 rounded-full";

            div
            {
                h1 class="text-2xl font-bold" { "Welcome back, " (user.name) "!" }
                p class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "Member since " (user.created_at.date())
                }
            }
        }
    }
}

fn dashboard_view(data: &DashboardData) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let charts = std::slice::from_ref(&data.chart);

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center gap-6 px-2 lg:px-6 py-4 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (greeting(&data.user))

            (summary_cards_view(&data.summary))

            div class="w-full grid grid-cols-1 lg:grid-cols-3 gap-6"
            {
                section class={ (CARD_STYLE) " lg:col-span-1" }
                {
                    h2 class="text-lg font-semibold mb-4" { "Add Expense" }
                    (add_record_form(data.today))
                }

                div class="lg:col-span-2 space-y-6"
                {
                    @if data.summary.record_count == 0 {
                        div class={ (CARD_STYLE) " text-center" }
                        {
                            h2 class="text-xl font-bold" { "Nothing here yet..." }
                            p { "Your daily spending chart will show up here once you add an expense." }
                        }
                    } @else {
                        (charts_view(charts))
                    }

                    div class=(CARD_STYLE) { (insights_panel()) }

                    p class="text-sm"
                    {
                        "See your latest expenses in your " (link(endpoints::HISTORY_VIEW, "history")) "."
                    }
                }
            }
        }
    );

    let mut head_elements = vec![dollar_input_styles()];

    if data.summary.record_count > 0 {
        head_elements.push(HeadElement::ScriptLink(
            "/static/echarts.6.0.0.min.js".to_owned(),
        ));
        head_elements.push(charts_script(charts));
    }

    base("Dashboard", &head_elements, &content)
}
