//! The JSON endpoint for the daily spending series and the chart built from it.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    chart::{
        DashboardChart, LabelWidth, RawRecord, aggregate_by_date, chart_points,
        daily_spending_chart,
    },
    record::get_chart_records,
};

/// The state needed to read a user's records for charting.
#[derive(Debug, Clone)]
pub struct ChartState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChartState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Query parameters for [get_daily_chart].
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    /// How much room the labels have, defaults to compact.
    #[serde(default)]
    pub width: LabelWidth,
}

/// Build the dashboard's daily spending chart from unvalidated records.
pub fn daily_spending_dashboard_chart(records: &[RawRecord]) -> DashboardChart {
    let buckets = aggregate_by_date(records);

    DashboardChart {
        id: "daily-spending-chart",
        compact_options: daily_spending_chart(&chart_points(&buckets, LabelWidth::Compact))
            .to_string(),
        wide_options: daily_spending_chart(&chart_points(&buckets, LabelWidth::Wide)).to_string(),
    }
}

/// Get the current user's spending per day, oldest first.
pub async fn get_daily_chart(
    State(state): State<ChartState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ChartQuery>,
) -> Response {
    let records = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
        .and_then(|connection| get_chart_records(user_id, &connection));

    match records {
        Ok(records) => {
            let buckets = aggregate_by_date(&records);
            Json(chart_points(&buckets, query.width)).into_response()
        }
        Err(error) => {
            tracing::error!("Could not get chart records for user {user_id}: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Could not load chart data" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::date;

    use crate::{
        auth::{NewUser, PasswordHash, create_user},
        chart::RawRecord,
        db::initialize,
        endpoints,
        record::{Category, NewRecord, create_record},
    };

    use super::{ChartState, daily_spending_dashboard_chart, get_daily_chart};

    fn server() -> TestServer {
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

        for (amount, category, date) in [
            (50.0, Category::Food, date!(2024 - 01 - 15)),
            (25.5, Category::Transportation, date!(2024 - 01 - 15)),
            (10.0, Category::Food, date!(2024 - 01 - 14)),
        ] {
            create_record(
                NewRecord {
                    user_id,
                    text: "Test".to_owned(),
                    amount,
                    category,
                    date,
                },
                &conn,
            )
            .unwrap();
        }

        let app = Router::new()
            .route(endpoints::DAILY_CHART_API, get(get_daily_chart))
            .layer(Extension(user_id))
            .with_state(ChartState {
                db_connection: Arc::new(Mutex::new(conn)),
            });

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn returns_compact_points_by_default() {
        let response = server().get(endpoints::DAILY_CHART_API).await;

        response.assert_status_ok();
        let points: Value = response.json();
        assert_eq!(
            points,
            json!([
                { "label": "Jan 14", "total": 10.0, "categories": ["Food"] },
                { "label": "Jan 15", "total": 75.5, "categories": ["Food", "Transportation"] },
            ])
        );
    }

    #[tokio::test]
    async fn wide_points_include_year() {
        let response = server()
            .get(endpoints::DAILY_CHART_API)
            .add_query_param("width", "wide")
            .await;

        let points: Value = response.json();
        assert_eq!(points[0]["label"], "Jan 14, 2024");
    }

    #[test]
    fn dashboard_chart_has_both_label_widths() {
        let chart = daily_spending_dashboard_chart(&[RawRecord {
            date: Some("2024-01-15".to_owned()),
            amount: Some(12.0),
            category: Some("Food".to_owned()),
        }]);

        assert!(chart.compact_options.contains("Jan 15"));
        assert!(!chart.compact_options.contains("2024"));
        assert!(chart.wide_options.contains("Jan 15, 2024"));
    }
}
