//! HTMX endpoints for AI insights, answers and category suggestions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::Form;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints,
    insights::{
        AiInsight, InsightKind, InsightModel, categorize_expense, generate_ai_answer,
        generate_expense_insights,
    },
    record::{ExpenseRecord, category_select, get_records},
};

/// The state needed to ask the model about the user's records.
#[derive(Clone)]
pub struct InsightsState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub insight_model: Arc<dyn InsightModel>,
}

impl FromRef<AppState> for InsightsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            insight_model: state.insight_model.clone(),
        }
    }
}

/// Read the user's records and release the lock before the model is called.
fn load_records(
    db_connection: &Mutex<Connection>,
    user_id: UserID,
) -> Result<Vec<ExpenseRecord>, Error> {
    let connection = db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_records(user_id, &connection)
}

fn insight_style(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Warning => "border-l-yellow-500 bg-yellow-50 dark:bg-yellow-900/20",
        InsightKind::Success => "border-l-green-500 bg-green-50 dark:bg-green-900/20",
        InsightKind::Tip => "border-l-emerald-500 bg-emerald-50 dark:bg-emerald-900/20",
        InsightKind::Info => "border-l-blue-500 bg-blue-50 dark:bg-blue-900/20",
    }
}

fn insight_card(insight: &AiInsight) -> Markup {
    let answer_id = format!("answer-{}", insight.id);
    let confidence = (insight.confidence * 100.0).round() as u32;

    html! {
        li
            id=(insight.id)
            class={ "p-4 rounded-lg border-l-4 " (insight_style(insight.kind)) }
        {
            div class="flex items-start gap-3"
            {
                span class="text-xl" aria-hidden="true" { (insight.kind.icon()) }

                div class="flex-1 min-w-0 space-y-1"
                {
                    h3 class="font-semibold" { (insight.title) }
                    p class="text-sm" { (insight.message) }

                    @if let Some(action) = &insight.action {
                        button
                            type="button"
                            hx-post=(endpoints::INSIGHTS_ANSWER_API)
                            hx-vals=(serde_json::json!({
                                "question": format!("{}: {}", insight.title, action)
                            }).to_string())
                            hx-target={ "#" (answer_id) }
                            hx-swap="innerHTML"
                            class="text-sm font-medium text-blue-700 dark:text-blue-300 underline"
                        {
                            (action) " →"
                        }
                    }

                    div id=(answer_id) {}
                }

                span class="text-xs text-gray-500" title="Confidence" { (confidence) "%" }
            }
        }
    }
}

fn insights_list(insights: &[AiInsight]) -> Markup {
    html! {
        ul id="insights-list" class="space-y-3"
        {
            @for insight in insights {
                (insight_card(insight))
            }
        }
    }
}

/// Placeholder for the dashboard that loads the insights once the page is shown.
pub fn insights_panel() -> Markup {
    html! {
        section id="insights" class="w-full space-y-3"
        {
            div class="flex items-center justify-between"
            {
                h2 class="text-lg font-semibold" { "AI Insights" }

                button
                    type="button"
                    hx-get=(endpoints::INSIGHTS_API)
                    hx-target="#insights-content"
                    class="text-sm text-blue-600 dark:text-blue-400 underline"
                {
                    "Refresh"
                }
            }

            div
                id="insights-content"
                hx-get=(endpoints::INSIGHTS_API)
                hx-trigger="load"
            {
                p class="text-sm text-gray-500 animate-pulse" { "Analyzing your spending..." }
            }
        }
    }
}

/// Get AI insights about the current user's spending as an HTML fragment.
pub async fn get_insights(
    State(state): State<InsightsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let records = match load_records(&state.db_connection, user_id) {
        Ok(records) => records,
        Err(error) => {
            tracing::error!("Could not get records for insights: {error}");
            return error.into_alert_response();
        }
    };

    let insights = generate_expense_insights(state.insight_model.as_ref(), &records).await;

    Html(insights_list(&insights).into_string()).into_response()
}

/// Form data for asking a question about the user's spending.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionForm {
    #[serde(default)]
    pub question: String,
}

/// Answer a question about the current user's spending as an HTML fragment.
pub async fn post_insight_answer(
    State(state): State<InsightsState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<QuestionForm>,
) -> Response {
    let records = match load_records(&state.db_connection, user_id) {
        Ok(records) => records,
        Err(error) => {
            tracing::error!("Could not get records to answer a question: {error}");
            return error.into_alert_response();
        }
    };

    let answer = generate_ai_answer(state.insight_model.as_ref(), &form.question, &records).await;

    Html(
        html! {
            p class="mt-2 text-sm whitespace-pre-line text-gray-700 dark:text-gray-300" { (answer) }
        }
        .into_string(),
    )
    .into_response()
}

/// Form data for suggesting a category.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestCategoryForm {
    #[serde(default)]
    pub text: String,
}

/// Replace the category dropdown with one that has the suggested category selected.
pub async fn suggest_category(
    State(state): State<InsightsState>,
    Form(form): Form<SuggestCategoryForm>,
) -> Response {
    let category = categorize_expense(state.insight_model.as_ref(), &form.text).await;

    Html(category_select(Some(category)).into_string()).into_response()
}
