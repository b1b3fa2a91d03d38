//! The page showing the user's most recent expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    AppState, Error,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{BUTTON_DELETE_STYLE, CARD_STYLE, PAGE_CONTAINER_STYLE, base, format_currency, link},
    navigation::NavBar,
    record::{ExpenseRecord, get_recent_records},
};

/// The number of records shown on the history page.
const HISTORY_LENGTH: u32 = 6;

/// The max number of graphemes to display for a description before
/// truncating and displaying ellipses.
const MAX_DESCRIPTION_GRAPHEMES: usize = 40;

/// The state needed for the history page.
#[derive(Debug, Clone)]
pub struct HistoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for HistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The Tailwind border colour for a record, larger expenses stand out more.
fn amount_border_class(amount: f64) -> &'static str {
    if amount > 100.0 {
        "border-red-500"
    } else if amount > 50.0 {
        "border-yellow-500"
    } else {
        "border-green-500"
    }
}

fn format_description(description: &str) -> (String, Option<&str>) {
    let description_length = description.graphemes(true).count();

    if description_length <= MAX_DESCRIPTION_GRAPHEMES {
        (description.to_owned(), None)
    } else {
        let truncated: String = description
            .graphemes(true)
            .take(MAX_DESCRIPTION_GRAPHEMES - 3)
            .collect();
        (truncated + "...", Some(description))
    }
}

fn record_item(record: &ExpenseRecord) -> Markup {
    let (description, full_description) = format_description(&record.text);
    let delete_url = format_endpoint(endpoints::DELETE_RECORD, record.id);

    html! {
        li
            data-record-id=(record.id)
            class={ (CARD_STYLE) " border-l-4 " (amount_border_class(record.amount)) }
        {
            div class="flex items-start justify-between gap-4"
            {
                div class="flex items-start gap-3 min-w-0"
                {
                    span class="text-2xl" aria-hidden="true" { (record.category.emoji()) }

                    div class="min-w-0"
                    {
                        p class="font-semibold truncate" title=[full_description] { (description) }
                        p class="text-sm text-gray-600 dark:text-gray-400"
                        {
                            (record.category) " · "
                            time datetime=(record.date) { (record.date) }
                        }
                    }
                }

                div class="flex flex-col items-end gap-1 shrink-0"
                {
                    span class="font-bold" { (format_currency(record.amount)) }

                    button
                        hx-delete=(delete_url)
                        hx-confirm={
                            "Are you sure you want to delete '" (record.text) "'? This cannot be undone."
                        }
                        hx-target="closest li"
                        hx-target-error="#alert-container"
                        hx-swap="delete"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

fn history_view(records: &[ExpenseRecord]) -> Markup {
    let nav_bar = NavBar::new(endpoints::HISTORY_VIEW).into_html();

    html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-2xl space-y-4"
            {
                header
                {
                    h1 class="text-2xl font-bold" { "Expense History" }
                    p class="text-gray-600 dark:text-gray-400" { "Your spending timeline" }
                }

                @if records.is_empty() {
                    div class={ (CARD_STYLE) " text-center space-y-2" }
                    {
                        h2 class="text-lg font-semibold" { "No Expense Records Found" }
                        p class="text-gray-600 dark:text-gray-400"
                        {
                            "Start tracking your expenses to see your spending history and patterns here."
                        }
                        p { (link(endpoints::DASHBOARD_VIEW, "Add an expense")) }
                    }
                } @else {
                    ul id="history-list" class="space-y-3"
                    {
                        @for record in records {
                            (record_item(record))
                        }
                    }
                }
            }
        }
    }
}

/// Display the user's most recent expenses.
pub async fn get_history_page(
    State(state): State<HistoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let records = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_recent_records(user_id, HISTORY_LENGTH, &connection)
            .inspect_err(|error| tracing::error!("could not get records for history: {error}"))?
    };

    Ok(base("History", &[], &history_view(&records)).into_response())
}
