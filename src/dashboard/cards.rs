//! Summary cards for the dashboard: totals, daily average and extremes.

use maud::{Markup, html};

use crate::{html::format_currency, record::RecordSummary};

struct StatCard {
    label: &'static str,
    value: String,
    caption: String,
}

fn optional_currency(amount: Option<f64>) -> String {
    amount.map_or_else(|| "-".to_owned(), format_currency)
}

fn stat_cards(summary: &RecordSummary) -> [StatCard; 4] {
    let records = if summary.record_count == 1 {
        "record"
    } else {
        "records"
    };
    let days = if summary.days_with_records == 1 {
        "day"
    } else {
        "days"
    };

    [
        StatCard {
            label: "Total Spent",
            value: format_currency(summary.total),
            caption: format!("{} {records}", summary.record_count),
        },
        StatCard {
            label: "Daily Average",
            value: format_currency(summary.average_daily()),
            caption: format!("over {} {days} with spending", summary.days_with_records),
        },
        StatCard {
            label: "Highest Expense",
            value: optional_currency(summary.highest),
            caption: "single largest record".to_owned(),
        },
        StatCard {
            label: "Lowest Expense",
            value: optional_currency(summary.lowest),
            caption: "single smallest record".to_owned(),
        },
    ]
}

/// Renders a grid of cards summarising the user's spending.
pub(super) fn summary_cards_view(summary: &RecordSummary) -> Markup {
    html! {
        section id="summary-cards" class="w-full grid grid-cols-2 lg:grid-cols-4 gap-4"
        {
            @for card in stat_cards(summary) {
                div
                    class="bg-white dark:bg-gray-800 border border-gray-200
                        dark:border-gray-700 rounded-lg p-4 shadow-md"
                    aria-label={ (card.label) ": " (card.value) }
                {
                    h3 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (card.label) }
                    p class="text-2xl font-bold mt-1" { (card.value) }
                    p class="text-xs text-gray-500 dark:text-gray-400 mt-1" { (card.caption) }
                }
            }
        }
    }
}
