//! Turns daily buckets into labelled points for display.

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::chart::DailyBucket;

/// How much room the chart has for its axis labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelWidth {
    /// Month and day, e.g. "Jan 15".
    #[default]
    Compact,
    /// Month, day and year, e.g. "Jan 15, 2024".
    Wide,
}

/// A single bar on the daily spending chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub total: f64,
    pub categories: Vec<String>,
}

/// Round `amount` to two decimal places, halves away from zero.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn month_abbreviation(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

pub fn format_date_label(date: Date, width: LabelWidth) -> String {
    let month = month_abbreviation(date.month());

    match width {
        LabelWidth::Compact => format!("{month} {}", date.day()),
        LabelWidth::Wide => format!("{month} {}, {}", date.day(), date.year()),
    }
}

/// Label and round each bucket, keeping the buckets' order.
pub fn chart_points(buckets: &[DailyBucket], width: LabelWidth) -> Vec<ChartPoint> {
    buckets
        .iter()
        .map(|bucket| ChartPoint {
            label: format_date_label(bucket.original_date.date(), width),
            total: round_to_cents(bucket.total),
            categories: bucket.categories.clone(),
        })
        .collect()
}
