//! Groups expense records into one bucket per UTC calendar day.
//!
//! Records arrive as [RawRecord]s, which may come from JSON or straight from
//! database columns, so nothing about their shape is trusted. Records that
//! cannot be bucketed are skipped and logged, they never fail the batch.

use std::collections::HashMap;

use serde_json::Value;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::Error;

const DATE_KEY_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const ISO_DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);
const SQLITE_DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);
const ISO_OFFSET_DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]][offset_hour sign:mandatory]:[offset_minute]"
);

/// An expense record as received, before any validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// The record's date or date-time.
    pub date: Option<String>,
    /// The amount spent, `None` if the source value was not a number.
    pub amount: Option<f64>,
    /// The category label.
    pub category: Option<String>,
}

impl RawRecord {
    /// Read a record from a JSON object with `date`, `amount` and `category` keys.
    ///
    /// Values of the wrong JSON type are treated as missing.
    pub fn from_json(value: &Value) -> Self {
        Self {
            date: value.get("date").and_then(Value::as_str).map(str::to_owned),
            amount: value.get("amount").and_then(Value::as_f64),
            category: value
                .get("category")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// The spending on a single UTC calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBucket {
    /// The day as `YYYY-MM-DD`.
    pub date_key: String,
    /// The sum of the amounts of every record on this day.
    pub total: f64,
    /// Distinct category labels in the order they were first seen.
    pub categories: Vec<String>,
    /// The timestamp of the first record in this bucket, in UTC.
    pub original_date: OffsetDateTime,
}

/// Read a JSON array of records.
///
/// # Errors
/// Returns [Error::InvalidChartInput] if `value` is not an array. Individual
/// elements are never rejected here, see [aggregate_by_date].
pub fn parse_raw_records(value: &Value) -> Result<Vec<RawRecord>, Error> {
    let Some(elements) = value.as_array() else {
        let kind = match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        };

        return Err(Error::InvalidChartInput(kind.to_owned()));
    };

    Ok(elements.iter().map(RawRecord::from_json).collect())
}

/// Parse a record's date into a UTC timestamp.
///
/// Accepts ISO 8601 date-times with or without seconds, fractional seconds
/// and an offset, the same with a space in place of the `T`, and bare
/// `YYYY-MM-DD` dates. Date-times without an offset and bare dates are taken
/// as UTC.
fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();

    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, ISO_OFFSET_DATE_TIME_FORMAT))
    {
        return Some(date_time.to_offset(UtcOffset::UTC));
    }

    let local = text.strip_suffix(['Z', 'z']).unwrap_or(text);

    if let Ok(date_time) = PrimitiveDateTime::parse(local, ISO_DATE_TIME_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(local, SQLITE_DATE_TIME_FORMAT))
    {
        return Some(date_time.assume_utc());
    }

    Date::parse(text, DATE_KEY_FORMAT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

struct ValidRecord<'a> {
    timestamp: OffsetDateTime,
    amount: f64,
    category: &'a str,
}

fn validate(record: &RawRecord) -> Result<ValidRecord<'_>, &'static str> {
    let timestamp = record
        .date
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or("unparseable date")?;

    let amount = record
        .amount
        .filter(|amount| amount.is_finite())
        .ok_or("amount is not a number")?;

    let category = record
        .category
        .as_deref()
        .filter(|category| !category.trim().is_empty())
        .ok_or("missing category")?;

    Ok(ValidRecord {
        timestamp,
        amount,
        category,
    })
}

/// Group `records` by UTC calendar day, oldest day first.
///
/// Records with an unparseable date, a missing or non-finite amount, or a
/// missing or blank category are skipped.
pub fn aggregate_by_date(records: &[RawRecord]) -> Vec<DailyBucket> {
    let mut buckets: Vec<DailyBucket> = Vec::new();
    let mut bucket_index: HashMap<Date, usize> = HashMap::new();
    let mut skipped = 0;

    for (index, record) in records.iter().enumerate() {
        let record = match validate(record) {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!("Skipping record {index} in chart aggregation: {reason}");
                skipped += 1;
                continue;
            }
        };

        let day = record.timestamp.date();

        match bucket_index.get(&day) {
            Some(&position) => {
                let bucket = &mut buckets[position];
                bucket.total += record.amount;

                if !bucket.categories.iter().any(|seen| seen == record.category) {
                    bucket.categories.push(record.category.to_owned());
                }
            }
            None => {
                let date_key = day
                    .format(DATE_KEY_FORMAT)
                    .unwrap_or_else(|_| day.to_string());

                bucket_index.insert(day, buckets.len());
                buckets.push(DailyBucket {
                    date_key,
                    total: record.amount,
                    categories: vec![record.category.to_owned()],
                    original_date: record.timestamp,
                });
            }
        }
    }

    buckets.sort_by_key(|bucket| bucket.original_date.date());

    tracing::debug!(
        "Aggregated {} records into {} daily buckets, skipped {skipped}",
        records.len(),
        buckets.len()
    );

    buckets
}
