//! Spending statistics shown on the dashboard and in the weekly summary.

use rusqlite::Connection;
use time::Date;

use crate::{Error, auth::UserID};

/// Totals over all of a user's records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordSummary {
    /// The sum of every record's amount.
    pub total: f64,
    /// The number of distinct days with at least one positive expense.
    pub days_with_records: u32,
    /// The largest single expense, if there are any records.
    pub highest: Option<f64>,
    /// The smallest single expense, if there are any records.
    pub lowest: Option<f64>,
    pub record_count: u32,
}

impl RecordSummary {
    /// The average spent per day that had spending, zero when there are no such days.
    pub fn average_daily(&self) -> f64 {
        if self.days_with_records == 0 {
            0.0
        } else {
            self.total / self.days_with_records as f64
        }
    }
}

/// Compute the [RecordSummary] for a user.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_record_summary(user_id: UserID, connection: &Connection) -> Result<RecordSummary, Error> {
    connection
        .query_row(
            "SELECT
                COALESCE(SUM(amount), 0.0),
                COUNT(DISTINCT CASE WHEN amount > 0 THEN date END),
                MAX(amount),
                MIN(amount),
                COUNT(id)
             FROM record WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| {
                Ok(RecordSummary {
                    total: row.get(0)?,
                    days_with_records: row.get(1)?,
                    highest: row.get(2)?,
                    lowest: row.get(3)?,
                    record_count: row.get(4)?,
                })
            },
        )
        .map_err(Error::from)
}

/// The total spent and number of records dated on or after `since`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_spending_since(
    user_id: UserID,
    since: Date,
    connection: &Connection,
) -> Result<(f64, u32), Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0.0), COUNT(id) FROM record
             WHERE user_id = ?1 AND date >= ?2",
            (user_id.as_i64(), since),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        auth::{NewUser, PasswordHash, UserID, create_user},
        db::initialize,
        record::{Category, NewRecord, create_record},
    };

    use super::{RecordSummary, get_record_summary, get_spending_since};

    fn get_test_connection() -> (Connection, UserID) {
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

        (conn, user_id)
    }

    fn add(user_id: UserID, amount: f64, date: time::Date, conn: &Connection) {
        create_record(
            NewRecord {
                user_id,
                text: "Thing".to_owned(),
                amount,
                category: Category::Other,
                date,
            },
            conn,
        )
        .unwrap();
    }

    #[test]
    fn summary_of_no_records_is_empty() {
        let (conn, user_id) = get_test_connection();

        let summary = get_record_summary(user_id, &conn).unwrap();

        assert_eq!(summary, RecordSummary::default());
        assert_eq!(summary.average_daily(), 0.0);
    }

    #[test]
    fn summary_counts_days_with_positive_spending() {
        let (conn, user_id) = get_test_connection();
        add(user_id, 10.0, date!(2025 - 10 - 01), &conn);
        add(user_id, 30.0, date!(2025 - 10 - 01), &conn);
        add(user_id, 20.0, date!(2025 - 10 - 02), &conn);
        add(user_id, 0.0, date!(2025 - 10 - 03), &conn);

        let summary = get_record_summary(user_id, &conn).unwrap();

        assert_eq!(
            summary,
            RecordSummary {
                total: 60.0,
                days_with_records: 2,
                highest: Some(30.0),
                lowest: Some(0.0),
                record_count: 4,
            }
        );
        assert_eq!(summary.average_daily(), 30.0);
    }

    #[test]
    fn spending_since_excludes_older_records() {
        let (conn, user_id) = get_test_connection();
        add(user_id, 5.0, date!(2025 - 09 - 30), &conn);
        add(user_id, 7.5, date!(2025 - 10 - 01), &conn);
        add(user_id, 2.5, date!(2025 - 10 - 07), &conn);

        let spending = get_spending_since(user_id, date!(2025 - 10 - 01), &conn).unwrap();

        assert_eq!(spending, (10.0, 2));
    }
}
