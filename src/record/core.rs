//! Defines the expense record model and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{Error, auth::UserID, chart::RawRecord, database_id::RecordId};

// ============================================================================
// MODELS
// ============================================================================

/// What an expense was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Food,
    Transportation,
    Shopping,
    Entertainment,
    Bills,
    Healthcare,
    /// The catch-all for anything that does not fit the other categories.
    Other,
}

impl Category {
    /// Every category, in the order they are offered to the user.
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Transportation,
        Category::Shopping,
        Category::Entertainment,
        Category::Bills,
        Category::Healthcare,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Bills => "Bills",
            Category::Healthcare => "Healthcare",
            Category::Other => "Other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Food => "🍔",
            Category::Transportation => "🚗",
            Category::Shopping => "🛒",
            Category::Entertainment => "🎬",
            Category::Bills => "💡",
            Category::Healthcare => "🏥",
            Category::Other => "📦",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Parse a category name, ignoring case and surrounding whitespace.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();

        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::InvalidCategory(text.to_owned()))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        text.parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A single logged expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    /// The ID of the record.
    pub id: RecordId,
    /// The user who logged the expense.
    pub user_id: UserID,
    /// A short description of what the money was spent on.
    pub text: String,
    /// The amount of money spent, never negative.
    pub amount: f64,
    pub category: Category,
    /// The day the money was spent.
    pub date: Date,
    /// When the record was saved.
    pub created_at: OffsetDateTime,
}

/// The validated fields for a record that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub user_id: UserID,
    pub text: String,
    pub amount: f64,
    pub category: Category,
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the record table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS record (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_user_date ON record(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Save a new expense record.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_record(new_record: NewRecord, connection: &Connection) -> Result<ExpenseRecord, Error> {
    let record = connection
        .prepare(
            "INSERT INTO record (user_id, text, amount, category, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, user_id, text, amount, category, date, created_at",
        )?
        .query_row(
            (
                new_record.user_id.as_i64(),
                new_record.text,
                new_record.amount,
                new_record.category,
                new_record.date,
                OffsetDateTime::now_utc(),
            ),
            map_record_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    Ok(record)
}

/// Get all of a user's records, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_records(user_id: UserID, connection: &Connection) -> Result<Vec<ExpenseRecord>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, text, amount, category, date, created_at FROM record
             WHERE user_id = :user_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_record_row)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Get the `limit` newest records for a user.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_recent_records(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<ExpenseRecord>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, text, amount, category, date, created_at FROM record
             WHERE user_id = :user_id
             ORDER BY date DESC, id DESC
             LIMIT :limit",
        )?
        .query_map(
            rusqlite::named_params! {":user_id": user_id.as_i64(), ":limit": limit},
            map_record_row,
        )?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Get a user's records in the shape the chart aggregation expects.
///
/// Columns are read as raw values, the aggregation decides what is usable.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_chart_records(user_id: UserID, connection: &Connection) -> Result<Vec<RawRecord>, Error> {
    connection
        .prepare("SELECT date, amount, category FROM record WHERE user_id = :user_id ORDER BY date")?
        .query_map(&[(":user_id", &user_id.as_i64())], map_raw_record_row)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

type RowsAffected = usize;

/// Delete one of a user's records.
///
/// Records belonging to other users are never deleted, the returned row
/// count is zero instead.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn delete_record(
    user_id: UserID,
    record_id: RecordId,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM record WHERE id = ?1 AND user_id = ?2",
            (record_id, user_id.as_i64()),
        )
        .map_err(|error| error.into())
}

/// Map a database row to an [ExpenseRecord].
fn map_record_row(row: &Row) -> Result<ExpenseRecord, rusqlite::Error> {
    Ok(ExpenseRecord {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        text: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn text_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_owned),
        _ => None,
    }
}

fn map_raw_record_row(row: &Row) -> Result<RawRecord, rusqlite::Error> {
    let amount = match row.get_ref(1)? {
        ValueRef::Real(amount) => Some(amount),
        ValueRef::Integer(amount) => Some(amount as f64),
        _ => None,
    };

    Ok(RawRecord {
        date: text_value(row.get_ref(0)?),
        amount,
        category: text_value(row.get_ref(2)?),
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        auth::{NewUser, PasswordHash, UserID, create_user},
        db::initialize,
        record::{
            Category, NewRecord, create_record, delete_record, get_chart_records,
            get_recent_records, get_records,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(email: &str, conn: &Connection) -> UserID {
        create_user(
            NewUser {
                name: "Test".to_owned(),
                email: email.to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            conn,
        )
        .unwrap()
        .id
    }

    fn new_record(user_id: UserID, amount: f64, date: time::Date) -> NewRecord {
        NewRecord {
            user_id,
            text: "Lunch".to_owned(),
            amount,
            category: Category::Food,
            date,
        }
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let user_id = create_test_user("test@example.com", &conn);

        let record = create_record(new_record(user_id, 12.3, date!(2025 - 10 - 05)), &conn)
            .expect("Could not create record");

        assert_eq!(record.user_id, user_id);
        assert_eq!(record.amount, 12.3);
        assert_eq!(record.category, Category::Food);
        assert_eq!(record.date, date!(2025 - 10 - 05));
    }

    #[test]
    fn create_fails_for_missing_user() {
        let conn = get_test_connection();

        let result = create_record(
            new_record(UserID::new(999), 1.0, date!(2025 - 10 - 05)),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn records_are_newest_first() {
        let conn = get_test_connection();
        let user_id = create_test_user("test@example.com", &conn);
        let older = create_record(new_record(user_id, 1.0, date!(2025 - 10 - 01)), &conn).unwrap();
        let newest = create_record(new_record(user_id, 2.0, date!(2025 - 10 - 03)), &conn).unwrap();
        let same_day = create_record(new_record(user_id, 3.0, date!(2025 - 10 - 03)), &conn).unwrap();

        let records = get_records(user_id, &conn).unwrap();

        let ids: Vec<_> = records.iter().map(|record| record.id).collect();
        assert_eq!(ids, [same_day.id, newest.id, older.id]);
    }

    #[test]
    fn recent_records_are_limited() {
        let conn = get_test_connection();
        let user_id = create_test_user("test@example.com", &conn);
        for day in 1..=8 {
            let date = time::Date::from_calendar_date(2025, time::Month::October, day).unwrap();
            create_record(new_record(user_id, day as f64, date), &conn).unwrap();
        }

        let records = get_recent_records(user_id, 6, &conn).unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records[0].date, date!(2025 - 10 - 08));
    }

    #[test]
    fn records_are_scoped_to_user() {
        let conn = get_test_connection();
        let alice = create_test_user("alice@example.com", &conn);
        let bob = create_test_user("bob@example.com", &conn);
        create_record(new_record(alice, 1.0, date!(2025 - 10 - 01)), &conn).unwrap();

        assert!(get_records(bob, &conn).unwrap().is_empty());
        assert!(get_chart_records(bob, &conn).unwrap().is_empty());
    }

    #[test]
    fn delete_only_removes_own_records() {
        let conn = get_test_connection();
        let alice = create_test_user("alice@example.com", &conn);
        let bob = create_test_user("bob@example.com", &conn);
        let record = create_record(new_record(alice, 1.0, date!(2025 - 10 - 01)), &conn).unwrap();

        assert_eq!(delete_record(bob, record.id, &conn), Ok(0));
        assert_eq!(delete_record(alice, record.id, &conn), Ok(1));
        assert!(get_records(alice, &conn).unwrap().is_empty());
    }

    #[test]
    fn chart_records_read_raw_columns() {
        let conn = get_test_connection();
        let user_id = create_test_user("test@example.com", &conn);
        create_record(new_record(user_id, 4.5, date!(2025 - 10 - 01)), &conn).unwrap();
        conn.execute(
            "INSERT INTO record (user_id, text, amount, category, date, created_at)
             VALUES (?1, 'Bad', 'abc', 'Food', '2025-10-02', '2025-10-02 00:00:00')",
            [user_id.as_i64()],
        )
        .unwrap();

        let records = get_chart_records(user_id, &conn).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date.as_deref(), Some("2025-10-01"));
        assert_eq!(records[0].amount, Some(4.5));
        assert_eq!(records[0].category.as_deref(), Some("Food"));
        assert_eq!(records[1].amount, None);
    }

    #[test]
    fn deleting_user_deletes_records() {
        let conn = get_test_connection();
        let user_id = create_test_user("test@example.com", &conn);
        create_record(new_record(user_id, 1.0, date!(2025 - 10 - 01)), &conn).unwrap();

        conn.execute("DELETE FROM user WHERE id = ?1", [user_id.as_i64()])
            .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM record", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
