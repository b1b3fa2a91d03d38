//! Database setup for the application's tables.

use rusqlite::Connection;

use crate::{
    Error, auth::create_user_table, push::create_push_subscription_table,
    record::create_record_table,
};

/// Create the tables for the domain models if they do not already exist.
///
/// Foreign keys are switched on so that deleting a user deletes their records
/// and push subscriptions.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_record_table(&transaction)?;
    create_push_subscription_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
