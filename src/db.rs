//! Database initialization for the ledger.

use std::str::FromStr;

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, types::Type,
};
use rust_decimal::Decimal;

use crate::{
    Error,
    account::create_account_table,
    category::{create_category_table, create_sub_category_table},
    installment_tag::create_installment_tag_table,
    tag::create_tag_table,
    transaction::{
        create_allocation_table, create_category_link_table, create_installment_table,
        create_transaction_table,
    },
    transaction_type::create_transaction_type_table,
    user::create_user_table,
};

/// Create the application's tables and seed the reference data.
///
/// Also turns on foreign key enforcement for `connection`; SQLite scopes that
/// setting per connection, so every connection that mutates the ledger should
/// go through this function.
///
/// # Errors
/// Returns an error if the tables could not be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // The foreign_keys pragma is a no-op inside a transaction.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_type_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_installment_table(&transaction)?;
    create_allocation_table(&transaction)?;
    create_category_table(&transaction)?;
    create_sub_category_table(&transaction)?;
    create_category_link_table(&transaction)?;
    create_tag_table(&transaction)?;
    create_installment_tag_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Read a money column stored as TEXT into a [Decimal].
pub(crate) fn decimal_column(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}
