//! Defines the core data models and database queries for the transaction
//! ledger: root rows, installments, category allocations, and category links.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::AccountId,
    category::{CategoryId, SubCategoryId},
    database_id::DatabaseID,
    db::decimal_column,
    tag::TagId,
    user::UserID,
};

/// Alias for IDs referring to rows in the transaction table.
pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// The root row of a ledger entry.
///
/// A transaction holds the fields shared by everything underneath it: the
/// total value, the date, the receiving account, and free-form notes. The
/// actual money movement is recorded by its [Installment] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The total amount of money moved.
    pub value: Decimal,
    /// The ID of the type row: income, expense, or transfer.
    pub transaction_type_id: DatabaseID,
    /// When the transaction happened.
    pub date: Date,
    /// The account money was paid into or out of.
    pub account_id: AccountId,
    /// The account money was drawn from. Only set for transfers.
    pub origin_account_id: Option<AccountId>,
    /// The user the transaction belongs to.
    pub user_id: UserID,
    /// A text description of what the transaction was for.
    pub notes: String,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// A single movement of money belonging to a transaction.
///
/// Most transactions have exactly one installment. Splitting a purchase over
/// several pay periods produces several, and a transfer produces an income
/// and an expense installment on the two accounts involved. Installments do
/// not carry a date of their own, they share the root transaction's date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// The ID of the installment.
    pub id: DatabaseID,
    /// The transaction the installment belongs to.
    pub transaction_id: TransactionId,
    /// The amount of money this installment moves.
    pub value: Decimal,
    /// The ID of the type row stamped on the installment.
    ///
    /// Matches the root transaction's type, except for transfers where the
    /// two legs are stamped income and expense.
    pub transaction_type_id: DatabaseID,
    /// The account the installment applies to.
    pub account_id: AccountId,
    /// The user the installment belongs to.
    pub user_id: UserID,
}

/// A slice of an installment's value set aside for categorisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// The ID of the allocation.
    pub id: DatabaseID,
    /// The installment the allocation belongs to.
    pub installment_id: DatabaseID,
    /// The slice of the installment's value being categorised.
    pub value: Decimal,
}

/// Joins an allocation to its category and optional sub-category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLink {
    /// The ID of the category link.
    pub id: DatabaseID,
    /// The allocation being categorised.
    pub allocation_id: DatabaseID,
    /// The category the allocation is filed under.
    pub category_id: CategoryId,
    /// The optional sub-category refinement.
    pub sub_category_id: Option<SubCategoryId>,
}

/// The fields required to insert a transaction root row.
#[derive(Debug, Clone)]
pub(crate) struct NewTransaction {
    pub value: Decimal,
    pub transaction_type_id: DatabaseID,
    pub date: Date,
    pub account_id: AccountId,
    pub origin_account_id: Option<AccountId>,
    pub user_id: UserID,
    pub notes: String,
}

/// A transaction and all of its children, shaped for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTree {
    /// The ID of the root transaction.
    pub transaction_id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// The installments belonging to the transaction, ordered by ID.
    pub installments: Vec<InstallmentView>,
}

/// An installment with its allocations and tags attached.
///
/// The root transaction's date is echoed onto each installment so a row can
/// be displayed without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentView {
    /// The ID of the installment.
    pub id: DatabaseID,
    /// The amount of money moved by the installment.
    pub value: Decimal,
    /// The ID of the type row: income, expense, or transfer.
    pub transaction_type_id: DatabaseID,
    /// The account money was paid into or out of.
    pub account_id: AccountId,
    /// The root transaction the installment belongs to.
    pub transaction_id: TransactionId,
    /// When the root transaction happened.
    pub date: Date,
    /// The allocations splitting the installment's value, ordered by ID.
    pub subs: Vec<AllocationView>,
    /// The tags attached to the installment, ordered by name.
    pub tags: Vec<TagRef>,
}

/// An allocation with its category pair flattened in.
///
/// `category_id` is `None` when the allocation has no category link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationView {
    /// The ID of the allocation.
    pub id: DatabaseID,
    /// The slice of the installment's value being categorised.
    pub value: Decimal,
    /// The category the allocation is filed under, if any.
    pub category_id: Option<CategoryId>,
    /// The optional sub-category refinement.
    pub sub_category_id: Option<SubCategoryId>,
}

/// A reference to a tag attached to an installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    /// The ID of the tag.
    pub id: TagId,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Insert a transaction root row.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if a referenced account, type, or user does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_transaction(
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "INSERT INTO \"transaction\" (value, transaction_type_id, date, account_id, origin_account_id, user_id, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, value, transaction_type_id, date, account_id, origin_account_id, user_id, notes, created_at",
        )?
        .query_row(
            (
                new_transaction.value.to_string(),
                new_transaction.transaction_type_id,
                new_transaction.date,
                new_transaction.account_id,
                new_transaction.origin_account_id,
                new_transaction.user_id.as_i64(),
                new_transaction.notes.as_str(),
                OffsetDateTime::now_utc(),
            ),
            map_transaction_row,
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
        })
}

/// Retrieve a transaction's root row, regardless of owner.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, value, transaction_type_id, date, account_id, origin_account_id, user_id, notes, created_at
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve a transaction's root row and check that it belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::Forbidden] if the transaction belongs to another user,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_owned_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;

    if transaction.user_id != user_id {
        return Err(Error::Forbidden);
    }

    Ok(transaction)
}

/// Insert an installment under `transaction_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if a referenced row does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_installment(
    transaction_id: TransactionId,
    value: Decimal,
    transaction_type_id: DatabaseID,
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Installment, Error> {
    connection
        .prepare(
            "INSERT INTO installment (transaction_id, value, transaction_type_id, account_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, transaction_id, value, transaction_type_id, account_id, user_id",
        )?
        .query_row(
            (
                transaction_id,
                value.to_string(),
                transaction_type_id,
                account_id,
                user_id.as_i64(),
            ),
            map_installment_row,
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
        })
}

/// Retrieve a single installment by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid installment,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_installment(
    id: DatabaseID,
    connection: &Connection,
) -> Result<Installment, Error> {
    let installment = connection
        .prepare(
            "SELECT id, transaction_id, value, transaction_type_id, account_id, user_id
             FROM installment WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_installment_row)?;

    Ok(installment)
}

/// Count the installments recorded under `transaction_id`.
pub(crate) fn count_installments(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM installment WHERE transaction_id = :id",
            &[(":id", &transaction_id)],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Insert a category allocation under `installment_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `installment_id` does not refer to a valid installment,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_allocation(
    installment_id: DatabaseID,
    value: Decimal,
    connection: &Connection,
) -> Result<Allocation, Error> {
    connection
        .prepare(
            "INSERT INTO allocation (installment_id, value)
             VALUES (?1, ?2)
             RETURNING id, installment_id, value",
        )?
        .query_row((installment_id, value.to_string()), map_allocation_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })
}

/// Join an allocation to a category and optional sub-category.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if `category_id` does not refer to a valid category,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_category_link(
    allocation_id: DatabaseID,
    category_id: CategoryId,
    sub_category_id: Option<SubCategoryId>,
    connection: &Connection,
) -> Result<CategoryLink, Error> {
    connection
        .prepare(
            "INSERT INTO category_link (allocation_id, category_id, sub_category_id)
             VALUES (?1, ?2, ?3)
             RETURNING id, allocation_id, category_id, sub_category_id",
        )?
        .query_row(
            (allocation_id, category_id, sub_category_id),
            map_category_link_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_id),
            error => error.into(),
        })
}

/// Remove the tag links, category links, allocations, and installments
/// recorded under `transaction_id`, bottom-up.
pub(crate) fn delete_transaction_children(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM installment_tag WHERE installment_id IN
         (SELECT id FROM installment WHERE transaction_id = ?1)",
        [transaction_id],
    )?;
    connection.execute(
        "DELETE FROM category_link WHERE allocation_id IN
         (SELECT allocation.id FROM allocation
          INNER JOIN installment ON allocation.installment_id = installment.id
          WHERE installment.transaction_id = ?1)",
        [transaction_id],
    )?;
    connection.execute(
        "DELETE FROM allocation WHERE installment_id IN
         (SELECT id FROM installment WHERE transaction_id = ?1)",
        [transaction_id],
    )?;
    connection.execute(
        "DELETE FROM installment WHERE transaction_id = ?1",
        [transaction_id],
    )?;

    Ok(())
}

/// Remove the tag links, category links, and allocations recorded under a
/// single installment, leaving the installment row itself in place.
pub(crate) fn delete_installment_children(
    installment_id: DatabaseID,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM installment_tag WHERE installment_id = ?1",
        [installment_id],
    )?;
    connection.execute(
        "DELETE FROM category_link WHERE allocation_id IN
         (SELECT id FROM allocation WHERE installment_id = ?1)",
        [installment_id],
    )?;
    connection.execute(
        "DELETE FROM allocation WHERE installment_id = ?1",
        [installment_id],
    )?;

    Ok(())
}

/// Create the table for storing transaction root rows.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                value TEXT NOT NULL,
                transaction_type_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                account_id INTEGER NOT NULL,
                origin_account_id INTEGER,
                user_id INTEGER NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY(transaction_type_id) REFERENCES transaction_type(id) ON UPDATE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE,
                FOREIGN KEY(origin_account_id) REFERENCES account(id) ON UPDATE CASCADE,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Add composite index used by the date-windowed listing.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Create the table for storing installments.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_installment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS installment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                transaction_type_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(transaction_type_id) REFERENCES transaction_type(id) ON UPDATE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('installment', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_installment_transaction_id ON installment(transaction_id);",
        (),
    )?;

    // Composite index serving the balance and summary queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_installment_account_type ON installment(account_id, transaction_type_id);",
        (),
    )?;

    Ok(())
}

/// Create the table for storing category allocations.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_allocation_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS allocation (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                installment_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                FOREIGN KEY(installment_id) REFERENCES installment(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('allocation', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_allocation_installment_id ON allocation(installment_id);",
        (),
    )?;

    Ok(())
}

/// Create the table joining allocations to categories.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_link_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category_link (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                allocation_id INTEGER NOT NULL UNIQUE,
                category_id INTEGER NOT NULL,
                sub_category_id INTEGER,
                FOREIGN KEY(allocation_id) REFERENCES allocation(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(sub_category_id) REFERENCES sub_category(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('category_link', 0)",
        (),
    )?;

    // Add index used by the category totals report.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_category_link_category_id ON category_link(category_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
///
/// The row must contain the table's columns in definition order.
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        value: decimal_column(row, 1)?,
        transaction_type_id: row.get(2)?,
        date: row.get(3)?,
        account_id: row.get(4)?,
        origin_account_id: row.get(5)?,
        user_id: UserID::new(row.get(6)?),
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Map a database row to an [Installment].
pub(crate) fn map_installment_row(row: &Row) -> Result<Installment, rusqlite::Error> {
    Ok(Installment {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        value: decimal_column(row, 2)?,
        transaction_type_id: row.get(3)?,
        account_id: row.get(4)?,
        user_id: UserID::new(row.get(5)?),
    })
}

fn map_allocation_row(row: &Row) -> Result<Allocation, rusqlite::Error> {
    Ok(Allocation {
        id: row.get(0)?,
        installment_id: row.get(1)?,
        value: decimal_column(row, 2)?,
    })
}

fn map_category_link_row(row: &Row) -> Result<CategoryLink, rusqlite::Error> {
    Ok(CategoryLink {
        id: row.get(0)?,
        allocation_id: row.get(1)?,
        category_id: row.get(2)?,
        sub_category_id: row.get(3)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
