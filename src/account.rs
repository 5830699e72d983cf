//! Account storage: the places money sits (checking, savings, cash, card).
//!
//! Accounts are only ever soft-deleted so historical transactions keep a
//! valid reference. Balances are never stored on the account row; they are
//! derived from installments by [crate::reports::account_balance].

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, db::decimal_column, money::round_money, user::UserID};

/// Alias for account row IDs.
pub type AccountId = i64;

/// The kind of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// An everyday bank account.
    Checking,
    /// A savings account.
    Savings,
    /// Physical cash.
    Cash,
    /// A credit or debit card.
    Card,
}

impl AccountKind {
    /// The string stored in the database for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Cash => "cash",
            AccountKind::Card => "card",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "checking" => Some(AccountKind::Checking),
            "savings" => Some(AccountKind::Savings),
            "cash" => Some(AccountKind::Cash),
            "card" => Some(AccountKind::Card),
            _ => None,
        }
    }
}

/// A place money is held, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The user the account belongs to.
    pub user_id: UserID,
    /// The display name of the account, unique per user.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The balance the account started with before any recorded transactions.
    pub opening_balance: Decimal,
    /// When the account was created.
    pub created_at: OffsetDateTime,
    /// When the account was soft-deleted, if it has been.
    pub deleted_at: Option<OffsetDateTime>,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                opening_balance TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                UNIQUE(user_id, name)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('account', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let name = row.get(2)?;

    let raw_kind: String = row.get(3)?;
    let kind = AccountKind::from_str(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown account kind \"{raw_kind}\"").into(),
        )
    })?;

    let opening_balance = decimal_column(row, 4)?;
    let created_at = row.get(5)?;
    let deleted_at = row.get(6)?;

    Ok(Account {
        id,
        user_id,
        name,
        kind,
        opening_balance,
        created_at,
        deleted_at,
    })
}

/// Create a new account for `user_id`.
///
/// The opening balance is rounded to two decimal places.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateAccountName] if the user already has an account with this name,
/// - [Error::NotFound] if `user_id` does not refer to a valid user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    user_id: UserID,
    name: &str,
    kind: AccountKind,
    opening_balance: Decimal,
    connection: &Connection,
) -> Result<Account, Error> {
    let opening_balance = round_money(opening_balance);

    connection
        .prepare(
            "INSERT INTO account (user_id, name, kind, opening_balance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, name, kind, opening_balance, created_at, deleted_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                name,
                kind.as_str(),
                opening_balance.to_string(),
                OffsetDateTime::now_utc(),
            ),
            map_account_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateAccountName(name.to_owned()),
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

/// Retrieve an account by its `id`, regardless of owner or deletion state.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid account,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, user_id, name, kind, opening_balance, created_at, deleted_at
             FROM account WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_account_row)?;

    Ok(account)
}

/// Resolve an account for a mutating operation on behalf of `user_id`.
///
/// Soft-deleted accounts are treated as missing so no new ledger rows can
/// reference them.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a live account,
/// - [Error::Forbidden] if the account belongs to another user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_owned_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = get_account(id, connection)?;

    if account.deleted_at.is_some() {
        return Err(Error::NotFound);
    }

    if account.user_id != user_id {
        return Err(Error::Forbidden);
    }

    Ok(account)
}

/// Retrieve the live (not soft-deleted) accounts belonging to `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind, opening_balance, created_at, deleted_at
             FROM account WHERE user_id = :user_id AND deleted_at IS NULL
             ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Soft-delete an account by setting its deletion timestamp.
///
/// The row is kept so existing transactions stay resolvable; the account
/// simply stops accepting new ledger rows and disappears from listings.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a live account,
/// - [Error::Forbidden] if the account belongs to another user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn soft_delete_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    get_owned_account(id, user_id, connection)?;

    connection.execute(
        "UPDATE account SET deleted_at = ?1 WHERE id = ?2",
        (OffsetDateTime::now_utc(), id),
    )?;

    Ok(())
}
