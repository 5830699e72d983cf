//! The fixed transaction type reference data and its lookup cache.
//!
//! The three types (income, expense, transfer) are seeded with stable IDs
//! (1, 2, 3) that the rest of the crate relies on. The [TypeCache] resolves
//! request kinds to reference rows without re-querying per request.

use std::{collections::HashMap, sync::Mutex, sync::PoisonError};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DatabaseID};

/// The fixed set of transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming into an account.
    Income,
    /// Money leaving an account.
    Expense,
    /// Money moving between two accounts of the same user.
    Transfer,
}

impl TransactionKind {
    /// The stable row ID for this kind: 1=income, 2=expense, 3=transfer.
    pub const fn id(self) -> DatabaseID {
        match self {
            TransactionKind::Income => 1,
            TransactionKind::Expense => 2,
            TransactionKind::Transfer => 3,
        }
    }

    /// Look up the kind for a stored type ID.
    pub fn from_id(id: DatabaseID) -> Option<Self> {
        match id {
            1 => Some(TransactionKind::Income),
            2 => Some(TransactionKind::Expense),
            3 => Some(TransactionKind::Transfer),
            _ => None,
        }
    }

    /// The name stored in the reference table for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
        }
    }
}

/// Create the transaction type reference table and seed the fixed rows.
///
/// Seeding uses `INSERT OR IGNORE` so re-running initialization leaves an
/// existing database untouched.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_type_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transaction_type (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    for kind in [
        TransactionKind::Income,
        TransactionKind::Expense,
        TransactionKind::Transfer,
    ] {
        connection.execute(
            "INSERT OR IGNORE INTO transaction_type (id, name) VALUES (?1, ?2)",
            (kind.id(), kind.as_str()),
        )?;
    }

    Ok(())
}

/// A read-through cache over the transaction type reference table.
///
/// The table is tiny and effectively immutable, so the ledger operations
/// resolve type rows through this cache instead of querying by name on every
/// call. Call [TypeCache::invalidate] after changing the reference data (for
/// example in a migration) to force a reload on the next lookup.
#[derive(Debug, Default)]
pub struct TypeCache {
    ids: Mutex<Option<HashMap<TransactionKind, DatabaseID>>>,
}

impl TypeCache {
    /// Create an empty cache; the first lookup populates it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the reference row ID for `kind`, loading the table on first use.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if the reference table has no row for `kind`,
    /// - [Error::SqlError] if loading the table fails.
    pub fn id_of(&self, kind: TransactionKind, connection: &Connection) -> Result<DatabaseID, Error> {
        // A lock poisoned mid-replace still holds either a complete map or None.
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);

        if ids.is_none() {
            *ids = Some(load_type_ids(connection)?);
        }

        match &*ids {
            Some(map) => map.get(&kind).copied().ok_or(Error::NotFound),
            None => Err(Error::NotFound),
        }
    }

    /// Drop the cached rows so the next lookup reloads the reference table.
    pub fn invalidate(&self) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        *ids = None;
    }
}

fn load_type_ids(
    connection: &Connection,
) -> Result<HashMap<TransactionKind, DatabaseID>, Error> {
    let rows: Vec<(DatabaseID, String)> = connection
        .prepare("SELECT id, name FROM transaction_type")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    let mut ids = HashMap::new();

    for (id, name) in rows {
        let kind = match name.as_str() {
            "income" => TransactionKind::Income,
            "expense" => TransactionKind::Expense,
            "transfer" => TransactionKind::Transfer,
            _ => continue,
        };

        ids.insert(kind, id);
    }

    Ok(ids)
}

#[cfg(test)]
mod transaction_kind_tests {
    use super::TransactionKind;

    #[test]
    fn ids_are_stable() {
        assert_eq!(TransactionKind::Income.id(), 1);
        assert_eq!(TransactionKind::Expense.id(), 2);
        assert_eq!(TransactionKind::Transfer.id(), 3);
    }

    #[test]
    fn from_id_round_trips() {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Expense,
            TransactionKind::Transfer,
        ] {
            assert_eq!(TransactionKind::from_id(kind.id()), Some(kind));
        }

        assert_eq!(TransactionKind::from_id(4), None);
    }
}

#[cfg(test)]
mod type_cache_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{TransactionKind, TypeCache};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn resolves_seeded_rows() {
        let conn = get_test_connection();
        let cache = TypeCache::new();

        assert_eq!(cache.id_of(TransactionKind::Income, &conn), Ok(1));
        assert_eq!(cache.id_of(TransactionKind::Expense, &conn), Ok(2));
        assert_eq!(cache.id_of(TransactionKind::Transfer, &conn), Ok(3));
    }

    #[test]
    fn lookups_are_served_from_the_cache_until_invalidated() {
        let conn = get_test_connection();
        let cache = TypeCache::new();
        cache
            .id_of(TransactionKind::Transfer, &conn)
            .expect("Could not warm the cache");

        conn.execute("DELETE FROM transaction_type WHERE id = ?1", [3])
            .expect("Could not delete reference row");

        // Still cached.
        assert_eq!(cache.id_of(TransactionKind::Transfer, &conn), Ok(3));

        cache.invalidate();

        assert_eq!(
            cache.id_of(TransactionKind::Transfer, &conn),
            Err(Error::NotFound)
        );
        // The other rows are unaffected by the missing one.
        assert_eq!(cache.id_of(TransactionKind::Income, &conn), Ok(1));
    }
}
