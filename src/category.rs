//! Categories and sub-categories for classifying where money goes.
//!
//! A sub-category optionally belongs to a parent category. Names are unique
//! within a parent, and free-standing sub-categories (no parent) are unique
//! among themselves.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Alias for category row IDs.
pub type CategoryId = i64;

/// Alias for sub-category row IDs.
pub type SubCategoryId = i64;

/// A top-level grouping for spending and income, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category, unique across all categories.
    pub name: String,
}

/// A finer-grained label that optionally belongs to a parent [Category].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubCategory {
    /// The ID of the sub-category.
    pub id: SubCategoryId,
    /// The parent category, if the sub-category is not free-standing.
    pub category_id: Option<CategoryId>,
    /// The name of the sub-category, unique within its parent.
    pub name: String,
}

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('category', 0)",
        (),
    )?;

    Ok(())
}

/// Create the sub-category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_sub_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    // UNIQUE treats NULLs as distinct, so free-standing sub-categories need
    // their own partial index to keep names unique.
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS sub_category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER,
                name TEXT NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
                UNIQUE(category_id, name)
                );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sub_category_free_name
            ON sub_category (name) WHERE category_id IS NULL;
        INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('sub_category', 0);",
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn map_sub_category_row(row: &Row) -> Result<SubCategory, rusqlite::Error> {
    Ok(SubCategory {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
    })
}

/// Create a category in the database.
///
/// Leading and trailing whitespace is trimmed from `name`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategoryName] if `name` is empty or whitespace,
/// - [Error::DuplicateCategoryName] if a category with this name already exists,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_category(name: &str, connection: &Connection) -> Result<Category, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyCategoryName);
    }

    connection
        .prepare("INSERT INTO category (name) VALUES (?1) RETURNING id, name")?
        .query_row([name], map_category_row)
        .map_err(|error| match error {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_owned()),
            error => error.into(),
        })
}

/// Create a sub-category, optionally under the parent `category_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategoryName] if `name` is empty or whitespace,
/// - [Error::InvalidCategory] if `category_id` does not refer to a valid category,
/// - [Error::DuplicateCategoryName] if the parent already has a sub-category with this name,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_sub_category(
    name: &str,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<SubCategory, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyCategoryName);
    }

    if let Some(parent) = category_id {
        // A 'not found' error does not make sense when inserting, so report
        // the parent as an invalid reference instead.
        get_category(parent, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory(parent),
            error => error,
        })?;
    }

    connection
        .prepare(
            "INSERT INTO sub_category (category_id, name) VALUES (?1, ?2)
             RETURNING id, category_id, name",
        )?
        .query_row((category_id, name), map_sub_category_row)
        .map_err(|error| match error {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_owned()),
            error => error.into(),
        })
}

/// Retrieve a category by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid category,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare("SELECT id, name FROM category WHERE id = :id")?
        .query_one(&[(":id", &id)], map_category_row)?;

    Ok(category)
}

/// Retrieve a sub-category by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid sub-category,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_sub_category(id: SubCategoryId, connection: &Connection) -> Result<SubCategory, Error> {
    let sub_category = connection
        .prepare("SELECT id, category_id, name FROM sub_category WHERE id = :id")?
        .query_one(&[(":id", &id)], map_sub_category_row)?;

    Ok(sub_category)
}

/// Validate an allocation target against the reference data.
///
/// A sub-category may be used alone, but when paired with a category it must
/// belong to that category. Free-standing sub-categories cannot be paired.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if `category_id` does not refer to a valid category,
/// - [Error::InvalidSubCategory] if `sub_category_id` does not refer to a valid sub-category,
/// - [Error::InvalidCategoryPair] if the sub-category does not belong to the category,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn check_category_pair(
    category_id: Option<CategoryId>,
    sub_category_id: Option<SubCategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    if let Some(id) = category_id {
        get_category(id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory(id),
            error => error,
        })?;
    }

    let Some(sub_id) = sub_category_id else {
        return Ok(());
    };

    let sub_category = get_sub_category(sub_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidSubCategory(sub_id),
        error => error,
    })?;

    if let Some(id) = category_id {
        if sub_category.category_id != Some(id) {
            return Err(Error::InvalidCategoryPair {
                category_id: id,
                sub_category_id: sub_id,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod category_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{create_category, get_category};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_get_category() {
        let conn = get_test_connection();

        let created = create_category("Groceries", &conn).expect("Could not create category");

        assert!(created.id > 0);
        assert_eq!(created.name, "Groceries");
        assert_eq!(get_category(created.id, &conn), Ok(created));
    }

    #[test]
    fn create_trims_whitespace() {
        let conn = get_test_connection();

        let created = create_category("  Rent  ", &conn).expect("Could not create category");

        assert_eq!(created.name, "Rent");
    }

    #[test]
    fn create_fails_on_empty_name() {
        let conn = get_test_connection();

        assert_eq!(create_category("", &conn), Err(Error::EmptyCategoryName));
        assert_eq!(create_category("   ", &conn), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let conn = get_test_connection();
        create_category("Groceries", &conn).unwrap();

        let result = create_category("Groceries", &conn);

        assert_eq!(
            result,
            Err(Error::DuplicateCategoryName("Groceries".to_owned()))
        );
    }

    #[test]
    fn get_fails_on_unknown_id() {
        let conn = get_test_connection();

        assert_eq!(get_category(999, &conn), Err(Error::NotFound));
    }
}
