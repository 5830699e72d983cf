//! Installment-Tag Junction Table Operations
//!
//! This module handles the many-to-many relationship between installments and
//! tags: attaching, replacing, and querying the tags on an installment.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::DatabaseID,
    tag::{Tag, TagId, TagName},
};

/// Get the number of installments associated with a tag.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_tag_installment_count(
    tag_id: TagId,
    connection: &Connection,
) -> Result<i64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM installment_tag WHERE tag_id = ?1",
        [tag_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Create the installment_tag junction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_installment_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS installment_tag (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            installment_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            FOREIGN KEY(installment_id) REFERENCES installment(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tag(id) ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE(installment_id, tag_id)
        )",
        (),
    )?;

    // Create indexes for foreign keys to improve query performance
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_installment_tag_installment_id ON installment_tag(installment_id)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_installment_tag_tag_id ON installment_tag(tag_id)",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('installment_tag', 0)",
        (),
    )?;

    Ok(())
}

/// Get all tags for an installment, sorted by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_installment_tags(
    installment_id: DatabaseID,
    connection: &Connection,
) -> Result<Vec<Tag>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.name
             FROM tag t
             INNER JOIN installment_tag it ON t.id = it.tag_id
             WHERE it.installment_id = ?1
             ORDER BY t.name",
        )?
        .query_map([installment_id], |row| {
            let id = row.get(0)?;
            let raw_name: String = row.get(1)?;
            let name = TagName::new_unchecked(&raw_name);
            Ok(Tag { id, name })
        })?
        .map(|maybe_tag| maybe_tag.map_err(Error::SqlError))
        .collect()
}

/// Replace an installment's tags without opening a transaction.
///
/// Intended for callers that already hold an open transaction on `connection`.
pub(crate) fn replace_installment_tags(
    installment_id: DatabaseID,
    tag_ids: &[TagId],
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM installment_tag WHERE installment_id = ?1",
        [installment_id],
    )?;

    let mut statement =
        connection.prepare("INSERT INTO installment_tag (installment_id, tag_id) VALUES (?1, ?2)")?;

    for &tag_id in tag_ids {
        statement
            .execute((installment_id, tag_id))
            .map_err(|error| match error {
                // Code 787 occurs when a FOREIGN KEY constraint failed.
                rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                    Error::InvalidTag(tag_id)
                }
                error => error.into(),
            })?;
    }

    Ok(())
}

/// Set tags for an installment, replacing any existing tags.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTag] if any `tag_id` does not refer to a valid tag,
/// - [Error::SqlError] if there is some other SQL error.
pub fn set_installment_tags(
    installment_id: DatabaseID,
    tag_ids: &[TagId],
    connection: &Connection,
) -> Result<(), Error> {
    let tx = connection.unchecked_transaction()?;

    replace_installment_tags(installment_id, tag_ids, &tx)?;

    tx.commit()?;
    Ok(())
}
