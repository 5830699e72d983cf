//! Deleting transactions and single installments.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::DatabaseID,
    transaction::core::{
        Installment, Transaction, TransactionId, count_installments, delete_installment_children,
        delete_transaction_children, get_installment, get_transaction,
    },
    user::UserID,
};

/// What a delete call removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Whether anything was removed.
    pub deleted: bool,
    /// Whether the whole transaction went away, as opposed to a single
    /// installment of it.
    pub transaction_deleted: bool,
}

/// Remove a transaction, or a single installment of one.
///
/// `id` normally names a transaction. When it matches no transaction it is
/// reinterpreted as an installment ID and resolved to its owning transaction.
/// An explicit `installment_id` restricts the deletion to that installment,
/// and removing the last remaining installment removes the whole transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` matches neither a transaction nor an
///   installment, or `installment_id` does not belong to the transaction,
/// - [Error::Forbidden] if the transaction belongs to another user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: DatabaseID,
    installment_id: Option<DatabaseID>,
    user_id: UserID,
    connection: &Connection,
) -> Result<DeleteOutcome, Error> {
    let db_transaction = connection.unchecked_transaction()?;

    let outcome = match get_transaction(id, &db_transaction) {
        Ok(root) => {
            if root.user_id != user_id {
                return Err(Error::Forbidden);
            }

            match installment_id {
                Some(target) => {
                    let installment = get_installment(target, &db_transaction)?;

                    if installment.transaction_id != root.id {
                        return Err(Error::NotFound);
                    }

                    delete_single_installment(&root, &installment, &db_transaction)?
                }
                None => {
                    remove_whole_transaction(root.id, &db_transaction)?;

                    DeleteOutcome {
                        deleted: true,
                        transaction_deleted: true,
                    }
                }
            }
        }
        Err(Error::NotFound) => {
            // No transaction has this ID, so treat it as an installment ID.
            let installment = get_installment(id, &db_transaction)?;

            if let Some(explicit) = installment_id {
                if explicit != installment.id {
                    return Err(Error::NotFound);
                }
            }

            let root = get_transaction(installment.transaction_id, &db_transaction)?;

            if root.user_id != user_id {
                return Err(Error::Forbidden);
            }

            delete_single_installment(&root, &installment, &db_transaction)?
        }
        Err(error) => return Err(error),
    };

    db_transaction.commit()?;
    tracing::debug!(
        "deleted {} {id}",
        if outcome.transaction_deleted {
            "transaction"
        } else {
            "installment of transaction"
        }
    );

    Ok(outcome)
}

/// Remove one installment, or the whole transaction when it is the last one.
fn delete_single_installment(
    root: &Transaction,
    installment: &Installment,
    connection: &Connection,
) -> Result<DeleteOutcome, Error> {
    let remaining = count_installments(root.id, connection)?;

    if remaining <= 1 {
        remove_whole_transaction(root.id, connection)?;

        return Ok(DeleteOutcome {
            deleted: true,
            transaction_deleted: true,
        });
    }

    delete_installment_children(installment.id, connection)?;
    connection.execute("DELETE FROM installment WHERE id = ?1", [installment.id])?;

    Ok(DeleteOutcome {
        deleted: true,
        transaction_deleted: false,
    })
}

fn remove_whole_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    delete_transaction_children(transaction_id, connection)?;
    connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1",
        [transaction_id],
    )?;

    Ok(())
}
