//! Replacing a recorded transaction wholesale.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    Error,
    account::get_owned_account,
    database_id::DatabaseID,
    db::decimal_column,
    transaction::core::{
        Transaction, TransactionId, TransactionTree, delete_transaction_children,
        get_owned_transaction,
    },
    transaction::create::build_installments,
    transaction::request::TransactionRequest,
    transaction::transfer::{check_origin_balance, create_transfer_legs},
    transaction_type::{TransactionKind, TypeCache},
    user::UserID,
};

/// Replace a transaction and all of its children with the contents of
/// `request`.
///
/// This is a full replacement: the previous installments, allocations, and
/// tag links are removed and rebuilt, so none of their IDs survive an update.
/// When a transfer keeps its origin account, the expense leg being replaced
/// still counts as available for the balance check.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction, or an
///   account does not exist or has been deleted,
/// - [Error::Forbidden] if the transaction or an account belongs to another
///   user,
/// - [Error::InsufficientBalance] if a transfer's origin cannot fund it,
/// - any of the validation errors listed for
///   [create_transaction](crate::transaction::create::create_transaction),
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    request: TransactionRequest,
    user_id: UserID,
    types: &TypeCache,
    connection: &Connection,
) -> Result<TransactionTree, Error> {
    let request = request.normalized();
    request.validate()?;
    request.validate_category_pairs(connection)?;

    let existing = get_owned_transaction(id, user_id, connection)?;
    let transaction_type_id = types.id_of(request.transaction_type, connection)?;
    get_owned_account(request.account_id, user_id, connection)?;

    let db_transaction = connection.unchecked_transaction()?;

    let origin_account_id = match request.transaction_type {
        TransactionKind::Transfer => {
            let origin_id = request.account_out_id.ok_or(Error::MissingOriginAccount)?;
            let origin = get_owned_account(origin_id, user_id, &db_transaction)?;

            // The expense leg about to be replaced still counts as available,
            // but only while the origin account stays the same.
            let add_back = if existing.origin_account_id == Some(origin.id) {
                let expense_type_id = types.id_of(TransactionKind::Expense, &db_transaction)?;
                expense_leg_value(existing.id, expense_type_id, &db_transaction)?
            } else {
                Decimal::ZERO
            };

            check_origin_balance(&origin, request.value, add_back, &db_transaction)?;

            Some(origin.id)
        }
        TransactionKind::Income | TransactionKind::Expense => None,
    };

    db_transaction.execute(
        "UPDATE \"transaction\"
         SET value = ?1, transaction_type_id = ?2, date = ?3, account_id = ?4,
             origin_account_id = ?5, notes = ?6
         WHERE id = ?7",
        (
            request.value.to_string(),
            transaction_type_id,
            request.date,
            request.account_id,
            origin_account_id,
            request.notes.as_str(),
            id,
        ),
    )?;

    delete_transaction_children(id, &db_transaction)?;

    let root = Transaction {
        id,
        value: request.value,
        transaction_type_id,
        date: request.date,
        account_id: request.account_id,
        origin_account_id,
        user_id: existing.user_id,
        notes: request.notes.clone(),
        created_at: existing.created_at,
    };

    let installments = match request.transaction_type {
        TransactionKind::Transfer => create_transfer_legs(&root, &request, types, &db_transaction)?,
        TransactionKind::Income | TransactionKind::Expense => {
            build_installments(&root, &request, &db_transaction)?
        }
    };

    db_transaction.commit()?;
    tracing::debug!(
        "replaced transaction {id} with {} installment(s)",
        installments.len()
    );

    Ok(TransactionTree {
        transaction_id: id,
        date: request.date,
        installments,
    })
}

/// Sum the value of the expense-typed installments under `transaction_id`.
fn expense_leg_value(
    transaction_id: TransactionId,
    expense_type_id: DatabaseID,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let mut statement = connection.prepare(
        "SELECT value FROM installment
         WHERE transaction_id = :id AND transaction_type_id = :type_id",
    )?;
    let values = statement.query_map(
        &[(":id", &transaction_id), (":type_id", &expense_type_id)],
        |row| decimal_column(row, 0),
    )?;

    let mut total = Decimal::ZERO;
    for value in values {
        total += value?;
    }

    Ok(total)
}
