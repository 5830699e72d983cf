//! Creating ledger transactions.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    Error,
    account::get_owned_account,
    installment_tag::replace_installment_tags,
    transaction::allocation::{plan_allocations, record_allocations},
    transaction::core::{
        InstallmentView, NewTransaction, TagRef, Transaction, TransactionTree, insert_installment,
        insert_transaction,
    },
    transaction::planner::plan_installments,
    transaction::request::TransactionRequest,
    transaction::transfer::{check_origin_balance, create_transfer_legs},
    transaction_type::{TransactionKind, TypeCache},
    user::UserID,
};

/// Record a transaction and everything underneath it.
///
/// The request is validated up front, then the root row, installments,
/// allocations, and tag links are written in a single database transaction.
/// A transfer's origin balance is checked inside that same database
/// transaction, so no interleaved write can invalidate it.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveValue], [Error::MissingOriginAccount],
///   [Error::SameAccountTransfer], [Error::TransferInstallments], or
///   [Error::UnexpectedOriginAccount] if the request's shape is invalid,
/// - [Error::InvalidCategory], [Error::InvalidSubCategory], or
///   [Error::InvalidCategoryPair] if a category reference is invalid,
/// - [Error::InvalidTag] if a tag reference is invalid,
/// - [Error::NotFound] if an account does not exist or has been deleted,
/// - [Error::Forbidden] if an account belongs to another user,
/// - [Error::InsufficientBalance] if a transfer's origin cannot fund it,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    request: TransactionRequest,
    user_id: UserID,
    types: &TypeCache,
    connection: &Connection,
) -> Result<TransactionTree, Error> {
    let request = request.normalized();
    request.validate()?;
    request.validate_category_pairs(connection)?;

    let transaction_type_id = types.id_of(request.transaction_type, connection)?;
    get_owned_account(request.account_id, user_id, connection)?;

    let db_transaction = connection.unchecked_transaction()?;

    let tree = match request.transaction_type {
        TransactionKind::Transfer => {
            let origin_id = request.account_out_id.ok_or(Error::MissingOriginAccount)?;
            let origin = get_owned_account(origin_id, user_id, &db_transaction)?;
            check_origin_balance(&origin, request.value, Decimal::ZERO, &db_transaction)?;

            let root = insert_transaction(
                &NewTransaction {
                    value: request.value,
                    transaction_type_id,
                    date: request.date,
                    account_id: request.account_id,
                    origin_account_id: Some(origin.id),
                    user_id,
                    notes: request.notes.clone(),
                },
                &db_transaction,
            )?;
            let installments = create_transfer_legs(&root, &request, types, &db_transaction)?;

            TransactionTree {
                transaction_id: root.id,
                date: root.date,
                installments,
            }
        }
        TransactionKind::Income | TransactionKind::Expense => {
            let root = insert_transaction(
                &NewTransaction {
                    value: request.value,
                    transaction_type_id,
                    date: request.date,
                    account_id: request.account_id,
                    origin_account_id: None,
                    user_id,
                    notes: request.notes.clone(),
                },
                &db_transaction,
            )?;
            let installments = build_installments(&root, &request, &db_transaction)?;

            TransactionTree {
                transaction_id: root.id,
                date: root.date,
                installments,
            }
        }
    };

    db_transaction.commit()?;
    tracing::debug!(
        "recorded transaction {} with {} installment(s)",
        tree.transaction_id,
        tree.installments.len()
    );

    Ok(tree)
}

/// Record the installments, allocations, and tag links for a non-transfer
/// root row, inside the caller's open database transaction.
pub(crate) fn build_installments(
    root: &Transaction,
    request: &TransactionRequest,
    connection: &Connection,
) -> Result<Vec<InstallmentView>, Error> {
    let values = plan_installments(root.value, request.installments_count);
    let tags: Vec<TagRef> = request.tags.iter().map(|&id| TagRef { id }).collect();
    let mut views = Vec::with_capacity(values.len());

    for value in values {
        let installment = insert_installment(
            root.id,
            value,
            root.transaction_type_id,
            root.account_id,
            root.user_id,
            connection,
        )?;

        let planned = plan_allocations(
            installment.value,
            root.value,
            &request.subs,
            request.category_id,
            request.sub_category_id,
        );
        let subs = record_allocations(installment.id, &planned, connection)?;

        replace_installment_tags(installment.id, &request.tags, connection)?;

        views.push(InstallmentView {
            id: installment.id,
            value: installment.value,
            transaction_type_id: installment.transaction_type_id,
            account_id: installment.account_id,
            transaction_id: installment.transaction_id,
            date: root.date,
            subs,
            tags: tags.clone(),
        });
    }

    Ok(views)
}
