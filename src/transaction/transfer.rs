//! Transfer handling: the origin balance precondition and the paired legs.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    Error,
    account::Account,
    installment_tag::replace_installment_tags,
    reports::account_balance,
    transaction::allocation::{plan_allocations, record_allocations},
    transaction::core::{InstallmentView, TagRef, Transaction, insert_installment},
    transaction::request::TransactionRequest,
    transaction_type::{TransactionKind, TypeCache},
};

/// Check that `origin` can fund a transfer of `requested`.
///
/// `add_back` is the value of a previously recorded expense leg that is being
/// replaced and therefore still counts as available. The comparison allows
/// 1e-6 of slack for rounding accumulated in derived balances.
///
/// # Errors
/// This function will return a:
/// - [Error::InsufficientBalance] if the origin cannot cover the transfer,
/// - [Error::SqlError] if there is some other SQL error.
pub(crate) fn check_origin_balance(
    origin: &Account,
    requested: Decimal,
    add_back: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    let available = account_balance(origin.id, None, connection)? + add_back;
    let tolerance = Decimal::new(1, 6);

    if available + tolerance < requested {
        tracing::debug!(
            "transfer rejected: {requested} requested but only {available} available on account {}",
            origin.id
        );
        return Err(Error::InsufficientBalance {
            available,
            requested,
        });
    }

    Ok(())
}

/// Record the two installments of a transfer: an income on the destination
/// account and an expense on the origin, both for the full value.
///
/// Allocations are recorded on the income leg only. Tags go on both legs.
pub(crate) fn create_transfer_legs(
    root: &Transaction,
    request: &TransactionRequest,
    types: &TypeCache,
    connection: &Connection,
) -> Result<Vec<InstallmentView>, Error> {
    let origin_account_id = root.origin_account_id.ok_or(Error::MissingOriginAccount)?;

    let income_type = types.id_of(TransactionKind::Income, connection)?;
    let expense_type = types.id_of(TransactionKind::Expense, connection)?;

    let income_leg = insert_installment(
        root.id,
        root.value,
        income_type,
        root.account_id,
        root.user_id,
        connection,
    )?;
    let expense_leg = insert_installment(
        root.id,
        root.value,
        expense_type,
        origin_account_id,
        root.user_id,
        connection,
    )?;

    let planned = plan_allocations(
        income_leg.value,
        root.value,
        &request.subs,
        request.category_id,
        request.sub_category_id,
    );
    let subs = record_allocations(income_leg.id, &planned, connection)?;

    replace_installment_tags(income_leg.id, &request.tags, connection)?;
    replace_installment_tags(expense_leg.id, &request.tags, connection)?;
    let tags: Vec<TagRef> = request.tags.iter().map(|&id| TagRef { id }).collect();

    Ok(vec![
        InstallmentView {
            id: income_leg.id,
            value: income_leg.value,
            transaction_type_id: income_leg.transaction_type_id,
            account_id: income_leg.account_id,
            transaction_id: income_leg.transaction_id,
            date: root.date,
            subs,
            tags: tags.clone(),
        },
        InstallmentView {
            id: expense_leg.id,
            value: expense_leg.value,
            transaction_type_id: expense_leg.transaction_type_id,
            account_id: expense_leg.account_id,
            transaction_id: expense_leg.transaction_id,
            date: root.date,
            subs: Vec::new(),
            tags,
        },
    ])
}
