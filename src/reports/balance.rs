//! Derived account balances.
//!
//! Balances are never stored. Every read folds the account's installments
//! back into a figure, so there is no cached balance to drift out of sync
//! with the ledger rows.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    account::{AccountId, get_account},
    database_id::DatabaseID,
    db::decimal_column,
    transaction_type::TransactionKind,
};

/// Compute the balance of an account from its opening balance and its
/// installments.
///
/// Income installments add to the balance and expense installments subtract
/// from it. A transfer materializes an income installment on the destination
/// account and an expense installment on the origin account, so both sides of
/// a transfer are covered without special handling. When `through` is given,
/// only installments whose parent transaction is dated on or before it are
/// counted.
///
/// Values are summed as [Decimal]s, so the result carries no floating point
/// residue.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `account_id` does not refer to an account,
/// - [Error::SqlError] if there is some other SQL error.
pub fn account_balance(
    account_id: AccountId,
    through: Option<Date>,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let account = get_account(account_id, connection)?;
    let through = through.map(|date| date.to_string());

    let mut statement = connection.prepare(
        "SELECT installment.value, installment.transaction_type_id
        FROM installment
        INNER JOIN \"transaction\" ON \"transaction\".id = installment.transaction_id
        WHERE installment.account_id = ?1 AND (?2 IS NULL OR \"transaction\".date <= ?2)",
    )?;

    let rows = statement.query_map((account_id, &through), |row| {
        let value = decimal_column(row, 0)?;
        let transaction_type_id: DatabaseID = row.get(1)?;

        Ok((value, transaction_type_id))
    })?;

    let mut balance = account.opening_balance;

    for row in rows {
        let (value, transaction_type_id) = row?;

        if transaction_type_id == TransactionKind::Income.id() {
            balance += value;
        } else if transaction_type_id == TransactionKind::Expense.id() {
            balance -= value;
        }
    }

    Ok(balance)
}

#[cfg(test)]
mod account_balance_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, macros::date};

    use crate::{
        Error,
        account::{Account, AccountId, AccountKind, create_account},
        db::initialize,
        transaction::{TransactionRequest, create_transaction},
        transaction_type::{TransactionKind, TypeCache},
        user::{User, create_user},
    };

    use super::account_balance;

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().expect("Could not open database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn seed_user_with_account(connection: &Connection, opening_balance: Decimal) -> (User, Account) {
        let user = create_user("alice", connection).expect("Could not create user");
        let account = create_account(
            user.id,
            "Everyday",
            AccountKind::Checking,
            opening_balance,
            connection,
        )
        .expect("Could not create account");

        (user, account)
    }

    fn record(
        user: &User,
        kind: TransactionKind,
        value: Decimal,
        date: Date,
        account_id: AccountId,
        account_out_id: Option<AccountId>,
        types: &TypeCache,
        connection: &Connection,
    ) {
        let request = TransactionRequest {
            transaction_type: kind,
            value,
            date,
            account_id,
            account_out_id,
            notes: String::new(),
            category_id: None,
            sub_category_id: None,
            tags: Vec::new(),
            subs: Vec::new(),
            installments_count: 1,
        };

        create_transaction(request, user.id, types, connection)
            .expect("Could not create transaction");
    }

    #[test]
    fn returns_the_opening_balance_when_there_are_no_transactions() {
        let connection = get_test_connection();
        let (_, account) = seed_user_with_account(&connection, dec!(123.45));

        let balance = account_balance(account.id, None, &connection)
            .expect("Could not compute balance");

        assert_eq!(balance, dec!(123.45));
    }

    #[test]
    fn income_adds_and_expense_subtracts() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection, dec!(100.00));
        let types = TypeCache::new();

        record(
            &user,
            TransactionKind::Income,
            dec!(50.25),
            date!(2026 - 05 - 10),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Expense,
            dec!(30.10),
            date!(2026 - 05 - 12),
            account.id,
            None,
            &types,
            &connection,
        );

        let balance = account_balance(account.id, None, &connection)
            .expect("Could not compute balance");

        assert_eq!(balance, dec!(120.15));
    }

    #[test]
    fn transfers_move_money_between_accounts() {
        let connection = get_test_connection();
        let (user, origin) = seed_user_with_account(&connection, dec!(100.00));
        let destination = create_account(
            user.id,
            "Savings",
            AccountKind::Savings,
            Decimal::ZERO,
            &connection,
        )
        .expect("Could not create account");
        let types = TypeCache::new();

        record(
            &user,
            TransactionKind::Transfer,
            dec!(40.00),
            date!(2026 - 05 - 10),
            destination.id,
            Some(origin.id),
            &types,
            &connection,
        );

        let origin_balance = account_balance(origin.id, None, &connection)
            .expect("Could not compute balance");
        let destination_balance = account_balance(destination.id, None, &connection)
            .expect("Could not compute balance");

        assert_eq!(origin_balance, dec!(60.00));
        assert_eq!(destination_balance, dec!(40.00));
    }

    #[test]
    fn date_bound_excludes_later_transactions() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection, dec!(10.00));
        let types = TypeCache::new();

        record(
            &user,
            TransactionKind::Income,
            dec!(50.00),
            date!(2026 - 05 - 10),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Expense,
            dec!(20.00),
            date!(2026 - 05 - 20),
            account.id,
            None,
            &types,
            &connection,
        );

        let balance = account_balance(account.id, Some(date!(2026 - 05 - 15)), &connection)
            .expect("Could not compute balance");

        assert_eq!(balance, dec!(60.00));
    }

    #[test]
    fn every_installment_is_counted_once() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection, Decimal::ZERO);
        let types = TypeCache::new();

        let request = TransactionRequest {
            transaction_type: TransactionKind::Income,
            value: dec!(100.00),
            date: date!(2026 - 05 - 10),
            account_id: account.id,
            account_out_id: None,
            notes: String::new(),
            category_id: None,
            sub_category_id: None,
            tags: Vec::new(),
            subs: Vec::new(),
            installments_count: 3,
        };
        create_transaction(request, user.id, &types, &connection)
            .expect("Could not create transaction");

        let balance = account_balance(account.id, None, &connection)
            .expect("Could not compute balance");

        assert_eq!(balance, dec!(100.00));
    }

    #[test]
    fn fails_when_the_account_does_not_exist() {
        let connection = get_test_connection();

        let result = account_balance(999, None, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }
}
