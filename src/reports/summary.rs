//! Windowed income/expense summaries and category totals.
//!
//! All aggregation here joins installments back to their root transaction and
//! skips transfer-rooted rows. A transfer materializes an income leg and an
//! expense leg, and counting those would inflate both sides of every summary
//! by the transferred amount.

use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    category::CategoryId,
    database_id::DatabaseID,
    db::decimal_column,
    money::round_money,
    transaction_type::TransactionKind,
    user::UserID,
};

/// An inclusive date range for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// The first date included in the window.
    pub from: Date,
    /// The last date included in the window.
    pub to: Date,
}

impl ReportWindow {
    /// The window from the first day of `today`'s month through `today`.
    pub fn current_month(today: Date) -> Self {
        // Day one is valid in every month.
        let from = today.replace_day(1).unwrap();

        Self { from, to: today }
    }

    /// The window covering `months` whole calendar months, ending at `today`.
    ///
    /// `trailing_months(today, 1)` is the same window as
    /// [ReportWindow::current_month]; a count of zero is treated as one.
    pub fn trailing_months(today: Date, months: u32) -> Self {
        // Day one is valid in every month.
        let mut from = today.replace_day(1).unwrap();

        for _ in 1..months {
            from = previous_month_start(from);
        }

        Self { from, to: today }
    }
}

fn previous_month_start(month_start: Date) -> Date {
    let month = month_start.month().previous();
    let year = match month {
        Month::December => month_start.year() - 1,
        _ => month_start.year(),
    };

    // Day one is valid in every month.
    Date::from_calendar_date(year, month, 1).unwrap()
}

/// Total income and expense recorded over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTotals {
    /// The sum of income installment values.
    pub income: Decimal,
    /// The sum of expense installment values.
    pub expense: Decimal,
}

impl WindowTotals {
    fn add(&mut self, value: Decimal, transaction_type_id: DatabaseID) {
        if transaction_type_id == TransactionKind::Income.id() {
            self.income += value;
        } else if transaction_type_id == TransactionKind::Expense.id() {
            self.expense += value;
        }
    }
}

/// The income and expense recorded in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// The first day of the month.
    pub month: Date,
    /// The sum of income installment values in the month.
    pub income: Decimal,
    /// The sum of expense installment values in the month.
    pub expense: Decimal,
}

/// One category's share of the windowed expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The ID of the category.
    pub category_id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The sum of expense allocation values linked to the category.
    pub total: Decimal,
    /// The category's percentage of all categorised expenses in the window,
    /// rounded to two decimal places.
    pub percentage: Decimal,
}

struct SummaryRow {
    value: Decimal,
    transaction_type_id: DatabaseID,
    date: Date,
}

fn windowed_installments(
    user_id: UserID,
    window: &ReportWindow,
    connection: &Connection,
) -> Result<Vec<SummaryRow>, Error> {
    let mut statement = connection.prepare(
        "SELECT installment.value, installment.transaction_type_id, \"transaction\".date
        FROM installment
        INNER JOIN \"transaction\" ON \"transaction\".id = installment.transaction_id
        WHERE \"transaction\".user_id = ?1
            AND \"transaction\".date BETWEEN ?2 AND ?3
            AND \"transaction\".transaction_type_id <> ?4",
    )?;

    let rows = statement.query_map(
        (
            user_id.as_i64(),
            window.from.to_string(),
            window.to.to_string(),
            TransactionKind::Transfer.id(),
        ),
        |row| {
            let value = decimal_column(row, 0)?;
            let transaction_type_id: DatabaseID = row.get(1)?;
            let date: Date = row.get(2)?;

            Ok(SummaryRow {
                value,
                transaction_type_id,
                date,
            })
        },
    )?;

    rows.map(|row| row.map_err(Error::from)).collect()
}

/// Sum a user's income and expense over `window`.
///
/// Transfer-rooted installments are excluded so money moved between the
/// user's own accounts does not count as income or expense.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn window_totals(
    user_id: UserID,
    window: &ReportWindow,
    connection: &Connection,
) -> Result<WindowTotals, Error> {
    let mut totals = WindowTotals::default();

    for row in windowed_installments(user_id, window, connection)? {
        totals.add(row.value, row.transaction_type_id);
    }

    Ok(totals)
}

/// Break a user's income and expense over `window` down by calendar month.
///
/// Months with no installments are omitted; the result is ordered
/// chronologically. Transfer-rooted installments are excluded as in
/// [window_totals].
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn monthly_series(
    user_id: UserID,
    window: &ReportWindow,
    connection: &Connection,
) -> Result<Vec<MonthlySummary>, Error> {
    let mut buckets: BTreeMap<Date, WindowTotals> = BTreeMap::new();

    for row in windowed_installments(user_id, window, connection)? {
        // Day one is valid in every month.
        let month = row.date.replace_day(1).unwrap();

        buckets
            .entry(month)
            .or_default()
            .add(row.value, row.transaction_type_id);
    }

    Ok(buckets
        .into_iter()
        .map(|(month, totals)| MonthlySummary {
            month,
            income: totals.income,
            expense: totals.expense,
        })
        .collect())
}

/// Total a user's categorised expenses over `window`, grouped by category.
///
/// Only expense installments' allocations that are linked to a category are
/// counted; uncategorised spending does not appear and does not dilute the
/// percentages. The result is ordered largest total first, with ties broken
/// by category name.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn category_totals(
    user_id: UserID,
    window: &ReportWindow,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let mut statement = connection.prepare(
        "SELECT category.id, category.name, allocation.value
        FROM allocation
        INNER JOIN category_link ON category_link.allocation_id = allocation.id
        INNER JOIN category ON category.id = category_link.category_id
        INNER JOIN installment ON installment.id = allocation.installment_id
        INNER JOIN \"transaction\" ON \"transaction\".id = installment.transaction_id
        WHERE \"transaction\".user_id = ?1
            AND \"transaction\".date BETWEEN ?2 AND ?3
            AND installment.transaction_type_id = ?4",
    )?;

    let rows = statement.query_map(
        (
            user_id.as_i64(),
            window.from.to_string(),
            window.to.to_string(),
            TransactionKind::Expense.id(),
        ),
        |row| {
            let category_id: CategoryId = row.get(0)?;
            let name: String = row.get(1)?;
            let value = decimal_column(row, 2)?;

            Ok((category_id, name, value))
        },
    )?;

    let mut totals: HashMap<CategoryId, (String, Decimal)> = HashMap::new();
    let mut categorised_total = Decimal::ZERO;

    for row in rows {
        let (category_id, name, value) = row?;

        totals
            .entry(category_id)
            .or_insert_with(|| (name, Decimal::ZERO))
            .1 += value;
        categorised_total += value;
    }

    let mut results: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, (name, total))| {
            let percentage = if categorised_total.is_zero() {
                Decimal::ZERO
            } else {
                round_money(total * Decimal::ONE_HUNDRED / categorised_total)
            };

            CategoryTotal {
                category_id,
                name,
                total,
                percentage,
            }
        })
        .collect();

    results.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    Ok(results)
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod window_totals_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, macros::date};

    use crate::{
        account::{Account, AccountId, AccountKind, create_account},
        db::initialize,
        transaction::{TransactionRequest, create_transaction},
        transaction_type::{TransactionKind, TypeCache},
        user::{User, create_user},
    };

    use super::{ReportWindow, WindowTotals, window_totals};

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
    fn sums_income_and_expense_separately() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection, Decimal::ZERO);
        let types = TypeCache::new();

        record(
            &user,
            TransactionKind::Income,
            dec!(80.00),
            date!(2026 - 05 - 05),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Income,
            dec!(20.00),
            date!(2026 - 05 - 12),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Expense,
            dec!(35.50),
            date!(2026 - 05 - 20),
            account.id,
            None,
            &types,
            &connection,
        );

        let window = ReportWindow {
            from: date!(2026 - 05 - 01),
            to: date!(2026 - 05 - 31),
        };
        let totals = window_totals(user.id, &window, &connection)
            .expect("Could not compute window totals");

        assert_eq!(
            totals,
            WindowTotals {
                income: dec!(100.00),
                expense: dec!(35.50),
            }
        );
    }

    #[test]
    fn transfers_count_as_neither_income_nor_expense() {
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
            TransactionKind::Income,
            dec!(100.00),
            date!(2026 - 05 - 05),
            origin.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Expense,
            dec!(40.00),
            date!(2026 - 05 - 10),
            origin.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Transfer,
            dec!(25.00),
            date!(2026 - 05 - 15),
            destination.id,
            Some(origin.id),
            &types,
            &connection,
        );

        let window = ReportWindow {
            from: date!(2026 - 05 - 01),
            to: date!(2026 - 05 - 31),
        };
        let totals = window_totals(user.id, &window, &connection)
            .expect("Could not compute window totals");

        assert_eq!(
            totals,
            WindowTotals {
                income: dec!(100.00),
                expense: dec!(40.00),
            }
        );
    }

    #[test]
    fn the_window_bounds_are_inclusive() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection, Decimal::ZERO);
        let types = TypeCache::new();

        record(
            &user,
            TransactionKind::Income,
            dec!(1.00),
            date!(2026 - 04 - 30),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Income,
            dec!(2.00),
            date!(2026 - 05 - 01),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Income,
            dec!(4.00),
            date!(2026 - 05 - 31),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &user,
            TransactionKind::Income,
            dec!(8.00),
            date!(2026 - 06 - 01),
            account.id,
            None,
            &types,
            &connection,
        );

        let window = ReportWindow {
            from: date!(2026 - 05 - 01),
            to: date!(2026 - 05 - 31),
        };
        let totals = window_totals(user.id, &window, &connection)
            .expect("Could not compute window totals");

        assert_eq!(totals.income, dec!(6.00));
    }

    #[test]
    fn only_counts_the_requesting_users_transactions() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection, Decimal::ZERO);
        let other_user = create_user("bob", &connection).expect("Could not create user");
        let other_account = create_account(
            other_user.id,
            "Everyday",
            AccountKind::Checking,
            Decimal::ZERO,
            &connection,
        )
        .expect("Could not create account");
        let types = TypeCache::new();

        record(
            &user,
            TransactionKind::Income,
            dec!(10.00),
            date!(2026 - 05 - 05),
            account.id,
            None,
            &types,
            &connection,
        );
        record(
            &other_user,
            TransactionKind::Income,
            dec!(99.00),
            date!(2026 - 05 - 05),
            other_account.id,
            None,
            &types,
            &connection,
        );

        let window = ReportWindow {
            from: date!(2026 - 05 - 01),
            to: date!(2026 - 05 - 31),
        };
        let totals = window_totals(user.id, &window, &connection)
            .expect("Could not compute window totals");

        assert_eq!(totals.income, dec!(10.00));
    }
}
