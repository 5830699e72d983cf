//! Read queries that assemble transactions and their children into trees.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::DatabaseID,
    db::decimal_column,
    reports::ReportWindow,
    transaction::core::{
        AllocationView, InstallmentView, TagRef, Transaction, TransactionId, TransactionTree,
        get_owned_transaction, map_installment_row, map_transaction_row,
    },
    user::UserID,
};

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in order of increasing date.
    Ascending,
    /// Sort in order of decreasing date.
    Descending,
}

/// Retrieve a transaction with its installments, allocations, and tags.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::Forbidden] if the transaction belongs to another user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_transaction_tree(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<TransactionTree, Error> {
    let root = get_owned_transaction(id, user_id, connection)?;

    load_tree(&root, connection)
}

/// List a user's transaction trees with dates inside `window`, inclusive.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn list_transaction_trees(
    user_id: UserID,
    window: &ReportWindow,
    sort_order: SortOrder,
    connection: &Connection,
) -> Result<Vec<TransactionTree>, Error> {
    let order_clause = match sort_order {
        SortOrder::Ascending => "ORDER BY date ASC",
        SortOrder::Descending => "ORDER BY date DESC",
    };

    // Sort by date, and then ID to keep transaction order stable after updates
    let query = format!(
        "SELECT id, value, transaction_type_id, date, account_id, origin_account_id, user_id, notes, created_at
         FROM \"transaction\"
         WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
         {order_clause}, id ASC"
    );

    let roots = connection
        .prepare(&query)?
        .query_map(
            (
                user_id.as_i64(),
                window.from.to_string(),
                window.to.to_string(),
            ),
            map_transaction_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    roots
        .iter()
        .map(|root| load_tree(root, connection))
        .collect()
}

/// Assemble the response tree for a root row already checked for access.
fn load_tree(root: &Transaction, connection: &Connection) -> Result<TransactionTree, Error> {
    let installments = connection
        .prepare(
            "SELECT id, transaction_id, value, transaction_type_id, account_id, user_id
             FROM installment WHERE transaction_id = :id ORDER BY id ASC",
        )?
        .query_map(&[(":id", &root.id)], map_installment_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut views = Vec::with_capacity(installments.len());

    for installment in installments {
        let subs = load_allocations(installment.id, connection)?;
        let tags = load_tags(installment.id, connection)?;

        views.push(InstallmentView {
            id: installment.id,
            value: installment.value,
            transaction_type_id: installment.transaction_type_id,
            account_id: installment.account_id,
            transaction_id: installment.transaction_id,
            date: root.date,
            subs,
            tags,
        });
    }

    Ok(TransactionTree {
        transaction_id: root.id,
        date: root.date,
        installments: views,
    })
}

fn load_allocations(
    installment_id: DatabaseID,
    connection: &Connection,
) -> Result<Vec<AllocationView>, Error> {
    let views = connection
        .prepare(
            "SELECT allocation.id, allocation.value, category_link.category_id, category_link.sub_category_id
             FROM allocation
             LEFT JOIN category_link ON category_link.allocation_id = allocation.id
             WHERE allocation.installment_id = :id
             ORDER BY allocation.id ASC",
        )?
        .query_map(&[(":id", &installment_id)], |row| {
            Ok(AllocationView {
                id: row.get(0)?,
                value: decimal_column(row, 1)?,
                category_id: row.get(2)?,
                sub_category_id: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(views)
}

fn load_tags(installment_id: DatabaseID, connection: &Connection) -> Result<Vec<TagRef>, Error> {
    let tags = connection
        .prepare(
            "SELECT tag_id FROM installment_tag WHERE installment_id = :id ORDER BY id ASC",
        )?
        .query_map(&[(":id", &installment_id)], |row| {
            Ok(TagRef { id: row.get(0)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tags)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod query_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        account::{Account, AccountKind, create_account},
        category::create_category,
        db::initialize,
        reports::ReportWindow,
        tag::{TagName, create_tag},
        transaction::create::create_transaction,
        transaction::request::{SubRequest, TransactionRequest},
        transaction_type::{TransactionKind, TypeCache},
        user::{User, create_user},
    };

    use super::{SortOrder, get_transaction_tree, list_transaction_trees};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().expect("Could not open database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn seed_user_with_account(connection: &Connection) -> (User, Account) {
        let user = create_user("alice", connection).expect("Could not create user");
        let account = create_account(
            user.id,
            "Everyday",
            AccountKind::Checking,
            dec!(0),
            connection,
        )
        .expect("Could not create account");

        (user, account)
    }

    fn expense_request(account_id: i64, value: Decimal) -> TransactionRequest {
        TransactionRequest {
            transaction_type: TransactionKind::Expense,
            value,
            date: date!(2026 - 05 - 10),
            account_id,
            account_out_id: None,
            notes: String::new(),
            category_id: None,
            sub_category_id: None,
            tags: Vec::new(),
            subs: Vec::new(),
            installments_count: 1,
        }
    }

    #[test]
    fn a_fetched_tree_matches_the_created_one() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection);
        let types = TypeCache::new();
        let category = create_category("Food", &connection).expect("Could not create category");
        let tag = create_tag(TagName::new_unchecked("weekly"), &connection)
            .expect("Could not create tag");

        let mut request = expense_request(account.id, dec!(60.00));
        request.installments_count = 2;
        request.tags = vec![tag.id];
        request.subs = vec![SubRequest {
            value: dec!(60.00),
            category_id: Some(category.id),
            sub_category_id: None,
        }];

        let created = create_transaction(request, user.id, &types, &connection)
            .expect("Could not create transaction");

        let fetched = get_transaction_tree(created.transaction_id, user.id, &connection)
            .expect("Could not fetch tree");

        assert_eq!(fetched, created);
    }

    #[test]
    fn fetching_another_users_tree_is_forbidden() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection);
        let intruder = create_user("mallory", &connection).expect("Could not create user");
        let types = TypeCache::new();

        let created = create_transaction(
            expense_request(account.id, dec!(20.00)),
            user.id,
            &types,
            &connection,
        )
        .expect("Could not create transaction");

        let result = get_transaction_tree(created.transaction_id, intruder.id, &connection);

        assert_eq!(result, Err(Error::Forbidden));
    }

    #[test]
    fn fetching_an_unknown_tree_is_not_found() {
        let connection = get_test_connection();
        let (user, _) = seed_user_with_account(&connection);

        let result = get_transaction_tree(999, user.id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn listing_returns_only_trees_inside_the_window() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection);
        let types = TypeCache::new();

        for (value, date) in [
            (dec!(10.00), date!(2026 - 04 - 30)),
            (dec!(20.00), date!(2026 - 05 - 01)),
            (dec!(30.00), date!(2026 - 05 - 31)),
            (dec!(40.00), date!(2026 - 06 - 01)),
        ] {
            let mut request = expense_request(account.id, value);
            request.date = date;
            create_transaction(request, user.id, &types, &connection)
                .expect("Could not create transaction");
        }

        let window = ReportWindow {
            from: date!(2026 - 05 - 01),
            to: date!(2026 - 05 - 31),
        };
        let trees = list_transaction_trees(user.id, &window, SortOrder::Ascending, &connection)
            .expect("Could not list trees");

        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].date, date!(2026 - 05 - 01));
        assert_eq!(trees[1].date, date!(2026 - 05 - 31));
    }

    #[test]
    fn listing_is_scoped_to_the_user() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection);
        let other = create_user("bob", &connection).expect("Could not create user");
        let other_account = create_account(
            other.id,
            "Everyday",
            AccountKind::Checking,
            dec!(0),
            &connection,
        )
        .expect("Could not create account");
        let types = TypeCache::new();

        create_transaction(
            expense_request(account.id, dec!(20.00)),
            user.id,
            &types,
            &connection,
        )
        .expect("Could not create transaction");
        create_transaction(
            expense_request(other_account.id, dec!(30.00)),
            other.id,
            &types,
            &connection,
        )
        .expect("Could not create transaction");

        let window = ReportWindow {
            from: date!(2026 - 05 - 01),
            to: date!(2026 - 05 - 31),
        };
        let trees = list_transaction_trees(user.id, &window, SortOrder::Descending, &connection)
            .expect("Could not list trees");

        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].installments[0].value, dec!(20.00));
    }

    #[test]
    fn listing_keeps_same_date_trees_in_id_order() {
        let connection = get_test_connection();
        let (user, account) = seed_user_with_account(&connection);
        let types = TypeCache::new();

        let first = create_transaction(
            expense_request(account.id, dec!(20.00)),
            user.id,
            &types,
            &connection,
        )
        .expect("Could not create transaction");
        let second = create_transaction(
            expense_request(account.id, dec!(30.00)),
            user.id,
            &types,
            &connection,
        )
        .expect("Could not create transaction");

        let window = ReportWindow {
            from: date!(2026 - 05 - 10),
            to: date!(2026 - 05 - 10),
        };
        let trees = list_transaction_trees(user.id, &window, SortOrder::Descending, &connection)
            .expect("Could not list trees");

        let ids: Vec<i64> = trees.iter().map(|tree| tree.transaction_id).collect();
        assert_eq!(ids, vec![first.transaction_id, second.transaction_id]);
    }
}
