//! Centavo is the transaction ledger core of a personal finance tracker.
//!
//! Users record accounts and categorized income/expense/transfer transactions,
//! optionally split across sub-categories and installments. This library owns
//! the write-path for that ledger: deciding how many rows a request
//! materializes, splitting monetary values without losing cents, enforcing the
//! paired-leg invariants for transfers, and keeping derived aggregates
//! (account balances, monthly sums, category totals) consistent under create,
//! update, and delete.
//!
//! The HTTP layer, request authentication, and all rendering live outside this
//! crate; callers invoke the operations here with an already-authenticated
//! [UserID] and a [rusqlite::Connection].

#![warn(missing_docs)]

use rust_decimal::Decimal;

mod account;
mod category;
mod database_id;
mod db;
mod installment_tag;
mod money;
mod reports;
mod tag;
mod transaction;
mod transaction_type;
mod user;

pub use account::{
    Account, AccountId, AccountKind, create_account, get_account, get_owned_account,
    list_accounts, soft_delete_account,
};
pub use category::{
    Category, CategoryId, SubCategory, SubCategoryId, create_category, create_sub_category,
    get_category, get_sub_category,
};
pub use database_id::DatabaseID;
pub use db::initialize as initialize_db;
pub use installment_tag::{get_installment_tags, get_tag_installment_count, set_installment_tags};
pub use money::{round_money, scale, split_equally};
pub use reports::{
    CategoryTotal, MonthlySummary, ReportWindow, WindowTotals, account_balance, category_totals,
    monthly_series, window_totals,
};
pub use tag::{Tag, TagId, TagName, create_tag, delete_tag, get_all_tags, get_tag};
pub use transaction::{
    Allocation, AllocationView, CategoryLink, DeleteOutcome, Installment, InstallmentView,
    SortOrder, SubRequest, TagRef, Transaction, TransactionId, TransactionRequest,
    TransactionTree, create_transaction, delete_transaction, get_transaction,
    get_transaction_tree, list_transaction_trees, update_transaction,
};
pub use transaction_type::{TransactionKind, TypeCache};
pub use user::{User, UserID, create_user, get_user_by_id};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A monetary value was zero or negative where a positive amount is
    /// required.
    #[error("{0} is not a valid monetary value, amounts must be greater than zero")]
    NonPositiveValue(Decimal),

    /// A transfer request did not specify the account the money comes from.
    #[error("account_out_id is required for transfers")]
    MissingOriginAccount,

    /// A non-transfer request specified an origin account.
    ///
    /// Only transfers move money between two accounts, so `account_out_id`
    /// must be absent for income and expense transactions.
    #[error("account_out_id is only valid for transfers")]
    UnexpectedOriginAccount,

    /// A transfer named the same account as both origin and destination.
    #[error("a transfer must use two different accounts")]
    SameAccountTransfer,

    /// A transfer requested more than one installment.
    ///
    /// Transfers always materialize exactly two legs, so splitting them into
    /// installments is not allowed.
    #[error("installments_count must be 1 for transfers")]
    TransferInstallments,

    /// The requested sub-category does not belong to the requested category.
    #[error("sub-category {sub_category_id} does not belong to category {category_id}")]
    InvalidCategoryPair {
        /// The category the caller paired the sub-category with.
        category_id: DatabaseID,
        /// The sub-category that belongs to a different (or no) category.
        sub_category_id: DatabaseID,
    },

    /// The category ID did not match a valid category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(DatabaseID),

    /// The sub-category ID did not match a valid sub-category.
    #[error("the sub-category ID {0} does not refer to a valid sub-category")]
    InvalidSubCategory(DatabaseID),

    /// The tag ID used on a transaction did not match a valid tag.
    #[error("the tag ID {0} does not refer to a valid tag")]
    InvalidTag(DatabaseID),

    /// An empty string was used to create a tag name.
    #[error("Tag name cannot be empty")]
    EmptyTagName,

    /// An empty string was used to create a category or sub-category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The specified tag name already exists in the database.
    #[error("the tag \"{0}\" already exists in the database")]
    DuplicateTagName(String),

    /// The specified category name already exists within the same parent.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryName(String),

    /// The specified account name already exists for this user.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// The requested resource belongs to another user.
    ///
    /// The message deliberately carries no detail about the resource so the
    /// client cannot tell whether it exists.
    #[error("forbidden")]
    Forbidden,

    /// The origin account does not hold enough money to cover a transfer.
    ///
    /// This is a recoverable, user-facing condition: the caller should show
    /// the amounts and let the user retry with different input.
    #[error("insufficient origin balance")]
    InsufficientBalance {
        /// The balance available on the origin account.
        available: Decimal,
        /// The transfer value that was requested.
        requested: Decimal,
    },

    /// The requested resource could not be found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP-style status code the controller layer should answer with.
    ///
    /// Insufficient balance maps to 422 so clients can distinguish the
    /// recoverable domain failure from plain validation errors (400).
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Forbidden => 403,
            Error::NotFound => 404,
            Error::InsufficientBalance { .. } => 422,
            Error::SqlError(_) => 500,
            _ => 400,
        }
    }
}

#[cfg(test)]
mod error_tests {
    use rust_decimal_macros::dec;

    use super::Error;

    #[test]
    fn insufficient_balance_message_is_stable() {
        let error = Error::InsufficientBalance {
            available: dec!(10.00),
            requested: dec!(25.00),
        };

        // Controllers serialize this Display string directly into the
        // `{"error": ...}` body, so the text is part of the contract.
        assert_eq!(error.to_string(), "insufficient origin balance");
        assert_eq!(error.status_code(), 422);
    }

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        assert_eq!(Error::Forbidden.status_code(), 403);
        assert_eq!(Error::NotFound.status_code(), 404);
        assert_eq!(Error::SameAccountTransfer.status_code(), 400);
        assert_eq!(
            Error::SqlError(rusqlite::Error::InvalidQuery).status_code(),
            500
        );
    }

    #[test]
    fn forbidden_message_leaks_no_detail() {
        assert_eq!(Error::Forbidden.to_string(), "forbidden");
    }
}
