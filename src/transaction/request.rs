//! The request types accepted by the ledger mutators, and their validation.

use std::collections::HashSet;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::AccountId,
    category::{CategoryId, SubCategoryId, check_category_pair},
    money::round_money,
    tag::TagId,
    transaction_type::TransactionKind,
};

fn default_installments_count() -> u32 {
    1
}

/// All the fields needed to record a transaction, as submitted by a client.
///
/// The same request shape is used to create a transaction and to replace one
/// wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Whether the transaction is income, an expense, or a transfer.
    pub transaction_type: TransactionKind,
    /// The total amount of money moved.
    pub value: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// The account receiving the money (for income and transfers) or being
    /// charged (for expenses).
    pub account_id: AccountId,
    /// The account money is drawn from. Required for transfers, rejected
    /// otherwise.
    #[serde(default)]
    pub account_out_id: Option<AccountId>,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub notes: String,
    /// The category the whole value is filed under, if any.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The optional sub-category refinement of `category_id`.
    #[serde(default)]
    pub sub_category_id: Option<SubCategoryId>,
    /// The tags to attach to each installment.
    #[serde(default)]
    pub tags: Vec<TagId>,
    /// Fine-grained category allocations. When empty, the top-level category
    /// pair applies to the whole value.
    #[serde(default)]
    pub subs: Vec<SubRequest>,
    /// How many equal installments to split the value into.
    #[serde(default = "default_installments_count")]
    pub installments_count: u32,
}

/// One requested category allocation, valued against the whole transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRequest {
    /// The slice of the transaction's value being categorised.
    pub value: Decimal,
    /// The category the slice is filed under, if any.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The optional sub-category refinement of `category_id`.
    #[serde(default)]
    pub sub_category_id: Option<SubCategoryId>,
}

impl TransactionRequest {
    /// Round the monetary fields to cents, clamp the installment count to at
    /// least one, and drop repeated tags, keeping first-seen order.
    pub(crate) fn normalized(mut self) -> Self {
        self.value = round_money(self.value);

        for sub in &mut self.subs {
            sub.value = round_money(sub.value);
        }

        if self.installments_count < 1 {
            self.installments_count = 1;
        }

        let mut seen = HashSet::new();
        self.tags.retain(|tag_id| seen.insert(*tag_id));

        self
    }

    /// Check the request's shape without touching the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveValue] if the value or any sub value is zero or negative,
    /// - [Error::MissingOriginAccount] if a transfer has no origin account,
    /// - [Error::SameAccountTransfer] if a transfer names one account twice,
    /// - [Error::TransferInstallments] if a transfer asks for more than one installment,
    /// - [Error::UnexpectedOriginAccount] if a non-transfer has an origin account.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.value <= Decimal::ZERO {
            return Err(Error::NonPositiveValue(self.value));
        }

        for sub in &self.subs {
            if sub.value <= Decimal::ZERO {
                return Err(Error::NonPositiveValue(sub.value));
            }
        }

        match self.transaction_type {
            TransactionKind::Transfer => {
                let Some(origin) = self.account_out_id else {
                    return Err(Error::MissingOriginAccount);
                };

                if origin == self.account_id {
                    return Err(Error::SameAccountTransfer);
                }

                if self.installments_count > 1 {
                    return Err(Error::TransferInstallments);
                }
            }
            TransactionKind::Income | TransactionKind::Expense => {
                if self.account_out_id.is_some() {
                    return Err(Error::UnexpectedOriginAccount);
                }
            }
        }

        Ok(())
    }

    /// Check the top-level category pair and each sub's pair against the
    /// database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if a category reference is unknown,
    /// - [Error::InvalidSubCategory] if a sub-category reference is unknown,
    /// - [Error::InvalidCategoryPair] if a sub-category does not belong to its
    ///   paired category,
    /// - [Error::SqlError] if there is some other SQL error.
    pub(crate) fn validate_category_pairs(&self, connection: &Connection) -> Result<(), Error> {
        check_category_pair(self.category_id, self.sub_category_id, connection)?;

        for sub in &self.subs {
            check_category_pair(sub.category_id, sub.sub_category_id, connection)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod request_validation_tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{Error, transaction_type::TransactionKind};

    use super::{SubRequest, TransactionRequest};

    fn expense_request() -> TransactionRequest {
        TransactionRequest {
            transaction_type: TransactionKind::Expense,
            value: dec!(20.00),
            date: date!(2026 - 03 - 14),
            account_id: 1,
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
    fn accepts_a_plain_expense() {
        let request = expense_request();

        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn rejects_a_non_positive_value() {
        let mut request = expense_request();
        request.value = dec!(0);

        assert_eq!(request.validate(), Err(Error::NonPositiveValue(dec!(0))));
    }

    #[test]
    fn rejects_a_non_positive_sub_value() {
        let mut request = expense_request();
        request.subs.push(SubRequest {
            value: dec!(-5.00),
            category_id: None,
            sub_category_id: None,
        });

        assert_eq!(
            request.validate(),
            Err(Error::NonPositiveValue(dec!(-5.00)))
        );
    }

    #[test]
    fn transfer_requires_an_origin_account() {
        let mut request = expense_request();
        request.transaction_type = TransactionKind::Transfer;

        assert_eq!(request.validate(), Err(Error::MissingOriginAccount));
    }

    #[test]
    fn transfer_rejects_the_same_account_twice() {
        let mut request = expense_request();
        request.transaction_type = TransactionKind::Transfer;
        request.account_out_id = Some(request.account_id);

        assert_eq!(request.validate(), Err(Error::SameAccountTransfer));
    }

    #[test]
    fn transfer_rejects_multiple_installments() {
        let mut request = expense_request();
        request.transaction_type = TransactionKind::Transfer;
        request.account_out_id = Some(2);
        request.installments_count = 3;

        assert_eq!(request.validate(), Err(Error::TransferInstallments));
    }

    #[test]
    fn non_transfer_rejects_an_origin_account() {
        let mut request = expense_request();
        request.account_out_id = Some(2);

        assert_eq!(request.validate(), Err(Error::UnexpectedOriginAccount));
    }

    #[test]
    fn normalized_rounds_clamps_and_dedups() {
        let mut request = expense_request();
        request.value = dec!(12.345);
        request.installments_count = 0;
        request.tags = vec![3, 1, 3, 2, 1];
        request.subs.push(SubRequest {
            value: dec!(1.005),
            category_id: None,
            sub_category_id: None,
        });

        let normalized = request.normalized();

        assert_eq!(normalized.value, dec!(12.35));
        assert_eq!(normalized.installments_count, 1);
        assert_eq!(normalized.tags, vec![3, 1, 2]);
        assert_eq!(normalized.subs[0].value, dec!(1.01));
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "transaction_type": "expense",
            "value": "42.00",
            "date": "2026-03-14",
            "account_id": 7
        }"#;

        let request: TransactionRequest =
            serde_json::from_str(json).expect("Could not deserialize request");

        assert_eq!(request.transaction_type, TransactionKind::Expense);
        assert_eq!(request.value, dec!(42.00));
        assert_eq!(request.account_id, 7);
        assert_eq!(request.account_out_id, None);
        assert_eq!(request.notes, "");
        assert_eq!(request.tags, Vec::<i64>::new());
        assert!(request.subs.is_empty());
        assert_eq!(request.installments_count, 1);
    }
}
