//! Plans and records the category allocations attached to an installment.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    Error,
    category::{CategoryId, SubCategoryId},
    database_id::DatabaseID,
    money::scale,
    transaction::core::{AllocationView, insert_allocation, insert_category_link},
    transaction::request::SubRequest,
};

/// One allocation to record under a specific installment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedAllocation {
    pub value: Decimal,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<SubCategoryId>,
}

/// Work out the allocations for one installment.
///
/// Each requested sub is valued against the whole transaction, so its share
/// of a single installment is prorated by the installment's fraction of the
/// transaction value. Without subs, the installment gets a single allocation
/// of its full value carrying the request's top-level category pair.
pub(crate) fn plan_allocations(
    installment_value: Decimal,
    transaction_value: Decimal,
    subs: &[SubRequest],
    category_id: Option<CategoryId>,
    sub_category_id: Option<SubCategoryId>,
) -> Vec<PlannedAllocation> {
    if subs.is_empty() {
        return vec![PlannedAllocation {
            value: installment_value,
            category_id,
            sub_category_id,
        }];
    }

    let ratio = installment_value / transaction_value;

    subs.iter()
        .map(|sub| PlannedAllocation {
            value: scale(sub.value, ratio),
            category_id: sub.category_id,
            sub_category_id: sub.sub_category_id,
        })
        .collect()
}

/// Record the planned allocations under `installment_id`.
///
/// An allocation is linked to its category only when a category is present.
/// A sub-category given on its own is kept on the allocation's value but not
/// linked.
pub(crate) fn record_allocations(
    installment_id: DatabaseID,
    planned: &[PlannedAllocation],
    connection: &Connection,
) -> Result<Vec<AllocationView>, Error> {
    let mut views = Vec::with_capacity(planned.len());

    for plan in planned {
        let allocation = insert_allocation(installment_id, plan.value, connection)?;

        let link = match plan.category_id {
            Some(category_id) => Some(insert_category_link(
                allocation.id,
                category_id,
                plan.sub_category_id,
                connection,
            )?),
            None => None,
        };

        views.push(AllocationView {
            id: allocation.id,
            value: allocation.value,
            category_id: link.as_ref().map(|link| link.category_id),
            sub_category_id: link.as_ref().and_then(|link| link.sub_category_id),
        });
    }

    Ok(views)
}
