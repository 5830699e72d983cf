//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The core models for root rows, installments, allocations, and category
//!   links
//! - The request types accepted by the mutators, with their validation
//! - Database functions for recording, replacing, deleting, and reading whole
//!   transaction trees

mod allocation;
mod core;
mod create;
mod delete;
mod planner;
mod query;
mod request;
mod transfer;
mod update;

pub use core::{
    Allocation, AllocationView, CategoryLink, Installment, InstallmentView, TagRef, Transaction,
    TransactionId, TransactionTree, create_allocation_table, create_category_link_table,
    create_installment_table, create_transaction_table, get_transaction,
};
pub use create::create_transaction;
pub use delete::{DeleteOutcome, delete_transaction};
pub use query::{SortOrder, get_transaction_tree, list_transaction_trees};
pub use request::{SubRequest, TransactionRequest};
pub use update::update_transaction;
