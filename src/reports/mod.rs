//! Read-only reporting over the ledger.
//!
//! Everything here is a pure query: account balances derived from
//! installments, windowed income/expense summaries, and category breakdowns.
//! Nothing in this module mutates state.

mod balance;
mod summary;

pub use balance::account_balance;
pub use summary::{
    CategoryTotal, MonthlySummary, ReportWindow, WindowTotals, category_totals, monthly_series,
    window_totals,
};
