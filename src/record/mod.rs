//! Expense records: the model, its queries, and the pages and endpoints for
//! adding, listing and deleting them.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod form;
mod history;
mod summary;

pub use core::{
    Category, ExpenseRecord, NewRecord, create_record, create_record_table, delete_record,
    get_chart_records, get_recent_records, get_records,
};
pub use create_endpoint::create_record_endpoint;
pub use delete_endpoint::delete_record_endpoint;
pub use form::{add_record_form, category_select};
pub use history::get_history_page;
pub use summary::{RecordSummary, get_record_summary, get_spending_since};
