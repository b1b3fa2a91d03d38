//! Dashboard module
//!
//! Provides the landing page for logged in users: spending totals, the daily
//! spending chart, the add-expense form and AI insights.

mod cards;
mod handlers;

pub use handlers::get_dashboard_page;
