//! AI generated insights, answers and category suggestions about the user's spending.

mod analysis;
mod client;
mod handlers;

pub use analysis::{
    AiInsight, InsightKind, categorize_expense, fallback_insights, generate_ai_answer,
    generate_expense_insights,
};
pub use client::{ChatCompletionClient, CompletionRequest, InsightModel};
pub use handlers::{get_insights, insights_panel, post_insight_answer, suggest_category};

#[cfg(test)]
pub(crate) use client::test_model;
