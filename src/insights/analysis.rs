//! Prompts for the language model and the parsing of its replies.
//!
//! None of these functions fail: when the model cannot be reached or replies
//! with something unusable, a fixed fallback is returned instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    Error,
    insights::{CompletionRequest, InsightModel},
    record::{Category, ExpenseRecord},
};

const INSIGHTS_SYSTEM_PROMPT: &str = "You are a financial advisor AI that analyzes spending \
    patterns and provides actionable insights. Always respond with valid JSON only.";
const CATEGORIZE_SYSTEM_PROMPT: &str =
    "You are an expense categorization AI. Respond with only the category name.";
const ANSWER_SYSTEM_PROMPT: &str = "You are a financial advisor AI that helps users understand \
    their spending patterns. Provide detailed, actionable insights.";

const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Shown when the question is too short to be worth asking.
const QUESTION_TOO_SHORT_ANSWER: &str =
    "Please provide a more detailed question for better analysis.";
const EMPTY_ANSWER: &str = "I was unable to generate an answer at this time. Please try again.";
const FAILED_ANSWER: &str =
    "I encountered an error while analyzing your question. Please try again later.";

/// The tone of an insight, used to pick its icon and colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Warning,
    Info,
    Success,
    Tip,
}

impl InsightKind {
    /// Parse the kind named by the model, anything unknown is [InsightKind::Info].
    fn from_model(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "warning" => InsightKind::Warning,
            "success" => InsightKind::Success,
            "tip" => InsightKind::Tip,
            _ => InsightKind::Info,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            InsightKind::Warning => "⚠️",
            InsightKind::Info => "ℹ️",
            InsightKind::Success => "✅",
            InsightKind::Tip => "💡",
        }
    }
}

/// A single observation about the user's spending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    /// A follow-up the user can ask the model about.
    pub action: Option<String>,
    /// How sure the model is, between zero and one.
    pub confidence: f64,
}

/// The fields of an expense the model gets to see.
#[derive(Debug, Serialize)]
struct ExpenseSummary<'a> {
    amount: f64,
    category: &'a str,
    description: &'a str,
    date: String,
}

fn expenses_json(records: &[ExpenseRecord]) -> String {
    let summaries: Vec<ExpenseSummary> = records
        .iter()
        .map(|record| ExpenseSummary {
            amount: record.amount,
            category: record.category.as_str(),
            description: &record.text,
            date: record.date.to_string(),
        })
        .collect();

    serde_json::to_string_pretty(&summaries).unwrap_or_else(|error| {
        tracing::error!("could not serialize expenses for the AI prompt: {error}");
        "[]".to_owned()
    })
}

/// The insights shown when the model is unavailable.
pub fn fallback_insights() -> Vec<AiInsight> {
    vec![
        AiInsight {
            id: "fallback-1".to_owned(),
            kind: InsightKind::Info,
            title: "AI Analysis Unavailable".to_owned(),
            message: "Unable to analyze your expenses at the moment. Please try again later."
                .to_owned(),
            action: Some("Retry analysis".to_owned()),
            confidence: 0.5,
        },
        AiInsight {
            id: "fallback-2".to_owned(),
            kind: InsightKind::Tip,
            title: "Manual Tracking".to_owned(),
            message: "Continue tracking your expenses manually. \
                We'll analyze them when the AI is available."
                .to_owned(),
            action: Some("Keep tracking".to_owned()),
            confidence: 1.0,
        },
    ]
}

/// Remove a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();

    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };

    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn non_empty_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parse the model's reply into insights, skipping malformed entries.
///
/// `id_prefix` keeps the IDs unique between requests, e.g. a timestamp.
///
/// # Errors
/// Returns [Error::AiResponse] if the reply is not a JSON array.
fn parse_insights(response: &str, id_prefix: i128) -> Result<Vec<AiInsight>, Error> {
    let cleaned = strip_code_fences(response);

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|error| Error::AiResponse(format!("reply is not valid JSON: {error}")))?;

    let Value::Array(entries) = value else {
        return Err(Error::AiResponse("reply is not a JSON array".to_owned()));
    };

    let insights = entries
        .iter()
        .filter_map(|entry| {
            let parsed = (
                non_empty_str(entry, "title"),
                non_empty_str(entry, "message"),
                non_empty_str(entry, "type"),
            );

            match parsed {
                (Some(title), Some(message), Some(kind)) => Some((title, message, kind, entry)),
                _ => {
                    tracing::warn!("Skipping invalid AI insight: {entry}");
                    None
                }
            }
        })
        .enumerate()
        .map(|(index, (title, message, kind, entry))| AiInsight {
            id: format!("ai-insight-{id_prefix}-{index}"),
            kind: InsightKind::from_model(kind),
            title: title.to_owned(),
            message: message.to_owned(),
            action: non_empty_str(entry, "action").map(str::to_owned),
            confidence: entry
                .get("confidence")
                .and_then(Value::as_f64)
                .filter(|confidence| confidence.is_finite())
                .unwrap_or(DEFAULT_CONFIDENCE)
                .clamp(0.0, 1.0),
        })
        .collect();

    Ok(insights)
}

/// Ask the model for three or four insights about `records`.
///
/// Returns [fallback_insights] if the model fails or its reply cannot be parsed.
pub async fn generate_expense_insights(
    model: &dyn InsightModel,
    records: &[ExpenseRecord],
) -> Vec<AiInsight> {
    tracing::info!("Generating AI insights for {} expense records", records.len());

    let user_prompt = format!(
        "Analyze the following expense data and provide 3-4 actionable financial insights.
Return a JSON array of insights with this structure:
{{
  \"type\": \"warning|info|success|tip\",
  \"title\": \"Brief title\",
  \"message\": \"Detailed insight message with specific numbers when possible\",
  \"action\": \"Actionable suggestion\",
  \"confidence\": 0.8
}}

Expense Data:
{}

Focus on:
1. Spending patterns (day of week, categories)
2. Budget alerts (high spending areas)
3. Money-saving opportunities
4. Positive reinforcement for good habits

Return only valid JSON array, no additional text.",
        expenses_json(records)
    );

    let request = CompletionRequest {
        system_prompt: INSIGHTS_SYSTEM_PROMPT.to_owned(),
        user_prompt,
        temperature: 0.7,
        max_tokens: 1000,
    };

    let timestamp = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

    match model
        .complete(request)
        .await
        .and_then(|response| parse_insights(&response, timestamp))
    {
        Ok(insights) => {
            tracing::info!("Generated {} AI insights", insights.len());
            insights
        }
        Err(error) => {
            tracing::error!("Could not generate AI insights: {error}");
            fallback_insights()
        }
    }
}

/// Ask the model which [Category] fits `description`.
///
/// Short descriptions, failures and unknown replies give [Category::Other].
pub async fn categorize_expense(model: &dyn InsightModel, description: &str) -> Category {
    let description = description.trim();

    if description.chars().count() < 2 {
        tracing::debug!("Description {description:?} is too short to categorize");
        return Category::Other;
    }

    let user_prompt = format!(
        "Categorize this expense description into one of these categories:
- Food (restaurants, groceries, dining out)
- Transportation (gas, public transport, rideshare, car maintenance)
- Shopping (clothing, electronics, general retail)
- Entertainment (movies, games, hobbies, events)
- Bills (utilities, rent, subscriptions, insurance)
- Healthcare (medical, pharmacy, fitness)
- Other (anything else)

Description: \"{description}\"

Respond with only the category name, nothing else."
    );

    let request = CompletionRequest {
        system_prompt: CATEGORIZE_SYSTEM_PROMPT.to_owned(),
        user_prompt,
        temperature: 0.3,
        max_tokens: 50,
    };

    match model.complete(request).await {
        Ok(response) => response.parse().unwrap_or_else(|error| {
            tracing::warn!("AI suggested an unknown category: {error}");
            Category::Other
        }),
        Err(error) => {
            tracing::error!("Could not categorize expense: {error}");
            Category::Other
        }
    }
}

/// Ask the model a free-form `question` about `records`.
///
/// Errors are turned into an apology the user can read.
pub async fn generate_ai_answer(
    model: &dyn InsightModel,
    question: &str,
    records: &[ExpenseRecord],
) -> String {
    let question = question.trim();

    if question.chars().count() < 3 {
        return QUESTION_TOO_SHORT_ANSWER.to_owned();
    }

    let user_prompt = format!(
        "Based on the following expense data, answer this question: \"{question}\"

Expense Data:
{}

Provide a helpful, detailed answer with specific insights from the data.",
        expenses_json(records)
    );

    let request = CompletionRequest {
        system_prompt: ANSWER_SYSTEM_PROMPT.to_owned(),
        user_prompt,
        temperature: 0.7,
        max_tokens: 500,
    };

    match model.complete(request).await {
        Ok(answer) if answer.trim().is_empty() => EMPTY_ANSWER.to_owned(),
        Ok(answer) => answer.trim().to_owned(),
        Err(Error::AiResponse(error)) => {
            tracing::error!("The AI gave no answer: {error}");
            EMPTY_ANSWER.to_owned()
        }
        Err(error) => {
            tracing::error!("Could not generate AI answer: {error}");
            FAILED_ANSWER.to_owned()
        }
    }
}

#[cfg(test)]
mod parse_tests {
    use crate::Error;

    use super::{InsightKind, parse_insights, strip_code_fences};

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences("  [1] "), "[1]");
    }

    #[test]
    fn parses_valid_insights() {
        let response = r#"```json
[
  {"type": "warning", "title": "Dining out", "message": "You spent $120 on food.", "action": "Cook at home", "confidence": 0.9},
  {"type": "success", "title": "Bills paid", "message": "No late fees this month."}
]
```"#;

        let insights = parse_insights(response, 42).unwrap();

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].id, "ai-insight-42-0");
        assert_eq!(insights[0].kind, InsightKind::Warning);
        assert_eq!(insights[0].action.as_deref(), Some("Cook at home"));
        assert_eq!(insights[0].confidence, 0.9);
        assert_eq!(insights[1].id, "ai-insight-42-1");
        assert_eq!(insights[1].action, None);
        assert_eq!(insights[1].confidence, 0.8);
    }

    #[test]
    fn skips_entries_missing_required_fields() {
        let response = r#"[
            {"type": "tip", "message": "No title"},
            {"title": "No message", "type": "tip"},
            {"title": "No type", "message": "Hello"},
            {"type": "tip", "title": "Kept", "message": "Hello"}
        ]"#;

        let insights = parse_insights(response, 1).unwrap();

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Kept");
        assert_eq!(insights[0].id, "ai-insight-1-0");
    }

    #[test]
    fn unknown_kind_becomes_info_and_confidence_is_clamped() {
        let response = r#"[
            {"type": "alert", "title": "A", "message": "B", "confidence": 7},
            {"type": "TIP", "title": "C", "message": "D", "confidence": -1}
        ]"#;

        let insights = parse_insights(response, 1).unwrap();

        assert_eq!(insights[0].kind, InsightKind::Info);
        assert_eq!(insights[0].confidence, 1.0);
        assert_eq!(insights[1].kind, InsightKind::Tip);
        assert_eq!(insights[1].confidence, 0.0);
    }

    #[test]
    fn rejects_non_array_reply() {
        assert!(matches!(
            parse_insights(r#"{"type": "tip"}"#, 1),
            Err(Error::AiResponse(_))
        ));
        assert!(matches!(
            parse_insights("Here are your insights!", 1),
            Err(Error::AiResponse(_))
        ));
    }
}

#[cfg(test)]
mod model_tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{
        auth::UserID,
        insights::test_model::StubModel,
        record::{Category, ExpenseRecord},
    };

    use super::{
        FAILED_ANSWER, QUESTION_TOO_SHORT_ANSWER, categorize_expense, fallback_insights,
        generate_ai_answer, generate_expense_insights,
    };

    fn records() -> Vec<ExpenseRecord> {
        vec![ExpenseRecord {
            id: 1,
            user_id: UserID::new(1),
            text: "Groceries".to_owned(),
            amount: 82.4,
            category: Category::Food,
            date: date!(2025 - 10 - 04),
            created_at: OffsetDateTime::now_utc(),
        }]
    }

    #[tokio::test]
    async fn insights_prompt_contains_records() {
        let model = StubModel::replying(r#"[{"type": "tip", "title": "T", "message": "M"}]"#);

        let insights = generate_expense_insights(&model, &records()).await;

        assert_eq!(insights.len(), 1);
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].user_prompt.contains("\"description\": \"Groceries\""));
        assert!(requests[0].user_prompt.contains("\"date\": \"2025-10-04\""));
        assert_eq!(requests[0].temperature, 0.7);
        assert_eq!(requests[0].max_tokens, 1000);
    }

    #[tokio::test]
    async fn insights_fall_back_on_failure() {
        let failing = StubModel::failing();
        let unparseable = StubModel::replying("I'm sorry, I can't do that.");

        assert_eq!(
            generate_expense_insights(&failing, &records()).await,
            fallback_insights()
        );
        assert_eq!(
            generate_expense_insights(&unparseable, &records()).await,
            fallback_insights()
        );
    }

    #[tokio::test]
    async fn categorizes_with_model_reply() {
        let model = StubModel::replying(" transportation\n");

        let category = categorize_expense(&model, "Uber to the airport").await;

        assert_eq!(category, Category::Transportation);
        let requests = model.requests();
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(requests[0].max_tokens, 50);
    }

    #[tokio::test]
    async fn short_description_is_other_without_asking() {
        let model = StubModel::replying("Food");

        assert_eq!(categorize_expense(&model, " a ").await, Category::Other);
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_or_failed_category_is_other() {
        assert_eq!(
            categorize_expense(&StubModel::replying("Groceries"), "Milk").await,
            Category::Other
        );
        assert_eq!(
            categorize_expense(&StubModel::failing(), "Milk").await,
            Category::Other
        );
    }

    #[tokio::test]
    async fn answers_question() {
        let model = StubModel::replying("  You spend most on food.  ");

        let answer = generate_ai_answer(&model, "Where does my money go?", &records()).await;

        assert_eq!(answer, "You spend most on food.");
        assert_eq!(model.requests()[0].max_tokens, 500);
    }

    #[tokio::test]
    async fn short_question_is_not_sent() {
        let model = StubModel::replying("Anything");

        let answer = generate_ai_answer(&model, "hi", &records()).await;

        assert_eq!(answer, QUESTION_TOO_SHORT_ANSWER);
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_answer_apologises() {
        let answer = generate_ai_answer(&StubModel::failing(), "Where does it go?", &records()).await;

        assert_eq!(answer, FAILED_ANSWER);
    }
}
