//! Intent classification.
//!
//! The oracle assigns one label from a closed set. Local overrides run
//! first so that obvious inputs (help keywords, pure punctuation) never
//! reach the model at all — asking a generative model about "..." is how a
//! phantom transaction gets hallucinated into the ledger. The result is
//! advisory only; every downstream handler re-validates what it is given.

use chrono::NaiveDateTime;

use crate::oracle::{strip_code_fence, LanguageOracle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Record,
    Delete,
    Update,
    QueryData,
    QueryReport,
    QueryAdvice,
    ManageBudget,
    ManageCategories,
    Help,
    Chat,
    Unknown,
}

impl Intent {
    pub fn from_label(label: &str) -> Intent {
        match label.trim().to_uppercase().as_str() {
            "RECORD" => Intent::Record,
            "DELETE" => Intent::Delete,
            "UPDATE" => Intent::Update,
            "QUERY_DATA" => Intent::QueryData,
            "QUERY_REPORT" => Intent::QueryReport,
            "QUERY_ADVICE" => Intent::QueryAdvice,
            "MANAGE_BUDGET" => Intent::ManageBudget,
            "MANAGE_CATEGORIES" => Intent::ManageCategories,
            "HELP" => Intent::Help,
            "CHAT" => Intent::Chat,
            _ => Intent::Unknown,
        }
    }
}

const HELP_KEYWORDS: &[&str] = &["help", "commands", "usage", "what can you do"];

/// Text with no letters or digits is noise, never a transaction.
pub fn is_noise(text: &str) -> bool {
    !text.chars().any(|c| c.is_alphanumeric())
}

fn classify_prompt(text: &str, send_time: NaiveDateTime) -> String {
    format!(
        "You are the intent classifier for a bookkeeping assistant. Today is {date}.\n\
         Classify the user message into exactly one of these labels:\n\
         RECORD — logging one or more expenses or income (\"lunch 80\", \"salary 50000\")\n\
         DELETE — removing existing records (\"delete yesterday's coffee\")\n\
         UPDATE — changing an existing record\n\
         QUERY_DATA — asking for raw numbers or balances (\"how much did I spend on transport\")\n\
         QUERY_REPORT — asking for a summary or report (\"monthly report\", \"compare to last month\")\n\
         QUERY_ADVICE — asking for opinions about their spending\n\
         MANAGE_BUDGET — setting or viewing budgets\n\
         MANAGE_CATEGORIES — adding, removing or listing categories\n\
         HELP — asking how to use the assistant\n\
         CHAT — small talk or anything else conversational\n\
         Reply with the label only, nothing else.\n\n\
         Message: {text}",
        date = send_time.date()
    )
}

pub fn classify(oracle: &dyn LanguageOracle, text: &str, send_time: NaiveDateTime) -> Intent {
    let trimmed = text.trim();
    if HELP_KEYWORDS.contains(&trimmed.to_lowercase().as_str()) {
        return Intent::Help;
    }
    if is_noise(trimmed) {
        return Intent::Chat;
    }
    match oracle.infer(&classify_prompt(trimmed, send_time)) {
        Ok(raw) => Intent::from_label(strip_code_fence(&raw)),
        Err(e) => {
            eprintln!("intent classification failed: {e}");
            Intent::Unknown
        }
    }
}
