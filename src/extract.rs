//! Extraction & repair pipeline.
//!
//! The oracle turns free text into structured drafts; this module is the
//! boundary that refuses to trust it. Raw output is parsed into an
//! exhaustive sum type, then each draft is repaired before anything touches
//! the ledger: split expressions are collapsed back into one draft, unknown
//! categories are coerced to the fallback instead of dropping the record,
//! and zero or unparsable amounts knock out only the one draft they belong
//! to.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::Result;
use crate::expr;
use crate::models::Draft;
use crate::oracle::{strip_code_fence, LanguageOracle};
use crate::registry::{self, FALLBACK_CATEGORY};
use crate::store::LedgerStore;
use crate::temporal;

/// Everything the oracle can mean by a message, exhaustively.
#[derive(Debug, PartialEq)]
pub enum ExtractionResult {
    /// Validated drafts ready to append, plus how many were skipped during
    /// repair.
    Drafts { drafts: Vec<Draft>, skipped: usize },
    Chat(String),
    Query(String),
    SystemQuery(String),
    Failure(String),
}

#[derive(Debug, Deserialize)]
struct OracleReply {
    kind: Option<String>,
    #[serde(default)]
    drafts: Vec<RawDraft>,
    message: Option<String>,
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    category: Option<String>,
    amount: Option<f64>,
    note: Option<String>,
    date: Option<String>,
    time: Option<String>,
}

fn extraction_prompt(text: &str, categories: &[String], send_time: NaiveDateTime) -> String {
    format!(
        "You extract ledger entries for a bookkeeping assistant. The message was sent at {sent}.\n\
         Valid categories (use these exact labels): {cats}.\n\
         Amounts are negative for expenses and positive for income. One message may contain \
         several entries.\n\
         Reply with JSON only, in one of these shapes:\n\
         {{\"kind\":\"record\",\"drafts\":[{{\"category\":\"dining\",\"amount\":-80,\"note\":\"lunch\",\
         \"date\":\"yesterday\",\"time\":\"12:30\"}}]}} — date and time only when the message states them\n\
         {{\"kind\":\"query\",\"query\":\"<restated question>\"}} — the user asks about their data\n\
         {{\"kind\":\"system_query\",\"message\":\"<answer>\"}} — the user asks about the assistant itself\n\
         {{\"kind\":\"chat\",\"message\":\"<reply>\"}} — anything else\n\n\
         Message: {text}",
        sent = send_time,
        cats = categories.join(", ")
    )
}

/// Run the oracle over `text` and repair whatever comes back. Oracle and
/// parse failures surface as `Failure`, never as a panic or an `Err`.
pub fn extract(
    oracle: &dyn LanguageOracle,
    store: &dyn LedgerStore,
    owner_id: &str,
    text: &str,
    send_time: NaiveDateTime,
) -> Result<ExtractionResult> {
    let categories = registry::effective_categories(store, owner_id)?;
    let raw = match oracle.infer(&extraction_prompt(text, &categories, send_time)) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("extraction call failed: {e}");
            return Ok(ExtractionResult::Failure(
                "I couldn't reach my brain just now — please try again.".to_string(),
            ));
        }
    };

    let reply: OracleReply = match serde_json::from_str(strip_code_fence(&raw)) {
        Ok(reply) => reply,
        Err(e) => {
            eprintln!("unparsable extraction output: {e}; raw: {raw}");
            return Ok(ExtractionResult::Failure(
                "I didn't quite catch that — could you rephrase?".to_string(),
            ));
        }
    };

    match reply.kind.as_deref() {
        Some("record") => Ok(repair(reply.drafts, &categories, text, send_time)),
        Some("query") => Ok(ExtractionResult::Query(
            reply.query.or(reply.message).unwrap_or_default(),
        )),
        Some("system_query") => Ok(ExtractionResult::SystemQuery(
            reply.message.unwrap_or_default(),
        )),
        Some("chat") => Ok(ExtractionResult::Chat(reply.message.unwrap_or_default())),
        other => {
            eprintln!("unexpected extraction kind: {other:?}");
            Ok(ExtractionResult::Failure(
                "I didn't quite catch that — could you rephrase?".to_string(),
            ))
        }
    }
}

/// Apply the repair rules in order: expression collapse, category coercion,
/// zero-amount skip.
fn repair(
    raw_drafts: Vec<RawDraft>,
    categories: &[String],
    original_text: &str,
    send_time: NaiveDateTime,
) -> ExtractionResult {
    let raw_drafts = collapse_split_expression(raw_drafts, original_text);

    let mut drafts = Vec::new();
    let mut skipped = 0;
    for raw in raw_drafts {
        let amount = match raw.amount {
            Some(a) if a != 0.0 => a,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let mut note = raw.note.clone().unwrap_or_default();
        let category = match raw.category {
            Some(c) if categories.iter().any(|known| *known == c) => c,
            other => {
                // Never drop a record over a label: fall back to misc and
                // keep the original label visible in the note.
                if let Some(label) = other.filter(|c| !c.is_empty()) {
                    note = if note.is_empty() {
                        format!("({label})")
                    } else {
                        format!("({label}) {note}")
                    };
                }
                FALLBACK_CATEGORY.to_string()
            }
        };
        let timestamp = temporal::resolve(
            raw.note.as_deref().unwrap_or(original_text),
            raw.date.as_deref(),
            raw.time.as_deref(),
            send_time,
        );
        drafts.push(Draft {
            timestamp,
            category,
            amount,
            note,
        });
    }
    ExtractionResult::Drafts { drafts, skipped }
}

/// One priced item sometimes comes back as several drafts ("dinner
/// 180+60+135" → three dinners). When every draft shares a category and the
/// text's numeric tail evaluates as a single expression, fold them back into
/// one draft.
fn collapse_split_expression(drafts: Vec<RawDraft>, original_text: &str) -> Vec<RawDraft> {
    if drafts.len() < 2 {
        return drafts;
    }
    let first_category = match drafts[0].category.as_deref() {
        Some(c) => c,
        None => return drafts,
    };
    if !drafts
        .iter()
        .all(|d| d.category.as_deref() == Some(first_category))
    {
        return drafts;
    }
    let Some((note, value)) = expr::split_trailing(original_text) else {
        return drafts;
    };
    let negatives = drafts
        .iter()
        .filter(|d| d.amount.unwrap_or(0.0) < 0.0)
        .count();
    let sign = if negatives * 2 >= drafts.len() { -1.0 } else { 1.0 };
    let merged = RawDraft {
        category: Some(first_category.to_string()),
        amount: Some(sign * value.abs()),
        note: Some(note),
        date: drafts[0].date.clone(),
        time: drafts[0].time.clone(),
    };
    vec![merged]
}

// ---------------------------------------------------------------------------
// Query and delete criteria
// ---------------------------------------------------------------------------

use crate::reports::{Filters, Flow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Total,
    Breakdown,
    Week,
    Month,
    Compare,
}

#[derive(Debug)]
pub struct QuerySpec {
    pub kind: ReportKind,
    pub filters: Filters,
}

#[derive(Debug, Deserialize)]
struct RawCriteria {
    report: Option<String>,
    keyword: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    flow: Option<String>,
}

impl RawCriteria {
    fn into_filters(self, send_time: NaiveDateTime) -> Filters {
        Filters {
            start: self
                .start_date
                .as_deref()
                .and_then(|d| temporal::resolve_date(d, send_time)),
            end: self
                .end_date
                .as_deref()
                .and_then(|d| temporal::resolve_date(d, send_time)),
            keyword: self.keyword.filter(|k| !k.trim().is_empty()),
            flow: self.flow.as_deref().map(Flow::from_label).unwrap_or_default(),
        }
    }
}

fn query_prompt(text: &str, send_time: NaiveDateTime) -> String {
    format!(
        "You translate a bookkeeping question into report criteria. The message was sent at {sent}.\n\
         Reply with JSON only:\n\
         {{\"report\":\"total|breakdown|week|month|compare\",\"keyword\":\"<optional filter>\",\
         \"start_date\":\"<optional, YYYY-MM-DD or a phrase like yesterday>\",\
         \"end_date\":\"<optional>\",\"flow\":\"income|expense|all\"}}\n\
         Pick \"breakdown\" for per-category questions, \"compare\" for month-over-month \
         questions, \"week\"/\"month\" for period summaries, otherwise \"total\".\n\n\
         Question: {text}",
        sent = send_time
    )
}

/// Ask the oracle to turn a data/report question into scan criteria.
pub fn parse_query(
    oracle: &dyn LanguageOracle,
    text: &str,
    send_time: NaiveDateTime,
) -> Result<QuerySpec> {
    let raw = oracle.infer(&query_prompt(text, send_time))?;
    let criteria: RawCriteria = serde_json::from_str(strip_code_fence(&raw))?;
    let kind = match criteria.report.as_deref() {
        Some("breakdown") => ReportKind::Breakdown,
        Some("week") => ReportKind::Week,
        Some("month") => ReportKind::Month,
        Some("compare") => ReportKind::Compare,
        _ => ReportKind::Total,
    };
    Ok(QuerySpec {
        kind,
        filters: criteria.into_filters(send_time),
    })
}

fn delete_prompt(text: &str, send_time: NaiveDateTime) -> String {
    format!(
        "You extract delete criteria for a bookkeeping assistant. The message was sent at {sent}.\n\
         Reply with JSON only: {{\"keyword\":\"<optional item or category>\",\
         \"start_date\":\"<optional, YYYY-MM-DD or a phrase like yesterday>\",\"end_date\":\"<optional>\"}}.\n\
         Leave every field out if the user just wants their latest record removed.\n\n\
         Message: {text}",
        sent = send_time
    )
}

/// Ask the oracle what a delete request targets. `None` means no criteria —
/// the caller should fall back to the last-record shortcut.
pub fn delete_criteria(
    oracle: &dyn LanguageOracle,
    text: &str,
    send_time: NaiveDateTime,
) -> Result<Option<Filters>> {
    let raw = oracle.infer(&delete_prompt(text, send_time))?;
    let criteria: RawCriteria = serde_json::from_str(strip_code_fence(&raw))?;
    let filters = criteria.into_filters(send_time);
    if filters.keyword.is_none() && filters.start.is_none() && filters.end.is_none() {
        return Ok(None);
    }
    Ok(Some(filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::ScriptedOracle;
    use crate::registry;
    use crate::store::SqliteStore;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn st() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-11-12 19:36", "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_single_draft() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[{"category":"dining","amount":-80,"note":"lunch"}]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "lunch 80", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, skipped } => {
                assert_eq!(skipped, 0);
                assert_eq!(drafts.len(), 1);
                assert_eq!(drafts[0].category, "dining");
                assert_eq!(drafts[0].amount, -80.0);
                // "lunch" at 19:36 backfills to noon.
                assert_eq!(drafts[0].timestamp.format("%H:%M").to_string(), "12:00");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_category_coerced_to_misc() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[{"category":"spaceships","amount":-900,"note":"rocket fuel"}]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "rocket fuel 900", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, .. } => {
                assert_eq!(drafts[0].category, "misc");
                assert_eq!(drafts[0].note, "(spaceships) rocket fuel");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_custom_category_accepted() {
        let (_dir, store) = test_store();
        registry::add_custom(&store, "U1", "pets").unwrap();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[{"category":"pets","amount":-300,"note":"cat food"}]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "cat food 300", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, .. } => assert_eq!(drafts[0].category, "pets"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_amount_skips_only_that_draft() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[
                {"category":"dining","amount":0,"note":"freebie"},
                {"category":"drinks","amount":-60,"note":"coffee"}
            ]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "freebie and coffee 60", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, skipped } => {
                assert_eq!(skipped, 1);
                assert_eq!(drafts.len(), 1);
                assert_eq!(drafts[0].note, "coffee");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_expression_collapse() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[
                {"category":"dining","amount":-180,"note":"dinner"},
                {"category":"dining","amount":-60,"note":"dinner"},
                {"category":"dining","amount":-135,"note":"dinner"}
            ]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "dinner 180+60+135", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, skipped } => {
                assert_eq!(skipped, 0);
                assert_eq!(drafts.len(), 1);
                assert_eq!(drafts[0].amount, -375.0);
                assert_eq!(drafts[0].note, "dinner");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_no_collapse_across_categories() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[
                {"category":"dining","amount":-100,"note":"lunch"},
                {"category":"drinks","amount":-200,"note":"beer"}
            ]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "lunch 100 beer 200", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, .. } => assert_eq!(drafts.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_multiplication_collapse() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[
            r#"{"kind":"record","drafts":[
                {"category":"drinks","amount":-59,"note":"bubble tea"},
                {"category":"drinks","amount":-59,"note":"bubble tea"}
            ]}"#,
        ]);
        let result = extract(&oracle, &store, "U1", "bubble tea 59x2", st()).unwrap();
        match result {
            ExtractionResult::Drafts { drafts, .. } => {
                assert_eq!(drafts.len(), 1);
                assert_eq!(drafts[0].amount, -118.0);
                assert_eq!(drafts[0].note, "bubble tea");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_chat_and_query_kinds() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&[r#"{"kind":"chat","message":"hi there"}"#]);
        assert_eq!(
            extract(&oracle, &store, "U1", "hello", st()).unwrap(),
            ExtractionResult::Chat("hi there".to_string())
        );
        let oracle = ScriptedOracle::new(&[r#"{"kind":"query","query":"transport this month"}"#]);
        assert_eq!(
            extract(&oracle, &store, "U1", "transport spend?", st()).unwrap(),
            ExtractionResult::Query("transport this month".to_string())
        );
    }

    #[test]
    fn test_garbage_output_is_failure_not_crash() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::new(&["certainly! here's some prose instead of JSON"]);
        match extract(&oracle, &store, "U1", "lunch 80", st()).unwrap() {
            ExtractionResult::Failure(_) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_query_criteria() {
        let oracle = ScriptedOracle::new(&[
            r#"{"report":"breakdown","keyword":"transport","start_date":"2025-11-01","end_date":"yesterday","flow":"expense"}"#,
        ]);
        let spec = parse_query(&oracle, "where did my transport money go", st()).unwrap();
        assert_eq!(spec.kind, ReportKind::Breakdown);
        assert_eq!(spec.filters.keyword.as_deref(), Some("transport"));
        assert_eq!(
            spec.filters.start,
            chrono::NaiveDate::from_ymd_opt(2025, 11, 1)
        );
        assert_eq!(
            spec.filters.end,
            chrono::NaiveDate::from_ymd_opt(2025, 11, 11)
        );
        assert_eq!(spec.filters.flow, Flow::Expense);
    }

    #[test]
    fn test_parse_query_defaults_to_total() {
        let oracle = ScriptedOracle::new(&["{}"]);
        let spec = parse_query(&oracle, "how am I doing", st()).unwrap();
        assert_eq!(spec.kind, ReportKind::Total);
        assert!(spec.filters.keyword.is_none());
    }

    #[test]
    fn test_delete_criteria_extracted() {
        let oracle =
            ScriptedOracle::new(&[r#"{"keyword":"coffee","start_date":"yesterday","end_date":"yesterday"}"#]);
        let filters = delete_criteria(&oracle, "delete yesterday's coffee", st())
            .unwrap()
            .unwrap();
        assert_eq!(filters.keyword.as_deref(), Some("coffee"));
        assert_eq!(filters.start, chrono::NaiveDate::from_ymd_opt(2025, 11, 11));
    }

    #[test]
    fn test_delete_criteria_empty_means_shortcut() {
        let oracle = ScriptedOracle::new(&["{}"]);
        assert!(delete_criteria(&oracle, "delete", st()).unwrap().is_none());
    }

    #[test]
    fn test_oracle_outage_is_failure() {
        let (_dir, store) = test_store();
        let oracle = ScriptedOracle::failing();
        match extract(&oracle, &store, "U1", "lunch 80", st()).unwrap() {
            ExtractionResult::Failure(_) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
