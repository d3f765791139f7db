//! Per-message dispatch.
//!
//! The messaging gateway hands over `(text, owner, display name, send
//! time)` and expects exactly one reply string back, no matter what broke
//! along the way. Exact commands are checked first so the core verbs keep
//! working when the oracle is down; everything else goes through intent
//! classification. Workflow errors the user can act on (category
//! management, delete confirmation) are surfaced verbatim; anything else
//! becomes an apology with the detail attached.

use chrono::NaiveDateTime;
use regex::Regex;

use crate::budget::{self, BudgetWarning};
use crate::confirm::{self, PreviewStore};
use crate::error::{RaccoonError, Result};
use crate::extract::{self, ExtractionResult, QuerySpec, ReportKind};
use crate::fmt;
use crate::intent::{self, Intent};
use crate::models::Transaction;
use crate::oracle::LanguageOracle;
use crate::registry;
use crate::reports::{self, Filters, Period};
use crate::store::{self, LedgerStore};

pub struct Assistant<'a> {
    store: &'a dyn LedgerStore,
    oracle: &'a dyn LanguageOracle,
    previews: PreviewStore,
}

impl<'a> Assistant<'a> {
    pub fn new(store: &'a dyn LedgerStore, oracle: &'a dyn LanguageOracle) -> Assistant<'a> {
        Assistant {
            store,
            oracle,
            previews: PreviewStore::new(),
        }
    }

    /// One inbound message, one reply. Never panics, never escalates an
    /// error past this point.
    pub fn handle_message(
        &mut self,
        text: &str,
        owner_id: &str,
        display_name: &str,
        send_time: NaiveDateTime,
    ) -> String {
        match self.dispatch(text, owner_id, display_name, send_time) {
            Ok(reply) => reply,
            Err(
                e @ (RaccoonError::DuplicateCategory(_)
                | RaccoonError::ProtectedCategory(_)
                | RaccoonError::InvalidCategoryName(_)
                | RaccoonError::NotFound(_)
                | RaccoonError::NoPendingPreview
                | RaccoonError::PreviewExpired
                | RaccoonError::OrdinalOutOfRange(_, _)),
            ) => format!("⚠️ {e}"),
            Err(e) => {
                eprintln!("handler error for owner {owner_id}: {e}");
                format!("😥 Something went wrong on my end ({e}). Please try again.")
            }
        }
    }

    fn dispatch(
        &mut self,
        text: &str,
        owner_id: &str,
        display_name: &str,
        send_time: NaiveDateTime,
    ) -> Result<String> {
        let trimmed = text.trim();
        if let Some(reply) = self.builtin_command(trimmed, owner_id, send_time)? {
            return Ok(reply);
        }

        match intent::classify(self.oracle, trimmed, send_time) {
            Intent::Record => self.run_record(trimmed, owner_id, display_name, send_time),
            Intent::Delete => self.run_delete(trimmed, owner_id, send_time),
            Intent::QueryData | Intent::QueryReport => {
                let spec = match extract::parse_query(self.oracle, trimmed, send_time) {
                    Ok(spec) => spec,
                    Err(e) => {
                        eprintln!("query parsing failed: {e}");
                        return Ok(
                            "I couldn't work out what to look up — try \"check balance\" or \
                             \"monthly report\"."
                                .to_string(),
                        );
                    }
                };
                self.run_query(spec, owner_id, send_time)
            }
            Intent::QueryAdvice | Intent::Chat => Ok(self.chat_reply(trimmed)),
            Intent::ManageBudget => Ok(
                "Budgets: \"set budget <category> <amount>\" to set one, \"view budget\" to see \
                 where you stand."
                    .to_string(),
            ),
            Intent::ManageCategories => {
                let categories = registry::effective_categories(self.store, owner_id)?;
                Ok(format!(
                    "Categories: {}.\nUse \"add category <name>\", \"remove category <name>\" or \
                     \"list categories\".",
                    categories.join(", ")
                ))
            }
            Intent::Update => Ok(
                "Updating an existing record isn't supported yet — delete it and record it \
                 again instead."
                    .to_string(),
            ),
            Intent::Help => Ok(help_text()),
            Intent::Unknown => Ok(
                "I'm not sure what you mean — type \"help\" to see what I can do.".to_string(),
            ),
        }
    }

    /// Exact commands the original bot understood, checked before any
    /// oracle call.
    fn builtin_command(
        &mut self,
        text: &str,
        owner_id: &str,
        send_time: NaiveDateTime,
    ) -> Result<Option<String>> {
        let lower = text.to_lowercase();
        let confirm_re = Regex::new(r"(?i)^confirm delete(?:\s+(\d+))?$")
            .map_err(|e| RaccoonError::Other(e.to_string()))?;
        if let Some(caps) = confirm_re.captures(text) {
            let ordinal = caps.get(1).and_then(|m| m.as_str().parse().ok());
            return confirm::confirm(self.store, &mut self.previews, owner_id, ordinal, send_time)
                .map(Some);
        }

        match lower.as_str() {
            "help" => return Ok(Some(help_text())),
            "check balance" | "balance" => {
                let rows = store::owner_transactions(self.store, owner_id)?;
                let report = reports::total_report(&rows, &Filters::default());
                return Ok(Some(render_total(&report, None)));
            }
            "monthly report" => {
                let rows = store::owner_transactions(self.store, owner_id)?;
                return Ok(Some(render_period(&reports::period_report(
                    &rows,
                    Period::Month,
                    send_time,
                ))));
            }
            "weekly report" => {
                let rows = store::owner_transactions(self.store, owner_id)?;
                return Ok(Some(render_period(&reports::period_report(
                    &rows,
                    Period::Week,
                    send_time,
                ))));
            }
            "delete" => return confirm::delete_last(self.store, owner_id).map(Some),
            "list categories" => {
                let categories = registry::effective_categories(self.store, owner_id)?;
                return Ok(Some(format!("📋 Categories: {}", categories.join(", "))));
            }
            "view budget" | "view budgets" => {
                return self.render_budgets(owner_id, send_time).map(Some);
            }
            _ => {}
        }

        let set_budget_re = Regex::new(r"(?i)^set budget\s+(\S+)\s+(\d+(?:\.\d+)?)$")
            .map_err(|e| RaccoonError::Other(e.to_string()))?;
        if let Some(caps) = set_budget_re.captures(text) {
            let category = caps[1].to_lowercase();
            let limit: f64 = caps[2].parse().unwrap_or(0.0);
            if limit <= 0.0 {
                return Ok(Some("A budget limit must be a positive number.".to_string()));
            }
            if !registry::validate(self.store, owner_id, &category)? {
                return Ok(Some(format!(
                    "I don't know the category '{category}' — \"list categories\" shows what's \
                     available."
                )));
            }
            self.store.upsert_budget(&crate::models::Budget {
                owner_id: owner_id.to_string(),
                category: category.clone(),
                limit,
            })?;
            return Ok(Some(format!(
                "💡 Budget set: {category} {} per month.",
                fmt::money(limit)
            )));
        }

        let add_cat_re = Regex::new(r"(?i)^add category\s+(\S+)$")
            .map_err(|e| RaccoonError::Other(e.to_string()))?;
        if let Some(caps) = add_cat_re.captures(text) {
            let name = caps[1].to_string();
            registry::add_custom(self.store, owner_id, &name)?;
            return Ok(Some(format!("📋 Added category '{name}'.")));
        }

        let remove_cat_re = Regex::new(r"(?i)^remove category\s+(\S+)$")
            .map_err(|e| RaccoonError::Other(e.to_string()))?;
        if let Some(caps) = remove_cat_re.captures(text) {
            let name = caps[1].to_string();
            registry::remove_custom(self.store, owner_id, &name)?;
            return Ok(Some(format!("📋 Removed category '{name}'.")));
        }

        Ok(None)
    }

    fn run_record(
        &mut self,
        text: &str,
        owner_id: &str,
        display_name: &str,
        send_time: NaiveDateTime,
    ) -> Result<String> {
        match extract::extract(self.oracle, self.store, owner_id, text, send_time)? {
            ExtractionResult::Drafts { drafts, skipped } => {
                if drafts.is_empty() && skipped == 0 {
                    return Ok(
                        "I couldn't find anything to record in that — amounts help, e.g. \
                         \"lunch 80\"."
                            .to_string(),
                    );
                }
                let mut lines = Vec::new();
                for draft in drafts {
                    let tx = Transaction {
                        timestamp: draft.timestamp,
                        category: draft.category,
                        amount: draft.amount,
                        owner_id: owner_id.to_string(),
                        owner_display_name: display_name.to_string(),
                        note: draft.note,
                    };
                    // Appends are individually best-effort: one bad write
                    // must not take its siblings down with it.
                    if let Err(e) = self.store.append(&tx.to_record()) {
                        eprintln!("append failed for owner {owner_id}: {e}");
                        lines.push(format!(
                            "⚠️ Couldn't save {} {} — please try that one again.",
                            tx.category,
                            fmt::money(tx.amount.abs())
                        ));
                        continue;
                    }
                    lines.push(format!(
                        "✅ Recorded: {} {}{}",
                        tx.category,
                        fmt::money(tx.amount.abs()),
                        if tx.note.is_empty() {
                            String::new()
                        } else {
                            format!(" — {}", tx.note)
                        }
                    ));
                    if tx.is_expense() {
                        if let Some(warning) =
                            budget::check(self.store, owner_id, &tx.category, send_time)?
                        {
                            lines.push(render_warning(&warning));
                        }
                    }
                }
                if skipped > 0 {
                    lines.push(format!(
                        "⚠️ Skipped {skipped} entr{} without a usable amount.",
                        if skipped == 1 { "y" } else { "ies" }
                    ));
                }
                let rows = store::owner_transactions(self.store, owner_id)?;
                let report = reports::total_report(&rows, &Filters::default());
                lines.push(format!("📈 Balance: {}", fmt::money(report.net)));
                Ok(lines.join("\n"))
            }
            ExtractionResult::Chat(message) | ExtractionResult::SystemQuery(message) => {
                if message.is_empty() {
                    Ok(self.chat_reply(text))
                } else {
                    Ok(message)
                }
            }
            ExtractionResult::Query(query) => {
                let spec = extract::parse_query(self.oracle, &query, send_time)?;
                self.run_query(spec, owner_id, send_time)
            }
            ExtractionResult::Failure(message) => Ok(message),
        }
    }

    fn run_delete(&mut self, text: &str, owner_id: &str, send_time: NaiveDateTime) -> Result<String> {
        let criteria = match extract::delete_criteria(self.oracle, text, send_time) {
            Ok(criteria) => criteria,
            Err(e) => {
                eprintln!("delete criteria extraction failed: {e}");
                return Ok(
                    "I couldn't work out what to delete — try \"delete\" for your latest \
                     record, or name the item."
                        .to_string(),
                );
            }
        };
        match criteria {
            Some(filters) => {
                confirm::preview(self.store, &mut self.previews, owner_id, &filters, send_time)
            }
            None => confirm::delete_last(self.store, owner_id),
        }
    }

    fn run_query(
        &self,
        spec: QuerySpec,
        owner_id: &str,
        send_time: NaiveDateTime,
    ) -> Result<String> {
        let rows = store::owner_transactions(self.store, owner_id)?;
        let reply = match spec.kind {
            ReportKind::Total => {
                let report = reports::total_report(&rows, &spec.filters);
                render_total(&report, spec.filters.keyword.as_deref())
            }
            ReportKind::Breakdown => {
                let breakdown = reports::category_breakdown(&rows, &spec.filters);
                if breakdown.is_empty() {
                    "No expenses match that.".to_string()
                } else {
                    let mut lines = vec!["📊 Spending by category:".to_string()];
                    for (rank, entry) in breakdown.iter().enumerate() {
                        let marker = match rank {
                            0 => "🥇".to_string(),
                            1 => "🥈".to_string(),
                            2 => "🥉".to_string(),
                            n => format!("{}.", n + 1),
                        };
                        lines.push(format!(
                            "{marker} {}: {}",
                            entry.category,
                            fmt::money(entry.total)
                        ));
                    }
                    lines.join("\n")
                }
            }
            ReportKind::Week => {
                render_period(&reports::period_report(&rows, Period::Week, send_time))
            }
            ReportKind::Month => {
                render_period(&reports::period_report(&rows, Period::Month, send_time))
            }
            ReportKind::Compare => {
                let cmp = reports::month_comparison(&rows, send_time);
                let trend = match cmp.percent_change {
                    Some(change) if change >= 0.0 => {
                        format!("spending is up {:.1}% on last month", change)
                    }
                    Some(change) => format!("spending is down {:.1}% on last month", -change),
                    None => "no prior data to compare against".to_string(),
                };
                format!(
                    "📅 This month: {} spent, {} in.\n📅 Last month: {} spent, {} in.\n📈 {}",
                    fmt::money(cmp.this_month.expense),
                    fmt::money(cmp.this_month.income),
                    fmt::money(cmp.last_month.expense),
                    fmt::money(cmp.last_month.income),
                    trend
                )
            }
        };
        Ok(reply)
    }

    fn render_budgets(&self, owner_id: &str, send_time: NaiveDateTime) -> Result<String> {
        let budgets = self.store.budgets(owner_id)?;
        if budgets.is_empty() {
            return Ok(
                "No budgets set. \"set budget <category> <amount>\" starts one.".to_string(),
            );
        }
        let mut lines = vec!["💡 Budgets this month:".to_string()];
        for b in budgets {
            let spent = budget::month_spend(self.store, owner_id, &b.category, send_time)?;
            lines.push(format!(
                "- {}: {} / {} ({})",
                b.category,
                fmt::money(spent),
                fmt::money(b.limit),
                fmt::percent(spent / b.limit)
            ));
        }
        Ok(lines.join("\n"))
    }

    fn chat_reply(&self, text: &str) -> String {
        let prompt = format!(
            "You are a friendly raccoon bookkeeping assistant. Reply naturally and briefly, in \
             plain text, to the user's message. Don't invent numbers or records.\n\n\
             Message: {text}"
        );
        match self.oracle.infer(&prompt) {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                eprintln!("chat reply failed: {e}");
                "I can't chat right now — but I can still keep your books! Type \"help\" to see \
                 how."
                    .to_string()
            }
        }
    }
}

fn render_warning(warning: &BudgetWarning) -> String {
    match warning {
        BudgetWarning::NearLimit {
            category,
            remaining,
            percent_used,
        } => format!(
            "⚠️ Heads up: {category} budget is {:.1}% used — {} left this month.",
            percent_used,
            fmt::money(*remaining)
        ),
        BudgetWarning::OverBudget { category, overage } => format!(
            "🚨 Over budget: {category} is {} past its monthly limit.",
            fmt::money(*overage)
        ),
    }
}

fn render_total(report: &reports::TotalReport, keyword: Option<&str>) -> String {
    let scope = keyword
        .map(|k| format!(" for \"{k}\""))
        .unwrap_or_default();
    format!(
        "💰 Income{scope}: {}\n💸 Expenses{scope}: {}\n📈 Net: {}",
        fmt::money(report.income),
        fmt::money(report.expense),
        fmt::money(report.net)
    )
}

fn render_period(report: &reports::PeriodReport) -> String {
    let mut lines = vec![
        format!("📅 {} to {}", report.start, report.end),
        format!("💰 Income: {}", fmt::money(report.totals.income)),
        format!("💸 Expenses: {}", fmt::money(report.totals.expense)),
        format!("📈 Net: {}", fmt::money(report.totals.net)),
    ];
    if let Some((day, total)) = report.peak_day {
        lines.push(format!("🔥 Biggest spending day: {day} ({})", fmt::money(total)));
    }
    lines.join("\n")
}

fn help_text() -> String {
    [
        "📌 Here's what I can do:",
        "💸 Record: just tell me — \"lunch 80\", \"salary 50000\", \"dinner 180+60+135\"",
        "📊 Check: \"check balance\", \"monthly report\", \"weekly report\", or ask in your own words",
        "🗑️ Delete: \"delete\" removes your latest record; \"delete yesterday's coffee\" previews a bulk delete",
        "💡 Budgets: \"set budget dining 3000\", \"view budget\"",
        "📋 Categories: \"list categories\", \"add category pets\", \"remove category pets\"",
        "❓ Help: \"help\" shows this again",
    ]
    .join("\n")
}
