//! Loose-text extractor
//!
//! Recovers income, savings goal, current savings and expense lines from
//! free text. The result seeds the reconciler when the generator response
//! is partial. Extraction is total: unmatched fields stay `None`.

use crate::models::{Expense, Priority};
use crate::normalize::normalize;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_RECOMMENDATION: &str = "Review this expense";

/// `$` optional, digits with optional thousands commas and decimals
const AMOUNT: &str = r"\$?\s*(?P<amount>\d[\d,]*(?:\.\d+)?)";

/// Optional trailing period keyword on the same line ("a month", "per year")
const PERIOD: &str = r"(?:[ \t]*(?:/|per|an|a|each|every)?[ \t]*(?P<period>weekly|week|monthly|month|yearly|year|annually|annual)\b)?";

/// Anything up to the amount on the same line
const GAP: &str = r"[^\d\n]*?";

/// Expense labels containing any of these are income/goal lines
const NON_EXPENSE_LABELS: &[&str] = &["income", "salary", "save", "saving", "goal", "target"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Income,
    SavingsGoal,
    CurrentSavings,
}

/// One entry of the ordered rule table. Rules for the same field are tried
/// in table order and the first match wins.
struct FieldRule {
    field: Field,
    pattern: Regex,
    uses_period: bool,
}

impl FieldRule {
    fn new(field: Field, keywords: &str, uses_period: bool) -> Self {
        let source = if uses_period {
            format!("{}{}{}{}", keywords, GAP, AMOUNT, PERIOD)
        } else {
            format!("{}{}{}", keywords, GAP, AMOUNT)
        };
        let pattern = Regex::new(&source).expect("field rule pattern is valid");
        Self { field, pattern, uses_period }
    }

    fn parse(&self, caps: &Captures<'_>) -> Option<f64> {
        let amount = caps.name("amount").and_then(|m| parse_amount(m.as_str()));
        if self.uses_period {
            normalize(amount, caps.name("period").map(|m| m.as_str()))
        } else {
            amount
        }
    }
}

lazy_static! {
    static ref FIELD_RULES: Vec<FieldRule> = vec![
        FieldRule::new(
            Field::Income,
            r"\b(?:income|salary|make|earn|bring in|take home)[a-z]*",
            true,
        ),
        // Anything this matches the keyword rule above matches first
        FieldRule::new(Field::Income, r"\b(?:i|we)\s+(?:make|earn)\b", true),
        FieldRule::new(
            Field::SavingsGoal,
            r"\b(?:savings goal|goal to save|goal of|target to save|target)\b",
            true,
        ),
        FieldRule::new(
            Field::SavingsGoal,
            r"\b(?:want to save|plan to save|save up|save)\b",
            true,
        ),
        FieldRule::new(
            Field::CurrentSavings,
            r"\b(?:current savings|already saved|have saved|saved so far|currently have)\b",
            false,
        ),
    ];

    static ref EXPENSE_LINE: Regex = Regex::new(&format!(
        r"^(?:[-*•]\s*)?(?P<label>[a-z][a-z\s/&]*?)\s*(?::|=|-|\bis\b)?\s*{}{}",
        AMOUNT, PERIOD
    ))
    .expect("expense line pattern is valid");

    /// Whole-word income and balance phrases ("i make", "currently have").
    /// Word boundaries keep labels like "learning" or "makeup" as expenses.
    static ref NON_EXPENSE_PHRASE: Regex = Regex::new(
        r"\b(?:make|makes|earn|earns|bring in|take home|currently have|have saved|already saved)\b"
    )
    .expect("non-expense phrase pattern is valid");
}

/// Output of a loose-text scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFinancials {
    pub income: Option<f64>,
    pub savings_goal: Option<f64>,
    pub current_savings: Option<f64>,
    pub expenses: Vec<Expense>,
}

/// Scan free text for financial figures. Never fails.
pub fn extract(text: &str) -> ExtractedFinancials {
    let lowered = text.to_lowercase();

    let extracted = ExtractedFinancials {
        income: extract_field(&lowered, Field::Income),
        savings_goal: extract_field(&lowered, Field::SavingsGoal),
        current_savings: extract_field(&lowered, Field::CurrentSavings),
        expenses: extract_expenses(&lowered),
    };

    debug!(
        income = ?extracted.income,
        savings_goal = ?extracted.savings_goal,
        current_savings = ?extracted.current_savings,
        expense_count = extracted.expenses.len(),
        "Loose-text extraction complete"
    );

    extracted
}

fn extract_field(lowered: &str, field: Field) -> Option<f64> {
    FIELD_RULES
        .iter()
        .filter(|rule| rule.field == field)
        .find_map(|rule| {
            rule.pattern
                .captures(lowered)
                .and_then(|caps| rule.parse(&caps))
        })
}

fn extract_expenses(lowered: &str) -> Vec<Expense> {
    // name -> index into `totals`, keeps first-seen order
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<(String, f64)> = Vec::new();

    for line in split_entries(lowered) {
        let Some(caps) = EXPENSE_LINE.captures(line) else {
            continue;
        };

        let label = caps
            .name("label")
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if label.is_empty() || is_non_expense_label(label) {
            continue;
        }

        let amount = normalize(
            caps.name("amount").and_then(|m| parse_amount(m.as_str())),
            caps.name("period").map(|m| m.as_str()),
        );
        let Some(amount) = amount.filter(|a| *a > 0.0) else {
            continue;
        };

        match index.get(label) {
            Some(&i) => totals[i].1 += amount,
            None => {
                index.insert(label.to_string(), totals.len());
                totals.push((label.to_string(), amount));
            }
        }
    }

    totals
        .into_iter()
        .map(|(name, amount)| Expense {
            name,
            amount,
            priority: Priority::Important,
            recommendation: DEFAULT_RECOMMENDATION.to_string(),
        })
        .collect()
}

fn is_non_expense_label(label: &str) -> bool {
    NON_EXPENSE_LABELS.iter().any(|kw| label.contains(kw)) || NON_EXPENSE_PHRASE.is_match(label)
}

/// Split on newlines and on commas, except commas sitting between two
/// digits (thousands separators). Entries are trimmed, empty ones dropped.
fn split_entries(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut entries = Vec::new();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        let is_break = match b {
            b'\n' => true,
            b',' => {
                let prev_digit = i > 0 && bytes[i - 1].is_ascii_digit();
                let next_digit = bytes.get(i + 1).is_some_and(|c| c.is_ascii_digit());
                !(prev_digit && next_digit)
            }
            _ => false,
        };
        if is_break {
            entries.push(&text[start..i]);
            start = i + 1;
        }
    }
    entries.push(&text[start..]);

    entries
        .into_iter()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect()
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}
