//! UI edit intents
//!
//! Discrete edits coming from the UI before they are turned into a generator
//! instruction: batched field edits, item remix/complete requests and
//! portfolio allocation lists.

use crate::error::PlannerError;
use crate::models::{Allocation, Expense, FinancialData};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Batched field edits. Raw values are kept as typed by the user and
/// coerced before comparison. `None` means the field was not touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEdits {
    #[serde(default)]
    pub income: Option<String>,
    #[serde(default)]
    pub current_savings: Option<String>,
    /// Blank clears the goal
    #[serde(default)]
    pub savings_goal: Option<String>,
    /// Draft expense list. An empty draft clears the list.
    #[serde(default)]
    pub expenses: Option<Vec<Expense>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single field that actually differs from the live plan
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Income(f64),
    CurrentSavings(f64),
    SavingsGoal(Option<f64>),
    Expenses(Vec<Expense>),
}

impl FieldEdits {
    /// Fields whose coerced value differs from `current`, in a fixed order.
    /// Negative amounts are rejected.
    pub fn changes(&self, current: &FinancialData) -> Result<Vec<FieldChange>> {
        let mut changes = Vec::new();

        if let Some(value) = edited_amount(self.income.as_deref(), "Income")? {
            if value != current.income {
                changes.push(FieldChange::Income(value));
            }
        }

        if let Some(value) = edited_amount(self.current_savings.as_deref(), "Current savings")? {
            if value != current.current_savings {
                changes.push(FieldChange::CurrentSavings(value));
            }
        }

        if let Some(raw) = self.savings_goal.as_deref() {
            let goal = if raw.trim().is_empty() {
                Some(None)
            } else {
                edited_amount(Some(raw), "Savings goal")?.map(Some)
            };
            if let Some(goal) = goal {
                if goal != current.savings_goal {
                    changes.push(FieldChange::SavingsGoal(goal));
                }
            }
        }

        if let Some(draft) = &self.expenses {
            if expenses_differ(draft, &current.expenses) {
                changes.push(FieldChange::Expenses(draft.clone()));
            }
        }

        Ok(changes)
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// The apply action is enabled only when something would change.
    pub fn has_changes(&self, current: &FinancialData) -> bool {
        self.notes().is_some() || matches!(self.changes(current), Ok(c) if !c.is_empty())
    }
}

/// Draft and live lists differ when membership, order, names or amounts differ.
fn expenses_differ(draft: &[Expense], live: &[Expense]) -> bool {
    draft.len() != live.len()
        || draft
            .iter()
            .zip(live)
            .any(|(d, l)| d.name.trim() != l.name.trim() || d.amount != l.amount)
}

fn edited_amount(raw: Option<&str>, field: &str) -> Result<Option<f64>> {
    match raw.and_then(coerce_amount) {
        Some(value) if value < 0.0 => Err(PlannerError::InvalidInput(format!(
            "{} cannot be negative",
            field
        ))),
        value => Ok(value),
    }
}

/// Coerce user-typed numbers: `$`, thousands commas and whitespace are ignored.
pub fn coerce_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

//
// ================= Item Updates =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Strategy,
    Action,
    Expense,
    Weekly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    /// Regenerate a different variant in place
    Remix,
    /// Append a follow-on
    Complete,
}

/// Item selection from the UI. Targets are display text (strategy title,
/// action text, expense name), not ids. Weekly check-ins need no target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub kind: ItemKind,
    pub action: ItemAction,
    #[serde(default)]
    pub target: Option<String>,
}

impl ItemRequest {
    /// Resolve the target against the live plan, returning its exact display
    /// text. `None` when the item does not exist.
    pub fn resolve(&self, current: &FinancialData) -> Option<String> {
        let wanted = self.target.as_deref().map(str::trim).unwrap_or_default();
        let same = |candidate: &str| candidate.trim().eq_ignore_ascii_case(wanted);

        match self.kind {
            ItemKind::Weekly => Some(current.plan.weekly_check_in.clone()),
            ItemKind::Strategy => current
                .plan
                .strategies
                .iter()
                .find(|s| same(&s.title))
                .map(|s| s.title.clone()),
            ItemKind::Action => current
                .plan
                .action_items
                .iter()
                .find(|a| same(&a.action))
                .map(|a| a.action.clone()),
            ItemKind::Expense => current
                .expenses
                .iter()
                .find(|e| same(&e.name))
                .map(|e| e.name.clone()),
        }
    }
}

//
// ================= Portfolio =================
//

/// One `"{percentage}% {name}"` line per allocation
pub fn format_allocations(allocations: &[Allocation]) -> String {
    allocations
        .iter()
        .map(Allocation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{reconcile, Fallback};
    use serde_json::json;

    fn live() -> FinancialData {
        reconcile(
            &json!({
                "income": 5000,
                "currentSavings": 1000,
                "savingsGoal": 8000,
                "expenses": [{"name": "Rent", "amount": 1500}, {"name": "Coffee", "amount": 60}],
                "plan": {
                    "strategies": [{"title": "Brew at home", "description": "", "impact": "", "difficulty": "easy"}],
                    "actionItems": [{"action": "Buy a grinder", "timeframe": "This week", "category": "cut"}]
                }
            }),
            &Fallback::default(),
        )
    }

    #[test]
    fn test_untouched_edits_have_no_changes() {
        let edits = FieldEdits {
            income: Some("$5,000".into()),
            current_savings: Some("1000.00".into()),
            savings_goal: Some("8000".into()),
            expenses: Some(live().expenses),
            notes: Some("   ".into()),
        };
        assert!(!edits.has_changes(&live()));
    }

    #[test]
    fn test_numeric_change_detected() {
        let edits = FieldEdits {
            income: Some("5500".into()),
            ..Default::default()
        };
        assert_eq!(edits.changes(&live()).unwrap(), vec![FieldChange::Income(5500.0)]);
    }

    #[test]
    fn test_blank_goal_clears() {
        let edits = FieldEdits {
            savings_goal: Some("".into()),
            ..Default::default()
        };
        assert_eq!(edits.changes(&live()).unwrap(), vec![FieldChange::SavingsGoal(None)]);
    }

    #[test]
    fn test_unparseable_value_is_ignored() {
        let edits = FieldEdits {
            income: Some("lots".into()),
            ..Default::default()
        };
        assert!(!edits.has_changes(&live()));
    }

    #[test]
    fn test_draft_expense_difference() {
        let mut draft = live().expenses;
        draft[1].amount = 40.0;
        let edits = FieldEdits {
            expenses: Some(draft.clone()),
            ..Default::default()
        };
        assert_eq!(edits.changes(&live()).unwrap(), vec![FieldChange::Expenses(draft)]);

        let cleared = FieldEdits {
            expenses: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(cleared.changes(&live()).unwrap(), vec![FieldChange::Expenses(vec![])]);
    }

    #[test]
    fn test_negative_amounts_are_rejected() {
        let edits = FieldEdits {
            income: Some("-500".into()),
            ..Default::default()
        };
        assert!(matches!(edits.changes(&live()), Err(PlannerError::InvalidInput(_))));
        assert!(!edits.has_changes(&live()));

        let goal = FieldEdits {
            savings_goal: Some("-$1,000".into()),
            ..Default::default()
        };
        assert!(goal.changes(&live()).is_err());

        let zero = FieldEdits {
            current_savings: Some("0".into()),
            ..Default::default()
        };
        assert_eq!(zero.changes(&live()).unwrap(), vec![FieldChange::CurrentSavings(0.0)]);
    }

    #[test]
    fn test_notes_alone_enable_update() {
        let edits = FieldEdits {
            notes: Some("I got a raise next month".into()),
            ..Default::default()
        };
        assert!(edits.has_changes(&live()));
    }

    #[test]
    fn test_item_resolution_is_case_insensitive() {
        let request = ItemRequest {
            kind: ItemKind::Expense,
            action: ItemAction::Remix,
            target: Some("rent".into()),
        };
        assert_eq!(request.resolve(&live()), Some("Rent".to_string()));

        let missing = ItemRequest {
            kind: ItemKind::Strategy,
            action: ItemAction::Complete,
            target: Some("Sell the car".into()),
        };
        assert_eq!(missing.resolve(&live()), None);
    }

    #[test]
    fn test_format_allocations() {
        let allocations = vec![
            Allocation { name: "US stocks".into(), percentage: 60.0 },
            Allocation { name: "Bonds".into(), percentage: 40.0 },
        ];
        assert_eq!(format_allocations(&allocations), "60% US stocks\n40% Bonds");
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(" $1,250.50 "), Some(1250.5));
        assert_eq!(coerce_amount(""), None);
        assert_eq!(coerce_amount("NaN"), None);
    }
}
