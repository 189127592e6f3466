//! Generator prompt templates
//!
//! Every update prompt echoes the current plan as JSON so the generator can
//! locate the targeted item by its display text and return a full object.

use crate::intents::{format_allocations, FieldChange, ItemAction, ItemKind};
use crate::models::{Allocation, FinancialData};
use crate::Result;

const SYSTEM_INSTRUCTIONS: &str = r#"You are a personal finance planner.

Read the user's description of their income, expenses and savings goals and
produce a practical monthly plan.

Rules:
- All amounts are monthly numbers in dollars (convert weekly or yearly figures)
- Expense priority is one of: "essential", "important", "discretionary"
- Strategy difficulty is one of: "easy", "medium", "hard"
- Action item category is one of: "cut", "optimize", "earn", "automate", "track"
- Return ONLY valid JSON
- No explanation text"#;

const RESPONSE_SCHEMA: &str = r#"{
  "income": 0,
  "currentSavings": 0,
  "savingsGoal": null,
  "expenses": [
    { "name": "...", "amount": 0, "priority": "essential", "recommendation": "..." }
  ],
  "plan": {
    "title": "...",
    "overview": "...",
    "monthlyBudget": { "needs": 0, "wants": 0, "savings": 0 },
    "strategies": [
      { "title": "...", "description": "...", "impact": "...", "difficulty": "easy" }
    ],
    "actionItems": [
      { "action": "...", "timeframe": "...", "category": "cut" }
    ],
    "weeklyCheckIn": "...",
    "potentialSavings": 0,
    "motivationalNote": "..."
  }
}"#;

const RECOMPUTE_INSTRUCTION: &str =
    "Recalculate the monthly budget, recommendations and potential savings to reflect these changes.";

/// Prompt for the first generation from free text
pub fn generation_prompt(user_text: &str) -> String {
    format!(
        "{}\n\nJSON format:\n\n{}\n\nUSER DESCRIPTION:\n{}\n",
        SYSTEM_INSTRUCTIONS,
        RESPONSE_SCHEMA,
        user_text.trim()
    )
}

/// Batched field edits: one instruction line per change, then notes, then
/// the recompute instruction.
pub fn field_update_prompt(
    current: &FinancialData,
    changes: &[FieldChange],
    notes: Option<&str>,
) -> Result<String> {
    let mut lines: Vec<String> = changes.iter().map(describe_change).collect();

    if let Some(notes) = notes {
        lines.push(format!("Additional notes from the user: {}", notes));
    }
    lines.push(RECOMPUTE_INSTRUCTION.to_string());

    with_current_data(&lines.join("\n"), current)
}

fn describe_change(change: &FieldChange) -> String {
    match change {
        FieldChange::Income(value) => format!("Update monthly income to ${}.", value),
        FieldChange::CurrentSavings(value) => format!("Update current savings to ${}.", value),
        FieldChange::SavingsGoal(Some(value)) => format!("Update the savings goal to ${}.", value),
        FieldChange::SavingsGoal(None) => {
            "Remove the savings goal (set savingsGoal to null).".to_string()
        }
        FieldChange::Expenses(expenses) if expenses.is_empty() => {
            "Clear all expenses (set expenses to an empty list).".to_string()
        }
        FieldChange::Expenses(expenses) => {
            let listed = expenses
                .iter()
                .map(|e| format!("- {}: ${}", e.name, e.amount))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Replace the expense list with exactly these expenses, keeping their names and amounts:\n{}",
                listed
            )
        }
    }
}

/// Remix or complete a single item, targeted by its display text
pub fn item_update_prompt(
    current: &FinancialData,
    kind: ItemKind,
    action: ItemAction,
    target: &str,
) -> Result<String> {
    let instruction = match (kind, action) {
        (ItemKind::Strategy, ItemAction::Remix) => format!(
            "Replace the strategy titled \"{}\" with a different strategy that fits this plan. Keep all other strategies unchanged.",
            target
        ),
        (ItemKind::Strategy, ItemAction::Complete) => format!(
            "Add one new strategy that builds on the strategy titled \"{}\". Keep all existing strategies unchanged.",
            target
        ),
        (ItemKind::Action, ItemAction::Remix) => format!(
            "Replace the action item \"{}\" with a different action item. Keep all other action items unchanged.",
            target
        ),
        (ItemKind::Action, ItemAction::Complete) => format!(
            "Add one follow-on action item to do after completing \"{}\". Keep all existing action items unchanged.",
            target
        ),
        (ItemKind::Expense, ItemAction::Remix) => format!(
            "Rewrite ONLY the recommendation of the expense named \"{}\". Keep every expense, including its name, amount and priority, exactly as it is. Do not add or remove expenses.",
            target
        ),
        (ItemKind::Expense, ItemAction::Complete) => format!(
            "Append a follow-on suggestion to the recommendation of the expense named \"{}\". Keep every expense, including its name, amount and priority, exactly as it is. Do not add or remove expenses.",
            target
        ),
        (ItemKind::Weekly, ItemAction::Remix) => format!(
            "Rewrite the weekly check-in with a different routine. The current check-in is: \"{}\"",
            target
        ),
        (ItemKind::Weekly, ItemAction::Complete) => format!(
            "Extend the weekly check-in with a follow-on step. The current check-in is: \"{}\"",
            target
        ),
    };

    let instruction = format!(
        "{}\nDo not change income, savings or any other part of the plan.",
        instruction
    );
    with_current_data(&instruction, current)
}

/// Replace the full allocation list
pub fn portfolio_update_prompt(
    current: &FinancialData,
    allocations: &[Allocation],
) -> Result<String> {
    let instruction = format!(
        "Replace plan.portfolio.allocations with exactly these allocations:\n{}\nUpdate the strategies and action items if the new allocation calls for it.",
        format_allocations(allocations)
    );
    with_current_data(&instruction, current)
}

/// Ask for a prose quality summary of an allocation list
pub fn portfolio_quality_prompt(
    current: &FinancialData,
    allocations: &[Allocation],
) -> Result<String> {
    let instruction = format!(
        "Assess the quality of this portfolio for the user's situation:\n{}\nWrite a short prose assessment (diversification, risk, fit with the savings goal) into plan.portfolio.qualitySummary. Keep the allocations exactly as listed.",
        format_allocations(allocations)
    );
    with_current_data(&instruction, current)
}

fn with_current_data(instruction: &str, current: &FinancialData) -> Result<String> {
    let current_json = serde_json::to_string_pretty(current)?;
    Ok(format!(
        "{}\n\nUPDATE REQUEST:\n{}\n\nCURRENT DATA:\n{}\n\nReturn the COMPLETE updated JSON object with the same structure as CURRENT DATA.\n",
        SYSTEM_INSTRUCTIONS, instruction, current_json
    ))
}
