//! Plan reconciler
//!
//! Merges an untrusted, possibly partial generator response with fallback
//! data into one complete `FinancialData`. Every field resolves through the
//! same three tiers: generated value, then fallback value, then a default
//! derived from income. Reconciliation is total and deterministic.

use crate::extractor::{ExtractedFinancials, DEFAULT_RECOMMENDATION};
use crate::models::{
    total_expenses, ActionCategory, ActionItem, Allocation, Difficulty, Expense, FinancialData,
    MonthlyBudget, Plan, Portfolio, Priority, Strategy,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_TITLE: &str = "Your Personal Financial Plan";
pub const DEFAULT_WEEKLY_CHECK_IN: &str =
    "Every Sunday, compare this week's spending against your budget and adjust next week's limits.";
pub const DEFAULT_MOTIVATIONAL_NOTE: &str =
    "Small, steady changes add up. Every dollar you keep brings your goals closer.";

/// Gap filler for a reconciliation. Built from the loose-text extraction
/// on first generation, or from the previous `FinancialData` on updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fallback {
    pub income: Option<f64>,
    pub current_savings: Option<f64>,
    pub savings_goal: Option<f64>,
    pub expenses: Vec<Expense>,
    pub plan: Option<Plan>,
}

impl From<ExtractedFinancials> for Fallback {
    fn from(extracted: ExtractedFinancials) -> Self {
        Self {
            income: extracted.income,
            current_savings: extracted.current_savings,
            savings_goal: extracted.savings_goal,
            expenses: extracted.expenses,
            plan: None,
        }
    }
}

impl From<&FinancialData> for Fallback {
    fn from(data: &FinancialData) -> Self {
        Self {
            income: Some(data.income),
            current_savings: Some(data.current_savings),
            savings_goal: data.savings_goal,
            expenses: data.expenses.clone(),
            plan: Some(data.plan.clone()),
        }
    }
}

/// Three-tier field resolution shared by every field
fn coalesce<T>(generated: Option<T>, fallback: Option<T>, default: impl FnOnce() -> T) -> T {
    generated.or(fallback).unwrap_or_else(default)
}

/// Reconcile a generator response against fallback data.
pub fn reconcile(generated: &Value, fallback: &Fallback) -> FinancialData {
    let expenses = reconcile_expenses(generated.get("expenses"), &fallback.expenses);

    // Zero income counts as missing. Both tiers must be non-negative.
    let income = coalesce(
        number(generated.get("income")).filter(|v| *v > 0.0),
        fallback.income.filter(|v| *v >= 0.0),
        || 0.0,
    );
    let current_savings = coalesce(
        number(generated.get("currentSavings")).filter(|v| *v >= 0.0),
        fallback.current_savings.filter(|v| *v >= 0.0),
        || 0.0,
    );
    let savings_goal = number(generated.get("savingsGoal"))
        .filter(|v| *v >= 0.0)
        .or(fallback.savings_goal.filter(|v| *v >= 0.0));

    let plan = reconcile_plan(
        generated.get("plan").unwrap_or(&Value::Null),
        fallback.plan.as_ref(),
        income,
        &expenses,
    );

    debug!(
        income,
        expense_count = expenses.len(),
        strategies = plan.strategies.len(),
        action_items = plan.action_items.len(),
        "Plan reconciled"
    );

    FinancialData {
        income,
        current_savings,
        savings_goal,
        expenses,
        plan,
    }
}

/// Reconcile against a previous plan, so unedited fields survive.
pub fn reconcile_with_previous(generated: &Value, previous: &FinancialData) -> FinancialData {
    reconcile(generated, &Fallback::from(previous))
}

//
// ================= Expenses =================
//

fn reconcile_expenses(generated: Option<&Value>, fallback: &[Expense]) -> Vec<Expense> {
    let use_fallback = || merge_duplicates(sanitize_expenses(fallback.to_vec()));

    match generated {
        Some(Value::Array(items)) => {
            // Emptiness is judged after sanitizing, so a list of only
            // invalid entries behaves like an empty one
            let expenses = merge_duplicates(sanitize_expenses(
                items.iter().filter_map(expense_from_value).collect(),
            ));
            if expenses.is_empty() {
                use_fallback()
            } else {
                expenses
            }
        }
        // absent, null or not a list
        _ => use_fallback(),
    }
}

fn expense_from_value(value: &Value) -> Option<Expense> {
    let name = value.get("name")?.as_str()?.to_string();
    let amount = number(value.get("amount"))?;
    let priority = string(value.get("priority"))
        .and_then(|p| Priority::parse(&p))
        .unwrap_or_default();
    let recommendation = string(value.get("recommendation")).unwrap_or_default();

    Some(Expense {
        name,
        amount,
        priority,
        recommendation,
    })
}

/// Drop unnamed or non-positive expenses and fill missing recommendation.
fn sanitize_expenses(expenses: Vec<Expense>) -> Vec<Expense> {
    expenses
        .into_iter()
        .filter_map(|mut expense| {
            if expense.name.trim().is_empty() || !expense.amount.is_finite() || expense.amount <= 0.0 {
                return None;
            }
            if expense.recommendation.trim().is_empty() {
                expense.recommendation = DEFAULT_RECOMMENDATION.to_string();
            }
            Some(expense)
        })
        .collect()
}

/// Expenses are unique by lower-cased name; repeats are summed into the first.
fn merge_duplicates(expenses: Vec<Expense>) -> Vec<Expense> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Expense> = Vec::with_capacity(expenses.len());

    for expense in expenses {
        let key = expense.name.trim().to_lowercase();
        match index.get(&key) {
            Some(&i) => merged[i].amount += expense.amount,
            None => {
                index.insert(key, merged.len());
                merged.push(expense);
            }
        }
    }

    merged
}

//
// ================= Plan =================
//

fn reconcile_plan(
    generated: &Value,
    fallback: Option<&Plan>,
    income: f64,
    expenses: &[Expense],
) -> Plan {
    let total = total_expenses(expenses);
    let monthly_savings = income - total;

    let monthly_budget = coalesce(
        generated
            .get("monthlyBudget")
            .and_then(|v| serde_json::from_value::<MonthlyBudget>(v.clone()).ok()),
        fallback.map(|p| p.monthly_budget),
        || MonthlyBudget::from_income(income),
    );

    let title = coalesce(
        string(generated.get("title")),
        fallback.map(|p| p.title.clone()),
        || DEFAULT_TITLE.to_string(),
    );

    let overview = coalesce(
        string(generated.get("overview")),
        fallback.map(|p| p.overview.clone()),
        || default_overview(income, total, monthly_savings),
    );

    let strategies = coalesce(
        list(generated.get("strategies"), strategy_from_value),
        fallback.map(|p| p.strategies.clone()),
        || default_strategies(&monthly_budget),
    );

    let action_items = coalesce(
        list(generated.get("actionItems"), action_item_from_value),
        fallback.map(|p| p.action_items.clone()),
        default_action_items,
    );

    let weekly_check_in = coalesce(
        string(generated.get("weeklyCheckIn")),
        fallback.map(|p| p.weekly_check_in.clone()),
        || DEFAULT_WEEKLY_CHECK_IN.to_string(),
    );

    let potential_savings = coalesce(
        number(generated.get("potentialSavings")).filter(|v| *v >= 0.0),
        fallback.map(|p| p.potential_savings).filter(|v| *v >= 0.0),
        || monthly_savings.max(0.0),
    );

    let motivational_note = coalesce(
        string(generated.get("motivationalNote")),
        fallback.map(|p| p.motivational_note.clone()),
        || DEFAULT_MOTIVATIONAL_NOTE.to_string(),
    );

    let portfolio = coalesce(
        generated.get("portfolio").and_then(portfolio_from_value).map(Some),
        fallback.map(|p| p.portfolio.clone()),
        || None,
    );

    Plan {
        title,
        overview,
        monthly_budget,
        strategies,
        action_items,
        weekly_check_in,
        potential_savings,
        motivational_note,
        portfolio,
    }
}

fn strategy_from_value(value: &Value) -> Option<Strategy> {
    Some(Strategy {
        title: string(value.get("title"))?,
        description: string(value.get("description")).unwrap_or_default(),
        impact: string(value.get("impact")).unwrap_or_default(),
        difficulty: string(value.get("difficulty"))
            .and_then(|d| Difficulty::parse(&d))
            .unwrap_or_default(),
    })
}

fn action_item_from_value(value: &Value) -> Option<ActionItem> {
    Some(ActionItem {
        action: string(value.get("action"))?,
        timeframe: string(value.get("timeframe")).unwrap_or_else(|| "This month".to_string()),
        category: string(value.get("category"))
            .and_then(|c| ActionCategory::parse(&c))
            .unwrap_or_default(),
    })
}

fn portfolio_from_value(value: &Value) -> Option<Portfolio> {
    let allocations = value
        .get("allocations")?
        .as_array()?
        .iter()
        .filter_map(|item| {
            let name = string(item.get("name"))?;
            let percentage = number(item.get("percentage")).filter(|p| *p >= 0.0)?;
            Some(Allocation { name, percentage })
        })
        .collect();

    Some(Portfolio {
        allocations,
        quality_summary: string(value.get("qualitySummary")),
    })
}

//
// ================= Defaults =================
//

fn money(value: f64) -> String {
    // Adding zero turns -0.0 into 0.0
    let value = value + 0.0;
    if value < 0.0 {
        format!("-${:.0}", -value)
    } else {
        format!("${:.0}", value)
    }
}

fn default_overview(income: f64, total: f64, monthly_savings: f64) -> String {
    format!(
        "With a monthly income of {} and {} in monthly expenses, you have {} left over each month.",
        money(income),
        money(total),
        money(monthly_savings)
    )
}

fn default_strategies(budget: &MonthlyBudget) -> Vec<Strategy> {
    vec![
        Strategy {
            title: "Follow the 50/30/20 rule".to_string(),
            description: format!(
                "Aim for {} on needs, {} on wants and {} on savings each month.",
                money(budget.needs),
                money(budget.wants),
                money(budget.savings)
            ),
            impact: format!("{}/month toward savings", money(budget.savings)),
            difficulty: Difficulty::Medium,
        },
        Strategy {
            title: "Pay yourself first".to_string(),
            description: "Move your savings amount out of checking on payday, before spending starts."
                .to_string(),
            impact: "Consistent savings without relying on willpower".to_string(),
            difficulty: Difficulty::Easy,
        },
    ]
}

fn default_action_items() -> Vec<ActionItem> {
    vec![
        ActionItem {
            action: "List every recurring subscription and cancel the ones you no longer use"
                .to_string(),
            timeframe: "This week".to_string(),
            category: ActionCategory::Cut,
        },
        ActionItem {
            action: "Set up an automatic transfer to savings on payday".to_string(),
            timeframe: "This month".to_string(),
            category: ActionCategory::Automate,
        },
        ActionItem {
            action: "Record every expense for the next 30 days".to_string(),
            timeframe: "Next 30 days".to_string(),
            category: ActionCategory::Track,
        },
    ]
}

//
// ================= Value helpers =================
//

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Strings are taken verbatim; only absent, null or non-string values are missing.
fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// A JSON array, with unusable entries dropped. Not an array: `None`.
fn list<T>(value: Option<&Value>, parse: fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract;
    use serde_json::json;

    fn complete_data() -> FinancialData {
        reconcile(
            &json!({
                "income": 6000,
                "currentSavings": 2500,
                "savingsGoal": 12000,
                "expenses": [
                    {"name": "Rent", "amount": 1800, "priority": "essential", "recommendation": "Keep it"},
                    {"name": "Dining out", "amount": 350, "priority": "discretionary", "recommendation": "Halve it"}
                ],
                "plan": {
                    "title": "Road to 12k",
                    "overview": "Solid footing.",
                    "monthlyBudget": {"needs": 3000, "wants": 1800, "savings": 1200},
                    "strategies": [
                        {"title": "Cook at home", "description": "Meal prep", "impact": "$150/month", "difficulty": "easy"}
                    ],
                    "actionItems": [
                        {"action": "Cancel streaming", "timeframe": "This week", "category": "cut"}
                    ],
                    "weeklyCheckIn": "Sunday review",
                    "potentialSavings": 400,
                    "motivationalNote": "You got this",
                    "portfolio": {"allocations": [{"name": "Index fund", "percentage": 80}, {"name": "Bonds", "percentage": 20}]}
                }
            }),
            &Fallback::default(),
        )
    }

    #[test]
    fn test_empty_response_uses_extractor_fallback() {
        let fallback =
            Fallback::from(extract("Monthly Income: $5000\nRent: $1500\nGroceries: $400"));
        let data = reconcile(&json!({}), &fallback);

        assert_eq!(data.income, 5000.0);
        let expenses: Vec<_> = data.expenses.iter().map(|e| (e.name.as_str(), e.amount)).collect();
        assert_eq!(expenses, vec![("rent", 1500.0), ("groceries", 400.0)]);
        assert_eq!(
            data.plan.monthly_budget,
            MonthlyBudget { needs: 2500.0, wants: 1500.0, savings: 1000.0 }
        );
        assert_eq!(data.plan.potential_savings, 3100.0);
        assert_eq!(data.current_savings, 0.0);
        assert_eq!(data.savings_goal, None);
        assert_eq!(data.plan.title, DEFAULT_TITLE);
        assert!(!data.plan.strategies.is_empty());
        assert!(data.plan.portfolio.is_none());
    }

    #[test]
    fn test_zero_income_is_treated_as_missing() {
        let fallback = Fallback::from(extract("Income: $5000"));
        let data = reconcile(&json!({"income": 0}), &fallback);
        assert_eq!(data.income, 5000.0);
    }

    #[test]
    fn test_missing_income_without_fallback_is_zero() {
        let data = reconcile(&json!({"income": null}), &Fallback::default());
        assert_eq!(data.income, 0.0);
        assert_eq!(data.plan.monthly_budget, MonthlyBudget::from_income(0.0));
    }

    #[test]
    fn test_invalid_expenses_are_dropped_and_defaults_filled() {
        let data = reconcile(
            &json!({
                "expenses": [
                    {"name": "", "amount": 10},
                    {"name": "Gym", "amount": "40"},
                    {"name": "Refund", "amount": -20},
                    {"amount": 30},
                    {"name": "Phone", "amount": 45, "priority": "urgent"},
                    {"name": "Rent", "amount": 1200, "priority": "essential", "recommendation": ""}
                ]
            }),
            &Fallback::default(),
        );

        assert_eq!(data.expenses.len(), 2);
        assert_eq!(data.expenses[0].name, "Phone");
        assert_eq!(data.expenses[0].priority, Priority::Important);
        assert_eq!(data.expenses[0].recommendation, DEFAULT_RECOMMENDATION);
        assert_eq!(data.expenses[1].priority, Priority::Essential);
        assert_eq!(data.expenses[1].recommendation, DEFAULT_RECOMMENDATION);
    }

    #[test]
    fn test_empty_generated_expenses_fall_back() {
        let fallback = Fallback::from(extract("Rent: $1500"));
        let data = reconcile(&json!({"expenses": []}), &fallback);
        assert_eq!(data.expenses.len(), 1);
        assert_eq!(data.expenses[0].recommendation, DEFAULT_RECOMMENDATION);
        assert_eq!(data.expenses[0].priority, Priority::Important);
    }

    #[test]
    fn test_empty_generated_expenses_kept_without_fallback() {
        let data = reconcile(&json!({"expenses": []}), &Fallback::default());
        assert!(data.expenses.is_empty());
    }

    #[test]
    fn test_generated_duplicates_are_merged() {
        let data = reconcile(
            &json!({"expenses": [
                {"name": "Coffee", "amount": 50},
                {"name": "coffee", "amount": 30}
            ]}),
            &Fallback::default(),
        );
        assert_eq!(data.expenses.len(), 1);
        assert_eq!(data.expenses[0].amount, 80.0);
    }

    #[test]
    fn test_plan_fields_fall_back_to_previous_plan() {
        let previous = complete_data();
        let data = reconcile_with_previous(
            &json!({"plan": {"title": null, "weeklyCheckIn": "New check-in"}}),
            &previous,
        );

        assert_eq!(data.plan.title, "Road to 12k");
        assert_eq!(data.plan.weekly_check_in, "New check-in");
        assert_eq!(data.plan.strategies, previous.plan.strategies);
        assert_eq!(data.plan.portfolio, previous.plan.portfolio);
        assert_eq!(data.expenses, previous.expenses);
        assert_eq!(data.savings_goal, Some(12000.0));
    }

    #[test]
    fn test_malformed_plan_entries() {
        let data = reconcile(
            &json!({
                "income": 4000,
                "plan": {
                    "monthlyBudget": {"needs": "lots"},
                    "strategies": [{"title": "Sell the car", "difficulty": "brutal"}, "nonsense", {"description": "no title"}],
                    "actionItems": {"action": "not a list"},
                    "potentialSavings": -50
                }
            }),
            &Fallback::default(),
        );

        assert_eq!(data.plan.monthly_budget, MonthlyBudget::from_income(4000.0));
        assert_eq!(data.plan.strategies.len(), 1);
        assert_eq!(data.plan.strategies[0].difficulty, Difficulty::Medium);
        assert_eq!(data.plan.action_items.len(), 3);
        assert_eq!(data.plan.potential_savings, 4000.0);
    }

    #[test]
    fn test_negative_savings_defaults_potential_savings_to_zero() {
        let data = reconcile(
            &json!({"income": 1000, "expenses": [{"name": "Rent", "amount": 1500}]}),
            &Fallback::default(),
        );
        assert_eq!(data.plan.potential_savings, 0.0);
        assert!(data.plan.overview.contains("-$500"));
    }

    #[test]
    fn test_complete_data_round_trips() {
        let data = complete_data();
        assert_eq!(reconcile_with_previous(&serde_json::to_value(&data).unwrap(), &data), data);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let fallback = Fallback::from(extract("Salary: $4200\nRent: 1300\nFood: 500"));
        let first = reconcile(&json!({"plan": {"title": "Draft"}}), &fallback);
        let second = reconcile(&serde_json::to_value(&first).unwrap(), &fallback);
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_invalid_generated_expenses_stay_idempotent() {
        let fallback = Fallback::from(extract("Income: 4000\nRent: $1500"));
        let first = reconcile(&json!({"expenses": [{"name": "", "amount": 10}]}), &fallback);
        let second = reconcile(&serde_json::to_value(&first).unwrap(), &fallback);

        assert_eq!(first, second);
        assert_eq!(first.expenses.len(), 1);
        assert_eq!(first.expenses[0].name, "rent");
    }

    #[test]
    fn test_blank_and_padded_strings_round_trip() {
        let mut data = complete_data();
        data.plan.title = String::new();
        data.plan.weekly_check_in = "  Sunday review  ".to_string();
        data.plan.action_items[0].timeframe = String::new();
        data.plan.strategies[0].title = String::new();
        data.expenses[0].name = " Rent ".to_string();
        if let Some(portfolio) = data.plan.portfolio.as_mut() {
            portfolio.quality_summary = Some(String::new());
        }

        let generated = serde_json::to_value(&data).unwrap();
        assert_eq!(reconcile_with_previous(&generated, &data), data);
        assert_eq!(reconcile(&generated, &Fallback::default()), data);
    }

    #[test]
    fn test_negative_fallback_values_are_rejected() {
        let fallback = Fallback {
            income: Some(-500.0),
            current_savings: Some(-20.0),
            savings_goal: Some(-1.0),
            ..Default::default()
        };
        let data = reconcile(&json!({}), &fallback);

        assert_eq!(data.income, 0.0);
        assert_eq!(data.current_savings, 0.0);
        assert_eq!(data.savings_goal, None);
    }

    #[test]
    fn test_overview_without_expenses() {
        let data = reconcile(&json!({"income": 3000}), &Fallback::default());
        assert_eq!(
            data.plan.overview,
            "With a monthly income of $3000 and $0 in monthly expenses, you have $3000 left over each month."
        );
        assert_eq!(money(-0.0), "$0");
    }

    #[test]
    fn test_non_object_response_is_absorbed() {
        let fallback = Fallback::from(extract("Income: 3000"));
        let data = reconcile(&json!(["unexpected"]), &fallback);
        assert_eq!(data.income, 3000.0);
        assert_eq!(data.plan.motivational_note, DEFAULT_MOTIVATIONAL_NOTE);
    }
}
