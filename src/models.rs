//! Core data models for the financial plan
//!
//! Field names serialize in camelCase so snapshots match what the UI renders.

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Essential,
    #[default]
    Important,
    Discretionary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Cut,
    #[default]
    Optimize,
    Earn,
    Automate,
    Track,
}

impl Priority {
    /// Lenient, case-insensitive parse of generator output
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "essential" => Some(Priority::Essential),
            "important" => Some(Priority::Important),
            "discretionary" => Some(Priority::Discretionary),
            _ => None,
        }
    }
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl ActionCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cut" => Some(ActionCategory::Cut),
            "optimize" => Some(ActionCategory::Optimize),
            "earn" => Some(ActionCategory::Earn),
            "automate" => Some(ActionCategory::Automate),
            "track" => Some(ActionCategory::Track),
            _ => None,
        }
    }
}

//
// ================= Financial Data =================
//

/// Root object rendered by the UI. Replaced wholesale on every generation
/// or update call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialData {
    /// Monthly, normalized
    pub income: f64,
    #[serde(default)]
    pub current_savings: f64,
    #[serde(default)]
    pub savings_goal: Option<f64>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    pub plan: Plan,
}

impl FinancialData {
    pub fn total_expenses(&self) -> f64 {
        total_expenses(&self.expenses)
    }

    pub fn monthly_savings(&self) -> f64 {
        self.income - self.total_expenses()
    }
}

pub fn total_expenses(expenses: &[Expense]) -> f64 {
    expenses.iter().fold(0.0, |total, e| total + e.amount)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub recommendation: String,
}

impl Expense {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
            priority: Priority::default(),
            recommendation: String::new(),
        }
    }
}

//
// ================= Plan =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub title: String,
    pub overview: String,
    pub monthly_budget: MonthlyBudget,
    pub strategies: Vec<Strategy>,
    pub action_items: Vec<ActionItem>,
    pub weekly_check_in: String,
    pub potential_savings: f64,
    pub motivational_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<Portfolio>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonthlyBudget {
    pub needs: f64,
    pub wants: f64,
    pub savings: f64,
}

impl MonthlyBudget {
    /// 50/30/20 split of monthly income
    pub fn from_income(income: f64) -> Self {
        Self {
            needs: (income * 0.5).round(),
            wants: (income * 0.3).round(),
            savings: (income * 0.2).round(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Strategy {
    pub title: String,
    pub description: String,
    pub impact: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionItem {
    pub action: String,
    pub timeframe: String,
    pub category: ActionCategory,
}

//
// ================= Portfolio =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub allocations: Vec<Allocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub name: String,
    pub percentage: f64,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% {}", self.percentage, self.name)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Essential => "essential",
            Priority::Important => "important",
            Priority::Discretionary => "discretionary",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_split_from_income() {
        let budget = MonthlyBudget::from_income(5000.0);
        assert_eq!(budget.needs, 2500.0);
        assert_eq!(budget.wants, 1500.0);
        assert_eq!(budget.savings, 1000.0);
    }

    #[test]
    fn test_camel_case_serialization() {
        let expense = Expense {
            name: "rent".to_string(),
            amount: 1500.0,
            priority: Priority::Essential,
            recommendation: "Keep it".to_string(),
        };
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["priority"], "essential");

        let portfolio = Portfolio {
            allocations: vec![Allocation { name: "Stocks".into(), percentage: 60.0 }],
            quality_summary: Some("Balanced".into()),
        };
        let json = serde_json::to_value(&portfolio).unwrap();
        assert_eq!(json["qualitySummary"], "Balanced");
    }

    #[test]
    fn test_enum_parsing_is_lenient() {
        assert_eq!(Priority::parse(" Essential "), Some(Priority::Essential));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(ActionCategory::parse("automate"), Some(ActionCategory::Automate));
    }

    #[test]
    fn test_total_of_no_expenses_is_positive_zero() {
        let total = total_expenses(&[]);
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());
    }

    #[test]
    fn test_allocation_display() {
        let allocation = Allocation { name: "Bonds".into(), percentage: 40.0 };
        assert_eq!(allocation.to_string(), "40% Bonds");
    }
}
