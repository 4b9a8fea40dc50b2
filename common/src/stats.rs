//! Scalar statistics for the profile screen.

use serde::{Deserialize, Serialize};

use crate::{Transaction, TransactionType};

/// Lifetime totals and savings rate for a user's transaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_transactions: usize,
    pub total_income: f64,
    pub total_expenses: f64,
    /// Percentage of income left after expenses, e.g. `"70.0%"`.
    pub savings_rate: String,
}

impl UserStats {
    /// Compute the profile statistics for `transactions`.
    ///
    /// This never fails: an empty slice produces all-zero totals and a
    /// savings rate of `"0%"`.
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut total_income = 0.0;
        let mut total_expenses = 0.0;

        for transaction in transactions {
            match transaction.transaction_type() {
                TransactionType::Income => total_income += transaction.amount().as_f64(),
                TransactionType::Expense => total_expenses += transaction.amount().as_f64(),
            }
        }

        Self {
            total_transactions: transactions.len(),
            total_income,
            total_expenses,
            savings_rate: savings_rate(total_income, total_expenses),
        }
    }
}

/// Format the savings rate as a percentage string.
///
/// With no income the rate is the literal `"0%"` (not `"0.0%"`). The mobile
/// app's profile screen renders this string as-is, so the bare-zero form is
/// kept for compatibility. Rates are not clamped: spending more than you earn
/// yields a negative percentage.
fn savings_rate(total_income: f64, total_expenses: f64) -> String {
    if total_income > 0.0 {
        format!(
            "{:.1}%",
            (total_income - total_expenses) / total_income * 100.0
        )
    } else {
        "0%".to_string()
    }
}
