//! Time-bucketed transaction summaries for the profile charts.
//!
//! Each function takes a slice of transactions and produces a [`BucketSet`]:
//! a fixed list of labels with one income sum and one expense sum per label.
//! The functions are pure and allocate their own buckets on every call, so
//! concurrent requests never share an accumulator.
//!
//! Bucketing works on the transaction's stored calendar date exactly as it
//! was recorded. No timezone conversion is applied, so a transaction can
//! never move between buckets depending on where the server runs.

use chrono::Datelike;
use serde::Serialize;

use crate::{Transaction, TransactionType};

/// Labels for [`bucket_by_month`], indexed by zero-based calendar month.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Labels for [`bucket_by_week_of_month`].
pub const WEEK_OF_MONTH_LABELS: [&str; 4] = ["Week 1", "Week 2", "Week 3", "Week 4"];

/// Labels for [`bucket_by_weekday`], Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// One time-granularity view over a list of transactions.
///
/// `income` and `expenses` have the same length and order as `labels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSet {
    pub labels: Vec<&'static str>,
    pub income: Vec<f64>,
    pub expenses: Vec<f64>,
}

impl BucketSet {
    fn with_labels(labels: &'static [&'static str]) -> Self {
        Self {
            labels: labels.to_vec(),
            income: vec![0.0; labels.len()],
            expenses: vec![0.0; labels.len()],
        }
    }

    fn add(&mut self, index: usize, transaction: &Transaction) {
        match transaction.transaction_type() {
            TransactionType::Income => self.income[index] += transaction.amount().as_f64(),
            TransactionType::Expense => self.expenses[index] += transaction.amount().as_f64(),
        }
    }
}

/// The three chart views served by the chart data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Sums per calendar month, across all years.
    pub all: BucketSet,
    /// Sums per week of the month.
    pub monthly: BucketSet,
    /// Sums per day of the week.
    pub weekly: BucketSet,
}

/// Compute all three chart views in one pass over `transactions`.
pub fn chart_data(transactions: &[Transaction]) -> ChartData {
    ChartData {
        all: bucket_by_month(transactions),
        monthly: bucket_by_week_of_month(transactions),
        weekly: bucket_by_weekday(transactions),
    }
}

/// Sum transactions into the twelve calendar months.
///
/// The year is ignored: a January 2023 transaction and a January 2024
/// transaction land in the same "Jan" bucket. This matches what the chart in
/// the mobile app expects, but it does mean multi-year histories are
/// collapsed rather than split.
pub fn bucket_by_month(transactions: &[Transaction]) -> BucketSet {
    let mut buckets = BucketSet::with_labels(&MONTH_LABELS);

    for transaction in transactions {
        buckets.add(transaction.date().month0() as usize, transaction);
    }

    buckets
}

/// Sum transactions into four week-of-month buckets.
///
/// The bucket index is `day_of_month / 7` with the 1-based day, so "Week 1"
/// covers days 1-6 and "Week 4" covers days 21-27. Days 28-31 would index a
/// fifth bucket that does not exist; they are clamped into "Week 4" so that
/// month-end transactions still count toward the chart totals.
pub fn bucket_by_week_of_month(transactions: &[Transaction]) -> BucketSet {
    let mut buckets = BucketSet::with_labels(&WEEK_OF_MONTH_LABELS);

    for transaction in transactions {
        let week = usize::min(
            transaction.date().day() as usize / 7,
            WEEK_OF_MONTH_LABELS.len() - 1,
        );
        buckets.add(week, transaction);
    }

    buckets
}

/// Sum transactions into the seven days of the week, Monday first.
///
/// Index 0 must mean Monday to line up with [`WEEKDAY_LABELS`], hence
/// `num_days_from_monday` rather than a Sunday-based weekday number.
pub fn bucket_by_weekday(transactions: &[Transaction]) -> BucketSet {
    let mut buckets = BucketSet::with_labels(&WEEKDAY_LABELS);

    for transaction in transactions {
        let weekday = transaction.date().weekday().num_days_from_monday() as usize;
        buckets.add(weekday, transaction);
    }

    buckets
}
