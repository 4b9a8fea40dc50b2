use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DatabaseID, UserID};

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0} is not a valid transaction amount")]
pub struct AmountError(pub String);

/// A non-negative monetary quantity in the application's single implicit
/// currency unit.
///
/// Whether an amount adds to or subtracts from the user's balance is derived
/// from the transaction's [`TransactionType`], never from the sign of the
/// amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    /// Create a new amount.
    ///
    /// # Errors
    ///
    /// This function will return an error if `value` is negative, NaN, or
    /// infinite.
    pub fn new(value: f64) -> Result<Self, AmountError> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(AmountError(value.to_string()))
        }
    }

    /// Create a new amount without validation.
    ///
    /// This function should only be called on values from a trusted source of
    /// validated values such as the application's database.
    pub fn new_unchecked(value: f64) -> Self {
        Self(value)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0} is not a valid transaction type")]
pub struct TransactionTypeError(pub String);

/// Whether a transaction records money earned or money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// The string stored in the database and sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(TransactionTypeError(other.to_string())),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// New instances should be created through `TransactionData::insert(...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: DatabaseID,
    name: String,
    amount: Amount,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    date: NaiveDate,
    user_id: UserID,
}

impl Transaction {
    /// Create a new `Transaction`.
    ///
    /// Note that this does *not* add the transaction to the application
    /// database.
    pub fn new(
        id: DatabaseID,
        name: String,
        amount: Amount,
        transaction_type: TransactionType,
        date: NaiveDate,
        user_id: UserID,
    ) -> Self {
        Self {
            id,
            name,
            amount,
            transaction_type,
            date,
            user_id,
        }
    }

    pub fn id(&self) -> DatabaseID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn user_id(&self) -> UserID {
        self.user_id
    }
}

/// The client-supplied fields of a transaction.
///
/// The owning user is taken from the authenticated request, never from the
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub name: String,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub date: NaiveDate,
}
