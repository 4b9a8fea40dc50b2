use std::fmt::Display;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0} is not a valid email address")]
pub struct EmailAddressError(pub String);

/// A validated email address.
///
/// Validation happens at construction and at deserialization, so route
/// handlers and the database layer can assume the inner string is well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// # Errors
    ///
    /// This function will return an error if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, EmailAddressError> {
        if EmailAddress::is_valid(raw_email) {
            Ok(Self(raw_email.to_string()))
        } else {
            Err(EmailAddressError(raw_email.to_string()))
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted email
    /// address, e.g. a value read back from the application database. For
    /// emails coming from the client this function should **not** be used,
    /// instead use the checked version.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// an incorrectly formatted email will cause incorrect behaviour but not
    /// affect memory safety.
    pub fn new_unchecked(raw_email: String) -> Self {
        Self(raw_email)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = EmailAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
