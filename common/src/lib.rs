//! Domain types and reporting logic shared between the HTTP service and its
//! clients.
//!
//! This crate owns the validated newtypes ([`Email`], [`Amount`], the password
//! types), the [`Transaction`] record, and the pure reporting functions in
//! [`chart`] and [`stats`] that turn a user's transaction list into the data
//! consumed by the mobile app's charts and profile screen.

use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod chart;
mod email;
mod password;
pub mod stats;
mod transaction;

pub use email::{Email, EmailAddressError};
pub use password::{PasswordError, PasswordHash, RawPassword};
pub use transaction::{
    Amount, AmountError, NewTransaction, Transaction, TransactionType, TransactionTypeError,
};

/// An alias for the integer type used for row IDs in the application database.
pub type DatabaseID = i64;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better
/// compile time errors and distinct trait implementations per ID type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// New instances should be created through `NewUser::insert(...)` so that the
/// ID and join date come from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserID,
    username: String,
    password_hash: PasswordHash,
    name: String,
    email: Email,
    join_date: NaiveDate,
    profile_image: Option<String>,
}

impl User {
    /// Create a new `User`.
    ///
    /// Note that this does *not* add the user to the application database.
    pub fn new(
        id: UserID,
        username: String,
        password_hash: PasswordHash,
        name: String,
        email: Email,
        join_date: NaiveDate,
        profile_image: Option<String>,
    ) -> Self {
        Self {
            id,
            username,
            password_hash,
            name,
            email,
            join_date,
            profile_image,
        }
    }

    pub fn id(&self) -> UserID {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn join_date(&self) -> NaiveDate {
        self.join_date
    }

    pub fn profile_image(&self) -> Option<&str> {
        self.profile_image.as_deref()
    }
}

/// The data needed to register a new user.
///
/// The database assigns the ID and stamps the join date on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: PasswordHash,
    pub name: String,
    pub email: Email,
}
