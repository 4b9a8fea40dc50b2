use std::fmt::{Debug, Display};

use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zxcvbn::{feedback::Feedback, zxcvbn, Score};

/// The errors that may occur when validating, hashing, or verifying passwords.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// An empty string was used as a password.
    #[error("password cannot be empty")]
    Empty,

    /// The password is considered too easy to guess.
    ///
    /// The message explains why the password is considered weak and suggests
    /// how to make it stronger.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred in the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// Clients should receive a general internal server error instead.
    #[error("hashing failed: {0}")]
    HashingError(String),
}

/// A password as the user entered it, before any hashing.
///
/// The type only guarantees the password is non-empty. Strength checking
/// happens in [`PasswordHash::from_raw_password`] so that sign-in can still
/// verify passwords that would fail today's strength requirements.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPassword(String);

impl RawPassword {
    /// Wrap a raw password string.
    ///
    /// # Errors
    ///
    /// This function will return an error if `raw_password` is empty.
    pub fn new(raw_password: String) -> Result<Self, PasswordError> {
        if raw_password.is_empty() {
            Err(PasswordError::Empty)
        } else {
            Ok(Self(raw_password))
        }
    }

    /// Create a new `RawPassword` without any validation.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// an invalid password will cause incorrect behaviour but not affect
    /// memory safety.
    pub fn new_unchecked(raw_password: String) -> Self {
        Self(raw_password)
    }
}

impl AsRef<str> for RawPassword {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for RawPassword {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

// Raw passwords must never end up in logs, so both `Debug` and `Display`
// print a fixed-length mask.
impl Debug for RawPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawPassword(\"{}\")", str::repeat("*", 8))
    }
}

impl Display for RawPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Create a hashed password from a raw password, without checking its
    /// strength.
    ///
    /// Use [`PasswordHash::from_raw_password`] for passwords coming from the
    /// registration endpoint.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(raw_password: &RawPassword) -> Result<Self, PasswordError> {
        match hash(raw_password, DEFAULT_COST) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(PasswordError::HashingError(e.to_string())),
        }
    }

    /// Create a hashed password from a raw password, rejecting weak passwords.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password is considered too
    /// easy to guess, or if the password could not be hashed.
    pub fn from_raw_password(raw_password: &RawPassword) -> Result<Self, PasswordError> {
        let password_analysis = zxcvbn(raw_password.as_ref(), &[]);

        match password_analysis.score() {
            Score::Three | Score::Four => PasswordHash::new(raw_password),
            _ => Err(PasswordError::TooWeak(
                password_analysis
                    .feedback()
                    .unwrap_or(&Feedback::default())
                    .to_string(),
            )),
        }
    }

    /// Create a new `PasswordHash` without any validation.
    ///
    /// This function should only be called on strings coming out of a trusted
    /// source such as the application's database.
    pub fn new_unchecked(raw_password_hash: String) -> Self {
        Self(raw_password_hash)
    }

    /// Check that `raw_password` matches the stored password.
    ///
    /// # Errors
    ///
    /// This function will return an error if the stored hash could not be
    /// parsed by the hashing library.
    pub fn verify(&self, raw_password: &RawPassword) -> Result<bool, PasswordError> {
        verify(raw_password, &self.0).map_err(|e| PasswordError::HashingError(e.to_string()))
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}


#[cfg(test)]
mod password_hash_tests {
    use crate::{PasswordError, PasswordHash, RawPassword};

    #[test]
    fn verify_password_succeeds_for_valid_password() {
        let hash = PasswordHash::new_unchecked(
            "$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm".to_owned(),
        );
        let password = RawPassword::new_unchecked("okon".to_owned());

        assert!(hash.verify(&password).unwrap());
    }

    #[test]
    fn verify_password_fails_for_invalid_password() {
        let hash = PasswordHash::new_unchecked(
            "$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm".to_owned(),
        );
        let password = RawPassword::new_unchecked("notthepassword".to_owned());

        assert!(!hash.verify(&password).unwrap());
    }

    #[test]
    fn new_hashes_weak_password() {
        // Sign-up seeds and legacy accounts may carry weak passwords; `new`
        // must still hash them.
        let password = RawPassword::new_unchecked("nick123".to_owned());

        let hash = PasswordHash::new(&password).unwrap();

        assert!(hash.verify(&password).unwrap());
    }

    #[test]
    fn from_raw_password_rejects_weak_password() {
        let password = RawPassword::new_unchecked("hunter2".to_owned());

        let result = PasswordHash::from_raw_password(&password);

        assert!(matches!(result, Err(PasswordError::TooWeak(_))));
    }

    #[test]
    fn from_raw_password_accepts_strong_password() {
        let password = RawPassword::new_unchecked("averysafeandsecurepassword".to_owned());

        let hash = PasswordHash::from_raw_password(&password).unwrap();

        assert!(hash.verify(&password).unwrap());
    }
}
