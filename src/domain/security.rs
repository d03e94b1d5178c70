use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// Extra claims embedded in an issued token alongside the subject.
pub type TokenClaims = BTreeMap<String, Value>;

/// One-way salted password hashing.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, raw_password: &str) -> Result<String>;
    /// Never fails: anything that does not verify, including a malformed
    /// hash, is a mismatch.
    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;
    /// Does the work of a `matches` call when there is no stored hash, so
    /// an unknown account costs as much time as a wrong password.
    fn simulate_matches(&self, _raw_password: &str) {}
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    fn generate_token(&self, subject: &str, claims: &TokenClaims) -> Result<String>;
}
