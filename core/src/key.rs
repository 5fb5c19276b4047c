//! Composite keys for prefix-addressable ledger records.
//!
//! A composite key is a namespace followed by an ordered list of component
//! strings. Its encoded form places a `U+0000` delimiter before the namespace
//! and after every part:
//!
//! ```text
//! \0Order\0ticket-1\0alice\0
//! ```
//!
//! Because every part is terminated, the encoding of a key built from the
//! leading components of another key is a strict string prefix of it. A scan
//! over `Order` + `[ticket-1]` therefore yields exactly the orders of
//! `ticket-1` and never those of `ticket-10`.
//!
//! Simple (natural) keys must not start with the delimiter, which keeps the
//! two key spaces disjoint.

use crate::ledger::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter placed around every part of an encoded composite key.
pub const DELIMITER: char = '\u{0}';

/// A namespace plus ordered components, encodable into a ledger key.
///
/// # Examples
///
/// ```
/// use exchain_core::key::CompositeKey;
///
/// let key = CompositeKey::new("Order", ["ticket-1", "alice"]).unwrap();
/// assert_eq!(key.encode(), "\u{0}Order\u{0}ticket-1\u{0}alice\u{0}");
///
/// let prefix = CompositeKey::new("Order", ["ticket-1"]).unwrap();
/// assert!(key.encode().starts_with(&prefix.encode()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    namespace: String,
    components: Vec<String>,
}

impl CompositeKey {
    /// Build a composite key from a namespace and its components.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidKey`] if the namespace is empty or if
    /// the namespace or any component contains the `U+0000` delimiter.
    pub fn new<I, S>(namespace: impl Into<String>, components: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(LedgerError::InvalidKey(
                "composite key namespace cannot be empty".to_string(),
            ));
        }
        if namespace.contains(DELIMITER) {
            return Err(LedgerError::InvalidKey(format!(
                "composite key namespace {namespace:?} contains the key delimiter"
            )));
        }

        let components = components
            .into_iter()
            .map(Into::into)
            .collect::<Vec<String>>();
        if let Some(bad) = components.iter().find(|c| c.contains(DELIMITER)) {
            return Err(LedgerError::InvalidKey(format!(
                "composite key component {bad:?} contains the key delimiter"
            )));
        }

        Ok(Self {
            namespace,
            components,
        })
    }

    /// The namespace this key lives in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The ordered components of this key.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Encode the key into its ledger string form.
    #[must_use]
    pub fn encode(&self) -> String {
        let capacity = self.namespace.len()
            + self.components.iter().map(String::len).sum::<usize>()
            + self.components.len()
            + 2;
        let mut encoded = String::with_capacity(capacity);
        encoded.push(DELIMITER);
        encoded.push_str(&self.namespace);
        encoded.push(DELIMITER);
        for component in &self.components {
            encoded.push_str(component);
            encoded.push(DELIMITER);
        }
        encoded
    }

    /// Split an encoded ledger key back into namespace and components.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidKey`] if `key` is not a well-formed
    /// composite key.
    pub fn decode(key: &str) -> Result<Self, LedgerError> {
        let body = key
            .strip_prefix(DELIMITER)
            .and_then(|rest| rest.strip_suffix(DELIMITER))
            .ok_or_else(|| LedgerError::InvalidKey(format!("{key:?} is not a composite key")))?;

        let mut parts = body.split(DELIMITER);
        let namespace = parts.next().unwrap_or_default();
        Self::new(namespace, parts)
    }

    /// Whether `self` addresses a subset of the records addressed by `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.namespace == prefix.namespace && self.components.starts_with(&prefix.components)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.namespace, self.components.join(", "))
    }
}

/// Check that a natural key is usable next to composite keys.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidKey`] if the key is empty or starts with
/// the composite key delimiter.
pub fn validate_simple_key(key: &str) -> Result<(), LedgerError> {
    if key.is_empty() {
        return Err(LedgerError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.starts_with(DELIMITER) {
        return Err(LedgerError::InvalidKey(format!(
            "simple key {key:?} cannot start with the composite key delimiter"
        )));
    }
    Ok(())
}
