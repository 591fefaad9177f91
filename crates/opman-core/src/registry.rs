//! Ordered registry of operator identities.
//!
//! Insertion order is the rotation order used by the round-robin strategy.
//! Entries are never edited in place; replacing an endpoint means removing
//! the entry and adding it again, which also moves it to the end of the
//! rotation.
//!
//! # Invariants
//!
//! - No two entries share an address.
//! - No two entries share a label.
//! - The open sentinel is never registered.
//! - At most [`MAX_OPERATORS`] entries.
//!
//! The registry itself performs no capability checks; the owning strategy
//! checks the administrator before calling into it.

use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::identity::Address;

/// Maximum number of registered operators.
pub const MAX_OPERATORS: usize = 256;

/// Maximum label length in bytes.
pub const MAX_LABEL_LEN: usize = 64;

/// Maximum endpoint URI length in bytes.
pub const MAX_ENDPOINT_LEN: usize = 512;

/// One registered operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorEntry {
    /// Human-readable label, e.g. `REL-01`.
    pub label: String,
    /// The operator identity.
    pub address: Address,
    /// Where the operator's relayer is reachable.
    pub endpoint: String,
}

impl OperatorEntry {
    /// Creates an entry after checking field limits.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::InvalidInput` for an empty or oversized label,
    /// an oversized endpoint, or the open sentinel as address.
    pub fn new(
        label: impl Into<String>,
        address: Address,
        endpoint: impl Into<String>,
    ) -> Result<Self, OperatorError> {
        let label = label.into();
        let endpoint = endpoint.into();

        if label.is_empty() {
            return Err(OperatorError::invalid_input("label", "must not be empty"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(OperatorError::invalid_input(
                "label",
                format!("exceeds {MAX_LABEL_LEN} bytes"),
            ));
        }
        if endpoint.len() > MAX_ENDPOINT_LEN {
            return Err(OperatorError::invalid_input(
                "endpoint",
                format!("exceeds {MAX_ENDPOINT_LEN} bytes"),
            ));
        }
        if address.is_open() {
            return Err(OperatorError::invalid_input(
                "address",
                "the open sentinel cannot be registered",
            ));
        }

        Ok(Self {
            label,
            address,
            endpoint,
        })
    }
}

/// Ordered operator registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRegistry {
    entries: Vec<OperatorEntry>,
}

impl OperatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::DuplicateOperator` if the address or label is
    /// already present, or `OperatorError::InvalidInput` if the registry is
    /// full.
    pub fn insert(&mut self, entry: OperatorEntry) -> Result<(), OperatorError> {
        if self
            .entries
            .iter()
            .any(|e| e.address == entry.address || e.label == entry.label)
        {
            return Err(OperatorError::DuplicateOperator {
                label: entry.label,
                address: entry.address,
            });
        }
        if self.entries.len() >= MAX_OPERATORS {
            return Err(OperatorError::invalid_input(
                "operators",
                format!("registry is full ({MAX_OPERATORS} entries)"),
            ));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes the entry for `address`, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::NotFound` if no entry has that address.
    pub fn remove(&mut self, address: &Address) -> Result<OperatorEntry, OperatorError> {
        let index = self
            .position(address)
            .ok_or(OperatorError::NotFound { address: *address })?;
        Ok(self.entries.remove(index))
    }

    /// Returns the entry for `address`.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&OperatorEntry> {
        self.entries.iter().find(|e| e.address == *address)
    }

    /// Returns the entry with `label`.
    #[must_use]
    pub fn by_label(&self, label: &str) -> Option<&OperatorEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Returns the rotation index of `address`.
    #[must_use]
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.entries.iter().position(|e| e.address == *address)
    }

    /// Returns the entry at rotation index `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&OperatorEntry> {
        self.entries.get(index)
    }

    /// Returns `true` if `address` is registered.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.position(address).is_some()
    }

    /// Returns all entries in rotation order.
    #[must_use]
    pub fn entries(&self) -> &[OperatorEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
