//! Pair to contract resolution

use crate::chain::parse_address;
use crate::error::Result;
use ethabi::Address;
use std::collections::HashMap;
use types::Pair;

/// Contract serving a requested pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<K> {
    pub address: Address,
    /// The contract quotes the inverse of the requested pair
    pub inverted: bool,
    pub kind: K,
}

/// Configured pair to contract map
///
/// A pair registered as `A/B` also answers `B/A`, with the inversion flag flipped.
#[derive(Debug, Clone)]
pub struct ContractAddresses<K = ()> {
    entries: HashMap<Pair, Resolved<K>>,
}

impl<K> Default for ContractAddresses<K> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<K: Clone> ContractAddresses<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pair`; `inverted` marks a contract that quotes `pair.invert()`
    pub fn insert(&mut self, pair: Pair, address: &str, inverted: bool, kind: K) -> Result<()> {
        let address = parse_address(address)?;
        self.entries.insert(pair, Resolved { address, inverted, kind });
        Ok(())
    }

    pub fn resolve(&self, pair: &Pair) -> Option<Resolved<K>> {
        if let Some(entry) = self.entries.get(pair) {
            return Some(entry.clone());
        }
        self.entries.get(&pair.invert()).map(|entry| Resolved {
            inverted: !entry.inverted,
            ..entry.clone()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.entries.keys()
    }
}
