// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-contract schema registry.
//!
//! Maps a contract account to its resolved schema. Schemas are immutable and
//! handed out as `Arc`s: a lookup clones the handle and drops the lock before
//! any conversion runs, so replacing or unloading a contract never disturbs a
//! conversion that is already in flight.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::bootstrap::{load_schema, SchemaSource};
use crate::error::{AbiError, Result, ResultExt};
use crate::json::ConversionMode;
use crate::name::Name;
use crate::types::ResolvedAbi;

/// Thread-safe map from contract name to resolved schema.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: RwLock<HashMap<Name, Arc<ResolvedAbi>>>,
}

impl ContractRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) the schema of `contract`.
    ///
    /// The schema is decoded, version-checked and resolved before the
    /// registry is touched; on any error the previous entry stays in place.
    pub fn load(&self, contract: Name, source: SchemaSource<'_>) -> Result<Arc<ResolvedAbi>> {
        let abi = Arc::new(
            load_schema(source).context_with(|| format!("contract \"{contract}\""))?,
        );
        let replaced = self
            .contracts
            .write()
            .insert(contract, Arc::clone(&abi))
            .is_some();
        debug!(
            %contract,
            version = abi.version(),
            nodes = abi.node_count(),
            replaced,
            "contract schema loaded"
        );
        Ok(abi)
    }

    /// Insert an already resolved schema.
    pub fn insert(&self, contract: Name, abi: ResolvedAbi) -> Arc<ResolvedAbi> {
        let abi = Arc::new(abi);
        self.contracts.write().insert(contract, Arc::clone(&abi));
        debug!(%contract, "contract schema inserted");
        abi
    }

    /// Schema of `contract`.
    pub fn get(&self, contract: Name) -> Result<Arc<ResolvedAbi>> {
        self.contracts
            .read()
            .get(&contract)
            .cloned()
            .ok_or_else(|| AbiError::NotFound(format!("contract \"{contract}\"")))
    }

    /// Drop the schema of `contract`. Returns whether one was loaded.
    pub fn unload(&self, contract: Name) -> bool {
        let removed = self.contracts.write().remove(&contract).is_some();
        debug!(%contract, removed, "contract schema unloaded");
        removed
    }

    /// Whether `contract` has a schema.
    pub fn contains(&self, contract: Name) -> bool {
        self.contracts.read().contains_key(&contract)
    }

    /// Number of loaded contracts.
    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    /// Whether no contract is loaded.
    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }

    /// Encode JSON for a named type of `contract`.
    pub fn json_to_bin(
        &self,
        contract: Name,
        type_name: &str,
        json: &str,
        mode: ConversionMode,
    ) -> Result<Vec<u8>> {
        self.get(contract)?.json_to_bin_by_name(type_name, json, mode)
    }

    /// Decode bytes of a named type of `contract` to JSON text.
    pub fn bin_to_json(&self, contract: Name, type_name: &str, bytes: &[u8]) -> Result<String> {
        self.get(contract)?.bin_to_json_by_name(type_name, bytes)
    }
}
