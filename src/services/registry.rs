//! Store registry - the stores served by the API and the extraction job
//!
//! Built once at start-up from the configured store list and read-only
//! afterwards, so it is shared across tasks behind an `Arc`.

use crate::domain::{SimError, Store};
use crate::infra::config::{Config, StoreConfig};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

pub struct StoreRegistry {
    /// Stores in configured order
    stores: Vec<Store>,
    /// Store name to position in `stores`
    by_name: FxHashMap<String, usize>,
}

impl StoreRegistry {
    /// Build a registry from store definitions, rejecting duplicate names
    pub fn new(definitions: &[StoreConfig]) -> Result<Self, SimError> {
        let mut stores = Vec::with_capacity(definitions.len());
        let mut by_name = FxHashMap::default();

        for def in definitions {
            if by_name.contains_key(&def.name) {
                return Err(SimError::DuplicateStore(def.name.clone()));
            }
            let store = Store::with_fault_rates(
                &def.name,
                def.avg_visit,
                def.std_visit,
                def.perc_malfunction,
                def.perc_break,
            )?;
            debug!(store = %store.name(), seed = store.seed(), sensors = store.sensors().len(), "store_registered");
            by_name.insert(def.name.clone(), stores.len());
            stores.push(store);
        }

        info!(stores = %stores.len(), "store_registry_built");
        Ok(Self { stores, by_name })
    }

    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        Self::new(config.stores())
    }

    pub fn get(&self, name: &str) -> Option<&Store> {
        self.by_name.get(name).map(|&idx| &self.stores[idx])
    }

    /// Store names in configured order
    pub fn names(&self) -> Vec<&str> {
        self.stores.iter().map(Store::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Store> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
