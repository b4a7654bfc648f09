//! Registry of bus instances
//!
//! An explicit object, shared by reference with every component that needs a
//! bus, instead of a process-wide static. Buses are created lazily on first
//! lookup, reset on request, and never removed.

use crate::bus::EventBus;
use crate::config::BusConfig;
use crate::error::{EventError, Result};
use crate::types::BusId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Bus instances addressed by [`BusId`]
pub struct BusRegistry {
    defaults: BusConfig,
    buses: RwLock<HashMap<BusId, Arc<EventBus>>>,
}

impl BusRegistry {
    /// Create a registry whose lazily created buses use `defaults`
    pub fn new(defaults: BusConfig) -> Self {
        Self {
            defaults,
            buses: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration applied to buses created by [`get`](Self::get)
    pub fn defaults(&self) -> &BusConfig {
        &self.defaults
    }

    /// Get the bus for `id`, creating it with the default config if needed
    pub async fn get(&self, id: impl Into<BusId>) -> Arc<EventBus> {
        let id = id.into();
        if let Some(bus) = self.buses.read().await.get(&id) {
            return Arc::clone(bus);
        }

        let mut buses = self.buses.write().await;
        let bus = buses
            .entry(id)
            .or_insert_with_key(|id| Arc::new(EventBus::new(id.clone(), self.defaults.clone())));
        Arc::clone(bus)
    }

    /// The canonical default bus
    pub async fn default_bus(&self) -> Arc<EventBus> {
        self.get(BusId::default()).await
    }

    /// Create the bus for `id` with a specific config
    ///
    /// Fails if the bus already exists, since configuration is fixed at
    /// creation.
    pub async fn configure(&self, id: impl Into<BusId>, config: BusConfig) -> Result<Arc<EventBus>> {
        let id = id.into();
        let mut buses = self.buses.write().await;
        if buses.contains_key(&id) {
            return Err(EventError::Config(format!(
                "Bus '{}' already exists; configure it before first use",
                id
            )));
        }

        let bus = Arc::new(EventBus::new(id.clone(), config));
        buses.insert(id, Arc::clone(&bus));
        Ok(bus)
    }

    /// Reset the bus for `id`; returns false if no such bus exists
    pub async fn reset(&self, id: &BusId) -> bool {
        let bus = self.buses.read().await.get(id).cloned();
        match bus {
            Some(bus) => {
                bus.reset().await;
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, id: &BusId) -> bool {
        self.buses.read().await.contains_key(id)
    }

    /// Ids of all created buses, sorted
    pub async fn ids(&self) -> Vec<BusId> {
        let mut ids: Vec<BusId> = self.buses.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
