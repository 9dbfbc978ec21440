//! Immutable, priority-ordered provider registry.

use std::collections::HashSet;
use std::sync::Arc;

use super::{DeliveryProvider, ProviderStatus};

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No provider was supplied.
    #[error("provider registry must contain at least one provider")]
    Empty,
    /// Two providers share a name.
    #[error("duplicate provider name '{name}'")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// Providers sorted by ascending priority, ties kept in registration order.
///
/// Built once at startup and shared read-only; cloning is cheap.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<[Arc<dyn DeliveryProvider>]>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| (p.name(), p.priority())))
            .finish()
    }
}

impl ProviderRegistry {
    /// Build a registry from `providers`.
    ///
    /// # Errors
    ///
    /// Returns an error if `providers` is empty or contains duplicate names.
    pub fn new(mut providers: Vec<Arc<dyn DeliveryProvider>>) -> Result<Self, RegistryError> {
        if providers.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.name().to_owned()) {
                return Err(RegistryError::DuplicateName {
                    name: provider.name().to_owned(),
                });
            }
        }

        // Stable sort keeps registration order among equal priorities.
        providers.sort_by_key(|p| p.priority());
        Ok(Self {
            providers: providers.into(),
        })
    }

    /// Providers in the order the chain tries them.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DeliveryProvider>> {
        self.providers.iter()
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DeliveryProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Provider names in chain order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always `false` for a successfully built registry.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Health-check every provider, sequentially and in chain order.
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in self.providers.iter() {
            statuses.push(ProviderStatus {
                name: provider.name().to_owned(),
                priority: provider.priority(),
                available: provider.health_check().await,
            });
        }
        statuses
    }
}
