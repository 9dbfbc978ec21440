//! Registry construction, ordering and status.

use std::sync::Arc;

use herald::providers::registry::{ProviderRegistry, RegistryError};
use herald::providers::DeliveryProvider;

use crate::support::ScriptedProvider;

fn dyns(providers: &[Arc<ScriptedProvider>]) -> Vec<Arc<dyn DeliveryProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn DeliveryProvider>)
        .collect()
}

#[test]
fn empty_registry_is_rejected() {
    assert!(matches!(
        ProviderRegistry::new(Vec::new()),
        Err(RegistryError::Empty)
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    let result = ProviderRegistry::new(dyns(&[
        ScriptedProvider::succeeding("same", 1),
        ScriptedProvider::succeeding("same", 2),
    ]));
    assert!(matches!(
        result,
        Err(RegistryError::DuplicateName { name }) if name == "same"
    ));
}

#[test]
fn sorted_by_priority_with_stable_ties() {
    let registry = match ProviderRegistry::new(dyns(&[
        ScriptedProvider::succeeding("late", 9),
        ScriptedProvider::succeeding("tie-a", 2),
        ScriptedProvider::succeeding("first", 1),
        ScriptedProvider::succeeding("tie-b", 2),
    ])) {
        Ok(registry) => registry,
        Err(err) => panic!("registry should build: {err}"),
    };
    assert_eq!(registry.names(), vec!["first", "tie-a", "tie-b", "late"]);
    assert_eq!(registry.len(), 4);
    assert!(registry.get("tie-b").is_some());
    assert!(registry.get("missing").is_none());
}

#[tokio::test]
async fn status_lists_every_provider_in_order() {
    let registry = match ProviderRegistry::new(dyns(&[
        ScriptedProvider::succeeding("second", 2),
        ScriptedProvider::succeeding("first", 1),
    ])) {
        Ok(registry) => registry,
        Err(err) => panic!("registry should build: {err}"),
    };
    let statuses = registry.status().await;
    let summary: Vec<(&str, u32, bool)> = statuses
        .iter()
        .map(|s| (s.name.as_str(), s.priority, s.available))
        .collect();
    assert_eq!(summary, vec![("first", 1, true), ("second", 2, true)]);
}
