//! Dispatch pipeline: provider failover and recipient batching.
//!
//! ```text
//! BatchDispatcher ── per batch ──> ProviderChain ── per provider ──> retry loop ──> DeliveryProvider
//! ```
//!
//! Within one dispatch, batches, providers and attempts all run strictly
//! one after the other.

pub mod batch;
pub mod chain;

pub use batch::{partition, Batch, BatchDispatcher};
pub use chain::{ChainReport, ProviderChain};
