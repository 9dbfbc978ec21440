//! Herald: resilient email dispatch.
//!
//! Sends notification emails through a priority-ordered chain of delivery
//! providers. Each outbound call is time-bounded, each provider is retried
//! under a backoff policy, and large recipient lists are split into paced
//! batches whose outcomes are merged into one report.
//!
//! See `DESIGN.md` for the full design notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod executor;
pub mod logging;
pub mod providers;
pub mod retry;
pub mod service;
pub mod types;
pub mod validation;
