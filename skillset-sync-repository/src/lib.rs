//! # Skillset Sync Repository
//!
//! This crate talks to the search service. It provides the
//! `SearchServiceProvider` interface with a REST implementation and an
//! in-memory one, the `ResourceSynchronizer` that converges remote resources
//! onto local descriptors, and the execution status classifier and poller.

pub mod classifier;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod mock;
pub mod poller;
pub mod rest;
pub mod source;
pub mod synchronizer;
pub mod validation;

pub use classifier::{classify, OutcomeCategory};
pub use config::SynchronizerConfig;
pub use errors::SyncError;
pub use interfaces::SearchServiceProvider;
pub use mock::InMemorySearchService;
pub use poller::{PollEnd, PollOutcome, PollerConfig, StatusPoller};
pub use rest::{RestSearchProvider, ServiceConfig};
pub use source::SearchServiceSource;
pub use synchronizer::{ResourceSynchronizer, SyncOutcome, SyncReport, SyncResult};
pub use validation::{validate_descriptor, validate_name};
