//! Interface definitions for the search service provider.
//!
//! This module defines the abstract `SearchServiceProvider` trait that allows
//! the synchronizer to run against the live REST API or an in-memory fake.

mod search_service_provider;

pub use search_service_provider::SearchServiceProvider;
