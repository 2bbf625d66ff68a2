//! REST implementation of the search service provider.
//!
//! This module provides a concrete implementation of `SearchServiceProvider`
//! over the search service's management REST API.

mod api_config;
mod provider;

pub use api_config::{ServiceConfig, DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT};
pub use provider::RestSearchProvider;
