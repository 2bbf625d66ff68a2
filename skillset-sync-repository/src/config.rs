//! Configuration types for the ResourceSynchronizer.

use skillset_sync_shared::BaseDocument;

/// Configuration for the ResourceSynchronizer.
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    /// Write every descriptor even when the live object already matches.
    ///
    /// The service never echoes connection strings, so a rotated secret is
    /// invisible to the equality check. Set this to push it anyway.
    pub force_replace: bool,

    /// Paths the data source provides before enrichment, used to check
    /// skillset step ordering.
    ///
    /// Defaults to a blob container with normalized images.
    pub base_document: BaseDocument,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            force_replace: false,
            base_document: BaseDocument::blob(true),
        }
    }
}

impl SynchronizerConfig {
    /// Create a config that always writes.
    ///
    /// # Returns
    ///
    /// A `SynchronizerConfig` with `force_replace` set and the default base document.
    pub fn force_replace() -> Self {
        Self {
            force_replace: true,
            ..Self::default()
        }
    }

    /// Use a different base document for skillset validation.
    ///
    /// # Arguments
    ///
    /// * `base_document` - Paths available before the first enrichment step
    pub fn with_base_document(mut self, base_document: BaseDocument) -> Self {
        self.base_document = base_document;
        self
    }
}
