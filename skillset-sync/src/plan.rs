//! The four resources of one enrichment pipeline, checked together.

use skillset_sync_repository::validate_name;
use skillset_sync_shared::{
    BaseDocument, DataSourceConnection, IndexSchema, Indexer, ResourceDescriptor, ResourceKind,
    Skillset,
};

use crate::errors::PipelineError;

/// Image action that makes the data source emit `/document/normalized_images`.
const GENERATE_NORMALIZED_IMAGES: &str = "generateNormalizedImages";

/// A data source, a skillset, an index and the indexer binding them.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    pub data_source: DataSourceConnection,
    pub skillset: Skillset,
    pub index: IndexSchema,
    pub indexer: Indexer,
}

impl PipelinePlan {
    /// The descriptors in creation order.
    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        vec![
            self.data_source.clone().into(),
            self.skillset.clone().into(),
            self.index.clone().into(),
            self.indexer.clone().into(),
        ]
    }

    /// What the data source cracks out of each document before enrichment.
    pub fn base_document(&self) -> BaseDocument {
        let normalized_images = self
            .indexer
            .parameters
            .as_ref()
            .and_then(|p| p.configuration.get("imageAction"))
            .and_then(|v| v.as_str())
            == Some(GENERATE_NORMALIZED_IMAGES);

        BaseDocument::blob(normalized_images)
    }

    /// Check the pipeline without calling the service.
    ///
    /// Names must be acceptable, the index schema consistent, every step must
    /// read only what is already available, and the indexer must point at this
    /// plan's data source, skillset and index with mappings that resolve.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for descriptor in self.descriptors() {
            validate_name(descriptor.kind(), descriptor.name())
                .map_err(|e| PipelineError::plan(e.to_string()))?;
        }

        if self.indexer.data_source_name != self.data_source.name {
            return Err(PipelineError::plan(format!(
                "{} '{}' reads data source '{}', not '{}'",
                ResourceKind::Indexer,
                self.indexer.name,
                self.indexer.data_source_name,
                self.data_source.name
            )));
        }

        let base = self.base_document();
        self.index
            .validate()
            .map_err(|e| PipelineError::plan(e.to_string()))?;
        self.skillset
            .validate(&base)
            .map_err(|e| PipelineError::plan(e.to_string()))?;
        self.indexer
            .validate_against(&self.index, Some(&self.skillset), &base)
            .map_err(|e| PipelineError::plan(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use skillset_sync_shared::FieldMapping;

    fn plan() -> PipelinePlan {
        crate::demo::pipeline(&SecretString::from("AccountKey=secret"))
    }

    #[test]
    fn test_descriptors_in_creation_order() {
        let kinds: Vec<ResourceKind> = plan().descriptors().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }

    #[test]
    fn test_without_image_action_ocr_has_no_input() {
        let mut plan = plan();
        if let Some(parameters) = plan.indexer.parameters.as_mut() {
            parameters.configuration.remove("imageAction");
        }

        assert!(!plan.base_document().contains("/document/normalized_images"));
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("normalized_images"), "err={}", err);
    }

    #[test]
    fn test_unknown_index_field_is_rejected() {
        let mut plan = plan();
        plan.indexer = plan
            .indexer
            .output_field_mapping(FieldMapping::new("/document/merged_text", "fullText"));

        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("fullText"), "err={}", err);
    }

    #[test]
    fn test_other_data_source_is_rejected() {
        let mut plan = plan();
        plan.indexer.data_source_name = "otherdata".to_string();
        assert!(matches!(plan.validate(), Err(PipelineError::PlanError(_))));
    }

    #[test]
    fn test_bad_name_is_rejected() {
        let mut plan = plan();
        plan.index.name = "Demo Index".to_string();
        plan.indexer.target_index_name = plan.index.name.clone();
        assert!(plan.validate().is_err());
    }
}
