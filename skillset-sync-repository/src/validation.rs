//! Local checks run before any descriptor is sent to the service.

use skillset_sync_shared::{BaseDocument, ResourceDescriptor, ResourceKind};

use crate::errors::SyncError;

/// Longest name the service accepts for any resource.
pub const MAX_NAME_LENGTH: usize = 128;

/// Check a resource name against the naming rules of its kind.
///
/// Index names are lowercase letters, digits and dashes, and may not start or
/// end with a dash. Other names are letters, digits, dashes and underscores,
/// starting with a letter or digit.
///
/// # Returns
///
/// * `Ok(())` - If the name is acceptable
/// * `Err(SyncError::ValidationError)` - Describing the first rule broken
pub fn validate_name(kind: ResourceKind, name: &str) -> Result<(), SyncError> {
    if name.is_empty() {
        return Err(SyncError::validation(format!("{} name is required", kind)));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(SyncError::validation(format!(
            "{} name '{}' is longer than {} characters",
            kind, name, MAX_NAME_LENGTH
        )));
    }

    match kind {
        ResourceKind::IndexSchema => {
            if let Some(bad) = name
                .chars()
                .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
            {
                return Err(SyncError::validation(format!(
                    "index name '{}' contains '{}'; only lowercase letters, digits and dashes are allowed",
                    name, bad
                )));
            }
            if name.starts_with('-') || name.ends_with('-') {
                return Err(SyncError::validation(format!(
                    "index name '{}' cannot start or end with a dash",
                    name
                )));
            }
        }
        ResourceKind::DataSource | ResourceKind::EnrichmentPipeline | ResourceKind::Indexer => {
            if let Some(bad) = name
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
            {
                return Err(SyncError::validation(format!(
                    "{} name '{}' contains '{}'; only letters, digits, dashes and underscores are allowed",
                    kind, name, bad
                )));
            }
            if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
                return Err(SyncError::validation(format!(
                    "{} name '{}' must start with a letter or digit",
                    kind, name
                )));
            }
        }
    }

    Ok(())
}

/// Run every offline check that applies to a descriptor.
///
/// Covers the name rules, the index schema rules and the skillset step
/// ordering against `base`. Cross-resource bindings of an indexer need the
/// whole plan and are checked by the caller that has it.
pub fn validate_descriptor(
    descriptor: &ResourceDescriptor,
    base: &BaseDocument,
) -> Result<(), SyncError> {
    validate_name(descriptor.kind(), descriptor.name())?;

    match descriptor {
        ResourceDescriptor::DataSource(data_source) => {
            if data_source.container.name.trim().is_empty() {
                return Err(SyncError::validation(format!(
                    "{} needs a container name",
                    descriptor.label()
                )));
            }
        }
        ResourceDescriptor::EnrichmentPipeline(skillset) => skillset.validate(base)?,
        ResourceDescriptor::IndexSchema(schema) => schema.validate()?,
        ResourceDescriptor::Indexer(indexer) => {
            validate_name(ResourceKind::DataSource, &indexer.data_source_name)?;
            validate_name(ResourceKind::IndexSchema, &indexer.target_index_name)?;
            if let Some(skillset) = indexer.skillset_name.as_deref() {
                validate_name(ResourceKind::EnrichmentPipeline, skillset)?;
            }
        }
    }

    Ok(())
}
