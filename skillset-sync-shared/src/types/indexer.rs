//! Indexer descriptor.
//!
//! An indexer binds a data source, an optional skillset and a target index,
//! and says how source fields and enrichment outputs land in index fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DescriptorError;
use crate::types::document_path::{normalize_path, BaseDocument};
use crate::types::index_schema::IndexSchema;
use crate::types::skillset::Skillset;

/// A named transform applied to a value on its way into the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, Value>>,
}

impl FieldMappingFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: None,
        }
    }

    /// `base64Encode`, optionally producing URL-token-safe output.
    pub fn base64_encode(url_token_safe: bool) -> Self {
        Self::new("base64Encode").with_parameter("useHttpServerUtilityUrlTokenEncode", url_token_safe)
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Projects a source field or enrichment output onto an index field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_function: Option<FieldMappingFunction>,
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_field_name: source.into(),
            target_field_name: Some(target.into()),
            mapping_function: None,
        }
    }

    pub fn with_function(mut self, function: FieldMappingFunction) -> Self {
        self.mapping_function = Some(function);
        self
    }

    /// The index field written; defaults to the source name.
    pub fn target(&self) -> &str {
        self.target_field_name
            .as_deref()
            .unwrap_or(&self.source_field_name)
    }

    fn is_satisfied_by(&self, live: &Self) -> bool {
        self.source_field_name == live.source_field_name
            && self.target() == live.target()
            && self.mapping_function == live.mapping_function
    }
}

/// Recurring run schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingSchedule {
    /// ISO 8601 duration, e.g. `PT2H`.
    pub interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

/// Run parameters.
///
/// `-1` for the failure limits means "never stop on failed items".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failed_items: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failed_items_per_batch: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<String, Value>,
}

impl IndexingParameters {
    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }
}

/// A job definition binding a data source, a skillset and an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data_source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skillset_name: Option<String>,
    pub target_index_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<IndexingSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<IndexingParameters>,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub output_field_mappings: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl Indexer {
    pub fn new(
        name: impl Into<String>,
        data_source_name: impl Into<String>,
        target_index_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            data_source_name: data_source_name.into(),
            skillset_name: None,
            target_index_name: target_index_name.into(),
            schedule: None,
            parameters: None,
            field_mappings: Vec::new(),
            output_field_mappings: Vec::new(),
            disabled: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_skillset(mut self, skillset_name: impl Into<String>) -> Self {
        self.skillset_name = Some(skillset_name.into());
        self
    }

    pub fn with_parameters(mut self, parameters: IndexingParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_schedule(mut self, schedule: IndexingSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn field_mapping(mut self, mapping: FieldMapping) -> Self {
        self.field_mappings.push(mapping);
        self
    }

    pub fn output_field_mapping(mut self, mapping: FieldMapping) -> Self {
        self.output_field_mappings.push(mapping);
        self
    }

    /// Check the indexer against the schema and skillset it will be bound to.
    ///
    /// Every mapping target must be a field of `schema`. Every output mapping
    /// must read a path the skillset writes (or one the base document already has).
    pub fn validate_against(
        &self,
        schema: &IndexSchema,
        skillset: Option<&Skillset>,
        base: &BaseDocument,
    ) -> Result<(), DescriptorError> {
        if self.target_index_name != schema.name {
            return Err(DescriptorError::reference(format!(
                "indexer '{}' targets index '{}', not '{}'",
                self.name, self.target_index_name, schema.name
            )));
        }

        match (self.skillset_name.as_deref(), skillset) {
            (Some(expected), Some(s)) if expected != s.name => {
                return Err(DescriptorError::reference(format!(
                    "indexer '{}' uses skillset '{}', not '{}'",
                    self.name, expected, s.name
                )));
            }
            (Some(expected), None) => {
                return Err(DescriptorError::reference(format!(
                    "indexer '{}' uses skillset '{}' which is not part of the pipeline",
                    self.name, expected
                )));
            }
            _ => {}
        }

        for mapping in self.field_mappings.iter().chain(&self.output_field_mappings) {
            if schema.field(mapping.target()).is_none() {
                return Err(DescriptorError::field_mapping(format!(
                    "'{}' maps to '{}' which index '{}' does not declare",
                    mapping.source_field_name,
                    mapping.target(),
                    schema.name
                )));
            }
        }

        if !self.output_field_mappings.is_empty() {
            let produced: Vec<String> = skillset.map(|s| s.produced_paths()).unwrap_or_default();
            for mapping in &self.output_field_mappings {
                let source = normalize_path(&mapping.source_field_name);
                if !produced.contains(&source) && !base.contains(&source) {
                    return Err(DescriptorError::field_mapping(format!(
                        "output mapping reads '{}' which the skillset never writes",
                        mapping.source_field_name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Indexer equality over the fields this program owns.
    ///
    /// The service fills in a schedule start time and reports `disabled` as
    /// `false`/`null`; those only count when set here.
    pub fn is_satisfied_by(&self, live: &Self) -> bool {
        let schedule_matches = match (&self.schedule, &live.schedule) {
            (None, None) => true,
            (Some(desired), Some(actual)) => {
                desired.interval == actual.interval
                    && (desired.start_time.is_none() || desired.start_time == actual.start_time)
            }
            _ => false,
        };

        let mappings_match = |desired: &[FieldMapping], actual: &[FieldMapping]| {
            desired.len() == actual.len()
                && desired
                    .iter()
                    .zip(actual)
                    .all(|(d, a)| d.is_satisfied_by(a))
        };

        self.name == live.name
            && self.description == live.description
            && self.data_source_name == live.data_source_name
            && self.skillset_name == live.skillset_name
            && self.target_index_name == live.target_index_name
            && self.parameters == live.parameters
            && schedule_matches
            && mappings_match(&self.field_mappings, &live.field_mappings)
            && mappings_match(&self.output_field_mappings, &live.output_field_mappings)
            && self.disabled.unwrap_or(false) == live.disabled.unwrap_or(false)
    }
}
