//! Enrichment pipeline (skillset) descriptor.
//!
//! A skillset is an ordered list of enrichment steps. Each step runs over a
//! context node of the document tree, reads named inputs from paths in that
//! tree and writes named outputs back under its context. Step order decides
//! what is available to later steps.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::DescriptorError;
use crate::types::document_path::{normalize_path, BaseDocument, DOCUMENT_ROOT};

/// How the text-splitting step cuts its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSplitMode {
    Pages,
    Sentences,
}

/// Entity categories the entity-recognition step can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityCategory {
    Person,
    Location,
    Organization,
    Quantity,
    DateTime,
    #[serde(rename = "URL")]
    Url,
    Email,
}

/// The step type together with its type-specific parameters.
///
/// Serialized with the service's `@odata.type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@odata.type")]
pub enum SkillKind {
    /// Optical character recognition over normalized images.
    #[serde(rename = "#Microsoft.Skills.Vision.OcrSkill", rename_all = "camelCase")]
    TextExtraction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_language_code: Option<String>,
        #[serde(default)]
        detect_orientation: bool,
    },

    /// Merges text fragments (e.g. OCR output) back into a body of text.
    #[serde(rename = "#Microsoft.Skills.Text.MergeSkill", rename_all = "camelCase")]
    TextMerge {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insert_pre_tag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insert_post_tag: Option<String>,
    },

    #[serde(rename = "#Microsoft.Skills.Text.LanguageDetectionSkill", rename_all = "camelCase")]
    LanguageDetection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_country_hint: Option<String>,
    },

    #[serde(rename = "#Microsoft.Skills.Text.SplitSkill", rename_all = "camelCase")]
    TextSplit {
        text_split_mode: TextSplitMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum_page_length: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_language_code: Option<String>,
    },

    #[serde(rename = "#Microsoft.Skills.Text.V3.EntityRecognitionSkill", rename_all = "camelCase")]
    EntityRecognition {
        #[serde(default)]
        categories: Vec<EntityCategory>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_language_code: Option<String>,
    },

    #[serde(rename = "#Microsoft.Skills.Text.KeyPhraseExtractionSkill", rename_all = "camelCase")]
    KeyPhraseExtraction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_language_code: Option<String>,
    },
}

impl SkillKind {
    /// Short step-type name.
    pub fn label(&self) -> &'static str {
        match self {
            SkillKind::TextExtraction { .. } => "text-extraction",
            SkillKind::TextMerge { .. } => "text-merge",
            SkillKind::LanguageDetection { .. } => "language-detection",
            SkillKind::TextSplit { .. } => "text-splitting",
            SkillKind::EntityRecognition { .. } => "entity-recognition",
            SkillKind::KeyPhraseExtraction { .. } => "key-phrase-extraction",
        }
    }
}

/// A named step input and the document path it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMapping {
    pub name: String,
    pub source: String,
}

/// A named step output and the node name it is written to under the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMapping {
    pub name: String,
    pub target_name: String,
}

/// One stage of an enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStep {
    #[serde(flatten)]
    pub kind: SkillKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub context: String,
    pub inputs: Vec<InputMapping>,
    pub outputs: Vec<OutputMapping>,
}

impl EnrichmentStep {
    /// Start a step of the given type running over `context`.
    pub fn new(kind: SkillKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            name: None,
            description: None,
            context: context.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append an input reading `source`.
    pub fn input(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.inputs.push(InputMapping {
            name: name.into(),
            source: source.into(),
        });
        self
    }

    /// Append an output written to `target_name` under the context.
    pub fn output(mut self, name: impl Into<String>, target_name: impl Into<String>) -> Self {
        self.outputs.push(OutputMapping {
            name: name.into(),
            target_name: target_name.into(),
        });
        self
    }

    /// Normalized paths this step writes.
    pub fn produced_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.outputs
            .iter()
            .map(move |o| normalize_path(&format!("{}/{}", self.context, o.target_name)))
    }

    fn identify(&self, position: usize) -> String {
        match &self.name {
            Some(name) => format!("step '{}'", name),
            None => format!("step #{} ({})", position + 1, self.kind.label()),
        }
    }

    /// Step equality that tolerates a service-assigned name when none is set here.
    pub fn is_satisfied_by(&self, live: &Self) -> bool {
        let name_matches = self.name.is_none() || self.name == live.name;
        name_matches
            && self.kind == live.kind
            && self.description == live.description
            && self.context == live.context
            && self.inputs == live.inputs
            && self.outputs == live.outputs
    }
}

/// An ordered set of enrichment steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skillset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub skills: Vec<EnrichmentStep>,
}

impl Skillset {
    pub fn new(name: impl Into<String>, skills: Vec<EnrichmentStep>) -> Self {
        Self {
            name: name.into(),
            description: None,
            skills,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Every normalized path written by some step, in step order.
    pub fn produced_paths(&self) -> Vec<String> {
        self.skills.iter().flat_map(|s| s.produced_paths()).collect()
    }

    /// Check that every step only reads what is already available.
    ///
    /// A step's context and inputs must be present in `base` or written by an
    /// earlier step. Each produced path may be written once.
    pub fn validate(&self, base: &BaseDocument) -> Result<(), DescriptorError> {
        if self.skills.is_empty() {
            return Err(DescriptorError::pipeline(format!(
                "skillset '{}' has no steps",
                self.name
            )));
        }

        let mut available: BTreeSet<String> = base.paths().clone();
        let mut produced: BTreeSet<String> = BTreeSet::new();

        for (position, step) in self.skills.iter().enumerate() {
            let id = step.identify(position);

            let context = normalize_path(&step.context);
            if !step.context.starts_with(DOCUMENT_ROOT) {
                return Err(DescriptorError::pipeline(format!(
                    "{} has context '{}' outside {}",
                    id, step.context, DOCUMENT_ROOT
                )));
            }
            if !available.contains(&context) {
                return Err(DescriptorError::pipeline(format!(
                    "{} runs over '{}' which no earlier step produces",
                    id, step.context
                )));
            }
            if step.outputs.is_empty() {
                return Err(DescriptorError::pipeline(format!("{} has no outputs", id)));
            }

            for input in &step.inputs {
                if !available.contains(&normalize_path(&input.source)) {
                    return Err(DescriptorError::pipeline(format!(
                        "{} input '{}' reads '{}' before it is produced",
                        id, input.name, input.source
                    )));
                }
            }

            for path in step.produced_paths() {
                if !produced.insert(path.clone()) {
                    return Err(DescriptorError::pipeline(format!(
                        "{} writes '{}' which an earlier step already writes",
                        id, path
                    )));
                }
                available.insert(path);
            }
        }

        Ok(())
    }

    /// Skillset equality that compares steps pairwise in order.
    pub fn is_satisfied_by(&self, live: &Self) -> bool {
        self.name == live.name
            && self.description == live.description
            && self.skills.len() == live.skills.len()
            && self
                .skills
                .iter()
                .zip(live.skills.iter())
                .all(|(desired, live)| desired.is_satisfied_by(live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ocr() -> EnrichmentStep {
        EnrichmentStep::new(
            SkillKind::TextExtraction {
                default_language_code: Some("en".to_string()),
                detect_orientation: true,
            },
            "/document/normalized_images/*",
        )
        .input("image", "/document/normalized_images/*")
        .output("text", "text")
    }

    fn merge() -> EnrichmentStep {
        EnrichmentStep::new(
            SkillKind::TextMerge {
                insert_pre_tag: Some(" ".to_string()),
                insert_post_tag: Some(" ".to_string()),
            },
            "/document",
        )
        .input("text", "/document/content")
        .input("itemsToInsert", "/document/normalized_images/*/text")
        .input("offsets", "/document/normalized_images/*/contentOffset")
        .output("mergedText", "merged_text")
    }

    fn split() -> EnrichmentStep {
        EnrichmentStep::new(
            SkillKind::TextSplit {
                text_split_mode: TextSplitMode::Pages,
                maximum_page_length: Some(4000),
                default_language_code: None,
            },
            "/document",
        )
        .input("text", "/document/merged_text")
        .output("textItems", "pages")
    }

    fn key_phrases() -> EnrichmentStep {
        EnrichmentStep::new(
            SkillKind::KeyPhraseExtraction {
                default_language_code: Some("en".to_string()),
            },
            "/document/pages/*",
        )
        .input("text", "/document/pages/*")
        .output("keyPhrases", "keyPhrases")
    }

    #[test]
    fn test_valid_order_passes() {
        let skillset = Skillset::new("s", vec![ocr(), merge(), split(), key_phrases()]);
        assert!(skillset.validate(&BaseDocument::blob(true)).is_ok());
    }

    #[test]
    fn test_input_before_producer_is_rejected() {
        let skillset = Skillset::new("s", vec![merge(), ocr()]);
        let err = skillset.validate(&BaseDocument::blob(true)).unwrap_err();
        assert!(matches!(err, DescriptorError::PipelineError(_)));
        assert!(err.to_string().contains("itemsToInsert"), "err={}", err);
    }

    #[test]
    fn test_context_before_producer_is_rejected() {
        let skillset = Skillset::new("s", vec![key_phrases(), ocr(), merge(), split()]);
        let err = skillset.validate(&BaseDocument::blob(true)).unwrap_err();
        assert!(err.to_string().contains("/document/pages/*"), "err={}", err);
    }

    #[test]
    fn test_images_required_for_ocr() {
        let skillset = Skillset::new("s", vec![ocr()]);
        assert!(skillset.validate(&BaseDocument::blob(false)).is_err());
    }

    #[test]
    fn test_duplicate_output_is_rejected() {
        let skillset = Skillset::new("s", vec![ocr(), merge(), split(), split()]);
        let err = skillset.validate(&BaseDocument::blob(true)).unwrap_err();
        assert!(err.to_string().contains("/document/pages"), "err={}", err);
    }

    #[test]
    fn test_empty_skillset_is_rejected() {
        let skillset = Skillset::new("s", vec![]);
        assert!(skillset.validate(&BaseDocument::blob(true)).is_err());
    }

    #[test]
    fn test_step_without_outputs_is_rejected() {
        let mut step = merge();
        step.outputs.clear();
        let skillset = Skillset::new("s", vec![ocr(), step]);
        assert!(skillset.validate(&BaseDocument::blob(true)).is_err());
    }

    #[test]
    fn test_produced_paths() {
        let skillset = Skillset::new("s", vec![ocr(), merge(), split(), key_phrases()]);
        assert_eq!(
            skillset.produced_paths(),
            vec![
                "/document/normalized_images/text".to_string(),
                "/document/merged_text".to_string(),
                "/document/pages".to_string(),
                "/document/pages/keyPhrases".to_string(),
            ]
        );
    }

    #[test]
    fn test_odata_type_round_trips_through_service_record() {
        let record = serde_json::json!({
            "@odata.type": "#Microsoft.Skills.Text.SplitSkill",
            "name": "#4",
            "description": null,
            "context": "/document",
            "textSplitMode": "pages",
            "maximumPageLength": 4000,
            "pageOverlapLength": null,
            "defaultLanguageCode": null,
            "inputs": [{ "name": "text", "source": "/document/merged_text", "sourceContext": null, "inputs": [] }],
            "outputs": [{ "name": "textItems", "targetName": "pages" }]
        });
        let live: EnrichmentStep = serde_json::from_value(record).unwrap();
        assert_eq!(live.name.as_deref(), Some("#4"));
        assert!(split().is_satisfied_by(&live));
    }

    #[test]
    fn test_explicit_name_must_match() {
        let mut live = split();
        live.name = Some("#4".to_string());
        assert!(!split().named("split").is_satisfied_by(&live));
    }

    #[test]
    fn test_serialized_step_carries_discriminator() {
        let value = serde_json::to_value(ocr()).unwrap();
        assert_eq!(value["@odata.type"], "#Microsoft.Skills.Vision.OcrSkill");
        assert_eq!(value["detectOrientation"], true);
        assert_eq!(value["defaultLanguageCode"], "en");
        assert_eq!(value["inputs"][0]["source"], "/document/normalized_images/*");
        assert!(value.get("name").is_none());
    }
}
