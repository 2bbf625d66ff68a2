//! The demo pipeline: blob documents cracked with OCR, merged, split into
//! pages and enriched with language, organizations and key phrases.

use secrecy::{ExposeSecret, SecretString};
use skillset_sync_shared::{
    DataContainer, DataSourceConnection, DataSourceType, EnrichmentStep, EntityCategory,
    FieldMapping, FieldMappingFunction, FieldType, IndexSchema, Indexer, IndexingParameters,
    SearchField, SkillKind, Skillset, TextSplitMode,
};

use crate::plan::PipelinePlan;

pub const DATA_SOURCE_NAME: &str = "demodata";
pub const SKILLSET_NAME: &str = "demoskillset";
pub const INDEX_NAME: &str = "demoindex";
pub const INDEXER_NAME: &str = "demoindexer";

const CONTAINER_NAME: &str = "cog-search-demo";
const LANGUAGE: &str = "en";
const MAX_PAGE_LENGTH: u32 = 4000;

/// Build the demo pipeline reading from the given blob storage account.
pub fn pipeline(blob_connection_string: &SecretString) -> PipelinePlan {
    PipelinePlan {
        data_source: data_source(blob_connection_string),
        skillset: skillset(),
        index: index(),
        indexer: indexer(),
    }
}

fn data_source(blob_connection_string: &SecretString) -> DataSourceConnection {
    DataSourceConnection::new(
        DATA_SOURCE_NAME,
        DataSourceType::AzureBlob,
        blob_connection_string.expose_secret(),
        DataContainer::new(CONTAINER_NAME),
    )
    .with_description("Demo files to demonstrate cognitive search capabilities")
}

fn skillset() -> Skillset {
    let ocr = EnrichmentStep::new(
        SkillKind::TextExtraction {
            default_language_code: Some(LANGUAGE.to_string()),
            detect_orientation: true,
        },
        "/document/normalized_images/*",
    )
    .with_description("Extract text (plain and structured) from image")
    .input("image", "/document/normalized_images/*")
    .output("text", "text");

    let merge = EnrichmentStep::new(
        SkillKind::TextMerge {
            insert_pre_tag: Some(" ".to_string()),
            insert_post_tag: Some(" ".to_string()),
        },
        "/document",
    )
    .with_description("Create merged_text which includes all the textual representation of each image inserted at the right location in the content field.")
    .input("text", "/document/content")
    .input("itemsToInsert", "/document/normalized_images/*/text")
    .input("offsets", "/document/normalized_images/*/contentOffset")
    .output("mergedText", "merged_text");

    let language = EnrichmentStep::new(
        SkillKind::LanguageDetection {
            default_country_hint: None,
        },
        "/document",
    )
    .with_description("Detect the language used in the document")
    .input("text", "/document/merged_text")
    .output("languageCode", "languageCode");

    let split = EnrichmentStep::new(
        SkillKind::TextSplit {
            text_split_mode: TextSplitMode::Pages,
            maximum_page_length: Some(MAX_PAGE_LENGTH),
            default_language_code: Some(LANGUAGE.to_string()),
        },
        "/document",
    )
    .with_description("Split content into pages")
    .input("text", "/document/merged_text")
    .input("languageCode", "/document/languageCode")
    .output("textItems", "pages");

    let organizations = EnrichmentStep::new(
        SkillKind::EntityRecognition {
            categories: vec![EntityCategory::Organization],
            default_language_code: Some(LANGUAGE.to_string()),
        },
        "/document/pages/*",
    )
    .with_description("Recognize Organizations")
    .input("text", "/document/pages/*")
    .output("organizations", "organizations");

    let key_phrases = EnrichmentStep::new(
        SkillKind::KeyPhraseExtraction {
            default_language_code: Some(LANGUAGE.to_string()),
        },
        "/document/pages/*",
    )
    .with_description("Extract the key phrases")
    .input("text", "/document/pages/*")
    .input("languageCode", "/document/languageCode")
    .output("keyPhrases", "keyPhrases");

    Skillset::new(
        SKILLSET_NAME,
        vec![ocr, merge, language, split, organizations, key_phrases],
    )
    .with_description("Demo skillset")
}

fn index() -> IndexSchema {
    IndexSchema::new(
        INDEX_NAME,
        vec![
            SearchField::key("id"),
            SearchField::searchable("content", FieldType::STRING),
            SearchField::simple("languageCode", FieldType::STRING).filterable(),
            SearchField::searchable("keyPhrases", FieldType::STRING_COLLECTION),
            SearchField::searchable("organizations", FieldType::STRING_COLLECTION)
                .filterable()
                .facetable(),
        ],
    )
}

fn indexer() -> Indexer {
    let parameters = IndexingParameters {
        max_failed_items: Some(-1),
        max_failed_items_per_batch: Some(-1),
        ..IndexingParameters::default()
    }
    .with_configuration("dataToExtract", "contentAndMetadata")
    .with_configuration("imageAction", "generateNormalizedImages");

    Indexer::new(INDEXER_NAME, DATA_SOURCE_NAME, INDEX_NAME)
        .with_description("Demo indexer")
        .with_skillset(SKILLSET_NAME)
        .with_parameters(parameters)
        .field_mapping(
            FieldMapping::new("metadata_storage_path", "id")
                .with_function(FieldMappingFunction::base64_encode(true)),
        )
        .field_mapping(FieldMapping::new("content", "content"))
        .output_field_mapping(FieldMapping::new("/document/pages/*/organizations/*", "organizations"))
        .output_field_mapping(FieldMapping::new("/document/pages/*/keyPhrases/*", "keyPhrases"))
        .output_field_mapping(FieldMapping::new("/document/languageCode", "languageCode"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> PipelinePlan {
        pipeline(&SecretString::from("AccountKey=secret"))
    }

    #[test]
    fn test_demo_pipeline_is_consistent() {
        plan().validate().unwrap();
    }

    #[test]
    fn test_demo_needs_normalized_images() {
        let plan = plan();
        assert!(plan.base_document().contains("/document/normalized_images/*/contentOffset"));
    }

    #[test]
    fn test_demo_step_order() {
        let labels: Vec<&str> = plan().skillset.skills.iter().map(|s| s.kind.label()).collect();
        assert_eq!(
            labels,
            vec![
                "text-extraction",
                "text-merge",
                "language-detection",
                "text-splitting",
                "entity-recognition",
                "key-phrase-extraction",
            ]
        );
    }

    #[test]
    fn test_document_key_is_url_safe_encoded() {
        let plan = plan();
        let key = &plan.indexer.field_mappings[0];
        assert_eq!(key.target(), "id");
        assert_eq!(
            key.mapping_function,
            Some(FieldMappingFunction::base64_encode(true))
        );
    }
}
