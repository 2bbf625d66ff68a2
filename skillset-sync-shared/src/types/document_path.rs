//! Paths into the enriched document tree.
//!
//! Enrichment steps address the document with paths such as
//! `/document/normalized_images/*/text`. The `*` segments only say "for each
//! item"; two paths name the same node when they agree once those are removed.

use std::collections::BTreeSet;

/// Normalize a document path for comparison.
///
/// Drops `*` segments, empty segments and trailing slashes.
///
/// ```
/// use skillset_sync_shared::normalize_path;
///
/// assert_eq!(normalize_path("/document/pages/*/keyPhrases/*"), "/document/pages/keyPhrases");
/// assert_eq!(normalize_path("/document/"), "/document");
/// ```
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "*")
        .collect();
    format!("/{}", segments.join("/"))
}

/// The nodes the data source cracks out of every document before any
/// enrichment step runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseDocument {
    paths: BTreeSet<String>,
}

/// Root of every enrichment path.
pub const DOCUMENT_ROOT: &str = "/document";

const BLOB_FIELDS: &[&str] = &[
    "content",
    "metadata_storage_path",
    "metadata_storage_name",
    "metadata_storage_size",
    "metadata_storage_last_modified",
    "metadata_storage_content_type",
    "metadata_storage_content_md5",
    "metadata_content_type",
    "metadata_language",
    "metadata_author",
    "metadata_title",
    "metadata_creation_date",
];

const NORMALIZED_IMAGE_FIELDS: &[&str] = &[
    "data",
    "width",
    "height",
    "originalWidth",
    "originalHeight",
    "rotationFromOriginal",
    "contentOffset",
    "pageNumber",
];

impl BaseDocument {
    /// Build a base document from explicit paths.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths: BTreeSet<String> = paths
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect();
        paths.insert(DOCUMENT_ROOT.to_string());
        Self { paths }
    }

    /// The fields cracked from a blob container.
    ///
    /// With `normalized_images` the image action `generateNormalizedImages`
    /// is assumed, which adds `/document/normalized_images/*` and its
    /// per-image attributes.
    pub fn blob(normalized_images: bool) -> Self {
        let mut paths: Vec<String> = BLOB_FIELDS
            .iter()
            .map(|f| format!("{}/{}", DOCUMENT_ROOT, f))
            .collect();

        if normalized_images {
            paths.push(format!("{}/normalized_images", DOCUMENT_ROOT));
            paths.extend(
                NORMALIZED_IMAGE_FIELDS
                    .iter()
                    .map(|f| format!("{}/normalized_images/*/{}", DOCUMENT_ROOT, f)),
            );
        }

        Self::new(paths)
    }

    /// Whether the path is available before enrichment.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&normalize_path(path))
    }

    /// Normalized paths, sorted.
    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/document"), "/document");
        assert_eq!(normalize_path("/document/normalized_images/*"), "/document/normalized_images");
        assert_eq!(
            normalize_path("/document/normalized_images/*/contentOffset"),
            "/document/normalized_images/contentOffset"
        );
        assert_eq!(normalize_path("//document//pages/*/"), "/document/pages");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_blob_without_images() {
        let base = BaseDocument::blob(false);
        assert!(base.contains("/document"));
        assert!(base.contains("/document/content"));
        assert!(base.contains("/document/metadata_storage_path"));
        assert!(!base.contains("/document/normalized_images/*"));
    }

    #[test]
    fn test_blob_with_images() {
        let base = BaseDocument::blob(true);
        assert!(base.contains("/document/normalized_images/*"));
        assert!(base.contains("/document/normalized_images/*/contentOffset"));
        assert!(!base.contains("/document/normalized_images/*/text"));
    }

    #[test]
    fn test_custom_paths_always_include_root() {
        let base = BaseDocument::new(["/document/body"]);
        assert!(base.contains("/document"));
        assert!(base.contains("/document/body"));
        assert_eq!(base.paths().len(), 2);
    }
}
