//! Document selector for the build-spec files routed to the session.

use lsp_types::{DocumentFilter, DocumentSelector};
use std::path::Path;

/// Selector matching the build tool's YAML spec files.
pub fn build_file_selector() -> DocumentSelector {
    vec![
        DocumentFilter {
            language: Some("yaml".to_string()),
            scheme: Some("file".to_string()),
            pattern: Some("**/lets.yaml".to_string()),
        },
        DocumentFilter {
            language: Some("yaml".to_string()),
            scheme: Some("file".to_string()),
            pattern: Some("**/lets.*.yaml".to_string()),
        },
    ]
}

/// Whether a path names a build-spec file the session should receive.
pub fn matches_build_file(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some("lets.yaml") => true,
        Some(name) => {
            name.starts_with("lets.")
                && name.ends_with(".yaml")
                && name.len() >= "lets..yaml".len()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_covers_both_spec_patterns() {
        let selector = build_file_selector();
        let patterns: Vec<_> = selector
            .iter()
            .map(|filter| filter.pattern.as_deref().unwrap())
            .collect();
        assert_eq!(patterns, ["**/lets.yaml", "**/lets.*.yaml"]);
        assert!(selector
            .iter()
            .all(|filter| filter.language.as_deref() == Some("yaml")));
    }

    #[test]
    fn test_matches_plain_and_scoped_spec_files() {
        assert!(matches_build_file(Path::new("lets.yaml")));
        assert!(matches_build_file(Path::new("/work/project/lets.yaml")));
        assert!(matches_build_file(Path::new("lets.dev.yaml")));
        assert!(matches_build_file(Path::new("lets.build.ci.yaml")));
    }

    #[test]
    fn test_rejects_lookalikes() {
        assert!(!matches_build_file(Path::new("letsgo.yaml")));
        assert!(!matches_build_file(Path::new("lets.yml")));
        assert!(!matches_build_file(Path::new("other.yaml")));
        assert!(!matches_build_file(Path::new("lets")));
    }
}
