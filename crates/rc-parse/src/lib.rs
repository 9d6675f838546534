//! Gradle build-script parser for reconcile.
//!
//! Turns Kotlin DSL (`*.gradle.kts`) and Groovy DSL (`*.gradle`) build
//! scripts into normalized [`Snapshot`]s:
//! - [`lexer`]: tokens, with comments preserved
//! - [`tree`]: blocks, assignments and calls
//! - [`normalize`]: alias collapsing onto the snapshot IR
//!
//! Parsing is pure; the store assigns snapshot ordinals.

pub mod error;
pub mod lexer;
pub mod normalize;
pub mod tree;

pub use error::ParseError;
pub use normalize::{canonical_plugin_id, classpath_plugin};

use rc_common::Snapshot;
use std::path::Path;
use tracing::debug;

use crate::normalize::SourceDocument;

/// Parse a single build script into a snapshot labelled `label`.
pub fn parse_document(label: &str, source: &str) -> Result<Snapshot, ParseError> {
    parse_files(label, &[(label.to_string(), source.to_string())])
}

/// Parse the build scripts of one snapshot into a single build graph.
///
/// `files` holds `(relative path, contents)` pairs in the order they should
/// be read; callers sort them by path.
pub fn parse_files(label: &str, files: &[(String, String)]) -> Result<Snapshot, ParseError> {
    if files.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut documents = Vec::with_capacity(files.len());
    for (path, source) in files {
        let document = tree::parse(source).map_err(|e| e.in_file(path))?;
        documents.push((path.as_str(), document));
    }

    let sources = documents
        .iter()
        .map(|(path, document)| SourceDocument { path, document })
        .collect::<Vec<_>>();
    let snapshot = normalize::lower(label, &sources);
    debug!(
        source = label,
        files = files.len(),
        plugins = snapshot.plugins.len(),
        dependencies = snapshot.dependencies.len(),
        "snapshot parsed"
    );
    Ok(snapshot)
}

/// Whether `path` names a Gradle build script.
pub fn is_build_script(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".gradle") || n.ends_with(".gradle.kts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_build_script() {
        assert!(is_build_script(Path::new("app/build.gradle.kts")));
        assert!(is_build_script(Path::new("settings.gradle")));
        assert!(!is_build_script(Path::new("gradle.properties")));
        assert!(!is_build_script(Path::new("reconcile.toml")));
    }

    #[test]
    fn test_empty_file_list_is_error() {
        assert_eq!(parse_files("x", &[]).unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_error_names_file() {
        let files = vec![
            ("build.gradle.kts".to_string(), "plugins { }".to_string()),
            ("app/build.gradle.kts".to_string(), "android {".to_string()),
        ];
        let err = parse_files("snap", &files).unwrap_err();
        assert!(err.to_string().starts_with("app/build.gradle.kts: "), "{}", err);
    }
}
