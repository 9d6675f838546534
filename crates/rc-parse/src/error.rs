//! Parse errors.

use thiserror::Error;

/// A document that could not be turned into a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{message} (line {line})")]
    Lex { message: String, line: usize },

    #[error("{message} in {} (line {line})", display_path(.path))]
    Syntax {
        message: String,
        /// Enclosing block names, outermost first.
        path: Vec<String>,
        line: usize,
    },

    #[error("{file}: {inner}")]
    InFile {
        file: String,
        #[source]
        inner: Box<ParseError>,
    },

    #[error("no Gradle build files found")]
    Empty,
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<top level>".to_string()
    } else {
        path.join(" > ")
    }
}

impl ParseError {
    pub(crate) fn lex(message: impl Into<String>, line: usize) -> Self {
        ParseError::Lex {
            message: message.into(),
            line,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, path: &[String], line: usize) -> Self {
        ParseError::Syntax {
            message: message.into(),
            path: path.to_vec(),
            line,
        }
    }

    pub(crate) fn in_file(self, file: &str) -> Self {
        ParseError::InFile {
            file: file.to_string(),
            inner: Box::new(self),
        }
    }

    /// Line of the failure, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Lex { line, .. } | ParseError::Syntax { line, .. } => Some(*line),
            ParseError::InFile { inner, .. } => inner.line(),
            ParseError::Empty => None,
        }
    }

    /// Block path of the failure (`android > defaultConfig`), when known.
    pub fn block_path(&self) -> Option<String> {
        match self {
            ParseError::Syntax { path, .. } => Some(display_path(path)),
            ParseError::InFile { inner, .. } => inner.block_path(),
            _ => None,
        }
    }

    /// Convert into the workspace error for the snapshot labelled `source`.
    pub fn into_malformed(self, source: &str) -> rc_common::Error {
        rc_common::Error::MalformedSnapshot {
            source_label: source.to_string(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_names_block_path() {
        let err = ParseError::syntax(
            "unbalanced '{'",
            &["android".to_string(), "defaultConfig".to_string()],
            12,
        );
        assert_eq!(
            err.to_string(),
            "unbalanced '{' in android > defaultConfig (line 12)"
        );
        assert_eq!(err.block_path().as_deref(), Some("android > defaultConfig"));
    }

    #[test]
    fn test_file_context_keeps_line() {
        let err = ParseError::lex("unterminated string literal", 3).in_file("app/build.gradle.kts");
        assert_eq!(err.line(), Some(3));
        assert!(err.to_string().starts_with("app/build.gradle.kts: "));
    }

    #[test]
    fn test_into_malformed() {
        let err = ParseError::Empty.into_malformed("snapshots/01");
        assert_eq!(err.code(), 10);
        assert!(err.to_string().contains("snapshots/01"));
    }
}
