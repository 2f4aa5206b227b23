//! error taxonomy
//!
//! A load is a batch operation: nearly every error aborts it. The one expected non-error outcome, a reference whose
//! value is not known yet, is [crate::resolve::Resolved::Pending] and never shows up here.
use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Structural or content error in a specific document
    #[error("Error in file at {}\n{message}", display_path(.path))]
    InvalidProjectFile {
        path: Option<PathBuf>,
        message: String,
    },

    /// Config key that the node's schema does not know about
    #[error(
        "Error in file at {}\nUnneeded field '{field}' in config for object type '{node_type}'",
        display_path(.path)
    )]
    UnusedProjectField {
        path: Option<PathBuf>,
        field: String,
        node_type: String,
    },

    /// Malformed reference text or a path that does not lead anywhere
    #[error("Invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    #[error("Unsupported reference type: {0}")]
    UnsupportedReferenceType(String),

    #[error(
        "Version mismatch: project declares project version {project} but the model is at version {model}"
    )]
    VersionMismatch { project: String, model: String },

    #[error("Credentials file permissions are too relaxed. Run: chmod 0400 {}", .path.display())]
    PermissionError { path: PathBuf },

    #[error("IO error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse yaml file {}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    pub fn invalid_file(path: Option<&Path>, message: impl Into<String>) -> Self {
        Error::InvalidProjectFile {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }

    pub fn invalid_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<memory>".to_string(),
    }
}

/// Failure of a single field validator or type check
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
