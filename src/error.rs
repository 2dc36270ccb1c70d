use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a raw document into a workflow graph or execution trace.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse {format} document: {message}")]
    Syntax { format: String, message: String },

    #[error("Document root must be a mapping")]
    NotAMapping,

    #[error("Document has no 'graph' section")]
    MissingGraph,

    #[error("The 'graph' section is invalid: {0}")]
    InvalidGraph(String),
}

/// An edge endpoint that names a node the workflow never defines.
///
/// These are reported as critical issues in the audit; they never abort parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Edge {from} -> {to} references undefined {side} node '{missing_node_id}'")]
pub struct ReferenceError {
    pub from: String,
    pub to: String,
    pub side: EdgeSide,
    pub missing_node_id: String,
}

/// Which end of an edge a [`ReferenceError`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Source,
    Target,
}

impl std::fmt::Display for EdgeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeSide::Source => write!(f, "source"),
            EdgeSide::Target => write!(f, "target"),
        }
    }
}

/// A required input file could not be read.
#[derive(Error, Debug)]
#[error("Could not read '{}': {source}", path.display())]
pub struct MissingDataError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// An unexpected failure inside a single analyzer.
///
/// The audit converts these into report entries so sibling analyzers still run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Analyzer '{analyzer}' failed: {message}")]
pub struct AnalysisError {
    pub analyzer: String,
    pub message: String,
}

impl AnalysisError {
    pub fn new(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }
}

/// Errors in user supplied configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Metric pattern '{name}' is not a valid regular expression: {message}")]
    InvalidPattern { name: String, message: String },
}

/// Top-level error for the fallible entry points of the crate.
#[derive(Error, Debug)]
pub enum KansaError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    MissingData(#[from] MissingDataError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write report '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, KansaError>;

/// Reads a whole input document, mapping any I/O failure to [`MissingDataError`].
pub(crate) fn read_document(path: &std::path::Path) -> std::result::Result<String, MissingDataError> {
    std::fs::read_to_string(path).map_err(|source| MissingDataError {
        path: path.to_path_buf(),
        source,
    })
}
