use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, filtering or writing alignments.
///
/// Low diversity is not an error: it is reported through
/// [`crate::msa::Diversity`] next to the (still written) alignment.
#[derive(Error, Debug)]
pub enum MsaError {
    #[error("not found: '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("format error in '{}': {message}", path.display())]
    FormatError { path: PathBuf, message: String },

    #[error("empty alignment: {reason}")]
    EmptyAlignment { reason: String },

    #[error(
        "malformed alignment: record '{id}' has {found} match-state columns, query '{query}' has {expected}"
    )]
    MalformedAlignment {
        id: String,
        query: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid filter criteria: {0}")]
    InvalidCriteria(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MsaError {
    pub fn format<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::FormatError { path: path.into(), message: message.into() }
    }

    pub fn empty<S: Into<String>>(reason: S) -> Self {
        Self::EmptyAlignment { reason: reason.into() }
    }

    /// 将 I/O 错误映射为带路径的错误；文件不存在时归类为 `NotFound`。
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Short name of the failure kind, used in the run report and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::FormatError { .. } => "FormatError",
            Self::EmptyAlignment { .. } => "EmptyAlignment",
            Self::MalformedAlignment { .. } => "MalformedAlignment",
            Self::InvalidCriteria(_) => "InvalidCriteria",
            Self::Io { .. } => "Io",
        }
    }
}

pub type MsaResult<T> = Result<T, MsaError>;
