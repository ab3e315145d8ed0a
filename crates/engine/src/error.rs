use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which of the three required documents a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Timeline,
    Transcript,
    Script,
}

impl InputRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputRole::Timeline => "timeline",
            InputRole::Transcript => "transcript",
            InputRole::Script => "script",
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ConformError {
    /// A required document was not supplied or could not be found.
    #[error("Missing required {0} document")]
    MissingInput(InputRole),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    /// The script is the one document without a usable default.
    #[error("Failed to parse script document: {0}")]
    Script(#[from] serde_json::Error),

    #[error("Failed to write timeline document: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl ConformError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ConformResult<T> = Result<T, ConformError>;
