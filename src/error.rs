use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("cannot allocate cache storage for {sets} sets of {ways} lines")]
    Allocation { sets: u64, ways: usize },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Problems with the command line or sweep config. Always reported before
/// any cache is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required command line argument")]
    MissingArgument,

    #[error("{flag} must be a positive integer")]
    NotPositive { flag: &'static str },

    #[error("set bits ({s}) plus block bits ({b}) exceed the {width}-bit address")]
    AddressTooNarrow { s: u32, b: u32, width: u32 },

    #[error("unexpected arguments: {0}")]
    Unexpected(String),

    #[error("sweep config lists no geometries")]
    EmptySweep,

    #[error("geometry {name:?}: {source}")]
    InvalidGeometry {
        name: String,
        source: Box<ConfigError>,
    },

    #[error(transparent)]
    Args(#[from] pico_args::Error),

    #[error("invalid sweep config: {0}")]
    Json(#[from] serde_json::Error),
}
