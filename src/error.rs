use std::path::PathBuf;

use thiserror::Error;

use crate::components::TilePos;

/// Why a placement was refused. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("footprint at {pos} does not fit inside the {width}x{height} map")]
    OutOfBounds { pos: TilePos, width: u32, height: u32 },

    #[error("tile {pos} is already occupied")]
    Occupied { pos: TilePos },

    #[error("cannot afford {cost} with a balance of {money}")]
    InsufficientFunds { cost: i64, money: i64 },
}

/// Fatal problems with a template catalog. A single bad entry fails the whole load.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("template #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("template '{name}' has an invalid '{field}': {reason}")]
    InvalidField {
        name: String,
        field: &'static str,
        reason: String,
    },

    #[error("road template '{name}' cannot declare '{field}'")]
    UnexpectedField { name: String, field: &'static str },

    #[error("template name '{0}' is defined more than once")]
    Duplicate(String),
}

/// Failures while restoring a saved game. The engine state is left untouched.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("save io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("save references unknown template '{name}' at {pos}")]
    UnknownTemplate { name: String, pos: TilePos },

    #[error("corrupt save: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save format error: {0}")]
    Format(#[from] serde_json::Error),
}
