//! Everything that can stop a run. Nothing here is retried: bad input is rejected before
//! the first thread starts, the rest is fatal.

use std::{collections::TryReserveError, io, path::PathBuf};

use thiserror::Error;

use crate::actor::Actor;

#[derive(Error, Debug)]
pub enum SimError {
    /// Rejected before any actor is spawned
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unable to reserve storage for {requested} wait samples")]
    Allocation {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("failed to spawn a thread for {actor}")]
    Spawn {
        actor: Actor,
        #[source]
        source: io::Error,
    },

    #[error("{actor} panicked before completing its turn")]
    ActorPanicked { actor: Actor },

    #[error("failed to read config file {}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config file")]
    ConfigParse(#[from] toml::de::Error),
}

pub type SimResult<T> = Result<T, SimError>;
