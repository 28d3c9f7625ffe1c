//! Error types shared across the catalog, crew and persistence layers.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to fetch or decode catalog data.
///
/// Always recoverable: the caller reports it and the user can retry by
/// selecting the faction again.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A local catalog file could not be read.
    #[error("failed to read {path}")]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A remote catalog document could not be fetched.
    #[error("failed to fetch {url}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Underlying HTTP failure.
        #[source]
        source: reqwest::Error,
    },
    /// The payload was not the expected JSON document.
    #[error("failed to parse {location}")]
    Parse {
        /// Path or URL of the payload.
        location: String,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The requested faction is not listed in the loaded index.
    #[error("unknown faction '{0}'")]
    UnknownFaction(String),
    /// Directory discovery turned up no faction files.
    #[error("no faction files found under {0}")]
    MissingFaction(PathBuf),
}

/// Failure to access the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read.
    #[error("failed to read store {location}")]
    Read {
        /// Store location.
        location: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The backing medium rejected the write. Prior contents are untouched.
    #[error("failed to write store {location}")]
    Write {
        /// Store location.
        location: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A value could not be encoded or the store file itself is malformed.
    #[error("failed to encode store data")]
    Serialize(#[from] serde_json::Error),
    /// The store cannot be used at all (e.g. no writable location).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reason the composition rules declined an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddRejected {
    /// The crew already has its leader.
    #[error("{card} cannot join: the crew already has a leader")]
    LeaderLimit {
        /// Rejected card name.
        card: String,
    },
    /// A unique card is already part of the crew.
    #[error("{card} is unique and already in the crew")]
    DuplicateUnique {
        /// Rejected card name.
        card: String,
    },
}

impl AddRejected {
    /// Name of the card that was refused.
    pub fn card(&self) -> &str {
        match self {
            AddRejected::LeaderLimit { card } | AddRejected::DuplicateUnique { card } => card,
        }
    }
}

/// Errors raised by [`crate::session::CrewSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No faction catalog has finished loading yet.
    #[error("no faction loaded")]
    NoFaction,
    /// The named card is not part of the loaded faction.
    #[error("card '{0}' not found in the current faction")]
    UnknownCard(String),
    /// The saved crew could not be found.
    #[error("saved crew {0} not found")]
    UnknownSave(String),
    /// The saved crew belongs to a different faction than the one loaded.
    #[error("saved crew is for {expected}, but {loaded} is loaded")]
    FactionMismatch {
        /// Faction the saved crew was built for.
        expected: String,
        /// Faction currently loaded.
        loaded: String,
    },
    /// The rules engine declined the insertion.
    #[error(transparent)]
    Rejected(#[from] AddRejected),
    /// Persisting failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
