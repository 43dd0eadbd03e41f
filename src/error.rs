use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Operator input
    #[error("invalid season name '{0}', folder must be Season #, Specials or Extras")]
    InvalidSeason(String),

    #[error("show year must be a number, got '{0}'")]
    InvalidYear(String),

    #[error("episode number must be a number, got '{0}'")]
    InvalidEpisode(String),

    #[error("destination path must not be empty")]
    EmptyDestination,

    // Preconditions
    #[error("source does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("destination does not exist: {}", .0.display())]
    DestinationMissing(PathBuf),

    #[error("watch already exists for {0}")]
    DuplicateWatch(String),

    #[error("torrent client configuration unavailable: {0}")]
    TorrentConfigMissing(String),

    #[error("could not find episode number for {file} (source {source_dir}, show {show}, season {season})")]
    ExtractionFailed {
        file: String,
        source_dir: String,
        show: String,
        season: String,
    },

    // Torrent client
    #[error("torrent client rejected the login: {0}")]
    TorrentAuth(String),

    #[error("torrent client request failed: {0}")]
    TorrentApi(String),

    #[error("quit requested by operator")]
    Quit,

    #[error("no operator available to answer: {0}")]
    PromptUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Process exit code the top-level dispatcher uses for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Quit => 0,
            Error::InvalidSeason(_)
            | Error::InvalidYear(_)
            | Error::InvalidEpisode(_)
            | Error::EmptyDestination => 2,
            Error::SourceMissing(_)
            | Error::DestinationMissing(_)
            | Error::DuplicateWatch(_)
            | Error::TorrentConfigMissing(_) => 3,
            Error::ExtractionFailed { .. } | Error::PromptUnavailable(_) => 4,
            Error::TorrentAuth(_) | Error::TorrentApi(_) | Error::Http(_) => 5,
            Error::Io(_) | Error::Json(_) | Error::Walk(_) | Error::Pattern(_) => 1,
        }
    }
}
