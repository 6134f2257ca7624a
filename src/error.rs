use thiserror::Error;

/// Errors surfaced by music operations.
///
/// The `Display` text of every variant is the reply the requester sees, so
/// handlers forward `to_string()` verbatim. Variants carrying a `reason`
/// keep the underlying cause for the logs only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("You need to be in a voice channel to make me join!")]
    NoChannelToJoin,

    #[error("You need to be in a voice channel to play music!")]
    NoChannelToPlay,

    #[error("You need to provide a search query!")]
    EmptyQuery,

    #[error("I couldn't join your voice channel. Please ensure I have permissions.")]
    JoinFailed { reason: String },

    #[error("I am not currently in a voice channel.")]
    NotConnected,

    #[error("Could not find any results for **{query}**. Please try a different query.")]
    NoResults { query: String },

    #[error("Could not find or process audio from that link/query: `{reason}`. Please try a different one.")]
    Resolve { reason: String },

    #[error("The queue is full (maximum {max} songs).")]
    QueueFull { max: usize },

    #[error("No song is currently playing to pause.")]
    NotPlaying,

    #[error("No song is currently paused.")]
    NotPaused,

    #[error("Nothing is currently playing.")]
    NothingPlaying,

    #[error("No song is currently playing to skip.")]
    NothingToSkip,

    #[error("The queue is empty, so there's nothing to remove.")]
    QueueEmpty,

    #[error("Invalid index. Please provide a number between 1 and {len}.")]
    InvalidIndex { len: usize },

    #[error("The queue is already empty.")]
    QueueAlreadyEmpty,

    #[error("Playback failed: {reason}")]
    Playback { reason: String },
}

pub type MusicResult<T> = Result<T, MusicError>;
