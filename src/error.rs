//! Error taxonomy for playback operations.
//!
//! Every variant is local to one guild's operation and is handed back to the
//! caller as a value. The command layer renders each one to a user-facing
//! embed through [`crate::ui::embeds::error_embed`].

use thiserror::Error;

use crate::audio::queue::MAX_VOLUME;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("You need to be in a voice channel to play music.")]
    NotInVoiceChannel,

    #[error("No results found for `{0}`.")]
    NoResolutionResult(String),

    #[error("Unknown loop mode `{0}`. Use `none`, `one` or `all`.")]
    InvalidLoopMode(String),

    #[error("Volume {0} is out of range. Use a value between 0 and {max}.", max = MAX_VOLUME)]
    InvalidVolume(i64),

    #[error("Could not start `{title}` (requested by {requested_by}) after {attempts} attempt(s): {reason}")]
    SinkStartFailure {
        title: String,
        requested_by: String,
        attempts: u32,
        reason: String,
    },

    #[error("Nothing has been queued in this server.")]
    NoActiveState,

    #[error("Nothing is playing.")]
    NothingPlaying,

    #[error("The queue is full (maximum {0} tracks).")]
    QueueFull(usize),

    #[error("Could not join the voice channel: {0}")]
    VoiceConnection(String),

    #[error("Track lookup failed: {0}")]
    Resolution(String),
}

impl PlaybackError {
    /// Errors the user caused and can fix themselves, as opposed to failures
    /// of the voice or lookup backends.
    pub fn is_user_caused(&self) -> bool {
        matches!(
            self,
            Self::NotInVoiceChannel
                | Self::NoResolutionResult(_)
                | Self::InvalidLoopMode(_)
                | Self::InvalidVolume(_)
                | Self::NoActiveState
                | Self::NothingPlaying
                | Self::QueueFull(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            PlaybackError::InvalidVolume(201).to_string(),
            "Volume 201 is out of range. Use a value between 0 and 200."
        );
        assert_eq!(
            PlaybackError::InvalidLoopMode("forever".into()).to_string(),
            "Unknown loop mode `forever`. Use `none`, `one` or `all`."
        );
    }

    #[test]
    fn test_backend_failures_are_not_user_caused() {
        assert!(PlaybackError::NotInVoiceChannel.is_user_caused());
        assert!(!PlaybackError::VoiceConnection("timeout".into()).is_user_caused());
        assert!(!PlaybackError::SinkStartFailure {
            title: "a".into(),
            requested_by: "<@1>".into(),
            attempts: 3,
            reason: "boom".into(),
        }
        .is_user_caused());
    }
}
