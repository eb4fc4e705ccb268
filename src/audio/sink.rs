//! Seams between the playback manager and the audio transport.
//!
//! An [`AudioBackend`] opens one [`AudioSink`] per guild; the sink owns that
//! guild's voice connection and starts one [`SinkSession`] per track. When a
//! session ends the sink reports it through the [`SessionNotifier`] it was
//! given, which routes the signal back into the guild's serialized state.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Weak;
use tracing::debug;

use super::{
    player::{PlaybackManager, Shared},
    queue::Track,
};

/// Terminal signal of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The track played to its natural end.
    Completed,
    /// The session was stopped on request (skip, stop, supersede).
    Cancelled,
    /// The stream failed while playing.
    Errored,
}

#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Joins a voice channel and hands back the guild's exclusive sink.
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId)
        -> anyhow::Result<Box<dyn AudioSink>>;
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Starts streaming `track` at `volume` percent. Exactly one signal must
    /// later be delivered through `notifier`.
    async fn start(
        &self,
        track: &Track,
        volume: u8,
        notifier: SessionNotifier,
    ) -> anyhow::Result<Box<dyn SinkSession>>;

    /// Releases the voice connection.
    async fn disconnect(&self) -> anyhow::Result<()>;
}

pub trait SinkSession: Send + Sync {
    /// Forces the session to end; the sink reports it as [`SessionEnd::Cancelled`].
    fn stop(&self);

    fn set_volume(&self, volume: u8) -> anyhow::Result<()>;

    fn pause(&self) -> anyhow::Result<()>;

    fn resume(&self) -> anyhow::Result<()>;
}

/// Routes a session's terminal signal back to the manager that started it.
///
/// Holds the manager weakly so a session left running by a dropped manager
/// does not keep it alive.
#[derive(Clone)]
pub struct SessionNotifier {
    manager: Weak<Shared>,
    guild_id: GuildId,
    session_id: u64,
}

impl SessionNotifier {
    pub(crate) fn new(manager: Weak<Shared>, guild_id: GuildId, session_id: u64) -> Self {
        Self {
            manager,
            guild_id,
            session_id,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub async fn notify(&self, end: SessionEnd) {
        match self.manager.upgrade() {
            Some(shared) => {
                PlaybackManager::from_shared(shared)
                    .handle_session_end(self.guild_id, self.session_id, end)
                    .await
            }
            None => debug!(
                "Session {} in guild {} ended after the manager was dropped",
                self.session_id, self.guild_id
            ),
        }
    }
}

impl std::fmt::Debug for SessionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionNotifier")
            .field("guild_id", &self.guild_id)
            .field("session_id", &self.session_id)
            .finish()
    }
}
