//! User intents shared by slash commands, prefix commands and buttons.

use serenity::model::id::{ChannelId, GuildId};
use tracing::debug;

use crate::{
    audio::{
        player::{Enqueued, NowPlaying, PlaybackManager, Skipped},
        queue::{LoopMode, QueueInfo},
    },
    error::PlaybackError,
};

/// Volume step of the volume buttons, in percent.
pub const VOLUME_STEP: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ping,
    Help,
    Play { query: String },
    Skip,
    Stop,
    Queue { page: usize },
    NowPlaying,
    Loop { mode: String },
    CycleLoop,
    /// `None` reports the current volume.
    Volume { level: Option<i64> },
    AdjustVolume { delta: i64 },
    Pause,
    Resume,
    TogglePause,
}

/// Who asked, and from where.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub guild_id: GuildId,
    /// Mention of the requesting user.
    pub requested_by: String,
    /// Voice channel the requester is in, if any.
    pub voice_channel: Option<ChannelId>,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Pong,
    Help,
    Enqueued(Enqueued),
    Skipped(Skipped),
    Stopped { was_active: bool },
    Queue { info: QueueInfo, page: usize },
    NowPlaying(Option<NowPlaying>),
    LoopMode(LoopMode),
    Volume { level: u8, changed: bool },
    Paused { paused: bool },
}

pub async fn execute(
    manager: &PlaybackManager,
    invocation: &Invocation,
    action: Action,
) -> Result<Outcome, PlaybackError> {
    let guild_id = invocation.guild_id;
    debug!("Executing {:?} in guild {}", action, guild_id);

    let outcome = match action {
        Action::Ping => Outcome::Pong,
        Action::Help => Outcome::Help,
        Action::Play { query } => {
            let enqueued = manager
                .play(
                    guild_id,
                    query.trim(),
                    &invocation.requested_by,
                    invocation.voice_channel,
                )
                .await?;
            Outcome::Enqueued(enqueued)
        }
        Action::Skip => Outcome::Skipped(manager.skip(guild_id).await?),
        Action::Stop => Outcome::Stopped {
            was_active: manager.stop(guild_id).await,
        },
        Action::Queue { page } => Outcome::Queue {
            info: manager.queue(guild_id).await?,
            page,
        },
        Action::NowPlaying => Outcome::NowPlaying(manager.status(guild_id).await),
        Action::Loop { mode } => Outcome::LoopMode(manager.set_loop_mode(guild_id, &mode).await?),
        Action::CycleLoop => Outcome::LoopMode(manager.cycle_loop_mode(guild_id).await?),
        Action::Volume { level: None } => Outcome::Volume {
            level: manager.volume(guild_id).await?,
            changed: false,
        },
        Action::Volume { level: Some(level) } => Outcome::Volume {
            level: manager.set_volume(guild_id, level).await?,
            changed: true,
        },
        Action::AdjustVolume { delta } => Outcome::Volume {
            level: manager.adjust_volume(guild_id, delta).await?,
            changed: true,
        },
        Action::Pause => {
            manager.pause(guild_id).await?;
            Outcome::Paused { paused: true }
        }
        Action::Resume => {
            manager.resume(guild_id).await?;
            Outcome::Paused { paused: false }
        }
        Action::TogglePause => Outcome::Paused {
            paused: manager.toggle_pause(guild_id).await?,
        },
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        player::PlaybackSettings,
        queue::Track,
        testing::{channel, guild, FakeBackend, RecordingObserver},
    };
    use crate::sources::MockTrackResolver;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn manager() -> (PlaybackManager, FakeBackend) {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().returning(|query, requester| {
            Ok(Some(Track::new(
                query,
                format!("https://example.com/{query}"),
                requester,
            )))
        });
        let backend = FakeBackend::default();
        let manager = PlaybackManager::new(
            PlaybackSettings::default(),
            Arc::new(resolver),
            Arc::new(backend.clone()),
            Arc::new(RecordingObserver::default()),
        );
        (manager, backend)
    }

    fn listener() -> Invocation {
        Invocation {
            guild_id: guild(1),
            requested_by: "<@42>".into(),
            voice_channel: Some(channel(10)),
        }
    }

    async fn run(manager: &PlaybackManager, invocation: &Invocation, action: Action) -> Result<Outcome, PlaybackError> {
        execute(manager, invocation, action).await
    }

    #[tokio::test]
    async fn test_play_trims_query_and_carries_requester() {
        let (manager, backend) = manager();

        let outcome = run(&manager, &listener(), Action::Play { query: "  song  ".into() })
            .await
            .unwrap();

        let Outcome::Enqueued(Enqueued::Started(track)) = outcome else {
            panic!("expected the track to start");
        };
        assert_eq!(track.title, "song");
        assert_eq!(track.requested_by, "<@42>");
        assert_eq!(backend.started_titles(guild(1)), vec!["song"]);
    }

    #[tokio::test]
    async fn test_play_outside_voice_is_rejected() {
        let (manager, _) = manager();
        let invocation = Invocation {
            voice_channel: None,
            ..listener()
        };

        let result = run(&manager, &invocation, Action::Play { query: "song".into() }).await;

        assert!(matches!(result, Err(PlaybackError::NotInVoiceChannel)));
    }

    #[tokio::test]
    async fn test_controls_without_state() {
        let (manager, _) = manager();
        let invocation = listener();

        assert!(matches!(
            run(&manager, &invocation, Action::Skip).await,
            Err(PlaybackError::NoActiveState)
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::Stop).await,
            Ok(Outcome::Stopped { was_active: false })
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::NowPlaying).await,
            Ok(Outcome::NowPlaying(None))
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::Queue { page: 1 }).await,
            Err(PlaybackError::NoActiveState)
        ));
    }

    #[tokio::test]
    async fn test_volume_and_loop_actions() {
        let (manager, _) = manager();
        let invocation = listener();
        run(&manager, &invocation, Action::Play { query: "a".into() }).await.unwrap();

        assert!(matches!(
            run(&manager, &invocation, Action::Volume { level: None }).await,
            Ok(Outcome::Volume { level: 80, changed: false })
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::AdjustVolume { delta: -VOLUME_STEP }).await,
            Ok(Outcome::Volume { level: 70, changed: true })
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::Volume { level: Some(500) }).await,
            Err(PlaybackError::InvalidVolume(500))
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::CycleLoop).await,
            Ok(Outcome::LoopMode(LoopMode::One))
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::Loop { mode: "all".into() }).await,
            Ok(Outcome::LoopMode(LoopMode::All))
        ));
    }

    #[tokio::test]
    async fn test_now_playing_carries_player_state() {
        let (manager, _) = manager();
        let invocation = listener();
        run(&manager, &invocation, Action::Play { query: "a".into() }).await.unwrap();
        run(&manager, &invocation, Action::Loop { mode: "all".into() }).await.unwrap();
        run(&manager, &invocation, Action::Pause).await.unwrap();

        let Ok(Outcome::NowPlaying(Some(now))) = run(&manager, &invocation, Action::NowPlaying).await else {
            panic!("expected a playing track");
        };
        assert_eq!(now.track.title, "a");
        assert_eq!(now.loop_mode, LoopMode::All);
        assert!(now.paused);
    }

    #[tokio::test]
    async fn test_toggle_pause_reports_new_state() {
        let (manager, _) = manager();
        let invocation = listener();
        run(&manager, &invocation, Action::Play { query: "a".into() }).await.unwrap();

        assert!(matches!(
            run(&manager, &invocation, Action::TogglePause).await,
            Ok(Outcome::Paused { paused: true })
        ));
        assert!(matches!(
            run(&manager, &invocation, Action::Resume).await,
            Ok(Outcome::Paused { paused: false })
        ));
    }
}
