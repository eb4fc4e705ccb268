use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{Input, YoutubeDl},
    tracks::TrackHandle,
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::{
    queue::Track,
    sink::{AudioBackend, AudioSink, SessionEnd, SessionNotifier, SinkSession},
};

/// [`AudioBackend`] that streams through songbird voice connections.
pub struct SongbirdBackend {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdBackend {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl AudioBackend for SongbirdBackend {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn AudioSink>> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .with_context(|| format!("joining voice channel {channel_id}"))?;

        info!("🔊 Voice connection open in guild {}", guild_id);
        Ok(Box::new(SongbirdSink {
            guild_id,
            manager: Arc::clone(&self.manager),
            call,
            http: self.http.clone(),
        }))
    }
}

struct SongbirdSink {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    http: reqwest::Client,
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn start(&self, track: &Track, volume: u8, notifier: SessionNotifier) -> Result<Box<dyn SinkSession>> {
        let mut input: Input = YoutubeDl::new(self.http.clone(), track.source_ref.clone()).into();

        // Probing metadata runs yt-dlp once, so unplayable sources fail here
        // instead of after the session has been reported as started.
        input
            .aux_metadata()
            .await
            .with_context(|| format!("probing {}", track.source_ref))?;

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only_input(input)
        };
        handle.set_volume(gain(volume))?;

        let flags = SessionFlags::default();
        handle.add_event(
            Event::Track(TrackEvent::End),
            SessionEndHandler {
                notifier: notifier.clone(),
                flags: flags.clone(),
                end: SessionEnd::Completed,
            },
        )?;
        handle.add_event(
            Event::Track(TrackEvent::Error),
            SessionEndHandler {
                notifier,
                flags: flags.clone(),
                end: SessionEnd::Errored,
            },
        )?;

        debug!("Started session for `{}` in guild {}", track.title, self.guild_id);
        Ok(Box::new(SongbirdSession { handle, flags }))
    }

    async fn disconnect(&self) -> Result<()> {
        self.manager.remove(self.guild_id).await?;
        info!("👋 Left voice in guild {}", self.guild_id);
        Ok(())
    }
}

/// Converts a volume percentage into songbird's linear gain.
fn gain(volume: u8) -> f32 {
    f32::from(volume) / 100.0
}

#[derive(Clone, Default)]
struct SessionFlags {
    cancelled: Arc<AtomicBool>,
    reported: Arc<AtomicBool>,
}

struct SongbirdSession {
    handle: TrackHandle,
    flags: SessionFlags,
}

impl SinkSession for SongbirdSession {
    fn stop(&self) {
        self.flags.cancelled.store(true, Ordering::SeqCst);
        if let Err(e) = self.handle.stop() {
            debug!("Track was already gone when stopped: {:?}", e);
        }
    }

    fn set_volume(&self, volume: u8) -> Result<()> {
        Ok(self.handle.set_volume(gain(volume))?)
    }

    fn pause(&self) -> Result<()> {
        Ok(self.handle.pause()?)
    }

    fn resume(&self) -> Result<()> {
        Ok(self.handle.play()?)
    }
}

/// Delivers the session's single terminal signal, whichever track event
/// fires first.
struct SessionEndHandler {
    notifier: SessionNotifier,
    flags: SessionFlags,
    end: SessionEnd,
}

#[async_trait]
impl VoiceEventHandler for SessionEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        if self.flags.reported.swap(true, Ordering::SeqCst) {
            return None;
        }

        let end = if self.flags.cancelled.load(Ordering::SeqCst) {
            SessionEnd::Cancelled
        } else {
            self.end
        };

        if end == SessionEnd::Errored {
            error!(
                "❌ Stream failed in guild {} (session {})",
                self.notifier.guild_id(),
                self.notifier.session_id()
            );
        }

        // The manager may start the next track from here; keep songbird's
        // event loop free while it does.
        let notifier = self.notifier.clone();
        tokio::spawn(async move { notifier.notify(end).await });

        None
    }
}
