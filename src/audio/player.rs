use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::{Finish, GuildQueue, LoopMode, QueueInfo, Track, MAX_VOLUME},
        sink::{AudioBackend, AudioSink, SessionEnd, SessionNotifier, SinkSession},
    },
    config::Config,
    error::PlaybackError,
    sources::TrackResolver,
};

/// Receives playback events that no command caller is waiting for.
pub trait PlaybackObserver: Send + Sync {
    fn track_started(&self, guild_id: GuildId, track: &Track, loop_mode: LoopMode);

    /// A completion-driven advance gave up; the error names the requester.
    fn playback_failed(&self, guild_id: GuildId, error: &PlaybackError);
}

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub default_volume: u8,
    pub max_queue_size: usize,
    /// Consecutive start failures tolerated before advancing gives up.
    pub max_start_attempts: u32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 80,
            max_queue_size: 1000,
            max_start_attempts: 3,
        }
    }
}

impl From<&Config> for PlaybackSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_volume: config.default_volume,
            max_queue_size: config.max_queue_size,
            max_start_attempts: config.max_start_attempts,
        }
    }
}

/// Result of a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// The guild was idle and the track started right away.
    Started(Track),
    /// The track waits at `position` (1-based) among the upcoming tracks.
    Queued { track: Track, position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub skipped: Option<Track>,
    pub next: Option<Track>,
}

/// The playing track together with the player state its controls show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub track: Track,
    pub paused: bool,
    pub loop_mode: LoopMode,
}

struct ActiveSession {
    id: u64,
    handle: Box<dyn SinkSession>,
}

struct GuildPlaybackState {
    queue: GuildQueue,
    volume: u8,
    paused: bool,
    /// Exclusive owner of the guild's voice connection.
    sink: Box<dyn AudioSink>,
    /// `Some` exactly while a track is playing; implies `queue.current()` is `Some`.
    session: Option<ActiveSession>,
    consecutive_failures: u32,
}

impl GuildPlaybackState {
    fn new(sink: Box<dyn AudioSink>, settings: &PlaybackSettings) -> Self {
        Self {
            queue: GuildQueue::new(settings.max_queue_size),
            volume: settings.default_volume,
            paused: false,
            sink,
            session: None,
            consecutive_failures: 0,
        }
    }

    fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    fn active_session(&self) -> Result<&ActiveSession, PlaybackError> {
        self.session.as_ref().ok_or(PlaybackError::NothingPlaying)
    }
}

enum GuildSlot {
    /// Inserted by `enqueue` while it joins the voice channel.
    Vacant,
    Live(GuildPlaybackState),
    /// Removed from the registry; waiters must look the guild up again.
    Retired,
}

pub(crate) struct Shared {
    states: DashMap<GuildId, Arc<Mutex<GuildSlot>>>,
    /// Session ids are unique across guilds and across re-created states.
    next_session_id: AtomicU64,
    resolver: Arc<dyn TrackResolver>,
    backend: Arc<dyn AudioBackend>,
    observer: Arc<dyn PlaybackObserver>,
    settings: PlaybackSettings,
}

/// Registry of per-guild playback states.
///
/// Every operation on a guild holds that guild's lock for its whole duration,
/// so operations on one guild never interleave while different guilds run
/// independently.
#[derive(Clone)]
pub struct PlaybackManager {
    shared: Arc<Shared>,
}

impl PlaybackManager {
    pub fn new(
        settings: PlaybackSettings,
        resolver: Arc<dyn TrackResolver>,
        backend: Arc<dyn AudioBackend>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                states: DashMap::new(),
                next_session_id: AtomicU64::new(1),
                resolver,
                backend,
                observer,
                settings,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Resolves `query` and enqueues the result, joining `voice_channel` if
    /// the guild has no connection yet.
    pub async fn play(
        &self,
        guild_id: GuildId,
        query: &str,
        requested_by: &str,
        voice_channel: Option<ChannelId>,
    ) -> Result<Enqueued, PlaybackError> {
        let channel_id = voice_channel.ok_or(PlaybackError::NotInVoiceChannel)?;

        let track = self
            .shared
            .resolver
            .resolve(query, requested_by)
            .await
            .map_err(|e| {
                warn!("🔍 Lookup failed for `{}`: {:?}", query, e);
                PlaybackError::Resolution(e.to_string())
            })?
            .ok_or_else(|| PlaybackError::NoResolutionResult(query.to_string()))?;

        self.enqueue(guild_id, track, channel_id).await
    }

    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        track: Track,
        channel_id: ChannelId,
    ) -> Result<Enqueued, PlaybackError> {
        loop {
            let slot = Arc::clone(
                &self
                    .shared
                    .states
                    .entry(guild_id)
                    .or_insert_with(|| Arc::new(Mutex::new(GuildSlot::Vacant))),
            );
            let mut guard = slot.lock().await;

            if let GuildSlot::Vacant = *guard {
                match self.shared.backend.connect(guild_id, channel_id).await {
                    Ok(sink) => {
                        info!("🔊 Joined voice channel {} in guild {}", channel_id, guild_id);
                        *guard = GuildSlot::Live(GuildPlaybackState::new(sink, &self.shared.settings));
                    }
                    Err(e) => {
                        error!("Could not join voice channel in guild {}: {:?}", guild_id, e);
                        *guard = GuildSlot::Retired;
                        self.shared
                            .states
                            .remove_if(&guild_id, |_, existing| Arc::ptr_eq(existing, &slot));
                        return Err(PlaybackError::VoiceConnection(e.to_string()));
                    }
                }
            }

            // A concurrent stop retired this slot; look the guild up again.
            let GuildSlot::Live(state) = &mut *guard else {
                continue;
            };

            return self.enqueue_live(guild_id, state, track).await;
        }
    }

    async fn enqueue_live(
        &self,
        guild_id: GuildId,
        state: &mut GuildPlaybackState,
        track: Track,
    ) -> Result<Enqueued, PlaybackError> {
        let position = state.queue.push(track.clone())?;
        state.consecutive_failures = 0;

        if state.is_playing() {
            return Ok(Enqueued::Queued { track, position });
        }

        let started = self.advance(guild_id, state).await?;
        Ok(match started {
            Some(started) if started == track => Enqueued::Started(track),
            _ => {
                let position = state.queue.position_of(&track).unwrap_or(position);
                Enqueued::Queued { track, position }
            }
        })
    }

    /// Starts the head of the queue, skipping over tracks the sink refuses
    /// until the retry budget runs out. Returns `Ok(None)` when the queue is empty.
    async fn advance(
        &self,
        guild_id: GuildId,
        state: &mut GuildPlaybackState,
    ) -> Result<Option<Track>, PlaybackError> {
        let mut last_failure = None;

        while state.consecutive_failures < self.shared.settings.max_start_attempts {
            let Some(track) = state.queue.begin_next() else {
                break;
            };

            let session_id = self.shared.next_session_id.fetch_add(1, Ordering::Relaxed);
            let notifier = SessionNotifier::new(Arc::downgrade(&self.shared), guild_id, session_id);

            match state.sink.start(&track, state.volume, notifier).await {
                Ok(handle) => {
                    info!("🎵 Playing in guild {}: {}", guild_id, track.title);
                    state.consecutive_failures = 0;
                    state.session = Some(ActiveSession {
                        id: session_id,
                        handle,
                    });
                    state.paused = false;
                    self.shared
                        .observer
                        .track_started(guild_id, &track, state.queue.loop_mode());
                    return Ok(Some(track));
                }
                Err(e) => {
                    state.consecutive_failures += 1;
                    warn!(
                        "⚠️ Could not start `{}` in guild {} (failure {}/{}): {:?}",
                        track.title,
                        guild_id,
                        state.consecutive_failures,
                        self.shared.settings.max_start_attempts,
                        e
                    );
                    state.queue.finish_current(Finish::Failed);
                    last_failure = Some(PlaybackError::SinkStartFailure {
                        title: track.title,
                        requested_by: track.requested_by,
                        attempts: state.consecutive_failures,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match last_failure {
            Some(failure) => {
                error!("❌ Giving up advancing in guild {}: {}", guild_id, failure);
                Err(failure)
            }
            None => {
                if !state.queue.is_empty() {
                    debug!("Retry budget exhausted in guild {}, staying idle", guild_id);
                }
                Ok(None)
            }
        }
    }

    /// Applies a session's terminal signal. Signals from sessions that are no
    /// longer active are dropped, so a skip or stop cannot be undone by a late
    /// completion.
    pub(crate) async fn handle_session_end(&self, guild_id: GuildId, session_id: u64, end: SessionEnd) {
        let Some(slot) = self.slot(guild_id) else {
            debug!("Session {} ended in untracked guild {}", session_id, guild_id);
            return;
        };
        let mut guard = slot.lock().await;
        let GuildSlot::Live(state) = &mut *guard else {
            return;
        };

        if state.session.as_ref().map(|active| active.id) != Some(session_id) {
            debug!("Ignoring {:?} from superseded session {} in guild {}", end, session_id, guild_id);
            return;
        }

        let finish = match end {
            SessionEnd::Completed => {
                state.consecutive_failures = 0;
                Finish::Completed
            }
            SessionEnd::Cancelled => {
                warn!("Active session in guild {} was stopped externally", guild_id);
                Finish::Skipped
            }
            SessionEnd::Errored => {
                state.consecutive_failures += 1;
                Finish::Failed
            }
        };

        state.session = None;
        state.paused = false;
        let finished = state.queue.finish_current(finish);
        debug!(
            "Track ended ({:?}) in guild {}: {}",
            end,
            guild_id,
            finished.as_ref().map(|t| t.title.as_str()).unwrap_or("unknown")
        );

        if end == SessionEnd::Errored && state.consecutive_failures >= self.shared.settings.max_start_attempts {
            if let Some(track) = finished {
                let failure = PlaybackError::SinkStartFailure {
                    title: track.title,
                    requested_by: track.requested_by,
                    attempts: state.consecutive_failures,
                    reason: "the stream failed while playing".to_string(),
                };
                error!("❌ Giving up advancing in guild {}: {}", guild_id, failure);
                self.shared.observer.playback_failed(guild_id, &failure);
            }
            return;
        }

        if let Err(failure) = self.advance(guild_id, state).await {
            self.shared.observer.playback_failed(guild_id, &failure);
        }
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Skipped, PlaybackError> {
        let slot = self.slot(guild_id).ok_or(PlaybackError::NoActiveState)?;
        let mut guard = slot.lock().await;
        let GuildSlot::Live(state) = &mut *guard else {
            return Err(PlaybackError::NoActiveState);
        };

        state.consecutive_failures = 0;
        let skipped = match state.session.take() {
            Some(active) => {
                active.handle.stop();
                state.paused = false;
                state.queue.finish_current(Finish::Skipped)
            }
            None => None,
        };

        if let Some(track) = &skipped {
            info!("⏭️ Skipped in guild {}: {}", guild_id, track.title);
        }

        let next = self.advance(guild_id, state).await?;
        Ok(Skipped { skipped, next })
    }

    /// Clears the queue, ends playback and leaves voice. Returns whether the
    /// guild had any state; stopping an untracked guild is a no-op.
    ///
    /// The slot stays registered and locked until the voice connection is
    /// released, so a concurrent enqueue waits and then joins afresh.
    pub async fn stop(&self, guild_id: GuildId) -> bool {
        let Some(slot) = self.slot(guild_id) else {
            debug!("Nothing to stop in guild {}", guild_id);
            return false;
        };

        let mut guard = slot.lock().await;
        let previous = std::mem::replace(&mut *guard, GuildSlot::Retired);
        let stopped = match previous {
            GuildSlot::Live(mut state) => {
                if let Some(active) = state.session.take() {
                    active.handle.stop();
                }
                state.queue.clear();

                if let Err(e) = state.sink.disconnect().await {
                    warn!("Error leaving voice in guild {}: {:?}", guild_id, e);
                }
                info!("⏹️ Stopped and left voice in guild {}", guild_id);
                true
            }
            GuildSlot::Vacant | GuildSlot::Retired => false,
        };

        self.shared
            .states
            .remove_if(&guild_id, |_, existing| Arc::ptr_eq(existing, &slot));
        stopped
    }

    /// Called when the bot's voice channel has no listeners left.
    pub async fn on_voice_channel_vacant(&self, guild_id: GuildId) {
        if self.stop(guild_id).await {
            info!("🚪 Voice channel empty, left guild {}", guild_id);
        }
    }

    /// Accepts exactly `none`, `one` or `all`.
    pub async fn set_loop_mode(&self, guild_id: GuildId, mode: &str) -> Result<LoopMode, PlaybackError> {
        let mode: LoopMode = mode.parse()?;
        self.with_live(guild_id, |state| {
            state.queue.set_loop_mode(mode);
            Ok(mode)
        })
        .await
    }

    pub async fn cycle_loop_mode(&self, guild_id: GuildId) -> Result<LoopMode, PlaybackError> {
        self.with_live(guild_id, |state| {
            let mode = state.queue.loop_mode().cycle();
            state.queue.set_loop_mode(mode);
            Ok(mode)
        })
        .await
    }

    /// Sets the guild's volume in percent; it carries over to every later track.
    pub async fn set_volume(&self, guild_id: GuildId, volume: i64) -> Result<u8, PlaybackError> {
        let volume = u8::try_from(volume)
            .ok()
            .filter(|v| *v <= MAX_VOLUME)
            .ok_or(PlaybackError::InvalidVolume(volume))?;

        self.with_live(guild_id, |state| {
            state.volume = volume;
            if let Some(active) = &state.session {
                if let Err(e) = active.handle.set_volume(volume) {
                    warn!("Could not apply volume in guild {}: {:?}", guild_id, e);
                }
            }
            info!("🔊 Volume set to {}% in guild {}", volume, guild_id);
            Ok(volume)
        })
        .await
    }

    /// Shifts the volume by `delta` percent, saturating at the range bounds.
    pub async fn adjust_volume(&self, guild_id: GuildId, delta: i64) -> Result<u8, PlaybackError> {
        let current = self.volume(guild_id).await?;
        let target = (i64::from(current) + delta).clamp(0, i64::from(MAX_VOLUME));
        self.set_volume(guild_id, target).await
    }

    pub async fn volume(&self, guild_id: GuildId) -> Result<u8, PlaybackError> {
        self.with_live(guild_id, |state| Ok(state.volume)).await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.with_live(guild_id, |state| {
            let active = state.active_session()?;
            if let Err(e) = active.handle.pause() {
                warn!("Could not pause in guild {}: {:?}", guild_id, e);
                return Ok(());
            }
            state.paused = true;
            info!("⏸️ Paused in guild {}", guild_id);
            Ok(())
        })
        .await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.with_live(guild_id, |state| {
            let active = state.active_session()?;
            if let Err(e) = active.handle.resume() {
                warn!("Could not resume in guild {}: {:?}", guild_id, e);
                return Ok(());
            }
            state.paused = false;
            info!("▶️ Resumed in guild {}", guild_id);
            Ok(())
        })
        .await
    }

    /// Pauses or resumes; returns whether playback is now paused.
    pub async fn toggle_pause(&self, guild_id: GuildId) -> Result<bool, PlaybackError> {
        let paused = self.with_live(guild_id, |state| {
            state.active_session()?;
            Ok(state.paused)
        })
        .await?;

        if paused {
            self.resume(guild_id).await?;
        } else {
            self.pause(guild_id).await?;
        }
        Ok(!paused)
    }

    /// Snapshot of the guild's queue. An empty queue is a valid result,
    /// distinct from [`PlaybackError::NoActiveState`].
    pub async fn queue(&self, guild_id: GuildId) -> Result<QueueInfo, PlaybackError> {
        self.with_live(guild_id, |state| Ok(state.queue.info(state.volume, state.paused)))
            .await
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<Track> {
        self.with_live(guild_id, |state| Ok(state.queue.current().cloned()))
            .await
            .ok()
            .flatten()
    }

    pub async fn status(&self, guild_id: GuildId) -> Option<NowPlaying> {
        self.with_live(guild_id, |state| {
            Ok(state.queue.current().cloned().map(|track| NowPlaying {
                track,
                paused: state.paused,
                loop_mode: state.queue.loop_mode(),
            }))
        })
        .await
        .ok()
        .flatten()
    }

    pub fn is_tracking(&self, guild_id: GuildId) -> bool {
        self.shared.states.contains_key(&guild_id)
    }

    fn slot(&self, guild_id: GuildId) -> Option<Arc<Mutex<GuildSlot>>> {
        self.shared.states.get(&guild_id).map(|entry| Arc::clone(entry.value()))
    }

    async fn with_live<R>(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&mut GuildPlaybackState) -> Result<R, PlaybackError>,
    ) -> Result<R, PlaybackError> {
        let slot = self.slot(guild_id).ok_or(PlaybackError::NoActiveState)?;
        let mut guard = slot.lock().await;
        match &mut *guard {
            GuildSlot::Live(state) => f(state),
            GuildSlot::Vacant | GuildSlot::Retired => Err(PlaybackError::NoActiveState),
        }
    }
}
