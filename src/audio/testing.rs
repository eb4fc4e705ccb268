//! In-memory audio backend and observer for exercising the playback manager.

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::Semaphore;

use super::{
    player::PlaybackObserver,
    queue::{LoopMode, Track},
    sink::{AudioBackend, AudioSink, SessionEnd, SessionNotifier, SinkSession},
};
use crate::error::PlaybackError;

pub fn guild(id: u64) -> GuildId {
    GuildId::new(id)
}

pub fn channel(id: u64) -> ChannelId {
    ChannelId::new(id)
}

pub fn track(title: &str) -> Track {
    Track::new(title, format!("https://example.com/{title}"), "<@1>")
}

pub struct FakeSession {
    pub title: String,
    pub notifier: SessionNotifier,
    volume: AtomicU8,
    stopped: AtomicBool,
    paused: AtomicBool,
}

impl FakeSession {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }
}

struct FakeHandle(Arc<FakeSession>);

impl SinkSession for FakeHandle {
    fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: u8) -> anyhow::Result<()> {
        self.0.volume.store(volume, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> anyhow::Result<()> {
        self.0.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> anyhow::Result<()> {
        self.0.paused.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeState {
    sessions: Mutex<HashMap<GuildId, Vec<Arc<FakeSession>>>>,
    start_attempts: Mutex<HashMap<GuildId, usize>>,
    failing_sources: Mutex<HashSet<String>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_connect: AtomicBool,
    start_gate: Mutex<Option<Arc<Semaphore>>>,
    events: Mutex<Vec<String>>,
}

/// Records every session it starts. Sessions never end on their own; tests
/// end them with [`FakeBackend::complete_current`] or [`FakeBackend::end_current`].
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    /// Makes every later start of `source_ref` fail.
    pub fn fail_source(&self, source_ref: &str) {
        self.state.failing_sources.lock().insert(source_ref.to_string());
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes later starts wait until [`FakeBackend::release_starts`].
    pub fn hold_starts(&self) {
        *self.state.start_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_starts(&self) {
        if let Some(gate) = self.state.start_gate.lock().take() {
            gate.close();
        }
    }

    /// Connects, successful starts and disconnects in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn start_attempts(&self, guild_id: GuildId) -> usize {
        self.state
            .start_attempts
            .lock()
            .get(&guild_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn started_titles(&self, guild_id: GuildId) -> Vec<String> {
        self.state
            .sessions
            .lock()
            .get(&guild_id)
            .map(|sessions| sessions.iter().map(|s| s.title.clone()).collect())
            .unwrap_or_default()
    }

    pub fn last_session(&self, guild_id: GuildId) -> Option<Arc<FakeSession>> {
        self.state
            .sessions
            .lock()
            .get(&guild_id)
            .and_then(|sessions| sessions.last().cloned())
    }

    pub async fn complete_current(&self, guild_id: GuildId) {
        self.end_current(guild_id, SessionEnd::Completed).await;
    }

    pub async fn end_current(&self, guild_id: GuildId, end: SessionEnd) {
        let session = self.last_session(guild_id).expect("no session was started");
        session.notifier.notify(end).await;
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn connect(&self, guild_id: GuildId, _channel_id: ChannelId) -> anyhow::Result<Box<dyn AudioSink>> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            bail!("voice gateway timed out");
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.events.lock().push("connect".to_string());
        Ok(Box::new(FakeSink {
            guild_id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSink {
    guild_id: GuildId,
    state: Arc<FakeState>,
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn start(
        &self,
        track: &Track,
        volume: u8,
        notifier: SessionNotifier,
    ) -> anyhow::Result<Box<dyn SinkSession>> {
        *self.state.start_attempts.lock().entry(self.guild_id).or_default() += 1;

        let gate = self.state.start_gate.lock().clone();
        if let Some(gate) = gate {
            // Closing the gate releases every waiter.
            let _ = gate.acquire().await;
        }

        if self.state.failing_sources.lock().contains(&track.source_ref) {
            bail!("unplayable source {}", track.source_ref);
        }

        let session = Arc::new(FakeSession {
            title: track.title.clone(),
            notifier,
            volume: AtomicU8::new(volume),
            stopped: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        });
        self.state
            .sessions
            .lock()
            .entry(self.guild_id)
            .or_default()
            .push(Arc::clone(&session));
        self.state.events.lock().push(format!("start {}", track.title));

        Ok(Box::new(FakeHandle(session)))
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state.events.lock().push("disconnect".to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<(GuildId, String)>>,
    failures: Mutex<Vec<(GuildId, PlaybackError)>>,
}

impl RecordingObserver {
    pub fn started(&self) -> Vec<(GuildId, String)> {
        self.started.lock().clone()
    }

    pub fn failures(&self) -> Vec<(GuildId, PlaybackError)> {
        self.failures.lock().clone()
    }
}

impl PlaybackObserver for RecordingObserver {
    fn track_started(&self, guild_id: GuildId, track: &Track, _loop_mode: LoopMode) {
        self.started.lock().push((guild_id, track.title.clone()));
    }

    fn playback_failed(&self, guild_id: GuildId, error: &PlaybackError) {
        self.failures.lock().push((guild_id, error.clone()));
    }
}
