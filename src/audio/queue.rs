use chrono::{DateTime, Utc};
use std::{collections::VecDeque, fmt, str::FromStr, time::Duration};
use tracing::{debug, info};

use crate::error::PlaybackError;

/// Upper bound of the volume range, in percent.
pub const MAX_VOLUME: u8 = 200;

/// One playable unit, immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    /// Reference the audio driver can stream from, usually a URL.
    pub source_ref: String,
    /// Identity of the user who asked for the track, as a Discord mention.
    pub requested_by: String,
    pub artist: Option<String>,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub queued_at: DateTime<Utc>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        source_ref: impl Into<String>,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source_ref: source_ref.into(),
            requested_by: requested_by.into(),
            artist: None,
            duration: None,
            thumbnail: None,
            queued_at: Utc::now(),
        }
    }

    pub fn with_artist(mut self, artist: String) -> Self {
        self.artist = Some(artist);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }
}

/// What happens to the current track once it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    /// Replay the current track.
    One,
    /// Recycle the whole queue.
    All,
}

impl LoopMode {
    /// Next mode in the order used by the loop button.
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::One,
            Self::One => Self::All,
            Self::All => Self::Off,
        }
    }
}

impl FromStr for LoopMode {
    type Err = PlaybackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::Off),
            "one" => Ok(Self::One),
            "all" => Ok(Self::All),
            other => Err(PlaybackError::InvalidLoopMode(other.to_string())),
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "none",
            Self::One => "one",
            Self::All => "all",
        })
    }
}

/// Why the current track left the `current` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Completed,
    Skipped,
    Failed,
}

/// Queue half of a guild's playback state.
///
/// `current` is never also present in `items`: a finished track is only put
/// back into `items` after it has been taken out of `current`.
#[derive(Debug)]
pub struct GuildQueue {
    items: VecDeque<Track>,
    current: Option<Track>,
    loop_mode: LoopMode,
    max_size: usize,
}

impl GuildQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            current: None,
            loop_mode: LoopMode::Off,
            max_size,
        }
    }

    /// Appends a track and returns its 1-based position among the upcoming tracks.
    pub fn push(&mut self, track: Track) -> Result<usize, PlaybackError> {
        if self.items.len() >= self.max_size {
            return Err(PlaybackError::QueueFull(self.max_size));
        }

        info!("➕ Queued: {}", track.title);
        self.items.push_back(track);
        Ok(self.items.len())
    }

    /// Moves the head of the queue into `current`.
    pub fn begin_next(&mut self) -> Option<Track> {
        debug_assert!(self.current.is_none(), "current track was not finished");

        let next = self.items.pop_front();
        match &next {
            Some(track) => debug!("➡️ Next in queue: {}", track.title),
            None => debug!("📭 Queue is empty"),
        }
        self.current = next.clone();
        next
    }

    /// Empties `current`, applying the loop policy for the given reason, and
    /// returns the track that was playing.
    pub fn finish_current(&mut self, finish: Finish) -> Option<Track> {
        let finished = self.current.take()?;

        match (finish, self.loop_mode) {
            (Finish::Completed, LoopMode::One) => {
                debug!("🔂 Replaying: {}", finished.title);
                self.items.push_front(finished.clone());
            }
            (Finish::Completed | Finish::Skipped, LoopMode::All) => {
                debug!("🔁 Recycled to the back: {}", finished.title);
                self.items.push_back(finished.clone());
            }
            _ => {}
        }

        Some(finished)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
        info!("🗑️ Queue cleared");
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
        match mode {
            LoopMode::Off => info!("➡️ Loop disabled"),
            LoopMode::One => info!("🔂 Looping current track"),
            LoopMode::All => info!("🔁 Looping queue"),
        }
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn upcoming(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based position of a track among the upcoming tracks.
    pub fn position_of(&self, track: &Track) -> Option<usize> {
        self.items.iter().position(|item| item == track).map(|i| i + 1)
    }

    pub fn info(&self, volume: u8, paused: bool) -> QueueInfo {
        QueueInfo {
            current: self.current.clone(),
            items: self.items.iter().cloned().collect(),
            total_items: self.items.len(),
            loop_mode: self.loop_mode,
            volume,
            paused,
            total_duration: self.calculate_total_duration(),
        }
    }

    fn calculate_total_duration(&self) -> Duration {
        let queue_duration: Duration = self.items.iter().filter_map(|item| item.duration).sum();

        let current_duration = self
            .current
            .as_ref()
            .and_then(|c| c.duration)
            .unwrap_or_default();

        queue_duration + current_duration
    }
}

/// Snapshot of a guild's queue for display.
#[derive(Debug, Clone)]
pub struct QueueInfo {
    pub current: Option<Track>,
    pub items: Vec<Track>,
    pub total_items: usize,
    pub loop_mode: LoopMode,
    pub volume: u8,
    pub paused: bool,
    pub total_duration: Duration,
}

impl QueueInfo {
    pub fn titles(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.title.as_str()).collect()
    }

    /// Returns one page of upcoming tracks; pages are 1-based and clamped.
    pub fn get_page(&self, page: usize, items_per_page: usize) -> QueuePage {
        let items_per_page = items_per_page.max(1);
        let total_pages = self.total_items.div_ceil(items_per_page).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * items_per_page;
        let end = (start + items_per_page).min(self.items.len());

        QueuePage {
            items: self.items.get(start..end).map(<[Track]>::to_vec).unwrap_or_default(),
            first_position: start + 1,
            current_page,
            total_pages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<Track>,
    /// 1-based queue position of `items[0]`.
    pub first_position: usize,
    pub current_page: usize,
    pub total_pages: usize,
}
