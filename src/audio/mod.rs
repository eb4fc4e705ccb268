//! # Audio Module
//!
//! Per-guild playback for the jukebox.
//!
//! ## Architecture
//!
//! ### [`player`] - Playback Manager
//! - Owns one playback state per guild, each behind its own lock
//! - Advances through the queue on track completion, skip and enqueue
//! - Bounded retry when a track cannot be started
//!
//! ### [`queue`] - Queue Model
//! - FIFO of upcoming tracks plus the current slot
//! - Loop modes (`none`, `one`, `all`) applied when a track finishes
//!
//! ### [`sink`] - Transport Seam
//! - Traits the manager drives: backend, per-guild sink, per-track session
//! - Session notifiers route end-of-track signals back to the manager
//!
//! ### [`driver`] - Songbird Transport
//! - Voice connections and yt-dlp streaming through songbird
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use crate::audio::player::PlaybackManager;
//! use serenity::all::{ChannelId, GuildId};
//!
//! # async fn example(manager: PlaybackManager) -> Result<(), crate::error::PlaybackError> {
//! let guild_id = GuildId::new(123456789);
//!
//! manager.play(guild_id, "never gonna give you up", "<@1>", Some(ChannelId::new(42))).await?;
//! manager.set_loop_mode(guild_id, "all").await?;
//! manager.skip(guild_id).await?;
//! manager.stop(guild_id).await;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod player;
pub mod queue;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;
