use dashmap::DashMap;
use parking_lot::RwLock;
use serenity::{
    builder::CreateMessage,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::{
    audio::{
        player::PlaybackObserver,
        queue::{LoopMode, Track},
    },
    error::PlaybackError,
    ui::{buttons, embeds},
};

/// Posts playback events to the text channel a guild last used for commands.
#[derive(Default)]
pub struct Announcer {
    http: RwLock<Option<Arc<Http>>>,
    channels: DashMap<GuildId, ChannelId>,
}

impl Announcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the HTTP client once the gateway is ready.
    pub fn attach(&self, http: Arc<Http>) {
        *self.http.write() = Some(http);
    }

    pub fn remember_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channels.insert(guild_id, channel_id);
    }

    pub fn channel_for(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channels.get(&guild_id).map(|entry| *entry.value())
    }

    fn post(&self, guild_id: GuildId, message: CreateMessage) {
        let Some(channel_id) = self.channel_for(guild_id) else {
            debug!("No announcement channel for guild {}", guild_id);
            return;
        };
        let Some(http) = self.http.read().clone() else {
            debug!("Announcer not attached yet, dropping message for guild {}", guild_id);
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = channel_id.send_message(&http, message).await {
                error!("Error sending announcement in guild {}: {:?}", guild_id, e);
            }
        });
    }
}

fn failure_message(error: &PlaybackError) -> CreateMessage {
    let message = CreateMessage::new().embed(embeds::error_embed(error));
    match error {
        PlaybackError::SinkStartFailure { requested_by, .. } => message.content(requested_by.clone()),
        _ => message,
    }
}

/// A freshly started track is never paused.
fn now_playing_message(track: &Track, loop_mode: LoopMode) -> CreateMessage {
    CreateMessage::new()
        .embed(embeds::now_playing_embed(track))
        .components(buttons::player_buttons(false, loop_mode))
}

impl PlaybackObserver for Announcer {
    fn track_started(&self, guild_id: GuildId, track: &Track, loop_mode: LoopMode) {
        self.post(guild_id, now_playing_message(track, loop_mode));
    }

    fn playback_failed(&self, guild_id: GuildId, error: &PlaybackError) {
        self.post(guild_id, failure_message(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remembers_latest_channel_per_guild() {
        let announcer = Announcer::new();
        let guild = GuildId::new(1);

        assert_eq!(announcer.channel_for(guild), None);
        announcer.remember_channel(guild, ChannelId::new(10));
        announcer.remember_channel(guild, ChannelId::new(11));
        announcer.remember_channel(GuildId::new(2), ChannelId::new(20));

        assert_eq!(announcer.channel_for(guild), Some(ChannelId::new(11)));
    }

    #[test]
    fn test_failure_mentions_requester() {
        let error = PlaybackError::SinkStartFailure {
            title: "Song".into(),
            requested_by: "<@9>".into(),
            attempts: 3,
            reason: "unplayable".into(),
        };

        let json = serde_json::to_value(failure_message(&error)).unwrap();

        assert_eq!(json["content"], "<@9>");
    }

    #[test]
    fn test_unattached_announcer_drops_silently() {
        let announcer = Announcer::new();
        announcer.remember_channel(GuildId::new(1), ChannelId::new(10));
        announcer.track_started(
            GuildId::new(1),
            &Track::new("a", "https://example.com/a", "<@1>"),
            LoopMode::Off,
        );
    }

    #[test]
    fn test_now_playing_card_shows_loop_mode() {
        let track = Track::new("a", "https://example.com/a", "<@1>");

        let looping = serde_json::to_string(&now_playing_message(&track, LoopMode::One)).unwrap();
        let plain = serde_json::to_string(&now_playing_message(&track, LoopMode::Off)).unwrap();

        assert!(looping.contains('🔂'));
        assert!(!plain.contains('🔂'));
    }
}
