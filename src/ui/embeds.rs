use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::{
        player::{Enqueued, Skipped},
        queue::{LoopMode, QueueInfo, Track},
    },
    bot::actions::Outcome,
    error::PlaybackError,
};

/// Standard embed palette.
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const STANDARD_FOOTER: &str = "🎵 Jukebox";

const ITEMS_PER_PAGE: usize = 10;

/// Renders the result of any command.
pub fn outcome_embed(outcome: &Outcome, prefix: &str) -> CreateEmbed {
    match outcome {
        Outcome::Pong => simple_embed("🏓 Pong!", "The bot is online.", colors::SUCCESS_GREEN),
        Outcome::Help => help_embed(prefix),
        Outcome::Enqueued(Enqueued::Started(track)) => now_playing_embed(track),
        Outcome::Enqueued(Enqueued::Queued { track, position }) => track_added_embed(track, *position),
        Outcome::Skipped(skipped) => skipped_embed(skipped),
        Outcome::Stopped { was_active: true } => simple_embed(
            "⏹️ Stopped",
            "Cleared the queue and left the voice channel.",
            colors::NEUTRAL_GRAY,
        ),
        Outcome::Stopped { was_active: false } => {
            simple_embed("⏹️ Stopped", "Nothing was playing.", colors::NEUTRAL_GRAY)
        }
        Outcome::Queue { info, page } => queue_embed(info, *page),
        Outcome::NowPlaying(Some(now)) => now_playing_embed(&now.track),
        Outcome::NowPlaying(None) => simple_embed("🔇 Now Playing", "Nothing is playing.", colors::NEUTRAL_GRAY),
        Outcome::LoopMode(mode) => simple_embed(
            &format!("{} Loop", loop_icon(*mode)),
            &format!("Loop mode set to **{}**.", mode),
            colors::INFO_BLUE,
        ),
        Outcome::Volume { level, changed: true } => {
            simple_embed("🔊 Volume", &format!("Volume set to **{}%**.", level), colors::INFO_BLUE)
        }
        Outcome::Volume { level, changed: false } => {
            simple_embed("🔊 Volume", &format!("Volume is **{}%**.", level), colors::INFO_BLUE)
        }
        Outcome::Paused { paused: true } => simple_embed("⏸️ Paused", "Playback paused.", colors::WARNING_ORANGE),
        Outcome::Paused { paused: false } => simple_embed("▶️ Resumed", "Playback resumed.", colors::SUCCESS_GREEN),
    }
}

pub fn error_embed(error: &PlaybackError) -> CreateEmbed {
    let (title, color) = if error.is_user_caused() {
        ("⚠️ Can't do that", colors::WARNING_ORANGE)
    } else {
        ("❌ Something went wrong", colors::ERROR_RED)
    };

    simple_embed(title, &error.to_string(), color)
}

pub fn usage_embed(usage: &str) -> CreateEmbed {
    simple_embed("ℹ️ Usage", usage, colors::NEUTRAL_GRAY)
}

pub fn now_playing_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Now Playing")
        .description(format!("**{}**", track.title))
        .color(colors::MUSIC_PURPLE)
        .field("🎤 Artist", track.artist.as_deref().unwrap_or("Unknown"), true);

    embed = match track.duration {
        Some(duration) => embed.field("⏱️ Duration", format_duration(duration), true),
        None => embed.field("⏱️ Duration", "🔴 Live", true),
    };

    embed = embed
        .field("👤 Requested by", &track.requested_by, true)
        .field("🕒 Queued", format!("<t:{}:R>", track.queued_at.timestamp()), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    if track.source_ref.starts_with("http") {
        embed = embed.url(&track.source_ref);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn track_added_embed(track: &Track, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Added to Queue")
        .description(format!("**{}**", track.title))
        .color(colors::SUCCESS_GREEN)
        .field("📍 Position", format!("#{}", position), true)
        .field("👤 Requested by", &track.requested_by, true);

    if let Some(duration) = track.duration {
        embed = embed.field("⏱️ Duration", format_duration(duration), true);
    }
    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn skipped_embed(skipped: &Skipped) -> CreateEmbed {
    let mut description = match &skipped.skipped {
        Some(track) => format!("Skipped **{}**.", track.title),
        None => "Nothing was playing.".to_string(),
    };

    match &skipped.next {
        Some(next) => description.push_str(&format!("\nUp next: **{}**", next.title)),
        None => description.push_str("\nThe queue is empty."),
    }

    simple_embed("⏭️ Skipped", &description, colors::INFO_BLUE)
}

pub fn queue_embed(queue_info: &QueueInfo, page: usize) -> CreateEmbed {
    let queue_page = queue_info.get_page(page, ITEMS_PER_PAGE);

    let mut embed = CreateEmbed::default()
        .title("📋 Queue")
        .color(colors::INFO_BLUE);

    if queue_info.current.is_none() && queue_info.total_items == 0 {
        return embed
            .description("😴 **The queue is empty**\n\n💡 Use `play <song>` to add music")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    if let Some(current) = &queue_info.current {
        let status = if queue_info.paused {
            "⏸️"
        } else {
            loop_icon(queue_info.loop_mode)
        };
        embed = embed.field(format!("{} Playing", status), track_line(current), false);
    }

    if queue_page.items.is_empty() {
        embed = embed.field("Up Next", "Nothing queued.", false);
    } else {
        let description: String = queue_page
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("**{}**. {}\n", queue_page.first_position + i, track_line(item)))
            .collect();
        embed = embed.field("Up Next", description, false);
    }

    let mut info = format!("**Total:** {} tracks", queue_info.total_items);
    if queue_info.total_duration > Duration::ZERO {
        info.push_str(&format!(" • **Duration:** {}", format_duration(queue_info.total_duration)));
    }
    info.push_str(&format!(
        " • **Loop:** {} • **Volume:** {}%",
        queue_info.loop_mode, queue_info.volume
    ));
    embed = embed.field("Info", info, false);

    let footer = if queue_page.total_pages > 1 {
        format!(
            "Page {} of {} • Jukebox",
            queue_page.current_page, queue_page.total_pages
        )
    } else {
        STANDARD_FOOTER.to_string()
    };

    embed
        .footer(CreateEmbedFooter::new(footer))
        .timestamp(Timestamp::now())
}

pub fn help_embed(prefix: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Jukebox - Commands")
        .color(colors::INFO_BLUE)
        .description(format!(
            "Use slash commands or the `{}` prefix.",
            prefix
        ))
        .field(
            "🎵 Playback",
            format!(
                "• `{p}play <song or URL>` - Play or queue a track\n\
                • `{p}pause` / `{p}resume` - Pause or resume\n\
                • `{p}skip` - Skip the current track\n\
                • `{p}stop` - Clear the queue and leave",
                p = prefix
            ),
            false,
        )
        .field(
            "📜 Queue",
            format!(
                "• `{p}queue [page]` - Show the queue\n\
                • `{p}now` - Show the current track\n\
                • `{p}loop <none|one|all>` - Set the loop mode",
                p = prefix
            ),
            false,
        )
        .field(
            "🎛️ Audio",
            format!("• `{p}volume [0-200]` - Show or set the volume", p = prefix),
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

fn simple_embed(title: &str, description: &str, color: serenity::all::Colour) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(color)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn track_line(track: &Track) -> String {
    let mut line = format!("**{}**", track.title);
    if let Some(artist) = &track.artist {
        line.push_str(&format!(" - {}", artist));
    }
    if let Some(duration) = track.duration {
        line.push_str(&format!(" `[{}]`", format_duration(duration)));
    }
    line
}

fn loop_icon(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::One => "🔂",
        LoopMode::All => "🔁",
        LoopMode::Off => "▶️",
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
