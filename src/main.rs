use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::driver::SongbirdBackend;
use crate::audio::player::{PlaybackManager, PlaybackSettings};
use crate::bot::{announcer::Announcer, JukeboxBot};
use crate::config::Config;
use crate::sources::YouTubeResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Runs without a token so container probes work.
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    let songbird = Songbird::serenity();
    let http = reqwest::Client::new();

    let announcer = Arc::new(Announcer::new());
    let manager = PlaybackManager::new(
        PlaybackSettings::from(config.as_ref()),
        Arc::new(YouTubeResolver::new()),
        Arc::new(SongbirdBackend::new(Arc::clone(&songbird), http)),
        announcer.clone(),
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = JukeboxBot::new(Arc::clone(&config), manager, announcer);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, closing...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    let yt_dlp = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Missing dependencies: yt-dlp and ffmpeg are required");
    }
}
