//! # Bot Module
//!
//! Discord front end of the jukebox.
//!
//! This module contains:
//! - Slash command registration and dispatch
//! - Prefix text commands and player buttons
//! - Now-playing announcements
//! - Voice occupancy tracking (leave when the channel empties)
//!
//! ## Architecture
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`]. Every surface turns
//! user input into an [`actions::Action`] and runs it through
//! [`actions::execute`] against the shared [`PlaybackManager`].

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Message, Ready, UserId, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info};

pub mod actions;
pub mod announcer;
pub mod commands;
pub mod handlers;
pub mod text;
pub mod voice;

use crate::{audio::player::PlaybackManager, config::Config, error::PlaybackError};
use actions::{Action, Invocation, Outcome};
use announcer::Announcer;
use voice::Occupancy;

pub struct JukeboxBot {
    config: Arc<Config>,
    manager: PlaybackManager,
    /// Also registered as the manager's playback observer.
    announcer: Arc<Announcer>,
}

impl JukeboxBot {
    pub fn new(config: Arc<Config>, manager: PlaybackManager, announcer: Arc<Announcer>) -> Self {
        Self {
            config,
            manager,
            announcer,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Commands are registered per guild when `GUILD_ID` is configured
    /// (immediate propagation) and globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registering commands for guild {}", guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Guild commands registered for {}", guild_id);
            }
            None => {
                info!("🌐 Registering commands globally");
                commands::register_global_commands(ctx).await?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }

    /// Describes a user's request: mention and current voice channel.
    fn invocation(&self, ctx: &Context, guild_id: GuildId, user_id: UserId) -> Invocation {
        let voice_channel = ctx
            .cache
            .guild(guild_id)
            .and_then(|guild| voice::user_channel(&guild, user_id));

        Invocation {
            guild_id,
            requested_by: format!("<@{}>", user_id),
            voice_channel,
        }
    }

    async fn run(&self, invocation: &Invocation, action: Action) -> Result<Outcome, PlaybackError> {
        actions::execute(&self.manager, invocation, action).await
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} servers", ready.guilds.len());

        self.announcer.attach(Arc::clone(&ctx.http));

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error registering commands: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error handling command: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await {
                    error!("Error handling component: {:?}", e);
                }
            }
            _ => {}
        }
    }

    async fn message(&self, ctx: Context, message: Message) {
        if let Err(e) = handlers::handle_message(&ctx, &message, self).await {
            error!("Error handling message: {:?}", e);
        }
    }

    /// Stops the guild when the bot is disconnected from voice or the last
    /// listener leaves its channel.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let bot_id = ctx.cache.current_user().id;

        if new.user_id == bot_id && new.channel_id.is_none() {
            if self.manager.stop(guild_id).await {
                info!("🔌 Disconnected from voice in guild {}, playback stopped", guild_id);
            }
            return;
        }

        if !self.manager.is_tracking(guild_id) {
            return;
        }

        let occupancy = ctx
            .cache
            .guild(guild_id)
            .map(|guild| voice::occupancy(&guild, bot_id));

        match occupancy {
            Some(Occupancy::Vacant(channel_id)) => {
                debug!("Voice channel {} in guild {} has no listeners", channel_id, guild_id);
                self.manager.on_voice_channel_vacant(guild_id).await;
            }
            Some(Occupancy::Listeners(channel_id, count)) => {
                debug!("{} listener(s) in voice channel {} of guild {}", count, channel_id, guild_id);
            }
            Some(Occupancy::NotConnected) | None => {}
        }
    }
}
