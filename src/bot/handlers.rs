use anyhow::Result;
use serenity::{
    builder::{
        CreateActionRow, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        CreateMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        channel::Message,
    },
    prelude::Context,
};
use tracing::{debug, info, warn};

use super::{
    actions::Outcome,
    commands,
    text::{self, TextCommand},
    JukeboxBot,
};
use crate::{
    error::PlaybackError,
    ui::{buttons, embeds},
};

/// Embed plus optional player controls for a finished action.
struct Reply {
    embed: CreateEmbed,
    components: Vec<CreateActionRow>,
}

impl Reply {
    fn render(result: &Result<Outcome, PlaybackError>, prefix: &str) -> Self {
        match result {
            Ok(outcome) => Self {
                embed: embeds::outcome_embed(outcome, prefix),
                components: controls_for(outcome),
            },
            Err(error) => {
                if !error.is_user_caused() {
                    warn!("⚠️ Command failed: {}", error);
                }
                Self {
                    embed: embeds::error_embed(error),
                    components: Vec::new(),
                }
            }
        }
    }
}

/// Started tracks get their controls on the announcer's now-playing card.
fn controls_for(outcome: &Outcome) -> Vec<CreateActionRow> {
    match outcome {
        Outcome::NowPlaying(Some(now)) => buttons::player_buttons(now.paused, now.loop_mode),
        _ => Vec::new(),
    }
}

/// Handles slash commands.
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &JukeboxBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Command used outside a server"))?;

    info!(
        "📝 /{} used by {} in guild {}",
        command.data.name, command.user.name, guild_id
    );

    let Some(action) = commands::action_for(&command) else {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("❌ Unknown command")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    bot.announcer.remember_channel(guild_id, command.channel_id);

    // Lookups can outlast the interaction deadline.
    command.defer(&ctx.http).await?;

    let invocation = bot.invocation(ctx, guild_id, command.user.id);
    let result = bot.run(&invocation, action).await;
    let reply = Reply::render(&result, &bot.config.command_prefix);

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new()
                .embed(reply.embed)
                .components(reply.components),
        )
        .await?;

    Ok(())
}

/// Handles player button presses. Replies are ephemeral so the now-playing
/// card stays in place.
pub async fn handle_component(ctx: &Context, component: ComponentInteraction, bot: &JukeboxBot) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Button used outside a server"))?;

    info!(
        "🔘 Button {} pressed by {} in guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    let Some(action) = buttons::action_for(&component.data.custom_id) else {
        debug!("Ignoring unknown component {}", component.data.custom_id);
        return Ok(());
    };

    let invocation = bot.invocation(ctx, guild_id, component.user.id);
    let result = bot.run(&invocation, action).await;
    let reply = Reply::render(&result, &bot.config.command_prefix);

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(reply.embed)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

/// Handles prefix commands. Messages from bots, outside servers or without
/// the prefix are ignored.
pub async fn handle_message(ctx: &Context, message: &Message, bot: &JukeboxBot) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let Some(command) = text::parse(&message.content, &bot.config.command_prefix) else {
        return Ok(());
    };

    info!(
        "💬 {:?} used by {} in guild {}",
        command, message.author.name, guild_id
    );
    bot.announcer.remember_channel(guild_id, message.channel_id);

    let reply = match command {
        TextCommand::Usage(usage) => Reply {
            embed: embeds::usage_embed(usage),
            components: Vec::new(),
        },
        TextCommand::Run(action) => {
            let invocation = bot.invocation(ctx, guild_id, message.author.id);
            let result = bot.run(&invocation, action).await;
            Reply::render(&result, &bot.config.command_prefix)
        }
    };

    message
        .channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .embed(reply.embed)
                .components(reply.components)
                .reference_message(message),
        )
        .await?;

    Ok(())
}
