use anyhow::Result;
use serenity::{
    all::{CommandDataOptionValue, CommandInteraction, Command},
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

use super::actions::Action;

fn all_commands() -> Vec<CreateCommand> {
    vec![
        ping_command(),
        help_command(),
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        nowplaying_command(),
        loop_command(),
        volume_command(),
    ]
}

/// Registers commands globally; propagation can take up to an hour.
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

/// Registers commands for one guild; they propagate immediately.
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

/// Translates a slash command into an action. `None` for unknown commands.
pub fn action_for(command: &CommandInteraction) -> Option<Action> {
    let string_option = |name: &str| {
        command.data.options.iter().find_map(|option| match &option.value {
            CommandDataOptionValue::String(value) if option.name == name => Some(value.clone()),
            _ => None,
        })
    };
    let integer_option = |name: &str| {
        command.data.options.iter().find_map(|option| match option.value {
            CommandDataOptionValue::Integer(value) if option.name == name => Some(value),
            _ => None,
        })
    };

    let action = match command.data.name.as_str() {
        "ping" => Action::Ping,
        "help" => Action::Help,
        "play" => Action::Play {
            query: string_option("query").unwrap_or_default(),
        },
        "pause" => Action::Pause,
        "resume" => Action::Resume,
        "skip" => Action::Skip,
        "stop" => Action::Stop,
        "queue" => Action::Queue {
            page: integer_option("page")
                .and_then(|page| usize::try_from(page).ok())
                .unwrap_or(1),
        },
        "nowplaying" => Action::NowPlaying,
        "loop" => Action::Loop {
            mode: string_option("mode").unwrap_or_default(),
        },
        "volume" => Action::Volume {
            level: integer_option("level"),
        },
        _ => return None,
    };

    Some(action)
}

fn ping_command() -> CreateCommand {
    CreateCommand::new("ping").description("Checks that the bot is online")
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Lists the available commands")
}

// Playback

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Plays a song or adds it to the queue")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL or search terms",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pauses playback")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resumes playback")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skips the current track")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Clears the queue and leaves the voice channel")
}

// Queue

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Shows the queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Page number")
                .min_int_value(1),
        )
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Shows the current track")
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop")
        .description("Sets the loop mode")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "mode", "Loop mode")
                .add_string_choice("Off", "none")
                .add_string_choice("Track", "one")
                .add_string_choice("Queue", "all")
                .required(true),
        )
}

// Audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Shows or sets the volume")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "level",
                "Volume level (0-200)",
            )
            .min_int_value(0)
            .max_int_value(200),
        )
}
