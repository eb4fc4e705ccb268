//! Prefix text commands (`!play`, `!skip`, ...).

use super::actions::Action;

/// A recognised prefix command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    Run(Action),
    /// The command was recognised but its arguments were not; reply with this usage line.
    Usage(&'static str),
}

/// Parses a message body. Returns `None` for messages that do not start with
/// `prefix` or name an unknown command.
pub fn parse(content: &str, prefix: &str) -> Option<TextCommand> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let mut parts = body.trim().splitn(2, char::is_whitespace);
    let name = parts.next()?.to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or_default();

    let command = match name.as_str() {
        "ping" => TextCommand::Run(Action::Ping),
        "help" => TextCommand::Run(Action::Help),
        "play" | "p" => {
            if args.is_empty() {
                TextCommand::Usage("Usage: `play <song name or URL>`")
            } else {
                TextCommand::Run(Action::Play {
                    query: args.to_string(),
                })
            }
        }
        "skip" | "s" => TextCommand::Run(Action::Skip),
        "stop" => TextCommand::Run(Action::Stop),
        "queue" | "q" => TextCommand::Run(Action::Queue {
            page: args.parse().unwrap_or(1),
        }),
        "now" | "np" | "nowplaying" => TextCommand::Run(Action::NowPlaying),
        "loop" => match args {
            "" => TextCommand::Usage("Usage: `loop <none|one|all>`"),
            mode => TextCommand::Run(Action::Loop {
                mode: mode.to_string(),
            }),
        },
        "volume" | "vol" => match args {
            "" => TextCommand::Run(Action::Volume { level: None }),
            level => match level.parse() {
                Ok(level) => TextCommand::Run(Action::Volume { level: Some(level) }),
                Err(_) => TextCommand::Usage("Usage: `volume [0-200]`"),
            },
        },
        "pause" => TextCommand::Run(Action::Pause),
        "resume" => TextCommand::Run(Action::Resume),
        _ => return None,
    };

    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(action: Action) -> Option<TextCommand> {
        Some(TextCommand::Run(action))
    }

    #[test]
    fn test_ignores_unprefixed_and_unknown() {
        assert_eq!(parse("play something", "!"), None);
        assert_eq!(parse("!dance", "!"), None);
        assert_eq!(parse("!", "!"), None);
    }

    #[test]
    fn test_play_keeps_full_query() {
        assert_eq!(
            parse("!play  never gonna give you up ", "!"),
            run(Action::Play {
                query: "never gonna give you up".into()
            })
        );
        assert_eq!(
            parse("!play", "!"),
            Some(TextCommand::Usage("Usage: `play <song name or URL>`"))
        );
    }

    #[test]
    fn test_command_names_are_case_insensitive() {
        assert_eq!(parse("!SKIP", "!"), run(Action::Skip));
        assert_eq!(parse("?np", "?"), run(Action::NowPlaying));
    }

    #[test]
    fn test_queue_page() {
        assert_eq!(parse("!queue", "!"), run(Action::Queue { page: 1 }));
        assert_eq!(parse("!queue 3", "!"), run(Action::Queue { page: 3 }));
        assert_eq!(parse("!queue last", "!"), run(Action::Queue { page: 1 }));
    }

    #[test]
    fn test_loop_and_volume_arguments() {
        assert_eq!(parse("!loop all", "!"), run(Action::Loop { mode: "all".into() }));
        assert_eq!(
            parse("!loop", "!"),
            Some(TextCommand::Usage("Usage: `loop <none|one|all>`"))
        );
        assert_eq!(parse("!volume", "!"), run(Action::Volume { level: None }));
        assert_eq!(parse("!volume 150", "!"), run(Action::Volume { level: Some(150) }));
        assert_eq!(parse("!volume -5", "!"), run(Action::Volume { level: Some(-5) }));
        assert_eq!(
            parse("!volume loud", "!"),
            Some(TextCommand::Usage("Usage: `volume [0-200]`"))
        );
    }
}
