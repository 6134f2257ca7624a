/// A recognised prefix command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Play(String),
    Pause,
    Resume,
    Stop,
    Skip,
    Queue,
    NowPlaying,
    /// The raw argument; parsing errors are reported against the queue.
    Remove(Option<usize>),
    ClearQueue,
    Help,
}

impl Command {
    /// Parses `content` into a command. Returns `None` for messages without
    /// the prefix and for unknown command tokens.
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let body = content.trim_start().strip_prefix(prefix)?;
        let mut parts = body.splitn(2, char::is_whitespace);
        let token = parts.next()?.to_lowercase();
        let rest = parts.next().unwrap_or("").trim();

        let command = match token.as_str() {
            "join" => Self::Join,
            "leave" => Self::Leave,
            "play" => Self::Play(rest.to_string()),
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "stop" => Self::Stop,
            "skip" => Self::Skip,
            "queue" | "q" => Self::Queue,
            "nowplaying" | "np" | "current" => Self::NowPlaying,
            "remove" => Self::Remove(
                rest.split_whitespace()
                    .next()
                    .and_then(|arg| arg.parse().ok()),
            ),
            "clearqueue" | "cq" => Self::ClearQueue,
            "help" => Self::Help,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Play(_) => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Skip => "skip",
            Self::Queue => "queue",
            Self::NowPlaying => "nowplaying",
            Self::Remove(_) => "remove",
            Self::ClearQueue => "clearqueue",
            Self::Help => "help",
        }
    }
}

pub fn help_text(prefix: &str) -> String {
    [
        ("join", "Join your voice channel"),
        ("leave", "Leave the voice channel and clear the queue"),
        ("play <query or URL>", "Search YouTube and queue the first result"),
        ("pause", "Pause the current song"),
        ("resume", "Resume a paused song"),
        ("stop", "Stop playback and clear the queue"),
        ("skip", "Skip to the next song"),
        ("queue", "Show the queue (alias: q)"),
        ("nowplaying", "Show the current song (aliases: np, current)"),
        ("remove <position>", "Remove a song from the queue"),
        ("clearqueue", "Clear the queue (alias: cq)"),
        ("help", "Show this message"),
    ]
    .iter()
    .fold("**Music Commands:**\n".to_string(), |mut text, (usage, about)| {
        text.push_str(&format!("`{prefix}{usage}` - {about}\n"));
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(Command::parse("!join", "!"), Some(Command::Join));
        assert_eq!(Command::parse("!leave", "!"), Some(Command::Leave));
        assert_eq!(Command::parse("!skip", "!"), Some(Command::Skip));
        assert_eq!(Command::parse("!help", "!"), Some(Command::Help));
    }

    #[test]
    fn test_parse_is_case_insensitive_and_knows_aliases() {
        assert_eq!(Command::parse("!PAUSE", "!"), Some(Command::Pause));
        assert_eq!(Command::parse("!q", "!"), Some(Command::Queue));
        assert_eq!(Command::parse("!Np", "!"), Some(Command::NowPlaying));
        assert_eq!(Command::parse("!current", "!"), Some(Command::NowPlaying));
        assert_eq!(Command::parse("!cq", "!"), Some(Command::ClearQueue));
    }

    #[test]
    fn test_parse_play_keeps_the_query() {
        assert_eq!(
            Command::parse("!play  Never Gonna Give You Up ", "!"),
            Some(Command::Play("Never Gonna Give You Up".into()))
        );
        assert_eq!(Command::parse("!play", "!"), Some(Command::Play(String::new())));
    }

    #[test]
    fn test_parse_remove_argument() {
        assert_eq!(Command::parse("!remove 3", "!"), Some(Command::Remove(Some(3))));
        assert_eq!(Command::parse("!remove two", "!"), Some(Command::Remove(None)));
        assert_eq!(Command::parse("!remove", "!"), Some(Command::Remove(None)));
        assert_eq!(Command::parse("!remove -1", "!"), Some(Command::Remove(None)));
    }

    #[test]
    fn test_parse_ignores_other_messages() {
        assert_eq!(Command::parse("hello there", "!"), None);
        assert_eq!(Command::parse("!dance", "!"), None);
        assert_eq!(Command::parse("!", "!"), None);
        assert_eq!(Command::parse("?play song", "!"), None);
    }

    #[test]
    fn test_parse_custom_prefix() {
        assert_eq!(Command::parse("m!stop", "m!"), Some(Command::Stop));
        assert_eq!(Command::parse("!stop", "m!"), None);
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text("!");
        for name in ["join", "leave", "play", "pause", "resume", "stop", "skip", "queue", "nowplaying", "remove", "clearqueue"] {
            assert!(help.contains(&format!("`!{name}")), "missing {name}");
        }
    }
}
