use serde::{Deserialize, Serialize};

use crate::common::{
    errors::CaramellaError,
    types::{ChannelId, GuildId, MemberId, MemberRef},
};

pub const LEADERBOARD_SIZE: usize = 10;

/// A chat message addressed to the bot, as delivered by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInvocation {
    pub guild_id: GuildId,
    /// Text channel the command was sent in; replies go there.
    pub channel_id: ChannelId,
    pub invoker: MemberRef,
    pub content: String,
}

/// Argument of `target`. A bare id is resolved against the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArg {
    Member(MemberId),
    Channel(ChannelId),
    Id(u64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Target(TargetArg),
    Join,
    Speed(f64),
    Leaderboard,
    Stats(Option<MemberId>),
}

impl Command {
    /// Parses `content`. `None` means the message is not addressed to the bot.
    pub fn parse<S: AsRef<str>>(
        content: &str,
        prefixes: &[S],
    ) -> Option<Result<Self, CaramellaError>> {
        let body = prefixes
            .iter()
            .find_map(|p| content.strip_prefix(p.as_ref()))?;
        let mut words = body.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();
        let arg = words.next();

        let parsed = match name.as_str() {
            "target" => match arg {
                Some(raw) => parse_target(raw).map(Command::Target),
                None => Err(CaramellaError::BadCommand(
                    "Usage: `target <member|channel>`".into(),
                )),
            },
            "join" => Ok(Command::Join),
            "speed" => match arg.map(str::parse::<f64>) {
                Some(Ok(tempo)) => Ok(Command::Speed(tempo)),
                _ => Err(CaramellaError::BadCommand("Usage: `speed <0.25-4.0>`".into())),
            },
            "leaderboard" => Ok(Command::Leaderboard),
            "stats" => match arg {
                None => Ok(Command::Stats(None)),
                Some(raw) => parse_member(raw)
                    .map(|m| Command::Stats(Some(m)))
                    .ok_or_else(|| CaramellaError::BadCommand(format!("Unknown member `{}`", raw))),
            },
            _ => return None,
        };
        Some(parsed)
    }
}

fn strip_mention<'a>(raw: &'a str, open: &str) -> Option<&'a str> {
    raw.strip_prefix(open)?.strip_suffix('>')
}

fn parse_member(raw: &str) -> Option<MemberId> {
    let digits = strip_mention(raw, "<@!")
        .or_else(|| strip_mention(raw, "<@"))
        .unwrap_or(raw);
    digits.parse().ok()
}

fn parse_target(raw: &str) -> Result<TargetArg, CaramellaError> {
    let parsed = if let Some(id) = strip_mention(raw, "<#") {
        id.parse().ok().map(TargetArg::Channel)
    } else if raw.starts_with("<@") {
        parse_member(raw).map(TargetArg::Member)
    } else {
        raw.parse().ok().map(TargetArg::Id)
    };
    parsed.ok_or_else(|| CaramellaError::BadCommand(format!("Unknown member or channel `{}`", raw)))
}

/// One named duration in a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLine {
    pub name: String,
    pub value: String,
}

/// What the bot answers in chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reply {
    Message { text: String },
    Leaderboard { entries: Vec<ScoreLine> },
    Stats { entry: ScoreLine },
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Message { text } => write!(f, "{}", text),
            Reply::Leaderboard { entries } => {
                for (i, line) in entries.iter().enumerate() {
                    writeln!(f, "{}. {}: {}", i + 1, line.name, line.value)?;
                }
                Ok(())
            }
            Reply::Stats { entry } => write!(f, "{}: {}", entry.name, entry.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXES: [&str; 2] = ["caramella ", "!"];

    fn parse(content: &str) -> Option<Result<Command, CaramellaError>> {
        Command::parse(content, &PREFIXES)
    }

    #[test]
    fn ignores_unprefixed_and_unknown() {
        assert!(parse("hello there").is_none());
        assert!(parse("!dance").is_none());
        assert!(parse("!").is_none());
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("!join").unwrap().unwrap(), Command::Join);
        assert_eq!(parse("caramella leaderboard").unwrap().unwrap(), Command::Leaderboard);
        assert_eq!(parse("!stats").unwrap().unwrap(), Command::Stats(None));
        assert_eq!(
            parse("!stats <@!140605665772175361>").unwrap().unwrap(),
            Command::Stats(Some(MemberId(140605665772175361)))
        );
    }

    #[test]
    fn speed_argument() {
        assert_eq!(parse("!speed 1.5").unwrap().unwrap(), Command::Speed(1.5));
        assert!(matches!(
            parse("!speed fast").unwrap(),
            Err(CaramellaError::BadCommand(_))
        ));
        assert!(parse("!speed").unwrap().is_err());
    }

    #[test]
    fn target_arguments() {
        assert_eq!(
            parse("!target <@12>").unwrap().unwrap(),
            Command::Target(TargetArg::Member(MemberId(12)))
        );
        assert_eq!(
            parse("!target <#34>").unwrap().unwrap(),
            Command::Target(TargetArg::Channel(ChannelId(34)))
        );
        assert_eq!(
            parse("!target 56").unwrap().unwrap(),
            Command::Target(TargetArg::Id(56))
        );
        assert!(parse("!target <#x>").unwrap().is_err());
        assert!(parse("!target").unwrap().is_err());
    }

    #[test]
    fn reply_rendering() {
        let reply = Reply::Leaderboard {
            entries: vec![
                ScoreLine {
                    name: "a".into(),
                    value: "2 hours".into(),
                },
                ScoreLine {
                    name: "b".into(),
                    value: "1 second".into(),
                },
            ],
        };
        assert_eq!(reply.to_string(), "1. a: 2 hours\n2. b: 1 second\n");

        let json = serde_json::to_value(Reply::message("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "message", "text": "hi"}));
    }
}
