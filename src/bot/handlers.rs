use anyhow::Result;
use serenity::{
    model::{
        channel::Message,
        id::{GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{debug, info};

use crate::{
    audio::{
        queue::{QueueView, Requester, Song},
        registry::VoiceTarget,
        session::{EnqueueOutcome, JoinOutcome},
    },
    bot::{
        commands::{help_text, Command},
        MusicBot,
    },
    error::{MusicError, MusicResult},
};

/// Handles one chat message: parses it and runs the command, if any.
///
/// Successful commands answer in the channel; user errors answer as a reply
/// to the command message.
pub async fn handle_message(ctx: &Context, msg: &Message, bot: &MusicBot) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let Some(command) = Command::parse(&msg.content, &bot.config.command_prefix) else {
        return Ok(());
    };

    info!(
        "📝 Command {}{} used by {} in guild {}",
        bot.config.command_prefix,
        command.name(),
        msg.author.name,
        guild_id
    );

    match run_command(ctx, msg, bot, guild_id, command).await {
        Ok(Some(text)) => {
            msg.channel_id.say(&ctx.http, text).await?;
        }
        Ok(None) => {}
        Err(err) => {
            debug!("Command rejected in guild {}: {:?}", guild_id, err);
            msg.reply(&ctx.http, err.to_string()).await?;
        }
    }

    Ok(())
}

async fn run_command(
    ctx: &Context,
    msg: &Message,
    bot: &MusicBot,
    guild_id: GuildId,
    command: Command,
) -> MusicResult<Option<String>> {
    let registry = &bot.registry;
    let channel = msg.channel_id;

    let reply = match command {
        Command::Join => {
            let target = voice_target(ctx, guild_id, msg.author.id);
            let outcome = registry.join(guild_id, channel, target.as_ref()).await?;
            let name = target.map(|t| t.name).unwrap_or_default();
            Some(format_join(outcome, &name))
        }
        Command::Leave => {
            registry.leave(guild_id).await?;
            Some("Queue cleared.\nLeft the voice channel.".to_string())
        }
        Command::Play(query) => {
            let target = voice_target(ctx, guild_id, msg.author.id);
            let requester = Requester {
                id: msg.author.id,
                name: msg.author.display_name().to_string(),
            };
            let outcome = registry
                .enqueue_and_play(guild_id, channel, target.as_ref(), &query, requester)
                .await?;
            format_enqueue(&outcome)
        }
        Command::Pause => {
            registry.pause(guild_id, channel).await?;
            Some("Playback paused.".to_string())
        }
        Command::Resume => {
            registry.resume(guild_id, channel).await?;
            Some("Playback resumed.".to_string())
        }
        Command::Stop => {
            registry.stop(guild_id, channel).await?;
            Some("Queue cleared.\nStopped playback.".to_string())
        }
        Command::Skip => {
            registry.skip(guild_id, channel).await?;
            Some("Skipped current song.".to_string())
        }
        Command::Queue => {
            let view = registry
                .queue_view(guild_id, bot.config.queue_display_limit)
                .await;
            Some(format_queue(&view, &bot.config.command_prefix))
        }
        Command::NowPlaying => {
            Some(now_playing_reply(registry.now_playing(guild_id).await)?)
        }
        Command::Remove(position) => {
            let removed = registry.remove(guild_id, position).await?;
            Some(format!("Removed **{}** from the queue.", removed.title()))
        }
        Command::ClearQueue => {
            registry.clear_queue(guild_id).await?;
            Some("The entire queue has been cleared.".to_string())
        }
        Command::Help => Some(help_text(&bot.config.command_prefix)),
    };

    Ok(reply)
}

/// The voice channel `user_id` currently sits in, from the gateway cache.
fn voice_target(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<VoiceTarget> {
    let guild = ctx.cache.guild(guild_id)?;
    let channel_id = guild.voice_states.get(&user_id)?.channel_id?;
    let name = guild
        .channels
        .get(&channel_id)
        .map(|channel| channel.name.clone())
        .unwrap_or_else(|| channel_id.to_string());

    Some(VoiceTarget { channel_id, name })
}

fn format_join(outcome: JoinOutcome, channel_name: &str) -> String {
    match outcome {
        JoinOutcome::Joined => format!("Joined **{channel_name}**."),
        JoinOutcome::AlreadyJoined => format!("I'm already in **{channel_name}**."),
    }
}

/// A started song is announced by the session's own notice.
fn format_enqueue(outcome: &EnqueueOutcome) -> Option<String> {
    match outcome {
        EnqueueOutcome::Started => None,
        EnqueueOutcome::Queued { title, position } => Some(format!(
            "Added **{title}** to the queue. Position: `{position}`."
        )),
    }
}

fn format_queue(view: &QueueView, prefix: &str) -> String {
    if view.songs.is_empty() {
        return format!("The queue is currently empty. Use `{prefix}play` to add songs!");
    }

    let mut text = String::from("**Current Queue:**\n```\n");
    for (index, song) in view.songs.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} (Requested by: {})\n",
            index + 1,
            song.title(),
            song.requester().name
        ));
    }
    text.push_str("```");

    if view.remaining() > 0 {
        text.push_str(&format!("\nAnd {} more songs...", view.remaining()));
    }
    text
}

/// An idle player is reported in the channel, like an empty queue.
fn now_playing_reply(current: MusicResult<Option<Song>>) -> MusicResult<String> {
    match current {
        Ok(song) => Ok(format_now_playing(song.as_ref())),
        Err(err @ MusicError::NothingPlaying) => Ok(err.to_string()),
        Err(err) => Err(err),
    }
}

fn format_now_playing(current: Option<&Song>) -> String {
    match current {
        Some(song) => format!(
            "**Now Playing:** `{}` (Requested by: {})",
            song.title(),
            song.requester().name
        ),
        None => "A song is currently playing!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn song(title: &str) -> Song {
        Song::new(
            title.to_string(),
            format!("https://www.youtube.com/watch?v={title}"),
            Requester {
                id: UserId::new(7),
                name: "listener".into(),
            },
        )
    }

    #[test]
    fn test_format_join() {
        assert_eq!(format_join(JoinOutcome::Joined, "Lounge"), "Joined **Lounge**.");
        assert_eq!(
            format_join(JoinOutcome::AlreadyJoined, "Lounge"),
            "I'm already in **Lounge**."
        );
    }

    #[test]
    fn test_format_enqueue() {
        assert_eq!(format_enqueue(&EnqueueOutcome::Started), None);
        assert_eq!(
            format_enqueue(&EnqueueOutcome::Queued {
                title: "Song B".into(),
                position: 2
            }),
            Some("Added **Song B** to the queue. Position: `2`.".to_string())
        );
    }

    #[test]
    fn test_format_empty_queue() {
        let view = QueueView {
            songs: Vec::new(),
            total: 0,
        };
        assert_eq!(
            format_queue(&view, "!"),
            "The queue is currently empty. Use `!play` to add songs!"
        );
    }

    #[test]
    fn test_format_queue_with_overflow() {
        let view = QueueView {
            songs: vec![song("A"), song("B")],
            total: 5,
        };
        assert_eq!(
            format_queue(&view, "!"),
            "**Current Queue:**\n```\n\
             1. A (Requested by: listener)\n\
             2. B (Requested by: listener)\n\
             ```\n\
             And 3 more songs..."
        );
    }

    #[test]
    fn test_format_now_playing() {
        assert_eq!(
            format_now_playing(Some(&song("A"))),
            "**Now Playing:** `A` (Requested by: listener)"
        );
        assert_eq!(format_now_playing(None), "A song is currently playing!");
    }

    #[test]
    fn test_now_playing_reply_when_idle() {
        assert_eq!(
            now_playing_reply(Err(MusicError::NothingPlaying)),
            Ok("Nothing is currently playing.".to_string())
        );
        assert_eq!(
            now_playing_reply(Ok(Some(song("A")))),
            Ok("**Now Playing:** `A` (Requested by: listener)".to_string())
        );
        assert_eq!(
            now_playing_reply(Err(MusicError::NotConnected)),
            Err(MusicError::NotConnected)
        );
    }
}
