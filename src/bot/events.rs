use serenity::{async_trait, model::id::GuildId};
use songbird::{Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler};
use tracing::{debug, error};

use crate::audio::player::{EventSender, PlayCycle, SessionEvent};

/// Forwards the end of a track to the session event loop.
pub struct TrackEndNotifier {
    pub guild_id: GuildId,
    pub cycle: PlayCycle,
    pub events: EventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!("🎵 Track ended in guild {} ({:?})", self.guild_id, self.cycle);

        if self
            .events
            .send(SessionEvent::TrackEnded {
                guild_id: self.guild_id,
                cycle: self.cycle,
            })
            .is_err()
        {
            error!("Session event loop is gone, dropping track end for guild {}", self.guild_id);
        }

        Some(VoiceEvent::Cancel)
    }
}

/// Forwards a playback failure to the session event loop.
pub struct TrackErrorNotifier {
    pub guild_id: GuildId,
    pub cycle: PlayCycle,
    pub events: EventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let reason = match ctx {
            EventContext::Track(tracks) => tracks
                .first()
                .map(|(state, _handle)| format!("{:?}", state.playing))
                .unwrap_or_else(|| "unknown error".to_string()),
            _ => "unknown error".to_string(),
        };
        error!("❌ Track error in guild {}: {}", self.guild_id, reason);

        if self
            .events
            .send(SessionEvent::TrackFailed {
                guild_id: self.guild_id,
                cycle: self.cycle,
                reason,
            })
            .is_err()
        {
            error!("Session event loop is gone, dropping track error for guild {}", self.guild_id);
        }

        Some(VoiceEvent::Cancel)
    }
}
