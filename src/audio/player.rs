use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;

use crate::{audio::queue::Song, error::MusicResult};

/// Player state as observed from the audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
}

impl PlayerState {
    /// Playing or about to play. A new enqueue only appends in this state.
    pub fn is_busy(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Buffering)
    }

    /// A track is loaded and can be stopped or skipped.
    pub fn has_track(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }
}

/// Identifies one `Player::play` invocation.
///
/// Completion and error events carry the cycle they belong to; a session
/// only reacts to the event of its active cycle, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayCycle(pub u64);

/// Everything that can wake a session outside of a user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TrackEnded {
        guild_id: GuildId,
        cycle: PlayCycle,
    },
    TrackFailed {
        guild_id: GuildId,
        cycle: PlayCycle,
        reason: String,
    },
    IdleTimeout {
        guild_id: GuildId,
        timer_id: u64,
    },
}

impl SessionEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            SessionEvent::TrackEnded { guild_id, .. }
            | SessionEvent::TrackFailed { guild_id, .. }
            | SessionEvent::IdleTimeout { guild_id, .. } => *guild_id,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// A voice connection to one channel.
#[async_trait]
pub trait Connection: Send + Sync {
    fn channel_id(&self) -> ChannelId;

    /// True once the connection was torn down, locally or by the gateway.
    async fn is_destroyed(&self) -> bool;

    async fn destroy(&mut self);
}

/// Streams songs into the connection it is subscribed to.
///
/// Implementations report the end of each play through a
/// [`SessionEvent::TrackEnded`] or [`SessionEvent::TrackFailed`] tagged with
/// the cycle handed to `play`. Stopping a track counts as its end.
#[async_trait]
pub trait Player: Send + Sync {
    async fn state(&self) -> PlayerState;

    /// Replaces whatever is loaded with `song`.
    async fn play(&mut self, song: &Song, cycle: PlayCycle) -> MusicResult<()>;

    async fn pause(&self) -> MusicResult<()>;

    async fn unpause(&self) -> MusicResult<()>;

    async fn stop(&mut self);
}

/// A connection and the player subscribed to it. They only ever exist as a pair.
pub struct VoiceHandles {
    pub connection: Box<dyn Connection>,
    pub player: Box<dyn Player>,
}

/// Opens voice connections.
#[async_trait]
pub trait VoiceManager: Send + Sync {
    /// Joins `channel_id`, creates a player and subscribes it to the connection.
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: EventSender,
    ) -> MusicResult<VoiceHandles>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(PlayerState::Playing.is_busy());
        assert!(PlayerState::Buffering.is_busy());
        assert!(!PlayerState::Paused.is_busy());
        assert!(!PlayerState::Idle.is_busy());

        assert!(PlayerState::Playing.has_track());
        assert!(PlayerState::Paused.has_track());
        assert!(!PlayerState::Buffering.has_track());
        assert!(!PlayerState::Idle.has_track());
    }
}
