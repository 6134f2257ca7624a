use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::YoutubeDl,
    tracks::{PlayMode, ReadyState, TrackHandle},
    Call, Event, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        player::{Connection, EventSender, PlayCycle, Player, PlayerState, VoiceHandles, VoiceManager},
        queue::Song,
    },
    bot::events::{TrackEndNotifier, TrackErrorNotifier},
    error::{MusicError, MusicResult},
};

/// [`VoiceManager`] backed by songbird. Audio is streamed through
/// songbird's yt-dlp input.
pub struct SongbirdVoice {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdVoice {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VoiceManager for SongbirdVoice {
    async fn join(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: EventSender,
    ) -> MusicResult<VoiceHandles> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinFailed {
                reason: e.to_string(),
            })?;

        {
            let mut handler = call.lock().await;
            if let Err(e) = handler.deafen(true).await {
                warn!("Could not self-deafen in guild {}: {:?}", guild_id, e);
            }
        }

        debug!("Songbird call ready for guild {} in channel {}", guild_id, channel_id);

        Ok(VoiceHandles {
            connection: Box::new(SongbirdConnection {
                manager: self.manager.clone(),
                guild_id,
                channel_id,
            }),
            player: Box::new(SongbirdPlayer {
                call,
                guild_id,
                events,
                http: self.http.clone(),
                current: None,
            }),
        })
    }
}

struct SongbirdConnection {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    channel_id: ChannelId,
}

#[async_trait]
impl Connection for SongbirdConnection {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn is_destroyed(&self) -> bool {
        match self.manager.get(self.guild_id) {
            Some(call) => call.lock().await.current_channel().is_none(),
            None => true,
        }
    }

    async fn destroy(&mut self) {
        if self.manager.get(self.guild_id).is_none() {
            return;
        }

        match self.manager.remove(self.guild_id).await {
            Ok(()) => info!("🔌 Voice connection closed in guild {}", self.guild_id),
            Err(e) => error!("Error leaving voice in guild {}: {:?}", self.guild_id, e),
        }
    }
}

struct SongbirdPlayer {
    call: Arc<Mutex<Call>>,
    guild_id: GuildId,
    events: EventSender,
    http: reqwest::Client,
    current: Option<TrackHandle>,
}

impl SongbirdPlayer {
    fn track(&self) -> MusicResult<&TrackHandle> {
        self.current.as_ref().ok_or(MusicError::Playback {
            reason: "no track loaded".to_string(),
        })
    }
}

#[async_trait]
impl Player for SongbirdPlayer {
    async fn state(&self) -> PlayerState {
        let Some(track) = &self.current else {
            return PlayerState::Idle;
        };

        match track.get_info().await {
            Ok(info) => match info.playing {
                PlayMode::Play if matches!(info.ready, ReadyState::Playable) => PlayerState::Playing,
                PlayMode::Play => PlayerState::Buffering,
                PlayMode::Pause => PlayerState::Paused,
                _ => PlayerState::Idle,
            },
            // the driver already dropped the track
            Err(_) => PlayerState::Idle,
        }
    }

    async fn play(&mut self, song: &Song, cycle: PlayCycle) -> MusicResult<()> {
        // songbird mixes tracks, so the old one has to go first
        self.stop().await;

        let input = YoutubeDl::new(self.http.clone(), song.url().to_string());
        let track = {
            let mut handler = self.call.lock().await;
            handler.play_input(input.into())
        };

        let attached = track
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    guild_id: self.guild_id,
                    cycle,
                    events: self.events.clone(),
                },
            )
            .and_then(|()| {
                track.add_event(
                    Event::Track(TrackEvent::Error),
                    TrackErrorNotifier {
                        guild_id: self.guild_id,
                        cycle,
                        events: self.events.clone(),
                    },
                )
            });

        if let Err(e) = attached {
            let _ = track.stop();
            return Err(MusicError::Playback {
                reason: format!("could not watch track: {e}"),
            });
        }

        debug!("Track handle {} created for {}", track.uuid(), song.title());
        self.current = Some(track);
        Ok(())
    }

    async fn pause(&self) -> MusicResult<()> {
        self.track()?.pause().map_err(|e| MusicError::Playback {
            reason: e.to_string(),
        })
    }

    async fn unpause(&self) -> MusicResult<()> {
        self.track()?.play().map_err(|e| MusicError::Playback {
            reason: e.to_string(),
        })
    }

    async fn stop(&mut self) {
        if let Some(track) = self.current.take() {
            // a finished track rejects commands, which is fine here
            let _ = track.stop();
        }
    }
}
