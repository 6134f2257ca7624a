use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        notify::Notifier,
        player::{EventSender, PlayCycle, PlayerState, VoiceHandles, VoiceManager},
        queue::{MusicQueue, QueueView, Song},
        timer::IdleTimer,
    },
    error::{MusicError, MusicResult},
    sources::SongResolver,
};

/// Tunables shared by every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub max_queue_size: usize,
}

/// Collaborators shared by every session.
pub struct SessionServices {
    pub voice: Arc<dyn VoiceManager>,
    pub resolver: Arc<dyn SongResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub events: EventSender,
    pub settings: SessionSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The song went straight to the player.
    Started,
    /// Something is already playing; the song waits at `position` (1-based).
    Queued { title: String, position: usize },
}

/// Playback state of one guild.
///
/// Holds at most one [`VoiceHandles`] pair, the pending queue, the song on
/// the player, and the idle-disconnect timer. Player completions arrive
/// through [`GuildSession::on_track_event`]; only the event of the active
/// [`PlayCycle`] is honoured, once.
pub struct GuildSession {
    guild_id: GuildId,
    text_channel: ChannelId,
    voice: Option<VoiceHandles>,
    queue: MusicQueue,
    now_playing: Option<Song>,
    active_cycle: Option<PlayCycle>,
    cycles: u64,
    idle_timer: IdleTimer,
    services: Arc<SessionServices>,
}

impl GuildSession {
    pub fn new(guild_id: GuildId, text_channel: ChannelId, services: Arc<SessionServices>) -> Self {
        Self {
            guild_id,
            text_channel,
            voice: None,
            queue: MusicQueue::new(services.settings.max_queue_size),
            now_playing: None,
            active_cycle: None,
            cycles: 0,
            idle_timer: IdleTimer::new(),
            services,
        }
    }

    /// Asynchronous notices follow the channel of the latest command.
    pub fn bind_text_channel(&mut self, channel_id: ChannelId) {
        self.text_channel = channel_id;
    }

    pub async fn is_connected(&self) -> bool {
        match &self.voice {
            Some(voice) => !voice.connection.is_destroyed().await,
            None => false,
        }
    }

    /// No voice handles left; the registry may forget this session.
    pub fn is_closed(&self) -> bool {
        self.voice.is_none()
    }

    pub async fn player_state(&self) -> PlayerState {
        match &self.voice {
            Some(voice) => voice.player.state().await,
            None => PlayerState::Idle,
        }
    }

    /// Connects to `channel_id`, moving away from any other channel first.
    /// The queue survives a move; playback does not start.
    pub async fn join(&mut self, channel_id: ChannelId) -> MusicResult<JoinOutcome> {
        if let Some(voice) = &self.voice {
            let destroyed = voice.connection.is_destroyed().await;
            if !destroyed && voice.connection.channel_id() == channel_id {
                return Ok(JoinOutcome::AlreadyJoined);
            }

            info!(
                "🔀 Leaving channel {} in guild {} before joining {}",
                voice.connection.channel_id(),
                self.guild_id,
                channel_id
            );
            self.drop_voice().await;
        }

        let handles = self
            .services
            .voice
            .join(self.guild_id, channel_id, self.services.events.clone())
            .await?;
        self.voice = Some(handles);

        info!("🔊 Joined voice channel {} in guild {}", channel_id, self.guild_id);
        Ok(JoinOutcome::Joined)
    }

    /// Appends `song` and starts playback unless the player is busy.
    pub async fn enqueue(&mut self, song: Song) -> MusicResult<EnqueueOutcome> {
        let state = self.player_state().await;
        let title = song.title().to_string();
        let position = self.queue.add_track(song)?;

        if state.is_busy() {
            info!("📝 Added to queue in guild {}: {} (#{})", self.guild_id, title, position);
            return Ok(EnqueueOutcome::Queued { title, position });
        }

        self.advance().await;
        Ok(EnqueueOutcome::Started)
    }

    /// Starts the next queued song, or schedules the idle disconnect when
    /// the queue is exhausted. Songs that fail to start are reported and
    /// skipped.
    pub async fn advance(&mut self) {
        if self.idle_timer.cancel() {
            info!("⏲️ Auto-disconnect timer cancelled in guild {}", self.guild_id);
        }
        self.end_cycle();

        loop {
            if self.voice.is_none() {
                warn!("Cannot advance the queue in guild {}: not connected", self.guild_id);
                return;
            }

            let Some(song) = self.queue.next_track() else {
                info!("📭 Queue finished in guild {}, scheduling auto-disconnect", self.guild_id);
                self.notify("Queue finished. I will disconnect if idle.").await;
                self.schedule_idle_disconnect();
                return;
            };

            self.notify(&format!(
                "Now playing: **{}** (Requested by: {})",
                song.title(),
                song.requester().name
            ))
            .await;

            let cycle = self.next_cycle();
            let started = match self.voice.as_mut() {
                Some(voice) => voice.player.play(&song, cycle).await,
                None => return,
            };

            match started {
                Ok(()) => {
                    info!(
                        "🎵 Playing in guild {}: {} (requested by user {})",
                        self.guild_id,
                        song.title(),
                        song.requester().id
                    );
                    self.active_cycle = Some(cycle);
                    self.now_playing = Some(song);
                    return;
                }
                Err(err) => {
                    error!(
                        "❌ Could not start {} in guild {}: {:?}",
                        song.title(),
                        self.guild_id,
                        err
                    );
                    self.notify(&format!("Error playing **{}**: {}", song.title(), err))
                        .await;
                }
            }
        }
    }

    /// Reacts to the end of a play cycle, successful or not.
    pub async fn on_track_event(&mut self, cycle: PlayCycle, failure: Option<String>) {
        if self.active_cycle != Some(cycle) {
            debug!("Ignoring stale player event for {:?} in guild {}", cycle, self.guild_id);
            return;
        }

        let finished = self.now_playing.take();
        self.active_cycle = None;

        match failure {
            Some(reason) => {
                let title = finished.as_ref().map(Song::title).unwrap_or("the current song");
                error!("❌ Playback error in guild {} for {}: {}", self.guild_id, title, reason);
                self.notify(&format!(
                    "An error occurred during playback of **{title}**: {reason}"
                ))
                .await;
            }
            None => debug!("Song finished in guild {}, playing next", self.guild_id),
        }

        self.advance().await;
    }

    pub async fn pause(&mut self) -> MusicResult<()> {
        let voice = self.voice.as_ref().ok_or(MusicError::NotPlaying)?;
        if voice.player.state().await != PlayerState::Playing {
            return Err(MusicError::NotPlaying);
        }

        voice.player.pause().await?;
        info!("⏸️ Playback paused in guild {}", self.guild_id);
        Ok(())
    }

    pub async fn resume(&mut self) -> MusicResult<()> {
        let voice = self.voice.as_ref().ok_or(MusicError::NotPaused)?;
        if voice.player.state().await != PlayerState::Paused {
            return Err(MusicError::NotPaused);
        }

        voice.player.unpause().await?;
        info!("▶️ Playback resumed in guild {}", self.guild_id);
        Ok(())
    }

    /// Stops playback, drops the queue and arms the idle disconnect right
    /// away. The stopped track's end event belongs to a finished cycle and
    /// is ignored.
    pub async fn stop(&mut self) -> MusicResult<()> {
        if !self.player_state().await.has_track() {
            return Err(MusicError::NothingPlaying);
        }

        self.end_cycle();
        if let Some(voice) = self.voice.as_mut() {
            voice.player.stop().await;
        }
        self.queue.clear();
        self.schedule_idle_disconnect();

        info!("⏹️ Playback stopped in guild {}", self.guild_id);
        Ok(())
    }

    /// Stops the current track only. Its end event advances the queue.
    pub async fn skip(&mut self) -> MusicResult<()> {
        if !self.player_state().await.has_track() {
            return Err(MusicError::NothingToSkip);
        }

        if let Some(voice) = self.voice.as_mut() {
            voice.player.stop().await;
        }

        info!(
            "⏭️ Skipped current song in guild {} ({} left in queue)",
            self.guild_id,
            self.queue.len()
        );
        Ok(())
    }

    pub fn remove(&mut self, position: Option<usize>) -> MusicResult<Song> {
        self.queue.remove_track(position)
    }

    pub fn clear_queue(&mut self) -> MusicResult<usize> {
        if self.queue.is_empty() {
            return Err(MusicError::QueueAlreadyEmpty);
        }
        Ok(self.queue.clear())
    }

    pub fn queue_view(&self, limit: usize) -> QueueView {
        self.queue.view(limit)
    }

    /// The song on the player, if the player has one.
    pub async fn now_playing(&self) -> MusicResult<Option<Song>> {
        if self.player_state().await == PlayerState::Idle {
            return Err(MusicError::NothingPlaying);
        }
        Ok(self.now_playing.clone())
    }

    /// Full teardown back to not connected.
    pub async fn leave(&mut self) -> MusicResult<()> {
        if self.voice.is_none() {
            return Err(MusicError::NotConnected);
        }

        let connected = self.is_connected().await;
        self.teardown().await;
        if !connected {
            return Err(MusicError::NotConnected);
        }

        info!("👋 Left voice channel in guild {}", self.guild_id);
        Ok(())
    }

    /// Handles a firing of the idle timer. Returns true when the session was
    /// torn down.
    pub async fn on_idle_timeout(&mut self, timer_id: u64) -> bool {
        if !self.idle_timer.take_if_current(timer_id) {
            debug!("Ignoring stale idle timer {} in guild {}", timer_id, self.guild_id);
            return false;
        }

        if !self.is_connected().await {
            info!(
                "Auto-disconnect fired in guild {}, but the bot is not in a voice channel",
                self.guild_id
            );
            self.teardown().await;
            return true;
        }

        if self.player_state().await != PlayerState::Idle || !self.queue.is_empty() {
            info!("Auto-disconnect aborted in guild {}: activity detected", self.guild_id);
            return false;
        }

        let delay = humantime::format_duration(self.services.settings.idle_timeout);
        self.notify(&format!("No activity for {delay}. Leaving voice channel."))
            .await;
        self.teardown().await;

        info!("🔌 Auto-disconnected guild {} due to inactivity", self.guild_id);
        true
    }

    /// Tears down after the gateway dropped the bot from voice. Returns true
    /// when there was something to tear down.
    pub async fn on_voice_lost(&mut self) -> bool {
        if self.voice.is_none() || self.is_connected().await {
            return false;
        }

        info!("🔌 Voice connection lost in guild {}", self.guild_id);
        self.teardown().await;
        true
    }

    pub async fn notify(&self, content: &str) {
        self.services.notifier.notify(self.text_channel, content).await;
    }

    async fn teardown(&mut self) {
        self.idle_timer.cancel();
        self.queue.clear();
        self.drop_voice().await;
    }

    async fn drop_voice(&mut self) {
        self.end_cycle();
        if let Some(mut voice) = self.voice.take() {
            voice.player.stop().await;
            voice.connection.destroy().await;
        }
    }

    fn schedule_idle_disconnect(&mut self) {
        self.idle_timer.arm(
            self.guild_id,
            self.services.settings.idle_timeout,
            &self.services.events,
        );
    }

    fn end_cycle(&mut self) {
        self.active_cycle = None;
        self.now_playing = None;
    }

    fn next_cycle(&mut self) -> PlayCycle {
        self.cycles += 1;
        PlayCycle(self.cycles)
    }
}
