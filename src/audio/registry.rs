use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::{
    audio::{
        notify::Notifier,
        player::{EventReceiver, SessionEvent, VoiceManager},
        queue::{QueueView, Requester, Song},
        session::{EnqueueOutcome, GuildSession, JoinOutcome, SessionServices, SessionSettings},
    },
    error::{MusicError, MusicResult},
    sources::{SearchHit, SongResolver},
};

/// A voice channel the requester sits in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTarget {
    pub channel_id: ChannelId,
    pub name: String,
}

type SharedSession = Arc<Mutex<GuildSession>>;

/// Process-wide owner of every [`GuildSession`].
///
/// Sessions are created by `join`/`play` and dropped on teardown. Each call
/// locks its session for the duration of the operation, so operations on
/// one guild never interleave; `enqueue_and_play` is the exception and
/// releases the lock while the resolver runs.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, SharedSession>,
    services: Arc<SessionServices>,
}

impl SessionRegistry {
    /// Builds the registry and the receiving end of its event channel,
    /// which must be fed to [`SessionRegistry::run`].
    pub fn new(
        voice: Arc<dyn VoiceManager>,
        resolver: Arc<dyn SongResolver>,
        notifier: Arc<dyn Notifier>,
        settings: SessionSettings,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let services = Arc::new(SessionServices {
            voice,
            resolver,
            notifier,
            events,
            settings,
        });

        let registry = Self {
            sessions: DashMap::new(),
            services,
        };
        (registry, receiver)
    }

    /// Processes player and timer events one at a time, forever.
    pub async fn run(self: Arc<Self>, mut events: EventReceiver) {
        info!("🎛️ Session event loop started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("Session event loop stopped");
    }

    pub async fn handle_event(&self, event: SessionEvent) {
        let guild_id = event.guild_id();
        let Some(session) = self.existing(guild_id) else {
            debug!("Dropping {:?}: no session for guild {}", event, guild_id);
            return;
        };

        let mut guard = session.lock().await;
        match event {
            SessionEvent::TrackEnded { cycle, .. } => guard.on_track_event(cycle, None).await,
            SessionEvent::TrackFailed { cycle, reason, .. } => {
                guard.on_track_event(cycle, Some(reason)).await
            }
            SessionEvent::IdleTimeout { timer_id, .. } => {
                if guard.on_idle_timeout(timer_id).await {
                    self.release(guild_id, &session);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn has_session(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub async fn join(
        &self,
        guild_id: GuildId,
        text_channel: ChannelId,
        target: Option<&VoiceTarget>,
    ) -> MusicResult<JoinOutcome> {
        let target = target.ok_or(MusicError::NoChannelToJoin)?;

        let session = self.get_or_create(guild_id, text_channel);
        let mut guard = session.lock().await;
        guard.bind_text_channel(text_channel);

        let joined = guard.join(target.channel_id).await;
        if let Err(err) = &joined {
            error!("❌ Could not join {} in guild {}: {:?}", target.name, guild_id, err);
            if guard.is_closed() {
                self.release(guild_id, &session);
            }
        }
        joined
    }

    /// Resolves `query`, queues the hit and starts playback if idle,
    /// joining the requester's channel first when needed.
    pub async fn enqueue_and_play(
        &self,
        guild_id: GuildId,
        text_channel: ChannelId,
        target: Option<&VoiceTarget>,
        query: &str,
        requester: Requester,
    ) -> MusicResult<EnqueueOutcome> {
        let target = target.ok_or(MusicError::NoChannelToPlay)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::EmptyQuery);
        }

        self.ensure_connected(guild_id, text_channel, target, true)
            .await?;

        info!("🔍 Searching for '{}' in guild {}", query, guild_id);
        self.services
            .notifier
            .notify(text_channel, &format!("Searching for **{query}**..."))
            .await;
        let hit = self.resolve(query).await?;
        let song = Song::new(hit.title, hit.url, requester);

        // the session may have been left or lost while the resolver ran
        self.ensure_connected(guild_id, text_channel, target, false)
            .await?;

        let session = self.get_or_create(guild_id, text_channel);
        let mut guard = session.lock().await;
        guard.enqueue(song).await
    }

    pub async fn pause(&self, guild_id: GuildId, text_channel: ChannelId) -> MusicResult<()> {
        let session = self.existing(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut guard = session.lock().await;
        guard.bind_text_channel(text_channel);
        guard.pause().await
    }

    pub async fn resume(&self, guild_id: GuildId, text_channel: ChannelId) -> MusicResult<()> {
        let session = self.existing(guild_id).ok_or(MusicError::NotPaused)?;
        let mut guard = session.lock().await;
        guard.bind_text_channel(text_channel);
        guard.resume().await
    }

    pub async fn stop(&self, guild_id: GuildId, text_channel: ChannelId) -> MusicResult<()> {
        let session = self.existing(guild_id).ok_or(MusicError::NothingPlaying)?;
        let mut guard = session.lock().await;
        guard.bind_text_channel(text_channel);
        guard.stop().await
    }

    pub async fn skip(&self, guild_id: GuildId, text_channel: ChannelId) -> MusicResult<()> {
        let session = self.existing(guild_id).ok_or(MusicError::NothingToSkip)?;
        let mut guard = session.lock().await;
        guard.bind_text_channel(text_channel);
        guard.skip().await
    }

    pub async fn remove(&self, guild_id: GuildId, position: Option<usize>) -> MusicResult<Song> {
        let session = self.existing(guild_id).ok_or(MusicError::QueueEmpty)?;
        let mut guard = session.lock().await;
        guard.remove(position)
    }

    pub async fn clear_queue(&self, guild_id: GuildId) -> MusicResult<usize> {
        let session = self.existing(guild_id).ok_or(MusicError::QueueAlreadyEmpty)?;
        let mut guard = session.lock().await;
        guard.clear_queue()
    }

    pub async fn queue_view(&self, guild_id: GuildId, limit: usize) -> QueueView {
        match self.existing(guild_id) {
            Some(session) => session.lock().await.queue_view(limit),
            None => QueueView {
                songs: Vec::new(),
                total: 0,
            },
        }
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> MusicResult<Option<Song>> {
        let session = self.existing(guild_id).ok_or(MusicError::NothingPlaying)?;
        let guard = session.lock().await;
        guard.now_playing().await
    }

    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<()> {
        let session = self.existing(guild_id).ok_or(MusicError::NotConnected)?;
        let mut guard = session.lock().await;
        let left = guard.leave().await;
        if guard.is_closed() {
            self.release(guild_id, &session);
        }
        left
    }

    /// Called when the gateway reports the bot left voice in `guild_id`.
    pub async fn handle_voice_disconnect(&self, guild_id: GuildId) {
        let Some(session) = self.existing(guild_id) else {
            return;
        };

        let mut guard = session.lock().await;
        if guard.on_voice_lost().await {
            self.release(guild_id, &session);
        }
    }

    async fn ensure_connected(
        &self,
        guild_id: GuildId,
        text_channel: ChannelId,
        target: &VoiceTarget,
        announce: bool,
    ) -> MusicResult<()> {
        let session = self.get_or_create(guild_id, text_channel);
        let mut guard = session.lock().await;
        guard.bind_text_channel(text_channel);
        if guard.is_connected().await {
            return Ok(());
        }

        match guard.join(target.channel_id).await {
            Ok(_) => {
                if announce {
                    guard
                        .notify(&format!("Joined **{}** to play music.", target.name))
                        .await;
                }
                Ok(())
            }
            Err(err) => {
                error!(
                    "❌ Could not join {} before playing in guild {}: {:?}",
                    target.name, guild_id, err
                );
                if guard.is_closed() {
                    self.release(guild_id, &session);
                }
                Err(err)
            }
        }
    }

    async fn resolve(&self, query: &str) -> MusicResult<SearchHit> {
        self.services
            .resolver
            .search(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::NoResults {
                query: query.to_string(),
            })
    }

    fn existing(&self, guild_id: GuildId) -> Option<SharedSession> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    fn get_or_create(&self, guild_id: GuildId, text_channel: ChannelId) -> SharedSession {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("Creating session for guild {}", guild_id);
                Arc::new(Mutex::new(GuildSession::new(
                    guild_id,
                    text_channel,
                    self.services.clone(),
                )))
            })
            .value()
            .clone()
    }

    /// Forgets `session`, unless it was already replaced by a newer one.
    fn release(&self, guild_id: GuildId, session: &SharedSession) {
        if self
            .sessions
            .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, session))
            .is_some()
        {
            debug!("Released session for guild {}", guild_id);
        }
    }
}
