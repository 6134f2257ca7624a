//! # Bot Module
//!
//! Discord gateway glue for the music bot.
//!
//! - [`commands`]: prefix command parsing
//! - [`handlers`]: runs commands against the [`SessionRegistry`] and replies
//! - [`events`]: songbird track listeners feeding the session event loop
//! - [`notifier`]: posts asynchronous session notices
//!
//! The bot is built around [`MusicBot`], which implements Serenity's
//! [`EventHandler`] trait.

use serenity::{
    all::{Context, EventHandler, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod events;
pub mod handlers;
pub mod notifier;

use crate::{audio::registry::SessionRegistry, config::Config};

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: prefix and display limits for command handling
/// - `registry`: every guild's playback session
pub struct MusicBot {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
}

impl MusicBot {
    pub fn new(config: Arc<Config>, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = handlers::handle_message(&ctx, &msg, self).await {
            error!("Error handling message {}: {:?}", msg.id, e);
        }
    }

    /// Tears the session down when the bot is dropped from voice by
    /// someone else (kicked, channel deleted, moved out).
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id.or_else(|| old.and_then(|o| o.guild_id)) {
            info!("🔌 Bot disconnected from voice in guild {}", guild_id);
            self.registry.handle_voice_disconnect(guild_id).await;
        }
    }
}
