use async_trait::async_trait;
use serenity::{http::Http, model::id::ChannelId};
use std::sync::Arc;
use tracing::warn;

use crate::audio::notify::Notifier;

/// Posts session notices as plain channel messages.
pub struct ChannelNotifier {
    http: Arc<Http>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, channel_id: ChannelId, content: &str) {
        if let Err(e) = channel_id.say(&self.http, content).await {
            warn!("Could not send notice to channel {}: {:?}", channel_id, e);
        }
    }
}
