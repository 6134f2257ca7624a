use async_trait::async_trait;
use serenity::model::id::ChannelId;

/// Delivers asynchronous session notices (now playing, queue finished,
/// playback errors, idle disconnects) to a text channel.
///
/// Delivery is best effort: implementations log failures instead of
/// returning them, a lost notice never changes session state.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: ChannelId, content: &str);
}
