use serenity::model::id::GuildId;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::audio::player::{EventSender, SessionEvent};

/// Single-shot idle-disconnect timer for one guild.
///
/// Firing only posts [`SessionEvent::IdleTimeout`]; the session decides
/// what to do with it. Every arm gets a new id so an event that raced a
/// cancel can be recognised and dropped.
#[derive(Debug, Default)]
pub struct IdleTimer {
    armed: Option<ArmedTimer>,
    last_id: u64,
}

#[derive(Debug)]
struct ArmedTimer {
    id: u64,
    task: JoinHandle<()>,
}

impl IdleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a timeout after `delay`, cancelling any pending one first.
    pub fn arm(&mut self, guild_id: GuildId, delay: Duration, events: &EventSender) -> u64 {
        self.cancel();

        self.last_id += 1;
        let timer_id = self.last_id;
        let events = events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // the receiver is gone only during shutdown
            let _ = events.send(SessionEvent::IdleTimeout { guild_id, timer_id });
        });

        debug!(
            "⏲️ Idle disconnect scheduled in {} for guild {}",
            humantime::format_duration(delay),
            guild_id
        );
        self.armed = Some(ArmedTimer { id: timer_id, task });
        timer_id
    }

    /// Aborts the pending timer. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    /// Consumes a firing: true only for the currently armed id.
    pub fn take_if_current(&mut self, timer_id: u64) -> bool {
        match &self.armed {
            Some(timer) if timer.id == timer_id => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    const DELAY: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guild_id = GuildId::new(1);
        let mut timer = IdleTimer::new();

        let start = tokio::time::Instant::now();
        let id = timer.arm(guild_id, DELAY, &tx);
        let event = rx.recv().await.unwrap();

        assert!(start.elapsed() >= DELAY);
        assert_eq!(event, SessionEvent::IdleTimeout { guild_id, timer_id: id });
        assert!(timer.take_if_current(id));
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = IdleTimer::new();

        timer.arm(GuildId::new(1), DELAY, &tx);
        assert!(timer.cancel());
        assert!(!timer.cancel());

        let waited = tokio::time::timeout(DELAY * 2, rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guild_id = GuildId::new(1);
        let mut timer = IdleTimer::new();

        let first = timer.arm(guild_id, DELAY, &tx);
        let second = timer.arm(guild_id, DELAY, &tx);
        assert_ne!(first, second);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, SessionEvent::IdleTimeout { guild_id, timer_id: second });
        assert!(!timer.take_if_current(first));
        assert!(timer.take_if_current(second));

        // only one firing ever reaches the channel
        let extra = tokio::time::timeout(DELAY * 2, rx.recv()).await;
        assert!(extra.is_err());
    }
}
