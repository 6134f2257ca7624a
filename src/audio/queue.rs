use serenity::model::id::UserId;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::error::{MusicError, MusicResult};

/// Who asked for a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

/// A resolved, playable song. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    title: String,
    url: String,
    requester: Requester,
}

impl Song {
    pub fn new(title: String, url: String, requester: Requester) -> Self {
        Self {
            title,
            url,
            requester,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }
}

/// Pending songs for one guild, strictly FIFO.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<Song>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Appends at the tail and returns the 1-based position of the new song.
    pub fn add_track(&mut self, song: Song) -> MusicResult<usize> {
        if self.items.len() >= self.max_size {
            return Err(MusicError::QueueFull { max: self.max_size });
        }

        info!("➕ Queued: {}", song.title());
        self.items.push_back(song);
        Ok(self.items.len())
    }

    /// Pops the head of the queue.
    pub fn next_track(&mut self) -> Option<Song> {
        let next = self.items.pop_front();
        match &next {
            Some(song) => debug!("➡️ Next in queue: {}", song.title()),
            None => debug!("📭 Queue empty, nothing to play next"),
        }
        next
    }

    /// Removes the song at a 1-based position.
    ///
    /// `None` stands for an index that could not be parsed; it is rejected
    /// the same way as an out-of-range one, but only after the empty-queue
    /// check.
    pub fn remove_track(&mut self, position: Option<usize>) -> MusicResult<Song> {
        if self.items.is_empty() {
            return Err(MusicError::QueueEmpty);
        }

        let len = self.items.len();
        let index = position
            .filter(|p| (1..=len).contains(p))
            .ok_or(MusicError::InvalidIndex { len })?;

        let removed = self
            .items
            .remove(index - 1)
            .ok_or(MusicError::InvalidIndex { len })?;
        info!("❌ Removed from queue: {}", removed.title());
        Ok(removed)
    }

    /// Empties the queue and returns how many songs were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        if dropped > 0 {
            info!("🗑️ Queue cleared ({} songs)", dropped);
        }
        dropped
    }

    /// Copies the first `limit` songs for display.
    pub fn view(&self, limit: usize) -> QueueView {
        QueueView {
            songs: self.items.iter().take(limit).cloned().collect(),
            total: self.items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// The head of a queue plus its full length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    pub songs: Vec<Song>,
    pub total: usize,
}

impl QueueView {
    /// Songs beyond the displayed head.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.songs.len())
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
                name: "listener".to_string(),
            },
        )
    }

    fn titles(queue: &MusicQueue) -> Vec<String> {
        queue
            .view(usize::MAX)
            .songs
            .iter()
            .map(|s| s.title().to_string())
            .collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = MusicQueue::new(10);
        assert_eq!(queue.add_track(song("a")).unwrap(), 1);
        assert_eq!(queue.add_track(song("b")).unwrap(), 2);
        assert_eq!(queue.add_track(song("c")).unwrap(), 3);

        assert_eq!(queue.next_track().unwrap().title(), "a");
        assert_eq!(queue.next_track().unwrap().title(), "b");
        assert_eq!(queue.next_track().unwrap().title(), "c");
        assert!(queue.next_track().is_none());
    }

    #[test]
    fn test_queue_full() {
        let mut queue = MusicQueue::new(1);
        queue.add_track(song("a")).unwrap();
        assert_eq!(
            queue.add_track(song("b")),
            Err(MusicError::QueueFull { max: 1 })
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut queue = MusicQueue::new(10);
        for title in ["a", "b", "c", "d"] {
            queue.add_track(song(title)).unwrap();
        }

        let removed = queue.remove_track(Some(2)).unwrap();
        assert_eq!(removed.title(), "b");
        assert_eq!(titles(&queue), vec!["a", "c", "d"]);

        let removed = queue.remove_track(Some(3)).unwrap();
        assert_eq!(removed.title(), "d");
        assert_eq!(titles(&queue), vec!["a", "c"]);
    }

    #[test]
    fn test_remove_rejects_bad_positions() {
        let mut queue = MusicQueue::new(10);
        assert_eq!(queue.remove_track(Some(1)), Err(MusicError::QueueEmpty));
        assert_eq!(queue.remove_track(None), Err(MusicError::QueueEmpty));

        queue.add_track(song("a")).unwrap();
        queue.add_track(song("b")).unwrap();
        for bad in [Some(0), Some(3), None] {
            assert_eq!(
                queue.remove_track(bad),
                Err(MusicError::InvalidIndex { len: 2 })
            );
        }
        assert_eq!(titles(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_view_truncates() {
        let mut queue = MusicQueue::new(100);
        for i in 0..12 {
            queue.add_track(song(&format!("s{i}"))).unwrap();
        }

        let view = queue.view(10);
        assert_eq!(view.songs.len(), 10);
        assert_eq!(view.total, 12);
        assert_eq!(view.remaining(), 2);
        assert_eq!(view.songs[0].title(), "s0");
    }

    #[test]
    fn test_clear_reports_count() {
        let mut queue = MusicQueue::new(10);
        assert_eq!(queue.clear(), 0);
        queue.add_track(song("a")).unwrap();
        queue.add_track(song("b")).unwrap();
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
