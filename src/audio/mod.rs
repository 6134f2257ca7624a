//! # Audio Module
//!
//! Per-guild playback: the song queue, the player state machine and the
//! idle-disconnect timer.
//!
//! ## Architecture
//!
//! ### [`registry`] - Session Registry
//! - Owns one [`session::GuildSession`] per guild behind a mutex
//! - Runs the event loop that feeds player and timer events back in
//!
//! ### [`session`] - Guild Session
//! - Queue advance, pause/resume/stop/skip and teardown
//! - Play cycles tag every started track so late events are ignored
//!
//! ### [`queue`] - Queue Management
//! - Bounded FIFO of requested songs with 1-based positions
//!
//! ### [`player`] / [`voice`] - Voice Backend
//! - Traits the session drives, and their songbird implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use jukebox_bot::audio::registry::SessionRegistry;
//! use std::sync::Arc;
//!
//! # async fn example(registry: SessionRegistry, events: jukebox_bot::audio::player::EventReceiver) {
//! let registry = Arc::new(registry);
//! tokio::spawn(registry.clone().run(events));
//! # }
//! ```

pub mod notify;
pub mod player;
pub mod queue;
pub mod registry;
pub mod session;
pub mod timer;
pub mod voice;
