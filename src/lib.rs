//! Feedbar - custom playback controls for feed pages with unstable DOMs
//!
//! Feedbar is the core engine of a browser extension that augments the video
//! elements of a social-media feed with its own playback controls and keeps
//! volume, mute and playback speed in sync across every video on the page.
//!
//! The host page offers no stable identifiers and rewrites its own DOM at a
//! high rate, so the engine is built around three ideas:
//!
//! - a periodic, idempotent scan that diffs the set of live video elements
//!   against a registry of attached player sessions ([`engine::VideoDetector`]),
//! - a purely structural classifier that infers each video's presentation
//!   context from ancestor/sibling probes and degrades to safe defaults when
//!   the page changes shape ([`classify`]),
//! - a single-writer coordinator that owns the shared playback state and
//!   filters out the host page's own script-driven volume writes
//!   (the suppression window in [`engine::VideoDetector`]).
//!
//! The host page itself is modeled by [`dom::Document`], an arena-allocated
//! element tree with media state, inline styles and an event-listener
//! registry. In a deployed extension the same surface is backed by real DOM
//! bindings; here it doubles as the synthetic tree the test-suite drives.

pub mod classify;
pub mod controls;
pub mod dom;
pub mod engine;
pub mod settings;
pub mod utils;

pub use classify::{Classification, ClassifierOffsets, SlotMap, VideoContext};
pub use controls::{BarInput, ControlMode, VideoControls};
pub use dom::{Document, NodeId};
pub use engine::{DetectorTuning, PlayerSession, SessionState, VideoDetector, VideoKey};
pub use settings::{AutoplayMode, PlaybackSettings, SettingChange, Settings};
pub use utils::error::{FeedbarError, Result};
