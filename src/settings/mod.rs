//! Shared playback settings for Feedbar
//!
//! This module owns the process-wide playback record: control mode, last
//! volume, last speed, autoplay policy and the UI-visibility toggles. The
//! record is a single owned value behind [`Settings`]; everything else in
//! the engine only reads it or reports observed changes to the coordinator,
//! which is the sole writer. Readers that need to react to changes
//! subscribe to a change-broadcast channel instead of polling.
//!
//! The muted flag is deliberately absent from the persisted schema: modern
//! browsers refuse unmuted autoplay without a user gesture, so a persisted
//! "unmuted" would be wrong on almost every page load. The coordinator
//! tracks mute in memory and only flips it on explicit mute signals.

pub mod store;

pub use store::{JsonFileStore, MemoryStore, SettingsStore};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// How video controls are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// The browser's own control bar
    Native,

    /// The extension's control bar; looks identical across browsers
    Custom,

    /// No controls; the page is left as-is
    Disabled,
}

/// What happens when a video loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoplayMode {
    /// Playback starts without audio (the page default)
    Muted,

    /// Playback starts with audio; needs a browser permission probe
    Unmuted,

    /// Playback is stopped until the user interacts
    Stopped,
}

/// The playback speeds offered by the speed menu
pub const PLAYBACK_SPEEDS: [f64; 10] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0];

/// The persisted settings record
///
/// Serialized as the flat camelCase key-value map the settings store uses;
/// unknown keys are ignored and missing keys fall back to defaults so old
/// stores keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSettings {
    pub video_control_mode: ControlMode,

    /// Last user-chosen volume, 0.0..=1.0
    pub last_playback_volume: f64,

    /// Last user-chosen speed, one of [`PLAYBACK_SPEEDS`]
    pub last_playback_speed: f64,

    pub autoplay_mode: AutoplayMode,

    pub show_time_code_text: bool,
    pub show_fullscreen_button: bool,
    pub show_picture_in_picture_button: bool,
    pub show_playback_speed_option: bool,
    pub auto_hide_control_bar: bool,
    pub loop_playback: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            video_control_mode: ControlMode::Custom,
            last_playback_volume: 0.0,
            last_playback_speed: 1.0,
            autoplay_mode: AutoplayMode::Muted,
            show_time_code_text: true,
            show_fullscreen_button: true,
            show_picture_in_picture_button: true,
            show_playback_speed_option: true,
            auto_hide_control_bar: true,
            loop_playback: false,
        }
    }
}

impl PlaybackSettings {
    /// Clamp out-of-range values loaded from an untrusted store
    ///
    /// Volume is clamped into 0.0..=1.0 and the speed is snapped to the
    /// nearest allowed value; both are logged rather than rejected.
    pub fn sanitize(&mut self) {
        if !(0.0..=1.0).contains(&self.last_playback_volume) || !self.last_playback_volume.is_finite()
        {
            warn!(
                "Clamping stored volume {} into range",
                self.last_playback_volume
            );
            self.last_playback_volume = self.last_playback_volume.clamp(0.0, 1.0);
            if !self.last_playback_volume.is_finite() {
                self.last_playback_volume = 0.0;
            }
        }
        if !PLAYBACK_SPEEDS.contains(&self.last_playback_speed) {
            let snapped = nearest_speed(self.last_playback_speed);
            warn!(
                "Stored speed {} is not offered, snapping to {}",
                self.last_playback_speed, snapped
            );
            self.last_playback_speed = snapped;
        }
    }
}

/// Snap an arbitrary speed to the nearest offered one
pub fn nearest_speed(speed: f64) -> f64 {
    let mut best = 1.0;
    let mut best_distance = f64::INFINITY;
    for candidate in PLAYBACK_SPEEDS {
        let distance = (candidate - speed).abs();
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    best
}

/// A single changed setting, broadcast to subscribers
///
/// External store changes are diffed into the same shape, so subscribers
/// cannot tell (and do not care) whether a change was local or remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    ControlMode,
    Volume,
    Speed,
    AutoplayMode,
    TimeCodeText,
    FullscreenButton,
    PictureInPictureButton,
    PlaybackSpeedOption,
    AutoHideControlBar,
    LoopPlayback,
}

impl SettingChange {
    /// Whether this change only affects which widgets controllers show,
    /// handled without tearing sessions down
    pub fn is_control_setting(self) -> bool {
        matches!(
            self,
            SettingChange::TimeCodeText
                | SettingChange::FullscreenButton
                | SettingChange::PictureInPictureButton
                | SettingChange::PlaybackSpeedOption
                | SettingChange::AutoHideControlBar
                | SettingChange::LoopPlayback
        )
    }
}

/// Owner of the settings record, its store and its subscribers
pub struct Settings {
    data: PlaybackSettings,
    store: Box<dyn SettingsStore>,
    subscribers: Vec<Sender<SettingChange>>,
}

impl Settings {
    /// Create a settings hub on top of a store; call [`Settings::load`]
    /// before first use
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        Self {
            data: PlaybackSettings::default(),
            store,
            subscribers: Vec::new(),
        }
    }

    /// Settings hub backed by the in-memory store (tests, probes)
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// The current record
    pub fn data(&self) -> &PlaybackSettings {
        &self.data
    }

    /// Load the record from the store
    ///
    /// A failing store is logged and leaves the defaults authoritative;
    /// the engine must come up even when the storage area is unavailable.
    pub fn load(&mut self) {
        match self.store.load() {
            Ok(mut data) => {
                data.sanitize();
                self.data = data;
                info!("Loaded settings from store");
            }
            Err(err) => {
                warn!("Failed to load settings, using defaults: {}", err);
            }
        }
    }

    /// Subscribe to setting changes
    pub fn subscribe(&mut self) -> Receiver<SettingChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Drain externally-made store changes (another page, the popup) and
    /// re-broadcast them in the local change shape
    pub fn poll_external(&mut self) {
        let Some(changes) = self.store.external_changes() else {
            return;
        };
        let mut latest = None;
        while let Ok(data) = changes.try_recv() {
            latest = Some(data);
        }
        let Some(mut incoming) = latest else {
            return;
        };
        incoming.sanitize();
        let previous = self.data.clone();
        self.data = incoming;
        for change in diff(&previous, &self.data) {
            debug!("External setting change: {:?}", change);
            self.broadcast(change);
        }
    }

    fn broadcast(&mut self, change: SettingChange) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }

    fn persist(&mut self) {
        // A failed write is logged only; the in-memory record stays
        // authoritative and the next genuine change retries anyway.
        if let Err(err) = self.store.save(&self.data) {
            warn!("Failed to persist settings: {}", err);
        }
    }

    //#region Mutators (coordinator only)

    /// Record a new last-used volume
    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        if self.data.last_playback_volume == volume {
            return;
        }
        self.data.last_playback_volume = volume;
        self.persist();
        self.broadcast(SettingChange::Volume);
    }

    /// Record a new last-used playback speed
    pub fn set_speed(&mut self, speed: f64) {
        if self.data.last_playback_speed == speed {
            return;
        }
        self.data.last_playback_speed = speed;
        self.persist();
        self.broadcast(SettingChange::Speed);
    }

    /// Switch the control mode
    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if self.data.video_control_mode == mode {
            return;
        }
        self.data.video_control_mode = mode;
        self.persist();
        self.broadcast(SettingChange::ControlMode);
    }

    /// Switch the autoplay policy
    pub fn set_autoplay_mode(&mut self, mode: AutoplayMode) {
        if self.data.autoplay_mode == mode {
            return;
        }
        self.data.autoplay_mode = mode;
        self.persist();
        self.broadcast(SettingChange::AutoplayMode);
    }

    /// Toggle one of the control-bar settings
    pub fn set_control_setting(&mut self, change: SettingChange, on: bool) {
        let slot = match change {
            SettingChange::TimeCodeText => &mut self.data.show_time_code_text,
            SettingChange::FullscreenButton => &mut self.data.show_fullscreen_button,
            SettingChange::PictureInPictureButton => {
                &mut self.data.show_picture_in_picture_button
            }
            SettingChange::PlaybackSpeedOption => &mut self.data.show_playback_speed_option,
            SettingChange::AutoHideControlBar => &mut self.data.auto_hide_control_bar,
            SettingChange::LoopPlayback => &mut self.data.loop_playback,
            _ => return,
        };
        if *slot == on {
            return;
        }
        *slot = on;
        self.persist();
        self.broadcast(change);
    }

    //#endregion Mutators (coordinator only)
}

/// All keys that differ between two records
fn diff(old: &PlaybackSettings, new: &PlaybackSettings) -> Vec<SettingChange> {
    let mut changes = Vec::new();
    if old.video_control_mode != new.video_control_mode {
        changes.push(SettingChange::ControlMode);
    }
    if old.last_playback_volume != new.last_playback_volume {
        changes.push(SettingChange::Volume);
    }
    if old.last_playback_speed != new.last_playback_speed {
        changes.push(SettingChange::Speed);
    }
    if old.autoplay_mode != new.autoplay_mode {
        changes.push(SettingChange::AutoplayMode);
    }
    if old.show_time_code_text != new.show_time_code_text {
        changes.push(SettingChange::TimeCodeText);
    }
    if old.show_fullscreen_button != new.show_fullscreen_button {
        changes.push(SettingChange::FullscreenButton);
    }
    if old.show_picture_in_picture_button != new.show_picture_in_picture_button {
        changes.push(SettingChange::PictureInPictureButton);
    }
    if old.show_playback_speed_option != new.show_playback_speed_option {
        changes.push(SettingChange::PlaybackSpeedOption);
    }
    if old.auto_hide_control_bar != new.auto_hide_control_bar {
        changes.push(SettingChange::AutoHideControlBar);
    }
    if old.loop_playback != new.loop_playback {
        changes.push(SettingChange::LoopPlayback);
    }
    changes
}
