//! The disabled control variant
//!
//! An inert implementation of the controller capability: the page keeps its
//! stock behavior and nothing is mounted or adjusted. Sessions still carry
//! this controller so the mode is a variant choice, not a special case at
//! every call site.

use crate::controls::VideoControls;
use crate::dom::Document;
use crate::settings::PlaybackSettings;
use std::time::Instant;

#[derive(Default)]
pub struct DisabledControls;

impl DisabledControls {
    pub fn new() -> Self {
        Self
    }
}

impl VideoControls for DisabledControls {
    fn create(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn remove(&mut self, _doc: &mut Document) {}
    fn on_play(&mut self, _doc: &mut Document) {}
    fn on_pause(&mut self, _doc: &mut Document) {}
    fn on_time_update(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_volume_change(&mut self, _doc: &mut Document) {}
    fn on_playback_speed_change(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_fullscreen_change(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_picture_in_picture_change(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_update_settings(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn set_hover(&mut self, _doc: &mut Document, _settings: &PlaybackSettings, _hover: bool) {}
    fn on_tick(&mut self, _doc: &mut Document, _now: Instant) {}
}
