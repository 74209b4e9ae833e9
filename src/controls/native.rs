//! The native browser control variant
//!
//! Visibility here means toggling the element's own `controls` flag; the
//! browser draws and updates the bar itself, so every event hook is a
//! no-op.

use crate::classify::Classification;
use crate::controls::{ControlFrame, VideoControls};
use crate::dom::{Document, NodeId};
use crate::settings::PlaybackSettings;
use std::time::Instant;

pub struct NativeControls {
    frame: ControlFrame,

    /// Reserved bar height; browsers disagree on how tall their bar is
    height: f64,
}

impl NativeControls {
    pub fn new(video: NodeId, classification: &Classification, height: f64) -> Self {
        Self {
            frame: ControlFrame::new(video, classification),
            height,
        }
    }

    fn update_visibility(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        let visible = self.frame.visible(settings);
        doc.set_controls(self.frame.video, visible);
    }
}

impl VideoControls for NativeControls {
    fn create(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if self.frame.slots.overlay.is_none() {
            return;
        }
        self.frame.create_background(doc);
        self.frame.reserve_height(doc, self.height);
        self.update_visibility(doc, settings);
    }

    fn remove(&mut self, doc: &mut Document) {
        self.frame.restore(doc);
    }

    fn on_play(&mut self, _doc: &mut Document) {}
    fn on_pause(&mut self, _doc: &mut Document) {}
    fn on_time_update(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_volume_change(&mut self, _doc: &mut Document) {}
    fn on_playback_speed_change(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_fullscreen_change(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}
    fn on_picture_in_picture_change(&mut self, _doc: &mut Document, _settings: &PlaybackSettings) {}

    fn on_update_settings(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        self.update_visibility(doc, settings);
    }

    fn set_hover(&mut self, doc: &mut Document, settings: &PlaybackSettings, hover: bool) {
        self.frame.hover = hover;
        self.update_visibility(doc, settings);
    }

    fn on_tick(&mut self, _doc: &mut Document, _now: Instant) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::controls::NATIVE_CONTROL_HEIGHT;

    fn native_setup() -> (Document, NodeId, NativeControls) {
        let mut doc = Document::new();
        let wrap = doc.create_element("div");
        doc.append_child(doc.body(), wrap);
        let video = doc.create_video("clip.mp4");
        doc.append_child(wrap, video);
        let overlay = doc.create_element("div");
        doc.append_child(wrap, overlay);
        let inner = doc.create_element("div");
        doc.append_child(overlay, inner);

        let classification = classify(&doc, video);
        let controls = NativeControls::new(video, &classification, NATIVE_CONTROL_HEIGHT);
        (doc, video, controls)
    }

    #[test]
    fn test_native_controls_follow_hover() {
        let (mut doc, video, mut controls) = native_setup();
        let settings = PlaybackSettings::default(); // auto-hide on

        controls.create(&mut doc, &settings);
        assert!(!doc.media(video).unwrap().controls);

        controls.set_hover(&mut doc, &settings, true);
        assert!(doc.media(video).unwrap().controls);

        controls.set_hover(&mut doc, &settings, false);
        assert!(!doc.media(video).unwrap().controls);
    }

    #[test]
    fn test_native_controls_without_auto_hide() {
        let (mut doc, video, mut controls) = native_setup();
        let mut settings = PlaybackSettings::default();
        settings.auto_hide_control_bar = false;

        controls.create(&mut doc, &settings);
        assert!(doc.media(video).unwrap().controls);

        controls.remove(&mut doc);
        assert!(!doc.media(video).unwrap().controls);
    }
}
