//! Video controller capability
//!
//! A controller owns the visual control surface of exactly one video. Three
//! variants share the one interface: the browser's native control bar, the
//! extension's custom bar, and an inert variant for the disabled mode. The
//! variant is chosen once per session at attach time; call sites never
//! branch on the mode again.
//!
//! Controllers only touch document regions handed to them through the
//! session's [`Classification`] slots; they never go looking for elements
//! on their own.

mod bar;
mod custom;
mod disabled;
mod native;

pub use bar::{BarInput, DragBar};
pub use custom::CustomControls;
pub use disabled::DisabledControls;
pub use native::NativeControls;

pub use crate::settings::ControlMode;

use crate::classify::{Classification, SlotMap, VideoContext};
use crate::dom::{Document, NodeId};
use crate::settings::PlaybackSettings;
use std::time::Instant;

/// Height of the custom control bar in pixels
pub const CUSTOM_CONTROL_HEIGHT: f64 = 32.0;

/// Height reserved for the native control bar; Chromium draws a taller one
pub const NATIVE_CONTROL_HEIGHT: f64 = 70.0;

/// Native control bar height for browsers with the compact rendering
pub const NATIVE_CONTROL_HEIGHT_COMPACT: f64 = 40.0;

/// The control surface attached to one video
///
/// `create` silently does nothing when the overlay slot is absent; a video
/// without a mount point simply stays uncontrolled. `remove` is idempotent
/// and must revert every style adjustment `create` made.
pub trait VideoControls {
    /// Build and attach the visual surface into the overlay slot
    fn create(&mut self, doc: &mut Document, settings: &PlaybackSettings);

    /// Detach the surface and revert all layout adjustments
    fn remove(&mut self, doc: &mut Document);

    fn on_play(&mut self, doc: &mut Document);
    fn on_pause(&mut self, doc: &mut Document);
    fn on_time_update(&mut self, doc: &mut Document, settings: &PlaybackSettings);
    fn on_volume_change(&mut self, doc: &mut Document);
    fn on_playback_speed_change(&mut self, doc: &mut Document, settings: &PlaybackSettings);
    fn on_fullscreen_change(&mut self, doc: &mut Document, settings: &PlaybackSettings);
    fn on_picture_in_picture_change(&mut self, doc: &mut Document, settings: &PlaybackSettings);

    /// A control-bar setting changed; re-evaluate optional widgets without
    /// a teardown
    fn on_update_settings(&mut self, doc: &mut Document, settings: &PlaybackSettings);

    /// The pointer entered or left the player area
    fn set_hover(&mut self, doc: &mut Document, settings: &PlaybackSettings, hover: bool);

    /// Cooperative timer pump for delayed hide effects
    fn on_tick(&mut self, doc: &mut Document, now: Instant);
}

/// Build the controller variant for a control mode
pub fn build_controls(
    mode: ControlMode,
    video: NodeId,
    classification: &Classification,
    native_height: f64,
) -> Box<dyn VideoControls> {
    match mode {
        ControlMode::Native => Box::new(NativeControls::new(video, classification, native_height)),
        ControlMode::Custom => Box::new(CustomControls::new(video, classification)),
        ControlMode::Disabled => Box::new(DisabledControls::new()),
    }
}

/// Layout state shared by the visible controller variants
///
/// Owns the control background element and the style adjustments that make
/// room for the bar: the host overlay is shortened so it stops swallowing
/// clicks, story reply rows and mobile widget clusters are pushed up, and
/// the host's own mute toggle is hidden. `restore` undoes all of it.
pub(crate) struct ControlFrame {
    pub(crate) video: NodeId,
    pub(crate) context: VideoContext,
    pub(crate) slots: SlotMap,
    pub(crate) background: Option<NodeId>,
    pub(crate) hover: bool,
}

impl ControlFrame {
    pub(crate) fn new(video: NodeId, classification: &Classification) -> Self {
        Self {
            video,
            context: classification.context,
            slots: classification.slots,
            background: None,
            hover: false,
        }
    }

    /// Create the control background inside the overlay slot
    pub(crate) fn create_background(&mut self, doc: &mut Document) {
        let Some(overlay) = self.slots.overlay else {
            return;
        };
        let background = doc.create_element("div");
        doc.add_class(background, "fb-controls");
        match self.context {
            VideoContext::Reel => doc.add_class(background, "fb-reel"),
            VideoContext::Story => doc.add_class(background, "fb-story"),
            _ => {}
        }
        doc.append_child(overlay, background);
        self.background = Some(background);
    }

    /// Reserve `height` pixels at the bottom of the player for the bar
    pub(crate) fn reserve_height(&mut self, doc: &mut Document, height: f64) {
        let Some(overlay) = self.slots.overlay else {
            return;
        };

        // Shorten the inner overlay so it stops blocking clicks on the bar.
        if let Some(inner) = doc.first_child(overlay) {
            if Some(inner) != self.background {
                doc.set_style(inner, "height", &format!("calc(100% - {}px)", height));
            }
        }

        // Story reply rows would overlap the bar; mobile stories place them
        // below the video, so nothing to do there.
        if let Some(reply) = self.slots.reply {
            if self.context != VideoContext::MobileStory {
                doc.set_style(reply, "margin-bottom", &format!("{}px", height));
            }
        }

        // Mobile reels position their widget cluster absolutely.
        if let Some(mobile_overlay) = self.slots.mobile_overlay {
            doc.set_style(mobile_overlay, "bottom", &format!("{}px", height));
        }

        // Keep the story click-through areas clear of the bar.
        if let Some(click_area) = self.slots.click_area {
            doc.set_style(click_area, "margin-bottom", &format!("{}px", height));
        }

        // The host's own mute toggle is redundant next to ours.
        if let Some(native_mute) = self.slots.native_mute {
            doc.set_style(native_mute, "display", "none");
        }

        if let Some(background) = self.background {
            doc.set_style(background, "height", &format!("{}px", height));
        }
    }

    /// Revert every adjustment made at create time; safe to call twice
    pub(crate) fn restore(&mut self, doc: &mut Document) {
        doc.set_controls(self.video, false);

        if let Some(overlay) = self.slots.overlay {
            if let Some(inner) = doc.first_child(overlay) {
                doc.clear_style(inner, "height");
            }
        }
        if let Some(reply) = self.slots.reply {
            doc.clear_style(reply, "margin-bottom");
        }
        if let Some(mobile_overlay) = self.slots.mobile_overlay {
            doc.clear_style(mobile_overlay, "bottom");
        }
        if let Some(click_area) = self.slots.click_area {
            doc.clear_style(click_area, "margin-bottom");
        }
        if let Some(native_mute) = self.slots.native_mute {
            doc.clear_style(native_mute, "display");
        }
        if let Some(background) = self.background.take() {
            doc.remove(background);
        }
    }

    /// Bar visibility under the auto-hide rule
    pub(crate) fn visible(&self, settings: &PlaybackSettings) -> bool {
        !settings.auto_hide_control_bar || self.hover
    }
}
