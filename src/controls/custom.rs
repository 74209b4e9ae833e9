//! The custom control bar
//!
//! Builds the extension's own widget row into the host overlay: play
//! toggle, mute toggle with a hover volume bar, position read-out, seek
//! bar, Picture-in-Picture, speed menu and fullscreen. Widgets live
//! entirely inside the overlay slot handed over by the session; updates
//! are driven by the forwarded native events.

use crate::classify::Classification;
use crate::controls::{BarInput, ControlFrame, DragBar, VideoControls, CUSTOM_CONTROL_HEIGHT};
use crate::dom::{Document, NodeId};
use crate::settings::{PlaybackSettings, PLAYBACK_SPEEDS};
use crate::utils::{format_time, percent_width};
use std::time::{Duration, Instant};

/// Delay before the volume bar and the speed menu hide after hover leaves
const HIDE_DELAY: Duration = Duration::from_millis(400);

// Icon resources, resolved against the extension bundle by the embedding.
const IMAGE_PLAY: &str = "images/play.svg";
const IMAGE_PAUSE: &str = "images/pause.svg";
const IMAGE_SPEAKER_ON: &str = "images/speaker-on.svg";
const IMAGE_SPEAKER_OFF: &str = "images/speaker-off.svg";
const IMAGE_FULLSCREEN_ENTER: &str = "images/fullscreen-enter.svg";
const IMAGE_FULLSCREEN_EXIT: &str = "images/fullscreen-exit.svg";
const IMAGE_PIP_ENTER: &str = "images/picture-in-picture-enter.svg";
const IMAGE_PIP_EXIT: &str = "images/picture-in-picture-exit.svg";
const IMAGE_PLAYBACK_SPEED: &str = "images/playback-speed.svg";

pub struct CustomControls {
    frame: ControlFrame,

    // Widget elements; all absent until create runs and after remove.
    content: Option<NodeId>,
    play_button: Option<NodeId>,
    mute_button: Option<NodeId>,
    volume_bar_element: Option<NodeId>,
    volume_fill: Option<NodeId>,
    position_text: Option<NodeId>,
    seek_bar_element: Option<NodeId>,
    seek_fill: Option<NodeId>,
    pip_button: Option<NodeId>,
    speed_button: Option<NodeId>,
    speed_menu: Option<NodeId>,
    speed_items: Vec<(f64, NodeId)>,
    fullscreen_button: Option<NodeId>,

    seek_bar: DragBar,
    volume_bar: DragBar,

    volume_bar_hide_at: Option<Instant>,
    speed_menu_hide_at: Option<Instant>,
}

impl CustomControls {
    pub fn new(video: NodeId, classification: &Classification) -> Self {
        Self {
            frame: ControlFrame::new(video, classification),
            content: None,
            play_button: None,
            mute_button: None,
            volume_bar_element: None,
            volume_fill: None,
            position_text: None,
            seek_bar_element: None,
            seek_fill: None,
            pip_button: None,
            speed_button: None,
            speed_menu: None,
            speed_items: Vec::new(),
            fullscreen_button: None,
            seek_bar: DragBar::new(false),
            volume_bar: DragBar::new(true),
            volume_bar_hide_at: None,
            speed_menu_hide_at: None,
        }
    }

    fn video(&self) -> NodeId {
        self.frame.video
    }

    //#region Widget construction

    fn make_icon_button(doc: &mut Document, parent: NodeId) -> NodeId {
        let button = doc.create_element("button");
        doc.add_class(button, "fb-control-element");
        doc.add_class(button, "fb-icon-button");
        let icon = doc.create_element("img");
        doc.append_child(button, icon);
        doc.append_child(parent, button);
        button
    }

    fn make_bar(doc: &mut Document, parent: NodeId, class: &str) -> (NodeId, NodeId) {
        let bar = doc.create_element("div");
        doc.add_class(bar, "fb-control-element");
        doc.add_class(bar, "fb-control-bar");
        doc.add_class(bar, class);
        doc.append_child(parent, bar);

        let background = doc.create_element("div");
        doc.add_class(background, "fb-control-bar-background");
        doc.append_child(bar, background);

        let fill = doc.create_element("div");
        doc.add_class(fill, "fb-control-bar-progress");
        doc.append_child(background, fill);

        (bar, fill)
    }

    fn set_button_icon(doc: &mut Document, button: Option<NodeId>, icon: &str) {
        let Some(img) = button.and_then(|b| doc.first_child(b)) else {
            return;
        };
        doc.set_attr(img, "src", icon);
    }

    fn set_element_visible(doc: &mut Document, element: Option<NodeId>, visible: bool) {
        if let Some(element) = element {
            doc.set_style(element, "display", if visible { "block" } else { "none" });
        }
    }

    //#endregion Widget construction

    //#region Updates

    fn update_play_control(&mut self, doc: &mut Document) {
        let paused = doc.media(self.video()).map(|m| m.paused).unwrap_or(true);
        Self::set_button_icon(
            doc,
            self.play_button,
            if paused { IMAGE_PLAY } else { IMAGE_PAUSE },
        );
    }

    fn update_position_control(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        let (Some(fill), Some(text)) = (self.seek_fill, self.position_text) else {
            return;
        };
        let Some(media) = doc.media(self.video()) else {
            return;
        };
        let progress = media.progress();
        let label = format!(
            "{} / {}",
            format_time(media.current_time),
            format_time(media.duration)
        );
        doc.set_style(fill, "width", &percent_width(progress));
        doc.set_text(text, &label);
        Self::set_element_visible(doc, self.position_text, settings.show_time_code_text);
    }

    fn update_volume_control(&mut self, doc: &mut Document) {
        let Some(media) = doc.media(self.video()) else {
            return;
        };
        let (volume, muted) = (media.volume, media.muted);
        Self::set_button_icon(
            doc,
            self.mute_button,
            if muted { IMAGE_SPEAKER_OFF } else { IMAGE_SPEAKER_ON },
        );
        self.volume_bar.set_fill(volume);
        if let Some(fill) = self.volume_fill {
            doc.set_style(fill, "width", &percent_width(volume));
        }
    }

    fn update_fullscreen_control(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        let active = doc.fullscreen_element().is_some();
        Self::set_button_icon(
            doc,
            self.fullscreen_button,
            if active { IMAGE_FULLSCREEN_EXIT } else { IMAGE_FULLSCREEN_ENTER },
        );
        // The capability can be absent entirely, e.g. inside an iframe.
        let available = doc.fullscreen_enabled() && settings.show_fullscreen_button;
        Self::set_element_visible(doc, self.fullscreen_button, available);
    }

    fn update_picture_in_picture_control(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        let active = doc.picture_in_picture_element().is_some();
        Self::set_button_icon(
            doc,
            self.pip_button,
            if active { IMAGE_PIP_EXIT } else { IMAGE_PIP_ENTER },
        );
        let available =
            doc.picture_in_picture_enabled() && settings.show_picture_in_picture_button;
        Self::set_element_visible(doc, self.pip_button, available);
    }

    fn update_speed_control(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        Self::set_button_icon(doc, self.speed_button, IMAGE_PLAYBACK_SPEED);
        Self::set_element_visible(doc, self.speed_button, settings.show_playback_speed_option);

        let rate = doc
            .media(self.video())
            .map(|m| m.playback_rate)
            .unwrap_or(1.0);
        for (speed, item) in &self.speed_items {
            doc.toggle_class(*item, "active", *speed == rate);
        }
    }

    fn update_visibility(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if let Some(background) = self.frame.background {
            doc.toggle_class(background, "hidden", !self.frame.visible(settings));
        }
    }

    //#endregion Updates

    //#region User intents

    /// Play/pause toggle from the play button
    pub fn toggle_play(&mut self, doc: &mut Document) {
        let paused = doc.media(self.video()).map(|m| m.paused).unwrap_or(false);
        if paused {
            doc.play(self.video());
        } else {
            doc.pause(self.video());
        }
    }

    /// Mute toggle from the speaker button
    pub fn toggle_mute(&mut self, doc: &mut Document) {
        let Some(media) = doc.media(self.video()) else {
            return;
        };
        let muted = !media.muted;
        let volume = media.volume;
        doc.set_muted(self.video(), muted);

        // Unmuting at zero volume would stay silent; give it a floor.
        if !muted && volume == 0.0 {
            doc.set_volume(self.video(), 0.1);
        }
    }

    /// Pointer interaction on the seek bar; commits only on click/release
    pub fn seek_input(&mut self, doc: &mut Document, input: BarInput) {
        let committed = self.seek_bar.handle(input);
        if let Some(fill) = self.seek_fill {
            doc.set_style(fill, "width", &percent_width(self.seek_bar.fill()));
        }
        if let Some(value) = committed {
            let duration = doc
                .media(self.video())
                .map(|m| m.duration)
                .unwrap_or(f64::NAN);
            if duration.is_finite() {
                doc.set_current_time(self.video(), value * duration);
            }
        }
    }

    /// Pointer interaction on the volume bar; commits continuously
    pub fn volume_input(&mut self, doc: &mut Document, input: BarInput) {
        let committed = self.volume_bar.handle(input);
        if let Some(fill) = self.volume_fill {
            doc.set_style(fill, "width", &percent_width(self.volume_bar.fill()));
        }
        if let Some(value) = committed {
            doc.set_volume(self.video(), value);
            doc.set_muted(self.video(), value <= 0.0);
        }
    }

    /// Speed selection from the drop-down
    pub fn select_speed(&mut self, doc: &mut Document, speed: f64) {
        doc.set_playback_rate(self.video(), speed);
    }

    /// Fullscreen toggle; targets the player root, not the bare video
    pub fn toggle_fullscreen(&mut self, doc: &mut Document) {
        if doc.fullscreen_element().is_some() {
            doc.exit_fullscreen();
        } else if let Some(root) = self.frame.slots.root {
            doc.request_fullscreen(root);
        }
    }

    /// Picture-in-Picture toggle
    pub fn toggle_picture_in_picture(&mut self, doc: &mut Document) {
        if doc.picture_in_picture_element().is_some() {
            doc.exit_picture_in_picture();
        } else {
            doc.request_picture_in_picture(self.video());
        }
    }

    //#endregion User intents

    //#region Hover-delayed widgets

    /// Pointer entered or left the mute button / volume bar cluster
    pub fn set_volume_bar_visible(&mut self, doc: &mut Document, visible: bool, now: Instant) {
        let Some(bar) = self.volume_bar_element else {
            return;
        };
        if visible {
            self.volume_bar_hide_at = None;
            doc.remove_class(bar, "hidden");
        } else {
            // Re-arming replaces any pending deadline.
            self.volume_bar_hide_at = Some(now + HIDE_DELAY);
        }
    }

    /// Pointer entered or left the speed button
    pub fn set_speed_menu_visible(&mut self, doc: &mut Document, visible: bool, now: Instant) {
        let Some(menu) = self.speed_menu else {
            return;
        };
        if visible {
            self.speed_menu_hide_at = None;
            doc.remove_class(menu, "hidden");
        } else {
            self.speed_menu_hide_at = Some(now + HIDE_DELAY);
        }
    }

    //#endregion Hover-delayed widgets
}

impl VideoControls for CustomControls {
    fn create(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if self.frame.slots.overlay.is_none() {
            return;
        }

        self.frame.create_background(doc);
        self.frame.reserve_height(doc, CUSTOM_CONTROL_HEIGHT);
        let Some(background) = self.frame.background else {
            return;
        };

        let content = doc.create_element("div");
        doc.add_class(content, "fb-controls-content");
        doc.append_child(background, content);
        self.content = Some(content);

        self.play_button = Some(Self::make_icon_button(doc, content));
        self.mute_button = Some(Self::make_icon_button(doc, content));

        let (volume_bar, volume_fill) = Self::make_bar(doc, content, "fb-volume-bar");
        doc.add_class(volume_bar, "hidden");
        self.volume_bar_element = Some(volume_bar);
        self.volume_fill = Some(volume_fill);

        let text = doc.create_element("div");
        doc.add_class(text, "fb-control-element");
        doc.add_class(text, "fb-control-text");
        doc.append_child(content, text);
        self.position_text = Some(text);

        let (seek_bar, seek_fill) = Self::make_bar(doc, content, "fb-seek-bar");
        self.seek_bar_element = Some(seek_bar);
        self.seek_fill = Some(seek_fill);

        self.pip_button = Some(Self::make_icon_button(doc, content));

        let speed_button = Self::make_icon_button(doc, content);
        self.speed_button = Some(speed_button);
        let menu = doc.create_element("ul");
        doc.add_class(menu, "fb-control-dropdown");
        doc.add_class(menu, "hidden");
        doc.append_child(speed_button, menu);
        self.speed_menu = Some(menu);
        self.speed_items = PLAYBACK_SPEEDS
            .iter()
            .map(|speed| {
                let item = doc.create_element("li");
                doc.set_text(item, &format!("{}x", speed));
                doc.append_child(menu, item);
                (*speed, item)
            })
            .collect();

        self.fullscreen_button = Some(Self::make_icon_button(doc, content));

        // Bring every widget in line with the current media state.
        self.update_play_control(doc);
        self.update_position_control(doc, settings);
        self.update_volume_control(doc);
        self.update_fullscreen_control(doc, settings);
        self.update_picture_in_picture_control(doc, settings);
        self.update_speed_control(doc, settings);
        self.update_visibility(doc, settings);
    }

    fn remove(&mut self, doc: &mut Document) {
        self.frame.restore(doc);
        self.content = None;
        self.play_button = None;
        self.mute_button = None;
        self.volume_bar_element = None;
        self.volume_fill = None;
        self.position_text = None;
        self.seek_bar_element = None;
        self.seek_fill = None;
        self.pip_button = None;
        self.speed_button = None;
        self.speed_menu = None;
        self.speed_items.clear();
        self.fullscreen_button = None;
        self.volume_bar_hide_at = None;
        self.speed_menu_hide_at = None;
    }

    fn on_play(&mut self, doc: &mut Document) {
        self.update_play_control(doc);
    }

    fn on_pause(&mut self, doc: &mut Document) {
        self.update_play_control(doc);
    }

    fn on_time_update(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        self.update_position_control(doc, settings);
    }

    fn on_volume_change(&mut self, doc: &mut Document) {
        self.update_volume_control(doc);
    }

    fn on_playback_speed_change(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        self.update_speed_control(doc, settings);
    }

    fn on_fullscreen_change(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        self.update_fullscreen_control(doc, settings);
    }

    fn on_picture_in_picture_change(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        self.update_picture_in_picture_control(doc, settings);
    }

    fn on_update_settings(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        self.update_position_control(doc, settings);
        self.update_fullscreen_control(doc, settings);
        self.update_picture_in_picture_control(doc, settings);
        self.update_speed_control(doc, settings);
        self.update_visibility(doc, settings);
    }

    fn set_hover(&mut self, doc: &mut Document, settings: &PlaybackSettings, hover: bool) {
        self.frame.hover = hover;
        self.update_visibility(doc, settings);
    }

    fn on_tick(&mut self, doc: &mut Document, now: Instant) {
        if let Some(deadline) = self.volume_bar_hide_at {
            if now >= deadline {
                self.volume_bar_hide_at = None;
                if let Some(bar) = self.volume_bar_element {
                    doc.add_class(bar, "hidden");
                }
            }
        }
        if let Some(deadline) = self.speed_menu_hide_at {
            if now >= deadline {
                self.speed_menu_hide_at = None;
                if let Some(menu) = self.speed_menu {
                    doc.add_class(menu, "hidden");
                }
            }
        }
    }
}
