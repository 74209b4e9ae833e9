//! Per-video player session
//!
//! A session is the live binding between one video element and everything
//! the engine attaches to it: its classification result, its controller,
//! its native-event subscriptions and the style adjustments made on the
//! surrounding slots. Sessions are created and destroyed by the detector;
//! they never outlive their video's presence in the registry.
//!
//! Sessions report observed events upward but never write shared state
//! themselves; the detector is the only writer of the shared record.

use crate::classify::{classify_with, Classification, SlotMap, VideoContext};
use crate::controls::{build_controls, VideoControls};
use crate::dom::{Document, EventKind, EventTarget, ListenerId, NodeId, Owner};
use crate::engine::{DetectorTuning, SessionState, VideoKey};
use crate::settings::{AutoplayMode, PlaybackSettings};
use log::debug;
use std::time::Instant;

pub struct PlayerSession {
    key: VideoKey,
    video: NodeId,

    /// Routing token for this session's event subscriptions
    owner: Owner,

    classification: Classification,
    controller: Option<Box<dyn VideoControls>>,
    listeners: Vec<ListenerId>,
    state: SessionState,

    /// Set on the first interaction with the host's own control surface;
    /// gates the stopped-autoplay policy
    user_interacted: bool,

    hover: bool,
}

impl PlayerSession {
    pub fn new(key: VideoKey, video: NodeId, owner: Owner) -> Self {
        Self {
            key,
            video,
            owner,
            classification: Classification {
                context: VideoContext::Reel,
                embedded: false,
                slots: SlotMap::default(),
            },
            controller: None,
            listeners: Vec::new(),
            state: SessionState::Unattached,
            user_interacted: false,
            hover: false,
        }
    }

    pub fn key(&self) -> &VideoKey {
        &self.key
    }

    pub fn video(&self) -> NodeId {
        self.video
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> VideoContext {
        self.classification.context
    }

    pub fn embedded(&self) -> bool {
        self.classification.embedded
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn hovering(&self) -> bool {
        self.hover
    }

    //#region Lifecycle

    /// Classify the video and wire the session up
    ///
    /// Explore-grid videos stay registered but get no controller and no
    /// event subscriptions; the grid is left completely unmodified while
    /// the registry entry keeps them from being re-classified every scan.
    pub fn attach(&mut self, doc: &mut Document, settings: &PlaybackSettings, tuning: &DetectorTuning) {
        self.classification = classify_with(doc, self.video, &tuning.offsets);
        self.state = SessionState::Attached;

        if self.classification.context == VideoContext::Explore {
            debug!("Leaving explore video untouched");
            return;
        }

        let mut controller = build_controls(
            settings.video_control_mode,
            self.video,
            &self.classification,
            tuning.native_control_height,
        );
        controller.create(doc, settings);
        self.controller = Some(controller);

        self.register_events(doc);

        // Pick up the pointer if it is already over the player; otherwise
        // the controls would only appear after the mouse left and re-entered.
        let hover_target = self.classification.slots.root.unwrap_or(self.video);
        let hover = doc.is_hovered(hover_target);
        self.set_hover(doc, settings, hover);

        self.apply_autoplay_policy(doc, settings);
        doc.set_looping(self.video, settings.loop_playback);
    }

    /// Release all subscriptions, remove the controller and revert styles
    pub fn detach(&mut self, doc: &mut Document) {
        for listener in self.listeners.drain(..) {
            doc.remove_listener(listener);
        }
        if let Some(mut controller) = self.controller.take() {
            controller.remove(doc);
        }
        self.state = SessionState::Detached;
    }

    fn register_events(&mut self, doc: &mut Document) {
        let video = EventTarget::Node(self.video);
        for kind in [
            EventKind::Play,
            EventKind::Pause,
            EventKind::Ended,
            EventKind::TimeUpdate,
            EventKind::VolumeChange,
            EventKind::RateChange,
            EventKind::EnterPictureInPicture,
            EventKind::LeavePictureInPicture,
        ] {
            self.listeners
                .push(doc.add_listener(video, kind, false, self.owner));
        }
        self.listeners.push(doc.add_listener(
            EventTarget::Document,
            EventKind::FullscreenChange,
            false,
            self.owner,
        ));

        if let Some(root) = self.classification.slots.root {
            for kind in [EventKind::MouseEnter, EventKind::MouseLeave] {
                self.listeners
                    .push(doc.add_listener(EventTarget::Node(root), kind, false, self.owner));
            }
        }
        if let Some(native_controls) = self.classification.slots.native_controls {
            self.listeners.push(doc.add_listener(
                EventTarget::Node(native_controls),
                EventKind::Click,
                false,
                self.owner,
            ));
        }

        if self.classification.embedded {
            // The embedded page hides the video behind a watch-again banner
            // once it ends and yanks the user to the host site when the tab
            // loses focus. The page's own listeners cannot be enumerated or
            // removed, so they are starved by suppressors instead. Our own
            // `ended` subscription above is registered earlier and still
            // runs.
            self.listeners
                .push(doc.add_suppressor(video, EventKind::Ended, self.owner));
            self.listeners.push(doc.add_suppressor(
                EventTarget::Document,
                EventKind::VisibilityChange,
                self.owner,
            ));
        }
    }

    //#endregion Lifecycle

    //#region Forwarded native events

    /// Playback started; the coordinator has already been notified
    pub fn forward_play(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_play(doc);
        }
        self.apply_autoplay_policy(doc, settings);
    }

    /// Playback paused; returns whether the host's login-overlay cleanup
    /// should run on the next tick (the host inserts it asynchronously
    /// after the pause, so removing it now would miss it)
    pub fn forward_pause(&mut self, doc: &mut Document) -> bool {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_pause(doc);
        }
        self.classification.slots.native_controls.is_some()
    }

    /// Playback ran out; the host ignores the loop attribute and restarts
    /// by script, so without loop enabled the video is pinned down here
    pub fn forward_ended(&mut self, doc: &mut Document) {
        let looping = doc
            .media(self.video)
            .map(|m| m.looping)
            .unwrap_or(false);
        if !looping {
            doc.pause(self.video);
        }
    }

    pub fn forward_time_update(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_time_update(doc, settings);
        }
    }

    pub fn forward_volume_change(&mut self, doc: &mut Document) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_volume_change(doc);
        }
    }

    pub fn forward_rate_change(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_playback_speed_change(doc, settings);
        }
    }

    pub fn forward_fullscreen_change(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_fullscreen_change(doc, settings);
        }
    }

    pub fn forward_picture_in_picture_change(
        &mut self,
        doc: &mut Document,
        settings: &PlaybackSettings,
    ) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_picture_in_picture_change(doc, settings);
        }
    }

    pub fn set_hover(&mut self, doc: &mut Document, settings: &PlaybackSettings, hover: bool) {
        self.hover = hover;
        if let Some(controller) = self.controller.as_mut() {
            controller.set_hover(doc, settings, hover);
        }
    }

    /// First click on the host's own control surface
    ///
    /// Under the stopped autoplay policy the host assumes playback
    /// autostarted, so the first click pauses an already-paused video and
    /// the user would need a second click. Returns true when a deferred
    /// play should bridge that gap.
    pub fn native_control_click(&mut self, doc: &Document) -> bool {
        if self.user_interacted {
            return false;
        }
        self.user_interacted = true;
        doc.media(self.video).map(|m| m.paused).unwrap_or(false)
    }

    /// Deferred cleanup of the "log in to watch again" still frame the host
    /// drops over ended videos
    pub fn remove_login_overlay(&mut self, doc: &mut Document) {
        let Some(native_controls) = self.classification.slots.native_controls else {
            return;
        };
        if let Some(first) = doc.first_child(native_controls) {
            if doc.tag(first) == "img" {
                debug!("Removing login-overlay still frame");
                doc.remove(first);
            }
        }
    }

    /// A control-bar setting changed; no teardown needed
    pub fn update_control_setting(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_update_settings(doc, settings);
        }
        doc.set_looping(self.video, settings.loop_playback);
    }

    /// Cooperative timer pump, forwarded to the controller
    pub fn on_tick(&mut self, doc: &mut Document, now: Instant) {
        if let Some(controller) = self.controller.as_mut() {
            controller.on_tick(doc, now);
        }
    }

    //#endregion Forwarded native events

    /// Under the stopped policy an untouched video is pinned at the start,
    /// paused and unmuted (audio is safe, nothing actually autoplays)
    fn apply_autoplay_policy(&mut self, doc: &mut Document, settings: &PlaybackSettings) {
        if settings.autoplay_mode == AutoplayMode::Stopped && !self.user_interacted {
            doc.pause(self.video);
            doc.set_current_time(self.video, 0.0);
            doc.set_muted(self.video, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::settings::ControlMode;

    /// A reel-like page: wrapper, video, overlay with an inner layer.
    fn reel_page(doc: &mut Document, src: &str) -> NodeId {
        let wrap = doc.create_element("div");
        doc.append_child(doc.body(), wrap);
        let video = doc.create_video(src);
        doc.append_child(wrap, video);
        doc.set_duration(video, 30.0);
        let overlay = doc.create_element("div");
        doc.append_child(wrap, overlay);
        let inner = doc.create_element("div");
        doc.append_child(overlay, inner);
        video
    }

    fn attach_session(
        doc: &mut Document,
        video: NodeId,
        settings: &PlaybackSettings,
    ) -> PlayerSession {
        let key = VideoKey::for_video(doc, video);
        let mut session = PlayerSession::new(key, video, Owner(1));
        session.attach(doc, settings, &DetectorTuning::default());
        session
    }

    #[test]
    fn test_attach_detach_lifecycle() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let settings = PlaybackSettings::default();

        let mut session = attach_session(&mut doc, video, &settings);
        assert_eq!(session.state(), SessionState::Attached);
        assert!(session.has_controller());
        assert!(session.listener_count() > 0);

        session.detach(&mut doc);
        assert_eq!(session.state(), SessionState::Detached);
        assert!(!session.has_controller());
        assert_eq!(session.listener_count(), 0);
    }

    #[test]
    fn test_explore_videos_stay_untouched() {
        let mut doc = Document::new();
        let anchor = doc.create_element("a");
        doc.append_child(doc.body(), anchor);
        let video = doc.create_video("tile.mp4");
        doc.append_child(anchor, video);
        let settings = PlaybackSettings::default();

        let listeners_before = doc.listener_count();
        let session = attach_session(&mut doc, video, &settings);

        assert_eq!(session.context(), VideoContext::Explore);
        assert!(!session.has_controller());
        assert_eq!(session.listener_count(), 0);
        assert_eq!(doc.listener_count(), listeners_before);
    }

    #[test]
    fn test_detach_reverts_styles_and_listeners() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let overlay = doc.next_sibling(video).unwrap();
        let inner = doc.first_child(overlay).unwrap();
        let settings = PlaybackSettings::default();

        let mut session = attach_session(&mut doc, video, &settings);
        assert!(doc.style(inner, "height").is_some());

        session.detach(&mut doc);
        assert_eq!(doc.style(inner, "height"), None);
        assert_eq!(doc.listener_count(), 0);

        // A post-detach native event reaches nobody.
        doc.play(video);
        assert!(doc.drain_deliveries().is_empty());
    }

    #[test]
    fn test_embedded_suppressors_starve_host_listeners() {
        let mut doc = Document::new();
        let marker = doc.create_element("div");
        doc.add_class(marker, "EmbedVideo");
        doc.append_child(doc.body(), marker);
        let mid = doc.create_element("div");
        doc.append_child(marker, mid);
        let wrap = doc.create_element("div");
        doc.append_child(mid, wrap);
        let video = doc.create_video("embed.mp4");
        doc.append_child(wrap, video);
        doc.set_duration(video, 10.0);
        let overlay = doc.create_element("div");
        doc.append_child(wrap, overlay);

        let settings = PlaybackSettings::default();
        let mut session = attach_session(&mut doc, video, &settings);
        assert!(session.embedded());

        // The host page registers its watch-again handler after us.
        let host = Owner(999);
        doc.add_listener(EventTarget::Node(video), EventKind::Ended, false, host);
        doc.add_listener(EventTarget::Document, EventKind::VisibilityChange, false, host);

        doc.play(video);
        doc.drain_deliveries();
        doc.finish_playback(video);
        doc.notify_visibility_change();

        let deliveries = doc.drain_deliveries();
        assert!(deliveries.iter().all(|d| d.owner != host));
        // Our own ended subscription still fires.
        assert!(deliveries
            .iter()
            .any(|d| d.owner == session.owner() && d.event.kind == EventKind::Ended));

        session.detach(&mut doc);
    }

    #[test]
    fn test_ended_pauses_without_loop() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let settings = PlaybackSettings::default();
        let mut session = attach_session(&mut doc, video, &settings);

        doc.play(video);
        doc.drain_deliveries();
        doc.finish_playback(video);
        doc.drain_deliveries();
        session.forward_ended(&mut doc);

        assert!(doc.media(video).unwrap().paused);
    }

    #[test]
    fn test_loop_setting_applied_at_attach() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let mut settings = PlaybackSettings::default();
        settings.loop_playback = true;

        let _session = attach_session(&mut doc, video, &settings);
        assert!(doc.media(video).unwrap().looping);
    }

    #[test]
    fn test_stopped_policy_resets_untouched_video() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let mut settings = PlaybackSettings::default();
        settings.autoplay_mode = AutoplayMode::Stopped;

        // The host autostarts before we attach.
        doc.play(video);
        doc.set_current_time(video, 3.0);
        doc.set_muted(video, true);

        let mut session = attach_session(&mut doc, video, &settings);
        let media = doc.media(video).unwrap();
        assert!(media.paused);
        assert_eq!(media.current_time, 0.0);
        assert!(!media.muted);

        // After the first interaction the policy stops interfering.
        assert!(session.native_control_click(&doc));
        doc.play(video);
        session.forward_play(&mut doc, &settings);
        assert!(!doc.media(video).unwrap().paused);
    }

    #[test]
    fn test_initial_hover_is_detected() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let root = doc.parent(video).unwrap();
        // Mark hovered without routing the enter event anywhere.
        doc.set_hovered(root, true);
        doc.drain_deliveries();

        let settings = PlaybackSettings::default();
        let session = attach_session(&mut doc, video, &settings);
        assert!(session.hovering());
    }

    #[test]
    fn test_login_overlay_removal() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let settings = PlaybackSettings::default();
        let mut session = attach_session(&mut doc, video, &settings);

        // The host drops a still frame into its control row after pause.
        let slot = doc
            .next_sibling(video)
            .and_then(|overlay| doc.first_child(overlay))
            .unwrap();
        let still = doc.create_element("img");
        doc.append_child(slot, still);

        session.remove_login_overlay(&mut doc);
        assert!(!doc.is_connected(still));

        // Nothing left to remove; a second pass is harmless.
        session.remove_login_overlay(&mut doc);
    }

    #[test]
    fn test_disabled_mode_builds_inert_controller() {
        let mut doc = Document::new();
        let video = reel_page(&mut doc, "clip.mp4");
        let overlay = doc.next_sibling(video).unwrap();
        let inner = doc.first_child(overlay).unwrap();
        let mut settings = PlaybackSettings::default();
        settings.video_control_mode = ControlMode::Disabled;

        let session = attach_session(&mut doc, video, &settings);
        assert!(session.has_controller());
        // No layout adjustments in disabled mode.
        assert_eq!(doc.style(inner, "height"), None);
    }
}
