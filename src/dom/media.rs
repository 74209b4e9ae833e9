//! Media element state and mutation API
//!
//! Every mutation goes through [`Document`] and enqueues the same native
//! events a real media element would fire, regardless of whether the write
//! came from the user, the engine or the host page's own scripts. The
//! engine's synchronization protocol relies on exactly that: it observes
//! `volumechange` events without knowing who caused them and filters out
//! unwanted ones downstream.

use super::{Document, EventKind, EventTarget, NodeId, PageEvent};

/// Playback state of one `<video>` or `<audio>` element
#[derive(Debug, Clone)]
pub struct MediaState {
    /// Resource locator; may legitimately be empty while the host page is
    /// still wiring the element up
    pub src: String,

    /// Whether playback is paused
    pub paused: bool,

    /// Current position in seconds
    pub current_time: f64,

    /// Duration in seconds; NaN until metadata is known
    pub duration: f64,

    /// Volume in 0.0..=1.0
    pub volume: f64,

    /// Muted flag, tracked independently of the volume
    pub muted: bool,

    /// Playback speed multiplier
    pub playback_rate: f64,

    /// Loop flag; note the host page ignores this and restarts by script,
    /// which the engine compensates for on `ended`
    pub looping: bool,

    /// Whether the element shows its native browser controls
    pub controls: bool,

    /// Whether the element wants to start playback on insertion
    pub autoplay: bool,
}

impl MediaState {
    fn new(src: &str) -> Self {
        Self {
            src: src.to_string(),
            paused: true,
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            looping: false,
            controls: false,
            autoplay: false,
        }
    }

    /// Playback progress as a 0.0..=1.0 fraction; 0.0 until metadata is known
    pub fn progress(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Document {
    /// Create an unlinked `<video>` element
    pub fn create_video(&mut self, src: &str) -> NodeId {
        let id = self.create_element("video");
        self.node_mut(id).media = Some(MediaState::new(src));
        id
    }

    /// Create an unlinked `<audio>` element
    pub fn create_audio(&mut self, src: &str, autoplay: bool) -> NodeId {
        let id = self.create_element("audio");
        let mut media = MediaState::new(src);
        media.autoplay = autoplay;
        self.node_mut(id).media = Some(media);
        id
    }

    /// Media state of an element, if it is a media element
    pub fn media(&self, id: NodeId) -> Option<&MediaState> {
        self.node(id).and_then(|n| n.media.as_ref())
    }

    fn media_mut(&mut self, id: NodeId) -> Option<&mut MediaState> {
        if self.contains(id) {
            self.node_mut(id).media.as_mut()
        } else {
            None
        }
    }

    fn fire(&mut self, id: NodeId, kind: EventKind) {
        self.enqueue(PageEvent {
            target: EventTarget::Node(id),
            kind,
        });
    }

    //#region Playback

    /// Start playback
    pub fn play(&mut self, id: NodeId) {
        let started = match self.media_mut(id) {
            Some(media) if media.paused => {
                media.paused = false;
                true
            }
            _ => false,
        };
        if started {
            self.fire(id, EventKind::Play);
        }
    }

    /// Pause playback
    pub fn pause(&mut self, id: NodeId) {
        let stopped = match self.media_mut(id) {
            Some(media) if !media.paused => {
                media.paused = true;
                true
            }
            _ => false,
        };
        if stopped {
            self.fire(id, EventKind::Pause);
        }
    }

    /// Seek to an absolute position, clamped to the known duration
    pub fn set_current_time(&mut self, id: NodeId, seconds: f64) {
        let seeked = match self.media_mut(id) {
            Some(media) => {
                let max = if media.duration.is_finite() {
                    media.duration
                } else {
                    f64::INFINITY
                };
                media.current_time = seconds.clamp(0.0, max);
                true
            }
            None => false,
        };
        if seeked {
            self.fire(id, EventKind::TimeUpdate);
        }
    }

    /// Run playback into the end of the media
    ///
    /// With the loop flag set the element restarts seamlessly and no `ended`
    /// fires; otherwise the element pauses and `ended` follows, mirroring
    /// native behavior.
    pub fn finish_playback(&mut self, id: NodeId) {
        enum Outcome {
            Looped,
            Ended { was_playing: bool },
        }
        let outcome = match self.media_mut(id) {
            Some(media) if media.looping => {
                media.current_time = 0.0;
                Outcome::Looped
            }
            Some(media) => {
                if media.duration.is_finite() {
                    media.current_time = media.duration;
                }
                let was_playing = !media.paused;
                media.paused = true;
                Outcome::Ended { was_playing }
            }
            None => return,
        };
        match outcome {
            Outcome::Looped => self.fire(id, EventKind::TimeUpdate),
            Outcome::Ended { was_playing } => {
                if was_playing {
                    self.fire(id, EventKind::Pause);
                }
                self.fire(id, EventKind::Ended);
            }
        }
    }

    /// If the element wants to autoplay, start it subject to the
    /// environment's unmuted-autoplay policy
    pub fn try_autoplay(&mut self, id: NodeId) {
        let Some(media) = self.media(id) else {
            return;
        };
        if !media.autoplay {
            return;
        }
        if media.muted || self.unmuted_autoplay_allowed {
            self.play(id);
        }
    }

    //#endregion Playback

    //#region Volume & speed

    /// Set the volume; fires `volumechange` when the value actually changes
    pub fn set_volume(&mut self, id: NodeId, volume: f64) {
        self.apply_volume_internal(id, Some(volume), None);
    }

    /// Set the muted flag; fires `volumechange` when the value actually changes
    pub fn set_muted(&mut self, id: NodeId, muted: bool) {
        self.apply_volume_internal(id, None, Some(muted));
    }

    /// Write a volume/mute pair in one step, firing at most one event
    pub fn apply_volume(&mut self, id: NodeId, volume: f64, muted: bool) {
        self.apply_volume_internal(id, Some(volume), Some(muted));
    }

    fn apply_volume_internal(&mut self, id: NodeId, volume: Option<f64>, muted: Option<bool>) {
        let changed = match self.media_mut(id) {
            Some(media) => {
                let volume = volume.map(|v| v.clamp(0.0, 1.0)).unwrap_or(media.volume);
                let muted = muted.unwrap_or(media.muted);
                let changed = media.volume != volume || media.muted != muted;
                media.volume = volume;
                media.muted = muted;
                changed
            }
            None => false,
        };
        if changed {
            self.fire(id, EventKind::VolumeChange);
        }
    }

    /// Set the playback speed; fires `ratechange` when the value changes
    pub fn set_playback_rate(&mut self, id: NodeId, rate: f64) {
        let changed = match self.media_mut(id) {
            Some(media) if media.playback_rate != rate => {
                media.playback_rate = rate;
                true
            }
            _ => false,
        };
        if changed {
            self.fire(id, EventKind::RateChange);
        }
    }

    //#endregion Volume & speed

    //#region Flags & metadata

    /// Set the loop flag (no native event)
    pub fn set_looping(&mut self, id: NodeId, looping: bool) {
        if let Some(media) = self.media_mut(id) {
            media.looping = looping;
        }
    }

    /// Toggle the element's native browser controls (no native event)
    pub fn set_controls(&mut self, id: NodeId, controls: bool) {
        if let Some(media) = self.media_mut(id) {
            media.controls = controls;
        }
    }

    /// Host-side: announce the media duration
    pub fn set_duration(&mut self, id: NodeId, seconds: f64) {
        if let Some(media) = self.media_mut(id) {
            media.duration = seconds;
        }
    }

    /// Host-side: swap the media resource without replacing the node
    pub fn set_src(&mut self, id: NodeId, src: &str) {
        if let Some(media) = self.media_mut(id) {
            media.src = src.to_string();
        }
    }

    //#endregion Flags & metadata

    //#region Fullscreen & Picture-in-Picture

    /// Whether fullscreen is available in this context (iframes may deny it)
    pub fn fullscreen_enabled(&self) -> bool {
        self.fullscreen_enabled
    }

    /// Whether Picture-in-Picture is available in this browser
    pub fn picture_in_picture_enabled(&self) -> bool {
        self.picture_in_picture_enabled
    }

    /// Environment setup: toggle the fullscreen capability
    pub fn set_fullscreen_enabled(&mut self, enabled: bool) {
        self.fullscreen_enabled = enabled;
    }

    /// Environment setup: toggle the Picture-in-Picture capability
    pub fn set_picture_in_picture_enabled(&mut self, enabled: bool) {
        self.picture_in_picture_enabled = enabled;
    }

    /// Environment setup: allow or deny autoplay with audible audio
    pub fn set_unmuted_autoplay_allowed(&mut self, allowed: bool) {
        self.unmuted_autoplay_allowed = allowed;
    }

    /// The element currently presented fullscreen
    pub fn fullscreen_element(&self) -> Option<NodeId> {
        self.fullscreen_element
    }

    /// The element currently in Picture-in-Picture
    pub fn picture_in_picture_element(&self) -> Option<NodeId> {
        self.picture_in_picture_element
    }

    /// Request fullscreen presentation of an element
    ///
    /// Degrades silently when the capability is unavailable; the engine
    /// hides the corresponding control instead of reporting errors.
    pub fn request_fullscreen(&mut self, id: NodeId) {
        if !self.fullscreen_enabled || !self.contains(id) {
            return;
        }
        self.fullscreen_element = Some(id);
        self.enqueue(PageEvent {
            target: EventTarget::Document,
            kind: EventKind::FullscreenChange,
        });
    }

    /// Leave fullscreen presentation
    pub fn exit_fullscreen(&mut self) {
        if self.fullscreen_element.take().is_some() {
            self.enqueue(PageEvent {
                target: EventTarget::Document,
                kind: EventKind::FullscreenChange,
            });
        }
    }

    /// Request Picture-in-Picture presentation of a media element
    pub fn request_picture_in_picture(&mut self, id: NodeId) {
        if !self.picture_in_picture_enabled || self.media(id).is_none() {
            return;
        }
        self.picture_in_picture_element = Some(id);
        self.fire(id, EventKind::EnterPictureInPicture);
    }

    /// Leave Picture-in-Picture presentation
    pub fn exit_picture_in_picture(&mut self) {
        if let Some(previous) = self.picture_in_picture_element.take() {
            self.fire(previous, EventKind::LeavePictureInPicture);
        }
    }

    /// Host-side: the tab's visibility changed
    pub fn notify_visibility_change(&mut self) {
        self.enqueue(PageEvent {
            target: EventTarget::Document,
            kind: EventKind::VisibilityChange,
        });
    }

    //#endregion Fullscreen & Picture-in-Picture
}
