//! Video detection and cross-video synchronization
//!
//! The detector owns the registry of player sessions and the shared
//! playback record. Its scan diffs the document's live video elements
//! against the registry by [`VideoKey`], attaching sessions for newcomers
//! and tearing down sessions whose video is gone. The scan is idempotent:
//! running it again without DOM changes attaches and detaches nothing.
//!
//! It is also the coordinator of the volume/mute/speed synchronization
//! protocol. Sessions report what they observe; only the detector decides
//! whether an observation is a genuine user change (update the record,
//! persist, broadcast to every other video), a redundant echo (drop it) or
//! the host page fighting back right after playback starts (revert it --
//! the suppression window).

use crate::dom::{Delivery, Document, EventKind, EventTarget, ListenerId, NodeId, Owner};
use crate::engine::{DetectorTuning, PlayerSession, VideoKey};
use crate::settings::{AutoplayMode, SettingChange, Settings};
use crossbeam_channel::{never, tick, Receiver};
use log::{debug, error, info};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// The zero-length audio resource used by the autoplay capability probe
const SILENT_AUDIO: &str = "audio/silence.mp3";

/// Work postponed to the next tick
enum Deferred {
    /// Remove the host's login-overlay still frame; the host inserts it
    /// asynchronously after the pause event, so same-tick removal misses it
    RemoveLoginOverlay(VideoKey),

    /// Start playback; bridges the host's double-click requirement on the
    /// first interaction under the stopped autoplay policy
    Play(NodeId),
}

/// Who an event-listener token belongs to
#[derive(Clone)]
enum OwnerRole {
    Session(VideoKey),
    AutoplayProbe,
}

/// One-shot silent-audio probe for the unmuted-autoplay capability
struct AutoplayProbe {
    audio: NodeId,
    listener: ListenerId,
    owner: Owner,
    deadline: Instant,
}

pub struct VideoDetector {
    settings: Settings,
    tuning: DetectorTuning,

    sessions: HashMap<VideoKey, PlayerSession>,
    owners: HashMap<Owner, OwnerRole>,
    next_owner: u64,

    /// Last muted state. Deliberately not persisted: browsers refuse
    /// unmuted autoplay without a gesture, so a stored "unmuted" would be
    /// wrong on nearly every load. Only explicit mute signals flip this;
    /// a volume of zero does not.
    last_muted: bool,

    /// While set and in the future, the next reported volume change is
    /// reverted instead of accepted. Armed on every play notification;
    /// cleared by its one corrective re-application or by expiry.
    suppress_volume_until: Option<Instant>,

    deferred: Vec<Deferred>,
    probe: Option<AutoplayProbe>,
    changes: Receiver<SettingChange>,
}

impl VideoDetector {
    pub fn new(mut settings: Settings, tuning: DetectorTuning) -> Self {
        let changes = settings.subscribe();
        Self {
            settings,
            tuning,
            sessions: HashMap::new(),
            owners: HashMap::new(),
            next_owner: 1,
            last_muted: true,
            suppress_volume_until: None,
            deferred: Vec::new(),
            probe: None,
            changes,
        }
    }

    /// Load settings and apply the startup autoplay policy
    pub fn init(&mut self, doc: &mut Document) {
        self.settings.load();

        match self.settings.data().autoplay_mode {
            AutoplayMode::Unmuted => {
                // Only commit to an unmuted default once the browser proves
                // it will actually start audible playback.
                self.start_autoplay_probe(doc, Instant::now());
            }
            AutoplayMode::Stopped => {
                // Nothing autoplays, so defaulting to audio is safe.
                self.last_muted = false;
            }
            AutoplayMode::Muted => {}
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, key: &VideoKey) -> Option<&PlayerSession> {
        self.sessions.get(key)
    }

    /// Whether the suppression window is currently armed
    pub fn suppressing(&self, now: Instant) -> bool {
        self.suppress_volume_until
            .map(|deadline| now < deadline)
            .unwrap_or(false)
    }

    /// The mute flag the coordinator currently considers authoritative
    pub fn last_muted(&self) -> bool {
        self.last_muted
    }

    //#region Scheduling

    /// The single idempotent entry point both trigger sources call
    pub fn tick(&mut self, doc: &mut Document) {
        let now = Instant::now();
        self.run_deferred(doc);
        self.drain_events(doc, now);
        self.settings.poll_external();
        self.apply_setting_changes(doc);
        self.check_probe(doc, now);
        self.scan(doc);
        self.drain_events(doc, now);
        for session in self.sessions.values_mut() {
            session.on_tick(doc, now);
        }
    }

    /// Timer-driven loop; an optional mutation signal serves as a faster
    /// trigger for the same scan routine, and dropping the shutdown sender
    /// ends the loop
    pub fn run(
        &mut self,
        doc: &mut Document,
        mutation_signal: Option<Receiver<()>>,
        shutdown: Receiver<()>,
    ) {
        let ticker = tick(self.tuning.scan_interval);
        let mutations = mutation_signal.unwrap_or_else(never);
        info!(
            "Video detector running, scan interval {:?}",
            self.tuning.scan_interval
        );

        self.tick(doc);
        loop {
            crossbeam_channel::select! {
                recv(ticker) -> _ => self.tick(doc),
                recv(mutations) -> message => match message {
                    Ok(()) => self.tick(doc),
                    // The signal source went away; the timer alone keeps
                    // the scan going.
                    Err(_) => break,
                },
                recv(shutdown) -> _ => {
                    info!("Video detector stopped");
                    return;
                }
            }
        }
        loop {
            crossbeam_channel::select! {
                recv(ticker) -> _ => self.tick(doc),
                recv(shutdown) -> _ => break,
            }
        }
        info!("Video detector stopped");
    }

    fn run_deferred(&mut self, doc: &mut Document) {
        for action in std::mem::take(&mut self.deferred) {
            match action {
                Deferred::RemoveLoginOverlay(key) => {
                    if let Some(session) = self.sessions.get_mut(&key) {
                        session.remove_login_overlay(doc);
                    }
                }
                Deferred::Play(video) => doc.play(video),
            }
        }
    }

    fn drain_events(&mut self, doc: &mut Document, now: Instant) {
        // Routing can enqueue follow-up events (corrective volume writes,
        // broadcasts); keep draining until the page is quiet. The genuine-
        // change filter guarantees this terminates.
        loop {
            let deliveries = doc.drain_deliveries();
            if deliveries.is_empty() {
                break;
            }
            for delivery in deliveries {
                self.route(doc, delivery, now);
            }
        }
    }

    //#endregion Scheduling

    //#region Scan

    /// Diff the document's videos against the registry
    pub fn scan(&mut self, doc: &mut Document) {
        let videos = doc.videos();
        let mut present: HashSet<VideoKey> = HashSet::with_capacity(videos.len());

        for video in videos {
            let key = VideoKey::for_video(doc, video);
            present.insert(key.clone());
            if self.sessions.contains_key(&key) {
                continue;
            }

            let owner = Owner(self.next_owner);
            self.next_owner += 1;
            self.owners.insert(owner, OwnerRole::Session(key.clone()));

            let mut session = PlayerSession::new(key.clone(), video, owner);
            session.attach(doc, self.settings.data(), &self.tuning);
            info!("Attached session for {:?} ({:?})", key, session.context());

            // Bring the newcomer in line with the shared state right away.
            let volume = self.settings.data().last_playback_volume;
            let speed = self.settings.data().last_playback_speed;
            doc.apply_volume(video, volume, self.last_muted);
            doc.set_playback_rate(video, speed);

            self.sessions.insert(key, session);
        }

        let gone: Vec<VideoKey> = self
            .sessions
            .keys()
            .filter(|key| !present.contains(key))
            .cloned()
            .collect();
        for key in gone {
            if let Some(mut session) = self.sessions.remove(&key) {
                session.detach(doc);
                self.owners.remove(&session.owner());
                info!("Detached session for {:?}", key);
            }
        }
    }

    //#endregion Scan

    //#region Event routing

    fn route(&mut self, doc: &mut Document, delivery: Delivery, now: Instant) {
        let Some(role) = self.owners.get(&delivery.owner).cloned() else {
            return;
        };
        match role {
            OwnerRole::AutoplayProbe => {
                if delivery.event.kind == EventKind::Play {
                    self.finish_probe(doc, true);
                }
            }
            OwnerRole::Session(key) => self.route_session_event(doc, key, delivery.event.kind, now),
        }
    }

    fn route_session_event(
        &mut self,
        doc: &mut Document,
        key: VideoKey,
        kind: EventKind,
        now: Instant,
    ) {
        let Some(video) = self.sessions.get(&key).map(|s| s.video()) else {
            return;
        };
        match kind {
            EventKind::Play => {
                // Coordinator first: arming the suppression window must
                // precede anything the controller does with the event.
                self.notify_play(doc, video, now);
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_play(doc, self.settings.data());
                }
            }
            EventKind::Pause => {
                let wants_cleanup = match self.sessions.get_mut(&key) {
                    Some(session) => session.forward_pause(doc),
                    None => false,
                };
                if wants_cleanup {
                    self.deferred.push(Deferred::RemoveLoginOverlay(key));
                }
            }
            EventKind::Ended => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_ended(doc);
                }
            }
            EventKind::TimeUpdate => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_time_update(doc, self.settings.data());
                }
            }
            EventKind::VolumeChange => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_volume_change(doc);
                }
                self.notify_volume_change(doc, &key, video, now);
            }
            EventKind::RateChange => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_rate_change(doc, self.settings.data());
                }
                self.notify_speed_change(doc, &key, video);
            }
            EventKind::FullscreenChange => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_fullscreen_change(doc, self.settings.data());
                }
            }
            EventKind::EnterPictureInPicture | EventKind::LeavePictureInPicture => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.forward_picture_in_picture_change(doc, self.settings.data());
                }
            }
            EventKind::MouseEnter => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.set_hover(doc, self.settings.data(), true);
                }
            }
            EventKind::MouseLeave => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.set_hover(doc, self.settings.data(), false);
                }
            }
            EventKind::Click => {
                let wants_play = match self.sessions.get_mut(&key) {
                    Some(session) => session.native_control_click(doc),
                    None => false,
                };
                if wants_play {
                    self.deferred.push(Deferred::Play(video));
                }
            }
            EventKind::VisibilityChange => {}
        }
    }

    //#endregion Event routing

    //#region Synchronization protocol

    /// Playback started on some session
    ///
    /// The host page is known to reset volume and mute right after play in
    /// the reel player. Arm the one-shot suppression window (re-arming
    /// replaces any pending deadline) and put the last known-good values
    /// back on the element.
    fn notify_play(&mut self, doc: &mut Document, video: NodeId, now: Instant) {
        self.suppress_volume_until = Some(now + self.tuning.volume_suppression_window);
        let volume = self.settings.data().last_playback_volume;
        doc.apply_volume(video, volume, self.last_muted);
    }

    /// A session observed a volume/mute change
    fn notify_volume_change(
        &mut self,
        doc: &mut Document,
        origin: &VideoKey,
        video: NodeId,
        now: Instant,
    ) {
        let Some((volume, muted)) = doc.media(video).map(|m| (m.volume, m.muted)) else {
            return;
        };

        // Redundant echo: identical to the shared record, nothing to do.
        // This is what keeps broadcasts from storming back and forth.
        if self.settings.data().last_playback_volume == volume && self.last_muted == muted {
            return;
        }

        if let Some(deadline) = self.suppress_volume_until.take() {
            if now < deadline {
                // The host's post-play corrective write: revert it once,
                // then the window is spent.
                debug!("Reverting host volume write on {:?}", origin);
                let good_volume = self.settings.data().last_playback_volume;
                doc.apply_volume(video, good_volume, self.last_muted);
                return;
            }
        }

        info!("Volume changed to {:.2} (muted: {})", volume, muted);
        self.settings.set_volume(volume);
        self.last_muted = muted;

        // Sync every other video; the originator already reflects the
        // new state.
        let others: Vec<NodeId> = self
            .sessions
            .iter()
            .filter(|(key, _)| *key != origin)
            .map(|(_, session)| session.video())
            .collect();
        for other in others {
            doc.apply_volume(other, volume, muted);
        }
    }

    /// A session observed a playback-speed change
    fn notify_speed_change(&mut self, doc: &mut Document, origin: &VideoKey, video: NodeId) {
        let Some(rate) = doc.media(video).map(|m| m.playback_rate) else {
            return;
        };
        if self.settings.data().last_playback_speed == rate {
            return;
        }

        info!("Playback speed changed to {}x", rate);
        self.settings.set_speed(rate);

        let others: Vec<NodeId> = self
            .sessions
            .iter()
            .filter(|(key, _)| *key != origin)
            .map(|(_, session)| session.video())
            .collect();
        for other in others {
            doc.set_playback_rate(other, rate);
        }
    }

    //#endregion Synchronization protocol

    //#region Settings changes

    fn apply_setting_changes(&mut self, doc: &mut Document) {
        let changes: Vec<SettingChange> = self.changes.try_iter().collect();
        if changes.is_empty() {
            return;
        }

        let rebuild = changes.contains(&SettingChange::ControlMode);
        let update = changes.iter().any(|c| c.is_control_setting());

        if rebuild {
            // The control mode needs a fresh controller and fresh
            // classification; sessions are replaced, not reused.
            self.rebuild_sessions(doc);
        } else if update {
            for session in self.sessions.values_mut() {
                session.update_control_setting(doc, self.settings.data());
            }
        }
    }

    fn rebuild_sessions(&mut self, doc: &mut Document) {
        info!(
            "Control mode is now {:?}, rebuilding {} sessions",
            self.settings.data().video_control_mode,
            self.sessions.len()
        );
        let keys: Vec<VideoKey> = self.sessions.keys().cloned().collect();
        for key in keys {
            let Some(mut old) = self.sessions.remove(&key) else {
                continue;
            };
            let video = old.video();
            let owner = old.owner();
            old.detach(doc);

            let mut session = PlayerSession::new(key.clone(), video, owner);
            session.attach(doc, self.settings.data(), &self.tuning);
            self.sessions.insert(key, session);
        }
    }

    //#endregion Settings changes

    //#region Autoplay probe

    /// Insert a hidden, silent, autoplaying audio element and wait for its
    /// play event. If it starts within the timeout the browser allows
    /// audible autoplay and the unmuted default is safe; on some browsers
    /// the attempt itself surfaces the permission prompt to the user.
    fn start_autoplay_probe(&mut self, doc: &mut Document, now: Instant) {
        let audio = doc.create_audio(SILENT_AUDIO, true);
        doc.set_style(audio, "display", "none");
        let body = doc.body();
        doc.append_child(body, audio);

        let owner = Owner(self.next_owner);
        self.next_owner += 1;
        self.owners.insert(owner, OwnerRole::AutoplayProbe);
        let listener = doc.add_listener(EventTarget::Node(audio), EventKind::Play, false, owner);

        doc.try_autoplay(audio);

        self.probe = Some(AutoplayProbe {
            audio,
            listener,
            owner,
            deadline: now + self.tuning.autoplay_probe_timeout,
        });
        debug!("Started unmuted-autoplay probe");
    }

    fn check_probe(&mut self, doc: &mut Document, now: Instant) {
        let expired = self
            .probe
            .as_ref()
            .map(|probe| now >= probe.deadline)
            .unwrap_or(false);
        if expired {
            self.finish_probe(doc, false);
        }
    }

    fn finish_probe(&mut self, doc: &mut Document, success: bool) {
        let Some(probe) = self.probe.take() else {
            return;
        };
        doc.remove_listener(probe.listener);
        doc.remove(probe.audio);
        self.owners.remove(&probe.owner);

        if success {
            info!("Unmuted autoplay is available, defaulting to audio");
            self.last_muted = false;
        } else {
            error!(
                "The browser is blocking autoplay with audio; enable autoplay \
                 in the site settings to start videos unmuted"
            );
        }
    }

    //#endregion Autoplay probe
}
