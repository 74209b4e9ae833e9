//! Attach/detach scenarios against full synthetic pages

use feedbar::settings::{ControlMode, JsonFileStore, Settings};
use feedbar::{DetectorTuning, Document, VideoContext, VideoDetector, VideoKey};
use feedbar_integration_tests::{add_explore_tile, add_post, add_reel};

fn detector() -> VideoDetector {
    VideoDetector::new(Settings::in_memory(), DetectorTuning::default())
}

fn key(src: &str) -> VideoKey {
    VideoKey::Source(src.to_string())
}

#[test]
fn mixed_page_attaches_by_context() {
    let mut doc = Document::new();
    let post = add_post(&mut doc, "post.mp4");
    let reel = add_reel(&mut doc, "reel.mp4");
    let tile = add_explore_tile(&mut doc, "tile.mp4");

    let mut detector = detector();
    detector.init(&mut doc);
    detector.tick(&mut doc);

    assert_eq!(detector.session_count(), 3);
    assert_eq!(
        detector.session(&key("reel.mp4")).unwrap().context(),
        VideoContext::Reel
    );
    assert_eq!(
        detector.session(&key("post.mp4")).unwrap().context(),
        VideoContext::Post
    );

    // The explore tile is registered (so it is not re-classified every
    // scan) but carries no controller and no subscriptions.
    let explore = detector.session(&key("tile.mp4")).unwrap();
    assert_eq!(explore.context(), VideoContext::Explore);
    assert!(!explore.has_controller());
    assert_eq!(explore.listener_count(), 0);

    // Shared state still reaches every video, the explore tile included.
    let muted: Vec<bool> = [post.video, reel.video, tile]
        .iter()
        .map(|v| doc.media(*v).unwrap().muted)
        .collect();
    assert_eq!(muted, vec![true, true, true]);
}

#[test]
fn post_classification_via_native_mute_row() {
    let mut doc = Document::new();
    // A post whose article marker is missing, but whose control row carries
    // the host mute button: the slot probe still yields Post.
    let reel = add_reel(&mut doc, "clip.mp4");
    let spacer = doc.create_element("div");
    doc.append_child(reel.native_controls, spacer);
    let mute_wrap = doc.create_element("div");
    doc.append_child(reel.native_controls, mute_wrap);
    let button = doc.create_element("button");
    doc.append_child(mute_wrap, button);

    let mut detector = detector();
    detector.tick(&mut doc);

    let session = detector.session(&key("clip.mp4")).unwrap();
    assert_eq!(session.context(), VideoContext::Post);
    // The host's own mute toggle is hidden while we are attached.
    assert_eq!(doc.style(mute_wrap, "display"), Some("none"));

    doc.remove(reel.video);
    detector.tick(&mut doc);
    assert_eq!(doc.style(mute_wrap, "display"), None);
}

#[test]
fn teardown_reverts_all_layout_changes() {
    let mut doc = Document::new();
    let reel = add_reel(&mut doc, "clip.mp4");

    let mut detector = detector();
    detector.tick(&mut doc);

    assert_eq!(
        doc.style(reel.native_controls, "height"),
        Some("calc(100% - 32px)")
    );
    assert!(doc.listener_count() > 0);

    doc.remove(reel.video);
    detector.tick(&mut doc);

    assert_eq!(doc.style(reel.native_controls, "height"), None);
    assert_eq!(doc.listener_count(), 0);

    // Triggering what used to be subscribed produces no deliveries.
    doc.set_hovered(reel.root, true);
    assert!(doc.drain_deliveries().is_empty());
}

#[test]
fn control_mode_cycle_rebuilds_cleanly() {
    let mut doc = Document::new();
    let reel = add_reel(&mut doc, "clip.mp4");
    let mut detector = detector();
    detector.tick(&mut doc);

    // Custom mode mounted a widget tree inside the overlay.
    assert!(doc.child_count(reel.overlay) > 1);

    detector.settings_mut().set_control_mode(ControlMode::Native);
    detector.tick(&mut doc);
    // The custom widgets are gone; the height reservation remains.
    assert_eq!(doc.child_count(reel.overlay), 2);
    assert_eq!(
        doc.style(reel.native_controls, "height"),
        Some("calc(100% - 70px)")
    );

    detector.settings_mut().set_control_mode(ControlMode::Disabled);
    detector.tick(&mut doc);
    // Disabled mode leaves the page untouched.
    assert_eq!(doc.child_count(reel.overlay), 1);
    assert_eq!(doc.style(reel.native_controls, "height"), None);

    assert_eq!(detector.session_count(), 1);
}

#[test]
fn settings_persist_across_page_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    // First page load: the user drags the volume up.
    {
        let mut doc = Document::new();
        let reel = add_reel(&mut doc, "a.mp4");
        let store = JsonFileStore::new(path.clone());
        let mut detector = VideoDetector::new(
            Settings::new(Box::new(store)),
            DetectorTuning::default(),
        );
        detector.init(&mut doc);
        detector.tick(&mut doc);

        doc.apply_volume(reel.video, 0.7, false);
        detector.tick(&mut doc);
        assert_eq!(detector.settings().data().last_playback_volume, 0.7);
    }

    // Second page load: the stored volume comes back and reaches the
    // videos; mute does not persist and stays on.
    {
        let mut doc = Document::new();
        let reel = add_reel(&mut doc, "b.mp4");
        let store = JsonFileStore::new(path);
        let mut detector = VideoDetector::new(
            Settings::new(Box::new(store)),
            DetectorTuning::default(),
        );
        detector.init(&mut doc);
        detector.tick(&mut doc);

        let media = doc.media(reel.video).unwrap();
        assert_eq!(media.volume, 0.7);
        assert!(media.muted);
    }
}

#[test]
fn external_store_change_switches_control_mode() {
    let (store, remote) = feedbar::settings::MemoryStore::with_external_changes();
    let mut doc = Document::new();
    let reel = add_reel(&mut doc, "a.mp4");
    let mut detector =
        VideoDetector::new(Settings::new(Box::new(store)), DetectorTuning::default());
    detector.init(&mut doc);
    detector.tick(&mut doc);
    assert!(doc.child_count(reel.overlay) > 1);

    // The popup (another context) flips the mode in the shared area.
    let mut data = detector.settings().data().clone();
    data.video_control_mode = ControlMode::Disabled;
    remote.send(data).unwrap();

    detector.tick(&mut doc);
    assert_eq!(doc.child_count(reel.overlay), 1);
}
