//! Cross-video synchronization scenarios, host interference included

use feedbar::dom::{EventKind, EventTarget, Owner};
use feedbar::settings::{AutoplayMode, Settings};
use feedbar::{DetectorTuning, Document, VideoDetector};
use feedbar_integration_tests::{add_embedded_reel, add_reel};
use std::time::Duration;

fn detector_with_window(window_ms: u64) -> VideoDetector {
    let tuning = DetectorTuning {
        volume_suppression_window: Duration::from_millis(window_ms),
        ..DetectorTuning::default()
    };
    VideoDetector::new(Settings::in_memory(), tuning)
}

#[test]
fn volume_follows_the_user_across_the_page() {
    let mut doc = Document::new();
    let a = add_reel(&mut doc, "a.mp4");
    let b = add_reel(&mut doc, "b.mp4");
    let mut detector = detector_with_window(50);
    detector.init(&mut doc);
    detector.tick(&mut doc);

    // The user unmutes and raises the volume on the first video.
    doc.apply_volume(a.video, 0.6, false);
    detector.tick(&mut doc);

    for video in [a.video, b.video] {
        let media = doc.media(video).unwrap();
        assert_eq!(media.volume, 0.6);
        assert!(!media.muted);
    }

    // A video appearing later starts with the synchronized state.
    let c = add_reel(&mut doc, "c.mp4");
    detector.tick(&mut doc);
    let media = doc.media(c.video).unwrap();
    assert_eq!(media.volume, 0.6);
    assert!(!media.muted);
}

#[test]
fn reel_interference_on_play_is_reverted_once() {
    let mut doc = Document::new();
    let reel = add_reel(&mut doc, "reel.mp4");
    let mut detector = detector_with_window(5_000); // generous, test-paced
    detector.init(&mut doc);
    detector.tick(&mut doc);

    doc.apply_volume(reel.video, 0.5, false);
    detector.tick(&mut doc);

    // Playback starts; the host page force-mutes the reel right after.
    doc.play(reel.video);
    detector.tick(&mut doc);
    doc.apply_volume(reel.video, 1.0, true);
    detector.tick(&mut doc);

    // The interference was rolled back instead of synchronized.
    let media = doc.media(reel.video).unwrap();
    assert_eq!(media.volume, 0.5);
    assert!(!media.muted);
    assert_eq!(detector.settings().data().last_playback_volume, 0.5);
}

#[test]
fn speed_selection_spreads_to_every_video() {
    let mut doc = Document::new();
    let a = add_reel(&mut doc, "a.mp4");
    let b = add_reel(&mut doc, "b.mp4");
    let mut detector = detector_with_window(50);
    detector.init(&mut doc);
    detector.tick(&mut doc);

    doc.set_playback_rate(a.video, 1.5);
    detector.tick(&mut doc);

    assert_eq!(doc.media(b.video).unwrap().playback_rate, 1.5);
    assert_eq!(detector.settings().data().last_playback_speed, 1.5);

    // Applying the same speed again changes nothing and syncs nothing.
    doc.set_playback_rate(a.video, 1.5);
    detector.tick(&mut doc);
    assert_eq!(doc.media(b.video).unwrap().playback_rate, 1.5);
}

#[test]
fn embedded_reel_survives_ending_and_tab_switch() {
    let mut doc = Document::new();
    let reel = add_embedded_reel(&mut doc, "embed.mp4");
    let mut detector = detector_with_window(50);
    detector.init(&mut doc);
    detector.tick(&mut doc);

    // The embedded page's own handlers, registered after attach.
    let host = Owner(4242);
    doc.add_listener(
        EventTarget::Node(reel.video),
        EventKind::Ended,
        false,
        host,
    );
    doc.add_listener(
        EventTarget::Document,
        EventKind::VisibilityChange,
        false,
        host,
    );

    doc.play(reel.video);
    detector.tick(&mut doc);
    doc.finish_playback(reel.video);
    doc.notify_visibility_change();

    let host_saw: Vec<_> = doc
        .drain_deliveries()
        .into_iter()
        .filter(|d| d.owner == host)
        .collect();
    assert!(host_saw.is_empty());

    // The video is replayable: paused at the end, not hidden or navigated.
    detector.tick(&mut doc);
    assert!(doc.media(reel.video).unwrap().paused);
    doc.play(reel.video);
    detector.tick(&mut doc);
    assert!(!doc.media(reel.video).unwrap().paused);
}

#[test]
fn looping_is_owned_by_the_engine() {
    let mut doc = Document::new();
    let reel = add_reel(&mut doc, "loop.mp4");
    let mut detector = detector_with_window(50);
    detector.init(&mut doc);
    detector.tick(&mut doc);

    detector
        .settings_mut()
        .set_control_setting(feedbar::SettingChange::LoopPlayback, true);
    detector.tick(&mut doc);
    assert!(doc.media(reel.video).unwrap().looping);

    doc.play(reel.video);
    detector.tick(&mut doc);
    doc.finish_playback(reel.video);
    detector.tick(&mut doc);

    // With loop on, playback restarted seamlessly.
    let media = doc.media(reel.video).unwrap();
    assert!(!media.paused);
    assert_eq!(media.current_time, 0.0);
}

#[test]
fn stopped_autoplay_holds_the_whole_page() {
    let mut doc = Document::new();
    let a = add_reel(&mut doc, "a.mp4");
    let b = add_reel(&mut doc, "b.mp4");

    let mut settings = Settings::in_memory();
    seed(&mut settings, AutoplayMode::Stopped);
    let mut detector = VideoDetector::new(settings, DetectorTuning::default());
    detector.init(&mut doc);

    // The host autostarts everything before we attach.
    doc.play(a.video);
    doc.play(b.video);
    doc.set_current_time(a.video, 4.0);

    detector.tick(&mut doc);

    for video in [a.video, b.video] {
        let media = doc.media(video).unwrap();
        assert!(media.paused);
        assert_eq!(media.current_time, 0.0);
        assert!(!media.muted);
    }
}

fn seed(settings: &mut Settings, mode: AutoplayMode) {
    settings.set_autoplay_mode(mode);
}
