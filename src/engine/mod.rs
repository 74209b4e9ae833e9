//! Player engine for Feedbar
//!
//! This module binds everything together: the per-video [`PlayerSession`]
//! adapter and the [`VideoDetector`], which owns the session registry, the
//! scan scheduling and the cross-video synchronization protocol.
//!
//! Everything here is single-threaded and cooperative. The detector's
//! [`VideoDetector::tick`] is the one entry point; a recurring timer and an
//! optional mutation signal both funnel into it, and it is idempotent, so
//! calling it redundantly is always safe.

mod detector;
mod session;

pub use detector::VideoDetector;
pub use session::PlayerSession;

use crate::classify::ClassifierOffsets;
use crate::controls::NATIVE_CONTROL_HEIGHT;
use crate::dom::{Document, NodeId};
use std::time::Duration;

/// Identity of a video across scan cycles
///
/// The source locator is the stable-enough key; a video the host page has
/// not given a source yet falls back to its element identity. A source
/// swap without a node replacement therefore reads as one video vanishing
/// and another appearing, which tears the session down and rebuilds it --
/// accepted, since nothing sturdier exists on this page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoKey {
    Source(String),
    Element(NodeId),
}

impl VideoKey {
    /// The key for a live video element
    pub fn for_video(doc: &Document, video: NodeId) -> Self {
        match doc.media(video) {
            Some(media) if !media.src.is_empty() => VideoKey::Source(media.src.clone()),
            _ => VideoKey::Element(video),
        }
    }
}

/// Lifecycle of a player session; `Detached` is terminal, rebuilds create
/// a fresh session object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unattached,
    Attached,
    Detached,
}

/// Tunable timings and offsets of the detector
///
/// The defaults are live-tuned values: the host page's corrective volume
/// write lands within one tick of playback starting, hence the tens-of-
/// milliseconds suppression window; the scan interval of one second is the
/// compromise between responsiveness and the cost of walking a very large,
/// churning tree.
#[derive(Debug, Clone)]
pub struct DetectorTuning {
    /// Period of the recurring scan timer
    pub scan_interval: Duration,

    /// How long after a play event host-driven volume writes are reverted
    pub volume_suppression_window: Duration,

    /// How long the silent-audio autoplay probe waits for playback to start
    pub autoplay_probe_timeout: Duration,

    /// Height reserved for the native control bar variant
    pub native_control_height: f64,

    /// Structural-classifier hop counts
    pub offsets: ClassifierOffsets,
}

impl Default for DetectorTuning {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(1),
            volume_suppression_window: Duration::from_millis(50),
            autoplay_probe_timeout: Duration::from_millis(100),
            native_control_height: NATIVE_CONTROL_HEIGHT,
            offsets: ClassifierOffsets::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_key_prefers_source() {
        let mut doc = Document::new();
        let video = doc.create_video("https://cdn.example/a.mp4");
        doc.append_child(doc.body(), video);

        assert_eq!(
            VideoKey::for_video(&doc, video),
            VideoKey::Source("https://cdn.example/a.mp4".to_string())
        );
    }

    #[test]
    fn test_video_key_falls_back_to_element() {
        let mut doc = Document::new();
        let video = doc.create_video("");
        doc.append_child(doc.body(), video);

        assert_eq!(VideoKey::for_video(&doc, video), VideoKey::Element(video));
    }

    #[test]
    fn test_default_tuning() {
        let tuning = DetectorTuning::default();
        assert_eq!(tuning.scan_interval, Duration::from_secs(1));
        assert!(tuning.volume_suppression_window < tuning.scan_interval);
    }
}
