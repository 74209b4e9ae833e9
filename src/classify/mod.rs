//! Structural classification of host-page videos
//!
//! The host page ships no stable ids, no semantic class names and no
//! versioned markup, so the only way to tell a feed post from a reel or a
//! story is to look at the shape of the tree around the video element. This
//! module is a set of pure functions over [`Document`]: ancestor tag walks
//! for the presentation context, fixed-depth-then-sibling probes for the
//! layout slots the controls need to claim or hide.
//!
//! Every probe is fail-open. A missing ancestor or sibling never raises; it
//! just means "slot absent" and classification continues with the reel
//! default and minimal adjustments. The page may assume a different shape
//! than expected at any moment and the worst acceptable outcome is a video
//! without custom controls, not a broken page.
//!
//! The hop counts below are guesses against one generated layout and are
//! expected to need retuning when the page changes; they live in
//! [`ClassifierOffsets`] rather than inline at the call sites for exactly
//! that reason.

use crate::dom::{Document, NodeId};

/// Presentation context of a video, inferred from its surrounding structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoContext {
    /// A post on the main feed or a direct post link
    Post,

    /// A reel; also the default when nothing else can be proven
    Reel,

    /// A story in the regular desktop layout
    Story,

    /// A story in the small mobile layout with click-through navigation
    MobileStory,

    /// A preview tile on the explore grid; left completely unmodified
    Explore,
}

/// Optional layout regions discovered around a video
///
/// Not every context has every slot; absence is the normal case, not an
/// error. All ids point into the live document and are only valid until the
/// host page rebuilds the subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotMap {
    /// Container the video sits in; fullscreen requests target this
    pub root: Option<NodeId>,

    /// The host's overlay region next to the video; custom controls mount here
    pub overlay: Option<NodeId>,

    /// First row inside the overlay holding the host's own controls
    pub native_controls: Option<NodeId>,

    /// Reply region below stories; needs a margin so it clears the control bar
    pub reply: Option<NodeId>,

    /// Invisible previous/next click areas of mobile stories
    pub click_area: Option<NodeId>,

    /// The host's own mute toggle inside posts; hidden while attached
    pub native_mute: Option<NodeId>,

    /// Absolutely-positioned control cluster of mobile reels
    pub mobile_overlay: Option<NodeId>,
}

/// Result of classifying one video element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub context: VideoContext,

    /// Whether the video sits on an embedded (iframe) page
    pub embedded: bool,

    pub slots: SlotMap,
}

/// Tunable ancestor-hop counts and markers for slot discovery
///
/// These constants encode the host page's generated layout as observed on a
/// live target. They are data, not contract: adjust them when the page
/// changes, and expect probes to miss in the meantime.
#[derive(Debug, Clone)]
pub struct ClassifierOffsets {
    /// Hops from the video to the container used as the fullscreen root
    pub root_hops: usize,

    /// Hops from the video to the element whose class marks an embed page
    pub embed_hops: usize,

    /// Class name marking embedded (iframe) pages
    pub embed_marker: String,

    /// Hops from the video to the parent whose next sibling wraps the
    /// mobile-reel control cluster
    pub mobile_overlay_hops: usize,

    /// Hops from the video to the parent whose next sibling holds the
    /// story click-through areas
    pub click_area_hops: usize,

    /// Hops from the video to the parent whose next sibling holds the
    /// social-action buttons
    pub social_hops: usize,
}

impl Default for ClassifierOffsets {
    fn default() -> Self {
        Self {
            root_hops: 1,
            embed_hops: 3,
            embed_marker: "EmbedVideo".to_string(),
            mobile_overlay_hops: 4,
            click_area_hops: 5,
            social_hops: 7,
        }
    }
}

/// Classify a video with the default offsets
pub fn classify(doc: &Document, video: NodeId) -> Classification {
    classify_with(doc, video, &ClassifierOffsets::default())
}

/// Classify a video element from its position in the live tree
pub fn classify_with(doc: &Document, video: NodeId, offsets: &ClassifierOffsets) -> Classification {
    let mut context = walk_context(doc, video);
    let mut slots = SlotMap::default();

    // Embed detection is independent of the context walk.
    let embedded = doc
        .nth_ancestor(video, offsets.embed_hops)
        .map(|node| doc.has_class(node, &offsets.embed_marker))
        .unwrap_or(false);

    // The host's overlay is the video's next sibling, its own control row
    // the overlay's first child.
    slots.overlay = doc.next_sibling(video);
    slots.native_controls = slots.overlay.and_then(|overlay| doc.first_child(overlay));

    // The click-through areas of mobile stories. The element exists in the
    // desktop layout too, but stays empty there.
    slots.click_area = doc
        .nth_ancestor(video, offsets.click_area_hops)
        .and_then(|node| doc.next_sibling(node));

    // The social-action buttons distinguish stories from reels: in stories
    // the icons sit two div layers deep, in reels only one. A missing probe
    // target leaves the reel default in place.
    let social = doc
        .nth_ancestor(video, offsets.social_hops)
        .and_then(|node| doc.next_sibling(node));
    if let Some(social) = social {
        let icons = doc
            .first_child(social)
            .and_then(|child| doc.first_child(child));
        if icons.map(|node| doc.tag(node) == "div").unwrap_or(false) {
            // Only the mobile story layout populates the click areas.
            let mobile = slots
                .click_area
                .map(|area| doc.child_count(area) > 0)
                .unwrap_or(false);
            context = if mobile {
                VideoContext::MobileStory
            } else {
                VideoContext::Story
            };
            slots.reply = doc.first_child(social);
        }
    }

    // The host's mute toggle inside posts. Its position in the control row
    // shifts, but it is the first child wrapping a <button>; finding one is
    // also the strongest post signal there is, stronger than the walk above.
    if let Some(native_controls) = slots.native_controls {
        if doc.child_count(native_controls) > 1 {
            for child in doc.children(native_controls) {
                let is_button = doc
                    .first_child(*child)
                    .map(|inner| doc.tag(inner) == "button")
                    .unwrap_or(false);
                if is_button {
                    context = VideoContext::Post;
                    slots.native_mute = Some(*child);
                    break;
                }
            }
        }
    }

    // Mobile-reel control cluster.
    slots.mobile_overlay = doc
        .nth_ancestor(video, offsets.mobile_overlay_hops)
        .and_then(|node| doc.next_sibling(node))
        .and_then(|node| doc.first_child(node));

    // Fullscreen root.
    slots.root = doc.nth_ancestor(video, offsets.root_hops);

    Classification {
        context,
        embedded,
        slots,
    }
}

/// Ancestor tag walk for the coarse context
///
/// The first `<article>` on the way up wins over any `<a>` further out,
/// because posts can be wrapped in anchors.
fn walk_context(doc: &Document, video: NodeId) -> VideoContext {
    let mut current = Some(video);
    while let Some(node) = current {
        match doc.tag(node) {
            "article" => return VideoContext::Post,
            "a" => return VideoContext::Explore,
            _ => {}
        }
        current = doc.parent(node);
    }
    VideoContext::Reel
}
