//! Integration test utilities for Feedbar
//!
//! This crate provides the synthetic host-page layouts the scenario tests
//! run against: feed posts, reels, stories in both layouts and explore
//! tiles, built with the same nesting depths the structural classifier
//! probes for.

use feedbar::dom::{Document, NodeId};

/// Handles into one constructed player subtree
pub struct PageVideo {
    pub video: NodeId,
    pub root: NodeId,
    pub overlay: NodeId,
    pub native_controls: NodeId,
}

/// Builds `count` nested divs under `parent`, returning the innermost.
fn nest_divs(doc: &mut Document, parent: NodeId, count: usize) -> NodeId {
    let mut current = parent;
    for _ in 0..count {
        let div = doc.create_element("div");
        doc.append_child(current, div);
        current = div;
    }
    current
}

/// A reel-like player: video plus overlay with an inner control row.
///
/// This is also the shape every context degrades to when the classifier's
/// probes miss, so most scenarios start here.
pub fn add_reel(doc: &mut Document, src: &str) -> PageVideo {
    let wrap = doc.create_element("div");
    doc.append_child(doc.body(), wrap);
    add_player_under(doc, wrap, src)
}

/// A feed-post player: the same subtree nested inside an `<article>`.
pub fn add_post(doc: &mut Document, src: &str) -> PageVideo {
    let article = doc.create_element("article");
    doc.append_child(doc.body(), article);
    let inner = nest_divs(doc, article, 2);
    add_player_under(doc, inner, src)
}

/// An explore tile: a bare video wrapped in an anchor.
pub fn add_explore_tile(doc: &mut Document, src: &str) -> NodeId {
    let anchor = doc.create_element("a");
    doc.append_child(doc.body(), anchor);
    let video = doc.create_video(src);
    doc.append_child(anchor, video);
    video
}

/// An embedded (iframe) reel: the embed marker sits three ancestors up.
pub fn add_embedded_reel(doc: &mut Document, src: &str) -> PageVideo {
    let marker = doc.create_element("div");
    doc.add_class(marker, "EmbedVideo");
    doc.append_child(doc.body(), marker);
    let mid = doc.create_element("div");
    doc.append_child(marker, mid);
    let wrap = doc.create_element("div");
    doc.append_child(mid, wrap);
    add_player_under(doc, wrap, src)
}

fn add_player_under(doc: &mut Document, parent: NodeId, src: &str) -> PageVideo {
    let video = doc.create_video(src);
    doc.append_child(parent, video);
    doc.set_duration(video, 30.0);

    let overlay = doc.create_element("div");
    doc.append_child(parent, overlay);
    let native_controls = doc.create_element("div");
    doc.append_child(overlay, native_controls);

    PageVideo {
        video,
        root: parent,
        overlay,
        native_controls,
    }
}
