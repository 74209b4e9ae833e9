//! Click-and-drag interaction for control bars
//!
//! The seek bar and the volume bar share one interaction model but differ
//! in when they commit: volume previews live while dragging, seeking only
//! commits on release so a drag does not flood the element with
//! intermediate seeks. The `invoke_on_drag` flag is that distinction.
//!
//! [`DragBar`] is a pure state machine: pointer positions go in, an
//! optional committed value comes out, and the current visual fill is
//! readable at any time. The widget code maps commits onto the media
//! element and the fill onto the progress element's width.

/// One pointer interaction step on a bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarInput {
    /// A plain click at a position; always commits
    Click(f64),

    /// Pointer pressed; starts a drag
    Press,

    /// Pointer moved while pressed
    Drag(f64),

    /// Pointer released (or left the bar) at a position; ends the drag
    Release(f64),
}

/// Interaction state of one draggable bar
#[derive(Debug, Clone)]
pub struct DragBar {
    /// Commit on every drag move (volume) instead of only on release (seek)
    invoke_on_drag: bool,

    dragging: bool,

    /// Left edge and width of the bar strip in pointer coordinates
    left: f64,
    width: f64,

    /// Last computed value, drives the visual fill
    fill: f64,
}

impl DragBar {
    pub fn new(invoke_on_drag: bool) -> Self {
        // Unit geometry: pointer positions are already fractions.
        Self::with_geometry(invoke_on_drag, 0.0, 1.0)
    }

    /// Bar with an explicit strip geometry in pointer coordinates
    pub fn with_geometry(invoke_on_drag: bool, left: f64, width: f64) -> Self {
        Self {
            invoke_on_drag,
            dragging: false,
            left,
            width: if width > 0.0 { width } else { 1.0 },
            fill: 0.0,
        }
    }

    /// Update the strip geometry (the page relaid the bar out)
    pub fn set_geometry(&mut self, left: f64, width: f64) {
        self.left = left;
        if width > 0.0 {
            self.width = width;
        }
    }

    /// The value a pointer position maps to
    pub fn value_at(&self, x: f64) -> f64 {
        ((x - self.left) / self.width).clamp(0.0, 1.0)
    }

    /// Current visual fill fraction
    pub fn fill(&self) -> f64 {
        self.fill
    }

    /// Mirror an externally-caused value (e.g. a volume change from another
    /// video) into the fill without emitting a commit
    pub fn set_fill(&mut self, fraction: f64) {
        self.fill = fraction.clamp(0.0, 1.0);
    }

    /// Whether a drag is in progress
    pub fn dragging(&self) -> bool {
        self.dragging
    }

    /// Feed one pointer step; returns the value to commit, if any
    pub fn handle(&mut self, input: BarInput) -> Option<f64> {
        match input {
            BarInput::Click(x) => Some(self.update_fill(x)),
            BarInput::Press => {
                self.dragging = true;
                None
            }
            BarInput::Drag(x) => {
                if !self.dragging {
                    return None;
                }
                let value = self.update_fill(x);
                self.invoke_on_drag.then_some(value)
            }
            BarInput::Release(x) => {
                if !self.dragging {
                    return None;
                }
                self.dragging = false;
                Some(self.update_fill(x))
            }
        }
    }

    fn update_fill(&mut self, x: f64) -> f64 {
        self.fill = self.value_at(x);
        self.fill
    }
}
