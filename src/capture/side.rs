//! Front/back side tracking
//!
//! The expected side toggles once per successful crop and never on failure.
//! The same state drives the prompt label, the preview label and the flip
//! animation target.

use serde::Serialize;
use std::fmt;

/// Side of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSide {
    #[default]
    Front,
    Back,
}

impl CaptureSide {
    /// The other side
    pub fn opposite(self) -> Self {
        match self {
            CaptureSide::Front => CaptureSide::Back,
            CaptureSide::Back => CaptureSide::Front,
        }
    }
}

impl fmt::Display for CaptureSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSide::Front => f.write_str("front"),
            CaptureSide::Back => f.write_str("back"),
        }
    }
}

/// Two-state machine for the side expected next
#[derive(Debug, Clone, Default)]
pub struct SideFlipStateMachine {
    current: CaptureSide,
}

impl SideFlipStateMachine {
    /// Start at the front side
    pub fn new() -> Self {
        Self::default()
    }

    /// Side expected by the next capture
    pub fn current(&self) -> CaptureSide {
        self.current
    }

    /// Record a successful capture; returns the side that was just captured
    pub fn complete_capture(&mut self) -> CaptureSide {
        let captured = self.current;
        self.current = captured.opposite();
        captured
    }

    /// Prompt shown before capturing
    pub fn prompt_label(&self) -> &'static str {
        match self.current {
            CaptureSide::Front => "Capture Card Front",
            CaptureSide::Back => "Capture Card Back",
        }
    }

    /// Label for the image captured last, keyed off the post-toggle state
    pub fn completed_label(&self) -> &'static str {
        match self.current.opposite() {
            CaptureSide::Front => "Card Front Image",
            CaptureSide::Back => "Card Back Image",
        }
    }

    /// Flip animation target in degrees
    pub fn rotation_degrees(&self) -> f32 {
        match self.current {
            CaptureSide::Front => 0.0,
            CaptureSide::Back => 180.0,
        }
    }
}
