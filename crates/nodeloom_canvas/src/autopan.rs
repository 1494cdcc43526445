// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge scrolling while a drag is active.
//!
//! The host owns the timer: while a drag is near or past the viewport edge
//! it calls [`AutoPanner::tick`] periodically and applies the returned pan
//! delta. While the pointer is outside the bounds entirely, drag deltas are
//! frozen: [`AutoPanner::filter_drag_delta`] returns zero and accumulates
//! them, and the first in-bounds delta carries the whole accumulated amount
//! as a single snap. Dragged elements therefore never receive camera-
//! relative deltas while their screen anchor is outside the viewport.

use egui::{Pos2, Rect, Vec2};

/// Auto-pan tuning.
#[derive(Debug, Clone, Copy)]
pub struct AutoPanConfig {
    /// Width of the edge band that triggers panning, in screen units.
    pub edge_padding: f32,
    /// Pan delta per tick at full strength, in screen units.
    pub pan_amount: f32,
    /// Suggested tick interval for the host's timer, in milliseconds.
    pub interval_ms: u64,
    /// Scale the delta linearly with proximity inside the edge band. When
    /// false, any position in the band pans at full strength.
    pub linear_scaling: bool,
}

impl Default for AutoPanConfig {
    fn default() -> Self {
        Self {
            edge_padding: 40.0,
            pan_amount: 15.0,
            interval_ms: 16,
            linear_scaling: true,
        }
    }
}

/// Computes per-tick pan deltas and freezes drag deltas while the pointer
/// is out of bounds.
#[derive(Debug, Default)]
pub struct AutoPanner {
    config: AutoPanConfig,
    active: bool,
    pointer_outside: bool,
    held: Vec2,
}

impl AutoPanner {
    /// Create a panner with the given config, initially stopped.
    pub fn new(config: AutoPanConfig) -> Self {
        Self {
            config,
            active: false,
            pointer_outside: false,
            held: Vec2::ZERO,
        }
    }

    /// Current config.
    pub fn config(&self) -> &AutoPanConfig {
        &self.config
    }

    /// Begin auto-panning (called at drag start).
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Cancel auto-panning and drop all transient state.
    pub fn stop(&mut self) {
        self.active = false;
        self.pointer_outside = false;
        self.held = Vec2::ZERO;
    }

    /// Whether the panner is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the last tick saw the pointer outside the bounds.
    pub fn pointer_outside(&self) -> bool {
        self.pointer_outside
    }

    /// Drag delta held back while the pointer was out of bounds.
    pub fn held_delta(&self) -> Vec2 {
        self.held
    }

    /// One timer tick: returns the pan delta for the current pointer
    /// position. Inside the edge band the delta scales with proximity
    /// (when linear scaling is on); strictly outside the bounds it
    /// saturates at the configured pan amount.
    pub fn tick(&mut self, pointer: Pos2, bounds: Rect) -> Vec2 {
        if !self.active {
            return Vec2::ZERO;
        }
        self.pointer_outside = !bounds.contains(pointer);
        Vec2::new(
            self.axis_delta(pointer.x, bounds.left(), bounds.right()),
            self.axis_delta(pointer.y, bounds.top(), bounds.bottom()),
        )
    }

    fn axis_delta(&self, p: f32, min: f32, max: f32) -> f32 {
        let pad = self.config.edge_padding;
        let amount = self.config.pan_amount;
        if p < min {
            amount
        } else if p <= min + pad {
            amount * self.band_strength(p - min)
        } else if p > max {
            -amount
        } else if p >= max - pad {
            -amount * self.band_strength(max - p)
        } else {
            0.0
        }
    }

    fn band_strength(&self, distance_from_edge: f32) -> f32 {
        if self.config.linear_scaling {
            1.0 - (distance_from_edge / self.config.edge_padding).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Gate a drag delta through the freeze/accumulate law: out of bounds
    /// the delta is held back and zero is returned; the first in-bounds
    /// delta returns `delta + sum(held)` and clears the accumulator.
    pub fn filter_drag_delta(&mut self, delta: Vec2) -> Vec2 {
        if !self.active {
            return delta;
        }
        if self.pointer_outside {
            self.held += delta;
            return Vec2::ZERO;
        }
        if self.held != Vec2::ZERO {
            let combined = delta + self.held;
            self.held = Vec2::ZERO;
            return combined;
        }
        delta
    }
}
