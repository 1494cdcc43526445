// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pan/zoom viewport transform between graph space and screen space.
//!
//! `graph_to_screen(p) = pan + p * zoom` and `screen_to_graph` is its exact
//! inverse; round trips hold within floating-point epsilon for any finite
//! zoom. Zoom is always clamped to the configured range rather than
//! rejected.

use crate::CanvasError;
use egui::{Pos2, Rect, Vec2};
use nodeloom_graph::{Observable, SubscriberId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Zoom clamp range.
#[derive(Debug, Clone, Copy)]
pub struct ViewportConfig {
    /// Smallest allowed zoom.
    pub min_zoom: f32,
    /// Largest allowed zoom.
    pub max_zoom: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 4.0,
        }
    }
}

/// The pan/zoom state mapping graph space to screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan, in screen units.
    pub x: f32,
    /// Vertical pan, in screen units.
    pub y: f32,
    /// Zoom scale.
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Pan as a vector.
    pub fn pan(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Identity token for the registered animation handler.
///
/// Registration is last-writer-wins: registering a new handler invalidates
/// the previous token, and clearing with a stale token is a no-op. This
/// guards against a teardown racing a newer consumer's setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationHandle(u64);

type AnimationHandler = Box<dyn FnMut(Viewport)>;

/// Viewport transform with fit/center targets and animation hand-off.
pub struct ViewportTransform {
    viewport: Observable<Viewport>,
    config: ViewportConfig,
    screen_size: Option<Vec2>,
    handler: Option<(AnimationHandle, AnimationHandler)>,
    next_handle: u64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportTransform {
    /// Create a transform at pan (0, 0), zoom 1.
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            viewport: Observable::new(Viewport::default()),
            config,
            screen_size: None,
            handler: None,
            next_handle: 0,
        }
    }

    /// Current viewport value.
    pub fn viewport(&self) -> Viewport {
        *self.viewport.get()
    }

    /// Replace the viewport, clamping zoom to the configured range.
    pub fn set_viewport(&mut self, mut viewport: Viewport) {
        viewport.zoom = viewport.zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        self.viewport.set(viewport);
    }

    /// Observe viewport changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&Viewport) + 'static) -> SubscriberId {
        self.viewport.subscribe(listener)
    }

    /// Stop observing viewport changes.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.viewport.unsubscribe(id)
    }

    /// One-time screen metrics initialization; fit and center operations
    /// need this before they can do anything.
    pub fn set_screen_size(&mut self, size: Vec2) {
        self.screen_size = Some(size);
    }

    /// Screen size, if initialized.
    pub fn screen_size(&self) -> Option<Vec2> {
        self.screen_size
    }

    // --- Coordinate conversion ---------------------------------------------

    /// Map a graph-space point to screen space.
    pub fn graph_to_screen(&self, p: Pos2) -> Pos2 {
        let v = self.viewport.get();
        Pos2::new(v.x + p.x * v.zoom, v.y + p.y * v.zoom)
    }

    /// Map a screen-space point to graph space.
    pub fn screen_to_graph(&self, p: Pos2) -> Pos2 {
        let v = self.viewport.get();
        Pos2::new((p.x - v.x) / v.zoom, (p.y - v.y) / v.zoom)
    }

    /// The graph-space rectangle currently covered by the screen.
    ///
    /// Fails until [`set_screen_size`](Self::set_screen_size) has run.
    pub fn visible_graph_rect(&self) -> Result<Rect, CanvasError> {
        let size = self.screen_size.ok_or(CanvasError::NotInitialized(
            "screen size not set; call set_screen_size before querying view metrics",
        ))?;
        Ok(Rect::from_min_max(
            self.screen_to_graph(Pos2::ZERO),
            self.screen_to_graph(Pos2::new(size.x, size.y)),
        ))
    }

    // --- Zoom and pan ------------------------------------------------------

    /// Set zoom, clamped.
    pub fn zoom_to(&mut self, zoom: f32) {
        let clamped = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        self.viewport.update(|v| v.zoom = clamped);
    }

    /// Multiply zoom by a factor, clamped.
    pub fn zoom_by(&mut self, factor: f32) {
        let zoom = self.viewport.get().zoom * factor;
        self.zoom_to(zoom);
    }

    /// Multiply zoom by a factor while keeping the graph point under
    /// `screen_pos` fixed on screen.
    pub fn zoom_at(&mut self, screen_pos: Pos2, factor: f32) {
        let anchor = self.screen_to_graph(screen_pos);
        let old = *self.viewport.get();
        let zoom = (old.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
        self.viewport.set(Viewport {
            x: screen_pos.x - anchor.x * zoom,
            y: screen_pos.y - anchor.y * zoom,
            zoom,
        });
    }

    /// Translate the pan by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.viewport.update(|v| {
            v.x += delta.x;
            v.y += delta.y;
        });
    }

    // --- Fit and center ----------------------------------------------------

    /// Viewport that fits `bounds` (plus padding) into the screen, centered.
    /// `None` if the bounds are degenerate or the screen is unset/zero.
    pub fn fit_target(&self, bounds: Rect, padding: f32) -> Option<Viewport> {
        let size = self.screen_size?;
        let padded = bounds.expand(padding);
        if padded.width() <= 0.0 || padded.height() <= 0.0 || size.x <= 0.0 || size.y <= 0.0 {
            return None;
        }
        let zoom = (size.x / padded.width())
            .min(size.y / padded.height())
            .clamp(self.config.min_zoom, self.config.max_zoom);
        let center = padded.center();
        Some(Viewport {
            x: size.x / 2.0 - center.x * zoom,
            y: size.y / 2.0 - center.y * zoom,
            zoom,
        })
    }

    /// Viewport centering `point` at the current zoom. `None` before screen
    /// size initialization.
    pub fn center_target(&self, point: Pos2) -> Option<Viewport> {
        let size = self.screen_size?;
        let v = self.viewport.get();
        Some(Viewport {
            x: size.x / 2.0 - point.x * v.zoom,
            y: size.y / 2.0 - point.y * v.zoom,
            zoom: v.zoom,
        })
    }

    /// Fit a node set's bounds into view immediately. No-op on degenerate
    /// bounds or an unset/zero screen.
    pub fn fit_to_view(&mut self, bounds: Rect, padding: f32) {
        if let Some(target) = self.fit_target(bounds, padding) {
            self.viewport.set(target);
        }
    }

    /// Center a graph point, leaving zoom untouched. No-op before screen
    /// size initialization.
    pub fn center_on(&mut self, point: Pos2) {
        if let Some(target) = self.center_target(point) {
            self.viewport.set(target);
        }
    }

    /// Center a graph point at an explicit zoom, immediately.
    pub fn center_on_with_zoom(&mut self, point: Pos2, zoom: f32) {
        self.zoom_to(zoom);
        self.center_on(point);
    }

    // --- Animation hand-off ------------------------------------------------

    /// Register the animation handler, replacing any previous one. The
    /// returned handle is the only token that can clear this registration.
    pub fn register_animation_handler(
        &mut self,
        handler: impl FnMut(Viewport) + 'static,
    ) -> AnimationHandle {
        self.next_handle += 1;
        let handle = AnimationHandle(self.next_handle);
        debug!(handle = self.next_handle, "animation handler registered");
        self.handler = Some((handle, Box::new(handler)));
        handle
    }

    /// Clear the animation handler if `handle` is still current. A stale
    /// handle is a no-op; returns whether anything was cleared.
    pub fn clear_animation_handler(&mut self, handle: AnimationHandle) -> bool {
        match &self.handler {
            Some((current, _)) if *current == handle => {
                self.handler = None;
                true
            }
            Some(_) => {
                warn!(handle = handle.0, "stale animation handler clear ignored");
                false
            }
            None => false,
        }
    }

    fn dispatch(&mut self, target: Viewport) {
        if let Some((_, handler)) = &mut self.handler {
            handler(target);
        } else {
            // No handler: apply the target without animating.
            self.viewport.set(target);
        }
    }

    /// Animated variant of [`center_on`](Self::center_on): computes the same
    /// target and hands it to the animation handler. Applied immediately if
    /// no handler is registered.
    pub fn animate_to_center(&mut self, point: Pos2) {
        if let Some(target) = self.center_target(point) {
            self.dispatch(target);
        }
    }

    /// Animated variant of [`fit_to_view`](Self::fit_to_view).
    pub fn animate_to_fit(&mut self, bounds: Rect, padding: f32) {
        if let Some(target) = self.fit_target(bounds, padding) {
            self.dispatch(target);
        }
    }

    /// Animated zoom change at the current pan.
    pub fn animate_to_zoom(&mut self, zoom: f32) {
        let mut target = *self.viewport.get();
        target.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        self.dispatch(target);
    }
}

impl std::fmt::Debug for ViewportTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportTransform")
            .field("viewport", self.viewport.get())
            .field("screen_size", &self.screen_size)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_graph_to_screen_scenario() {
        let mut transform = ViewportTransform::default();
        transform.set_viewport(Viewport {
            x: 100.0,
            y: 50.0,
            zoom: 2.0,
        });
        assert_eq!(
            transform.graph_to_screen(Pos2::new(10.0, 20.0)),
            Pos2::new(120.0, 90.0)
        );
    }

    #[test]
    fn test_round_trip_within_epsilon() {
        let mut transform = ViewportTransform::default();
        transform.set_viewport(Viewport {
            x: -37.5,
            y: 120.25,
            zoom: 0.73,
        });
        let p = Pos2::new(411.5, -93.25);
        let round_trip = transform.graph_to_screen(transform.screen_to_graph(p));
        assert!((round_trip.x - p.x).abs() < 1e-3);
        assert!((round_trip.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut transform = ViewportTransform::default();
        transform.zoom_to(100.0);
        assert_eq!(transform.viewport().zoom, 4.0);
        transform.zoom_to(0.0001);
        assert_eq!(transform.viewport().zoom, 0.1);
    }

    #[test]
    fn test_fit_to_view_noop_without_screen() {
        let mut transform = ViewportTransform::default();
        let before = transform.viewport();
        transform.fit_to_view(Rect::from_min_max(Pos2::ZERO, Pos2::new(100.0, 100.0)), 10.0);
        assert_eq!(transform.viewport(), before);
    }

    #[test]
    fn test_fit_to_view_centers_bounds() {
        let mut transform = ViewportTransform::default();
        transform.set_screen_size(Vec2::new(800.0, 600.0));
        let bounds = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(400.0, 300.0));
        transform.fit_to_view(bounds, 0.0);

        let v = transform.viewport();
        assert_eq!(v.zoom, 2.0);
        // Box center (200, 150) maps to screen center (400, 300).
        assert_eq!(
            transform.graph_to_screen(Pos2::new(200.0, 150.0)),
            Pos2::new(400.0, 300.0)
        );
    }

    #[test]
    fn test_center_on_keeps_zoom() {
        let mut transform = ViewportTransform::default();
        transform.set_screen_size(Vec2::new(800.0, 600.0));
        transform.zoom_to(2.0);
        transform.center_on(Pos2::new(50.0, 50.0));
        assert_eq!(transform.viewport().zoom, 2.0);
        assert_eq!(
            transform.graph_to_screen(Pos2::new(50.0, 50.0)),
            Pos2::new(400.0, 300.0)
        );
    }

    #[test]
    fn test_visible_rect_requires_initialization() {
        let transform = ViewportTransform::default();
        assert!(matches!(
            transform.visible_graph_rect(),
            Err(CanvasError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_animation_handler_last_writer_wins() {
        let mut transform = ViewportTransform::default();
        transform.set_screen_size(Vec2::new(800.0, 600.0));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let old = transform.register_animation_handler(move |target| sink.borrow_mut().push(target));

        let sink2 = Rc::clone(&seen);
        let _new = transform.register_animation_handler(move |target| sink2.borrow_mut().push(target));

        // Stale clear from the old consumer's teardown must not remove the
        // new registration.
        assert!(!transform.clear_animation_handler(old));
        transform.animate_to_center(Pos2::new(10.0, 10.0));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_animate_without_handler_applies_immediately() {
        let mut transform = ViewportTransform::default();
        transform.set_screen_size(Vec2::new(800.0, 600.0));
        transform.animate_to_zoom(2.0);
        assert_eq!(transform.viewport().zoom, 2.0);
    }
}
