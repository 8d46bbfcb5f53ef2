//! Input dispatcher: turns pointer, wheel, touch, gesture and keyboard events into
//! view changes and state machine operations.
//!
//! The dispatcher owns only transient interaction state (active drag, held keys,
//! touch contacts, wheel accumulator). The session is passed in on every call and
//! each call reports what happened as a list of [`Effect`]s, so the whole input
//! pipeline can be driven deterministically in tests without a window.

use crate::constants::{
    BUTTON_ZOOM, DOUBLE_CLICK_ZOOM, MIN_DRAG_PX, WHEEL_ZOOM_SENSITIVITY,
};
use crate::error::MeasureError;
use crate::geometry::{constrain_to_axis, distance, Point};
use crate::gestures::{NativePinch, TouchOutcome, TouchPhase, TouchTracker, WheelAccumulator};
use crate::measure::Committed;
use crate::types::{Line, Mode, Session};
use crate::view::fit_to_content;
use eframe::egui::{Key, Modifiers, PointerButton};

/// Environment facts the dispatcher needs but does not own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEnv {
    /// Size of the canvas viewport in screen pixels
    pub viewport: Point,
    /// Whether a decoded image is available for drawing on
    pub image_ready: bool,
}

impl InputEnv {
    /// Center of the viewport, the anchor for anchorless zooms.
    pub fn center(&self) -> Point {
        self.viewport * 0.5
    }
}

/// A normalized input event. Positions are canvas-relative screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A mouse button or the primary touch went down
    PointerDown {
        /// Pointer position
        pos: Point,
        /// Which button
        button: PointerButton,
        /// Modifier keys at press time
        modifiers: Modifiers,
    },
    /// The pointer moved
    PointerMove {
        /// Pointer position
        pos: Point,
        /// Modifier keys currently held
        modifiers: Modifiers,
    },
    /// A mouse button or the primary touch was released
    PointerUp {
        /// Pointer position
        pos: Point,
        /// Which button
        button: PointerButton,
        /// Modifier keys at release time
        modifiers: Modifiers,
    },
    /// Wheel or trackpad scroll. `delta` is the direction to move the content.
    Wheel {
        /// Scroll delta in screen pixels
        delta: Point,
        /// Pointer position
        pos: Point,
        /// Modifier keys held
        modifiers: Modifiers,
    },
    /// A touch contact changed
    Touch {
        /// Contact identifier
        id: u64,
        /// What happened to it
        phase: TouchPhase,
        /// Contact position
        pos: Point,
    },
    /// A platform pinch gesture began
    GestureStart,
    /// A platform pinch gesture reported a new cumulative scale
    GestureChange {
        /// Scale relative to the gesture start
        scale: f64,
    },
    /// A platform pinch gesture ended
    GestureEnd,
    /// Double click or double tap
    DoubleClick {
        /// Click position
        pos: Point,
        /// Modifier keys held
        modifiers: Modifiers,
    },
    /// Zoom in around the viewport center (toolbar or keyboard)
    ZoomIn,
    /// Zoom out around the viewport center (toolbar or keyboard)
    ZoomOut,
    /// Fit the image into the viewport
    FitToView,
    /// Undo the most recent measurement line
    Undo,
    /// Abandon any drag, pan or gesture in progress
    Cancel,
    /// A key went down or up
    Key {
        /// The key
        key: Key,
        /// Pressed or released
        pressed: bool,
        /// Modifier keys held
        modifiers: Modifiers,
    },
    /// End of the current frame; flushes batched work
    FrameEnd,
}

/// Observable consequence of handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Zoom or offset changed
    ViewChanged,
    /// Lines, calibration, reference length, unit or mode changed
    ModelChanged,
    /// A drag completed and was accepted by the state machine
    Committed(Committed),
    /// The most recent measurement line was removed
    Undone(Line),
    /// A drag completed but was rejected
    Rejected(MeasureError),
    /// An in-progress drag or pan was abandoned
    Cancelled,
}

/// What the primary drag is doing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    /// Moving the view; `last` is the previous pointer position
    Panning { last: Point },
    /// Drawing a line; positions in world coordinates
    Drawing {
        start: Point,
        end: Point,
        mode: Mode,
    },
}

/// The line currently being drawn, for the render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    /// World-space start point
    pub start: Point,
    /// World-space end point, after any axis constraint
    pub end: Point,
    /// Mode the line will be committed in
    pub mode: Mode,
}

/// Routes raw input to the view transform and the measurement state machine.
#[derive(Debug)]
pub struct Dispatcher {
    drag: DragState,
    space_held: bool,
    touches: TouchTracker,
    wheel: WheelAccumulator,
    pinch: NativePinch,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            drag: DragState::Idle,
            space_held: false,
            touches: TouchTracker::default(),
            wheel: WheelAccumulator::default(),
            pinch: NativePinch::default(),
        }
    }
}

/// Whether the modifier for precise wheel zoom is held.
fn is_zoom_modifier(modifiers: &Modifiers) -> bool {
    modifiers.ctrl || modifiers.command
}

impl Dispatcher {
    /// Creates an idle dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pan or line drag is in progress.
    pub fn is_dragging(&self) -> bool {
        !matches!(self.drag, DragState::Idle)
    }

    /// Whether the view is being panned by a drag.
    pub fn is_panning(&self) -> bool {
        matches!(self.drag, DragState::Panning { .. })
    }

    /// Whether a two-finger gesture currently owns the input.
    pub fn is_pinching(&self) -> bool {
        self.touches.is_pinching()
    }

    /// Whether a drag, touch or platform gesture is still changing the session.
    pub fn is_interacting(&self) -> bool {
        self.is_dragging()
            || self.touches.contact_count() > 0
            || self.pinch.is_active()
            || self.wheel.is_pending()
    }

    /// Whether the pan key (Space) is held.
    pub fn pan_key_held(&self) -> bool {
        self.space_held
    }

    /// The line being drawn, if any.
    pub fn preview(&self) -> Option<Preview> {
        match self.drag {
            DragState::Drawing { start, end, mode } => Some(Preview { start, end, mode }),
            _ => None,
        }
    }

    /// Handles one event, mutating `session` and reporting what changed.
    pub fn handle(
        &mut self,
        session: &mut Session,
        env: &InputEnv,
        event: InputEvent,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            InputEvent::PointerDown {
                pos,
                button,
                modifiers,
            } => self.pointer_down(session, env, pos, button, modifiers),
            InputEvent::PointerMove { pos, modifiers } => {
                self.pointer_move(session, pos, modifiers, &mut effects)
            }
            InputEvent::PointerUp { pos, modifiers, .. } => {
                self.pointer_up(session, pos, modifiers, &mut effects)
            }
            InputEvent::Wheel {
                delta,
                pos,
                modifiers,
            } => {
                if is_zoom_modifier(&modifiers) {
                    self.wheel.add(delta.y, pos);
                } else if delta != Point::ZERO {
                    session.view.pan(delta);
                    effects.push(Effect::ViewChanged);
                }
            }
            InputEvent::Touch { id, phase, pos } => {
                match self.touches.update(id, phase, pos, &session.view) {
                    TouchOutcome::PinchStarted => {
                        // Two contacts belong to the gesture, never to a drag.
                        if self.is_dragging() {
                            self.drag = DragState::Idle;
                            effects.push(Effect::Cancelled);
                        }
                    }
                    TouchOutcome::Transform(view) => {
                        session.view = view;
                        effects.push(Effect::ViewChanged);
                    }
                    TouchOutcome::Idle | TouchOutcome::PinchEnded => {}
                }
            }
            InputEvent::GestureStart => self.pinch.start(),
            InputEvent::GestureChange { scale } => {
                if let Some(factor) = self.pinch.change(scale) {
                    zoom(session, env.center(), factor, &mut effects);
                }
            }
            InputEvent::GestureEnd => self.pinch.end(),
            InputEvent::DoubleClick { pos, modifiers } => {
                let factor = if modifiers.alt {
                    1.0 / DOUBLE_CLICK_ZOOM
                } else {
                    DOUBLE_CLICK_ZOOM
                };
                zoom(session, pos, factor, &mut effects);
            }
            InputEvent::ZoomIn => zoom(session, env.center(), BUTTON_ZOOM, &mut effects),
            InputEvent::ZoomOut => zoom(session, env.center(), 1.0 / BUTTON_ZOOM, &mut effects),
            InputEvent::FitToView => {
                let fitted = session
                    .image
                    .as_ref()
                    .and_then(|image| fit_to_content(image.size(), env.viewport));
                if let Some(view) = fitted {
                    session.view = view;
                    effects.push(Effect::ViewChanged);
                }
            }
            InputEvent::Undo => self.undo(session, &mut effects),
            InputEvent::Cancel => self.cancel(&mut effects),
            InputEvent::Key {
                key,
                pressed,
                modifiers,
            } => self.key(session, env, key, pressed, modifiers, &mut effects),
            InputEvent::FrameEnd => {
                if let Some((factor, anchor)) = self.wheel.take(WHEEL_ZOOM_SENSITIVITY) {
                    zoom(session, anchor, factor, &mut effects);
                }
            }
        }
        effects
    }

    fn pointer_down(
        &mut self,
        session: &Session,
        env: &InputEnv,
        pos: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) {
        if self.touches.is_pinching() || self.is_dragging() {
            return;
        }
        let wants_pan =
            button != PointerButton::Primary || self.space_held || modifiers.command;
        if wants_pan {
            self.drag = DragState::Panning { last: pos };
        } else if env.image_ready {
            let start = session.view.screen_to_world(pos);
            self.drag = DragState::Drawing {
                start,
                end: start,
                mode: session.measure.mode,
            };
        }
    }

    fn pointer_move(
        &mut self,
        session: &mut Session,
        pos: Point,
        modifiers: Modifiers,
        effects: &mut Vec<Effect>,
    ) {
        match &mut self.drag {
            DragState::Idle => {}
            DragState::Panning { last } => {
                let delta = pos - *last;
                *last = pos;
                if delta != Point::ZERO {
                    session.view.pan(delta);
                    effects.push(Effect::ViewChanged);
                }
            }
            DragState::Drawing { start, end, .. } => {
                *end = drag_end(*start, session.view.screen_to_world(pos), modifiers);
            }
        }
    }

    fn pointer_up(
        &mut self,
        session: &mut Session,
        pos: Point,
        modifiers: Modifiers,
        effects: &mut Vec<Effect>,
    ) {
        let drag = std::mem::replace(&mut self.drag, DragState::Idle);
        let DragState::Drawing { start, .. } = drag else {
            return;
        };
        let end = drag_end(start, session.view.screen_to_world(pos), modifiers);
        if distance(start, end) * session.view.zoom < MIN_DRAG_PX {
            effects.push(Effect::Cancelled);
            return;
        }
        match session.measure.complete_line(start, end) {
            Ok(committed) => {
                effects.push(Effect::Committed(committed));
                effects.push(Effect::ModelChanged);
            }
            Err(err) => effects.push(Effect::Rejected(err)),
        }
    }

    fn undo(&mut self, session: &mut Session, effects: &mut Vec<Effect>) {
        if let Some(line) = session.measure.undo() {
            effects.push(Effect::Undone(line));
            effects.push(Effect::ModelChanged);
        }
    }

    fn cancel(&mut self, effects: &mut Vec<Effect>) {
        let was_active = self.is_dragging() || self.touches.contact_count() > 0;
        self.drag = DragState::Idle;
        self.touches.release();
        self.pinch.end();
        self.wheel.reset();
        if was_active {
            effects.push(Effect::Cancelled);
        }
    }

    /// Switches mode; a line being drawn finishes in the new mode.
    fn switch_mode(&mut self, session: &mut Session, mode: Mode, effects: &mut Vec<Effect>) {
        session.measure.set_mode(mode);
        if let DragState::Drawing { mode: drawing, .. } = &mut self.drag {
            *drawing = mode;
        }
        effects.push(Effect::ModelChanged);
    }

    fn key(
        &mut self,
        session: &mut Session,
        env: &InputEnv,
        key: Key,
        pressed: bool,
        modifiers: Modifiers,
        effects: &mut Vec<Effect>,
    ) {
        if key == Key::Space {
            self.space_held = pressed;
            return;
        }
        if !pressed {
            return;
        }
        match key {
            Key::Num1 if !modifiers.command => self.switch_mode(session, Mode::Calibrate, effects),
            Key::Num2 if !modifiers.command => self.switch_mode(session, Mode::Measure, effects),
            Key::Z if modifiers.command && !modifiers.shift => self.undo(session, effects),
            Key::Escape => self.cancel(effects),
            Key::Plus | Key::Equals => zoom(session, env.center(), BUTTON_ZOOM, effects),
            Key::Minus => zoom(session, env.center(), 1.0 / BUTTON_ZOOM, effects),
            Key::Num0 if !modifiers.command => {
                effects.extend(self.handle(session, env, InputEvent::FitToView));
            }
            _ => {}
        }
    }
}

/// Applies the axis constraint when Shift is held.
fn drag_end(start: Point, end: Point, modifiers: Modifiers) -> Point {
    if modifiers.shift {
        constrain_to_axis(start, end)
    } else {
        end
    }
}

fn zoom(session: &mut Session, anchor: Point, factor: f64, effects: &mut Vec<Effect>) {
    let before = session.view;
    session.view.zoom_around(anchor, factor);
    if session.view != before {
        effects.push(Effect::ViewChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_ZOOM, MIN_ZOOM};
    use crate::geometry::screen_to_world;
    use crate::types::ImageRef;
    use crate::view::ViewTransform;

    fn env() -> InputEnv {
        InputEnv {
            viewport: Point::new(800.0, 600.0),
            image_ready: true,
        }
    }

    fn session() -> Session {
        let mut s = Session::new();
        s.image = Some(ImageRef {
            name: None,
            width: 1000,
            height: 500,
            bytes: Vec::new(),
        });
        s
    }

    fn drag(
        d: &mut Dispatcher,
        s: &mut Session,
        from: Point,
        to: Point,
        modifiers: Modifiers,
    ) -> Vec<Effect> {
        let e = env();
        let mut out = d.handle(
            s,
            &e,
            InputEvent::PointerDown {
                pos: from,
                button: PointerButton::Primary,
                modifiers,
            },
        );
        out.extend(d.handle(s, &e, InputEvent::PointerMove { pos: to, modifiers }));
        out.extend(d.handle(
            s,
            &e,
            InputEvent::PointerUp {
                pos: to,
                button: PointerButton::Primary,
                modifiers,
            },
        ));
        out
    }

    #[test]
    fn calibrate_then_measure_through_drags() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let fx = drag(
            &mut d,
            &mut s,
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Modifiers::NONE,
        );
        assert!(matches!(
            fx[0],
            Effect::Committed(Committed::Calibrated { scale, .. }) if scale == 100.0
        ));
        assert_eq!(s.measure.mode, Mode::Measure);

        drag(
            &mut d,
            &mut s,
            Point::new(0.0, 100.0),
            Point::new(0.0, 350.0),
            Modifiers::NONE,
        );
        assert_eq!(s.measure.lines.len(), 1);
        assert_eq!(s.measure.label_for(&s.measure.lines[0]), "2.50 m");
    }

    #[test]
    fn drag_uses_world_coordinates() {
        let mut d = Dispatcher::new();
        let mut s = session();
        s.view = ViewTransform::new(2.0, Point::new(100.0, 50.0));
        drag(
            &mut d,
            &mut s,
            Point::new(100.0, 50.0),
            Point::new(900.0, 50.0),
            Modifiers::NONE,
        );
        let cal = s.measure.calibration.expect("calibrated");
        assert_eq!(cal.start, Point::new(0.0, 0.0));
        assert_eq!(cal.end, Point::new(400.0, 0.0));
    }

    #[test]
    fn tiny_drag_is_discarded_silently() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let fx = drag(
            &mut d,
            &mut s,
            Point::new(10.0, 10.0),
            Point::new(11.0, 10.0),
            Modifiers::NONE,
        );
        assert_eq!(fx, vec![Effect::Cancelled]);
        assert!(s.measure.calibration.is_none());
    }

    #[test]
    fn measuring_without_scale_reports_error() {
        let mut d = Dispatcher::new();
        let mut s = session();
        s.measure.set_mode(Mode::Measure);
        let fx = drag(
            &mut d,
            &mut s,
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Modifiers::NONE,
        );
        assert_eq!(fx, vec![Effect::Rejected(MeasureError::NotCalibrated)]);
        assert!(s.measure.lines.is_empty());
    }

    #[test]
    fn shift_constrains_to_dominant_axis() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        drag(
            &mut d,
            &mut s,
            Point::new(10.0, 10.0),
            Point::new(300.0, 40.0),
            shift,
        );
        let cal = s.measure.calibration.expect("calibrated");
        assert_eq!(cal.end, Point::new(300.0, 10.0));
    }

    #[test]
    fn drawing_disabled_while_image_pending() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let pending = InputEnv {
            image_ready: false,
            ..env()
        };
        d.handle(
            &mut s,
            &pending,
            InputEvent::PointerDown {
                pos: Point::new(0.0, 0.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );
        assert!(!d.is_dragging());
    }

    #[test]
    fn middle_button_and_space_pan() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let e = env();
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerDown {
                pos: Point::new(10.0, 10.0),
                button: PointerButton::Middle,
                modifiers: Modifiers::NONE,
            },
        );
        assert!(d.is_panning());
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerMove {
                pos: Point::new(30.0, 5.0),
                modifiers: Modifiers::NONE,
            },
        );
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerUp {
                pos: Point::new(30.0, 5.0),
                button: PointerButton::Middle,
                modifiers: Modifiers::NONE,
            },
        );
        assert_eq!(s.view.offset, Point::new(20.0, -5.0));

        d.handle(
            &mut s,
            &e,
            InputEvent::Key {
                key: Key::Space,
                pressed: true,
                modifiers: Modifiers::NONE,
            },
        );
        drag(
            &mut d,
            &mut s,
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Modifiers::NONE,
        );
        assert_eq!(s.view.offset, Point::new(120.0, -5.0));
        assert!(s.measure.calibration.is_none());
    }

    #[test]
    fn wheel_without_modifier_pans() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let fx = d.handle(
            &mut s,
            &env(),
            InputEvent::Wheel {
                delta: Point::new(-3.0, 12.0),
                pos: Point::new(50.0, 50.0),
                modifiers: Modifiers::NONE,
            },
        );
        assert_eq!(fx, vec![Effect::ViewChanged]);
        assert_eq!(s.view.offset, Point::new(-3.0, 12.0));
        assert_eq!(s.view.zoom, 1.0);
    }

    #[test]
    fn precise_wheel_zoom_applies_once_per_frame() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let anchor = Point::new(200.0, 150.0);
        let world = s.view.screen_to_world(anchor);
        for _ in 0..3 {
            let fx = d.handle(
                &mut s,
                &env(),
                InputEvent::Wheel {
                    delta: Point::new(0.0, 40.0),
                    pos: anchor,
                    modifiers: Modifiers::CTRL,
                },
            );
            assert!(fx.is_empty());
        }
        assert_eq!(s.view.zoom, 1.0);
        let fx = d.handle(&mut s, &env(), InputEvent::FrameEnd);
        assert_eq!(fx, vec![Effect::ViewChanged]);
        let expected = (120.0 * WHEEL_ZOOM_SENSITIVITY).exp();
        assert!((s.view.zoom - expected).abs() < 1e-12);
        let after = screen_to_world(anchor, s.view.zoom, s.view.offset);
        assert!(distance(world, after) < 1e-9);
        assert!(d.handle(&mut s, &env(), InputEvent::FrameEnd).is_empty());
    }

    #[test]
    fn double_click_zooms_around_click() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let pos = Point::new(123.0, 45.0);
        let world = s.view.screen_to_world(pos);
        d.handle(
            &mut s,
            &env(),
            InputEvent::DoubleClick {
                pos,
                modifiers: Modifiers::NONE,
            },
        );
        assert!((s.view.zoom - DOUBLE_CLICK_ZOOM).abs() < 1e-12);
        assert!(distance(s.view.screen_to_world(pos), world) < 1e-9);

        d.handle(
            &mut s,
            &env(),
            InputEvent::DoubleClick {
                pos,
                modifiers: Modifiers::ALT,
            },
        );
        assert!((s.view.zoom - 1.0).abs() < 1e-12);
    }

    #[test]
    fn buttons_zoom_around_center_and_clamp() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let center = env().center();
        let world = s.view.screen_to_world(center);
        d.handle(&mut s, &env(), InputEvent::ZoomIn);
        assert!((s.view.zoom - BUTTON_ZOOM).abs() < 1e-12);
        assert!(distance(s.view.screen_to_world(center), world) < 1e-9);
        for _ in 0..200 {
            d.handle(&mut s, &env(), InputEvent::ZoomIn);
        }
        assert_eq!(s.view.zoom, MAX_ZOOM);
        for _ in 0..400 {
            d.handle(&mut s, &env(), InputEvent::ZoomOut);
        }
        assert_eq!(s.view.zoom, MIN_ZOOM);
    }

    #[test]
    fn native_pinch_zooms_by_ratio() {
        let mut d = Dispatcher::new();
        let mut s = session();
        d.handle(&mut s, &env(), InputEvent::GestureStart);
        d.handle(&mut s, &env(), InputEvent::GestureChange { scale: 2.0 });
        d.handle(&mut s, &env(), InputEvent::GestureChange { scale: 3.0 });
        assert!((s.view.zoom - 3.0).abs() < 1e-12);
        d.handle(&mut s, &env(), InputEvent::GestureEnd);
    }

    #[test]
    fn second_touch_abandons_drag() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let e = env();
        d.handle(
            &mut s,
            &e,
            InputEvent::Touch {
                id: 1,
                phase: TouchPhase::Start,
                pos: Point::new(100.0, 100.0),
            },
        );
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerDown {
                pos: Point::new(100.0, 100.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );
        assert!(d.preview().is_some());
        let fx = d.handle(
            &mut s,
            &e,
            InputEvent::Touch {
                id: 2,
                phase: TouchPhase::Start,
                pos: Point::new(200.0, 100.0),
            },
        );
        assert_eq!(fx, vec![Effect::Cancelled]);
        assert!(d.preview().is_none());
        assert!(d.is_pinching());

        let fx = d.handle(
            &mut s,
            &e,
            InputEvent::Touch {
                id: 2,
                phase: TouchPhase::Move,
                pos: Point::new(300.0, 100.0),
            },
        );
        assert_eq!(fx, vec![Effect::ViewChanged]);
        assert!((s.view.zoom - 2.0).abs() < 1e-12);

        // Pointer release from the emulated primary touch must not draw anything.
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerUp {
                pos: Point::new(100.0, 100.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );
        assert!(s.measure.calibration.is_none());
    }

    #[test]
    fn keyboard_shortcuts() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let e = env();
        let press = |key, modifiers| InputEvent::Key {
            key,
            pressed: true,
            modifiers,
        };
        d.handle(&mut s, &e, press(Key::Num2, Modifiers::NONE));
        assert_eq!(s.measure.mode, Mode::Measure);
        d.handle(&mut s, &e, press(Key::Num1, Modifiers::NONE));
        assert_eq!(s.measure.mode, Mode::Calibrate);

        drag(
            &mut d,
            &mut s,
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Modifiers::NONE,
        );
        for i in 0..3 {
            let y = 50.0 + 10.0 * i as f64;
            drag(
                &mut d,
                &mut s,
                Point::new(0.0, y),
                Point::new(100.0, y),
                Modifiers::NONE,
            );
        }
        let last = s.measure.lines[2].id;
        let fx = d.handle(&mut s, &e, press(Key::Z, Modifiers::COMMAND));
        assert!(matches!(fx[0], Effect::Undone(line) if line.id == last));
        assert_eq!(s.measure.lines.len(), 2);
        assert!(s.measure.calibration.is_some());
    }

    #[test]
    fn mode_key_during_drag_applies_to_the_line() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let e = env();
        drag(
            &mut d,
            &mut s,
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Modifiers::NONE,
        );
        assert_eq!(s.measure.mode, Mode::Measure);

        d.handle(
            &mut s,
            &e,
            InputEvent::PointerDown {
                pos: Point::new(0.0, 100.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );
        d.handle(
            &mut s,
            &e,
            InputEvent::Key {
                key: Key::Num1,
                pressed: true,
                modifiers: Modifiers::NONE,
            },
        );
        assert_eq!(d.preview().map(|p| p.mode), Some(Mode::Calibrate));
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerUp {
                pos: Point::new(200.0, 100.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );

        let cal = s.measure.calibration.expect("recalibrated");
        assert_eq!(cal.start, Point::new(0.0, 100.0));
        assert!(s.measure.lines.is_empty());
        assert_eq!(s.measure.scale(), Some(50.0));
    }

    #[test]
    fn escape_cancels_drawing() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let e = env();
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerDown {
                pos: Point::new(0.0, 0.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerMove {
                pos: Point::new(200.0, 0.0),
                modifiers: Modifiers::NONE,
            },
        );
        let fx = d.handle(
            &mut s,
            &e,
            InputEvent::Key {
                key: Key::Escape,
                pressed: true,
                modifiers: Modifiers::NONE,
            },
        );
        assert_eq!(fx, vec![Effect::Cancelled]);
        d.handle(
            &mut s,
            &e,
            InputEvent::PointerUp {
                pos: Point::new(200.0, 0.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            },
        );
        assert!(s.measure.calibration.is_none());
    }

    #[test]
    fn fit_to_view_uses_image_size() {
        let mut d = Dispatcher::new();
        let mut s = session();
        let fx = d.handle(&mut s, &env(), InputEvent::FitToView);
        assert_eq!(fx, vec![Effect::ViewChanged]);
        assert!((s.view.zoom - 0.8 * 0.95).abs() < 1e-12);
    }
}
