//! Input event generation.
//!
//! Polls native events, drops the ones the application never handles and
//! classifies the rest. Pointer motion and release are tracked against the
//! last clicked [`TouchEntity`] so a drag may leave its rectangle and come
//! back.
//!
//! ```text
//!              set_last_clicked
//!   ┌──────┐ ────────────────▶ ┌────────┐  leaves rect  ┌─────────┐
//!   │ Idle │                   │ Inside │ ────────────▶ │ Outside │
//!   └──────┘ ◀──── release ─── └────────┘ ◀──────────── └─────────┘
//!                                          re-enters rect
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ember_shared::{is_point_in_rect, Point, Rectangle};

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButton {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// First extra button.
    X1,
    /// Second extra button.
    X2,
    /// No button, or one the engine does not know.
    #[default]
    Unknown,
}

/// Keyboard key.
///
/// Only keys the engine reacts to get their own variant; anything else
/// travels as its native key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Key {
    /// Escape key.
    Escape,
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Backspace key.
    Backspace,
    /// Space bar.
    Space,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Native key code without a variant of its own.
    Other(i32),
    /// No key.
    #[default]
    Unknown,
}

/// Event as delivered by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// Window resized, moved, focused and the like.
    Window,
    /// Committed text input.
    TextInput,
    /// In-progress text composition.
    TextEditing,
    /// An audio device was plugged in.
    AudioDeviceAdded,
    /// The system locale changed.
    LanguageChanged,
    /// Key went down.
    KeyPress(Key),
    /// Key went up.
    KeyRelease(Key),
    /// Mouse button went down.
    MousePress(MouseButton),
    /// Mouse button went up.
    MouseRelease(MouseButton),
    /// Mouse moved.
    MouseMotion,
    /// Mouse wheel scrolled.
    MouseWheel,
    /// Finger touched the screen.
    FingerPress,
    /// Finger lifted.
    FingerRelease,
    /// Finger moved.
    FingerMotion,
    /// The window was closed.
    Quit,
    /// Raw event type the windowing layer did not map.
    Other(u32),
}

impl NativeEvent {
    /// Events the application never sees. Mouse motion only matters while a
    /// touch entity is captured.
    const fn is_filtered(self, has_captured_entity: bool) -> bool {
        match self {
            Self::Window
            | Self::TextInput
            | Self::TextEditing
            | Self::AudioDeviceAdded
            | Self::LanguageChanged => true,
            Self::MouseMotion => !has_captured_entity,
            _ => false,
        }
    }
}

/// Source of native events. Implemented over the windowing library, or by
/// a script in tests.
pub trait EventSource {
    /// Next pending event, if any. Never blocks.
    fn poll_event(&mut self) -> Option<NativeEvent>;

    /// Pointer position at the time of the last polled event.
    fn mouse_position(&self) -> Point;
}

/// Application-level classification of an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventKind {
    /// Key went down.
    KeyboardPress,
    /// Key went up.
    KeyboardRelease,
    /// Pointer or finger went down.
    TouchPress,
    /// Pointer moved while over the captured entity.
    TouchDrag,
    /// Pointer released over the captured entity, or the wheel scrolled.
    TouchRelease,
    /// Pointer moved outside the captured entity.
    Motion,
    /// Pointer released with nothing under it.
    EmptyTouchRelease,
    /// Application exit requested.
    Quit,
    /// Unrecognised native event.
    #[default]
    Unknown,
}

/// A classified input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Pointer position when the event was polled.
    pub pos: Point,
    /// Key for keyboard events, [`Key::Unknown`] otherwise.
    pub key: Key,
    /// Button for mouse press and release, [`MouseButton::Unknown`]
    /// otherwise.
    pub mouse_button: MouseButton,
    /// Classification.
    pub kind: EventKind,
}

impl InputEvent {
    const fn at(pos: Point) -> Self {
        Self {
            pos,
            key: Key::Unknown,
            mouse_button: MouseButton::Unknown,
            kind: EventKind::Unknown,
        }
    }

    /// True for a window close or the Escape key.
    #[must_use]
    pub const fn check_for_exit_request(&self) -> bool {
        matches!(self.kind, EventKind::Quit) || matches!(self.key, Key::Escape)
    }
}

/// Something the pointer can press and drag.
pub trait TouchEntity {
    /// Area that counts as "on" the entity.
    fn event_rect(&self) -> Rectangle;

    /// The pointer left [`TouchEntity::event_rect`] while pressed.
    fn on_leave(&mut self, _event: &InputEvent) {}

    /// The pointer came back into [`TouchEntity::event_rect`] while
    /// pressed.
    fn on_return(&mut self, _event: &InputEvent) {}
}

/// Touch entity shared between the application and the generator.
pub type SharedTouchEntity = Rc<RefCell<dyn TouchEntity>>;

/// Drag tracking state of an [`InputEventGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragState {
    /// No entity captured.
    Idle,
    /// Captured, and the pointer was last seen inside it.
    Inside,
    /// Captured, and the pointer was last seen outside it.
    Outside,
}

/// Turns native events into [`InputEvent`]s.
pub struct InputEventGenerator<S: EventSource> {
    source: S,
    last_clicked: Option<SharedTouchEntity>,
    left_boundary: bool,
}

impl<S: EventSource> InputEventGenerator<S> {
    /// Creates an idle generator over `source`.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_clicked: None,
            left_boundary: false,
        }
    }

    /// Next event the application cares about, or `None` once the source
    /// is drained.
    pub fn poll_event(&mut self) -> Option<InputEvent> {
        while let Some(native) = self.source.poll_event() {
            if native.is_filtered(self.last_clicked.is_some()) {
                continue;
            }
            return Some(self.classify(native));
        }
        None
    }

    /// Captures `entity` for drag tracking, usually after a hit test on a
    /// [`EventKind::TouchPress`]. `None` releases the capture.
    pub fn set_last_clicked(&mut self, entity: Option<SharedTouchEntity>) {
        self.last_clicked = entity;
    }

    /// Current drag tracking state.
    #[must_use]
    pub fn drag_state(&self) -> DragState {
        match (&self.last_clicked, self.left_boundary) {
            (None, _) => DragState::Idle,
            (Some(_), false) => DragState::Inside,
            (Some(_), true) => DragState::Outside,
        }
    }

    /// The wrapped event source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The wrapped event source, mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn classify(&mut self, native: NativeEvent) -> InputEvent {
        let mut event = InputEvent::at(self.source.mouse_position());

        match native {
            NativeEvent::KeyPress(key) => {
                event.kind = EventKind::KeyboardPress;
                // only Escape is reported on press
                if key == Key::Escape {
                    event.key = Key::Escape;
                }
            }
            NativeEvent::KeyRelease(key) => {
                event.kind = EventKind::KeyboardRelease;
                event.key = key;
            }
            NativeEvent::MousePress(button) => {
                event.kind = EventKind::TouchPress;
                event.mouse_button = button;
            }
            NativeEvent::FingerPress => event.kind = EventKind::TouchPress,
            NativeEvent::MouseMotion | NativeEvent::FingerMotion => self.track_motion(&mut event),
            NativeEvent::MouseRelease(button) => {
                event.mouse_button = button;
                event.kind = self.release(event.pos, false);
            }
            NativeEvent::FingerRelease => event.kind = self.release(event.pos, false),
            NativeEvent::MouseWheel => event.kind = self.release(event.pos, true),
            NativeEvent::Quit => event.kind = EventKind::Quit,
            NativeEvent::Other(raw) => {
                tracing::error!("Received unknown native event type: {raw}");
            }
            NativeEvent::Window
            | NativeEvent::TextInput
            | NativeEvent::TextEditing
            | NativeEvent::AudioDeviceAdded
            | NativeEvent::LanguageChanged => {}
        }

        event
    }

    fn track_motion(&mut self, event: &mut InputEvent) {
        event.kind = EventKind::Motion;
        let Some(entity) = self.last_clicked.clone() else {
            return;
        };
        let Some(rect) = entity_rect(&entity) else {
            return;
        };

        let inside = is_point_in_rect(event.pos, &rect);
        match (self.left_boundary, inside) {
            (true, true) => {
                self.left_boundary = false;
                event.kind = EventKind::TouchDrag;
                with_entity(&entity, |e| e.on_return(&*event));
            }
            (false, true) => event.kind = EventKind::TouchDrag,
            (false, false) => {
                self.left_boundary = true;
                with_entity(&entity, |e| e.on_leave(&*event));
            }
            (true, false) => {}
        }
    }

    /// Classifies a release and drops the capture.
    fn release(&mut self, pos: Point, wheel: bool) -> EventKind {
        let on_entity = self
            .last_clicked
            .as_ref()
            .and_then(entity_rect)
            .is_some_and(|rect| is_point_in_rect(pos, &rect));

        self.last_clicked = None;
        self.left_boundary = false;

        if on_entity || wheel {
            EventKind::TouchRelease
        } else {
            EventKind::EmptyTouchRelease
        }
    }
}

impl<S: EventSource + fmt::Debug> fmt::Debug for InputEventGenerator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputEventGenerator")
            .field("source", &self.source)
            .field("drag_state", &self.drag_state())
            .finish()
    }
}

fn entity_rect(entity: &SharedTouchEntity) -> Option<Rectangle> {
    match entity.try_borrow() {
        Ok(entity) => Some(entity.event_rect()),
        Err(_) => {
            tracing::error!("Touch entity is mutably borrowed while tracking input");
            None
        }
    }
}

fn with_entity(entity: &SharedTouchEntity, f: impl FnOnce(&mut dyn TouchEntity)) {
    match entity.try_borrow_mut() {
        Ok(mut entity) => f(&mut *entity),
        Err(_) => tracing::error!("Touch entity is borrowed, boundary callback skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct ScriptedSource {
        events: VecDeque<(NativeEvent, Point)>,
        pos: Point,
    }

    impl ScriptedSource {
        fn push(&mut self, event: NativeEvent, x: i32, y: i32) {
            self.events.push_back((event, Point::new(x, y)));
        }
    }

    impl EventSource for ScriptedSource {
        fn poll_event(&mut self) -> Option<NativeEvent> {
            let (event, pos) = self.events.pop_front()?;
            self.pos = pos;
            Some(event)
        }

        fn mouse_position(&self) -> Point {
            self.pos
        }
    }

    struct Button {
        rect: Rectangle,
        leaves: u32,
        returns: u32,
    }

    impl TouchEntity for Button {
        fn event_rect(&self) -> Rectangle {
            self.rect
        }

        fn on_leave(&mut self, event: &InputEvent) {
            assert_eq!(event.kind, EventKind::Motion);
            self.leaves += 1;
        }

        fn on_return(&mut self, event: &InputEvent) {
            assert_eq!(event.kind, EventKind::TouchDrag);
            self.returns += 1;
        }
    }

    fn button() -> Rc<RefCell<Button>> {
        Rc::new(RefCell::new(Button {
            rect: Rectangle::new(0, 0, 10, 10),
            leaves: 0,
            returns: 0,
        }))
    }

    fn capture(gen: &mut InputEventGenerator<ScriptedSource>, button: &Rc<RefCell<Button>>) {
        let shared: SharedTouchEntity = button.clone();
        gen.set_last_clicked(Some(shared));
    }

    fn kind_of(gen: &mut InputEventGenerator<ScriptedSource>) -> EventKind {
        gen.poll_event().map_or(EventKind::Unknown, |e| e.kind)
    }

    #[test]
    fn test_drag_leave_and_return() {
        let button = button();
        let mut gen = InputEventGenerator::new(ScriptedSource::default());
        {
            let source = gen.source_mut();
            source.push(NativeEvent::MousePress(MouseButton::Left), 5, 5);
            source.push(NativeEvent::MouseMotion, 6, 6);
            source.push(NativeEvent::MouseMotion, 20, 20);
            source.push(NativeEvent::MouseMotion, 25, 25);
            source.push(NativeEvent::MouseMotion, 5, 5);
            source.push(NativeEvent::MouseRelease(MouseButton::Left), 5, 5);
        }

        let press = gen.poll_event().unwrap();
        assert_eq!(press.kind, EventKind::TouchPress);
        assert_eq!(press.mouse_button, MouseButton::Left);
        capture(&mut gen, &button);
        assert_eq!(gen.drag_state(), DragState::Inside);

        assert_eq!(kind_of(&mut gen), EventKind::TouchDrag);
        assert_eq!(kind_of(&mut gen), EventKind::Motion);
        assert_eq!(gen.drag_state(), DragState::Outside);
        assert_eq!(kind_of(&mut gen), EventKind::Motion);
        // one callback per crossing
        assert_eq!(button.borrow().leaves, 1);

        assert_eq!(kind_of(&mut gen), EventKind::TouchDrag);
        assert_eq!(button.borrow().returns, 1);

        assert_eq!(kind_of(&mut gen), EventKind::TouchRelease);
        assert_eq!(gen.drag_state(), DragState::Idle);
        assert!(gen.poll_event().is_none());
    }

    #[test]
    fn test_release_outside_is_empty() {
        let button = button();
        let mut gen = InputEventGenerator::new(ScriptedSource::default());
        gen.source_mut()
            .push(NativeEvent::MouseRelease(MouseButton::Left), 10, 0);
        capture(&mut gen, &button);

        // right edge is outside the half-open rect
        assert_eq!(kind_of(&mut gen), EventKind::EmptyTouchRelease);
        assert_eq!(gen.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_wheel_always_releases() {
        let mut gen = InputEventGenerator::new(ScriptedSource::default());
        gen.source_mut().push(NativeEvent::MouseWheel, 50, 50);
        gen.source_mut()
            .push(NativeEvent::MouseRelease(MouseButton::Right), 50, 50);

        assert_eq!(kind_of(&mut gen), EventKind::TouchRelease);
        assert_eq!(kind_of(&mut gen), EventKind::EmptyTouchRelease);
    }

    #[test]
    fn test_uncaptured_motion_and_window_events_are_skipped() {
        let mut gen = InputEventGenerator::new(ScriptedSource::default());
        {
            let source = gen.source_mut();
            source.push(NativeEvent::MouseMotion, 1, 1);
            source.push(NativeEvent::Window, 0, 0);
            source.push(NativeEvent::TextInput, 0, 0);
            source.push(NativeEvent::FingerPress, 3, 4);
        }

        let event = gen.poll_event().unwrap();
        assert_eq!(event.kind, EventKind::TouchPress);
        assert_eq!(event.pos, Point::new(3, 4));
        assert!(gen.poll_event().is_none());
    }

    #[test]
    fn test_keyboard_and_exit_requests() {
        let mut gen = InputEventGenerator::new(ScriptedSource::default());
        {
            let source = gen.source_mut();
            source.push(NativeEvent::KeyPress(Key::Enter), 0, 0);
            source.push(NativeEvent::KeyRelease(Key::Enter), 0, 0);
            source.push(NativeEvent::KeyPress(Key::Escape), 0, 0);
            source.push(NativeEvent::Quit, 0, 0);
            source.push(NativeEvent::Other(0x9999), 0, 0);
        }

        let press = gen.poll_event().unwrap();
        assert_eq!(press.kind, EventKind::KeyboardPress);
        assert_eq!(press.key, Key::Unknown);
        assert!(!press.check_for_exit_request());

        let release = gen.poll_event().unwrap();
        assert_eq!(release.kind, EventKind::KeyboardRelease);
        assert_eq!(release.key, Key::Enter);

        assert!(gen.poll_event().unwrap().check_for_exit_request());
        assert!(gen.poll_event().unwrap().check_for_exit_request());

        let unknown = gen.poll_event().unwrap();
        assert_eq!(unknown.kind, EventKind::Unknown);
        assert!(!unknown.check_for_exit_request());
    }
}
