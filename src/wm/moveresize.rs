//! MoveResize Module
//!
//! Interactive window moving and resizing with gravity-aware edges, size
//! constraints, snapping, quadrant maximize and desktop switching at the
//! screen edge.
//!
//! A session is not a nested event loop: while one runs the window manager
//! routes pointer and key events here and handles everything else as usual.

use std::time::Instant;

use bitflags::bitflags;
use tracing::{debug, info};

use crate::shared::{BorderSize, Geometry};
use crate::wm::client::SizeHints;
use crate::wm::client_flags::{BorderFlags, MaxFlags, StatusFlags};
use crate::wm::display::{Cursor, DisplayServer, Window};
use crate::wm::events::WmEvent;
use crate::wm::keyboard::keysym;
use crate::wm::settings::{DrawMode, SnapMode};
use crate::wm::timers::TimerKind;
use crate::wm::{Dirty, WindowManager, WmError};

bitflags! {
    /// Edges moved by a resize
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResizeEdge: u8 {
        const NORTH = 1 << 0;
        const SOUTH = 1 << 1;
        const EAST  = 1 << 2;
        const WEST  = 1 << 3;
    }
}

impl ResizeEdge {
    /// Pointer shape for this edge
    pub fn cursor(self) -> Cursor {
        let north = self.contains(Self::NORTH);
        let south = self.contains(Self::SOUTH);
        let east = self.contains(Self::EAST);
        let west = self.contains(Self::WEST);
        match (north, south, east, west) {
            (true, _, true, _) => Cursor::ResizeNorthEast,
            (true, _, _, true) => Cursor::ResizeNorthWest,
            (_, true, true, _) => Cursor::ResizeSouthEast,
            (_, true, _, true) => Cursor::ResizeSouthWest,
            (true, _, _, _) => Cursor::ResizeNorth,
            (_, true, _, _) => Cursor::ResizeSouth,
            (_, _, true, _) => Cursor::ResizeEast,
            (_, _, _, true) => Cursor::ResizeWest,
            _ => Cursor::Default,
        }
    }

    /// Edge for a pointer position relative to a window: the quadrant it is in.
    pub fn nearest(geometry: &Geometry, x: i32, y: i32) -> Self {
        let (cx, cy) = geometry.center();
        let mut edge = Self::empty();
        edge |= if y < cy { Self::NORTH } else { Self::SOUTH };
        edge |= if x < cx { Self::WEST } else { Self::EAST };
        edge
    }
}

/// State of one interactive operation
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Pointer position when the session started (root coordinates)
    pub start_pointer: (i32, i32),
    /// Client geometry when the session started
    pub start_geometry: Geometry,
    /// Candidate geometry for the current pointer position
    pub current: Geometry,
    /// Started from the keyboard; arrow keys drive a virtual pointer
    pub keyboard: bool,
    /// Virtual pointer for keyboard sessions
    pub pointer: (i32, i32),
    pub draw: DrawMode,
    /// Quadrant-maximize target under the pointer
    pub aero: MaxFlags,
}

impl Session {
    fn new(pointer: (i32, i32), geometry: Geometry, keyboard: bool, draw: DrawMode) -> Self {
        Self {
            start_pointer: pointer,
            start_geometry: geometry,
            current: geometry,
            keyboard,
            pointer,
            draw,
            aero: MaxFlags::NONE,
        }
    }
}

/// Interactive operation owned by a client
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Controller {
    #[default]
    None,
    Moving(Session),
    Resizing(Session, ResizeEdge),
}

impl Controller {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::None => None,
            Self::Moving(s) | Self::Resizing(s, _) => Some(s),
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            Self::None => None,
            Self::Moving(s) | Self::Resizing(s, _) => Some(s),
        }
    }

    /// End the operation. A forced cancellation (the client is going away)
    /// returns nothing to commit or restore.
    pub fn cancel(&mut self, forced: bool) -> Option<Session> {
        let session = match std::mem::take(self) {
            Self::None => None,
            Self::Moving(s) | Self::Resizing(s, _) => Some(s),
        };
        if forced {
            None
        } else {
            session
        }
    }
}

/// How a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Release or Return: keep the new geometry, apply any quadrant maximize
    Commit,
    /// Escape: put the window back
    Revert,
    /// Interrupted by a client request: keep the geometry reached so far
    Stop,
    /// The client is being destroyed: release resources only
    Forced,
}

/// New client geometry for dragging `edge` by (dx, dy).
///
/// The opposite edges stay fixed. Width and height honour the size
/// limits, the resize increments and the aspect bounds.
pub fn resize_geometry(start: &Geometry, edge: ResizeEdge, dx: i32, dy: i32, hints: &SizeHints) -> Geometry {
    let mut width = start.width;
    let mut height = start.height;
    if edge.contains(ResizeEdge::EAST) {
        width += dx;
    } else if edge.contains(ResizeEdge::WEST) {
        width -= dx;
    }
    if edge.contains(ResizeEdge::SOUTH) {
        height += dy;
    } else if edge.contains(ResizeEdge::NORTH) {
        height -= dy;
    }

    let (w, h) = hints.clamp_size(width, height);
    width = hints.snap_width(w).max(hints.min_width).max(1);
    height = hints.snap_height(h).max(hints.min_height).max(1);

    if let Some(aspect) = hints.aspect {
        let horizontal_only = !edge.intersects(ResizeEdge::NORTH | ResizeEdge::SOUTH);
        let vertical_only = !edge.intersects(ResizeEdge::EAST | ResizeEdge::WEST);
        let ratio = width as f32 / height as f32;
        let min_ratio = aspect.min_ratio();
        let max_ratio = aspect.max_ratio();
        if min_ratio > 0.0 && ratio < min_ratio {
            if horizontal_only {
                height = ((width as f32 / min_ratio) as i32).max(1);
            } else {
                width = ((height as f32 * min_ratio) as i32).max(1);
            }
        } else if max_ratio > 0.0 && ratio > max_ratio {
            if vertical_only {
                width = ((height as f32 * max_ratio) as i32).max(1);
            } else {
                height = ((width as f32 / max_ratio) as i32).max(1);
            }
        }
    }

    let x = if edge.contains(ResizeEdge::WEST) {
        start.right() - width
    } else {
        start.x
    };
    let y = if edge.contains(ResizeEdge::NORTH) {
        start.bottom() - height
    } else {
        start.y
    };
    Geometry::new(x, y, width, height)
}

/// Closest candidate within `distance` of `value`
fn nearest_within(value: i32, candidates: impl IntoIterator<Item = i32>, distance: i32) -> Option<i32> {
    candidates
        .into_iter()
        .filter(|c| (c - value).abs() <= distance)
        .min_by_key(|c| (c - value).abs())
}

/// Snap a frame's edges to the inside edges of the given boxes.
/// Returns the new frame origin.
pub fn snap_to_screen(frame: &Geometry, boxes: &[Geometry], distance: i32) -> (i32, i32) {
    let xs = boxes.iter().flat_map(|b| [b.x, b.right() - frame.width]);
    let ys = boxes.iter().flat_map(|b| [b.y, b.bottom() - frame.height]);
    (
        nearest_within(frame.x, xs, distance).unwrap_or(frame.x),
        nearest_within(frame.y, ys, distance).unwrap_or(frame.y),
    )
}

/// Snap a frame against other frames (touching or aligned edges) and the
/// screen boxes. Returns the new frame origin.
pub fn snap_to_borders(frame: &Geometry, others: &[Geometry], boxes: &[Geometry], distance: i32) -> (i32, i32) {
    let mut xs: Vec<i32> = boxes.iter().flat_map(|b| [b.x, b.right() - frame.width]).collect();
    let mut ys: Vec<i32> = boxes.iter().flat_map(|b| [b.y, b.bottom() - frame.height]).collect();

    for other in others {
        let overlaps_vertically = frame.y < other.bottom() && other.y < frame.bottom();
        let overlaps_horizontally = frame.x < other.right() && other.x < frame.right();
        if overlaps_vertically {
            xs.extend([
                other.right(),
                other.x - frame.width,
                other.x,
                other.right() - frame.width,
            ]);
        }
        if overlaps_horizontally {
            ys.extend([
                other.bottom(),
                other.y - frame.height,
                other.y,
                other.bottom() - frame.height,
            ]);
        }
    }

    (
        nearest_within(frame.x, xs, distance).unwrap_or(frame.x),
        nearest_within(frame.y, ys, distance).unwrap_or(frame.y),
    )
}

/// Quadrant-maximize mode for a pointer touching a monitor edge.
///
/// Top edge maximizes fully; left and right edges take that half, or a
/// quarter when within a quarter of the height from a corner.
pub fn aero_target(x: i32, y: i32, bounds: &Geometry) -> Option<MaxFlags> {
    let at_left = x <= bounds.x;
    let at_right = x >= bounds.right() - 1;
    let at_top = y <= bounds.y;
    let corner = bounds.height / 4;

    let side = if at_left {
        MaxFlags::LEFT
    } else if at_right {
        MaxFlags::RIGHT
    } else if at_top {
        return Some(MaxFlags::HORIZ | MaxFlags::VERT);
    } else {
        return None;
    };

    if y < bounds.y + corner {
        Some(side | MaxFlags::TOP)
    } else if y >= bounds.bottom() - corner {
        Some(side | MaxFlags::BOTTOM)
    } else {
        Some(side | MaxFlags::VERT)
    }
}

impl<D: DisplayServer> WindowManager<D> {
    /// Begin an interactive move.
    ///
    /// Clients that cannot move, or are fullscreen, are left alone.
    pub fn start_move(&mut self, window: Window, pointer: (i32, i32), keyboard: bool) -> Result<(), WmError> {
        let client = self.clients.get(window).ok_or(WmError::NotManaged(window))?;
        if !client.state.has_border(BorderFlags::MOVE) || client.state.is_fullscreen() {
            debug!("Move refused for 0x{:x}", window);
            return Ok(());
        }
        let session = Session::new(pointer, client.geometry, keyboard, self.settings.move_mode);
        self.begin_session(window, Controller::Moving(session), Cursor::Move)
    }

    /// Begin an interactive resize dragging `edge`.
    pub fn start_resize(
        &mut self,
        window: Window,
        edge: ResizeEdge,
        pointer: (i32, i32),
        keyboard: bool,
    ) -> Result<(), WmError> {
        let client = self.clients.get(window).ok_or(WmError::NotManaged(window))?;
        let state = &client.state;
        if !state.has_border(BorderFlags::RESIZE) || state.is_fullscreen() || state.is_shaded() {
            debug!("Resize refused for 0x{:x}", window);
            return Ok(());
        }
        let edge = if edge.is_empty() {
            ResizeEdge::SOUTH | ResizeEdge::EAST
        } else {
            edge
        };
        let session = Session::new(pointer, client.geometry, keyboard, self.settings.resize_mode);
        self.begin_session(window, Controller::Resizing(session, edge), edge.cursor())
    }

    fn begin_session(&mut self, window: Window, controller: Controller, cursor: Cursor) -> Result<(), WmError> {
        if self.interactive.is_some() {
            return Err(WmError::SessionActive);
        }
        if !self.display.grab_pointer(cursor)? {
            return Err(WmError::GrabFailed);
        }
        if !self.display.grab_keyboard()? {
            self.display.ungrab()?;
            return Err(WmError::GrabFailed);
        }

        let resizing = matches!(controller, Controller::Resizing(..));
        let Some(client) = self.clients.get_mut(window) else {
            self.display.ungrab()?;
            return Err(WmError::NotManaged(window));
        };
        // Resizing a maximized window keeps its size but drops the mode
        if resizing && client.state.is_maximized() {
            client.state.clear_max_flags();
        }
        client.controller = controller;
        client.state.set(StatusFlags::DRAG);
        self.interactive = Some(window);
        info!("Interactive {} started for 0x{:x}", if resizing { "resize" } else { "move" }, window);
        Ok(())
    }

    /// Route an event to the running session. Returns true when consumed.
    pub(crate) fn session_event(&mut self, event: &WmEvent, now: Instant) -> anyhow::Result<bool> {
        let Some(window) = self.interactive else {
            return Ok(false);
        };
        let keyboard = self
            .clients
            .get(window)
            .and_then(|c| c.controller.session())
            .map_or(false, |s| s.keyboard);

        match *event {
            WmEvent::MotionNotify { root_x, root_y, .. } => {
                if !keyboard {
                    self.session_motion(root_x, root_y, now)?;
                }
                Ok(true)
            }
            WmEvent::ButtonRelease { .. } => {
                if !keyboard {
                    self.end_session(SessionEnd::Commit)?;
                }
                Ok(true)
            }
            WmEvent::ButtonPress { .. } => {
                if keyboard {
                    self.end_session(SessionEnd::Commit)?;
                }
                Ok(true)
            }
            WmEvent::KeyPress { keysym, .. } => {
                self.session_key(keysym, now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn session_key(&mut self, sym: u32, now: Instant) -> anyhow::Result<()> {
        let step = self.settings.keyboard_step;
        let (dx, dy) = match sym {
            keysym::ESCAPE => return self.end_session(SessionEnd::Revert),
            keysym::RETURN | keysym::KP_ENTER => return self.end_session(SessionEnd::Commit),
            keysym::LEFT => (-step, 0),
            keysym::RIGHT => (step, 0),
            keysym::UP => (0, -step),
            keysym::DOWN => (0, step),
            _ => return Ok(()),
        };
        let Some(pointer) = self
            .interactive
            .and_then(|w| self.clients.get_mut(w))
            .and_then(|c| c.controller.session_mut())
            .map(|s| {
                s.pointer = (s.pointer.0 + dx, s.pointer.1 + dy);
                s.pointer
            })
        else {
            return Ok(());
        };
        self.session_motion(pointer.0, pointer.1, now)
    }

    /// Update the candidate geometry for a pointer position.
    fn session_motion(&mut self, x: i32, y: i32, now: Instant) -> anyhow::Result<()> {
        let Some(window) = self.interactive else {
            return Ok(());
        };
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let border = self.decorations.border_size(client);

        match client.controller.clone() {
            Controller::None => Ok(()),
            Controller::Moving(session) => self.move_motion(window, session, &border, x, y, now),
            Controller::Resizing(session, edge) => {
                let (dx, dy) = (x - session.start_pointer.0, y - session.start_pointer.1);
                let geometry = resize_geometry(&session.start_geometry, edge, dx, dy, &client.hints);
                self.show_candidate(window, geometry, MaxFlags::NONE, &border)
            }
        }
    }

    fn move_motion(
        &mut self,
        window: Window,
        mut session: Session,
        border: &BorderSize,
        x: i32,
        y: i32,
        now: Instant,
    ) -> anyhow::Result<()> {
        // Dragging a maximized window restores its size under the pointer
        if let Some(client) = self.clients.get_mut(window) {
            if client.state.is_maximized() && (x, y) != session.start_pointer {
                let start = session.start_geometry;
                let saved = client.saved;
                let offset_x = (session.start_pointer.0 - start.x) * saved.width / start.width.max(1);
                session.start_geometry = Geometry::new(
                    session.start_pointer.0 - offset_x,
                    start.y,
                    saved.width,
                    saved.height,
                );
                client.state.clear_max_flags();
                client.controller = Controller::Moving(session.clone());
                self.write_state(window)?;
            }
        }

        let (dx, dy) = (x - session.start_pointer.0, y - session.start_pointer.1);
        let mut geometry = session.start_geometry;
        geometry.x += dx;
        geometry.y += dy;

        let frame = border.frame_of(&geometry);
        let distance = self.settings.snap_distance;
        let boxes: Vec<Geometry> = (0..self.screen.monitor_count())
            .map(|m| self.free_box(Some(window), m))
            .collect();
        let (fx, fy) = match self.settings.snap_mode {
            SnapMode::None => (frame.x, frame.y),
            SnapMode::Screen => snap_to_screen(&frame, &boxes, distance),
            SnapMode::Border => {
                let others = self.visible_frames_except(window);
                snap_to_borders(&frame, &others, &boxes, distance)
            }
        };
        geometry.x = fx + border.west;
        geometry.y = fy + border.north;

        let aero = if self.settings.aero_snap && !session.keyboard {
            let monitor = self.screen.monitor_at(x, y).bounds;
            aero_target(x, y, &monitor).unwrap_or(MaxFlags::NONE)
        } else {
            MaxFlags::NONE
        };

        self.update_edge_switch(x, now);
        self.show_candidate(window, geometry, aero, border)
    }

    /// Arm or disarm the desktop switch for a pointer at the root's side edges.
    fn update_edge_switch(&mut self, x: i32, now: Instant) {
        let Some(delay) = self.settings.edge_switch_delay else {
            return;
        };
        let delta = if x <= 0 {
            -1
        } else if x >= self.screen.width - 1 {
            1
        } else {
            0
        };
        if delta == 0 {
            self.timers.remove_edge_switch();
        } else if !self.timers.contains(TimerKind::EdgeSwitch(delta)) {
            self.timers.remove_edge_switch();
            self.timers.add_oneshot(TimerKind::EdgeSwitch(delta), delay, now);
        }
    }

    /// Apply (opaque) or outline (outline mode) a candidate geometry.
    fn show_candidate(
        &mut self,
        window: Window,
        geometry: Geometry,
        aero: MaxFlags,
        border: &BorderSize,
    ) -> anyhow::Result<()> {
        let preview = if aero.is_empty() {
            None
        } else {
            self.clients
                .get(window)
                .map(|c| self.maximize_target(c, aero, &c.geometry, border))
                .map(|g| border.frame_of(&g))
        };

        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        let Some(session) = client.controller.session_mut() else {
            return Ok(());
        };
        session.current = geometry;
        session.aero = aero;
        let draw = session.draw;

        match draw {
            DrawMode::Outline => {
                let outline = preview.unwrap_or_else(|| border.frame_of(&geometry));
                self.display.draw_outline(Some(&outline))?;
            }
            DrawMode::Opaque => {
                client.geometry = geometry;
                match preview {
                    Some(rect) => self.display.draw_outline(Some(&rect))?,
                    None => self.display.draw_outline(None)?,
                }
                self.apply_geometry(window)?;
            }
        }
        Ok(())
    }

    /// Desktop-switch timer fired while dragging at a screen edge.
    pub(crate) fn edge_switch(&mut self, delta: i32) -> anyhow::Result<()> {
        let Some(window) = self.interactive else {
            return Ok(());
        };
        let (x, _) = self.display.query_pointer()?;
        let still_there = if delta < 0 { x <= 0 } else { x >= self.screen.width - 1 };
        if !still_there {
            return Ok(());
        }

        let count = self.settings.desktop_count as i32;
        let target = (self.current_desktop as i32 + delta).rem_euclid(count) as u32;
        info!("Edge switch to desktop {} while dragging 0x{:x}", target, window);
        self.set_client_desktop(window, target)?;
        self.change_desktop(target)?;

        let warp_x = if delta < 0 { self.screen.width - 2 } else { 1 };
        let (_, y) = self.display.query_pointer()?;
        self.display.warp_pointer(warp_x, y)?;
        Ok(())
    }

    /// Stop the running session (if any) without forcing.
    ///
    /// With `forced` the client is being destroyed: grabs and outline are
    /// released but nothing is written back to it.
    pub fn cancel_session(&mut self, forced: bool) -> anyhow::Result<()> {
        self.end_session(if forced { SessionEnd::Forced } else { SessionEnd::Stop })
    }

    pub fn end_session(&mut self, end: SessionEnd) -> anyhow::Result<()> {
        let Some(window) = self.interactive.take() else {
            return Ok(());
        };
        self.timers.remove_edge_switch();

        let session = self.clients.get_mut(window).and_then(|client| {
            client.state.clear(StatusFlags::DRAG);
            client.controller.cancel(end == SessionEnd::Forced)
        });

        // Input is released even when the outline cannot be erased
        let ungrabbed = self.display.ungrab();
        let erased = self.display.draw_outline(None);
        debug!("Interactive session for 0x{:x} ended: {:?}", window, end);
        ungrabbed?;
        erased?;

        let Some(session) = session else {
            return Ok(());
        };

        match end {
            SessionEnd::Forced => {}
            SessionEnd::Revert => {
                if let Some(client) = self.clients.get_mut(window) {
                    client.geometry = session.start_geometry;
                }
                self.apply_geometry(window)?;
                self.write_state(window)?;
            }
            SessionEnd::Stop => {
                if let Some(client) = self.clients.get_mut(window) {
                    client.geometry = session.current;
                }
                self.apply_geometry(window)?;
                self.write_state(window)?;
            }
            SessionEnd::Commit => {
                if session.aero.is_empty() {
                    if let Some(client) = self.clients.get_mut(window) {
                        client.geometry = session.current;
                    }
                    self.apply_geometry(window)?;
                    self.write_state(window)?;
                } else {
                    // Maximize from where the drag started
                    if let Some(client) = self.clients.get_mut(window) {
                        client.geometry = session.start_geometry;
                        client.state.clear_max_flags();
                    }
                    self.maximize(window, session.aero)?;
                }
            }
        }
        self.mark(Dirty::PAGER);
        Ok(())
    }
}
