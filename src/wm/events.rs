//! Events Module
//!
//! Protocol-neutral events delivered by the display server, and their
//! routing to window manager handlers. The X11 backend decodes raw events
//! and EWMH/ICCCM client messages into these types.

use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::shared::{Geometry, Gravity};
use crate::wm::client_flags::{BorderFlags, Layer, MaxFlags, StatusFlags};
use crate::wm::decorations::FrameContext;
use crate::wm::display::{DisplayServer, NetState, Window};
use crate::wm::keyboard::{modifiers, Action};
use crate::wm::moveresize::{ResizeEdge, SessionEnd};
use crate::wm::placement::{constrain_position, constrain_size, gravitate};
use crate::wm::settings::FocusModel;
use crate::wm::stacking::Relative;
use crate::wm::{Dirty, WindowManager, WmError};

/// Events the window manager reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum WmEvent {
    MapRequest {
        window: Window,
    },
    UnmapNotify {
        window: Window,
        /// Sent by a client (ICCCM withdraw) rather than the server
        synthetic: bool,
    },
    DestroyNotify {
        window: Window,
    },
    ConfigureRequest(ConfigureRequest),
    PropertyNotify {
        window: Window,
        property: Property,
    },
    ClientMessage {
        window: Window,
        request: ClientRequest,
    },
    ButtonPress {
        /// Window the press was reported on (frame, client or root)
        window: Window,
        button: u8,
        state: u16,
        root_x: i32,
        root_y: i32,
        /// Event-window-relative position
        x: i32,
        y: i32,
    },
    ButtonRelease {
        button: u8,
        root_x: i32,
        root_y: i32,
    },
    MotionNotify {
        root_x: i32,
        root_y: i32,
        state: u16,
    },
    KeyPress {
        window: Window,
        keysym: u32,
        state: u16,
    },
    EnterNotify {
        window: Window,
        root_x: i32,
        root_y: i32,
    },
    Expose {
        window: Window,
        /// Expose events still to follow for the same window
        count: u16,
    },
    ColormapNotify {
        window: Window,
        colormap: u32,
        /// The window's colormap attribute changed (rather than installed)
        new: bool,
    },
    /// Another manager took our selection
    SelectionClear,
    /// Root size or monitor layout changed
    ScreenChange,
    /// Keyboard mapping changed; key grabs must be redone
    MappingNotify,
}

/// Stack mode of a configure or restack request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

impl StackMode {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Above),
            1 => Some(Self::Below),
            2 => Some(Self::TopIf),
            3 => Some(Self::BottomIf),
            4 => Some(Self::Opposite),
            _ => None,
        }
    }
}

/// A ConfigureRequest; absent fields were not in the value mask
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub border_width: Option<i32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

/// Client property that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Name,
    NormalHints,
    WmHints,
    TransientFor,
    Strut,
    ColormapWindows,
    Opacity,
    Other,
}

/// `_NET_WM_STATE` action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Remove,
            1 => Self::Add,
            _ => Self::Toggle,
        }
    }
}

/// `_NET_WM_MOVERESIZE` direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResizeRequest {
    Resize(ResizeEdge),
    Move,
    ResizeKeyboard,
    MoveKeyboard,
    Cancel,
}

impl MoveResizeRequest {
    pub fn from_raw(value: u32) -> Option<Self> {
        let n = ResizeEdge::NORTH;
        let s = ResizeEdge::SOUTH;
        let e = ResizeEdge::EAST;
        let w = ResizeEdge::WEST;
        let request = match value {
            0 => Self::Resize(n | w),
            1 => Self::Resize(n),
            2 => Self::Resize(n | e),
            3 => Self::Resize(e),
            4 => Self::Resize(s | e),
            5 => Self::Resize(s),
            6 => Self::Resize(s | w),
            7 => Self::Resize(w),
            8 => Self::Move,
            9 => Self::ResizeKeyboard,
            10 => Self::MoveKeyboard,
            11 => Self::Cancel,
            _ => return None,
        };
        Some(request)
    }
}

/// Decoded EWMH/ICCCM client message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// `_NET_WM_STATE`
    State { action: StateAction, flags: NetState },
    /// `_NET_ACTIVE_WINDOW`
    Activate,
    /// `_NET_CLOSE_WINDOW`
    Close,
    /// `_NET_WM_DESKTOP`
    Desktop(u32),
    /// `_NET_CURRENT_DESKTOP` (sent to the root)
    CurrentDesktop(u32),
    /// `_NET_SHOWING_DESKTOP` (sent to the root)
    ShowingDesktop(bool),
    /// `_NET_WM_MOVERESIZE`
    MoveResize {
        direction: MoveResizeRequest,
        root_x: i32,
        root_y: i32,
    },
    /// `_NET_MOVERESIZE_WINDOW`
    MoveResizeWindow {
        gravity: Option<Gravity>,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<i32>,
        height: Option<i32>,
    },
    /// `_NET_RESTACK_WINDOW`
    Restack {
        sibling: Option<Window>,
        mode: StackMode,
    },
    /// `WM_CHANGE_STATE`
    ChangeState { iconic: bool },
    Other,
}

impl<D: DisplayServer> WindowManager<D> {
    /// Route one event.
    ///
    /// While an interactive session runs, pointer and key events go to it
    /// first; structural events keep flowing to the normal handlers.
    pub fn dispatch(&mut self, event: WmEvent, now: Instant) -> Result<()> {
        if self.session_event(&event, now)? {
            return Ok(());
        }

        match event {
            WmEvent::MapRequest { window } => self.handle_map_request(window, now),
            WmEvent::UnmapNotify { window, synthetic } => self.handle_unmap_notify(window, synthetic),
            WmEvent::DestroyNotify { window } => {
                if self.clients.contains(window) {
                    self.unmanage(window, false)?;
                }
                Ok(())
            }
            WmEvent::ConfigureRequest(request) => self.handle_configure_request(&request),
            WmEvent::PropertyNotify { window, property } => self.handle_property(window, property, now),
            WmEvent::ClientMessage { window, request } => self.handle_client_request(window, request, now),
            WmEvent::ButtonPress {
                window,
                button,
                state,
                root_x,
                root_y,
                x,
                y,
            } => self.handle_button_press(window, button, state, (root_x, root_y), (x, y), now),
            WmEvent::ButtonRelease { .. } | WmEvent::MotionNotify { .. } => Ok(()),
            WmEvent::KeyPress { keysym, state, .. } => self.handle_key_press(keysym, state, now),
            WmEvent::EnterNotify { window, .. } => self.handle_enter_notify(window),
            WmEvent::Expose { window, count } => {
                if count == 0 {
                    if let Some(client) = self.clients.find_by_frame(window) {
                        let client_window = client.window;
                        self.draw_border(client_window)?;
                    }
                }
                Ok(())
            }
            WmEvent::ColormapNotify { window, colormap, new } => {
                self.handle_colormap_notify(window, colormap, new)
            }
            WmEvent::SelectionClear => {
                warn!("Window manager selection lost, shutting down");
                self.exit_requested = true;
                Ok(())
            }
            WmEvent::ScreenChange => self.handle_screen_change(),
            WmEvent::MappingNotify => self.display.grab_keys(&self.settings.keys),
        }
    }

    fn handle_map_request(&mut self, window: Window, now: Instant) -> Result<()> {
        if self.clients.contains(window) {
            let minimized = self.clients.get(window).is_some_and(|c| c.state.is_minimized());
            if minimized {
                debug!("MapRequest restores minimized 0x{:x}", window);
                self.restore(window, true)?;
            }
            return Ok(());
        }
        self.manage(window, false, now)
    }

    fn handle_unmap_notify(&mut self, window: Window, synthetic: bool) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.ignore_unmap > 0 && !synthetic {
            client.ignore_unmap -= 1;
            return Ok(());
        }
        debug!("Client 0x{:x} withdrawn", window);
        self.unmanage(window, false)
    }

    fn handle_configure_request(&mut self, request: &ConfigureRequest) -> Result<()> {
        let window = request.window;
        if !self.clients.contains(window) {
            return self.display.configure_unmanaged(request);
        }
        if self.interactive == Some(window) {
            self.end_session(SessionEnd::Stop)?;
        }

        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if client.state.is_fullscreen() {
            let geometry = client.geometry;
            return self.display.send_configure_notify(window, &geometry);
        }

        let border = self.decorations.border_size(client);
        let hints = client.hints;
        let mut g = client.geometry;
        if let Some(width) = request.width {
            g.width = width;
        }
        if let Some(height) = request.height {
            g.height = height;
        }
        (g.width, g.height) = hints.clamp_size(g.width, g.height);

        if request.x.is_some() || request.y.is_some() {
            let mut asked = g;
            asked.x = request.x.unwrap_or(g.x - border.west);
            asked.y = request.y.unwrap_or(g.y - border.north);
            let placed = gravitate(&asked, hints.gravity, &border, false);
            if request.x.is_some() {
                g.x = placed.x;
            }
            if request.y.is_some() {
                g.y = placed.y;
            }
        }

        if client.state.has_border(BorderFlags::CONSTRAIN) {
            let monitor = self.monitor_index(&border.frame_of(&g));
            let free = self.free_box(Some(window), monitor);
            g = constrain_size(&g, &hints, &border, &free);
            g = constrain_position(&g, &border, &free);
        }

        if let Some(client) = self.clients.get_mut(window) {
            if g != client.geometry {
                debug!("ConfigureRequest 0x{:x}: {:?} -> {:?}", window, client.geometry, g);
                client.geometry = g;
                if client.state.is_maximized() {
                    client.state.clear_max_flags();
                }
                self.mark(Dirty::PAGER);
            }
        }
        self.apply_geometry(window)?;
        self.write_state(window)?;

        if let Some(mode) = request.stack_mode {
            self.restack_relative(window, request.sibling, mode)?;
        }
        Ok(())
    }

    fn handle_property(&mut self, window: Window, property: Property, now: Instant) -> Result<()> {
        if !self.clients.contains(window) {
            return Ok(());
        }
        match property {
            Property::Name => {
                let name = self.display.read_name(window)?;
                if let Some(client) = self.clients.get_mut(window) {
                    client.name = name.unwrap_or_default();
                }
                self.mark(Dirty::TASK_LIST);
            }
            Property::NormalHints => {
                let hints = self.display.read_size_hints(window)?;
                if let Some(client) = self.clients.get_mut(window) {
                    client.hints = hints;
                }
            }
            Property::WmHints => {
                let hints = self.display.read_wm_hints(window)?;
                if let Some(client) = self.clients.get_mut(window) {
                    if hints.input {
                        client.state.set(StatusFlags::CAN_FOCUS);
                    } else {
                        client.state.clear(StatusFlags::CAN_FOCUS);
                    }
                }
                self.set_urgent(window, hints.urgent, now)?;
            }
            Property::TransientFor => {
                let owner = self.display.read_transient_for(window)?;
                if let Some(client) = self.clients.get_mut(window) {
                    client.owner = owner.filter(|&o| o != window);
                }
            }
            Property::Strut => self.read_struts(window)?,
            Property::ColormapWindows => {
                let windows = self.display.read_colormap_windows(window)?;
                if let Some(client) = self.clients.get_mut(window) {
                    client.colormap_windows = windows;
                }
                if self.active == Some(window) {
                    self.update_colormaps(window)?;
                }
            }
            Property::Opacity => {
                let opacity = self.display.read_opacity(window)?;
                if let Some(client) = self.clients.get_mut(window) {
                    if !client.state.test(StatusFlags::OPACITY) {
                        client.state.opacity = opacity.unwrap_or(crate::wm::client_flags::OPAQUE);
                    }
                }
            }
            Property::Other => {}
        }
        Ok(())
    }

    fn handle_client_request(&mut self, window: Window, request: ClientRequest, now: Instant) -> Result<()> {
        debug!("Client message for 0x{:x}: {:?}", window, request);
        match request {
            ClientRequest::CurrentDesktop(desktop) => {
                if desktop < self.settings.desktop_count {
                    self.change_desktop(desktop)?;
                }
                return Ok(());
            }
            ClientRequest::ShowingDesktop(show) => {
                if show != self.is_showing_desktop() {
                    self.toggle_show_desktop()?;
                }
                return Ok(());
            }
            _ => {}
        }

        if !self.clients.contains(window) {
            return Ok(());
        }

        match request {
            ClientRequest::State { action, flags } => self.apply_net_state(window, action, flags, now),
            ClientRequest::Activate => {
                let minimized = self.clients.get(window).is_some_and(|c| c.state.is_minimized());
                if minimized {
                    self.restore(window, true)?;
                } else {
                    let desktop = self.clients.get(window).map(|c| c.state.desktop);
                    let on_current = self
                        .clients
                        .get(window)
                        .is_some_and(|c| c.state.is_on_desktop(self.current_desktop));
                    if let (false, Some(d)) = (on_current, desktop) {
                        self.change_desktop(d)?;
                    }
                    self.raise_client(window)?;
                    self.focus_client(window)?;
                }
                Ok(())
            }
            ClientRequest::Close => self.close_client(window, now),
            ClientRequest::Desktop(desktop) => {
                if desktop == crate::wm::display::ALL_DESKTOPS {
                    self.set_sticky(window, true)
                } else if desktop < self.settings.desktop_count {
                    self.set_sticky(window, false)?;
                    self.set_client_desktop(window, desktop)
                } else {
                    Ok(())
                }
            }
            ClientRequest::MoveResize {
                direction,
                root_x,
                root_y,
            } => {
                let pointer = (root_x, root_y);
                let result = match direction {
                    MoveResizeRequest::Move => self.start_move(window, pointer, false),
                    MoveResizeRequest::MoveKeyboard => self.start_move(window, pointer, true),
                    MoveResizeRequest::Resize(edge) => self.start_resize(window, edge, pointer, false),
                    MoveResizeRequest::ResizeKeyboard => {
                        self.start_resize(window, ResizeEdge::SOUTH | ResizeEdge::EAST, pointer, true)
                    }
                    MoveResizeRequest::Cancel => {
                        if self.interactive == Some(window) {
                            self.end_session(SessionEnd::Revert)?;
                        }
                        Ok(())
                    }
                };
                self.report_session_start(result)
            }
            ClientRequest::MoveResizeWindow {
                gravity,
                x,
                y,
                width,
                height,
            } => {
                // Same path as a ConfigureRequest, with an explicit gravity
                let saved = self.clients.get(window).map(|c| c.hints.gravity);
                if let (Some(gravity), Some(client)) = (gravity, self.clients.get_mut(window)) {
                    client.hints.gravity = gravity;
                }
                let request = ConfigureRequest {
                    window,
                    x,
                    y,
                    width,
                    height,
                    ..ConfigureRequest::default()
                };
                let result = self.handle_configure_request(&request);
                if let (Some(gravity), Some(client)) = (saved, self.clients.get_mut(window)) {
                    client.hints.gravity = gravity;
                }
                result
            }
            ClientRequest::Restack { sibling, mode } => self.restack_relative(window, sibling, mode),
            ClientRequest::ChangeState { iconic } => {
                if iconic {
                    self.minimize(window, true)?;
                }
                Ok(())
            }
            ClientRequest::CurrentDesktop(_) | ClientRequest::ShowingDesktop(_) | ClientRequest::Other => Ok(()),
        }
    }

    /// Apply a `_NET_WM_STATE` add/remove/toggle.
    fn apply_net_state(&mut self, window: Window, action: StateAction, flags: NetState, now: Instant) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let state = client.state;
        let current = |flag: NetState| -> bool {
            match flag {
                NetState::STICKY => state.is_sticky(),
                NetState::SHADED => state.is_shaded(),
                NetState::FULLSCREEN => state.is_fullscreen(),
                NetState::HIDDEN => state.is_minimized(),
                NetState::SKIP_TASKBAR => state.test(StatusFlags::NOLIST),
                NetState::SKIP_PAGER => state.test(StatusFlags::NOPAGER),
                NetState::ABOVE => state.layer == Layer::Above,
                NetState::BELOW => state.layer == Layer::Below,
                NetState::DEMANDS_ATTENTION => state.is_urgent(),
                NetState::MAXIMIZED_HORZ => state.max_flags().contains(MaxFlags::HORIZ),
                NetState::MAXIMIZED_VERT => state.max_flags().contains(MaxFlags::VERT),
                _ => false,
            }
        };
        let target = |flag: NetState| -> bool {
            match action {
                StateAction::Add => true,
                StateAction::Remove => false,
                StateAction::Toggle => !current(flag),
            }
        };

        // Both maximize axes in one message are one transition
        let max_bits = flags & (NetState::MAXIMIZED_HORZ | NetState::MAXIMIZED_VERT);
        if !max_bits.is_empty() {
            let mut max = state.max_flags();
            for (bit, axis) in [
                (NetState::MAXIMIZED_HORZ, MaxFlags::HORIZ),
                (NetState::MAXIMIZED_VERT, MaxFlags::VERT),
            ] {
                if max_bits.contains(bit) {
                    if target(bit) {
                        max |= axis;
                        if axis == MaxFlags::HORIZ {
                            max.remove(MaxFlags::LEFT | MaxFlags::RIGHT);
                        } else {
                            max.remove(MaxFlags::TOP | MaxFlags::BOTTOM);
                        }
                    } else {
                        max.remove(axis);
                    }
                }
            }
            if max != state.max_flags() {
                self.maximize(window, max)?;
            }
        }

        for flag in flags.iter() {
            let on = target(flag);
            match flag {
                NetState::STICKY => self.set_sticky(window, on)?,
                NetState::SHADED => {
                    if on {
                        self.shade(window)?;
                    } else {
                        self.unshade(window)?;
                    }
                }
                NetState::FULLSCREEN => self.set_fullscreen(window, on)?,
                NetState::HIDDEN => {
                    if on {
                        self.minimize(window, true)?;
                    } else if current(flag) {
                        self.restore(window, true)?;
                    }
                }
                NetState::SKIP_TASKBAR | NetState::SKIP_PAGER => {
                    let bit = if flag == NetState::SKIP_TASKBAR {
                        StatusFlags::NOLIST
                    } else {
                        StatusFlags::NOPAGER
                    };
                    if let Some(client) = self.clients.get_mut(window) {
                        if on {
                            client.state.set(bit);
                        } else {
                            client.state.clear(bit);
                        }
                    }
                    self.mark(Dirty::TASK_LIST | Dirty::PAGER);
                    self.write_state(window)?;
                }
                NetState::ABOVE | NetState::BELOW => {
                    let layer = match (flag == NetState::ABOVE, on) {
                        (true, true) => Some(Layer::Above),
                        (false, true) => Some(Layer::Below),
                        _ => None,
                    };
                    match layer {
                        Some(layer) => self.set_layer(window, layer)?,
                        None => {
                            let default = self.clients.get(window).map(|c| c.state.default_layer);
                            if let Some(default) = default {
                                self.set_layer(window, default)?;
                            }
                        }
                    }
                }
                NetState::DEMANDS_ATTENTION => self.set_urgent(window, on, now)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_button_press(
        &mut self,
        window: Window,
        button: u8,
        state: u16,
        root: (i32, i32),
        local: (i32, i32),
        now: Instant,
    ) -> Result<()> {
        let Some(client_window) = self.clients.resolve(window) else {
            return Ok(());
        };
        let on_frame = self.clients.is_frame(window);
        debug!(
            "ButtonPress {} on 0x{:x} ({}), state 0x{:x}",
            button,
            client_window,
            if on_frame { "frame" } else { "client" },
            state
        );

        if !on_frame {
            self.focus_client(client_window)?;
            self.raise_client(client_window)?;
            let alt = modifiers::clean(state) & modifiers::MOD1 != 0;
            let draggable = self
                .clients
                .get(client_window)
                .is_some_and(|c| !c.state.test(StatusFlags::NO_DRAG));
            if alt && draggable {
                let result = match button {
                    1 => self.start_move(client_window, root, false),
                    3 => {
                        let edge = self
                            .clients
                            .get(client_window)
                            .map(|c| ResizeEdge::nearest(&c.geometry, root.0, root.1))
                            .unwrap_or(ResizeEdge::SOUTH | ResizeEdge::EAST);
                        self.start_resize(client_window, edge, root, false)
                    }
                    _ => Ok(()),
                };
                return self.report_session_start(result);
            }
            return self.display.replay_pointer();
        }

        let Some(client) = self.clients.get(client_window) else {
            return Ok(());
        };
        let context = self.decorations.frame_context(client, local.0, local.1);
        match context {
            FrameContext::Client => Ok(()),
            FrameContext::Title => {
                self.focus_client(client_window)?;
                self.raise_client(client_window)?;
                if button != 1 && button != 2 {
                    return Ok(());
                }
                let double = button == 1
                    && self.last_click.is_some_and(|(w, at)| {
                        w == client_window && now.saturating_duration_since(at) <= self.settings.double_click
                    });
                if double {
                    self.last_click = None;
                    return self.toggle_maximize(client_window, MaxFlags::HORIZ | MaxFlags::VERT);
                }
                self.last_click = Some((client_window, now));
                let result = self.start_move(client_window, root, false);
                self.report_session_start(result)
            }
            FrameContext::Border(edge) => {
                self.focus_client(client_window)?;
                self.raise_client(client_window)?;
                let result = self.start_resize(client_window, edge, root, false);
                self.report_session_start(result)
            }
        }
    }

    fn handle_key_press(&mut self, keysym: u32, state: u16, now: Instant) -> Result<()> {
        let Some(binding) = self.settings.keys.iter().find(|b| b.matches(keysym, state)).copied() else {
            return Ok(());
        };
        debug!("Key binding {:?}", binding.action);
        self.run_action(binding.action, now)
    }

    /// Run a bound action against the active client or the desktops.
    pub fn run_action(&mut self, action: Action, now: Instant) -> Result<()> {
        let count = self.settings.desktop_count;
        let next = (self.current_desktop + 1) % count;
        let previous = (self.current_desktop + count - 1) % count;

        match action {
            Action::NextDesktop => return self.change_desktop(next),
            Action::PreviousDesktop => return self.change_desktop(previous),
            Action::Desktop(d) => {
                if d < count {
                    self.change_desktop(d)?;
                }
                return Ok(());
            }
            Action::ShowDesktop => return self.toggle_show_desktop(),
            _ => {}
        }

        let Some(window) = self.active else {
            return Ok(());
        };
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let state = client.state;
        let geometry = client.geometry;

        match action {
            Action::Close => self.close_client(window, now),
            Action::Kill => self.kill_client(window),
            Action::Minimize => self.minimize(window, true),
            Action::Maximize => self.toggle_maximize(window, MaxFlags::HORIZ | MaxFlags::VERT),
            Action::MaximizeHorizontal => self.toggle_maximize(window, MaxFlags::HORIZ),
            Action::MaximizeVertical => self.toggle_maximize(window, MaxFlags::VERT),
            Action::Shade => {
                if state.is_shaded() {
                    self.unshade(window)
                } else {
                    self.shade(window)
                }
            }
            Action::Fullscreen => self.set_fullscreen(window, !state.is_fullscreen()),
            Action::Stick => self.set_sticky(window, !state.is_sticky()),
            Action::Move => {
                let result = self.start_move(window, geometry.center(), true);
                self.report_session_start(result)
            }
            Action::Resize => {
                let corner = (geometry.right(), geometry.bottom());
                let result = self.start_resize(window, ResizeEdge::SOUTH | ResizeEdge::EAST, corner, true);
                self.report_session_start(result)
            }
            Action::Raise => self.raise_client(window),
            Action::Lower => self.lower_client(window),
            Action::SendToNextDesktop => {
                self.set_client_desktop(window, next)?;
                self.change_desktop(next)
            }
            Action::SendToPreviousDesktop => {
                self.set_client_desktop(window, previous)?;
                self.change_desktop(previous)
            }
            Action::NextDesktop | Action::PreviousDesktop | Action::Desktop(_) | Action::ShowDesktop => Ok(()),
        }
    }

    /// Toggle maximize along the given axes.
    pub fn toggle_maximize(&mut self, window: Window, flags: MaxFlags) -> Result<()> {
        let Some(current) = self.clients.get(window).map(|c| c.state.max_flags()) else {
            return Ok(());
        };
        let target = if current.contains(flags) {
            current - flags
        } else {
            current | flags
        };
        self.maximize(window, target)
    }

    /// Refused or failed session starts are logged; only server errors propagate.
    fn report_session_start(&mut self, result: Result<(), WmError>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(WmError::Display(e)) => Err(e),
            Err(e) => {
                warn!("Interactive session not started: {}", e);
                Ok(())
            }
        }
    }

    fn handle_enter_notify(&mut self, window: Window) -> Result<()> {
        if self.settings.focus_model != FocusModel::Sloppy || self.interactive.is_some() {
            return Ok(());
        }
        let Some(client_window) = self.clients.resolve(window) else {
            return Ok(());
        };
        if self.active != Some(client_window) {
            self.focus_client(client_window)?;
        }
        Ok(())
    }

    fn handle_screen_change(&mut self) -> Result<()> {
        let (width, height) = self.display.screen_size();
        let monitors = self.display.monitors()?;
        self.screen = crate::wm::screen::ScreenLayout::new(width, height, monitors);
        self.cascade.reset();
        info!("Screen changed to {}x{}, {} monitor(s)", width, height, self.screen.monitor_count());
        self.mark(Dirty::RESTACK | Dirty::PAGER);
        Ok(())
    }

    /// Restack a client relative to a sibling (or its whole layer).
    pub fn restack_relative(&mut self, window: Window, sibling: Option<Window>, mode: StackMode) -> Result<()> {
        let sibling = sibling.and_then(|s| self.clients.resolve(s)).filter(|&s| s != window);
        match (mode, sibling) {
            (StackMode::Above, Some(s)) => {
                self.stack.insert_relative(window, s, Relative::Before);
            }
            (StackMode::Below, Some(s)) => {
                self.stack.insert_relative(window, s, Relative::After);
            }
            (StackMode::Above, None) => return self.raise_client(window),
            (StackMode::Below, None) => return self.lower_client(window),
            (StackMode::TopIf | StackMode::BottomIf | StackMode::Opposite, _) => {
                let frame = |wm: &Self, w: Window| -> Option<Geometry> {
                    wm.clients
                        .get(w)
                        .map(|c| wm.decorations.border_size(c).frame_of(&c.geometry))
                };
                let Some(own) = frame(self, window) else {
                    return Ok(());
                };
                let occluded = match sibling {
                    Some(s) => frame(self, s).is_some_and(|g| g.intersects(&own)),
                    None => self.visible_frames_except(window).iter().any(|g| g.intersects(&own)),
                };
                if !occluded {
                    return Ok(());
                }
                return match mode {
                    StackMode::TopIf => self.raise_client(window),
                    StackMode::BottomIf => self.lower_client(window),
                    _ => {
                        let on_top = self
                            .stack
                            .position(window)
                            .is_some_and(|(_, index)| index == 0);
                        if on_top {
                            self.lower_client(window)
                        } else {
                            self.raise_client(window)
                        }
                    }
                };
            }
        }
        // The stacked window may have landed in the sibling's layer
        if let Some(layer) = self.stack.layer_of(window) {
            if let Some(client) = self.clients.get_mut(window) {
                client.state.layer = layer;
            }
        }
        self.mark(Dirty::RESTACK);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moveresize_directions() {
        assert_eq!(
            MoveResizeRequest::from_raw(0),
            Some(MoveResizeRequest::Resize(ResizeEdge::NORTH | ResizeEdge::WEST))
        );
        assert_eq!(
            MoveResizeRequest::from_raw(4),
            Some(MoveResizeRequest::Resize(ResizeEdge::SOUTH | ResizeEdge::EAST))
        );
        assert_eq!(MoveResizeRequest::from_raw(8), Some(MoveResizeRequest::Move));
        assert_eq!(MoveResizeRequest::from_raw(11), Some(MoveResizeRequest::Cancel));
        assert_eq!(MoveResizeRequest::from_raw(12), None);
    }

    #[test]
    fn test_state_action_and_stack_mode() {
        assert_eq!(StateAction::from_raw(0), StateAction::Remove);
        assert_eq!(StateAction::from_raw(2), StateAction::Toggle);
        assert_eq!(StackMode::from_raw(1), Some(StackMode::Below));
        assert_eq!(StackMode::from_raw(9), None);
    }
}
