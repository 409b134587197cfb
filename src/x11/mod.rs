//! X11 Module
//!
//! The x11rb implementation of [`DisplayServer`]: manager selection and
//! startup, frames, grabs, property I/O and event translation.

pub mod atoms;
pub mod hints;
pub mod keymap;
mod translate;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    Allow, Atom, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureNotifyEvent,
    ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask, GetPropertyReply, Grab,
    GrabMode, GrabStatus, InputFocus, MapState, ModMask, PropMode, Rectangle, SetMode, StackMode as XStackMode,
    SubwindowMode, WindowClass, CONFIGURE_NOTIFY_EVENT, GX,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::shared::{BorderSize, Geometry};
use crate::wm::client::{Client, SizeHints};
use crate::wm::client_flags::OPAQUE;
use crate::wm::display::{
    ClientInfo, Cursor, DesktopState, DisplayServer, Protocols, Window, WmHints, ALL_DESKTOPS,
};
use crate::wm::events::{ConfigureRequest, StackMode, WmEvent};
use crate::wm::keyboard::{modifiers, KeyBinding};
use crate::wm::screen::Monitor;
use crate::wm::WmError;

use self::atoms::{net_state_of, Atoms, ICONIC_STATE, NORMAL_STATE, WITHDRAWN_STATE};
use self::hints::{join_names, parse_motif, parse_size_hints, parse_wm_class, parse_wm_hints};
use self::keymap::KeyMap;

/// How long `--replace` waits for the previous manager to go away
const REPLACE_TIMEOUT: Duration = Duration::from_secs(15);

const WM_NAME: &str = "layerwm";

/// Modifier combinations that must not defeat a grab
const IGNORED_COMBOS: [u16; 4] = [0, modifiers::LOCK, modifiers::MOD2, modifiers::LOCK | modifiers::MOD2];

/// Pointer shapes from the core cursor font
#[derive(Debug, Clone, Copy)]
struct Cursors {
    normal: u32,
    moving: u32,
    north: u32,
    south: u32,
    east: u32,
    west: u32,
    north_east: u32,
    north_west: u32,
    south_east: u32,
    south_west: u32,
}

impl Cursors {
    fn create(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;
        let glyph = |shape: u16| -> Result<u32> {
            let id = conn.generate_id()?;
            conn.create_glyph_cursor(id, font, font, shape, shape + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)?;
            Ok(id)
        };
        let cursors = Self {
            normal: glyph(68)?,
            moving: glyph(52)?,
            north: glyph(138)?,
            south: glyph(16)?,
            east: glyph(96)?,
            west: glyph(70)?,
            north_east: glyph(136)?,
            north_west: glyph(134)?,
            south_east: glyph(14)?,
            south_west: glyph(12)?,
        };
        conn.close_font(font)?;
        Ok(cursors)
    }

    fn get(&self, cursor: Cursor) -> u32 {
        match cursor {
            Cursor::Default => self.normal,
            Cursor::Move => self.moving,
            Cursor::ResizeNorth => self.north,
            Cursor::ResizeSouth => self.south,
            Cursor::ResizeEast => self.east,
            Cursor::ResizeWest => self.west,
            Cursor::ResizeNorthEast => self.north_east,
            Cursor::ResizeNorthWest => self.north_west,
            Cursor::ResizeSouthEast => self.south_east,
            Cursor::ResizeSouthWest => self.south_west,
        }
    }
}

/// Connection to an X server, owning the window manager selection
pub struct X11Display {
    conn: Arc<RustConnection>,
    root: Window,
    width: i32,
    height: i32,
    /// Selection owner, `_NET_SUPPORTING_WM_CHECK` target and focus fallback
    owner: Window,
    selection: Atom,
    atoms: Atoms,
    keymap: KeyMap,
    randr: bool,
    cursors: Cursors,
    /// XOR graphics context for rubber-band outlines
    outline_gc: u32,
    outline: Option<Geometry>,
    /// Server time of the last user event
    last_time: u32,
}

impl X11Display {
    /// Connect, take the WM_S{screen} selection and become the manager.
    ///
    /// Fails with [`WmError::ManagerRunning`] when another manager owns the
    /// selection and `replace` is false.
    pub fn connect(display: Option<&str>, replace: bool) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .cloned()
            .context("X server reported no such screen")?;
        let root = screen.root;
        info!(
            "Connected to X server, screen {} ({}x{})",
            screen_num, screen.width_in_pixels, screen.height_in_pixels
        );

        // ICCCM manager selection
        let selection_name = format!("WM_S{}", screen_num);
        let selection = conn
            .intern_atom(false, selection_name.as_bytes())?
            .reply()
            .context("Failed to intern WM selection atom")?
            .atom;
        let previous = conn
            .get_selection_owner(selection)?
            .reply()
            .context("Failed to get current WM selection owner")?
            .owner;
        if previous != NONE {
            if !replace {
                return Err(WmError::ManagerRunning(previous).into());
            }
            info!("Replacing window manager 0x{:x}", previous);
            // Learn when it goes away
            conn.change_window_attributes(
                previous,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
            )?;
        }

        let owner = conn.generate_id()?;
        conn.create_window(
            screen.root_depth,
            owner,
            root,
            -1000,
            -1000,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .override_redirect(1)
                .event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        conn.map_window(owner)?;
        conn.set_selection_owner(owner, selection, CURRENT_TIME)?
            .check()
            .context("Failed to set WM selection owner")?;
        let acquired = conn.get_selection_owner(selection)?.reply()?.owner;
        if acquired != owner {
            anyhow::bail!(
                "Failed to acquire WM selection ownership (expected 0x{:x}, got 0x{:x})",
                owner,
                acquired
            );
        }
        if previous != NONE {
            wait_for_exit(&conn, previous)?;
        }

        let manager = conn.intern_atom(false, b"MANAGER")?.reply()?.atom;
        let announce = ClientMessageEvent::new(32, root, manager, [CURRENT_TIME, selection, owner, 0, 0]);
        conn.send_event(false, root, EventMask::STRUCTURE_NOTIFY, announce)?;

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(root_event_mask()),
        )?
        .check()
        .context("Failed to select events on root window - is another WM running?")?;

        let atoms = Atoms::new(conn.as_ref())?;
        conn.change_property32(PropMode::REPLACE, root, atoms.net_supported, AtomEnum::ATOM, &atoms.supported())?;
        for window in [root, owner] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                atoms.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[owner],
            )?;
        }
        conn.change_property8(PropMode::REPLACE, owner, atoms.net_wm_name, atoms.utf8_string, WM_NAME.as_bytes())?;

        let randr = conn.extension_information(randr::X11_EXTENSION_NAME)?.is_some();
        if randr {
            conn.randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE)?;
        } else {
            warn!("RandR not available, treating the root as one monitor");
        }

        let cursors = Cursors::create(&conn)?;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().cursor(cursors.normal))?;

        let outline_gc = conn.generate_id()?;
        conn.create_gc(
            outline_gc,
            root,
            &CreateGCAux::new()
                .function(GX::XOR)
                .foreground(screen.white_pixel)
                .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS)
                .line_width(2),
        )?;

        let keymap = KeyMap::load(conn.as_ref())?;
        conn.flush()?;
        info!("Window manager selection acquired (owner 0x{:x})", owner);

        Ok(Self {
            conn,
            root,
            width: i32::from(screen.width_in_pixels),
            height: i32::from(screen.height_in_pixels),
            owner,
            selection,
            atoms,
            keymap,
            randr,
            cursors,
            outline_gc,
            outline: None,
            last_time: CURRENT_TIME,
        })
    }

    /// Shared handle for the readiness poller
    pub fn connection(&self) -> Arc<RustConnection> {
        Arc::clone(&self.conn)
    }

    /// Fetch a property; `None` when it is unset or the window is gone.
    fn property(
        &self,
        window: Window,
        property: impl Into<Atom>,
        type_: impl Into<Atom>,
        length: u32,
    ) -> Result<Option<GetPropertyReply>> {
        let cookie = self.conn.get_property(false, window, property, type_, 0, length)?;
        let reply = cookie.reply().ok().filter(|r| r.type_ != u32::from(AtomEnum::NONE));
        Ok(reply)
    }

    fn property32(&self, window: Window, property: impl Into<Atom>, type_: impl Into<Atom>, length: u32) -> Result<Vec<u32>> {
        let Some(reply) = self.property(window, property, type_, length)? else {
            return Ok(Vec::new());
        };
        let values: Vec<u32> = reply.value32().map(|v| v.collect()).unwrap_or_default();
        Ok(values)
    }

    fn property_text(&self, window: Window, property: impl Into<Atom>, type_: impl Into<Atom>) -> Result<Option<String>> {
        let text = self
            .property(window, property, type_, 1024)?
            .map(|r| String::from_utf8_lossy(&r.value).trim_end_matches('\0').to_string());
        Ok(text)
    }

    fn send_protocol(&self, window: Window, protocol: Atom) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, self.atoms.wm_protocols, [protocol, self.last_time, 0, 0, 0]);
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn xor_rectangle(&self, rect: &Geometry) -> Result<()> {
        let rectangle = Rectangle {
            x: rect.x as i16,
            y: rect.y as i16,
            width: rect.width.max(1) as u16,
            height: rect.height.max(1) as u16,
        };
        self.conn.poly_rectangle(self.root, self.outline_gc, &[rectangle])?;
        Ok(())
    }

    fn grab_status(status: GrabStatus, what: &str) -> bool {
        if status == GrabStatus::SUCCESS {
            true
        } else {
            debug!("{} grab refused: {:?}", what, status);
            false
        }
    }
}

/// Poll until the previous manager's selection window is destroyed.
fn wait_for_exit(conn: &RustConnection, previous: Window) -> Result<()> {
    info!("Waiting for previous WM to exit...");
    let start = Instant::now();
    while start.elapsed() < REPLACE_TIMEOUT {
        if conn.get_window_attributes(previous)?.reply().is_err() {
            info!("Previous WM exited");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    warn!("Timeout waiting for previous WM to exit, proceeding anyway");
    Ok(())
}

/// Events selected on the root while managing
fn root_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
        | EventMask::COLOR_MAP_CHANGE
}

/// Events selected on every managed client window
fn client_event_mask() -> EventMask {
    EventMask::PROPERTY_CHANGE | EventMask::COLOR_MAP_CHANGE | EventMask::ENTER_WINDOW
}

fn x_stack_mode(mode: StackMode) -> XStackMode {
    match mode {
        StackMode::Above => XStackMode::ABOVE,
        StackMode::Below => XStackMode::BELOW,
        StackMode::TopIf => XStackMode::TOP_IF,
        StackMode::BottomIf => XStackMode::BOTTOM_IF,
        StackMode::Opposite => XStackMode::OPPOSITE,
    }
}

fn size(value: i32) -> u32 {
    value.max(1) as u32
}

impl DisplayServer for X11Display {
    fn screen_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn monitors(&self) -> Result<Vec<Monitor>> {
        if !self.randr {
            return Ok(Vec::new());
        }
        let reply = match self.conn.randr_get_monitors(self.root, true)?.reply() {
            Ok(reply) => reply,
            Err(e) => {
                debug!("RandR monitor query failed: {:?}", e);
                return Ok(Vec::new());
            }
        };
        let mut monitors = Vec::with_capacity(reply.monitors.len());
        for (index, info) in reply.monitors.iter().enumerate() {
            let name = self
                .conn
                .get_atom_name(info.name)?
                .reply()
                .map(|r| String::from_utf8_lossy(&r.name).into_owned())
                .unwrap_or_default();
            monitors.push(Monitor {
                index,
                bounds: Geometry::new(
                    i32::from(info.x),
                    i32::from(info.y),
                    i32::from(info.width),
                    i32::from(info.height),
                ),
                name,
                primary: info.primary,
            });
        }
        Ok(monitors)
    }

    fn existing_windows(&mut self) -> Result<Vec<Window>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        Ok(tree.children.into_iter().filter(|&w| w != self.owner).collect())
    }

    fn read_client_info(&mut self, window: Window) -> Result<Option<ClientInfo>> {
        let attributes = self.conn.get_window_attributes(window)?;
        let geometry = self.conn.get_geometry(window)?;
        let (Ok(attributes), Ok(geometry)) = (attributes.reply(), geometry.reply()) else {
            return Ok(None);
        };

        let protocols = self.property32(window, self.atoms.wm_protocols, AtomEnum::ATOM, 64)?;
        let window_type = self.property32(window, self.atoms.net_wm_window_type, AtomEnum::ATOM, 64)?;
        let net_state = self.property32(window, self.atoms.net_wm_state, AtomEnum::ATOM, 64)?;
        let motif = self.property32(window, self.atoms.motif_wm_hints, AtomEnum::ANY, 5)?;
        let (instance, class) = self
            .property(window, AtomEnum::WM_CLASS, AtomEnum::STRING, 256)?
            .map(|r| parse_wm_class(&r.value))
            .unwrap_or_default();

        Ok(Some(ClientInfo {
            geometry: Geometry::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                i32::from(geometry.width),
                i32::from(geometry.height),
            ),
            override_redirect: attributes.override_redirect,
            input_only: attributes.class == WindowClass::INPUT_ONLY,
            viewable: attributes.map_state == MapState::VIEWABLE,
            name: self.read_name(window)?.unwrap_or_default(),
            class,
            instance,
            size_hints: self.read_size_hints(window)?,
            wm_hints: self.read_wm_hints(window)?,
            protocols: Protocols {
                delete_window: protocols.contains(&self.atoms.wm_delete_window),
                take_focus: protocols.contains(&self.atoms.wm_take_focus),
            },
            transient_for: self.read_transient_for(window)?,
            window_type: self.atoms.window_type(&window_type),
            net_state: self.atoms.decode_net_state(&net_state),
            desktop: self
                .property32(window, self.atoms.net_wm_desktop, AtomEnum::CARDINAL, 1)?
                .first()
                .copied(),
            motif: parse_motif(&motif),
            opacity: self.read_opacity(window)?,
            strut: self.read_strut(window)?,
            pid: self
                .property32(window, self.atoms.net_wm_pid, AtomEnum::CARDINAL, 1)?
                .first()
                .copied(),
            colormap: attributes.colormap,
            colormap_windows: self.read_colormap_windows(window)?,
        }))
    }

    fn read_name(&mut self, window: Window) -> Result<Option<String>> {
        if let Some(name) = self.property_text(window, self.atoms.net_wm_name, self.atoms.utf8_string)? {
            return Ok(Some(name));
        }
        self.property_text(window, AtomEnum::WM_NAME, AtomEnum::ANY)
    }

    fn read_size_hints(&mut self, window: Window) -> Result<SizeHints> {
        let values = self.property32(window, AtomEnum::WM_NORMAL_HINTS, AtomEnum::WM_SIZE_HINTS, 18)?;
        Ok(parse_size_hints(&values))
    }

    fn read_wm_hints(&mut self, window: Window) -> Result<WmHints> {
        let values = self.property32(window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, 9)?;
        Ok(parse_wm_hints(&values))
    }

    fn read_transient_for(&mut self, window: Window) -> Result<Option<Window>> {
        let values = self.property32(window, AtomEnum::WM_TRANSIENT_FOR, AtomEnum::WINDOW, 1)?;
        Ok(values.first().copied().filter(|&w| w != NONE && w != window))
    }

    fn read_strut(&mut self, window: Window) -> Result<Vec<u32>> {
        let partial = self.property32(window, self.atoms.net_wm_strut_partial, AtomEnum::CARDINAL, 12)?;
        if !partial.is_empty() {
            return Ok(partial);
        }
        self.property32(window, self.atoms.net_wm_strut, AtomEnum::CARDINAL, 4)
    }

    fn read_colormap_windows(&mut self, window: Window) -> Result<Vec<Window>> {
        self.property32(window, self.atoms.wm_colormap_windows, AtomEnum::WINDOW, 256)
    }

    fn read_opacity(&mut self, window: Window) -> Result<Option<u32>> {
        let values = self.property32(window, self.atoms.net_wm_window_opacity, AtomEnum::CARDINAL, 1)?;
        Ok(values.first().copied())
    }

    fn select_client_events(&mut self, window: Window) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(client_event_mask()),
        )?;
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().border_width(0))?;
        Ok(())
    }

    fn create_frame(&mut self, window: Window, frame: &Geometry, border: &BorderSize) -> Result<Window> {
        let id = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            id,
            self.root,
            frame.x as i16,
            frame.y as i16,
            size(frame.width) as u16,
            size(frame.height) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1).event_mask(
                EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::ENTER_WINDOW
                    | EventMask::EXPOSURE,
            ),
        )?;
        self.conn.change_save_set(SetMode::INSERT, window)?;
        self.conn
            .reparent_window(window, id, border.west as i16, border.north as i16)?;
        debug!("Framed 0x{:x} in 0x{:x}", window, id);
        Ok(id)
    }

    fn release_window(&mut self, window: Window, frame: Option<Window>, geometry: &Geometry, remap: bool) -> Result<()> {
        if let Some(frame) = frame {
            self.conn
                .reparent_window(window, self.root, geometry.x as i16, geometry.y as i16)?;
            self.conn.change_save_set(SetMode::DELETE, window)?;
            self.conn.destroy_window(frame)?;
        } else {
            self.conn
                .configure_window(window, &ConfigureWindowAux::new().x(geometry.x).y(geometry.y))?;
        }
        if remap {
            self.conn.map_window(window)?;
        } else {
            self.conn.unmap_window(window)?;
            self.conn.change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.wm_state,
                self.atoms.wm_state,
                &[WITHDRAWN_STATE, NONE],
            )?;
            self.conn.delete_property(window, self.atoms.net_wm_state)?;
            self.conn.delete_property(window, self.atoms.net_wm_desktop)?;
        }
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn configure_client(
        &mut self,
        window: Window,
        frame: Option<Window>,
        geometry: &Geometry,
        border: &BorderSize,
        shaded: bool,
    ) -> Result<()> {
        let Some(frame) = frame else {
            let aux = ConfigureWindowAux::new()
                .x(geometry.x)
                .y(geometry.y)
                .width(size(geometry.width))
                .height(size(geometry.height));
            self.conn.configure_window(window, &aux)?;
            return Ok(());
        };

        let outer = border.frame_of(geometry);
        let outer_height = if shaded { border.north } else { outer.height };
        self.conn.configure_window(
            frame,
            &ConfigureWindowAux::new()
                .x(outer.x)
                .y(outer.y)
                .width(size(outer.width))
                .height(size(outer_height)),
        )?;
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(border.west)
                .y(border.north)
                .width(size(geometry.width))
                .height(size(geometry.height)),
        )?;
        Ok(())
    }

    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        aux.x = request.x;
        aux.y = request.y;
        aux.width = request.width.map(size);
        aux.height = request.height.map(size);
        aux.border_width = request.border_width.map(|b| b.max(0) as u32);
        aux.sibling = request.sibling;
        aux.stack_mode = request.stack_mode.map(x_stack_mode);
        self.conn.configure_window(request.window, &aux)?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: &Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: size(geometry.width) as u16,
            height: size(geometry.height) as u16,
            border_width: 0,
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn restack(&mut self, order: &[Window]) -> Result<()> {
        let Some((&top, rest)) = order.split_first() else {
            return Ok(());
        };
        self.conn
            .configure_window(top, &ConfigureWindowAux::new().stack_mode(XStackMode::ABOVE))?;
        let mut above = top;
        for &window in rest {
            self.conn.configure_window(
                window,
                &ConfigureWindowAux::new().sibling(above).stack_mode(XStackMode::BELOW),
            )?;
            above = window;
        }
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>) -> Result<()> {
        let target = window.unwrap_or(self.owner);
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, target, self.last_time)?;
        Ok(())
    }

    fn send_take_focus(&mut self, window: Window) -> Result<()> {
        self.send_protocol(window, self.atoms.wm_take_focus)
    }

    fn send_delete_window(&mut self, window: Window) -> Result<()> {
        self.send_protocol(window, self.atoms.wm_delete_window)
    }

    fn kill_client(&mut self, window: Window) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn install_colormap(&mut self, colormap: u32) -> Result<()> {
        self.conn.install_colormap(colormap)?;
        Ok(())
    }

    fn grab_pointer(&mut self, cursor: Cursor) -> Result<bool> {
        // Thaw a synchronous click grab before taking the pointer over
        self.conn.allow_events(Allow::ASYNC_POINTER, CURRENT_TIME)?;
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                self.cursors.get(cursor),
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(Self::grab_status(reply.status, "Pointer"))
    }

    fn grab_keyboard(&mut self) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(false, self.root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(Self::grab_status(reply.status, "Keyboard"))
    }

    fn ungrab(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        Ok(())
    }

    fn query_pointer(&mut self) -> Result<(i32, i32)> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(NONE, self.root, 0, 0, 0, 0, x as i16, y as i16)?;
        Ok(())
    }

    fn draw_outline(&mut self, rect: Option<&Geometry>) -> Result<()> {
        let rect = rect.copied();
        if rect == self.outline {
            return Ok(());
        }
        // XOR twice erases
        if let Some(old) = self.outline.take() {
            self.xor_rectangle(&old)?;
        }
        if let Some(new) = rect {
            self.xor_rectangle(&new)?;
        }
        self.outline = rect;
        Ok(())
    }

    fn grab_keys(&mut self, bindings: &[KeyBinding]) -> Result<()> {
        self.conn.ungrab_key(Grab::ANY, self.root, ModMask::ANY)?;
        let mut grabbed = 0;
        for binding in bindings {
            let keycodes = self.keymap.keycodes(binding.keysym);
            if keycodes.is_empty() {
                warn!("No keycode for keysym 0x{:x} ({:?})", binding.keysym, binding.action);
            }
            for keycode in keycodes {
                for extra in IGNORED_COMBOS {
                    self.conn.grab_key(
                        true,
                        self.root,
                        ModMask::from(binding.modifiers | extra),
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )?;
                }
                grabbed += 1;
            }
        }
        debug!("Grabbed {} key(s) for {} binding(s)", grabbed, bindings.len());
        Ok(())
    }

    fn grab_client_buttons(&mut self, window: Window, click_to_focus: bool) -> Result<()> {
        self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;
        let events = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE;
        if click_to_focus {
            // Frozen until the core replays the click or starts a drag
            self.conn.grab_button(
                false,
                window,
                events,
                GrabMode::SYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                ButtonIndex::ANY,
                ModMask::ANY,
            )?;
            return Ok(());
        }
        for button in [ButtonIndex::M1, ButtonIndex::M3] {
            for extra in IGNORED_COMBOS {
                self.conn.grab_button(
                    false,
                    window,
                    events,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                    NONE,
                    NONE,
                    button,
                    ModMask::from(modifiers::MOD1 | extra),
                )?;
            }
        }
        Ok(())
    }

    fn replay_pointer(&mut self) -> Result<()> {
        self.conn.allow_events(Allow::REPLAY_POINTER, CURRENT_TIME)?;
        Ok(())
    }

    fn paint_frame(&mut self, frame: Window, pixel: u32) -> Result<()> {
        self.conn
            .change_window_attributes(frame, &ChangeWindowAttributesAux::new().background_pixel(pixel))?;
        self.conn.clear_area(false, frame, 0, 0, 0, 0)?;
        Ok(())
    }

    fn write_state(&mut self, client: &Client, extents: &BorderSize) -> Result<()> {
        let window = client.window;
        let state = &client.state;
        let wm_state = if state.is_minimized() { ICONIC_STATE } else { NORMAL_STATE };
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[wm_state, NONE],
        )?;

        let desktop = if state.is_sticky() { ALL_DESKTOPS } else { state.desktop };
        self.conn
            .change_property32(PropMode::REPLACE, window, self.atoms.net_wm_desktop, AtomEnum::CARDINAL, &[desktop])?;

        let net_state = self.atoms.encode_net_state(net_state_of(state));
        self.conn
            .change_property32(PropMode::REPLACE, window, self.atoms.net_wm_state, AtomEnum::ATOM, &net_state)?;

        let actions = self.atoms.allowed_actions(client);
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_allowed_actions,
            AtomEnum::ATOM,
            &actions,
        )?;

        let frame_extents = [extents.west, extents.east, extents.north, extents.south].map(|v| v.max(0) as u32);
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_frame_extents,
            AtomEnum::CARDINAL,
            &frame_extents,
        )?;

        // Compositors read opacity from the top-level window
        if let Some(frame) = client.frame {
            if state.opacity == OPAQUE {
                self.conn.delete_property(frame, self.atoms.net_wm_window_opacity)?;
            } else {
                self.conn.change_property32(
                    PropMode::REPLACE,
                    frame,
                    self.atoms.net_wm_window_opacity,
                    AtomEnum::CARDINAL,
                    &[state.opacity],
                )?;
            }
        }
        Ok(())
    }

    fn write_client_list(&mut self, managed: &[Window], stacking: &[Window]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, self.root, self.atoms.net_client_list, AtomEnum::WINDOW, managed)?;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_client_list_stacking,
            AtomEnum::WINDOW,
            stacking,
        )?;
        Ok(())
    }

    fn write_desktop_state(&mut self, state: &DesktopState) -> Result<()> {
        let root = self.root;
        let atoms = self.atoms;
        let count = state.count.max(1) as usize;
        self.conn
            .change_property32(PropMode::REPLACE, root, atoms.net_number_of_desktops, AtomEnum::CARDINAL, &[state.count])?;
        self.conn
            .change_property32(PropMode::REPLACE, root, atoms.net_current_desktop, AtomEnum::CARDINAL, &[state.current])?;
        self.conn.change_property8(
            PropMode::REPLACE,
            root,
            atoms.net_desktop_names,
            atoms.utf8_string,
            &join_names(&state.names),
        )?;
        self.conn.change_property32(
            PropMode::REPLACE,
            root,
            atoms.net_showing_desktop,
            AtomEnum::CARDINAL,
            &[u32::from(state.showing_desktop)],
        )?;
        self.conn.change_property32(
            PropMode::REPLACE,
            root,
            atoms.net_desktop_geometry,
            AtomEnum::CARDINAL,
            &[size(self.width), size(self.height)],
        )?;
        self.conn.change_property32(
            PropMode::REPLACE,
            root,
            atoms.net_desktop_viewport,
            AtomEnum::CARDINAL,
            &vec![0; count * 2],
        )?;
        let area = state.workarea;
        let workarea: Vec<u32> = std::iter::repeat([area.x.max(0) as u32, area.y.max(0) as u32, size(area.width), size(area.height)])
            .take(count)
            .flatten()
            .collect();
        self.conn
            .change_property32(PropMode::REPLACE, root, atoms.net_workarea, AtomEnum::CARDINAL, &workarea)?;
        Ok(())
    }

    fn write_active_window(&mut self, window: Option<Window>) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_active_window,
            AtomEnum::WINDOW,
            &[window.unwrap_or(NONE)],
        )?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<WmEvent>> {
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(event) = self.translate(event) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        // Best effort; the connection may already be gone
        let _ = self.conn.destroy_window(self.owner);
        let _ = self.conn.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_mask_redirects_and_tracks_colormaps() {
        let mask = u32::from(root_event_mask());
        // SubstructureRedirect, SubstructureNotify, PropertyChange, ColormapChange
        assert_eq!(mask, (1 << 20) | (1 << 19) | (1 << 22) | (1 << 23));
    }

    #[test]
    fn test_client_mask_tracks_colormaps() {
        let mask = client_event_mask();
        assert!(mask.contains(EventMask::COLOR_MAP_CHANGE));
        assert!(mask.contains(EventMask::PROPERTY_CHANGE));
        assert!(mask.contains(EventMask::ENTER_WINDOW));
        assert!(!mask.contains(EventMask::SUBSTRUCTURE_REDIRECT));
    }
}
