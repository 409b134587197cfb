//! Display Module
//!
//! The boundary between the window manager core and the display server.
//! The core only talks to the server through [`DisplayServer`]; the X11
//! backend lives in `crate::x11` and a recording fake in `wm::testing`.

use anyhow::Result;
use bitflags::bitflags;

use crate::shared::{BorderSize, Geometry};
use crate::wm::client::{Client, SizeHints};
use crate::wm::client_flags::WindowType;
use crate::wm::events::{ConfigureRequest, WmEvent};
use crate::wm::keyboard::KeyBinding;
use crate::wm::screen::Monitor;

/// Server window handle
pub type Window = u32;

/// `_NET_WM_DESKTOP` value meaning "all desktops"
pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

bitflags! {
    /// `_NET_WM_STATE` atoms, decoded
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NetState: u16 {
        const STICKY            = 1 << 0;
        const MAXIMIZED_HORZ    = 1 << 1;
        const MAXIMIZED_VERT    = 1 << 2;
        const SHADED            = 1 << 3;
        const FULLSCREEN        = 1 << 4;
        const HIDDEN            = 1 << 5;
        const SKIP_TASKBAR      = 1 << 6;
        const SKIP_PAGER        = 1 << 7;
        const ABOVE             = 1 << 8;
        const BELOW             = 1 << 9;
        const DEMANDS_ATTENTION = 1 << 10;
        const MODAL             = 1 << 11;
    }
}

/// ICCCM WM_HINTS subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmHints {
    /// Client accepts focus via SetInputFocus
    pub input: bool,
    pub urgent: bool,
    /// Initial state is IconicState
    pub iconic: bool,
}

impl Default for WmHints {
    fn default() -> Self {
        Self {
            input: true,
            urgent: false,
            iconic: false,
        }
    }
}

/// WM_PROTOCOLS subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protocols {
    pub delete_window: bool,
    pub take_focus: bool,
}

/// Decoration request from `_MOTIF_WM_HINTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotifHints {
    /// `Some(false)` asks for no decorations at all
    pub decorations: Option<bool>,
    /// `Some(false)` asks for a window that cannot be resized
    pub resize: Option<bool>,
}

/// Everything read from the server when a window is about to be managed
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub geometry: Geometry,
    pub override_redirect: bool,
    pub input_only: bool,
    /// Window was already viewable (startup scan)
    pub viewable: bool,
    pub name: String,
    pub class: String,
    pub instance: String,
    pub size_hints: SizeHints,
    pub wm_hints: WmHints,
    pub protocols: Protocols,
    pub transient_for: Option<Window>,
    pub window_type: WindowType,
    pub net_state: NetState,
    /// `_NET_WM_DESKTOP`
    pub desktop: Option<u32>,
    pub motif: MotifHints,
    pub opacity: Option<u32>,
    /// Raw `_NET_WM_STRUT_PARTIAL` / `_NET_WM_STRUT` values
    pub strut: Vec<u32>,
    pub pid: Option<u32>,
    pub colormap: u32,
    pub colormap_windows: Vec<Window>,
}

/// Root-window properties describing the desktops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopState {
    pub count: u32,
    pub current: u32,
    pub names: Vec<String>,
    pub showing_desktop: bool,
    /// Root minus struts
    pub workarea: Geometry,
}

/// Pointer shape during grabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Move,
    ResizeNorth,
    ResizeSouth,
    ResizeEast,
    ResizeWest,
    ResizeNorthEast,
    ResizeNorthWest,
    ResizeSouthEast,
    ResizeSouthWest,
}

/// Operations the core needs from a display server.
///
/// Reads return `Ok(None)` (or defaults) for windows that disappeared;
/// errors are reserved for a broken connection.
pub trait DisplayServer {
    /// Root size and monitor outputs
    fn screen_size(&self) -> (i32, i32);
    fn monitors(&self) -> Result<Vec<Monitor>>;

    /// Top-level windows that existed before the manager started
    fn existing_windows(&mut self) -> Result<Vec<Window>>;

    /// Read everything needed to manage a window. `None` when the window is
    /// gone or its attributes are unreadable.
    fn read_client_info(&mut self, window: Window) -> Result<Option<ClientInfo>>;
    fn read_name(&mut self, window: Window) -> Result<Option<String>>;
    fn read_size_hints(&mut self, window: Window) -> Result<SizeHints>;
    fn read_wm_hints(&mut self, window: Window) -> Result<WmHints>;
    fn read_transient_for(&mut self, window: Window) -> Result<Option<Window>>;
    fn read_strut(&mut self, window: Window) -> Result<Vec<u32>>;
    fn read_colormap_windows(&mut self, window: Window) -> Result<Vec<Window>>;
    fn read_opacity(&mut self, window: Window) -> Result<Option<u32>>;

    /// Take a client over: ask for its property, colormap and crossing
    /// events and drop its server border
    fn select_client_events(&mut self, window: Window) -> Result<()>;
    /// Create a frame around `window` and reparent the window into it.
    fn create_frame(&mut self, window: Window, frame: &Geometry, border: &BorderSize) -> Result<Window>;
    /// Give a window back to the root at `geometry`, destroying its frame.
    fn release_window(&mut self, window: Window, frame: Option<Window>, geometry: &Geometry, remap: bool) -> Result<()>;

    fn map_window(&mut self, window: Window) -> Result<()>;
    fn unmap_window(&mut self, window: Window) -> Result<()>;
    /// Place a client, and its frame if it has one, at `geometry` (root
    /// coordinates of the client area). A shaded frame is cut to its title.
    fn configure_client(
        &mut self,
        window: Window,
        frame: Option<Window>,
        geometry: &Geometry,
        border: &BorderSize,
        shaded: bool,
    ) -> Result<()>;
    /// Pass a configure request through for a window we do not manage
    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()>;
    /// Synthetic ConfigureNotify with the client's root position
    fn send_configure_notify(&mut self, window: Window, geometry: &Geometry) -> Result<()>;

    /// Restack outer windows, topmost first
    fn restack(&mut self, order: &[Window]) -> Result<()>;

    /// Focus a window, or the manager's fallback window for `None`
    fn set_input_focus(&mut self, window: Option<Window>) -> Result<()>;
    fn send_take_focus(&mut self, window: Window) -> Result<()>;
    fn send_delete_window(&mut self, window: Window) -> Result<()>;
    fn kill_client(&mut self, window: Window) -> Result<()>;
    fn install_colormap(&mut self, colormap: u32) -> Result<()>;

    /// Returns false when another client holds the grab
    fn grab_pointer(&mut self, cursor: Cursor) -> Result<bool>;
    fn grab_keyboard(&mut self) -> Result<bool>;
    /// Release pointer and keyboard grabs
    fn ungrab(&mut self) -> Result<()>;
    fn query_pointer(&mut self) -> Result<(i32, i32)>;
    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()>;
    /// Draw a rubber-band rectangle; `None` erases the previous one
    fn draw_outline(&mut self, rect: Option<&Geometry>) -> Result<()>;

    fn grab_keys(&mut self, bindings: &[KeyBinding]) -> Result<()>;
    /// Button grabs on a client; with click-to-focus plain clicks are grabbed too
    fn grab_client_buttons(&mut self, window: Window, click_to_focus: bool) -> Result<()>;
    /// Let a grabbed click through to the client
    fn replay_pointer(&mut self) -> Result<()>;

    /// Fill a frame with a solid pixel
    fn paint_frame(&mut self, frame: Window, pixel: u32) -> Result<()>;

    /// Publish per-client properties (WM_STATE, desktop, net state, actions, extents)
    fn write_state(&mut self, client: &Client, extents: &BorderSize) -> Result<()>;
    fn write_client_list(&mut self, managed: &[Window], stacking: &[Window]) -> Result<()>;
    fn write_desktop_state(&mut self, state: &DesktopState) -> Result<()>;
    fn write_active_window(&mut self, window: Option<Window>) -> Result<()>;

    /// Next already-received event, without blocking
    fn poll_event(&mut self) -> Result<Option<WmEvent>>;
    fn flush(&mut self) -> Result<()>;
}
