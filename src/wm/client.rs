use crate::shared::{BorderSize, Geometry, Gravity};
use crate::wm::client_flags::{ClientState, WindowType};
use crate::wm::display::Window;
use crate::wm::moveresize::Controller;

/// Largest dimension the protocol can express
pub const MAX_DIMENSION: i32 = 32767;

/// Aspect ratio bounds (min_x/min_y <= width/height <= max_x/max_y)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aspect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Aspect {
    pub fn min_ratio(&self) -> f32 {
        self.min_x as f32 / self.min_y.max(1) as f32
    }

    pub fn max_ratio(&self) -> f32 {
        self.max_x as f32 / self.max_y.max(1) as f32
    }
}

/// Size constraints (WM_NORMAL_HINTS, already sanitised)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    /// Resize increments, never below 1
    pub width_inc: i32,
    pub height_inc: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub aspect: Option<Aspect>,
    pub gravity: Gravity,
    /// Position came from the user or program (USPosition / PPosition)
    pub has_position: bool,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: MAX_DIMENSION,
            max_height: MAX_DIMENSION,
            width_inc: 1,
            height_inc: 1,
            base_width: 0,
            base_height: 0,
            aspect: None,
            gravity: Gravity::NorthWest,
            has_position: false,
        }
    }
}

impl SizeHints {
    /// Round a width down onto the increment grid.
    pub fn snap_width(&self, width: i32) -> i32 {
        width - (width - self.base_width).rem_euclid(self.width_inc)
    }

    /// Round a height down onto the increment grid.
    pub fn snap_height(&self, height: i32) -> i32 {
        height - (height - self.base_height).rem_euclid(self.height_inc)
    }

    /// Clamp a size into [min, max] on both axes.
    pub fn clamp_size(&self, width: i32, height: i32) -> (i32, i32) {
        (
            width.min(self.max_width).max(self.min_width),
            height.min(self.max_height).max(self.min_height),
        )
    }
}

/// Window Manager client state
/// Represents a window being managed by the WM
#[derive(Debug)]
pub struct Client {
    /// X11 window ID
    pub window: Window,

    /// Frame window, present only when decorated
    pub frame: Option<Window>,

    /// Client area geometry (root coordinates)
    pub geometry: Geometry,

    /// Geometry before maximize/fullscreen
    pub saved: Geometry,

    /// Size constraints
    pub hints: SizeHints,

    /// Status, border, maximize, layer, desktop, opacity
    pub state: ClientState,

    /// Transient-for owner (lookup key only)
    pub owner: Option<Window>,

    pub window_type: WindowType,

    /// Window title
    pub name: String,
    /// WM_CLASS class part
    pub class: String,
    /// WM_CLASS instance part
    pub instance: String,

    /// Process id from _NET_WM_PID
    pub pid: Option<u32>,

    /// Default colormap of the window
    pub colormap: u32,
    /// WM_COLORMAP_WINDOWS
    pub colormap_windows: Vec<Window>,

    /// Interactive move/resize owned by this client
    pub controller: Controller,

    /// Unmap notifications caused by the manager itself
    pub ignore_unmap: u32,
}

impl Client {
    pub fn new(window: Window, geometry: Geometry) -> Self {
        Self {
            window,
            frame: None,
            geometry,
            saved: geometry,
            hints: SizeHints::default(),
            state: ClientState::default(),
            owner: None,
            window_type: WindowType::Normal,
            name: String::new(),
            class: String::new(),
            instance: String::new(),
            pid: None,
            colormap: 0,
            colormap_windows: Vec::new(),
            controller: Controller::None,
            ignore_unmap: 0,
        }
    }

    /// Window that represents this client in the stacking order
    pub fn outer_window(&self) -> Window {
        self.frame.unwrap_or(self.window)
    }

    /// Full geometry including decorations.
    pub fn frame_geometry(&self, border: &BorderSize) -> Geometry {
        border.frame_of(&self.geometry)
    }

    pub fn is_mapped(&self) -> bool {
        self.state.is_mapped()
    }

    pub fn is_sticky(&self) -> bool {
        self.state.is_sticky()
    }

    pub fn should_skip_in_task_list(&self) -> bool {
        self.state.should_skip_in_task_list()
    }

    pub fn is_owned_by(&self, owner: Window) -> bool {
        self.owner == Some(owner)
    }

    /// Remember the current geometry as the restore point.
    pub fn save_geometry(&mut self) {
        self.saved = self.geometry;
    }

    pub fn restore_geometry(&mut self) {
        self.geometry = self.saved;
    }
}
