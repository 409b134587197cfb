//! Client Flags
//!
//! Bitfield state for a managed client: status, border capabilities,
//! maximize mode and stacking layer, bundled into [`ClientState`].

use bitflags::bitflags;

bitflags! {
    /// Client status bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u32 {
        /// Client has the input focus
        const ACTIVE        = 1 << 0;
        /// Client window is mapped
        const MAPPED        = 1 << 1;
        /// Not on the current desktop
        const HIDDEN        = 1 << 2;
        /// Visible on every desktop
        const STICKY        = 1 << 3;
        /// Skip in task lists
        const NOLIST        = 1 << 4;
        /// Skip in pagers
        const NOPAGER       = 1 << 5;
        /// Window belongs to the manager itself
        const WMDIALOG      = 1 << 6;
        const SHADED        = 1 << 7;
        const MINIMIZED     = 1 << 8;
        /// Minimized by the show-desktop toggle
        const SHOW_DESKTOP  = 1 << 9;
        /// Accepts focus through SetInputFocus
        const CAN_FOCUS     = 1 << 10;
        /// Supports WM_TAKE_FOCUS
        const TAKE_FOCUS    = 1 << 11;
        /// Supports WM_DELETE_WINDOW
        const DELETE        = 1 << 12;
        const URGENT        = 1 << 13;
        /// Urgency flash phase
        const FLASH         = 1 << 14;
        /// Ignore urgency hints
        const NOT_URGENT    = 1 << 15;
        /// Center on first placement
        const CENTERED      = 1 << 16;
        /// Tile on first placement
        const TILED         = 1 << 17;
        /// Ignore resize increments when maximizing
        const IGNORE_INC    = 1 << 18;
        /// Ignore program-specified position
        const IGNORE_POS    = 1 << 19;
        const FULLSCREEN    = 1 << 20;
        /// Restoring switches to the client's desktop
        const FIXED         = 1 << 21;
        /// Interactive move/resize in progress
        const DRAG          = 1 << 22;
        /// Opacity fixed by a group rule
        const OPACITY       = 1 << 23;
        /// Program or user specified position hint
        const POSITION      = 1 << 24;
        /// No modifier-drag
        const NO_DRAG       = 1 << 25;
    }
}

bitflags! {
    /// Border capability bits: which decorations and operations apply
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BorderFlags: u16 {
        const OUTLINE     = 1 << 0;
        const TITLE       = 1 << 1;
        const MIN         = 1 << 2;
        const MAX         = 1 << 3;
        const CLOSE       = 1 << 4;
        const RESIZE      = 1 << 5;
        const MOVE        = 1 << 6;
        const MAX_V       = 1 << 7;
        const MAX_H       = 1 << 8;
        const SHADE       = 1 << 9;
        /// Keep configure requests inside the screen
        const CONSTRAIN   = 1 << 10;
        const FULLSCREEN  = 1 << 11;
    }
}

impl Default for BorderFlags {
    fn default() -> Self {
        Self::OUTLINE
            | Self::TITLE
            | Self::MIN
            | Self::MAX
            | Self::CLOSE
            | Self::RESIZE
            | Self::MOVE
            | Self::MAX_V
            | Self::MAX_H
            | Self::SHADE
            | Self::FULLSCREEN
    }
}

bitflags! {
    /// Maximize mode
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MaxFlags: u8 {
        const HORIZ   = 1 << 0;
        const VERT    = 1 << 1;
        const LEFT    = 1 << 2;
        const RIGHT   = 1 << 3;
        const TOP     = 1 << 4;
        const BOTTOM  = 1 << 5;
    }
}

impl MaxFlags {
    pub const NONE: MaxFlags = MaxFlags::empty();

    /// Fold contradictory directional halves into the full axis.
    ///
    /// `LEFT|RIGHT` becomes `HORIZ`, `TOP|BOTTOM` becomes `VERT`, and a full
    /// axis drops any half on the same axis.
    pub fn normalized(self) -> Self {
        let mut flags = self;
        if flags.contains(Self::LEFT | Self::RIGHT) {
            flags.insert(Self::HORIZ);
        }
        if flags.contains(Self::TOP | Self::BOTTOM) {
            flags.insert(Self::VERT);
        }
        if flags.contains(Self::HORIZ) {
            flags.remove(Self::LEFT | Self::RIGHT);
        }
        if flags.contains(Self::VERT) {
            flags.remove(Self::TOP | Self::BOTTOM);
        }
        flags
    }

    /// Affects the horizontal extent
    pub fn horizontal(self) -> bool {
        self.intersects(Self::HORIZ | Self::LEFT | Self::RIGHT)
    }

    /// Affects the vertical extent
    pub fn vertical(self) -> bool {
        self.intersects(Self::VERT | Self::TOP | Self::BOTTOM)
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    #[default]
    Normal,
    Desktop,
    Dock,
    Dialog,
    Toolbar,
    Menu,
    Utility,
    Splashscreen,
    Notification,
}

impl WindowType {
    /// Layer a window of this type starts in
    pub fn default_layer(self) -> Layer {
        match self {
            Self::Desktop => Layer::Desktop,
            Self::Dock => Layer::Above,
            Self::Notification => Layer::Above,
            _ => Layer::Normal,
        }
    }
}

/// Window layer (for stacking), lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Layer {
    Desktop = 0,
    Below = 1,
    #[default]
    Normal = 2,
    Above = 3,
}

impl Layer {
    pub const COUNT: usize = 4;

    /// Topmost first
    pub const TOP_DOWN: [Layer; 4] = [Layer::Above, Layer::Normal, Layer::Below, Layer::Desktop];

    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Desktop),
            1 => Some(Self::Below),
            2 => Some(Self::Normal),
            3 => Some(Self::Above),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Next layer down, if any
    pub fn below(self) -> Option<Self> {
        Self::from_raw((self as u8).checked_sub(1)?)
    }
}

/// Opacity value meaning fully opaque
pub const OPAQUE: u32 = u32::MAX;

/// Compact state of one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientState {
    pub status: StatusFlags,
    pub border: BorderFlags,
    max_flags: MaxFlags,
    /// Maximize mode parked while fullscreen
    parked_max: MaxFlags,
    pub layer: Layer,
    pub default_layer: Layer,
    pub desktop: u32,
    pub opacity: u32,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            status: StatusFlags::empty(),
            border: BorderFlags::default(),
            max_flags: MaxFlags::NONE,
            parked_max: MaxFlags::NONE,
            layer: Layer::Normal,
            default_layer: Layer::Normal,
            desktop: 0,
            opacity: OPAQUE,
        }
    }
}

impl ClientState {
    pub fn set(&mut self, bits: StatusFlags) {
        self.status.insert(bits);
    }

    pub fn clear(&mut self, bits: StatusFlags) {
        self.status.remove(bits);
    }

    pub fn test(&self, bits: StatusFlags) -> bool {
        self.status.intersects(bits)
    }

    pub fn set_border(&mut self, bits: BorderFlags) {
        self.border.insert(bits);
    }

    pub fn clear_border(&mut self, bits: BorderFlags) {
        self.border.remove(bits);
    }

    pub fn has_border(&self, bits: BorderFlags) -> bool {
        self.border.contains(bits)
    }

    pub fn reset_border(&mut self) {
        self.border = BorderFlags::default();
    }

    pub fn reset_layer_to_default(&mut self) {
        self.layer = self.default_layer;
    }

    pub fn max_flags(&self) -> MaxFlags {
        self.max_flags
    }

    /// Store a maximize mode. Ignored while fullscreen.
    pub fn set_max_flags(&mut self, flags: MaxFlags) {
        if !self.is_fullscreen() {
            self.max_flags = flags.normalized();
        }
    }

    pub fn clear_max_flags(&mut self) {
        self.max_flags = MaxFlags::NONE;
        self.parked_max = MaxFlags::NONE;
    }

    /// Enter fullscreen, parking any maximize mode.
    pub fn enter_fullscreen(&mut self) {
        if !self.is_fullscreen() {
            self.parked_max = self.max_flags;
            self.max_flags = MaxFlags::NONE;
            self.status.insert(StatusFlags::FULLSCREEN);
        }
    }

    /// Leave fullscreen; returns the maximize mode to re-apply.
    pub fn leave_fullscreen(&mut self) -> MaxFlags {
        if !self.is_fullscreen() {
            return MaxFlags::NONE;
        }
        self.status.remove(StatusFlags::FULLSCREEN);
        std::mem::take(&mut self.parked_max)
    }

    /// Fullscreen and maximize never drive geometry at the same time.
    pub fn is_consistent(&self) -> bool {
        !(self.is_fullscreen() && !self.max_flags.is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.test(StatusFlags::ACTIVE)
    }

    pub fn is_mapped(&self) -> bool {
        self.test(StatusFlags::MAPPED)
    }

    pub fn is_hidden(&self) -> bool {
        self.test(StatusFlags::HIDDEN)
    }

    pub fn is_sticky(&self) -> bool {
        self.test(StatusFlags::STICKY)
    }

    pub fn is_shaded(&self) -> bool {
        self.test(StatusFlags::SHADED)
    }

    pub fn is_minimized(&self) -> bool {
        self.test(StatusFlags::MINIMIZED)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.test(StatusFlags::FULLSCREEN)
    }

    pub fn is_urgent(&self) -> bool {
        self.test(StatusFlags::URGENT)
    }

    pub fn is_maximized(&self) -> bool {
        !self.max_flags.is_empty()
    }

    /// Mapped or shaded (frame on screen when not hidden)
    pub fn is_shown(&self) -> bool {
        self.test(StatusFlags::MAPPED | StatusFlags::SHADED)
    }

    /// On screen right now
    pub fn is_visible(&self) -> bool {
        self.is_shown() && !self.is_hidden() && !self.is_minimized()
    }

    pub fn should_skip_in_task_list(&self) -> bool {
        self.test(StatusFlags::NOLIST | StatusFlags::WMDIALOG)
    }

    pub fn should_skip_in_pager(&self) -> bool {
        self.test(StatusFlags::NOPAGER | StatusFlags::WMDIALOG)
    }

    pub fn can_focus(&self) -> bool {
        self.test(StatusFlags::CAN_FOCUS | StatusFlags::TAKE_FOCUS)
    }

    /// Visible on `desktop`, honouring stickiness
    pub fn is_on_desktop(&self, desktop: u32) -> bool {
        self.is_sticky() || self.desktop == desktop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_border_has_no_constrain() {
        let state = ClientState::default();
        assert!(state.has_border(BorderFlags::MOVE | BorderFlags::RESIZE));
        assert!(!state.has_border(BorderFlags::CONSTRAIN));
    }

    #[test]
    fn test_reset_border_restores_defaults() {
        let mut state = ClientState::default();
        state.clear_border(BorderFlags::TITLE | BorderFlags::MAX);
        state.reset_border();
        assert_eq!(state.border, BorderFlags::default());
    }

    #[test]
    fn test_normalized_max_flags() {
        assert_eq!((MaxFlags::LEFT | MaxFlags::RIGHT).normalized(), MaxFlags::HORIZ);
        assert_eq!((MaxFlags::VERT | MaxFlags::TOP).normalized(), MaxFlags::VERT);
        assert_eq!(
            (MaxFlags::LEFT | MaxFlags::TOP).normalized(),
            MaxFlags::LEFT | MaxFlags::TOP
        );
    }

    #[test]
    fn test_fullscreen_parks_max_flags() {
        let mut state = ClientState::default();
        state.set_max_flags(MaxFlags::HORIZ | MaxFlags::VERT);
        state.enter_fullscreen();
        assert!(state.is_consistent());
        assert!(!state.is_maximized());

        let parked = state;
        state.set_max_flags(MaxFlags::VERT);
        assert_eq!(state, parked);

        assert_eq!(state.leave_fullscreen(), MaxFlags::HORIZ | MaxFlags::VERT);
        assert!(!state.is_fullscreen());
    }

    #[test]
    fn test_sticky_ignores_desktop() {
        let mut state = ClientState::default();
        state.desktop = 2;
        assert!(!state.is_on_desktop(0));
        state.set(StatusFlags::STICKY);
        assert!(state.is_on_desktop(0));
    }

    #[test]
    fn test_layer_below() {
        assert_eq!(Layer::Normal.below(), Some(Layer::Below));
        assert_eq!(Layer::Desktop.below(), None);
        assert_eq!(Layer::from_raw(7), None);
    }
}
