//! Atoms Module
//!
//! Interned ICCCM/EWMH atoms and the translation between atom lists and the
//! core's flag types.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _};

use crate::shared::Gravity;
use crate::wm::client::Client;
use crate::wm::client_flags::{BorderFlags, ClientState, Layer, MaxFlags, StatusFlags, WindowType};
use crate::wm::display::NetState;
use crate::wm::events::{ClientRequest, MoveResizeRequest, Property, StackMode, StateAction};

/// ICCCM WithdrawnState / NormalState / IconicState
pub const WITHDRAWN_STATE: u32 = 0;
pub const NORMAL_STATE: u32 = 1;
pub const ICONIC_STATE: u32 = 3;

macro_rules! atoms {
    ($($field:ident => $name:literal,)*) => {
        /// Holds all interned atoms
        #[derive(Debug, Clone, Copy)]
        pub struct Atoms {
            $(pub $field: Atom,)*
        }

        impl Atoms {
            /// Intern all required atoms. Every request is sent before the
            /// first reply is awaited.
            pub fn new<C: Connection>(conn: &C) -> Result<Self> {
                $(let $field = conn.intern_atom(false, $name.as_bytes())?;)*
                Ok(Self {
                    $($field: $field.reply()?.atom,)*
                })
            }

            /// Distinct fake atom values for tests
            #[cfg(test)]
            pub fn sequential() -> Self {
                let mut next: Atom = 1000;
                let mut take = || {
                    next += 1;
                    next
                };
                Self {
                    $($field: take(),)*
                }
            }
        }
    };
}

atoms! {
    wm_protocols => "WM_PROTOCOLS",
    wm_delete_window => "WM_DELETE_WINDOW",
    wm_take_focus => "WM_TAKE_FOCUS",
    wm_state => "WM_STATE",
    wm_change_state => "WM_CHANGE_STATE",
    wm_colormap_windows => "WM_COLORMAP_WINDOWS",
    utf8_string => "UTF8_STRING",
    motif_wm_hints => "_MOTIF_WM_HINTS",

    net_supported => "_NET_SUPPORTED",
    net_supporting_wm_check => "_NET_SUPPORTING_WM_CHECK",
    net_wm_name => "_NET_WM_NAME",
    net_client_list => "_NET_CLIENT_LIST",
    net_client_list_stacking => "_NET_CLIENT_LIST_STACKING",
    net_number_of_desktops => "_NET_NUMBER_OF_DESKTOPS",
    net_desktop_names => "_NET_DESKTOP_NAMES",
    net_current_desktop => "_NET_CURRENT_DESKTOP",
    net_desktop_geometry => "_NET_DESKTOP_GEOMETRY",
    net_desktop_viewport => "_NET_DESKTOP_VIEWPORT",
    net_workarea => "_NET_WORKAREA",
    net_showing_desktop => "_NET_SHOWING_DESKTOP",
    net_active_window => "_NET_ACTIVE_WINDOW",
    net_close_window => "_NET_CLOSE_WINDOW",
    net_moveresize_window => "_NET_MOVERESIZE_WINDOW",
    net_wm_moveresize => "_NET_WM_MOVERESIZE",
    net_restack_window => "_NET_RESTACK_WINDOW",
    net_frame_extents => "_NET_FRAME_EXTENTS",
    net_wm_desktop => "_NET_WM_DESKTOP",
    net_wm_pid => "_NET_WM_PID",
    net_wm_window_opacity => "_NET_WM_WINDOW_OPACITY",
    net_wm_strut => "_NET_WM_STRUT",
    net_wm_strut_partial => "_NET_WM_STRUT_PARTIAL",

    net_wm_allowed_actions => "_NET_WM_ALLOWED_ACTIONS",
    net_wm_action_move => "_NET_WM_ACTION_MOVE",
    net_wm_action_resize => "_NET_WM_ACTION_RESIZE",
    net_wm_action_minimize => "_NET_WM_ACTION_MINIMIZE",
    net_wm_action_shade => "_NET_WM_ACTION_SHADE",
    net_wm_action_stick => "_NET_WM_ACTION_STICK",
    net_wm_action_maximize_horz => "_NET_WM_ACTION_MAXIMIZE_HORZ",
    net_wm_action_maximize_vert => "_NET_WM_ACTION_MAXIMIZE_VERT",
    net_wm_action_fullscreen => "_NET_WM_ACTION_FULLSCREEN",
    net_wm_action_change_desktop => "_NET_WM_ACTION_CHANGE_DESKTOP",
    net_wm_action_close => "_NET_WM_ACTION_CLOSE",

    net_wm_state => "_NET_WM_STATE",
    net_wm_state_sticky => "_NET_WM_STATE_STICKY",
    net_wm_state_maximized_horz => "_NET_WM_STATE_MAXIMIZED_HORZ",
    net_wm_state_maximized_vert => "_NET_WM_STATE_MAXIMIZED_VERT",
    net_wm_state_shaded => "_NET_WM_STATE_SHADED",
    net_wm_state_fullscreen => "_NET_WM_STATE_FULLSCREEN",
    net_wm_state_hidden => "_NET_WM_STATE_HIDDEN",
    net_wm_state_skip_taskbar => "_NET_WM_STATE_SKIP_TASKBAR",
    net_wm_state_skip_pager => "_NET_WM_STATE_SKIP_PAGER",
    net_wm_state_above => "_NET_WM_STATE_ABOVE",
    net_wm_state_below => "_NET_WM_STATE_BELOW",
    net_wm_state_demands_attention => "_NET_WM_STATE_DEMANDS_ATTENTION",
    net_wm_state_modal => "_NET_WM_STATE_MODAL",

    net_wm_window_type => "_NET_WM_WINDOW_TYPE",
    net_wm_window_type_desktop => "_NET_WM_WINDOW_TYPE_DESKTOP",
    net_wm_window_type_dock => "_NET_WM_WINDOW_TYPE_DOCK",
    net_wm_window_type_toolbar => "_NET_WM_WINDOW_TYPE_TOOLBAR",
    net_wm_window_type_menu => "_NET_WM_WINDOW_TYPE_MENU",
    net_wm_window_type_utility => "_NET_WM_WINDOW_TYPE_UTILITY",
    net_wm_window_type_splash => "_NET_WM_WINDOW_TYPE_SPLASH",
    net_wm_window_type_dialog => "_NET_WM_WINDOW_TYPE_DIALOG",
    net_wm_window_type_notification => "_NET_WM_WINDOW_TYPE_NOTIFICATION",
    net_wm_window_type_normal => "_NET_WM_WINDOW_TYPE_NORMAL",
}

impl Atoms {
    /// Everything advertised in `_NET_SUPPORTED`
    pub fn supported(&self) -> Vec<Atom> {
        let mut atoms = vec![
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_wm_name,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_desktop_names,
            self.net_current_desktop,
            self.net_desktop_geometry,
            self.net_desktop_viewport,
            self.net_workarea,
            self.net_showing_desktop,
            self.net_active_window,
            self.net_close_window,
            self.net_moveresize_window,
            self.net_wm_moveresize,
            self.net_restack_window,
            self.net_frame_extents,
            self.net_wm_desktop,
            self.net_wm_pid,
            self.net_wm_window_opacity,
            self.net_wm_strut,
            self.net_wm_strut_partial,
            self.net_wm_allowed_actions,
            self.net_wm_action_move,
            self.net_wm_action_resize,
            self.net_wm_action_minimize,
            self.net_wm_action_shade,
            self.net_wm_action_stick,
            self.net_wm_action_maximize_horz,
            self.net_wm_action_maximize_vert,
            self.net_wm_action_fullscreen,
            self.net_wm_action_change_desktop,
            self.net_wm_action_close,
            self.net_wm_state,
            self.net_wm_window_type,
        ];
        atoms.extend(self.state_table().iter().map(|&(_, atom)| atom));
        atoms.extend(self.type_table().iter().map(|&(_, atom)| atom));
        atoms
    }

    fn state_table(&self) -> [(NetState, Atom); 12] {
        [
            (NetState::STICKY, self.net_wm_state_sticky),
            (NetState::MAXIMIZED_HORZ, self.net_wm_state_maximized_horz),
            (NetState::MAXIMIZED_VERT, self.net_wm_state_maximized_vert),
            (NetState::SHADED, self.net_wm_state_shaded),
            (NetState::FULLSCREEN, self.net_wm_state_fullscreen),
            (NetState::HIDDEN, self.net_wm_state_hidden),
            (NetState::SKIP_TASKBAR, self.net_wm_state_skip_taskbar),
            (NetState::SKIP_PAGER, self.net_wm_state_skip_pager),
            (NetState::ABOVE, self.net_wm_state_above),
            (NetState::BELOW, self.net_wm_state_below),
            (NetState::DEMANDS_ATTENTION, self.net_wm_state_demands_attention),
            (NetState::MODAL, self.net_wm_state_modal),
        ]
    }

    fn type_table(&self) -> [(WindowType, Atom); 9] {
        [
            (WindowType::Desktop, self.net_wm_window_type_desktop),
            (WindowType::Dock, self.net_wm_window_type_dock),
            (WindowType::Toolbar, self.net_wm_window_type_toolbar),
            (WindowType::Menu, self.net_wm_window_type_menu),
            (WindowType::Utility, self.net_wm_window_type_utility),
            (WindowType::Splashscreen, self.net_wm_window_type_splash),
            (WindowType::Dialog, self.net_wm_window_type_dialog),
            (WindowType::Notification, self.net_wm_window_type_notification),
            (WindowType::Normal, self.net_wm_window_type_normal),
        ]
    }

    /// Unknown atoms are ignored.
    pub fn decode_net_state(&self, atoms: &[Atom]) -> NetState {
        let table = self.state_table();
        atoms
            .iter()
            .filter_map(|a| table.iter().find(|(_, atom)| atom == a))
            .fold(NetState::empty(), |acc, &(flag, _)| acc | flag)
    }

    pub fn encode_net_state(&self, flags: NetState) -> Vec<Atom> {
        self.state_table()
            .iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .map(|&(_, atom)| atom)
            .collect()
    }

    /// First type in the list we understand; the list is in preference order.
    pub fn window_type(&self, atoms: &[Atom]) -> WindowType {
        let table = self.type_table();
        atoms
            .iter()
            .find_map(|a| table.iter().find(|(_, atom)| atom == a).map(|&(t, _)| t))
            .unwrap_or_default()
    }

    /// `_NET_WM_ALLOWED_ACTIONS` for a client's border flags
    pub fn allowed_actions(&self, client: &Client) -> Vec<Atom> {
        let state = &client.state;
        let mut actions = vec![self.net_wm_action_change_desktop, self.net_wm_action_stick];
        let table = [
            (BorderFlags::MOVE, self.net_wm_action_move),
            (BorderFlags::RESIZE, self.net_wm_action_resize),
            (BorderFlags::MIN, self.net_wm_action_minimize),
            (BorderFlags::SHADE, self.net_wm_action_shade),
            (BorderFlags::MAX_H, self.net_wm_action_maximize_horz),
            (BorderFlags::MAX_V, self.net_wm_action_maximize_vert),
            (BorderFlags::FULLSCREEN, self.net_wm_action_fullscreen),
            (BorderFlags::CLOSE, self.net_wm_action_close),
        ];
        actions.extend(
            table
                .iter()
                .filter(|(flag, _)| state.has_border(*flag))
                .map(|&(_, atom)| atom),
        );
        actions
    }

    /// Classify a PropertyNotify atom
    pub fn property_kind(&self, atom: Atom) -> Property {
        match atom {
            a if a == u32::from(AtomEnum::WM_NAME) || a == self.net_wm_name => Property::Name,
            a if a == u32::from(AtomEnum::WM_NORMAL_HINTS) => Property::NormalHints,
            a if a == u32::from(AtomEnum::WM_HINTS) => Property::WmHints,
            a if a == u32::from(AtomEnum::WM_TRANSIENT_FOR) => Property::TransientFor,
            a if a == self.net_wm_strut || a == self.net_wm_strut_partial => Property::Strut,
            a if a == self.wm_colormap_windows => Property::ColormapWindows,
            a if a == self.net_wm_window_opacity => Property::Opacity,
            _ => Property::Other,
        }
    }

    /// Decode a ClientMessage by type. Unknown types and malformed payloads
    /// become [`ClientRequest::Other`].
    pub fn decode_client_message(&self, message_type: Atom, data: [u32; 5]) -> ClientRequest {
        match message_type {
            t if t == self.net_wm_state => ClientRequest::State {
                action: StateAction::from_raw(data[0]),
                flags: self.decode_net_state(&data[1..3]),
            },
            t if t == self.net_active_window => ClientRequest::Activate,
            t if t == self.net_close_window => ClientRequest::Close,
            t if t == self.net_wm_desktop => ClientRequest::Desktop(data[0]),
            t if t == self.net_current_desktop => ClientRequest::CurrentDesktop(data[0]),
            t if t == self.net_showing_desktop => ClientRequest::ShowingDesktop(data[0] != 0),
            t if t == self.net_wm_moveresize => match MoveResizeRequest::from_raw(data[2]) {
                Some(direction) => ClientRequest::MoveResize {
                    direction,
                    root_x: data[0] as i32,
                    root_y: data[1] as i32,
                },
                None => ClientRequest::Other,
            },
            t if t == self.net_moveresize_window => {
                let flags = data[0];
                let gravity = match flags & 0xff {
                    0 => None,
                    g => Some(Gravity::from_raw(g)),
                };
                let field = |bit: u32, value: u32| (flags & (1 << bit) != 0).then_some(value as i32);
                ClientRequest::MoveResizeWindow {
                    gravity,
                    x: field(8, data[1]),
                    y: field(9, data[2]),
                    width: field(10, data[3]),
                    height: field(11, data[4]),
                }
            }
            t if t == self.net_restack_window => match StackMode::from_raw(data[2]) {
                Some(mode) => ClientRequest::Restack {
                    sibling: (data[1] != 0).then_some(data[1]),
                    mode,
                },
                None => ClientRequest::Other,
            },
            t if t == self.wm_change_state => ClientRequest::ChangeState {
                iconic: data[0] == ICONIC_STATE,
            },
            _ => ClientRequest::Other,
        }
    }
}

/// `_NET_WM_STATE` flags describing a client's current state
pub fn net_state_of(state: &ClientState) -> NetState {
    let max = state.max_flags();
    let pairs = [
        (state.is_sticky(), NetState::STICKY),
        (max.contains(MaxFlags::HORIZ), NetState::MAXIMIZED_HORZ),
        (max.contains(MaxFlags::VERT), NetState::MAXIMIZED_VERT),
        (state.is_shaded(), NetState::SHADED),
        (state.is_fullscreen(), NetState::FULLSCREEN),
        (state.is_minimized() || state.is_hidden(), NetState::HIDDEN),
        (state.test(StatusFlags::NOLIST), NetState::SKIP_TASKBAR),
        (state.test(StatusFlags::NOPAGER), NetState::SKIP_PAGER),
        (state.layer == Layer::Above, NetState::ABOVE),
        (state.layer == Layer::Below, NetState::BELOW),
        (state.is_urgent(), NetState::DEMANDS_ATTENTION),
    ];
    pairs
        .iter()
        .filter(|(on, _)| *on)
        .fold(NetState::empty(), |acc, &(_, flag)| acc | flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::moveresize::ResizeEdge;

    #[test]
    fn test_net_state_both_ways() {
        let atoms = Atoms::sequential();
        let flags = NetState::FULLSCREEN | NetState::ABOVE;
        let encoded = atoms.encode_net_state(flags);
        assert_eq!(encoded, vec![atoms.net_wm_state_fullscreen, atoms.net_wm_state_above]);

        let mut raw = encoded.clone();
        raw.push(1);
        assert_eq!(atoms.decode_net_state(&raw), flags);
    }

    #[test]
    fn test_window_type_takes_first_known() {
        let atoms = Atoms::sequential();
        assert_eq!(
            atoms.window_type(&[7, atoms.net_wm_window_type_dialog, atoms.net_wm_window_type_normal]),
            WindowType::Dialog
        );
        assert_eq!(atoms.window_type(&[]), WindowType::Normal);
    }

    #[test]
    fn test_state_message() {
        let atoms = Atoms::sequential();
        let request = atoms.decode_client_message(
            atoms.net_wm_state,
            [2, atoms.net_wm_state_maximized_horz, atoms.net_wm_state_maximized_vert, 1, 0],
        );
        assert_eq!(
            request,
            ClientRequest::State {
                action: StateAction::Toggle,
                flags: NetState::MAXIMIZED_HORZ | NetState::MAXIMIZED_VERT,
            }
        );
    }

    #[test]
    fn test_moveresize_window_message_fields() {
        let atoms = Atoms::sequential();
        // Gravity 0 (use the client's), x and height present
        let flags = (1 << 8) | (1 << 11);
        let request = atoms.decode_client_message(atoms.net_moveresize_window, [flags, 40, 99, 99, 300]);
        assert_eq!(
            request,
            ClientRequest::MoveResizeWindow {
                gravity: None,
                x: Some(40),
                y: None,
                width: None,
                height: Some(300),
            }
        );
    }

    #[test]
    fn test_moveresize_and_restack_messages() {
        let atoms = Atoms::sequential();
        assert_eq!(
            atoms.decode_client_message(atoms.net_wm_moveresize, [10, 20, 4, 1, 0]),
            ClientRequest::MoveResize {
                direction: MoveResizeRequest::Resize(ResizeEdge::SOUTH | ResizeEdge::EAST),
                root_x: 10,
                root_y: 20,
            }
        );
        assert_eq!(
            atoms.decode_client_message(atoms.net_wm_moveresize, [0, 0, 42, 0, 0]),
            ClientRequest::Other
        );
        assert_eq!(
            atoms.decode_client_message(atoms.net_restack_window, [2, 0, 1, 0, 0]),
            ClientRequest::Restack {
                sibling: None,
                mode: StackMode::Below,
            }
        );
        assert_eq!(
            atoms.decode_client_message(atoms.wm_change_state, [ICONIC_STATE, 0, 0, 0, 0]),
            ClientRequest::ChangeState { iconic: true }
        );
        assert_eq!(atoms.decode_client_message(3, [0; 5]), ClientRequest::Other);
    }

    #[test]
    fn test_property_kinds() {
        let atoms = Atoms::sequential();
        assert_eq!(atoms.property_kind(AtomEnum::WM_NAME.into()), Property::Name);
        assert_eq!(atoms.property_kind(atoms.net_wm_strut_partial), Property::Strut);
        assert_eq!(atoms.property_kind(AtomEnum::WM_NORMAL_HINTS.into()), Property::NormalHints);
        assert_eq!(atoms.property_kind(atoms.net_wm_pid), Property::Other);
    }

    #[test]
    fn test_state_of_maximized_client() {
        let mut client = Client::new(1, Geometry::new(0, 0, 10, 10));
        client.state.set_max_flags(MaxFlags::HORIZ);
        client.state.layer = Layer::Above;
        client.state.set(StatusFlags::NOLIST);
        assert_eq!(
            net_state_of(&client.state),
            NetState::MAXIMIZED_HORZ | NetState::ABOVE | NetState::SKIP_TASKBAR
        );
    }

    #[test]
    fn test_allowed_actions_follow_border() {
        let atoms = Atoms::sequential();
        let mut client = Client::new(1, Geometry::new(0, 0, 10, 10));
        client.state.clear_border(BorderFlags::RESIZE);
        let actions = atoms.allowed_actions(&client);
        assert!(!actions.contains(&atoms.net_wm_action_resize));
        assert!(actions.contains(&atoms.net_wm_action_change_desktop));
    }
}
