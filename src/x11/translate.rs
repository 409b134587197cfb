//! Raw x11rb events to [`WmEvent`].

use tracing::{debug, trace};
use x11rb::protocol::xproto::{ConfigWindow, ConfigureRequestEvent, Mapping, NotifyDetail, NotifyMode};
use x11rb::protocol::Event;
use x11rb::NONE;

use crate::wm::events::{ConfigureRequest, Property, StackMode, WmEvent};

use super::keymap::KeyMap;
use super::X11Display;

impl X11Display {
    /// Decode one event. Events the core has no use for map to `None`.
    pub(super) fn translate(&mut self, event: Event) -> Option<WmEvent> {
        let translated = match event {
            Event::MapRequest(e) => WmEvent::MapRequest { window: e.window },
            Event::UnmapNotify(e) => WmEvent::UnmapNotify {
                window: e.window,
                // Sent-event bit
                synthetic: e.response_type & 0x80 != 0,
            },
            Event::DestroyNotify(e) => WmEvent::DestroyNotify { window: e.window },
            Event::ConfigureRequest(e) => WmEvent::ConfigureRequest(configure_request(&e)),
            Event::PropertyNotify(e) => {
                self.last_time = e.time;
                match self.atoms.property_kind(e.atom) {
                    Property::Other => return None,
                    property => WmEvent::PropertyNotify {
                        window: e.window,
                        property,
                    },
                }
            }
            Event::ClientMessage(e) => {
                if e.format != 32 {
                    return None;
                }
                let request = self.atoms.decode_client_message(e.type_, e.data.as_data32());
                WmEvent::ClientMessage {
                    window: e.window,
                    request,
                }
            }
            Event::ButtonPress(e) => {
                self.last_time = e.time;
                WmEvent::ButtonPress {
                    window: e.event,
                    button: e.detail,
                    state: u16::from(e.state),
                    root_x: i32::from(e.root_x),
                    root_y: i32::from(e.root_y),
                    x: i32::from(e.event_x),
                    y: i32::from(e.event_y),
                }
            }
            Event::ButtonRelease(e) => {
                self.last_time = e.time;
                WmEvent::ButtonRelease {
                    button: e.detail,
                    root_x: i32::from(e.root_x),
                    root_y: i32::from(e.root_y),
                }
            }
            Event::MotionNotify(e) => WmEvent::MotionNotify {
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
                state: u16::from(e.state),
            },
            Event::KeyPress(e) => {
                self.last_time = e.time;
                WmEvent::KeyPress {
                    window: e.event,
                    keysym: self.keymap.keysym(e.detail),
                    state: u16::from(e.state),
                }
            }
            Event::EnterNotify(e) => {
                if !is_real_enter(e.mode, e.detail) {
                    return None;
                }
                WmEvent::EnterNotify {
                    window: e.event,
                    root_x: i32::from(e.root_x),
                    root_y: i32::from(e.root_y),
                }
            }
            Event::Expose(e) => WmEvent::Expose {
                window: e.window,
                count: e.count,
            },
            Event::ColormapNotify(e) => WmEvent::ColormapNotify {
                window: e.window,
                colormap: e.colormap,
                new: e.new,
            },
            Event::SelectionClear(e) => {
                if e.selection != self.selection {
                    return None;
                }
                WmEvent::SelectionClear
            }
            Event::RandrScreenChangeNotify(e) => {
                self.width = i32::from(e.width);
                self.height = i32::from(e.height);
                WmEvent::ScreenChange
            }
            Event::MappingNotify(e) => {
                if e.request != Mapping::KEYBOARD {
                    return None;
                }
                match KeyMap::load(self.conn.as_ref()) {
                    Ok(keymap) => self.keymap = keymap,
                    Err(err) => {
                        debug!("Failed to reload keyboard mapping: {:#}", err);
                        return None;
                    }
                }
                WmEvent::MappingNotify
            }
            Event::Error(e) => {
                // Requests on windows that vanished; expected during teardown
                debug!("X11 error: {:?}", e);
                return None;
            }
            other => {
                trace!("Ignoring event {:?}", other);
                return None;
            }
        };
        Some(translated)
    }
}

/// Keep only the fields present in the request's value mask.
fn configure_request(e: &ConfigureRequestEvent) -> ConfigureRequest {
    let mask = e.value_mask;
    let has = |flag: ConfigWindow| mask.contains(flag);
    ConfigureRequest {
        window: e.window,
        x: has(ConfigWindow::X).then_some(i32::from(e.x)),
        y: has(ConfigWindow::Y).then_some(i32::from(e.y)),
        width: has(ConfigWindow::WIDTH).then_some(i32::from(e.width)),
        height: has(ConfigWindow::HEIGHT).then_some(i32::from(e.height)),
        border_width: has(ConfigWindow::BORDER_WIDTH).then_some(i32::from(e.border_width)),
        sibling: (has(ConfigWindow::SIBLING) && e.sibling != NONE).then_some(e.sibling),
        stack_mode: if has(ConfigWindow::STACK_MODE) {
            StackMode::from_raw(u32::from(e.stack_mode))
        } else {
            None
        },
    }
}

/// Crossings caused by grabs, or by moving between a frame and its
/// client, are not the pointer entering a new window.
fn is_real_enter(mode: NotifyMode, detail: NotifyDetail) -> bool {
    mode == NotifyMode::NORMAL && detail != NotifyDetail::INFERIOR
}
