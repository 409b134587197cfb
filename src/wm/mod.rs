//! Window Manager Module
//!
//! The window manager core: client state, stacking, placement, interactive
//! move/resize and the per-cycle dispatch. Everything here talks to the
//! display server through [`display::DisplayServer`].

pub mod client;
pub mod client_flags;
pub mod decorations;
pub mod display;
pub mod events;
pub mod focus;
pub mod keyboard;
pub mod lifecycle;
pub mod maximize;
pub mod moveresize;
pub mod placement;
pub mod registry;
pub mod screen;
pub mod settings;
pub mod stacking;
pub mod strut;
pub mod terminate;
pub mod timers;
pub mod workspace;

#[cfg(test)]
pub mod testing;

use std::time::Instant;

use anyhow::Result;
use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::shared::{BorderSize, Geometry};
use crate::wm::client_flags::Layer;
use crate::wm::decorations::Decorations;
use crate::wm::display::{DesktopState, DisplayServer, Window};
use crate::wm::placement::{subtract_all, CascadeTable};
use crate::wm::registry::ClientRegistry;
use crate::wm::screen::ScreenLayout;
use crate::wm::settings::Settings;
use crate::wm::stacking::LayeredStack;
use crate::wm::strut::StrutList;
use crate::wm::terminate::CloseTracker;
use crate::wm::timers::{TimerKind, TimerQueue};

/// Failures the core reports to its callers
#[derive(Debug, Error)]
pub enum WmError {
    #[error("pointer or keyboard grab refused")]
    GrabFailed,
    #[error("an interactive move/resize is already running")]
    SessionActive,
    #[error("window 0x{0:x} is not managed")]
    NotManaged(Window),
    #[error("another window manager is running (selection owner 0x{0:x}); use --replace")]
    ManagerRunning(Window),
    #[error("window manager selection lost")]
    SelectionLost,
    #[error(transparent)]
    Display(#[from] anyhow::Error),
}

bitflags! {
    /// Work deferred to the end of a dispatch cycle
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Dirty: u8 {
        const RESTACK   = 1 << 0;
        const TASK_LIST = 1 << 1;
        const PAGER     = 1 << 2;
    }
}

/// The window manager: owns every client and all process-lifetime state.
pub struct WindowManager<D: DisplayServer> {
    display: D,
    settings: Settings,
    decorations: Decorations,
    screen: ScreenLayout,
    clients: ClientRegistry,
    stack: LayeredStack,
    struts: StrutList,
    cascade: CascadeTable,
    timers: TimerQueue,
    closing: CloseTracker,
    dirty: Dirty,
    /// Focused client
    active: Option<Window>,
    /// Client owning the running move/resize session
    interactive: Option<Window>,
    current_desktop: u32,
    /// Show-desktop toggle per desktop
    showing_desktop: Vec<bool>,
    /// Last title-bar click, for double clicks
    last_click: Option<(Window, Instant)>,
    exit_requested: bool,
}

impl<D: DisplayServer> WindowManager<D> {
    pub fn new(display: D, settings: Settings) -> Result<Self> {
        let (width, height) = display.screen_size();
        let monitors = display.monitors()?;
        let screen = ScreenLayout::new(width, height, monitors);
        let decorations = Decorations::new(settings.theme);
        let desktops = settings.desktop_count as usize;

        Ok(Self {
            display,
            settings,
            decorations,
            screen,
            clients: ClientRegistry::new(),
            stack: LayeredStack::new(),
            struts: StrutList::new(),
            cascade: CascadeTable::new(),
            timers: TimerQueue::new(),
            closing: CloseTracker::new(),
            dirty: Dirty::empty(),
            active: None,
            interactive: None,
            current_desktop: 0,
            showing_desktop: vec![false; desktops],
            last_click: None,
            exit_requested: false,
        })
    }

    /// Grab bindings, publish desktops and adopt windows that already exist.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.display.grab_keys(&self.settings.keys)?;

        let existing = self.display.existing_windows()?;
        info!("Adopting {} existing window(s)", existing.len());
        for window in existing {
            if let Err(e) = self.manage(window, true, now) {
                warn!("Failed to manage existing window 0x{:x}: {:#}", window, e);
            }
        }

        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        self.flush_dirty()?;
        self.display.flush()
    }

    /// One wake cycle: drain every pending event, run due timers, then flush
    /// deferred work exactly once.
    pub fn process_pending(&mut self, now: Instant) -> Result<()> {
        while let Some(event) = self.display.poll_event()? {
            if let Err(e) = self.dispatch(event, now) {
                warn!("Event handler failed: {:#}", e);
            }
        }
        self.run_timers(now)?;
        self.flush_dirty()?;
        self.display.flush()
    }

    /// Fire every timer due at `now`.
    pub fn run_timers(&mut self, now: Instant) -> Result<()> {
        for kind in self.timers.take_due(now) {
            let result = match kind {
                TimerKind::Urgency(window) => self.flash_urgent(window),
                TimerKind::EdgeSwitch(delta) => self.edge_switch(delta),
            };
            if let Err(e) = result {
                warn!("Timer {:?} failed: {:#}", kind, e);
            }
        }
        Ok(())
    }

    /// Soonest timer deadline, for the loop's sleep
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Give every window back to the root and drop focus.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Releasing {} client(s)", self.clients.len());
        self.cancel_session(true)?;
        let windows = self.clients.windows().to_vec();
        for window in windows {
            if let Err(e) = self.unmanage(window, true) {
                warn!("Failed to release 0x{:x}: {:#}", window, e);
            }
        }
        self.display.set_input_focus(None)?;
        self.display.write_active_window(None)?;
        self.display.flush()
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn stack(&self) -> &LayeredStack {
        &self.stack
    }

    pub fn active(&self) -> Option<Window> {
        self.active
    }

    pub fn interactive(&self) -> Option<Window> {
        self.interactive
    }

    pub fn current_desktop(&self) -> u32 {
        self.current_desktop
    }

    pub fn screen(&self) -> &ScreenLayout {
        &self.screen
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub(crate) fn mark(&mut self, dirty: Dirty) {
        self.dirty |= dirty;
    }

    /// Flush deferred work in fixed order: restack, task list, pager.
    fn flush_dirty(&mut self) -> Result<()> {
        let dirty = std::mem::take(&mut self.dirty);
        if dirty.is_empty() {
            return Ok(());
        }
        debug!("Flushing {:?}", dirty);

        if dirty.contains(Dirty::RESTACK) {
            let order = self.stack.restack_order(&self.clients, self.active);
            self.display.restack(&order)?;
        }
        if dirty.contains(Dirty::TASK_LIST) || dirty.contains(Dirty::RESTACK) {
            // EWMH stacking list runs bottom to top
            let mut stacking: Vec<Window> = self.stack.top_down().collect();
            stacking.reverse();
            self.display.write_client_list(self.clients.windows(), &stacking)?;
        }
        if dirty.contains(Dirty::PAGER) {
            let state = self.desktop_state();
            self.display.write_desktop_state(&state)?;
        }
        Ok(())
    }

    fn desktop_state(&self) -> DesktopState {
        let root = self.screen.root_bounds();
        let struts: Vec<Geometry> = self.struts.iter().map(|s| s.rect).collect();
        DesktopState {
            count: self.settings.desktop_count,
            current: self.current_desktop,
            names: (0..self.settings.desktop_count)
                .map(|d| self.settings.desktop_name(d))
                .collect(),
            showing_desktop: self.is_showing_desktop(),
            workarea: subtract_all(&root, &struts),
        }
    }

    /// Decoration insets of a managed client
    pub(crate) fn border_of(&self, window: Window) -> BorderSize {
        self.clients
            .get(window)
            .map_or(BorderSize::NONE, |c| self.decorations.border_size(c))
    }

    /// Lay out frame and client window for the current geometry, and tell
    /// the client where it is.
    pub(crate) fn apply_geometry(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let border = self.decorations.border_size(client);
        let geometry = client.geometry;
        self.display
            .configure_client(window, client.frame, &geometry, &border, client.state.is_shaded())?;
        self.display.send_configure_notify(window, &geometry)
    }

    /// Publish the client's state properties.
    pub(crate) fn write_state(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let border = self.decorations.border_size(client);
        self.display.write_state(client, &border)
    }

    /// Repaint a client's frame.
    pub(crate) fn draw_border(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        match client.frame {
            Some(frame) => {
                let pixel = self.decorations.frame_pixel(client);
                self.display.paint_frame(frame, pixel)
            }
            None => Ok(()),
        }
    }

    /// Monitor holding the center of a frame
    pub(crate) fn monitor_index(&self, frame: &Geometry) -> usize {
        let (x, y) = frame.center();
        self.screen.monitor_at(x, y).index
    }

    /// Monitor bounds minus the struts that apply to `window`.
    ///
    /// A client's own struts never shrink its box, and struts of clients in
    /// lower layers are ignored (the client may cover them).
    pub(crate) fn free_box(&self, window: Option<Window>, monitor: usize) -> Geometry {
        let layer = window
            .and_then(|w| self.clients.get(w))
            .map_or(Layer::Normal, |c| c.state.layer);
        self.free_box_in_layer(layer, window, monitor)
    }

    pub(crate) fn free_box_in_layer(&self, layer: Layer, owner: Option<Window>, monitor: usize) -> Geometry {
        let bounds = self
            .screen
            .monitors()
            .get(monitor)
            .map_or_else(|| self.screen.root_bounds(), |m| m.bounds);

        let exclusions: Vec<Geometry> = self
            .struts
            .iter()
            .filter(|s| Some(s.owner) != owner)
            .filter(|s| self.clients.get(s.owner).map_or(true, |owner| owner.state.layer >= layer))
            .map(|s| s.rect)
            .collect();
        subtract_all(&bounds, &exclusions)
    }

    /// Frames of the other clients on screen on the current desktop
    pub(crate) fn visible_frames_except(&self, window: Window) -> Vec<Geometry> {
        self.stack
            .clients_on_desktop(&self.clients, self.current_desktop, true)
            .into_iter()
            .filter(|&w| w != window)
            .filter_map(|w| self.clients.get(w))
            .map(|c| self.decorations.border_size(c).frame_of(&c.geometry))
            .collect()
    }

    /// Bring a client and its transients to the front of its layer.
    pub fn raise_client(&mut self, window: Window) -> Result<()> {
        if self.stack.raise(window, &self.clients) {
            debug!("Raised 0x{:x}", window);
            self.mark(Dirty::RESTACK);
        }
        Ok(())
    }

    /// Send a client to the back of its layer.
    pub fn lower_client(&mut self, window: Window) -> Result<()> {
        if self.stack.lower(window) {
            debug!("Lowered 0x{:x}", window);
            self.mark(Dirty::RESTACK);
        }
        Ok(())
    }

    /// Move a client (and its transients) to another layer.
    pub fn set_layer(&mut self, window: Window, layer: Layer) -> Result<()> {
        let moved = self.stack.change_layer(window, layer, &self.clients);
        if moved.is_empty() {
            return Ok(());
        }
        for &w in &moved {
            if let Some(client) = self.clients.get_mut(w) {
                client.state.layer = layer;
            }
            self.write_state(w)?;
        }
        self.mark(Dirty::RESTACK);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::shared::Geometry;
    use crate::wm::client_flags::{MaxFlags, StatusFlags};
    use crate::wm::display::ClientInfo;
    use crate::wm::events::WmEvent;
    use crate::wm::testing::{manage_at, new_wm, MockDisplay};

    #[test]
    fn test_burst_of_events_restacks_once() {
        let mut wm = new_wm();
        let now = Instant::now();
        for window in [10, 11, 12, 13] {
            wm.display_mut().add_window(window, ClientInfo {
                geometry: Geometry::new(0, 0, 200, 150),
                ..ClientInfo::default()
            });
            wm.display_mut().queue(WmEvent::MapRequest { window });
        }
        wm.process_pending(now).unwrap();
        assert_eq!(wm.clients().len(), 4);
        assert_eq!(wm.display().restack_calls, 1);

        // Many desktop changes in one cycle still flush once
        for window in [10, 11, 12, 13] {
            wm.display_mut().queue(WmEvent::ClientMessage {
                window,
                request: crate::wm::events::ClientRequest::Desktop(2),
            });
        }
        wm.process_pending(now).unwrap();
        assert_eq!(wm.display().restack_calls, 2);
        assert_eq!(wm.display().desktop_writes, 2);
    }

    #[test]
    fn test_every_client_in_exactly_one_layer() {
        let mut wm = new_wm();
        let now = Instant::now();
        for window in 20..26 {
            manage_at(&mut wm, window, Geometry::new(0, 0, 100, 100), now);
        }
        wm.set_layer(21, Layer::Above).unwrap();
        wm.set_layer(22, Layer::Below).unwrap();
        wm.minimize(23, true).unwrap();
        wm.unmanage(24, false).unwrap();

        for window in wm.clients().windows() {
            let hits = Layer::TOP_DOWN
                .iter()
                .filter(|&&l| wm.stack().layer_list(l).contains(window))
                .count();
            assert_eq!(hits, 1, "window {} in {} layers", window, hits);
        }
        assert!(!wm.stack().contains(24));
        assert_eq!(wm.stack().len(), wm.clients().len());
    }

    #[test]
    fn test_urgency_timer_flashes_until_cleared() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 30, Geometry::new(0, 0, 100, 100), now);
        wm.set_urgent(30, true, now).unwrap();
        assert!(wm.next_deadline().is_some());

        wm.process_pending(now + Duration::from_millis(510)).unwrap();
        assert!(wm.clients().get(30).unwrap().state.test(StatusFlags::FLASH));
        wm.process_pending(now + Duration::from_millis(1010)).unwrap();
        assert!(!wm.clients().get(30).unwrap().state.test(StatusFlags::FLASH));

        wm.set_urgent(30, false, now).unwrap();
        assert!(wm.next_deadline().is_none());
    }

    #[test]
    fn test_selection_clear_requests_exit() {
        let mut wm = new_wm();
        wm.display_mut().queue(WmEvent::SelectionClear);
        wm.process_pending(Instant::now()).unwrap();
        assert!(wm.exit_requested());
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 40, Geometry::new(50, 50, 100, 100), now);
        manage_at(&mut wm, 41, Geometry::new(50, 50, 100, 100), now);
        wm.minimize(41, false).unwrap();
        wm.maximize(40, MaxFlags::HORIZ | MaxFlags::VERT).unwrap();
        wm.shutdown().unwrap();

        assert!(wm.clients().is_empty());
        assert!(wm.stack().is_empty());
        let released: Vec<(Window, bool)> = wm
            .display()
            .released
            .iter()
            .map(|r| (r.window, r.remap))
            .collect();
        assert!(released.contains(&(40, true)));
        assert!(released.contains(&(41, true)));
    }

    #[test]
    fn test_free_box_skips_own_and_lower_struts() {
        let mut wm = new_wm();
        let now = Instant::now();
        let display: &mut MockDisplay = wm.display_mut();
        display.add_window(50, ClientInfo {
            geometry: Geometry::new(0, 0, 1000, 30),
            strut: vec![0, 0, 30, 0],
            ..ClientInfo::default()
        });
        wm.manage(50, false, now).unwrap();
        manage_at(&mut wm, 51, Geometry::new(0, 0, 100, 100), now);

        assert_eq!(wm.free_box(Some(51), 0), Geometry::new(0, 30, 1000, 770));
        assert_eq!(wm.free_box(Some(50), 0), Geometry::new(0, 0, 1000, 800));

        wm.set_layer(50, Layer::Below).unwrap();
        assert_eq!(wm.free_box(Some(51), 0), Geometry::new(0, 0, 1000, 800));
    }
}
