//! Client Lifecycle
//!
//! Managing and releasing windows, and the state transitions between
//! mapped, minimized, shaded and hidden.

use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::shared::{BorderSize, Geometry};
use crate::wm::client::Client;
use crate::wm::client_flags::{BorderFlags, Layer, MaxFlags, StatusFlags, WindowType};
use crate::wm::display::{ClientInfo, DisplayServer, NetState, Window, ALL_DESKTOPS};
use crate::wm::placement::{center, constrain_position, constrain_size, gravitate, tile, PlacementPolicy};
use crate::wm::settings::{FocusModel, GroupOption};
use crate::wm::strut::rects_from_hint;
use crate::wm::timers::{TimerKind, URGENCY_PERIOD};
use crate::wm::{Dirty, WindowManager};

/// Transitions requested by hints or group rules, applied after mapping
#[derive(Debug, Default)]
struct Pending {
    shaded: bool,
    minimized: bool,
    maximized: MaxFlags,
    fullscreen: bool,
    urgent: bool,
}

impl<D: DisplayServer> WindowManager<D> {
    /// Start managing a window.
    ///
    /// Windows that vanished, are override-redirect or input-only are
    /// skipped silently. `already_mapped` is set for windows found at
    /// startup: their position is kept rather than placed.
    pub fn manage(&mut self, window: Window, already_mapped: bool, now: Instant) -> Result<()> {
        if self.clients.contains(window) || self.clients.is_frame(window) {
            return Ok(());
        }
        let Some(info) = self.display.read_client_info(window)? else {
            debug!("Window 0x{:x} is gone, not managing", window);
            return Ok(());
        };
        if info.override_redirect || info.input_only {
            debug!("Window 0x{:x} is override-redirect or input-only", window);
            return Ok(());
        }
        if already_mapped && !info.viewable && !info.wm_hints.iconic {
            return Ok(());
        }

        let (mut client, mut pending) = self.client_from_info(window, &info);
        self.apply_group_options(&mut client, &mut pending);
        if client.state.test(StatusFlags::NOT_URGENT) {
            pending.urgent = false;
        }

        let border = self.decorations.border_size(&client);
        client.geometry = self.initial_geometry(&client, &border, already_mapped)?;
        client.save_geometry();

        let layer = client.state.layer;
        let decorated = self.decorations.is_decorated(&client);
        let hidden = !client.state.is_on_desktop(self.current_desktop);
        let frame_geometry = border.frame_of(&client.geometry);
        let geometry = client.geometry;

        client.state.set(StatusFlags::MAPPED);
        if hidden {
            client.state.set(StatusFlags::HIDDEN);
        }
        // Reparenting a viewable window unmaps it once
        if decorated && info.viewable {
            client.ignore_unmap += 1;
        }
        self.clients.insert(client);

        self.display.select_client_events(window)?;
        if decorated {
            let frame = self.display.create_frame(window, &frame_geometry, &border)?;
            self.clients.set_frame(window, Some(frame));
        }
        self.stack.insert_front(window, layer);

        let rects = rects_from_hint(&info.strut, self.screen.width, self.screen.height);
        if self.struts.set_for(window, &rects) {
            debug!("Client 0x{:x} reserves {:?}", window, rects);
        }

        let click_to_focus = self.settings.focus_model == FocusModel::Click;
        self.display.grab_client_buttons(window, click_to_focus)?;

        let frame = self.clients.get(window).and_then(|c| c.frame);
        match frame {
            Some(frame) => {
                self.display.map_window(window)?;
                if !hidden {
                    self.display.map_window(frame)?;
                }
            }
            None if !hidden => self.display.map_window(window)?,
            None => {}
        }
        self.display
            .configure_client(window, frame, &geometry, &border, false)?;
        self.display.send_configure_notify(window, &geometry)?;
        self.draw_border(window)?;

        if pending.shaded {
            self.shade(window)?;
        }
        if pending.minimized {
            self.minimize(window, false)?;
        }
        if !pending.maximized.is_empty() {
            self.maximize(window, pending.maximized)?;
        }
        if pending.fullscreen {
            self.set_fullscreen(window, true)?;
        }
        if pending.urgent {
            self.set_urgent(window, true, now)?;
        }

        self.write_state(window)?;
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);

        let focusable = self
            .clients
            .get(window)
            .is_some_and(|c| c.state.is_visible() && !c.state.should_skip_in_task_list());
        if focusable && !already_mapped {
            self.focus_client(window)?;
        }

        info!(
            "Managing 0x{:x} \"{}\" at {:?} on desktop {}",
            window,
            self.clients.get(window).map_or("", |c| c.name.as_str()),
            geometry,
            self.clients.get(window).map_or(0, |c| c.state.desktop)
        );
        Ok(())
    }

    /// Build the client and the transitions its hints ask for.
    fn client_from_info(&self, window: Window, info: &ClientInfo) -> (Client, Pending) {
        let mut client = Client::new(window, info.geometry);
        client.hints = info.size_hints;
        client.name = info.name.clone();
        client.class = info.class.clone();
        client.instance = info.instance.clone();
        client.pid = info.pid;
        client.colormap = info.colormap;
        client.colormap_windows = info.colormap_windows.clone();
        client.window_type = info.window_type;
        client.owner = info.transient_for.filter(|&owner| owner != window);

        let mut pending = Pending::default();
        let state = &mut client.state;

        if info.wm_hints.input {
            state.set(StatusFlags::CAN_FOCUS);
        }
        if info.protocols.take_focus {
            state.set(StatusFlags::TAKE_FOCUS);
        }
        if info.protocols.delete_window {
            state.set(StatusFlags::DELETE);
        }
        if info.size_hints.has_position {
            state.set(StatusFlags::POSITION);
        }
        if let Some(opacity) = info.opacity {
            state.opacity = opacity;
        }

        state.default_layer = info.window_type.default_layer();
        state.layer = state.default_layer;
        match info.window_type {
            WindowType::Desktop | WindowType::Dock => {
                state.set(StatusFlags::STICKY | StatusFlags::NOLIST | StatusFlags::NOPAGER);
                state.border = BorderFlags::empty();
            }
            WindowType::Splashscreen | WindowType::Notification | WindowType::Menu => {
                state.set(StatusFlags::NOLIST | StatusFlags::NOPAGER);
                state.border = BorderFlags::empty();
            }
            WindowType::Toolbar | WindowType::Utility => {
                state.set(StatusFlags::NOLIST);
                state.clear_border(BorderFlags::MIN);
            }
            WindowType::Dialog => state.clear_border(BorderFlags::MIN),
            WindowType::Normal => {}
        }

        if info.motif.decorations == Some(false) {
            state.clear_border(BorderFlags::OUTLINE | BorderFlags::TITLE);
        }
        if info.motif.resize == Some(false) {
            state.clear_border(BorderFlags::RESIZE);
        }
        let hints = &info.size_hints;
        if hints.min_width == hints.max_width && hints.min_height == hints.max_height {
            state.clear_border(BorderFlags::RESIZE | BorderFlags::MAX | BorderFlags::MAX_H | BorderFlags::MAX_V);
        }

        let net = info.net_state;
        if net.contains(NetState::STICKY) {
            state.set(StatusFlags::STICKY);
        }
        if net.contains(NetState::SKIP_TASKBAR) {
            state.set(StatusFlags::NOLIST);
        }
        if net.contains(NetState::SKIP_PAGER) {
            state.set(StatusFlags::NOPAGER);
        }
        if net.contains(NetState::ABOVE) {
            state.layer = Layer::Above;
        } else if net.contains(NetState::BELOW) {
            state.layer = Layer::Below;
        }
        pending.shaded = net.contains(NetState::SHADED);
        pending.minimized = net.contains(NetState::HIDDEN) || info.wm_hints.iconic;
        pending.fullscreen = net.contains(NetState::FULLSCREEN);
        if net.contains(NetState::MAXIMIZED_HORZ) {
            pending.maximized |= MaxFlags::HORIZ;
        }
        if net.contains(NetState::MAXIMIZED_VERT) {
            pending.maximized |= MaxFlags::VERT;
        }
        pending.urgent = info.wm_hints.urgent || net.contains(NetState::DEMANDS_ATTENTION);

        state.desktop = match info.desktop {
            Some(ALL_DESKTOPS) => {
                state.set(StatusFlags::STICKY);
                self.current_desktop
            }
            Some(d) if d < self.settings.desktop_count => d,
            _ => self.current_desktop,
        };

        // Transients live with their owner
        if let Some(owner) = client.owner.and_then(|o| self.clients.get(o)) {
            client.state.desktop = owner.state.desktop;
            if owner.state.is_sticky() {
                client.state.set(StatusFlags::STICKY);
            }
            if owner.state.layer > client.state.layer {
                client.state.layer = owner.state.layer;
            }
        }

        (client, pending)
    }

    fn apply_group_options(&self, client: &mut Client, pending: &mut Pending) {
        let options = self
            .settings
            .group_options(&client.class, &client.instance, &client.name);
        let state = &mut client.state;
        for option in options {
            match option {
                GroupOption::Sticky => state.set(StatusFlags::STICKY),
                GroupOption::Desktop(d) => {
                    if d < self.settings.desktop_count {
                        state.desktop = d;
                    }
                }
                GroupOption::Layer(layer) => {
                    state.default_layer = layer;
                    state.layer = layer;
                }
                GroupOption::NoBorder => state.clear_border(BorderFlags::OUTLINE | BorderFlags::TITLE),
                GroupOption::NoTitle => state.clear_border(BorderFlags::TITLE),
                GroupOption::Centered => state.set(StatusFlags::CENTERED),
                GroupOption::Tiled => state.set(StatusFlags::TILED),
                GroupOption::Maximized => pending.maximized = MaxFlags::HORIZ | MaxFlags::VERT,
                GroupOption::Minimized => pending.minimized = true,
                GroupOption::Fullscreen => pending.fullscreen = true,
                GroupOption::IgnoreIncrements => state.set(StatusFlags::IGNORE_INC),
                GroupOption::IgnorePosition => state.set(StatusFlags::IGNORE_POS),
                GroupOption::NoList => state.set(StatusFlags::NOLIST),
                GroupOption::NoPager => state.set(StatusFlags::NOPAGER),
                GroupOption::NotUrgent => state.set(StatusFlags::NOT_URGENT),
                GroupOption::Opacity(value) => {
                    state.opacity = (f64::from(value) * f64::from(u32::MAX)) as u32;
                    state.set(StatusFlags::OPACITY);
                }
                GroupOption::Fixed => state.set(StatusFlags::FIXED),
            }
        }
    }

    /// Where a new client goes.
    fn initial_geometry(&mut self, client: &Client, border: &BorderSize, already_mapped: bool) -> Result<Geometry> {
        let state = &client.state;
        let hints = &client.hints;
        let honour_position =
            already_mapped || (state.test(StatusFlags::POSITION) && !state.test(StatusFlags::IGNORE_POS));

        if honour_position {
            let g = gravitate(&client.geometry, hints.gravity, border, false);
            if already_mapped {
                return Ok(g);
            }
            let monitor = self.monitor_index(&border.frame_of(&g));
            let free = self.free_box_in_layer(state.layer, Some(client.window), monitor);
            let g = constrain_size(&g, hints, border, &free);
            return Ok(constrain_position(&g, border, &free));
        }

        let (px, py) = self.display.query_pointer()?;
        let monitor = self.screen.monitor_at(px, py).index;
        let free = self.free_box_in_layer(state.layer, Some(client.window), monitor);
        let g = constrain_size(&client.geometry, hints, border, &free);

        let policy = if state.test(StatusFlags::CENTERED) {
            PlacementPolicy::Center
        } else if state.test(StatusFlags::TILED) {
            PlacementPolicy::Tile
        } else {
            self.settings.placement
        };

        let placed = match policy {
            PlacementPolicy::Center => {
                let frame = center(&free, &border.frame_of(&g));
                Some(Geometry::new(frame.x + border.west, frame.y + border.north, g.width, g.height))
            }
            PlacementPolicy::Tile => {
                let others: Vec<Geometry> = self
                    .stack
                    .clients_on_desktop(&self.clients, state.desktop, true)
                    .into_iter()
                    .filter_map(|w| self.clients.get(w))
                    .map(|c| self.decorations.border_size(c).frame_of(&c.geometry))
                    .collect();
                let tiled = tile(&free, &g, border, &others);
                if tiled.is_none() {
                    debug!("No tile position for 0x{:x}, cascading", client.window);
                }
                tiled.map(|(x, y)| Geometry::new(x, y, g.width, g.height))
            }
            PlacementPolicy::Cascade => None,
        };

        let g = match placed {
            Some(g) => g,
            None => {
                let theme = self.decorations.theme();
                let step = (theme.border_width + theme.title_height).max(1);
                self.cascade.place(monitor, state.desktop, &free, &g, border, step)
            }
        };
        Ok(constrain_position(&g, border, &free))
    }

    /// Stop managing a window.
    ///
    /// With `manager_exiting` the window goes back to the root at its
    /// gravity-adjusted position and is mapped; otherwise the client is
    /// leaving and only our resources are released.
    pub fn unmanage(&mut self, window: Window, manager_exiting: bool) -> Result<()> {
        if !self.clients.contains(window) {
            return Ok(());
        }

        if self.interactive == Some(window) {
            self.cancel_session(true)?;
        } else if let Some(client) = self.clients.get_mut(window) {
            client.controller.cancel(true);
        }

        if self.active == Some(window) {
            if manager_exiting {
                self.active = None;
            } else {
                self.focus_next_stacked(window)?;
            }
        }

        self.timers.remove(TimerKind::Urgency(window));
        self.closing.forget(window);
        if self.struts.remove_owner(window) {
            debug!("Struts of 0x{:x} released", window);
        }
        self.stack.remove(window);
        self.last_click = self.last_click.filter(|&(w, _)| w != window);

        let Some(client) = self.clients.remove(window) else {
            return Ok(());
        };
        let border = self.decorations.border_size(&client);
        if manager_exiting {
            let geometry = gravitate(&client.geometry, client.hints.gravity, &border, true);
            self.display.release_window(window, client.frame, &geometry, true)?;
        } else {
            self.display.release_window(window, client.frame, &client.geometry, false)?;
        }

        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        info!("Released 0x{:x}{}", window, if manager_exiting { " (exiting)" } else { "" });
        Ok(())
    }

    /// Unmap the outer window of a client that is on screen.
    fn unmap_outer(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        match client.frame {
            Some(frame) => self.display.unmap_window(frame),
            None => {
                client.ignore_unmap += 1;
                self.display.unmap_window(window)
            }
        }
    }

    fn map_outer(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let outer = client.outer_window();
        self.display.map_window(outer)
    }

    /// Minimize a client and every transient below it.
    ///
    /// With `lower` the client also goes to the back of its layer.
    pub fn minimize(&mut self, window: Window, lower: bool) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if client.state.is_minimized() {
            return Ok(());
        }

        for child in self.stack.transients_of(window, &self.clients) {
            self.minimize_one(child, lower)?;
        }
        self.minimize_one(window, lower)
    }

    pub(crate) fn minimize_one(&mut self, window: Window, lower: bool) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if client.state.is_minimized() {
            return Ok(());
        }
        let on_screen = client.state.is_shown() && !client.state.is_hidden();
        let was_active = self.active == Some(window);

        if on_screen {
            self.unmap_outer(window)?;
        }
        if let Some(client) = self.clients.get_mut(window) {
            client.state.set(StatusFlags::MINIMIZED);
            client.state.clear(StatusFlags::MAPPED);
        }
        if lower {
            self.stack.lower(window);
        }
        self.write_state(window)?;
        if was_active {
            self.focus_next_stacked(window)?;
        }
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        debug!("Minimized 0x{:x}", window);
        Ok(())
    }

    /// Bring a minimized client back on the current desktop, with its
    /// minimized transients. With `raise` it is also raised and focused.
    pub fn restore(&mut self, window: Window, raise: bool) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let state = client.state;
        if !state.is_sticky() && state.desktop != self.current_desktop {
            if state.test(StatusFlags::FIXED) {
                self.change_desktop(state.desktop)?;
            } else {
                self.set_client_desktop(window, self.current_desktop)?;
            }
        }

        self.restore_one(window)?;
        // Owners before their own transients
        for child in self.stack.transients_of(window, &self.clients).into_iter().rev() {
            self.restore_one(child)?;
        }

        if raise {
            self.raise_client(window)?;
            self.focus_client(window)?;
        }
        Ok(())
    }

    pub(crate) fn restore_one(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if !client.state.is_minimized() {
            return Ok(());
        }
        client.state.clear(StatusFlags::MINIMIZED | StatusFlags::SHOW_DESKTOP);
        client.state.set(StatusFlags::MAPPED);
        let hidden = client.state.is_hidden();
        if !hidden {
            self.map_outer(window)?;
        }
        self.write_state(window)?;
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        debug!("Restored 0x{:x}", window);
        Ok(())
    }

    /// Roll a client up to its title bar.
    pub fn shade(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        let state = &client.state;
        if state.is_shaded()
            || state.is_fullscreen()
            || client.frame.is_none()
            || !state.has_border(BorderFlags::SHADE | BorderFlags::TITLE)
        {
            return Ok(());
        }
        client.state.set(StatusFlags::SHADED);
        client.ignore_unmap += 1;
        self.display.unmap_window(window)?;
        self.apply_geometry(window)?;
        self.write_state(window)?;
        self.mark(Dirty::PAGER);
        debug!("Shaded 0x{:x}", window);
        Ok(())
    }

    pub fn unshade(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if !client.state.is_shaded() {
            return Ok(());
        }
        client.state.clear(StatusFlags::SHADED);
        self.display.map_window(window)?;
        self.apply_geometry(window)?;
        self.write_state(window)?;
        self.mark(Dirty::PAGER);
        if self.active == Some(window) {
            self.active = None;
            self.focus_client(window)?;
        }
        debug!("Unshaded 0x{:x}", window);
        Ok(())
    }

    /// Take a client off screen because it is not on the current desktop.
    pub(crate) fn hide_client(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if client.state.is_hidden() {
            return Ok(());
        }
        let on_screen = client.state.is_shown() && !client.state.is_minimized();
        if on_screen {
            self.unmap_outer(window)?;
        }
        if let Some(client) = self.clients.get_mut(window) {
            client.state.set(StatusFlags::HIDDEN);
        }
        Ok(())
    }

    /// Put a client back on screen when its desktop becomes current.
    pub(crate) fn show_client(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if !client.state.is_hidden() {
            return Ok(());
        }
        client.state.clear(StatusFlags::HIDDEN);
        if client.state.is_shown() && !client.state.is_minimized() {
            self.map_outer(window)?;
        }
        Ok(())
    }

    /// Turn urgency on or off. Urgent clients flash until it clears.
    pub fn set_urgent(&mut self, window: Window, urgent: bool, now: Instant) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if urgent {
            if client.state.test(StatusFlags::NOT_URGENT) || client.state.is_urgent() {
                return Ok(());
            }
            client.state.set(StatusFlags::URGENT);
            self.timers
                .add_periodic(TimerKind::Urgency(window), URGENCY_PERIOD, now);
            debug!("Client 0x{:x} is urgent", window);
        } else {
            if !client.state.is_urgent() {
                return Ok(());
            }
            client.state.clear(StatusFlags::URGENT | StatusFlags::FLASH);
            self.timers.remove(TimerKind::Urgency(window));
            self.draw_border(window)?;
        }
        self.write_state(window)?;
        self.mark(Dirty::TASK_LIST);
        Ok(())
    }

    /// Urgency timer tick: toggle the flash phase.
    pub(crate) fn flash_urgent(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            self.timers.remove(TimerKind::Urgency(window));
            return Ok(());
        };
        if !client.state.is_urgent() {
            self.timers.remove(TimerKind::Urgency(window));
            return Ok(());
        }
        client.state.status.toggle(StatusFlags::FLASH);
        self.draw_border(window)
    }

    /// Re-read a client's strut hint.
    pub(crate) fn read_struts(&mut self, window: Window) -> Result<()> {
        let values = self.display.read_strut(window)?;
        let rects = rects_from_hint(&values, self.screen.width, self.screen.height);
        if self.struts.set_for(window, &rects) {
            debug!("Struts of 0x{:x} now {:?}", window, rects);
            self.mark(Dirty::PAGER);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::shared::Gravity;
    use crate::wm::client::SizeHints;
    use crate::wm::display::WmHints;
    use crate::wm::events::WmEvent;
    use crate::wm::settings::{GroupRule, Settings};
    use crate::wm::testing::{manage_at, new_wm, new_wm_with, MockDisplay};

    fn info(geometry: Geometry) -> ClientInfo {
        ClientInfo {
            geometry,
            viewable: true,
            ..ClientInfo::default()
        }
    }

    #[test]
    fn test_unmanageable_windows_are_skipped() {
        let mut wm = new_wm();
        let now = Instant::now();
        wm.display_mut().add_window(1, ClientInfo {
            override_redirect: true,
            ..info(Geometry::new(0, 0, 50, 50))
        });
        wm.display_mut().add_window(2, ClientInfo {
            input_only: true,
            ..info(Geometry::new(0, 0, 50, 50))
        });
        wm.manage(1, false, now).unwrap();
        wm.manage(2, false, now).unwrap();
        // Unknown window: attributes unreadable
        wm.manage(3, false, now).unwrap();
        assert!(wm.clients().is_empty());
        assert!(wm.stack().is_empty());
    }

    #[test]
    fn test_manage_frames_maps_and_focuses() {
        let mut wm = new_wm();
        let now = Instant::now();
        wm.display_mut().add_window(5, info(Geometry::new(0, 0, 300, 200)));
        wm.manage(5, false, now).unwrap();

        let client = wm.clients().get(5).unwrap();
        let frame = client.frame.unwrap();
        assert!(client.state.is_mapped());
        assert!(client.state.is_active());
        assert!(wm.display().mapped.contains(&frame));
        assert_eq!(wm.display().focus, Some(5));
        assert_eq!(wm.stack().layer_of(5), Some(Layer::Normal));
    }

    #[test]
    fn test_startup_window_keeps_position() {
        let mut wm = new_wm();
        let now = Instant::now();
        wm.display_mut().add_window(6, info(Geometry::new(300, 300, 100, 100)));
        wm.manage(6, true, now).unwrap();
        // North-west gravity: frame origin lands where the window was
        let client = wm.clients().get(6).unwrap();
        assert_eq!(client.geometry, Geometry::new(304, 324, 100, 100));
        assert!(!client.state.is_active());
    }

    #[test]
    fn test_cascade_offsets_successive_windows() {
        let mut wm = new_wm();
        let now = Instant::now();
        for window in [7, 8] {
            wm.display_mut().add_window(window, info(Geometry::new(0, 0, 200, 100)));
            wm.manage(window, false, now).unwrap();
        }
        let a = wm.clients().get(7).unwrap().geometry;
        let b = wm.clients().get(8).unwrap().geometry;
        assert_eq!((a.x, a.y), (4, 24));
        assert_eq!((b.x - a.x, b.y - a.y), (24, 24));
    }

    #[test]
    fn test_group_rule_applies_options() {
        let mut settings = Settings::default();
        settings.groups.push(GroupRule {
            class: Some("xclock".into()),
            name: None,
            options: vec![
                GroupOption::Sticky,
                GroupOption::Layer(Layer::Above),
                GroupOption::NoBorder,
                GroupOption::Centered,
            ],
        });
        let mut wm = new_wm_with(settings, MockDisplay::new());
        wm.display_mut().add_window(9, ClientInfo {
            class: "XClock".into(),
            instance: "xclock".into(),
            ..info(Geometry::new(0, 0, 100, 100))
        });
        wm.manage(9, false, Instant::now()).unwrap();

        let client = wm.clients().get(9).unwrap();
        assert!(client.state.is_sticky());
        assert_eq!(wm.stack().layer_of(9), Some(Layer::Above));
        assert!(client.frame.is_none());
        assert_eq!(client.geometry, Geometry::new(450, 350, 100, 100));
    }

    #[test]
    fn test_iconic_hint_maps_minimized() {
        let mut wm = new_wm();
        wm.display_mut().add_window(10, ClientInfo {
            wm_hints: WmHints {
                iconic: true,
                ..WmHints::default()
            },
            ..info(Geometry::new(0, 0, 100, 100))
        });
        wm.manage(10, false, Instant::now()).unwrap();
        let client = wm.clients().get(10).unwrap();
        assert!(client.state.is_minimized());
        assert!(!client.state.is_active());
        assert_eq!(wm.active(), None);
    }

    #[test]
    fn test_minimize_restore_keeps_geometry() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 11, Geometry::new(100, 100, 300, 200), now);
        let before = wm.clients().get(11).unwrap().geometry;

        wm.minimize(11, true).unwrap();
        let state = wm.clients().get(11).unwrap().state;
        assert!(state.is_minimized());
        assert!(!state.is_mapped());
        assert_eq!(wm.active(), None);

        // Minimizing again is a no-op
        wm.minimize(11, true).unwrap();

        wm.restore(11, true).unwrap();
        let client = wm.clients().get(11).unwrap();
        assert!(client.state.is_mapped());
        assert!(!client.state.is_minimized());
        assert_eq!(client.geometry, before);
        assert_eq!(wm.active(), Some(11));
    }

    #[test]
    fn test_minimize_owner_minimizes_transients_in_place() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 20, Geometry::new(100, 100, 300, 200), now);
        for child in [21, 22] {
            wm.display_mut().add_window(child, ClientInfo {
                transient_for: Some(20),
                ..info(Geometry::new(150, 150, 100, 80))
            });
            wm.manage(child, false, now).unwrap();
        }
        let before: Vec<Window> = wm.stack().layer_list(Layer::Normal).to_vec();

        wm.minimize(20, false).unwrap();
        for window in [20, 21, 22] {
            assert!(wm.clients().get(window).unwrap().state.is_minimized());
        }
        assert_eq!(wm.stack().layer_list(Layer::Normal), before.as_slice());
    }

    #[test]
    fn test_minimize_and_restore_follow_transient_chain() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 25, Geometry::new(100, 100, 300, 200), now);
        for (child, owner) in [(26, 25), (27, 26)] {
            wm.display_mut().add_window(child, ClientInfo {
                transient_for: Some(owner),
                ..info(Geometry::new(150, 150, 100, 80))
            });
            wm.manage(child, false, now).unwrap();
        }

        wm.minimize(25, false).unwrap();
        for window in [25, 26, 27] {
            assert!(wm.clients().get(window).unwrap().state.is_minimized(), "0x{:x}", window);
        }

        wm.restore(25, true).unwrap();
        for window in [25, 26, 27] {
            let state = wm.clients().get(window).unwrap().state;
            assert!(!state.is_minimized(), "0x{:x}", window);
            assert!(state.is_mapped(), "0x{:x}", window);
        }
    }

    #[test]
    fn test_focus_hands_off_when_active_minimized() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 30, Geometry::new(100, 100, 100, 100), now);
        manage_at(&mut wm, 31, Geometry::new(300, 100, 100, 100), now);
        assert_eq!(wm.active(), Some(31));
        wm.minimize(31, false).unwrap();
        assert_eq!(wm.active(), Some(30));
        assert_eq!(wm.display().focus, Some(30));
    }

    #[test]
    fn test_shade_unmaps_body_only() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 40, Geometry::new(100, 100, 300, 200), now);
        wm.shade(40).unwrap();
        let client = wm.clients().get(40).unwrap();
        let frame = client.frame.unwrap();
        assert!(client.state.is_shaded());
        assert!(!wm.display().mapped.contains(&40));
        assert!(wm.display().mapped.contains(&frame));
        assert_eq!(wm.display().last_configure(40).map(|c| c.shaded), Some(true));

        // The unmap we caused does not withdraw the client
        wm.display_mut().queue(WmEvent::UnmapNotify {
            window: 40,
            synthetic: false,
        });
        wm.process_pending(now).unwrap();
        assert!(wm.clients().contains(40));

        wm.unshade(40).unwrap();
        assert!(wm.display().mapped.contains(&40));
        assert!(!wm.clients().get(40).unwrap().state.is_shaded());
    }

    #[test]
    fn test_shade_needs_title() {
        let mut wm = new_wm();
        let now = Instant::now();
        wm.display_mut().add_window(41, ClientInfo {
            window_type: WindowType::Dock,
            ..info(Geometry::new(0, 0, 1000, 30))
        });
        wm.manage(41, false, now).unwrap();
        wm.shade(41).unwrap();
        assert!(!wm.clients().get(41).unwrap().state.is_shaded());
    }

    #[test]
    fn test_withdraw_unmanages() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 50, Geometry::new(100, 100, 100, 100), now);
        wm.display_mut().queue(WmEvent::UnmapNotify {
            window: 50,
            synthetic: true,
        });
        wm.process_pending(now).unwrap();
        assert!(!wm.clients().contains(50));
        assert!(!wm.stack().contains(50));
        assert_eq!(wm.active(), None);
    }

    #[test]
    fn test_urgent_hint_registers_flash() {
        let mut wm = new_wm();
        wm.display_mut().add_window(60, ClientInfo {
            wm_hints: WmHints {
                urgent: true,
                ..WmHints::default()
            },
            ..info(Geometry::new(0, 0, 100, 100))
        });
        wm.manage(60, false, Instant::now()).unwrap();
        assert!(wm.clients().get(60).unwrap().state.is_urgent());
        assert!(wm.next_deadline().is_some());

        wm.unmanage(60, false).unwrap();
        assert!(wm.next_deadline().is_none());
    }

    #[test]
    fn test_program_position_is_constrained() {
        let mut wm = new_wm();
        wm.display_mut().add_window(70, ClientInfo {
            size_hints: SizeHints {
                has_position: true,
                gravity: Gravity::Static,
                ..SizeHints::default()
            },
            ..info(Geometry::new(950, 700, 200, 200))
        });
        wm.manage(70, false, Instant::now()).unwrap();
        let g = wm.clients().get(70).unwrap().geometry;
        // Frame kept inside the 1000x800 screen
        assert_eq!((g.right() + 4, g.bottom() + 4), (1000, 800));
    }
}
