//! Workspace Module
//!
//! Virtual desktops, sticky clients and the show-desktop toggle.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::wm::client_flags::{Layer, StatusFlags};
use crate::wm::display::{DisplayServer, Window};
use crate::wm::{Dirty, WindowManager};

impl<D: DisplayServer> WindowManager<D> {
    /// Switch to another desktop.
    ///
    /// Clients of the old desktop are hidden, clients of the new one shown;
    /// sticky clients stay where they are.
    pub fn change_desktop(&mut self, desktop: u32) -> Result<()> {
        if desktop >= self.settings.desktop_count {
            warn!("Invalid desktop {} (have {})", desktop, self.settings.desktop_count);
            return Ok(());
        }
        if desktop == self.current_desktop {
            return Ok(());
        }

        let windows: Vec<Window> = self.stack.top_down().collect();
        for &window in &windows {
            let Some(client) = self.clients.get(window) else {
                continue;
            };
            if !client.state.is_sticky() && client.state.desktop == self.current_desktop {
                self.hide_client(window)?;
            }
        }
        let previous = self.current_desktop;
        self.current_desktop = desktop;
        for &window in &windows {
            let Some(client) = self.clients.get(window) else {
                continue;
            };
            if !client.state.is_sticky() && client.state.desktop == desktop {
                self.show_client(window)?;
            }
        }

        self.refocus()?;
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        info!("Desktop {} -> {}", previous, desktop);
        Ok(())
    }

    /// Move a client and its transients to `desktop`. Sticky clients are
    /// already everywhere and stay put.
    pub fn set_client_desktop(&mut self, window: Window, desktop: u32) -> Result<()> {
        if desktop >= self.settings.desktop_count {
            return Ok(());
        }
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if client.state.is_sticky() || client.state.desktop == desktop {
            return Ok(());
        }

        let mut moved = vec![window];
        moved.extend(self.stack.children_of(window, &self.clients));
        for &w in &moved {
            let Some(client) = self.clients.get_mut(w) else {
                continue;
            };
            if client.state.is_sticky() {
                continue;
            }
            client.state.desktop = desktop;
            if desktop == self.current_desktop {
                self.show_client(w)?;
            } else {
                self.hide_client(w)?;
            }
            self.write_state(w)?;
        }

        if self.active.is_some_and(|a| moved.contains(&a)) && desktop != self.current_desktop {
            self.focus_next_stacked(window)?;
        }
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        debug!("Client 0x{:x} sent to desktop {}", window, desktop);
        Ok(())
    }

    /// Make a client visible on every desktop, or pin it to the current one.
    pub fn set_sticky(&mut self, window: Window, sticky: bool) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.state.is_sticky() == sticky {
            return Ok(());
        }
        if sticky {
            client.state.set(StatusFlags::STICKY);
            self.show_client(window)?;
        } else {
            client.state.clear(StatusFlags::STICKY);
            client.state.desktop = self.current_desktop;
        }
        self.write_state(window)?;
        self.mark(Dirty::TASK_LIST | Dirty::PAGER);
        Ok(())
    }

    /// Minimize every ordinary client on the current desktop, or bring back
    /// the ones that toggle minimized.
    pub fn toggle_show_desktop(&mut self) -> Result<()> {
        let desktop = self.current_desktop as usize;
        let showing = self.is_showing_desktop();
        let windows = self
            .stack
            .clients_on_desktop(&self.clients, self.current_desktop, false);

        if showing {
            for window in windows {
                let marked = self
                    .clients
                    .get(window)
                    .is_some_and(|c| c.state.test(StatusFlags::SHOW_DESKTOP));
                if marked {
                    self.restore_one(window)?;
                }
            }
            self.refocus()?;
        } else {
            for window in windows {
                let Some(client) = self.clients.get(window) else {
                    continue;
                };
                let state = client.state;
                if state.is_minimized()
                    || state.should_skip_in_task_list()
                    || state.layer == Layer::Desktop
                {
                    continue;
                }
                self.minimize_one(window, false)?;
                if let Some(client) = self.clients.get_mut(window) {
                    client.state.set(StatusFlags::SHOW_DESKTOP);
                }
            }
        }

        if let Some(flag) = self.showing_desktop.get_mut(desktop) {
            *flag = !showing;
        }
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST | Dirty::PAGER);
        debug!("Show desktop {} on desktop {}", !showing, desktop);
        Ok(())
    }

    pub fn is_showing_desktop(&self) -> bool {
        self.showing_desktop
            .get(self.current_desktop as usize)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::shared::Geometry;
    use crate::wm::display::ClientInfo;
    use crate::wm::client_flags::WindowType;
    use crate::wm::testing::{manage_at, new_wm};

    #[test]
    fn test_change_desktop_hides_and_shows() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 1, Geometry::new(0, 0, 100, 100), now);
        manage_at(&mut wm, 2, Geometry::new(0, 0, 100, 100), now);
        wm.set_sticky(2, true).unwrap();

        wm.change_desktop(1).unwrap();
        assert_eq!(wm.current_desktop(), 1);
        let one = wm.clients().get(1).unwrap();
        assert!(one.state.is_hidden());
        assert!(!wm.display().mapped.contains(&one.frame.unwrap()));
        assert!(!wm.clients().get(2).unwrap().state.is_hidden());
        assert_eq!(wm.active(), Some(2));

        wm.change_desktop(0).unwrap();
        let one = wm.clients().get(1).unwrap();
        assert!(!one.state.is_hidden());
        assert!(wm.display().mapped.contains(&one.frame.unwrap()));

        // Out of range is ignored
        wm.change_desktop(99).unwrap();
        assert_eq!(wm.current_desktop(), 0);
    }

    #[test]
    fn test_transients_follow_owner_desktop() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 10, Geometry::new(0, 0, 300, 300), now);
        wm.display_mut().add_window(11, ClientInfo {
            geometry: Geometry::new(0, 0, 100, 100),
            transient_for: Some(10),
            window_type: WindowType::Dialog,
            ..ClientInfo::default()
        });
        wm.manage(11, false, now).unwrap();

        wm.set_client_desktop(10, 2).unwrap();
        for window in [10, 11] {
            let state = wm.clients().get(window).unwrap().state;
            assert_eq!(state.desktop, 2);
            assert!(state.is_hidden());
        }
        assert_eq!(wm.active(), None);
    }

    #[test]
    fn test_unstick_pins_to_current() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 20, Geometry::new(0, 0, 100, 100), now);
        wm.set_sticky(20, true).unwrap();
        wm.change_desktop(3).unwrap();
        wm.set_sticky(20, false).unwrap();
        let state = wm.clients().get(20).unwrap().state;
        assert_eq!(state.desktop, 3);
        assert!(!state.is_hidden());
    }

    #[test]
    fn test_show_desktop_toggles_back() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 30, Geometry::new(0, 0, 100, 100), now);
        manage_at(&mut wm, 31, Geometry::new(0, 0, 100, 100), now);
        manage_at(&mut wm, 32, Geometry::new(0, 0, 100, 100), now);
        wm.minimize(32, false).unwrap();

        wm.toggle_show_desktop().unwrap();
        assert!(wm.is_showing_desktop());
        assert!(wm.clients().iter().all(|c| c.state.is_minimized()));
        assert_eq!(wm.active(), None);

        wm.toggle_show_desktop().unwrap();
        assert!(!wm.is_showing_desktop());
        assert!(!wm.clients().get(30).unwrap().state.is_minimized());
        assert!(!wm.clients().get(31).unwrap().state.is_minimized());
        // Minimized before the toggle, stays minimized
        assert!(wm.clients().get(32).unwrap().state.is_minimized());
        assert!(wm.active().is_some());
    }
}
