//! Maximize and fullscreen transitions.

use anyhow::Result;
use tracing::debug;

use crate::shared::{BorderSize, Geometry};
use crate::wm::client::Client;
use crate::wm::client_flags::{BorderFlags, MaxFlags, StatusFlags};
use crate::wm::display::{DisplayServer, Window};
use crate::wm::placement::maximized_geometry;
use crate::wm::{Dirty, WindowManager};

impl<D: DisplayServer> WindowManager<D> {
    /// Put a client into maximize mode `flags`; `MaxFlags::NONE` restores
    /// the geometry it had before maximizing.
    ///
    /// The monitor is chosen from the frame center before the transition.
    /// A fullscreen client is left alone.
    pub fn maximize(&mut self, window: Window, flags: MaxFlags) -> Result<()> {
        let flags = flags.normalized();
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        if client.state.is_fullscreen() {
            debug!("Client 0x{:x} is fullscreen, ignoring maximize {:?}", window, flags);
            return Ok(());
        }
        let current = client.state.max_flags();
        if flags == current {
            return Ok(());
        }
        if !flags.is_empty() && !may_maximize(client, flags) {
            debug!("Client 0x{:x} refuses maximize {:?}", window, flags);
            return Ok(());
        }

        if client.state.is_shaded() {
            self.unshade(window)?;
        }

        let border = self.border_of(window);
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        let monitor = {
            let (x, y) = border.frame_of(&client.geometry).center();
            self.screen.monitor_at(x, y).index
        };

        if !current.is_empty() {
            client.restore_geometry();
        }
        if flags.is_empty() {
            client.state.clear_max_flags();
        } else {
            client.save_geometry();
            let free = self.free_box(Some(window), monitor);
            let Some(client) = self.clients.get_mut(window) else {
                return Ok(());
            };
            client.geometry = maximized_for(client, flags, &client.geometry, &border, &free);
            client.state.set_max_flags(flags);
        }

        debug!("Client 0x{:x} maximize {:?} -> {:?}", window, current, flags);
        self.apply_geometry(window)?;
        self.write_state(window)?;
        self.mark(Dirty::PAGER);
        Ok(())
    }

    /// Geometry `client` would get in maximize mode `flags`, starting
    /// from `base`.
    pub(crate) fn maximize_target(
        &self,
        client: &Client,
        flags: MaxFlags,
        base: &Geometry,
        border: &BorderSize,
    ) -> Geometry {
        let monitor = self.monitor_index(&border.frame_of(base));
        let free = self.free_box(Some(client.window), monitor);
        maximized_for(client, flags.normalized(), base, border, &free)
    }

    /// Cover the client's monitor, or go back to the previous geometry.
    ///
    /// A maximize mode active when fullscreen starts comes back afterwards.
    pub fn set_fullscreen(&mut self, window: Window, fullscreen: bool) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if client.state.is_fullscreen() == fullscreen {
            return Ok(());
        }
        if fullscreen && !client.state.has_border(BorderFlags::FULLSCREEN) {
            debug!("Client 0x{:x} may not go fullscreen", window);
            return Ok(());
        }

        if fullscreen {
            if client.state.is_shaded() {
                self.unshade(window)?;
            }
            let border = self.border_of(window);
            let Some(client) = self.clients.get_mut(window) else {
                return Ok(());
            };
            let (x, y) = border.frame_of(&client.geometry).center();
            let bounds = self.screen.monitor_at(x, y).bounds;
            if !client.state.is_maximized() {
                client.save_geometry();
            }
            client.state.enter_fullscreen();
            client.geometry = bounds;
            self.apply_geometry(window)?;
            self.write_state(window)?;
            self.raise_client(window)?;
            self.mark(Dirty::RESTACK | Dirty::PAGER);
            debug!("Client 0x{:x} fullscreen on {:?}", window, bounds);
        } else {
            let Some(client) = self.clients.get_mut(window) else {
                return Ok(());
            };
            let parked = client.state.leave_fullscreen();
            client.restore_geometry();
            self.apply_geometry(window)?;
            self.write_state(window)?;
            if !parked.is_empty() {
                self.maximize(window, parked)?;
            }
            self.mark(Dirty::RESTACK | Dirty::PAGER);
            debug!("Client 0x{:x} left fullscreen", window);
        }
        Ok(())
    }
}

/// Border permission for each maximized axis
fn may_maximize(client: &Client, flags: MaxFlags) -> bool {
    let state = &client.state;
    if flags.horizontal() && flags.vertical() {
        return state.has_border(BorderFlags::MAX);
    }
    if flags.horizontal() {
        return state.has_border(BorderFlags::MAX_H) || state.has_border(BorderFlags::MAX);
    }
    state.has_border(BorderFlags::MAX_V) || state.has_border(BorderFlags::MAX)
}

fn maximized_for(client: &Client, flags: MaxFlags, base: &Geometry, border: &BorderSize, free: &Geometry) -> Geometry {
    let ignore_increments = client.state.test(StatusFlags::IGNORE_INC);
    maximized_geometry(base, &client.hints, border, free, flags, ignore_increments)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::wm::client::SizeHints;
    use crate::wm::display::ClientInfo;
    use crate::wm::screen::Monitor;
    use crate::wm::testing::{manage_at, new_wm, new_wm_with, MockDisplay};
    use crate::wm::settings::Settings;

    #[test]
    fn test_maximize_then_restore_is_inverse() {
        let mut wm = new_wm();
        manage_at(&mut wm, 1, Geometry::new(100, 100, 300, 200), Instant::now());
        let before = wm.clients().get(1).unwrap().geometry;

        wm.maximize(1, MaxFlags::HORIZ | MaxFlags::VERT).unwrap();
        let client = wm.clients().get(1).unwrap();
        assert_eq!(client.geometry, Geometry::new(4, 24, 992, 772));
        assert!(client.state.is_maximized());

        wm.maximize(1, MaxFlags::NONE).unwrap();
        let client = wm.clients().get(1).unwrap();
        assert_eq!(client.geometry, before);
        assert!(!client.state.is_maximized());
    }

    #[test]
    fn test_switching_axes_starts_from_saved_geometry() {
        let mut wm = new_wm();
        manage_at(&mut wm, 2, Geometry::new(100, 100, 300, 200), Instant::now());
        wm.maximize(2, MaxFlags::HORIZ).unwrap();
        let g = wm.clients().get(2).unwrap().geometry;
        assert_eq!((g.x, g.width, g.y, g.height), (4, 992, 100, 200));

        wm.maximize(2, MaxFlags::VERT).unwrap();
        let g = wm.clients().get(2).unwrap().geometry;
        assert_eq!((g.x, g.width, g.y, g.height), (100, 300, 24, 772));

        wm.maximize(2, MaxFlags::NONE).unwrap();
        assert_eq!(wm.clients().get(2).unwrap().geometry, Geometry::new(100, 100, 300, 200));
    }

    #[test]
    fn test_maximize_respects_max_size() {
        let mut wm = new_wm();
        wm.display_mut().add_window(3, ClientInfo {
            geometry: Geometry::new(10, 10, 200, 200),
            size_hints: SizeHints {
                min_width: 100,
                min_height: 100,
                max_width: 300,
                max_height: 300,
                ..SizeHints::default()
            },
            ..ClientInfo::default()
        });
        wm.manage(3, false, Instant::now()).unwrap();
        wm.maximize(3, MaxFlags::HORIZ | MaxFlags::VERT).unwrap();
        let g = wm.clients().get(3).unwrap().geometry;
        assert!(g.width <= 300 && g.height <= 300);
    }

    #[test]
    fn test_fixed_size_cannot_maximize() {
        let mut wm = new_wm();
        wm.display_mut().add_window(4, ClientInfo {
            geometry: Geometry::new(10, 10, 300, 300),
            size_hints: SizeHints {
                min_width: 300,
                min_height: 300,
                max_width: 300,
                max_height: 300,
                ..SizeHints::default()
            },
            ..ClientInfo::default()
        });
        wm.manage(4, false, Instant::now()).unwrap();
        let before = wm.clients().get(4).unwrap().geometry;
        wm.maximize(4, MaxFlags::HORIZ | MaxFlags::VERT).unwrap();
        let client = wm.clients().get(4).unwrap();
        assert!(!client.state.is_maximized());
        assert_eq!(client.geometry, before);
    }

    #[test]
    fn test_fullscreen_covers_monitor_and_returns() {
        let mut display = MockDisplay::new();
        display.monitors = vec![
            Monitor {
                index: 0,
                bounds: Geometry::new(0, 0, 1000, 800),
                name: "left".into(),
                primary: true,
            },
            Monitor {
                index: 1,
                bounds: Geometry::new(1000, 0, 800, 600),
                name: "right".into(),
                primary: false,
            },
        ];
        display.size = (1800, 800);
        let mut wm = new_wm_with(Settings::default(), display);
        manage_at(&mut wm, 5, Geometry::new(1100, 100, 300, 200), Instant::now());
        let before = wm.clients().get(5).unwrap().geometry;

        wm.set_fullscreen(5, true).unwrap();
        let client = wm.clients().get(5).unwrap();
        assert_eq!(client.geometry, Geometry::new(1000, 0, 800, 600));
        assert_eq!(wm.border_of(5), BorderSize::NONE);

        wm.set_fullscreen(5, false).unwrap();
        assert_eq!(wm.clients().get(5).unwrap().geometry, before);
    }

    #[test]
    fn test_fullscreen_parks_maximize() {
        let mut wm = new_wm();
        manage_at(&mut wm, 6, Geometry::new(100, 100, 300, 200), Instant::now());
        wm.maximize(6, MaxFlags::HORIZ | MaxFlags::VERT).unwrap();
        let maximized = wm.clients().get(6).unwrap().geometry;

        wm.set_fullscreen(6, true).unwrap();
        let state = wm.clients().get(6).unwrap().state;
        assert!(state.is_consistent());
        assert!(!state.is_maximized());

        wm.set_fullscreen(6, false).unwrap();
        let client = wm.clients().get(6).unwrap();
        assert!(client.state.is_maximized());
        assert_eq!(client.geometry, maximized);

        wm.maximize(6, MaxFlags::NONE).unwrap();
        assert_eq!(wm.clients().get(6).unwrap().geometry, Geometry::new(100, 100, 300, 200));
    }

    #[test]
    fn test_maximize_while_fullscreen_changes_nothing() {
        let mut wm = new_wm();
        manage_at(&mut wm, 8, Geometry::new(100, 100, 300, 200), Instant::now());
        wm.set_fullscreen(8, true).unwrap();
        let (state, geometry) = wm.clients().get(8).map(|c| (c.state, c.geometry)).unwrap();

        wm.maximize(8, MaxFlags::HORIZ | MaxFlags::VERT).unwrap();
        wm.maximize(8, MaxFlags::LEFT).unwrap();
        let client = wm.clients().get(8).unwrap();
        assert_eq!(client.state, state);
        assert_eq!(client.geometry, geometry);

        // Nothing was parked either
        wm.set_fullscreen(8, false).unwrap();
        let client = wm.clients().get(8).unwrap();
        assert!(!client.state.is_maximized());
        assert_eq!(client.geometry, Geometry::new(100, 100, 300, 200));
    }

    #[test]
    fn test_maximize_unshades() {
        let mut wm = new_wm();
        manage_at(&mut wm, 7, Geometry::new(100, 100, 300, 200), Instant::now());
        wm.shade(7).unwrap();
        wm.maximize(7, MaxFlags::VERT).unwrap();
        let state = wm.clients().get(7).unwrap().state;
        assert!(!state.is_shaded());
        assert!(state.is_maximized());
    }
}
