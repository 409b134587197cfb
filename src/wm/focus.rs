//! Focus Module
//!
//! Input focus, the active client and colormap installation.

use anyhow::Result;
use tracing::debug;

use crate::wm::client_flags::StatusFlags;
use crate::wm::display::{DisplayServer, Window};
use crate::wm::{Dirty, WindowManager};

impl<D: DisplayServer> WindowManager<D> {
    /// Make `window` the active client.
    ///
    /// Hidden, minimized and unfocusable clients are refused. Clients that
    /// take input get the server focus; WM_TAKE_FOCUS clients are also
    /// sent the protocol message.
    pub fn focus_client(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let state = client.state;
        if state.is_hidden() || state.is_minimized() || !state.is_shown() || !state.can_focus() {
            return Ok(());
        }
        if self.active == Some(window) {
            return Ok(());
        }

        if let Some(previous) = self.active.take() {
            self.deactivate(previous)?;
        }

        if let Some(client) = self.clients.get_mut(window) {
            client.state.set(StatusFlags::ACTIVE);
        }
        self.active = Some(window);

        if state.test(StatusFlags::CAN_FOCUS) && !state.is_shaded() {
            self.display.set_input_focus(Some(window))?;
        } else {
            self.display.set_input_focus(None)?;
        }
        if state.test(StatusFlags::TAKE_FOCUS) {
            self.display.send_take_focus(window)?;
        }

        self.update_colormaps(window)?;
        self.draw_border(window)?;
        self.write_state(window)?;
        self.display.write_active_window(Some(window))?;
        self.mark(Dirty::RESTACK | Dirty::TASK_LIST);
        debug!("Focused 0x{:x}", window);
        Ok(())
    }

    /// Drop focus to the manager's fallback window.
    pub fn clear_focus(&mut self) -> Result<()> {
        if let Some(previous) = self.active.take() {
            self.deactivate(previous)?;
        }
        self.display.set_input_focus(None)?;
        self.display.write_active_window(None)?;
        self.mark(Dirty::TASK_LIST);
        Ok(())
    }

    fn deactivate(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else {
            return Ok(());
        };
        client.state.clear(StatusFlags::ACTIVE);
        self.draw_border(window)?;
        self.write_state(window)
    }

    /// Whether a client can take focus on the current desktop
    fn focus_candidate(&self, window: Window) -> bool {
        self.clients.get(window).is_some_and(|c| {
            c.state.is_visible()
                && c.state.can_focus()
                && c.state.is_on_desktop(self.current_desktop)
                && !c.state.should_skip_in_task_list()
        })
    }

    /// Pass focus from `from` to the next client below it: the rest of its
    /// layer first, then the lower layers. Clears focus when nothing fits.
    pub(crate) fn focus_next_stacked(&mut self, from: Window) -> Result<()> {
        let next = match self.stack.position(from) {
            Some((layer, index)) => {
                let rest = self.stack.layer_list(layer).iter().skip(index + 1).copied();
                let lower = std::iter::successors(layer.below(), |l| l.below())
                    .flat_map(|l| self.stack.layer_list(l).iter().copied());
                rest.chain(lower)
                    .find(|&w| w != from && self.focus_candidate(w))
            }
            None => None,
        };
        match next {
            Some(window) => self.focus_client(window),
            None => self.clear_focus(),
        }
    }

    /// Focus the topmost client on the current desktop, if the active one
    /// is no longer on screen.
    pub(crate) fn refocus(&mut self) -> Result<()> {
        if let Some(active) = self.active {
            if self.focus_candidate(active) {
                return Ok(());
            }
        }
        let top = self.stack.top_down().find(|&w| self.focus_candidate(w));
        match top {
            Some(window) => self.focus_client(window),
            None => self.clear_focus(),
        }
    }

    /// Install the colormaps a client asks for.
    ///
    /// WM_COLORMAP_WINDOWS lists windows in priority order, so they are
    /// installed last to first. Without the property the client's own
    /// colormap is installed.
    pub(crate) fn update_colormaps(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        let mut colormaps = Vec::new();
        if client.colormap_windows.is_empty() {
            colormaps.push(client.colormap);
        } else {
            for &w in client.colormap_windows.iter().rev() {
                let colormap = if w == window {
                    Some(client.colormap)
                } else {
                    self.clients.get(w).map(|c| c.colormap)
                };
                colormaps.extend(colormap);
            }
        }
        for colormap in colormaps.into_iter().filter(|&c| c != 0) {
            self.display.install_colormap(colormap)?;
        }
        Ok(())
    }

    /// A window's colormap attribute changed.
    pub(crate) fn handle_colormap_notify(&mut self, window: Window, colormap: u32, new: bool) -> Result<()> {
        if !new {
            return Ok(());
        }
        if let Some(client) = self.clients.get_mut(window) {
            client.colormap = colormap;
        }
        let Some(active) = self.active else {
            return Ok(());
        };
        let affects_active = self
            .clients
            .get(active)
            .is_some_and(|c| c.window == window || c.colormap_windows.contains(&window));
        if affects_active {
            self.update_colormaps(active)?;
        }
        Ok(())
    }
}
