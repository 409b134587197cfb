//! Terminate Module
//!
//! Closing clients politely and killing the ones that do not listen.

use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::wm::client_flags::{BorderFlags, StatusFlags};
use crate::wm::display::{DisplayServer, Window};
use crate::wm::WindowManager;

/// Outstanding WM_DELETE_WINDOW requests
#[derive(Debug, Default)]
pub struct CloseTracker {
    pending: HashMap<Window, Instant>,
}

impl CloseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember when a delete request went out. A repeat request keeps the
    /// first timestamp.
    pub fn record(&mut self, window: Window, now: Instant) {
        self.pending.entry(window).or_insert(now);
    }

    pub fn requested_at(&self, window: Window) -> Option<Instant> {
        self.pending.get(&window).copied()
    }

    pub fn forget(&mut self, window: Window) {
        self.pending.remove(&window);
    }
}

impl<D: DisplayServer> WindowManager<D> {
    /// Ask a client to close.
    ///
    /// Clients speaking WM_DELETE_WINDOW get the message; if one is asked
    /// again after the close timeout without having gone away it is killed.
    /// Clients without the protocol are killed straight away.
    pub fn close_client(&mut self, window: Window, now: Instant) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if !client.state.has_border(BorderFlags::CLOSE) {
            debug!("Client 0x{:x} cannot be closed", window);
            return Ok(());
        }
        if !client.state.test(StatusFlags::DELETE) {
            return self.kill_client(window);
        }

        let overdue = self
            .closing
            .requested_at(window)
            .is_some_and(|at| now.saturating_duration_since(at) >= self.settings.close_timeout);
        if overdue {
            info!("Client 0x{:x} ignored WM_DELETE_WINDOW, killing", window);
            return self.kill_client(window);
        }

        self.display.send_delete_window(window)?;
        self.closing.record(window, now);
        debug!("Sent WM_DELETE_WINDOW to 0x{:x}", window);
        Ok(())
    }

    /// Kill a client's connection, and its process when it published a pid.
    pub fn kill_client(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(window) else {
            return Ok(());
        };
        if let Some(pid) = client.pid.filter(|&p| p > 1 && p != std::process::id()) {
            let spawned = Command::new("kill")
                .args(["-9", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(_) => debug!("Sent SIGKILL to pid {} (0x{:x})", pid, window),
                Err(e) => warn!("Failed to signal pid {}: {}", pid, e),
            }
        }
        self.display.kill_client(window)?;
        self.closing.forget(window);
        info!("Killed client 0x{:x}", window);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::shared::Geometry;
    use crate::wm::display::{ClientInfo, Protocols};
    use crate::wm::testing::{manage_at, new_wm};

    #[test]
    fn test_close_escalates_after_timeout() {
        let mut wm = new_wm();
        let now = Instant::now();
        wm.display_mut().add_window(1, ClientInfo {
            geometry: Geometry::new(0, 0, 100, 100),
            protocols: Protocols {
                delete_window: true,
                ..Protocols::default()
            },
            ..ClientInfo::default()
        });
        wm.manage(1, false, now).unwrap();

        wm.close_client(1, now).unwrap();
        wm.close_client(1, now + Duration::from_secs(1)).unwrap();
        assert_eq!(wm.display().delete_sent, vec![1, 1]);
        assert!(wm.display().killed.is_empty());

        wm.close_client(1, now + Duration::from_secs(4)).unwrap();
        assert_eq!(wm.display().killed, vec![1]);
    }

    #[test]
    fn test_close_without_protocol_kills() {
        let mut wm = new_wm();
        let now = Instant::now();
        manage_at(&mut wm, 2, Geometry::new(0, 0, 100, 100), now);
        wm.close_client(2, now).unwrap();
        assert!(wm.display().delete_sent.is_empty());
        assert_eq!(wm.display().killed, vec![2]);
    }

    #[test]
    fn test_tracker_keeps_first_request() {
        let mut tracker = CloseTracker::new();
        let now = Instant::now();
        tracker.record(3, now);
        tracker.record(3, now + Duration::from_secs(2));
        assert_eq!(tracker.requested_at(3), Some(now));
        tracker.forget(3);
        assert_eq!(tracker.requested_at(3), None);
    }
}
