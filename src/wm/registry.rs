//! Client Registry
//!
//! Owns every managed client, indexed by client window and by frame window.

use std::collections::HashMap;

use crate::wm::client::Client;
use crate::wm::display::Window;

/// All managed clients
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<Window, Client>,
    /// frame -> client window
    frames: HashMap<Window, Window>,
    /// Management order (oldest first), used for _NET_CLIENT_LIST
    order: Vec<Window>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: Client) {
        let window = client.window;
        if let Some(frame) = client.frame {
            self.frames.insert(frame, window);
        }
        if self.clients.insert(window, client).is_none() {
            self.order.push(window);
        }
    }

    pub fn remove(&mut self, window: Window) -> Option<Client> {
        let client = self.clients.remove(&window)?;
        if let Some(frame) = client.frame {
            self.frames.remove(&frame);
        }
        self.order.retain(|&w| w != window);
        Some(client)
    }

    /// Record the frame created for a client.
    pub fn set_frame(&mut self, window: Window, frame: Option<Window>) {
        if let Some(client) = self.clients.get_mut(&window) {
            if let Some(old) = client.frame.take() {
                self.frames.remove(&old);
            }
            client.frame = frame;
            if let Some(frame) = frame {
                self.frames.insert(frame, window);
            }
        }
    }

    pub fn get(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn get_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    pub fn contains(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    /// Resolve either a client window or a frame window to the client window.
    pub fn resolve(&self, window: Window) -> Option<Window> {
        if self.clients.contains_key(&window) {
            Some(window)
        } else {
            self.frames.get(&window).copied()
        }
    }

    pub fn find_by_frame(&self, frame: Window) -> Option<&Client> {
        self.frames.get(&frame).and_then(|w| self.clients.get(w))
    }

    pub fn is_frame(&self, window: Window) -> bool {
        self.frames.contains_key(&window)
    }

    /// Client windows in management order
    pub fn windows(&self) -> &[Window] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.order.iter().filter_map(|w| self.clients.get(w))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;

    #[test]
    fn test_lookup_by_frame() {
        let mut registry = ClientRegistry::new();
        registry.insert(Client::new(10, Geometry::new(0, 0, 10, 10)));
        registry.set_frame(10, Some(99));

        assert_eq!(registry.resolve(99), Some(10));
        assert_eq!(registry.resolve(10), Some(10));
        assert!(registry.is_frame(99));

        registry.remove(10);
        assert_eq!(registry.resolve(99), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_order_is_management_order() {
        let mut registry = ClientRegistry::new();
        for w in [3, 1, 2] {
            registry.insert(Client::new(w, Geometry::default()));
        }
        registry.remove(1);
        assert_eq!(registry.windows(), &[3, 2]);
    }
}
