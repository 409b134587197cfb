//! Stacking Module
//!
//! Manages window z-order in four independent layers. Within a layer the
//! front of the sequence is the topmost window; the global order is the
//! layers walked from `Above` down to `Desktop`.

use std::collections::HashSet;

use tracing::debug;

use crate::wm::client_flags::Layer;
use crate::wm::display::Window;
use crate::wm::registry::ClientRegistry;

/// Side of an anchor window for relative insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relative {
    /// Directly above the anchor
    Before,
    /// Directly below the anchor
    After,
}

/// Per-layer stacking sequences
#[derive(Debug, Default)]
pub struct LayeredStack {
    layers: [Vec<Window>; Layer::COUNT],
}

impl LayeredStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a window on top of its layer.
    pub fn insert_front(&mut self, window: Window, layer: Layer) {
        self.remove(window);
        self.layers[layer.index()].insert(0, window);
    }

    /// Put a window at the bottom of its layer.
    pub fn insert_back(&mut self, window: Window, layer: Layer) {
        self.remove(window);
        self.layers[layer.index()].push(window);
    }

    /// Place a window next to `anchor`, in the anchor's layer.
    ///
    /// Returns the layer used, or `None` when the anchor is not stacked.
    pub fn insert_relative(
        &mut self,
        window: Window,
        anchor: Window,
        relative: Relative,
    ) -> Option<Layer> {
        if window == anchor {
            return self.layer_of(window);
        }
        let (layer, _) = self.position(anchor)?;
        self.remove(window);
        let list = &mut self.layers[layer.index()];
        let index = list.iter().position(|&w| w == anchor)?;
        match relative {
            Relative::Before => list.insert(index, window),
            Relative::After => list.insert(index + 1, window),
        }
        Some(layer)
    }

    /// Remove a window from whichever layer holds it.
    pub fn remove(&mut self, window: Window) -> Option<Layer> {
        let (layer, index) = self.position(window)?;
        self.layers[layer.index()].remove(index);
        Some(layer)
    }

    /// Move a window and its transients to the front of `layer`.
    ///
    /// Returns the windows that moved; the caller updates their layer
    /// field and resyncs hints.
    pub fn change_layer(
        &mut self,
        window: Window,
        layer: Layer,
        registry: &ClientRegistry,
    ) -> Vec<Window> {
        let Some(old) = self.layer_of(window) else {
            return Vec::new();
        };
        if old == layer {
            return Vec::new();
        }
        let moved: Vec<Window> = self.layers[old.index()]
            .iter()
            .copied()
            .filter(|&w| {
                w == window || registry.get(w).is_some_and(|c| c.is_owned_by(window))
            })
            .collect();
        for &w in moved.iter().rev() {
            self.insert_front(w, layer);
        }
        debug!("Moved {:?} from layer {:?} to {:?}", moved, old, layer);
        moved
    }

    /// Windows of one layer, topmost first
    pub fn layer_list(&self, layer: Layer) -> &[Window] {
        &self.layers[layer.index()]
    }

    pub fn layer_of(&self, window: Window) -> Option<Layer> {
        self.position(window).map(|(layer, _)| layer)
    }

    /// Layer and index within the layer
    pub fn position(&self, window: Window) -> Option<(Layer, usize)> {
        Layer::TOP_DOWN.iter().find_map(|&layer| {
            self.layers[layer.index()]
                .iter()
                .position(|&w| w == window)
                .map(|i| (layer, i))
        })
    }

    pub fn contains(&self, window: Window) -> bool {
        self.position(window).is_some()
    }

    /// Every stacked window, topmost first
    pub fn top_down(&self) -> impl Iterator<Item = Window> + '_ {
        Layer::TOP_DOWN
            .iter()
            .flat_map(move |layer| self.layers[layer.index()].iter().copied())
    }

    /// Total number of stacked windows
    pub fn len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transients owned by `owner`, in global stacking order
    pub fn children_of(&self, owner: Window, registry: &ClientRegistry) -> Vec<Window> {
        self.top_down()
            .filter(|&w| registry.get(w).is_some_and(|c| c.is_owned_by(owner)))
            .collect()
    }

    /// Every transient below `owner` in the ownership tree, deepest first.
    ///
    /// Owner cycles are cut at the first repeated window.
    pub fn transients_of(&self, owner: Window, registry: &ClientRegistry) -> Vec<Window> {
        let mut seen = HashSet::from([owner]);
        let mut found = Vec::new();
        self.collect_transients(owner, registry, &mut seen, &mut found);
        found
    }

    fn collect_transients(
        &self,
        owner: Window,
        registry: &ClientRegistry,
        seen: &mut HashSet<Window>,
        found: &mut Vec<Window>,
    ) {
        for child in self.children_of(owner, registry) {
            if seen.insert(child) {
                self.collect_transients(child, registry, seen, found);
                found.push(child);
            }
        }
    }

    /// Clients visible on `desktop`, topmost first. With `mapped_only`
    /// minimized and hidden clients are skipped.
    pub fn clients_on_desktop(
        &self,
        registry: &ClientRegistry,
        desktop: u32,
        mapped_only: bool,
    ) -> Vec<Window> {
        self.top_down()
            .filter(|&w| {
                registry.get(w).is_some_and(|c| {
                    c.state.is_on_desktop(desktop) && (!mapped_only || c.state.is_visible())
                })
            })
            .collect()
    }

    /// Bring a window to the front of its layer, with its transients above it.
    ///
    /// Returns false when the window was already on top.
    pub fn raise(&mut self, window: Window, registry: &ClientRegistry) -> bool {
        let Some((layer, index)) = self.position(window) else {
            return false;
        };
        let children = self.children_of(window, registry);
        if index == 0 && children.is_empty() {
            return false;
        }
        self.insert_front(window, layer);
        for &child in &children {
            if self.layer_of(child) == Some(layer) {
                self.insert_relative(child, window, Relative::Before);
            }
        }
        for &child in children.iter().rev() {
            match self.layer_of(child) {
                Some(child_layer) if child_layer != layer => self.insert_front(child, child_layer),
                _ => {}
            }
        }
        true
    }

    /// Send a window to the back of its layer.
    pub fn lower(&mut self, window: Window) -> bool {
        let Some((layer, index)) = self.position(window) else {
            return false;
        };
        if index + 1 == self.layers[layer.index()].len() {
            return false;
        }
        self.insert_back(window, layer);
        true
    }

    /// Outer windows to hand to the server, topmost first.
    ///
    /// Only clients on screen are listed. When the active client is
    /// fullscreen, its transients and then the client itself lead the list.
    pub fn restack_order(&self, registry: &ClientRegistry, active: Option<Window>) -> Vec<Window> {
        let mut order = Vec::with_capacity(self.len());

        let fullscreen = active
            .and_then(|w| registry.get(w))
            .filter(|c| c.state.is_fullscreen());

        if let Some(fs) = fullscreen {
            for w in self.top_down() {
                if let Some(child) = registry
                    .get(w)
                    .filter(|c| c.is_owned_by(fs.window) && c.state.is_visible())
                {
                    order.push(child.outer_window());
                }
            }
            order.push(fs.outer_window());
        }

        for window in self.top_down() {
            let Some(client) = registry.get(window) else {
                continue;
            };
            if !client.state.is_visible() {
                continue;
            }
            if let Some(fs) = fullscreen {
                if client.window == fs.window || client.is_owned_by(fs.window) {
                    continue;
                }
            }
            order.push(client.outer_window());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::client::Client;
    use crate::wm::client_flags::StatusFlags;

    fn mapped(window: Window, layer: Layer) -> Client {
        let mut client = Client::new(window, Geometry::new(0, 0, 10, 10));
        client.state.set(StatusFlags::MAPPED);
        client.state.layer = layer;
        client
    }

    fn setup(clients: Vec<Client>) -> (ClientRegistry, LayeredStack) {
        let mut registry = ClientRegistry::new();
        let mut stack = LayeredStack::new();
        for client in clients {
            stack.insert_back(client.window, client.state.layer);
            registry.insert(client);
        }
        (registry, stack)
    }

    #[test]
    fn test_each_window_in_one_layer() {
        let mut stack = LayeredStack::new();
        stack.insert_front(1, Layer::Normal);
        stack.insert_front(1, Layer::Above);
        stack.insert_back(1, Layer::Below);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.layer_of(1), Some(Layer::Below));
    }

    #[test]
    fn test_insert_relative() {
        let mut stack = LayeredStack::new();
        stack.insert_back(1, Layer::Normal);
        stack.insert_back(2, Layer::Normal);
        assert_eq!(stack.insert_relative(3, 2, Relative::Before), Some(Layer::Normal));
        assert_eq!(stack.layer_list(Layer::Normal), &[1, 3, 2]);
        stack.insert_relative(1, 2, Relative::After);
        assert_eq!(stack.layer_list(Layer::Normal), &[3, 2, 1]);
        assert_eq!(stack.insert_relative(4, 42, Relative::After), None);
    }

    #[test]
    fn test_restack_order_walks_layers_top_down() {
        let (registry, stack) = setup(vec![
            mapped(1, Layer::Normal),
            mapped(2, Layer::Above),
            mapped(3, Layer::Desktop),
            mapped(4, Layer::Normal),
        ]);
        assert_eq!(stack.restack_order(&registry, None), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_restack_skips_hidden_and_uses_frames() {
        let mut hidden = mapped(2, Layer::Normal);
        hidden.state.set(StatusFlags::HIDDEN);
        let mut framed = mapped(3, Layer::Normal);
        framed.frame = Some(30);
        let (registry, stack) = setup(vec![mapped(1, Layer::Normal), hidden, framed]);
        assert_eq!(stack.restack_order(&registry, None), vec![1, 30]);
    }

    #[test]
    fn test_active_fullscreen_goes_first_with_transients() {
        let mut fs = mapped(2, Layer::Normal);
        fs.state.enter_fullscreen();
        let mut dialog = mapped(3, Layer::Normal);
        dialog.owner = Some(2);
        let (registry, stack) = setup(vec![
            mapped(1, Layer::Above),
            mapped(4, Layer::Normal),
            fs,
            dialog,
        ]);
        assert_eq!(stack.restack_order(&registry, Some(2)), vec![3, 2, 1, 4]);
        assert_eq!(stack.restack_order(&registry, Some(4)), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_fullscreen_leads_with_transients_of_any_layer() {
        let mut fs = mapped(2, Layer::Normal);
        fs.state.enter_fullscreen();
        let mut above = mapped(3, Layer::Above);
        above.owner = Some(2);
        let mut minimized = mapped(5, Layer::Normal);
        minimized.owner = Some(2);
        minimized.state.clear(StatusFlags::MAPPED);
        minimized.state.set(StatusFlags::MINIMIZED);
        let (registry, stack) = setup(vec![
            mapped(1, Layer::Above),
            above,
            fs,
            minimized,
            mapped(4, Layer::Normal),
        ]);
        assert_eq!(stack.restack_order(&registry, Some(2)), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_transients_of_follows_chains() {
        let mut dialog = mapped(2, Layer::Normal);
        dialog.owner = Some(1);
        let mut nested = mapped(3, Layer::Normal);
        nested.owner = Some(2);
        let mut other = mapped(4, Layer::Normal);
        other.owner = Some(1);
        let (registry, stack) = setup(vec![mapped(1, Layer::Normal), dialog, nested, other]);
        assert_eq!(stack.transients_of(1, &registry), vec![3, 2, 4]);
        assert_eq!(stack.transients_of(2, &registry), vec![3]);
        assert!(stack.transients_of(3, &registry).is_empty());
    }

    #[test]
    fn test_transients_of_survives_owner_cycle() {
        let mut a = mapped(1, Layer::Normal);
        a.owner = Some(2);
        let mut b = mapped(2, Layer::Normal);
        b.owner = Some(1);
        let (registry, stack) = setup(vec![a, b]);
        assert_eq!(stack.transients_of(1, &registry), vec![2]);
    }

    #[test]
    fn test_raise_keeps_transients_above_owner() {
        let mut dialog = mapped(3, Layer::Normal);
        dialog.owner = Some(2);
        let (registry, mut stack) = setup(vec![mapped(1, Layer::Normal), mapped(2, Layer::Normal), dialog]);
        assert!(stack.raise(2, &registry));
        assert_eq!(stack.layer_list(Layer::Normal), &[3, 2, 1]);
    }

    #[test]
    fn test_change_layer_moves_transients() {
        let mut dialog = mapped(3, Layer::Normal);
        dialog.owner = Some(2);
        let (registry, mut stack) = setup(vec![mapped(1, Layer::Normal), mapped(2, Layer::Normal), dialog]);
        let moved = stack.change_layer(2, Layer::Above, &registry);
        assert_eq!(moved, vec![2, 3]);
        assert_eq!(stack.layer_list(Layer::Above), &[2, 3]);
        assert_eq!(stack.layer_list(Layer::Normal), &[1]);
    }

    #[test]
    fn test_lower() {
        let (_, mut stack) = setup(vec![mapped(1, Layer::Normal), mapped(2, Layer::Normal)]);
        assert!(stack.lower(1));
        assert!(!stack.lower(1));
        assert_eq!(stack.layer_list(Layer::Normal), &[2, 1]);
    }
}
