//! Struts
//!
//! Screen-edge rectangles reserved by panels and docks. Placement and
//! maximize subtract them from the free area.

use crate::shared::Geometry;
use crate::wm::display::Window;

/// One reserved rectangle and the client that contributed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strut {
    pub owner: Window,
    pub rect: Geometry,
}

/// Global strut list
#[derive(Debug, Default)]
pub struct StrutList {
    struts: Vec<Strut>,
}

impl StrutList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything `owner` contributes. Returns true if the list changed.
    pub fn set_for(&mut self, owner: Window, rects: &[Geometry]) -> bool {
        let old: Vec<Geometry> = self
            .struts
            .iter()
            .filter(|s| s.owner == owner)
            .map(|s| s.rect)
            .collect();
        if old == rects {
            return false;
        }
        self.struts.retain(|s| s.owner != owner);
        self.struts
            .extend(rects.iter().filter(|r| !r.is_empty()).map(|&rect| Strut { owner, rect }));
        true
    }

    /// Drop everything contributed by `owner`. Returns true if anything was removed.
    pub fn remove_owner(&mut self, owner: Window) -> bool {
        let before = self.struts.len();
        self.struts.retain(|s| s.owner != owner);
        before != self.struts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Strut> {
        self.struts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.struts.is_empty()
    }
}

/// Convert a `_NET_WM_STRUT_PARTIAL` (12 values) or `_NET_WM_STRUT`
/// (4 values) property into root-relative rectangles.
pub fn rects_from_hint(values: &[u32], root_width: i32, root_height: i32) -> Vec<Geometry> {
    if values.len() < 4 {
        return Vec::new();
    }
    let v = |i: usize| values.get(i).map(|&x| x as i32);
    let (left, right, top, bottom) = (values[0] as i32, values[1] as i32, values[2] as i32, values[3] as i32);

    // Legacy struts span the whole edge.
    let span = |start: usize, full: i32| -> (i32, i32) {
        match (v(start), v(start + 1)) {
            (Some(s), Some(e)) if e >= s => (s, e - s + 1),
            _ => (0, full),
        }
    };

    let mut rects = Vec::new();
    if left > 0 {
        let (y, h) = span(4, root_height);
        rects.push(Geometry::new(0, y, left, h));
    }
    if right > 0 {
        let (y, h) = span(6, root_height);
        rects.push(Geometry::new(root_width - right, y, right, h));
    }
    if top > 0 {
        let (x, w) = span(8, root_width);
        rects.push(Geometry::new(x, 0, w, top));
    }
    if bottom > 0 {
        let (x, w) = span(10, root_width);
        rects.push(Geometry::new(x, root_height - bottom, w, bottom));
    }
    rects
}
