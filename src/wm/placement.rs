//! Placement Module
//!
//! Window placement and geometry algorithms: free-area computation around
//! struts, cascade, center, least-overlap tiling, size/position constraints
//! and maximize/fullscreen targets. Everything here is a pure function of its
//! inputs; the window manager gathers the inputs and applies the results.

use std::collections::HashMap;

use tracing::debug;

use crate::shared::{BorderSize, Geometry, Gravity};
use crate::wm::client::SizeHints;
use crate::wm::client_flags::MaxFlags;

/// Initial placement strategy for windows without a usable position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementPolicy {
    /// Diagonal cascade per monitor and desktop
    #[default]
    Cascade,
    /// Center placement
    Center,
    /// Least-overlap tiling, falling back to cascade
    Tile,
}

/// Shrink `dest` so that it no longer overlaps `src`.
///
/// Four candidates are considered: trimming the left side, the top, the
/// width or the height of `dest`. The one leaving the largest area wins;
/// ties prefer the earlier candidate in that order. Non-overlapping
/// rectangles leave `dest` untouched.
pub fn subtract_bounds(src: &Geometry, dest: &Geometry) -> Geometry {
    if !src.intersects(dest) {
        return *dest;
    }

    let trim_left = Geometry {
        x: src.right(),
        width: dest.right() - src.right(),
        ..*dest
    };
    let trim_top = Geometry {
        y: src.bottom(),
        height: dest.bottom() - src.bottom(),
        ..*dest
    };
    let trim_width = Geometry {
        width: src.x - dest.x,
        ..*dest
    };
    let trim_height = Geometry {
        height: src.y - dest.y,
        ..*dest
    };

    [trim_left, trim_top, trim_width, trim_height]
        .into_iter()
        .fold(None::<Geometry>, |best, candidate| match best {
            Some(b) if b.area() >= candidate.area() => Some(b),
            _ => Some(candidate),
        })
        .unwrap_or(*dest)
}

/// Subtract every exclusion from `bounds`.
///
/// When an exclusion would consume the box entirely the last usable box
/// is returned and the remaining exclusions are skipped.
pub fn subtract_all(bounds: &Geometry, exclusions: &[Geometry]) -> Geometry {
    let mut free = *bounds;
    for exclusion in exclusions {
        let next = subtract_bounds(exclusion, &free);
        if next.area() <= 0 {
            debug!("Exclusion {:?} consumes the free box, keeping {:?}", exclusion, free);
            break;
        }
        free = next;
    }
    free
}

/// Client position adjusted for window gravity.
///
/// With `negate` false the decoration offset is removed (client request to
/// frame placement); with `negate` true it is added back (reparenting to
/// the root on release).
pub fn gravitate(geometry: &Geometry, gravity: Gravity, border: &BorderSize, negate: bool) -> Geometry {
    let (dx, dy) = gravity.delta(border);
    let mut g = *geometry;
    if negate {
        g.x += dx;
        g.y += dy;
    } else {
        g.x -= dx;
        g.y -= dy;
    }
    g
}

/// Running cascade offsets, one per (monitor, desktop)
#[derive(Debug, Default)]
pub struct CascadeTable {
    offsets: HashMap<(usize, u32), i32>,
}

impl CascadeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a client diagonally below the previous cascade point.
    ///
    /// On overflow the offset restarts and the client goes to the box origin.
    pub fn place(
        &mut self,
        monitor: usize,
        desktop: u32,
        free: &Geometry,
        geometry: &Geometry,
        border: &BorderSize,
        step: i32,
    ) -> Geometry {
        let offset = self.offsets.entry((monitor, desktop)).or_insert(0);

        let mut g = *geometry;
        g.x = free.x + border.west + *offset;
        g.y = free.y + border.north + *offset;
        *offset += step;

        let overflows = |g: &Geometry| {
            g.right() + border.east > free.right() || g.bottom() + border.south > free.bottom()
        };

        if overflows(&g) {
            *offset = step;
            g.x = free.x + border.west;
            g.y = free.y + border.north;
        }
        g
    }

    /// Forget offsets (monitor layout changed)
    pub fn reset(&mut self) {
        self.offsets.clear();
    }
}

/// Center a client inside the free box.
pub fn center(free: &Geometry, geometry: &Geometry) -> Geometry {
    Geometry {
        x: free.x + free.width / 2 - geometry.width / 2,
        y: free.y + free.height / 2 - geometry.height / 2,
        ..*geometry
    }
}

/// Least-overlap tiling.
///
/// Candidate frame origins come from the edges of every other frame and the
/// free box corners. Each (x, y) pair is tried in sorted order and the first
/// one with minimal total overlap wins. Returns the client position, or
/// `None` when no candidate fits inside the free box.
pub fn tile(
    free: &Geometry,
    geometry: &Geometry,
    border: &BorderSize,
    others: &[Geometry],
) -> Option<(i32, i32)> {
    let frame_width = geometry.width + border.horizontal();
    let frame_height = geometry.height + border.vertical();

    let mut xs = Vec::with_capacity(others.len() * 2 + 2);
    let mut ys = Vec::with_capacity(others.len() * 2 + 2);
    xs.push(free.x);
    ys.push(free.y);
    for other in others {
        xs.extend([other.x, other.right()]);
        ys.extend([other.y, other.bottom()]);
    }
    xs.push(free.right() - frame_width);
    ys.push(free.bottom() - frame_height);
    xs.sort_unstable();
    xs.dedup();
    ys.sort_unstable();
    ys.dedup();

    let try_at = |x: i32, y: i32| -> Option<i64> {
        let trial = Geometry::new(x, y, frame_width, frame_height);
        if trial.x < free.x
            || trial.right() > free.right()
            || trial.y < free.y
            || trial.bottom() > free.bottom()
        {
            return None;
        }
        Some(others.iter().map(|o| trial.overlap_area(o)).sum())
    };

    let mut best: Option<(i64, i32, i32)> = None;
    'search: for &x in &xs {
        for &y in &ys {
            if let Some(overlap) = try_at(x, y) {
                if best.map_or(true, |(least, _, _)| overlap < least) {
                    best = Some((overlap, x, y));
                    if overlap == 0 {
                        break 'search;
                    }
                }
            }
        }
    }

    best.map(|(overlap, x, y)| {
        debug!("Tiled at ({}, {}) with overlap {}", x, y, overlap);
        (x + border.west, y + border.north)
    })
}

/// Apply the aspect ratio bounds, shrinking one side.
fn apply_aspect(hints: &SizeHints, width: i32, height: i32) -> (i32, i32) {
    let Some(aspect) = hints.aspect else {
        return (width, height);
    };
    let (mut width, mut height) = (width, height);
    let ratio = width as f32 / height.max(1) as f32;
    let min_ratio = aspect.min_ratio();
    if min_ratio > 0.0 && ratio < min_ratio {
        height = (width as f32 / min_ratio) as i32;
    }
    let max_ratio = aspect.max_ratio();
    if max_ratio > 0.0 && ratio > max_ratio {
        width = (height as f32 * max_ratio) as i32;
    }
    (width.max(1), height.max(1))
}

/// Fit a client's size into its monitor's free box and its own limits.
///
/// A dimension that had to shrink to fit is rounded down to the resize
/// increment and its position moves to the box edge.
pub fn constrain_size(
    geometry: &Geometry,
    hints: &SizeHints,
    border: &BorderSize,
    free: &Geometry,
) -> Geometry {
    let mut g = *geometry;
    g.width = g.width.min(hints.max_width);
    g.height = g.height.min(hints.max_height);

    if g.width + border.horizontal() > free.width {
        let available = (free.width - border.horizontal()).min(hints.max_width).min(g.width);
        g.x = free.x + border.west;
        g.width = hints.snap_width(available);
    }
    if g.height + border.vertical() > free.height {
        let available = (free.height - border.vertical()).min(hints.max_height).min(g.height);
        g.y = free.y + border.north;
        g.height = hints.snap_height(available);
    }

    g.width = g.width.max(hints.min_width).max(1);
    g.height = g.height.max(hints.min_height).max(1);

    let (width, height) = apply_aspect(hints, g.width, g.height);
    g.width = width;
    g.height = height;
    g
}

/// Move a client so its frame stays inside the free box.
pub fn constrain_position(geometry: &Geometry, border: &BorderSize, free: &Geometry) -> Geometry {
    let mut g = *geometry;
    if g.right() + border.east > free.right() {
        g.x = free.right() - g.width - border.east;
    }
    if g.bottom() + border.south > free.bottom() {
        g.y = free.bottom() - g.height - border.south;
    }
    if g.x - border.west < free.x {
        g.x = free.x + border.west;
    }
    if g.y - border.north < free.y {
        g.y = free.y + border.north;
    }
    g
}

/// Geometry for a maximize mode inside the free box.
///
/// Axes not named in `flags` keep their current extent. Sizes are clipped
/// to the client's maximum and aspect bounds and, unless
/// `ignore_increments`, rounded down to the resize increment.
pub fn maximized_geometry(
    geometry: &Geometry,
    hints: &SizeHints,
    border: &BorderSize,
    free: &Geometry,
    flags: MaxFlags,
    ignore_increments: bool,
) -> Geometry {
    let flags = flags.normalized();
    let mut g = *geometry;

    // Outer (frame) span along each axis
    let (frame_x, frame_w) = if flags.contains(MaxFlags::HORIZ) {
        (free.x, free.width)
    } else if flags.contains(MaxFlags::LEFT) {
        (free.x, free.width / 2)
    } else if flags.contains(MaxFlags::RIGHT) {
        (free.x + free.width / 2, free.width - free.width / 2)
    } else {
        (g.x - border.west, g.width + border.horizontal())
    };
    let (frame_y, frame_h) = if flags.contains(MaxFlags::VERT) {
        (free.y, free.height)
    } else if flags.contains(MaxFlags::TOP) {
        (free.y, free.height / 2)
    } else if flags.contains(MaxFlags::BOTTOM) {
        (free.y + free.height / 2, free.height - free.height / 2)
    } else {
        (g.y - border.north, g.height + border.vertical())
    };

    let mut width = frame_w - border.horizontal();
    let mut height = frame_h - border.vertical();
    if flags.horizontal() {
        width = width.min(hints.max_width);
    }
    if flags.vertical() {
        height = height.min(hints.max_height);
    }
    let (w, h) = apply_aspect(hints, width, height);
    width = w;
    height = h;

    if !ignore_increments {
        if flags.horizontal() {
            width = hints.snap_width(width);
        }
        if flags.vertical() {
            height = hints.snap_height(height);
        }
    }

    // Snapping may round below the client's minimum
    if flags.horizontal() {
        g.x = frame_x + border.west;
        g.width = width.max(hints.min_width).max(1);
    }
    if flags.vertical() {
        g.y = frame_y + border.north;
        g.height = height.max(hints.min_height).max(1);
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client::Aspect;

    #[test]
    fn test_subtract_non_overlapping_is_noop() {
        let dest = Geometry::new(0, 0, 100, 100);
        let src = Geometry::new(200, 200, 10, 10);
        assert_eq!(subtract_bounds(&src, &dest), dest);
    }

    #[test]
    fn test_subtract_top_panel() {
        let dest = Geometry::new(0, 0, 1000, 800);
        let panel = Geometry::new(0, 0, 1000, 30);
        assert_eq!(subtract_bounds(&panel, &dest), Geometry::new(0, 30, 1000, 770));
    }

    #[test]
    fn test_subtract_picks_largest_candidate() {
        let dest = Geometry::new(0, 0, 1000, 800);
        // Right-hand dock: trimming the width keeps the most area.
        let dock = Geometry::new(950, 100, 50, 600);
        let result = subtract_bounds(&dock, &dest);
        assert_eq!(result, Geometry::new(0, 0, 950, 800));

        let candidates = [
            Geometry::new(1000, 0, 0, 800),
            Geometry::new(0, 700, 1000, 100),
            Geometry::new(0, 0, 950, 800),
            Geometry::new(0, 0, 1000, 100),
        ];
        let best = candidates.iter().map(Geometry::area).max().unwrap_or(0);
        assert_eq!(result.area(), best);
    }

    #[test]
    fn test_subtract_all_keeps_last_usable_box() {
        let bounds = Geometry::new(0, 0, 100, 100);
        let everything = Geometry::new(-10, -10, 200, 200);
        let top = Geometry::new(0, 0, 100, 10);
        assert_eq!(
            subtract_all(&bounds, &[top, everything]),
            Geometry::new(0, 10, 100, 90)
        );
    }

    #[test]
    fn test_tile_on_empty_desktop_uses_origin() {
        let free = Geometry::new(40, 30, 1000, 800);
        let g = Geometry::new(0, 0, 300, 200);
        assert_eq!(tile(&free, &g, &BorderSize::NONE, &[]), Some((40, 30)));

        let border = BorderSize::new(20, 2, 2, 2);
        assert_eq!(tile(&free, &g, &border, &[]), Some((42, 50)));
    }

    #[test]
    fn test_tile_avoids_existing_client() {
        let free = Geometry::new(0, 0, 1000, 800);
        let existing = Geometry::new(100, 100, 200, 200);
        let g = Geometry::new(0, 0, 150, 150);
        let (x, y) = tile(&free, &g, &BorderSize::NONE, &[existing]).unwrap_or((100, 100));
        assert_ne!((x, y), (100, 100));
        assert_eq!(Geometry::new(x, y, 150, 150).overlap_area(&existing), 0);
    }

    #[test]
    fn test_tile_fails_when_nothing_fits() {
        let free = Geometry::new(0, 0, 100, 100);
        let g = Geometry::new(0, 0, 150, 50);
        assert_eq!(tile(&free, &g, &BorderSize::NONE, &[]), None);
    }

    #[test]
    fn test_cascade_steps_and_wraps() {
        let mut table = CascadeTable::new();
        let free = Geometry::new(0, 0, 400, 400);
        let g = Geometry::new(0, 0, 200, 200);
        let border = BorderSize::new(20, 2, 2, 2);

        let first = table.place(0, 0, &free, &g, &border, 22);
        assert_eq!((first.x, first.y), (2, 20));
        let second = table.place(0, 0, &free, &g, &border, 22);
        assert_eq!((second.x, second.y), (24, 42));

        // Other desktops cascade independently.
        let other = table.place(0, 1, &free, &g, &border, 22);
        assert_eq!((other.x, other.y), (2, 20));

        let mut last = second;
        for _ in 0..20 {
            last = table.place(0, 0, &free, &g, &border, 22);
            assert!(last.right() + border.east <= free.right());
            assert!(last.bottom() + border.south <= free.bottom());
        }
        assert!(last.x >= 2);
    }

    #[test]
    fn test_center() {
        let free = Geometry::new(0, 20, 1000, 780);
        let g = center(&free, &Geometry::new(0, 0, 200, 100));
        assert_eq!((g.x, g.y), (400, 360));
    }

    #[test]
    fn test_constrain_size_snaps_to_increment() {
        let hints = SizeHints {
            width_inc: 7,
            height_inc: 13,
            ..SizeHints::default()
        };
        let free = Geometry::new(0, 0, 500, 400);
        let g = constrain_size(&Geometry::new(50, 50, 800, 300), &hints, &BorderSize::NONE, &free);
        assert_eq!(g.x, 0);
        assert_eq!(g.width, 497);
        assert_eq!(g.height, 300);
    }

    #[test]
    fn test_constrain_size_honours_minimum() {
        let hints = SizeHints {
            min_width: 600,
            ..SizeHints::default()
        };
        let free = Geometry::new(0, 0, 500, 400);
        let g = constrain_size(&Geometry::new(0, 0, 100, 100), &hints, &BorderSize::NONE, &free);
        assert_eq!(g.width, 600);
    }

    #[test]
    fn test_constrain_position_keeps_frame_inside() {
        let border = BorderSize::new(20, 2, 2, 2);
        let free = Geometry::new(0, 0, 1000, 800);
        let g = constrain_position(&Geometry::new(900, -50, 200, 100), &border, &free);
        assert_eq!(g, Geometry::new(798, 20, 200, 100));
    }

    #[test]
    fn test_maximize_respects_max_size() {
        let hints = SizeHints {
            min_width: 300,
            min_height: 300,
            max_width: 300,
            max_height: 300,
            ..SizeHints::default()
        };
        let free = Geometry::new(0, 0, 3840, 2160);
        let g = maximized_geometry(
            &Geometry::new(10, 10, 300, 300),
            &hints,
            &BorderSize::NONE,
            &free,
            MaxFlags::HORIZ | MaxFlags::VERT,
            false,
        );
        assert!(g.width <= 300 && g.height <= 300);
    }

    #[test]
    fn test_maximize_halves_and_single_axis() {
        let hints = SizeHints::default();
        let border = BorderSize::new(10, 0, 0, 0);
        let free = Geometry::new(0, 0, 1000, 800);
        let current = Geometry::new(100, 110, 200, 100);

        let left = maximized_geometry(&current, &hints, &border, &free, MaxFlags::LEFT | MaxFlags::VERT, false);
        assert_eq!(left, Geometry::new(0, 10, 500, 790));

        let right = maximized_geometry(&current, &hints, &border, &free, MaxFlags::RIGHT, false);
        assert_eq!(right, Geometry::new(500, 110, 500, 100));

        let bottom = maximized_geometry(&current, &hints, &border, &free, MaxFlags::BOTTOM, false);
        assert_eq!((bottom.y, bottom.height), (410, 390));
    }

    #[test]
    fn test_maximize_increment_opt_out() {
        let hints = SizeHints {
            width_inc: 9,
            ..SizeHints::default()
        };
        let free = Geometry::new(0, 0, 1000, 800);
        let current = Geometry::new(0, 0, 90, 90);
        let snapped = maximized_geometry(&current, &hints, &BorderSize::NONE, &free, MaxFlags::HORIZ, false);
        assert_eq!(snapped.width, 999);
        let free_wide = Geometry::new(0, 0, 1004, 800);
        let snapped = maximized_geometry(&current, &hints, &BorderSize::NONE, &free_wide, MaxFlags::HORIZ, false);
        assert_eq!(snapped.width, 999);
        let exact = maximized_geometry(&current, &hints, &BorderSize::NONE, &free_wide, MaxFlags::HORIZ, true);
        assert_eq!(exact.width, 1004);
    }

    #[test]
    fn test_maximize_keeps_min_size_after_snapping() {
        let hints = SizeHints {
            min_width: 120,
            min_height: 70,
            width_inc: 50,
            height_inc: 50,
            ..SizeHints::default()
        };
        let free = Geometry::new(0, 0, 140, 90);
        let g = maximized_geometry(
            &Geometry::new(0, 0, 120, 70),
            &hints,
            &BorderSize::NONE,
            &free,
            MaxFlags::HORIZ | MaxFlags::VERT,
            false,
        );
        assert_eq!(g, Geometry::new(0, 0, 120, 70));
    }

    #[test]
    fn test_maximize_aspect_clamp() {
        let hints = SizeHints {
            aspect: Some(Aspect { min_x: 1, min_y: 1, max_x: 1, max_y: 1 }),
            ..SizeHints::default()
        };
        let free = Geometry::new(0, 0, 1000, 800);
        let g = maximized_geometry(
            &Geometry::new(0, 0, 100, 100),
            &hints,
            &BorderSize::NONE,
            &free,
            MaxFlags::HORIZ | MaxFlags::VERT,
            true,
        );
        assert_eq!((g.width, g.height), (800, 800));
    }

    #[test]
    fn test_gravitate_round_trip() {
        let border = BorderSize::new(20, 2, 2, 2);
        let g = Geometry::new(100, 100, 50, 50);
        let placed = gravitate(&g, Gravity::SouthEast, &border, false);
        assert_eq!((placed.x, placed.y), (98, 98));
        assert_eq!(gravitate(&placed, Gravity::SouthEast, &border, true), g);
    }
}
