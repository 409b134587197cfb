//! Screen Module
//!
//! Root window size and the monitors (outputs) it is split into.

use tracing::debug;

use crate::shared::Geometry;

/// Monitor/Output device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub index: usize,
    pub bounds: Geometry,
    pub name: String,
    pub primary: bool,
}

/// Root window and its monitors
#[derive(Debug, Clone)]
pub struct ScreenLayout {
    /// Screen width (all outputs combined)
    pub width: i32,
    /// Screen height (all outputs combined)
    pub height: i32,
    monitors: Vec<Monitor>,
}

impl ScreenLayout {
    /// Build a layout; with no monitors the whole root becomes one.
    pub fn new(width: i32, height: i32, mut monitors: Vec<Monitor>) -> Self {
        if monitors.is_empty() {
            monitors.push(Monitor {
                index: 0,
                bounds: Geometry::new(0, 0, width, height),
                name: "default".into(),
                primary: true,
            });
        }
        for (index, monitor) in monitors.iter_mut().enumerate() {
            monitor.index = index;
        }
        debug!("Screen {}x{} with {} monitor(s)", width, height, monitors.len());
        Self { width, height, monitors }
    }

    pub fn root_bounds(&self) -> Geometry {
        Geometry::new(0, 0, self.width, self.height)
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Monitor containing a point, or the nearest one for points outside
    /// every monitor.
    pub fn monitor_at(&self, x: i32, y: i32) -> &Monitor {
        self.monitors
            .iter()
            .find(|m| m.bounds.contains_point(x, y))
            .or_else(|| self.monitors.iter().min_by_key(|m| distance_sq(&m.bounds, x, y)))
            .unwrap_or(&self.monitors[0])
    }

    /// Get primary monitor
    pub fn primary(&self) -> &Monitor {
        self.monitors
            .iter()
            .find(|m| m.primary)
            .unwrap_or(&self.monitors[0])
    }
}

/// Squared distance from a point to the closest point of `rect`
fn distance_sq(rect: &Geometry, x: i32, y: i32) -> i64 {
    let dx = if x < rect.x {
        rect.x - x
    } else {
        (x - (rect.x + rect.width - 1)).max(0)
    };
    let dy = if y < rect.y {
        rect.y - y
    } else {
        (y - (rect.y + rect.height - 1)).max(0)
    };
    i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy)
}
