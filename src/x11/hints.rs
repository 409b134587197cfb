//! Hints Module
//!
//! Decoding of the raw ICCCM and Motif property layouts (WM_SIZE_HINTS,
//! WM_HINTS, _MOTIF_WM_HINTS, WM_CLASS) into the core's hint types.

use crate::shared::Gravity;
use crate::wm::client::{Aspect, SizeHints, MAX_DIMENSION};
use crate::wm::display::{MotifHints, WmHints};

/// WM_SIZE_HINTS flags
mod size_flags {
    pub const US_POSITION: u32 = 1 << 0;
    pub const P_POSITION: u32 = 1 << 2;
    pub const P_MIN_SIZE: u32 = 1 << 4;
    pub const P_MAX_SIZE: u32 = 1 << 5;
    pub const P_RESIZE_INC: u32 = 1 << 6;
    pub const P_ASPECT: u32 = 1 << 7;
    pub const P_BASE_SIZE: u32 = 1 << 8;
    pub const P_WIN_GRAVITY: u32 = 1 << 9;
}

/// WM_HINTS flags
mod wm_flags {
    pub const INPUT: u32 = 1 << 0;
    pub const STATE: u32 = 1 << 1;
    pub const URGENCY: u32 = 1 << 8;
}

const MOTIF_FUNCTIONS: u32 = 1 << 0;
const MOTIF_DECORATIONS: u32 = 1 << 1;
const MOTIF_FUNC_ALL: u32 = 1 << 0;
const MOTIF_FUNC_RESIZE: u32 = 1 << 1;

fn dimension(value: u32) -> i32 {
    (value as i32).clamp(0, MAX_DIMENSION)
}

/// Parse WM_NORMAL_HINTS (18 CARD32s; shorter pre-ICCCM layouts are padded).
///
/// A missing minimum falls back to the base size and the other way round.
/// Increments are at least 1 and the maximum never drops below the minimum.
pub fn parse_size_hints(values: &[u32]) -> SizeHints {
    use size_flags::*;

    let mut hints = SizeHints::default();
    if values.is_empty() {
        return hints;
    }
    let v = |i: usize| values.get(i).copied().unwrap_or(0);
    let flags = v(0);

    hints.has_position = flags & (US_POSITION | P_POSITION) != 0;

    let min = (flags & P_MIN_SIZE != 0).then(|| (dimension(v(5)), dimension(v(6))));
    let base = (flags & P_BASE_SIZE != 0).then(|| (dimension(v(15)), dimension(v(16))));
    if let Some((w, h)) = min.or(base) {
        hints.min_width = w.max(1);
        hints.min_height = h.max(1);
    }
    if let Some((w, h)) = base.or(min) {
        hints.base_width = w;
        hints.base_height = h;
    }
    if flags & P_MAX_SIZE != 0 {
        let (w, h) = (dimension(v(7)), dimension(v(8)));
        if w > 0 {
            hints.max_width = w;
        }
        if h > 0 {
            hints.max_height = h;
        }
    }
    hints.max_width = hints.max_width.max(hints.min_width);
    hints.max_height = hints.max_height.max(hints.min_height);

    if flags & P_RESIZE_INC != 0 {
        hints.width_inc = dimension(v(9)).max(1);
        hints.height_inc = dimension(v(10)).max(1);
    }
    if flags & P_ASPECT != 0 {
        let aspect = Aspect {
            min_x: dimension(v(11)),
            min_y: dimension(v(12)),
            max_x: dimension(v(13)),
            max_y: dimension(v(14)),
        };
        if aspect.min_x > 0 && aspect.min_y > 0 && aspect.max_x > 0 && aspect.max_y > 0 {
            hints.aspect = Some(aspect);
        }
    }
    if flags & P_WIN_GRAVITY != 0 {
        hints.gravity = Gravity::from_raw(v(17));
    }
    hints
}

/// Parse WM_HINTS (9 CARD32s). Absent input hint means the client takes input.
pub fn parse_wm_hints(values: &[u32]) -> WmHints {
    let mut hints = WmHints::default();
    let Some(&flags) = values.first() else {
        return hints;
    };
    if flags & wm_flags::INPUT != 0 {
        hints.input = values.get(1).is_some_and(|&v| v != 0);
    }
    if flags & wm_flags::STATE != 0 {
        hints.iconic = values.get(2) == Some(&3);
    }
    hints.urgent = flags & wm_flags::URGENCY != 0;
    hints
}

/// Parse _MOTIF_WM_HINTS (flags, functions, decorations, ...)
pub fn parse_motif(values: &[u32]) -> MotifHints {
    let mut motif = MotifHints::default();
    let flags = values.first().copied().unwrap_or(0);
    if flags & MOTIF_FUNCTIONS != 0 {
        if let Some(&functions) = values.get(1) {
            // MWM_FUNC_ALL inverts the meaning of the other bits
            let resize = functions & MOTIF_FUNC_RESIZE != 0;
            motif.resize = Some(if functions & MOTIF_FUNC_ALL != 0 { !resize } else { resize });
        }
    }
    if flags & MOTIF_DECORATIONS != 0 {
        if let Some(&decorations) = values.get(2) {
            motif.decorations = Some(decorations != 0);
        }
    }
    motif
}

/// Split WM_CLASS into (instance, class)
pub fn parse_wm_class(value: &[u8]) -> (String, String) {
    let mut parts = value
        .split(|&b| b == 0)
        .map(|part| String::from_utf8_lossy(part).into_owned());
    let instance = parts.next().unwrap_or_default();
    let class = parts.next().unwrap_or_default();
    (instance, class)
}

/// Join names into NUL-terminated strings (`_NET_DESKTOP_NAMES` layout)
pub fn join_names(names: &[String]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for name in names {
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
    }
    bytes
}
