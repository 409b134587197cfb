//! Settings Module
//!
//! Runtime settings of the window manager, built once from the loaded
//! configuration, plus the group rules that adjust clients at map time.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::wm::client_flags::Layer;
use crate::wm::keyboard::{Action, KeyBinding};
use crate::wm::placement::PlacementPolicy;

/// Focus policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusModel {
    /// Focus follows clicks
    #[default]
    Click,
    /// Focus follows the pointer into windows, and stays on the root
    Sloppy,
}

/// What moving windows snap to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    None,
    /// Monitor edges
    Screen,
    /// Other windows' frames and monitor edges
    #[default]
    Border,
}

/// How interactive move/resize is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    /// The window follows the pointer
    #[default]
    Opaque,
    /// A rubber-band outline follows the pointer; the window moves on release
    Outline,
}

/// Decoration metrics and colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub border_width: i32,
    pub title_height: i32,
    pub active_pixel: u32,
    pub inactive_pixel: u32,
    pub urgent_pixel: u32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_width: 4,
            title_height: 20,
            active_pixel: 0x5e81ac,
            inactive_pixel: 0x3b4252,
            urgent_pixel: 0xbf616a,
        }
    }
}

/// One option a group rule applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupOption {
    Sticky,
    /// Zero-based desktop
    Desktop(u32),
    Layer(Layer),
    NoBorder,
    NoTitle,
    Centered,
    Tiled,
    Maximized,
    Minimized,
    Fullscreen,
    /// Ignore resize increments when maximizing
    IgnoreIncrements,
    /// Ignore the program-specified position
    IgnorePosition,
    NoList,
    NoPager,
    NotUrgent,
    /// 0.0 - 1.0
    Opacity(f32),
    /// Restoring switches to the client's desktop instead of pulling it over
    Fixed,
}

impl FromStr for GroupOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once(':') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };
        let option = match (name.to_ascii_lowercase().as_str(), value) {
            ("sticky", None) => Self::Sticky,
            ("noborder", None) => Self::NoBorder,
            ("notitle", None) => Self::NoTitle,
            ("centered", None) => Self::Centered,
            ("tiled", None) => Self::Tiled,
            ("maximized", None) => Self::Maximized,
            ("minimized", None) => Self::Minimized,
            ("fullscreen", None) => Self::Fullscreen,
            ("iignore", None) => Self::IgnoreIncrements,
            ("pignore", None) => Self::IgnorePosition,
            ("nolist", None) => Self::NoList,
            ("nopager", None) => Self::NoPager,
            ("noturgent", None) => Self::NotUrgent,
            ("fixed", None) => Self::Fixed,
            ("desktop", Some(v)) => {
                let n: u32 = v.parse().map_err(|_| format!("bad desktop '{}'", v))?;
                if n == 0 {
                    return Err("desktops are numbered from 1".into());
                }
                Self::Desktop(n - 1)
            }
            ("layer", Some(v)) => Self::Layer(match v.to_ascii_lowercase().as_str() {
                "desktop" => Layer::Desktop,
                "below" => Layer::Below,
                "normal" => Layer::Normal,
                "above" => Layer::Above,
                other => return Err(format!("bad layer '{}'", other)),
            }),
            ("opacity", Some(v)) => {
                let o: f32 = v.parse().map_err(|_| format!("bad opacity '{}'", v))?;
                Self::Opacity(o.clamp(0.0, 1.0))
            }
            _ => return Err(format!("unknown group option '{}'", s)),
        };
        Ok(option)
    }
}

/// Options applied to clients whose class or name matches
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRule {
    /// Substring of WM_CLASS (class or instance)
    pub class: Option<String>,
    /// Substring of the window title
    pub name: Option<String>,
    pub options: Vec<GroupOption>,
}

impl GroupRule {
    /// A rule with no patterns matches nothing.
    pub fn matches(&self, class: &str, instance: &str, name: &str) -> bool {
        if self.class.is_none() && self.name.is_none() {
            return false;
        }
        let class_ok = self
            .class
            .as_deref()
            .map_or(true, |p| class.contains(p) || instance.contains(p));
        let name_ok = self.name.as_deref().map_or(true, |p| name.contains(p));
        class_ok && name_ok
    }
}

/// Window manager settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub desktop_count: u32,
    pub desktop_names: Vec<String>,
    pub focus_model: FocusModel,
    pub placement: PlacementPolicy,
    pub snap_mode: SnapMode,
    pub snap_distance: i32,
    pub move_mode: DrawMode,
    pub resize_mode: DrawMode,
    /// Quadrant maximize when a moved window hits a monitor edge
    pub aero_snap: bool,
    /// Hold time at the screen edge before switching desktops; `None` disables
    pub edge_switch_delay: Option<Duration>,
    /// Pixels per arrow key in keyboard move/resize
    pub keyboard_step: i32,
    pub double_click: Duration,
    /// How long a WM_DELETE_WINDOW may go unanswered before close escalates to kill
    pub close_timeout: Duration,
    pub theme: Theme,
    pub groups: Vec<GroupRule>,
    pub keys: Vec<KeyBinding>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            desktop_count: 4,
            desktop_names: Vec::new(),
            focus_model: FocusModel::default(),
            placement: PlacementPolicy::default(),
            snap_mode: SnapMode::default(),
            snap_distance: 10,
            move_mode: DrawMode::Opaque,
            resize_mode: DrawMode::Opaque,
            aero_snap: true,
            edge_switch_delay: None,
            keyboard_step: 10,
            double_click: Duration::from_millis(400),
            close_timeout: Duration::from_secs(3),
            theme: Theme::default(),
            groups: Vec::new(),
            keys: Vec::new(),
        }
    }
}

impl Settings {
    /// Build runtime settings. Bad group options and key bindings are
    /// logged and skipped.
    pub fn from_config(config: &Config) -> Self {
        let groups = config
            .groups
            .iter()
            .map(|g| GroupRule {
                class: g.class.clone(),
                name: g.name.clone(),
                options: g
                    .options
                    .iter()
                    .filter_map(|o| match o.parse() {
                        Ok(option) => Some(option),
                        Err(e) => {
                            warn!("Ignoring group option: {}", e);
                            None
                        }
                    })
                    .collect(),
            })
            .collect();

        let keys = config
            .keys
            .iter()
            .filter_map(|k| {
                let parsed = k
                    .action
                    .parse::<Action>()
                    .and_then(|action| KeyBinding::parse(&k.key, action));
                match parsed {
                    Ok(binding) => Some(binding),
                    Err(e) => {
                        warn!("Ignoring key binding '{}': {}", k.key, e);
                        None
                    }
                }
            })
            .collect();

        let mr = &config.move_resize;
        Self {
            desktop_count: config.desktops.count.max(1),
            desktop_names: config.desktops.names.clone(),
            focus_model: config.focus.model,
            placement: config.placement.policy,
            snap_mode: mr.snap_mode,
            snap_distance: mr.snap_distance.max(0),
            move_mode: mr.move_mode,
            resize_mode: mr.resize_mode,
            aero_snap: mr.aero_snap,
            edge_switch_delay: (mr.edge_switch_delay_ms > 0)
                .then(|| Duration::from_millis(mr.edge_switch_delay_ms)),
            keyboard_step: mr.keyboard_step.max(1),
            double_click: Duration::from_millis(config.focus.double_click_ms),
            close_timeout: Duration::from_millis(config.focus.close_timeout_ms),
            theme: Theme {
                border_width: config.theme.border_width.max(0),
                title_height: config.theme.title_height.max(0),
                active_pixel: config.theme.active_color,
                inactive_pixel: config.theme.inactive_color,
                urgent_pixel: config.theme.urgent_color,
            },
            groups,
            keys,
        }
    }

    /// Options of every rule matching a client, in rule order
    pub fn group_options(&self, class: &str, instance: &str, name: &str) -> Vec<GroupOption> {
        self.groups
            .iter()
            .filter(|g| g.matches(class, instance, name))
            .flat_map(|g| g.options.iter().copied())
            .collect()
    }

    /// Name of a desktop, falling back to its one-based number
    pub fn desktop_name(&self, desktop: u32) -> String {
        self.desktop_names
            .get(desktop as usize)
            .cloned()
            .unwrap_or_else(|| (desktop + 1).to_string())
    }
}
