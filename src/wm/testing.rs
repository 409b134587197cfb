//! Recording display server for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use anyhow::Result;

use crate::shared::{BorderSize, Geometry, Gravity};
use crate::wm::client::{Client, SizeHints};
use crate::wm::display::{ClientInfo, Cursor, DesktopState, DisplayServer, Window, WmHints};
use crate::wm::events::{ConfigureRequest, WmEvent};
use crate::wm::keyboard::KeyBinding;
use crate::wm::screen::Monitor;
use crate::wm::settings::Settings;
use crate::wm::WindowManager;

const FIRST_FRAME: Window = 0x0100_0000;

/// One `configure_client` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configured {
    pub window: Window,
    pub frame: Option<Window>,
    pub geometry: Geometry,
    pub border: BorderSize,
    pub shaded: bool,
}

/// One `release_window` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Released {
    pub window: Window,
    pub frame: Option<Window>,
    pub geometry: Geometry,
    pub remap: bool,
}

#[derive(Debug)]
pub struct MockDisplay {
    pub size: (i32, i32),
    pub monitors: Vec<Monitor>,
    pub infos: HashMap<Window, ClientInfo>,
    pub events: VecDeque<WmEvent>,
    pub existing: Vec<Window>,
    next_frame: Window,
    pub frames: HashMap<Window, Window>,

    pub selected: HashSet<Window>,
    pub mapped: HashSet<Window>,
    pub configured: Vec<Configured>,
    pub unmanaged_configured: Vec<ConfigureRequest>,
    pub notified: Vec<(Window, Geometry)>,
    pub restack_calls: usize,
    pub last_restack: Vec<Window>,
    pub focus: Option<Window>,
    pub take_focus_sent: Vec<Window>,
    pub delete_sent: Vec<Window>,
    pub killed: Vec<Window>,
    pub installed_colormaps: Vec<u32>,
    pub painted: Vec<(Window, u32)>,
    pub released: Vec<Released>,

    pub pointer: (i32, i32),
    pub pointer_grabbed: bool,
    pub keyboard_grabbed: bool,
    /// Make the next grabs fail
    pub refuse_grab: bool,
    /// Make `draw_outline` fail
    pub fail_outline: bool,
    pub outline: Option<Geometry>,
    pub replayed: usize,
    pub key_grabs: Vec<KeyBinding>,
    pub button_grabs: Vec<(Window, bool)>,

    pub state_writes: usize,
    pub client_list: Vec<Window>,
    pub desktop_writes: usize,
    pub last_desktop_state: Option<DesktopState>,
    pub active_window: Option<Window>,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self {
            size: (1000, 800),
            monitors: Vec::new(),
            infos: HashMap::new(),
            events: VecDeque::new(),
            existing: Vec::new(),
            next_frame: FIRST_FRAME,
            frames: HashMap::new(),
            selected: HashSet::new(),
            mapped: HashSet::new(),
            configured: Vec::new(),
            unmanaged_configured: Vec::new(),
            notified: Vec::new(),
            restack_calls: 0,
            last_restack: Vec::new(),
            focus: None,
            take_focus_sent: Vec::new(),
            delete_sent: Vec::new(),
            killed: Vec::new(),
            installed_colormaps: Vec::new(),
            painted: Vec::new(),
            released: Vec::new(),
            pointer: (0, 0),
            pointer_grabbed: false,
            keyboard_grabbed: false,
            refuse_grab: false,
            fail_outline: false,
            outline: None,
            replayed: 0,
            key_grabs: Vec::new(),
            button_grabs: Vec::new(),
            state_writes: 0,
            client_list: Vec::new(),
            desktop_writes: 0,
            last_desktop_state: None,
            active_window: None,
        }
    }

    pub fn add_window(&mut self, window: Window, info: ClientInfo) {
        self.infos.insert(window, info);
    }

    pub fn queue(&mut self, event: WmEvent) {
        self.events.push_back(event);
    }

    /// Most recent layout of a client
    pub fn last_configure(&self, window: Window) -> Option<&Configured> {
        self.configured.iter().rev().find(|c| c.window == window)
    }

    pub fn is_grabbed(&self) -> bool {
        self.pointer_grabbed || self.keyboard_grabbed
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayServer for MockDisplay {
    fn screen_size(&self) -> (i32, i32) {
        self.size
    }

    fn monitors(&self) -> Result<Vec<Monitor>> {
        Ok(self.monitors.clone())
    }

    fn existing_windows(&mut self) -> Result<Vec<Window>> {
        Ok(self.existing.clone())
    }

    fn read_client_info(&mut self, window: Window) -> Result<Option<ClientInfo>> {
        Ok(self.infos.get(&window).cloned())
    }

    fn read_name(&mut self, window: Window) -> Result<Option<String>> {
        Ok(self.infos.get(&window).map(|i| i.name.clone()))
    }

    fn read_size_hints(&mut self, window: Window) -> Result<SizeHints> {
        Ok(self.infos.get(&window).map(|i| i.size_hints).unwrap_or_default())
    }

    fn read_wm_hints(&mut self, window: Window) -> Result<WmHints> {
        Ok(self.infos.get(&window).map(|i| i.wm_hints).unwrap_or_default())
    }

    fn read_transient_for(&mut self, window: Window) -> Result<Option<Window>> {
        Ok(self.infos.get(&window).and_then(|i| i.transient_for))
    }

    fn read_strut(&mut self, window: Window) -> Result<Vec<u32>> {
        Ok(self.infos.get(&window).map(|i| i.strut.clone()).unwrap_or_default())
    }

    fn read_colormap_windows(&mut self, window: Window) -> Result<Vec<Window>> {
        Ok(self
            .infos
            .get(&window)
            .map(|i| i.colormap_windows.clone())
            .unwrap_or_default())
    }

    fn read_opacity(&mut self, window: Window) -> Result<Option<u32>> {
        Ok(self.infos.get(&window).and_then(|i| i.opacity))
    }

    fn select_client_events(&mut self, window: Window) -> Result<()> {
        self.selected.insert(window);
        Ok(())
    }

    fn create_frame(&mut self, window: Window, _frame: &Geometry, _border: &BorderSize) -> Result<Window> {
        let frame = self.next_frame;
        self.next_frame += 1;
        self.frames.insert(window, frame);
        Ok(frame)
    }

    fn release_window(&mut self, window: Window, frame: Option<Window>, geometry: &Geometry, remap: bool) -> Result<()> {
        if let Some(frame) = frame {
            self.mapped.remove(&frame);
            self.frames.remove(&window);
        }
        if remap {
            self.mapped.insert(window);
        }
        self.released.push(Released {
            window,
            frame,
            geometry: *geometry,
            remap,
        });
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.mapped.insert(window);
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.mapped.remove(&window);
        Ok(())
    }

    fn configure_client(
        &mut self,
        window: Window,
        frame: Option<Window>,
        geometry: &Geometry,
        border: &BorderSize,
        shaded: bool,
    ) -> Result<()> {
        self.configured.push(Configured {
            window,
            frame,
            geometry: *geometry,
            border: *border,
            shaded,
        });
        Ok(())
    }

    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()> {
        self.unmanaged_configured.push(request.clone());
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: &Geometry) -> Result<()> {
        self.notified.push((window, *geometry));
        Ok(())
    }

    fn restack(&mut self, order: &[Window]) -> Result<()> {
        self.restack_calls += 1;
        self.last_restack = order.to_vec();
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>) -> Result<()> {
        self.focus = window;
        Ok(())
    }

    fn send_take_focus(&mut self, window: Window) -> Result<()> {
        self.take_focus_sent.push(window);
        Ok(())
    }

    fn send_delete_window(&mut self, window: Window) -> Result<()> {
        self.delete_sent.push(window);
        Ok(())
    }

    fn kill_client(&mut self, window: Window) -> Result<()> {
        self.killed.push(window);
        Ok(())
    }

    fn install_colormap(&mut self, colormap: u32) -> Result<()> {
        self.installed_colormaps.push(colormap);
        Ok(())
    }

    fn grab_pointer(&mut self, _cursor: Cursor) -> Result<bool> {
        if self.refuse_grab {
            return Ok(false);
        }
        self.pointer_grabbed = true;
        Ok(true)
    }

    fn grab_keyboard(&mut self) -> Result<bool> {
        if self.refuse_grab {
            return Ok(false);
        }
        self.keyboard_grabbed = true;
        Ok(true)
    }

    fn ungrab(&mut self) -> Result<()> {
        self.pointer_grabbed = false;
        self.keyboard_grabbed = false;
        Ok(())
    }

    fn query_pointer(&mut self) -> Result<(i32, i32)> {
        Ok(self.pointer)
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.pointer = (x, y);
        Ok(())
    }

    fn draw_outline(&mut self, rect: Option<&Geometry>) -> Result<()> {
        if self.fail_outline {
            anyhow::bail!("outline drawing failed");
        }
        self.outline = rect.copied();
        Ok(())
    }

    fn grab_keys(&mut self, bindings: &[KeyBinding]) -> Result<()> {
        self.key_grabs = bindings.to_vec();
        Ok(())
    }

    fn grab_client_buttons(&mut self, window: Window, click_to_focus: bool) -> Result<()> {
        self.button_grabs.push((window, click_to_focus));
        Ok(())
    }

    fn replay_pointer(&mut self) -> Result<()> {
        self.replayed += 1;
        Ok(())
    }

    fn paint_frame(&mut self, frame: Window, pixel: u32) -> Result<()> {
        self.painted.push((frame, pixel));
        Ok(())
    }

    fn write_state(&mut self, _client: &Client, _extents: &BorderSize) -> Result<()> {
        self.state_writes += 1;
        Ok(())
    }

    fn write_client_list(&mut self, managed: &[Window], _stacking: &[Window]) -> Result<()> {
        self.client_list = managed.to_vec();
        Ok(())
    }

    fn write_desktop_state(&mut self, state: &DesktopState) -> Result<()> {
        self.desktop_writes += 1;
        self.last_desktop_state = Some(state.clone());
        Ok(())
    }

    fn write_active_window(&mut self, window: Option<Window>) -> Result<()> {
        self.active_window = window;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<WmEvent>> {
        Ok(self.events.pop_front())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Manager over a fresh mock with default settings, not started
pub fn new_wm() -> WindowManager<MockDisplay> {
    new_wm_with(Settings::default(), MockDisplay::new())
}

pub fn new_wm_with(settings: Settings, display: MockDisplay) -> WindowManager<MockDisplay> {
    WindowManager::new(display, settings).unwrap()
}

/// Manage a plain window whose client area lands exactly at `geometry`.
pub fn manage_at(wm: &mut WindowManager<MockDisplay>, window: Window, geometry: Geometry, now: Instant) {
    wm.display_mut().add_window(window, ClientInfo {
        geometry,
        viewable: true,
        size_hints: SizeHints {
            has_position: true,
            gravity: Gravity::Static,
            ..SizeHints::default()
        },
        ..ClientInfo::default()
    });
    wm.manage(window, false, now).unwrap();
}
