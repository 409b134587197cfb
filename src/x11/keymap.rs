//! Keyboard mapping: keycode <-> keysym lookups for grabs and KeyPress events.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, Keycode, Keysym};

#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    min_keycode: Keycode,
    per_keycode: usize,
    syms: Vec<Keysym>,
}

impl KeyMap {
    pub fn new(min_keycode: Keycode, per_keycode: u8, syms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            per_keycode: usize::from(per_keycode),
            syms,
        }
    }

    /// Fetch the server's current mapping
    pub fn load<C: Connection>(conn: &C) -> Result<Self> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;
        Ok(Self::new(min, reply.keysyms_per_keycode, reply.keysyms))
    }

    /// Unshifted keysym of a keycode, 0 when unmapped
    pub fn keysym(&self, keycode: Keycode) -> Keysym {
        if self.per_keycode == 0 || keycode < self.min_keycode {
            return 0;
        }
        let index = usize::from(keycode - self.min_keycode) * self.per_keycode;
        self.syms.get(index).copied().unwrap_or(0)
    }

    /// Every keycode producing `keysym` in any column
    pub fn keycodes(&self, keysym: Keysym) -> Vec<Keycode> {
        if self.per_keycode == 0 || keysym == 0 {
            return Vec::new();
        }
        let mut codes: Vec<Keycode> = self
            .syms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, column)| column.contains(&keysym))
            .filter_map(|(i, _)| Keycode::try_from(usize::from(self.min_keycode) + i).ok())
            .collect();
        codes.dedup();
        codes
    }
}
