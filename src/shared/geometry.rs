//! Geometry shared by the window manager and the X11 backend
//!
//! All sizes are signed: placement arithmetic subtracts rectangles from each
//! other and intermediate results may go negative before being clamped.

/// Window geometry (client area, without decorations unless stated otherwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area, or zero when either dimension is not positive.
    pub fn area(&self) -> i64 {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &Geometry) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Number of pixels shared by both rectangles.
    pub fn overlap_area(&self, other: &Geometry) -> i64 {
        if !self.intersects(other) {
            return 0;
        }
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        i64::from(w) * i64::from(h)
    }
}

/// Decoration insets around a client window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderSize {
    pub north: i32,
    pub south: i32,
    pub east: i32,
    pub west: i32,
}

impl BorderSize {
    pub const NONE: BorderSize = BorderSize { north: 0, south: 0, east: 0, west: 0 };

    pub const fn new(north: i32, south: i32, east: i32, west: i32) -> Self {
        Self { north, south, east, west }
    }

    /// Outer frame rectangle for a client rectangle.
    pub fn frame_of(&self, client: &Geometry) -> Geometry {
        Geometry {
            x: client.x - self.west,
            y: client.y - self.north,
            width: client.width + self.east + self.west,
            height: client.height + self.north + self.south,
        }
    }

    pub fn horizontal(&self) -> i32 {
        self.east + self.west
    }

    pub fn vertical(&self) -> i32 {
        self.north + self.south
    }
}

/// ICCCM window gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    /// Map the protocol value (1..=10); unknown values fall back to north-west.
    pub fn from_raw(value: u32) -> Self {
        match value {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            10 => Self::Static,
            _ => Self::NorthWest,
        }
    }

    /// Offset between the position a client asked for and where its frame
    /// origin sits, given the decoration insets.
    pub fn delta(&self, border: &BorderSize) -> (i32, i32) {
        let b = border;
        match self {
            Self::NorthWest => (-b.west, -b.north),
            Self::North => ((b.west - b.east) / 2, -b.north),
            Self::NorthEast => (b.west, -b.north),
            Self::West => (-b.west, (b.north - b.south) / 2),
            Self::Center => ((b.west - b.east) / 2, (b.north - b.south) / 2),
            Self::East => (b.west, (b.north - b.south) / 2),
            Self::SouthWest => (-b.west, b.south),
            Self::South => ((b.west - b.east) / 2, b.south),
            Self::SouthEast => (b.west, b.south),
            Self::Static => (0, 0),
        }
    }
}
