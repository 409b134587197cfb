//! Types shared between the window manager core and the X11 backend

pub mod geometry;

pub use geometry::{BorderSize, Geometry, Gravity};
