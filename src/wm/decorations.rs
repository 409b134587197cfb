//! Window decorations (frame borders and title bar) for layerwm
//!
//! Decorations are a solid frame: a title strip on top and an outline on
//! the other three sides. This module owns the metrics, the hit test used
//! for button presses on the frame, and the frame colour.

use crate::shared::BorderSize;
use crate::wm::client::Client;
use crate::wm::client_flags::{BorderFlags, StatusFlags};
use crate::wm::moveresize::ResizeEdge;
use crate::wm::settings::Theme;

/// Part of a frame under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameContext {
    /// The client area
    Client,
    /// The title strip (move, double-click maximize)
    Title,
    /// A resize edge or corner
    Border(ResizeEdge),
}

/// Frame metrics and colours
#[derive(Debug, Clone)]
pub struct Decorations {
    theme: Theme,
}

impl Decorations {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Decoration insets of a client.
    ///
    /// Fullscreen clients and clients without outline or title have none.
    pub fn border_size(&self, client: &Client) -> BorderSize {
        let state = &client.state;
        if state.is_fullscreen() {
            return BorderSize::NONE;
        }
        let outline = if state.has_border(BorderFlags::OUTLINE) {
            self.theme.border_width
        } else {
            0
        };
        let title = if state.has_border(BorderFlags::TITLE) {
            self.theme.title_height
        } else {
            0
        };
        BorderSize::new(outline + title, outline, outline, outline)
    }

    /// Whether a client gets a frame window at all
    pub fn is_decorated(&self, client: &Client) -> bool {
        client.state.border.intersects(BorderFlags::OUTLINE | BorderFlags::TITLE)
    }

    /// Hit test in frame-relative coordinates.
    ///
    /// Corners extend one title height along each edge so they are easy to grab.
    pub fn frame_context(&self, client: &Client, x: i32, y: i32) -> FrameContext {
        let border = self.border_size(client);
        let width = client.geometry.width + border.horizontal();
        let height = if client.state.is_shaded() {
            border.north
        } else {
            client.geometry.height + border.vertical()
        };
        let outline = border.west;

        let inside_client = x >= border.west
            && x < width - border.east
            && y >= border.north
            && y < height - border.south;
        if inside_client {
            return FrameContext::Client;
        }

        let resizable = client.state.has_border(BorderFlags::RESIZE) && !client.state.is_shaded();
        if resizable && outline > 0 {
            let corner = self.theme.title_height.max(outline);
            let mut edge = ResizeEdge::empty();
            if y < outline {
                edge |= ResizeEdge::NORTH;
            } else if y >= height - outline {
                edge |= ResizeEdge::SOUTH;
            }
            if x < outline {
                edge |= ResizeEdge::WEST;
            } else if x >= width - outline {
                edge |= ResizeEdge::EAST;
            }
            if !edge.is_empty() {
                // Extend to a corner when close to one along the edge
                if edge.intersects(ResizeEdge::NORTH | ResizeEdge::SOUTH) {
                    if x < corner {
                        edge |= ResizeEdge::WEST;
                    } else if x >= width - corner {
                        edge |= ResizeEdge::EAST;
                    }
                }
                if edge.intersects(ResizeEdge::EAST | ResizeEdge::WEST) {
                    if y < corner {
                        edge |= ResizeEdge::NORTH;
                    } else if y >= height - corner {
                        edge |= ResizeEdge::SOUTH;
                    }
                }
                return FrameContext::Border(edge);
            }
        }

        // Outline of a non-resizable window drags like the title
        FrameContext::Title
    }

    /// Frame fill colour for the client's current state
    pub fn frame_pixel(&self, client: &Client) -> u32 {
        if client.state.test(StatusFlags::FLASH) {
            self.theme.urgent_pixel
        } else if client.state.is_active() {
            self.theme.active_pixel
        } else {
            self.theme.inactive_pixel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;

    fn decorations() -> Decorations {
        Decorations::new(Theme {
            border_width: 4,
            title_height: 20,
            ..Theme::default()
        })
    }

    #[test]
    fn test_border_size_follows_flags() {
        let deco = decorations();
        let mut client = Client::new(1, Geometry::new(0, 0, 100, 100));
        assert_eq!(deco.border_size(&client), BorderSize::new(24, 4, 4, 4));

        client.state.clear_border(BorderFlags::TITLE);
        assert_eq!(deco.border_size(&client), BorderSize::new(4, 4, 4, 4));

        client.state.clear_border(BorderFlags::OUTLINE);
        assert_eq!(deco.border_size(&client), BorderSize::NONE);
        assert!(!deco.is_decorated(&client));

        client.state.reset_border();
        client.state.enter_fullscreen();
        assert_eq!(deco.border_size(&client), BorderSize::NONE);
    }

    #[test]
    fn test_frame_context() {
        let deco = decorations();
        let client = Client::new(1, Geometry::new(0, 0, 200, 100));
        // Frame is 208 x 128
        assert_eq!(deco.frame_context(&client, 100, 60), FrameContext::Client);
        assert_eq!(deco.frame_context(&client, 100, 12), FrameContext::Title);
        assert_eq!(
            deco.frame_context(&client, 100, 126),
            FrameContext::Border(ResizeEdge::SOUTH)
        );
        assert_eq!(
            deco.frame_context(&client, 1, 1),
            FrameContext::Border(ResizeEdge::NORTH | ResizeEdge::WEST)
        );
        assert_eq!(
            deco.frame_context(&client, 206, 60),
            FrameContext::Border(ResizeEdge::EAST)
        );
    }

    #[test]
    fn test_non_resizable_edges_drag() {
        let deco = decorations();
        let mut client = Client::new(1, Geometry::new(0, 0, 200, 100));
        client.state.clear_border(BorderFlags::RESIZE);
        assert_eq!(deco.frame_context(&client, 1, 60), FrameContext::Title);
    }

    #[test]
    fn test_flash_colour_wins() {
        let deco = decorations();
        let mut client = Client::new(1, Geometry::new(0, 0, 10, 10));
        client.state.set(StatusFlags::ACTIVE);
        assert_eq!(deco.frame_pixel(&client), deco.theme().active_pixel);
        client.state.set(StatusFlags::FLASH);
        assert_eq!(deco.frame_pixel(&client), deco.theme().urgent_pixel);
    }
}
