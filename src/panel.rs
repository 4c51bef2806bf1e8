//! Panel visibility state and layout math.
//!
//! Two states, one symmetric edge (toggle). The layout is a pure function of
//! the state and the container size; the controller applies it to the host.

use serde::Serialize;

/// Fixed width of the collapsed tab strip, px.
pub const DEFAULT_COLLAPSED_WIDTH_PX: u32 = 25;
/// Share of the container width taken by the expanded panel.
pub const DEFAULT_WIDTH_FRACTION: f64 = 0.20;

/// Geometry knobs (from HistoryConfig).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelGeometry {
    pub width_fraction: f64,
    pub collapsed_width_px: u32,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            width_fraction: DEFAULT_WIDTH_FRACTION,
            collapsed_width_px: DEFAULT_COLLAPSED_WIDTH_PX,
        }
    }
}

/// Left offset of the rendering surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum SurfaceMargin {
    /// Collapsed: offset by exactly the tab width.
    Pixels(u32),
    /// Expanded: flush at a fixed percentage of the container.
    Percent(f64),
}

impl std::fmt::Display for SurfaceMargin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceMargin::Pixels(px) => write!(f, "{}px", px),
            SurfaceMargin::Percent(p) => write!(f, "{}%", p),
        }
    }
}

/// Layout the caller applies to the host surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PanelLayout {
    pub panel_width: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub margin: SurfaceMargin,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelState {
    collapsed: bool,
    width_px: u32,
    geometry: PanelGeometry,
}

impl PanelState {
    pub fn new(collapsed: bool, geometry: PanelGeometry) -> Self {
        Self {
            collapsed,
            width_px: 0,
            geometry,
        }
    }

    #[inline]
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.collapsed
    }

    /// Last applied panel width. Meaningful only when expanded.
    #[inline]
    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    #[inline]
    pub fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    /// Flip collapsed/expanded.
    pub fn toggle(self) -> Self {
        self.with_collapsed(!self.collapsed)
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Record the width actually applied to the surface.
    pub fn with_width(mut self, width_px: u32) -> Self {
        self.width_px = width_px;
        self
    }

    /// Compute the layout for a container of the given size.
    pub fn resize(&self, container_width: u32, container_height: u32) -> PanelLayout {
        let (panel_width, margin) = if self.collapsed {
            let w = self.geometry.collapsed_width_px.min(container_width);
            (w, SurfaceMargin::Pixels(w))
        } else {
            let w = (container_width as f64 * self.geometry.width_fraction).round() as u32;
            (
                w.min(container_width),
                SurfaceMargin::Percent(self.geometry.width_fraction * 100.0),
            )
        };
        PanelLayout {
            panel_width,
            content_width: container_width.saturating_sub(panel_width),
            content_height: container_height,
            margin,
        }
    }

    /// Glyph on the toggle tab: '>' opens, '<' closes.
    pub fn toggle_glyph(&self) -> char {
        if self.collapsed {
            '>'
        } else {
            '<'
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_twice_is_identity() {
        let s = PanelState::new(true, PanelGeometry::default()).with_width(25);
        assert_eq!(s.toggle().toggle(), s);
        assert!(s.toggle().is_open());
    }

    #[test]
    fn expanded_takes_fraction() {
        let s = PanelState::new(false, PanelGeometry::default());
        let l = s.resize(1000, 600);
        assert_eq!(l.panel_width, 200);
        assert_eq!(l.content_width, 800);
        assert_eq!(l.content_height, 600);
        assert_eq!(l.margin, SurfaceMargin::Percent(20.0));
    }

    #[test]
    fn collapsed_takes_fixed_width() {
        let s = PanelState::new(true, PanelGeometry::default());
        let l = s.resize(1000, 600);
        assert_eq!(l.panel_width, 25);
        assert_eq!(l.content_width, 975);
        assert_eq!(l.margin, SurfaceMargin::Pixels(25));
        assert_eq!(l.margin.to_string(), "25px");
    }

    #[test]
    fn tiny_container_never_underflows() {
        let s = PanelState::new(true, PanelGeometry::default());
        let l = s.resize(10, 10);
        assert_eq!(l.panel_width, 10);
        assert_eq!(l.content_width, 0);
    }

    #[test]
    fn custom_fraction() {
        let g = PanelGeometry {
            width_fraction: 0.25,
            collapsed_width_px: 30,
        };
        let l = PanelState::new(false, g).resize(1000, 500);
        assert_eq!(l.panel_width, 250);
        assert_eq!(l.margin.to_string(), "25%");
    }

    #[test]
    fn glyph_follows_state() {
        let s = PanelState::new(true, PanelGeometry::default());
        assert_eq!(s.toggle_glyph(), '>');
        assert_eq!(s.toggle().toggle_glyph(), '<');
    }
}
