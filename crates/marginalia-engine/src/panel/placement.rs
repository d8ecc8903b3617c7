use crate::models::{Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementOptions {
    /// Distance between the reference and the panel on the main axis.
    pub offset: f64,
    /// Minimum distance kept from the boundary's left and right edges.
    pub padding: f64,
    /// Allow moving to the opposite side when the preferred one overflows.
    pub flip: bool,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            offset: 6.0,
            padding: 8.0,
            flip: true,
        }
    }
}

/// Where the panel's top-left corner goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelPosition {
    pub x: f64,
    pub y: f64,
    pub side: Side,
}

/// Place a floating panel of `floating` size against `reference`, start
/// aligned, preferring `preferred` and staying inside `boundary`.
pub fn compute_position(
    reference: Rect,
    floating: Size,
    boundary: Rect,
    preferred: Side,
    options: &PlacementOptions,
) -> PanelPosition {
    let y_for = |side: Side| match side {
        Side::Top => reference.top() - options.offset - floating.height,
        Side::Bottom => reference.bottom() + options.offset,
    };
    let overflow = |side: Side| {
        let y = y_for(side);
        match side {
            Side::Top => boundary.top() - y,
            Side::Bottom => (y + floating.height) - boundary.bottom(),
        }
    };

    let mut side = preferred;
    if options.flip && overflow(preferred) > 0.0 {
        let other = preferred.opposite();
        if overflow(other) <= 0.0 || overflow(other) < overflow(preferred) {
            side = other;
        }
    }

    PanelPosition {
        x: shift_x(reference.left(), floating.width, boundary, options.padding),
        y: y_for(side),
        side,
    }
}

/// Clamp along the alignment axis; a panel wider than the padded boundary
/// sticks to the left edge.
fn shift_x(x: f64, width: f64, boundary: Rect, padding: f64) -> f64 {
    let min = boundary.left() + padding;
    let max = boundary.right() - padding - width;
    if max < min { min } else { x.clamp(min, max) }
}
