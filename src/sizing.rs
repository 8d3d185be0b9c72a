use crate::pdf::{CONTENT_WIDTH, PAGE_HEIGHT};

/// The role a visual plays in a section, which decides its sizing rule and
/// its horizontal alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualRole {
    /// A square raster illustration of one concept. Laid out beside the
    /// body text, left-aligned.
    Diagram,
    /// A wide raster image of a process graph. Laid out stacked under the
    /// body text, horizontally centered.
    Flowchart,
}

/// Fraction of the content width a diagram targets.
pub const DIAGRAM_WIDTH_FRACTION: f32 = 0.5;
/// Cap on a diagram's height, as a fraction of the page height.
pub const DIAGRAM_HEIGHT_CAP_FRACTION: f32 = 0.4;
/// Width of the bounding box a flowchart is fitted into, as a fraction of
/// the content width.
pub const FLOWCHART_WIDTH_FRACTION: f32 = 0.8;
/// Height of the bounding box a flowchart is fitted into, as a fraction of
/// the page height.
pub const FLOWCHART_HEIGHT_FRACTION: f32 = 0.5;
/// Vertical band reserved under a diagram for its caption, in points.
pub const DIAGRAM_CAPTION_BAND: f32 = 35.0;
/// Vertical band reserved under a flowchart for its caption, in points.
pub const FLOWCHART_CAPTION_BAND: f32 = 45.0;

/// The on-page footprint computed for a visual, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualFootprint {
    pub width: f32,
    pub height: f32,
}

/// Compute the on-page footprint of a visual from its natural pixel
/// dimensions and its role.
///
/// A diagram targets half the content width and derives its height from the
/// aspect ratio; when that height would exceed the page-height cap, the
/// width is re-derived from the capped height instead. A flowchart is
/// uniformly scaled down to fit its bounding box and is never scaled up
/// beyond its natural size.
pub fn plan_footprint(role: VisualRole, natural_width: u32, natural_height: u32) -> VisualFootprint {
    // Degenerate buffers cannot contribute an aspect ratio.
    let natural_width = natural_width.max(1) as f32;
    let natural_height = natural_height.max(1) as f32;

    match role {
        VisualRole::Diagram => {
            let mut width = DIAGRAM_WIDTH_FRACTION * CONTENT_WIDTH;
            let mut height = width * natural_height / natural_width;
            let height_cap = DIAGRAM_HEIGHT_CAP_FRACTION * PAGE_HEIGHT;
            if height > height_cap {
                height = height_cap;
                width = height * natural_width / natural_height;
            }
            VisualFootprint { width, height }
        }
        VisualRole::Flowchart => {
            let bounding_width = FLOWCHART_WIDTH_FRACTION * CONTENT_WIDTH;
            let bounding_height = FLOWCHART_HEIGHT_FRACTION * PAGE_HEIGHT;
            let width_scale = bounding_width / natural_width;
            let height_scale = bounding_height / natural_height;
            let scale = width_scale.min(height_scale).min(1.0);
            VisualFootprint {
                width: natural_width * scale,
                height: natural_height * scale,
            }
        }
    }
}

/// The caption band reserved under a visual of the given role, in points.
pub fn caption_band(role: VisualRole) -> f32 {
    match role {
        VisualRole::Diagram => DIAGRAM_CAPTION_BAND,
        VisualRole::Flowchart => FLOWCHART_CAPTION_BAND,
    }
}
