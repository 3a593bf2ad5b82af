use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

// =============================================================================
// Surface geometry
// =============================================================================

/// Pixel position, origin at the top-left of the surface.
pub type Point = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Nothing can be drawn on a zero-area surface
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Strings shown around the chart. Renderers add no defaults of their own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartTitles {
    pub chart: String,
    pub x_axis: String,
    pub y_axis: String,
}

impl ChartTitles {
    pub fn new(chart: impl Into<String>, x_axis: impl Into<String>, y_axis: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            x_axis: x_axis.into(),
            y_axis: y_axis.into(),
        }
    }
}

// =============================================================================
// Vector layer: axes, labels, titles
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Title,
    AxisTitle,
    TickLabel,
    SliceLabel,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorCommand {
    Line {
        from: Point,
        to: Point,
        color: RGBColor,
        width: u32,
    },
    Text {
        content: String,
        at: Point,
        anchor: TextAnchor,
        size: f64,
        // Rotated a quarter turn counter-clockwise (vertical axis titles)
        rotated: bool,
        role: TextRole,
    },
}

// =============================================================================
// Raster layer: data marks
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RasterCommand {
    Rect {
        // Top-Left, Bottom-Right
        tl: Point,
        br: Point,
        color: RGBColor,
    },
    Path {
        points: Vec<Point>,
        color: RGBColor,
        width: u32,
    },
    Circle {
        center: Point,
        radius: u32,
        color: RGBColor,
    },
    Polygon {
        points: Vec<Point>,
        color: RGBColor,
    },
}

// =============================================================================
// Hit testing
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HitShape {
    Rect { tl: Point, br: Point },
    Circle { center: Point, radius: f64 },
    /// Angles in radians, clockwise from twelve o'clock.
    Sector {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
}

impl HitShape {
    pub fn contains(&self, (px, py): Point) -> bool {
        match *self {
            HitShape::Rect { tl, br } => {
                let (x0, x1) = (tl.0.min(br.0), tl.0.max(br.0));
                let (y0, y1) = (tl.1.min(br.1), tl.1.max(br.1));
                px >= x0 && px <= x1 && py >= y0 && py <= y1
            }
            HitShape::Circle { center, radius } => {
                let (dx, dy) = (px - center.0, py - center.1);
                dx * dx + dy * dy <= radius * radius
            }
            HitShape::Sector {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let (dx, dy) = (px - center.0, py - center.1);
                if dx * dx + dy * dy > radius * radius {
                    return false;
                }
                let mut angle = dx.atan2(-dy);
                if angle < 0.0 {
                    angle += std::f64::consts::TAU;
                }
                angle >= start_angle && angle <= end_angle
            }
        }
    }
}

/// Tooltip target: the row it came from plus the text to show.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRegion {
    pub row: usize,
    pub label: String,
    pub detail: String,
    pub shape: HitShape,
}

// =============================================================================
// Scene
// =============================================================================

/// Everything one render produced, split by surface.
/// The surfaces execute these blindly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneGraph {
    pub dimensions: Dimensions,
    pub vector: Vec<VectorCommand>,
    pub raster: Vec<RasterCommand>,
    pub hit_regions: Vec<HitRegion>,
}

impl SceneGraph {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    pub fn texts(&self, role: TextRole) -> impl Iterator<Item = &str> {
        self.vector.iter().filter_map(move |cmd| match cmd {
            VectorCommand::Text { content, role: r, .. } if *r == role => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn is_placeholder(&self) -> bool {
        self.texts(TextRole::Placeholder).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rect_contains_either_corner_order() {
        let shape = HitShape::Rect {
            tl: (10.0, 50.0),
            br: (20.0, 10.0),
        };
        assert!(shape.contains((15.0, 30.0)));
        assert!(!shape.contains((25.0, 30.0)));
    }

    #[test]
    fn test_sector_contains() {
        // Right half of a circle: 12 o'clock to 6 o'clock, clockwise
        let shape = HitShape::Sector {
            center: (100.0, 100.0),
            radius: 50.0,
            start_angle: 0.0,
            end_angle: PI,
        };
        assert!(shape.contains((130.0, 100.0)));
        assert!(!shape.contains((70.0, 100.0)));
        assert!(!shape.contains((190.0, 100.0)));
    }

    #[test]
    fn test_empty_dimensions() {
        assert!(Dimensions::new(0, 10).is_empty());
        assert!(!Dimensions::new(1, 1).is_empty());
    }
}
