use std::f64::consts::{PI, TAU};

use super::{axis, tooltip_detail, DrawContext, RenderOutcome};
use crate::dataset::PreparedRow;
use crate::ir::{ChartTitles, HitRegion, HitShape, Point, RasterCommand, TextAnchor, TextRole};

// Arc resolution for the slice polygons
const ARC_STEP: f64 = PI / 90.0;
// Value labels sit just outside the rim
const LABEL_OFFSET: f64 = 14.0;

/// Point on the circle, angle clockwise from twelve o'clock
fn polar(center: Point, radius: f64, angle: f64) -> Point {
    (center.0 + radius * angle.sin(), center.1 - radius * angle.cos())
}

fn wedge(center: Point, radius: f64, start: f64, end: f64) -> Vec<Point> {
    let steps = ((end - start) / ARC_STEP).ceil().max(1.0) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for i in 0..=steps {
        let angle = start + (end - start) * i as f64 / steps as f64;
        points.push(polar(center, radius, angle));
    }
    points
}

/// Slices proportional to value / sum, coloured by row index
pub(super) fn draw(rows: &[PreparedRow], titles: &ChartTitles, ctx: &mut DrawContext) -> RenderOutcome {
    let slices: Vec<(usize, String, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| match row.y.as_f64() {
            Some(v) if v > 0.0 => Some((idx, row.x.to_string(), v)),
            _ => None,
        })
        .collect();
    let total: f64 = slices.iter().map(|(_, _, v)| v).sum();
    if slices.is_empty() || total <= 0.0 {
        return ctx.placeholder();
    }

    let area = ctx.plot_area();
    let center = area.center();
    let radius = (area.width().min(area.height()) / 2.0 - LABEL_OFFSET).max(0.0);

    let mut start = 0.0;
    for (row, key, value) in &slices {
        let end = (start + value / total * TAU).min(TAU);
        let color = ctx.config().palette_color(*row);
        ctx.raster(RasterCommand::Polygon {
            points: wedge(center, radius, start, end),
            color,
        });
        ctx.hit(HitRegion {
            row: *row,
            label: key.clone(),
            detail: tooltip_detail(titles, *value),
            shape: HitShape::Sector {
                center,
                radius,
                start_angle: start,
                end_angle: end,
            },
        });

        let mid = (start + end) / 2.0;
        let at = polar(center, radius + LABEL_OFFSET, mid);
        let anchor = if mid.sin() >= 0.0 {
            TextAnchor::Start
        } else {
            TextAnchor::End
        };
        ctx.text(axis::format_tick(*value), at, anchor, TextRole::SliceLabel);
        start = end;
    }

    axis::chart_title(ctx, titles);
    RenderOutcome::Drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::ir::{Dimensions, SceneGraph};

    fn render(rows: &[PreparedRow]) -> (RenderOutcome, SceneGraph) {
        let config = RenderConfig::default();
        let mut scene = SceneGraph::new(Dimensions::new(600, 400));
        let mut ctx = DrawContext::new(&mut scene, &config);
        let outcome = draw(rows, &ChartTitles::default(), &mut ctx);
        (outcome, scene)
    }

    #[test]
    fn test_angles_proportional_to_value() {
        let rows = vec![PreparedRow::new("a", 1.0), PreparedRow::new("b", 3.0)];
        let (outcome, scene) = render(&rows);
        assert_eq!(outcome, RenderOutcome::Drawn);
        assert_eq!(scene.raster.len(), 2);

        let spans: Vec<f64> = scene
            .hit_regions
            .iter()
            .map(|hit| match hit.shape {
                HitShape::Sector {
                    start_angle,
                    end_angle,
                    ..
                } => end_angle - start_angle,
                _ => panic!("expected sector"),
            })
            .collect();
        assert!((spans[0] - TAU / 4.0).abs() < 1e-9);
        assert!((spans[1] - TAU * 3.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_palette_cycles_by_row_index() {
        let rows: Vec<PreparedRow> = (0..6).map(|i| PreparedRow::new(format!("k{i}").as_str(), 1.0)).collect();
        let (_, scene) = render(&rows);
        let colors: Vec<_> = scene
            .raster
            .iter()
            .map(|cmd| match cmd {
                RasterCommand::Polygon { color, .. } => *color,
                _ => panic!("expected polygon"),
            })
            .collect();
        assert_eq!(colors[0], colors[5]);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn test_non_positive_values_get_no_slice() {
        let rows = vec![
            PreparedRow::new("a", 0.0),
            PreparedRow::new("b", -2.0),
            PreparedRow::new("c", 5.0),
        ];
        let (_, scene) = render(&rows);
        assert_eq!(scene.raster.len(), 1);
        assert_eq!(scene.hit_regions[0].label, "c");
        // A lone slice covers the full circle
        assert!(scene.hit_regions[0].shape.contains((300.0, 150.0)));
    }

    #[test]
    fn test_all_zero_shows_placeholder() {
        let rows = vec![PreparedRow::new("a", 0.0)];
        let (outcome, scene) = render(&rows);
        assert_eq!(outcome, RenderOutcome::Placeholder);
        assert!(scene.raster.is_empty());
    }
}
