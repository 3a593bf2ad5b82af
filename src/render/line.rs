use super::{axis, tooltip_detail, DrawContext, RenderOutcome};
use crate::dataset::PreparedRow;
use crate::ir::{ChartTitles, HitRegion, HitShape, Point, RasterCommand};
use crate::scale::ScaleFactory;

/// Single polyline through the rows in input order
pub(super) fn draw(
    rows: &[PreparedRow],
    titles: &ChartTitles,
    override_domain: Option<(f64, f64)>,
    ctx: &mut DrawContext,
) -> RenderOutcome {
    let samples: Vec<(usize, String, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| row.y.as_f64().map(|v| (idx, row.x.to_string(), v)))
        .collect();
    if samples.is_empty() {
        return ctx.placeholder();
    }

    let area = ctx.plot_area();
    let x = ScaleFactory::point(samples.iter().map(|(_, key, _)| key.as_str()), area.x_range());
    let values: Vec<f64> = samples.iter().map(|(_, _, v)| *v).collect();
    let y = ScaleFactory::linear_from_zero(&values, area.y_range(), override_domain);

    let config = ctx.config();
    let color = config.palette_color(0);
    let width = config.line_width;
    let hit_radius = (config.point_radius + 2) as f64;

    let mut points: Vec<Point> = Vec::with_capacity(samples.len());
    for (row, key, value) in &samples {
        let Some(px) = x.map(key) else {
            continue;
        };
        let point = (px, y.map(*value));
        points.push(point);
        ctx.hit(HitRegion {
            row: *row,
            label: key.clone(),
            detail: tooltip_detail(titles, *value),
            shape: HitShape::Circle {
                center: point,
                radius: hit_radius,
            },
        });
    }
    ctx.raster(RasterCommand::Path {
        points,
        color,
        width,
    });

    axis::point_bottom(ctx, &x);
    axis::linear_left(ctx, &y);
    axis::chart_title(ctx, titles);
    axis::axis_titles(ctx, titles);
    RenderOutcome::Drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::ir::{Dimensions, SceneGraph};

    #[test]
    fn test_single_path_in_row_order() {
        let config = RenderConfig::default();
        let mut scene = SceneGraph::new(Dimensions::new(600, 400));
        let mut ctx = DrawContext::new(&mut scene, &config);
        let rows = vec![
            PreparedRow::new(3.0, 1.0),
            PreparedRow::new(1.0, 4.0),
            PreparedRow::new(2.0, 2.0),
        ];
        let outcome = draw(&rows, &ChartTitles::default(), None, &mut ctx);
        assert_eq!(outcome, RenderOutcome::Drawn);
        assert_eq!(scene.raster.len(), 1);

        let RasterCommand::Path { points, .. } = &scene.raster[0] else {
            panic!("expected a path");
        };
        assert_eq!(points.len(), 3);
        // x follows input order, not numeric order
        assert!(points[0].0 < points[1].0 && points[1].0 < points[2].0);
        // Highest value is highest on screen
        assert!(points[1].1 < points[2].1 && points[2].1 < points[0].1);
    }

    #[test]
    fn test_negative_values_stay_inside_plot_area() {
        let config = RenderConfig::default();
        let mut scene = SceneGraph::new(Dimensions::new(600, 400));
        let mut ctx = DrawContext::new(&mut scene, &config);
        let area = ctx.plot_area();
        let rows = vec![PreparedRow::new("q1", -4.0), PreparedRow::new("q2", 6.0)];
        draw(&rows, &ChartTitles::default(), None, &mut ctx);

        let RasterCommand::Path { points, .. } = &scene.raster[0] else {
            panic!("expected a path");
        };
        for (_, py) in points {
            assert!(*py >= area.top && *py <= area.bottom, "{py}");
        }
        assert_eq!(scene.hit_regions[0].detail, "-4");
    }

    #[test]
    fn test_single_point_is_centred() {
        let config = RenderConfig::default();
        let mut scene = SceneGraph::new(Dimensions::new(600, 400));
        let mut ctx = DrawContext::new(&mut scene, &config);
        let rows = vec![PreparedRow::new("2024", 7.0)];
        draw(&rows, &ChartTitles::default(), None, &mut ctx);
        let RasterCommand::Path { points, .. } = &scene.raster[0] else {
            panic!("expected a path");
        };
        assert_eq!(points[0].0, (70.0 + 580.0) / 2.0);
    }
}
