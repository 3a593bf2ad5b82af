use super::{axis, tooltip_detail, DrawContext, RenderOutcome};
use crate::dataset::PreparedRow;
use crate::ir::{ChartTitles, HitRegion, HitShape, RasterCommand};
use crate::scale::ScaleFactory;

pub(super) fn draw(
    rows: &[PreparedRow],
    titles: &ChartTitles,
    override_domain: Option<(f64, f64)>,
    ctx: &mut DrawContext,
) -> RenderOutcome {
    let points: Vec<(usize, f64, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| Some((idx, row.x.as_f64()?, row.y.as_f64()?)))
        .collect();
    if points.is_empty() {
        return ctx.placeholder();
    }

    let area = ctx.plot_area();
    let xs: Vec<f64> = points.iter().map(|(_, x, _)| *x).collect();
    let ys: Vec<f64> = points.iter().map(|(_, _, y)| *y).collect();
    let x = ScaleFactory::linear(&xs, area.x_range(), None);
    let y = ScaleFactory::linear(&ys, area.y_range(), override_domain);

    let color = ctx.config().palette_color(0);
    let radius = ctx.config().point_radius;

    for (row, vx, vy) in &points {
        let center = (x.map(*vx), y.map(*vy));
        ctx.raster(RasterCommand::Circle {
            center,
            radius,
            color,
        });
        ctx.hit(HitRegion {
            row: *row,
            label: axis::format_tick(*vx),
            detail: tooltip_detail(titles, *vy),
            shape: HitShape::Circle {
                center,
                radius: radius as f64,
            },
        });
    }

    axis::linear_bottom(ctx, &x);
    axis::linear_left(ctx, &y);
    axis::chart_title(ctx, titles);
    axis::axis_titles(ctx, titles);
    RenderOutcome::Drawn
}
