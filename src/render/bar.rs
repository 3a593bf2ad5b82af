use super::{axis, tooltip_detail, DrawContext, RenderOutcome};
use crate::dataset::PreparedRow;
use crate::ir::{ChartTitles, HitRegion, HitShape, RasterCommand};
use crate::scale::ScaleFactory;

/// Vertical bars: band x in data order, value axis from zero
pub(super) fn draw(
    rows: &[PreparedRow],
    titles: &ChartTitles,
    override_domain: Option<(f64, f64)>,
    ctx: &mut DrawContext,
) -> RenderOutcome {
    let bars: Vec<(usize, String, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| row.y.as_f64().map(|v| (idx, row.x.to_string(), v)))
        .collect();
    if bars.is_empty() {
        return ctx.placeholder();
    }

    let area = ctx.plot_area();
    let x = ScaleFactory::band(bars.iter().map(|(_, key, _)| key.as_str()), area.x_range());
    let values: Vec<f64> = bars.iter().map(|(_, _, v)| *v).collect();
    let y = ScaleFactory::linear_from_zero(&values, area.y_range(), override_domain);

    let color = ctx.config().palette_color(0);
    // An override domain may leave values outside the plot; bars stop at its edge
    let clamp = |py: f64| py.clamp(area.top, area.bottom);
    let base = clamp(y.map(0.0));
    let width = x.bandwidth();

    for (row, key, value) in &bars {
        let Some(x0) = x.band_start(key) else {
            continue;
        };
        let top = clamp(y.map(*value));
        // Height is base - top; negative values hang below the baseline
        let tl = (x0, top.min(base));
        let br = (x0 + width, top.max(base));
        ctx.raster(RasterCommand::Rect { tl, br, color });
        ctx.hit(HitRegion {
            row: *row,
            label: key.clone(),
            detail: tooltip_detail(titles, *value),
            shape: HitShape::Rect { tl, br },
        });
    }

    axis::band_bottom(ctx, &x);
    axis::linear_left(ctx, &y);
    axis::chart_title(ctx, titles);
    axis::axis_titles(ctx, titles);
    RenderOutcome::Drawn
}
