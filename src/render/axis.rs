use plotters::style::RGBColor;

use super::DrawContext;
use crate::ir::{ChartTitles, TextAnchor, TextRole, VectorCommand};
use crate::scale::{BandScale, LinearScale, PointScale};

const AXIS_COLOR: RGBColor = RGBColor(0x66, 0x66, 0x66);
const TICK_LENGTH: f64 = 6.0;
const LABEL_GAP: f64 = 4.0;

/// Tick value as shown on an axis: integers without a fraction, others trimmed
pub fn format_tick(value: f64) -> String {
    let rounded = (value * 1e9).round() / 1e9 + 0.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

fn axis_line(ctx: &mut DrawContext, from: (f64, f64), to: (f64, f64)) {
    ctx.vector(VectorCommand::Line {
        from,
        to,
        color: AXIS_COLOR,
        width: 1,
    });
}

/// Value axis along the left edge of the plot area
pub(super) fn linear_left(ctx: &mut DrawContext, scale: &LinearScale) {
    let area = ctx.plot_area();
    axis_line(ctx, (area.left, area.top), (area.left, area.bottom));
    let count = ctx.config().tick_count;
    for tick in scale.ticks(count) {
        let y = scale.map(tick);
        axis_line(ctx, (area.left - TICK_LENGTH, y), (area.left, y));
        ctx.text(
            format_tick(tick),
            (area.left - TICK_LENGTH - LABEL_GAP, y),
            TextAnchor::End,
            TextRole::TickLabel,
        );
    }
}

/// Bottom label row sits below the tick marks
fn bottom_label_y(ctx: &DrawContext) -> f64 {
    ctx.plot_area().bottom + TICK_LENGTH + LABEL_GAP + ctx.config().tick_font_size / 2.0
}

pub(super) fn linear_bottom(ctx: &mut DrawContext, scale: &LinearScale) {
    let area = ctx.plot_area();
    axis_line(ctx, (area.left, area.bottom), (area.right, area.bottom));
    let label_y = bottom_label_y(ctx);
    let count = ctx.config().tick_count;
    for tick in scale.ticks(count) {
        let x = scale.map(tick);
        axis_line(ctx, (x, area.bottom), (x, area.bottom + TICK_LENGTH));
        ctx.text(format_tick(tick), (x, label_y), TextAnchor::Middle, TextRole::TickLabel);
    }
}

pub(super) fn band_bottom(ctx: &mut DrawContext, scale: &BandScale) {
    let area = ctx.plot_area();
    axis_line(ctx, (area.left, area.bottom), (area.right, area.bottom));
    let label_y = bottom_label_y(ctx);
    for key in scale.domain() {
        let Some(x) = scale.band_center(key) else {
            continue;
        };
        axis_line(ctx, (x, area.bottom), (x, area.bottom + TICK_LENGTH));
        ctx.text(key.clone(), (x, label_y), TextAnchor::Middle, TextRole::TickLabel);
    }
}

pub(super) fn point_bottom(ctx: &mut DrawContext, scale: &PointScale) {
    let area = ctx.plot_area();
    axis_line(ctx, (area.left, area.bottom), (area.right, area.bottom));
    let label_y = bottom_label_y(ctx);
    for key in scale.domain() {
        let Some(x) = scale.map(key) else {
            continue;
        };
        axis_line(ctx, (x, area.bottom), (x, area.bottom + TICK_LENGTH));
        ctx.text(key.clone(), (x, label_y), TextAnchor::Middle, TextRole::TickLabel);
    }
}

/// Chart title centred in the top margin. Empty titles are not drawn.
pub(super) fn chart_title(ctx: &mut DrawContext, titles: &ChartTitles) {
    if titles.chart.is_empty() {
        return;
    }
    let dims = ctx.dimensions();
    let at = (dims.width as f64 / 2.0, ctx.config().margin.top as f64 / 2.0);
    ctx.text(titles.chart.clone(), at, TextAnchor::Middle, TextRole::Title);
}

pub(super) fn axis_titles(ctx: &mut DrawContext, titles: &ChartTitles) {
    let area = ctx.plot_area();
    let dims = ctx.dimensions();
    let size = ctx.config().label_font_size;

    if !titles.x_axis.is_empty() {
        let y = dims.height as f64 - ctx.config().margin.bottom as f64 / 3.0;
        ctx.text(
            titles.x_axis.clone(),
            (area.center().0, y),
            TextAnchor::Middle,
            TextRole::AxisTitle,
        );
    }
    if !titles.y_axis.is_empty() {
        ctx.vector(VectorCommand::Text {
            content: titles.y_axis.clone(),
            at: (size, area.center().1),
            anchor: TextAnchor::Middle,
            size,
            rotated: true,
            role: TextRole::AxisTitle,
        });
    }
}
