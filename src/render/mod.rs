// Chart renderers: prepared rows -> scene commands
//
// Renderers never touch a surface. They append vector commands (axes, labels,
// titles), raster commands (marks) and hit regions to the scene held by the
// drawing context; the surface controller executes them.

mod axis;
mod bar;
mod line;
mod pie;
mod scatter;

pub use axis::format_tick;

use serde::{Deserialize, Serialize};

use crate::chart::ChartKind;
use crate::config::RenderConfig;
use crate::dataset::PreparedRow;
use crate::ir::{
    ChartTitles, Dimensions, HitRegion, Point, RasterCommand, SceneGraph, TextAnchor, TextRole,
    VectorCommand,
};

/// Everything needed to (re)draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub chart_id: String,
    pub rows: Vec<PreparedRow>,
    #[serde(default)]
    pub titles: ChartTitles,
    #[serde(default)]
    pub override_domain: Option<(f64, f64)>,
}

impl RenderRequest {
    pub fn new(chart: ChartKind, rows: Vec<PreparedRow>, titles: ChartTitles) -> Self {
        Self {
            chart_id: chart.id().to_string(),
            rows,
            titles,
            override_domain: None,
        }
    }

    pub fn with_override_domain(mut self, domain: Option<(f64, f64)>) -> Self {
        self.override_domain = domain;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn,
    /// No drawable rows: the placeholder message was drawn instead
    Placeholder,
    /// Chart id with no renderer; nothing drawn
    Unknown,
    /// Zero-area surface; nothing drawn
    Skipped,
}

/// Plot rectangle inside the margins, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PlotArea {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        ((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.left, self.right)
    }

    /// Bottom to top, so larger values sit higher
    pub fn y_range(&self) -> (f64, f64) {
        (self.bottom, self.top)
    }
}

/// The only path from a renderer to the surfaces.
pub struct DrawContext<'a> {
    scene: &'a mut SceneGraph,
    config: &'a RenderConfig,
}

impl<'a> DrawContext<'a> {
    pub fn new(scene: &'a mut SceneGraph, config: &'a RenderConfig) -> Self {
        Self { scene, config }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.scene.dimensions
    }

    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    pub fn plot_area(&self) -> PlotArea {
        let dims = self.scene.dimensions;
        let margin = &self.config.margin;
        let left = margin.left as f64;
        let top = margin.top as f64;
        PlotArea {
            left,
            top,
            right: (dims.width as f64 - margin.right as f64).max(left),
            bottom: (dims.height as f64 - margin.bottom as f64).max(top),
        }
    }

    pub fn vector(&mut self, command: VectorCommand) {
        self.scene.vector.push(command);
    }

    pub fn raster(&mut self, command: RasterCommand) {
        self.scene.raster.push(command);
    }

    pub fn hit(&mut self, region: HitRegion) {
        self.scene.hit_regions.push(region);
    }

    pub fn text(&mut self, content: impl Into<String>, at: Point, anchor: TextAnchor, role: TextRole) {
        let size = match role {
            TextRole::Title => self.config.title_font_size,
            TextRole::AxisTitle | TextRole::Placeholder => self.config.label_font_size,
            TextRole::TickLabel | TextRole::SliceLabel => self.config.tick_font_size,
        };
        self.vector(VectorCommand::Text {
            content: content.into(),
            at,
            anchor,
            size,
            rotated: false,
            role,
        });
    }

    /// Centred message in place of a chart
    pub fn placeholder(&mut self) -> RenderOutcome {
        let dims = self.scene.dimensions;
        let message = self.config.placeholder.clone();
        let at = (dims.width as f64 / 2.0, dims.height as f64 / 2.0);
        self.text(message, at, TextAnchor::Middle, TextRole::Placeholder);
        RenderOutcome::Placeholder
    }
}

/// Draw `kind` into the context.
pub fn draw(
    kind: ChartKind,
    rows: &[PreparedRow],
    titles: &ChartTitles,
    override_domain: Option<(f64, f64)>,
    ctx: &mut DrawContext,
) -> RenderOutcome {
    if ctx.dimensions().is_empty() {
        return RenderOutcome::Skipped;
    }
    match kind {
        ChartKind::Bar => bar::draw(rows, titles, override_domain, ctx),
        ChartKind::Line => line::draw(rows, titles, override_domain, ctx),
        ChartKind::Pie => pie::draw(rows, titles, ctx),
        ChartKind::Scatter => scatter::draw(rows, titles, override_domain, ctx),
    }
}

/// Draw a request whose chart id may not name a known renderer
pub fn draw_request(request: &RenderRequest, ctx: &mut DrawContext) -> RenderOutcome {
    match request.chart_id.parse::<ChartKind>() {
        Ok(kind) => draw(
            kind,
            &request.rows,
            &request.titles,
            request.override_domain,
            ctx,
        ),
        Err(_) => {
            tracing::debug!(chart_id = %request.chart_id, "No renderer for chart id");
            RenderOutcome::Unknown
        }
    }
}

/// Tooltip detail for a value, prefixed by the y-axis title when one was given
fn tooltip_detail(titles: &ChartTitles, value: f64) -> String {
    let value = axis::format_tick(value);
    if titles.y_axis.is_empty() {
        value
    } else {
        format!("{}: {value}", titles.y_axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneGraph {
        SceneGraph::new(Dimensions::new(600, 400))
    }

    #[test]
    fn test_plot_area_respects_margins() {
        let mut scene = scene();
        let config = RenderConfig::default();
        let ctx = DrawContext::new(&mut scene, &config);
        let area = ctx.plot_area();
        assert_eq!(area.left, 70.0);
        assert_eq!(area.right, 580.0);
        assert_eq!(area.top, 40.0);
        assert_eq!(area.bottom, 340.0);
    }

    #[test]
    fn test_plot_area_never_inverts() {
        let mut scene = SceneGraph::new(Dimensions::new(30, 30));
        let config = RenderConfig::default();
        let ctx = DrawContext::new(&mut scene, &config);
        let area = ctx.plot_area();
        assert_eq!(area.width(), 0.0);
        assert_eq!(area.height(), 0.0);
    }

    #[test]
    fn test_unknown_chart_draws_nothing() {
        let mut scene = scene();
        let config = RenderConfig::default();
        let mut ctx = DrawContext::new(&mut scene, &config);
        let request = RenderRequest {
            chart_id: "radar".to_string(),
            rows: vec![PreparedRow::new("a", 1.0)],
            titles: ChartTitles::default(),
            override_domain: None,
        };
        assert_eq!(draw_request(&request, &mut ctx), RenderOutcome::Unknown);
        assert!(scene.vector.is_empty());
        assert!(scene.raster.is_empty());
    }

    #[test]
    fn test_every_chart_shows_placeholder_for_no_rows() {
        let config = RenderConfig::default();
        for kind in ChartKind::ALL {
            let mut scene = scene();
            let mut ctx = DrawContext::new(&mut scene, &config);
            let outcome = draw(kind, &[], &ChartTitles::default(), None, &mut ctx);
            assert_eq!(outcome, RenderOutcome::Placeholder, "{kind}");
            assert!(scene.raster.is_empty());
            assert!(scene.is_placeholder());
        }
    }

    #[test]
    fn test_zero_area_is_skipped() {
        let config = RenderConfig::default();
        let mut scene = SceneGraph::new(Dimensions::new(0, 300));
        let mut ctx = DrawContext::new(&mut scene, &config);
        let rows = vec![PreparedRow::new("a", 1.0)];
        let outcome = draw(ChartKind::Bar, &rows, &ChartTitles::default(), None, &mut ctx);
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(scene.vector.is_empty());
    }
}
