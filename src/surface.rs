use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::config::RenderConfig;
use crate::ir::{Dimensions, HitRegion, Point, RasterCommand, SceneGraph, TextAnchor, VectorCommand};
use crate::render::{self, DrawContext, RenderOutcome, RenderRequest};

const TEXT_COLOR: RGBColor = RGBColor(0x33, 0x33, 0x33);

// =============================================================================
// Resize observation
// =============================================================================

type PendingSize = Rc<Cell<Option<Dimensions>>>;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    observations: BTreeMap<u64, (String, PendingSize)>,
}

/// Batched size notifications for named containers.
///
/// Layout passes call [`ResizeObserver::notify`]; each observation keeps only the
/// most recent size until its owner drains it.
#[derive(Debug, Clone, Default)]
pub struct ResizeObserver {
    inner: Rc<RefCell<Registry>>,
}

impl ResizeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, container: &str) -> Observation {
        let pending: PendingSize = Rc::new(Cell::new(None));
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .observations
            .insert(id, (container.to_string(), Rc::clone(&pending)));
        Observation {
            id,
            registry: Rc::downgrade(&self.inner),
            pending,
        }
    }

    /// Record a layout result; overwrites any size not yet applied
    pub fn notify(&self, container: &str, dimensions: Dimensions) {
        let registry = self.inner.borrow();
        for (name, pending) in registry.observations.values() {
            if name == container {
                pending.set(Some(dimensions));
            }
        }
    }

    pub fn observed_count(&self) -> usize {
        self.inner.borrow().observations.len()
    }
}

/// Live registration with a [`ResizeObserver`]; dropping it disconnects.
#[derive(Debug)]
pub struct Observation {
    id: u64,
    registry: Weak<RefCell<Registry>>,
    pending: PendingSize,
}

impl Observation {
    pub fn take_pending(&self) -> Option<Dimensions> {
        self.pending.take()
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().observations.remove(&self.id);
        }
    }
}

// =============================================================================
// Hybrid surface
// =============================================================================

/// One vector surface (SVG) and one raster surface (RGB), always the same size.
pub struct HybridSurfaceController {
    config: RenderConfig,
    dimensions: Dimensions,
    observation: Option<Observation>,
    last_request: Option<RenderRequest>,
    last_outcome: Option<RenderOutcome>,
    scene: SceneGraph,
    svg: String,
    raster: Vec<u8>,
}

impl HybridSurfaceController {
    pub fn new(config: RenderConfig, dimensions: Dimensions) -> Self {
        Self {
            config,
            dimensions,
            observation: None,
            last_request: None,
            last_outcome: None,
            scene: SceneGraph::new(dimensions),
            svg: String::new(),
            raster: blank_buffer(dimensions),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Follow `container`'s size, replacing any earlier observation
    pub fn observe(&mut self, observer: &ResizeObserver, container: &str) {
        self.observation = Some(observer.observe(container));
    }

    pub fn unobserve(&mut self) {
        self.observation = None;
    }

    pub fn is_observing(&self) -> bool {
        self.observation.is_some()
    }

    /// Apply the latest observed size, if any. Returns whether a repaint happened.
    pub fn process_resize(&mut self) -> Result<bool> {
        let Some(next) = self.observation.as_ref().and_then(Observation::take_pending) else {
            return Ok(false);
        };
        if next == self.dimensions {
            return Ok(false);
        }
        self.resize(next)?;
        Ok(true)
    }

    /// Resize both surfaces and repaint the last request
    pub fn resize(&mut self, dimensions: Dimensions) -> Result<()> {
        tracing::debug!(
            width = dimensions.width,
            height = dimensions.height,
            "Resizing chart surfaces"
        );
        self.dimensions = dimensions;
        self.repaint()
    }

    /// Replace whatever is drawn with `request`
    pub fn render(&mut self, request: RenderRequest) -> Result<RenderOutcome> {
        self.last_request = Some(request);
        self.repaint()?;
        Ok(self.last_outcome.unwrap_or(RenderOutcome::Skipped))
    }

    /// Forget the last request and blank both surfaces
    pub fn clear(&mut self) -> Result<()> {
        self.last_request = None;
        self.repaint()
    }

    fn repaint(&mut self) -> Result<()> {
        self.scene = SceneGraph::new(self.dimensions);
        self.raster = blank_buffer(self.dimensions);
        self.svg.clear();
        self.last_outcome = None;

        if self.dimensions.is_empty() {
            self.last_outcome = self.last_request.as_ref().map(|_| RenderOutcome::Skipped);
            return Ok(());
        }

        if let Some(request) = &self.last_request {
            let mut ctx = DrawContext::new(&mut self.scene, &self.config);
            self.last_outcome = Some(render::draw_request(request, &mut ctx));
        }

        self.svg = paint_vector(&self.scene, &self.config)?;
        paint_raster(&self.scene, &mut self.raster)?;
        Ok(())
    }

    pub fn last_request(&self) -> Option<&RenderRequest> {
        self.last_request.as_ref()
    }

    pub fn last_outcome(&self) -> Option<RenderOutcome> {
        self.last_outcome
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Raster marks of the current frame
    pub fn marks(&self) -> &[RasterCommand] {
        &self.scene.raster
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// RGB8 pixels, row-major
    pub fn raster(&self) -> &[u8] {
        &self.raster
    }

    /// Encode the raster layer as PNG
    pub fn png(&self) -> Result<Vec<u8>> {
        anyhow::ensure!(!self.dimensions.is_empty(), "Cannot encode a zero-area surface");
        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(
                    &self.raster,
                    self.dimensions.width,
                    self.dimensions.height,
                    image::ColorType::Rgb8,
                )
                .context("Failed to encode PNG")?;
        }
        Ok(png_bytes)
    }

    /// Topmost tooltip target under the pointer
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&HitRegion> {
        self.scene
            .hit_regions
            .iter()
            .rev()
            .find(|region| region.shape.contains((x, y)))
    }
}

fn blank_buffer(dimensions: Dimensions) -> Vec<u8> {
    vec![255u8; dimensions.width as usize * dimensions.height as usize * 3]
}

fn px((x, y): Point) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

/// Execute vector commands into an SVG document
fn paint_vector(scene: &SceneGraph, config: &RenderConfig) -> Result<String> {
    let dims = scene.dimensions;
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (dims.width, dims.height)).into_drawing_area();

        for command in &scene.vector {
            match command {
                VectorCommand::Line {
                    from,
                    to,
                    color,
                    width,
                } => {
                    root.draw(&PathElement::new(
                        vec![px(*from), px(*to)],
                        color.stroke_width(*width),
                    ))
                    .context("Failed to draw axis line")?;
                }
                VectorCommand::Text {
                    content,
                    at,
                    anchor,
                    size,
                    rotated,
                    ..
                } => {
                    let h_pos = match anchor {
                        TextAnchor::Start => HPos::Left,
                        TextAnchor::Middle => HPos::Center,
                        TextAnchor::End => HPos::Right,
                    };
                    let mut style = TextStyle::from((config.font_family.as_str(), *size).into_font())
                        .color(&TEXT_COLOR)
                        .pos(Pos::new(h_pos, VPos::Center));
                    if *rotated {
                        style = style.transform(FontTransform::Rotate270);
                    }
                    root.draw(&Text::new(content.as_str(), px(*at), style))
                        .context("Failed to draw text")?;
                }
            }
        }

        root.present().context("Failed to present vector surface")?;
    }
    Ok(buf)
}

/// Execute raster commands into an RGB buffer, white background first
fn paint_raster(scene: &SceneGraph, buffer: &mut [u8]) -> Result<()> {
    let dims = scene.dimensions;
    let root = BitMapBackend::with_buffer(buffer, (dims.width, dims.height)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill background")?;

    for command in &scene.raster {
        match command {
            RasterCommand::Rect { tl, br, color } => {
                root.draw(&Rectangle::new([px(*tl), px(*br)], color.filled()))
                    .context("Failed to draw bar")?;
            }
            RasterCommand::Path {
                points,
                color,
                width,
            } => {
                let points: Vec<(i32, i32)> = points.iter().map(|p| px(*p)).collect();
                root.draw(&PathElement::new(points, color.stroke_width(*width)))
                    .context("Failed to draw line")?;
            }
            RasterCommand::Circle {
                center,
                radius,
                color,
            } => {
                root.draw(&Circle::new(px(*center), *radius as i32, color.filled()))
                    .context("Failed to draw point")?;
            }
            RasterCommand::Polygon { points, color } => {
                let points: Vec<(i32, i32)> = points.iter().map(|p| px(*p)).collect();
                root.draw(&Polygon::new(points, color.filled()))
                    .context("Failed to draw slice")?;
            }
        }
    }

    root.present().context("Failed to present raster surface")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::dataset::PreparedRow;
    use crate::ir::{ChartTitles, HitShape, TextRole};

    fn bar_request(rows: Vec<PreparedRow>) -> RenderRequest {
        RenderRequest::new(ChartKind::Bar, rows, ChartTitles::new("T", "X", "Y"))
    }

    #[test]
    fn test_observation_disconnects_on_drop() {
        let observer = ResizeObserver::new();
        let observation = observer.observe("chart");
        assert_eq!(observer.observed_count(), 1);
        drop(observation);
        assert_eq!(observer.observed_count(), 0);
    }

    #[test]
    fn test_notifications_are_batched() {
        let observer = ResizeObserver::new();
        let observation = observer.observe("chart");
        observer.notify("chart", Dimensions::new(100, 100));
        observer.notify("other", Dimensions::new(1, 1));
        observer.notify("chart", Dimensions::new(300, 200));
        assert_eq!(observation.take_pending(), Some(Dimensions::new(300, 200)));
        assert_eq!(observation.take_pending(), None);
    }

    #[test]
    fn test_controller_drop_unobserves() {
        let observer = ResizeObserver::new();
        {
            let mut controller = HybridSurfaceController::new(RenderConfig::default(), Dimensions::new(10, 10));
            controller.observe(&observer, "chart");
            assert_eq!(observer.observed_count(), 1);
        }
        assert_eq!(observer.observed_count(), 0);
    }

    #[test]
    fn test_resize_repaints_last_request() {
        let observer = ResizeObserver::new();
        let mut controller = HybridSurfaceController::new(RenderConfig::default(), Dimensions::new(400, 300));
        controller.observe(&observer, "chart");
        controller.render(bar_request(vec![PreparedRow::new("a", 2.0)])).unwrap();

        observer.notify("chart", Dimensions::new(500, 250));
        observer.notify("chart", Dimensions::new(640, 480));
        assert!(controller.process_resize().unwrap());
        assert!(!controller.process_resize().unwrap());

        assert_eq!(controller.dimensions(), Dimensions::new(640, 480));
        assert_eq!(controller.scene().dimensions, Dimensions::new(640, 480));
        assert_eq!(controller.raster().len(), 640 * 480 * 3);
        assert_eq!(controller.marks().len(), 1);
        assert!(controller.svg().contains("640"));
    }

    #[test]
    fn test_render_replaces_previous_frame() {
        let mut controller = HybridSurfaceController::new(RenderConfig::default(), Dimensions::new(400, 300));
        let outcome = controller.render(bar_request(Vec::new())).unwrap();
        assert_eq!(outcome, RenderOutcome::Placeholder);
        assert!(controller.marks().is_empty());
        assert!(controller.raster().iter().all(|b| *b == 255));

        let rows = vec![PreparedRow::new("a", 1.0), PreparedRow::new("b", 2.0)];
        let outcome = controller.render(bar_request(rows)).unwrap();
        assert_eq!(outcome, RenderOutcome::Drawn);
        assert_eq!(controller.marks().len(), 2);
        assert!(!controller.scene().is_placeholder());
        assert!(controller.raster().iter().any(|b| *b != 255));

        controller.render(bar_request(Vec::new())).unwrap();
        assert!(controller.marks().is_empty());
        assert!(controller.raster().iter().all(|b| *b == 255));
        assert_eq!(controller.scene().texts(TextRole::Placeholder).count(), 1);
    }

    #[test]
    fn test_zero_area_draws_nothing() {
        let mut controller = HybridSurfaceController::new(RenderConfig::default(), Dimensions::new(0, 0));
        let outcome = controller.render(bar_request(vec![PreparedRow::new("a", 1.0)])).unwrap();
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(controller.svg().is_empty());
        assert!(controller.raster().is_empty());
        assert!(controller.png().is_err());
    }

    #[test]
    fn test_hit_test_returns_tooltip() {
        let mut controller = HybridSurfaceController::new(RenderConfig::default(), Dimensions::new(600, 400));
        controller
            .render(bar_request(vec![PreparedRow::new("a", 4.0)]))
            .unwrap();
        let region = controller.scene().hit_regions[0].clone();
        let HitShape::Rect { tl, br } = region.shape else {
            panic!("expected rect");
        };
        let hit = controller
            .hit_test((tl.0 + br.0) / 2.0, (tl.1 + br.1) / 2.0)
            .unwrap();
        assert_eq!(hit.label, "a");
        assert_eq!(hit.detail, "Y: 4");
        assert!(controller.hit_test(1.0, 1.0).is_none());
    }

    #[test]
    fn test_png_encodes() {
        let mut controller = HybridSurfaceController::new(RenderConfig::default(), Dimensions::new(200, 150));
        controller.render(bar_request(vec![PreparedRow::new("a", 1.0)])).unwrap();
        let png = controller.png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
