// Render and preparation settings, all defaulted

use anyhow::{Context, Result};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 40,
            right: 20,
            bottom: 60,
            left: 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub margin: Margin,
    #[serde(default = "default_point_radius")]
    pub point_radius: u32,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_title_size")]
    pub title_font_size: f64,
    #[serde(default = "default_label_size")]
    pub label_font_size: f64,
    #[serde(default = "default_tick_size")]
    pub tick_font_size: f64,
    #[serde(default = "default_tick_count")]
    pub tick_count: usize,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_point_radius() -> u32 { 4 }
fn default_line_width() -> u32 { 2 }
fn default_font_family() -> String { "sans-serif".to_string() }
fn default_title_size() -> f64 { 18.0 }
fn default_label_size() -> f64 { 14.0 }
fn default_tick_size() -> f64 { 11.0 }
fn default_tick_count() -> usize { 10 }
fn default_placeholder() -> String { "No data available for the selected columns.".to_string() }

fn default_palette() -> Vec<String> {
    ["#e76e50", "#2a9d90", "#274754", "#e8c468", "#f4a462"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            point_radius: default_point_radius(),
            line_width: default_line_width(),
            palette: default_palette(),
            font_family: default_font_family(),
            title_font_size: default_title_size(),
            label_font_size: default_label_size(),
            tick_font_size: default_tick_size(),
            tick_count: default_tick_count(),
            placeholder: default_placeholder(),
        }
    }
}

impl RenderConfig {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Failed to parse render config")
    }

    /// Palette colour for a row index, cycling
    pub fn palette_color(&self, index: usize) -> RGBColor {
        if self.palette.is_empty() {
            return parse_color(None);
        }
        parse_color(Some(&self.palette[index % self.palette.len()]))
    }
}

/// Settings for the in-memory data preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

fn default_top_n() -> usize { 15 }
fn default_seed() -> u64 { 42 }

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            random_seed: default_seed(),
        }
    }
}

/// Parse a colour name or `#rrggbb` hex string, falling back to blue
pub fn parse_color(color: Option<&str>) -> RGBColor {
    use plotters::style::{BLACK, BLUE, CYAN, GREEN, MAGENTA, RED, WHITE, YELLOW};

    match color {
        Some("red") => RED,
        Some("green") => GREEN,
        Some("blue") => BLUE,
        Some("black") => BLACK,
        Some("yellow") => YELLOW,
        Some("cyan") => CYAN,
        Some("magenta") => MAGENTA,
        Some("white") => WHITE,
        Some(hex) if hex.len() == 7 && hex.is_ascii() && hex.starts_with('#') => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            match (channel(1), channel(3), channel(5)) {
                (Ok(r), Ok(g), Ok(b)) => RGBColor(r, g, b),
                _ => BLUE,
            }
        }
        _ => BLUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = RenderConfig::from_json("{}").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.margin.left, 70);
        assert_eq!(config.palette.len(), 5);
    }

    #[test]
    fn test_partial_override() {
        let config = RenderConfig::from_json(r#"{"point_radius": 7, "palette": ["red"]}"#).unwrap();
        assert_eq!(config.point_radius, 7);
        assert_eq!(config.palette_color(3), RGBColor(255, 0, 0));
        assert_eq!(config.tick_count, 10);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color(Some("#2a9d90")), RGBColor(0x2a, 0x9d, 0x90));
        assert_eq!(parse_color(Some("#zzzzzz")), RGBColor(0, 0, 255));
        assert_eq!(parse_color(None), RGBColor(0, 0, 255));
    }

    #[test]
    fn test_palette_cycles() {
        let config = RenderConfig::default();
        assert_eq!(config.palette_color(0), config.palette_color(5));
        assert_ne!(config.palette_color(0), config.palette_color(1));
    }
}
