//! Report configuration: page setup, titles and the color scheme.
//!
//! Every field has a default matching the stock report (grey header with
//! whitesmoke bold text, beige body, light-coral mismatch highlight, black
//! grid, legal landscape pages), so a YAML file only needs the keys it wants
//! to change:
//!
//! ```yaml
//! title: Nightly reconciliation
//! page_size: a4
//! orientation: portrait
//! mismatch_background: "#ffcc00"
//! ```

use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, de};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_GREY: Color = Color::rgb(211, 211, 211);
    pub const WHITESMOKE: Color = Color::rgb(245, 245, 245);
    pub const BEIGE: Color = Color::rgb(245, 245, 220);
    pub const LIGHT_CORAL: Color = Color::rgb(240, 128, 128);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to the 0..=1 range used by PDF color operators.
    pub fn unit_components(&self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            ensure!(
                hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
                "Color '{value}' must use the #RRGGBB form"
            );
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16)
                    .with_context(|| format!("Parsing color '{value}'"))
            };
            return Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?));
        }
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "grey" | "gray" => Color::GREY,
            "lightgrey" | "lightgray" => Color::LIGHT_GREY,
            "whitesmoke" => Color::WHITESMOKE,
            "beige" => Color::BEIGE,
            "lightcoral" => Color::LIGHT_CORAL,
            "red" => Color::RED,
            "yellow" => Color::YELLOW,
            _ => return Err(anyhow!("Unknown color '{value}'")),
        };
        Ok(named)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Color::from_str(&raw).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PageSize {
    Letter,
    Legal,
    A4,
    A3,
}

impl PageSize {
    /// Portrait width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub title: String,
    pub summary_heading: String,
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin: f32,
    pub font_size: f32,
    pub header_background: Color,
    pub header_text: Color,
    pub body_background: Color,
    pub mismatch_background: Color,
    pub grid_color: Color,
    pub grid_width: f32,
    pub header_bottom_padding: f32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Comparison Report".to_string(),
            summary_heading: "Mismatched Values".to_string(),
            page_size: PageSize::Legal,
            orientation: Orientation::Landscape,
            margin: 72.0,
            font_size: 10.0,
            header_background: Color::GREY,
            header_text: Color::WHITESMOKE,
            body_background: Color::BEIGE,
            mismatch_background: Color::LIGHT_CORAL,
            grid_color: Color::BLACK,
            grid_width: 1.0,
            header_bottom_padding: 12.0,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening report config {path:?}"))?;
        let reader = BufReader::new(file);
        let config: ReportConfig =
            serde_yaml::from_reader(reader).context("Parsing report config YAML")?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        let measures = [
            ("font_size", self.font_size),
            ("margin", self.margin),
            ("grid_width", self.grid_width),
            ("header_bottom_padding", self.header_bottom_padding),
        ];
        for (name, value) in measures {
            ensure!(value.is_finite(), "{name} must be a finite number, got {value}");
        }
        ensure!(self.font_size > 0.0, "Font size must be positive");
        ensure!(self.margin >= 0.0, "Margin cannot be negative");
        ensure!(self.grid_width >= 0.0, "Grid width cannot be negative");
        ensure!(
            self.header_bottom_padding >= 0.0,
            "Header bottom padding cannot be negative"
        );
        let (width, height) = self.page_dimensions();
        ensure!(
            self.margin * 2.0 < width.min(height),
            "Margin of {} leaves no room on a {:?} page",
            self.margin,
            self.page_size
        );
        Ok(())
    }

    /// Width and height in points after applying the orientation.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (short, long) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (short, long),
            Orientation::Landscape => (long, short),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_hex_and_named_forms() {
        assert_eq!("#F08080".parse::<Color>().unwrap(), Color::LIGHT_CORAL);
        assert_eq!("Beige".parse::<Color>().unwrap(), Color::BEIGE);
        assert!("#12345".parse::<Color>().is_err());
        assert!("mauve".parse::<Color>().is_err());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: ReportConfig =
            serde_yaml::from_str("title: Nightly\npage_size: a4\norientation: portrait\n")
                .expect("parse");
        assert_eq!(config.title, "Nightly");
        assert_eq!(config.page_dimensions(), (595.28, 841.89));
        assert_eq!(config.mismatch_background, Color::LIGHT_CORAL);
        assert_eq!(config.summary_heading, "Mismatched Values");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = serde_yaml::from_str::<ReportConfig>("colour: red\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn default_page_is_legal_landscape() {
        assert_eq!(ReportConfig::default().page_dimensions(), (1008.0, 612.0));
    }

    #[test]
    fn oversized_margin_is_invalid() {
        let config = ReportConfig {
            margin: 400.0,
            ..ReportConfig::default()
        };
        assert!(config.ensure_valid().is_err());
    }

    #[test]
    fn non_finite_measures_are_invalid() {
        let config: ReportConfig =
            serde_yaml::from_str("header_bottom_padding: .nan\n").expect("parse");
        let err = config.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("header_bottom_padding"), "{err}");

        let config: ReportConfig = serde_yaml::from_str("font_size: .inf\n").expect("parse");
        let err = config.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("font_size"), "{err}");
    }

    #[test]
    fn negative_header_padding_is_invalid() {
        let config = ReportConfig {
            header_bottom_padding: -1.0,
            ..ReportConfig::default()
        };
        assert!(config.ensure_valid().is_err());
        assert!(ReportConfig::default().ensure_valid().is_ok());
    }
}
