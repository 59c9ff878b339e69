//! Render configuration – page geometry, rasterisation scale and asset
//! fetching knobs shared by every composer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocError, Result};

/// CSS pixels per millimetre at 96 dpi. Rich-text content is laid out at this
/// density before rasterisation.
pub const PX_PER_MM: f32 = 3.779_527_6;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Configuration for one PDF generation. All lengths are millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Page width (default: A4 = 210).
    pub page_width: f32,
    /// Page height (default: A4 = 297).
    pub page_height: f32,
    pub orientation: PageOrientation,
    /// Left and right margin.
    pub margin_x: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// Multiplier applied to the CSS-pixel surface when rasterising HTML
    /// content (2.0 renders at 192 dpi).
    pub raster_scale: f32,
    /// JPEG quality (1–100) for paginated content slices.
    pub jpeg_quality: u8,
    /// Timeout for remote image fetches. `None` waits indefinitely.
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            orientation: PageOrientation::Portrait,
            margin_x: 15.0,
            margin_top: 20.0,
            margin_bottom: 20.0,
            raster_scale: 2.0,
            jpeg_quality: 85,
            fetch_timeout_secs: None,
        }
    }
}

impl RenderConfig {
    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_width,
            PageOrientation::Landscape => self.page_height,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_height,
            PageOrientation::Landscape => self.page_width,
        }
    }

    /// Width available to body content between the side margins.
    pub fn content_width(&self) -> f32 {
        self.effective_width() - 2.0 * self.margin_x
    }

    /// US Letter (215.9 × 279.4 mm) with default margins.
    pub fn letter() -> Self {
        Self {
            page_width: 215.9,
            page_height: 279.4,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self> {
        toml::from_str(s).map_err(|source| DocError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_a4_portrait() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.effective_width(), 210.0);
        assert_eq!(cfg.effective_height(), 297.0);
        assert_eq!(cfg.content_width(), 180.0);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let cfg = RenderConfig {
            orientation: PageOrientation::Landscape,
            ..RenderConfig::default()
        };
        assert_eq!(cfg.effective_width(), 297.0);
        assert_eq!(cfg.effective_height(), 210.0);
    }

    #[test]
    fn landscape_from_toml_reaches_the_layout() {
        use crate::assets::DefaultAssetLoader;
        use crate::compose::compose_document;
        use crate::document::{DocumentRecord, Note, Profile};

        let cfg = RenderConfig::from_toml_str(
            "orientation = \"landscape\"\n",
            &PathBuf::from("render.toml"),
        )
        .unwrap();
        assert_eq!(cfg.orientation, PageOrientation::Landscape);
        let layout = compose_document(
            &DocumentRecord::Note(Note::default()),
            &Profile::default(),
            &cfg,
            &DefaultAssetLoader::default(),
        )
        .unwrap();
        assert_eq!((layout.page_width_mm, layout.page_height_mm), (297.0, 210.0));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = RenderConfig::from_toml_str(
            "margin_x = 20.0\nfetch_timeout_secs = 5\n",
            &PathBuf::from("render.toml"),
        )
        .unwrap();
        assert_eq!(cfg.margin_x, 20.0);
        assert_eq!(cfg.fetch_timeout_secs, Some(5));
        assert_eq!(cfg.page_height, 297.0);
        assert_eq!(cfg.raster_scale, 2.0);
    }

    #[test]
    fn letter_size_from_toml() {
        let cfg = RenderConfig::from_toml_str(
            "page_width = 215.9\npage_height = 279.4\n",
            &PathBuf::from("render.toml"),
        )
        .unwrap();
        assert_eq!(cfg, RenderConfig::letter());
        assert!((cfg.content_width() - (215.9 - 2.0 * cfg.margin_x)).abs() < 1e-4);
    }

    #[test]
    fn malformed_toml_reports_path() {
        let err = RenderConfig::from_toml_str("margin_x = [", &PathBuf::from("bad.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
