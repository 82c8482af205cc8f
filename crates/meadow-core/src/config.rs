//! Viewer configuration
//!
//! Every section falls back to its defaults, so an empty document (or no
//! document at all) yields a working viewer. The browser build fetches an
//! optional `viewer.toml` before starting and applies URL query overrides on
//! top.

use serde::{Deserialize, Serialize};

use crate::framing::FramingOptions;

/// Top-level viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub ground_filter: GroundFilterConfig,
    #[serde(default)]
    pub ground: GroundConfig,
}

impl ViewerConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between neighbouring bounding boxes in the row
    #[serde(default = "default_gap")]
    pub gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { gap: default_gap() }
    }
}

fn default_gap() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view
    #[serde(default = "default_fov_degrees")]
    pub fov_degrees: f32,
    /// Framing padding for a single box
    #[serde(default = "default_padding")]
    pub padding: f32,
    /// Framing padding for the arranged row
    #[serde(default = "default_row_padding")]
    pub row_padding: f32,
    /// Orbit speed while auto-rotate is on, radians per second
    #[serde(default = "default_auto_rotate_speed")]
    pub auto_rotate_speed: f32,
    /// Mouse drag sensitivity, radians per pixel
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_smooth_factor")]
    pub smooth_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov_degrees(),
            padding: default_padding(),
            row_padding: default_row_padding(),
            auto_rotate_speed: default_auto_rotate_speed(),
            sensitivity: default_sensitivity(),
            zoom_speed: default_zoom_speed(),
            smooth_factor: default_smooth_factor(),
        }
    }
}

impl CameraConfig {
    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    /// Framing for `model_count` arranged models: a lone model gets the
    /// single-box padding, a row gets the wider row padding
    pub fn framing_options(&self, model_count: usize) -> FramingOptions {
        FramingOptions {
            vertical_fov: self.fov_radians(),
            padding: if model_count > 1 { self.row_padding } else { self.padding },
        }
    }
}

fn default_fov_degrees() -> f32 {
    50.0
}

fn default_padding() -> f32 {
    1.25
}

fn default_row_padding() -> f32 {
    1.35
}

fn default_auto_rotate_speed() -> f32 {
    // One revolution every ~5.5 minutes
    0.0188
}

fn default_sensitivity() -> f32 {
    0.005
}

fn default_zoom_speed() -> f32 {
    0.1
}

fn default_smooth_factor() -> f32 {
    0.15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Files beyond this count in a single batch are ignored
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    /// Accepted extensions, without the dot, compared case-insensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
            extensions: default_extensions(),
        }
    }
}

fn default_max_batch() -> usize {
    30
}

fn default_extensions() -> Vec<String> {
    vec!["glb".to_string(), "gltf".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Directory holding `manifest.json` and the models it lists
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
        }
    }
}

impl ManifestConfig {
    pub fn manifest_url(&self) -> String {
        format!("{}/manifest.json", self.models_dir.trim_end_matches('/'))
    }
}

fn default_models_dir() -> String {
    "./models".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    #[serde(default = "default_hemi_base")]
    pub hemi_base: f32,
    #[serde(default = "default_fill_base")]
    pub fill_base: f32,
    #[serde(default = "default_sun_base")]
    pub sun_base: f32,
    /// Radius of the circle the sun travels on
    #[serde(default = "default_sun_radius")]
    pub sun_radius: f32,
    #[serde(default = "default_sun_height")]
    pub sun_height: f32,
    /// Initial value of the intensity slider
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    /// Initial value of the sun angle slider, degrees
    #[serde(default = "default_sun_angle")]
    pub sun_angle_degrees: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            hemi_base: default_hemi_base(),
            fill_base: default_fill_base(),
            sun_base: default_sun_base(),
            sun_radius: default_sun_radius(),
            sun_height: default_sun_height(),
            intensity: default_intensity(),
            sun_angle_degrees: default_sun_angle(),
        }
    }
}

fn default_hemi_base() -> f32 {
    1.15
}

fn default_fill_base() -> f32 {
    0.65
}

fn default_sun_base() -> f32 {
    1.25
}

fn default_sun_radius() -> f32 {
    60.0
}

fn default_sun_height() -> f32 {
    30.0
}

fn default_intensity() -> f32 {
    1.0
}

fn default_sun_angle() -> f32 {
    45.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundFilterConfig {
    /// Meshes thinner than this (vertical extent) count as flat
    #[serde(default = "default_max_thickness")]
    pub max_thickness: f32,
    /// Both horizontal extents must exceed this
    #[serde(default = "default_min_span")]
    pub min_span: f32,
    /// Vertical center must lie within this distance of y = 0
    #[serde(default = "default_max_center_height")]
    pub max_center_height: f32,
}

impl Default for GroundFilterConfig {
    fn default() -> Self {
        Self {
            max_thickness: default_max_thickness(),
            min_span: default_min_span(),
            max_center_height: default_max_center_height(),
        }
    }
}

fn default_max_thickness() -> f32 {
    0.15
}

fn default_min_span() -> f32 {
    25.0
}

fn default_max_center_height() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Edge length of the square ground plane
    #[serde(default = "default_ground_size")]
    pub size: f32,
    /// Edge length of the generated grass texture, pixels
    #[serde(default = "default_texture_size")]
    pub texture_size: u32,
    /// Texture repetitions across the plane
    #[serde(default = "default_texture_repeat")]
    pub texture_repeat: f32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Grid cell count across the plane
    #[serde(default = "default_grid_divisions")]
    pub grid_divisions: u32,
    #[serde(default = "default_axes_length")]
    pub axes_length: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            size: default_ground_size(),
            texture_size: default_texture_size(),
            texture_repeat: default_texture_repeat(),
            seed: default_seed(),
            grid_divisions: default_grid_divisions(),
            axes_length: default_axes_length(),
        }
    }
}

fn default_ground_size() -> f32 {
    100.0
}

fn default_texture_size() -> u32 {
    256
}

fn default_texture_repeat() -> f32 {
    8.0
}

fn default_seed() -> u64 {
    0x6d65_6164
}

fn default_grid_divisions() -> u32 {
    100
}

fn default_axes_length() -> f32 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.layout.gap, 1.0);
        assert_eq!(config.import.max_batch, 30);
        assert_eq!(config.camera.row_padding, 1.35);
        assert_eq!(config.ground_filter.min_span, 25.0);
    }

    #[test]
    fn test_partial_override() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [camera]
            fov_degrees = 60.0

            [import]
            max_batch = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.fov_degrees, 60.0);
        // Untouched keys in a present section keep their defaults
        assert_eq!(config.camera.padding, 1.25);
        assert_eq!(config.import.max_batch, 5);
        assert_eq!(config.import.extensions, vec!["glb", "gltf"]);
    }

    #[test]
    fn test_manifest_url() {
        let mut manifest = ManifestConfig::default();
        assert_eq!(manifest.manifest_url(), "./models/manifest.json");
        manifest.models_dir = "https://cdn.example.com/assets/".to_string();
        assert_eq!(
            manifest.manifest_url(),
            "https://cdn.example.com/assets/manifest.json"
        );
    }

    #[test]
    fn test_framing_padding_by_model_count() {
        let camera = CameraConfig::default();
        assert_eq!(camera.framing_options(1).padding, 1.25);
        assert_eq!(camera.framing_options(2).padding, 1.35);
        assert!((camera.framing_options(3).vertical_fov - 50f32.to_radians()).abs() < 1e-6);
    }
}
