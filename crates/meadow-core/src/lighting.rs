//! Light rig derived from the two lighting sliders

use glam::Vec3;

use crate::config::LightingConfig;

/// Slider values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingControls {
    /// Multiplier applied to every light
    pub intensity: f32,
    /// Sun azimuth in degrees, measured from +X towards +Z
    pub sun_angle_degrees: f32,
}

impl From<&LightingConfig> for LightingControls {
    fn from(config: &LightingConfig) -> Self {
        Self {
            intensity: config.intensity,
            sun_angle_degrees: config.sun_angle_degrees,
        }
    }
}

/// Intensities (unitless, relative to the base constants) and sun placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub hemi_intensity: f32,
    pub fill_intensity: f32,
    pub sun_intensity: f32,
    pub sun_position: Vec3,
    /// Point the sun is aimed at
    pub sun_target: Vec3,
}

impl LightRig {
    /// Compute the full rig from the slider values. Pure: no state is kept
    /// between calls.
    pub fn compute(controls: LightingControls, config: &LightingConfig) -> Self {
        let angle = controls.sun_angle_degrees.to_radians();

        Self {
            hemi_intensity: config.hemi_base * controls.intensity,
            fill_intensity: config.fill_base * controls.intensity,
            sun_intensity: config.sun_base * controls.intensity,
            sun_position: Vec3::new(
                angle.cos() * config.sun_radius,
                config.sun_height,
                angle.sin() * config.sun_radius,
            ),
            sun_target: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_intensities_scale_bases() {
        let config = LightingConfig::default();
        let rig = LightRig::compute(
            LightingControls {
                intensity: 2.0,
                sun_angle_degrees: 0.0,
            },
            &config,
        );
        assert!((rig.hemi_intensity - 2.30).abs() < EPS);
        assert!((rig.fill_intensity - 1.30).abs() < EPS);
        assert!((rig.sun_intensity - 2.50).abs() < EPS);
    }

    #[test]
    fn test_sun_on_circle() {
        let config = LightingConfig::default();
        let rig = LightRig::compute(
            LightingControls {
                intensity: 1.0,
                sun_angle_degrees: 90.0,
            },
            &config,
        );
        assert!(rig.sun_position.x.abs() < EPS);
        assert!((rig.sun_position.y - 30.0).abs() < EPS);
        assert!((rig.sun_position.z - 60.0).abs() < EPS);
        assert_eq!(rig.sun_target, Vec3::ZERO);

        let horizontal = Vec3::new(rig.sun_position.x, 0.0, rig.sun_position.z).length();
        assert!((horizontal - 60.0).abs() < EPS);
    }

    #[test]
    fn test_pure_regardless_of_history() {
        let config = LightingConfig::default();
        let controls = LightingControls {
            intensity: 0.7,
            sun_angle_degrees: 210.0,
        };
        let before = LightRig::compute(controls, &config);
        for angle in [0.0, 45.0, 359.0] {
            LightRig::compute(
                LightingControls {
                    intensity: 3.0,
                    sun_angle_degrees: angle,
                },
                &config,
            );
        }
        assert_eq!(LightRig::compute(controls, &config), before);
    }
}
