//! Light node data.

use std::f32::consts::FRAC_PI_4;

use glam::Vec3;

/// Fields shared by every light kind.
#[derive(Debug, Clone)]
pub struct LightCommon {
    pub on: bool,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient_intensity: f32,
}

impl Default for LightCommon {
    fn default() -> Self {
        Self {
            on: true,
            color: Vec3::ONE,
            intensity: 1.0,
            ambient_intensity: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub common: LightCommon,
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            common: LightCommon::default(),
            direction: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotLight {
    pub common: LightCommon,
    pub direction: Vec3,
    /// Cone angle within which the light is at full intensity.
    pub beam_width: f32,
    /// Cone angle beyond which nothing is lit.
    pub cut_off_angle: f32,
    pub cut_off_exponent: f32,
    /// Constant, linear and quadratic attenuation factors.
    pub attenuation: [f32; 3],
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            common: LightCommon::default(),
            direction: Vec3::new(0.0, 0.0, -1.0),
            beam_width: FRAC_PI_4,
            cut_off_angle: FRAC_PI_4,
            cut_off_exponent: 1.0,
            attenuation: [1.0, 0.0, 0.0],
        }
    }
}
