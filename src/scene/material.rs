//! Surface appearance data: materials, textures and decoded images.

use std::sync::Arc;

use glam::{Vec2, Vec3};

/// Classic fixed-function surface material.
#[derive(Debug, Clone)]
pub struct Material {
    pub ambient_intensity: f32,
    pub diffuse_color: Vec3,
    pub emissive_color: Vec3,
    pub specular_color: Vec3,
    pub specular_exponent: f32,
    pub transparency: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.2,
            diffuse_color: Vec3::splat(0.8),
            emissive_color: Vec3::ZERO,
            specular_color: Vec3::ZERO,
            specular_exponent: 25.0,
            transparency: 0.0,
        }
    }
}

/// A decoded RGBA8 image. Shared between every texture that references the
/// same URI within one reader.
#[derive(Debug, Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// 2D transform applied to texture coordinates.
#[derive(Debug, Clone)]
pub struct TextureTransform {
    pub center: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub translation: Vec2,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            translation: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub image: Arc<Image>,
    pub repeat_s: bool,
    pub repeat_t: bool,
    pub transform: TextureTransform,
}

impl Texture {
    #[must_use]
    pub fn new(image: Arc<Image>) -> Self {
        Self {
            image,
            repeat_s: true,
            repeat_t: true,
            transform: TextureTransform::default(),
        }
    }
}
