//! Color

use std::ops::{Index, IndexMut};

use orrery_geom::{ScalarArray, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    pub const fn black() -> Color {
        Color::rgb(0.0, 0.0, 0.0)
    }

    pub const fn white() -> Color {
        Color::rgb(1.0, 1.0, 1.0)
    }

    pub const fn grey() -> Color {
        Color::rgb(0.5, 0.5, 0.5)
    }

    pub const fn red() -> Color {
        Color::rgb(1.0, 0.0, 0.0)
    }

    pub const fn green() -> Color {
        Color::rgb(0.0, 1.0, 0.0)
    }

    pub const fn blue() -> Color {
        Color::rgb(0.0, 0.0, 1.0)
    }

    pub const fn yellow() -> Color {
        Color::rgb(1.0, 1.0, 0.0)
    }

    pub const fn with_alpha(self, a: f32) -> Color {
        Color::rgba(self.r, self.g, self.b, a)
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 1.0
    }
}

impl ScalarArray for Color {
    type Scalar = f32;

    fn scalar_count() -> usize {
        4
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

impl Index<usize> for Color {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.r,
            1 => &self.g,
            2 => &self.b,
            3 => &self.a,
            _ => panic!("Color index {} out of range", index),
        }
    }
}

impl IndexMut<usize> for Color {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.r,
            1 => &mut self.g,
            2 => &mut self.b,
            3 => &mut self.a,
            _ => panic!("Color index {} out of range", index),
        }
    }
}

impl Into<[f32; 3]> for Color {
    fn into(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Into<[f32; 4]> for Color {
    fn into(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Into<Vec3> for Color {
    fn into(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }
}

impl From<[f32; 4]> for Color {
    fn from(a: [f32; 4]) -> Self {
        Color::rgba(a[0], a[1], a[2], a[3])
    }
}

impl From<Vec3> for Color {
    fn from(v: Vec3) -> Self {
        Color::rgb(v.x, v.y, v.z)
    }
}
