//! Fixed-width binary encodings for scalar and small aggregate values.
//!
//! Everything is little-endian. A [`Primitive`] knows its width and how to
//! move itself to and from bytes; the persister handles cursor movement and
//! truncation checks.

use glam::{Affine3A, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A value with a fixed-width wire encoding.
pub trait Primitive: Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Append the encoding of `self` to `out`.
    fn encode(self, out: &mut Vec<u8>);

    /// Decode from exactly [`Self::WIDTH`] bytes. Returns `None` when the
    /// bytes are not a valid encoding (e.g. a bool byte other than 0 or 1).
    fn decode(bytes: &[u8]) -> Option<Self>;
}

macro_rules! le_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Primitive for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn encode(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Option<Self> {
                    Some(<$ty>::from_le_bytes(bytes.try_into().ok()?))
                }
            }
        )+
    };
}

le_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Primitive for bool {
    const WIDTH: usize = 1;

    fn encode(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}

/// Decode `N` consecutive `f32`s.
fn decode_floats<const N: usize>(bytes: &[u8]) -> Option<[f32; N]> {
    if bytes.len() != N * 4 {
        return None;
    }
    let mut floats = [0.0f32; N];
    for (value, chunk) in floats.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::decode(chunk)?;
    }
    Some(floats)
}

fn encode_floats(floats: &[f32], out: &mut Vec<u8>) {
    for value in floats {
        value.encode(out);
    }
}

impl Primitive for Vec2 {
    const WIDTH: usize = 8;

    fn encode(self, out: &mut Vec<u8>) {
        encode_floats(&self.to_array(), out);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_floats::<2>(bytes).map(Vec2::from_array)
    }
}

impl Primitive for Vec3 {
    const WIDTH: usize = 12;

    fn encode(self, out: &mut Vec<u8>) {
        encode_floats(&self.to_array(), out);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_floats::<3>(bytes).map(Vec3::from_array)
    }
}

/// 3x4 affine transform: the three basis columns then the translation.
impl Primitive for Affine3A {
    const WIDTH: usize = 48;

    fn encode(self, out: &mut Vec<u8>) {
        encode_floats(&self.to_cols_array(), out);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_floats::<12>(bytes).map(|cols| Affine3A::from_cols_array(&cols))
    }
}

impl Primitive for Mat4 {
    const WIDTH: usize = 64;

    fn encode(self, out: &mut Vec<u8>) {
        encode_floats(&self.to_cols_array(), out);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_floats::<16>(bytes).map(|cols| Mat4::from_cols_array(&cols))
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Byte-packed RGBA color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ColorRgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_float(self) -> ColorRgbaF {
        ColorRgbaF::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

impl Primitive for ColorRgba {
    const WIDTH: usize = 4;

    fn encode(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.r, self.g, self.b, self.a]);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [r, g, b, a] => Some(Self::new(*r, *g, *b, *a)),
            _ => None,
        }
    }
}

/// Floating-point RGBA color, components nominally in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorRgbaF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgbaF {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Primitive for ColorRgbaF {
    const WIDTH: usize = 16;

    fn encode(self, out: &mut Vec<u8>) {
        encode_floats(&[self.r, self.g, self.b, self.a], out);
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_floats::<4>(bytes).map(|[r, g, b, a]| Self::new(r, g, b, a))
    }
}

/// RGBA color stored as four `u32` components, each in `0..=255`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ColorRgbaInt(pub ColorRgba);

impl Primitive for ColorRgbaInt {
    const WIDTH: usize = 16;

    fn encode(self, out: &mut Vec<u8>) {
        let c = self.0;
        for component in [c.r, c.g, c.b, c.a] {
            (component as u32).encode(out);
        }
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIDTH {
            return None;
        }
        let mut components = [0u8; 4];
        for (component, chunk) in components.iter_mut().zip(bytes.chunks_exact(4)) {
            *component = u8::try_from(u32::decode(chunk)?).ok()?;
        }
        let [r, g, b, a] = components;
        Some(Self(ColorRgba::new(r, g, b, a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T: Primitive>(value: T) -> Vec<u8> {
        let mut out = Vec::new();
        value.encode(&mut out);
        assert_eq!(out.len(), T::WIDTH);
        out
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(encoded(0x1234_5678u32), vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(encoded(-1i16), vec![0xFF, 0xFF]);
        assert_eq!(u32::decode(&[0x78, 0x56, 0x34, 0x12]), Some(0x1234_5678));
    }

    #[test]
    fn decode_rejects_wrong_width() {
        assert_eq!(u32::decode(&[1, 2, 3]), None);
        assert_eq!(Vec3::decode(&[0; 8]), None);
    }

    #[test]
    fn bool_accepts_only_zero_and_one() {
        assert_eq!(bool::decode(&[0]), Some(false));
        assert_eq!(bool::decode(&[1]), Some(true));
        assert_eq!(bool::decode(&[2]), None);
    }

    #[test]
    fn affine_transform_keeps_translation_last() {
        let transform = Affine3A::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let bytes = encoded(transform);
        let tail = Vec3::decode(&bytes[36..48]).unwrap();
        assert_eq!(tail, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Affine3A::decode(&bytes), Some(transform));
    }

    #[test]
    fn color_int_rejects_out_of_range_component() {
        let mut bytes = encoded(ColorRgbaInt(ColorRgba::new(1, 2, 3, 4)));
        assert_eq!(
            ColorRgbaInt::decode(&bytes),
            Some(ColorRgbaInt(ColorRgba::new(1, 2, 3, 4)))
        );
        bytes[0..4].copy_from_slice(&256u32.to_le_bytes());
        assert_eq!(ColorRgbaInt::decode(&bytes), None);
    }

    #[test]
    fn color_to_float_scales_components() {
        let c = ColorRgba::new(255, 0, 51, 255).to_float();
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-6);
    }
}
