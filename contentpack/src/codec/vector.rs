//! Parenthesized vector and quaternion encoding.
//!
//! Components are written with Rust's shortest round-trip float formatting,
//! so `parse(encode(v)) == v` holds exactly for finite values.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::{CodecError, Decoded};

/// A 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// A rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Quat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.x, self.y, self.z, self.w)
    }
}

/// A single float component: sign, digits with optional fraction, optional exponent.
const NUMBER: &str = r"\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*";

fn vec3_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&format!(r"^\({0},{0},{0}\)$", NUMBER)).unwrap())
}

fn quat_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&format!(r"^\({0},{0},{0},{0}\)$", NUMBER)).unwrap())
}

/// Capture `N` float components, or `None` if the text does not match.
fn components<const N: usize>(pattern: &Regex, text: &str) -> Option<[f32; N]> {
    let captures = pattern.captures(text.trim())?;
    let mut values = [0.0_f32; N];
    for (i, value) in values.iter_mut().enumerate() {
        *value = captures.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(values)
}

/// Encode a vector as `(x,y,z)`.
pub fn encode_vec3(v: &Vec3) -> String {
    v.to_string()
}

/// Encode a quaternion as `(x,y,z,w)`.
pub fn encode_quat(q: &Quat) -> String {
    q.to_string()
}

/// Parse `(x,y,z)`.
///
/// # Example
///
/// ```
/// use contentpack::codec::{parse_vec3, Vec3};
///
/// assert_eq!(parse_vec3("(1, -2.5, 3e2)").unwrap(), Vec3::new(1.0, -2.5, 300.0));
/// assert!(parse_vec3("(1,2)").is_err());
/// ```
pub fn parse_vec3(text: &str) -> Result<Vec3, CodecError> {
    components::<3>(vec3_pattern(), text)
        .map(|[x, y, z]| Vec3::new(x, y, z))
        .ok_or_else(|| CodecError::InvalidVector(text.to_string()))
}

/// Parse `(x,y,z,w)`.
pub fn parse_quat(text: &str) -> Result<Quat, CodecError> {
    components::<4>(quat_pattern(), text)
        .map(|[x, y, z, w]| Quat::new(x, y, z, w))
        .ok_or_else(|| CodecError::InvalidQuaternion(text.to_string()))
}

/// Decode a vector, keeping `prior` when the text is malformed.
pub fn decode_vec3_or(text: &str, prior: Vec3) -> Decoded<Vec3> {
    match parse_vec3(text) {
        Ok(v) => Decoded::parsed(v),
        Err(e) => Decoded::kept(prior, e),
    }
}

/// Decode a quaternion, keeping `prior` when the text is malformed.
pub fn decode_quat_or(text: &str, prior: Quat) -> Decoded<Quat> {
    match parse_quat(text) {
        Ok(q) => Decoded::parsed(q),
        Err(e) => Decoded::kept(prior, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_vec3() {
        assert_eq!(encode_vec3(&Vec3::new(1.0, -0.25, 100.0)), "(1,-0.25,100)");
        assert_eq!(encode_vec3(&Vec3::ZERO), "(0,0,0)");
    }

    #[test]
    fn test_encode_quat() {
        assert_eq!(encode_quat(&Quat::IDENTITY), "(0,0,0,1)");
    }

    #[test]
    fn test_parse_vec3_accepts_whitespace_and_exponents() {
        let v = parse_vec3(" ( 1.5 , -2 , 1e-3 ) ").unwrap();
        assert_eq!(v, Vec3::new(1.5, -2.0, 0.001));
    }

    #[test]
    fn test_parse_vec3_accepts_bare_fractions() {
        let v = parse_vec3("(.5,5.,+1)").unwrap();
        assert_eq!(v, Vec3::new(0.5, 5.0, 1.0));
    }

    #[test]
    fn test_parse_vec3_rejects_wrong_arity() {
        assert!(parse_vec3("(1,2)").is_err());
        assert!(parse_vec3("(1,2,3,4)").is_err());
        assert!(parse_vec3("1,2,3").is_err());
        assert!(parse_vec3("(a,b,c)").is_err());
    }

    #[test]
    fn test_parse_quat_rejects_vector() {
        assert_eq!(
            parse_quat("(1,2,3)"),
            Err(CodecError::InvalidQuaternion("(1,2,3)".to_string()))
        );
    }

    #[test]
    fn test_decode_quat_or_keeps_prior() {
        let prior = Quat::new(0.0, 1.0, 0.0, 0.0);
        let decoded = decode_quat_or("(nan)", prior);
        assert_eq!(decoded.value, prior);
        assert!(decoded.used_fallback());
    }

    #[test]
    fn test_negative_zero_survives() {
        let v = parse_vec3(&encode_vec3(&Vec3::new(-0.0, 0.0, 0.0))).unwrap();
        assert!(v.x.is_sign_negative());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_vec3_roundtrip_exact(
                x in proptest::num::f32::NORMAL | proptest::num::f32::ZERO,
                y in proptest::num::f32::NORMAL | proptest::num::f32::ZERO,
                z in proptest::num::f32::NORMAL | proptest::num::f32::SUBNORMAL,
            ) {
                let v = Vec3::new(x, y, z);
                let decoded = parse_vec3(&encode_vec3(&v))?;
                prop_assert_eq!(decoded.x.to_bits(), x.to_bits());
                prop_assert_eq!(decoded.y.to_bits(), y.to_bits());
                prop_assert_eq!(decoded.z.to_bits(), z.to_bits());
            }

            #[test]
            fn test_quat_roundtrip_exact(
                x in -1.0..=1.0_f32,
                y in -1.0..=1.0_f32,
                z in -1.0..=1.0_f32,
                w in -1.0..=1.0_f32,
            ) {
                let q = Quat::new(x, y, z, w);
                prop_assert_eq!(parse_quat(&encode_quat(&q))?, q);
            }
        }
    }
}
