//! Fixed-point math for the combat simulation.
//!
//! Timers, stability, mana, the collision point and every position are
//! [`Fixed`] so a seeded fight replays bit-for-bit on any CPU.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math (32.32).
pub type Fixed = I32F32;

/// Build a [`Fixed`] from a decimal literal.
///
/// Only used for tunables and tests; the conversion itself is deterministic.
#[must_use]
pub fn fx(value: f64) -> Fixed {
    Fixed::from_num(value)
}

/// Raw-bits serde for [`Fixed`], used in snapshots and events.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write the raw `i64` bits.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_bits().serialize(serializer)
    }

    /// Read the raw `i64` bits.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        i64::deserialize(deserializer).map(Fixed::from_bits)
    }
}

/// Raw-bits serde for maps with [`Fixed`] values.
pub mod fixed_map_serde {
    use std::collections::BTreeMap;

    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write each value as its raw `i64` bits.
    pub fn serialize<K, S>(map: &BTreeMap<K, Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(key, value)| (key, value.to_bits())))
    }

    /// Read raw `i64` bits back into a map.
    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, Fixed>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        D: Deserializer<'de>,
    {
        let bits = BTreeMap::<K, i64>::deserialize(deserializer)?;
        Ok(bits
            .into_iter()
            .map(|(key, raw)| (key, Fixed::from_bits(raw)))
            .collect())
    }
}

/// Decimal serde for [`Fixed`], used in hand-edited balance tables.
///
/// Values are written as `2.5` and rounded to the nearest fixed-point value
/// when loaded.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write as an `f64`.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Read an `f64`, rejecting values outside the fixed range.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of fixed range")))
    }
}

/// Point or direction in arena pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Origin.
    pub const ZERO: Self = Self::new(Fixed::ZERO, Fixed::ZERO);

    /// Create a vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer pixel coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Squared distance, for radius checks without a square root.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        sqrt(self.distance_squared(other))
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        self.distance(Self::ZERO)
    }

    /// Multiply both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Unit vector in the same direction; zero stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Point `t` of the way from `self` to `to`.
    #[must_use]
    pub fn lerp(self, to: Self, t: Fixed) -> Self {
        self + (to - self).scale(t)
    }
}

/// Square root by bisection; 64 halvings pin every fractional bit.
fn sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    let mut low = Fixed::ZERO;
    let mut high = value.max(Fixed::ONE);
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid.saturating_mul(mid) <= value {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Fixed, b: Fixed) -> bool {
        (a - b).abs() < fx(0.0001)
    }

    #[test]
    fn test_staff_to_node_distance() {
        let staff = Vec2Fixed::from_ints(0, 0);
        let node = Vec2Fixed::from_ints(30, 40);
        assert_eq!(staff.distance_squared(node), fx(2500.0));
        assert!(close(staff.distance(node), fx(50.0)));
    }

    #[test]
    fn test_normalize_gives_unit_direction() {
        let dir = Vec2Fixed::from_ints(-3, 4).normalize();
        assert!(close(dir.length(), Fixed::ONE));
        assert!(close(dir.x, fx(-0.6)));
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_lerp_endpoints_and_midpoint() {
        let a = Vec2Fixed::from_ints(100, 200);
        let b = Vec2Fixed::from_ints(300, 100);
        assert_eq!(a.lerp(b, Fixed::ZERO), a);
        assert_eq!(a.lerp(b, Fixed::ONE), b);
        assert_eq!(a.lerp(b, fx(0.5)), Vec2Fixed::from_ints(200, 150));
    }

    #[test]
    fn test_sqrt_of_small_values() {
        assert!(close(sqrt(fx(0.25)), fx(0.5)));
        assert_eq!(sqrt(fx(-4.0)), Fixed::ZERO);
    }

    #[test]
    fn test_decimal_serde_reads_written_value() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "decimal_serde")]
            value: Fixed,
        }

        let text = ron::to_string(&Wrapper { value: fx(2.5) }).unwrap();
        assert!(text.contains("2.5"));
        let back: Wrapper = ron::from_str(&text).unwrap();
        assert_eq!(back.value, fx(2.5));
    }
}
