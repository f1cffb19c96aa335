//! Provides [`Geographic`] and [`GridShift`].
use std::ops::{Add, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::internal::SEC_TO_DEG;

/// Returns the latitude folded into -90.0 <= and <= 90.0.
#[inline]
fn normalize_latitude(t: f64) -> f64 {
    if t.is_nan() || (-90.0..=90.0).contains(&t) {
        return t;
    }

    match t % 360.0 {
        s if !(-270.0..=270.0).contains(&s) => s - f64::copysign(360.0, s),
        s if !(-90.0..=90.0).contains(&s) => f64::copysign(180.0, s) - s,
        s => s,
    }
}

/// Returns the longitude wrapped into -180.0 <= and <= 180.0.
#[inline]
fn normalize_longitude(t: f64) -> f64 {
    if t.is_nan() || (-180.0..=180.0).contains(&t) {
        return t;
    }

    match t % 360.0 {
        s if !(-180.0..=180.0).contains(&s) => s - f64::copysign(360.0, s),
        s => s,
    }
}

/// A geographic position, a triplet latitude, longitude and ellipsoidal height.
///
/// Longitude is positive east.
///
/// # Example
///
/// ```
/// # use datumtrans::Geographic;
/// let point = Geographic::new(-37.0, 144.0, 50.0);
/// assert_eq!(point.latitude, -37.0);
/// assert_eq!(point.longitude, 144.0);
/// assert_eq!(point.height, 50.0);
///
/// assert_eq!(
///     Geographic::new(-37.0, 504.0, 0.0).normalize(),
///     Geographic::new(-37.0, 144.0, 0.0)
/// );
/// ```
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Geographic {
    /// The latitude \[deg\]
    pub latitude: f64,
    /// The longitude \[deg\], positive east
    pub longitude: f64,
    /// The ellipsoidal height \[m\]
    pub height: f64,
}

impl From<(f64, f64)> for Geographic {
    /// see [`Geographic::new()`], defaulting 0.0 for height
    #[inline]
    fn from(rhs: (f64, f64)) -> Self {
        Self::new(rhs.0, rhs.1, 0.0)
    }
}

impl From<(f64, f64, f64)> for Geographic {
    /// see [`Geographic::new()`]
    #[inline]
    fn from(rhs: (f64, f64, f64)) -> Self {
        Self::new(rhs.0, rhs.1, rhs.2)
    }
}

impl Geographic {
    /// Makes a [`Geographic`].
    #[inline]
    pub const fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }

    /// Returns a position whose latitude is in \[-90.0, 90.0\]
    /// and longitude in \[-180.0, 180.0\].
    ///
    /// Latitude beyond a pole is folded back, that is,
    /// longitude is not flipped.
    #[inline]
    pub fn normalize(&self) -> Self {
        Self {
            latitude: normalize_latitude(self.latitude),
            longitude: normalize_longitude(self.longitude),
            height: self.height,
        }
    }
}

/// The interpolated NTv2 shift at a position.
///
/// Shifts and accuracies are in \[sec\], and the longitude shift is
/// positive *west* following the NTv2 convention.
/// Use `Add`/`Sub` with a [`Geographic`] to apply it.
///
/// # Example
///
/// ```
/// # use datumtrans::{Geographic, GridShift};
/// let shift = GridShift {
///     latitude: 3.6,
///     longitude: -7.2,
///     latitude_accuracy: 0.01,
///     longitude_accuracy: 0.01,
///     accuracy: Some(0.015),
/// };
///
/// let point = Geographic::new(-37.0, 144.0, 10.0);
/// let shifted = point + &shift;
/// assert!((shifted.latitude - -36.999).abs() < 1e-12);
/// assert!((shifted.longitude - 144.002).abs() < 1e-12);
/// assert_eq!(shifted.height, 10.0);
/// ```
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridShift {
    /// The latitude shift \[sec\]
    pub latitude: f64,
    /// The longitude shift \[sec\], positive west
    pub longitude: f64,
    /// The interpolated latitude accuracy \[sec\]
    pub latitude_accuracy: f64,
    /// The interpolated longitude accuracy \[sec\]
    pub longitude_accuracy: f64,
    /// The maximum horizontal accuracy of the enclosing cell's corners \[sec\],
    /// [`None`] if every corner has an unknown (negative) accuracy
    pub accuracy: Option<f64>,
}

impl GridShift {
    /// Returns the latitude shift \[deg\].
    #[inline]
    pub fn latitude_degrees(&self) -> f64 {
        self.latitude * SEC_TO_DEG
    }

    /// Returns the longitude shift \[deg\], positive east.
    #[inline]
    pub fn longitude_degrees(&self) -> f64 {
        -self.longitude * SEC_TO_DEG
    }
}

impl Add<&GridShift> for Geographic {
    type Output = Self;

    fn add(self, rhs: &GridShift) -> Self::Output {
        Self::new(
            self.latitude + rhs.latitude_degrees(),
            self.longitude + rhs.longitude_degrees(),
            self.height,
        )
    }
}

impl Add<&GridShift> for &Geographic {
    type Output = Geographic;

    #[inline]
    fn add(self, rhs: &GridShift) -> Self::Output {
        *self + rhs
    }
}

impl Sub<&GridShift> for Geographic {
    type Output = Self;

    fn sub(self, rhs: &GridShift) -> Self::Output {
        Self::new(
            self.latitude - rhs.latitude_degrees(),
            self.longitude - rhs.longitude_degrees(),
            self.height,
        )
    }
}

impl Sub<&GridShift> for &Geographic {
    type Output = Geographic;

    #[inline]
    fn sub(self, rhs: &GridShift) -> Self::Output {
        *self - rhs
    }
}
