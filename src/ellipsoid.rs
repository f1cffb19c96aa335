//! Provides [`Ellipsoid`] and the [`GeographicConversion`] seam.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::helmert::Cartesian;
use crate::internal::mul_add;
use crate::point::Geographic;

/// Conversion between geographic and cartesian coordinates.
///
/// This is the interface the [`Orchestrator`](crate::Orchestrator)
/// uses around grid steps, which work on geographic coordinates.
pub trait GeographicConversion {
    /// Returns the geographic position of a cartesian triple.
    fn to_geographic(&self, cartesian: &Cartesian) -> Geographic;
    /// Returns the cartesian triple of a geographic position.
    fn to_cartesian(&self, geographic: &Geographic) -> Cartesian;
}

/// A reference ellipsoid.
///
/// # Example
///
/// ```
/// # use datumtrans::Ellipsoid;
/// let grs80 = Ellipsoid::GRS80;
/// assert_eq!(grs80.semi_major(), 6378137.0);
/// assert!((grs80.semi_minor() - 6356752.314140).abs() < 1e-6);
/// assert!((grs80.eccentricity_squared() - 0.00669438002290).abs() < 1e-14);
/// ```
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipsoid {
    semi_major: f64,
    inverse_flattening: f64,
}

impl Ellipsoid {
    /// Geodetic Reference System 1980.
    pub const GRS80: Self = Self::new(6378137.0, 298.257222101);

    /// Australian National Spheroid, the ellipsoid of AGD66 and AGD84.
    pub const ANS: Self = Self::new(6378160.0, 298.25);

    /// Makes an [`Ellipsoid`] from semi-major axis \[m\] and inverse flattening.
    #[inline]
    pub const fn new(semi_major: f64, inverse_flattening: f64) -> Self {
        Self {
            semi_major,
            inverse_flattening,
        }
    }

    /// Semi-major axis \[m\].
    #[inline]
    pub const fn semi_major(&self) -> f64 {
        self.semi_major
    }

    /// Inverse flattening.
    #[inline]
    pub const fn inverse_flattening(&self) -> f64 {
        self.inverse_flattening
    }

    /// Flattening.
    #[inline]
    pub fn flattening(&self) -> f64 {
        1.0 / self.inverse_flattening
    }

    /// Semi-minor axis \[m\].
    #[inline]
    pub fn semi_minor(&self) -> f64 {
        self.semi_major * (1.0 - self.flattening())
    }

    /// First eccentricity squared.
    #[inline]
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }

    /// Second eccentricity squared.
    #[inline]
    pub fn second_eccentricity_squared(&self) -> f64 {
        let e2 = self.eccentricity_squared();
        e2 / (1.0 - e2)
    }

    /// Third flattening, 𝑛 = 𝑓 / (2 − 𝑓).
    #[inline]
    pub fn third_flattening(&self) -> f64 {
        let f = self.flattening();
        f / (2.0 - f)
    }

    /// Prime vertical radius of curvature at `latitude` \[rad\].
    #[inline]
    fn prime_vertical_radius(&self, sin_lat: f64) -> f64 {
        let e2 = self.eccentricity_squared();
        self.semi_major / mul_add!(-e2 * sin_lat, sin_lat, 1.0).sqrt()
    }
}

impl GeographicConversion for Ellipsoid {
    /// Iterative inverse, converges to sub-millimetre in a few steps.
    fn to_geographic(&self, cartesian: &Cartesian) -> Geographic {
        const ITERATION: usize = 10;
        const MAX_ERROR: f64 = 1e-14;

        let e2 = self.eccentricity_squared();
        let p = f64::hypot(cartesian.x, cartesian.y);
        let longitude = f64::atan2(cartesian.y, cartesian.x);

        let mut latitude = f64::atan2(cartesian.z, p * (1.0 - e2));
        for _ in 0..ITERATION {
            let n = self.prime_vertical_radius(latitude.sin());
            let next = f64::atan2(mul_add!(e2 * n, latitude.sin(), cartesian.z), p);
            let delta = (next - latitude).abs();
            latitude = next;
            if delta < MAX_ERROR {
                break;
            }
        }

        let (sin, cos) = latitude.sin_cos();
        let n = self.prime_vertical_radius(sin);
        let height = mul_add!(p, cos, cartesian.z * sin) - self.semi_major * self.semi_major / n;

        Geographic::new(latitude.to_degrees(), longitude.to_degrees(), height)
    }

    fn to_cartesian(&self, geographic: &Geographic) -> Cartesian {
        let (sin_lat, cos_lat) = geographic.latitude.to_radians().sin_cos();
        let (sin_lon, cos_lon) = geographic.longitude.to_radians().sin_cos();

        let n = self.prime_vertical_radius(sin_lat);
        let e2 = self.eccentricity_squared();

        Cartesian::new(
            (n + geographic.height) * cos_lat * cos_lon,
            (n + geographic.height) * cos_lat * sin_lon,
            mul_add!(n, 1.0 - e2, geographic.height) * sin_lat,
        )
    }
}
