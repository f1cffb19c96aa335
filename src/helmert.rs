//! Applies 7- and 14-parameter Helmert transformations to cartesian coordinates.
//!
//! All functions are pure; a variance-covariance matrix, when supplied,
//! is propagated alongside the coordinate.
use nalgebra::{Matrix3, SMatrix};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::epoch::Epoch;
use crate::internal::{mul_add, SEC_TO_RAD};
use crate::transformation::{Parameters, Transformation, TransformationSD};

/// 3×3 variance-covariance matrix of a cartesian coordinate \[m²\].
pub type Vcv = Matrix3<f64>;

/// An earth-centred earth-fixed cartesian coordinate \[m\].
///
/// # Example
///
/// ```
/// # use datumtrans::Cartesian;
/// let c = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
/// assert_eq!(c, Cartesian::from([-4050762.770917, 4220880.800229, -2533400.199554]));
/// assert!((c.distance(&Cartesian::new(-4050762.770917, 4220880.800229, -2533399.199554)) - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, PartialEq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cartesian {
    /// X \[m\]
    pub x: f64,
    /// Y \[m\]
    pub y: f64,
    /// Z \[m\]
    pub z: f64,
}

impl From<(f64, f64, f64)> for Cartesian {
    #[inline]
    fn from(value: (f64, f64, f64)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<[f64; 3]> for Cartesian {
    #[inline]
    fn from(value: [f64; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl Cartesian {
    /// Makes a [`Cartesian`].
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the euclidean distance to `other` \[m\].
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        mul_add!(dx, dx, mul_add!(dy, dy, dz * dz)).sqrt()
    }
}

/// Rotation/scale matrix of the similarity transform,
/// rotations converted into \[rad\] and scale into a ratio.
#[inline]
fn rotation_scale(p: &Parameters) -> Matrix3<f64> {
    let s = 1.0 + p.sc / 1e6;
    let (rx, ry, rz) = (p.rx * SEC_TO_RAD, p.ry * SEC_TO_RAD, p.rz * SEC_TO_RAD);

    #[rustfmt::skip]
    let m = Matrix3::new(
        s,   -rz, ry,
        rz,  s,   -rx,
        -ry, rx,  s,
    );
    m
}

/// Full 3×10 Jacobian with respect to (x, y, z, tx, ty, tz, sc, rx, ry, rz),
/// scale as a ratio and rotations in \[rad\].
fn jacobian(c: &Cartesian, p: &Parameters) -> SMatrix<f64, 3, 10> {
    let m = rotation_scale(p);
    let mut j = SMatrix::<f64, 3, 10>::zeros();

    j.fixed_view_mut::<3, 3>(0, 0).copy_from(&m);
    j.fixed_view_mut::<3, 3>(0, 3).fill_with_identity();

    j[(0, 6)] = c.x;
    j[(1, 6)] = c.y;
    j[(2, 6)] = c.z;

    j[(1, 7)] = -c.z;
    j[(2, 7)] = c.y;

    j[(0, 8)] = c.z;
    j[(2, 8)] = -c.x;

    j[(0, 9)] = -c.y;
    j[(1, 9)] = c.x;

    j
}

/// Block-diagonal covariance of the coordinate and the parameters.
fn joint_covariance(vcv: &Vcv, sd: &Parameters) -> SMatrix<f64, 10, 10> {
    let mut q = SMatrix::<f64, 10, 10>::zeros();
    q.fixed_view_mut::<3, 3>(0, 0).copy_from(vcv);

    let sigma = [
        sd.tx,
        sd.ty,
        sd.tz,
        sd.sc / 1e6,
        sd.rx * SEC_TO_RAD,
        sd.ry * SEC_TO_RAD,
        sd.rz * SEC_TO_RAD,
    ];
    for (i, s) in sigma.iter().enumerate() {
        q[(i + 3, i + 3)] = s * s;
    }

    q
}

fn similarity(
    c: &Cartesian,
    p: &Parameters,
    sd: Option<&TransformationSD>,
    vcv: Option<&Vcv>,
) -> (Cartesian, Option<Vcv>) {
    let s = 1.0 + p.sc / 1e6;
    let (rx, ry, rz) = (p.rx * SEC_TO_RAD, p.ry * SEC_TO_RAD, p.rz * SEC_TO_RAD);

    let x = mul_add!(s, c.x, mul_add!(-rz, c.y, mul_add!(ry, c.z, p.tx)));
    let y = mul_add!(rz, c.x, mul_add!(s, c.y, mul_add!(-rx, c.z, p.ty)));
    let z = mul_add!(-ry, c.x, mul_add!(rx, c.y, mul_add!(s, c.z, p.tz)));

    let vcv = vcv.map(|vcv| match sd {
        Some(sd) => {
            let j = jacobian(c, p);
            let q = joint_covariance(vcv, &sd.parameters);
            j * q * j.transpose()
        }
        None => {
            let m = rotation_scale(p);
            m * vcv * m.transpose()
        }
    });

    (Cartesian::new(x, y, z), vcv)
}

/// Applies the 7-parameter form of `transformation` to `coordinate`,
/// rates are ignored.
///
/// ```text
/// [x']   [1+sc  -rz    ry ] [x]   [tx]
/// [y'] = [ rz   1+sc  -rx ] [y] + [ty]
/// [z']   [-ry    rx  1+sc ] [z]   [tz]
/// ```
///
/// `vcv` is propagated by `J·VCV·Jᵗ` with the rotation/scale matrix as `J`,
/// or through the full Jacobian when the transformation carries a
/// [`TransformationSD`]. Returns [`None`] for the VCV if none is supplied.
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// # use datumtrans::helmert::apply_static;
/// let t = Transformation::new_static(
///     "A",
///     "B",
///     Parameters::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0),
/// );
/// let (result, vcv) = apply_static(&Cartesian::new(10.0, 20.0, 30.0), &t, None);
/// assert_eq!(result, Cartesian::new(11.0, 22.0, 33.0));
/// assert_eq!(vcv, None);
/// ```
pub fn apply_static(
    coordinate: &Cartesian,
    transformation: &Transformation,
    vcv: Option<&Vcv>,
) -> (Cartesian, Option<Vcv>) {
    similarity(
        coordinate,
        transformation.parameters(),
        transformation.sd(),
        vcv,
    )
}

/// Applies `transformation` evaluated at `epoch`,
/// that is, with effective parameters `p + rate·Δ𝑡`
/// where `Δ𝑡` is elapsed years from the reference epoch to `epoch`.
///
/// At the reference epoch this equals [`apply_static`].
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// # use datumtrans::helmert::{apply_dynamic, apply_static};
/// let registry = Registry::standard();
/// let t = registry.lookup_transformation("ITRF2014", "GDA2020")?;
///
/// let coordinate = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
/// let (result, _) = apply_dynamic(&coordinate, &Epoch::new(2011, 1, 1).unwrap(), &t, None);
///
/// assert!((result.x - -4050763.124034).abs() < 1e-3);
/// assert!((result.y - 4220880.753100).abs() < 1e-3);
/// assert!((result.z - -2533399.713463).abs() < 1e-3);
///
/// let (at_reference, _) = apply_dynamic(&coordinate, &Epoch::new(2020, 1, 1).unwrap(), &t, None);
/// assert_eq!(at_reference, apply_static(&coordinate, &t, None).0);
/// # Ok::<(), Error>(())
/// ```
pub fn apply_dynamic(
    coordinate: &Cartesian,
    epoch: &Epoch,
    transformation: &Transformation,
    vcv: Option<&Vcv>,
) -> (Cartesian, Option<Vcv>) {
    let years = transformation.elapsed(epoch);
    let parameters = transformation.parameters().propagate(transformation.rates(), years);
    let sd = transformation
        .sd()
        .map(|sd| TransformationSD::new(sd.propagate(years), Parameters::ZERO));

    similarity(coordinate, &parameters, sd.as_ref(), vcv)
}

/// Rotation from local east/north/up into cartesian axes at `latitude`, `longitude` \[deg\].
fn local_rotation(latitude: f64, longitude: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();

    #[rustfmt::skip]
    let r = Matrix3::new(
        -sin_lon, -sin_lat * cos_lon, cos_lat * cos_lon,
        cos_lon,  -sin_lat * sin_lon, cos_lat * sin_lon,
        0.0,      cos_lat,            sin_lat,
    );
    r
}

/// Rotates a local east/north/up VCV into cartesian axes.
///
/// # Example
///
/// ```
/// # use datumtrans::helmert::{vcv_cartesian_to_local, vcv_local_to_cartesian, Vcv};
/// let local = Vcv::from_diagonal(&nalgebra::Vector3::new(0.01, 0.01, 0.04));
/// let cartesian = vcv_local_to_cartesian(&local, -37.0, 144.0);
/// let back = vcv_cartesian_to_local(&cartesian, -37.0, 144.0);
/// assert!((back - local).abs().max() < 1e-15);
/// ```
pub fn vcv_local_to_cartesian(vcv: &Vcv, latitude: f64, longitude: f64) -> Vcv {
    let r = local_rotation(latitude, longitude);
    r * vcv * r.transpose()
}

/// Rotates a cartesian VCV into local east/north/up axes.
pub fn vcv_cartesian_to_local(vcv: &Vcv, latitude: f64, longitude: f64) -> Vcv {
    let r = local_rotation(latitude, longitude);
    r.transpose() * vcv * r
}

#[cfg(test)]
mod test {
    use super::*;

    fn gda94_to_gda2020() -> Transformation {
        Transformation::from_coordinate_frame(
            "GDA94",
            "GDA2020",
            None,
            Parameters::new(
                0.06155, -0.01087, -0.04019, -0.009994, -0.0394924, -0.0327221, -0.0328979,
            ),
            Parameters::ZERO,
        )
    }

    mod test_apply_static {
        use super::*;

        #[test]
        fn test_identity() {
            let t = Transformation::new_static("A", "B", Parameters::ZERO);
            let c = Cartesian::new(-4052051.767, 4212836.215, -2545106.027);
            let vcv = Vcv::identity();

            let (actual, actual_vcv) = apply_static(&c, &t, Some(&vcv));
            assert_eq!(actual, c);
            assert_eq!(actual_vcv, Some(vcv));
        }

        #[test]
        fn test_gda94_to_gda2020() {
            // ALIC
            let c = Cartesian::new(-4052052.7379, 4212835.9897, -2545104.5898);
            let (actual, _) = apply_static(&c, &gda94_to_gda2020(), None);

            assert!((actual.x - -4052053.7115).abs() < 1e-3);
            assert!((actual.y - 4212835.7777).abs() < 1e-3);
            assert!((actual.z - -2545103.1551).abs() < 1e-3);
        }

        #[test]
        fn test_inversion() {
            let t = gda94_to_gda2020();
            for c in [
                Cartesian::new(-4052052.7379, 4212835.9897, -2545104.5898),
                Cartesian::new(-4130636.759, 2894953.142, -3890530.249),
                Cartesian::new(6378137.0, 0.0, 0.0),
            ] {
                let (forward, _) = apply_static(&c, &t, None);
                let (back, _) = apply_static(&forward, &t.negate(), None);
                assert!(back.distance(&c) < 1e-6);
            }
        }

        #[test]
        fn test_vcv_rotation_scale() {
            let t = Transformation::new_static(
                "A",
                "B",
                Parameters::new(0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0),
            );
            let vcv = Vcv::identity() * 1e-4;
            let (_, actual) = apply_static(&Cartesian::new(1.0, 2.0, 3.0), &t, Some(&vcv));

            let s = 1.0 + 10.0 / 1e6;
            let expected = vcv * s * s;
            assert!((actual.unwrap() - expected).abs().max() < 1e-18);
        }

        #[test]
        fn test_vcv_with_sd() {
            let t = Transformation::new_static("A", "B", Parameters::ZERO).with_sd(
                TransformationSD::new(
                    Parameters::new(0.01, 0.02, 0.03, 0.0, 0.0, 0.0, 0.0),
                    Parameters::ZERO,
                ),
            );
            let vcv = Vcv::zeros();
            let (_, actual) = apply_static(&Cartesian::new(1.0, 2.0, 3.0), &t, Some(&vcv));

            let actual = actual.unwrap();
            assert!((actual[(0, 0)] - 1e-4).abs() < 1e-18);
            assert!((actual[(1, 1)] - 4e-4).abs() < 1e-18);
            assert!((actual[(2, 2)] - 9e-4).abs() < 1e-18);
            assert_eq!(actual[(0, 1)], 0.0);
        }

        #[test]
        fn test_vcv_with_sd_rotation() {
            // 1 sec about Z moves (R, 0, 0) along Y only
            let r = 6378137.0;
            let t = Transformation::new_static("A", "B", Parameters::ZERO).with_sd(
                TransformationSD::new(
                    Parameters::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0),
                    Parameters::ZERO,
                ),
            );
            let (_, actual) =
                apply_static(&Cartesian::new(r, 0.0, 0.0), &t, Some(&Vcv::zeros()));

            let actual = actual.unwrap();
            let expected = (r * SEC_TO_RAD).powi(2);
            assert_eq!(actual[(0, 0)], 0.0);
            assert!((actual[(1, 1)] - expected).abs() < 1e-12);
            assert_eq!(actual[(2, 2)], 0.0);
        }
    }

    mod test_apply_dynamic {
        use super::*;

        fn itrf2014_to_gda2020() -> Transformation {
            Transformation::from_coordinate_frame(
                "ITRF2014",
                "GDA2020",
                Epoch::new(2020, 1, 1),
                Parameters::ZERO,
                Parameters::new(0.0, 0.0, 0.0, 0.0, 0.00150379, 0.00118346, 0.00120716),
            )
        }

        #[test]
        fn test_plate_motion() {
            let c = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
            let (actual, _) = apply_dynamic(
                &c,
                &Epoch::new(2011, 1, 1).unwrap(),
                &itrf2014_to_gda2020(),
                None,
            );

            assert!((actual.x - -4050763.124034).abs() < 1e-3);
            assert!((actual.y - 4220880.753100).abs() < 1e-3);
            assert!((actual.z - -2533399.713463).abs() < 1e-3);
        }

        #[test]
        fn test_reference_epoch() {
            let t = itrf2014_to_gda2020();
            let c = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
            let vcv = Vcv::identity() * 1e-4;

            let dynamic = apply_dynamic(&c, &Epoch::new(2020, 1, 1).unwrap(), &t, Some(&vcv));
            let r#static = apply_static(&c, &t, Some(&vcv));
            assert_eq!(dynamic, r#static);
        }

        #[test]
        fn test_static_ignores_epoch() {
            let t = gda94_to_gda2020();
            let c = Cartesian::new(-4052052.7379, 4212835.9897, -2545104.5898);

            assert_eq!(
                apply_dynamic(&c, &Epoch::new(1990, 6, 1).unwrap(), &t, None),
                apply_static(&c, &t, None),
            );
        }

        #[test]
        fn test_inversion() {
            let t = itrf2014_to_gda2020();
            let epoch = Epoch::new(2005, 7, 1).unwrap();
            let c = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);

            let (forward, _) = apply_dynamic(&c, &epoch, &t, None);
            let (back, _) = apply_dynamic(&forward, &epoch, &t.negate(), None);
            assert!(back.distance(&c) < 1e-6);
        }
    }

    mod test_vcv_rotation {
        use super::*;

        #[test]
        fn test_up_is_radial() {
            let local = Vcv::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0);

            let actual = vcv_local_to_cartesian(&local, 0.0, 0.0);
            assert!((actual[(0, 0)] - 1.0).abs() < 1e-15);
            assert!(actual[(1, 1)].abs() < 1e-15);
            assert!(actual[(2, 2)].abs() < 1e-15);

            let actual = vcv_local_to_cartesian(&local, 90.0, 0.0);
            assert!((actual[(2, 2)] - 1.0).abs() < 1e-15);
        }

        #[test]
        fn test_round_trip() {
            let cartesian = Vcv::new(
                1.0e-4, 2.0e-5, 3.0e-6, //
                2.0e-5, 4.0e-4, 5.0e-6, //
                3.0e-6, 5.0e-6, 9.0e-4,
            );
            let local = vcv_cartesian_to_local(&cartesian, -23.67, 133.88);
            let back = vcv_local_to_cartesian(&local, -23.67, 133.88);

            assert!((back - cartesian).abs().max() < 1e-17);
            assert!((local.trace() - cartesian.trace()).abs() < 1e-17);
        }
    }
}
