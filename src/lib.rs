//! # datumtrans
//!
//! Datum transformation engine for geodetic survey work,
//! moving coordinates between reference frames and across epochs.
//!
//! ```no_run
//! use std::error::Error;
//!
//! use datumtrans::ntv2::InterpolationMethod;
//! use datumtrans::{Cartesian, Epoch, Geographic, Ntv2Grid, Registry};
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let registry = Registry::standard();
//!
//!     // ITRF2014 at 2011-01-01 into GDA2020 by the plate motion model
//!     let t = registry.lookup_transformation("ITRF2014", "GDA2020")?;
//!     let origin = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
//!     let epoch = Epoch::new(2011, 1, 1).unwrap();
//!     let (result, _) = datumtrans::transform(&origin, &t, Some(&epoch), None)?;
//!     // Prints Cartesian { x: -4050763.12406.., y: 4220880.75310.., z: -2533399.71343.. }
//!     println!("{result:?}");
//!
//!     // GDA94 into GDA2020 by the conformal grid
//!     let grid = Ntv2Grid::from_path("GDA94_GDA2020_conformal.gsb")?;
//!     let point = Geographic::new(-37.95103342, 144.42486789, 0.0);
//!     let (shifted, shift) = datumtrans::transform_grid(&point, &grid, InterpolationMethod::Bicubic)?;
//!     println!("{shifted:?} {shift:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! Features:
//!
//! - Static 7-parameter and time-dependent 14-parameter Helmert transformations,
//!   with propagation of coordinate and parameter uncertainty
//! - A registry of published GDA, ITRF and AGD parameter sets
//! - NTv2 grid files in either byte order, bilinear and bicubic interpolation
//! - Planning of chained transformations between named frames
//!
//! # Conventions
//!
//! Rotations are in the position-vector convention.
//! Translations are in \[m\], scale in \[ppm\] and rotations in \[sec\].
//! Tables published in the coordinate-frame convention are converted on construction,
//! see [`Transformation::from_coordinate_frame`].
//!
//! Elapsed time is the difference of decimal years, see [`Epoch::decimal_year`].
//!
//! # Serialization and Deserialization
//!
//! Value types implement `Serialize` and `Deserialize` with the `serde` feature.
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # fn main() -> serde_json::Result<()> {
//! # use datumtrans::Epoch;
//! let epoch: Epoch = serde_json::from_str(r#""2020-01-01""#)?;
//! assert_eq!(epoch, Epoch::new(2020, 1, 1).unwrap());
//! # Ok(())}
//! # #[cfg(not(feature = "serde"))]
//! # fn main() {}
//! ```
//!
//! # Optimization
//!
//! The `fma` feature uses fused multiply-add in Helmert and interpolation arithmetic.
//!
//! # Logging
//!
//! Grid loading, path planning and bicubic fallback are logged through [`tracing`].
//! No subscriber is installed by this crate.
//!
//! # Reference
//!
//! 1. Geoscience Australia, GDA2020 Technical Manual.
//! 2. Dawson, J. and Woods, A., ITRF to GDA94 coordinate transformations,
//!    Journal of Applied Geodesy 4 (2010).
//! 3. Harvey, B. R., Practical least squares and statistics for surveyors (1998).
//! 4. Junkins, D. R. and Farley, S. A., NTv2 Developer's Guide (1995).
//! 5. Keys, R., Cubic convolution interpolation for digital image processing (1981).
#[doc(inline)]
pub use ellipsoid::{Ellipsoid, GeographicConversion};
#[doc(inline)]
pub use epoch::Epoch;
#[doc(inline)]
pub use error::{Error, FormatError, FormatErrorKind, Result};
#[doc(inline)]
pub use helmert::{Cartesian, Vcv};
#[doc(inline)]
pub use ntv2::{InterpolationMethod, Ntv2Grid};
#[doc(inline)]
pub use orchestrator::{Orchestrator, OrchestratorBuilder, Plan, Request, Step};
#[doc(inline)]
pub use point::{Geographic, GridShift};
#[doc(inline)]
pub use registry::{Registry, RegistryBuilder};
#[doc(inline)]
pub use transformation::{Parameters, Transformation, TransformationSD};

pub mod ellipsoid;
pub mod epoch;
pub mod error;
pub mod helmert;
pub mod ntv2;
pub mod orchestrator;
pub mod point;
pub mod registry;
pub mod transformation;

mod internal;

/// Applies `transformation` to `coordinate`,
/// evaluated at `epoch` if it is time-dependent.
///
/// `epoch` is ignored for a static transformation.
///
/// # Errors
///
/// Returns [`Error::MissingEpoch`] if `transformation` is time-dependent and `epoch` is [`None`].
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// let registry = Registry::standard();
/// let coordinate = Cartesian::new(-4052051.7643, 4212836.2017, -2545106.0245);
///
/// let t = registry.lookup_transformation("GDA94", "GDA2020")?;
/// let (gda2020, _) = transform(&coordinate, &t, None, None)?;
/// let (back, _) = transform(&gda2020, &t.negate(), None, None)?;
/// assert!(back.distance(&coordinate) < 1e-6);
///
/// let t = registry.lookup_transformation("ITRF2014", "GDA2020")?;
/// assert!(matches!(
///     transform(&coordinate, &t, None, None),
///     Err(Error::MissingEpoch { .. })
/// ));
/// # Ok::<(), Error>(())
/// ```
pub fn transform(
    coordinate: &Cartesian,
    transformation: &Transformation,
    epoch: Option<&Epoch>,
    vcv: Option<&Vcv>,
) -> Result<(Cartesian, Option<Vcv>)> {
    match (transformation.is_dynamic(), epoch) {
        (false, _) => Ok(helmert::apply_static(coordinate, transformation, vcv)),
        (true, Some(epoch)) => Ok(helmert::apply_dynamic(
            coordinate,
            epoch,
            transformation,
            vcv,
        )),
        (true, None) => Err(Error::missing_epoch(
            transformation.from(),
            transformation.to(),
        )),
    }
}

/// Shifts `point` from `SYSTEM_F` into `SYSTEM_T` of `grid`,
/// returning the shifted point and the interpolated shift.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if no subgrid contains `point`.
#[inline]
pub fn transform_grid(
    point: &Geographic,
    grid: &Ntv2Grid,
    method: InterpolationMethod,
) -> Result<(Geographic, GridShift)> {
    let shift = grid.shift(point, method)?;
    Ok((point + &shift, shift))
}
