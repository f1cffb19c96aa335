//! Provides the NTv2 grid correction component.
//!
//! A grid is read once with [`read_grid`] (or [`Ntv2Grid::from_path`])
//! and is immutable thereafter.
//! Shifts are interpolated in the geographic domain by [`interpolate_ntv2`].
//!
//! # Example
//!
//! ```no_run
//! # use datumtrans::*;
//! # use datumtrans::ntv2::*;
//! let grid = Ntv2Grid::from_path("GDA94_GDA2020_conformal.gsb")?;
//!
//! let gda94 = Geographic::new(-37.95103342, 144.42486789, 0.0);
//! let gda2020 = grid.forward(&gda94, InterpolationMethod::Bicubic)?;
//! let back = grid.reverse_exact(&gda2020, InterpolationMethod::Bicubic)?;
//! # Ok::<(), Error>(())
//! ```
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ellipsoid::Ellipsoid;
use crate::point::{Geographic, GridShift};
use crate::{Error, Result};

pub use interpolate::{
    bicubic_interpolation, bilinear_interpolation, interpolate_ntv2, select_subgrid,
};
pub use parser::read_grid;
pub use subgrid::{Extent, Node, SubGrid};

mod interpolate;
mod parser;
mod subgrid;
mod writer;

/// Byte order of a grid file.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ByteOrder {
    /// Little-endian
    Little,
    /// Big-endian
    Big,
}

impl ByteOrder {
    #[inline]
    pub(crate) fn i32(self, bytes: [u8; 4]) -> i32 {
        match self {
            Self::Little => i32::from_le_bytes(bytes),
            Self::Big => i32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub(crate) fn f32(self, bytes: [u8; 4]) -> f32 {
        match self {
            Self::Little => f32::from_le_bytes(bytes),
            Self::Big => f32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub(crate) fn f64(self, bytes: [u8; 8]) -> f64 {
        match self {
            Self::Little => f64::from_le_bytes(bytes),
            Self::Big => f64::from_be_bytes(bytes),
        }
    }
}

/// Interpolation method of grid shifts.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InterpolationMethod {
    /// 4-node bilinear
    #[default]
    Bilinear,
    /// 16-node cubic convolution, falls back to bilinear near subgrid edges
    Bicubic,
}

/// The overview header of a grid file.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    /// `NUM_OREC`, count of overview header records
    pub num_orec: i32,
    /// `NUM_SREC`, count of sub-header records
    pub num_srec: i32,
    /// `NUM_FILE`, count of subgrids
    pub num_file: i32,
    /// `GS_TYPE`, unit of shifts, always `SECONDS`
    pub gs_type: String,
    /// `VERSION`
    pub version: String,
    /// `SYSTEM_F`, source frame
    pub system_f: String,
    /// `SYSTEM_T`, target frame
    pub system_t: String,
    /// `MAJOR_F` \[m\]
    pub major_f: f64,
    /// `MINOR_F` \[m\]
    pub minor_f: f64,
    /// `MAJOR_T` \[m\]
    pub major_t: f64,
    /// `MINOR_T` \[m\]
    pub minor_t: f64,
}

impl Header {
    /// Makes a canonical [`Header`] between two frames.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::Ellipsoid;
    /// # use datumtrans::ntv2::Header;
    /// let header = Header::new("NTv2.0", "GDA94", "GDA2020", &Ellipsoid::GRS80, &Ellipsoid::GRS80);
    /// assert_eq!(header.num_orec, 11);
    /// assert_eq!(header.gs_type, "SECONDS");
    /// assert_eq!(header.major_f, 6378137.0);
    /// ```
    pub fn new(
        version: impl Into<String>,
        system_f: impl Into<String>,
        system_t: impl Into<String>,
        from: &Ellipsoid,
        to: &Ellipsoid,
    ) -> Self {
        Self {
            num_orec: 11,
            num_srec: 11,
            num_file: 0,
            gs_type: "SECONDS".to_string(),
            version: version.into(),
            system_f: system_f.into(),
            system_t: system_t.into(),
            major_f: from.semi_major(),
            minor_f: from.semi_minor(),
            major_t: to.semi_major(),
            minor_t: to.semi_minor(),
        }
    }
}

/// A loaded NTv2 grid, an overview header and subgrids in file order.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ntv2Grid {
    header: Header,
    subgrids: Vec<SubGrid>,
}

impl Ntv2Grid {
    /// Max error of [`Ntv2Grid::reverse_exact`] \[deg\].
    pub const MAX_ERROR: f64 = 1e-12;

    /// Max iteration of [`Ntv2Grid::reverse_exact`].
    pub const MAX_ITERATION: usize = 8;

    /// Makes a [`Ntv2Grid`], `NUM_FILE` is set from `subgrids`.
    pub fn new(mut header: Header, subgrids: Vec<SubGrid>) -> Self {
        header.num_file = subgrids.len() as i32;
        Self { header, subgrids }
    }

    /// Reads a grid file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read
    /// and [`Error::Format`] if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        read_grid(&bytes)
    }

    /// The overview header.
    #[inline]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Subgrids in file order.
    #[inline]
    pub fn subgrids(&self) -> &[SubGrid] {
        &self.subgrids
    }

    /// Returns the subgrid named `name`.
    pub fn subgrid(&self, name: &str) -> Option<&SubGrid> {
        self.subgrids.iter().find(|s| s.name() == name)
    }

    /// Returns the bounding box of all subgrids,
    /// spacing is the first subgrid's. [`None`] if there is no subgrid.
    pub fn bounds(&self) -> Option<Extent> {
        let first = self.subgrids.first()?.extent();
        Some(
            self.subgrids
                .iter()
                .map(SubGrid::extent)
                .fold(*first, |acc, e| Extent {
                    south: acc.south.min(e.south),
                    north: acc.north.max(e.north),
                    east: acc.east.min(e.east),
                    west: acc.west.max(e.west),
                    ..acc
                }),
        )
    }

    /// Returns the interpolated shift at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if no subgrid contains `point`.
    #[inline]
    pub fn shift(&self, point: &Geographic, method: InterpolationMethod) -> Result<GridShift> {
        interpolate_ntv2(self, point.latitude, point.longitude, method)
    }

    /// Returns `point` shifted from `SYSTEM_F` into `SYSTEM_T`,
    /// normalized into \[-180.0, 180.0\] longitude.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if no subgrid contains `point`.
    #[inline]
    pub fn forward(&self, point: &Geographic, method: InterpolationMethod) -> Result<Geographic> {
        Ok((point + &self.shift(point, method)?).normalize())
    }

    /// Returns `point` shifted from `SYSTEM_T` into `SYSTEM_F`
    /// by subtracting the shift interpolated at `point`,
    /// normalized as [`Ntv2Grid::forward`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if no subgrid contains `point`.
    #[inline]
    pub fn reverse(&self, point: &Geographic, method: InterpolationMethod) -> Result<Geographic> {
        Ok((point - &self.shift(point, method)?).normalize())
    }

    /// Returns `point` shifted from `SYSTEM_T` into `SYSTEM_F`
    /// whose forward image matches `point` within [`Ntv2Grid::MAX_ERROR`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if an iterate leaves the grid and
    /// [`Error::NotConvergent`] after [`Ntv2Grid::MAX_ITERATION`] iterations.
    pub fn reverse_exact(
        &self,
        point: &Geographic,
        method: InterpolationMethod,
    ) -> Result<Geographic> {
        // fixed-point iteration on x = point - shift(x)
        // iterates are kept unnormalized so that they stay on the grid's side of ±180°
        let mut current = point - &self.shift(point, method)?;

        for _ in 0..Self::MAX_ITERATION {
            let image = &current + &self.shift(&current, method)?;
            let delta_lat = point.latitude - image.latitude;
            let delta_lon = point.longitude - image.longitude;

            if delta_lat.abs() < Self::MAX_ERROR && delta_lon.abs() < Self::MAX_ERROR {
                return Ok(current.normalize());
            }

            current = Geographic::new(
                current.latitude + delta_lat,
                current.longitude + delta_lon,
                point.height,
            );
        }

        Err(Error::NotConvergent {
            latitude: current.latitude,
            longitude: current.longitude,
            iterations: Self::MAX_ITERATION,
        })
    }
}

/// Converts a position in \[deg\] into NTv2 \[sec\], longitude positive west.
#[inline]
pub(crate) fn to_ntv2_seconds(latitude: f64, longitude: f64) -> (f64, f64) {
    (latitude * 3600.0, -longitude * 3600.0)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// A 1°×1° grid of 0.25° spacing around (-37.5, 144.5),
    /// with smooth shifts and a finer child patch in its south-east corner.
    pub(crate) fn sample_grid() -> Ntv2Grid {
        let parent_extent = Extent {
            south: -38.0 * 3600.0,
            north: -37.0 * 3600.0,
            east: -145.0 * 3600.0,
            west: -144.0 * 3600.0,
            lat_inc: 900.0,
            lon_inc: 900.0,
        };
        let parent_nodes = (0..5)
            .flat_map(|row| {
                (0..5).map(move |col| {
                    Node::new(
                        (0.1 * row as f32) + 0.01 * (col * col) as f32,
                        -0.2 + 0.05 * col as f32 - 0.02 * (row * col) as f32,
                        0.003 + 0.001 * row as f32,
                        0.004,
                    )
                })
            })
            .collect();

        let child_extent = Extent {
            south: -38.0 * 3600.0,
            north: -37.75 * 3600.0,
            east: -145.0 * 3600.0,
            west: -144.75 * 3600.0,
            lat_inc: 450.0,
            lon_inc: 450.0,
        };
        let child_nodes = (0..9)
            .map(|i| Node::new(1.0 + 0.001 * i as f32, 2.0, -1.0, -1.0))
            .collect();

        Ntv2Grid::new(
            Header::new("NTv2.0", "GDA94", "GDA2020", &Ellipsoid::GRS80, &Ellipsoid::GRS80),
            vec![
                SubGrid::new("PARENT", None, parent_extent, parent_nodes)
                    .unwrap()
                    .with_dates("01012020", "01012020"),
                SubGrid::new("CHILD", Some("PARENT".to_string()), child_extent, child_nodes)
                    .unwrap()
                    .with_dates("01012020", "02012020"),
            ],
        )
    }

    mod test_ntv2_grid {
        use super::*;

        #[test]
        fn test_new() {
            let grid = sample_grid();
            assert_eq!(grid.header().num_file, 2);
            assert_eq!(grid.subgrids().len(), 2);
            assert_eq!(grid.subgrid("CHILD").unwrap().parent(), Some("PARENT"));
            assert!(grid.subgrid("NONE").is_none());

            let bounds = grid.bounds().unwrap();
            assert_eq!(bounds.south, -38.0 * 3600.0);
            assert_eq!(bounds.north, -37.0 * 3600.0);
            assert_eq!(bounds.east, -145.0 * 3600.0);
            assert_eq!(bounds.west, -144.0 * 3600.0);
            assert_eq!(bounds.lat_inc, 900.0);
        }

        #[test]
        fn test_forward_reverse() {
            let grid = sample_grid();
            let point = Geographic::new(-37.4, 144.6, 12.0);

            for method in [InterpolationMethod::Bilinear, InterpolationMethod::Bicubic] {
                let shifted = grid.forward(&point, method).unwrap();
                let shift = grid.shift(&point, method).unwrap();
                assert!((shifted.latitude - (point.latitude + shift.latitude / 3600.0)).abs() < 1e-14);
                assert!((shifted.longitude - (point.longitude - shift.longitude / 3600.0)).abs() < 1e-13);
                assert_eq!(shifted.height, 12.0);

                let back = grid.reverse(&shifted, method).unwrap();
                assert!((back.latitude - point.latitude).abs() < 1e-7);
                assert!((back.longitude - point.longitude).abs() < 1e-7);

                let exact = grid.reverse_exact(&shifted, method).unwrap();
                assert!((exact.latitude - point.latitude).abs() < 1e-11);
                assert!((exact.longitude - point.longitude).abs() < 1e-11);
            }
        }

        #[test]
        fn test_antimeridian() {
            // 179°E to 180°E, shifting one second east
            let extent = Extent {
                south: -37.0 * 3600.0,
                north: -36.0 * 3600.0,
                east: -180.0 * 3600.0,
                west: -179.0 * 3600.0,
                lat_inc: 3600.0,
                lon_inc: 3600.0,
            };
            let grid = Ntv2Grid::new(
                Header::new("NTv2.0", "A", "B", &Ellipsoid::GRS80, &Ellipsoid::GRS80),
                vec![SubGrid::new("EDGE", None, extent, vec![Node::new(0.0, -1.0, 0.0, 0.0); 4]).unwrap()],
            );

            let point = Geographic::new(-36.5, 179.9999, 0.0);
            let shifted = grid.forward(&point, InterpolationMethod::Bilinear).unwrap();
            assert!((shifted.longitude - (179.9999 + 1.0 / 3600.0 - 360.0)).abs() < 1e-9);
            assert_eq!(shifted.latitude, -36.5);

            let point = Geographic::new(-36.5, 179.5, 0.0);
            let back = grid.reverse(&point, InterpolationMethod::Bilinear).unwrap();
            assert!((back.longitude - (179.5 - 1.0 / 3600.0)).abs() < 1e-9);
        }

        #[test]
        fn test_out_of_bounds() {
            let grid = sample_grid();
            let err = grid
                .forward(&Geographic::new(-30.0, 144.5, 0.0), InterpolationMethod::Bilinear)
                .unwrap_err();
            assert!(matches!(err, Error::OutOfBounds { .. }));
            assert!(err.is_recoverable());
        }
    }
}
