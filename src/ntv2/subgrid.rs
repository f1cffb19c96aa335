//! Provides [`SubGrid`], [`Node`] and [`Extent`].
use chrono::NaiveDate;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatErrorKind};
use crate::internal::snap;
use crate::Result;

/// A shift node of a [`SubGrid`], as stored in the file.
///
/// Values are in \[sec\], the longitude shift is positive west.
/// A negative accuracy means unknown.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// The latitude shift \[sec\]
    pub lat_shift: f32,
    /// The longitude shift \[sec\], positive west
    pub lon_shift: f32,
    /// The latitude accuracy \[sec\]
    pub lat_accuracy: f32,
    /// The longitude accuracy \[sec\]
    pub lon_accuracy: f32,
}

impl From<[f32; 4]> for Node {
    #[inline]
    fn from(value: [f32; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl Node {
    /// Makes a [`Node`].
    #[inline]
    pub const fn new(lat_shift: f32, lon_shift: f32, lat_accuracy: f32, lon_accuracy: f32) -> Self {
        Self {
            lat_shift,
            lon_shift,
            lat_accuracy,
            lon_accuracy,
        }
    }

    /// Returns (lat_shift, lon_shift, lat_accuracy, lon_accuracy) widened.
    #[inline]
    pub(crate) fn values(&self) -> [f64; 4] {
        [
            self.lat_shift as f64,
            self.lon_shift as f64,
            self.lat_accuracy as f64,
            self.lon_accuracy as f64,
        ]
    }

    /// Returns the horizontal accuracy, [`None`] if either axis is unknown.
    #[inline]
    pub(crate) fn horizontal_accuracy(&self) -> Option<f64> {
        if self.lat_accuracy < 0.0 || self.lon_accuracy < 0.0 {
            None
        } else {
            Some(f64::hypot(self.lat_accuracy as f64, self.lon_accuracy as f64))
        }
    }
}

/// The bounding box and spacing of a [`SubGrid`] in \[sec\].
///
/// Longitudes are positive west, so `east < west`.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Extent {
    /// `S_LAT`
    pub south: f64,
    /// `N_LAT`
    pub north: f64,
    /// `E_LONG`
    pub east: f64,
    /// `W_LONG`
    pub west: f64,
    /// `LAT_INC`
    pub lat_inc: f64,
    /// `LONG_INC`
    pub lon_inc: f64,
}

impl Extent {
    /// Returns (rows, cols) implied by the extent.
    fn shape(&self) -> Option<(usize, usize)> {
        fn count(from: f64, to: f64, inc: f64) -> Option<usize> {
            if !(from.is_finite() && to.is_finite() && inc.is_finite()) || inc <= 0.0 || to <= from {
                return None;
            }
            let n = (to - from) / inc;
            if !n.is_finite() || n >= u32::MAX as f64 {
                return None;
            }
            let r = n.round();
            if r < 1.0 || (n - r).abs() > 1e-6 {
                return None;
            }
            Some(r as usize + 1)
        }

        let rows = count(self.south, self.north, self.lat_inc)?;
        let cols = count(self.east, self.west, self.lon_inc)?;
        rows.checked_mul(cols).map(|_| (rows, cols))
    }

    /// Returns the area \[sec²\].
    #[inline]
    pub fn area(&self) -> f64 {
        (self.north - self.south) * (self.west - self.east)
    }
}

/// A patch of the correction surface.
///
/// Nodes are stored row-major, row 0 at the southern edge
/// and column 0 at the eastern edge.
///
/// # Example
///
/// ```
/// # use datumtrans::ntv2::{Extent, Node, SubGrid};
/// let extent = Extent {
///     south: 0.0,
///     north: 3600.0,
///     east: 0.0,
///     west: 7200.0,
///     lat_inc: 3600.0,
///     lon_inc: 3600.0,
/// };
/// let subgrid = SubGrid::new("PATCH", None, extent, vec![Node::default(); 6])?;
/// assert_eq!(subgrid.rows(), 2);
/// assert_eq!(subgrid.cols(), 3);
///
/// // Node count must agree with the extent
/// assert!(SubGrid::new("PATCH", None, extent, vec![Node::default(); 4]).is_err());
/// # Ok::<(), datumtrans::Error>(())
/// ```
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubGrid {
    name: String,
    parent: Option<String>,
    created: String,
    updated: String,
    extent: Extent,
    rows: usize,
    cols: usize,
    nodes: Vec<Node>,
}

impl SubGrid {
    /// Makes a [`SubGrid`] with empty creation and update dates.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `extent` is not a whole number of increments
    /// or the count of `nodes` disagrees with it.
    pub fn new(
        name: impl Into<String>,
        parent: Option<String>,
        extent: Extent,
        nodes: Vec<Node>,
    ) -> Result<Self> {
        Self::from_parts(name.into(), parent, String::new(), String::new(), extent, nodes)
            .map_err(|kind| FormatError::new(kind, 0).into())
    }

    pub(crate) fn from_parts(
        name: String,
        parent: Option<String>,
        created: String,
        updated: String,
        extent: Extent,
        nodes: Vec<Node>,
    ) -> std::result::Result<Self, FormatErrorKind> {
        let (rows, cols) = extent
            .shape()
            .ok_or_else(|| FormatErrorKind::InvalidExtent {
                subgrid: name.clone(),
            })?;

        if rows.checked_mul(cols) != Some(nodes.len()) {
            return Err(FormatErrorKind::InconsistentShape {
                subgrid: name,
                rows,
                cols,
                count: nodes.len(),
            });
        }

        Ok(Self {
            name,
            parent,
            created,
            updated,
            extent,
            rows,
            cols,
            nodes,
        })
    }

    /// Sets `CREATED` and `UPDATED`, `DDMMYYYY` by convention.
    pub fn with_dates(mut self, created: impl Into<String>, updated: impl Into<String>) -> Self {
        self.created = created.into();
        self.updated = updated.into();
        self
    }

    /// `SUB_NAME`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `PARENT`, [`None`] for a top-level subgrid.
    #[inline]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// `CREATED` as stored.
    #[inline]
    pub fn created(&self) -> &str {
        &self.created
    }

    /// `UPDATED` as stored.
    #[inline]
    pub fn updated(&self) -> &str {
        &self.updated
    }

    /// `CREATED` parsed as `DDMMYYYY`.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::ntv2::{Extent, Node, SubGrid};
    /// # let extent = Extent { south: 0.0, north: 60.0, east: 0.0, west: 60.0, lat_inc: 60.0, lon_inc: 60.0 };
    /// let subgrid = SubGrid::new("PATCH", None, extent, vec![Node::default(); 4])?
    ///     .with_dates("05112017", "n/a");
    ///
    /// assert_eq!(subgrid.created_date(), chrono::NaiveDate::from_ymd_opt(2017, 11, 5));
    /// assert_eq!(subgrid.updated_date(), None);
    /// # Ok::<(), datumtrans::Error>(())
    /// ```
    #[inline]
    pub fn created_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.created.trim(), "%d%m%Y").ok()
    }

    /// `UPDATED` parsed as `DDMMYYYY`.
    #[inline]
    pub fn updated_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.updated.trim(), "%d%m%Y").ok()
    }

    /// Bounding box and spacing.
    #[inline]
    pub const fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Count of node rows, south to north.
    #[inline]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Count of node columns, east to west.
    #[inline]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// All nodes, row-major from the south-east corner.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the node at `row` (from south) and `col` (from east).
    #[inline]
    pub fn node(&self, row: usize, col: usize) -> Option<&Node> {
        if row < self.rows && col < self.cols {
            self.nodes.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Returns the area \[sec²\].
    #[inline]
    pub fn area(&self) -> f64 {
        self.extent.area()
    }

    /// Returns the fractional (row, col) of a position in \[sec\], longitude positive west.
    #[inline]
    pub(crate) fn position(&self, lat_s: f64, lon_w: f64) -> (f64, f64) {
        (
            snap((lat_s - self.extent.south) / self.extent.lat_inc),
            snap((lon_w - self.extent.east) / self.extent.lon_inc),
        )
    }

    /// Returns `true` if the subgrid owns the position.
    ///
    /// Ownership is half-open, south and east edges are owned
    /// and north and west edges are not. `closed` includes every edge.
    pub(crate) fn covers(&self, lat_s: f64, lon_w: f64, closed: bool) -> bool {
        let (y, x) = self.position(lat_s, lon_w);
        let (ny, nx) = ((self.rows - 1) as f64, (self.cols - 1) as f64);

        if closed {
            (0.0..=ny).contains(&y) && (0.0..=nx).contains(&x)
        } else {
            (0.0..ny).contains(&y) && (0.0..nx).contains(&x)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn extent() -> Extent {
        Extent {
            south: -36000.0,
            north: -32400.0,
            east: -540000.0,
            west: -532800.0,
            lat_inc: 1800.0,
            lon_inc: 1800.0,
        }
    }

    mod test_subgrid {
        use super::*;

        #[test]
        fn test_shape() {
            let nodes: Vec<Node> = (0..15).map(|i| Node::new(i as f32, 0.0, 0.0, 0.0)).collect();
            let subgrid = SubGrid::new("A", None, extent(), nodes).unwrap();

            assert_eq!(subgrid.rows(), 3);
            assert_eq!(subgrid.cols(), 5);
            assert_eq!(subgrid.node(0, 0).unwrap().lat_shift, 0.0);
            assert_eq!(subgrid.node(1, 2).unwrap().lat_shift, 7.0);
            assert_eq!(subgrid.node(2, 4).unwrap().lat_shift, 14.0);
            assert_eq!(subgrid.node(3, 0), None);
            assert_eq!(subgrid.node(0, 5), None);
            assert_eq!(subgrid.area(), 3600.0 * 7200.0);
        }

        #[test]
        fn test_inconsistent_shape() {
            let err = SubGrid::from_parts(
                "A".to_string(),
                None,
                String::new(),
                String::new(),
                extent(),
                vec![Node::default(); 14],
            )
            .unwrap_err();

            assert_eq!(
                err,
                FormatErrorKind::InconsistentShape {
                    subgrid: "A".to_string(),
                    rows: 3,
                    cols: 5,
                    count: 14
                }
            );
        }

        #[test]
        fn test_invalid_extent() {
            for extent in [
                Extent {
                    lat_inc: 1700.0,
                    ..extent()
                },
                Extent {
                    lon_inc: 0.0,
                    ..extent()
                },
                Extent {
                    north: -36000.0,
                    ..extent()
                },
                Extent {
                    west: f64::NAN,
                    ..extent()
                },
                Extent {
                    lat_inc: 1e-320,
                    ..extent()
                },
                Extent {
                    south: -f64::MAX,
                    north: f64::MAX,
                    ..extent()
                },
                Extent {
                    lat_inc: 1e-6,
                    lon_inc: 1e-6,
                    ..extent()
                },
            ] {
                assert!(matches!(
                    SubGrid::from_parts(
                        "A".to_string(),
                        None,
                        String::new(),
                        String::new(),
                        extent,
                        vec![]
                    ),
                    Err(FormatErrorKind::InvalidExtent { .. })
                ));
            }
        }

        #[test]
        fn test_covers() {
            let subgrid = SubGrid::new("A", None, extent(), vec![Node::default(); 15]).unwrap();

            // interior
            assert!(subgrid.covers(-34000.0, -536000.0, false));
            // south-east corner is owned
            assert!(subgrid.covers(-36000.0, -540000.0, false));
            // north and west edges are not
            assert!(!subgrid.covers(-32400.0, -536000.0, false));
            assert!(!subgrid.covers(-34000.0, -532800.0, false));
            assert!(subgrid.covers(-32400.0, -532800.0, true));
            // outside
            assert!(!subgrid.covers(-36001.0, -536000.0, true));
            assert!(!subgrid.covers(f64::NAN, -536000.0, true));
        }

        #[test]
        fn test_dates() {
            let subgrid = SubGrid::new("A", Some("B".to_string()), extent(), vec![Node::default(); 15])
                .unwrap()
                .with_dates("01012020", "31122021");

            assert_eq!(subgrid.parent(), Some("B"));
            assert_eq!(subgrid.created_date(), NaiveDate::from_ymd_opt(2020, 1, 1));
            assert_eq!(subgrid.updated_date(), NaiveDate::from_ymd_opt(2021, 12, 31));
        }
    }

    mod test_node {
        use super::*;

        #[test]
        fn test_horizontal_accuracy() {
            assert_eq!(Node::new(0.0, 0.0, 3.0, 4.0).horizontal_accuracy(), Some(5.0));
            assert_eq!(Node::new(0.0, 0.0, -1.0, 4.0).horizontal_accuracy(), None);
            assert_eq!(Node::from([1.0, 2.0, 3.0, 4.0]).values(), [1.0, 2.0, 3.0, 4.0]);
        }
    }
}
