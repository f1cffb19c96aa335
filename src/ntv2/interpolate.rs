//! Subgrid selection and shift interpolation.
use super::{to_ntv2_seconds, InterpolationMethod, Ntv2Grid, SubGrid};
use crate::internal::mul_add;
use crate::point::GridShift;
use crate::{Error, Result};

/// The enclosing cell of a position,
/// `u` runs along columns (westward) and `v` along rows (northward).
#[derive(Debug, PartialEq)]
struct Cell {
    row: usize,
    col: usize,
    u: f64,
    v: f64,
}

impl Cell {
    /// Returns the cell enclosing (`latitude`, `longitude`) \[deg\].
    ///
    /// The last row and column resolve to the cell below or east of them
    /// with `v` or `u` of 1.
    fn locate(subgrid: &SubGrid, latitude: f64, longitude: f64) -> Result<Self> {
        let (lat_s, lon_w) = to_ntv2_seconds(latitude, longitude);
        let (y, x) = subgrid.position(lat_s, lon_w);

        let (rows, cols) = (subgrid.rows(), subgrid.cols());
        if !((0.0..=(rows - 1) as f64).contains(&y) && (0.0..=(cols - 1) as f64).contains(&x)) {
            return Err(Error::out_of_bounds(latitude, longitude));
        }

        let row = (y.floor() as usize).min(rows - 2);
        let col = (x.floor() as usize).min(cols - 2);

        Ok(Self {
            row,
            col,
            u: x - col as f64,
            v: y - row as f64,
        })
    }

    /// Returns `true` if the 4×4 neighbourhood lies within the subgrid.
    #[inline]
    fn has_margin(&self, subgrid: &SubGrid) -> bool {
        self.row >= 1
            && self.row + 2 < subgrid.rows()
            && self.col >= 1
            && self.col + 2 < subgrid.cols()
    }
}

#[inline]
fn values(subgrid: &SubGrid, row: usize, col: usize) -> [f64; 4] {
    subgrid
        .node(row, col)
        .map(|node| node.values())
        .unwrap_or([f64::NAN; 4])
}

fn bilinear(subgrid: &SubGrid, cell: &Cell) -> [f64; 4] {
    let (u, v) = (cell.u, cell.v);
    let (du, dv) = (1.0 - u, 1.0 - v);

    let corners = [
        (values(subgrid, cell.row, cell.col), du * dv),
        (values(subgrid, cell.row, cell.col + 1), u * dv),
        (values(subgrid, cell.row + 1, cell.col), du * v),
        (values(subgrid, cell.row + 1, cell.col + 1), u * v),
    ];

    let mut result = [0.0; 4];
    for (value, weight) in corners {
        for (r, p) in result.iter_mut().zip(value) {
            *r = mul_add!(weight, p, *r);
        }
    }
    result
}

/// Catmull-Rom cubic convolution weights of the nodes at −1, 0, 1 and 2.
#[inline]
fn cubic_weights(t: f64) -> [f64; 4] {
    [
        ((-0.5 * t + 1.0) * t - 0.5) * t,
        (1.5 * t - 2.5) * t * t + 1.0,
        ((-1.5 * t + 2.0) * t + 0.5) * t,
        (0.5 * t - 0.5) * t * t,
    ]
}

/// Returns [`None`] if the cell lacks the one-node margin.
fn bicubic(subgrid: &SubGrid, cell: &Cell) -> Option<[f64; 4]> {
    if !cell.has_margin(subgrid) {
        return None;
    }

    let wu = cubic_weights(cell.u);
    let wv = cubic_weights(cell.v);

    let mut result = [0.0; 4];
    for (i, wr) in wv.iter().enumerate() {
        for (j, wc) in wu.iter().enumerate() {
            let weight = wr * wc;
            let value = values(subgrid, cell.row + i - 1, cell.col + j - 1);
            for (r, p) in result.iter_mut().zip(value) {
                *r = mul_add!(weight, p, *r);
            }
        }
    }
    Some(result)
}

fn interpolate(subgrid: &SubGrid, cell: &Cell, method: InterpolationMethod) -> [f64; 4] {
    match method {
        InterpolationMethod::Bilinear => bilinear(subgrid, cell),
        InterpolationMethod::Bicubic => bicubic(subgrid, cell).unwrap_or_else(|| {
            tracing::debug!(
                subgrid = subgrid.name(),
                row = cell.row,
                col = cell.col,
                "bicubic margin unavailable, using bilinear"
            );
            bilinear(subgrid, cell)
        }),
    }
}

/// Max horizontal accuracy of the four corners, unknown ones excluded.
fn corner_accuracy(subgrid: &SubGrid, cell: &Cell) -> Option<f64> {
    [(0, 0), (0, 1), (1, 0), (1, 1)]
        .into_iter()
        .filter_map(|(dr, dc)| subgrid.node(cell.row + dr, cell.col + dc))
        .filter_map(|node| node.horizontal_accuracy())
        .reduce(f64::max)
}

/// Returns `true` if `candidate` should replace `best`,
/// the smaller one, or the child of the other when areas agree.
fn prefer(candidate: &SubGrid, best: &SubGrid) -> bool {
    const TOLERANCE: f64 = 1e-12;

    let (a, b) = (candidate.area(), best.area());
    if a < b * (1.0 - TOLERANCE) {
        true
    } else if a <= b * (1.0 + TOLERANCE) {
        candidate.parent() == Some(best.name())
    } else {
        false
    }
}

/// Returns the subgrid owning (`latitude`, `longitude`) \[deg\].
///
/// Ownership is half-open: a subgrid owns its southern and eastern edges
/// but not its northern and western ones, so a shared edge has exactly one owner.
/// A point on the outermost northern or western edge falls back to
/// closed containment.
/// Among owners, the smallest wins, then the child of another owner,
/// then the first in file order.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if no subgrid contains the point.
pub fn select_subgrid(grid: &Ntv2Grid, latitude: f64, longitude: f64) -> Result<&SubGrid> {
    let (lat_s, lon_w) = to_ntv2_seconds(latitude, longitude);

    let pick = |closed: bool| {
        grid.subgrids()
            .iter()
            .filter(|s| s.covers(lat_s, lon_w, closed))
            .fold(None, |best: Option<&SubGrid>, s| match best {
                Some(b) if !prefer(s, b) => Some(b),
                _ => Some(s),
            })
    };

    pick(false)
        .or_else(|| pick(true))
        .ok_or_else(|| Error::out_of_bounds(latitude, longitude))
}

/// Returns the bilinearly interpolated (Δlat, Δlon) \[sec\] at
/// (`latitude`, `longitude`) \[deg\], Δlon positive west.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if `subgrid` does not contain the point.
pub fn bilinear_interpolation(subgrid: &SubGrid, latitude: f64, longitude: f64) -> Result<(f64, f64)> {
    let cell = Cell::locate(subgrid, latitude, longitude)?;
    let r = bilinear(subgrid, &cell);
    Ok((r[0], r[1]))
}

/// Returns the (Δlat, Δlon) \[sec\] interpolated by cubic convolution over
/// the 4×4 neighbourhood at (`latitude`, `longitude`) \[deg\], Δlon positive west.
///
/// Where the enclosing cell touches the subgrid edge, the result is bilinear.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if `subgrid` does not contain the point.
pub fn bicubic_interpolation(subgrid: &SubGrid, latitude: f64, longitude: f64) -> Result<(f64, f64)> {
    let cell = Cell::locate(subgrid, latitude, longitude)?;
    let r = interpolate(subgrid, &cell, InterpolationMethod::Bicubic);
    Ok((r[0], r[1]))
}

/// Returns the shift at (`latitude`, `longitude`) \[deg\] from the owning subgrid.
///
/// The combined accuracy is the maximum of the enclosing cell's corner
/// accuracies `hypot(lat_accuracy, lon_accuracy)`.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if no subgrid contains the point.
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// # use datumtrans::ntv2::*;
/// let extent = Extent { south: 0.0, north: 60.0, east: 0.0, west: 60.0, lat_inc: 60.0, lon_inc: 60.0 };
/// let nodes = vec![
///     Node::new(1.0, 2.0, 0.03, 0.04),
///     Node::new(1.0, 2.0, 0.03, 0.04),
///     Node::new(3.0, 2.0, 0.06, 0.08),
///     Node::new(3.0, 2.0, 0.03, 0.04),
/// ];
/// let grid = Ntv2Grid::new(
///     ntv2::Header::new("NTv2.0", "A", "B", &Ellipsoid::GRS80, &Ellipsoid::GRS80),
///     vec![SubGrid::new("ONLY", None, extent, nodes)?],
/// );
///
/// // midway between rows, 30" north, 30" west of (0, 0)
/// let shift = interpolate_ntv2(&grid, 30.0 / 3600.0, -30.0 / 3600.0, InterpolationMethod::Bilinear)?;
/// assert!((shift.latitude - 2.0).abs() < 1e-12);
/// assert!((shift.longitude - 2.0).abs() < 1e-12);
/// assert!((shift.accuracy.unwrap() - 0.1).abs() < 1e-7);
/// # Ok::<(), Error>(())
/// ```
pub fn interpolate_ntv2(
    grid: &Ntv2Grid,
    latitude: f64,
    longitude: f64,
    method: InterpolationMethod,
) -> Result<GridShift> {
    let subgrid = select_subgrid(grid, latitude, longitude)?;
    let cell = Cell::locate(subgrid, latitude, longitude)?;
    let r = interpolate(subgrid, &cell, method);

    Ok(GridShift {
        latitude: r[0],
        longitude: r[1],
        latitude_accuracy: r[2],
        longitude_accuracy: r[3],
        accuracy: corner_accuracy(subgrid, &cell),
    })
}
