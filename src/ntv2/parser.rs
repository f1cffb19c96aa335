//! Provides [`read_grid`].
use std::collections::BTreeSet;

use super::{ByteOrder, Extent, Header, Node, Ntv2Grid, SubGrid};
use crate::error::{FormatError, FormatErrorKind};
use crate::Result;

/// Bytes of a header record and of a node record.
pub(super) const RECORD: usize = 16;

/// Count of the known overview and sub-header records.
pub(super) const KNOWN_RECORDS: i32 = 11;

/// Range of `NUM_OREC` accepted as a byte order sentinel.
const SANE_NUM_OREC: std::ops::RangeInclusive<i32> = 1..=64;

type FormatResult<T> = std::result::Result<T, FormatError>;

/// Decodes an 8-byte text field, trailing blanks and NULs removed.
fn text(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|s| s.is_ascii())
        .map(|s| s.trim_end_matches([' ', '\0']))
}

/// Returns the byte order in which `NUM_OREC` is sane.
fn detect_byte_order(bytes: &[u8]) -> FormatResult<ByteOrder> {
    let value: [u8; 4] = match bytes.get(8..12) {
        Some(value) => value
            .try_into()
            .map_err(|_| FormatError::new(FormatErrorKind::UnexpectedEof, 0))?,
        None if bytes.is_empty() => {
            return Err(FormatError::new(FormatErrorKind::MissingRecord("NUM_OREC"), 0))
        }
        None => return Err(FormatError::new(FormatErrorKind::UnexpectedEof, 0)),
    };

    let little = SANE_NUM_OREC.contains(&ByteOrder::Little.i32(value));
    let big = SANE_NUM_OREC.contains(&ByteOrder::Big.i32(value));

    match (little, big) {
        (true, false) => Ok(ByteOrder::Little),
        (false, true) => Ok(ByteOrder::Big),
        (true, true) => Err(FormatError::new(FormatErrorKind::AmbiguousByteOrder, 0)),
        (false, false) => Err(FormatError::new(FormatErrorKind::UnresolvedByteOrder, 0)),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8], order: ByteOrder) -> Self {
        Self {
            bytes,
            offset: 0,
            order,
        }
    }

    #[inline]
    fn error(&self, kind: FormatErrorKind) -> FormatError {
        FormatError::new(kind, self.offset)
    }

    /// Returns the next `n` bytes.
    fn take(&mut self, n: usize) -> FormatResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.error(FormatErrorKind::UnexpectedEof))?;

        let bytes = self.bytes;
        let slice = &bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Returns the value bytes of the next record, whose key must be `key`.
    fn record(&mut self, key: &'static str) -> FormatResult<[u8; 8]> {
        if self.offset == self.bytes.len() {
            return Err(self.error(FormatErrorKind::MissingRecord(key)));
        }

        let start = self.offset;
        let record = self.take(RECORD)?;
        let (found, value) = record.split_at(8);

        if text(found) != Some(key) {
            return Err(FormatError::new(
                FormatErrorKind::UnexpectedKey {
                    expected: key,
                    found: String::from_utf8_lossy(found).trim_end().to_string(),
                },
                start,
            ));
        }

        let mut buf = [0; 8];
        buf.copy_from_slice(value);
        Ok(buf)
    }

    fn int(&mut self, key: &'static str) -> FormatResult<i32> {
        let value = self.record(key)?;
        Ok(self.order.i32([value[0], value[1], value[2], value[3]]))
    }

    /// Reads a non-negative count.
    fn count(&mut self, key: &'static str) -> FormatResult<usize> {
        let start = self.offset;
        let value = self.int(key)?;
        usize::try_from(value).map_err(|_| FormatError::new(FormatErrorKind::InvalidCount, start))
    }

    fn float(&mut self, key: &'static str) -> FormatResult<f64> {
        let value = self.record(key)?;
        Ok(self.order.f64(value))
    }

    fn text(&mut self, key: &'static str) -> FormatResult<String> {
        let start = self.offset;
        let value = self.record(key)?;
        text(&value)
            .map(str::to_string)
            .ok_or_else(|| FormatError::new(FormatErrorKind::InvalidText, start))
    }

    /// Skips records beyond the known ones.
    fn skip_records(&mut self, declared: i32) -> FormatResult<()> {
        let extra = (declared - KNOWN_RECORDS) as usize;
        self.take(extra * RECORD).map(|_| ())
    }

    fn header(&mut self) -> FormatResult<Header> {
        let num_orec = self.int("NUM_OREC")?;
        let start = self.offset;
        let num_srec = self.int("NUM_SREC")?;
        if num_orec < KNOWN_RECORDS || !(KNOWN_RECORDS..=64).contains(&num_srec) {
            return Err(FormatError::new(FormatErrorKind::InvalidCount, start));
        }

        let start = self.offset;
        let num_file = self.int("NUM_FILE")?;
        if num_file < 0 {
            return Err(FormatError::new(FormatErrorKind::InvalidCount, start));
        }

        let start = self.offset;
        let gs_type = self.text("GS_TYPE")?;
        if !gs_type.eq_ignore_ascii_case("SECONDS") {
            return Err(FormatError::new(FormatErrorKind::UnsupportedUnit(gs_type), start));
        }

        let header = Header {
            num_orec,
            num_srec,
            num_file,
            gs_type,
            version: self.text("VERSION")?,
            system_f: self.text("SYSTEM_F")?,
            system_t: self.text("SYSTEM_T")?,
            major_f: self.float("MAJOR_F")?,
            minor_f: self.float("MINOR_F")?,
            major_t: self.float("MAJOR_T")?,
            minor_t: self.float("MINOR_T")?,
        };

        self.skip_records(num_orec)?;
        Ok(header)
    }

    fn node(&mut self) -> FormatResult<Node> {
        let bytes = self.take(RECORD)?;
        let mut values = [0.0; 4];
        for (v, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = self.order.f32([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Node::from(values))
    }

    fn subgrid(&mut self, num_srec: i32) -> FormatResult<SubGrid> {
        let start = self.offset;

        let name = self.text("SUB_NAME")?;
        let parent = Some(self.text("PARENT")?).filter(|p| !p.eq_ignore_ascii_case("NONE"));
        let created = self.text("CREATED")?;
        let updated = self.text("UPDATED")?;
        let extent = Extent {
            south: self.float("S_LAT")?,
            north: self.float("N_LAT")?,
            east: self.float("E_LONG")?,
            west: self.float("W_LONG")?,
            lat_inc: self.float("LAT_INC")?,
            lon_inc: self.float("LONG_INC")?,
        };
        let count = self.count("GS_COUNT")?;
        self.skip_records(num_srec)?;

        // bound the allocation by what the file can hold
        let available = (self.bytes.len() - self.offset) / RECORD;
        if count > available {
            return Err(self.error(FormatErrorKind::UnexpectedEof));
        }

        let nodes = (0..count)
            .map(|_| self.node())
            .collect::<FormatResult<Vec<_>>>()?;

        SubGrid::from_parts(name, parent, created, updated, extent, nodes)
            .map_err(|kind| FormatError::new(kind, start))
    }

    /// Reads the `END` record if any bytes remain.
    fn trailer(&mut self) -> FormatResult<()> {
        if self.offset < self.bytes.len() {
            self.record("END")?;
        }
        Ok(())
    }
}

/// Deserializes a NTv2 grid file into a [`Ntv2Grid`].
///
/// The byte order is detected from `NUM_OREC`.
/// The grid is returned only when the whole file is valid.
///
/// # Errors
///
/// Returns [`Error::Format`](crate::Error::Format) if the byte order cannot be resolved,
/// a record is missing, misplaced or truncated, the shift unit is not `SECONDS`,
/// or a subgrid's node count disagrees with its extent.
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// # use datumtrans::ntv2::*;
/// let extent = Extent { south: 0.0, north: 60.0, east: 0.0, west: 60.0, lat_inc: 60.0, lon_inc: 60.0 };
/// let grid = Ntv2Grid::new(
///     Header::new("NTv2.0", "A", "B", &Ellipsoid::GRS80, &Ellipsoid::GRS80),
///     vec![SubGrid::new("ONLY", None, extent, vec![Node::default(); 4])?],
/// );
///
/// let bytes = grid.to_bytes(ByteOrder::Big);
/// assert_eq!(read_grid(&bytes)?, grid);
///
/// assert!(read_grid(&bytes[..100]).is_err());
/// # Ok::<(), Error>(())
/// ```
pub fn read_grid(bytes: &[u8]) -> Result<Ntv2Grid> {
    let order = detect_byte_order(bytes)?;
    let mut reader = Reader::new(bytes, order);

    let header = reader.header()?;
    let subgrids = (0..header.num_file)
        .map(|_| reader.subgrid(header.num_srec))
        .collect::<FormatResult<Vec<_>>>()?;
    reader.trailer()?;

    let names: BTreeSet<&str> = subgrids.iter().map(SubGrid::name).collect();
    for subgrid in &subgrids {
        if let Some(parent) = subgrid.parent().filter(|p| !names.contains(p)) {
            tracing::warn!(subgrid = subgrid.name(), parent, "subgrid refers to an unknown parent");
        }
    }

    tracing::debug!(
        system_f = %header.system_f,
        system_t = %header.system_t,
        subgrids = subgrids.len(),
        ?order,
        "loaded NTv2 grid"
    );

    Ok(Ntv2Grid::new(header, subgrids))
}
