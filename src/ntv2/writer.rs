//! Provides [`Ntv2Grid::to_bytes`].
use super::parser::{KNOWN_RECORDS, RECORD};
use super::{ByteOrder, Header, Ntv2Grid, SubGrid};

struct Writer {
    buf: Vec<u8>,
    order: ByteOrder,
}

impl Writer {
    fn key(&mut self, key: &str) {
        self.text_field(key);
    }

    /// Writes `s` truncated or blank-padded to 8 bytes.
    fn text_field(&mut self, s: &str) {
        let mut field = [b' '; 8];
        for (f, b) in field.iter_mut().zip(s.bytes()) {
            *f = b;
        }
        self.buf.extend_from_slice(&field);
    }

    fn int(&mut self, key: &str, value: i32) {
        self.key(key);
        match self.order {
            ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
        }
        self.buf.extend_from_slice(&[0; 4]);
    }

    fn float(&mut self, key: &str, value: f64) {
        self.key(key);
        match self.order {
            ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn text(&mut self, key: &str, value: &str) {
        self.key(key);
        self.text_field(value);
    }

    fn f32(&mut self, value: f32) {
        match self.order {
            ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn header(&mut self, header: &Header, num_file: usize) {
        self.int("NUM_OREC", KNOWN_RECORDS);
        self.int("NUM_SREC", KNOWN_RECORDS);
        self.int("NUM_FILE", num_file as i32);
        self.text("GS_TYPE", "SECONDS");
        self.text("VERSION", &header.version);
        self.text("SYSTEM_F", &header.system_f);
        self.text("SYSTEM_T", &header.system_t);
        self.float("MAJOR_F", header.major_f);
        self.float("MINOR_F", header.minor_f);
        self.float("MAJOR_T", header.major_t);
        self.float("MINOR_T", header.minor_t);
    }

    fn subgrid(&mut self, subgrid: &SubGrid) {
        let extent = subgrid.extent();

        self.text("SUB_NAME", subgrid.name());
        self.text("PARENT", subgrid.parent().unwrap_or("NONE"));
        self.text("CREATED", subgrid.created());
        self.text("UPDATED", subgrid.updated());
        self.float("S_LAT", extent.south);
        self.float("N_LAT", extent.north);
        self.float("E_LONG", extent.east);
        self.float("W_LONG", extent.west);
        self.float("LAT_INC", extent.lat_inc);
        self.float("LONG_INC", extent.lon_inc);
        self.int("GS_COUNT", subgrid.nodes().len() as i32);

        for node in subgrid.nodes() {
            self.f32(node.lat_shift);
            self.f32(node.lon_shift);
            self.f32(node.lat_accuracy);
            self.f32(node.lon_accuracy);
        }
    }

    fn trailer(&mut self) {
        self.key("END");
        self.buf.extend_from_slice(&[0; 8]);
    }
}

impl Ntv2Grid {
    /// Serializes into a NTv2 grid file in `order`.
    ///
    /// Output has the canonical layout, 11 overview header records,
    /// 11 records per sub-header and an `END` trailer.
    /// Text fields are truncated or blank-padded to 8 bytes.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::*;
    /// # use datumtrans::ntv2::*;
    /// let grid = Ntv2Grid::new(
    ///     Header::new("NTv2.0", "A", "B", &Ellipsoid::GRS80, &Ellipsoid::GRS80),
    ///     vec![],
    /// );
    ///
    /// let bytes = grid.to_bytes(ByteOrder::Little);
    /// assert_eq!(bytes.len(), 12 * 16);
    /// assert_eq!(&bytes[..8], b"NUM_OREC");
    /// assert_eq!(&bytes[8..12], &[11, 0, 0, 0]);
    /// ```
    pub fn to_bytes(&self, order: ByteOrder) -> Vec<u8> {
        let size = self
            .subgrids()
            .iter()
            .map(|s| (KNOWN_RECORDS as usize + s.nodes().len()) * RECORD)
            .sum::<usize>()
            + (KNOWN_RECORDS as usize + 1) * RECORD;

        let mut writer = Writer {
            buf: Vec::with_capacity(size),
            order,
        };

        writer.header(self.header(), self.subgrids().len());
        for subgrid in self.subgrids() {
            writer.subgrid(subgrid);
        }
        writer.trailer();

        writer.buf
    }
}
