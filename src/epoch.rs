//! Provides [`Epoch`].
use std::fmt::{Display, Formatter};

use chrono::{Datelike, NaiveDate};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The point in time at which a coordinate or transformation parameters are valid.
///
/// Epochs are calendar dates; elapsed time between two epochs is measured
/// in signed fractional years of their decimal-year representations.
///
/// # Example
///
/// ```
/// # use datumtrans::Epoch;
/// let epoch = Epoch::new(2011, 1, 1).unwrap();
/// let reference = Epoch::new(2020, 1, 1).unwrap();
///
/// assert_eq!(epoch.decimal_year(), 2011.0);
/// assert_eq!(epoch.years_since(&reference), -9.0);
/// assert_eq!(epoch.to_string(), "2011-01-01");
/// ```
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Epoch(NaiveDate);

impl From<NaiveDate> for Epoch {
    #[inline]
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl From<Epoch> for NaiveDate {
    #[inline]
    fn from(value: Epoch) -> Self {
        value.0
    }
}

impl Epoch {
    /// Makes an [`Epoch`] from a calendar date.
    ///
    /// Returns [`None`] if the date is invalid.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::Epoch;
    /// assert!(Epoch::new(2020, 2, 29).is_some());
    /// assert!(Epoch::new(2019, 2, 29).is_none());
    /// ```
    #[inline]
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Makes an [`Epoch`] on the first of January of `year`.
    #[inline]
    pub fn start_of_year(year: i32) -> Option<Self> {
        Self::new(year, 1, 1)
    }

    /// First of January of a tabulated year, which is always representable.
    #[inline]
    pub(crate) fn jan1(year: i32) -> Self {
        Self(NaiveDate::from_yo_opt(year, 1).unwrap_or(NaiveDate::MIN))
    }

    /// Returns the calendar date.
    #[inline]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the decimal year, `year + (day_of_year - 1) / days_in_year`.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::Epoch;
    /// assert_eq!(Epoch::new(2018, 1, 1).unwrap().decimal_year(), 2018.0);
    /// assert_eq!(Epoch::new(2020, 7, 2).unwrap().decimal_year(), 2020.5);
    /// ```
    pub fn decimal_year(&self) -> f64 {
        let year = self.0.year();
        let days = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
            366.0
        } else {
            365.0
        };
        year as f64 + self.0.ordinal0() as f64 / days
    }

    /// Returns the signed elapsed years from `reference` to `self`.
    #[inline]
    pub fn years_since(&self, reference: &Epoch) -> f64 {
        self.decimal_year() - reference.decimal_year()
    }

    /// Makes an [`Epoch`] from `YYYY.DOY` or `YYYYDOY` notation.
    ///
    /// Returns [`None`] if `s` is not in either notation
    /// or the day-of-year does not exist.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::Epoch;
    /// assert_eq!(Epoch::from_yyyydoy("2020.004"), Epoch::new(2020, 1, 4));
    /// assert_eq!(Epoch::from_yyyydoy("2008060"), Epoch::new(2008, 2, 29));
    /// assert_eq!(Epoch::from_yyyydoy("2020.12"), None);
    /// ```
    pub fn from_yyyydoy(s: &str) -> Option<Self> {
        let (year, doy) = match s.len() {
            8 if s.as_bytes()[4] == b'.' => (s.get(..4)?, s.get(5..)?),
            7 => (s.get(..4)?, s.get(4..)?),
            _ => return None,
        };

        if !year.bytes().chain(doy.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        NaiveDate::from_yo_opt(year.parse().ok()?, doy.parse().ok()?).map(Self)
    }

    /// Returns `YYYY.DOY` notation.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::Epoch;
    /// let epoch = Epoch::new(2020, 10, 12).unwrap();
    /// assert_eq!(epoch.to_yyyydoy(), "2020.286");
    /// ```
    pub fn to_yyyydoy(&self) -> String {
        format!("{:04}.{:03}", self.0.year(), self.0.ordinal())
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    mod test_epoch {
        use super::*;

        #[test]
        fn test_decimal_year() {
            let epoch = Epoch::new(2019, 7, 2).unwrap();
            assert_eq!(epoch.decimal_year(), 2019.0 + 182.0 / 365.0);

            let a = Epoch::new(2011, 1, 1).unwrap();
            let b = Epoch::new(2020, 1, 1).unwrap();
            assert_eq!(a.years_since(&b), -9.0);
            assert_eq!(b.years_since(&a), 9.0);
            assert_eq!(a.years_since(&a), 0.0);
        }

        #[test]
        fn test_to_yyyydoy() {
            assert_eq!(Epoch::new(2020, 1, 4).unwrap().to_yyyydoy(), "2020.004");
            assert_eq!(Epoch::new(2020, 10, 12).unwrap().to_yyyydoy(), "2020.286");
            assert_eq!(Epoch::new(1998, 4, 7).unwrap().to_yyyydoy(), "1998.097");
            assert_eq!(Epoch::new(2000, 11, 22).unwrap().to_yyyydoy(), "2000.327");
            assert_eq!(Epoch::new(2008, 2, 29).unwrap().to_yyyydoy(), "2008.060");
        }

        #[test]
        fn test_from_yyyydoy() {
            assert_eq!(Epoch::from_yyyydoy("2020.004"), Epoch::new(2020, 1, 4));
            assert_eq!(Epoch::from_yyyydoy("2020.286"), Epoch::new(2020, 10, 12));
            assert_eq!(Epoch::from_yyyydoy("1998.097"), Epoch::new(1998, 4, 7));
            assert_eq!(Epoch::from_yyyydoy("2000.327"), Epoch::new(2000, 11, 22));
            assert_eq!(Epoch::from_yyyydoy("2008.060"), Epoch::new(2008, 2, 29));
            assert_eq!(Epoch::from_yyyydoy("2020004"), Epoch::new(2020, 1, 4));
            assert_eq!(Epoch::from_yyyydoy("2020286"), Epoch::new(2020, 10, 12));
            assert_eq!(Epoch::from_yyyydoy("1998097"), Epoch::new(1998, 4, 7));
            assert_eq!(Epoch::from_yyyydoy("2000327"), Epoch::new(2000, 11, 22));
            assert_eq!(Epoch::from_yyyydoy("2008060"), Epoch::new(2008, 2, 29));
        }

        #[test]
        fn test_from_yyyydoy_invalid() {
            assert_eq!(Epoch::from_yyyydoy("a"), None);
            assert_eq!(Epoch::from_yyyydoy("20201234"), None);
            assert_eq!(Epoch::from_yyyydoy("2020.1234"), None);
            assert_eq!(Epoch::from_yyyydoy("202012"), None);
            assert_eq!(Epoch::from_yyyydoy("2020.12"), None);
            assert_eq!(Epoch::from_yyyydoy("2019.366"), None);
            assert_eq!(Epoch::from_yyyydoy("2019.000"), None);
        }

        #[test]
        #[cfg(feature = "serde")]
        fn test_serde() {
            use serde_test::{assert_tokens, Token};

            let epoch = Epoch::new(2020, 1, 1).unwrap();
            assert_tokens(&epoch, &[Token::Str("2020-01-01")]);
        }
    }
}
