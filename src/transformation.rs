//! Provides [`Transformation`], [`Parameters`] and [`TransformationSD`].
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::epoch::Epoch;
use crate::internal::mul_add;
use crate::{Error, Result};

/// The seven Helmert parameters, or their secular rates.
///
/// Units are \[m\] for translations, \[ppm\] for scale and \[sec\] for rotations,
/// per year for rates.
///
/// # Example
///
/// ```
/// # use datumtrans::Parameters;
/// let p = Parameters::new(0.06155, -0.01087, -0.04019, -0.009994, -0.0394924, -0.0327221, -0.0328979);
/// assert_eq!(p.negate().negate(), p);
/// assert_eq!(p.negate().tx, -0.06155);
/// ```
#[derive(Debug, PartialEq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameters {
    /// Translation along X \[m\]
    pub tx: f64,
    /// Translation along Y \[m\]
    pub ty: f64,
    /// Translation along Z \[m\]
    pub tz: f64,
    /// Scale \[ppm\]
    pub sc: f64,
    /// Rotation about X \[sec\]
    pub rx: f64,
    /// Rotation about Y \[sec\]
    pub ry: f64,
    /// Rotation about Z \[sec\]
    pub rz: f64,
}

impl From<[f64; 7]> for Parameters {
    #[inline]
    fn from(value: [f64; 7]) -> Self {
        Self::new(
            value[0], value[1], value[2], value[3], value[4], value[5], value[6],
        )
    }
}

impl From<Parameters> for [f64; 7] {
    #[inline]
    fn from(value: Parameters) -> Self {
        value.to_array()
    }
}

impl Parameters {
    /// All-zero parameters.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    /// Makes a [`Parameters`] in (tx, ty, tz, sc, rx, ry, rz) order.
    #[inline]
    pub const fn new(tx: f64, ty: f64, tz: f64, sc: f64, rx: f64, ry: f64, rz: f64) -> Self {
        Self {
            tx,
            ty,
            tz,
            sc,
            rx,
            ry,
            rz,
        }
    }

    /// Returns (tx, ty, tz, sc, rx, ry, rz).
    #[inline]
    pub const fn to_array(&self) -> [f64; 7] {
        [
            self.tx, self.ty, self.tz, self.sc, self.rx, self.ry, self.rz,
        ]
    }

    /// Returns the parameters with every component negated.
    #[inline]
    pub fn negate(&self) -> Self {
        self.map(|v| -v)
    }

    /// Returns `self + rates * years` component-wise.
    #[inline]
    pub fn propagate(&self, rates: &Self, years: f64) -> Self {
        self.zip(rates, |p, r| mul_add!(r, years, p))
    }

    #[inline]
    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.to_array().map(f).into()
    }

    #[inline]
    fn zip(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let (a, b) = (self.to_array(), other.to_array());
        std::array::from_fn::<f64, 7, _>(|i| f(a[i], b[i])).into()
    }
}

/// One-sigma uncertainties of the parameters and rates of a [`Transformation`].
///
/// Used only to propagate uncertainty, never for the coordinate math itself.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformationSD {
    /// Uncertainties of the parameters
    pub parameters: Parameters,
    /// Uncertainties of the rates
    pub rates: Parameters,
}

impl TransformationSD {
    /// Makes a [`TransformationSD`].
    #[inline]
    pub const fn new(parameters: Parameters, rates: Parameters) -> Self {
        Self { parameters, rates }
    }

    /// Returns the uncertainties of the effective parameters
    /// after `years`, √(σₚ² + (σᵣ·Δ𝑡)²).
    pub fn propagate(&self, years: f64) -> Parameters {
        self.parameters
            .zip(&self.rates, |p, r| f64::hypot(p, r * years))
    }

    /// Returns the uncertainties of the sum of two independent transformations.
    fn sum(&self, other: &Self) -> Self {
        Self {
            parameters: self.parameters.zip(&other.parameters, f64::hypot),
            rates: self.rates.zip(&other.rates, f64::hypot),
        }
    }
}

/// A 7- or 14-parameter Helmert transformation between two frames.
///
/// Parameters follow the position-vector rotation convention,
/// see [`apply_static`](crate::helmert::apply_static).
/// A static transformation has no reference epoch and zero rates.
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// let t = Transformation::new_dynamic(
///     "ITRF2014",
///     "GDA2020",
///     Epoch::new(2020, 1, 1).unwrap(),
///     Parameters::ZERO,
///     Parameters::new(0.0, 0.0, 0.0, 0.0, -0.00150379, -0.00118346, -0.00120716),
/// );
///
/// let reversed = t.negate();
/// assert_eq!(reversed.from(), "GDA2020");
/// assert_eq!(reversed.to(), "ITRF2014");
/// assert_eq!(reversed.reference_epoch(), t.reference_epoch());
/// assert_eq!(reversed.negate(), t);
///
/// let effective = t.at_epoch(&Epoch::new(2010, 1, 1).unwrap());
/// assert!((effective.rx - 0.0150379).abs() < 1e-12);
/// ```
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transformation {
    from: String,
    to: String,
    #[cfg_attr(feature = "serde", serde(default))]
    reference_epoch: Option<Epoch>,
    parameters: Parameters,
    #[cfg_attr(feature = "serde", serde(default))]
    rates: Parameters,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    sd: Option<TransformationSD>,
}

impl Transformation {
    /// Makes a static 7-parameter [`Transformation`].
    pub fn new_static(from: impl Into<String>, to: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            reference_epoch: None,
            parameters,
            rates: Parameters::ZERO,
            sd: None,
        }
    }

    /// Makes a time-dependent 14-parameter [`Transformation`].
    pub fn new_dynamic(
        from: impl Into<String>,
        to: impl Into<String>,
        reference_epoch: Epoch,
        parameters: Parameters,
        rates: Parameters,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            reference_epoch: Some(reference_epoch),
            parameters,
            rates,
            sd: None,
        }
    }

    /// Makes a time-dependent [`Transformation`] from an IERS table,
    /// translations in \[mm\], scale in \[ppb\] and rotations in \[mas\]
    /// (and the same per year for rates).
    ///
    /// IERS tables use the position-vector convention, so signs are kept.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::*;
    /// let t = Transformation::from_iers(
    ///     "ITRF2014",
    ///     "ITRF2008",
    ///     Epoch::new(2010, 1, 1).unwrap(),
    ///     [1.6, 1.9, 2.4, -0.02, 0.0, 0.0, 0.0],
    ///     [0.0, 0.0, -0.1, 0.03, 0.0, 0.0, 0.0],
    /// );
    /// assert!((t.parameters().tx - 0.0016).abs() < 1e-15);
    /// assert!((t.parameters().sc - -0.00002).abs() < 1e-15);
    /// assert!((t.rates().tz - -0.0001).abs() < 1e-15);
    /// ```
    pub fn from_iers(
        from: impl Into<String>,
        to: impl Into<String>,
        reference_epoch: Epoch,
        parameters: [f64; 7],
        rates: [f64; 7],
    ) -> Self {
        fn convert(v: [f64; 7]) -> Parameters {
            Parameters::new(
                v[0] / 1000.0,
                v[1] / 1000.0,
                v[2] / 1000.0,
                v[3] / 1000.0,
                v[4] / 1000.0,
                v[5] / 1000.0,
                v[6] / 1000.0,
            )
        }

        Self::new_dynamic(from, to, reference_epoch, convert(parameters), convert(rates))
    }

    /// Makes a [`Transformation`] from a table published in the
    /// coordinate-frame rotation convention, units as [`Parameters`].
    ///
    /// Rotations and rotation rates are negated into the position-vector form.
    /// Rates are ignored when `reference_epoch` is [`None`].
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::*;
    /// let t = Transformation::from_coordinate_frame(
    ///     "GDA94",
    ///     "GDA2020",
    ///     None,
    ///     Parameters::new(0.06155, -0.01087, -0.04019, -0.009994, -0.0394924, -0.0327221, -0.0328979),
    ///     Parameters::ZERO,
    /// );
    /// assert_eq!(t.parameters().tx, 0.06155);
    /// assert_eq!(t.parameters().rx, 0.0394924);
    /// assert!(!t.is_dynamic());
    /// ```
    pub fn from_coordinate_frame(
        from: impl Into<String>,
        to: impl Into<String>,
        reference_epoch: Option<Epoch>,
        parameters: Parameters,
        rates: Parameters,
    ) -> Self {
        fn flip(p: Parameters) -> Parameters {
            Parameters {
                rx: -p.rx,
                ry: -p.ry,
                rz: -p.rz,
                ..p
            }
        }

        match reference_epoch {
            Some(epoch) => Self::new_dynamic(from, to, epoch, flip(parameters), flip(rates)),
            None => Self::new_static(from, to, flip(parameters)),
        }
    }

    /// Attaches parameter uncertainties.
    #[inline]
    pub fn with_sd(mut self, sd: TransformationSD) -> Self {
        self.sd = Some(sd);
        self
    }

    /// Source frame.
    #[inline]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Target frame.
    #[inline]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Reference epoch, [`None`] for a static transformation.
    #[inline]
    pub const fn reference_epoch(&self) -> Option<&Epoch> {
        self.reference_epoch.as_ref()
    }

    /// Parameters at the reference epoch.
    #[inline]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Secular rates, per year.
    #[inline]
    pub const fn rates(&self) -> &Parameters {
        &self.rates
    }

    /// Parameter uncertainties, if known.
    #[inline]
    pub const fn sd(&self) -> Option<&TransformationSD> {
        self.sd.as_ref()
    }

    /// Returns `true` if the transformation is time-dependent.
    #[inline]
    pub const fn is_dynamic(&self) -> bool {
        self.reference_epoch.is_some()
    }

    /// Returns signed elapsed years from the reference epoch to `epoch`,
    /// zero for a static transformation.
    #[inline]
    pub fn elapsed(&self, epoch: &Epoch) -> f64 {
        self.reference_epoch
            .map_or(0.0, |reference| epoch.years_since(&reference))
    }

    /// Returns the effective parameters at `epoch`, `p + rate·Δ𝑡`.
    #[inline]
    pub fn at_epoch(&self, epoch: &Epoch) -> Parameters {
        self.parameters.propagate(&self.rates, self.elapsed(epoch))
    }

    /// Returns the static transformation evaluated at `epoch`.
    ///
    /// Uncertainties of rates are folded into the parameter uncertainties.
    pub fn evaluate(&self, epoch: &Epoch) -> Self {
        let years = self.elapsed(epoch);
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            reference_epoch: None,
            parameters: self.parameters.propagate(&self.rates, years),
            rates: Parameters::ZERO,
            sd: self
                .sd
                .map(|sd| TransformationSD::new(sd.propagate(years), Parameters::ZERO)),
        }
    }

    /// Returns the reverse transformation.
    ///
    /// Every parameter and rate is negated, frames are swapped
    /// and the reference epoch is kept. Uncertainties are unchanged.
    pub fn negate(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            reference_epoch: self.reference_epoch,
            parameters: self.parameters.negate(),
            rates: self.rates.negate(),
            sd: self.sd,
        }
    }

    /// Sums two time-dependent transformations sharing a reference epoch
    /// into a through transformation `self.from` → `other.to`.
    ///
    /// The sum is a first-order approximation of applying both in sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochMismatch`] unless both are time-dependent with
    /// equal reference epochs, and [`Error::FrameMismatch`] unless
    /// `self.to() == other.from()`.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::*;
    /// let epoch = Epoch::new(2020, 1, 1).unwrap();
    /// let a = Transformation::new_dynamic("A", "B", epoch, Parameters::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0), Parameters::ZERO);
    /// let b = Transformation::new_dynamic("B", "C", epoch, Parameters::new(2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0), Parameters::ZERO);
    ///
    /// let c = a.compose_same_epoch(&b)?;
    /// assert_eq!((c.from(), c.to()), ("A", "C"));
    /// assert_eq!(c.parameters().tx, 3.0);
    ///
    /// let static_b = Transformation::new_static("B", "C", Parameters::ZERO);
    /// assert!(matches!(a.compose_same_epoch(&static_b), Err(Error::EpochMismatch { .. })));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn compose_same_epoch(&self, other: &Self) -> Result<Self> {
        match (self.reference_epoch, other.reference_epoch) {
            (Some(left), Some(right)) if left == right => (),
            (left, right) => return Err(Error::EpochMismatch { left, right }),
        }

        if self.to != other.from {
            return Err(Error::FrameMismatch {
                left_to: self.to.clone(),
                right_from: other.from.clone(),
            });
        }

        let add = |a: f64, b: f64| a + b;
        Ok(Self {
            from: self.from.clone(),
            to: other.to.clone(),
            reference_epoch: self.reference_epoch,
            parameters: self.parameters.zip(&other.parameters, add),
            rates: self.rates.zip(&other.rates, add),
            sd: match (&self.sd, &other.sd) {
                (Some(a), Some(b)) => Some(a.sum(b)),
                _ => None,
            },
        })
    }
}

impl Display for Transformation {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Transformation: From '{}' to '{}'", self.from, self.to)?;
        match &self.reference_epoch {
            Some(epoch) => writeln!(f, ", Reference Epoch: {}", epoch)?,
            None => writeln!(f)?,
        }

        let rows = [
            ("tX", self.parameters.tx, self.rates.tx, "Meters"),
            ("tY", self.parameters.ty, self.rates.ty, "Meters"),
            ("tZ", self.parameters.tz, self.rates.tz, "Meters"),
            ("Scale", self.parameters.sc, self.rates.sc, "Parts Per Million"),
            ("rX", self.parameters.rx, self.rates.rx, "Arc Seconds"),
            ("rY", self.parameters.ry, self.rates.ry, "Arc Seconds"),
            ("rZ", self.parameters.rz, self.rates.rz, "Arc Seconds"),
        ];

        for (i, (name, value, rate, unit)) in rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}: {:.6} {}", name, value, unit)?;
            if self.is_dynamic() {
                write!(f, " + {:.6} {}/yr", rate, unit)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Transformation {
        Transformation::new_dynamic(
            "ITRF2008",
            "GDA94",
            Epoch::new(1994, 1, 1).unwrap(),
            Parameters::new(
                -0.08468, -0.01942, 0.03201, 0.00971, 0.0004254, -0.0022578, -0.0024015,
            ),
            Parameters::new(
                0.00142, 0.00134, 0.00090, 0.000109, -0.0015461, -0.001820, -0.0011551,
            ),
        )
    }

    mod test_parameters {
        use super::*;

        #[test]
        fn test_propagate() {
            let p = Parameters::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0);
            let r = Parameters::new(0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5);

            assert_eq!(p.propagate(&r, 0.0), p);
            assert_eq!(
                p.propagate(&r, 2.0),
                Parameters::new(2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0)
            );
            assert_eq!(
                p.propagate(&r, -2.0),
                Parameters::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0)
            );
        }

        #[test]
        fn test_array() {
            let p = Parameters::from([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
            assert_eq!(p.sc, 4.0);
            assert_eq!(p.rz, 7.0);
            assert_eq!(<[f64; 7]>::from(p), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        }
    }

    mod test_transformation {
        use super::*;

        #[test]
        fn test_negate() {
            let t = sample();
            let n = t.negate();

            assert_eq!(n.from(), "GDA94");
            assert_eq!(n.to(), "ITRF2008");
            assert_eq!(n.reference_epoch(), t.reference_epoch());
            assert_eq!(n.parameters(), &t.parameters().negate());
            assert_eq!(n.rates(), &t.rates().negate());
            assert_eq!(n.negate(), t);
        }

        #[test]
        fn test_at_epoch() {
            let t = sample();

            assert_eq!(&t.at_epoch(&Epoch::new(1994, 1, 1).unwrap()), t.parameters());

            let actual = t.at_epoch(&Epoch::new(2004, 1, 1).unwrap());
            assert!((actual.tx - (-0.08468 + 0.0142)).abs() < 1e-12);
            assert!((actual.rz - (-0.0024015 - 0.011551)).abs() < 1e-12);
        }

        #[test]
        fn test_evaluate() {
            let t = sample().with_sd(TransformationSD::new(
                Parameters::new(0.003, 0.003, 0.003, 0.0, 0.0, 0.0, 0.0),
                Parameters::new(0.0004, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            ));
            let epoch = Epoch::new(2004, 1, 1).unwrap();
            let actual = t.evaluate(&epoch);

            assert!(!actual.is_dynamic());
            assert_eq!(actual.parameters(), &t.at_epoch(&epoch));
            assert_eq!(actual.rates(), &Parameters::ZERO);

            let sd = actual.sd().unwrap();
            assert!((sd.parameters.tx - 0.005).abs() < 1e-12);
            assert_eq!(sd.parameters.ty, 0.003);
        }

        #[test]
        fn test_static() {
            let t = Transformation::new_static(
                "AGD84",
                "GDA94",
                Parameters::new(-117.763, -51.510, 139.061, -0.191, -0.292, -0.443, -0.277),
            );

            assert!(!t.is_dynamic());
            assert_eq!(t.elapsed(&Epoch::new(2000, 6, 1).unwrap()), 0.0);
            assert_eq!(&t.at_epoch(&Epoch::new(2000, 6, 1).unwrap()), t.parameters());
        }

        #[test]
        fn test_compose_same_epoch() {
            let epoch = Epoch::new(2010, 1, 1).unwrap();
            let a = Transformation::from_iers(
                "ITRF2014",
                "ITRF2008",
                epoch,
                [1.6, 1.9, 2.4, -0.02, 0.0, 0.0, 0.0],
                [0.0, 0.0, -0.1, 0.03, 0.0, 0.0, 0.0],
            );
            let b = Transformation::new_dynamic(
                "ITRF2008",
                "ITRF2005",
                epoch,
                Parameters::new(0.001, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
                Parameters::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.001),
            );

            let c = a.compose_same_epoch(&b).unwrap();
            assert_eq!(c.from(), "ITRF2014");
            assert_eq!(c.to(), "ITRF2005");
            assert_eq!(c.reference_epoch(), Some(&epoch));
            assert!((c.parameters().tx - 0.0026).abs() < 1e-15);
            assert_eq!(c.rates().rz, 0.001);
            assert_eq!(c.sd(), None);
        }

        #[test]
        fn test_compose_same_epoch_errors() {
            let a = sample();
            let b = Transformation::new_dynamic(
                "GDA94",
                "X",
                Epoch::new(2000, 1, 1).unwrap(),
                Parameters::ZERO,
                Parameters::ZERO,
            );
            assert!(matches!(
                a.compose_same_epoch(&b),
                Err(Error::EpochMismatch { .. })
            ));

            let b = Transformation::new_dynamic(
                "ITRF2014",
                "X",
                Epoch::new(1994, 1, 1).unwrap(),
                Parameters::ZERO,
                Parameters::ZERO,
            );
            match a.compose_same_epoch(&b) {
                Err(Error::FrameMismatch {
                    left_to,
                    right_from,
                }) => {
                    assert_eq!(left_to, "GDA94");
                    assert_eq!(right_from, "ITRF2014");
                }
                other => panic!("unexpected {:?}", other),
            }

            let s = Transformation::new_static("GDA94", "GDA2020", Parameters::ZERO);
            assert!(matches!(
                s.compose_same_epoch(&s.negate()),
                Err(Error::EpochMismatch {
                    left: None,
                    right: None
                })
            ));
        }

        #[test]
        fn test_display() {
            let t = Transformation::new_static(
                "GDA94",
                "GDA2020",
                Parameters::new(0.06155, -0.01087, -0.04019, -0.009994, 0.0394924, 0.0327221, 0.0328979),
            );
            let s = t.to_string();
            assert!(s.starts_with("Transformation: From 'GDA94' to 'GDA2020'\n"));
            assert!(s.contains("  tX: 0.061550 Meters"));
            assert!(s.contains("  Scale: -0.009994 Parts Per Million"));
            assert!(!s.contains("/yr"));

            let s = sample().to_string();
            assert!(s.contains("Reference Epoch: 1994-01-01"));
            assert!(s.contains("  tX: -0.084680 Meters + 0.001420 Meters/yr"));
        }

        #[test]
        #[cfg(feature = "serde")]
        fn test_serde() {
            let t = sample();
            let json = serde_json::to_string(&t).unwrap();
            let back: Transformation = serde_json::from_str(&json).unwrap();
            assert_eq!(back, t);
        }
    }
}
