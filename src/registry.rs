//! Provides [`Registry`], [`RegistryBuilder`] and the published transformations.
//!
//! Australian tables are published in the coordinate-frame convention and
//! are converted by [`Transformation::from_coordinate_frame`];
//! IERS tables are converted by [`Transformation::from_iers`].
use std::collections::{BTreeMap, BTreeSet};

use crate::epoch::Epoch;
use crate::helmert::{apply_dynamic, apply_static, Cartesian, Vcv};
use crate::transformation::{Parameters, Transformation};
use crate::{Error, Result};

/// An immutable table of [`Transformation`]s keyed by `(from, to)`.
///
/// The reverse of a registered pair is served by negation,
/// there is one slot per frame pair.
///
/// There is a builder, see [`RegistryBuilder`].
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// let registry = Registry::standard();
///
/// let forward = registry.lookup_transformation("GDA94", "GDA2020")?;
/// let reverse = registry.lookup_transformation("GDA2020", "GDA94")?;
/// assert_eq!(reverse, forward.negate());
///
/// assert!(matches!(
///     registry.lookup_transformation("GDA94", "WGS84"),
///     Err(Error::NoPath { .. })
/// ));
/// # Ok::<(), Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Registry {
    transformations: BTreeMap<(String, String), Transformation>,
}

impl Registry {
    /// Makes a [`RegistryBuilder`].
    #[inline]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the registry of published GDA, ITRF and AGD transformations.
    #[inline]
    pub fn standard() -> Self {
        RegistryBuilder::standard().build()
    }

    /// Returns the registered transformation of `(from, to)` without reverse lookup.
    pub fn get(&self, from: &str, to: &str) -> Option<&Transformation> {
        self.transformations
            .get(&(from.to_string(), to.to_string()))
    }

    /// Returns the transformation from `from` to `to`,
    /// the negated `(to, from)` entry if only that is registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPath`] if neither direction is registered.
    pub fn lookup_transformation(&self, from: &str, to: &str) -> Result<Transformation> {
        if let Some(t) = self.get(from, to) {
            return Ok(t.clone());
        }
        self.get(to, from)
            .map(Transformation::negate)
            .ok_or_else(|| Error::no_path(from, to))
    }

    /// Returns every frame appearing in the registry, in lexicographic order.
    pub fn frames(&self) -> BTreeSet<&str> {
        self.transformations
            .keys()
            .flat_map(|(from, to)| [from.as_str(), to.as_str()])
            .collect()
    }

    /// Iterates over registered transformations ordered by `(from, to)`.
    pub fn iter(&self) -> impl Iterator<Item = &Transformation> {
        self.transformations.values()
    }

    /// Returns the number of registered pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    fn apply_at(
        &self,
        from: &str,
        to: &str,
        coordinate: &Cartesian,
        epoch: &Epoch,
        vcv: Option<&Vcv>,
    ) -> Result<(Cartesian, Option<Vcv>)> {
        let t = self.lookup_transformation(from, to)?;
        Ok(apply_dynamic(coordinate, epoch, &t, vcv))
    }

    /// Transforms an ATRF2014 coordinate at `epoch` into GDA2020.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::*;
    /// let registry = Registry::standard();
    /// let epoch = Epoch::new(2011, 1, 1).unwrap();
    /// let c = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
    ///
    /// let (gda2020, _) = registry.atrf2014_to_gda2020(&c, &epoch, None)?;
    /// let (back, _) = registry.gda2020_to_atrf2014(&gda2020, &epoch, None)?;
    /// assert!(back.distance(&c) < 1e-6);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn atrf2014_to_gda2020(
        &self,
        coordinate: &Cartesian,
        epoch: &Epoch,
        vcv: Option<&Vcv>,
    ) -> Result<(Cartesian, Option<Vcv>)> {
        self.apply_at("ATRF2014", "GDA2020", coordinate, epoch, vcv)
    }

    /// Transforms a GDA2020 coordinate into ATRF2014 at `epoch`.
    pub fn gda2020_to_atrf2014(
        &self,
        coordinate: &Cartesian,
        epoch: &Epoch,
        vcv: Option<&Vcv>,
    ) -> Result<(Cartesian, Option<Vcv>)> {
        self.apply_at("GDA2020", "ATRF2014", coordinate, epoch, vcv)
    }

    /// Transforms a GDA94 coordinate into GDA2020.
    pub fn gda94_to_gda2020(
        &self,
        coordinate: &Cartesian,
        vcv: Option<&Vcv>,
    ) -> Result<(Cartesian, Option<Vcv>)> {
        let t = self.lookup_transformation("GDA94", "GDA2020")?;
        Ok(apply_static(coordinate, &t, vcv))
    }

    /// Transforms a GDA2020 coordinate into GDA94.
    pub fn gda2020_to_gda94(
        &self,
        coordinate: &Cartesian,
        vcv: Option<&Vcv>,
    ) -> Result<(Cartesian, Option<Vcv>)> {
        let t = self.lookup_transformation("GDA2020", "GDA94")?;
        Ok(apply_static(coordinate, &t, vcv))
    }
}

/// The builder of [`Registry`].
///
/// A later transformation of the same `(from, to)` replaces the earlier one.
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// let registry = RegistryBuilder::new()
///     .transformation(Transformation::new_static("A", "B", Parameters::ZERO))
///     .transformations([
///         Transformation::new_static("B", "C", Parameters::ZERO),
///         Transformation::new_static("C", "D", Parameters::ZERO),
///     ])
///     .build();
///
/// assert_eq!(registry.len(), 3);
/// assert!(registry.get("C", "B").is_none());
/// assert!(registry.lookup_transformation("C", "B").is_ok());
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    transformations: BTreeMap<(String, String), Transformation>,
}

impl RegistryBuilder {
    /// Makes an empty [`RegistryBuilder`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a [`RegistryBuilder`] filled with the published transformations.
    pub fn standard() -> Self {
        Self::new()
            .transformations([
                gda94_to_gda2020(),
                itrf2014_to_gda2020(),
                atrf2014_to_gda2020(),
                agd84_to_gda94(),
                agd66::national(),
            ])
            .transformations(itrf_to_gda94())
            .transformations(itrf2014_to_itrf())
            .transformations(itrf2008_to_itrf())
            .transformations(itrf2000_to_itrf())
    }

    /// Adds a transformation.
    pub fn transformation(mut self, transformation: Transformation) -> Self {
        self.transformations.insert(
            (
                transformation.from().to_string(),
                transformation.to().to_string(),
            ),
            transformation,
        );
        self
    }

    /// Adds transformations.
    pub fn transformations(self, transformations: impl IntoIterator<Item = Transformation>) -> Self {
        transformations
            .into_iter()
            .fold(self, |builder, t| builder.transformation(t))
    }

    /// Builds the [`Registry`].
    pub fn build(self) -> Registry {
        Registry {
            transformations: self.transformations,
        }
    }
}

/// GDA94 to GDA2020, GDA2020 Technical Manual.
pub fn gda94_to_gda2020() -> Transformation {
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

/// Australian plate motion model, ITRF2014 to GDA2020.
pub fn itrf2014_to_gda2020() -> Transformation {
    plate_motion("ITRF2014")
}

/// Australian plate motion model, ATRF2014 to GDA2020.
pub fn atrf2014_to_gda2020() -> Transformation {
    plate_motion("ATRF2014")
}

fn plate_motion(from: &str) -> Transformation {
    Transformation::from_coordinate_frame(
        from,
        "GDA2020",
        Some(Epoch::jan1(2020)),
        Parameters::ZERO,
        Parameters::new(0.0, 0.0, 0.0, 0.0, 0.00150379, 0.00118346, 0.00120716),
    )
}

/// AGD84 to GDA94, GDA94 Technical Manual.
pub fn agd84_to_gda94() -> Transformation {
    Transformation::from_coordinate_frame(
        "AGD84",
        "GDA94",
        None,
        Parameters::new(-117.763, -51.510, 139.061, -0.191, -0.292, -0.443, -0.277),
        Parameters::ZERO,
    )
}

/// AGD66 to GDA94 transformations.
///
/// Only the national one is registered, regional ones share its frame pair.
pub mod agd66 {
    use super::*;

    fn agd66(parameters: Parameters) -> Transformation {
        Transformation::from_coordinate_frame("AGD66", "GDA94", None, parameters, Parameters::ZERO)
    }

    /// National AGD66 to GDA94.
    pub fn national() -> Transformation {
        agd66(Parameters::new(
            -117.808, -51.536, 137.784, -0.290, -0.303, -0.446, -0.234,
        ))
    }

    /// AGD66 to GDA94 in the Australian Capital Territory.
    pub fn act() -> Transformation {
        agd66(Parameters::new(
            -129.193, -41.212, 130.730, -2.955, -0.246, -0.374, -0.329,
        ))
    }

    /// AGD66 to GDA94 in Tasmania.
    pub fn tas() -> Transformation {
        agd66(Parameters::new(
            -120.271, -64.543, 161.632, 2.499, -0.217, 0.067, 0.129,
        ))
    }

    /// AGD66 to GDA94 in Victoria and New South Wales.
    pub fn vic_nsw() -> Transformation {
        agd66(Parameters::new(
            -119.353, -48.301, 139.484, -0.613, -0.415, -0.260, -0.437,
        ))
    }

    /// AGD66 to GDA94 in the Northern Territory.
    pub fn nt() -> Transformation {
        agd66(Parameters::new(
            -124.133, -42.003, 137.400, -1.854, 0.008, -0.557, -0.178,
        ))
    }
}

/// ITRF realisations to GDA94 at 1994.0, Dawson and Woods (2010).
fn itrf_to_gda94() -> impl Iterator<Item = Transformation> {
    #[rustfmt::skip]
    let table: [(&str, [f64; 7], [f64; 7]); 5] = [
        (
            "ITRF2008",
            [-0.08468, -0.01942, 0.03201, 0.00971, -0.0004254, 0.0022578, 0.0024015],
            [0.00142, 0.00134, 0.00090, 0.000109, 0.0015461, 0.001820, 0.0011551],
        ),
        (
            "ITRF2005",
            [-0.07973, -0.00686, 0.03803, 0.006636, -0.0000351, 0.0021211, 0.0021411],
            [0.00225, -0.00062, -0.00056, 0.000294, 0.0014707, 0.0011443, 0.0011701],
        ),
        (
            "ITRF2000",
            [-0.04591, -0.02985, -0.02037, 0.00707, -0.0016705, 0.0004594, 0.0019356],
            [-0.00466, 0.00355, 0.01124, 0.000249, 0.0017454, 0.0014868, 0.001224],
        ),
        (
            "ITRF1997",
            [-0.01463, -0.02762, -0.02532, 0.006695, -0.0017893, -0.0006047, 0.0009962],
            [-0.00860, 0.00036, 0.01125, 0.000007, 0.0016394, 0.0015198, 0.0013801],
        ),
        (
            "ITRF1996",
            [0.02454, -0.03643, -0.06812, 0.006901, -0.0027359, -0.0020431, 0.0003731],
            [-0.02180, 0.00471, 0.02627, 0.000388, 0.0020203, 0.0021735, 0.0016290],
        ),
    ];

    table.into_iter().map(|(from, p, r)| {
        Transformation::from_coordinate_frame(
            from,
            "GDA94",
            Some(Epoch::jan1(1994)),
            p.into(),
            r.into(),
        )
    })
}

type IersRow = (&'static str, [f64; 7], [f64; 7]);

fn iers(from: &'static str, year: i32, table: Vec<IersRow>) -> impl Iterator<Item = Transformation> {
    table
        .into_iter()
        .map(move |(to, p, r)| Transformation::from_iers(from, to, Epoch::jan1(year), p, r))
}

/// ITRF2014 to older realisations at 2010.0.
fn itrf2014_to_itrf() -> impl Iterator<Item = Transformation> {
    const R97: [f64; 7] = [0.1, -0.5, -3.3, 0.12, 0.0, 0.0, 0.02];

    #[rustfmt::skip]
    let table = vec![
        ("ITRF2008", [1.6, 1.9, 2.4, -0.02, 0.0, 0.0, 0.0], [0.0, 0.0, -0.1, 0.03, 0.0, 0.0, 0.0]),
        ("ITRF2005", [2.6, 1.0, -2.3, 0.92, 0.0, 0.0, 0.0], [0.3, 0.0, -0.1, 0.03, 0.0, 0.0, 0.0]),
        ("ITRF2000", [0.7, 1.2, -26.1, 2.12, 0.0, 0.0, 0.0], [0.1, 0.1, -1.9, 0.11, 0.0, 0.0, 0.0]),
        ("ITRF1997", [7.4, -0.5, -62.8, 3.80, 0.0, 0.0, 0.26], R97),
        ("ITRF1996", [7.4, -0.5, -62.8, 3.80, 0.0, 0.0, 0.26], R97),
        ("ITRF1994", [7.4, -0.5, -62.8, 3.80, 0.0, 0.0, 0.26], R97),
        ("ITRF1993", [-50.4, 3.3, -60.2, 4.29, -2.81, -3.38, 0.40], [-2.8, -0.1, -2.5, 0.12, -0.11, -0.19, 0.07]),
        ("ITRF1992", [15.4, 1.5, -70.8, 3.09, 0.0, 0.0, 0.26], R97),
        ("ITRF1991", [27.4, 15.5, -76.8, 4.49, 0.0, 0.0, 0.26], R97),
        ("ITRF1990", [25.4, 11.5, -92.8, 4.79, 0.0, 0.0, 0.26], R97),
        ("ITRF1989", [30.4, 35.5, -130.8, 8.19, 0.0, 0.0, 0.26], R97),
        ("ITRF1988", [25.4, -0.5, -154.8, 11.29, 0.1, 0.0, 0.26], R97),
    ];

    iers("ITRF2014", 2010, table)
}

/// ITRF2008 to older realisations at 2000.0.
fn itrf2008_to_itrf() -> impl Iterator<Item = Transformation> {
    const R97: [f64; 7] = [0.1, -0.5, -3.2, 0.09, 0.0, 0.0, 0.02];

    #[rustfmt::skip]
    let table = vec![
        ("ITRF2005", [-2.0, -0.9, -4.7, 0.94, 0.0, 0.0, 0.0], [0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("ITRF2000", [-1.9, -1.7, -10.5, 1.34, 0.0, 0.0, 0.0], [0.1, 0.1, -1.8, 0.08, 0.0, 0.0, 0.0]),
        ("ITRF1997", [4.8, 2.6, -33.2, 2.92, 0.0, 0.0, 0.06], R97),
        ("ITRF1996", [4.8, 2.6, -33.2, 2.92, 0.0, 0.0, 0.06], R97),
        ("ITRF1994", [4.8, 2.6, -33.2, 2.92, 0.0, 0.0, 0.06], R97),
        ("ITRF1993", [-24.0, 2.4, -38.6, 3.41, -1.71, -1.48, -0.30], [-2.8, -0.1, -2.4, 0.09, -0.11, -0.19, 0.07]),
        ("ITRF1992", [12.8, 4.6, -41.2, 2.21, 0.0, 0.0, 0.06], R97),
        ("ITRF1991", [24.8, 18.6, -47.2, 3.61, 0.0, 0.0, 0.06], R97),
        ("ITRF1990", [22.8, 14.6, -63.2, 3.91, 0.0, 0.0, 0.06], R97),
        ("ITRF1989", [27.8, 38.6, -101.2, 7.31, 0.0, 0.0, 0.06], R97),
        ("ITRF1988", [22.8, 2.6, -125.2, 10.41, 0.10, 0.0, 0.06], R97),
    ];

    iers("ITRF2008", 2000, table).chain(iers(
        "ITRF2005",
        2000,
        vec![(
            "ITRF2000",
            [0.1, -0.8, -5.8, 0.40, 0.0, 0.0, 0.0],
            [-0.2, 0.1, -1.8, 0.08, 0.0, 0.0, 0.0],
        )],
    ))
}

/// ITRF2000 to older realisations, at 1997.0 and 1988.0.
fn itrf2000_to_itrf() -> impl Iterator<Item = Transformation> {
    const R92: [f64; 7] = [0.0, -0.6, -1.4, 0.01, 0.0, 0.0, 0.02];

    #[rustfmt::skip]
    let at_1997 = vec![
        ("ITRF1997", [6.7, 6.1, -18.5, 1.55, 0.0, 0.0, 0.0], [0.0, -0.6, -1.4, 0.01, 0.0, 0.0, 0.02]),
        ("ITRF1996", [6.7, 6.1, -18.5, 1.55, 0.0, 0.0, 0.0], [0.0, -0.6, -1.4, 0.01, 0.0, 0.0, 0.02]),
        ("ITRF1994", [6.7, 6.1, -18.5, 1.55, 0.0, 0.0, 0.0], [0.0, -0.6, -1.4, 0.01, 0.0, 0.0, 0.02]),
    ];

    #[rustfmt::skip]
    let at_1988 = vec![
        ("ITRF1993", [12.7, 6.5, -20.9, 1.95, -0.39, 0.80, -1.14], [-2.9, -0.2, -0.6, 0.01, -0.11, -0.19, 0.07]),
        ("ITRF1992", [14.7, 13.5, -13.9, 0.75, 0.0, 0.0, -0.18], R92),
        ("ITRF1991", [26.7, 27.5, -19.9, 2.15, 0.0, 0.0, -0.18], R92),
        ("ITRF1990", [14.7, 13.5, -13.9, 0.75, 0.0, 0.0, -0.18], R92),
        ("ITRF1989", [29.7, 47.5, -73.9, 5.85, 0.0, 0.0, -0.18], R92),
        ("ITRF1988", [24.7, 11.5, -97.9, 8.95, 0.0, 0.0, -0.18], R92),
    ];

    iers("ITRF2000", 1997, at_1997).chain(iers("ITRF2000", 1988, at_1988))
}
