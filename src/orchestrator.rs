//! Provides [`Orchestrator`], which plans and applies chains of
//! Helmert and grid steps between named frames.
//!
//! A request goes through three stages:
//! the path between frames is identified ([`Orchestrator::plan`]),
//! legs are sequenced into [`Step`]s with their epochs,
//! and the steps are applied in order ([`Plan::apply`]).
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};

use crate::ellipsoid::GeographicConversion;
use crate::epoch::Epoch;
use crate::helmert::{apply_dynamic, apply_static, Cartesian, Vcv};
use crate::ntv2::{InterpolationMethod, Ntv2Grid};
use crate::registry::Registry;
use crate::transformation::Transformation;
use crate::{Error, Result};

/// Direction of a grid step.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    /// From `SYSTEM_F` to `SYSTEM_T`
    Forward,
    /// From `SYSTEM_T` to `SYSTEM_F`, by iterative inversion
    Reverse,
}

/// A step of a [`Plan`].
pub enum Step<'a> {
    /// A time-independent Helmert transformation.
    Static(Transformation),
    /// A time-dependent Helmert transformation evaluated at the epoch.
    Dynamic(Transformation, Epoch),
    /// A grid correction on geographic coordinates.
    Grid {
        /// The grid
        grid: &'a Ntv2Grid,
        /// Interpolation method of shifts
        method: InterpolationMethod,
        /// Direction of the shift
        direction: Direction,
        /// Conversion around the grid step
        converter: &'a dyn GeographicConversion,
    },
}

impl Debug for Step<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(t) => f.debug_tuple("Static").field(t).finish(),
            Self::Dynamic(t, epoch) => f.debug_tuple("Dynamic").field(t).field(epoch).finish(),
            Self::Grid {
                grid,
                method,
                direction,
                ..
            } => f
                .debug_struct("Grid")
                .field("system_f", &grid.header().system_f)
                .field("system_t", &grid.header().system_t)
                .field("method", method)
                .field("direction", direction)
                .finish_non_exhaustive(),
        }
    }
}

impl Step<'_> {
    /// Applies the step.
    ///
    /// A grid step passes `vcv` through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] or [`Error::NotConvergent`] from a grid step.
    pub fn apply(&self, coordinate: &Cartesian, vcv: Option<&Vcv>) -> Result<(Cartesian, Option<Vcv>)> {
        match self {
            Self::Static(t) => Ok(apply_static(coordinate, t, vcv)),
            Self::Dynamic(t, epoch) => Ok(apply_dynamic(coordinate, epoch, t, vcv)),
            Self::Grid {
                grid,
                method,
                direction,
                converter,
            } => {
                let geographic = converter.to_geographic(coordinate);
                let shifted = match direction {
                    Direction::Forward => grid.forward(&geographic, *method)?,
                    Direction::Reverse => grid.reverse_exact(&geographic, *method)?,
                };
                Ok((converter.to_cartesian(&shifted), vcv.copied()))
            }
        }
    }
}

/// A request of a transformation between named frames.
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// let request = Request::new("ITRF2014", "GDA2020")
///     .source_epoch(Epoch::new(2011, 1, 1).unwrap());
///
/// assert_eq!(request.from, "ITRF2014");
/// assert_eq!(request.target_epoch, None);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct Request {
    /// Source frame
    pub from: String,
    /// Target frame
    pub to: String,
    /// Epoch of the source coordinate,
    /// at which every time-dependent leg is evaluated
    pub source_epoch: Option<Epoch>,
    /// Epoch of the target coordinate, standing in for `source_epoch` if it is missing;
    /// a same-frame request propagates from `source_epoch` to it
    pub target_epoch: Option<Epoch>,
}

impl Request {
    /// Makes a [`Request`] without epochs.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            source_epoch: None,
            target_epoch: None,
        }
    }

    /// Sets the epoch of the source coordinate.
    #[inline]
    pub fn source_epoch(mut self, epoch: Epoch) -> Self {
        self.source_epoch = Some(epoch);
        self
    }

    /// Sets the epoch of the target coordinate.
    #[inline]
    pub fn target_epoch(mut self, epoch: Epoch) -> Self {
        self.target_epoch = Some(epoch);
        self
    }
}

/// Frames visited and steps to apply, in order.
#[derive(Debug)]
pub struct Plan<'a> {
    frames: Vec<String>,
    steps: Vec<Step<'a>>,
}

impl<'a> Plan<'a> {
    /// Frames from source to target, the intermediate one if any.
    #[inline]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Steps in application order, empty for the identity.
    #[inline]
    pub fn steps(&self) -> &[Step<'a>] {
        &self.steps
    }

    /// Applies every step in order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub fn apply(&self, coordinate: &Cartesian, vcv: Option<&Vcv>) -> Result<(Cartesian, Option<Vcv>)> {
        let mut current = (*coordinate, vcv.copied());

        for (index, step) in self.steps.iter().enumerate() {
            tracing::trace!(index, ?step, "applying step");
            current = step.apply(&current.0, current.1.as_ref())?;
        }

        Ok(current)
    }
}

/// A grid attached to an [`Orchestrator`].
struct GridLeg<'a> {
    from: String,
    to: String,
    grid: &'a Ntv2Grid,
    method: InterpolationMethod,
    converter: &'a dyn GeographicConversion,
}

enum Leg<'a> {
    Helmert(Transformation),
    Grid {
        grid: &'a Ntv2Grid,
        method: InterpolationMethod,
        direction: Direction,
        converter: &'a dyn GeographicConversion,
    },
}

/// Plans and applies transformations between named frames
/// over a [`Registry`] and attached grids.
///
/// A path has at most two legs.
/// Direct legs are searched first, registry before grids,
/// then two-hop paths through the hub frame,
/// then through every other known frame in lexicographic order.
///
/// Every dynamic leg is evaluated at the epoch of the coordinate,
/// the source epoch or the target epoch if absent.
/// A request within one frame at two epochs goes through the plate-fixed frame,
/// leaving at the source epoch and returning at the target epoch.
///
/// There is a builder, see [`OrchestratorBuilder`].
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// let registry = Registry::standard();
/// let orchestrator = Orchestrator::new(&registry);
///
/// let request = Request::new("ITRF2014", "GDA2020")
///     .source_epoch(Epoch::new(2011, 1, 1).unwrap());
/// let coordinate = Cartesian::new(-4050762.770917, 4220880.800229, -2533400.199554);
///
/// let (result, _) = orchestrator.transform(&request, &coordinate, None)?;
/// assert!((result.x - -4050763.124).abs() < 1e-3);
/// assert!((result.y - 4220880.753).abs() < 1e-3);
/// assert!((result.z - -2533399.713).abs() < 1e-3);
/// # Ok::<(), Error>(())
/// ```
pub struct Orchestrator<'a> {
    registry: &'a Registry,
    hub: String,
    plate_fixed: String,
    grids: Vec<GridLeg<'a>>,
}

impl<'a> Orchestrator<'a> {
    /// The default hub frame.
    pub const HUB: &'static str = "ITRF2014";

    /// The default plate-fixed frame.
    pub const PLATE_FIXED: &'static str = "GDA2020";

    /// Makes an [`Orchestrator`] with the default hub and plate-fixed frames and no grid.
    #[inline]
    pub fn new(registry: &'a Registry) -> Self {
        Self::builder(registry).build()
    }

    /// Makes an [`OrchestratorBuilder`].
    #[inline]
    pub fn builder(registry: &'a Registry) -> OrchestratorBuilder<'a> {
        OrchestratorBuilder::new(registry)
    }

    /// The hub frame.
    #[inline]
    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// The plate-fixed frame.
    #[inline]
    pub fn plate_fixed(&self) -> &str {
        &self.plate_fixed
    }

    /// Returns the direct leg from `from` to `to`.
    fn leg(&self, from: &str, to: &str) -> Option<Leg<'a>> {
        if let Ok(t) = self.registry.lookup_transformation(from, to) {
            return Some(Leg::Helmert(t));
        }

        self.grids.iter().find_map(|g| {
            let direction = if g.from == from && g.to == to {
                Direction::Forward
            } else if g.from == to && g.to == from {
                Direction::Reverse
            } else {
                return None;
            };
            Some(Leg::Grid {
                grid: g.grid,
                method: g.method,
                direction,
                converter: g.converter,
            })
        })
    }

    /// Frames of the registry and of the attached grids.
    fn frames(&self) -> BTreeSet<&str> {
        let mut frames = self.registry.frames();
        frames.extend(
            self.grids
                .iter()
                .flat_map(|g| [g.from.as_str(), g.to.as_str()]),
        );
        frames
    }

    fn identify_path(&self, request: &Request) -> Result<(Vec<String>, Vec<Leg<'a>>)> {
        let (from, to) = (request.from.as_str(), request.to.as_str());

        if from == to {
            return match (request.source_epoch, request.target_epoch) {
                (Some(s), Some(t)) if s != t && from != self.plate_fixed => {
                    let there = self.leg(from, &self.plate_fixed);
                    let back = self.leg(&self.plate_fixed, to);
                    match (there, back) {
                        (Some(there), Some(back)) => Ok((
                            vec![from.to_string(), self.plate_fixed.clone(), to.to_string()],
                            vec![there, back],
                        )),
                        _ => Err(Error::no_path(from, to)),
                    }
                }
                _ => Ok((vec![from.to_string()], Vec::new())),
            };
        }

        if let Some(leg) = self.leg(from, to) {
            return Ok((vec![from.to_string(), to.to_string()], vec![leg]));
        }

        let frames = self.frames();
        let intermediates = std::iter::once(self.hub.as_str()).chain(
            frames
                .iter()
                .copied()
                .filter(|m| *m != self.hub),
        );

        for m in intermediates.filter(|m| *m != from && *m != to) {
            if let (Some(first), Some(second)) = (self.leg(from, m), self.leg(m, to)) {
                return Ok((
                    vec![from.to_string(), m.to_string(), to.to_string()],
                    vec![first, second],
                ));
            }
        }

        Err(Error::no_path(from, to))
    }

    /// Every dynamic leg is evaluated at the epoch of the coordinate,
    /// except for a same-frame request whose return leg is at `target_epoch`.
    fn sequence_steps(request: &Request, legs: Vec<Leg<'a>>) -> Result<Vec<Step<'a>>> {
        let coordinate_epoch = request.source_epoch.or(request.target_epoch);
        let propagation = request.from == request.to;

        legs.into_iter()
            .enumerate()
            .map(|(index, leg)| match leg {
                Leg::Helmert(t) if t.is_dynamic() => {
                    let epoch = if propagation && index > 0 {
                        request.target_epoch
                    } else {
                        coordinate_epoch
                    };
                    match epoch {
                        Some(epoch) => Ok(Step::Dynamic(t, epoch)),
                        None => Err(Error::missing_epoch(t.from(), t.to())),
                    }
                }
                Leg::Helmert(t) => Ok(Step::Static(t)),
                Leg::Grid {
                    grid,
                    method,
                    direction,
                    converter,
                } => Ok(Step::Grid {
                    grid,
                    method,
                    direction,
                    converter,
                }),
            })
            .collect()
    }

    /// Returns the [`Plan`] of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPath`] if there is no path of at most two legs
    /// and [`Error::MissingEpoch`] if a dynamic leg has no epoch.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::*;
    /// let registry = Registry::standard();
    /// let orchestrator = Orchestrator::new(&registry);
    ///
    /// let plan = orchestrator.plan(&Request::new("AGD66", "GDA2020"))?;
    /// assert_eq!(plan.frames(), ["AGD66", "GDA94", "GDA2020"]);
    /// assert_eq!(plan.steps().len(), 2);
    ///
    /// assert!(orchestrator.plan(&Request::new("AGD66", "WGS84")).is_err());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn plan(&self, request: &Request) -> Result<Plan<'a>> {
        let (frames, legs) = self.identify_path(request)?;
        tracing::debug!(path = ?frames, hops = legs.len(), "identified path");

        let steps = Self::sequence_steps(request, legs)?;
        Ok(Plan { frames, steps })
    }

    /// Transforms `coordinate` as requested.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Orchestrator::plan`] or of the first failing step.
    #[inline]
    pub fn transform(
        &self,
        request: &Request,
        coordinate: &Cartesian,
        vcv: Option<&Vcv>,
    ) -> Result<(Cartesian, Option<Vcv>)> {
        self.plan(request)?.apply(coordinate, vcv)
    }
}

/// The builder of [`Orchestrator`].
///
/// # Example
///
/// ```
/// # use datumtrans::*;
/// # use datumtrans::ntv2::*;
/// let registry = Registry::standard();
/// let grid = Ntv2Grid::new(
///     Header::new("NTv2.0", "AGD66", "GDA94", &Ellipsoid::ANS, &Ellipsoid::GRS80),
///     vec![],
/// );
///
/// let orchestrator = Orchestrator::builder(&registry)
///     .hub("ITRF2008")
///     .plate_fixed("GDA94")
///     .grid("AGD66", "GDA94", &grid, InterpolationMethod::Bicubic, &Ellipsoid::GRS80)
///     .build();
///
/// assert_eq!(orchestrator.hub(), "ITRF2008");
/// assert_eq!(orchestrator.plate_fixed(), "GDA94");
/// ```
pub struct OrchestratorBuilder<'a> {
    registry: &'a Registry,
    hub: String,
    plate_fixed: String,
    grids: Vec<GridLeg<'a>>,
}

impl<'a> OrchestratorBuilder<'a> {
    /// Makes an [`OrchestratorBuilder`] over `registry`.
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            hub: Orchestrator::HUB.to_string(),
            plate_fixed: Orchestrator::PLATE_FIXED.to_string(),
            grids: Vec::new(),
        }
    }

    /// Sets the hub frame of two-hop paths.
    pub fn hub(mut self, frame: impl Into<String>) -> Self {
        self.hub = frame.into();
        self
    }

    /// Sets the plate-fixed frame of epoch propagation within one frame.
    pub fn plate_fixed(mut self, frame: impl Into<String>) -> Self {
        self.plate_fixed = frame.into();
        self
    }

    /// Attaches a grid leg from `from` to `to`, usable in both directions.
    ///
    /// `converter` maps cartesian coordinates to the grid's geographic domain and back.
    pub fn grid(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        grid: &'a Ntv2Grid,
        method: InterpolationMethod,
        converter: &'a dyn GeographicConversion,
    ) -> Self {
        self.grids.push(GridLeg {
            from: from.into(),
            to: to.into(),
            grid,
            method,
            converter,
        });
        self
    }

    /// Builds the [`Orchestrator`].
    pub fn build(self) -> Orchestrator<'a> {
        Orchestrator {
            registry: self.registry,
            hub: self.hub,
            plate_fixed: self.plate_fixed,
            grids: self.grids,
        }
    }
}
