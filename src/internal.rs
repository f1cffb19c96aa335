/// `a * b + c`, fused when the `fma` feature is on.
macro_rules! mul_add {
    ($a:expr, $b:expr, $c:expr) => {
        if cfg!(feature = "fma") {
            f64::mul_add($a, $b, $c)
        } else {
            $a * $b + $c
        }
    };
}

pub(crate) use mul_add;

/// Radians per arc-second.
pub(crate) const SEC_TO_RAD: f64 = std::f64::consts::PI / 648000.0;

/// Degrees per arc-second.
pub(crate) const SEC_TO_DEG: f64 = 0.0002777777777777778; // 1. / 3600.

/// Snaps `t` onto the nearest integer when it is within rounding noise of it,
/// so that queries on grid nodes resolve to the node itself.
#[inline]
pub(crate) fn snap(t: f64) -> f64 {
    let r = t.round();
    if (t - r).abs() < 1e-9 {
        r
    } else {
        t
    }
}
