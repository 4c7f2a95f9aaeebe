//! Univariate adaptive slice sampler.
//!
//! Draws from an arbitrary bounded, differentiable log-density by
//! sampling uniformly under its graph. Slice edges are located with a
//! hybrid Newton/bisection search: Newton steps give fast convergence
//! on well-behaved objectives, while a monotone bisection bracket
//! bounds every step, so the search degrades to bisection-level
//! robustness instead of diverging near flat or discontinuous regions.

use iso_core::{ErrorInfo, QuantError, RngHandle};

use crate::config::SliceTuning;

/// A scalar objective with first derivative.
///
/// Returns `(log_density, d/dx log_density)` at `x`. The objective must
/// be finite on the open support interval; the sampler may probe
/// arbitrarily close to an infinite bound but never evaluates exactly
/// at one.
pub trait SliceTarget {
    /// Evaluates the log-density and its derivative at `x`.
    fn eval(&self, x: f64) -> (f64, f64);
}

impl<F> SliceTarget for F
where
    F: Fn(f64) -> (f64, f64),
{
    fn eval(&self, x: f64) -> (f64, f64) {
        self(x)
    }
}

/// Direction in which a slice edge is searched from the current point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceDirection {
    /// Toward the lower limit.
    Left,
    /// Toward the upper limit.
    Right,
}

/// Adaptive slice sampler over a fixed support interval.
///
/// Instances are created once per distinct scalar update site and
/// reused across rounds; no state persists between `sample` calls.
#[derive(Debug, Clone)]
pub struct Shredder {
    lower_limit: f64,
    upper_limit: f64,
    tuning: SliceTuning,
}

impl Shredder {
    /// Creates a sampler over `[lower_limit, upper_limit]`, either of
    /// which may be infinite.
    pub fn new(lower_limit: f64, upper_limit: f64, tuning: SliceTuning) -> Result<Self, QuantError> {
        if lower_limit.is_nan() || upper_limit.is_nan() || lower_limit >= upper_limit {
            return Err(QuantError::Precondition(
                ErrorInfo::new("bad-interval", "slice sampler interval must satisfy lower < upper")
                    .with_context("lower_limit", lower_limit.to_string())
                    .with_context("upper_limit", upper_limit.to_string()),
            ));
        }
        Ok(Self {
            lower_limit,
            upper_limit,
            tuning,
        })
    }

    /// Lower bound of the support interval.
    pub fn lower_limit(&self) -> f64 {
        self.lower_limit
    }

    /// Upper bound of the support interval.
    pub fn upper_limit(&self) -> f64 {
        self.upper_limit
    }

    /// Draws one sample from the density defined by `target`,
    /// restricted to the support interval, starting from `x0`.
    pub fn sample<T: SliceTarget>(
        &self,
        target: &T,
        x0: f64,
        rng: &mut RngHandle,
    ) -> Result<f64, QuantError> {
        let (lp0, d0) = target.eval(x0);
        if !lp0.is_finite() {
            return Err(QuantError::non_finite(lp0, "slice sampler initial point"));
        }

        let slice_height = rng.uniform_01().ln() + lp0;

        let mut x_min =
            self.find_slice_edge(target, x0, slice_height, lp0, d0, SliceDirection::Left)?;
        let mut x_max =
            self.find_slice_edge(target, x0, slice_height, lp0, d0, SliceDirection::Right)?;

        // Shrink the bracket toward x0 on each rejection; return the
        // midpoint if the bracket collapses first.
        let mut x = (x_max + x_min) / 2.0;
        while x_max - x_min > self.tuning.x_eps {
            x = x_min + (x_max - x_min) * rng.uniform_01();
            let (lp, _) = target.eval(x);

            if lp >= slice_height {
                break;
            } else if x > x0 {
                x_max = x;
            } else {
                x_min = x;
            }
        }

        debug_assert!(self.lower_limit <= x && x <= self.upper_limit);
        Ok(x)
    }

    /// Locates one edge of the slice at `slice_height`, searching from
    /// `x0` in `direction`.
    ///
    /// The returned point always lies within the support interval. If
    /// the objective turns non-finite along the way, a pure bisection
    /// loop shrinks the bracket back toward finiteness, bounded by
    /// `max_bisections`.
    pub fn find_slice_edge<T: SliceTarget>(
        &self,
        target: &T,
        x0: f64,
        slice_height: f64,
        lp0: f64,
        d0: f64,
        direction: SliceDirection,
    ) -> Result<f64, QuantError> {
        let SliceTuning {
            lp_eps,
            d_eps,
            x_eps,
            max_bisections,
        } = self.tuning;

        let mut lp = lp0 - slice_height;
        let mut d = d0;
        let mut x = x0;
        let (mut x_bound_lower, mut x_bound_upper) = match direction {
            SliceDirection::Left => (self.lower_limit, x0),
            SliceDirection::Right => (x0, self.upper_limit),
        };

        while lp.abs() > lp_eps && (x_bound_upper - x_bound_lower).abs() > x_eps {
            let x1 = if d.is_nan() || d.abs() < d_eps {
                bisection_point(x_bound_lower, x_bound_upper)
            } else {
                x - lp / d
            };

            // Very close to the domain limit with the next step crossing
            // it, or a residual of the wrong sign: stop at the boundary.
            match direction {
                SliceDirection::Left => {
                    if (x - self.lower_limit).abs() <= x_eps && (x1 < x || lp > 0.0) {
                        break;
                    }
                }
                SliceDirection::Right => {
                    if (x - self.upper_limit).abs() <= x_eps && (x1 > x || lp > 0.0) {
                        break;
                    }
                }
            }

            // Tighten the bisection bracket; a positive residual means x
            // is still inside the slice.
            match direction {
                SliceDirection::Left => {
                    if lp > 0.0 {
                        x_bound_upper = x;
                    } else {
                        x_bound_lower = x;
                    }
                }
                SliceDirection::Right => {
                    if lp > 0.0 {
                        x_bound_lower = x;
                    } else {
                        x_bound_upper = x;
                    }
                }
            }

            let mut bisect = x1 < x_bound_lower + x_eps || x1 > x_bound_upper - x_eps;

            if !bisect {
                x = x1;
                let (lp1, d1) = target.eval(x);
                lp = lp1 - slice_height;
                d = d1;
                bisect = !lp.is_finite() || !d.is_finite();
            }

            if bisect {
                let mut iteration_count = 0usize;
                loop {
                    x = bisection_point(x_bound_lower, x_bound_upper);
                    let (lp1, d1) = target.eval(x);
                    lp = lp1 - slice_height;
                    d = d1;

                    if lp.is_finite() {
                        break;
                    }
                    match direction {
                        SliceDirection::Left => x_bound_lower = x,
                        SliceDirection::Right => x_bound_upper = x,
                    }

                    iteration_count += 1;
                    if iteration_count > max_bisections {
                        return Err(QuantError::Numeric(
                            ErrorInfo::new(
                                "slice-edge-stalled",
                                "slice sampler edge finding is not making progress",
                            )
                            .with_context("x0", x0.to_string())
                            .with_context("slice_height", slice_height.to_string())
                            .with_context("bracket_lower", x_bound_lower.to_string())
                            .with_context("bracket_upper", x_bound_upper.to_string()),
                        ));
                    }
                }
            }

            if !lp.is_finite() {
                return Err(QuantError::non_finite(lp, "slice edge residual"));
            }
        }

        if !x.is_finite() {
            return Err(QuantError::non_finite(x, "slice edge"));
        }
        Ok(x)
    }
}

/// Bisection proposal for a bracket that may extend to infinity on one
/// side: a true midpoint when both bounds are finite, otherwise a
/// geometric step outward from the finite side. Repeated proposals
/// against an unbounded side expand until an evaluation tightens the
/// bracket, after which ordinary bisection resumes.
fn bisection_point(lower: f64, upper: f64) -> f64 {
    if lower.is_infinite() {
        upper - (1.0 + upper.abs())
    } else if upper.is_infinite() {
        lower + (1.0 + lower.abs())
    } else {
        (lower + upper) / 2.0
    }
}
