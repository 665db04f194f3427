mod rk4;

pub use rk4::Rk4;

use crate::vector::NamedVector;

/// A fixed-step integrator for `dx/dt = f(t, x)`.
///
/// The derivative is a pure function of `(t, x)` from the solver's point of
/// view; exogenous inputs must be captured by the closure before it is passed in.
pub trait Solver {
    /// Record the nominal step size [min]
    fn reset(&mut self, step: f64);

    /// Integrate from `(t_start, x)` to `t_end`, landing exactly on `t_end`.
    fn advance<V, F>(&mut self, derivative: F, t_start: f64, x: &V, t_end: f64) -> V
    where
        V: NamedVector,
        F: Fn(f64, &V) -> V;
}
