use crate::solver::Solver;
use crate::vector::{scale, sum, NamedVector};

/// A final sub-step shorter than this fraction of the nominal step is merged
/// into the previous one
const LANDING_TOLERANCE: f64 = 1e-9;

/// Upper bound on sub-steps per call; smaller steps are widened to fit
const MAX_SUBSTEPS: f64 = 1e9;

/// Classical fourth-order Runge-Kutta with a fixed step.
///
/// ```text
/// k1 = h·f(t,       x)
/// k2 = h·f(t + h/2, x + k1/2)
/// k3 = h·f(t + h/2, x + k2/2)
/// k4 = h·f(t + h,   x + k3)
/// x' = x + (k1 + 2·k2 + 2·k3 + k4)/6
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Rk4 {
    step: f64,
    steps: u64,
    evaluations: u64,
}

impl Default for Rk4 {
    fn default() -> Self {
        Rk4::new(1.0)
    }
}

impl Rk4 {
    pub fn new(step: f64) -> Self {
        Rk4 {
            step,
            steps: 0,
            evaluations: 0,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Sub-steps taken since the last reset
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Derivative evaluations since the last reset
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    fn single_step<V, F>(&mut self, f: &F, t: f64, x: &V, h: f64) -> V
    where
        V: NamedVector,
        F: Fn(f64, &V) -> V,
    {
        let k1 = scale(&f(t, x), h);
        let k2 = scale(&f(t + h / 2.0, &sum([x, &scale(&k1, 0.5)])), h);
        let k3 = scale(&f(t + h / 2.0, &sum([x, &scale(&k2, 0.5)])), h);
        let k4 = scale(&f(t + h, &sum([x, &k3])), h);

        self.steps += 1;
        self.evaluations += 4;

        sum([
            x,
            &scale(&k1, 1.0 / 6.0),
            &scale(&k2, 1.0 / 3.0),
            &scale(&k3, 1.0 / 3.0),
            &scale(&k4, 1.0 / 6.0),
        ])
    }
}

impl Solver for Rk4 {
    fn reset(&mut self, step: f64) {
        self.step = step;
        self.steps = 0;
        self.evaluations = 0;
    }

    fn advance<V, F>(&mut self, derivative: F, t_start: f64, x: &V, t_end: f64) -> V
    where
        V: NamedVector,
        F: Fn(f64, &V) -> V,
    {
        // also catches NaN bounds
        if !(t_end > t_start) {
            return x.clone();
        }
        // a non-positive step degenerates into one step over the whole interval
        let step = if self.step > 0.0 && self.step.is_finite() {
            self.step
        } else {
            t_end - t_start
        };

        // the count is fixed up front and sub-step times are offsets from t_start
        let span = t_end - t_start;
        let n = (span / step - LANDING_TOLERANCE).ceil().clamp(1.0, MAX_SUBSTEPS);
        let step = if n == MAX_SUBSTEPS { span / n } else { step };
        let n = n as u64;

        let mut x = x.clone();
        for k in 0..n {
            let t = t_start + k as f64 * step;
            let t_next = if k + 1 == n {
                t_end
            } else {
                t_start + (k + 1) as f64 * step
            };
            x = self.single_step(&derivative, t, &x, t_next - t);
        }
        x
    }
}
