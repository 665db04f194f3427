//! Steady state of the Hovorka model at the target glycemia.
//!
//! At equilibrium the gut is empty (`D1 = D2 = 0`) and a constant infusion `u`
//! holds plasma glucose at `Geq`. Both strategies first find `u`, then derive
//! the rest of the state from it:
//!
//! ```text
//! S1 = S2 = tauI·u
//! I       = u / (ke·VI·BW)
//! xk      = SIk·I              k = 1, 2, 3
//!  x1·Q1 − (k12 + x2)·Q2 = 0
//! −x1·Q1 + k12·Q2        = F01c(G) + FR(G) − EGP0·BW·(1 − x3)
//! ```
//!
//! - [SteadyStateMethod::Quadratic] eliminates `Q2` from the glucose balance, which
//!   leaves a quadratic in `I`, and takes the root on the `−sqrt` branch.
//! - [SteadyStateMethod::Bisection] bisects the glucose balance residual over
//!   `u ∈ [0, 300]` mU/min.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::model::hovorka;
use crate::model::{PatientParameters, PatientState};
use crate::SimulationError;

/// Bracket searched by the bisection strategy [mU/min]
pub const BISECTION_BRACKET: (f64, f64) = (0.0, 300.0);
pub const BISECTION_MAX_ITERS: usize = 60;
/// Half-width of the bracket at which bisection stops [mU/min]
pub const BISECTION_TOLERANCE: f64 = 1e-12;

/// Strategy used to find the equilibrium infusion rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SteadyStateMethod {
    #[default]
    Quadratic,
    Bisection,
}

/// A steady state together with the constant infusion that sustains it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub state: PatientState,
    /// Equilibrium infusion rate [U/min]
    pub insulin_rate: f64,
}

impl Equilibrium {
    /// The all-zero state with no infusion, used when no equilibrium exists
    pub fn neutral() -> Self {
        Equilibrium {
            state: PatientState::default(),
            insulin_rate: 0.0,
        }
    }
}

impl SteadyStateMethod {
    pub fn solve(&self, p: &PatientParameters) -> Result<Equilibrium, SimulationError> {
        let rate = match self {
            SteadyStateMethod::Quadratic => basal_infusion_for_target(p)?,
            SteadyStateMethod::Bisection => bisect_infusion_rate(p)?,
        };
        Ok(Equilibrium {
            state: state_for_infusion(rate, p),
            insulin_rate: rate,
        })
    }

    /// Like [SteadyStateMethod::solve], but logs the failure and falls back to
    /// [Equilibrium::neutral] instead of returning an error.
    pub fn solve_or_neutral(&self, p: &PatientParameters) -> Equilibrium {
        match self.solve(p) {
            Ok(equilibrium) => equilibrium,
            Err(e) => {
                tracing::error!("{:?} steady state failed: {}", self, e);
                Equilibrium::neutral()
            }
        }
    }
}

/// Plasma insulin [mU/L] that balances glucose production and uptake at `Geq`.
pub fn equilibrium_insulin(p: &PatientParameters) -> Result<f64, SimulationError> {
    let q1 = p.geq * p.glucose_volume();
    let egp0 = p.egp0_total();
    let uptake = hovorka::non_insulin_uptake(p.geq, p) + hovorka::renal_clearance(p.geq, p);
    let net = egp0 - uptake;

    let a = -(q1 * p.si1 * p.si2 + egp0 * p.si2 * p.si3);
    let b = net * p.si2 - egp0 * p.k12 * p.si3;
    let c = net * p.k12;

    let insulin = if a == 0.0 {
        // no insulin-dependent disposal, the balance is linear in I
        -c / b
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return Err(SimulationError::NegativeDiscriminant { discriminant });
        }
        let root = discriminant.sqrt();
        // same root as (-b - sqrt)/2a, without cancellation when b < 0
        if b < 0.0 {
            2.0 * c / (root - b)
        } else {
            (-b - root) / (2.0 * a)
        }
    };

    if !insulin.is_finite() || insulin < 0.0 {
        return Err(SimulationError::NonPhysicalEquilibrium { insulin });
    }
    Ok(insulin)
}

/// Open-loop infusion [U/min] that holds the patient at `Geq`.
pub fn basal_infusion_for_target(p: &PatientParameters) -> Result<f64, SimulationError> {
    let insulin = equilibrium_insulin(p)?;
    let rate = insulin * p.ke * p.insulin_volume();
    Ok(rate / 1000.0)
}

/// [basal_infusion_for_target], logging the failure and returning 0 instead.
pub fn basal_infusion_or_zero(p: &PatientParameters) -> f64 {
    basal_infusion_for_target(p).unwrap_or_else(|e| {
        tracing::error!("Basal infusion for target failed: {}", e);
        0.0
    })
}

/// Net rate of change of Q1 [mmol/min] when insulin has settled under a
/// constant infusion `rate` [mU/min] and glycemia sits at `Geq`.
///
/// Positive means production exceeds uptake, so more insulin is needed.
pub fn glucose_balance(rate: f64, p: &PatientParameters) -> f64 {
    balance_at(p.geq, &settled_insulin(rate, p), p)
}

fn bisect_infusion_rate(p: &PatientParameters) -> Result<f64, SimulationError> {
    let (mut low, mut high) = BISECTION_BRACKET;
    let mut f_low = glucose_balance(low, p);
    let f_high = glucose_balance(high, p);

    if !f_low.is_finite() || !f_high.is_finite() || f_low * f_high > 0.0 {
        return Err(SimulationError::NotBracketed { low, high });
    }
    if f_low == 0.0 {
        return Ok(low / 1000.0);
    }
    if f_high == 0.0 {
        return Ok(high / 1000.0);
    }

    for _ in 0..BISECTION_MAX_ITERS {
        let mid = 0.5 * (low + high);
        let f_mid = glucose_balance(mid, p);
        if f_mid == 0.0 || 0.5 * (high - low) < BISECTION_TOLERANCE {
            return Ok(mid / 1000.0);
        }
        if f_mid.signum() == f_low.signum() {
            low = mid;
            f_low = f_mid;
        } else {
            high = mid;
        }
    }
    Ok(0.5 * (low + high) / 1000.0)
}

/// Insulin chain settled under a constant infusion [mU/min]; glucose and gut left at zero.
fn settled_insulin(rate: f64, p: &PatientParameters) -> PatientState {
    let s = p.tau_i * rate;
    let i = rate / (p.ke * p.insulin_volume());
    PatientState {
        s1: s,
        s2: s,
        i,
        x1: p.si1 * i,
        x2: p.si2 * i,
        x3: p.si3 * i,
        ..Default::default()
    }
}

/// Full steady state under a constant infusion `rate` [U/min].
///
/// Glycemia settles wherever the glucose balance closes, which is `Geq` only
/// at the equilibrium rate. `F01c + FR` is linear in `G` on each side of the
/// uptake and renal thresholds; the branch holding the balance point is picked
/// from the sign of the residual at the thresholds, then `Q1` and `Q2` solve
/// the 2×2 system on that branch. If the system is singular (`x1·x2 = 0` on the
/// flat branch), `Q1` is pinned to `Geq` and `Q2` follows from `dQ2 = 0`.
pub fn state_for_infusion(rate: f64, p: &PatientParameters) -> PatientState {
    let settled = settled_insulin(rate * 1000.0, p);
    let volume = p.glucose_volume();
    let f01 = p.f01_total();

    // F01c + FR = slope·G + offset
    let (slope, offset) = if balance_at(hovorka::F01_THRESHOLD, &settled, p) <= 0.0 {
        (f01 / hovorka::F01_THRESHOLD, 0.0)
    } else if balance_at(hovorka::RENAL_THRESHOLD, &settled, p) <= 0.0 {
        (0.0, f01)
    } else {
        let renal = hovorka::RENAL_CLEARANCE_RATE * volume;
        (renal, f01 - renal * hovorka::RENAL_THRESHOLD)
    };
    let egp = p.egp0_total() * (1.0 - settled.x3);

    let a = Matrix2::new(
        settled.x1,
        -(p.k12 + settled.x2),
        -(settled.x1 + slope / volume),
        p.k12,
    );
    let b = Vector2::new(0.0, offset - egp);

    let (q1, q2) = match a.lu().solve(&b) {
        Some(q) if q[0].is_finite() && q[1].is_finite() => (q[0], q[1]),
        _ => {
            let q1 = p.geq * volume;
            (q1, settled.x1 * q1 / (p.k12 + settled.x2))
        }
    };

    PatientState { q1, q2, ..settled }
}

/// dQ1 [mmol/min] at glycemia `g` with `Q2` settled against `Q1` and the gut empty
fn balance_at(g: f64, settled: &PatientState, p: &PatientParameters) -> f64 {
    let q1 = g * p.glucose_volume();
    let state = PatientState {
        q1,
        q2: settled.x1 * q1 / (p.k12 + settled.x2),
        ..*settled
    };
    hovorka::derivative(0.0, &state, 0.0, 0.0, p).q1
}
