use crate::model::{PatientParameters, PatientState};

/// Glycemia below which non-insulin-mediated uptake is proportional to glucose [mmol/L]
pub const F01_THRESHOLD: f64 = 4.5;
/// Glycemia above which the kidneys clear glucose [mmol/L]
pub const RENAL_THRESHOLD: f64 = 9.0;
/// Renal clearance rate [1/min]
pub const RENAL_CLEARANCE_RATE: f64 = 0.003;

/// Convert an insulin infusion rate from U/min to mU/min.
#[inline(always)]
pub fn insulin_to_internal(units_per_min: f64) -> f64 {
    units_per_min * 1000.0
}

/// Convert a carbohydrate intake from g/min to mmol/min of glucose.
#[inline(always)]
pub fn carbs_to_internal(grams_per_min: f64, p: &PatientParameters) -> f64 {
    grams_per_min * 1000.0 / p.mwg
}

/// Plasma glucose concentration G = Q1 / (VG·BW) [mmol/L]
#[inline(always)]
pub fn glucose_concentration(q1: f64, p: &PatientParameters) -> f64 {
    q1 / p.glucose_volume()
}

/// Non-insulin-mediated glucose uptake F01c [mmol/min].
///
/// Linear in G below [F01_THRESHOLD], constant F01·BW at or above it. The kink
/// at the threshold is not smoothed.
#[inline(always)]
pub fn non_insulin_uptake(g: f64, p: &PatientParameters) -> f64 {
    if g >= F01_THRESHOLD {
        p.f01_total()
    } else {
        p.f01_total() * g / F01_THRESHOLD
    }
}

/// Renal glucose clearance FR [mmol/min], zero below [RENAL_THRESHOLD].
#[inline(always)]
pub fn renal_clearance(g: f64, p: &PatientParameters) -> f64 {
    if g >= RENAL_THRESHOLD {
        RENAL_CLEARANCE_RATE * (g - RENAL_THRESHOLD) * p.glucose_volume()
    } else {
        0.0
    }
}

/// Instantaneous fluxes of the glucose subsystem, all in mmol/min except `ui` [mU/min].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluxes {
    /// Gut glucose appearance
    pub ug: f64,
    /// Insulin appearance in plasma
    pub ui: f64,
    /// Non-insulin-mediated uptake
    pub f01c: f64,
    /// Renal clearance
    pub fr: f64,
    /// Endogenous glucose production
    pub egp: f64,
}

impl Fluxes {
    pub fn at(state: &PatientState, p: &PatientParameters) -> Self {
        let g = glucose_concentration(state.q1, p);
        Fluxes {
            ug: state.d2 / p.tau_g,
            ui: state.s2 / p.tau_i,
            f01c: non_insulin_uptake(g, p),
            fr: renal_clearance(g, p),
            egp: p.egp0_total() * (1.0 - state.x3),
        }
    }
}

/// Right-hand side of the Hovorka model.
///
/// # Arguments
///
/// * `_t` - Time [min]; the model is autonomous, exogenous inputs are passed explicitly
/// * `state` - Current state
/// * `insulin_rate` - Subcutaneous insulin infusion [U/min]
/// * `carb_intake` - Carbohydrate intake [g/min]
/// * `p` - Patient parameters
pub fn derivative(
    _t: f64,
    state: &PatientState,
    insulin_rate: f64,
    carb_intake: f64,
    p: &PatientParameters,
) -> PatientState {
    let u = insulin_to_internal(insulin_rate);
    let d = carbs_to_internal(carb_intake, p);
    let flux = Fluxes::at(state, p);

    // carbohydrate absorption
    let dd1 = p.ag * d - state.d1 / p.tau_g;
    let dd2 = (state.d1 - state.d2) / p.tau_g;

    // insulin absorption
    let ds1 = u - state.s1 / p.tau_i;
    let ds2 = (state.s1 - state.s2) / p.tau_i;
    let di = flux.ui / p.insulin_volume() - p.ke * state.i;

    // glucose
    let dq1 = flux.ug - flux.f01c - flux.fr - state.x1 * state.q1
        + p.k12 * state.q2
        + flux.egp;
    let dq2 = state.x1 * state.q1 - (p.k12 + state.x2) * state.q2;

    // insulin action
    let dx1 = p.si1 * p.ka1 * state.i - p.ka1 * state.x1;
    let dx2 = p.si2 * p.ka2 * state.i - p.ka2 * state.x2;
    let dx3 = p.si3 * p.ka3 * state.i - p.ka3 * state.x3;

    PatientState {
        q1: dq1,
        q2: dq2,
        s1: ds1,
        s2: ds2,
        i: di,
        x1: dx1,
        x2: dx2,
        x3: dx3,
        d1: dd1,
        d2: dd2,
    }
}

/// Measured glycemia G = Q1 / (VG·BW) [mmol/L]
pub fn output(state: &PatientState, p: &PatientParameters) -> f64 {
    glucose_concentration(state.q1, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uptake_is_linear_below_threshold_and_flat_above() {
        let p = PatientParameters::default();
        let full = p.f01 * p.bw;

        assert_relative_eq!(non_insulin_uptake(2.25, &p), full / 2.0);
        assert_relative_eq!(non_insulin_uptake(F01_THRESHOLD, &p), full);
        assert_relative_eq!(non_insulin_uptake(12.0, &p), full);
    }

    #[test]
    fn renal_clearance_starts_at_nine() {
        let p = PatientParameters::default();

        assert_eq!(renal_clearance(8.99, &p), 0.0);
        assert_eq!(renal_clearance(RENAL_THRESHOLD, &p), 0.0);
        assert_relative_eq!(
            renal_clearance(11.0, &p),
            0.003 * 2.0 * p.vg * p.bw,
            max_relative = 1e-12
        );
    }

    #[test]
    fn output_is_concentration_in_accessible_compartment() {
        let p = PatientParameters::default();
        let state = PatientState {
            q1: 5.5 * p.vg * p.bw,
            ..Default::default()
        };
        assert_relative_eq!(output(&state, &p), 5.5, max_relative = 1e-12);
    }

    #[test]
    fn meal_enters_first_gut_compartment() {
        let p = PatientParameters::default();
        let state = PatientState {
            q1: 5.5 * p.vg * p.bw,
            ..Default::default()
        };

        let dx = derivative(0.0, &state, 0.0, 50.0, &p);

        assert_relative_eq!(dx.d1, p.ag * 50.0 * 1000.0 / p.mwg, max_relative = 1e-12);
        assert_eq!(dx.d2, 0.0);
    }

    #[test]
    fn infusion_enters_first_subcutaneous_compartment() {
        let p = PatientParameters::default();
        let dx = derivative(0.0, &PatientState::default(), 0.02, 0.0, &p);

        assert_relative_eq!(dx.s1, 20.0, max_relative = 1e-12);
        assert_eq!(dx.s2, 0.0);
        assert_eq!(dx.i, 0.0);
    }

    #[test]
    fn insulin_action_relaxes_towards_sensitivity_times_insulin() {
        let p = PatientParameters::default();
        let state = PatientState {
            i: 10.0,
            x1: p.si1 * 10.0,
            x2: p.si2 * 10.0,
            x3: p.si3 * 10.0,
            ..Default::default()
        };

        let dx = derivative(0.0, &state, 0.0, 0.0, &p);

        assert_relative_eq!(dx.x1, 0.0, epsilon = 1e-15);
        assert_relative_eq!(dx.x2, 0.0, epsilon = 1e-15);
        assert_relative_eq!(dx.x3, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn fluxes_report_absorption_outputs() {
        let p = PatientParameters::default();
        let state = PatientState {
            q1: 5.5 * p.vg * p.bw,
            s2: 110.0,
            d2: 20.0,
            x3: 0.25,
            ..Default::default()
        };

        let flux = Fluxes::at(&state, &p);

        assert_relative_eq!(flux.ui, 2.0);
        assert_relative_eq!(flux.ug, 0.5);
        assert_relative_eq!(flux.egp, 0.75 * p.egp0 * p.bw, max_relative = 1e-12);
        assert_eq!(flux.fr, 0.0);
    }
}
