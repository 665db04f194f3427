use serde::{Deserialize, Serialize};

use crate::SimulationError;

/// Physiological constants of one virtual patient.
///
/// Volumes and glucose fluxes are given per kilogram of body weight and scaled
/// by `bw` inside the model. Insulin sensitivities are in absolute units, i.e.
/// the literature value `SIT = 51.2` (×10⁻⁴) is stored as `51.2e-4`.
///
/// The struct is immutable for the duration of a run and is passed by
/// reference into every model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientParameters {
    /// Body weight [kg]
    #[serde(rename = "BW")]
    pub bw: f64,
    /// Glucose distribution volume [L/kg]
    #[serde(rename = "VG")]
    pub vg: f64,
    /// Insulin distribution volume [L/kg]
    #[serde(rename = "VI")]
    pub vi: f64,
    /// Non-insulin-dependent glucose flux [mmol/kg/min]
    #[serde(rename = "F01")]
    pub f01: f64,
    /// Endogenous glucose production extrapolated to zero insulin [mmol/kg/min]
    #[serde(rename = "EGP0")]
    pub egp0: f64,
    /// Transfer rate from the non-accessible to the accessible compartment [1/min]
    pub k12: f64,
    /// Deactivation rate of insulin action on transport [1/min]
    pub ka1: f64,
    /// Deactivation rate of insulin action on disposal [1/min]
    pub ka2: f64,
    /// Deactivation rate of insulin action on EGP [1/min]
    pub ka3: f64,
    /// Insulin sensitivity of distribution/transport [1/min per mU/L]
    #[serde(rename = "SI1")]
    pub si1: f64,
    /// Insulin sensitivity of disposal [1/min per mU/L]
    #[serde(rename = "SI2")]
    pub si2: f64,
    /// Insulin sensitivity of EGP [L/mU]
    #[serde(rename = "SI3")]
    pub si3: f64,
    /// Insulin elimination from plasma [1/min]
    pub ke: f64,
    /// Time-to-maximum of subcutaneous insulin absorption [min]
    #[serde(rename = "tauI")]
    pub tau_i: f64,
    /// Time-to-maximum of carbohydrate absorption [min]
    #[serde(rename = "tauG")]
    pub tau_g: f64,
    /// Carbohydrate bioavailability [unitless]
    #[serde(rename = "AG")]
    pub ag: f64,
    /// Molar mass of glucose [g/mol]
    #[serde(rename = "MwG")]
    pub mwg: f64,
    /// Target glycemia at equilibrium [mmol/L]
    #[serde(rename = "Geq")]
    pub geq: f64,
    /// Glycemia drop per unit of insulin rate, used to turn a controller action
    /// into a dose [mmol/L per U/min]
    #[serde(rename = "ISF", default = "default_isf")]
    pub insulin_sensitivity_factor: f64,
}

fn default_isf() -> f64 {
    2.0
}

impl Default for PatientParameters {
    /// Mean values of the Hovorka (2004) virtual patient.
    fn default() -> Self {
        PatientParameters {
            bw: 70.0,
            vg: 0.16,
            vi: 0.12,
            f01: 0.0097,
            egp0: 0.0161,
            k12: 0.066,
            ka1: 0.006,
            ka2: 0.06,
            ka3: 0.03,
            si1: 51.2e-4,
            si2: 8.2e-4,
            si3: 520e-4,
            ke: 0.138,
            tau_i: 55.0,
            tau_g: 40.0,
            ag: 0.8,
            mwg: 180.1559,
            geq: 5.5,
            insulin_sensitivity_factor: default_isf(),
        }
    }
}

impl PatientParameters {
    /// Glucose distribution volume [L]
    pub fn glucose_volume(&self) -> f64 {
        self.vg * self.bw
    }

    /// Insulin distribution volume [L]
    pub fn insulin_volume(&self) -> f64 {
        self.vi * self.bw
    }

    /// Endogenous glucose production at zero insulin [mmol/min]
    pub fn egp0_total(&self) -> f64 {
        self.egp0 * self.bw
    }

    /// Saturated non-insulin-dependent glucose flux [mmol/min]
    pub fn f01_total(&self) -> f64 {
        self.f01 * self.bw
    }

    /// Check that every value can be used by the model and the equilibrium solvers.
    ///
    /// Quantities the model divides by must be strictly positive, sensitivities
    /// and production rates must be non-negative.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let strictly_positive = [
            ("BW", self.bw),
            ("VG", self.vg),
            ("VI", self.vi),
            ("k12", self.k12),
            ("ka1", self.ka1),
            ("ka2", self.ka2),
            ("ka3", self.ka3),
            ("ke", self.ke),
            ("tauI", self.tau_i),
            ("tauG", self.tau_g),
            ("MwG", self.mwg),
            ("Geq", self.geq),
            ("ISF", self.insulin_sensitivity_factor),
        ];
        let non_negative = [
            ("F01", self.f01),
            ("EGP0", self.egp0),
            ("SI1", self.si1),
            ("SI2", self.si2),
            ("SI3", self.si3),
            ("AG", self.ag),
        ];

        for (param, value) in strictly_positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(param, value));
            }
        }
        for (param, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(param, value));
            }
        }
        Ok(())
    }
}

fn invalid(param: &str, value: f64) -> SimulationError {
    SimulationError::InvalidParameter {
        param: param.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PatientParameters::default().validate().is_ok());
    }

    #[test]
    fn zero_volume_is_rejected() {
        let params = PatientParameters {
            vg: 0.0,
            ..Default::default()
        };
        match params.validate() {
            Err(SimulationError::InvalidParameter { param, .. }) => assert_eq!(param, "VG"),
            other => panic!("expected invalid VG, got {:?}", other),
        }
    }

    #[test]
    fn negative_sensitivity_is_rejected() {
        let params = PatientParameters {
            si2: -1e-4,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn nan_is_rejected() {
        let params = PatientParameters {
            ke: f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn deserializes_with_literature_names() {
        let json = r#"{
            "BW": 80.0, "VG": 0.16, "VI": 0.12, "F01": 0.0097, "EGP0": 0.0161,
            "k12": 0.066, "ka1": 0.006, "ka2": 0.06, "ka3": 0.03,
            "SI1": 0.00512, "SI2": 0.00082, "SI3": 0.052, "ke": 0.138,
            "tauI": 55.0, "tauG": 40.0, "AG": 0.8, "MwG": 180.1559, "Geq": 6.0
        }"#;
        let params: PatientParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.bw, 80.0);
        assert_eq!(params.geq, 6.0);
        assert_eq!(params.insulin_sensitivity_factor, 2.0);
        assert_eq!(params.glucose_volume(), 0.16 * 80.0);
    }

    #[test]
    fn missing_fields_take_literature_values() {
        let params: PatientParameters = serde_json::from_str(r#"{ "BW": 90.0 }"#).unwrap();
        assert_eq!(params.bw, 90.0);
        assert_eq!(params.si1, PatientParameters::default().si1);
    }
}
