//! Random virtual patients for Monte Carlo runs.
//!
//! The default [PopulationPrior] follows the Hovorka virtual-patient cohort:
//! most parameters are normal, `VG`, `tauI` and `tauG` are drawn on a
//! transformed scale (`exp(VG)`, `1/tauI`, `ln(1/tauG)`), and `AG` and `BW`
//! are uniform. Draws outside the admissible range are rejected and redrawn.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::model::equilibrium::basal_infusion_for_target;
use crate::model::PatientParameters;
use crate::SimulationError;

/// Redraws allowed per parameter, and per patient, before giving up
pub const MAX_DRAWS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPrior {
    pub mean: f64,
    pub sd: f64,
}

impl NormalPrior {
    pub const fn new(mean: f64, sd: f64) -> Self {
        NormalPrior { mean, sd }
    }

    /// Draw until the value is finite and strictly above `lower`
    fn draw_above<R: Rng + ?Sized>(
        &self,
        name: &str,
        lower: f64,
        rng: &mut R,
    ) -> Result<f64, SimulationError> {
        let dist = Normal::new(self.mean, self.sd).map_err(|e| SimulationError::InvalidParameter {
            param: name.to_string(),
            value: e.to_string(),
        })?;
        (0..MAX_DRAWS)
            .map(|_| dist.sample(rng))
            .find(|v| v.is_finite() && *v > lower)
            .ok_or_else(|| exhausted(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformPrior {
    pub min: f64,
    pub max: f64,
}

impl UniformPrior {
    fn draw<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Result<f64, SimulationError> {
        let dist = Uniform::new(self.min, self.max).map_err(|e| SimulationError::InvalidParameter {
            param: name.to_string(),
            value: e.to_string(),
        })?;
        Ok(dist.sample(rng))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationPrior {
    pub egp0: NormalPrior,
    pub f01: NormalPrior,
    pub k12: NormalPrior,
    pub ka1: NormalPrior,
    pub ka2: NormalPrior,
    pub ka3: NormalPrior,
    pub si1: NormalPrior,
    pub si2: NormalPrior,
    pub si3: NormalPrior,
    pub ke: NormalPrior,
    pub vi: NormalPrior,
    /// Prior on exp(VG)
    pub exp_vg: NormalPrior,
    /// Prior on 1/tauI [1/min]
    pub inv_tau_i: NormalPrior,
    /// Prior on ln(1/tauG)
    pub ln_inv_tau_g: NormalPrior,
    pub ag: UniformPrior,
    pub bw: UniformPrior,
    /// Values shared by every sampled patient
    pub fixed: PatientParameters,
}

impl Default for PopulationPrior {
    fn default() -> Self {
        PopulationPrior {
            egp0: NormalPrior::new(0.0161, 0.0039),
            f01: NormalPrior::new(0.0097, 0.0022),
            k12: NormalPrior::new(0.0649, 0.0282),
            ka1: NormalPrior::new(0.0055, 0.0056),
            ka2: NormalPrior::new(0.0683, 0.0507),
            ka3: NormalPrior::new(0.0304, 0.0235),
            si1: NormalPrior::new(51.2e-4, 32.09e-4),
            si2: NormalPrior::new(8.2e-4, 7.84e-4),
            si3: NormalPrior::new(520e-4, 306.2e-4),
            ke: NormalPrior::new(0.14, 0.035),
            vi: NormalPrior::new(0.12, 0.012),
            exp_vg: NormalPrior::new(1.16, 0.23),
            inv_tau_i: NormalPrior::new(0.018, 0.0045),
            ln_inv_tau_g: NormalPrior::new(-3.689, 0.25),
            ag: UniformPrior { min: 0.7, max: 1.2 },
            bw: UniformPrior { min: 65.0, max: 95.0 },
            fixed: PatientParameters::default(),
        }
    }
}

impl PopulationPrior {
    /// Draw one set of parameters, without checking that an equilibrium exists.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PatientParameters, SimulationError> {
        Ok(PatientParameters {
            egp0: self.egp0.draw_above("EGP0", 0.0, rng)?,
            f01: self.f01.draw_above("F01", 0.0, rng)?,
            k12: self.k12.draw_above("k12", 0.0, rng)?,
            ka1: self.ka1.draw_above("ka1", 0.0, rng)?,
            ka2: self.ka2.draw_above("ka2", 0.0, rng)?,
            ka3: self.ka3.draw_above("ka3", 0.0, rng)?,
            si1: self.si1.draw_above("SI1", 0.0, rng)?,
            si2: self.si2.draw_above("SI2", 0.0, rng)?,
            si3: self.si3.draw_above("SI3", 0.0, rng)?,
            ke: self.ke.draw_above("ke", 0.0, rng)?,
            vi: self.vi.draw_above("VI", 0.0, rng)?,
            vg: self.exp_vg.draw_above("VG", 1.0, rng)?.ln(),
            tau_i: 1.0 / self.inv_tau_i.draw_above("tauI", 0.0, rng)?,
            tau_g: (-self.ln_inv_tau_g.draw_above("tauG", f64::NEG_INFINITY, rng)?).exp(),
            ag: self.ag.draw("AG", rng)?,
            bw: self.bw.draw("BW", rng)?,
            ..self.fixed
        })
    }

    /// Draw a patient that passes validation and has an equilibrium at `Geq`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PatientParameters, SimulationError> {
        for _ in 0..MAX_DRAWS {
            let candidate = self.draw(rng)?;
            if candidate.validate().is_ok() && basal_infusion_for_target(&candidate).is_ok() {
                return Ok(candidate);
            }
        }
        Err(exhausted("patient"))
    }

    /// Draw `n` patients from a seeded generator, so a population can be reproduced.
    pub fn sample_population(
        &self,
        n: usize,
        seed: u64,
    ) -> Result<Vec<PatientParameters>, SimulationError> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| self.sample(&mut rng)).collect()
    }
}

fn exhausted(name: &str) -> SimulationError {
    SimulationError::InvalidParameter {
        param: name.to_string(),
        value: format!("no admissible draw in {} attempts", MAX_DRAWS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_patients_are_valid() {
        let prior = PopulationPrior::default();
        let patients = prior.sample_population(50, 42).unwrap();

        assert_eq!(patients.len(), 50);
        for p in &patients {
            assert!(p.validate().is_ok());
            assert!(basal_infusion_for_target(p).is_ok());
            assert!(p.bw >= 65.0 && p.bw < 95.0);
            assert!(p.tau_i > 0.0 && p.tau_g > 0.0 && p.vg > 0.0);
        }
    }

    #[test]
    fn same_seed_same_population() {
        let prior = PopulationPrior::default();
        let a = prior.sample_population(5, 7).unwrap();
        let b = prior.sample_population(5, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn transformed_priors_map_to_literature_scale() {
        let prior = PopulationPrior::default();
        let patients = prior.sample_population(200, 1).unwrap();
        let n = patients.len() as f64;

        let mean_tau_g = patients.iter().map(|p| p.tau_g).sum::<f64>() / n;
        let mean_vg = patients.iter().map(|p| p.vg).sum::<f64>() / n;

        assert!(mean_tau_g > 30.0 && mean_tau_g < 50.0, "tauG {}", mean_tau_g);
        assert!(mean_vg > 0.08 && mean_vg < 0.25, "VG {}", mean_vg);
    }

    #[test]
    fn impossible_prior_is_reported() {
        let prior = PopulationPrior {
            ke: NormalPrior::new(-10.0, 0.001),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(prior.sample(&mut rng).is_err());
    }
}
