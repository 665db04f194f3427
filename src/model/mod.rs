//! The Hovorka glucose-insulin model.
//!
//! Ten compartments in three subsystems: gut absorption (`D1`, `D2`),
//! subcutaneous insulin absorption and plasma insulin (`S1`, `S2`, `I`) with
//! its three remote actions (`x1`, `x2`, `x3`), and two-compartment glucose
//! kinetics (`Q1`, `Q2`).
pub mod equilibrium;
pub mod hovorka;
pub mod parameters;
pub mod prior;
pub mod state;

pub use equilibrium::{
    basal_infusion_for_target, basal_infusion_or_zero, Equilibrium, SteadyStateMethod,
};
pub use hovorka::{derivative, output, Fluxes};
pub use parameters::PatientParameters;
pub use prior::PopulationPrior;
pub use state::{Compartment, PatientState, NSTATES};
