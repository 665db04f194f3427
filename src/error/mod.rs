use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    /// Only the proportional/integral/derivative family is implemented
    #[error("Controller {0} not supported")]
    UnsupportedController(String),

    /// The equilibrium insulin quadratic has no real root
    #[error("Negative discriminant in insulin equilibrium calculation: {discriminant}")]
    NegativeDiscriminant { discriminant: f64 },

    /// The selected root of the equilibrium quadratic is not a valid concentration
    #[error("Equilibrium plasma insulin {insulin} mU/L is not physical")]
    NonPhysicalEquilibrium { insulin: f64 },

    /// The glucose balance residual has the same sign at both ends of the bracket
    #[error("Glucose balance is not bracketed on [{low}, {high}] mU/min")]
    NotBracketed { low: f64, high: f64 },

    #[error("Invalid parameter: {param} = {value}")]
    InvalidParameter { param: String, value: String },

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("Error parsing scenario: {0}")]
    Json(#[from] serde_json::Error),
}
