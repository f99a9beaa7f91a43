/// Validation of names and addresses that cross the process boundary

pub mod validation;

pub use validation::{validate_address, validate_artifact_name, validate_input, ValidationError};
