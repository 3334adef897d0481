//! A framework for finite-difference time-domain simulation of coupled acoustic, thermal and
//! electrostatic fields on regular 1D and 2D grids.
//!
//! To get started, refer to the `demos` directory in the main repository.

mod simulation;

pub mod component;
pub mod coupling;
pub mod fields;
pub mod grid;
pub mod material;
pub mod prelude;

#[cfg(test)]
mod test_utils;

pub use simulation::{
    save_outputs, BarProgress, Progress, ProgressLogger, RunDescriptor, SaveSettings, Simulate,
};

/// Represents an error in the simulation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{array_name} array does not have expected length \
        ( {array_name} array length: {input_length}, \
        expected length: {expected_length} )")]
    BadLength {
        array_name: String,
        input_length: usize,
        expected_length: usize,
    },
    #[error("{parameter} must either be scalar or a vector with {expected} elements")]
    BadShape {
        parameter: String,
        expected: usize,
    },
    #[error("Unknown difference quotient variant {0}")]
    UnknownVariant(String),
    #[error("No point found within snap radius of {0}")]
    NoPointFound(f64),
    #[error("Multiple points found within snap radius of {0}")]
    MultiplePointsFound(f64),
    #[error("Expected a position with {expected} coordinates, got {found}")]
    BadDimensionality {
        expected: usize,
        found: usize,
    },
    #[error("Region {region} contains index {index}, but the field only has {num_points} points")]
    RegionOutOfGrid {
        region: String,
        index: usize,
        num_points: usize,
    },
    #[error("Boundary signal of region {region} has {length} samples, step {step} requested")]
    SignalExhausted {
        region: String,
        step: usize,
        length: usize,
    },
    #[error("Coupling of fields with identically named components ({0}) is not possible")]
    DuplicateComponent(String),
    #[error("Synchronized fields must share the {0} dimension")]
    MismatchedGrid(&'static str),
    #[error("Synchronized fields need at least one member field")]
    NoFields,
    #[error("No field component named {0}")]
    UnknownComponent(String),
    #[error("No field with index {0}")]
    UnknownField(usize),
    #[error("Coupling stepping must be at least 1")]
    ZeroStepping,
    #[error("Boundary conditions for {0} are not supported")]
    UnsupportedBoundary(&'static str),
    #[error("Matrices have not been assembled")]
    NotAssembled,
    #[error("The {0} operator is singular")]
    SingularOperator(&'static str),
    #[error(transparent)]
    H5Error(#[from] hdf5::Error),
}
