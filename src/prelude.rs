//! Includes commonly used library components.

pub use crate::component::{BoundaryValue, FieldComponent};
pub use crate::coupling::{
    thermo_acoustic_1d, AcousticLoss, BoundaryCoupling, BoundaryCouplingDescriptor, Interaction,
    MaterialCoupling, MaterialCouplingDescriptor, SynchronizedFields, ThermoAcoustic1DDescriptor,
};
pub use crate::fields::acoustics::{Acoustic1D, Acoustic2D, AcousticMaterial};
pub use crate::fields::electrostatics::{
    Electrostatic1D, Electrostatic2D, ElectrostaticMaterial, StaticField1DDescriptor,
    StaticField2DDescriptor,
};
pub use crate::fields::nonlinear_acoustics::{
    IdealGas1D, SecondOrderAcousticMaterial, StateEquation,
};
pub use crate::fields::thermal::{Thermal1D, Thermal2D, ThermalMaterial};
pub use crate::fields::{AcousticFlow2D, Field};
pub use crate::grid::{Field1DDescriptor, Field2DDescriptor, Grid, Region, Variant};
pub use crate::material::{CustomMaterial, Material};
pub use crate::{
    save_outputs, BarProgress, Error, ProgressLogger, RunDescriptor, SaveSettings, Simulate,
};
