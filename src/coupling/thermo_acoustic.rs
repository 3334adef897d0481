use ndarray::Array1;

use crate::coupling::{locate, Interaction, SynchronizedFields};
use crate::fields::acoustics::{Acoustic1D, AcousticMaterial};
use crate::fields::thermal::{Thermal1D, ThermalMaterial};
use crate::fields::Field;
use crate::grid::{Field1DDescriptor, Grid, Operator, Variant};
use crate::Error;

/// Describes a thermo-acoustic co-simulation.
pub struct ThermoAcoustic1DDescriptor {
    pub x_samples: usize,
    pub x_delta: f64,
    pub t_samples: usize,
    pub t_delta: f64,
    /// Main material of the thermal field.
    pub thermal_material: ThermalMaterial,
    /// Main material of the acoustic field.
    pub acoustic_material: AcousticMaterial,
    /// Apply the loss coupling only every nth step.
    pub stepping: usize,
}

/// Heats the `temperature` component by the viscous losses of the `velocity` component.
///
/// Every application deposits `absorption_coef * dt / (density * heat_capacity) * (dv/dx)^2`,
/// with the absorption read from the field owning `velocity` and density and heat capacity
/// read from the field owning `temperature`. The material vectors are read on every
/// application, so added material regions and material couplings take effect. With a
/// stepping above one, the losses of the steps in between are accumulated.
pub struct AcousticLoss {
    stepping: usize,
    strain_rate: Operator,
    accumulator: Array1<f64>,
}

impl AcousticLoss {
    /// Creates the loss coupling for fields on `grid`.
    pub fn new(grid: &Grid, stepping: usize) -> Result<Self, Error> {
        if stepping == 0 {
            return Err(Error::ZeroStepping);
        }
        let inverse_dx = Array1::from_elem(grid.num_points(), 1.0 / grid.x.increment);
        Ok(Self {
            stepping,
            strain_rate: grid.d_x(Some(&inverse_dx), Variant::Backward)?,
            accumulator: Array1::zeros(grid.num_points()),
        })
    }

    /// Heat deposited per unit of time increment at every point.
    fn losses(&self, fields: &[Box<dyn Field>]) -> Result<Array1<f64>, Error> {
        let acoustic = &fields[locate(fields, "velocity")?];
        let thermal = &fields[locate(fields, "temperature")?];

        let velocity = &acoustic
            .component("velocity")
            .ok_or_else(|| Error::UnknownComponent("velocity".to_string()))?
            .values;
        let strain_rate = (&self.strain_rate * velocity).mapv(|rate| rate * rate);

        let thermal_grid = thermal.grid();
        let heating = thermal_grid.t.increment
            * acoustic.grid().material_vector("absorption_coef")?
            / (thermal_grid.material_vector("density")?
                * thermal_grid.material_vector("heat_capacity")?);
        Ok(heating * strain_rate)
    }
}

impl Interaction for AcousticLoss {
    fn apply(&mut self, step: usize, fields: &mut [Box<dyn Field>]) -> Result<(), Error> {
        let due = step % self.stepping == 0;
        let accumulate = self.stepping > 1;
        if !due && !accumulate {
            return Ok(());
        }

        let mut losses = self.losses(fields)?;
        if accumulate {
            self.accumulator += &losses;
            if !due {
                return Ok(());
            }
            let len = self.accumulator.len();
            losses = std::mem::replace(&mut self.accumulator, Array1::zeros(len));
        }

        let thermal = locate(fields, "temperature")?;
        let temperature = fields[thermal]
            .component_mut("temperature")
            .ok_or_else(|| Error::UnknownComponent("temperature".to_string()))?;
        temperature.values += &losses;
        Ok(())
    }
}

/// Creates an acoustic and a thermal field heated by the viscous losses of the acoustic
/// velocity. Component names are `pressure`, `velocity`, `temperature` and `heat_flux`.
pub fn thermo_acoustic_1d(desc: ThermoAcoustic1DDescriptor) -> Result<SynchronizedFields, Error> {
    let acoustic = Acoustic1D::new(Field1DDescriptor {
        x_samples: desc.x_samples,
        x_delta: desc.x_delta,
        t_samples: desc.t_samples,
        t_delta: desc.t_delta,
        material: desc.acoustic_material,
    });
    let thermal = Thermal1D::new(Field1DDescriptor {
        x_samples: desc.x_samples,
        x_delta: desc.x_delta,
        t_samples: desc.t_samples,
        t_delta: desc.t_delta,
        material: desc.thermal_material,
    });
    let acoustic_loss = AcousticLoss::new(acoustic.grid(), desc.stepping)?;

    let fields: Vec<Box<dyn Field>> = vec![Box::new(acoustic), Box::new(thermal)];
    let interactions: Vec<Box<dyn Interaction>> = vec![Box::new(acoustic_loss)];
    SynchronizedFields::new(fields, interactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulate;

    fn descriptor(stepping: usize) -> ThermoAcoustic1DDescriptor {
        let mut air = AcousticMaterial::new(340.0, 1.2);
        air.shear_viscosity = 18.6e-6;
        ThermoAcoustic1DDescriptor {
            x_samples: 50,
            x_delta: 1e-3,
            t_samples: 100,
            t_delta: 1e-7,
            thermal_material: ThermalMaterial::new(1000.0, 1.2, 0.026),
            acoustic_material: air,
            stepping,
        }
    }

    fn excite(fields: &mut SynchronizedFields) {
        let source = fields.grid().get_point_region(&[0.025], "source").unwrap();
        fields
            .component_mut("pressure")
            .unwrap()
            .add_boundary(source, 1000.0, false)
            .unwrap();
    }

    #[test]
    fn exposes_both_fields() {
        let fields = thermo_acoustic_1d(descriptor(1)).unwrap();
        let names: Vec<_> = fields.components().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["pressure", "velocity", "temperature", "heat_flux"]);
        assert_eq!(fields.material_regions().len(), 2);
        assert!(fields.is_stable());
        assert!(matches!(
            AcousticLoss::new(fields.grid(), 0),
            Err(Error::ZeroStepping)
        ));
    }

    #[test]
    fn sound_heats_the_medium() {
        for stepping in [1, 4] {
            let mut fields = thermo_acoustic_1d(descriptor(stepping)).unwrap();
            excite(&mut fields);
            fields.simulate(Some(20)).unwrap();

            let temperature = &fields.component("temperature").unwrap().values;
            assert!(temperature.iter().all(|&t| t >= 0.0));
            assert!(temperature.sum() > 0.0);
        }
    }

    #[test]
    fn lossless_region_is_not_heated() {
        let mut fields = thermo_acoustic_1d(descriptor(1)).unwrap();
        excite(&mut fields);

        let mut lossless = AcousticMaterial::new(340.0, 1.2);
        lossless.set_absorption_coef(0.0);
        let line = fields.grid().get_line_region(&[0.0], &[0.049], "lossless").unwrap();
        fields
            .field_mut(0)
            .unwrap()
            .grid_mut()
            .add_material_region(line, lossless)
            .unwrap();
        fields.simulate(Some(20)).unwrap();

        assert!(fields.component("velocity").unwrap().values.iter().any(|&v| v != 0.0));
        let temperature = &fields.component("temperature").unwrap().values;
        assert!(temperature.iter().all(|&t| t == 0.0));
    }
}
