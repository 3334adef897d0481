use crate::component::FieldComponent;
use crate::fields::{clear_axis, courant_limit, Field};
use crate::grid::{Field1DDescriptor, Field2DDescriptor, Geometry, Grid, Operator, Variant};
use crate::material::{Material, ParameterValue};
use crate::Error;

/// Acoustic material parameters. The default values of the optional parameters create a
/// lossless medium.
#[derive(Clone, Debug, PartialEq)]
pub struct AcousticMaterial {
    pub sound_velocity: f64,
    pub density: f64,
    pub shear_viscosity: f64,
    pub bulk_viscosity: f64,
    pub thermal_conductivity: f64,
    pub isobaric_heat_cap: f64,
    pub isochoric_heat_cap: f64,
    absorption_override: Option<f64>,
}

impl AcousticMaterial {
    #[inline]
    pub fn new(sound_velocity: f64, density: f64) -> Self {
        Self {
            sound_velocity,
            density,
            shear_viscosity: 0.0,
            bulk_viscosity: 0.0,
            thermal_conductivity: 0.0,
            isobaric_heat_cap: 1.0,
            isochoric_heat_cap: 1.0,
            absorption_override: None,
        }
    }

    /// Sums up all losses into a single coefficient, unless it was set explicitly.
    pub fn absorption_coef(&self) -> f64 {
        self.absorption_override.unwrap_or_else(|| {
            4.0 / 3.0 * self.shear_viscosity
                + self.bulk_viscosity
                + self.thermal_conductivity * (self.isobaric_heat_cap - self.isochoric_heat_cap)
                    / (self.isobaric_heat_cap * self.isochoric_heat_cap)
        })
    }

    /// Fixes the absorption coefficient until `clear_absorption_coef` is called.
    pub fn set_absorption_coef(&mut self, value: f64) {
        self.absorption_override = Some(value);
    }

    pub fn clear_absorption_coef(&mut self) {
        self.absorption_override = None;
    }

    /// Ratio of the isobaric and isochoric heat capacities.
    pub fn heat_cap_ratio(&self) -> f64 {
        self.isobaric_heat_cap / self.isochoric_heat_cap
    }
}

impl Material for AcousticMaterial {
    fn parameter(&self, name: &str) -> Option<ParameterValue<'_>> {
        let value = match name {
            "sound_velocity" => self.sound_velocity,
            "density" => self.density,
            "shear_viscosity" => self.shear_viscosity,
            "bulk_viscosity" => self.bulk_viscosity,
            "thermal_conductivity" => self.thermal_conductivity,
            "isobaric_heat_cap" => self.isobaric_heat_cap,
            "isochoric_heat_cap" => self.isochoric_heat_cap,
            "absorption_coef" => self.absorption_coef(),
            _ => return None,
        };
        Some(ParameterValue::Scalar(value))
    }
}

/// Operators of a one-dimensional acoustic field.
#[derive(Clone, Debug)]
pub struct Acoustic1DOperators {
    /// Pressure update from velocity.
    pub a_p_v: Operator,
    /// Velocity update from pressure.
    pub a_v_p: Operator,
    /// Velocity losses.
    pub a_v_v: Operator,
}

/// One-dimensional linear acoustic field.
pub struct Acoustic1D {
    grid: Grid,
    pub pressure: FieldComponent,
    pub velocity: FieldComponent,
    operators: Option<Acoustic1DOperators>,
}

impl Acoustic1D {
    pub fn new<M: Material + 'static>(desc: Field1DDescriptor<M>) -> Self {
        let grid = Grid::new_1d(desc);
        let num_points = grid.num_points();
        Self {
            grid,
            pressure: FieldComponent::new(num_points),
            velocity: FieldComponent::new(num_points),
            operators: None,
        }
    }

    /// The assembled operators, if any.
    #[inline]
    pub fn operators(&self) -> Option<&Acoustic1DOperators> {
        self.operators.as_ref()
    }
}

impl Field for Acoustic1D {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    fn assemble(&mut self) -> Result<(), Error> {
        let grid = &self.grid;
        let dt = grid.t.increment;
        let dx = grid.x.increment;
        let density = grid.material_vector("density")?;
        let stiffness = &density * &grid.material_vector("sound_velocity")?.mapv(|c| c * c);
        let absorption = grid.material_vector("absorption_coef")?;

        self.operators = Some(Acoustic1DOperators {
            a_p_v: grid.d_x(Some(&(dt / dx * stiffness)), Variant::Forward)?,
            a_v_p: grid.d_x(Some(&(dt / dx / &density)), Variant::Backward)?,
            a_v_v: grid.d_x2(Some(&(dt / (dx * dx) * absorption / &density)))?,
        });
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        let ops = self.operators.as_ref().ok_or(Error::NotAssembled)?;
        let step = self.grid.step;

        self.pressure.apply_bounds(step)?;
        self.pressure.write_outputs();

        let dv = &(&ops.a_v_p * &self.pressure.values) - &(&ops.a_v_v * &self.velocity.values);
        self.velocity.values -= &dv;

        self.velocity.apply_bounds(step)?;
        self.velocity.write_outputs();

        let dp = &ops.a_p_v * &self.velocity.values;
        self.pressure.values -= &dp;
        Ok(())
    }

    fn is_stable(&self) -> bool {
        let limit = courant_limit(self.grid.x.increment, self.grid.t.increment);
        max_sound_velocity(&self.grid) < limit
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![("pressure", &self.pressure), ("velocity", &self.velocity)]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("pressure", &mut self.pressure),
            ("velocity", &mut self.velocity),
        ]
    }
}

/// Operators of a two-dimensional acoustic field.
#[derive(Clone, Debug)]
pub struct Acoustic2DOperators {
    pub a_p_vx: Operator,
    pub a_p_vy: Operator,
    pub a_vx_p: Operator,
    pub a_vy_p: Operator,
    pub a_vx_vx: Operator,
    pub a_vy_vy: Operator,
}

/// Two-dimensional linear acoustic field, either cartesian or axisymmetric.
///
/// In the axisymmetric case x is the radius and y the axis of symmetry, which models a
/// rotationally symmetric three-dimensional field.
pub struct Acoustic2D {
    grid: Grid,
    pub pressure: FieldComponent,
    pub velocity_x: FieldComponent,
    pub velocity_y: FieldComponent,
    operators: Option<Acoustic2DOperators>,
}

impl Acoustic2D {
    pub fn new<M: Material + 'static>(desc: Field2DDescriptor<M>) -> Self {
        Self::with_geometry(desc, Geometry::Cartesian)
    }

    /// Creates a rotationally symmetric field. Pressure points sit at the radii
    /// `(ix + 0.5) * x_delta`, radial velocities between them, the first one on the axis.
    pub fn axisymmetric<M: Material + 'static>(desc: Field2DDescriptor<M>) -> Self {
        Self::with_geometry(desc, Geometry::Axisymmetric)
    }

    fn with_geometry<M: Material + 'static>(
        desc: Field2DDescriptor<M>,
        geometry: Geometry,
    ) -> Self {
        let mut grid = Grid::new_2d(desc);
        grid.set_geometry(geometry);
        let num_points = grid.num_points();
        Self {
            grid,
            pressure: FieldComponent::new(num_points),
            velocity_x: FieldComponent::new(num_points),
            velocity_y: FieldComponent::new(num_points),
            operators: None,
        }
    }

    #[inline]
    pub fn operators(&self) -> Option<&Acoustic2DOperators> {
        self.operators.as_ref()
    }
}

pub(crate) fn max_sound_velocity(grid: &Grid) -> f64 {
    grid.material_vector("sound_velocity")
        .map(|c| c.fold(0.0, |max: f64, &v| max.max(v)))
        .unwrap_or(f64::INFINITY)
}

impl Field for Acoustic2D {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    fn assemble(&mut self) -> Result<(), Error> {
        let grid = &self.grid;
        let dt = grid.t.increment;
        let dx = grid.x.increment;
        let dy = grid.y.as_ref().map_or(1.0, |y| y.increment);
        let density = grid.material_vector("density")?;
        let stiffness = &density * &grid.material_vector("sound_velocity")?.mapv(|c| c * c);
        let losses = grid.material_vector("absorption_coef")? / &density;

        self.operators = Some(Acoustic2DOperators {
            a_p_vx: grid.div_x(&(dt / dx * &stiffness))?,
            a_p_vy: grid.d_y(Some(&(dt / dy * &stiffness)), Variant::Forward)?,
            a_vx_p: grid.d_x(Some(&(dt / dx / &density)), Variant::Backward)?,
            a_vy_p: grid.d_y(Some(&(dt / dy / &density)), Variant::Backward)?,
            a_vx_vx: grid.d_x2(Some(&(dt / (dx * dx) * &losses)))?,
            a_vy_vy: grid.d_y2(Some(&(dt / (dy * dy) * &losses)))?,
        });
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        let ops = self.operators.as_ref().ok_or(Error::NotAssembled)?;
        let step = self.grid.step;

        self.pressure.apply_bounds(step)?;
        self.pressure.write_outputs();

        let dvx = &(&ops.a_vx_p * &self.pressure.values)
            - &(&ops.a_vx_vx * &self.velocity_x.values);
        let dvy = &(&ops.a_vy_p * &self.pressure.values)
            - &(&ops.a_vy_vy * &self.velocity_y.values);
        self.velocity_x.values -= &dvx;
        self.velocity_y.values -= &dvy;
        clear_axis(&self.grid, &mut self.velocity_x.values);

        self.velocity_x.apply_bounds(step)?;
        self.velocity_x.write_outputs();
        self.velocity_y.apply_bounds(step)?;
        self.velocity_y.write_outputs();

        let dp = &(&ops.a_p_vx * &self.velocity_x.values)
            + &(&ops.a_p_vy * &self.velocity_y.values);
        self.pressure.values -= &dp;
        Ok(())
    }

    fn is_stable(&self) -> bool {
        let grid = &self.grid;
        let dy = grid.y.as_ref().map_or(f64::INFINITY, |y| y.increment);
        let limit = courant_limit(grid.x.increment.min(dy), grid.t.increment);
        max_sound_velocity(grid) < limit
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![
            ("pressure", &self.pressure),
            ("velocity_x", &self.velocity_x),
            ("velocity_y", &self.velocity_y),
        ]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("pressure", &mut self.pressure),
            ("velocity_x", &mut self.velocity_x),
            ("velocity_y", &mut self.velocity_y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::BoundaryValue;
    use crate::simulation::Simulate;
    use approx::assert_abs_diff_eq;

    fn acoustic_1d(samples: usize, material: AcousticMaterial) -> Acoustic1D {
        Acoustic1D::new(Field1DDescriptor {
            x_samples: samples,
            x_delta: 1.0,
            t_samples: 1,
            t_delta: 1.0,
            material,
        })
    }

    #[test]
    fn absorption_is_computed_until_overridden() {
        let mut water = AcousticMaterial::new(1500.0, 1000.0);
        water.bulk_viscosity = 1e-3;
        water.shear_viscosity = 1e-3;
        assert_abs_diff_eq!(water.absorption_coef(), 7e-3 / 3.0, epsilon = 1e-15);

        water.set_absorption_coef(0.5);
        water.bulk_viscosity = 1.0;
        assert_eq!(water.absorption_coef(), 0.5);
        assert_eq!(water.parameter("absorption_coef"), Some(ParameterValue::Scalar(0.5)));

        water.clear_absorption_coef();
        assert_abs_diff_eq!(water.absorption_coef(), 1.0 + 4e-3 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn pressure_velocity_operator() {
        let mut material = AcousticMaterial::new(700.0, 0.01);
        material.bulk_viscosity = 1.0;
        let mut field = acoustic_1d(3, material);
        field.assemble_matrices().unwrap();

        let a_p_v = field.operators().unwrap().a_p_v.to_dense();
        assert_abs_diff_eq!(a_p_v[[0, 0]], -4900.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a_p_v[[0, 1]], 4900.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a_p_v[[1, 1]], -4900.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a_p_v[[1, 2]], 4900.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a_p_v[[2, 2]], -4900.0, epsilon = 1e-9);
        assert_eq!(a_p_v[[2, 0]], 0.0);
        assert_eq!(a_p_v[[2, 1]], 0.0);
    }

    #[test]
    fn stepping_requires_assembly() {
        let mut field = acoustic_1d(3, AcousticMaterial::new(1.0, 1.0));
        assert!(matches!(field.sim_step(), Err(Error::NotAssembled)));
        assert_eq!(field.step(), 0);
    }

    #[test]
    fn assembly_is_reproducible() {
        let mut field = acoustic_1d(6, AcousticMaterial::new(340.0, 1.2));
        field.assemble_matrices().unwrap();
        let first = field.operators().unwrap().clone();
        field.assemble_matrices().unwrap();
        let second = field.operators().unwrap();
        assert_eq!(first.a_p_v, second.a_p_v);
        assert_eq!(first.a_v_p, second.a_v_p);
        assert_eq!(first.a_v_v, second.a_v_v);
    }

    #[test]
    fn pressure_source_drives_velocity() {
        let mut field = Acoustic1D::new(Field1DDescriptor {
            x_samples: 20,
            x_delta: 1.0,
            t_samples: 10,
            t_delta: 0.5,
            material: AcousticMaterial::new(1.0, 1.0),
        });
        assert!(field.is_stable());
        let source = field.grid().get_point_region(&[5.0], "source").unwrap();
        let sensor = field.grid().get_point_region(&[6.0], "sensor").unwrap();
        field.pressure.add_boundary(source, 1.0, false).unwrap();
        field.velocity.add_output(sensor).unwrap();

        field.simulate(None).unwrap();
        assert_eq!(field.step(), 10);
        // pressure drop from 5 to 6 pushes the medium towards +x
        let signal = &field.velocity.outputs()[0].signals()[0];
        assert_eq!(signal.len(), 10);
        assert!(signal.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn exhausted_signal_leaves_field_untouched() {
        let mut field = Acoustic1D::new(Field1DDescriptor {
            x_samples: 6,
            x_delta: 1.0,
            t_samples: 4,
            t_delta: 0.5,
            material: AcousticMaterial::new(1.0, 1.0),
        });
        field.pressure.values[2] = 1.0;
        let end = field.grid().get_point_region(&[5.0], "end").unwrap();
        field
            .velocity
            .add_boundary(end, BoundaryValue::Signal(vec![0.0]), false)
            .unwrap();
        field.simulate(Some(1)).unwrap();

        let pressure = field.pressure.values.clone();
        let velocity = field.velocity.values.clone();
        for _ in 0..2 {
            assert!(matches!(
                field.sim_step(),
                Err(Error::SignalExhausted { step: 1, .. })
            ));
            assert_eq!(field.step(), 1);
            assert_eq!(field.pressure.values, pressure);
            assert_eq!(field.velocity.values, velocity);
        }
    }

    #[test]
    fn unstable_discretization_is_reported() {
        let field = Acoustic1D::new(Field1DDescriptor {
            x_samples: 4,
            x_delta: 1.0,
            t_samples: 1,
            t_delta: 1.0,
            material: AcousticMaterial::new(340.0, 1.2),
        });
        assert!(!field.is_stable());
    }

    fn plane(axisymmetric: bool) -> Acoustic2D {
        let desc = Field2DDescriptor {
            x_samples: 4,
            x_delta: 1.0,
            y_samples: 3,
            y_delta: 1.0,
            t_samples: 5,
            t_delta: 0.1,
            material: AcousticMaterial::new(1.0, 1.0),
        };
        if axisymmetric {
            Acoustic2D::axisymmetric(desc)
        } else {
            Acoustic2D::new(desc)
        }
    }

    #[test]
    fn acoustic_2d_components_and_stepping() {
        let mut field = plane(false);
        let names: Vec<_> = field.components().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["pressure", "velocity_x", "velocity_y"]);

        field.pressure.values[5] = 1.0;
        field.simulate(Some(1)).unwrap();
        assert!(field.velocity_x.values[6] > 0.0);
        assert!(field.velocity_y.values[9] > 0.0);
        assert!(field.pressure.values[5] < 1.0);
    }

    #[test]
    fn axisymmetric_field_keeps_axis_velocity_zero() {
        let mut field = plane(true);
        field.pressure.values.fill(1.0);
        field.simulate(Some(3)).unwrap();
        for iy in 0..3 {
            assert_eq!(field.velocity_x.values[iy * 4], 0.0);
        }

        let cartesian = plane(false);
        assert_eq!(cartesian.grid().geometry(), Geometry::Cartesian);
        assert_eq!(field.grid().geometry(), Geometry::Axisymmetric);
    }
}
