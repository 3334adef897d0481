use ndarray::Array1;

use crate::component::FieldComponent;
use crate::fields::{clear_axis, Field};
use crate::grid::{Field1DDescriptor, Field2DDescriptor, Geometry, Grid, Operator, Variant};
use crate::material::{Material, ParameterValue};
use crate::Error;

/// Thermal material parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThermalMaterial {
    /// Specific heat capacity.
    pub heat_capacity: f64,
    pub density: f64,
    pub thermal_conductivity: f64,
}

impl ThermalMaterial {
    #[inline]
    pub fn new(heat_capacity: f64, density: f64, thermal_conductivity: f64) -> Self {
        Self {
            heat_capacity,
            density,
            thermal_conductivity,
        }
    }
}

impl Material for ThermalMaterial {
    fn parameter(&self, name: &str) -> Option<ParameterValue<'_>> {
        match name {
            "heat_capacity" => Some(ParameterValue::Scalar(self.heat_capacity)),
            "density" => Some(ParameterValue::Scalar(self.density)),
            "thermal_conductivity" => Some(ParameterValue::Scalar(self.thermal_conductivity)),
            _ => None,
        }
    }
}

/// Largest thermal diffusivity `k / (rho * c_p)` of the field.
fn max_diffusivity(grid: &Grid) -> Result<f64, Error> {
    let diffusivity = grid.material_vector("thermal_conductivity")?
        / (grid.material_vector("density")? * grid.material_vector("heat_capacity")?);
    Ok(diffusivity.fold(0.0, |max: f64, &v| max.max(v)))
}

/// `dt / (rho * c_p)`, the temperature change per unit of deposited heat.
fn heat_factor(grid: &Grid) -> Result<Array1<f64>, Error> {
    Ok(grid.t.increment
        / (grid.material_vector("density")? * grid.material_vector("heat_capacity")?))
}

/// Operators of a one-dimensional thermal field.
#[derive(Clone, Debug)]
pub struct Thermal1DOperators {
    pub a_t_q: Operator,
    pub a_q_t: Operator,
}

/// One-dimensional heat conduction.
pub struct Thermal1D {
    grid: Grid,
    pub temperature: FieldComponent,
    pub heat_flux: FieldComponent,
    operators: Option<Thermal1DOperators>,
}

impl Thermal1D {
    pub fn new<M: Material + 'static>(desc: Field1DDescriptor<M>) -> Self {
        let grid = Grid::new_1d(desc);
        let num_points = grid.num_points();
        Self {
            grid,
            temperature: FieldComponent::new(num_points),
            heat_flux: FieldComponent::new(num_points),
            operators: None,
        }
    }

    #[inline]
    pub fn operators(&self) -> Option<&Thermal1DOperators> {
        self.operators.as_ref()
    }
}

impl Field for Thermal1D {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    fn assemble(&mut self) -> Result<(), Error> {
        let grid = &self.grid;
        let dx = grid.x.increment;
        let conductivity = grid.material_vector("thermal_conductivity")?;

        self.operators = Some(Thermal1DOperators {
            a_t_q: grid.d_x(Some(&(heat_factor(grid)? / dx)), Variant::Forward)?,
            a_q_t: grid.d_x(Some(&(conductivity / dx)), Variant::Backward)?,
        });
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        let ops = self.operators.as_ref().ok_or(Error::NotAssembled)?;
        let step = self.grid.step;

        self.temperature.apply_bounds(step)?;
        self.temperature.write_outputs();

        self.heat_flux.values = -(&ops.a_q_t * &self.temperature.values);

        self.heat_flux.apply_bounds(step)?;
        self.heat_flux.write_outputs();

        let dt = &ops.a_t_q * &self.heat_flux.values;
        self.temperature.values -= &dt;
        Ok(())
    }

    /// Explicit diffusion limit `alpha * dt / dx^2 < 1 / 2`, with 1 % headroom.
    fn is_stable(&self) -> bool {
        let dx = self.grid.x.increment;
        match max_diffusivity(&self.grid) {
            Ok(alpha) => alpha * self.grid.t.increment / (dx * dx) < 0.99 * 0.5,
            Err(_) => false,
        }
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![
            ("temperature", &self.temperature),
            ("heat_flux", &self.heat_flux),
        ]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("temperature", &mut self.temperature),
            ("heat_flux", &mut self.heat_flux),
        ]
    }
}

/// Operators of a two-dimensional thermal field.
#[derive(Clone, Debug)]
pub struct Thermal2DOperators {
    pub a_t_qx: Operator,
    pub a_t_qy: Operator,
    pub a_qx_t: Operator,
    pub a_qy_t: Operator,
}

/// Two-dimensional heat conduction, either cartesian or axisymmetric.
pub struct Thermal2D {
    grid: Grid,
    pub temperature: FieldComponent,
    pub heat_flux_x: FieldComponent,
    pub heat_flux_y: FieldComponent,
    operators: Option<Thermal2DOperators>,
}

impl Thermal2D {
    pub fn new<M: Material + 'static>(desc: Field2DDescriptor<M>) -> Self {
        Self::with_geometry(desc, Geometry::Cartesian)
    }

    /// Creates a rotationally symmetric field with x being the radius, see
    /// [`Acoustic2D::axisymmetric`](crate::fields::acoustics::Acoustic2D::axisymmetric).
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
            temperature: FieldComponent::new(num_points),
            heat_flux_x: FieldComponent::new(num_points),
            heat_flux_y: FieldComponent::new(num_points),
            operators: None,
        }
    }

    #[inline]
    pub fn operators(&self) -> Option<&Thermal2DOperators> {
        self.operators.as_ref()
    }
}

impl Field for Thermal2D {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    fn assemble(&mut self) -> Result<(), Error> {
        let grid = &self.grid;
        let dx = grid.x.increment;
        let dy = grid.y.as_ref().map_or(1.0, |y| y.increment);
        let heat = heat_factor(grid)?;
        let conductivity = grid.material_vector("thermal_conductivity")?;

        self.operators = Some(Thermal2DOperators {
            a_t_qx: grid.div_x(&(&heat / dx))?,
            a_t_qy: grid.d_y(Some(&(&heat / dy)), Variant::Forward)?,
            a_qx_t: grid.d_x(Some(&(&conductivity / dx)), Variant::Backward)?,
            a_qy_t: grid.d_y(Some(&(&conductivity / dy)), Variant::Backward)?,
        });
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        let ops = self.operators.as_ref().ok_or(Error::NotAssembled)?;
        let step = self.grid.step;

        self.temperature.apply_bounds(step)?;
        self.temperature.write_outputs();

        self.heat_flux_x.values = -(&ops.a_qx_t * &self.temperature.values);
        self.heat_flux_y.values = -(&ops.a_qy_t * &self.temperature.values);
        clear_axis(&self.grid, &mut self.heat_flux_x.values);

        self.heat_flux_x.apply_bounds(step)?;
        self.heat_flux_x.write_outputs();
        self.heat_flux_y.apply_bounds(step)?;
        self.heat_flux_y.write_outputs();

        let dt = &(&ops.a_t_qx * &self.heat_flux_x.values)
            + &(&ops.a_t_qy * &self.heat_flux_y.values);
        self.temperature.values -= &dt;
        Ok(())
    }

    fn is_stable(&self) -> bool {
        let dx = self.grid.x.increment;
        let dy = self.grid.y.as_ref().map_or(f64::INFINITY, |y| y.increment);
        match max_diffusivity(&self.grid) {
            Ok(alpha) => {
                alpha * self.grid.t.increment * (1.0 / (dx * dx) + 1.0 / (dy * dy)) < 0.99 * 0.5
            }
            Err(_) => false,
        }
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![
            ("temperature", &self.temperature),
            ("heat_flux_x", &self.heat_flux_x),
            ("heat_flux_y", &self.heat_flux_y),
        ]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("temperature", &mut self.temperature),
            ("heat_flux_x", &mut self.heat_flux_x),
            ("heat_flux_y", &mut self.heat_flux_y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulate;
    use approx::assert_abs_diff_eq;

    fn rod(samples: usize) -> Thermal1D {
        Thermal1D::new(Field1DDescriptor {
            x_samples: samples,
            x_delta: 1.0,
            t_samples: 50,
            t_delta: 0.1,
            material: ThermalMaterial::new(1.0, 1.0, 1.0),
        })
    }

    #[test]
    fn heat_spreads_from_hot_spot() {
        let mut field = rod(11);
        assert!(field.is_stable());
        field.temperature.values[5] = 1.0;
        field.simulate(Some(1)).unwrap();

        let t = &field.temperature.values;
        assert_abs_diff_eq!(t[5], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(t[4], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(t[6], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(t.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn fixed_temperature_boundary_heats_rod() {
        let mut field = rod(8);
        let end = field.grid().get_point_region(&[0.0], "hot end").unwrap();
        let sensor = field.grid().get_point_region(&[2.0], "sensor").unwrap();
        field.temperature.add_boundary(end, 100.0, false).unwrap();
        field.temperature.add_output(sensor).unwrap();
        field.simulate(None).unwrap();

        let signal = &field.temperature.outputs()[0].signals()[0];
        assert_eq!(signal.len(), 50);
        assert!(signal.windows(2).all(|w| w[1] >= w[0]));
        assert!(signal[49] > 0.0 && signal[49] < 100.0);
    }

    #[test]
    fn stability_follows_diffusion_limit() {
        let field = Thermal1D::new(Field1DDescriptor {
            x_samples: 3,
            x_delta: 1.0,
            t_samples: 1,
            t_delta: 1.0,
            material: ThermalMaterial::new(1.0, 1.0, 1.0),
        });
        assert!(!field.is_stable());
    }

    #[test]
    fn thermal_2d_conserves_heat_inside() {
        let mut field = Thermal2D::new(Field2DDescriptor {
            x_samples: 5,
            x_delta: 1.0,
            y_samples: 5,
            y_delta: 1.0,
            t_samples: 1,
            t_delta: 0.1,
            material: ThermalMaterial::new(1.0, 1.0, 1.0),
        });
        assert!(field.is_stable());
        field.temperature.values[12] = 1.0;
        field.simulate(Some(1)).unwrap();

        let t = &field.temperature.values;
        assert_abs_diff_eq!(t[12], 0.6, epsilon = 1e-12);
        for neighbour in [7, 11, 13, 17] {
            assert_abs_diff_eq!(t[neighbour], 0.1, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(t.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn axisymmetric_flux_vanishes_on_axis() {
        let mut field = Thermal2D::axisymmetric(Field2DDescriptor {
            x_samples: 4,
            x_delta: 1.0,
            y_samples: 2,
            y_delta: 1.0,
            t_samples: 1,
            t_delta: 0.05,
            material: ThermalMaterial::new(1.0, 1.0, 1.0),
        });
        field.temperature.values.fill(2.0);
        field.simulate(Some(1)).unwrap();
        assert_eq!(field.heat_flux_x.values[0], 0.0);
        assert_eq!(field.heat_flux_x.values[4], 0.0);
    }
}
