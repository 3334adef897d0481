use nalgebra::DMatrix;
use ndarray::Array2;
use physical_constants::VACUUM_ELECTRIC_PERMITTIVITY;

use crate::component::FieldComponent;
use crate::fields::Field;
use crate::grid::{Field1DDescriptor, Field2DDescriptor, Grid, Operator};
use crate::material::{Material, ParameterValue};
use crate::Error;

/// Electrostatic material parameters. The default creates vacuum.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ElectrostaticMaterial {
    permittivity_x: f64,
    permittivity_y: f64,
}

impl ElectrostaticMaterial {
    /// Isotropic material with the given permittivity in As/Vm.
    #[inline]
    pub fn new(permittivity: f64) -> Self {
        Self {
            permittivity_x: permittivity,
            permittivity_y: permittivity,
        }
    }

    /// Returns the permittivity along x and y.
    #[inline]
    pub fn permittivity(&self) -> (f64, f64) {
        (self.permittivity_x, self.permittivity_y)
    }

    /// Sets the permittivity from either one value or one value per axis.
    pub fn set_permittivity(&mut self, permittivity: &[f64]) -> Result<(), Error> {
        match *permittivity {
            [value] => {
                self.permittivity_x = value;
                self.permittivity_y = value;
            }
            [x, y] => {
                self.permittivity_x = x;
                self.permittivity_y = y;
            }
            _ => {
                return Err(Error::BadShape {
                    parameter: "Permittivity".to_string(),
                    expected: 2,
                })
            }
        }
        Ok(())
    }
}

impl Default for ElectrostaticMaterial {
    fn default() -> Self {
        Self::new(VACUUM_ELECTRIC_PERMITTIVITY)
    }
}

impl Material for ElectrostaticMaterial {
    fn parameter(&self, name: &str) -> Option<ParameterValue<'_>> {
        match name {
            "permittivity_x" => Some(ParameterValue::Scalar(self.permittivity_x)),
            "permittivity_y" => Some(ParameterValue::Scalar(self.permittivity_y)),
            _ => None,
        }
    }
}

/// Describes a one-dimensional static field.
pub struct StaticField1DDescriptor<M: Material> {
    pub x_samples: usize,
    pub x_delta: f64,
    pub material: M,
}

/// Describes a two-dimensional static field.
pub struct StaticField2DDescriptor<M: Material> {
    pub x_samples: usize,
    pub x_delta: f64,
    pub y_samples: usize,
    pub y_delta: f64,
    pub material: M,
}

/// Inverts the Poisson operator.
fn invert(operator: &Operator) -> Result<Array2<f64>, Error> {
    let (rows, cols) = operator.shape();
    let mut dense = DMatrix::<f64>::zeros(rows, cols);
    for (&value, (row, col)) in operator.iter() {
        dense[(row, col)] += value;
    }

    let inverse = dense
        .try_inverse()
        .ok_or(Error::SingularOperator("Poisson"))?;
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| inverse[(i, j)]))
}

/// Solves `potential = -inverse * charge_density` and records both components.
fn solve(
    grid: &Grid,
    inverse: Option<&Array2<f64>>,
    potential: &mut FieldComponent,
    charge_density: &mut FieldComponent,
) -> Result<(), Error> {
    let inverse = inverse.ok_or(Error::NotAssembled)?;
    if !potential.boundaries().is_empty() {
        return Err(Error::UnsupportedBoundary("electric potential"));
    }

    charge_density.apply_bounds(grid.step)?;
    charge_density.write_outputs();

    potential.values = -inverse.dot(&charge_density.values);
    potential.write_outputs();
    Ok(())
}

/// One-dimensional electrostatic field. Every step solves the Poisson equation for the
/// current charge density.
pub struct Electrostatic1D {
    grid: Grid,
    pub potential: FieldComponent,
    pub charge_density: FieldComponent,
    a_phi_rho: Option<Array2<f64>>,
}

impl Electrostatic1D {
    pub fn new<M: Material + 'static>(desc: StaticField1DDescriptor<M>) -> Self {
        let grid = Grid::new_1d(Field1DDescriptor {
            x_samples: desc.x_samples,
            x_delta: desc.x_delta,
            t_samples: 1,
            t_delta: 1.0,
            material: desc.material,
        });
        let num_points = grid.num_points();
        Self {
            grid,
            potential: FieldComponent::new(num_points),
            charge_density: FieldComponent::new(num_points),
            a_phi_rho: None,
        }
    }

    /// The inverse Poisson operator, if assembled.
    pub fn inverse_operator(&self) -> Option<&Array2<f64>> {
        self.a_phi_rho.as_ref()
    }
}

impl Field for Electrostatic1D {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    fn assemble(&mut self) -> Result<(), Error> {
        let grid = &self.grid;
        let dx = grid.x.increment;
        let a_rho_phi = grid.d_x2(Some(&(grid.material_vector("permittivity_x")? / (dx * dx))))?;
        self.a_phi_rho = Some(invert(&a_rho_phi)?);
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        solve(
            &self.grid,
            self.a_phi_rho.as_ref(),
            &mut self.potential,
            &mut self.charge_density,
        )
    }

    fn is_stable(&self) -> bool {
        true
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![
            ("potential", &self.potential),
            ("charge_density", &self.charge_density),
        ]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("potential", &mut self.potential),
            ("charge_density", &mut self.charge_density),
        ]
    }
}

/// Two-dimensional electrostatic field.
pub struct Electrostatic2D {
    grid: Grid,
    pub potential: FieldComponent,
    pub charge_density: FieldComponent,
    a_phi_rho: Option<Array2<f64>>,
}

impl Electrostatic2D {
    pub fn new<M: Material + 'static>(desc: StaticField2DDescriptor<M>) -> Self {
        let grid = Grid::new_2d(Field2DDescriptor {
            x_samples: desc.x_samples,
            x_delta: desc.x_delta,
            y_samples: desc.y_samples,
            y_delta: desc.y_delta,
            t_samples: 1,
            t_delta: 1.0,
            material: desc.material,
        });
        let num_points = grid.num_points();
        Self {
            grid,
            potential: FieldComponent::new(num_points),
            charge_density: FieldComponent::new(num_points),
            a_phi_rho: None,
        }
    }

    pub fn inverse_operator(&self) -> Option<&Array2<f64>> {
        self.a_phi_rho.as_ref()
    }
}

impl Field for Electrostatic2D {
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
        let a_x = grid.d_x2(Some(&(grid.material_vector("permittivity_x")? / (dx * dx))))?;
        let a_y = grid.d_y2(Some(&(grid.material_vector("permittivity_y")? / (dy * dy))))?;
        self.a_phi_rho = Some(invert(&(&a_x + &a_y))?);
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        solve(
            &self.grid,
            self.a_phi_rho.as_ref(),
            &mut self.potential,
            &mut self.charge_density,
        )
    }

    fn is_stable(&self) -> bool {
        true
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![
            ("potential", &self.potential),
            ("charge_density", &self.charge_density),
        ]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("potential", &mut self.potential),
            ("charge_density", &mut self.charge_density),
        ]
    }
}
