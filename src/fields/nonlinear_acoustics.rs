use ndarray::{Array1, Zip};

use crate::component::FieldComponent;
use crate::fields::acoustics::{max_sound_velocity, AcousticMaterial};
use crate::fields::{courant_limit, Field};
use crate::grid::{Field1DDescriptor, Grid, Operator, Variant};
use crate::material::{Material, ParameterValue};
use crate::Error;

/// Acoustic material with the derivatives of pressure with respect to density, for the
/// second order approximation of the equation of state.
#[derive(Clone, Debug, PartialEq)]
pub struct SecondOrderAcousticMaterial {
    pub acoustic: AcousticMaterial,
    /// First derivative of the pressure with respect to density.
    pub d_rho_p: f64,
    /// Second derivative of the pressure with respect to density.
    pub d_rho2_p: f64,
}

impl SecondOrderAcousticMaterial {
    /// `d_rho_p` defaults to the squared sound velocity, `d_rho2_p` to zero.
    pub fn new(acoustic: AcousticMaterial) -> Self {
        Self {
            d_rho_p: acoustic.sound_velocity * acoustic.sound_velocity,
            d_rho2_p: 0.0,
            acoustic,
        }
    }
}

impl Material for SecondOrderAcousticMaterial {
    fn parameter(&self, name: &str) -> Option<ParameterValue<'_>> {
        match name {
            "d_rho_p" => Some(ParameterValue::Scalar(self.d_rho_p)),
            "d_rho2_p" => Some(ParameterValue::Scalar(self.d_rho2_p)),
            _ => self.acoustic.parameter(name),
        }
    }
}

/// Relation between density perturbation and pressure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StateEquation {
    /// `p = c^2 rho'`
    Linear,
    /// Adiabatic ideal gas, `p = rho0 c^2 / gamma * (((rho0 + rho') / rho0)^gamma - 1)`.
    IdealGas,
    /// `p = d_rho_p rho' + d_rho2_p / 2 rho'^2`
    SecondOrder,
}

/// Operators of a nonlinear one-dimensional acoustic field.
#[derive(Clone, Debug)]
pub struct IdealGas1DOperators {
    pub a_d_v: Operator,
    pub a_v_p: Operator,
    pub a_v_v: Operator,
    /// Convective term, applied to the squared velocity.
    pub a_v_v2: Operator,
}

/// Material vectors read once per assembly.
#[derive(Clone, Debug)]
struct StateVectors {
    density: Array1<f64>,
    sound_velocity: Array1<f64>,
    heat_cap_ratio: Array1<f64>,
    d_rho_p: Array1<f64>,
    d_rho2_p: Array1<f64>,
}

/// One-dimensional nonlinear acoustic field with pressure, velocity and density
/// perturbation as components.
pub struct IdealGas1D {
    grid: Grid,
    pub pressure: FieldComponent,
    pub velocity: FieldComponent,
    pub density: FieldComponent,
    convective: bool,
    state_equation: StateEquation,
    operators: Option<IdealGas1DOperators>,
    state: Option<StateVectors>,
}

impl IdealGas1D {
    /// Creates an ideal gas field accounting for convection and the nonlinear equation of
    /// state.
    pub fn new<M: Material + 'static>(desc: Field1DDescriptor<M>) -> Self {
        let grid = Grid::new_1d(desc);
        let num_points = grid.num_points();
        Self {
            grid,
            pressure: FieldComponent::new(num_points),
            velocity: FieldComponent::new(num_points),
            density: FieldComponent::new(num_points),
            convective: true,
            state_equation: StateEquation::IdealGas,
            operators: None,
            state: None,
        }
    }

    /// Creates a field using the second order approximation of the equation of state. The
    /// material should provide `d_rho_p` and `d_rho2_p`, e.g. via
    /// [`SecondOrderAcousticMaterial`].
    pub fn second_order<M: Material + 'static>(desc: Field1DDescriptor<M>) -> Self {
        Self::new(desc).with_state_equation(StateEquation::SecondOrder)
    }

    /// Whether to account for convective terms.
    pub fn with_convection(mut self, convective: bool) -> Self {
        self.convective = convective;
        self
    }

    pub fn with_state_equation(mut self, state_equation: StateEquation) -> Self {
        self.state_equation = state_equation;
        self
    }

    #[inline]
    pub fn state_equation(&self) -> StateEquation {
        self.state_equation
    }

    #[inline]
    pub fn operators(&self) -> Option<&IdealGas1DOperators> {
        self.operators.as_ref()
    }
}

impl Field for IdealGas1D {
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
        let ones = Array1::<f64>::ones(grid.num_points());

        self.operators = Some(IdealGas1DOperators {
            a_d_v: grid.d_x(Some(&(dt / dx * &ones)), Variant::Forward)?,
            a_v_p: grid.d_x(Some(&(dt / dx * &ones)), Variant::Backward)?,
            a_v_v: grid.d_x2(Some(
                &(dt / (dx * dx) * grid.material_vector("absorption_coef")?),
            ))?,
            a_v_v2: grid.d_x(Some(&(dt / dx / 2.0 * &ones)), Variant::Central)?,
        });

        let (d_rho_p, d_rho2_p) = match self.state_equation {
            StateEquation::SecondOrder => (
                grid.material_vector("d_rho_p")?,
                grid.material_vector("d_rho2_p")?,
            ),
            _ => (ones.clone(), Array1::zeros(ones.len())),
        };
        let heat_cap_ratio = match self.state_equation {
            StateEquation::IdealGas => {
                grid.material_vector("isobaric_heat_cap")?
                    / grid.material_vector("isochoric_heat_cap")?
            }
            _ => ones,
        };
        self.state = Some(StateVectors {
            density: grid.material_vector("density")?,
            sound_velocity: grid.material_vector("sound_velocity")?,
            heat_cap_ratio,
            d_rho_p,
            d_rho2_p,
        });
        Ok(())
    }

    fn advance(&mut self) -> Result<(), Error> {
        let ops = self.operators.as_ref().ok_or(Error::NotAssembled)?;
        let state = self.state.as_ref().ok_or(Error::NotAssembled)?;
        let step = self.grid.step;

        self.pressure.apply_bounds(step)?;
        self.pressure.write_outputs();

        let total_density = &state.density + &self.density.values;
        let mut dv = (&(&ops.a_v_p * &self.pressure.values)
            - &(&ops.a_v_v * &self.velocity.values))
            / &total_density;
        if self.convective {
            let v2 = self.velocity.values.mapv(|v| v * v);
            dv += &(&ops.a_v_v2 * &v2);
        }
        self.velocity.values -= &dv;

        self.velocity.apply_bounds(step)?;
        self.velocity.write_outputs();

        let mass_flux = &total_density * &self.velocity.values;
        let d_rho = &ops.a_d_v * &mass_flux;
        self.density.values -= &d_rho;

        self.density.apply_bounds(step)?;
        self.density.write_outputs();

        let rho = &self.density.values;
        self.pressure.values = match self.state_equation {
            StateEquation::Linear => state.sound_velocity.mapv(|c| c * c) * rho,
            StateEquation::SecondOrder => {
                &state.d_rho_p * rho + &state.d_rho2_p / 2.0 * &rho.mapv(|r| r * r)
            }
            StateEquation::IdealGas => {
                let mut pressure = Array1::zeros(rho.len());
                Zip::from(&mut pressure)
                    .and(rho)
                    .and(&state.density)
                    .and(&state.sound_velocity)
                    .and(&state.heat_cap_ratio)
                    .for_each(|p, &rho, &rho0, &c, &gamma| {
                        *p = rho0 * c * c / gamma * (((rho0 + rho) / rho0).powf(gamma) - 1.0);
                    });
                pressure
            }
        };
        Ok(())
    }

    /// Does not account for instability due to high absorption or nonlinear effects.
    fn is_stable(&self) -> bool {
        max_sound_velocity(&self.grid) < courant_limit(self.grid.x.increment, self.grid.t.increment)
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        vec![
            ("pressure", &self.pressure),
            ("velocity", &self.velocity),
            ("density", &self.density),
        ]
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        vec![
            ("pressure", &mut self.pressure),
            ("velocity", &mut self.velocity),
            ("density", &mut self.density),
        ]
    }
}
