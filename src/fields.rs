//! Field models and the stepping contract they share.

pub mod acoustics;
pub mod electrostatics;
pub mod nonlinear_acoustics;
pub mod thermal;

mod acoustic_flow;

pub use acoustic_flow::AcousticFlow2D;

use ndarray::Array1;

use crate::component::FieldComponent;
use crate::grid::{Dimension, Geometry, Grid};
use crate::simulation::Simulate;
use crate::Error;

/// Describes a discretized physical field.
///
/// Implementors assemble their operators from the grid's material vectors in `assemble` and
/// advance their components by one time increment in `advance`. Every `advance` applies the
/// boundaries of a component and records its outputs before the component is updated.
pub trait Field: Send {
    fn grid(&self) -> &Grid;

    fn grid_mut(&mut self) -> &mut Grid;

    /// Computes and stores all operators required for `advance`.
    fn assemble(&mut self) -> Result<(), Error>;

    /// Advances the components by one time increment. The step counter is left untouched.
    fn advance(&mut self) -> Result<(), Error>;

    /// Checks whether the discretization satisfies the stability condition of the model.
    fn is_stable(&self) -> bool;

    /// Named components of the field.
    fn components(&self) -> Vec<(&'static str, &FieldComponent)>;

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)>;

    fn component(&self, name: &str) -> Option<&FieldComponent> {
        self.components()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
    }

    fn component_mut(&mut self, name: &str) -> Option<&mut FieldComponent> {
        self.components_mut()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
    }

    /// Checks that the boundaries of all components can be applied at the current step, so a
    /// failing step leaves the field untouched.
    fn check_bounds(&self) -> Result<(), Error> {
        let step = self.grid().step;
        self.components()
            .into_iter()
            .try_for_each(|(_, component)| component.check_bounds(step))
    }
}

impl<F: Field + ?Sized> Simulate for F {
    fn t(&self) -> &Dimension {
        &self.grid().t
    }

    fn step(&self) -> usize {
        self.grid().step
    }

    fn set_step(&mut self, step: usize) {
        self.grid_mut().step = step;
    }

    fn matrices_assembled(&self) -> bool {
        self.grid().matrices_assembled
    }

    fn assemble_matrices(&mut self) -> Result<(), Error> {
        self.assemble()?;
        self.grid_mut().matrices_assembled = true;
        Ok(())
    }

    fn sim_step(&mut self) -> Result<(), Error> {
        if !self.grid().matrices_assembled {
            return Err(Error::NotAssembled);
        }
        self.check_bounds()?;
        self.advance()?;
        self.grid_mut().step += 1;
        Ok(())
    }
}

/// Wave speed limit for explicit schemes, with a little headroom.
pub(crate) fn courant_limit(increment: f64, t_increment: f64) -> f64 {
    0.99 * increment / t_increment
}

/// Clears a radial component at the axis of an axisymmetric grid.
pub(crate) fn clear_axis(grid: &Grid, values: &mut Array1<f64>) {
    if grid.geometry() == Geometry::Axisymmetric {
        let nx = grid.x.samples;
        values.iter_mut().step_by(nx.max(1)).for_each(|v| *v = 0.0);
    }
}
