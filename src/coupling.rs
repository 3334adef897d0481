//! Co-simulation of fields sharing a time axis.

mod thermo_acoustic;

pub use thermo_acoustic::{thermo_acoustic_1d, AcousticLoss, ThermoAcoustic1DDescriptor};

use ndarray::Array1;

use crate::component::FieldComponent;
use crate::fields::Field;
use crate::grid::{Dimension, Grid};
use crate::material::MaterialRegion;
use crate::simulation::Simulate;
use crate::Error;

/// Maps the values of a source component to a contribution for a target.
pub type TransferFunction = Box<dyn Fn(&Array1<f64>) -> Array1<f64> + Send>;

/// Couples fields inside a [`SynchronizedFields`] group. Applied once per step, after all
/// fields have stepped.
pub trait Interaction: Send {
    fn apply(&mut self, step: usize, fields: &mut [Box<dyn Field>]) -> Result<(), Error>;
}

/// Index of the field owning the component `name`.
fn locate(fields: &[Box<dyn Field>], name: &str) -> Result<usize, Error> {
    fields
        .iter()
        .position(|field| field.component(name).is_some())
        .ok_or_else(|| Error::UnknownComponent(name.to_string()))
}

/// Fields with the same spatial and temporal resolution that are stepped together.
pub struct SynchronizedFields {
    fields: Vec<Box<dyn Field>>,
    interactions: Vec<Box<dyn Interaction>>,
    /// Component name and the index of the owning field.
    component_index: Vec<(&'static str, usize)>,
}

impl SynchronizedFields {
    pub fn new(
        fields: Vec<Box<dyn Field>>,
        interactions: Vec<Box<dyn Interaction>>,
    ) -> Result<Self, Error> {
        let first = fields.first().ok_or(Error::NoFields)?.grid();
        for field in &fields[1..] {
            let grid = field.grid();
            if grid.t != first.t {
                return Err(Error::MismatchedGrid("t"));
            }
            if grid.x != first.x {
                return Err(Error::MismatchedGrid("x"));
            }
            if grid.y != first.y {
                return Err(Error::MismatchedGrid("y"));
            }
        }

        let mut component_index: Vec<(&'static str, usize)> = Vec::new();
        for (index, field) in fields.iter().enumerate() {
            for (name, _) in field.components() {
                if component_index.iter().any(|&(existing, _)| existing == name) {
                    return Err(Error::DuplicateComponent(name.to_string()));
                }
                component_index.push((name, index));
            }
        }

        Ok(Self {
            fields,
            interactions,
            component_index,
        })
    }

    pub fn add_interaction<I: Interaction + 'static>(&mut self, interaction: I) {
        self.interactions.push(Box::new(interaction));
    }

    #[inline]
    pub fn fields(&self) -> &[Box<dyn Field>] {
        &self.fields
    }

    /// Access to a member field, e.g. to add material regions to it.
    pub fn field_mut(&mut self, index: usize) -> Result<&mut dyn Field, Error> {
        match self.fields.get_mut(index) {
            Some(field) => Ok(field.as_mut()),
            None => Err(Error::UnknownField(index)),
        }
    }

    /// The grid of the first field, e.g. to build regions.
    pub fn grid(&self) -> &Grid {
        self.fields[0].grid()
    }

    #[inline]
    pub fn x(&self) -> &Dimension {
        &self.grid().x
    }

    #[inline]
    pub fn y(&self) -> Option<&Dimension> {
        self.grid().y.as_ref()
    }

    #[inline]
    pub fn num_points(&self) -> usize {
        self.grid().num_points()
    }

    /// Material regions of all fields. To add new regions, modify the individual fields.
    pub fn material_regions(&self) -> Vec<&MaterialRegion> {
        self.fields
            .iter()
            .flat_map(|field| field.grid().material_regions())
            .collect()
    }

    /// Named components of all fields.
    pub fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        self.component_index
            .iter()
            .filter_map(|&(name, index)| Some((name, self.fields[index].component(name)?)))
            .collect()
    }

    pub fn component(&self, name: &str) -> Option<&FieldComponent> {
        let &(_, index) = self.component_index.iter().find(|(n, _)| *n == name)?;
        self.fields[index].component(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut FieldComponent> {
        let &(_, index) = self.component_index.iter().find(|(n, _)| *n == name)?;
        self.fields[index].component_mut(name)
    }

    /// Whether all fields satisfy their stability conditions.
    pub fn is_stable(&self) -> bool {
        self.fields.iter().all(|field| field.is_stable())
    }
}

impl Simulate for SynchronizedFields {
    fn t(&self) -> &Dimension {
        &self.grid().t
    }

    fn step(&self) -> usize {
        self.fields[0].grid().step()
    }

    /// Keeps all fields on the same step.
    fn set_step(&mut self, step: usize) {
        for field in &mut self.fields {
            field.set_step(step);
        }
    }

    fn matrices_assembled(&self) -> bool {
        self.fields.iter().all(|field| field.matrices_assembled())
    }

    fn assemble_matrices(&mut self) -> Result<(), Error> {
        for field in &mut self.fields {
            field.assemble_matrices()?;
        }
        Ok(())
    }

    fn sim_step(&mut self) -> Result<(), Error> {
        for field in &self.fields {
            field.check_bounds()?;
        }

        let previous = self.step();
        for index in 0..self.fields.len() {
            if let Err(err) = self.fields[index].sim_step() {
                // keep all members on the same step
                for field in &mut self.fields[..index] {
                    field.set_step(previous);
                }
                return Err(err);
            }
        }

        let step = self.step();
        for interaction in &mut self.interactions {
            interaction.apply(step, &mut self.fields)?;
        }
        Ok(())
    }
}

/// Describes a [`BoundaryCoupling`].
pub struct BoundaryCouplingDescriptor {
    /// Name of the component the values are read from.
    pub source: &'static str,
    /// Name of the component the contribution is written to.
    pub target: &'static str,
    pub transfer_function: TransferFunction,
    /// Add to the target instead of replacing its values.
    pub additive: bool,
    /// Sum up the contributions of the steps in between two applications.
    pub accumulate: bool,
    /// Apply only every nth step.
    pub stepping: usize,
}

/// Transfers the values of one component into another component.
pub struct BoundaryCoupling {
    source: &'static str,
    target: &'static str,
    transfer: TransferFunction,
    additive: bool,
    accumulate: bool,
    stepping: usize,
    accumulator: Array1<f64>,
}

impl BoundaryCoupling {
    pub fn new(desc: BoundaryCouplingDescriptor) -> Result<Self, Error> {
        if desc.stepping == 0 {
            return Err(Error::ZeroStepping);
        }
        Ok(Self {
            source: desc.source,
            target: desc.target,
            transfer: desc.transfer_function,
            additive: desc.additive,
            accumulate: desc.accumulate,
            stepping: desc.stepping,
            accumulator: Array1::zeros(0),
        })
    }

    /// The contribution to write for `step`, if any.
    fn contribution(&mut self, step: usize, source: &Array1<f64>) -> Option<Array1<f64>> {
        let due = step % self.stepping == 0;
        if !self.accumulate {
            return due.then(|| (self.transfer)(source));
        }

        let transferred = (self.transfer)(source);
        if self.accumulator.len() != transferred.len() {
            self.accumulator = Array1::zeros(transferred.len());
        }
        self.accumulator += &transferred;
        due.then(|| {
            let len = self.accumulator.len();
            std::mem::replace(&mut self.accumulator, Array1::zeros(len))
        })
    }

    fn deliver(&self, target: &mut FieldComponent, contribution: Array1<f64>) -> Result<(), Error> {
        if contribution.len() != target.num_points() {
            return Err(Error::BadLength {
                array_name: format!("{} contribution", self.target),
                input_length: contribution.len(),
                expected_length: target.num_points(),
            });
        }
        if self.additive {
            target.values += &contribution;
        } else {
            target.values = contribution;
        }
        Ok(())
    }

    /// Applies the coupling to explicitly given components.
    pub fn apply_to(
        &mut self,
        step: usize,
        source: &FieldComponent,
        target: &mut FieldComponent,
    ) -> Result<(), Error> {
        match self.contribution(step, &source.values) {
            Some(contribution) => self.deliver(target, contribution),
            None => Ok(()),
        }
    }
}

impl Interaction for BoundaryCoupling {
    fn apply(&mut self, step: usize, fields: &mut [Box<dyn Field>]) -> Result<(), Error> {
        let source_field = locate(fields, self.source)?;
        let target_field = locate(fields, self.target)?;

        let source = fields[source_field]
            .component(self.source)
            .ok_or_else(|| Error::UnknownComponent(self.source.to_string()))?;
        let Some(contribution) = self.contribution(step, &source.values) else {
            return Ok(());
        };

        let target = fields[target_field]
            .component_mut(self.target)
            .ok_or_else(|| Error::UnknownComponent(self.target.to_string()))?;
        self.deliver(target, contribution)
    }
}

/// Describes a [`MaterialCoupling`].
pub struct MaterialCouplingDescriptor {
    /// Name of the component the values are read from.
    pub source: &'static str,
    /// Index of the field whose material is modulated.
    pub target_field: usize,
    /// The modulated material parameter.
    pub parameter: &'static str,
    /// Maps the source values to pointwise factors for the parameter.
    pub transfer_function: TransferFunction,
    /// Apply only every nth step.
    pub stepping: usize,
    /// Reassemble only if the factors changed by more than this, relative to the factors of
    /// the last reassembly.
    pub rel_change_threshold: Option<f64>,
}

/// Modulates a material parameter of a field by the values of a component.
///
/// The declared material values are multiplied by the transferred factors through a material
/// override on the target grid, after which the target is reassembled.
pub struct MaterialCoupling {
    source: &'static str,
    target_field: usize,
    parameter: &'static str,
    transfer: TransferFunction,
    stepping: usize,
    rel_change_threshold: Option<f64>,
    reference: Option<Array1<f64>>,
}

impl MaterialCoupling {
    pub fn new(desc: MaterialCouplingDescriptor) -> Result<Self, Error> {
        if desc.stepping == 0 {
            return Err(Error::ZeroStepping);
        }
        Ok(Self {
            source: desc.source,
            target_field: desc.target_field,
            parameter: desc.parameter,
            transfer: desc.transfer_function,
            stepping: desc.stepping,
            rel_change_threshold: desc.rel_change_threshold,
            reference: None,
        })
    }

    /// Factors of the last reassembly.
    #[inline]
    pub fn reference_factors(&self) -> Option<&Array1<f64>> {
        self.reference.as_ref()
    }

    /// Applies the coupling to an explicitly given target. Returns whether the target was
    /// reassembled.
    pub fn apply_to(
        &mut self,
        step: usize,
        source: &Array1<f64>,
        target: &mut dyn Field,
    ) -> Result<bool, Error> {
        if step % self.stepping != 0 {
            return Ok(false);
        }

        let factors = (self.transfer)(source);
        if let (Some(threshold), Some(reference)) = (self.rel_change_threshold, &self.reference) {
            if relative_change(&factors, reference) <= threshold {
                return Ok(false);
            }
        }

        target
            .grid_mut()
            .set_material_override(self.parameter, factors.clone())?;
        target.assemble_matrices()?;
        tracing::debug!(parameter = self.parameter, step, "Material coupling reassembled.");
        self.reference = Some(factors);
        Ok(true)
    }
}

impl Interaction for MaterialCoupling {
    fn apply(&mut self, step: usize, fields: &mut [Box<dyn Field>]) -> Result<(), Error> {
        if step % self.stepping != 0 {
            return Ok(());
        }
        let source_field = locate(fields, self.source)?;
        let source = fields[source_field]
            .component(self.source)
            .map(|component| component.values.clone())
            .ok_or_else(|| Error::UnknownComponent(self.source.to_string()))?;

        let target = fields
            .get_mut(self.target_field)
            .ok_or(Error::UnknownField(self.target_field))?;
        self.apply_to(step, &source, target.as_mut())?;
        Ok(())
    }
}

/// Largest relative change `|(new - last) / new|`. A factor dropping to zero counts as an
/// infinite change, a factor staying zero as none.
fn relative_change(new: &Array1<f64>, last: &Array1<f64>) -> f64 {
    new.iter()
        .zip(last.iter())
        .map(|(&new, &last)| match (new == 0.0, last == 0.0) {
            (true, true) => 0.0,
            (true, false) => f64::INFINITY,
            _ => ((new - last) / new).abs(),
        })
        .fold(0.0, f64::max)
}
