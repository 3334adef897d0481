//! Spatial and temporal discretization shared by all field models.

mod operators;
mod regions;

pub use operators::{Operator, Variant};
pub use regions::{Region, Shape};

use ndarray::Array1;

use crate::material::{Material, MaterialRegion, ParameterValue};
use crate::Error;

/// Represents a space or time axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    /// The number of samples along the axis.
    pub samples: usize,
    /// The spacing between two samples.
    pub increment: f64,
    /// The tolerance within which a coordinate snaps onto a sample.
    pub snap_radius: f64,
}

impl Dimension {
    #[inline]
    pub fn new(samples: usize, increment: f64) -> Self {
        Self {
            samples,
            increment,
            snap_radius: f64::EPSILON * 10.0,
        }
    }

    /// Returns the axis as a vector.
    pub fn vector(&self) -> Array1<f64> {
        Array1::from_iter((0..self.samples).map(|i| self.value(i)))
    }

    /// The coordinate of the sample at `index`.
    #[inline]
    pub fn value(&self, index: usize) -> f64 {
        index as f64 * self.increment
    }

    /// The coordinate of the last sample.
    #[inline]
    pub fn max(&self) -> f64 {
        self.value(self.samples.saturating_sub(1))
    }

    /// Returns the index of the only sample within the snap radius of `value`.
    pub fn get_index(&self, value: f64) -> Result<usize, Error> {
        let mut found = None;
        for index in 0..self.samples {
            if (self.value(index) - value).abs() <= self.snap_radius {
                if found.is_some() {
                    return Err(Error::MultiplePointsFound(value));
                }
                found = Some(index);
            }
        }

        found.ok_or(Error::NoPointFound(value))
    }
}

/// How the grid is embedded in physical space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Geometry {
    /// Plain cartesian axes.
    #[default]
    Cartesian,
    /// Rotational symmetry around the y axis, x being the radius. Grid points sit half an
    /// increment off the axis, so the radius of column `ix` is `(ix + 0.5) * x.increment`.
    Axisymmetric,
}

/// Describes a one-dimensional field.
pub struct Field1DDescriptor<M: Material> {
    pub x_samples: usize,
    pub x_delta: f64,
    pub t_samples: usize,
    pub t_delta: f64,
    /// Main material, assigned to the whole field.
    pub material: M,
}

/// Describes a two-dimensional field.
pub struct Field2DDescriptor<M: Material> {
    pub x_samples: usize,
    pub x_delta: f64,
    pub y_samples: usize,
    pub y_delta: f64,
    pub t_samples: usize,
    pub t_delta: f64,
    /// Main material, assigned to the whole field.
    pub material: M,
}

/// Pointwise multiplier applied on top of the declared material of one parameter.
#[derive(Clone, Debug)]
struct MaterialOverride {
    parameter: String,
    factors: Array1<f64>,
}

/// The discretized domain of a field: its axes, materials and stepping state.
///
/// Points of a 2D grid are flattened with x running fastest, i.e. the point at
/// `(ix, iy)` has the index `ix + iy * x.samples`.
#[derive(Debug)]
pub struct Grid {
    pub x: Dimension,
    pub y: Option<Dimension>,
    pub t: Dimension,
    geometry: Geometry,
    material_regions: Vec<MaterialRegion>,
    overrides: Vec<MaterialOverride>,
    pub(crate) step: usize,
    pub(crate) matrices_assembled: bool,
}

impl Grid {
    /// Creates a one-dimensional grid covered by the descriptor's main material.
    pub fn new_1d<M: Material + 'static>(desc: Field1DDescriptor<M>) -> Self {
        let x = Dimension::new(desc.x_samples, desc.x_delta);
        let main = Region::new(
            (0..x.samples).collect(),
            Shape::Line {
                start: vec![0.0],
                end: vec![x.max()],
            },
            "main",
        );

        let mut grid = Self {
            x,
            y: None,
            t: Dimension::new(desc.t_samples, desc.t_delta),
            geometry: Geometry::Cartesian,
            material_regions: Vec::new(),
            overrides: Vec::new(),
            step: 0,
            matrices_assembled: false,
        };
        grid.push_material_region(MaterialRegion::new(main, desc.material));
        grid
    }

    /// Creates a two-dimensional grid covered by the descriptor's main material.
    pub fn new_2d<M: Material + 'static>(desc: Field2DDescriptor<M>) -> Self {
        let x = Dimension::new(desc.x_samples, desc.x_delta);
        let y = Dimension::new(desc.y_samples, desc.y_delta);
        let main = Region::new(
            (0..x.samples * y.samples).collect(),
            Shape::Rect {
                origin: (0.0, 0.0),
                size: (x.max(), y.max()),
            },
            "main",
        );

        let mut grid = Self {
            x,
            y: Some(y),
            t: Dimension::new(desc.t_samples, desc.t_delta),
            geometry: Geometry::Cartesian,
            material_regions: Vec::new(),
            overrides: Vec::new(),
            step: 0,
            matrices_assembled: false,
        };
        grid.push_material_region(MaterialRegion::new(main, desc.material));
        grid
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub(crate) fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    /// Number of spatial dimensions (1 or 2).
    #[inline]
    pub fn ndim(&self) -> usize {
        if self.y.is_some() { 2 } else { 1 }
    }

    /// Returns number of points in the field.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.x.samples * self.y.as_ref().map_or(1, |y| y.samples)
    }

    /// The current simulation step.
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    #[inline]
    pub fn matrices_assembled(&self) -> bool {
        self.matrices_assembled
    }

    /// Returns the index of the point at `position` (`[x]` or `[x, y]`).
    pub fn get_index(&self, position: &[f64]) -> Result<usize, Error> {
        match (&self.y, position) {
            (None, &[x]) => self.x.get_index(x),
            (Some(y_dim), &[x, y]) => {
                Ok(self.x.get_index(x)? + y_dim.get_index(y)? * self.x.samples)
            }
            _ => Err(Error::BadDimensionality {
                expected: self.ndim(),
                found: position.len(),
            }),
        }
    }

    /// Returns the position (`[x]` or `[x, y]`) of the point at `index`.
    pub fn get_position(&self, index: usize) -> Vec<f64> {
        match &self.y {
            None => vec![self.x.value(index)],
            Some(y) => vec![
                self.x.value(index % self.x.samples),
                y.value(index / self.x.samples),
            ],
        }
    }

    /// Radius of every point on an axisymmetric grid.
    pub fn radii(&self) -> Option<Array1<f64>> {
        match self.geometry {
            Geometry::Cartesian => None,
            Geometry::Axisymmetric => {
                let nx = self.x.samples;
                let dx = self.x.increment;
                Some(Array1::from_iter(
                    (0..self.num_points()).map(|i| ((i % nx) as f64 + 0.5) * dx),
                ))
            }
        }
    }

    pub fn material_regions(&self) -> &[MaterialRegion] {
        &self.material_regions
    }

    /// Gives access to existing regions, e.g. to layer further materials onto one of them.
    pub fn material_regions_mut(&mut self) -> &mut [MaterialRegion] {
        &mut self.material_regions
    }

    /// Adds a material region to the field. Later regions override earlier ones.
    pub fn add_material_region<M: Material + 'static>(
        &mut self,
        region: Region,
        material: M,
    ) -> Result<(), Error> {
        region.check_bounds(self.num_points())?;
        self.push_material_region(MaterialRegion::new(region, material));
        Ok(())
    }

    fn push_material_region(&mut self, material_region: MaterialRegion) {
        tracing::info!(region = %material_region.region().name(), "Material region added.");
        self.material_regions.push(material_region);
    }

    /// Multiplies the declared values of `parameter` pointwise by `factors`, replacing any
    /// earlier override of the same parameter.
    pub fn set_material_override(
        &mut self,
        parameter: &str,
        factors: Array1<f64>,
    ) -> Result<(), Error> {
        if factors.len() != self.num_points() {
            return Err(Error::BadLength {
                array_name: format!("{} override", parameter),
                input_length: factors.len(),
                expected_length: self.num_points(),
            });
        }

        match self.overrides.iter_mut().find(|o| o.parameter == parameter) {
            Some(existing) => existing.factors = factors,
            None => self.overrides.push(MaterialOverride {
                parameter: parameter.to_string(),
                factors,
            }),
        }
        Ok(())
    }

    pub fn clear_material_override(&mut self, parameter: &str) {
        self.overrides.retain(|o| o.parameter != parameter);
    }

    /// Get a vector that contains `parameter` for every point of the field, or `None` if no
    /// material of any region defines it.
    pub fn try_material_vector(&self, parameter: &str) -> Result<Option<Array1<f64>>, Error> {
        let mut found = false;
        let mut values = Array1::<f64>::zeros(self.num_points());

        for material_region in &self.material_regions {
            let indices = material_region.region().indices();
            for material in material_region.materials() {
                match material.parameter(parameter) {
                    Some(ParameterValue::Scalar(value)) => {
                        indices.iter().for_each(|&i| values[i] = value);
                        found = true;
                    }
                    Some(ParameterValue::Values(per_point)) => {
                        if per_point.len() != indices.len() {
                            return Err(Error::BadLength {
                                array_name: format!("{} parameter", parameter),
                                input_length: per_point.len(),
                                expected_length: indices.len(),
                            });
                        }
                        indices
                            .iter()
                            .zip(per_point)
                            .for_each(|(&i, &value)| values[i] = value);
                        found = true;
                    }
                    None => {}
                }
            }
        }

        if !found {
            return Ok(None);
        }

        for o in self.overrides.iter().filter(|o| o.parameter == parameter) {
            values *= &o.factors;
        }

        Ok(Some(values))
    }

    /// Get a vector that contains `parameter` for every point of the field. Undefined
    /// parameters yield zeros and a warning.
    pub fn material_vector(&self, parameter: &str) -> Result<Array1<f64>, Error> {
        match self.try_material_vector(parameter)? {
            Some(values) => Ok(values),
            None => {
                tracing::warn!(
                    parameter,
                    "Material parameter not found in set materials. Returning zeros."
                );
                Ok(Array1::zeros(self.num_points()))
            }
        }
    }
}
