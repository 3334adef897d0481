//! Material parameters and their assignment to regions of a field.

use std::fmt::Debug;

use crate::grid::Region;

/// Value of a material parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ParameterValue<'a> {
    /// Broadcast to every point of a region.
    Scalar(f64),
    /// One value per region index, in region order.
    Values(&'a [f64]),
}

/// Exposes the physical parameters of a material by name.
pub trait Material: Debug + Send + Sync {
    /// Returns the value of `name`, or `None` if this material does not define it.
    fn parameter(&self, name: &str) -> Option<ParameterValue<'_>>;
}

/// Specifies material(s) for a given region. Later materials override earlier ones.
#[derive(Debug)]
pub struct MaterialRegion {
    region: Region,
    materials: Vec<Box<dyn Material>>,
}

impl MaterialRegion {
    pub fn new<M: Material + 'static>(region: Region, material: M) -> Self {
        Self {
            region,
            materials: vec![Box::new(material)],
        }
    }

    #[inline]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[inline]
    pub fn materials(&self) -> &[Box<dyn Material>] {
        &self.materials
    }

    /// Layers another material on top of the existing ones.
    pub fn add_material<M: Material + 'static>(&mut self, material: M) {
        self.materials.push(Box::new(material));
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Stored {
    Scalar(f64),
    Values(Vec<f64>),
}

/// Material with freely named parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomMaterial {
    parameters: Vec<(String, Stored)>,
}

impl CustomMaterial {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name.into(), Stored::Scalar(value));
        self
    }

    /// Adds a parameter with one value per index of the region the material is assigned to.
    pub fn with_values(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name.into(), Stored::Values(values));
        self
    }

    fn insert(&mut self, name: String, value: Stored) {
        match self.parameters.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.parameters.push((name, value)),
        }
    }
}

impl Material for CustomMaterial {
    fn parameter(&self, name: &str) -> Option<ParameterValue<'_>> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| match value {
                Stored::Scalar(v) => ParameterValue::Scalar(*v),
                Stored::Values(v) => ParameterValue::Values(v),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_material_lookup() {
        let material = CustomMaterial::new()
            .with_scalar("density", 1.2)
            .with_scalar("density", 1.3)
            .with_values("permittivity_x", vec![1.0, 2.0]);

        assert_eq!(material.parameter("density"), Some(ParameterValue::Scalar(1.3)));
        assert_eq!(
            material.parameter("permittivity_x"),
            Some(ParameterValue::Values(&[1.0, 2.0]))
        );
        assert_eq!(material.parameter("viscosity"), None);
    }

    #[test]
    fn materials_are_layered_in_order() {
        let mut material_region = MaterialRegion::new(
            Region::from_indices(vec![0, 1], "layered"),
            CustomMaterial::new().with_scalar("density", 1.0),
        );
        material_region.add_material(CustomMaterial::new().with_scalar("density", 2.0));

        let densities: Vec<_> = material_region
            .materials()
            .iter()
            .filter_map(|m| m.parameter("density"))
            .collect();
        assert_eq!(
            densities,
            vec![ParameterValue::Scalar(1.0), ParameterValue::Scalar(2.0)]
        );
    }
}
