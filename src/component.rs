//! Field components together with the boundaries and outputs attached to them.

use ndarray::{Array1, Array2, ArrayView1};

use crate::grid::Region;
use crate::Error;

/// Value a boundary writes into its region.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryValue {
    /// The same constant for every point and step.
    Scalar(f64),
    /// One constant per region index.
    PerPoint(Vec<f64>),
    /// One value per step, shared by every point.
    Signal(Vec<f64>),
    /// One signal per region index.
    PerPointSignal(Vec<Vec<f64>>),
}

impl From<f64> for BoundaryValue {
    fn from(value: f64) -> Self {
        BoundaryValue::Scalar(value)
    }
}

/// Specifies values written to a field component on every simulation step, like excitation
/// signals and fixed boundaries.
#[derive(Clone, Debug)]
pub struct Boundary {
    region: Region,
    value: BoundaryValue,
    additive: bool,
}

impl Boundary {
    pub fn new(
        region: Region,
        value: impl Into<BoundaryValue>,
        additive: bool,
    ) -> Result<Self, Error> {
        let value = value.into();
        let per_point = match &value {
            BoundaryValue::PerPoint(values) => Some(values.len()),
            BoundaryValue::PerPointSignal(signals) => Some(signals.len()),
            _ => None,
        };
        if let Some(input_length) = per_point {
            if input_length != region.len() {
                return Err(Error::BadLength {
                    array_name: format!("Boundary {}", region.name()),
                    input_length,
                    expected_length: region.len(),
                });
            }
        }

        Ok(Self {
            region,
            value,
            additive,
        })
    }

    #[inline]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[inline]
    pub fn value(&self) -> &BoundaryValue {
        &self.value
    }

    #[inline]
    pub fn additive(&self) -> bool {
        self.additive
    }

    /// The value for the `n`-th index of the region at `step`.
    pub fn value_at(&self, n: usize, step: usize) -> Result<f64, Error> {
        let signal = match &self.value {
            BoundaryValue::Scalar(value) => return Ok(*value),
            BoundaryValue::PerPoint(values) => return Ok(values[n]),
            BoundaryValue::Signal(signal) => signal,
            BoundaryValue::PerPointSignal(signals) => &signals[n],
        };

        signal.get(step).copied().ok_or_else(|| Error::SignalExhausted {
            region: self.region.name().to_string(),
            step,
            length: signal.len(),
        })
    }

    /// Checks that the boundary has a value for every index at `step`.
    pub fn check(&self, step: usize) -> Result<(), Error> {
        let shortest = match &self.value {
            BoundaryValue::Scalar(_) | BoundaryValue::PerPoint(_) => return Ok(()),
            BoundaryValue::Signal(signal) => signal.len(),
            BoundaryValue::PerPointSignal(signals) => {
                signals.iter().map(Vec::len).min().unwrap_or(usize::MAX)
            }
        };
        if step < shortest {
            Ok(())
        } else {
            Err(Error::SignalExhausted {
                region: self.region.name().to_string(),
                step,
                length: shortest,
            })
        }
    }

    /// Writes this boundary's values for `step` into `values`.
    ///
    /// All new values are computed from the old state first, so an index listed twice in the
    /// region is only written once.
    pub fn apply(&self, values: &mut Array1<f64>, step: usize) -> Result<(), Error> {
        let indices = self.region.indices();
        let mut updated = Vec::with_capacity(indices.len());
        for (n, &index) in indices.iter().enumerate() {
            let value = self.value_at(n, step)?;
            updated.push(if self.additive { values[index] + value } else { value });
        }

        indices
            .iter()
            .zip(updated)
            .for_each(|(&index, value)| values[index] = value);
        Ok(())
    }
}

/// Records the values of a region on every simulation step.
#[derive(Clone, Debug)]
pub struct Output {
    region: Region,
    signals: Vec<Vec<f64>>,
}

impl Output {
    #[inline]
    pub fn new(region: Region) -> Self {
        Self {
            region,
            signals: Vec::new(),
        }
    }

    #[inline]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// One time series per region index.
    #[inline]
    pub fn signals(&self) -> &[Vec<f64>] {
        &self.signals
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.signals.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the current values of the region.
    pub fn write(&mut self, values: ArrayView1<f64>) {
        let indices = self.region.indices();
        if self.signals.is_empty() {
            self.signals = indices.iter().map(|&i| vec![values[i]]).collect();
        } else {
            self.signals
                .iter_mut()
                .zip(indices)
                .for_each(|(signal, &i)| signal.push(values[i]));
        }
    }

    /// Mean over all region indices for every recorded step.
    pub fn mean_signal(&self) -> Array1<f64> {
        let mut mean = Array1::<f64>::zeros(self.len());
        if self.signals.is_empty() {
            return mean;
        }
        for signal in &self.signals {
            mean += &ArrayView1::from(signal.as_slice());
        }
        mean / self.signals.len() as f64
    }

    /// The signals as a `(region indices, steps)` array.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.signals.len(), self.len()), |(i, step)| {
            self.signals[i][step]
        })
    }
}

/// A single scalar quantity of a field (e.g. pressure) at every grid point.
#[derive(Clone, Debug)]
pub struct FieldComponent {
    /// The values of the component, one per grid point.
    pub values: Array1<f64>,
    boundaries: Vec<Boundary>,
    outputs: Vec<Output>,
}

impl FieldComponent {
    #[inline]
    pub fn new(num_points: usize) -> Self {
        Self {
            values: Array1::zeros(num_points),
            boundaries: Vec::new(),
            outputs: Vec::new(),
        }
    }

    #[inline]
    pub fn num_points(&self) -> usize {
        self.values.len()
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Adds a boundary to the field component.
    pub fn add_boundary(
        &mut self,
        region: Region,
        value: impl Into<BoundaryValue>,
        additive: bool,
    ) -> Result<(), Error> {
        region.check_bounds(self.num_points())?;
        let boundary = Boundary::new(region, value, additive)?;
        tracing::info!(region = %boundary.region().name(), "Boundary added.");
        self.boundaries.push(boundary);
        Ok(())
    }

    /// Adds an output to the field component and returns its position in `outputs()`.
    pub fn add_output(&mut self, region: Region) -> Result<usize, Error> {
        region.check_bounds(self.num_points())?;
        tracing::info!(region = %region.name(), "Output region added.");
        self.outputs.push(Output::new(region));
        Ok(self.outputs.len() - 1)
    }

    /// Checks that every boundary can be applied at `step`, without touching any values.
    pub fn check_bounds(&self, step: usize) -> Result<(), Error> {
        self.boundaries
            .iter()
            .try_for_each(|boundary| boundary.check(step))
    }

    /// Applies the boundary conditions for `step`, in the order they were added.
    pub fn apply_bounds(&mut self, step: usize) -> Result<(), Error> {
        for boundary in &self.boundaries {
            boundary.apply(&mut self.values, step)?;
        }
        Ok(())
    }

    /// Writes the current values of the field component to the outputs.
    pub fn write_outputs(&mut self) {
        for output in &mut self.outputs {
            output.write(self.values.view());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn replacing_boundary_pins_values() {
        let mut component = FieldComponent::new(5);
        component
            .add_boundary(Region::from_indices(vec![1, 3], "pin"), 2.5, false)
            .unwrap();

        for step in 0..4 {
            component.values.fill(step as f64 * 10.0);
            component.apply_bounds(step).unwrap();
            assert_eq!(component.values[1], 2.5);
            assert_eq!(component.values[3], 2.5);
            assert_eq!(component.values[0], step as f64 * 10.0);
        }
    }

    #[test]
    fn additive_signal_boundary() {
        let mut component = FieldComponent::new(3);
        component.values.fill(1.0);
        component
            .add_boundary(
                Region::from_indices(vec![0, 2], "source"),
                BoundaryValue::Signal(vec![0.5, -1.0]),
                true,
            )
            .unwrap();

        component.apply_bounds(0).unwrap();
        component.apply_bounds(1).unwrap();
        assert_eq!(component.values.to_vec(), vec![0.5, 1.0, 0.5]);

        assert!(matches!(
            component.apply_bounds(2),
            Err(Error::SignalExhausted { step: 2, length: 2, .. })
        ));
    }

    #[test]
    fn exhausted_signal_is_detected_before_writing() {
        let mut component = FieldComponent::new(3);
        component
            .add_boundary(
                Region::from_indices(vec![0, 1], "source"),
                BoundaryValue::PerPointSignal(vec![vec![1.0, 2.0, 3.0], vec![1.0]]),
                false,
            )
            .unwrap();

        assert!(component.check_bounds(0).is_ok());
        assert!(matches!(
            component.check_bounds(1),
            Err(Error::SignalExhausted { step: 1, length: 1, .. })
        ));
        assert!(component.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn per_point_values_follow_region_order() {
        let mut component = FieldComponent::new(4);
        component
            .add_boundary(
                Region::from_indices(vec![3, 0], "edges"),
                BoundaryValue::PerPointSignal(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
                false,
            )
            .unwrap();
        component.apply_bounds(1).unwrap();
        assert_eq!(component.values.to_vec(), vec![4.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn duplicate_indices_are_written_once() {
        let mut component = FieldComponent::new(2);
        component
            .add_boundary(Region::from_indices(vec![1, 1], "twice"), 1.0, true)
            .unwrap();
        component.apply_bounds(0).unwrap();
        assert_eq!(component.values[1], 1.0);
    }

    #[test]
    fn boundary_shape_is_validated() {
        let mut component = FieldComponent::new(4);
        let result = component.add_boundary(
            Region::from_indices(vec![0, 1], "edges"),
            BoundaryValue::PerPoint(vec![1.0, 2.0, 3.0]),
            false,
        );
        assert!(matches!(
            result,
            Err(Error::BadLength { input_length: 3, expected_length: 2, .. })
        ));

        let outside = component.add_output(Region::from_indices(vec![4], "outside"));
        assert!(matches!(outside, Err(Error::RegionOutOfGrid { .. })));
    }

    #[test]
    fn outputs_accumulate_and_average() {
        let mut component = FieldComponent::new(4);
        let sensor = component
            .add_output(Region::from_indices(vec![0, 1, 2], "sensor"))
            .unwrap();

        for step in 0..3 {
            component.values = Array1::from_iter((0..4).map(|i| (i * step) as f64));
            component.write_outputs();
        }

        let output = &component.outputs()[sensor];
        assert_eq!(output.len(), 3);
        assert!(output.signals().iter().all(|s| s.len() == 3));
        assert_eq!(output.signals()[2], vec![0.0, 2.0, 4.0]);

        let mean = output.mean_signal();
        assert_abs_diff_eq!(mean[0], 0.0);
        assert_abs_diff_eq!(mean[1], 1.0);
        assert_abs_diff_eq!(mean[2], 2.0);
        assert_eq!(output.to_array().shape(), &[3, 3]);
    }

    #[test]
    fn mean_of_empty_output() {
        let output = Output::new(Region::from_indices(vec![0, 1], "sensor"));
        assert!(output.is_empty());
        assert_eq!(output.mean_signal().len(), 0);
    }
}
