use std::ops::{Deref, DerefMut};

use ndarray::s;

use crate::component::FieldComponent;
use crate::fields::acoustics::Acoustic2D;
use crate::fields::Field;
use crate::grid::{Field2DDescriptor, Grid};
use crate::material::Material;
use crate::Error;

/// How often, and in which direction, one row of the grid is advected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Shift {
    period: usize,
    downstream: bool,
}

/// Two-dimensional acoustic field in a medium moving along x.
///
/// The flow is approximated by shifting the values of every component one cell along x each
/// time the medium has travelled one space increment.
pub struct AcousticFlow2D {
    acoustic: Acoustic2D,
    flow: Vec<f64>,
    shifts: Vec<Option<Shift>>,
}

impl AcousticFlow2D {
    /// Creates a field with the flow velocity `flow` in x direction, either one value for the
    /// whole field or one value per row (`y_samples` values).
    pub fn new<M: Material + 'static>(
        desc: Field2DDescriptor<M>,
        flow: &[f64],
    ) -> Result<Self, Error> {
        let rows = desc.y_samples;
        let flow = match flow.len() {
            1 => vec![flow[0]; rows],
            len if len == rows => flow.to_vec(),
            _ => {
                return Err(Error::BadShape {
                    parameter: "Flow".to_string(),
                    expected: rows,
                })
            }
        };

        let acoustic = Acoustic2D::new(desc);
        let grid = acoustic.grid();
        let cells_per_step = grid.t.increment / grid.x.increment;
        let shifts: Vec<_> = flow
            .iter()
            .map(|&velocity| {
                if velocity == 0.0 {
                    return None;
                }
                let period = (1.0 / (velocity.abs() * cells_per_step)) as usize;
                Some(Shift {
                    period,
                    downstream: velocity > 0.0,
                })
            })
            .collect();

        if shifts.iter().flatten().any(|shift| shift.period <= 1) {
            tracing::warn!("Flow velocity may be too high. Consider reducing t_delta.");
        }
        let shifts = shifts
            .into_iter()
            .map(|shift| {
                shift.map(|mut shift| {
                    shift.period = shift.period.max(1);
                    shift
                })
            })
            .collect();

        Ok(Self {
            acoustic,
            flow,
            shifts,
        })
    }

    /// Flow velocity of every row.
    #[inline]
    pub fn flow(&self) -> &[f64] {
        &self.flow
    }

    fn apply_flow(&mut self) {
        let step = self.acoustic.grid().step;
        let nx = self.acoustic.grid().x.samples;
        let acoustic = &mut self.acoustic;

        for (row, shift) in self.shifts.iter().enumerate() {
            let Some(shift) = shift else { continue };
            if step % shift.period != 0 {
                continue;
            }
            for component in [
                &mut acoustic.pressure,
                &mut acoustic.velocity_x,
                &mut acoustic.velocity_y,
            ] {
                let mut cells = component.values.slice_mut(s![row * nx..(row + 1) * nx]);
                if shift.downstream {
                    for i in (1..nx).rev() {
                        cells[i] = cells[i - 1];
                    }
                    cells[0] = 0.0;
                } else {
                    for i in 1..nx {
                        cells[i - 1] = cells[i];
                    }
                    cells[nx - 1] = 0.0;
                }
            }
        }
    }
}

impl Deref for AcousticFlow2D {
    type Target = Acoustic2D;

    fn deref(&self) -> &Acoustic2D {
        &self.acoustic
    }
}

impl DerefMut for AcousticFlow2D {
    fn deref_mut(&mut self) -> &mut Acoustic2D {
        &mut self.acoustic
    }
}

impl Field for AcousticFlow2D {
    fn grid(&self) -> &Grid {
        self.acoustic.grid()
    }

    fn grid_mut(&mut self) -> &mut Grid {
        self.acoustic.grid_mut()
    }

    fn assemble(&mut self) -> Result<(), Error> {
        self.acoustic.assemble()
    }

    fn advance(&mut self) -> Result<(), Error> {
        self.acoustic.advance()?;
        self.apply_flow();
        Ok(())
    }

    fn is_stable(&self) -> bool {
        self.acoustic.is_stable()
    }

    fn components(&self) -> Vec<(&'static str, &FieldComponent)> {
        self.acoustic.components()
    }

    fn components_mut(&mut self) -> Vec<(&'static str, &mut FieldComponent)> {
        self.acoustic.components_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::acoustics::AcousticMaterial;
    use crate::simulation::Simulate;
    use crate::test_utils::EventCapture;

    fn descriptor() -> Field2DDescriptor<AcousticMaterial> {
        Field2DDescriptor {
            x_samples: 5,
            x_delta: 1.0,
            y_samples: 2,
            y_delta: 1.0,
            t_samples: 4,
            t_delta: 0.5,
            // without sound, only the advection moves values
            material: AcousticMaterial::new(0.0, 1.0),
        }
    }

    #[test]
    fn flow_shape_is_validated() {
        assert!(AcousticFlow2D::new(descriptor(), &[1.0]).is_ok());
        assert!(AcousticFlow2D::new(descriptor(), &[1.0, -1.0]).is_ok());
        assert!(matches!(
            AcousticFlow2D::new(descriptor(), &[1.0, 2.0, 3.0]),
            Err(Error::BadShape { expected: 2, .. })
        ));
    }

    #[test]
    fn rows_are_advected_by_their_flow() {
        // one cell every second step, downstream in row 0 and upstream in row 1
        let mut field = AcousticFlow2D::new(descriptor(), &[1.0, -1.0]).unwrap();
        field.pressure.values[2] = 1.0;
        field.pressure.values[7] = 2.0;

        field.simulate(Some(1)).unwrap();
        assert_eq!(field.pressure.values[3], 1.0);
        assert_eq!(field.pressure.values[6], 2.0);

        field.simulate(Some(1)).unwrap();
        assert_eq!(field.pressure.values[3], 1.0);

        field.simulate(Some(1)).unwrap();
        assert_eq!(field.pressure.values[4], 1.0);
        assert_eq!(field.pressure.values[5], 2.0);
        assert_eq!(field.flow(), &[1.0, -1.0]);
    }

    #[test]
    fn still_medium_is_not_shifted() {
        let mut field = AcousticFlow2D::new(descriptor(), &[0.0]).unwrap();
        field.pressure.values[2] = 1.0;
        field.simulate(Some(3)).unwrap();
        assert_eq!(field.pressure.values[2], 1.0);
    }

    #[test]
    fn fast_flow_warns() {
        // four cells per second at half a second per step shifts every step
        let capture = EventCapture::default();
        let field = capture.run(|| AcousticFlow2D::new(descriptor(), &[4.0]).unwrap());
        assert_eq!(capture.warnings().len(), 1);
        assert_eq!(field.shifts[0].map(|shift| shift.period), Some(1));

        capture.run(|| AcousticFlow2D::new(descriptor(), &[1.0]).unwrap());
        assert_eq!(capture.warnings().len(), 1);
    }
}
