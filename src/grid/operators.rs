use std::str::FromStr;

use ndarray::Array1;
use sprs::{CsMat, TriMat};

use crate::grid::{Geometry, Grid};
use crate::Error;

/// Sparse linear operator over the flattened grid.
pub type Operator = CsMat<f64>;

/// Difference quotient used for first derivatives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Forward,
    Central,
    Backward,
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Variant::Forward),
            "central" => Ok(Variant::Central),
            "backward" => Ok(Variant::Backward),
            _ => Err(Error::UnknownVariant(s.to_string())),
        }
    }
}

impl Variant {
    fn taps(self) -> &'static [(isize, f64)] {
        match self {
            Variant::Forward => &[(0, -1.0), (1, 1.0)],
            Variant::Central => &[(-1, -0.5), (1, 0.5)],
            Variant::Backward => &[(-1, -1.0), (0, 1.0)],
        }
    }
}

const SECOND_DERIVATIVE: &[(isize, f64)] = &[(-1, 1.0), (0, -2.0), (1, 1.0)];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Grid {
    /// Creates a sparse matrix computing the first derivative with respect to x, each row `i`
    /// multiplied by `factors[i]` (ones if `None`).
    pub fn d_x(&self, factors: Option<&Array1<f64>>, variant: Variant) -> Result<Operator, Error> {
        self.stencil(Axis::X, factors, variant.taps())
    }

    /// Creates a sparse matrix computing the first derivative with respect to y.
    pub fn d_y(&self, factors: Option<&Array1<f64>>, variant: Variant) -> Result<Operator, Error> {
        self.stencil(Axis::Y, factors, variant.taps())
    }

    /// Creates a sparse matrix computing the central second derivative with respect to x.
    pub fn d_x2(&self, factors: Option<&Array1<f64>>) -> Result<Operator, Error> {
        self.stencil(Axis::X, factors, SECOND_DERIVATIVE)
    }

    /// Creates a sparse matrix computing the central second derivative with respect to y.
    pub fn d_y2(&self, factors: Option<&Array1<f64>>) -> Result<Operator, Error> {
        self.stencil(Axis::Y, factors, SECOND_DERIVATIVE)
    }

    /// Diagonal matrix scaling every point by its factor.
    pub fn diag(&self, factors: &Array1<f64>) -> Result<Operator, Error> {
        self.stencil(Axis::X, Some(factors), &[(0, 1.0)])
    }

    /// Forward divergence of an x (radial) flux scaled by `factors`.
    ///
    /// On axisymmetric grids the `v_r / r` term is added, using the mean of the two fluxes
    /// adjacent to a point.
    pub fn div_x(&self, factors: &Array1<f64>) -> Result<Operator, Error> {
        let d_x = self.d_x(Some(factors), Variant::Forward)?;
        match (self.geometry, self.radii()) {
            (Geometry::Axisymmetric, Some(radii)) => {
                // (v[i] + v[i+1]) * g = d_x(g) + diag(2 g)
                let g = factors * self.x.increment / (2.0 * &radii);
                let mean = &self.d_x(Some(&g), Variant::Forward)? + &self.diag(&(2.0 * &g))?;
                Ok(&d_x + &mean)
            }
            _ => Ok(d_x),
        }
    }

    fn stencil(
        &self,
        axis: Axis,
        factors: Option<&Array1<f64>>,
        taps: &[(isize, f64)],
    ) -> Result<Operator, Error> {
        let num_points = self.num_points();
        if axis == Axis::Y && self.y.is_none() {
            return Err(Error::BadDimensionality {
                expected: 2,
                found: self.ndim(),
            });
        }
        if let Some(factors) = factors {
            if factors.len() != num_points {
                return Err(Error::BadLength {
                    array_name: "Factors".to_string(),
                    input_length: factors.len(),
                    expected_length: num_points,
                });
            }
        }

        let mut triplets = TriMat::with_capacity((num_points, num_points), num_points * taps.len());
        for row in 0..num_points {
            let factor = factors.map_or(1.0, |f| f[row]);
            for &(offset, weight) in taps {
                if let Some(col) = self.neighbour(row, axis, offset) {
                    triplets.add_triplet(row, col, weight * factor);
                }
            }
        }

        Ok(triplets.to_csr())
    }

    /// Index of the point `offset` samples away along `axis`, if it lies on the grid.
    fn neighbour(&self, index: usize, axis: Axis, offset: isize) -> Option<usize> {
        let nx = self.x.samples;
        let (position, samples, stride) = match axis {
            Axis::X => (index % nx, nx, 1),
            Axis::Y => (index / nx, self.y.as_ref()?.samples, nx),
        };

        let target = position as isize + offset;
        if target < 0 || target >= samples as isize {
            return None;
        }
        Some((index as isize + offset * stride as isize) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Field1DDescriptor, Field2DDescriptor};
    use crate::material::CustomMaterial;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    fn line(samples: usize) -> Grid {
        Grid::new_1d(Field1DDescriptor {
            x_samples: samples,
            x_delta: 1.0,
            t_samples: 1,
            t_delta: 1.0,
            material: CustomMaterial::new(),
        })
    }

    fn plane(x_samples: usize, y_samples: usize) -> Grid {
        Grid::new_2d(Field2DDescriptor {
            x_samples,
            x_delta: 1.0,
            y_samples,
            y_delta: 1.0,
            t_samples: 1,
            t_delta: 1.0,
            material: CustomMaterial::new(),
        })
    }

    #[test]
    fn variant_names() {
        assert_eq!("central".parse::<Variant>().unwrap(), Variant::Central);
        assert!(matches!(
            "sideways".parse::<Variant>(),
            Err(Error::UnknownVariant(name)) if name == "sideways"
        ));
    }

    #[test]
    fn forward_derivative_keeps_boundary_diagonal() {
        let grid = line(3);
        let d_x = grid.d_x(None, Variant::Forward).unwrap();
        assert_eq!(
            d_x.to_dense(),
            arr2(&[[-1.0, 1.0, 0.0], [0.0, -1.0, 1.0], [0.0, 0.0, -1.0]])
        );

        let derivative = &d_x * &arr1(&[1.0, 1.0, 1.0]);
        assert_eq!(derivative[0], 0.0);
        assert_eq!(derivative[1], 0.0);
        assert_eq!(derivative[2], -1.0);
    }

    #[test]
    fn backward_and_central_derivatives() {
        let grid = line(3);
        let factors = arr1(&[1.0, 2.0, 4.0]);
        let backward = grid.d_x(Some(&factors), Variant::Backward).unwrap();
        assert_eq!(
            backward.to_dense(),
            arr2(&[[1.0, 0.0, 0.0], [-2.0, 2.0, 0.0], [0.0, -4.0, 4.0]])
        );

        let central = grid.d_x(Some(&factors), Variant::Central).unwrap();
        assert_eq!(
            central.to_dense(),
            arr2(&[[0.0, 0.5, 0.0], [-1.0, 0.0, 1.0], [0.0, -2.0, 0.0]])
        );
    }

    #[test]
    fn second_derivative_of_ramp_vanishes_inside() {
        let grid = line(5);
        let ramp = arr1(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let curvature = &grid.d_x2(None).unwrap() * &ramp;
        for i in 1..4 {
            assert_abs_diff_eq!(curvature[i], 0.0);
        }
    }

    #[test]
    fn factors_scale_rows() {
        let grid = line(4);
        let factors = arr1(&[1.0, -3.0, 0.5, 2.0]);
        let values = arr1(&[1.0, 4.0, 9.0, 16.0]);

        let scaled = &grid.d_x(Some(&factors), Variant::Central).unwrap() * &values;
        let plain = &grid.d_x(None, Variant::Central).unwrap() * &values;
        assert_eq!(scaled, &plain * &factors);
    }

    #[test]
    fn x_derivative_does_not_wrap_rows() {
        let grid = plane(3, 2);
        let d_x = grid.d_x(None, Variant::Forward).unwrap().to_dense();
        // last point of the first row has no right neighbour
        assert_eq!(d_x[[2, 3]], 0.0);
        assert_eq!(d_x[[2, 2]], -1.0);
        assert_eq!(d_x[[1, 2]], 1.0);
    }

    #[test]
    fn y_derivatives_use_row_stride() {
        let grid = plane(3, 3);
        let d_y = grid.d_y(None, Variant::Forward).unwrap().to_dense();
        assert_eq!(d_y[[1, 1]], -1.0);
        assert_eq!(d_y[[1, 4]], 1.0);
        assert_eq!(d_y[[7, 7]], -1.0);
        assert_eq!(d_y.row(7).iter().filter(|&&v| v != 0.0).count(), 1);

        let d_y2 = grid.d_y2(None).unwrap().to_dense();
        assert_eq!(d_y2[[4, 1]], 1.0);
        assert_eq!(d_y2[[4, 4]], -2.0);
        assert_eq!(d_y2[[4, 7]], 1.0);
    }

    #[test]
    fn y_derivative_needs_second_dimension() {
        assert!(matches!(
            line(3).d_y(None, Variant::Forward),
            Err(Error::BadDimensionality { .. })
        ));
    }

    #[test]
    fn factor_length_is_checked() {
        let factors = arr1(&[1.0, 2.0]);
        assert!(matches!(
            line(3).d_x2(Some(&factors)),
            Err(Error::BadLength { input_length: 2, expected_length: 3, .. })
        ));
    }

    #[test]
    fn axisymmetric_divergence_adds_radial_term() {
        let mut grid = plane(2, 1);
        grid.set_geometry(Geometry::Axisymmetric);
        let div = grid.div_x(&arr1(&[1.0, 1.0])).unwrap().to_dense();
        // radius 0.5: (v1 - v0) + (v0 + v1) / (2 * 0.5)
        assert_abs_diff_eq!(div[[0, 0]], 0.0);
        assert_abs_diff_eq!(div[[0, 1]], 2.0);
        // radius 1.5, truncated right neighbour
        assert_abs_diff_eq!(div[[1, 1]], -1.0 + 1.0 / 3.0, epsilon = 1e-12);
    }
}
