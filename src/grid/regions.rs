use crate::grid::Grid;
use crate::Error;

/// Geometric description a region was built from.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Explicitly listed indices.
    Indices,
    Point(Vec<f64>),
    Line {
        start: Vec<f64>,
        end: Vec<f64>,
    },
    Rect {
        origin: (f64, f64),
        size: (f64, f64),
    },
    /// Corners in clockwise order.
    Tri([(f64, f64); 3]),
    Ellipse {
        center: (f64, f64),
        radii: (f64, f64),
    },
}

/// Named set of grid point indices that boundaries, outputs and materials are applied to.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    indices: Vec<usize>,
    name: String,
    shape: Shape,
}

impl Region {
    #[inline]
    pub fn new(indices: Vec<usize>, shape: Shape, name: impl Into<String>) -> Self {
        Self {
            indices,
            name: name.into(),
            shape,
        }
    }

    /// Creates a region from explicitly listed indices.
    #[inline]
    pub fn from_indices(indices: Vec<usize>, name: impl Into<String>) -> Self {
        Self::new(indices, Shape::Indices, name)
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub(crate) fn check_bounds(&self, num_points: usize) -> Result<(), Error> {
        match self.indices.iter().find(|&&i| i >= num_points) {
            Some(&index) => Err(Error::RegionOutOfGrid {
                region: self.name.clone(),
                index,
                num_points,
            }),
            None => Ok(()),
        }
    }
}

impl Grid {
    fn require_2d(&self) -> Result<(), Error> {
        match self.y {
            Some(_) => Ok(()),
            None => Err(Error::BadDimensionality {
                expected: 2,
                found: 1,
            }),
        }
    }

    /// Creates a point region at the given position.
    pub fn get_point_region(
        &self,
        position: &[f64],
        name: impl Into<String>,
    ) -> Result<Region, Error> {
        Ok(Region::new(
            vec![self.get_index(position)?],
            Shape::Point(position.to_vec()),
            name,
        ))
    }

    /// Creates a line region from `start` to `end`, both inclusive.
    ///
    /// On 2D grids the line is walked along its dominant axis, one point per sample.
    pub fn get_line_region(
        &self,
        start: &[f64],
        end: &[f64],
        name: impl Into<String>,
    ) -> Result<Region, Error> {
        let start_idx = self.get_index(start)?;
        let end_idx = self.get_index(end)?;

        let indices = match self.y {
            None if start_idx <= end_idx => (start_idx..=end_idx).collect(),
            None => (end_idx..=start_idx).rev().collect(),
            Some(_) => {
                let nx = self.x.samples as i64;
                let (start_x, start_y) = (start_idx as i64 % nx, start_idx as i64 / nx);
                let x_diff = start_x - end_idx as i64 % nx;
                let y_diff = start_y - end_idx as i64 / nx;
                let num_points = x_diff.abs().max(y_diff.abs());

                (0..=num_points)
                    .map(|ii| {
                        let ratio = if num_points == 0 {
                            0.0
                        } else {
                            ii as f64 / num_points as f64
                        };
                        let x = start_x - (ratio * x_diff as f64).round_ties_even() as i64;
                        let y = start_y - (ratio * y_diff as f64).round_ties_even() as i64;
                        (x + nx * y) as usize
                    })
                    .collect()
            }
        };

        Ok(Region::new(
            indices,
            Shape::Line {
                start: start.to_vec(),
                end: end.to_vec(),
            },
            name,
        ))
    }

    /// Creates a rectangular region spanning `origin` to `origin + size`, both corners
    /// inclusive. Negative sizes are allowed. Indices run through every column from the
    /// lowest x upwards, each column from the lowest y upwards.
    pub fn get_rect_region(
        &self,
        origin: (f64, f64),
        size: (f64, f64),
        name: impl Into<String>,
    ) -> Result<Region, Error> {
        self.require_2d()?;
        let corner_a = self.get_index(&[origin.0, origin.1])?;
        let corner_b = self.get_index(&[origin.0 + size.0, origin.1 + size.1])?;

        let nx = self.x.samples;
        let (ax, ay) = (corner_a % nx, corner_a / nx);
        let (bx, by) = (corner_b % nx, corner_b / nx);
        let (x_start, x_end) = (ax.min(bx), ax.max(bx));
        let (y_start, y_end) = (ay.min(by), ay.max(by));

        // x outer, y inner
        let indices = (x_start..=x_end)
            .flat_map(|x| (y_start..=y_end).map(move |y| x + y * nx))
            .collect();

        Ok(Region::new(indices, Shape::Rect { origin, size }, name))
    }

    /// Creates a triangular region with the given corners, edges inclusive.
    pub fn get_tri_region(
        &self,
        corners: [(f64, f64); 3],
        name: impl Into<String>,
    ) -> Result<Region, Error> {
        self.require_2d()?;
        let [p0, mut p1, mut p2] = corners;

        // clockwise order via partial cross product
        if (p1.0 - p0.0) * (p2.1 - p0.1) - (p1.1 - p0.1) * (p2.0 - p0.0) > 0.0 {
            std::mem::swap(&mut p1, &mut p2);
        }

        // >= 0 if `p` lies left of or on the edge from `a` to `b`
        let edge = |a: (f64, f64), b: (f64, f64), p: (f64, f64)| {
            (p.0 - a.0) * (b.1 - a.1) - (p.1 - a.1) * (b.0 - a.0)
        };

        let corner_indices = [
            self.get_index(&[p0.0, p0.1])?,
            self.get_index(&[p1.0, p1.1])?,
            self.get_index(&[p2.0, p2.1])?,
        ];
        let first = corner_indices.iter().copied().min().unwrap_or(0);
        let last = corner_indices.iter().copied().max().unwrap_or(0);

        let indices = (first..=last)
            .filter(|&ii| {
                let position = self.get_position(ii);
                let p = (position[0], position[1]);
                edge(p0, p1, p) >= 0.0 && edge(p1, p2, p) >= 0.0 && edge(p2, p0, p) >= 0.0
            })
            .collect();

        Ok(Region::new(indices, Shape::Tri([p0, p1, p2]), name))
    }

    /// Creates a region of all points inside or on an axis-aligned ellipse.
    pub fn get_ellipse_region(
        &self,
        center: (f64, f64),
        radii: (f64, f64),
        name: impl Into<String>,
    ) -> Result<Region, Error> {
        self.require_2d()?;

        let indices = (0..self.num_points())
            .filter(|&ii| {
                let position = self.get_position(ii);
                let u = (position[0] - center.0) / radii.0;
                let v = (position[1] - center.1) / radii.1;
                u * u + v * v <= 1.0
            })
            .collect();

        Ok(Region::new(indices, Shape::Ellipse { center, radii }, name))
    }
}
