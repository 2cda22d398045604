//! A `DataSet` bundles the points to be clustered.

use std::borrow::Cow;

use super::{Error, PointIndex, Result, POINT_MAX};

/// An immutable bundle of `N` points with `M` double-precision coordinates
/// each, stored row-major.
///
/// A `DataSet` is a handle: it borrows the caller's coordinate slice by
/// default and never copies it. Use [`DataSet::from_vec`] when the engine
/// should own the coordinates instead.
///
/// Once constructed, neither the number of points, the dimensionality nor
/// the coordinates can change, so distance-search backends may cache
/// whatever they derive from it.
#[derive(Clone, Debug)]
pub struct DataSet<'a> {
    /// The coordinates, `num_points * num_dims` values, row-major.
    coords: Cow<'a, [f64]>,
    /// The number of points.
    num_points: usize,
    /// The number of coordinates per point.
    num_dims: usize,
}

impl<'a> DataSet<'a> {
    /// Creates a new `DataSet` borrowing the caller's coordinates.
    ///
    /// # Parameters
    ///
    /// - `coords`: `num_points * num_dims` values, row-major.
    /// - `num_points`: The number of points, at least 1.
    /// - `num_dims`: The number of coordinates per point, at least 1.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`](super::ErrorKind::InvalidInput) if either count is zero, if the slice length
    ///   does not equal `num_points * num_dims`, or if any coordinate is
    ///   NaN or infinite.
    /// - [`ErrorKind::TooLargeProblem`](super::ErrorKind::TooLargeProblem) if `num_points` exceeds [`POINT_MAX`].
    pub fn new(coords: &'a [f64], num_points: usize, num_dims: usize) -> Result<Self> {
        validate(coords, num_points, num_dims)?;
        Ok(Self {
            coords: Cow::Borrowed(coords),
            num_points,
            num_dims,
        })
    }

    /// Creates a new `DataSet` that owns its coordinates.
    ///
    /// # Errors
    ///
    /// - See [`DataSet::new`] for details.
    pub fn from_vec(coords: Vec<f64>, num_points: usize, num_dims: usize) -> Result<DataSet<'static>> {
        validate(&coords, num_points, num_dims)?;
        Ok(DataSet {
            coords: Cow::Owned(coords),
            num_points,
            num_dims,
        })
    }

    /// The number of points in the data set.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// The number of coordinates per point.
    #[must_use]
    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    /// The raw coordinate slice, `num_points * num_dims` values, row-major.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// The coordinates of the point at `index`.
    #[must_use]
    pub fn point(&self, index: PointIndex) -> &[f64] {
        let start = (index as usize) * self.num_dims;
        &self.coords[start..start + self.num_dims]
    }

    /// The Euclidean distance between the points at `a` and `b`.
    #[must_use]
    pub(crate) fn distance(&self, a: PointIndex, b: PointIndex) -> f64 {
        distances::vectors::euclidean(self.point(a), self.point(b))
    }
}

/// Validates the constructor arguments shared by both `DataSet` constructors.
fn validate(coords: &[f64], num_points: usize, num_dims: usize) -> Result<()> {
    if num_points == 0 {
        return Err(Error::invalid_input("a data set must hold at least one point"));
    }
    if num_dims == 0 {
        return Err(Error::invalid_input("points must have at least one coordinate"));
    }
    if num_points > POINT_MAX {
        return Err(Error::too_large(format!(
            "{num_points} points exceed the supported maximum of {POINT_MAX}"
        )));
    }
    if coords.len() != num_points * num_dims {
        return Err(Error::invalid_input(format!(
            "expected {num_points} x {num_dims} = {} coordinates, got {}",
            num_points * num_dims,
            coords.len()
        )));
    }
    if !coords.iter().all(|c| c.is_finite()) {
        return Err(Error::invalid_input("coordinates must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn creation() -> Result<()> {
        let coords = [0.0, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0];
        let data = DataSet::new(&coords, 4, 2)?;
        assert_eq!(data.num_points(), 4);
        assert_eq!(data.num_dims(), 2);
        assert_eq!(data.point(2), &[10.0, 0.0]);

        let owned = DataSet::from_vec(coords.to_vec(), 2, 4)?;
        assert_eq!(owned.num_points(), 2);
        assert_eq!(owned.point(1), &[10.0, 0.0, 10.0, 1.0]);

        Ok(())
    }

    #[test]
    fn rejects_malformed_input() {
        let coords = [0.0, 1.0, 2.0];
        for (n, m) in [(0, 1), (1, 0), (2, 2)] {
            let err = DataSet::new(&coords, n, m).map(|_| ()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "n={n} m={m}");
        }

        let err = DataSet::new(&[0.0, f64::NAN], 2, 1).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = DataSet::new(&[0.0, f64::INFINITY], 2, 1).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn euclidean_distances() -> Result<()> {
        let coords = [0.0, 0.0, 3.0, 4.0];
        let data = DataSet::new(&coords, 2, 2)?;
        assert!(float_cmp::approx_eq!(f64, data.distance(0, 1), 5.0));
        assert!(float_cmp::approx_eq!(f64, data.distance(1, 1), 0.0));
        Ok(())
    }
}
