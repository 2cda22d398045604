//! Data generation utilities for testing.

use mincard::DataSet;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A seeded uniform cloud of `car` points in `dim` dimensions.
#[allow(dead_code)]
pub fn tabular(car: usize, dim: usize, min: f64, max: f64, seed: u64) -> DataSet<'static> {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..car * dim).map(|_| rng.gen_range(min..max)).collect();
    DataSet::from_vec(coords, car, dim).unwrap_or_else(|_| unreachable!("generated data is valid"))
}

/// A seeded 2-d data set with `per_center` points jittered around each of
/// the given centers.
#[allow(dead_code)]
pub fn blobs(centers: &[(f64, f64)], per_center: usize, spread: f64, seed: u64) -> DataSet<'static> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coords = Vec::with_capacity(centers.len() * per_center * 2);
    for &(x, y) in centers {
        for _ in 0..per_center {
            coords.push(x + rng.gen_range(-spread..spread));
            coords.push(y + rng.gen_range(-spread..spread));
        }
    }
    DataSet::from_vec(coords, centers.len() * per_center, 2)
        .unwrap_or_else(|_| unreachable!("generated data is valid"))
}
