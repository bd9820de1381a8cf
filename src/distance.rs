use crate::error::Error;

/// Distance strategy of a [`KdTree`](crate::KdTree).
///
/// `distance_to_box` must be a lower bound of `distance` from `point` to any point inside
/// the box, otherwise the tree prunes subtrees that hold results.
pub trait Metric {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64;

    /// Called once when the tree is built.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric cannot work with `dimensions` axes.
    fn prepare(&mut self, _dimensions: usize) -> Result<(), Error> {
        Ok(())
    }
}

// Gap between `x` and the interval [lo, hi], zero when inside.
fn gap(x: f64, lo: f64, hi: f64) -> f64 {
    (lo - x).max(0.) + (x - hi).max(0.)
}

/// Squared Euclidean distance. No square root is taken.
#[derive(Clone, Copy, Debug, Default)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let mut sum = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            sum += (x - y).powi(2);
        }
        sum
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let mut sum = 0.0;
        for ((x, lo), hi) in point.iter().zip(min).zip(max) {
            sum += gap(*x, *lo, *hi).powi(2);
        }
        sum
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Manhattan;

impl Metric for Manhattan {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        point
            .iter()
            .zip(min)
            .zip(max)
            .map(|((x, lo), hi)| gap(*x, *lo, *hi))
            .sum()
    }
}

/// Manhattan distance with a weight per axis.
///
/// A metric built with [`WeightedManhattan::default`] receives unit weights for every axis
/// when the tree is created.
#[derive(Clone, Debug, Default)]
pub struct WeightedManhattan {
    weights: Vec<f64>,
}

impl WeightedManhattan {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a weight is negative or NaN.
    pub fn new(weights: Vec<f64>) -> Result<Self, Error> {
        check_weights(&weights)?;
        Ok(WeightedManhattan { weights })
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the number of weights changes, or
    /// [`Error::InvalidArgument`] if a weight is negative or NaN.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), Error> {
        if weights.len() != self.weights.len() {
            return Err(Error::DimensionMismatch {
                expected: self.weights.len(),
                found: weights.len(),
            });
        }
        check_weights(weights)?;
        self.weights.copy_from_slice(weights);
        Ok(())
    }
}

fn check_weights(weights: &[f64]) -> Result<(), Error> {
    if weights.iter().any(|w| w.is_nan() || *w < 0.) {
        return Err(Error::InvalidArgument("weights must be non-negative numbers"));
    }
    Ok(())
}

impl Metric for WeightedManhattan {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .zip(&self.weights)
            .map(|((x, y), w)| (x - y).abs() * w)
            .sum()
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        point
            .iter()
            .zip(min)
            .zip(max)
            .zip(&self.weights)
            .map(|(((x, lo), hi), w)| gap(*x, *lo, *hi) * w)
            .sum()
    }

    fn prepare(&mut self, dimensions: usize) -> Result<(), Error> {
        if self.weights.is_empty() {
            self.weights = vec![1.0; dimensions];
        } else if self.weights.len() != dimensions {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                found: self.weights.len(),
            });
        }
        Ok(())
    }
}
