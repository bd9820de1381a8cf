// Axis-aligned boxes of every node, stored as two flat arrays indexed by node id.
pub struct Bounds {
    dimensions: usize,
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Bounds {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Bounds {
            dimensions,
            min: Vec::new(),
            max: Vec::new(),
        }
    }

    // Append an empty box (min = +inf, max = -inf) and return its id.
    pub fn push(&mut self) -> usize {
        let id = self.len();
        self.min.extend(std::iter::repeat(f64::INFINITY).take(self.dimensions));
        self.max
            .extend(std::iter::repeat(f64::NEG_INFINITY).take(self.dimensions));
        id
    }

    pub fn expand(&mut self, id: usize, point: &[f64]) {
        let range = id * self.dimensions..(id + 1) * self.dimensions;
        let min = &mut self.min[range.clone()];
        let max = &mut self.max[range];
        for ((lo, hi), &x) in min.iter_mut().zip(max.iter_mut()).zip(point) {
            if x < *lo {
                *lo = x;
            }
            if x > *hi {
                *hi = x;
            }
        }
    }

    #[must_use]
    pub fn min(&self, id: usize) -> &[f64] {
        &self.min[id * self.dimensions..(id + 1) * self.dimensions]
    }

    #[must_use]
    pub fn max(&self, id: usize) -> &[f64] {
        &self.max[id * self.dimensions..(id + 1) * self.dimensions]
    }

    #[cfg(test)]
    #[must_use]
    pub fn contains(&self, id: usize, point: &[f64]) -> bool {
        self.min(id)
            .iter()
            .zip(self.max(id))
            .zip(point)
            .all(|((lo, hi), x)| lo <= x && x <= hi)
    }

    // True if the box of `id` intersects the closed box [mins, maxs].
    #[must_use]
    pub fn overlaps(&self, id: usize, mins: &[f64], maxs: &[f64]) -> bool {
        self.min(id)
            .iter()
            .zip(self.max(id))
            .zip(mins.iter().zip(maxs))
            .all(|((lo, hi), (qlo, qhi))| lo <= qhi && hi >= qlo)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.min.len() / self.dimensions
    }
}
