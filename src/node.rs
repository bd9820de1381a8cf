pub enum Node<T> {
    Leaf(Leaf<T>),
    Stem(Stem),
}

// Bucket of entries. `points` holds the coordinates of every entry back to back,
// `sequence` the insertion number of every entry.
pub struct Leaf<T> {
    pub points: Vec<f64>,
    pub sequence: Vec<usize>,
    pub payloads: Vec<T>,
}

impl<T> Leaf<T> {
    #[must_use]
    pub fn with_capacity(capacity: usize, dimensions: usize) -> Self {
        Leaf {
            points: Vec::with_capacity(capacity * dimensions),
            sequence: Vec::with_capacity(capacity),
            payloads: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: &[f64], sequence: usize, payload: T) {
        self.points.extend_from_slice(point);
        self.sequence.push(sequence);
        self.payloads.push(payload);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn entries(&self, dimensions: usize) -> impl Iterator<Item = (&[f64], &T)> {
        self.points.chunks_exact(dimensions).zip(self.payloads.iter())
    }

    pub fn sequenced_entries(
        &self,
        dimensions: usize,
    ) -> impl Iterator<Item = (&[f64], usize, &T)> {
        self.points
            .chunks_exact(dimensions)
            .zip(self.sequence.iter())
            .zip(self.payloads.iter())
            .map(|((point, sequence), payload)| (point, *sequence, payload))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Stem {
    pub split_dim: usize,
    pub split_val: f64,
    pub less: usize,
    pub more: usize,
}

impl Stem {
    #[must_use]
    pub fn child_for(&self, point: &[f64]) -> usize {
        if point[self.split_dim] < self.split_val {
            self.less
        } else {
            self.more
        }
    }

    // (near, far): the child on the side of `point` comes first.
    #[must_use]
    pub fn order(&self, point: &[f64]) -> (usize, usize) {
        if point[self.split_dim] < self.split_val {
            (self.less, self.more)
        } else {
            (self.more, self.less)
        }
    }
}
