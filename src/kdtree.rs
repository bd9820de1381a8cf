use conv::ValueFrom;
use log::{debug, trace};

use crate::{
    bounds::Bounds,
    distance::{Euclidean, Metric, WeightedManhattan},
    error::Error,
    neighbours::BestK,
    node::{Leaf, Node, Stem},
};

pub const DEFAULT_BUCKET_SIZE: usize = 24;

const ROOT: usize = 0;

pub struct KdTree<T, M = Euclidean> {
    dimensions: usize,
    bucket_size: usize,
    size: usize,
    metric: M,
    nodes: Vec<Node<T>>,
    bounds: Bounds,
    spare_leaves: Vec<Leaf<T>>,
}

impl<T, M: Metric + Default> KdTree<T, M> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, Error> {
        Self::with_metric(dimensions, DEFAULT_BUCKET_SIZE, M::default())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `dimensions` or `bucket_size` is zero.
    pub fn with_bucket_size(dimensions: usize, bucket_size: usize) -> Result<Self, Error> {
        Self::with_metric(dimensions, bucket_size, M::default())
    }
}

impl<T, M: Metric> KdTree<T, M> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `dimensions` or `bucket_size` is zero, or the
    /// error of [`Metric::prepare`].
    pub fn with_metric(
        dimensions: usize,
        bucket_size: usize,
        mut metric: M,
    ) -> Result<Self, Error> {
        if dimensions == 0 {
            return Err(Error::InvalidArgument("dimensions must be at least 1"));
        }
        if bucket_size == 0 {
            return Err(Error::InvalidArgument("bucket size must be at least 1"));
        }
        metric.prepare(dimensions)?;

        let mut bounds = Bounds::new(dimensions);
        let root = bounds.push();
        debug_assert_eq!(root, ROOT);
        Ok(KdTree {
            dimensions,
            bucket_size,
            size: 0,
            metric,
            nodes: vec![Node::Leaf(Leaf::with_capacity(bucket_size, dimensions))],
            bounds,
            spare_leaves: Vec::new(),
        })
    }

    /// Inserts `payload` at `location` and returns the number of entries in the tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `location` has the wrong length, or
    /// [`Error::InvalidArgument`] if it holds a NaN or an infinity. The tree is left
    /// unchanged.
    pub fn add_point(&mut self, location: &[f64], payload: T) -> Result<usize, Error> {
        self.check_point(location)?;

        // Descend to the leaf, growing the boxes along the way
        let sequence = self.size;
        let mut node_id = ROOT;
        let entries = loop {
            self.bounds.expand(node_id, location);
            match &mut self.nodes[node_id] {
                Node::Stem(stem) => node_id = stem.child_for(location),
                Node::Leaf(leaf) => {
                    leaf.push(location, sequence, payload);
                    break leaf.len();
                }
            }
        };
        self.size += 1;

        if entries % self.bucket_size == 0 {
            self.split(node_id);
        }
        Ok(self.size)
    }

    /// Returns up to `k` payloads closest to `location` with their distances, closest
    /// first. Equal distances are ordered by insertion. Fewer than `k` are returned when
    /// the tree holds fewer entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] or [`Error::InvalidArgument`] for a malformed
    /// `location`.
    pub fn nearest_neighbours(
        &self,
        location: &[f64],
        k: usize,
    ) -> Result<Vec<(f64, &T)>, Error> {
        self.check_point(location)?;
        let k = k.min(self.size);
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut best = BestK::new(k);
        let mut stack = vec![ROOT];
        while let Some(node_id) = stack.pop() {
            // Equally distant subtrees may still hold earlier insertions
            if best.is_full() && self.distance_to_node(location, node_id) > best.worst() {
                continue;
            }
            match &self.nodes[node_id] {
                Node::Stem(stem) => {
                    let (near, far) = stem.order(location);
                    stack.push(far);
                    stack.push(near);
                }
                Node::Leaf(leaf) => {
                    for (point, sequence, payload) in leaf.sequenced_entries(self.dimensions) {
                        best.offer(self.metric.distance(location, point), sequence, payload);
                    }
                }
            }
        }
        Ok(best.into_sorted_vec())
    }

    /// Returns every payload within `radius` of `location`, in no particular order. The
    /// radius is in the units of the metric, so it is a squared length for [`Euclidean`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a malformed `location`, or
    /// [`Error::InvalidArgument`] for a non-finite coordinate or a negative or NaN `radius`.
    pub fn ball_search(&self, location: &[f64], radius: f64) -> Result<Vec<&T>, Error> {
        self.check_point(location)?;
        if radius.is_nan() || radius < 0. {
            return Err(Error::InvalidArgument("radius must be a non-negative number"));
        }

        let mut result = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node_id) = stack.pop() {
            if self.distance_to_node(location, node_id) > radius {
                continue;
            }
            match &self.nodes[node_id] {
                Node::Stem(stem) => {
                    let (near, far) = stem.order(location);
                    stack.push(far);
                    stack.push(near);
                }
                Node::Leaf(leaf) => {
                    for (point, payload) in leaf.entries(self.dimensions) {
                        if self.metric.distance(location, point) <= radius {
                            result.push(payload);
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    /// Returns every payload inside the closed box `[mins, maxs]`, in no particular order.
    /// A box with `mins[d] > maxs[d]` on some axis is empty. Corners may be infinite.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] or [`Error::InvalidArgument`] for malformed
    /// corners.
    pub fn rect_search(&self, mins: &[f64], maxs: &[f64]) -> Result<Vec<&T>, Error> {
        self.check_corner(mins)?;
        self.check_corner(maxs)?;
        if mins.iter().zip(maxs).any(|(lo, hi)| lo > hi) {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node_id) = stack.pop() {
            if !self.bounds.overlaps(node_id, mins, maxs) {
                continue;
            }
            match &self.nodes[node_id] {
                Node::Stem(stem) => {
                    stack.push(stem.more);
                    stack.push(stem.less);
                }
                Node::Leaf(leaf) => {
                    for (point, payload) in leaf.entries(self.dimensions) {
                        let inside = point
                            .iter()
                            .zip(mins.iter().zip(maxs))
                            .all(|(x, (lo, hi))| lo <= x && x <= hi);
                        if inside {
                            result.push(payload);
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    #[must_use]
    pub fn metric(&self) -> &M {
        &self.metric
    }

    fn check_point(&self, point: &[f64]) -> Result<(), Error> {
        self.check_corner(point)?;
        if point.iter().any(|x| x.is_infinite()) {
            return Err(Error::InvalidArgument("coordinates must be finite"));
        }
        Ok(())
    }

    fn check_corner(&self, corner: &[f64]) -> Result<(), Error> {
        if corner.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                found: corner.len(),
            });
        }
        if corner.iter().any(|x| x.is_nan()) {
            return Err(Error::InvalidArgument("coordinates must not be NaN"));
        }
        Ok(())
    }

    fn distance_to_node(&self, location: &[f64], node_id: usize) -> f64 {
        let (min, max) = (self.bounds.min(node_id), self.bounds.max(node_id));
        self.metric.distance_to_box(location, min, max)
    }

    // Promote the leaf to a stem with two new leaves, unless one side would be empty.
    fn split(&mut self, node_id: usize) {
        let Some((split_dim, split_val)) = self.choose_split(node_id) else {
            trace!("node {node_id}: no dimension to split on");
            return;
        };
        let Node::Leaf(leaf) = &self.nodes[node_id] else {
            return;
        };
        let less_count = leaf
            .entries(self.dimensions)
            .filter(|(point, _)| point[split_dim] < split_val)
            .count();
        if less_count == 0 || less_count == leaf.len() {
            trace!(
                "node {node_id}: split on dimension {split_dim} at {split_val} leaves a side empty"
            );
            return;
        }
        let more_count = leaf.len() - less_count;

        let less = self.add_leaf();
        let more = self.add_leaf();
        let stem = Node::Stem(Stem {
            split_dim,
            split_val,
            less,
            more,
        });

        // Move the entries into the children
        if let Node::Leaf(mut leaf) = std::mem::replace(&mut self.nodes[node_id], stem) {
            let dimensions = self.dimensions;
            let entries = leaf
                .points
                .chunks_exact(dimensions)
                .zip(leaf.sequence.drain(..))
                .zip(leaf.payloads.drain(..));
            for ((point, sequence), payload) in entries {
                let child = if point[split_dim] < split_val { less } else { more };
                self.bounds.expand(child, point);
                if let Node::Leaf(child) = &mut self.nodes[child] {
                    child.push(point, sequence, payload);
                }
            }
            leaf.points.clear();
            self.spare_leaves.push(leaf);
        }

        debug!(
            "node {node_id}: split on dimension {split_dim} at {split_val} into {less} ({less_count} entries) and {more} ({more_count} entries)"
        );
    }

    // Dimension with the largest summed squared deviation, split at its mean.
    fn choose_split(&self, node_id: usize) -> Option<(usize, f64)> {
        let Node::Leaf(leaf) = &self.nodes[node_id] else {
            return None;
        };
        let count = f64::value_from(leaf.len()).ok()?;
        let min = self.bounds.min(node_id);
        let max = self.bounds.max(node_id);

        let mut best: Option<(usize, f64)> = None;
        let mut best_score = 0.0;
        for dim in 0..self.dimensions {
            if max[dim] - min[dim] <= best_score {
                continue;
            }
            let values = || leaf.entries(self.dimensions).map(move |(point, _)| point[dim]);
            let mean = values().sum::<f64>() / count;
            let variance = values().map(|x| (x - mean).powi(2)).sum::<f64>() / count;
            let score = variance * count;
            if score > best_score {
                best_score = score;
                best = Some((dim, mean));
            }
        }

        let (split_dim, mut split_val) = best?;
        if split_val == f64::INFINITY {
            split_val = f64::MAX;
        } else if split_val == f64::NEG_INFINITY {
            split_val = f64::MIN;
        }
        if split_val == max[split_dim] {
            split_val = min[split_dim];
        }
        Some((split_dim, split_val))
    }

    // Allocate a leaf node, reusing the storage of a former leaf if possible.
    fn add_leaf(&mut self) -> usize {
        let leaf = self
            .spare_leaves
            .pop()
            .unwrap_or_else(|| Leaf::with_capacity(self.bucket_size, self.dimensions));
        let id = self.bounds.push();
        debug_assert_eq!(id, self.nodes.len());
        self.nodes.push(Node::Leaf(leaf));
        id
    }
}

impl<T> KdTree<T, WeightedManhattan> {
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `weights` does not have one weight per
    /// dimension, or [`Error::InvalidArgument`] if a weight is negative or NaN.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), Error> {
        self.metric.set_weights(weights)
    }
}
