mod bounds;
pub mod distance;
mod error;
mod kdtree;
mod neighbours;
mod node;

pub use distance::{Euclidean, Manhattan, Metric, WeightedManhattan};
pub use error::Error;
pub use kdtree::{KdTree, DEFAULT_BUCKET_SIZE};
