//! Synthetic 2D maximum-weight bipartite matching instances and the
//! permutation utilities used to train models that approximate them.
//!
//! Points are drawn in the unit square, scored with Euclidean costs,
//! labelled with an exact assignment, written to plain-text records and
//! read back one index at a time.

pub mod dataset;
pub mod error;
pub mod geometry;
pub mod memory;
pub mod permutation;
pub mod record;
pub mod reward;
pub mod solver;

pub use dataset::{create_dataset, Dataset, GeneratorConfig, Only, Sample, Split, SplitDirs};
pub use error::{Error, Result};
pub use geometry::PointSet;
pub use record::DataRecord;
pub use solver::{solve, Exhaustive, Hungarian, Matching, Objective, Solver};
