pub(crate) mod constraint;
pub(crate) mod dcel;
pub mod dcel_operations;
mod handles;
pub(crate) mod hint_generator;
pub(crate) mod insertion;
pub(crate) mod locate;
pub(crate) mod math;
pub(crate) mod small_features;

pub use dcel::{CircularIterator, Dcel, InputIds};
pub use hint_generator::{HintGenerator, LastUsedVertexHintGenerator, RandomSampleHintGenerator};

pub use handles::*;

pub use locate::PositionInTriangulation;
