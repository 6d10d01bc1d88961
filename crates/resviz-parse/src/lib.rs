mod extractor;
mod index;

pub use extractor::{ConstExtractor, is_generated_source};
pub use index::{BuildSummary, ConstantIndex};
