mod relay_path_extractor;
mod validation_extractor;

pub use relay_path_extractor::*;
pub use validation_extractor::*;
