pub mod classifier;
pub mod labels;
pub mod loader;
pub mod pipeline;
