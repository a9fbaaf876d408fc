//! GitHub Actions runner integration: search path publication and step outputs.

pub mod outputs;
pub mod path;

pub use outputs::{ActionOutputs, OUTPUT_BIN, OUTPUT_CACHE_HIT, OUTPUT_VERSION};
pub use path::{RunnerPath, SearchPath};
