pub mod config;
pub mod entropy_coding;
pub mod error;
pub mod helpers;
pub mod macros;
pub mod models;
pub mod runner;

pub use config::PpmConfig;
pub use error::{Error, Result};
pub use runner::{compress, compress_stream, decompress, decompress_stream};
