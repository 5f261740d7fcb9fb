pub mod cli;
pub mod describe;
pub mod dialect;
pub mod error;
pub mod hash;
pub mod patch;
pub mod path;
pub mod render;
pub mod scan;
pub mod store;
pub mod value;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
