/// Version of the software, taken from the package metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
