//! Configuration section definitions.

mod serve;
mod site;
mod workers;

pub use serve::ServeConfig;
pub use site::SiteSection;
pub use workers::WorkersConfig;
