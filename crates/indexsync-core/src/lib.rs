pub mod backend;
pub mod config_manager;
pub mod error;
pub mod extractors;
pub mod identifier;
pub mod logging;
pub mod model;
pub mod property;
pub mod traits;

pub use config_manager::*;
pub use error::*;
pub use extractors::ContainerExtractorPath;
pub use identifier::*;
pub use logging::init_tracing;
pub use model::*;
pub use property::*;
pub use traits::*;
