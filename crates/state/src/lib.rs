mod error;
mod registry;
mod snapshot;
mod store;

pub use error::*;
pub use registry::*;
pub use snapshot::*;
pub use store::*;
