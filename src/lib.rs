pub mod config;
pub mod coords;
pub mod geometry;
pub mod protocol;
pub mod registry;
pub mod scene;
pub mod search;
pub mod session;

pub use config::*;
pub use coords::*;
pub use geometry::*;
pub use protocol::*;
pub use registry::*;
pub use session::*;
