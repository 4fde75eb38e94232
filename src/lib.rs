pub mod config;
pub mod discovery;
pub mod election;
pub mod error;
pub mod http;
pub mod node;
pub mod shutdown;

pub use error::{ElectionError, Result};
pub use node::Node;
