//! The Tool Surface (spec.md §4.6): the agent-visible tool catalogue and
//! the stdio JSON-RPC front end that routes calls to it.

mod assertions;
mod error;
mod network;
mod registry;
mod rpc;
mod surface;
mod types;
mod visual;

pub use error::{Error, Result};
pub use rpc::serve;
pub use surface::ToolSurface;
pub use types::ToolSpec;
