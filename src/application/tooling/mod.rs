//! Client side of the tool protocol: transports and the discovered catalog.

mod catalog;
mod error;
mod http;
mod interface;
mod process;

pub use catalog::{CatalogError, ToolCatalog};
pub use error::ToolInvokeError;
pub use http::HttpToolServer;
pub use interface::{ToolContent, ToolServerInterface};
pub use process::ProcessToolServer;
