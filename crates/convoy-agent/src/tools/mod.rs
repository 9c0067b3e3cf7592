//! Built-in tool factories.
//!
//! These are always available to every conversation, unlike MCP-backed
//! factories which come and go with configuration.

pub mod file;
pub mod think;

pub use file::FileToolFactory;
pub use think::ThinkToolFactory;
