//! Orchestration core for Convoy.
//!
//! Ties the workspace together into a runnable agent loop:
//!
//! - [`CommandContext`] and [`CommandQueue`]: the state one run carries and
//!   the batch-ordered queue of pending commands.
//! - [`Handler`] / [`NestedHandler`] and the [`Pipeline`]: command dispatch
//!   with an AI fallback and a hard iteration cap.
//! - [`AiHandler`]: one agent turn — provider resolution, tool assembly,
//!   the completion/tool loop.
//! - [`Toolbox`] and [`ToolFactory`]: per-conversation tool aggregation
//!   with partial-failure isolation.
//! - [`ResourcePool`]: at most one live tool-server instance per
//!   configuration identity, reference-counted by conversation.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use convoy_agent::{AiHandler, CommandContext, Pipeline, ResourcePool, Toolbox};
//! use convoy_agent::tools::{FileToolFactory, ThinkToolFactory};
//! use convoy_llm::{AiClientProvider, ConfigLayer};
//!
//! let mut provider = AiClientProvider::new();
//! provider.init(vec![ConfigLayer::detect_env()]);
//!
//! let pool = Arc::new(ResourcePool::new());
//! let mut toolbox = Toolbox::new(pool.clone());
//! toolbox.register_builtin(Arc::new(FileToolFactory::new()));
//! toolbox.register_builtin(Arc::new(ThinkToolFactory::new()));
//!
//! let ai = AiHandler::new("coder", Arc::new(Mutex::new(provider)), Arc::new(toolbox));
//! let pipeline = Pipeline::new(Arc::new(ai));
//!
//! let mut context = CommandContext::new("demo", "dev");
//! context.add_commands(vec!["summarize the README"]);
//! let context = pipeline.run(context).await;
//! pool.release_thread(&context.thread_id());
//! ```

pub mod ai;
pub mod context;
pub mod error;
pub mod handler;
pub mod mcp;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod tool;
pub mod toolbox;
pub mod tools;

pub use ai::AiHandler;
pub use context::{CommandContext, DEFAULT_DELEGATION_DEPTH};
pub use error::{AgentError, Result};
pub use handler::{Handler, NestedHandler};
pub use mcp::McpToolFactory;
pub use pipeline::{Pipeline, MAX_ITERATIONS};
pub use pool::{InstanceStats, PoolStats, ResourcePool};
pub use queue::CommandQueue;
pub use tool::{AgentTool, OAuthCapable, SharedFactory, ToolExecutor, ToolFactory, ToolFuture};
pub use toolbox::Toolbox;
