//! The per-run command context.
//!
//! A [`CommandContext`] travels through the pipeline: handlers consume it,
//! mutate it, and hand it back. It owns the command queue and shares the
//! conversation thread with whoever else needs to append events.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use convoy_thread::AiThread;

use crate::error::{AgentError, Result};
use crate::queue::CommandQueue;

/// Default number of delegation levels allowed below the root context.
pub const DEFAULT_DELEGATION_DEPTH: u8 = 2;

/// Everything one pipeline run carries.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Project name this run operates on.
    pub project: String,
    /// Username of the requester.
    pub username: String,
    /// Pending commands, front first.
    pub commands: CommandQueue,
    /// One-shot runs exit after the queue drains instead of prompting.
    pub oneshot: bool,
    /// When set, file tools expose read operations only.
    pub file_read_only: bool,
    /// Remaining delegation levels. Strictly decreasing down the delegation
    /// chain and never negative, so runaway agent recursion cannot happen.
    delegation_depth: u8,
    /// The shared conversation thread.
    pub thread: Arc<Mutex<AiThread>>,
    /// Free-form per-run data bag for handlers.
    pub data: HashMap<String, Value>,
}

impl CommandContext {
    /// Create a root context with a fresh thread.
    pub fn new(project: impl Into<String>, username: impl Into<String>) -> Self {
        let project = project.into();
        let username = username.into();
        let thread = AiThread::new(project.clone(), username.clone());
        Self {
            project,
            username,
            commands: CommandQueue::new(),
            oneshot: false,
            file_read_only: false,
            delegation_depth: DEFAULT_DELEGATION_DEPTH,
            thread: Arc::new(Mutex::new(thread)),
            data: HashMap::new(),
        }
    }

    /// Attach an existing thread instead of the fresh default.
    pub fn with_thread(mut self, thread: Arc<Mutex<AiThread>>) -> Self {
        self.thread = thread;
        self
    }

    /// Mark this run as one-shot.
    pub fn oneshot(mut self) -> Self {
        self.oneshot = true;
        self
    }

    /// Restrict file tools to read operations.
    pub fn read_only(mut self) -> Self {
        self.file_read_only = true;
        self
    }

    /// Queue a batch of commands ahead of everything pending.
    pub fn add_commands<I, S>(&mut self, batch: I)
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: DoubleEndedIterator,
        S: Into<String>,
    {
        self.commands.push_batch_front(batch);
    }

    /// Remaining delegation levels.
    pub fn delegation_depth(&self) -> u8 {
        self.delegation_depth
    }

    /// The id of the shared thread.
    pub fn thread_id(&self) -> String {
        self.thread.lock().id.clone()
    }

    /// Build a child context for a delegated agent run.
    ///
    /// The child shares the thread, starts with an empty queue, and has one
    /// less delegation level. Errors when the depth is already exhausted.
    pub fn sub_context(&self) -> Result<CommandContext> {
        if self.delegation_depth == 0 {
            return Err(AgentError::DelegationDepthExhausted);
        }
        Ok(CommandContext {
            project: self.project.clone(),
            username: self.username.clone(),
            commands: CommandQueue::new(),
            oneshot: self.oneshot,
            file_read_only: self.file_read_only,
            delegation_depth: self.delegation_depth - 1,
            thread: Arc::clone(&self.thread),
            data: self.data.clone(),
        })
    }

    /// Clone for side processing on a forked thread: flags and data carry
    /// over, the queue does not.
    pub fn clone_without_commands(&self) -> CommandContext {
        let mut clone = self.clone();
        clone.commands = CommandQueue::new();
        clone
    }
}
