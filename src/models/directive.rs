//! Repeat and concurrency directives
//!
//! Declarative configuration attached to test classes and methods.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors detected when a runner is built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Invalid thread count {0}: a worker pool needs at least one thread")]
    InvalidThreadCount(u32),
}

/// Number of times a test method is executed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repeat {
    pub times: u32,
}

impl Repeat {
    pub fn times(times: u32) -> Self {
        Self { times }
    }
}

/// Worker pool size for a test class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concurrent {
    pub threads: u32,
}

impl Concurrent {
    pub fn threads(threads: u32) -> Self {
        Self { threads }
    }

    pub fn validate(&self) -> Result<(), DirectiveError> {
        if self.threads == 0 {
            return Err(DirectiveError::InvalidThreadCount(self.threads));
        }
        Ok(())
    }
}

/// Class-level directives, resolved once when a runner is built
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    #[serde(default)]
    pub concurrent: Option<Concurrent>,
    #[serde(default)]
    pub repeat: Option<Repeat>,
}

impl ClassConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.concurrent = Some(Concurrent::threads(threads));
        self
    }

    pub fn with_repeat(mut self, times: u32) -> Self {
        self.repeat = Some(Repeat::times(times));
        self
    }

    /// Effective pool size; a class without a concurrency directive runs on one thread
    pub fn threads(&self) -> u32 {
        self.concurrent.map(|c| c.threads).unwrap_or(1)
    }

    pub fn validate(&self) -> Result<(), DirectiveError> {
        match self.concurrent {
            Some(concurrent) => concurrent.validate(),
            None => Ok(()),
        }
    }
}
