use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 2;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// How the particles of a single frame are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One pass over all particles on the calling thread.
    Sequential,
    /// Particles split into `workers` contiguous chunks, each handled by its own thread.
    Parallel { workers: usize },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Parallel {
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnwrapConfig {
    pub mode: ExecutionMode,
}

#[derive(Default)]
pub struct UnwrapConfigBuilder {
    sequential: Option<bool>,
    workers: Option<usize>,
}

impl UnwrapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = Some(sequential);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn build(self) -> Result<UnwrapConfig, ConfigError> {
        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "workers",
                reason: "must be at least 1".to_string(),
            });
        }

        let mode = if self.sequential.unwrap_or(false) {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel { workers }
        };

        Ok(UnwrapConfig { mode })
    }
}
