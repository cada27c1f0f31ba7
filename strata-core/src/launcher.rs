//! Program launcher and return-code mapping.
//!
//! A [`Launcher`] runs a user function against a [`GridConfig`] in one of two
//! modes: `Automatic` builds a rayon pool sized to the thread grid and
//! installs it around the call, `FromCommand` runs on whatever pool the
//! caller drives. [`exit_code`] maps the uniform return codes onto process
//! exit codes for test drivers.

use crate::{Error, GridConfig, Result};

/// How the launcher provides the worker threads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// The launcher builds and installs a thread pool sized to the grid.
    Automatic,
    /// The caller drives; the function runs on the current pool.
    FromCommand,
}

/// Entry point wrapper carrying the process-wide configuration.
#[derive(Copy, Clone, Debug)]
pub struct Launcher {
    mode: ExecMode,
    config: GridConfig,
}

impl Launcher {
    pub fn new(mode: ExecMode, config: GridConfig) -> Self {
        Self { mode, config }
    }

    #[inline]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Runs `f` with the input object and the launcher's configuration,
    /// returning the function's own code.
    pub fn exec<I, R>(
        &self,
        f: impl FnOnce(I, &GridConfig) -> Result<R> + Send,
        input: I,
    ) -> Result<R>
    where
        I: Send,
        R: Send,
    {
        match self.mode {
            ExecMode::FromCommand => f(input, &self.config),
            ExecMode::Automatic => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.grid.num_threads())
                    .build()
                    .map_err(|_| Error::Panic)?;
                pool.install(|| f(input, &self.config))
            }
        }
    }
}

/// Process exit code for a library result: zero for success, a distinct
/// non-zero code per error.
pub fn exit_code<R>(result: &Result<R>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(Error::Mismatch) => 1,
        Err(Error::Illegal) => 2,
        Err(Error::Failed) => 3,
        Err(Error::Panic) => 4,
    }
}
