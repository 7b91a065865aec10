//! # Stacks
//!
//! A [`Stack`] is a named checkpoint plus the providers able to manage what it contains.
//! It is the entry point for the three host operations:
//!
//! 1. **up** - run a program against a fresh [`Engine`] and reconcile.
//! 2. **refresh** - re-read every resource through its provider.
//! 3. **destroy** - delete everything, newest first.
//!
//! When the stack was opened from a state directory, the checkpoint is written back after
//! every operation, including failed ones.
//!
//! ```rust,ignore
//! let mut stack = Stack::open("dev", state_dir, providers)?;
//! let result = stack.up(|client| async move { my_program(client).await }).await?;
//! println!("{}", result.summary);
//! ```

use crate::client::EngineClient;
use crate::engine::{self, Engine};
use crate::error::FrameworkError;
use crate::provider::ProviderRegistry;
use crate::state::{Checkpoint, UpdateSummary};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a program returned, together with what the engine did.
#[derive(Debug)]
pub struct UpResult<T> {
    pub output: T,
    pub summary: UpdateSummary,
}

#[derive(Debug)]
pub struct Stack {
    name: String,
    providers: ProviderRegistry,
    checkpoint: Checkpoint,
    state_file: Option<PathBuf>,
}

impl Stack {
    /// An in-memory stack with no prior state.
    pub fn new(name: impl Into<String>, providers: ProviderRegistry) -> Self {
        let name = name.into();
        Self {
            checkpoint: Checkpoint::new(name.clone()),
            name,
            providers,
            state_file: None,
        }
    }

    /// Opens `<state_dir>/<name>.json`, starting empty when it does not exist.
    pub fn open(
        name: impl Into<String>,
        state_dir: &Path,
        providers: ProviderRegistry,
    ) -> Result<Self, FrameworkError> {
        let name = name.into();
        let state_file = state_dir.join(format!("{name}.json"));
        let checkpoint = Checkpoint::load(&state_file, &name)?;
        info!(stack = %name, resources = checkpoint.len(), "Stack opened");
        Ok(Self {
            name,
            providers,
            checkpoint,
            state_file: Some(state_file),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Runs `program` against a new engine and reconciles the stack with what it declared.
    ///
    /// The engine finishes once the program has returned and every [`EngineClient`] clone
    /// is gone, so the program's output must not hold on to the client.
    pub async fn up<F, Fut, T, E>(&mut self, program: F) -> Result<UpResult<T>, FrameworkError>
    where
        F: FnOnce(EngineClient) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (engine, client) = Engine::new(self.checkpoint.clone(), self.providers.clone());
        let control = client.clone();
        let handle = tokio::spawn(engine.run());

        let result = program(client).await.map_err(Into::into);
        if let Err(e) = &result {
            warn!(stack = %self.name, error = %e, "Program returned an error");
            let _ = control.program_failed(e.to_string());
        }
        drop(control);

        let outcome = handle.await.map_err(|_| FrameworkError::EngineDropped)?;
        self.checkpoint = outcome.checkpoint;
        self.save()?;

        let output = result.map_err(FrameworkError::Program)?;
        Ok(UpResult {
            output,
            summary: outcome.summary,
        })
    }

    pub async fn refresh(&mut self) -> Result<UpdateSummary, FrameworkError> {
        let (checkpoint, summary) = engine::refresh(&self.checkpoint, &self.providers).await;
        self.checkpoint = checkpoint;
        self.save()?;
        Ok(summary)
    }

    pub async fn destroy(&mut self) -> Result<UpdateSummary, FrameworkError> {
        let (checkpoint, summary) = engine::destroy(&self.checkpoint, &self.providers).await;
        self.checkpoint = checkpoint;
        self.save()?;
        Ok(summary)
    }

    fn save(&self) -> Result<(), FrameworkError> {
        if let Some(path) = &self.state_file {
            self.checkpoint.save(path)?;
        }
        Ok(())
    }
}
