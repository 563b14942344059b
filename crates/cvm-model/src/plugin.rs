//! Host-facing model interface with an explicit lifecycle.

use std::path::Path;

use tracing::{debug, info};

use crate::{Engine, ModelError, Properties, QueryPoint, Result};

/// Operations a host drives a velocity model through.
pub trait VelocityModel {
    /// Load the model `label` from an install tree.
    fn initialize(&mut self, install: &Path, label: &str) -> Result<()>;

    /// Query a batch of points.
    fn query(&self, points: &[QueryPoint]) -> Result<Vec<Properties>>;

    /// Release everything the model holds. Calling it again does nothing.
    fn finalize(&mut self);

    /// Model family name.
    fn version(&self) -> &'static str;

    /// `config = <path>` description of the loaded configuration.
    fn describe_config(&self) -> Result<String>;
}

/// Where a [`ModelHandle`] is in its life.
#[derive(Debug, Default)]
pub enum Lifecycle {
    /// Not loaded yet.
    #[default]
    Uninitialized,
    /// Loaded and ready for queries.
    Ready(Engine),
    /// Finalized; cannot be loaded again.
    Closed,
}

impl Lifecycle {
    /// Short state name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Ready(_) => "ready",
            Lifecycle::Closed => "closed",
        }
    }
}

/// A [`VelocityModel`] backed by an [`Engine`].
#[derive(Debug, Default)]
pub struct ModelHandle {
    state: Lifecycle,
}

impl ModelHandle {
    /// An uninitialized handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is already ready.
    pub fn from_engine(engine: Engine) -> Self {
        Self {
            state: Lifecycle::Ready(engine),
        }
    }

    /// Current state.
    pub fn state(&self) -> &Lifecycle {
        &self.state
    }

    /// The engine, if ready.
    pub fn engine(&self) -> Result<&Engine> {
        match &self.state {
            Lifecycle::Ready(engine) => Ok(engine),
            Lifecycle::Uninitialized => Err(ModelError::NotInitialized),
            Lifecycle::Closed => Err(ModelError::Closed),
        }
    }
}

impl VelocityModel for ModelHandle {
    fn initialize(&mut self, install: &Path, label: &str) -> Result<()> {
        match self.state {
            Lifecycle::Uninitialized => {}
            Lifecycle::Ready(_) => return Err(ModelError::AlreadyInitialized),
            Lifecycle::Closed => return Err(ModelError::Closed),
        }
        let engine = Engine::open(install, label)?;
        info!("Model '{}' loaded from {}", label, install.display());
        self.state = Lifecycle::Ready(engine);
        Ok(())
    }

    fn query(&self, points: &[QueryPoint]) -> Result<Vec<Properties>> {
        self.engine()?.query(points)
    }

    fn finalize(&mut self) {
        let previous = std::mem::replace(&mut self.state, Lifecycle::Closed);
        debug!("Finalizing model handle ({})", previous.name());
    }

    fn version(&self) -> &'static str {
        crate::engine::VERSION
    }

    fn describe_config(&self) -> Result<String> {
        Ok(self.engine()?.describe_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_before_initialize() {
        let handle = ModelHandle::new();
        assert_eq!(handle.state().name(), "uninitialized");
        assert!(matches!(handle.query(&[]), Err(ModelError::NotInitialized)));
        assert!(matches!(handle.describe_config(), Err(ModelError::NotInitialized)));
        assert_eq!(handle.version(), "CVM-S5");
    }

    #[test]
    fn test_failed_initialize_stays_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let mut handle = ModelHandle::new();
        let err = handle.initialize(dir.path(), "cvms5").unwrap_err();
        assert!(err.is_resource());
        assert_eq!(handle.state().name(), "uninitialized");
    }

    #[test]
    fn test_finalize_is_idempotent_and_final() {
        let dir = tempfile::tempdir().unwrap();
        let mut handle = ModelHandle::new();
        handle.finalize();
        handle.finalize();
        assert_eq!(handle.state().name(), "closed");
        assert!(matches!(handle.query(&[]), Err(ModelError::Closed)));
        assert!(matches!(
            handle.initialize(dir.path(), "cvms5"),
            Err(ModelError::Closed)
        ));
    }
}
