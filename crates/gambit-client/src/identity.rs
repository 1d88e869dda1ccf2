//! Persisted client identifier.
//!
//! The server re-associates a reconnecting participant with its seat through
//! the client id carried on the channel URL. The id is created once and
//! reused for every join, so it has to outlive a single session.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use gambit_core::Environment;
use gambit_proto::ClientId;
use tracing::{debug, info};

/// Storage slot for the client identifier.
pub trait IdentityStore {
    /// Stored identifier, if any.
    fn load(&self) -> io::Result<Option<ClientId>>;

    /// Replace the stored identifier.
    fn store(&mut self, id: &ClientId) -> io::Result<()>;
}

/// Load the stored identifier, creating and storing a fresh one on first use.
pub fn load_or_create<S, E>(store: &mut S, env: &E) -> io::Result<ClientId>
where
    S: IdentityStore + ?Sized,
    E: Environment,
{
    if let Some(id) = store.load()? {
        debug!(client_id = %id, "reusing stored client id");
        return Ok(id);
    }
    let id = ClientId::new(env.fresh_token());
    store.store(&id)?;
    info!(client_id = %id, "created client id");
    Ok(id)
}

/// Keeps the identifier for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    slot: Option<ClientId>,
}

impl MemoryIdentityStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> io::Result<Option<ClientId>> {
        Ok(self.slot.clone())
    }

    fn store(&mut self, id: &ClientId) -> io::Result<()> {
        self.slot = Some(id.clone());
        Ok(())
    }
}

/// Keeps the identifier in a small text file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store backed by `path`. The file is created on first store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> io::Result<Option<ClientId>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let id = contents.trim();
                Ok((!id.is_empty()).then(|| ClientId::new(id)))
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&mut self, id: &ClientId) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{id}\n"))
    }
}
