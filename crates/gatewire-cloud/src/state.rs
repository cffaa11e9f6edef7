//! Local deployment state
//!
//! Manages `.gatewire/state.json`, which records what the last successful
//! deploy produced (physical resources and stack outputs), and
//! `.gatewire/lock.json`, which keeps two deploys of the same project from
//! running at once.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".gatewire";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";
const LOCK_TTL_HOURS: i64 = 1;

/// Everything recorded for a project directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Deployed stacks by name
    pub stacks: BTreeMap<String, StackState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            stacks: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stack(&self, name: &str) -> Option<&StackState> {
        self.stacks.get(name)
    }

    /// Add or replace a stack
    pub fn set_stack(&mut self, stack: StackState) {
        self.stacks.insert(stack.stack_name.clone(), stack);
        self.updated_at = Utc::now();
    }

    pub fn remove_stack(&mut self, name: &str) -> Option<StackState> {
        let result = self.stacks.remove(name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }
}

/// A deployed stack as last reported by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    pub stack_name: String,

    /// Provider that deployed it
    pub provider: String,

    pub region: String,

    /// Engine-reported stack status
    pub status: ResourceStatus,

    /// Resources by logical id
    pub resources: BTreeMap<String, ResourceState>,

    /// Stack outputs by name
    pub outputs: BTreeMap<String, String>,

    /// Template body the engine last deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<serde_json::Value>,

    pub updated_at: DateTime<Utc>,
}

impl StackState {
    pub fn new(
        stack_name: impl Into<String>,
        provider: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            provider: provider.into(),
            region: region.into(),
            status: ResourceStatus::Unknown,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            template: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_template(mut self, template: serde_json::Value) -> Self {
        self.template = Some(template);
        self
    }

    /// Deployed template entry of `logical_id` (Type, Properties, DependsOn, ...)
    pub fn deployed_definition(&self, logical_id: &str) -> Option<&serde_json::Value> {
        self.template
            .as_ref()
            .and_then(|t| t.get("Resources"))
            .and_then(|r| r.get(logical_id))
    }

    pub fn add_resource(&mut self, logical_id: impl Into<String>, state: ResourceState) {
        self.resources.insert(logical_id.into(), state);
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.outputs.insert(name.into(), value.into());
    }

    pub fn output(&self, name: &str) -> Option<&str> {
        self.outputs.get(name).map(String::as_str)
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Physical id assigned by the engine
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Current status
    pub status: ResourceStatus,

    /// Properties it was deployed with, when the engine reports them
    #[serde(default)]
    pub properties: Option<serde_json::Value>,

    /// Extra engine attributes (status reason, ...)
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the resource was first seen
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Unknown,
            properties: None,
            attributes: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a resource or stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Being created
    Creating,
    /// Being updated
    Updating,
    /// Created or updated successfully
    Running,
    /// Being deleted
    Deleting,
    /// Deleted
    Deleted,
    /// Rolled back or failed
    Error,
    /// Status is unknown
    Unknown,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Updating => write!(f, "updating"),
            ResourceStatus::Running => write!(f, "running"),
            ResourceStatus::Deleting => write!(f, "deleting"),
            ResourceStatus::Deleted => write!(f, "deleted"),
            ResourceStatus::Error => write!(f, "error"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reads and writes the state files of a project directory
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} stacks", state.stacks.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} stacks", state.stacks.len());
        Ok(())
    }

    /// Record `stack` in the state file
    pub async fn record_stack(&self, stack: StackState) -> Result<()> {
        let mut state = self.load().await?;
        state.set_stack(stack);
        self.save(&state).await
    }

    /// Drop `name` from the state file
    pub async fn forget_stack(&self, name: &str) -> Result<Option<StackState>> {
        let mut state = self.load().await?;
        let removed = state.remove_stack(name);
        if removed.is_some() {
            self.save(&state).await?;
        }
        Ok(removed)
    }

    /// Acquire a lock for exclusive access
    ///
    /// The lock file is created with `create_new`, so exactly one caller can
    /// hold it. A lock older than the TTL is removed and creation retried once.
    pub async fn acquire_lock(&self, operation: &str) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            operation: operation.to_string(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&lock_info)?;

        if !create_lock_file(&lock_path, &content).await? {
            self.check_held_lock(&lock_path).await?;
            if !create_lock_file(&lock_path, &content).await? {
                return Err(CloudError::LockError(format!(
                    "{} could not take the lock; another operation started first",
                    operation
                )));
            }
        }

        tracing::debug!("Acquired state lock for {}", operation);
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }

    /// Fail while the existing lock is live; remove it once it is stale
    async fn check_held_lock(&self, lock_path: &Path) -> Result<()> {
        let content = match fs::read_to_string(lock_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // An unparsable file is a lock still being written by its holder
        let Ok(lock_info) = serde_json::from_str::<LockInfo>(&content) else {
            return Err(CloudError::LockError(
                "another operation is acquiring the lock".to_string(),
            ));
        };

        let age = Utc::now().signed_duration_since(lock_info.acquired_at);
        if age.num_hours() < LOCK_TTL_HOURS {
            return Err(CloudError::LockError(format!(
                "{} by {} in progress since {}",
                lock_info.operation, lock_info.holder, lock_info.acquired_at
            )));
        }

        tracing::warn!(
            "Removing stale {} lock from {}",
            lock_info.operation,
            lock_info.holder
        );
        match fs::remove_file(lock_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Create `path` only if it does not exist yet; `false` when it already does
async fn create_lock_file(path: &Path, content: &str) -> Result<bool> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(true)
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    operation: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
