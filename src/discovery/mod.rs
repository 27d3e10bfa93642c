//! Target instance discovery
//!
//! A `Discovery` hands the orchestrator the current set of instances once per
//! scrape cycle. Two sources exist: a static list from the command line and a
//! JSON host file that is re-read every time, so edits apply on the next scrape.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, error};

use crate::utils::{ExporterError, Result};

/// One store instance to scrape
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Instance {
    pub addr: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub alias: String,
}

/// Source of scrape targets
pub trait Discovery: Send + Sync {
    fn instances(&self) -> Vec<Instance>;
}

/// Fixed instance list built from comma-separated CLI values
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    instances: Vec<Instance>,
}

impl StaticDiscovery {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    /// Zip `addrs` with `passwords` and `aliases`.
    ///
    /// Password and alias lists may be empty, a single value shared by every
    /// address, or exactly as long as the address list.
    pub fn from_args(addrs: &str, passwords: &str, aliases: &str) -> Result<Self> {
        let addrs = split_list(addrs);
        if addrs.is_empty() {
            return Err(ExporterError::Config("no pika address given".to_string()));
        }
        let passwords = expand_list("password", split_list(passwords), addrs.len())?;
        let aliases = expand_list("alias", split_list(aliases), addrs.len())?;

        let instances = addrs
            .into_iter()
            .zip(passwords)
            .zip(aliases)
            .map(|((addr, password), alias)| Instance {
                addr,
                password,
                alias,
            })
            .collect();
        Ok(Self { instances })
    }
}

impl Discovery for StaticDiscovery {
    fn instances(&self) -> Vec<Instance> {
        self.instances.clone()
    }
}

/// Instances listed in a JSON file: `[{"addr": "...", "password": "...", "alias": "..."}]`
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    path: PathBuf,
}

impl FileDiscovery {
    /// Fails when the file cannot be loaded at startup.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let discovery = Self {
            path: path.as_ref().to_path_buf(),
        };
        discovery.load()?;
        Ok(discovery)
    }

    fn load(&self) -> Result<Vec<Instance>> {
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|e| {
            ExporterError::Config(format!(
                "invalid host file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Discovery for FileDiscovery {
    fn instances(&self) -> Vec<Instance> {
        match self.load() {
            Ok(instances) => {
                debug!("Loaded {} instances from {}", instances.len(), self.path.display());
                instances
            }
            Err(e) => {
                error!("Failed to read host file {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    s.split(',').map(|p| p.trim().to_string()).collect()
}

fn expand_list(what: &str, values: Vec<String>, len: usize) -> Result<Vec<String>> {
    match values.len() {
        0 => Ok(vec![String::new(); len]),
        1 => Ok(vec![values[0].clone(); len]),
        n if n == len => Ok(values),
        n => Err(ExporterError::Config(format!(
            "{} {} values given for {} addresses",
            n, what, len
        ))),
    }
}
