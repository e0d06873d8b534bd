//! Workspace creation and management.
//!
//! Each run gets an isolated directory holding the seeded source tree, the
//! bundler's output directory, and the collaborator exchange directory, so
//! concurrent cases never share mutable state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};

/// An isolated workspace for running a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Absolute path to the workspace root.
    pub root: PathBuf,
    /// Source tree the bundler compiles and the steps mutate.
    pub source: PathBuf,
    /// Output directory the bundler emits into.
    pub dist: PathBuf,
    /// Workspace directory name (case id, timestamp, random suffix).
    pub name: String,
}

/// Create an isolated workspace seeded with the case's initial files.
pub fn create_workspace(
    base_dir: &Path,
    case_id: &str,
    files: &BTreeMap<String, String>,
) -> Result<Workspace> {
    fs::create_dir_all(base_dir)
        .with_context(|| format!("create workspace dir {}", base_dir.display()))?;

    let timestamp = generate_timestamp();
    let short_id = generate_short_id();
    let name = build_workspace_name(case_id, &timestamp, &short_id);
    let root = base_dir.join(&name);
    let source = root.join("src");
    let dist = root.join("dist");
    fs::create_dir_all(&source)
        .with_context(|| format!("create source root {}", source.display()))?;
    fs::create_dir_all(&dist).with_context(|| format!("create dist root {}", dist.display()))?;

    for (relative, contents) in files {
        let path = source.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("seed {}", path.display()))?;
    }

    Ok(Workspace {
        root,
        source,
        dist,
        name,
    })
}

pub fn build_workspace_name(case_id: &str, timestamp: &str, short_id: &str) -> String {
    format!("{case_id}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}
