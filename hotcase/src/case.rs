//! Case file parsing and validation.
//!
//! Cases are TOML files describing a deployment target, an initial source
//! tree, and the scripted update steps. See `hotcase/cases/` for examples.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use harness::config::ConfigOverrides;
use harness::scenario::{Scenario, ScenarioContext, UpdateStep};
use harness::target::Target;

/// A parsed case file: metadata, config overrides, seed tree, and steps.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseFile {
    pub case: CaseMeta,
    #[serde(default)]
    pub config: CaseConfig,
    /// Initial source tree, written into the workspace before the first
    /// build.
    pub files: BTreeMap<String, String>,
    /// Scripted updates applied between rebuilds.
    #[serde(default)]
    pub steps: Vec<UpdateStep>,
}

/// Case metadata.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    /// Deployment target the case compiles for.
    pub target: Target,
    /// Gate on full consumption of the scripted steps (default true).
    #[serde(default = "default_check_steps")]
    pub check_steps: bool,
}

fn default_check_steps() -> bool {
    true
}

/// Per-case driver configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseConfig {
    /// Bundler invocation (required).
    #[serde(default)]
    pub bundler: CommandSpec,
    /// Runtime that executes the located bundles.
    #[serde(default = "default_runner")]
    pub runner: CommandSpec,
    /// Seconds before a bundler or runner invocation is killed.
    pub timeout_secs: Option<u64>,
    /// Pass-through compiler configuration, merged additively by the
    /// synthesizer.
    #[serde(flatten)]
    pub overrides: ConfigOverrides,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            bundler: CommandSpec::default(),
            runner: default_runner(),
            timeout_secs: None,
            overrides: ConfigOverrides::default(),
        }
    }
}

/// An external command line.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CommandSpec {
    pub command: Vec<String>,
}

fn default_runner() -> CommandSpec {
    CommandSpec {
        command: vec!["node".to_string()],
    }
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let case: CaseFile =
            toml::from_str(&contents).with_context(|| format!("parse case {}", path.display()))?;
        case.validate()
            .with_context(|| format!("validate case {}", path.display()))?;
        Ok(case)
    }

    #[cfg(test)]
    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    /// Build the scenario this case describes, rooted at `context`.
    pub fn scenario(&self, context: ScenarioContext) -> Scenario {
        Scenario {
            id: self.case.id.clone(),
            context,
            target: self.case.target,
            check_steps: self.case.check_steps,
            overrides: self.config.overrides.clone(),
            steps: self.steps.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        if self.files.is_empty() {
            bail!("files must seed at least one source file");
        }
        for path in self.files.keys() {
            validate_relative_path(path).with_context(|| format!("files.{path} invalid"))?;
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.files.is_empty() {
                bail!("steps[{}] must change at least one file", index);
            }
            for path in step.files.keys() {
                validate_relative_path(path)
                    .with_context(|| format!("steps[{index}].files.{path} invalid"))?;
            }
        }
        if self.config.bundler.command.is_empty() || self.config.bundler.command[0].trim().is_empty()
        {
            bail!("config.bundler.command must be a non-empty array");
        }
        if self.config.runner.command.is_empty() || self.config.runner.command[0].trim().is_empty()
        {
            bail!("config.runner.command must be a non-empty array");
        }
        if let Some(timeout_secs) = self.config.timeout_secs
            && timeout_secs == 0
        {
            bail!("config.timeout_secs must be > 0");
        }
        Ok(())
    }
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if id.contains('/') || id.contains('\\') {
        bail!("case.id must not contain path separators");
    }
    if id.contains("..") {
        bail!("case.id must not contain '..'");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}

fn validate_relative_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("path must be non-empty");
    }
    if path.starts_with('/') || path.starts_with('\\') {
        bail!("path must be workspace-relative");
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        bail!("path must not contain '..'");
    }
    Ok(())
}
