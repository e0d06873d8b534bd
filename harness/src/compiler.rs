//! Bundler boundary: configuration handed in, build report handed back.
//!
//! The bundler is a black box behind [`Compiler`]. Configuration types
//! serialize to the camelCase JSON surface bundlers expect; the report is
//! the entrypoint slice of a stats object (`all=false, entrypoints=true`),
//! keyed by entrypoint name with an ordered asset list.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ledger::UpdateSnapshot;
use crate::target::Target;

/// Name of the entrypoint the harness loads bundles from.
pub const MAIN_ENTRYPOINT: &str = "main";

/// One (incremental) build: configuration in, report out.
///
/// Implementations keep their own incremental state between calls; each call
/// carries the current [`UpdateSnapshot`] inside the config's injected
/// loader rule and plugins.
pub trait Compiler {
    fn build(&mut self, config: &CompilerConfig) -> Result<BuildReport>;
}

/// Complete configuration for one build of one test case.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Source root the bundler resolves entries against.
    pub context: PathBuf,
    pub mode: Mode,
    /// `None` disables source maps; cases assert on structural output, not
    /// debugging fidelity.
    pub devtool: Option<String>,
    pub entry: Option<String>,
    pub target: Target,
    pub output: OutputConfig,
    pub optimization: Optimization,
    pub module: ModuleConfig,
    pub plugins: Vec<PluginSpec>,
    pub incremental: IncrementalPolicy,
    pub infrastructure_logging: InfrastructureLogging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

/// Incremental-rebuild policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementalPolicy {
    /// Never skip re-emitting a module whose update semantics are
    /// ambiguous. Costs rebuild time, which is the right trade while
    /// verifying correctness.
    Safe,
    /// Bundler-default skipping heuristics.
    Advance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub path: PathBuf,
    pub filename: String,
    pub chunk_filename: String,
    pub public_path: String,
    pub library: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub module_ids: ModuleIds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleIds {
    /// Stable path-derived names, so successive incremental builds stay
    /// comparable.
    Named,
    /// Content-hash-derived ids.
    Deterministic,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    pub rules: Vec<ModuleRule>,
    /// Generator options keyed by module type (`css/auto`, `css/module`,
    /// `css`).
    pub generator: BTreeMap<String, CssGeneratorOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRule {
    pub loader: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce: Option<Enforce>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforce {
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssGeneratorOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports_only: Option<bool>,
}

/// Plugins the synthesizer can place into a configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PluginSpec {
    /// Enables the bundler's HMR runtime.
    HotModuleReplacement,
    /// Build-time hook handed the current update snapshot once per module
    /// compilation.
    HotUpdateSteps { update: UpdateSnapshot },
    /// Mirrors the snapshot into legacy loader-option lookups.
    LoaderOptions { update: UpdateSnapshot },
    /// Keeps lazily-compiled modules deterministically observable in tests.
    LazyCompilationProbe,
    /// Case-supplied plugin, passed through untouched.
    Custom { id: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureLogging {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Verbose,
}

/// Entrypoint/asset manifest reported by a completed build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    #[serde(default)]
    pub entrypoints: BTreeMap<String, Entrypoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entrypoint {
    /// Emitted assets, in report order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
}

impl Asset {
    /// Executability is inferred from the file extension: scripts run,
    /// everything else is a companion asset.
    pub fn is_executable(&self) -> bool {
        self.name.ends_with(".js")
    }
}

impl BuildReport {
    /// Convenience constructor for a report with a single entrypoint.
    pub fn with_entrypoint(name: &str, asset_names: &[&str]) -> Self {
        let assets = asset_names
            .iter()
            .map(|name| Asset {
                name: (*name).to_string(),
            })
            .collect();
        let mut entrypoints = BTreeMap::new();
        entrypoints.insert(name.to_string(), Entrypoint { assets });
        Self { entrypoints }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_executable_and_companions_are_not() {
        let script = Asset {
            name: "bundle.js".to_string(),
        };
        let style = Asset {
            name: "bundle.css".to_string(),
        };
        assert!(script.is_executable());
        assert!(!style.is_executable());
    }

    #[test]
    fn report_parses_entrypoint_slice() {
        let json = r#"{"entrypoints":{"main":{"assets":[{"name":"a.css"},{"name":"bundle.js"}]}}}"#;
        let report: BuildReport = serde_json::from_str(json).expect("parse");
        let main = report.entrypoints.get("main").expect("main entrypoint");
        assert_eq!(main.assets.len(), 2);
        assert_eq!(main.assets[1].name, "bundle.js");
    }

    #[test]
    fn report_without_entrypoints_parses_empty() {
        let report: BuildReport = serde_json::from_str("{}").expect("parse");
        assert!(report.entrypoints.is_empty());
    }
}
