//! Compiler configuration synthesis.
//!
//! Layers harness defaults and the injected hot-update machinery over
//! whatever partial configuration the case supplied. Composition is
//! additive: user rules and plugins are kept, never replaced. Nothing is
//! validated here — a malformed user configuration surfaces from the
//! bundler at build time.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;

use crate::compiler::{
    CompilerConfig, CssGeneratorOptions, Enforce, IncrementalPolicy, InfrastructureLogging,
    LogLevel, Mode, ModuleConfig, ModuleIds, ModuleRule, Optimization, OutputConfig, PluginSpec,
};
use crate::ledger::UpdateSnapshot;
use crate::scenario::ScenarioContext;
use crate::target::Target;

/// Entry used when the case supplies none.
pub const DEFAULT_ENTRY: &str = "./index.js";
/// Loader that receives the update snapshot once per module compilation.
pub const HOT_UPDATE_LOADER: &str = "hot-update";
/// Output files never resolve against the local filesystem.
const PUBLIC_PATH: &str = "https://test.cases/path/";

const CSS_MODULE_TYPES: [&str; 3] = ["css/auto", "css/module", "css"];

/// Process-scoped harness options, passed in explicitly instead of read
/// from a global.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarnessOptions {
    /// Keep the bundler's own diagnostic logging at full verbosity.
    pub verbose: bool,
}

/// Case-supplied partial configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigOverrides {
    pub entry: Option<String>,
    /// Extra module rules, kept alongside the injected hot-update rule.
    #[serde(default)]
    pub rules: Vec<ModuleRule>,
    /// Extra plugins, kept alongside the injected ones.
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Explicit css exports-only setting; wins over the target default.
    pub css_exports_only: Option<bool>,
    #[serde(default)]
    pub lazy_compilation: bool,
}

/// Produce the complete configuration for one build of one case.
///
/// Called once per build so the injected rule and plugins carry the current
/// [`UpdateSnapshot`] by value.
pub fn synthesize(
    ctx: &ScenarioContext,
    target: Target,
    overrides: &ConfigOverrides,
    update: &UpdateSnapshot,
    opts: &HarnessOptions,
) -> CompilerConfig {
    let mut config = base_config(ctx, target, update);
    apply_overrides(&mut config, target, overrides, update, opts);
    config
}

fn base_config(ctx: &ScenarioContext, target: Target, update: &UpdateSnapshot) -> CompilerConfig {
    CompilerConfig {
        context: ctx.source.clone(),
        mode: Mode::Development,
        devtool: None,
        entry: None,
        target,
        output: OutputConfig {
            path: ctx.dist.clone(),
            filename: "bundle.js".to_string(),
            chunk_filename: "[name].chunk.[fullhash].js".to_string(),
            public_path: PUBLIC_PATH.to_string(),
            library: Some("commonjs2".to_string()),
        },
        optimization: Optimization {
            module_ids: ModuleIds::Named,
        },
        module: ModuleConfig::default(),
        plugins: vec![
            PluginSpec::HotModuleReplacement,
            PluginSpec::HotUpdateSteps {
                update: update.clone(),
            },
        ],
        incremental: IncrementalPolicy::Safe,
        infrastructure_logging: InfrastructureLogging {
            level: LogLevel::Info,
        },
    }
}

fn apply_overrides(
    config: &mut CompilerConfig,
    target: Target,
    overrides: &ConfigOverrides,
    update: &UpdateSnapshot,
    opts: &HarnessOptions,
) {
    config.entry = Some(
        overrides
            .entry
            .clone()
            .unwrap_or_else(|| DEFAULT_ENTRY.to_string()),
    );

    apply_css_generator_defaults(&mut config.module.generator, target, overrides);

    config.module.rules.extend(overrides.rules.iter().cloned());
    config.module.rules.push(ModuleRule {
        loader: HOT_UPDATE_LOADER.to_string(),
        options: Some(json!(update)),
        enforce: Some(Enforce::Pre),
    });

    for id in &overrides.plugins {
        config.plugins.push(PluginSpec::Custom { id: id.clone() });
    }
    config.plugins.push(PluginSpec::LoaderOptions {
        update: update.clone(),
    });

    if !opts.verbose {
        config.infrastructure_logging.level = LogLevel::Error;
    }

    if overrides.lazy_compilation {
        config.plugins.push(PluginSpec::LazyCompilationProbe);
    }
}

fn apply_css_generator_defaults(
    generator: &mut BTreeMap<String, CssGeneratorOptions>,
    target: Target,
    overrides: &ConfigOverrides,
) {
    let exports_only = overrides
        .css_exports_only
        .unwrap_or_else(|| target.css_exports_only_default());
    for module_type in CSS_MODULE_TYPES {
        let options = generator.entry(module_type.to_string()).or_default();
        if options.exports_only.is_none() {
            options.exports_only = Some(exports_only);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn context() -> ScenarioContext {
        ScenarioContext {
            source: PathBuf::from("/cases/demo/src"),
            dist: PathBuf::from("/cases/demo/dist"),
        }
    }

    fn snapshot() -> UpdateSnapshot {
        UpdateSnapshot {
            step_index: 1,
            total_steps: 3,
            changed_files: vec!["index.js".to_string()],
        }
    }

    #[test]
    fn defaults_entry_only_when_missing() {
        let config = synthesize(
            &context(),
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert_eq!(config.entry.as_deref(), Some(DEFAULT_ENTRY));

        let overrides = ConfigOverrides {
            entry: Some("./main.js".to_string()),
            ..ConfigOverrides::default()
        };
        let config = synthesize(
            &context(),
            Target::Web,
            &overrides,
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert_eq!(config.entry.as_deref(), Some("./main.js"));
    }

    #[test]
    fn baseline_is_deterministic_and_safe() {
        let config = synthesize(
            &context(),
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert_eq!(config.mode, Mode::Development);
        assert!(config.devtool.is_none());
        assert_eq!(config.optimization.module_ids, ModuleIds::Named);
        assert_eq!(config.incremental, IncrementalPolicy::Safe);
        assert_eq!(config.output.public_path, PUBLIC_PATH);
        assert_eq!(config.output.path, PathBuf::from("/cases/demo/dist"));
    }

    #[test]
    fn user_rules_compose_with_injected_hot_update_rule() {
        let overrides = ConfigOverrides {
            rules: vec![ModuleRule {
                loader: "raw-loader".to_string(),
                options: None,
                enforce: None,
            }],
            ..ConfigOverrides::default()
        };
        let config = synthesize(
            &context(),
            Target::Web,
            &overrides,
            &snapshot(),
            &HarnessOptions::default(),
        );
        let loaders: Vec<&str> = config
            .module
            .rules
            .iter()
            .map(|rule| rule.loader.as_str())
            .collect();
        assert_eq!(loaders, vec!["raw-loader", HOT_UPDATE_LOADER]);

        let injected = config.module.rules.last().expect("injected rule");
        assert_eq!(injected.enforce, Some(Enforce::Pre));
        let options = injected.options.as_ref().expect("loader options");
        assert_eq!(options["stepIndex"], 1);
        assert_eq!(options["changedFiles"][0], "index.js");
    }

    #[test]
    fn user_plugins_compose_with_injected_plugins() {
        let overrides = ConfigOverrides {
            plugins: vec!["banner".to_string()],
            ..ConfigOverrides::default()
        };
        let config = synthesize(
            &context(),
            Target::Web,
            &overrides,
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert!(
            config
                .plugins
                .iter()
                .any(|plugin| matches!(plugin, PluginSpec::HotModuleReplacement))
        );
        assert!(
            config
                .plugins
                .iter()
                .any(|plugin| matches!(plugin, PluginSpec::Custom { id } if id == "banner"))
        );
        assert!(
            config
                .plugins
                .iter()
                .any(|plugin| matches!(plugin, PluginSpec::LoaderOptions { .. }))
        );
    }

    #[test]
    fn async_node_defaults_css_to_exports_only() {
        let config = synthesize(
            &context(),
            Target::AsyncNode,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions::default(),
        );
        for module_type in CSS_MODULE_TYPES {
            let options = config.module.generator.get(module_type).expect("generator");
            assert_eq!(options.exports_only, Some(true), "{module_type}");
        }

        let config = synthesize(
            &context(),
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions::default(),
        );
        let options = config.module.generator.get("css").expect("generator");
        assert_eq!(options.exports_only, Some(false));
    }

    #[test]
    fn explicit_exports_only_wins_over_target_default() {
        let overrides = ConfigOverrides {
            css_exports_only: Some(false),
            ..ConfigOverrides::default()
        };
        let config = synthesize(
            &context(),
            Target::AsyncNode,
            &overrides,
            &snapshot(),
            &HarnessOptions::default(),
        );
        let options = config.module.generator.get("css/auto").expect("generator");
        assert_eq!(options.exports_only, Some(false));
    }

    #[test]
    fn diagnostic_logging_is_suppressed_unless_verbose() {
        let config = synthesize(
            &context(),
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert_eq!(config.infrastructure_logging.level, LogLevel::Error);

        let config = synthesize(
            &context(),
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions { verbose: true },
        );
        assert_eq!(config.infrastructure_logging.level, LogLevel::Info);
    }

    #[test]
    fn lazy_compilation_appends_probe_plugin() {
        let overrides = ConfigOverrides {
            lazy_compilation: true,
            ..ConfigOverrides::default()
        };
        let config = synthesize(
            &context(),
            Target::Web,
            &overrides,
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert!(
            config
                .plugins
                .iter()
                .any(|plugin| matches!(plugin, PluginSpec::LazyCompilationProbe))
        );

        let config = synthesize(
            &context(),
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot(),
            &HarnessOptions::default(),
        );
        assert!(
            !config
                .plugins
                .iter()
                .any(|plugin| matches!(plugin, PluginSpec::LazyCompilationProbe))
        );
    }
}
