//! Bundler invocation over a process boundary.
//!
//! The bundler is a black box: each build receives the synthesized
//! configuration as a JSON file and must write back the entrypoint slice of
//! its stats as JSON. A missing or unparseable report and a non-zero exit
//! are both fatal integration defects, not test failures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use harness::compiler::{BuildReport, Compiler, CompilerConfig};

use crate::process::{run_with_timeout, write_log};

/// [`Compiler`] implementation that shells out to a configured bundler.
pub struct ProcessCompiler {
    command: Vec<String>,
    /// Config/report exchange directory (`<workspace>/.hotcase`).
    exchange_dir: PathBuf,
    logs_dir: PathBuf,
    timeout: Duration,
    builds: usize,
}

impl ProcessCompiler {
    pub fn new(
        command: Vec<String>,
        exchange_dir: PathBuf,
        logs_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            command,
            exchange_dir,
            logs_dir,
            timeout,
            builds: 0,
        }
    }
}

impl Compiler for ProcessCompiler {
    #[instrument(skip_all, fields(build = self.builds + 1))]
    fn build(&mut self, config: &CompilerConfig) -> Result<BuildReport> {
        self.builds += 1;
        fs::create_dir_all(&self.exchange_dir)
            .with_context(|| format!("create {}", self.exchange_dir.display()))?;

        let config_path = self.exchange_dir.join(format!("build-{}.json", self.builds));
        let report_path = self
            .exchange_dir
            .join(format!("report-{}.json", self.builds));
        let contents = serde_json::to_string_pretty(config).context("serialize config")?;
        fs::write(&config_path, format!("{contents}\n"))
            .with_context(|| format!("write {}", config_path.display()))?;

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..])
            .arg("--config")
            .arg(&config_path)
            .arg("--report")
            .arg(&report_path)
            .current_dir(&config.context);

        let output = run_with_timeout(&mut cmd, self.timeout).context("run bundler")?;
        write_log(
            &self.logs_dir.join(format!("bundler.{}.log", self.builds)),
            &output,
        )?;

        if output.timed_out {
            bail!("bundler timed out after {}s", self.timeout.as_secs());
        }
        if !output.success {
            bail!(
                "bundler exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            );
        }

        debug!(report = %report_path.display(), "reading build report");
        read_report(&report_path)
    }
}

fn read_report(path: &Path) -> Result<BuildReport> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read build report {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse build report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use harness::config::{ConfigOverrides, HarnessOptions, synthesize};
    use harness::ledger::UpdateSnapshot;
    use harness::scenario::ScenarioContext;
    use harness::target::Target;

    fn test_config(source: PathBuf, dist: PathBuf) -> CompilerConfig {
        let snapshot = UpdateSnapshot {
            step_index: 0,
            total_steps: 1,
            changed_files: Vec::new(),
        };
        synthesize(
            &ScenarioContext { source, dist },
            Target::Web,
            &ConfigOverrides::default(),
            &snapshot,
            &HarnessOptions::default(),
        )
    }

    #[test]
    fn reads_report_written_by_the_bundler() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        fs::create_dir_all(&source).expect("source");

        // Stand-in bundler: copies the report fixture to the requested path.
        let script = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --report) report="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf '{"entrypoints":{"main":{"assets":[{"name":"bundle.js"}]}}}' > "$report"
"#;
        let bundler = temp.path().join("bundler.sh");
        fs::write(&bundler, script).expect("bundler script");

        let mut compiler = ProcessCompiler::new(
            vec![
                "sh".to_string(),
                bundler.to_string_lossy().to_string(),
            ],
            temp.path().join(".hotcase"),
            temp.path().join("logs"),
            Duration::from_secs(10),
        );
        let config = test_config(source, temp.path().join("dist"));
        let report = compiler.build(&config).expect("build");
        let main = report.entrypoints.get("main").expect("main");
        assert_eq!(main.assets[0].name, "bundle.js");

        // The config handed over carries the camelCase wire format.
        let written =
            fs::read_to_string(temp.path().join(".hotcase/build-1.json")).expect("config");
        let value: serde_json::Value = serde_json::from_str(&written).expect("json");
        assert_eq!(value["mode"], "development");
        assert_eq!(value["output"]["publicPath"], "https://test.cases/path/");
    }

    #[test]
    fn nonzero_exit_is_an_integration_defect() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        fs::create_dir_all(&source).expect("source");

        let mut compiler = ProcessCompiler::new(
            vec!["sh".to_string(), "-c".to_string(), "exit 2".to_string()],
            temp.path().join(".hotcase"),
            temp.path().join("logs"),
            Duration::from_secs(10),
        );
        let config = test_config(source, temp.path().join("dist"));
        let err = compiler.build(&config).expect_err("bundler failed");
        assert!(err.to_string().contains("bundler exited"));
    }

    #[test]
    fn missing_report_is_an_integration_defect() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        fs::create_dir_all(&source).expect("source");

        let mut compiler = ProcessCompiler::new(
            vec!["sh".to_string(), "-c".to_string(), "true".to_string()],
            temp.path().join(".hotcase"),
            temp.path().join("logs"),
            Duration::from_secs(10),
        );
        let config = test_config(source, temp.path().join("dist"));
        let err = compiler.build(&config).expect_err("no report");
        assert!(err.to_string().contains("read build report"));
    }

    #[test]
    fn build_artifacts_are_numbered_per_build() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        fs::create_dir_all(&source).expect("source");

        let script = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --report) report="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf '{"entrypoints":{"main":{"assets":[{"name":"bundle.js"}]}}}' > "$report"
"#;
        let bundler = temp.path().join("bundler.sh");
        fs::write(&bundler, script).expect("bundler script");

        let mut compiler = ProcessCompiler::new(
            vec!["sh".to_string(), bundler.to_string_lossy().to_string()],
            temp.path().join(".hotcase"),
            temp.path().join("logs"),
            Duration::from_secs(10),
        );
        let config = test_config(source, temp.path().join("dist"));
        compiler.build(&config).expect("first build");
        compiler.build(&config).expect("second build");
        assert!(temp.path().join(".hotcase/build-2.json").exists());
        assert!(temp.path().join(".hotcase/report-2.json").exists());
    }
}
