//! Deployment-target policy table.
//!
//! Every behavior that varies by execution environment is dispatched through
//! [`Target`] methods, so target handling stays a closed set instead of
//! string comparisons scattered across components.

use serde::{Deserialize, Serialize};

/// Execution environment a case compiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Browser-style environment with DOM and script/style loading.
    Web,
    /// Isolated worker context, script loading only.
    Webworker,
    /// Server process executing one bundle synchronously.
    Node,
    /// Server process loading chunks asynchronously.
    AsyncNode,
}

/// How the bundle locator picks files out of a build report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Non-executable companion assets first, then every script, report
    /// order preserved within each group. Companions must be registered in
    /// the simulated environment before the script that references them.
    CompanionsThenScripts,
    /// Only the last executable asset. Earlier scripts in the report are
    /// intermediates from previous incremental rebuilds; the most recently
    /// emitted one is authoritative.
    LastScriptOnly,
}

impl Target {
    pub fn selection_policy(self) -> SelectionPolicy {
        match self {
            Target::Web | Target::Webworker => SelectionPolicy::CompanionsThenScripts,
            Target::Node | Target::AsyncNode => SelectionPolicy::LastScriptOnly,
        }
    }

    /// Whether css generators default to exports-only output.
    ///
    /// An async-node module graph cannot observe side-effect style
    /// injection, so generators must not synthesize it there.
    pub fn css_exports_only_default(self) -> bool {
        matches!(self, Target::AsyncNode)
    }
}
