// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scenario outcomes and their aggregation.

use std::{fmt, sync::Arc};

use derive_more::Display;
use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;

/// Variable bindings produced by a scenario run.
///
/// Insertion order is retained, as it's observable in reports downstream.
pub type Vars = LinkedHashMap<String, serde_json::Value>;

/// Hook invoked with the last completed [`ScenarioContext`] once its feature
/// finishes.
pub type AfterHook = dyn Fn(&ScenarioContext) + Send + Sync;

/// Outcome of a single scenario run.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Status {
    /// Every step passed.
    #[display(fmt = "passed")]
    Passed,

    /// A step failed, or the scenario's runner panicked.
    #[display(fmt = "failed: {}", error)]
    Failed {
        /// Description of what went wrong.
        error: String,
    },
}

impl Status {
    /// Indicates whether this [`Status`] is a failing one.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of one scenario within one scheduler run.
///
/// Immutable once produced.
#[derive(Clone, Debug)]
pub struct ScenarioResult {
    /// Name of the scenario.
    pub name: String,

    /// Line the scenario is declared at.
    pub line: usize,

    /// Pass/fail outcome.
    pub status: Status,

    /// Variable bindings at the end of the run.
    pub vars: Vars,
}

impl ScenarioResult {
    /// Creates a passed [`ScenarioResult`] with the given `vars`.
    #[must_use]
    pub fn passed(name: impl Into<String>, line: usize, vars: Vars) -> Self {
        Self { name: name.into(), line, status: Status::Passed, vars }
    }

    /// Creates a failed [`ScenarioResult`].
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        line: usize,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            line,
            status: Status::Failed { error: error.into() },
            vars: Vars::new(),
        }
    }

    /// Indicates whether this [`ScenarioResult`] is a failing one.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }
}

/// Post-execution, variable-bearing context of one scenario run.
///
/// The scheduler keeps the context of the most recently completed scenario
/// and exports its [`Vars`] as the caller-visible result of the feature.
pub struct ScenarioContext {
    /// Variable bindings of the run.
    pub vars: Vars,

    /// Hook the engine configured for this run, if any.
    after_hook: Option<Arc<AfterHook>>,
}

impl ScenarioContext {
    /// Creates a new [`ScenarioContext`] out of the given `vars`.
    #[must_use]
    pub fn new(vars: Vars) -> Self {
        Self { vars, after_hook: None }
    }

    /// Attaches an [`AfterHook`] to this [`ScenarioContext`].
    #[must_use]
    pub fn with_after_hook(mut self, hook: Arc<AfterHook>) -> Self {
        self.after_hook = Some(hook);
        self
    }

    /// Invokes the configured [`AfterHook`], if any.
    pub fn invoke_after_hook(&self) {
        if let Some(hook) = &self.after_hook {
            hook(self);
        }
    }
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("vars", &self.vars)
            .field("after_hook", &self.after_hook.is_some())
            .finish()
    }
}

/// Aggregator of a feature run's results.
///
/// The scheduler calls [`add_result()`] once per selected scenario unit, in
/// its final scheduler-determined order, and [`set_result_vars()`] once with
/// the [`Vars`] of the most recently completed scenario.
///
/// [`add_result()`]: ResultSink::add_result
/// [`set_result_vars()`]: ResultSink::set_result_vars
pub trait ResultSink: Send + Sync {
    /// Accumulates the `result` of one scenario unit.
    fn add_result(&self, result: ScenarioResult);

    /// Records the caller-visible variable bindings of the feature run.
    fn set_result_vars(&self, vars: Vars);
}

/// Default [`ResultSink`] accumulating everything in memory.
#[derive(Debug, Default)]
pub struct FeatureResult {
    /// Per-scenario results, in the order the scheduler flushed them.
    results: Mutex<Vec<ScenarioResult>>,

    /// Exported caller-visible variable bindings.
    result_vars: Mutex<Option<Vars>>,
}

impl FeatureResult {
    /// Creates an empty [`FeatureResult`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated [`ScenarioResult`]s, in scheduler order.
    #[must_use]
    pub fn results(&self) -> Vec<ScenarioResult> {
        self.results.lock().clone()
    }

    /// Indicates whether any accumulated scenario failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.results.lock().iter().any(ScenarioResult::is_failed)
    }

    /// Number of passed scenarios.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.lock().iter().filter(|r| !r.is_failed()).count()
    }

    /// Number of failed scenarios.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.lock().iter().filter(|r| r.is_failed()).count()
    }

    /// Exported caller-visible [`Vars`], if a scenario completed.
    #[must_use]
    pub fn result_vars(&self) -> Option<Vars> {
        self.result_vars.lock().clone()
    }
}

impl ResultSink for FeatureResult {
    fn add_result(&self, result: ScenarioResult) {
        self.results.lock().push(result);
    }

    fn set_result_vars(&self, vars: Vars) {
        *self.result_vars.lock() = Some(vars);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn aggregates_results_in_insertion_order() {
        let result = FeatureResult::new();
        result.add_result(ScenarioResult::passed("a", 3, Vars::new()));
        result.add_result(ScenarioResult::failed("b", 7, "step failed"));

        let results = result.results();
        assert_eq!(
            results.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            ["a", "b"],
        );
        assert!(result.is_failed());
        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.failed_count(), 1);
    }

    #[test]
    fn exports_result_vars() {
        let result = FeatureResult::new();
        assert_eq!(result.result_vars(), None);

        let mut vars = Vars::new();
        _ = vars.insert("token".to_owned(), serde_json::json!("abc"));
        result.set_result_vars(vars);

        assert_eq!(
            result.result_vars().and_then(|v| v.get("token").cloned()),
            Some(serde_json::json!("abc")),
        );
    }

    #[test]
    fn after_hook_receives_the_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook = {
            let calls = Arc::clone(&calls);
            Arc::new(move |ctx: &ScenarioContext| {
                assert!(ctx.vars.contains_key("seen"));
                _ = calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        let mut vars = Vars::new();
        _ = vars.insert("seen".to_owned(), serde_json::json!(true));
        let context = ScenarioContext::new(vars).with_after_hook(hook);

        context.invoke_after_hook();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn status_renders_failure_reason() {
        assert_eq!(Status::Passed.to_string(), "passed");
        assert_eq!(
            Status::Failed { error: "boom".to_owned() }.to_string(),
            "failed: boom",
        );
    }
}
