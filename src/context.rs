// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Immutable configuration of a single feature run.

use std::{fmt, sync::Arc};

use gherkin::tagexpr::TagOperation;

use crate::{
    cli,
    feature::Ext as _,
    pool::{ScenarioPool, ThreadPool},
    result::ResultSink,
    unit::ScenarioRunner,
};

/// Everything a [`FeatureScheduler`] needs to drive one feature run.
///
/// Owned by the caller and borrowed by the scheduler for the duration of one
/// run. The presence of a worker pool is what toggles concurrent dispatch;
/// the optional filters restrict which scenarios run at all.
///
/// [`FeatureScheduler`]: crate::FeatureScheduler
pub struct ExecutionContext {
    /// Feature being run.
    feature: Arc<gherkin::Feature>,

    /// Interpreter executing the selected scenarios.
    runner: Arc<dyn ScenarioRunner>,

    /// Aggregator receiving the ordered results.
    sink: Arc<dyn ResultSink>,

    /// Worker pool for concurrently dispatched scenarios, if any.
    pool: Option<Arc<dyn ScenarioPool>>,

    /// Tag expression selecting scenarios to run.
    tag_selector: Option<TagOperation>,

    /// Scenario-name filter used when this feature is called by name.
    ///
    /// Kept as its regex source: it's compiled lazily at unit
    /// materialization, so a malformed pattern surfaces as a scheduling
    /// fault.
    call_name: Option<String>,

    /// Tag restricting scenarios when this feature is called by tag.
    call_tag: Option<String>,
}

impl ExecutionContext {
    /// Creates a new [`ExecutionContext`] with no pool and no filters.
    #[must_use]
    pub fn new(
        feature: gherkin::Feature,
        runner: Arc<dyn ScenarioRunner>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            feature: Arc::new(feature),
            runner,
            sink,
            pool: None,
            tag_selector: None,
            call_name: None,
            call_tag: None,
        }
    }

    /// Attaches a worker pool, enabling concurrent dispatch.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<dyn ScenarioPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Restricts the run to scenarios satisfying the given `selector`.
    #[must_use]
    pub fn with_tag_selector(mut self, selector: TagOperation) -> Self {
        self.tag_selector = Some(selector);
        self
    }

    /// Restricts the run to scenarios whose name matches the given regex
    /// `pattern` (whole-name semantics).
    #[must_use]
    pub fn with_call_name(mut self, pattern: impl Into<String>) -> Self {
        self.call_name = Some(pattern.into());
        self
    }

    /// Restricts the run to scenarios carrying the given tag.
    #[must_use]
    pub fn with_call_tag(mut self, tag: impl Into<String>) -> Self {
        self.call_tag = Some(tag.into());
        self
    }

    /// Applies parsed [CLI options](cli::Opts) onto this context.
    ///
    /// A positive `--workers` count constructs a [`ThreadPool`] of that size.
    #[must_use]
    pub fn with_cli(mut self, cli: cli::Opts) -> Self {
        if let Some(name) = cli.name {
            self = self.with_call_name(name);
        }
        if let Some(tags) = cli.tags {
            self = self.with_tag_selector(tags);
        }
        if let Some(workers) = cli.workers.filter(|n| *n > 0) {
            self = self.with_pool(Arc::new(ThreadPool::new(workers)));
        }
        self
    }

    /// Feature being run.
    #[must_use]
    pub fn feature(&self) -> &gherkin::Feature {
        &self.feature
    }

    /// Interpreter executing the selected scenarios.
    pub(crate) fn runner(&self) -> &Arc<dyn ScenarioRunner> {
        &self.runner
    }

    /// Aggregator receiving the ordered results.
    pub(crate) fn sink(&self) -> &Arc<dyn ResultSink> {
        &self.sink
    }

    /// Worker pool, if one is attached.
    pub(crate) fn pool(&self) -> Option<&Arc<dyn ScenarioPool>> {
        self.pool.as_ref()
    }

    /// Tag selector, if one is configured.
    pub(crate) fn tag_selector(&self) -> Option<&TagOperation> {
        self.tag_selector.as_ref()
    }

    /// Call-name filter source, if one is configured.
    pub(crate) fn call_name(&self) -> Option<&str> {
        self.call_name.as_deref()
    }

    /// Call-tag filter, if one is configured.
    pub(crate) fn call_tag(&self) -> Option<&str> {
        self.call_tag.as_deref()
    }

    /// Identity of the feature for diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.feature.display_name()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("feature", &self.feature.name)
            .field("concurrent", &self.pool.is_some())
            .field("tag_selector", &self.tag_selector)
            .field("call_name", &self.call_name)
            .field("call_tag", &self.call_tag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use crate::result::FeatureResult;
    use crate::unit::{ScenarioOutcome, ScenarioRunner};
    use crate::ScenarioContext;

    use super::*;

    struct NoopRunner;

    impl ScenarioRunner for NoopRunner {
        fn run_scenario(&self, _: &gherkin::Scenario) -> ScenarioOutcome {
            ScenarioOutcome::passed(ScenarioContext::new(
                crate::result::Vars::new(),
            ))
        }
    }

    fn context() -> ExecutionContext {
        let feature = gherkin::Feature {
            tags: vec![],
            keyword: "Feature".to_owned(),
            name: "ctx".to_owned(),
            span: gherkin::Span { start: 0, end: 0 },
            position: gherkin::LineCol { line: 1, col: 1 },
            path: None,
            description: None,
            background: None,
            scenarios: vec![],
            rules: vec![],
        };
        ExecutionContext::new(
            feature,
            Arc::new(NoopRunner),
            Arc::new(FeatureResult::new()),
        )
    }

    #[test]
    fn cli_options_land_on_the_context() {
        let cli = cli::Opts::try_parse_from([
            "dill", "--name", "Login.*", "--workers", "2",
        ])
        .unwrap();

        let context = context().with_cli(cli);

        assert_eq!(context.call_name(), Some("Login.*"));
        assert!(context.pool().is_some());
    }

    #[test]
    fn zero_workers_stays_sequential() {
        let cli =
            cli::Opts::try_parse_from(["dill", "--workers", "0"]).unwrap();

        let context = context().with_cli(cli);

        assert!(context.pool().is_none());
    }

    #[test]
    fn display_name_falls_back_to_feature_name() {
        assert_eq!(context().display_name(), "ctx");
    }
}
