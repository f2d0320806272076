// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runnable handle for one scenario within one scheduler run.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::{
    result::{ScenarioContext, ScenarioResult, Status},
    tag::TagSet,
};

/// Continuation fired exactly once when a unit's outcome becomes final.
///
/// Receives the post-execution [`ScenarioContext`], absent when the runner
/// panicked before producing one.
pub(crate) type Continuation = Box<dyn FnOnce(Option<ScenarioContext>) + Send>;

/// Interpreter seam: executes the steps of a single scenario.
///
/// The scheduler never interprets steps itself; it only decides whether and
/// where a [`ScenarioRunner`] is invoked.
pub trait ScenarioRunner: Send + Sync {
    /// Runs the given `scenario` to completion, returning its outcome.
    fn run_scenario(&self, scenario: &gherkin::Scenario) -> ScenarioOutcome;
}

/// Everything a [`ScenarioRunner`] hands back for one scenario run.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Pass/fail outcome of the run.
    pub status: Status,

    /// Post-execution context of the run.
    pub context: ScenarioContext,
}

impl ScenarioOutcome {
    /// Creates a passed [`ScenarioOutcome`] out of the given `context`.
    #[must_use]
    pub fn passed(context: ScenarioContext) -> Self {
        Self { status: Status::Passed, context }
    }

    /// Creates a failed [`ScenarioOutcome`] out of the given `context`.
    #[must_use]
    pub fn failed(error: impl Into<String>, context: ScenarioContext) -> Self {
        Self { status: Status::Failed { error: error.into() }, context }
    }
}

/// One scenario's execution handle: the scenario itself, its effective tags,
/// a single-shot result slot and a single-shot completion continuation.
///
/// Created once per scheduler initialization and mutated by at most one
/// thread at a time (the thread that runs it).
pub struct ScenarioUnit {
    /// The scenario this unit runs.
    scenario: gherkin::Scenario,

    /// Effective tags of the scenario.
    tags: TagSet,

    /// Result slot, transitioning at most once from empty/pre-filled to
    /// final.
    result: OnceCell<ScenarioResult>,

    /// Completion continuation, taken exactly once.
    next: Mutex<Option<Continuation>>,
}

impl ScenarioUnit {
    /// Creates a new [`ScenarioUnit`] for the given `scenario`.
    pub(crate) fn new(scenario: gherkin::Scenario, tags: TagSet) -> Self {
        Self {
            scenario,
            tags,
            result: OnceCell::new(),
            next: Mutex::new(None),
        }
    }

    /// The scenario this unit runs.
    #[must_use]
    pub fn scenario(&self) -> &gherkin::Scenario {
        &self.scenario
    }

    /// Effective tags of the scenario.
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Final result of this unit, if one has been recorded yet.
    #[must_use]
    pub fn result(&self) -> Option<&ScenarioResult> {
        self.result.get()
    }

    /// Pre-fills the result slot with a failed result, short-circuiting any
    /// later execution of this unit.
    ///
    /// Used when a shared precondition (like a background) already failed the
    /// scenario before it was reached. Returns `false` if a result was
    /// recorded already.
    pub fn fail(&self, error: impl Into<String>) -> bool {
        self.result
            .set(ScenarioResult::failed(
                self.scenario.name.clone(),
                self.scenario.position.line,
                error,
            ))
            .is_ok()
    }

    /// Installs the completion continuation, replacing any previous one.
    pub(crate) fn set_next(&self, next: Continuation) {
        *self.next.lock() = Some(next);
    }

    /// Executes this unit synchronously on the calling thread.
    ///
    /// A panicking `runner` is caught and converted into a failed result, so
    /// the completion continuation fires on every path.
    pub(crate) fn run(&self, runner: &dyn ScenarioRunner) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            runner.run_scenario(&self.scenario)
        }));

        let (result, context) = match outcome {
            Ok(outcome) => (
                ScenarioResult {
                    name: self.scenario.name.clone(),
                    line: self.scenario.position.line,
                    status: outcome.status,
                    vars: outcome.context.vars.clone(),
                },
                Some(outcome.context),
            ),
            Err(payload) => (
                ScenarioResult::failed(
                    self.scenario.name.clone(),
                    self.scenario.position.line,
                    panic_message(payload.as_ref()),
                ),
                None,
            ),
        };

        // The slot may have been pre-filled by a failed precondition.
        _ = self.result.set(result);

        if let Some(next) = self.next.lock().take() {
            next(context);
        }
    }
}

/// Renders a panic payload into a displayable message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload.downcast_ref::<String>().cloned().unwrap_or_else(|| {
        payload
            .downcast_ref::<&str>()
            .map_or_else(|| "opaque panic payload".to_owned(), |s| (*s).to_owned())
    })
}
