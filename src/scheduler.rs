// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-feature scenario scheduling.
//!
//! A [`FeatureScheduler`] owns the ordered [`ScenarioUnit`] list of one
//! feature, applies the context's name/tag/call-tag filters, dispatches each
//! selected unit either inline on the dispatching thread or onto the worker
//! pool, awaits every outcome, and flushes results to the context's
//! [`ResultSink`] in declaration order regardless of completion timing.
//!
//! [`ResultSink`]: crate::ResultSink

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, error, info, trace, warn};

use crate::{
    context::ExecutionContext,
    error::SchedulingError,
    feature::Ext as _,
    latch::CountdownLatch,
    result::{ScenarioContext, ScenarioResult},
    tag::TagSet,
    unit::{panic_message, ScenarioUnit},
};

/// Continuation invoked once a whole feature run is over.
type Next = Box<dyn FnOnce() + Send>;

/// Scheduler of one feature's scenarios.
///
/// Decides which scenarios run, whether each runs inline or concurrently,
/// waits for all outcomes and hands the context's [`ResultSink`] a
/// deterministically ordered result set plus the variable state of the
/// scenario that finished last.
///
/// One instance drives one run: [`run()`] is not re-entrant for the same
/// [`FeatureScheduler`].
///
/// [`ResultSink`]: crate::ResultSink
/// [`run()`]: FeatureScheduler::run
pub struct FeatureScheduler {
    /// Configuration of this feature run.
    exec: Arc<ExecutionContext>,

    /// State materialized by [`FeatureScheduler::init()`].
    state: OnceCell<RunState>,

    /// Register of the most recently completed scenario's context.
    last_completed: Arc<LastCompleted>,

    /// Continuation to invoke once the run is over, no matter how it went.
    next: Mutex<Option<Next>>,

    /// Scheduling fault suppressed by [`FeatureScheduler::run()`], if any.
    fault: OnceCell<SchedulingError>,
}

/// Everything [`FeatureScheduler::init()`] materializes for one run.
struct RunState {
    /// Scenario units in declaration order.
    units: Vec<Arc<ScenarioUnit>>,

    /// Latch counting one signal per unit, on every path.
    latch: Arc<CountdownLatch>,

    /// Compiled call-name filter.
    name_filter: Option<Regex>,
}

/// Register holding the context of the most recently completed unit.
///
/// Overwritten on every completion. Under concurrent execution multiple
/// workers race for it, and the surviving value is whichever write happened
/// last: intentional last-writer-wins, not "last in declaration order".
#[derive(Default)]
struct LastCompleted(Mutex<Option<ScenarioContext>>);

impl LastCompleted {
    /// Records the given `context` as the most recently completed one.
    fn record(&self, context: ScenarioContext) {
        *self.0.lock() = Some(context);
    }

    /// Takes the recorded context out of this register.
    fn take(&self) -> Option<ScenarioContext> {
        self.0.lock().take()
    }
}

impl FeatureScheduler {
    /// Creates a new [`FeatureScheduler`] for the given context.
    #[must_use]
    pub fn new(exec: ExecutionContext) -> Self {
        Self {
            exec: Arc::new(exec),
            state: OnceCell::new(),
            last_completed: Arc::new(LastCompleted::default()),
            next: Mutex::new(None),
            fault: OnceCell::new(),
        }
    }

    /// Configuration of this feature run.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.exec
    }

    /// Materializes the ordered [`ScenarioUnit`] list, compiles the
    /// call-name filter and allocates the completion latch.
    ///
    /// Idempotent: a second call does nothing. Invoked implicitly by
    /// [`run()`](FeatureScheduler::run) when never called explicitly.
    ///
    /// # Errors
    ///
    /// [`SchedulingError::InvalidCallName`], if the context's call-name
    /// filter is not a valid regex.
    pub fn init(&self) -> Result<(), SchedulingError> {
        self.state().map(drop)
    }

    /// Registers a continuation to invoke unconditionally after
    /// [`run()`](FeatureScheduler::run) finishes, successfully or not.
    pub fn set_next(&self, next: impl FnOnce() + Send + 'static) {
        *self.next.lock() = Some(Box::new(next));
    }

    /// Scenario units materialized by [`init()`](FeatureScheduler::init), or
    /// [`None`] before initialization.
    #[must_use]
    pub fn scenario_units(&self) -> Option<&[Arc<ScenarioUnit>]> {
        self.state.get().map(|s| s.units.as_slice())
    }

    /// Fault suppressed by the last [`run()`](FeatureScheduler::run), if
    /// any.
    #[must_use]
    pub fn fault(&self) -> Option<&SchedulingError> {
        self.fault.get()
    }

    /// Runs the feature: filters, dispatches, awaits and aggregates.
    ///
    /// Scheduling faults (including panics escaping the dispatch loop) are
    /// logged with the feature's identity, retained in
    /// [`fault()`](FeatureScheduler::fault) and swallowed, so one malformed
    /// feature cannot abort a batch of independent feature runs. The
    /// continuation registered with [`set_next()`](FeatureScheduler::set_next)
    /// is invoked on every path.
    pub fn run(&self) {
        let _next = NextGuard(self.next.lock().take());
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch()))
            .unwrap_or_else(|payload| {
                Err(SchedulingError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });

        if let Err(e) = outcome {
            error!(
                feature = %self.exec.display_name(),
                error = %e,
                "feature failed"
            );
            _ = self.fault.set(e);
        }

        debug!(
            feature = %self.exec.display_name(),
            elapsed = %humantime::format_duration(started.elapsed()),
            "feature finished"
        );
    }

    /// The dispatch loop: one pass over the units in declaration order.
    fn dispatch(&self) -> Result<(), SchedulingError> {
        let state = self.state()?;
        let exec = &self.exec;
        let mut ordered = Vec::with_capacity(state.units.len());
        let mut submitted = false;

        for unit in &state.units {
            let scenario = unit.scenario();
            let line = scenario.position.line;

            if let Some(filter) = &state.name_filter {
                if !filter.is_match(&scenario.name) {
                    info!(
                        line,
                        name = %scenario.name,
                        needed = %filter,
                        "skipping scenario"
                    );
                    state.latch.count_down();
                    continue;
                }
                info!(line, name = %scenario.name, "found scenario");
            }

            let tags = unit.tags();
            if let Some(selector) = exec.tag_selector() {
                if !tags.evaluate(selector) {
                    trace!(line, %tags, "skipping scenario with tags effective");
                    state.latch.count_down();
                    continue;
                }
            }

            if let Some(call_tag) = exec.call_tag() {
                if !tags.contains(call_tag) {
                    trace!(line, call_tag, "skipping scenario called by tag");
                    state.latch.count_down();
                    continue;
                }
                info!(line, call_tag, "scenario called by tag");
            }

            // Buffering the unit before it executes is what retains the
            // declaration order of results, even for scenarios running in
            // parallel and finishing out of order.
            ordered.push(Arc::clone(unit));

            if unit.result().is_some_and(ScenarioResult::is_failed) {
                // Pre-failed by a shared precondition: the recorded result
                // stands.
                state.latch.count_down();
                continue;
            }

            let latch = Arc::clone(&state.latch);
            let last_completed = Arc::clone(&self.last_completed);
            unit.set_next(Box::new(move |context| {
                // Record before signaling, so the dispatching thread cannot
                // pass the latch and find an empty register.
                if let Some(context) = context {
                    last_completed.record(context);
                }
                latch.count_down();
            }));

            let sequential = exec.pool().is_none()
                || tags.values_for("parallel").is_any_of(["false"]);
            match exec.pool().filter(|_| !sequential) {
                Some(pool) => {
                    let unit = Arc::clone(unit);
                    let runner = Arc::clone(exec.runner());
                    pool.submit(Box::new(move || unit.run(&*runner)));
                    submitted = true;
                }
                None => unit.run(&**exec.runner()),
            }
        }

        if submitted {
            state.latch.wait();
        }

        for unit in &ordered {
            match unit.result() {
                Some(result) => exec.sink().add_result(result.clone()),
                // Every selected unit records a result before signaling, so
                // a missing one means its pool dropped the job on the floor.
                None => warn!(
                    name = %unit.scenario().name,
                    "scenario finished without a result"
                ),
            }
        }

        if let Some(context) = self.last_completed.take() {
            exec.sink().set_result_vars(context.vars.clone());
            context.invoke_after_hook();
        }

        Ok(())
    }

    /// Materialized state of this run, initialized on first access.
    fn state(&self) -> Result<&RunState, SchedulingError> {
        self.state.get_or_try_init(|| {
            let name_filter = self
                .exec
                .call_name()
                .map(|pattern| {
                    // Whole-name semantics: a caller invoking a scenario by
                    // name expects `Login` not to select `Login again`.
                    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                        SchedulingError::InvalidCallName {
                            pattern: pattern.to_owned(),
                            source,
                        }
                    })
                })
                .transpose()?;

            let feature = self.exec.feature();
            let units: Vec<_> = feature
                .all_scenarios()
                .into_iter()
                .map(|(rule, scenario)| {
                    let tags = TagSet::effective(feature, rule, scenario);
                    Arc::new(ScenarioUnit::new(scenario.clone(), tags))
                })
                .collect();
            let latch = Arc::new(CountdownLatch::new(units.len()));

            Ok(RunState { units, latch, name_filter })
        })
    }
}

/// Scoped "always run the continuation" obligation: fires on [`Drop`], so
/// the chain continues whether the run completed, faulted or panicked.
struct NextGuard(Option<Next>);

impl Drop for NextGuard {
    fn drop(&mut self) {
        if let Some(next) = self.0.take() {
            next();
        }
    }
}
