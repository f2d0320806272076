// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-feature scenario scheduling for [`gherkin`] test suites.
//!
//! Given one parsed feature, a [`FeatureScheduler`] decides which scenarios
//! run (name, tag-selector and call-tag filtering), whether each one runs
//! inline on the dispatching thread or concurrently on a worker pool, awaits
//! every outcome, and aggregates results in declaration order regardless of
//! completion timing. The variable state of the scenario that finished last
//! is exported as the caller-visible result of the feature.
//!
//! Step interpretation, tag-expression grammar and report serialization stay
//! behind collaborator seams: a [`ScenarioRunner`] executes scenarios, a
//! [`gherkin::tagexpr::TagOperation`] selects them, and a [`ResultSink`]
//! receives the aggregate.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dill::{
//!     ExecutionContext, FeatureResult, FeatureScheduler, ScenarioContext,
//!     ScenarioOutcome, ScenarioRunner, ThreadPool, Vars,
//! };
//!
//! struct NoopRunner;
//!
//! impl ScenarioRunner for NoopRunner {
//!     fn run_scenario(
//!         &self,
//!         _: &dill::gherkin::Scenario,
//!     ) -> ScenarioOutcome {
//!         ScenarioOutcome::passed(ScenarioContext::new(Vars::new()))
//!     }
//! }
//!
//! # fn main() -> Result<(), dill::parser::LoadError> {
//! let pool = Arc::new(ThreadPool::new(4));
//! for feature in dill::parser::load("tests/features")? {
//!     let result = Arc::new(FeatureResult::new());
//!     let exec = ExecutionContext::new(
//!         feature,
//!         Arc::new(NoopRunner),
//!         result.clone(),
//!     )
//!     .with_pool(pool.clone());
//!
//!     let scheduler = FeatureScheduler::new(exec);
//!     scheduler.run();
//!     assert!(!result.is_failed());
//! }
//! # Ok(())
//! # }
//! ```

pub use gherkin;

pub mod cli;
mod context;
mod error;
pub mod feature;
mod latch;
pub mod parser;
pub mod pool;
pub mod result;
mod scheduler;
pub mod tag;
mod unit;

pub use self::{
    context::ExecutionContext,
    error::SchedulingError,
    latch::CountdownLatch,
    pool::{Job, ScenarioPool, ThreadPool},
    result::{
        AfterHook, FeatureResult, ResultSink, ScenarioContext, ScenarioResult,
        Status, Vars,
    },
    scheduler::FeatureScheduler,
    tag::TagSet,
    unit::{ScenarioOutcome, ScenarioRunner, ScenarioUnit},
};
