// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scheduling faults.

use derive_more::{Display, Error};

/// Fault raised while scheduling a feature's scenarios.
///
/// This is distinct from a scenario-level failure: a failing scenario is an
/// ordinary failed [`ScenarioResult`] and never surfaces here. A
/// [`SchedulingError`] means the dispatch machinery itself couldn't proceed.
///
/// [`ScenarioResult`]: crate::ScenarioResult
#[derive(Debug, Display, Error)]
pub enum SchedulingError {
    /// The configured call-name filter is not a valid regex.
    ///
    /// Surfaces lazily, at the point scenario units are materialized.
    #[display(fmt = "invalid call name pattern `{}`: {}", pattern, source)]
    InvalidCallName {
        /// Pattern as configured on the [`ExecutionContext`].
        ///
        /// [`ExecutionContext`]: crate::ExecutionContext
        pattern: String,

        /// Parse failure reported by [`regex`].
        source: regex::Error,
    },

    /// The dispatch loop panicked.
    #[display(fmt = "scenario dispatch panicked: {}", message)]
    Panicked {
        /// Rendered panic payload.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_invalid_call_name() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = SchedulingError::InvalidCallName {
            pattern: "(".to_owned(),
            source,
        };

        assert!(err.to_string().starts_with("invalid call name pattern `(`"));
    }

    #[test]
    fn renders_panicked() {
        let err = SchedulingError::Panicked { message: "boom".to_owned() };

        assert_eq!(err.to_string(), "scenario dispatch panicked: boom");
    }
}
