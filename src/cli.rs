// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI (command line interface) options for scenario selection and
//! concurrency.

use clap::Parser;
use gherkin::tagexpr::TagOperation;

/// CLI options applied onto an [`ExecutionContext`] via
/// [`ExecutionContext::with_cli()`].
///
/// [`ExecutionContext`]: crate::ExecutionContext
/// [`ExecutionContext::with_cli()`]: crate::ExecutionContext::with_cli
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "dill", about = "Schedules and runs feature scenarios")]
pub struct Opts {
    /// Regex to filter scenarios by their name.
    #[arg(
        id = "name",
        long = "name",
        short = 'n',
        value_name = "regex",
        visible_alias = "scenario-name"
    )]
    pub name: Option<String>,

    /// Tag expression to filter scenarios by.
    ///
    /// Note: Tags from Feature, Rule and Scenario are merged together on
    /// filtering, so be careful about conflicting tags on different levels.
    #[arg(
        id = "tags",
        long = "tags",
        short = 't',
        value_name = "tagexpr",
        conflicts_with = "name"
    )]
    pub tags: Option<TagOperation>,

    /// Number of scenarios to run concurrently.
    ///
    /// Absent or zero keeps every scenario on the dispatching thread.
    #[arg(long = "workers", short = 'w', value_name = "int")]
    pub workers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filters() {
        let opts = Opts::try_parse_from([
            "dill", "--tags", "@smoke and not @wip", "--workers", "4",
        ])
        .unwrap();

        assert!(opts.name.is_none());
        assert!(opts.tags.is_some());
        assert_eq!(opts.workers, Some(4));
    }

    #[test]
    fn name_and_tags_conflict() {
        let err = Opts::try_parse_from([
            "dill", "--name", "Login.*", "--tags", "@smoke",
        ])
        .unwrap_err();

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn defaults_to_no_filtering() {
        let opts = Opts::try_parse_from(["dill"]).unwrap();

        assert!(opts.name.is_none());
        assert!(opts.tags.is_none());
        assert!(opts.workers.is_none());
    }
}
