// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Effective tag sets and [`TagOperation`] evaluation.

use std::fmt;

use derive_more::Deref;
use gherkin::tagexpr::TagOperation;
use itertools::Itertools as _;
use sealed::sealed;

/// Extension of a [`TagOperation`] allowing to evaluate it.
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags`.
    ///
    /// Tags are compared with the leading `@` stripped, so selectors work the
    /// same whether the parsed tags kept it or not.
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => tags
                .into_iter()
                .any(|tag| strip_at(tag.as_ref()) == strip_at(t)),
        }
    }
}

/// Effective tags of one [`Scenario`]: its own tags, then the tags of its
/// enclosing [`Rule`] (if any), then the [`Feature`]'s tags, merged in that
/// order.
///
/// [`Feature`]: gherkin::Feature
/// [`Rule`]: gherkin::Rule
/// [`Scenario`]: gherkin::Scenario
#[derive(Clone, Debug, Deref)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Computes the effective [`TagSet`] of the given `scenario`.
    #[must_use]
    pub fn effective(
        feature: &gherkin::Feature,
        rule: Option<&gherkin::Rule>,
        scenario: &gherkin::Scenario,
    ) -> Self {
        Self(
            scenario
                .tags
                .iter()
                .chain(rule.iter().flat_map(|r| &r.tags))
                .chain(&feature.tags)
                .cloned()
                .collect(),
        )
    }

    /// Evaluates the given `selector` against this [`TagSet`].
    #[must_use]
    pub fn evaluate(&self, selector: &TagOperation) -> bool {
        selector.eval(self.0.iter())
    }

    /// Indicates whether this [`TagSet`] contains the named tag, with or
    /// without its leading `@`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|tag| strip_at(tag) == strip_at(name))
    }

    /// Collects the [`Values`] declared for the given `key` by tags of the
    /// `@key=value` (or `@key=v1,v2`) form.
    ///
    /// This is how per-scenario overrides are queried, like the `parallel`
    /// one: `values_for("parallel").is_any_of(["false"])`.
    #[must_use]
    pub fn values_for(&self, key: &str) -> Values {
        Values(
            self.0
                .iter()
                .filter_map(|tag| strip_at(tag).split_once('='))
                .filter(|(k, _)| *k == strip_at(key))
                .flat_map(|(_, vals)| vals.split(','))
                .map(|val| val.trim().to_owned())
                .collect(),
        )
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(", "))
    }
}

/// Values declared for one tag key.
#[derive(Clone, Debug, Default)]
pub struct Values(Vec<String>);

impl Values {
    /// Indicates whether any of the `candidates` was declared as a value.
    #[must_use]
    pub fn is_any_of<I, S>(&self, candidates: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        candidates
            .into_iter()
            .any(|c| self.0.iter().any(|val| val == c.as_ref()))
    }

    /// Indicates whether no values were declared at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strips the leading `@` off a tag, if present.
fn strip_at(tag: &str) -> &str {
    tag.strip_prefix('@').unwrap_or(tag)
}
