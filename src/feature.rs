// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`gherkin::Feature`] extension.

use sealed::sealed;

/// Helper methods to operate on [`gherkin::Feature`]s.
#[sealed]
pub trait Ext {
    /// All the [`Feature`]'s [`Scenario`]s in declaration order, each paired
    /// with its enclosing [`Rule`], if any.
    ///
    /// Top-level [`Scenario`]s come first, then the ones nested into
    /// [`Rule`]s, the way they're written down.
    ///
    /// [`Feature`]: gherkin::Feature
    /// [`Rule`]: gherkin::Rule
    /// [`Scenario`]: gherkin::Scenario
    #[must_use]
    fn all_scenarios(
        &self,
    ) -> Vec<(Option<&gherkin::Rule>, &gherkin::Scenario)>;

    /// Counts all the [`Feature`]'s [`Scenario`]s, including [`Rule`]s
    /// inside.
    ///
    /// [`Feature`]: gherkin::Feature
    /// [`Rule`]: gherkin::Rule
    /// [`Scenario`]: gherkin::Scenario
    #[must_use]
    fn count_scenarios(&self) -> usize;

    /// Identity of this [`Feature`] for diagnostics: its path when known,
    /// its name otherwise.
    ///
    /// [`Feature`]: gherkin::Feature
    #[must_use]
    fn display_name(&self) -> String;
}

#[sealed]
impl Ext for gherkin::Feature {
    fn all_scenarios(
        &self,
    ) -> Vec<(Option<&gherkin::Rule>, &gherkin::Scenario)> {
        self.scenarios
            .iter()
            .map(|s| (None, s))
            .chain(self.rules.iter().flat_map(|r| {
                r.scenarios.iter().map(move |s| (Some(r), s))
            }))
            .collect()
    }

    fn count_scenarios(&self) -> usize {
        self.scenarios.len()
            + self.rules.iter().map(|r| r.scenarios.len()).sum::<usize>()
    }

    fn display_name(&self) -> String {
        self.path
            .as_deref()
            .map_or_else(|| self.name.clone(), |p| p.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(name: &str, line: usize) -> gherkin::Scenario {
        gherkin::Scenario {
            tags: vec![],
            keyword: "Scenario".to_owned(),
            name: name.to_owned(),
            span: gherkin::Span { start: 0, end: 0 },
            position: gherkin::LineCol { line, col: 1 },
            description: None,
            steps: vec![],
            examples: vec![],
        }
    }

    fn feature_with_rule() -> gherkin::Feature {
        gherkin::Feature {
            tags: vec![],
            keyword: "Feature".to_owned(),
            name: "ordering".to_owned(),
            span: gherkin::Span { start: 0, end: 0 },
            position: gherkin::LineCol { line: 1, col: 1 },
            path: None,
            description: None,
            background: None,
            scenarios: vec![scenario("first", 2), scenario("second", 5)],
            rules: vec![gherkin::Rule {
                keyword: "Rule".to_owned(),
                name: "nested".to_owned(),
                description: None,
                background: None,
                scenarios: vec![scenario("third", 9)],
                tags: vec!["ruled".to_owned()],
                span: gherkin::Span { start: 0, end: 0 },
                position: gherkin::LineCol { line: 8, col: 1 },
            }],
        }
    }

    #[test]
    fn all_scenarios_keeps_declaration_order() {
        let feature = feature_with_rule();
        let scenarios = feature.all_scenarios();

        assert_eq!(
            scenarios.iter().map(|(_, s)| s.name.as_str()).collect::<Vec<_>>(),
            ["first", "second", "third"],
        );
        assert!(scenarios[2].0.is_some());
    }

    #[test]
    fn counts_rule_scenarios_too() {
        assert_eq!(feature_with_rule().count_scenarios(), 3);
    }

    #[test]
    fn display_name_prefers_path() {
        let mut feature = feature_with_rule();
        assert_eq!(feature.display_name(), "ordering");

        feature.path = Some("features/ordering.feature".into());
        assert_eq!(feature.display_name(), "features/ordering.feature");
    }
}
