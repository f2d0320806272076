// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Feature discovery: locating and parsing `.feature` files.

use std::path::Path;

use derive_more::{Display, Error, From};

/// Error of [`load()`]ing features from a filesystem path.
#[derive(Debug, Display, Error, From)]
pub enum LoadError {
    /// Failed to resolve the given path.
    #[display(fmt = "failed to resolve path: {}", _0)]
    Io(std::io::Error),

    /// Failed to build the `.feature` files walker.
    #[display(fmt = "failed to walk features: {}", _0)]
    Walk(globwalk::GlobError),

    /// A `.feature` file failed to parse.
    #[display(fmt = "failed to parse feature: {}", _0)]
    Parse(gherkin::ParseFileError),
}

/// Loads all the [`gherkin::Feature`]s at the given `path`.
///
/// A file is parsed directly; a directory is walked recursively for
/// case-insensitive `*.feature` files.
///
/// # Errors
///
/// See [`LoadError`] for details.
pub fn load<I: AsRef<Path>>(
    path: I,
) -> Result<Vec<gherkin::Feature>, LoadError> {
    let path = path.as_ref().canonicalize()?;

    if path.is_file() {
        let env = gherkin::GherkinEnv::default();
        return Ok(vec![gherkin::Feature::parse_path(path, env)?]);
    }

    let walker = globwalk::GlobWalkerBuilder::new(path, "*.feature")
        .case_insensitive(true)
        .build()?;
    walker
        .filter_map(Result::ok)
        .map(|entry| {
            let env = gherkin::GherkinEnv::default();
            gherkin::Feature::parse_path(entry.path(), env).map_err(Into::into)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write as _};

    use super::*;

    const FEATURE: &str = "\
Feature: Parsed
  Scenario: First
    Given a step
  Scenario: Second
    Given a step
";

    #[test]
    fn loads_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed.feature");
        fs::File::create(&path)
            .and_then(|mut f| f.write_all(FEATURE.as_bytes()))
            .unwrap();

        let features = load(&path).unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name, "Parsed");
        assert_eq!(features[0].scenarios.len(), 2);
    }

    #[test]
    fn walks_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.feature", "b.FEATURE"] {
            fs::File::create(dir.path().join(name))
                .and_then(|mut f| f.write_all(FEATURE.as_bytes()))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not a feature").unwrap();

        let features = load(dir.path()).unwrap();

        assert_eq!(features.len(), 2);
    }

    #[test]
    fn missing_path_is_an_io_error() {
        let err = load("definitely/not/here").unwrap_err();

        assert!(matches!(err, LoadError::Io(_)));
    }
}
