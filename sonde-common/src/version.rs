// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./version_test.rs"]
mod version_test;

use thiserror::Error;

//
// VersionError
//

#[derive(Error, Debug, Eq, PartialEq)]
pub enum VersionError {
  #[error("empty version string")]
  Empty,
  #[error("invalid version component {0:?}")]
  InvalidComponent(String),
}

/// Parses a dotted-numeric version string ("8.1.0.0") into its integer
/// components. Build strings with non-numeric components (release candidates,
/// etc.) are errors, which callers treat as a feature downgrade rather than a
/// failure.
pub fn parse_dotted(version: &str) -> Result<Vec<u64>, VersionError> {
  if version.is_empty() {
    return Err(VersionError::Empty);
  }

  version
    .split('.')
    .map(|component| {
      component
        .parse::<u64>()
        .map_err(|_| VersionError::InvalidComponent(component.to_string()))
    })
    .collect()
}

/// Compares two dotted-numeric versions component by component. Missing
/// trailing components are treated as 0, so "8.1" >= "8.1.0.0" holds.
pub fn at_least(version: &str, minimum: &str) -> Result<bool, VersionError> {
  let lhs = parse_dotted(version)?;
  let rhs = parse_dotted(minimum)?;
  for i in 0 .. lhs.len().max(rhs.len()) {
    let l = lhs.get(i).copied().unwrap_or(0);
    let r = rhs.get(i).copied().unwrap_or(0);
    if l != r {
      return Ok(l > r);
    }
  }
  Ok(true)
}
