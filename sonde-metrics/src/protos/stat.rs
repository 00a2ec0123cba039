// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./stat_test.rs"]
mod stat_test;

use std::fmt::{self, Display};

//
// StatDomain
//

/// The stat domains a node can be polled for. Each domain gets its own
/// processor instance per node, with an independent metric cache.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StatDomain {
  Node,
}

impl StatDomain {
  pub const ALL: [Self; 1] = [Self::Node];

  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Node => "node",
    }
  }
}

impl Display for StatDomain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

//
// Stat
//

/// One observed time series, owned by exactly one processor instance. Created
/// once on first observation of its cache key and updated in place on every
/// later observation, so the exposition writer always sees a stable identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Stat {
  domain: StatDomain,
  name: String,
  allowed: bool,
  value: f64,
  label_names: Vec<String>,
  label_values: Vec<String>,
}

impl Stat {
  #[must_use]
  pub fn new(domain: StatDomain, name: &str, allowed: bool) -> Self {
    Self {
      domain,
      name: name.to_string(),
      allowed,
      value: 0.0,
      label_names: Vec::new(),
      label_values: Vec::new(),
    }
  }

  /// Replaces the observed value and label set in place. Names and values
  /// correspond positionally and must have the same length.
  pub fn update_values(&mut self, value: f64, label_names: Vec<String>, label_values: Vec<String>) {
    debug_assert_eq!(label_names.len(), label_values.len());
    self.value = value;
    self.label_names = label_names;
    self.label_values = label_values;
  }

  #[must_use]
  pub const fn domain(&self) -> StatDomain {
    self.domain
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Whether the allow/block filter admitted this stat. Fixed when the stat
  /// is first cached, never recomputed.
  #[must_use]
  pub const fn allowed(&self) -> bool {
    self.allowed
  }

  #[must_use]
  pub const fn value(&self) -> f64 {
    self.value
  }

  #[must_use]
  pub fn label_names(&self) -> &[String] {
    &self.label_names
  }

  #[must_use]
  pub fn label_values(&self) -> &[String] {
    &self.label_values
  }
}

impl Display for Stat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}={}", self.domain, self.name, self.value)
  }
}
