// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./name_list_test.rs"]
mod name_list_test;

use crate::protos::stat::StatDomain;
use serde::Deserialize;

//
// NameListConfig
//

/// Allow/block lists for one stat domain. Patterns are exact names or prefix
/// globs with a trailing '*'. An empty allowlist admits every name that the
/// blocklist does not reject; the blocklist always wins.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NameListConfig {
  pub allowlist: Vec<String>,
  pub blocklist: Vec<String>,
}

//
// FilterConfig
//

/// Per-domain name lists, loaded by the embedding process and consumed here.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterConfig {
  pub node: NameListConfig,
}

//
// NameFilter
//

/// Decides whether a (domain, metric name) pair is eligible for emission.
/// Callers cache the decision per name for the lifetime of a processor, so
/// list changes only affect names seen for the first time afterwards.
pub struct NameFilter {
  config: FilterConfig,
}

impl NameFilter {
  #[must_use]
  pub const fn new(config: FilterConfig) -> Self {
    Self { config }
  }

  #[must_use]
  pub fn allow(&self, domain: StatDomain, name: &str) -> bool {
    let lists = match domain {
      StatDomain::Node => &self.config.node,
    };

    if matches_any(&lists.blocklist, name) {
      return false;
    }
    lists.allowlist.is_empty() || matches_any(&lists.allowlist, name)
  }
}

fn matches_any(patterns: &[String], name: &str) -> bool {
  patterns.iter().any(|pattern| {
    pattern
      .strip_suffix('*')
      .map_or_else(|| pattern == name, |prefix| name.starts_with(prefix))
  })
}
