// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./benchmarks_test.rs"]
mod benchmarks_test;

use ahash::HashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Whether a config key is a latency histogram toggle. Newer servers use
/// "enable-benchmarks-*", older ones "enable-hist-*".
#[must_use]
pub fn is_latency_toggle(key: &str) -> bool {
  key.contains("enable-benchmarks-") || key.contains("enable-hist-")
}

//
// LatencySubscriptions
//

/// Registry of the latency histogram benchmarks currently enabled on a node,
/// shared by every processor in the process. Each entry maps a toggle config
/// key to the subcommand a latency fetcher issues to pull that histogram.
/// Clones share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct LatencySubscriptions {
  subscriptions: Arc<Mutex<HashMap<String, String>>>,
}

impl LatencySubscriptions {
  /// Records the observed state of one toggle key. Enabling inserts the
  /// key with its derived fetch subcommand, disabling removes it. The
  /// subcommand is the key minus the "enable-" token, minus any "hist-"
  /// token; the fetch command does not expect either prefix.
  pub fn observe_toggle(&self, key: &str, enabled: bool) {
    if enabled {
      let subcommand = key.replace("enable-", "").replace("hist-", "");
      self
        .subscriptions
        .lock()
        .insert(key.to_string(), subcommand);
    } else {
      self.subscriptions.lock().remove(key);
    }
  }

  #[must_use]
  pub fn is_subscribed(&self, key: &str) -> bool {
    self.subscriptions.lock().contains_key(key)
  }

  /// Snapshot of key to fetch subcommand, for the latency fetch collaborator.
  #[must_use]
  pub fn snapshot(&self) -> HashMap<String, String> {
    self.subscriptions.lock().clone()
  }
}
