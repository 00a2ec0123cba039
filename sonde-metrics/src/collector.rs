// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./collector_test.rs"]
mod collector_test;

use crate::processors::{
  DynamicStatProcessor,
  KEY_BUILD,
  KEY_CLUSTER_NAME,
  KEY_SERVICE,
  ProcessorFactoryContext,
  StatProcessor,
  build_processor,
};
use crate::protos::info::RawInfo;
use crate::protos::stat::{Stat, StatDomain};
use async_trait::async_trait;
use prometheus::IntCounter;
use sonde_common::stats::Scope;
use std::sync::Arc;

// Appended to every request so each processor can label its stats with the
// node identity.
const IDENTITY_KEYS: [&str; 3] = [KEY_CLUSTER_NAME, KEY_SERVICE, KEY_BUILD];

//
// InfoSource
//

/// Anything that can answer a batch of info protocol commands against one
/// node, returning the raw response per command.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InfoSource: Send + Sync {
  async fn request_info(&self, keys: &[String]) -> anyhow::Result<RawInfo>;
}

//
// CollectorStats
//

struct CollectorStats {
  request_failure: IntCounter,
  refresh_failure: IntCounter,
  cycle_complete: IntCounter,
}

impl CollectorStats {
  fn new(scope: &Scope) -> Self {
    Self {
      request_failure: scope.counter("request_failure"),
      refresh_failure: scope.counter("refresh_failure"),
      cycle_complete: scope.counter("cycle_complete"),
    }
  }
}

//
// NodeCollector
//

/// Drives every registered processor through the two request phases against a
/// single node and gathers the refreshed stats.
pub struct NodeCollector {
  source: Arc<dyn InfoSource>,
  processors: Vec<DynamicStatProcessor>,
  stats: CollectorStats,
}

impl NodeCollector {
  #[must_use]
  pub fn new(source: Arc<dyn InfoSource>, context: ProcessorFactoryContext) -> Self {
    let stats = CollectorStats::new(&context.scope.scope("collector"));
    let processors = StatDomain::ALL
      .into_iter()
      .map(|domain| build_processor(domain, context.clone()))
      .collect();
    Self {
      source,
      processors,
      stats,
    }
  }

  /// One full poll of the node. Each processor probes, derives its second
  /// phase command batch, fetches it and refreshes. A failure in one
  /// processor's cycle does not stop the others.
  pub async fn run_cycle(&mut self) -> Vec<Stat> {
    let mut all = Vec::new();
    for processor in &mut self.processors {
      let mut keys = processor.phase_one_keys();
      extend_identity(&mut keys);
      let phase_one = match self.source.request_info(&keys).await {
        Ok(phase_one) => phase_one,
        Err(e) => {
          log::warn!("phase one request failed: {e}");
          self.stats.request_failure.inc();
          continue;
        },
      };

      let mut plan = processor.phase_two_keys(&phase_one);
      extend_identity(&mut plan.keys);
      let raw = match self.source.request_info(&plan.keys).await {
        Ok(raw) => raw,
        Err(e) => {
          log::warn!("phase two request failed: {e}");
          self.stats.request_failure.inc();
          continue;
        },
      };

      match processor.refresh(&plan, &raw) {
        Ok(stats) => {
          all.extend(stats);
          self.stats.cycle_complete.inc();
        },
        Err(e) => {
          log::warn!("processor refresh failed: {e}");
          self.stats.refresh_failure.inc();
        },
      }
    }

    all
  }
}

fn extend_identity(keys: &mut Vec<String>) {
  keys.extend(IDENTITY_KEYS.iter().map(ToString::to_string));
}
