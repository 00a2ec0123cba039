// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

use self::node::NodeProcessor;
use crate::benchmarks::LatencySubscriptions;
use crate::filters::name_list::{FilterConfig, NameFilter};
use crate::protos::info::RawInfo;
use crate::protos::stat::{Stat, StatDomain};
use serde::Deserialize;
use sonde_common::stats::Scope;
use std::sync::Arc;

pub mod node;

// Identity commands the collector folds into every request batch. Their
// responses carry the label values and the feature-gate version every
// processor needs.
pub const KEY_BUILD: &str = "build";
pub const KEY_CLUSTER_NAME: &str = "cluster-name";
pub const KEY_SERVICE: &str = "service";

pub const LABEL_CLUSTER_NAME: &str = "cluster_name";
pub const LABEL_SERVICE: &str = "service";

const DEFAULT_MAX_USER_AGENT_SERIES: usize = 1000;

//
// CyclePlan
//

/// The phase-two command batch for one poll cycle, plus what phase one
/// learned while planning it. The sink count is only valid for the cycle that
/// computed it; the next cycle plans from scratch.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CyclePlan {
  pub keys: Vec<String>,
  pub log_sink_count: usize,
}

//
// StatProcessor
//

/// One stat domain's planning and ingestion logic for a single node. The
/// driver calls [`Self::phase_one_keys`], requests those commands, feeds the
/// raw results to [`Self::phase_two_keys`], requests the planned commands and
/// finally hands the payloads to [`Self::refresh`].
pub trait StatProcessor {
  /// Commands for the probe phase. Deterministic and input free.
  fn phase_one_keys(&self) -> Vec<String>;

  /// Derives the full command batch from the probe results. Always includes
  /// the baseline commands; per-sink and feature-gated commands are added
  /// based on what the probe reported.
  fn phase_two_keys(&self, phase_one: &RawInfo) -> CyclePlan;

  /// Ingests the phase-two payloads and returns the updated stats in
  /// emission order. Failures are per entry: a value that cannot be
  /// converted or a token that cannot be decoded is logged, counted and
  /// skipped without failing the cycle.
  fn refresh(&mut self, plan: &CyclePlan, raw: &RawInfo) -> anyhow::Result<Vec<Stat>>;
}

pub type DynamicStatProcessor = Box<dyn StatProcessor + Send>;

//
// EngineConfig
//

/// Engine settings, loaded by the embedding process and consumed here.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub filters: FilterConfig,

  /// Upper bound on distinct user-agent series cached per processor. The raw
  /// token space is payload controlled and would otherwise grow without
  /// limit.
  pub max_user_agent_series: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      filters: FilterConfig::default(),
      max_user_agent_series: DEFAULT_MAX_USER_AGENT_SERIES,
    }
  }
}

//
// ProcessorFactoryContext
//

/// Everything a processor needs at construction time. One context is built
/// per node and cloned into each domain's processor.
#[derive(Clone)]
pub struct ProcessorFactoryContext {
  pub filter: Arc<NameFilter>,
  pub latency_subscriptions: LatencySubscriptions,
  pub max_user_agent_series: usize,
  pub scope: Scope,
}

impl ProcessorFactoryContext {
  #[must_use]
  pub fn new(config: &EngineConfig, scope: Scope) -> Self {
    Self {
      filter: Arc::new(NameFilter::new(config.filters.clone())),
      latency_subscriptions: LatencySubscriptions::default(),
      max_user_agent_series: config.max_user_agent_series,
      scope,
    }
  }
}

#[must_use]
pub fn build_processor(
  domain: StatDomain,
  context: ProcessorFactoryContext,
) -> DynamicStatProcessor {
  match domain {
    StatDomain::Node => Box::new(NodeProcessor::new(context)),
  }
}
