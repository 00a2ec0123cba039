// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./mod_test.rs"]
mod mod_test;

use super::{
  CyclePlan,
  KEY_BUILD,
  KEY_CLUSTER_NAME,
  KEY_SERVICE,
  LABEL_CLUSTER_NAME,
  LABEL_SERVICE,
  ProcessorFactoryContext,
  StatProcessor,
};
use crate::benchmarks::{self, LatencySubscriptions};
use crate::filters::name_list::NameFilter;
use crate::protos::info::{self, RawInfo};
use crate::protos::stat::{Stat, StatDomain};
use crate::protos::user_agent;
use ahash::{HashMap, HashMapExt};
use prometheus::{IntCounter, IntGauge};
use sonde_common::stats::Scope;
use sonde_common::version;
use std::sync::Arc;

pub const KEY_SERVICE_CONFIG: &str = "get-config:context=service";
pub const KEY_SERVICE_STATISTICS: &str = "statistics";
pub const KEY_SERVICE_LOGS: &str = "logs";
pub const KEY_USER_AGENTS: &str = "user-agents";

// user-agents reporting shipped with server 8.1.
const USER_AGENTS_MIN_BUILD: &str = "8.1.0.0";
const USER_AGENT_STAT_NAME: &str = "user_agent_details";

const LABEL_CLIENT_LIBRARY_VERSION: &str = "client_library_version";
const LABEL_APP_ID: &str = "app_id";

const PSEUDO_LOG_DEBUG: &str = "pseudo_log_debug";
const PSEUDO_LOG_DETAIL: &str = "pseudo_log_detail";
const DEBUG_MARKER: &str = ":DEBUG";
const DETAIL_MARKER: &str = ":DETAIL";

//
// NodeStats
//

struct NodeStats {
  conversion_skip: IntCounter,
  user_agent_skip: IntCounter,
  user_agent_overflow: IntCounter,
  version_gate_skip: IntCounter,
  cached_series: IntGauge,
}

impl NodeStats {
  fn new(scope: &Scope) -> Self {
    Self {
      conversion_skip: scope.counter("conversion_skip"),
      user_agent_skip: scope.counter("user_agent_skip"),
      user_agent_overflow: scope.counter("user_agent_overflow"),
      version_gate_skip: scope.counter("version_gate_skip"),
      cached_series: scope.gauge("cached_series"),
    }
  }
}

//
// NodeProcessor
//

/// Node-level service stats: the two baseline payloads (service config and
/// statistics), pseudo-metrics derived from the log sink levels, and the
/// decoded user-agent details on servers that report them.
pub struct NodeProcessor {
  metrics: HashMap<String, Stat>,
  filter: Arc<NameFilter>,
  latency_subscriptions: LatencySubscriptions,
  max_user_agent_series: usize,
  user_agent_series: usize,
  stats: NodeStats,
}

impl NodeProcessor {
  #[must_use]
  pub fn new(context: ProcessorFactoryContext) -> Self {
    Self {
      metrics: HashMap::new(),
      filter: context.filter,
      latency_subscriptions: context.latency_subscriptions,
      max_user_agent_series: context.max_user_agent_series,
      user_agent_series: 0,
      stats: NodeStats::new(&context.scope.scope("node")),
    }
  }

  /// Looks up or creates the cached stat for `cache_key` and updates it in
  /// place. The allow/block decision is computed on first sight of a key and
  /// frozen into the cached entry.
  fn update_cached(
    &mut self,
    cache_key: &str,
    name: &str,
    value: f64,
    label_names: Vec<String>,
    label_values: Vec<String>,
  ) -> Stat {
    let filter = &self.filter;
    let stat = self
      .metrics
      .entry(cache_key.to_string())
      .or_insert_with(|| Stat::new(StatDomain::Node, name, filter.allow(StatDomain::Node, name)));
    stat.update_values(value, label_names, label_values);
    stat.clone()
  }

  fn refresh_fields(&mut self, payload: &str, cluster_name: &str, service: &str) -> Vec<Stat> {
    let fields = info::parse_fields(payload, ';');

    let mut out = Vec::with_capacity(fields.len());
    for (key, value) in &fields {
      let numeric = match info::to_numeric(value) {
        Ok(numeric) => numeric,
        Err(e) => {
          log::debug!("skipping node stat {key}: {e}");
          self.stats.conversion_skip.inc();
          continue;
        },
      };

      out.push(self.update_cached(
        key,
        key,
        numeric,
        vec![LABEL_CLUSTER_NAME.to_string(), LABEL_SERVICE.to_string()],
        vec![cluster_name.to_string(), service.to_string()],
      ));

      // Toggling a latency histogram shows up as a 1/0 config value; mirror
      // the change into the shared subscription registry.
      if benchmarks::is_latency_toggle(key) {
        self.latency_subscriptions.observe_toggle(key, numeric == 1.0);
      }
    }

    out
  }

  fn log_sink_stats(
    &mut self,
    plan: &CyclePlan,
    raw: &RawInfo,
    cluster_name: &str,
    service: &str,
  ) -> Vec<Stat> {
    let mut debug_enabled = false;
    let mut detail_enabled = false;
    for index in 0 .. plan.log_sink_count {
      let Some(levels) = raw.get(&format!("log/{index}")) else {
        continue;
      };
      debug_enabled = debug_enabled || levels.contains(DEBUG_MARKER);
      detail_enabled = detail_enabled || levels.contains(DETAIL_MARKER);
    }

    vec![
      self.pseudo_log_stat(PSEUDO_LOG_DEBUG, debug_enabled, cluster_name, service),
      self.pseudo_log_stat(PSEUDO_LOG_DETAIL, detail_enabled, cluster_name, service),
    ]
  }

  fn pseudo_log_stat(
    &mut self,
    name: &str,
    enabled: bool,
    cluster_name: &str,
    service: &str,
  ) -> Stat {
    self.update_cached(
      name,
      name,
      if enabled { 1.0 } else { 0.0 },
      vec![LABEL_CLUSTER_NAME.to_string(), LABEL_SERVICE.to_string()],
      vec![cluster_name.to_string(), service.to_string()],
    )
  }

  fn user_agent_stats(&mut self, payload: &str, cluster_name: &str, service: &str) -> Vec<Stat> {
    let mut out = Vec::new();
    for token in payload.split(';').filter(|token| !token.is_empty()) {
      let agent = match user_agent::parse_token(token) {
        Ok(agent) => agent,
        Err(e) => {
          log::warn!("skipping user agent token: {e}");
          self.stats.user_agent_skip.inc();
          continue;
        },
      };
      let count = match info::to_numeric(&agent.count) {
        Ok(count) => count,
        Err(e) => {
          log::warn!("skipping user agent token with a bad count: {e}");
          self.stats.user_agent_skip.inc();
          continue;
        },
      };

      // Tokens are cached raw, so any variation creates a new series. Cap
      // how many a node can create before we stop accepting new ones.
      if !self.metrics.contains_key(token) {
        if self.user_agent_series >= self.max_user_agent_series {
          log::warn!(
            "dropping new user agent series over the {} limit",
            self.max_user_agent_series
          );
          self.stats.user_agent_overflow.inc();
          continue;
        }
        self.user_agent_series += 1;
      }

      out.push(self.update_cached(
        token,
        USER_AGENT_STAT_NAME,
        count,
        vec![
          LABEL_CLUSTER_NAME.to_string(),
          LABEL_SERVICE.to_string(),
          LABEL_CLIENT_LIBRARY_VERSION.to_string(),
          LABEL_APP_ID.to_string(),
        ],
        vec![
          cluster_name.to_string(),
          service.to_string(),
          agent.client_library_version,
          agent.app_id,
        ],
      ));
    }

    out
  }
}

impl StatProcessor for NodeProcessor {
  fn phase_one_keys(&self) -> Vec<String> {
    log::trace!("node phase one keys: {KEY_SERVICE_LOGS}");
    vec![KEY_SERVICE_LOGS.to_string()]
  }

  fn phase_two_keys(&self, phase_one: &RawInfo) -> CyclePlan {
    let mut keys = vec![
      KEY_SERVICE_CONFIG.to_string(),
      KEY_SERVICE_STATISTICS.to_string(),
    ];

    let sink_commands =
      log_sink_commands(phase_one.get(KEY_SERVICE_LOGS).map_or("", String::as_str));
    let log_sink_count = sink_commands.len();
    keys.extend(sink_commands);

    match version::at_least(
      phase_one.get(KEY_BUILD).map_or("", String::as_str),
      USER_AGENTS_MIN_BUILD,
    ) {
      Ok(true) => keys.push(KEY_USER_AGENTS.to_string()),
      Ok(false) => (),
      Err(e) => {
        // Downgrade gracefully when the build version is unusable.
        log::debug!("not fetching user agents, bad build version: {e}");
        self.stats.version_gate_skip.inc();
      },
    }

    log::trace!("node phase two keys: {keys:?}");
    CyclePlan {
      keys,
      log_sink_count,
    }
  }

  fn refresh(&mut self, plan: &CyclePlan, raw: &RawInfo) -> anyhow::Result<Vec<Stat>> {
    let cluster_name = raw.get(KEY_CLUSTER_NAME).cloned().unwrap_or_default();
    let service = raw.get(KEY_SERVICE).cloned().unwrap_or_default();

    let mut all = Vec::new();
    all.extend(self.refresh_fields(
      raw.get(KEY_SERVICE_CONFIG).map_or("", String::as_str),
      &cluster_name,
      &service,
    ));
    all.extend(self.refresh_fields(
      raw.get(KEY_SERVICE_STATISTICS).map_or("", String::as_str),
      &cluster_name,
      &service,
    ));
    all.extend(self.log_sink_stats(plan, raw, &cluster_name, &service));
    if let Some(payload) = raw.get(KEY_USER_AGENTS) {
      all.extend(self.user_agent_stats(payload, &cluster_name, &service));
    }

    self
      .stats
      .cached_series
      .set(i64::try_from(self.metrics.len()).unwrap_or(i64::MAX));
    Ok(all)
  }
}

/// One fetch command per configured sink. A listing looks like
/// "0:stderr;1:/var/log/x.log"; the leading identifier names the sink.
fn log_sink_commands(listing: &str) -> Vec<String> {
  listing
    .split(';')
    .filter(|sink| !sink.is_empty())
    .map(|sink| {
      let id = sink.split_once(':').map_or(sink, |(id, _)| id);
      format!("log/{id}")
    })
    .collect()
}
