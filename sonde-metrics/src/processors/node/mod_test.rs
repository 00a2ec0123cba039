// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

use super::*;
use crate::filters::name_list::{FilterConfig, NameListConfig};
use crate::processors::EngineConfig;
use crate::test::{encode_user_agent, make_context, make_context_with_config, make_raw};
use pretty_assertions::assert_eq;

fn stat_named<'a>(stats: &'a [Stat], name: &str) -> &'a Stat {
  stats
    .iter()
    .find(|stat| stat.name() == name)
    .unwrap_or_else(|| panic!("no stat named {name}"))
}

fn node_counter(context: &ProcessorFactoryContext, name: &str) -> IntCounter {
  context.scope.scope("node").counter(name)
}

#[test]
fn phase_one_requests_the_log_listing() {
  let processor = NodeProcessor::new(make_context());
  assert_eq!(vec!["logs".to_string()], processor.phase_one_keys());
}

#[test]
fn phase_two_covers_config_statistics_and_sinks() {
  let processor = NodeProcessor::new(make_context());
  let plan = processor.phase_two_keys(&make_raw(&[
    ("logs", "0:stderr;1:/var/log/cluster/node.log"),
    ("build", "8.1.0.0"),
  ]));

  assert_eq!(
    vec![
      "get-config:context=service".to_string(),
      "statistics".to_string(),
      "log/0".to_string(),
      "log/1".to_string(),
      "user-agents".to_string(),
    ],
    plan.keys
  );
  assert_eq!(2, plan.log_sink_count);
}

#[test]
fn phase_two_with_no_sinks() {
  let processor = NodeProcessor::new(make_context());

  let plan = processor.phase_two_keys(&make_raw(&[("logs", ""), ("build", "7.2.0.0")]));
  assert_eq!(
    vec![
      "get-config:context=service".to_string(),
      "statistics".to_string(),
    ],
    plan.keys
  );
  assert_eq!(0, plan.log_sink_count);

  let plan = processor.phase_two_keys(&make_raw(&[("build", "7.2.0.0")]));
  assert_eq!(0, plan.log_sink_count);
}

#[test]
fn sink_commands_use_the_listed_ids() {
  assert_eq!(
    vec!["log/0".to_string(), "log/1".to_string()],
    log_sink_commands("0:stderr;1:/var/log/cluster/node.log")
  );
  assert_eq!(vec!["log/stderr".to_string()], log_sink_commands("stderr"));
  assert!(log_sink_commands("").is_empty());
}

#[test]
fn phase_two_gates_user_agents_on_build_version() {
  let context = make_context();
  let skips = node_counter(&context, "version_gate_skip");
  let processor = NodeProcessor::new(context);

  let plan = processor.phase_two_keys(&make_raw(&[("build", "8.0.0.9")]));
  assert!(!plan.keys.contains(&"user-agents".to_string()));

  let plan = processor.phase_two_keys(&make_raw(&[("build", "8.1.0.0")]));
  assert!(plan.keys.contains(&"user-agents".to_string()));

  let plan = processor.phase_two_keys(&make_raw(&[("build", "9.0")]));
  assert!(plan.keys.contains(&"user-agents".to_string()));
  assert_eq!(0, skips.get());

  // A server that reports a mangled build gets the baseline commands only.
  let plan = processor.phase_two_keys(&make_raw(&[("build", "8.1.0-rc1")]));
  assert!(!plan.keys.contains(&"user-agents".to_string()));
  assert_eq!(1, skips.get());

  let plan = processor.phase_two_keys(&make_raw(&[]));
  assert!(!plan.keys.contains(&"user-agents".to_string()));
  assert_eq!(2, skips.get());
}

#[test]
fn refresh_converts_config_and_statistics() {
  let mut processor = NodeProcessor::new(make_context());
  let raw = make_raw(&[
    ("cluster-name", "flight-data"),
    ("service", "10.0.0.7:3000"),
    (
      "get-config:context=service",
      "info-threads=16;enable-benchmarks-fabric=false",
    ),
    ("statistics", "uptime=12345;cluster_size=2;system_free_mem_pct=61"),
  ]);

  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();

  // Five payload fields plus the two pseudo log stats.
  assert_eq!(7, stats.len());
  let uptime = stat_named(&stats, "uptime");
  assert_eq!(12_345.0, uptime.value());
  assert_eq!(StatDomain::Node, uptime.domain());
  assert_eq!(
    vec!["cluster_name".to_string(), "service".to_string()],
    uptime.label_names()
  );
  assert_eq!(
    vec!["flight-data".to_string(), "10.0.0.7:3000".to_string()],
    uptime.label_values()
  );
  assert_eq!(0.0, stat_named(&stats, "enable-benchmarks-fabric").value());
}

#[test]
fn unconvertible_fields_are_skipped() {
  let context = make_context();
  let skips = node_counter(&context, "conversion_skip");
  let mut processor = NodeProcessor::new(context);

  let raw = make_raw(&[("statistics", "mode=mixed;uptime=5")]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();

  assert_eq!(5.0, stat_named(&stats, "uptime").value());
  assert!(!stats.iter().any(|stat| stat.name() == "mode"));
  assert_eq!(1, skips.get());
}

#[test]
fn log_sinks_fold_into_pseudo_stats() {
  let mut processor = NodeProcessor::new(make_context());
  let plan = CyclePlan {
    keys: Vec::new(),
    log_sink_count: 2,
  };

  let raw = make_raw(&[
    ("log/0", "misc:INFO;fabric:DEBUG"),
    ("log/1", "misc:INFO"),
  ]);
  let stats = processor.refresh(&plan, &raw).unwrap();
  assert_eq!(1.0, stat_named(&stats, "pseudo_log_debug").value());
  assert_eq!(0.0, stat_named(&stats, "pseudo_log_detail").value());

  // The pseudo stats track the current sink levels, so a change in either
  // direction shows up on the next cycle.
  let raw = make_raw(&[("log/0", "misc:INFO"), ("log/1", "migrate:DETAIL")]);
  let stats = processor.refresh(&plan, &raw).unwrap();
  assert_eq!(0.0, stat_named(&stats, "pseudo_log_debug").value());
  assert_eq!(1.0, stat_named(&stats, "pseudo_log_detail").value());

  // A sink the server did not answer for is ignored.
  let stats = processor
    .refresh(&plan, &make_raw(&[("log/1", "misc:DEBUG")]))
    .unwrap();
  assert_eq!(1.0, stat_named(&stats, "pseudo_log_debug").value());
}

#[test]
fn latency_toggles_drive_subscriptions() {
  let context = make_context();
  let subscriptions = context.latency_subscriptions.clone();
  let mut processor = NodeProcessor::new(context);

  let raw = make_raw(&[(
    "get-config:context=service",
    "enable-hist-proxy=true;enable-benchmarks-fabric=true;info-threads=16",
  )]);
  processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert!(subscriptions.is_subscribed("enable-hist-proxy"));
  assert!(subscriptions.is_subscribed("enable-benchmarks-fabric"));
  assert_eq!("proxy", subscriptions.snapshot()["enable-hist-proxy"]);
  assert_eq!(
    "benchmarks-fabric",
    subscriptions.snapshot()["enable-benchmarks-fabric"]
  );

  let raw = make_raw(&[("get-config:context=service", "enable-hist-proxy=false")]);
  processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert!(!subscriptions.is_subscribed("enable-hist-proxy"));
  assert!(subscriptions.is_subscribed("enable-benchmarks-fabric"));
}

#[test]
fn user_agents_decode_into_detail_stats() {
  let mut processor = NodeProcessor::new(make_context());
  let payload = format!(
    "{};{}",
    encode_user_agent("1,java-8.1.0,payments", "7"),
    encode_user_agent("1,go-7.0.0", "3")
  );
  let raw = make_raw(&[
    ("cluster-name", "flight-data"),
    ("service", "10.0.0.7:3000"),
    ("user-agents", &payload),
  ]);

  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  let details: Vec<_> = stats
    .iter()
    .filter(|stat| stat.name() == "user_agent_details")
    .collect();
  assert_eq!(2, details.len());

  let java = details
    .iter()
    .find(|stat| stat.label_values().contains(&"java-8.1.0".to_string()))
    .unwrap();
  assert_eq!(7.0, java.value());
  assert_eq!(
    vec![
      "cluster_name".to_string(),
      "service".to_string(),
      "client_library_version".to_string(),
      "app_id".to_string(),
    ],
    java.label_names()
  );
  assert_eq!(
    vec![
      "flight-data".to_string(),
      "10.0.0.7:3000".to_string(),
      "java-8.1.0".to_string(),
      "payments".to_string(),
    ],
    java.label_values()
  );

  let go = details
    .iter()
    .find(|stat| stat.label_values().contains(&"go-7.0.0".to_string()))
    .unwrap();
  assert_eq!(3.0, go.value());
  assert_eq!("unknown", go.label_values()[3]);
}

#[test]
fn malformed_user_agent_tokens_are_skipped() {
  let context = make_context();
  let skips = node_counter(&context, "user_agent_skip");
  let mut processor = NodeProcessor::new(context);

  let payload = format!("garbage;;{}", encode_user_agent("1,rust-1.0.0,etl", "2"));
  let raw = make_raw(&[("user-agents", &payload)]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();

  let details: Vec<_> = stats
    .iter()
    .filter(|stat| stat.name() == "user_agent_details")
    .collect();
  assert_eq!(1, details.len());
  assert_eq!(2.0, details[0].value());
  assert_eq!(1, skips.get());

  // A count that does not convert drops the token too.
  let payload = encode_user_agent("1,rust-1.0.0,etl", "many");
  let raw = make_raw(&[("user-agents", &payload)]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert!(!stats.iter().any(|stat| stat.name() == "user_agent_details"));
  assert_eq!(2, skips.get());
}

#[test]
fn user_agent_series_are_capped() {
  let config = EngineConfig {
    max_user_agent_series: 1,
    ..Default::default()
  };
  let context = make_context_with_config(&config);
  let overflow = node_counter(&context, "user_agent_overflow");
  let mut processor = NodeProcessor::new(context);

  let payload = format!(
    "{};{}",
    encode_user_agent("1,java-8.1.0,payments", "7"),
    encode_user_agent("1,go-7.0.0,etl", "3")
  );
  let raw = make_raw(&[("user-agents", &payload)]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert_eq!(
    1,
    stats
      .iter()
      .filter(|stat| stat.name() == "user_agent_details")
      .count()
  );
  assert_eq!(1, overflow.get());

  // Updates to an already cached series always go through.
  let payload = encode_user_agent("1,java-8.1.0,payments", "9");
  let raw = make_raw(&[("user-agents", &payload)]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert_eq!(9.0, stat_named(&stats, "user_agent_details").value());
  assert_eq!(1, overflow.get());
}

#[test]
fn repeated_refresh_reuses_cached_series() {
  let context = make_context();
  let cached = context.scope.scope("node").gauge("cached_series");
  let mut processor = NodeProcessor::new(context);

  let payload = encode_user_agent("1,java-8.1.0,payments", "7");
  let raw = make_raw(&[
    ("statistics", "uptime=1;cluster_size=2"),
    ("user-agents", &payload),
  ]);

  let sorted = |mut stats: Vec<Stat>| {
    stats.sort_by(|a, b| a.name().cmp(b.name()));
    stats
  };

  let first = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert_eq!(5, cached.get());
  let second = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert_eq!(5, cached.get());
  assert_eq!(sorted(first), sorted(second));
}

#[test]
fn filter_decision_is_stamped_on_each_stat() {
  let config = EngineConfig {
    filters: FilterConfig {
      node: NameListConfig {
        allowlist: Vec::new(),
        blocklist: vec!["uptime".to_string(), "pseudo_*".to_string()],
      },
    },
    ..Default::default()
  };
  let mut processor = NodeProcessor::new(make_context_with_config(&config));

  let raw = make_raw(&[("statistics", "uptime=1;cluster_size=2")]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();

  assert!(!stat_named(&stats, "uptime").allowed());
  assert!(stat_named(&stats, "cluster_size").allowed());
  assert!(!stat_named(&stats, "pseudo_log_debug").allowed());
  assert!(!stat_named(&stats, "pseudo_log_detail").allowed());
}

#[test]
fn user_agent_details_filter_under_their_stat_name() {
  let config = EngineConfig {
    filters: FilterConfig {
      node: NameListConfig {
        allowlist: Vec::new(),
        blocklist: vec!["user_agent_details".to_string()],
      },
    },
    ..Default::default()
  };
  let mut processor = NodeProcessor::new(make_context_with_config(&config));

  let payload = encode_user_agent("1,java-8.1.0,app", "1");
  let raw = make_raw(&[("user-agents", &payload)]);
  let stats = processor.refresh(&CyclePlan::default(), &raw).unwrap();
  assert!(!stat_named(&stats, "user_agent_details").allowed());
}
