// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./stats_test.rs"]
mod stats_test;

use parking_lot::Mutex;
use prometheus::proto::MetricFamily;
use prometheus::{IntCounter, IntGauge, Registry};
use std::collections::HashMap;
use std::sync::Arc;

const SEP: &str = ":";

//
// Collector
//

/// Process-wide registry for self-instrumentation metrics. Clones are cheap
/// and share the same underlying registry, so a collector can be handed to
/// every component that wants to emit counters about its own operation.
#[derive(Clone, Default)]
pub struct Collector {
  inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
  registry: Registry,
  counters: Mutex<HashMap<String, IntCounter>>,
  gauges: Mutex<HashMap<String, IntGauge>>,
}

impl Collector {
  #[must_use]
  pub fn scope(&self, name: &str) -> Scope {
    Scope {
      collector: self.clone(),
      prefix: name.to_string(),
    }
  }

  /// Gathers the current contents of the registry for exposition.
  #[must_use]
  pub fn gather(&self) -> Vec<MetricFamily> {
    self.inner.registry.gather()
  }

  fn counter(&self, name: String) -> IntCounter {
    let mut counters = self.inner.counters.lock();
    if let Some(counter) = counters.get(&name) {
      return counter.clone();
    }

    // Names are assembled from static scope segments so creation and
    // registration cannot fail at runtime.
    let counter = IntCounter::new(name.clone(), name.clone()).expect("static metric name");
    self
      .inner
      .registry
      .register(Box::new(counter.clone()))
      .expect("static metric name");
    counters.insert(name, counter.clone());
    counter
  }

  fn gauge(&self, name: String) -> IntGauge {
    let mut gauges = self.inner.gauges.lock();
    if let Some(gauge) = gauges.get(&name) {
      return gauge.clone();
    }

    let gauge = IntGauge::new(name.clone(), name.clone()).expect("static metric name");
    self
      .inner
      .registry
      .register(Box::new(gauge.clone()))
      .expect("static metric name");
    gauges.insert(name, gauge.clone());
    gauge
  }
}

//
// Scope
//

/// A named prefix within a [`Collector`]. Nested scopes join their segments
/// with ":", so `collector.scope("engine").scope("node").counter("skips")`
/// registers `engine:node:skips`.
#[derive(Clone)]
pub struct Scope {
  collector: Collector,
  prefix: String,
}

impl Scope {
  #[must_use]
  pub fn scope(&self, name: &str) -> Self {
    Self {
      collector: self.collector.clone(),
      prefix: format!("{}{SEP}{name}", self.prefix),
    }
  }

  /// Returns the counter registered under this scope with the given name,
  /// creating it on first use. Repeated calls return handles to the same
  /// underlying counter.
  #[must_use]
  pub fn counter(&self, name: &str) -> IntCounter {
    self
      .collector
      .counter(format!("{}{SEP}{name}", self.prefix))
  }

  #[must_use]
  pub fn gauge(&self, name: &str) -> IntGauge {
    self.collector.gauge(format!("{}{SEP}{name}", self.prefix))
  }
}
