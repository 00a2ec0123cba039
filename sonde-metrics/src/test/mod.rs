// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

use crate::processors::{EngineConfig, ProcessorFactoryContext};
use crate::protos::info::RawInfo;
use base64ct::{Base64, Encoding};
use sonde_common::stats::Collector;

#[must_use]
pub fn make_raw(entries: &[(&str, &str)]) -> RawInfo {
  entries
    .iter()
    .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
    .collect()
}

#[must_use]
pub fn make_context() -> ProcessorFactoryContext {
  make_context_with_config(&EngineConfig::default())
}

#[must_use]
pub fn make_context_with_config(config: &EngineConfig) -> ProcessorFactoryContext {
  ProcessorFactoryContext::new(config, Collector::default().scope("test"))
}

/// Builds a wire token the way a server reports one user agent.
#[must_use]
pub fn encode_user_agent(payload: &str, count: &str) -> String {
  format!(
    "user-agent={}:count={count}",
    Base64::encode_string(payload.as_bytes())
  )
}
