// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

pub mod stats;
pub mod version;

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  global_initialize();
}

pub fn global_initialize() {
  // Both embedding processes and every test binary call this, so later calls
  // must be no-ops.
  let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .is_test(cfg!(test))
    .try_init();
}
