// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

pub mod benchmarks;
pub mod collector;
pub mod filters;
pub mod processors;
pub mod protos;
pub mod test;

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  use sonde_common::global_initialize;

  global_initialize();
}
