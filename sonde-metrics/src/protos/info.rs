// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./info_test.rs"]
mod info_test;

use ahash::HashMap;
use thiserror::Error;

/// Raw info-protocol responses, keyed by the command string that produced each
/// payload.
pub type RawInfo = HashMap<String, String>;

//
// ConversionError
//

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ConversionError {
  #[error("value {0:?} is neither numeric nor boolean")]
  NotNumeric(String),
}

/// Splits a delimited info payload ("k1=v1;k2=v2;...") into its fields. Tokens
/// without an "=" and empty tokens are skipped rather than rejected, since
/// real payloads routinely carry trailing separators.
#[must_use]
pub fn parse_fields(payload: &str, separator: char) -> HashMap<String, String> {
  payload
    .split(separator)
    .filter_map(|token| token.split_once('='))
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// Converts an info-protocol value into a numeric observation. Boolean
/// literals map to 1/0 so that toggle-style config values can be graphed
/// alongside real numbers.
pub fn to_numeric(value: &str) -> Result<f64, ConversionError> {
  if let Ok(numeric) = value.parse::<f64>() {
    return Ok(numeric);
  }

  match value {
    "t" | "T" | "TRUE" | "true" | "True" => Ok(1.0),
    "f" | "F" | "FALSE" | "false" | "False" => Ok(0.0),
    _ => Err(ConversionError::NotNumeric(value.to_string())),
  }
}
