// sonde - an info-protocol stat engine for clustered databases
// Copyright Sonde Project Authors. All rights reserved.
//
// Use of this source code is governed by the MIT license that can be found in the
// LICENSE file.

#[cfg(test)]
#[path = "./user_agent_test.rs"]
mod user_agent_test;

use base64ct::{Base64, Encoding};
use thiserror::Error;

//
// TokenError
//

#[derive(Error, Debug, Eq, PartialEq)]
pub enum TokenError {
  #[error("token has no user-agent field")]
  MissingAgent,
  #[error("token has no count field")]
  MissingCount,
  #[error("invalid base64 payload")]
  InvalidBase64,
}

//
// UserAgent
//

/// One decoded user-agent observation reported by the node: which client
/// library and application connected, and how many connections carried this
/// exact agent string. The count is kept as reported so the caller can run it
/// through the regular numeric conversion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserAgent {
  pub client_library_version: String,
  pub app_id: String,
  pub count: String,
}

/// Decodes one `user-agent=<base64>:count=<n>` token. The base64 alphabet has
/// no ':' so splitting on it is safe even though the encoded payload can
/// contain '='.
pub fn parse_token(token: &str) -> Result<UserAgent, TokenError> {
  let mut parts = token.split(':');
  let encoded = parts
    .next()
    .and_then(|agent| agent.split_once('='))
    .ok_or(TokenError::MissingAgent)?
    .1;
  let count = parts
    .next()
    .and_then(|count| count.split_once('='))
    .ok_or(TokenError::MissingCount)?
    .1;

  let decoded = Base64::decode_vec(encoded).map_err(|_| TokenError::InvalidBase64)?;
  let decoded = String::from_utf8_lossy(&decoded);

  // The decoded payload is comma separated: a leading format field that is
  // not currently used, then the client library version and the application
  // id. Older clients report fewer fields.
  let mut fields = decoded.split(',');
  let _ = fields.next();
  let client_library_version = fields.next().unwrap_or("unknown").to_string();
  let app_id = fields.next().unwrap_or("unknown").to_string();

  Ok(UserAgent {
    client_library_version,
    app_id,
    count: count.to_string(),
  })
}
