//! JSON-lines protocol between `TcpBackend` and `presence_server`.
//!
//! Every client frame gets exactly one reply (`signed_in`, `ok` or `error`) in request order.
//! `value` frames carry subscription pushes and may arrive between replies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed frame '{line}': {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientFrame {
    SignIn,
    Set { path: String, value: Value },
    OnDisconnectRemove { path: String },
    Subscribe { path: String },
}

impl ClientFrame {
    pub fn op_name(&self) -> &'static str {
        match self {
            ClientFrame::SignIn => "sign_in",
            ClientFrame::Set { .. } => "set",
            ClientFrame::OnDisconnectRemove { .. } => "on_disconnect_remove",
            ClientFrame::Subscribe { .. } => "subscribe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerFrame {
    SignedIn { uid: String },
    Ok,
    Value { path: String, data: Value },
    Error { message: String },
}

pub fn encode_line<T: Serialize>(frame: &T) -> Result<String, WireError> {
    let mut line = serde_json::to_string(frame).map_err(WireError::Encode)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, WireError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    serde_json::from_str(line).map_err(|source| WireError::Decode {
        line: line.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn client_frames_use_op_tag() {
        let line = encode_line(&ClientFrame::OnDisconnectRemove {
            path: "players/abc".to_string(),
        })
        .expect("encode");
        assert_eq!(
            line,
            "{\"op\":\"on_disconnect_remove\",\"path\":\"players/abc\"}\n"
        );
    }

    #[test]
    fn server_value_frame_decodes_with_crlf() {
        let frame: ServerFrame =
            decode_line("{\"event\":\"value\",\"path\":\"players\",\"data\":{\"a\":true}}\r\n")
                .expect("decode");
        assert_eq!(
            frame,
            ServerFrame::Value {
                path: "players".to_string(),
                data: json!({"a": true}),
            }
        );
    }

    #[test]
    fn unit_variants_encode_as_bare_tags() {
        assert_eq!(
            encode_line(&ServerFrame::Ok).expect("encode"),
            "{\"event\":\"ok\"}\n"
        );
        assert_eq!(
            decode_line::<ClientFrame>("{\"op\":\"sign_in\"}").expect("decode"),
            ClientFrame::SignIn
        );
    }

    #[test]
    fn unknown_op_is_a_decode_error() {
        let error = decode_line::<ClientFrame>("{\"op\":\"drop_tables\"}").expect_err("error");
        assert!(matches!(error, WireError::Decode { .. }));
    }
}
