// trustbroker/src/token.rs
//
// Authorization Token (AT) codec — parse/serialize the JSON envelope
// carried in every application message payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The JSON envelope described in the data model: issuer broker, client,
/// signer chain, permitted topics, application payload, and MAC.
///
/// Field order here is the order `serde_json` emits on serialization,
/// which is also the order a verifying broker must reproduce the MAC
/// input with — see `serialize_without_mac`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthToken {
    pub b: String,
    pub c: String,
    #[serde(rename = "S", default)]
    pub signers: Vec<String>,
    #[serde(rename = "Fp", default)]
    pub publish_topics: Vec<String>,
    #[serde(rename = "Fs", default)]
    pub subscribe_topics: Vec<String>,
    pub msg: String,
    pub msg_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmac: Option<String>,
    /// Unknown keys, preserved verbatim so they round-trip through the MAC.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed JSON payload")]
    MalformedJson,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` has the wrong type")]
    WrongType(&'static str),
}

/// True if `bytes` looks like it could be an AT (first non-whitespace byte
/// is `{`). Anything else is not a data message and must be passed through
/// unchanged by the interceptor.
pub fn looks_like_json(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{')
}

pub fn parse(bytes: &[u8]) -> Result<AuthToken, TokenError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| TokenError::MalformedJson)?;
    let mut obj = value.into_object().ok_or(TokenError::MalformedJson)?;

    let b = take_str(&mut obj, "b")?;
    let c = take_str(&mut obj, "c")?;
    let signers = take_str_array(&mut obj, "S")?.unwrap_or_default();
    let publish_topics = take_str_array(&mut obj, "Fp")?.unwrap_or_default();
    let subscribe_topics = take_str_array(&mut obj, "Fs")?.unwrap_or_default();
    let msg = take_str(&mut obj, "msg")?;
    let msg_id = take_i64(&mut obj, "msg_id")?;
    let hmac = match obj.remove("hmac") {
        None => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => return Err(TokenError::WrongType("hmac")),
    };

    Ok(AuthToken {
        b,
        c,
        signers,
        publish_topics,
        subscribe_topics,
        msg,
        msg_id,
        hmac,
        extra: obj,
    })
}

trait IntoObject {
    fn into_object(self) -> Option<Map<String, Value>>;
}

impl IntoObject for Value {
    fn into_object(self) -> Option<Map<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

fn take_str(obj: &mut Map<String, Value>, key: &'static str) -> Result<String, TokenError> {
    match obj.remove(key) {
        None => Err(TokenError::MissingField(key)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TokenError::WrongType(key)),
    }
}

fn take_i64(obj: &mut Map<String, Value>, key: &'static str) -> Result<i64, TokenError> {
    match obj.remove(key) {
        None => Err(TokenError::MissingField(key)),
        Some(v) => v.as_i64().ok_or(TokenError::WrongType(key)),
    }
}

fn take_str_array(
    obj: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Option<Vec<String>>, TokenError> {
    match obj.remove(key) {
        None => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s),
                    _ => return Err(TokenError::WrongType(key)),
                }
            }
            Ok(Some(out))
        }
        Some(_) => Err(TokenError::WrongType(key)),
    }
}

/// Unformatted JSON of `token` with the `hmac` field absent — the exact
/// byte sequence the MAC is computed and verified over.
pub fn serialize_without_mac(token: &AuthToken) -> Vec<u8> {
    let mut unsigned = token.clone();
    unsigned.hmac = None;
    serde_json::to_vec(&unsigned).expect("AuthToken serialization cannot fail")
}

/// Unformatted JSON of `token`, including `hmac` if present.
pub fn serialize(token: &AuthToken) -> Vec<u8> {
    serde_json::to_vec(token).expect("AuthToken serialization cannot fail")
}

pub fn attach_mac(mut token: AuthToken, tag: String) -> AuthToken {
    token.hmac = Some(tag);
    token
}

/// Splits a token into its MAC-less form and the tag it carried, if any.
pub fn strip_mac(mut token: AuthToken) -> (AuthToken, Option<String>) {
    let tag = token.hmac.take();
    (token, tag)
}
