//! MD5 form signing.
//!
//! Two signature schemes are in play. The mobile-app API signs the ordered
//! parameter list with a fixed literal suffix appended; the IM REST
//! endpoints sign the parameters sorted by key with no suffix. Both emit a
//! lowercase hex digest carried as an extra `sign` parameter.

use serde_json::Value;

const SIGN_SUFFIX: &[u8] = b"tiebaclient!!!";

/// A parameter value that signs either as a string or as an integer
#[derive(Debug, Clone)]
pub enum SignValue {
    /// Signed verbatim
    Str(String),
    /// Signed in decimal
    Int(i64),
}

impl From<&str> for SignValue {
    fn from(s: &str) -> Self {
        SignValue::Str(s.to_owned())
    }
}

impl From<String> for SignValue {
    fn from(s: String) -> Self {
        SignValue::Str(s)
    }
}

impl From<i64> for SignValue {
    fn from(i: i64) -> Self {
        SignValue::Int(i)
    }
}

/// Signs an ordered parameter list the way the mobile client does.
///
/// The digest runs over `key=value` for each pair in the order given, then
/// the fixed suffix. The parameter order is part of the signature; callers
/// must pass the list in the order it is sent.
pub fn sign(params: &[(&str, SignValue)]) -> String {
    let mut ctx = md5::Context::new();
    for (key, value) in params {
        ctx.consume(key.as_bytes());
        ctx.consume(b"=");
        match value {
            SignValue::Str(s) => ctx.consume(s.as_bytes()),
            SignValue::Int(i) => ctx.consume(i.to_string().as_bytes()),
        }
    }
    ctx.consume(SIGN_SUFFIX);
    format!("{:x}", ctx.compute())
}

/// Signs a JSON parameter object the way the IM REST endpoints do:
/// keys sorted lexicographically, `key=value` concatenated, no suffix.
pub fn sign_sorted(params: &serde_json::Map<String, Value>) -> String {
    let mut items: Vec<(&String, &Value)> = params.iter().collect();
    items.sort_by(|a, b| a.0.cmp(b.0));

    let mut ctx = md5::Context::new();
    for (key, value) in items {
        ctx.consume(key.as_bytes());
        ctx.consume(b"=");
        match value {
            Value::String(s) => ctx.consume(s.as_bytes()),
            other => ctx.consume(other.to_string().as_bytes()),
        }
    }
    format!("{:x}", ctx.compute())
}
