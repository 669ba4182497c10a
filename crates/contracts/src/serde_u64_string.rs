//! Serialize `u64` seeds and hashes as decimal strings so JSON consumers that
//! parse numbers as doubles do not lose precision. Deserialization accepts a
//! plain number, a decimal string, or a `0x`-prefixed hex string.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum U64Input {
        Text(String),
        Number(u64),
    }

    match U64Input::deserialize(deserializer)? {
        U64Input::Text(raw) => parse_u64_text(&raw).map_err(D::Error::custom),
        U64Input::Number(value) => Ok(value),
    }
}

/// Parse a decimal or `0x` hex `u64`, trimming surrounding whitespace.
pub fn parse_u64_text(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid u64 {raw:?}: {err}"))
}
