use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Tagged wrapper written around every mirrored collection:
/// `{data, timestamp, count}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: Vec<T>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub count: usize,
}

/// What a cache key may hold. The on-disk format changed over the
/// system's life: early writers stored the bare array, later ones the
/// envelope. Readers must accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CacheRecord<T> {
    Envelope(Envelope<T>),
    Legacy(Vec<T>),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed cache record: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl<T> Envelope<T> {
    pub fn now(data: Vec<T>) -> Self {
        Envelope {
            count: data.len(),
            timestamp: OffsetDateTime::now_utc(),
            data,
        }
    }
}

/// Migrate a legacy bare-array record into the envelope format. The
/// timestamp reflects migration time; the original write time was never
/// recorded by the legacy format.
pub fn legacy_array_to_envelope<T>(data: Vec<T>) -> Envelope<T> {
    Envelope::now(data)
}

/// Parse a raw cache value into an envelope, migrating the legacy
/// format on the fly. Any other shape is an error for the caller to
/// consume.
pub fn decode_record<T: DeserializeOwned>(raw: &str) -> Result<Envelope<T>, DecodeError> {
    match serde_json::from_str::<CacheRecord<T>>(raw)? {
        CacheRecord::Envelope(envelope) => Ok(envelope),
        CacheRecord::Legacy(data) => Ok(legacy_array_to_envelope(data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_envelope_format() {
        let raw = r#"{"data":[1,2,3],"timestamp":"2026-01-15T10:00:00Z","count":3}"#;
        let envelope: Envelope<i32> = decode_record(raw).unwrap();
        assert_eq!(envelope.data, vec![1, 2, 3]);
        assert_eq!(envelope.count, 3);
    }

    #[test]
    fn migrates_legacy_bare_array() {
        let raw = "[4,5]";
        let envelope: Envelope<i32> = decode_record(raw).unwrap();
        assert_eq!(envelope.data, vec![4, 5]);
        assert_eq!(envelope.count, 2);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(decode_record::<i32>("{\"foo\":1}").is_err());
        assert!(decode_record::<i32>("not json at all").is_err());
        assert!(decode_record::<i32>("42").is_err());
    }
}
