//! On-disk record encoding: the ASCII decimal expiry timestamp (UNIX
//! seconds), a single `\n`, then the serialized value.

/// Field delimiter between the expiry and the payload.
pub(crate) const RECORD_DELIMITER: char = '\n';

/// A structurally decoded record: expiry plus the still-serialized payload.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RawRecord<'a> {
    pub expires_at: u64,
    pub payload: &'a str,
}

/// Structural corruption in a record file.
///
/// Never surfaced to callers: the adapters handle it by deleting the record
/// and reporting a miss.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum RecordError {
    #[error("record has no field delimiter")]
    MissingDelimiter,
    #[error("record expiry is not a non-negative integer")]
    InvalidExpiry,
}

pub(crate) fn encode_record(expires_at: u64, payload: &str) -> String {
    format!("{expires_at}{RECORD_DELIMITER}{payload}")
}

/// Split a record into its expiry and payload halves.
///
/// Only the FIRST delimiter is structural; the payload may legitimately
/// contain the delimiter byte itself.
pub(crate) fn decode_record(content: &str) -> Result<RawRecord<'_>, RecordError> {
    let (expiry, payload) = content
        .split_once(RECORD_DELIMITER)
        .ok_or(RecordError::MissingDelimiter)?;
    let expires_at = expiry
        .parse::<u64>()
        .map_err(|_| RecordError::InvalidExpiry)?;
    Ok(RawRecord {
        expires_at,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let encoded = encode_record(1_700_000_000, "\"hello\"");
        assert_eq!(encoded, "1700000000\n\"hello\"");
        let record = decode_record(&encoded).unwrap();
        assert_eq!(record.expires_at, 1_700_000_000);
        assert_eq!(record.payload, "\"hello\"");
    }

    #[test]
    fn splits_on_first_delimiter_only() {
        let record = decode_record("42\nline one\nline two").unwrap();
        assert_eq!(record.expires_at, 42);
        assert_eq!(record.payload, "line one\nline two");
    }

    #[test]
    fn empty_payload_is_well_formed() {
        let record = decode_record("7\n").unwrap();
        assert_eq!(record.expires_at, 7);
        assert_eq!(record.payload, "");
    }

    #[test]
    fn missing_delimiter_is_corruption() {
        assert_eq!(decode_record("1234"), Err(RecordError::MissingDelimiter));
        assert_eq!(decode_record(""), Err(RecordError::MissingDelimiter));
    }

    #[test]
    fn non_numeric_expiry_is_corruption() {
        assert_eq!(
            decode_record("soon\n\"v\""),
            Err(RecordError::InvalidExpiry)
        );
        assert_eq!(decode_record("-5\n\"v\""), Err(RecordError::InvalidExpiry));
        assert_eq!(decode_record("1.5\n\"v\""), Err(RecordError::InvalidExpiry));
        assert_eq!(decode_record("\n\"v\""), Err(RecordError::InvalidExpiry));
    }
}
