//! Frame codec.
//!
//! Frames are `[id: u16 big-endian][body: MessagePack]`. This layer does not
//! know which body shape belongs to which id; see [`crate::payload`] for that.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProtoError;

/// Number of header bytes preceding the body.
pub const HEADER_LEN: usize = 2;

/// A decoded frame borrowing its body from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Payload id from the header.
    pub id: u16,
    /// Raw MessagePack body.
    pub body: &'a [u8],
}

impl Frame<'_> {
    /// Deserialize the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Decoding`] if the body is not a valid `T`.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, ProtoError> {
        Ok(rmp_serde::from_slice(self.body)?)
    }
}

/// Serialize `body` and prefix it with `id`.
///
/// Structs are written with named fields so the server can decode them as maps.
///
/// # Errors
///
/// Returns [`ProtoError::Encoding`] if the body cannot be serialized.
pub fn encode_frame<T: Serialize + ?Sized>(id: u16, body: &T) -> Result<Vec<u8>, ProtoError> {
    let encoded = rmp_serde::to_vec_named(body)?;
    let mut frame = Vec::with_capacity(HEADER_LEN + encoded.len());
    frame.extend_from_slice(&id.to_be_bytes());
    frame.extend_from_slice(&encoded);
    Ok(frame)
}

/// Split a frame into its id and body.
///
/// # Errors
///
/// Returns [`ProtoError::Truncated`] if fewer than two bytes are supplied.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame<'_>, ProtoError> {
    match bytes {
        [hi, lo, body @ ..] => Ok(Frame {
            id: u16::from_be_bytes([*hi, *lo]),
            body,
        }),
        _ => Err(ProtoError::Truncated(bytes.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::IgnoredAny;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use test_case::test_case;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_header_is_big_endian() {
        let frame = encode_frame(0x0102, &()).expect("encode");
        assert_eq!(&frame[..HEADER_LEN], &[0x01, 0x02]);
    }

    #[test]
    fn test_body_follows_header() {
        let sample = Sample {
            name: "abc".to_string(),
            count: 3,
        };
        let frame = encode_frame(7, &sample).expect("encode");
        let expected = rmp_serde::to_vec_named(&sample).expect("msgpack");
        assert_eq!(&frame[HEADER_LEN..], expected.as_slice());
    }

    #[test]
    fn test_structs_are_encoded_as_maps() {
        let sample = Sample {
            name: "abc".to_string(),
            count: 3,
        };
        let frame = encode_frame(1, &sample).expect("encode");
        let decoded = decode_frame(&frame).expect("decode");
        let as_map: BTreeMap<String, IgnoredAny> = decoded.body().expect("map body");
        assert!(as_map.contains_key("name"));
        assert!(as_map.contains_key("count"));
    }

    #[test]
    fn test_decode_frame_roundtrip() {
        let sample = Sample {
            name: "frame".to_string(),
            count: 99,
        };
        let bytes = encode_frame(513, &sample).expect("encode");
        let frame = decode_frame(&bytes).expect("decode");
        assert_eq!(frame.id, 513);
        assert_eq!(frame.body::<Sample>().expect("body"), sample);
    }

    #[test_case(&[] ; "empty")]
    #[test_case(&[0x00] ; "single byte")]
    fn test_decode_frame_rejects_short_input(bytes: &[u8]) {
        let err = decode_frame(bytes).unwrap_err();
        assert!(matches!(err, ProtoError::Truncated(n) if n == bytes.len()));
    }

    #[test]
    fn test_decode_frame_accepts_empty_body() {
        let frame = decode_frame(&[0x00, 0x04]).expect("decode");
        assert_eq!(frame.id, 4);
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_bad_body_propagates_decode_error() {
        // 0xc1 is never used in MessagePack.
        let frame = decode_frame(&[0x00, 0x01, 0xc1]).expect("header");
        let err = frame.body::<Sample>().unwrap_err();
        assert!(matches!(err, ProtoError::Decoding(_)));
    }
}
