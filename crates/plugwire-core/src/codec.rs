//! Binary codec for string-only host channels.
//!
//! Arbitrary byte payloads (control messages, sysex, state dumps) are carried
//! as standard padded base64. Both directions work in bounded chunks so a
//! large payload never turns into one oversized host call argument.
//!
//! Chunk boundaries are aligned to base64 quanta (3 bytes in, 4 characters
//! out), so chunked output is byte-identical to encoding the payload in one go.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::WireResult;
use crate::types::CODEC_CHUNK_SIZE;

/// Encode bytes to base64 using the default chunk size.
pub fn encode(bytes: &[u8]) -> String {
    encode_chunked(bytes, CODEC_CHUNK_SIZE)
}

/// Decode base64 to bytes using the default chunk size.
pub fn decode(text: &str) -> WireResult<Vec<u8>> {
    decode_chunked(text, CODEC_CHUNK_SIZE)
}

/// Encode bytes to base64, `chunk_size` input bytes at a time.
pub fn encode_chunked(bytes: &[u8], chunk_size: usize) -> String {
    let chunk = encode_chunk_len(chunk_size);
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for part in bytes.chunks(chunk) {
        STANDARD.encode_string(part, &mut out);
    }
    out
}

/// Decode base64 to bytes, one chunk of characters at a time.
pub fn decode_chunked(text: &str, chunk_size: usize) -> WireResult<Vec<u8>> {
    let chunk = encode_chunk_len(chunk_size) / 3 * 4;
    let mut out = Vec::with_capacity(recovered_byte_length(text));
    for part in text.as_bytes().chunks(chunk) {
        STANDARD.decode_vec(part, &mut out)?;
    }
    Ok(out)
}

/// Byte length implied by a base64 string when no explicit length is sent.
///
/// `floor(len * 3 / 4)`; an upper bound on the decoded length that is exact
/// for unpadded quanta.
pub fn recovered_byte_length(text: &str) -> usize {
    text.len() * 3 / 4
}

fn encode_chunk_len(chunk_size: usize) -> usize {
    (chunk_size / 3 * 3).max(3)
}

/// Serde adapter storing `Vec<u8>` fields as base64 strings.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Payload {
///     #[serde(with = "plugwire_core::codec::base64_bytes")]
///     data: Vec<u8>,
/// }
/// ```
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode(&text).map_err(serde::de::Error::custom)
    }
}
