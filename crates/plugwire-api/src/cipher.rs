// ── Autokey XOR stream cipher ──
//
// The device protocol obfuscates every payload with a running-key XOR.
// Encoding feeds each *output* byte back as the next key; decoding feeds
// each *input* byte back. The asymmetry matters: using the same update
// rule in both directions corrupts everything after the first byte.

use bytes::{BufMut, BytesMut};

use crate::error::Error;

/// Initial key used by every known device firmware.
pub const DEFAULT_KEY: u8 = 0xAB;

/// Size of the big-endian length prefix used on TCP.
pub const HEADER_LEN: usize = 4;

/// Encode `plaintext` with the autokey cipher, starting from `key`.
pub fn encode(plaintext: &[u8], key: u8) -> Vec<u8> {
    let mut key = key;
    plaintext
        .iter()
        .map(|&byte| {
            let out = key ^ byte;
            key = out;
            out
        })
        .collect()
}

/// Decode `ciphertext` produced by [`encode`] with the same initial `key`.
pub fn decode(ciphertext: &[u8], key: u8) -> Vec<u8> {
    let mut key = key;
    ciphertext
        .iter()
        .map(|&byte| {
            let out = key ^ byte;
            key = byte;
            out
        })
        .collect()
}

/// Encode with a 4-byte big-endian prefix holding the *plaintext* length.
pub fn encode_framed(plaintext: &[u8], key: u8) -> Result<Vec<u8>, Error> {
    let len = u32::try_from(plaintext.len()).map_err(|_| Error::PayloadTooLarge {
        len: plaintext.len(),
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + plaintext.len());
    buf.put_u32(len);
    buf.put_slice(&encode(plaintext, key));
    Ok(buf.to_vec())
}

/// Read the announced plaintext length from a framed buffer, if the
/// header has arrived yet.
pub fn frame_len(buf: &[u8]) -> Option<usize> {
    let header: [u8; HEADER_LEN] = buf.get(..HEADER_LEN)?.try_into().ok()?;
    usize::try_from(u32::from_be_bytes(header)).ok()
}

/// Strip the length prefix and decode the body.
///
/// Fails with [`Error::Decode`] if the buffer is shorter than the header
/// or shorter than the length the header announces.
pub fn decode_framed(framed: &[u8], key: u8) -> Result<Vec<u8>, Error> {
    let Some(expected) = frame_len(framed) else {
        return Err(Error::decode(
            format!("response shorter than {HEADER_LEN}-byte header ({} bytes)", framed.len()),
            framed,
        ));
    };

    let body = &framed[HEADER_LEN..];
    if body.len() < expected {
        return Err(Error::decode(
            format!(
                "truncated response: header announced {expected} bytes, received {}",
                body.len()
            ),
            framed,
        ));
    }

    Ok(decode(&body[..expected], key))
}
