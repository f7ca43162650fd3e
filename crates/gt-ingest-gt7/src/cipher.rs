//! Salsa20 packet decipher.
//!
//! The key is the ASCII protocol string truncated to 32 bytes. The 8-byte
//! nonce comes from the little-endian word at `0x40` of the *enciphered*
//! packet: `[iv ^ 0xDEADBEAF, iv]`. The keystream covers the whole datagram.

use gt_ingest_core::DecodeError;
use ::cipher::{KeyIvInit, StreamCipher};
use salsa20::Salsa20;

pub const CIPHER_KEY: &[u8] = b"Simulator Interface Packet GT7 ver 0.0";
pub const NONCE_XOR: u32 = 0xDEAD_BEAF;
pub const IV_OFFSET: usize = 0x40;
/// Decrypted payload magic, "0S7G" in little-endian.
pub const MAGIC: u32 = 0x4737_5330;
pub const MIN_CIPHER_LEN: usize = 32;

fn key() -> [u8; 32] {
    let mut key = [0u8; 32];
    let n = CIPHER_KEY.len().min(32);
    key[..n].copy_from_slice(&CIPHER_KEY[..n]);
    key
}

pub fn nonce_for(iv: u32) -> [u8; 8] {
    let mut nonce = [0u8; 8];
    nonce[..4].copy_from_slice(&(iv ^ NONCE_XOR).to_le_bytes());
    nonce[4..].copy_from_slice(&iv.to_le_bytes());
    nonce
}

fn apply_keystream(buf: &mut [u8], iv: u32) {
    let key = key();
    let nonce = nonce_for(iv);
    let mut cipher = Salsa20::new((&key).into(), (&nonce).into());
    cipher.apply_keystream(buf);
}

fn check_len(len: usize) -> Result<(), DecodeError> {
    if len < MIN_CIPHER_LEN {
        return Err(DecodeError::TooShort { len, min: MIN_CIPHER_LEN });
    }
    // the nonce seed has to be inside the packet
    if len < IV_OFFSET + 4 {
        return Err(DecodeError::TooShort { len, min: IV_OFFSET + 4 });
    }
    Ok(())
}

/// Decipher one datagram in place. Short buffers are left untouched; on
/// `InvalidMagic` the buffer holds garbage and must be discarded.
pub fn decipher_in_place(buf: &mut [u8]) -> Result<(), DecodeError> {
    check_len(buf.len())?;
    let iv = u32::from_le_bytes([buf[IV_OFFSET], buf[IV_OFFSET + 1], buf[IV_OFFSET + 2], buf[IV_OFFSET + 3]]);
    apply_keystream(buf, iv);

    let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic(magic));
    }
    Ok(())
}

pub fn decipher(pkt: &[u8]) -> Result<Vec<u8>, DecodeError> {
    check_len(pkt.len())?;
    let mut out = pkt.to_vec();
    decipher_in_place(&mut out)?;
    Ok(out)
}

/// Inverse of [`decipher`] for a chosen nonce seed. The seed overwrites
/// `0x40..0x44` of the result, so those plaintext bytes do not survive.
pub fn encipher(plain: &[u8], iv: u32) -> Vec<u8> {
    let mut out = plain.to_vec();
    apply_keystream(&mut out, iv);
    if out.len() >= IV_OFFSET + 4 {
        out[IV_OFFSET..IV_OFFSET + 4].copy_from_slice(&iv.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plain_packet() -> Vec<u8> {
        let mut p = vec![0u8; 0x128];
        p[..4].copy_from_slice(&MAGIC.to_le_bytes());
        p[0x70..0x74].copy_from_slice(&1234u32.to_le_bytes());
        p
    }

    #[test]
    fn key_is_truncated_protocol_string() {
        assert_eq!(&key(), b"Simulator Interface Packet GT7 v");
    }

    #[test]
    fn nonce_layout() {
        let n = nonce_for(0x0102_0304);
        assert_eq!(&n[4..], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(u32::from_le_bytes([n[0], n[1], n[2], n[3]]), 0x0102_0304 ^ 0xDEAD_BEAF);
    }

    #[test]
    fn round_trip_recovers_magic_and_payload() {
        let plain = plain_packet();
        let wire = encipher(&plain, 0x1357_9BDF);
        assert_ne!(&wire[..4], &plain[..4]);

        let out = decipher(&wire).unwrap();
        assert_eq!(&out[..4], &MAGIC.to_le_bytes());
        assert_eq!(&out[0x70..0x74], &1234u32.to_le_bytes());
        assert_eq!(&out[0x44..], &plain[0x44..]);
    }

    #[test]
    fn deterministic() {
        let wire = encipher(&plain_packet(), 42);
        assert_eq!(decipher(&wire).unwrap(), decipher(&wire).unwrap());
        let mut junk = vec![0x5Au8; 0x128];
        junk[0x40] = 9;
        assert_eq!(decipher(&junk), decipher(&junk));
    }

    #[test]
    fn wrong_key_material_is_invalid_magic() {
        let mut wire = encipher(&plain_packet(), 42);
        wire[IV_OFFSET] ^= 0xFF;
        assert!(matches!(decipher(&wire), Err(DecodeError::InvalidMagic(_))));
    }

    #[test]
    fn nonce_seed_must_fit() {
        let buf = vec![0u8; 40];
        assert_eq!(decipher(&buf), Err(DecodeError::TooShort { len: 40, min: IV_OFFSET + 4 }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn short_buffers_fail_untouched(data in proptest::collection::vec(any::<u8>(), 0..MIN_CIPHER_LEN)) {
            let mut buf = data.clone();
            let err = decipher_in_place(&mut buf).unwrap_err();
            prop_assert_eq!(err, DecodeError::TooShort { len: data.len(), min: MIN_CIPHER_LEN });
            prop_assert_eq!(buf, data);
        }

        #[test]
        fn arbitrary_packets_never_panic(data in proptest::collection::vec(any::<u8>(), 0..400)) {
            let _ = decipher(&data);
        }
    }
}
