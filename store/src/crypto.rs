//! Hashing and address rendering used by the stores.
//!
//! Key *generation* is not here — that stays behind the
//! [`KeyGenerator`](crate::external::KeyGenerator) collaborator.

//---------------------------------------------------------------------------------------------------- Import
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::constants::ADDRESS_VERSION_BYTE;

//---------------------------------------------------------------------------------------------------- Hashes
/// Double SHA-256; the hash identifying blocks and transactions.
pub fn hash256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(bytes)).into()
}

/// RIPEMD-160 of SHA-256; the 160-bit public-key hash.
pub fn hash160(bytes: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(bytes)).into()
}

//---------------------------------------------------------------------------------------------------- Addresses
/// Render a public key as its base58check address string.
pub fn pub_key_to_address(pub_key: &[u8]) -> String {
    bs58::encode(hash160(pub_key))
        .with_check_version(ADDRESS_VERSION_BYTE)
        .into_string()
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hashes_have_expected_widths_and_are_deterministic() {
        assert_eq!(hash256(b"abc"), hash256(b"abc"));
        assert_ne!(hash256(b"abc"), hash256(b"abd"));
        assert_eq!(hash160(b"abc").len(), 20);
    }

    #[test]
    fn empty_input_double_sha256() {
        // SHA-256d of the empty string, a fixed vector.
        assert_eq!(
            hex::encode(hash256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456",
        );
    }

    #[test]
    fn addresses_are_base58check() {
        let address = pub_key_to_address(&[0x04; 65]);
        // Version byte 0 renders with a leading '1'.
        assert!(address.starts_with('1'));
        assert!(address.len() >= 26);

        let payload = bs58::decode(&address)
            .with_check(Some(ADDRESS_VERSION_BYTE))
            .into_vec()
            .unwrap();
        // Version byte + the 20-byte hash.
        assert_eq!(payload.len(), 21);
        assert_eq!(payload[1..], hash160(&[0x04; 65]));
    }
}
