//! Hashing and signature checks exposed to the guest.
//!
//! Content hashes are real because contracts assert on exact digests. Generic signature
//! verification is a stand-in that always succeeds; the EVM-compatible check performs a real
//! secp256k1 recovery because contract logic inspects its outcome.

use alloy_primitives::{keccak256, Address};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha2::{Digest, Sha256};

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Keccak-256 digest of `data`.
pub fn keccak(data: &[u8]) -> [u8; 32] {
    keccak256(data).0
}

/// Recovers the uncompressed (65-byte) public key that signed `digest`.
///
/// `signature` is `r || s || v` with `v` in `{0, 1, 27, 28}`. Returns `None` for malformed input
/// or a failed recovery.
pub fn recover_pubkey(digest: &[u8], signature: &[u8]) -> Option<[u8; 65]> {
    if digest.len() != 32 || signature.len() != 65 {
        return None;
    }
    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return None,
    };
    let recovery_id = RecoveryId::try_from(v).ok()?;
    let signature = Signature::from_slice(&signature[..64]).ok()?;
    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id).ok()?;

    let point = key.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    Some(out)
}

/// Whether `signature` over `digest` was produced by `pubkey`.
///
/// `pubkey` may be uncompressed (65 bytes), compressed (33 bytes) or raw `x || y` (64 bytes).
pub fn evm_signature_valid(digest: &[u8], signature: &[u8], pubkey: &[u8]) -> bool {
    let Some(recovered) = recover_pubkey(digest, signature) else {
        return false;
    };
    normalize_pubkey(pubkey).is_some_and(|expected| expected == recovered)
}

/// The EVM address of a public key: the last 20 bytes of `keccak256(x || y)`.
pub fn evm_address_from_pubkey(pubkey: &[u8]) -> Option<Address> {
    let uncompressed = normalize_pubkey(pubkey)?;
    let hash = keccak256(&uncompressed[1..]);
    Some(Address::from_slice(&hash[12..]))
}

fn normalize_pubkey(pubkey: &[u8]) -> Option<[u8; 65]> {
    let key = match pubkey.len() {
        64 => {
            let mut sec1 = [0u8; 65];
            sec1[0] = 0x04;
            sec1[1..].copy_from_slice(pubkey);
            VerifyingKey::from_sec1_bytes(&sec1).ok()?
        }
        33 | 65 => VerifyingKey::from_sec1_bytes(pubkey).ok()?,
        _ => return None,
    };
    let point = key.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signed(digest: &[u8; 32]) -> (Vec<u8>, Vec<u8>) {
        let key = SigningKey::from_slice(&[0x11; 32]).unwrap();
        let (signature, recovery_id) = key.sign_prehash_recoverable(digest).unwrap();
        let mut sig = signature.to_bytes().to_vec();
        sig.push(recovery_id.to_byte() + 27);
        let pubkey = key.verifying_key().to_encoded_point(false).as_bytes().to_vec();
        (sig, pubkey)
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex::encode(keccak(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_evm_signature_valid_accepts_signer() {
        let digest = keccak(b"message");
        let (sig, pubkey) = signed(&digest);
        assert!(evm_signature_valid(&digest, &sig, &pubkey));
        assert!(evm_signature_valid(&digest, &sig, &pubkey[1..]));

        let compressed = VerifyingKey::from_sec1_bytes(&pubkey)
            .unwrap()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        assert!(evm_signature_valid(&digest, &sig, &compressed));
    }

    #[test]
    fn test_evm_signature_valid_rejects_mismatch() {
        let digest = keccak(b"message");
        let (sig, pubkey) = signed(&digest);
        assert!(!evm_signature_valid(&keccak(b"other"), &sig, &pubkey));

        let mut bad_v = sig.clone();
        bad_v[64] = 5;
        assert!(!evm_signature_valid(&digest, &bad_v, &pubkey));
        assert!(!evm_signature_valid(&digest, &sig[..64], &pubkey));
        assert!(!evm_signature_valid(&digest, &sig, &[4u8; 10]));
    }

    #[test]
    fn test_address_from_recovered_key() {
        let digest = keccak(b"message");
        let (sig, pubkey) = signed(&digest);
        let recovered = recover_pubkey(&digest, &sig).unwrap();
        assert_eq!(recovered.to_vec(), pubkey);
        assert_eq!(evm_address_from_pubkey(&recovered), evm_address_from_pubkey(&pubkey));
    }
}
