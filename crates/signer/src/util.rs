//! Shared curve utilities for the signer crate.

use alloy_primitives::{keccak256, uint, Address, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature as FixedSig, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    pkcs8::DecodePublicKey,
    PublicKey as K256Pub,
};

/// Order of the secp256k1 group.
pub const SECP256K1_N: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

/// `n / 2`; the largest `s` accepted as canonical.
pub const SECP256K1_HALF_N: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Fold `s` into the lower half of the order. Returns the new `s` and whether it was flipped.
pub fn normalize_s(s: U256) -> (U256, bool) {
    if s > SECP256K1_HALF_N {
        (SECP256K1_N - s, true)
    } else {
        (s, false)
    }
}

/// Ethereum address for an uncompressed SEC1 point (`0x04‖x‖y`).
fn address_from_uncompressed(uncompressed: &[u8]) -> Address {
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

pub(crate) fn address_from_verifying_key(vk: &VerifyingKey) -> Address {
    address_from_uncompressed(vk.to_encoded_point(false).as_bytes())
}

/// Derive the address from public key bytes as returned by a KMS.
///
/// Accepts DER `SubjectPublicKeyInfo` (AWS `GetPublicKey`) as well as raw SEC1
/// points, compressed or not.
pub fn address_from_public_key(bytes: &[u8]) -> Option<Address> {
    let pk = K256Pub::from_public_key_der(bytes)
        .or_else(|_| K256Pub::from_sec1_bytes(bytes))
        .ok()?;
    Some(address_from_uncompressed(pk.to_encoded_point(false).as_bytes()))
}

/// Recover the signer address for a single recovery id.
pub fn recover_address(
    hash: &B256,
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: u8,
) -> Option<Address> {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(r);
    buf[32..].copy_from_slice(s);
    let sig = FixedSig::from_slice(&buf).ok()?;
    let rid = RecoveryId::from_byte(recovery_id)?;
    let vk = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, rid).ok()?;
    Some(address_from_verifying_key(&vk))
}

/// Recover the Ethereum recovery id (0/1) for the given `(r,s)` signature such
/// that the recovered public key hashes to `expected`.
/// Returns `None` if no recovery id matches.
pub fn find_recovery_id(hash: &B256, r: &[u8; 32], s: &[u8; 32], expected: Address) -> Option<u8> {
    // Only x-not-reduced ids are considered; a failed candidate moves on to the next.
    (0..=1u8).find(|&recid| recover_address(hash, r, s, recid) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use k256::ecdsa::SigningKey;

    const SCALAR_ONE_ADDRESS: Address = address!("7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

    fn split(sig: &FixedSig) -> ([u8; 32], [u8; 32]) {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig.r().to_bytes());
        s.copy_from_slice(&sig.s().to_bytes());
        (r, s)
    }

    fn key_one() -> SigningKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        SigningKey::from_slice(&bytes).unwrap()
    }

    #[test]
    fn half_order_is_floor_of_n_over_two() {
        assert_eq!(SECP256K1_HALF_N, SECP256K1_N >> 1);
    }

    #[test]
    fn normalize_keeps_low_s() {
        assert_eq!(normalize_s(U256::from(5u64)), (U256::from(5u64), false));
        assert_eq!(normalize_s(SECP256K1_HALF_N), (SECP256K1_HALF_N, false));
    }

    #[test]
    fn normalize_flips_high_s() {
        let high = SECP256K1_HALF_N + U256::from(1u64);
        let (low, flipped) = normalize_s(high);
        assert!(flipped);
        assert_eq!(low, SECP256K1_N - high);
        assert!(low <= SECP256K1_HALF_N);
    }

    #[test]
    fn address_from_sec1_and_der_agree() {
        let vk = *key_one().verifying_key();
        let sec1 = vk.to_encoded_point(false);
        let compressed = vk.to_encoded_point(true);
        assert_eq!(address_from_public_key(sec1.as_bytes()), Some(SCALAR_ONE_ADDRESS));
        assert_eq!(address_from_public_key(compressed.as_bytes()), Some(SCALAR_ONE_ADDRESS));
        assert_eq!(address_from_verifying_key(&vk), SCALAR_ONE_ADDRESS);
    }

    #[test]
    fn garbage_public_key_is_rejected() {
        assert_eq!(address_from_public_key(&[0xde, 0xad, 0xbe, 0xef]), None);
    }

    #[test]
    fn finds_the_matching_recovery_id() {
        let hash = keccak256(b"zkbnb");
        let (sig, rid) = key_one().sign_prehash_recoverable(hash.as_slice()).unwrap();
        let (r, s) = split(&sig);
        assert_eq!(find_recovery_id(&hash, &r, &s, SCALAR_ONE_ADDRESS), Some(rid.to_byte()));
    }

    #[test]
    fn no_recovery_id_for_foreign_address() {
        let hash = keccak256(b"zkbnb");
        let (sig, _) = key_one().sign_prehash_recoverable(hash.as_slice()).unwrap();
        let (r, s) = split(&sig);
        assert_eq!(find_recovery_id(&hash, &r, &s, Address::repeat_byte(0x11)), None);
    }
}
