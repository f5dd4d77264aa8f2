//! Canonical `(r, s, v)` produced by every signer backend.

use alloy_primitives::{Address, Signature, B256, U256};

use crate::util::{recover_address, SECP256K1_HALF_N};

/// Transaction envelope the signature is destined for. Decides how `v` is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// Pre-2718 transaction with EIP-155 replay protection.
    #[default]
    Legacy,
    /// EIP-2930 typed transaction; `v` is the bare y-parity.
    Eip2930,
}

/// ECDSA signature with a 0/1 recovery id. `s` is always in the lower half of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureTriple {
    pub r: U256,
    pub s: U256,
    pub recovery_id: u8,
}

impl SignatureTriple {
    /// `v` as it appears on the wire for `format`.
    ///
    /// Legacy: `35 + 2 * chain_id + recovery_id` (EIP-155), or `27 + recovery_id`
    /// when no chain id is bound. Typed envelopes carry the raw recovery id.
    /// Widened to `u128` so every `u64` chain id encodes without overflow.
    pub fn v(&self, format: EnvelopeFormat, chain_id: Option<u64>) -> u128 {
        let parity = u128::from(self.recovery_id);
        match (format, chain_id) {
            (EnvelopeFormat::Legacy, Some(id)) => 35 + 2 * u128::from(id) + parity,
            (EnvelopeFormat::Legacy, None) => 27 + parity,
            (EnvelopeFormat::Eip2930, _) => parity,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.s <= SECP256K1_HALF_N
    }

    /// Compact `r‖s‖recovery_id`.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        out[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        out[64] = self.recovery_id;
        out
    }

    /// Address whose key produced this signature over `hash`.
    pub fn recover_address(&self, hash: &B256) -> Option<Address> {
        recover_address(
            hash,
            &self.r.to_be_bytes::<32>(),
            &self.s.to_be_bytes::<32>(),
            self.recovery_id,
        )
    }
}

impl From<SignatureTriple> for Signature {
    fn from(sig: SignatureTriple) -> Self {
        Self::new(sig.r, sig.s, sig.recovery_id == 1)
    }
}

impl From<&Signature> for SignatureTriple {
    fn from(sig: &Signature) -> Self {
        Self { r: sig.r(), s: sig.s(), recovery_id: u8::from(sig.v()) }
    }
}
