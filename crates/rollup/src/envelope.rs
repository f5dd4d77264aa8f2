//! Unsigned and signed transaction envelopes.

use alloy_consensus::{SignableTransaction, TxEip2930, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{keccak256, Address, Bytes, Signature, TxKind, B256};
use zkbnb_signer::{CallContext, EnvelopeFormat, SignatureTriple, SignerError, TxSigner};

/// Transaction ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedEnvelope {
    Legacy(TxLegacy),
    Eip2930(TxEip2930),
}

/// Fields common to both envelope formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub input: Bytes,
}

impl UnsignedEnvelope {
    pub fn new(format: EnvelopeFormat, params: EnvelopeParams) -> Self {
        let EnvelopeParams { chain_id, nonce, gas_price, gas_limit, to, input } = params;
        match format {
            EnvelopeFormat::Legacy => Self::Legacy(TxLegacy {
                chain_id: Some(chain_id),
                nonce,
                gas_price,
                gas_limit,
                to: TxKind::Call(to),
                input,
                ..Default::default()
            }),
            EnvelopeFormat::Eip2930 => Self::Eip2930(TxEip2930 {
                chain_id,
                nonce,
                gas_price,
                gas_limit,
                to: TxKind::Call(to),
                input,
                ..Default::default()
            }),
        }
    }

    pub fn format(&self) -> EnvelopeFormat {
        match self {
            Self::Legacy(_) => EnvelopeFormat::Legacy,
            Self::Eip2930(_) => EnvelopeFormat::Eip2930,
        }
    }

    /// Digest the signer authorizes.
    pub fn signature_hash(&self) -> B256 {
        match self {
            Self::Legacy(tx) => tx.signature_hash(),
            Self::Eip2930(tx) => tx.signature_hash(),
        }
    }

    /// Attach `sig` and produce the wire encoding.
    ///
    /// Legacy envelopes carry `v = 35 + 2 * chain_id + recovery_id`; typed
    /// envelopes carry the bare parity.
    pub fn into_signed(self, sig: SignatureTriple) -> SignedEnvelope {
        let sig = Signature::from(sig);
        let envelope: TxEnvelope = match self {
            Self::Legacy(tx) => tx.into_signed(sig).into(),
            Self::Eip2930(tx) => tx.into_signed(sig).into(),
        };
        let raw = Bytes::from(envelope.encoded_2718());
        SignedEnvelope { hash: keccak256(&raw), raw }
    }
}

/// Broadcast-ready transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub hash: B256,
    pub raw: Bytes,
}

/// Sign `unsigned` with `signer` under `ctx`.
pub async fn sign_envelope(
    unsigned: UnsignedEnvelope,
    signer: &dyn TxSigner,
    ctx: &CallContext,
) -> Result<SignedEnvelope, SignerError> {
    let sig = signer.sign_hash(unsigned.signature_hash(), ctx).await?;
    Ok(unsigned.into_signed(sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_eips::eip2718::Decodable2718;
    use alloy_primitives::{address, U256};
    use zkbnb_signer::SigningIdentity;

    fn params() -> EnvelopeParams {
        EnvelopeParams {
            chain_id: 56,
            nonce: 5,
            gas_price: 1_000_000_000,
            gas_limit: 21_000,
            to: Address::repeat_byte(0x42),
            input: Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]),
        }
    }

    fn identity() -> SigningIdentity {
        SigningIdentity::from_private_key(format!("{:064x}", 1)).unwrap()
    }

    #[tokio::test]
    async fn legacy_envelope_uses_eip155() {
        let identity = identity();
        let unsigned = UnsignedEnvelope::new(EnvelopeFormat::Legacy, params());
        let digest = unsigned.signature_hash();
        let signed = sign_envelope(unsigned, &identity, &CallContext::default()).await.unwrap();

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_ref()).unwrap();
        let TxEnvelope::Legacy(tx) = decoded else { panic!("expected legacy envelope") };
        assert_eq!(tx.tx().chain_id, Some(56));
        assert_eq!(tx.tx().nonce, 5);
        assert_eq!(tx.tx().signature_hash(), digest);
        assert_eq!(*tx.hash(), signed.hash);

        let triple = SignatureTriple::from(tx.signature());
        assert!(matches!(triple.v(EnvelopeFormat::Legacy, Some(56)), 147 | 148));
        assert_eq!(
            triple.recover_address(&digest),
            Some(address!("7E5F4552091A69125d5DfCb7b8C2659029395Bdf"))
        );
    }

    #[tokio::test]
    async fn eip2930_envelope_carries_parity() {
        let identity = identity();
        let unsigned = UnsignedEnvelope::new(EnvelopeFormat::Eip2930, params());
        assert_eq!(unsigned.format(), EnvelopeFormat::Eip2930);
        let digest = unsigned.signature_hash();
        let signed = sign_envelope(unsigned, &identity, &CallContext::default()).await.unwrap();
        assert_eq!(signed.raw[0], 0x01);

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_ref()).unwrap();
        let TxEnvelope::Eip2930(tx) = decoded else { panic!("expected EIP-2930 envelope") };
        assert_eq!(tx.tx().chain_id, 56);
        assert_eq!(tx.tx().value, U256::ZERO);
        let triple = SignatureTriple::from(tx.signature());
        assert!(triple.v(EnvelopeFormat::Eip2930, Some(56)) <= 1);
        assert_eq!(triple.recover_address(&digest), Some(identity.address()));
    }

    #[tokio::test]
    async fn legacy_v_matches_wire_for_largest_chain_id() {
        let identity = identity();
        let params = EnvelopeParams { chain_id: u64::MAX, ..params() };
        let unsigned = UnsignedEnvelope::new(EnvelopeFormat::Legacy, params);
        let signed = sign_envelope(unsigned, &identity, &CallContext::default()).await.unwrap();

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_ref()).unwrap();
        let TxEnvelope::Legacy(tx) = decoded else { panic!("expected legacy envelope") };
        assert_eq!(tx.tx().chain_id, Some(u64::MAX));
        let triple = SignatureTriple::from(tx.signature());
        assert_eq!(
            triple.v(EnvelopeFormat::Legacy, tx.tx().chain_id),
            alloy_consensus::transaction::to_eip155_value(tx.signature().v(), Some(u64::MAX))
        );
    }

    #[test]
    fn formats_produce_distinct_digests() {
        let legacy = UnsignedEnvelope::new(EnvelopeFormat::Legacy, params());
        let typed = UnsignedEnvelope::new(EnvelopeFormat::Eip2930, params());
        assert_ne!(legacy.signature_hash(), typed.signature_hash());
    }
}
