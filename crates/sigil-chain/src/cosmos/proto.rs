//! Cosmos SDK protobuf messages used for direct signing.
//!
//! Only the subset needed to build `TxBody`, `AuthInfo`, `SignDoc` and
//! `TxRaw` is declared. Field tags follow `cosmos.tx.v1beta1`; none of the
//! messages contain maps, so `prost` output is deterministic.

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Any {
    /// Type URL.
    #[prost(string, tag = "1")]
    pub type_url: String,
    /// Encoded message.
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// `cosmos.base.v1beta1.Coin`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Coin {
    /// Denomination.
    #[prost(string, tag = "1")]
    pub denom: String,
    /// Decimal integer amount.
    #[prost(string, tag = "2")]
    pub amount: String,
}

/// `cosmos.tx.v1beta1.TxBody`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct TxBody {
    /// Messages.
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    /// Memo.
    #[prost(string, tag = "2")]
    pub memo: String,
    /// Timeout height.
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

/// `cosmos.crypto.secp256k1.PubKey`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct PubKey {
    /// 33-byte compressed key.
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

/// `cosmos.tx.signing.v1beta1.SignMode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignMode {
    /// Unspecified.
    Unspecified = 0,
    /// `SIGN_MODE_DIRECT`.
    Direct = 1,
    /// `SIGN_MODE_TEXTUAL`.
    Textual = 2,
    /// `SIGN_MODE_LEGACY_AMINO_JSON`.
    LegacyAminoJson = 127,
}

/// `cosmos.tx.v1beta1.ModeInfo`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ModeInfo {
    /// Signing mode.
    #[prost(oneof = "mode_info::Sum", tags = "1")]
    pub sum: Option<mode_info::Sum>,
}

/// Nested types of [`ModeInfo`].
pub mod mode_info {
    /// `ModeInfo.Single`.
    #[derive(Clone, PartialEq, Eq, ::prost::Message)]
    pub struct Single {
        /// Signing mode.
        #[prost(enumeration = "super::SignMode", tag = "1")]
        pub mode: i32,
    }

    /// `ModeInfo.sum`.
    #[derive(Clone, PartialEq, Eq, ::prost::Oneof)]
    pub enum Sum {
        /// Single signer.
        #[prost(message, tag = "1")]
        Single(Single),
    }
}

impl ModeInfo {
    /// A single-signer mode info.
    #[must_use]
    pub fn single(mode: SignMode) -> Self {
        Self {
            sum: Some(mode_info::Sum::Single(mode_info::Single { mode: mode.into() })),
        }
    }
}

/// `cosmos.tx.v1beta1.SignerInfo`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SignerInfo {
    /// Signer public key as `Any`.
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    /// Signing mode.
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    /// Account sequence.
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

/// `cosmos.tx.v1beta1.Fee`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Fee {
    /// Fee amount.
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<Coin>,
    /// Gas limit.
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    /// Fee payer.
    #[prost(string, tag = "3")]
    pub payer: String,
    /// Fee granter.
    #[prost(string, tag = "4")]
    pub granter: String,
}

/// `cosmos.tx.v1beta1.AuthInfo`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AuthInfo {
    /// Signer infos.
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    /// Fee.
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

/// `cosmos.tx.v1beta1.SignDoc`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct SignDoc {
    /// Encoded `TxBody`.
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    /// Encoded `AuthInfo`.
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    /// Chain id.
    #[prost(string, tag = "3")]
    pub chain_id: String,
    /// Account number.
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

/// `cosmos.tx.v1beta1.TxRaw`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct TxRaw {
    /// Encoded `TxBody`.
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    /// Encoded `AuthInfo`.
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    /// One signature per signer info.
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

/// `cosmos.bank.v1beta1.MsgSend`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct MsgSend {
    /// Sender address.
    #[prost(string, tag = "1")]
    pub from_address: String,
    /// Recipient address.
    #[prost(string, tag = "2")]
    pub to_address: String,
    /// Amount.
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}
