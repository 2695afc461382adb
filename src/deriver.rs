//! Address Deriver (§4.4) — BIP-39 checksum validation followed by BIP-32/44/84
//! key derivation and chain-specific address encoding.
//!
//! Bitcoin derivation mirrors `leeseer-bip39_recovery`'s use of
//! `bitcoin::bip32`; Ethereum derivation (uncompressed pubkey → Keccak-256 →
//! last 20 bytes → EIP-55 checksum) is grounded on
//! `darkmatter-vanity-address-generator/src/main.rs`.

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{PublicKey as SecpPublicKey, Secp256k1};
use bitcoin::{Address, Network};
use sha3::{Digest, Keccak256};

use crate::config::Chain;
use crate::error::DeriverError;

const BITCOIN_PATH: &str = "m/84'/0'/0'/0/0";
const ETHEREUM_PATH: &str = "m/44'/60'/0'/0/0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedAddress {
    Bitcoin(String),
    Ethereum(String),
    Both { bitcoin: String, ethereum: String },
}

impl DerivedAddress {
    /// Returns `(chain_label, matched_address)` if `target` matches one of
    /// the addresses this candidate derived. Ethereum addresses compare
    /// case-insensitively (EIP-55 casing is a checksum hint, not identity).
    pub fn matches(&self, target: &str) -> Option<(&'static str, &str)> {
        match self {
            DerivedAddress::Bitcoin(addr) => (addr == target).then_some(("bitcoin", addr.as_str())),
            DerivedAddress::Ethereum(addr) => {
                addr.eq_ignore_ascii_case(target).then_some(("ethereum", addr.as_str()))
            }
            DerivedAddress::Both { bitcoin, ethereum } => {
                if bitcoin == target {
                    Some(("bitcoin", bitcoin.as_str()))
                } else if ethereum.eq_ignore_ascii_case(target) {
                    Some(("ethereum", ethereum.as_str()))
                } else {
                    None
                }
            }
        }
    }
}

pub struct AddressDeriver {
    secp: Secp256k1<bitcoin::secp256k1::All>,
}

impl AddressDeriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Validate `phrase` as a BIP-39 mnemonic and, if valid, derive the
    /// address(es) requested by `chain`. Returns `Ok(None)` for a checksum
    /// failure (`InvalidMnemonic`) — the expected, silently-skipped outcome
    /// that filters the combinatorial space (§4.4 step 1).
    pub fn derive(&self, phrase: &str, chain: Chain) -> Result<Option<DerivedAddress>, DeriverError> {
        let mnemonic = match Mnemonic::parse_in_normalized(Language::English, phrase) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        let seed = mnemonic.to_seed("");
        let master = Xpriv::new_master(Network::Bitcoin, &seed)
            .map_err(|e| DeriverError::Fatal(e.to_string()))?;

        let derived = match chain {
            Chain::Bitcoin => DerivedAddress::Bitcoin(self.derive_bitcoin(&master)?),
            Chain::Ethereum => DerivedAddress::Ethereum(self.derive_ethereum(&master)?),
            Chain::Both => DerivedAddress::Both {
                bitcoin: self.derive_bitcoin(&master)?,
                ethereum: self.derive_ethereum(&master)?,
            },
        };
        Ok(Some(derived))
    }

    fn derive_bitcoin(&self, master: &Xpriv) -> Result<String, DeriverError> {
        let path: DerivationPath = BITCOIN_PATH
            .parse()
            .map_err(|e: bitcoin::bip32::Error| DeriverError::Fatal(e.to_string()))?;
        let child = master
            .derive_priv(&self.secp, &path)
            .map_err(|e| DeriverError::Fatal(e.to_string()))?;
        let pubkey = bitcoin::PublicKey::new(child.private_key.public_key(&self.secp));
        let address = Address::p2wpkh(&pubkey, Network::Bitcoin)
            .map_err(|e| DeriverError::Fatal(e.to_string()))?;
        Ok(address.to_string())
    }

    fn derive_ethereum(&self, master: &Xpriv) -> Result<String, DeriverError> {
        let path: DerivationPath = ETHEREUM_PATH
            .parse()
            .map_err(|e: bitcoin::bip32::Error| DeriverError::Fatal(e.to_string()))?;
        let child = master
            .derive_priv(&self.secp, &path)
            .map_err(|e| DeriverError::Fatal(e.to_string()))?;

        let secret_key = child.private_key.inner;
        let pubkey = SecpPublicKey::from_secret_key(&self.secp, &secret_key);
        let uncompressed = pubkey.serialize_uncompressed();
        debug_assert_eq!(uncompressed[0], 0x04);

        let mut hasher = Keccak256::new();
        hasher.update(&uncompressed[1..]);
        let hash = hasher.finalize();
        let address_bytes = &hash[12..];

        Ok(to_eip55(address_bytes))
    }
}

impl Default for AddressDeriver {
    fn default() -> Self {
        Self::new()
    }
}

/// EIP-55 mixed-case checksum: uppercase each hex letter whose corresponding
/// Keccak-256 nibble (of the lowercase hex string) is >= 8.
fn to_eip55(address_bytes: &[u8]) -> String {
    let lower = hex::encode(address_bytes);

    let mut hasher = Keccak256::new();
    hasher.update(lower.as_bytes());
    let hash = hasher.finalize();

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        if c.is_ascii_alphabetic() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            out.push(if nibble >= 8 { c.to_ascii_uppercase() } else { c });
        } else {
            out.push(c);
        }
    }
    out
}
