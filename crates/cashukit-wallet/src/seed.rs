//! Mnemonic and seed handling
//!
//! BIP39 entropy, mnemonic and seed derivation backing wallet
//! initialization and restoration.

use std::str::FromStr;

use bip39::Mnemonic;
use bitcoin::bip32::Xpriv;
use bitcoin::Network;

use crate::error::Error;

/// Allowed entropy strengths in bits, mapping to 12, 15, 18, 21 and 24
/// word mnemonics
const VALID_STRENGTHS: [usize; 5] = [128, 160, 192, 224, 256];

/// Generate a fresh mnemonic of the given strength in bits
pub fn generate_mnemonic(strength_bits: usize) -> Result<Mnemonic, Error> {
    if !VALID_STRENGTHS.contains(&strength_bits) {
        return Err(Error::InvalidEntropy);
    }

    Ok(Mnemonic::generate(strength_bits / 32 * 3)?)
}

/// Mnemonic from raw entropy
///
/// Entropy must be 16, 20, 24, 28 or 32 bytes.
pub fn mnemonic_from_entropy(entropy: &[u8]) -> Result<Mnemonic, Error> {
    if !VALID_STRENGTHS.contains(&(entropy.len() * 8)) {
        return Err(Error::InvalidEntropy);
    }

    Ok(Mnemonic::from_entropy(entropy)?)
}

/// Entropy from a mnemonic; the checksum is verified by the parse
pub fn entropy_from_mnemonic(mnemonic: &str) -> Result<Vec<u8>, Error> {
    let mnemonic = Mnemonic::from_str(mnemonic)?;
    Ok(mnemonic.to_entropy())
}

/// 64-byte seed from a mnemonic and passphrase
///
/// `PBKDF2-HMAC-SHA512(nfkd(mnemonic), "mnemonic" || nfkd(passphrase),
/// 2048, 64)` per BIP39.
pub fn seed_from_mnemonic(mnemonic: &str, passphrase: &str) -> Result<[u8; 64], Error> {
    let mnemonic = Mnemonic::from_str(mnemonic)?;
    Ok(mnemonic.to_seed_normalized(passphrase))
}

/// Master extended private key from a 64-byte seed
pub fn master_xpriv(seed: &[u8]) -> Result<Xpriv, Error> {
    Ok(Xpriv::new_master(Network::Bitcoin, seed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str =
        "half depart obvious quality work element tank gorilla view sugar picture humble";

    #[test]
    fn test_mnemonic_entropy_round_trip() {
        let entropy = entropy_from_mnemonic(MNEMONIC).unwrap();
        assert_eq!(entropy.len(), 16);

        let mnemonic = mnemonic_from_entropy(&entropy).unwrap();
        assert_eq!(mnemonic.to_string(), MNEMONIC);
    }

    #[test]
    fn test_invalid_entropy_sizes() {
        for size in [0usize, 8, 15, 17, 33, 64] {
            let entropy = vec![0u8; size];
            assert!(matches!(
                mnemonic_from_entropy(&entropy),
                Err(Error::InvalidEntropy)
            ));
        }

        for size in [16usize, 20, 24, 28, 32] {
            let entropy = vec![0u8; size];
            assert!(mnemonic_from_entropy(&entropy).is_ok());
        }
    }

    #[test]
    fn test_generate_mnemonic_word_counts() {
        for (bits, words) in [(128, 12), (160, 15), (192, 18), (224, 21), (256, 24)] {
            let mnemonic = generate_mnemonic(bits).unwrap();
            assert_eq!(mnemonic.word_count(), words);
        }

        assert!(generate_mnemonic(127).is_err());
        assert!(generate_mnemonic(512).is_err());
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        // Bad checksum
        assert!(entropy_from_mnemonic(
            "half depart obvious quality work element tank gorilla view sugar picture abandon"
        )
        .is_err());

        // Not on the wordlist
        assert!(entropy_from_mnemonic("definitely not a bip39 phrase").is_err());
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = seed_from_mnemonic(MNEMONIC, "").unwrap();
        let b = seed_from_mnemonic(MNEMONIC, "").unwrap();
        assert_eq!(a, b);

        // A passphrase changes the seed
        let c = seed_from_mnemonic(MNEMONIC, "passphrase").unwrap();
        assert_ne!(a, c);

        let xpriv_a = master_xpriv(&a).unwrap();
        let xpriv_b = master_xpriv(&b).unwrap();
        assert_eq!(xpriv_a, xpriv_b);
    }
}
