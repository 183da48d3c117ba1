//! Blinded Diffie-Hellmann key exchange

use std::ops::Deref;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Parity, PublicKey as NormalizedPublicKey, Scalar, XOnlyPublicKey};
use thiserror::Error;

use crate::nuts::nut01::{Keys, PublicKey, SecretKey};
use crate::nuts::{BlindSignature, Proof, Proofs};
use crate::secret::Secret;
use crate::SECP256K1;

const DOMAIN_SEPARATOR: &[u8; 28] = b"Secp256k1_HashToCurve_Cashu_";

/// DHKE Error
#[derive(Debug, Error)]
pub enum Error {
    /// No valid point could be found within the search ceiling
    #[error("No valid point on curve")]
    HashToCurveFailed,
    /// No key in the keyset for the signature amount
    #[error("No key for amount")]
    AmountKey,
    /// Unblinded signature does not verify for the secret
    #[error("Token not verified")]
    TokenNotVerified,
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// NUT01 error
    #[error(transparent)]
    NUT01(#[from] crate::nuts::nut01::Error),
}

/// Deterministically map a message to a point on the curve
///
/// `sha256(sha256(domain || message) || le_u32(counter))` is interpreted as
/// an even-parity x coordinate; the counter is incremented until the x
/// coordinate decompresses. Gives up after 2^16 attempts.
pub fn hash_to_curve(message: &[u8]) -> Result<PublicKey, Error> {
    let msg_to_hash: Vec<u8> = [DOMAIN_SEPARATOR, message].concat();

    let msg_hash: [u8; 32] = Sha256Hash::hash(&msg_to_hash).to_byte_array();

    let mut counter: u32 = 0;
    while counter < 2_u32.pow(16) {
        let mut bytes_to_hash: Vec<u8> = Vec::with_capacity(36);
        bytes_to_hash.extend_from_slice(&msg_hash);
        bytes_to_hash.extend_from_slice(&counter.to_le_bytes());
        let hash: [u8; 32] = Sha256Hash::hash(&bytes_to_hash).to_byte_array();

        match XOnlyPublicKey::from_slice(&hash) {
            Ok(pk) => {
                return Ok(NormalizedPublicKey::from_x_only_public_key(pk, Parity::Even).into())
            }
            Err(_) => {
                counter += 1;
            }
        }
    }

    Err(Error::HashToCurveFailed)
}

/// Blind Message
///
/// `B_ = Y + rG`
pub fn blind_message(
    secret: &[u8],
    blinding_factor: Option<SecretKey>,
) -> Result<(PublicKey, SecretKey), Error> {
    let y: PublicKey = hash_to_curve(secret)?;
    let r: SecretKey = blinding_factor.unwrap_or_else(SecretKey::generate);
    Ok((y.combine(&r.public_key())?.into(), r))
}

/// Unblind Message
///
/// `C = C_ - rK`
pub fn unblind_message(
    // C_
    blinded_key: &PublicKey,
    r: &SecretKey,
    // K
    mint_pubkey: &PublicKey,
) -> Result<PublicKey, Error> {
    let r: Scalar = Scalar::from(r.deref().to_owned());

    // a = r * K
    let a: PublicKey = mint_pubkey.mul_tweak(&SECP256K1, &r)?.into();

    // C_ - a
    let a: PublicKey = a.negate(&SECP256K1).into();
    Ok(blinded_key.combine(&a)?.into())
}

/// Sign Blinded Message
///
/// `C_ = k * B_`, where `k` is the mint's private key for the amount and
/// `B_` is the blinded message. `B_` must be a valid non-identity curve
/// point; the identity is unrepresentable in [`PublicKey`] so an invalid
/// blinded message is rejected at parse time, before signing.
#[inline]
pub fn sign_message(k: &SecretKey, blinded_message: &PublicKey) -> Result<PublicKey, Error> {
    let k: Scalar = Scalar::from(k.deref().to_owned());
    Ok(blinded_message.mul_tweak(&SECP256K1, &k)?.into())
}

/// Verify that an unblinded signature is `k * hash_to_curve(secret)`
pub fn verify_message(
    k: &SecretKey,
    unblinded_message: PublicKey,
    msg: &[u8],
) -> Result<(), Error> {
    // Y
    let y: PublicKey = hash_to_curve(msg)?;

    let expected: PublicKey = y
        .mul_tweak(&SECP256K1, &Scalar::from(k.deref().to_owned()))?
        .into();

    if unblinded_message == expected {
        return Ok(());
    }

    Err(Error::TokenNotVerified)
}

/// Construct proofs from the mint's blind signatures
pub fn construct_proofs(
    promises: Vec<BlindSignature>,
    rs: Vec<SecretKey>,
    secrets: Vec<Secret>,
    keys: &Keys,
) -> Result<Proofs, Error> {
    let mut proofs = vec![];
    for ((blinded_signature, r), secret) in promises.into_iter().zip(rs).zip(secrets) {
        let blinded_c: PublicKey = blinded_signature.c;
        let k: PublicKey = keys
            .amount_key(blinded_signature.amount)
            .ok_or(Error::AmountKey)?;

        let unblinded_signature: PublicKey = unblind_message(&blinded_c, &r, &k)?;

        proofs.push(Proof::new(
            blinded_signature.amount,
            blinded_signature.keyset_id,
            secret,
            unblinded_signature,
        ));
    }

    Ok(proofs)
}
