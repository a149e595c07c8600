//! Certificate generation and decryption used to check sealed output.

use std::io::Read;
use std::time::{Duration, SystemTime};

use sequoia_openpgp::cert::{CertBuilder, CipherSuite};
use sequoia_openpgp::crypto::SessionKey;
use sequoia_openpgp::packet::{PKESK, SKESK};
use sequoia_openpgp::parse::stream::{
    DecryptionHelper, DecryptorBuilder, MessageStructure, VerificationHelper,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::{Policy, StandardPolicy};
use sequoia_openpgp::types::SymmetricAlgorithm;
use sequoia_openpgp::{Cert, Fingerprint, KeyHandle};

pub(crate) fn encryption_cert(uid: &str) -> Cert {
    let (cert, _) = CertBuilder::new()
        .add_userid(uid)
        .add_transport_encryption_subkey()
        .generate()
        .unwrap();
    cert
}

pub(crate) fn expiring_encryption_cert(uid: &str, created: SystemTime, validity: Duration) -> Cert {
    let (cert, _) = CertBuilder::new()
        .set_creation_time(created)
        .set_validity_period(validity)
        .add_userid(uid)
        .add_transport_encryption_subkey()
        .generate()
        .unwrap();
    cert
}

pub(crate) fn rsa_encryption_cert(uid: &str) -> Cert {
    let (cert, _) = CertBuilder::new()
        .set_cipher_suite(CipherSuite::RSA2k)
        .add_userid(uid)
        .add_transport_encryption_subkey()
        .generate()
        .unwrap();
    cert
}

pub(crate) fn two_encryption_subkeys_cert(uid: &str) -> Cert {
    let (cert, _) = CertBuilder::new()
        .add_userid(uid)
        .add_transport_encryption_subkey()
        .add_storage_encryption_subkey()
        .generate()
        .unwrap();
    cert
}

pub(crate) fn signing_only_cert(uid: &str) -> Cert {
    let (cert, _) = CertBuilder::new()
        .add_userid(uid)
        .add_signing_subkey()
        .generate()
        .unwrap();
    cert
}

struct Helper<'a> {
    policy: &'a dyn Policy,
    secret: &'a Cert,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<Cert>> {
        Ok(vec![])
    }

    fn check(&mut self, _structure: MessageStructure) -> sequoia_openpgp::Result<()> {
        Ok(())
    }
}

impl DecryptionHelper for Helper<'_> {
    fn decrypt<D>(
        &mut self,
        pkesks: &[PKESK],
        _skesks: &[SKESK],
        sym_algo: Option<SymmetricAlgorithm>,
        mut decrypt: D,
    ) -> sequoia_openpgp::Result<Option<Fingerprint>>
    where
        D: FnMut(SymmetricAlgorithm, &SessionKey) -> bool,
    {
        for ka in self
            .secret
            .keys()
            .unencrypted_secret()
            .with_policy(self.policy, None)
            .supported()
            .for_transport_encryption()
            .for_storage_encryption()
        {
            let mut pair = ka.key().clone().into_keypair()?;
            for pkesk in pkesks {
                let accepted = pkesk
                    .decrypt(&mut pair, sym_algo)
                    .map(|(algo, session_key)| decrypt(algo, &session_key))
                    .unwrap_or(false);
                if accepted {
                    return Ok(Some(ka.key().fingerprint()));
                }
            }
        }
        Err(anyhow::anyhow!("no matching secret key"))
    }
}

/// Decrypts `ciphertext` with the secret keys of `secret` and returns the
/// literal data body.
pub(crate) fn decrypt(secret: &Cert, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
    let policy = StandardPolicy::new();
    let helper = Helper {
        policy: &policy,
        secret,
    };
    let mut decryptor =
        DecryptorBuilder::from_bytes(ciphertext)?.with_policy(&policy, None, helper)?;
    let mut plaintext = vec![];
    decryptor.read_to_end(&mut plaintext)?;
    Ok(plaintext)
}
