//! SignatureVerifier: decides whether a signed link is valid.
//!
//! The signer address is probed for contract code. No code means an
//! externally-owned account, checked by public-key recovery. Code means a
//! contract wallet, asked through `isValidSignature`. The key-lifecycle
//! check against a profile is reported separately from the cryptographic
//! verdict.

use namelink_core::{Address, CoreError, KeyStatus, Link, Profile, LINK_SCHEMA_VERSION};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::chain::{CallOutcome, ChainClient};
use crate::eip1271;
use crate::error::{Result, VerifyError};

/// Verifier settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Treat links from signers with no registered key as untrusted.
    pub require_registered_key: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            require_registered_key: true,
        }
    }
}

/// How the signer was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    /// Externally-owned account: signature recovery.
    Eoa,
    /// Contract wallet: on-chain `isValidSignature`.
    ContractWallet,
}

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// Recovery produced a different address.
    SignerMismatch { recovered: Address },
    /// No public key recovers from this signature and digest.
    Unrecoverable,
    /// The wallet answered without the magic value.
    ContractRejected,
    /// The wallet call reverted.
    ContractReverted,
    /// Bound to another chain and not recoverable to the signer. Either the
    /// signed chain id was altered or the signer is a contract wallet on a
    /// chain this verifier cannot ask.
    ChainMismatch { link_chain: u64, verifier_chain: u64 },
}

/// The cryptographic verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    Valid,
    Invalid(InvalidReason),
}

/// Result of checking one link's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub signer: Address,
    pub signer_kind: SignerKind,
    pub outcome: SignatureOutcome,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.outcome == SignatureOutcome::Valid
    }
}

/// Signature verdict plus the signer's key status in a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileVerification {
    pub report: VerificationReport,
    /// Status of the signer's key at the link's `signedAt`.
    pub key_status: KeyStatus,
    /// Valid signature and an acceptable key.
    pub trusted: bool,
}

impl ProfileVerification {
    pub fn is_trusted(&self) -> bool {
        self.trusted
    }
}

/// Verifies links against a chain.
pub struct SignatureVerifier<C> {
    chain: C,
    config: VerifierConfig,
}

impl<C: ChainClient> SignatureVerifier<C> {
    pub fn new(chain: C) -> Self {
        Self::with_config(chain, VerifierConfig::default())
    }

    pub fn with_config(chain: C, config: VerifierConfig) -> Self {
        Self { chain, config }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Check a link's signature.
    ///
    /// Fails only for malformed input or when the chain cannot be asked. A
    /// wrong signature is `Ok` with [`SignatureOutcome::Invalid`].
    ///
    /// An unknown `schemaVersion` is rejected with
    /// [`VerifyError::UnsupportedVersion`] before any signature check, since
    /// the canonical bytes of another version are not defined here. This
    /// includes a link whose signed version field was altered.
    pub async fn verify(&self, link: &Link) -> Result<VerificationReport> {
        let body = &link.body;
        if body.schema_version != LINK_SCHEMA_VERSION {
            return Err(VerifyError::UnsupportedVersion(body.schema_version));
        }
        link.signature
            .check_well_formed()
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;

        let signer = body.signer_address;
        let digest = body.signing_digest();

        if body.chain_id != self.chain.chain_id() {
            return self.verify_foreign_chain(link, &digest);
        }

        let is_contract = self.chain.has_code(&signer).await.map_err(|e| {
            warn!(%signer, error = %e, "code probe failed");
            VerifyError::from(e)
        })?;

        if is_contract {
            debug!(%signer, "verifying via contract wallet");
            self.verify_contract(link, &digest).await
        } else {
            debug!(%signer, "verifying via signature recovery");
            Ok(VerificationReport {
                signer,
                signer_kind: SignerKind::Eoa,
                outcome: recover_outcome(link, &digest)?,
            })
        }
    }

    /// Check a link's signature and the signer's key in `profile`.
    pub async fn verify_for_profile(
        &self,
        profile: &Profile,
        link: &Link,
    ) -> Result<ProfileVerification> {
        let report = self.verify(link).await?;
        let key_status = profile.key_status(&link.body.signer_address, link.body.signed_at);

        let key_ok = match key_status {
            KeyStatus::Active => true,
            KeyStatus::NotRegistered => !self.config.require_registered_key,
            _ => false,
        };
        if report.is_valid() && !key_ok {
            debug!(signer = %report.signer, ?key_status, "valid signature from unusable key");
        }

        Ok(ProfileVerification {
            trusted: report.is_valid() && key_ok,
            report,
            key_status,
        })
    }

    async fn verify_contract(&self, link: &Link, digest: &[u8; 32]) -> Result<VerificationReport> {
        let signer = link.body.signer_address;
        let data = eip1271::encode_call(digest, link.signature.as_bytes());

        let outcome = match self.chain.call(&signer, &data).await {
            Ok(CallOutcome::Returned(ret)) if eip1271::is_magic_return(&ret) => {
                SignatureOutcome::Valid
            }
            Ok(CallOutcome::Returned(_)) => {
                SignatureOutcome::Invalid(InvalidReason::ContractRejected)
            }
            Ok(CallOutcome::Reverted) => SignatureOutcome::Invalid(InvalidReason::ContractReverted),
            Err(e) => {
                warn!(%signer, error = %e, "wallet call failed");
                return Err(e.into());
            }
        };

        Ok(VerificationReport {
            signer,
            signer_kind: SignerKind::ContractWallet,
            outcome,
        })
    }

    /// A link bound to another chain can still be checked by recovery, but
    /// a contract wallet on that chain cannot be asked from here.
    fn verify_foreign_chain(&self, link: &Link, digest: &[u8; 32]) -> Result<VerificationReport> {
        let signer = link.body.signer_address;
        let outcome = match recover_outcome(link, digest)? {
            SignatureOutcome::Valid => SignatureOutcome::Valid,
            SignatureOutcome::Invalid(_) => {
                debug!(%signer, link_chain = link.body.chain_id, "foreign-chain link does not recover");
                SignatureOutcome::Invalid(InvalidReason::ChainMismatch {
                    link_chain: link.body.chain_id,
                    verifier_chain: self.chain.chain_id(),
                })
            }
        };
        Ok(VerificationReport {
            signer,
            signer_kind: SignerKind::Eoa,
            outcome,
        })
    }
}

fn recover_outcome(link: &Link, digest: &[u8; 32]) -> Result<SignatureOutcome> {
    match link.signature.recover(digest) {
        Ok(recovered) if recovered == link.body.signer_address => Ok(SignatureOutcome::Valid),
        Ok(recovered) => Ok(SignatureOutcome::Invalid(InvalidReason::SignerMismatch {
            recovered,
        })),
        Err(CoreError::Unrecoverable) => Ok(SignatureOutcome::Invalid(InvalidReason::Unrecoverable)),
        Err(e) => Err(VerifyError::MalformedSignature(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryChain, OwnerWallet};
    use namelink_core::{Keypair, LinkDraft, LinkSigner, Nonce, SigningKey};
    use std::sync::Arc;

    const CHAIN: u64 = 100;

    fn signed(keypair: &Keypair, signed_at: u64) -> Link {
        LinkSigner::new(CHAIN)
            .sign_at(
                LinkDraft::new("avatar", "Qm123"),
                keypair,
                signed_at,
                Nonce::random(),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_eoa_roundtrip_valid() {
        let chain = Arc::new(MemoryChain::new(CHAIN));
        let verifier = SignatureVerifier::new(chain.clone());
        let keypair = Keypair::generate();

        let report = verifier.verify(&signed(&keypair, 1_000)).await.unwrap();
        assert!(report.is_valid());
        assert_eq!(report.signer_kind, SignerKind::Eoa);
        assert_eq!(chain.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tampered_link_invalid_not_error() {
        let verifier = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let keypair = Keypair::generate();
        let mut link = signed(&keypair, 1_000);
        link.body.name = "banner".into();

        let report = verifier.verify(&link).await.unwrap();
        assert!(!report.is_valid());
        assert!(matches!(
            report.outcome,
            SignatureOutcome::Invalid(
                InvalidReason::SignerMismatch { .. } | InvalidReason::Unrecoverable
            )
        ));
    }

    #[tokio::test]
    async fn test_foreign_signer_mismatch() {
        let verifier = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let mut link = signed(&Keypair::generate(), 1_000);
        let claimed = Keypair::generate();
        link.body.signer_address = claimed.address();

        let report = verifier.verify(&link).await.unwrap();
        assert!(matches!(
            report.outcome,
            SignatureOutcome::Invalid(InvalidReason::SignerMismatch { recovered })
                if recovered != claimed.address()
        ));
    }

    #[tokio::test]
    async fn test_malformed_signature_is_error() {
        let verifier = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let mut link = signed(&Keypair::generate(), 1_000);
        link.signature.0[64] = 9;

        assert!(matches!(
            verifier.verify(&link).await,
            Err(VerifyError::MalformedSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let verifier = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let mut link = signed(&Keypair::generate(), 1_000);
        link.body.schema_version = 2;

        assert!(matches!(
            verifier.verify(&link).await,
            Err(VerifyError::UnsupportedVersion(2))
        ));
    }

    #[tokio::test]
    async fn test_contract_wallet_paths() {
        let owner = Keypair::generate();
        let wallet = Address::from_bytes([0xcc; 20]);
        let chain = Arc::new(MemoryChain::new(CHAIN));
        chain.deploy(wallet, OwnerWallet::new(owner.address())).unwrap();
        let verifier = SignatureVerifier::new(chain.clone());

        let link = LinkSigner::new(CHAIN)
            .sign_for_wallet(LinkDraft::new("avatar", "Qm123"), &owner, wallet)
            .unwrap();
        let report = verifier.verify(&link).await.unwrap();
        assert_eq!(report.signer_kind, SignerKind::ContractWallet);
        assert!(report.is_valid());

        let stranger_link = LinkSigner::new(CHAIN)
            .sign_for_wallet(LinkDraft::new("avatar", "Qm123"), &Keypair::generate(), wallet)
            .unwrap();
        assert_eq!(
            verifier.verify(&stranger_link).await.unwrap().outcome,
            SignatureOutcome::Invalid(InvalidReason::ContractRejected)
        );

        chain.force_revert(wallet).unwrap();
        assert_eq!(
            verifier.verify(&link).await.unwrap().outcome,
            SignatureOutcome::Invalid(InvalidReason::ContractReverted)
        );
    }

    #[tokio::test]
    async fn test_unreachable_chain_is_unavailable() {
        let chain = Arc::new(MemoryChain::new(CHAIN));
        let verifier = SignatureVerifier::new(chain.clone());
        let link = signed(&Keypair::generate(), 1_000);

        chain.set_reachable(false);
        let err = verifier.verify(&link).await.unwrap_err();
        assert!(matches!(err, VerifyError::VerificationUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_foreign_chain_link() {
        let verifier = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let keypair = Keypair::generate();
        let link = LinkSigner::new(1).sign(LinkDraft::new("avatar", "Qm1"), &keypair).unwrap();

        assert!(verifier.verify(&link).await.unwrap().is_valid());

        let wallet_link = LinkSigner::new(1)
            .sign_for_wallet(
                LinkDraft::new("avatar", "Qm1"),
                &keypair,
                Address::from_bytes([0xcc; 20]),
            )
            .unwrap();
        assert_eq!(
            verifier.verify(&wallet_link).await.unwrap().outcome,
            SignatureOutcome::Invalid(InvalidReason::ChainMismatch {
                link_chain: 1,
                verifier_chain: CHAIN,
            })
        );
    }

    #[tokio::test]
    async fn test_altered_chain_id_is_invalid_not_unavailable() {
        let chain = Arc::new(MemoryChain::new(CHAIN));
        let verifier = SignatureVerifier::new(chain.clone());
        let mut link = signed(&Keypair::generate(), 1_000);
        link.body.chain_id = CHAIN + 1;

        let report = verifier.verify(&link).await.unwrap();
        assert!(!report.is_valid());
        assert_eq!(
            report.outcome,
            SignatureOutcome::Invalid(InvalidReason::ChainMismatch {
                link_chain: CHAIN + 1,
                verifier_chain: CHAIN,
            })
        );

        // Decided locally, even with the chain unreachable
        chain.set_reachable(false);
        assert!(!verifier.verify(&link).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_revoked_key_reported_separately() {
        let verifier = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let keypair = Keypair::generate();
        let mut profile = Profile::new();
        let fp = profile
            .register_key(SigningKey::new(&keypair.public_key(), 100))
            .unwrap();
        profile.revoke_key(&fp, 500);

        let before = verifier
            .verify_for_profile(&profile, &signed(&keypair, 400))
            .await
            .unwrap();
        assert!(before.is_trusted());

        let after = verifier
            .verify_for_profile(&profile, &signed(&keypair, 500))
            .await
            .unwrap();
        assert!(after.report.is_valid());
        assert_eq!(after.key_status, KeyStatus::Revoked { at: 500 });
        assert!(!after.is_trusted());

        let early = verifier
            .verify_for_profile(&profile, &signed(&keypair, 99))
            .await
            .unwrap();
        assert_eq!(early.key_status, KeyStatus::NotYetValid);
        assert!(!early.is_trusted());
    }

    #[tokio::test]
    async fn test_unregistered_key_policy() {
        let keypair = Keypair::generate();
        let profile = Profile::new();
        let link = signed(&keypair, 1_000);

        let strict = SignatureVerifier::new(MemoryChain::new(CHAIN));
        let result = strict.verify_for_profile(&profile, &link).await.unwrap();
        assert_eq!(result.key_status, KeyStatus::NotRegistered);
        assert!(!result.is_trusted());

        let lenient = SignatureVerifier::with_config(
            MemoryChain::new(CHAIN),
            VerifierConfig {
                require_registered_key: false,
            },
        );
        assert!(lenient
            .verify_for_profile(&profile, &link)
            .await
            .unwrap()
            .is_trusted());
    }
}
