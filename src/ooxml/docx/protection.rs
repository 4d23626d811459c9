//! Password protection and content signatures.
//!
//! Passwords are hashed as Word does for `w:documentProtection`: the
//! password is encoded as UTF-16LE, `H0 = H(salt || password)`, then
//! `Hn = H(Hn-1 || n as u32 LE)` for `spinCount` rounds. Removing
//! protection recomputes the hash from the stored algorithm, salt and spin
//! count and compares in constant time.

use crate::common::error::{Error, Result};
use crate::ooxml::custom_properties::{CustomProperties, PropertyValue};
use crate::ooxml::docx::document::{Block, Document};
use crate::ooxml::docx::package::{DocxPackage, ProtectedPackage};
use crate::ooxml::docx::settings::{EditRestriction, HashAlgorithm, ProtectionDescriptor, Settings};
use crate::ooxml::docx::template::default_settings_xml;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use chrono::{DateTime, Timelike, Utc};
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

const SIGNER_PROPERTY: &str = "docsmith.signature.signer";
const SIGNED_AT_PROPERTY: &str = "docsmith.signature.timestamp";
const FINGERPRINT_PROPERTY: &str = "docsmith.signature.sha256";

/// Hashing parameters for new protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionOptions {
    pub spin_count: u32,
    pub salt_len: usize,
}

impl Default for ProtectionOptions {
    fn default() -> Self {
        Self {
            spin_count: 100_000,
            salt_len: 16,
        }
    }
}

fn iterate<D: Digest>(salt: &[u8], password: &[u8], spin_count: u32) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(salt);
    hasher.update(password);
    let mut hash = hasher.finalize().to_vec();

    for i in 0..spin_count {
        let mut hasher = D::new();
        hasher.update(&hash);
        hasher.update(i.to_le_bytes());
        hash = hasher.finalize().to_vec();
    }
    hash
}

/// Derive the protection hash of `password`.
pub fn hash_password(algorithm: HashAlgorithm, password: &str, salt: &[u8], spin_count: u32) -> Vec<u8> {
    let mut pw_bytes = Vec::with_capacity(password.len() * 2);
    for ch in password.encode_utf16() {
        pw_bytes.extend_from_slice(&ch.to_le_bytes());
    }
    match algorithm {
        HashAlgorithm::Sha1 => iterate::<Sha1>(salt, &pw_bytes, spin_count),
        HashAlgorithm::Sha256 => iterate::<Sha256>(salt, &pw_bytes, spin_count),
        HashAlgorithm::Sha384 => iterate::<Sha384>(salt, &pw_bytes, spin_count),
        HashAlgorithm::Sha512 => iterate::<Sha512>(salt, &pw_bytes, spin_count),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Read-only protection report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionStatus {
    pub protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restriction: Option<EditRestriction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_count: Option<u32>,
    pub legacy: bool,
}

/// Describe the protection of a package without changing it.
pub fn protection_status(package: &DocxPackage) -> Result<ProtectionStatus> {
    let descriptor = package.settings()?.map(|s| s.protection()).transpose()?.flatten();
    Ok(match descriptor {
        Some(d) => ProtectionStatus {
            protected: d.enforced,
            restriction: Some(d.restriction),
            algorithm: d.algorithm,
            has_password: d.has_password(),
            spin_count: d.has_password().then_some(d.spin_count),
            legacy: d.legacy,
        },
        None => ProtectionStatus {
            protected: false,
            restriction: None,
            algorithm: None,
            has_password: false,
            spin_count: None,
            legacy: false,
        },
    })
}

/// Restrict editing with a password.
pub fn protect(
    package: &mut DocxPackage,
    password: &str,
    restriction: EditRestriction,
    options: &ProtectionOptions,
) -> Result<ProtectionStatus> {
    if password.is_empty() {
        return Err(Error::Validation("password must not be empty".to_string()));
    }
    if restriction == EditRestriction::None {
        return Err(Error::Validation("an edit restriction is required".to_string()));
    }
    if options.salt_len == 0 {
        return Err(Error::Config("protection.salt_len must be positive".to_string()));
    }
    if package.enforced_protection()?.is_some() {
        return Err(Error::Validation("document is already protected".to_string()));
    }

    let mut salt = vec![0u8; options.salt_len];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut salt)
        .map_err(|e| Error::Validation(format!("failed to generate random salt: {e}")))?;
    let hash = hash_password(HashAlgorithm::Sha512, password, &salt, options.spin_count);

    let descriptor = ProtectionDescriptor {
        restriction,
        enforced: true,
        algorithm: Some(HashAlgorithm::Sha512),
        salt: Some(salt),
        hash: Some(hash),
        spin_count: options.spin_count,
        legacy: false,
    };
    let mut settings = match package.settings()? {
        Some(settings) => settings,
        None => Settings::parse(default_settings_xml().as_bytes())?,
    };
    settings.set_protection(&descriptor);
    package.save_settings(&settings)?;
    log::info!("protected document ({})", restriction.to_xml());
    protection_status(package)
}

impl ProtectedPackage {
    /// Verify `password` against the stored descriptor and lift the
    /// protection. A descriptor without a stored hash is lifted without a
    /// password.
    pub fn unprotect(self, password: &str) -> Result<DocxPackage> {
        let d = &self.descriptor;
        if d.has_password() {
            if d.legacy {
                return Err(Error::Authentication(
                    "legacy Word protection hashes cannot be verified".to_string(),
                ));
            }
            let algorithm = d.algorithm.ok_or_else(|| {
                Error::Authentication("protection uses an unsupported hash algorithm".to_string())
            })?;
            let (Some(salt), Some(expected)) = (&d.salt, &d.hash) else {
                return Err(Error::StructuralInconsistency(
                    "protection hash is stored without a salt".to_string(),
                ));
            };
            let actual = hash_password(algorithm, password, salt, d.spin_count);
            if !constant_time_eq(&actual, expected) {
                log::warn!("protection password rejected");
                return Err(Error::Authentication("incorrect password".to_string()));
            }
        }

        let mut package = self.inner;
        if let Some(mut settings) = package.settings()? {
            settings.remove_protection();
            package.save_settings(&settings)?;
        }
        log::info!("document protection removed");
        Ok(package)
    }
}

/// Whitespace-collapsed paragraph and cell texts, one per line.
pub fn normalized_text(doc: &Document) -> String {
    let collapse = |s: String| s.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut lines = Vec::new();
    for (_, block) in doc.iter() {
        match block {
            Block::Paragraph(p) => lines.push(collapse(p.text())),
            Block::Table(t) => {
                for (_, p) in t.cell_paragraphs() {
                    lines.push(collapse(p.text()));
                }
            },
            Block::Other(_) => {},
        }
    }
    lines.join("\n")
}

/// Base64 SHA-256 over [`normalized_text`].
pub fn fingerprint(doc: &Document) -> String {
    BASE64_ENGINE.encode(Sha256::digest(normalized_text(doc).as_bytes()))
}

/// Stored signature data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureInfo {
    pub signer: String,
    pub timestamp: DateTime<Utc>,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignatureStatus {
    Valid,
    Modified,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureReport {
    pub status: SignatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Record a content fingerprint signed by `signer`.
pub fn create_signature(package: &mut DocxPackage, signer: &str, now: DateTime<Utc>) -> Result<SignatureInfo> {
    let signer = signer.trim();
    if signer.is_empty() {
        return Err(Error::Validation("signer must not be empty".to_string()));
    }
    let timestamp = now.with_nanosecond(0).unwrap_or(now);
    let info = SignatureInfo {
        signer: signer.to_string(),
        timestamp,
        fingerprint: fingerprint(package.document()),
    };

    let mut props = CustomProperties::from_package(package.opc())?;
    props.set(SIGNER_PROPERTY, PropertyValue::String(info.signer.clone()));
    props.set(SIGNED_AT_PROPERTY, PropertyValue::DateTime(timestamp));
    props.set(FINGERPRINT_PROPERTY, PropertyValue::String(info.fingerprint.clone()));
    props.save_to(package.opc_mut())?;
    log::info!("signature recorded for {}", info.signer);
    Ok(info)
}

/// Compare the stored fingerprint with the current content.
pub fn verify_signature(package: &DocxPackage) -> Result<SignatureReport> {
    let props = CustomProperties::from_package(package.opc())?;
    let Some(stored) = props.get(FINGERPRINT_PROPERTY).and_then(PropertyValue::as_str) else {
        return Ok(SignatureReport {
            status: SignatureStatus::Missing,
            signer: None,
            timestamp: None,
        });
    };
    let status = if stored == fingerprint(package.document()) {
        SignatureStatus::Valid
    } else {
        SignatureStatus::Modified
    };
    let timestamp = match props.get(SIGNED_AT_PROPERTY) {
        Some(PropertyValue::DateTime(dt)) => Some(*dt),
        _ => None,
    };
    Ok(SignatureReport {
        status,
        signer: props
            .get(SIGNER_PROPERTY)
            .and_then(PropertyValue::as_str)
            .map(str::to_string),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::package::LoadedPackage;
    use crate::ooxml::docx::testing::package_with;

    const FAST: ProtectionOptions = ProtectionOptions {
        spin_count: 10,
        salt_len: 16,
    };

    fn reload(package: &mut DocxPackage) -> LoadedPackage {
        LoadedPackage::load(&package.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        let salt = [7u8; 16];
        let a = hash_password(HashAlgorithm::Sha512, "secret", &salt, 100);
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_password(HashAlgorithm::Sha512, "secret", &salt, 100));
        assert_ne!(a, hash_password(HashAlgorithm::Sha512, "secret", &salt, 101));
        assert_ne!(a, hash_password(HashAlgorithm::Sha512, "secret", &[8u8; 16], 100));
        assert_eq!(hash_password(HashAlgorithm::Sha1, "x", &salt, 1).len(), 20);
    }

    #[test]
    fn test_protect_round_trip() {
        let mut package = package_with(&["Intro", "Body"]);
        let before = package.document().to_xml();
        let status = protect(&mut package, "s3cret", EditRestriction::ReadOnly, &FAST).unwrap();
        assert!(status.protected && status.has_password);

        let LoadedPackage::Protected(protected) = reload(&mut package) else {
            panic!("expected a protected package");
        };
        assert_eq!(protected.descriptor().spin_count, 10);
        let unlocked = protected.unprotect("s3cret").unwrap();
        assert_eq!(unlocked.document().to_xml(), before);
        assert!(!protection_status(&unlocked).unwrap().protected);
    }

    #[test]
    fn test_wrong_password_leaves_descriptor() {
        let mut package = package_with(&["Intro"]);
        protect(&mut package, "right", EditRestriction::Comments, &FAST).unwrap();
        let LoadedPackage::Protected(protected) = reload(&mut package) else {
            panic!("expected a protected package");
        };
        let stored = protected.descriptor().clone();
        let err = protected.clone().unprotect("wrong");
        assert!(matches!(err, Err(Error::Authentication(_))));
        assert_eq!(protected.descriptor(), &stored);
    }

    #[test]
    fn test_protect_twice_and_edit_refused() {
        let mut package = package_with(&["Intro"]);
        protect(&mut package, "pw", EditRestriction::ReadOnly, &FAST).unwrap();
        let again = protect(&mut package, "pw", EditRestriction::ReadOnly, &FAST);
        assert!(matches!(again, Err(Error::Validation(_))));
        assert!(matches!(reload(&mut package).into_editable(), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_passwordless_protection_is_removable() {
        let mut package = package_with(&["Intro"]);
        let mut settings = package.settings().unwrap().unwrap();
        settings.set_protection(&ProtectionDescriptor {
            restriction: EditRestriction::Forms,
            enforced: true,
            algorithm: None,
            salt: None,
            hash: None,
            spin_count: 0,
            legacy: false,
        });
        package.save_settings(&settings).unwrap();

        let LoadedPackage::Protected(protected) = reload(&mut package) else {
            panic!("expected a protected package");
        };
        assert!(protected.unprotect("").is_ok());
    }

    #[test]
    fn test_signature_lifecycle() {
        let mut package = package_with(&["Intro", "  Body   text "]);
        assert_eq!(verify_signature(&package).unwrap().status, SignatureStatus::Missing);

        let info = create_signature(&mut package, "Reviewer", Utc::now()).unwrap();
        let report = verify_signature(&package).unwrap();
        assert_eq!(report.status, SignatureStatus::Valid);
        assert_eq!(report.signer.as_deref(), Some("Reviewer"));
        assert_eq!(report.timestamp, Some(info.timestamp));

        package.document_mut().paragraph_mut(0).unwrap().replace_text("Intro", "Changed");
        assert_eq!(verify_signature(&package).unwrap().status, SignatureStatus::Modified);
    }

    #[test]
    fn test_normalized_text_collapses_whitespace() {
        let package = package_with(&["a  b", " c "]);
        assert_eq!(normalized_text(package.document()), "a b\nc");
    }
}
