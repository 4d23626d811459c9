//! Protection and signature operations.

use crate::common::error::{Error, Result};
use crate::ooxml::docx::package::LoadedPackage;
use crate::ooxml::docx::protection::{self, ProtectionStatus, SignatureInfo, SignatureReport};
use crate::ooxml::docx::settings::EditRestriction;
use crate::workspace::Workspace;

/// Restrict editing; hashing parameters come from the workspace config.
pub fn protect_document(
    ws: &Workspace,
    filename: &str,
    password: &str,
    restriction: EditRestriction,
) -> Result<ProtectionStatus> {
    log::info!("protect_document {}", filename);
    let options = ws.config().protection;
    ws.transform(filename, |loaded| match loaded {
        LoadedPackage::Protected(_) => Err(Error::Validation("document is already protected".to_string())),
        LoadedPackage::Editable(mut package) => {
            let status = protection::protect(&mut package, password, restriction, &options)?;
            Ok((package, status))
        },
    })
}

pub fn unprotect_document(ws: &Workspace, filename: &str, password: &str) -> Result<ProtectionStatus> {
    log::info!("unprotect_document {}", filename);
    ws.transform(filename, |loaded| match loaded {
        LoadedPackage::Editable(_) => Err(Error::Validation("document is not protected".to_string())),
        LoadedPackage::Protected(protected) => {
            let package = protected.unprotect(password)?;
            let status = protection::protection_status(&package)?;
            Ok((package, status))
        },
    })
}

pub fn verify_document_protection(ws: &Workspace, filename: &str) -> Result<ProtectionStatus> {
    log::info!("verify_document_protection {}", filename);
    ws.read(filename, |loaded| protection::protection_status(loaded.view()))
}

pub fn create_signature(ws: &Workspace, filename: &str, signer: &str) -> Result<SignatureInfo> {
    log::info!("create_signature {}", filename);
    ws.edit(filename, |package| protection::create_signature(package, signer, chrono::Utc::now()))
}

pub fn verify_signature(ws: &Workspace, filename: &str) -> Result<SignatureReport> {
    log::info!("verify_signature {}", filename);
    ws.read(filename, |loaded| protection::verify_signature(loaded.view()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ooxml::docx::format::RunFormat;
    use crate::ooxml::docx::protection::{ProtectionOptions, SignatureStatus};
    use crate::ops::document::{add_paragraph, get_document_text, search_and_replace};

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(Config {
            working_dir: dir.path().to_path_buf(),
            protection: ProtectionOptions {
                spin_count: 10,
                salt_len: 16,
            },
            ..Config::default()
        });
        ws.create("doc", None, None).unwrap();
        add_paragraph(&ws, "doc", "Terms apply.", None, &RunFormat::default()).unwrap();
        (dir, ws)
    }

    #[test]
    fn test_protect_round_trip() {
        let (dir, ws) = workspace();
        let status = protect_document(&ws, "doc", "s3cret", EditRestriction::ReadOnly).unwrap();
        assert!(status.protected && status.has_password);
        assert_eq!(status.spin_count, Some(10));

        assert!(matches!(
            search_and_replace(&ws, "doc", "Terms", "No terms"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            protect_document(&ws, "doc", "other", EditRestriction::Comments),
            Err(Error::Validation(_))
        ));

        let before = std::fs::read(dir.path().join("doc.docx")).unwrap();
        assert!(matches!(
            unprotect_document(&ws, "doc", "wrong"),
            Err(Error::Authentication(_))
        ));
        assert_eq!(std::fs::read(dir.path().join("doc.docx")).unwrap(), before);

        let status = unprotect_document(&ws, "doc", "s3cret").unwrap();
        assert!(!status.protected);
        assert!(!verify_document_protection(&ws, "doc").unwrap().protected);
        assert_eq!(get_document_text(&ws, "doc").unwrap(), "Terms apply.");
        assert!(matches!(unprotect_document(&ws, "doc", "s3cret"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_signature_lifecycle() {
        let (_dir, ws) = workspace();
        assert_eq!(verify_signature(&ws, "doc").unwrap().status, SignatureStatus::Missing);
        create_signature(&ws, "doc", "Ana").unwrap();
        let report = verify_signature(&ws, "doc").unwrap();
        assert_eq!(report.status, SignatureStatus::Valid);
        assert_eq!(report.signer.as_deref(), Some("Ana"));

        search_and_replace(&ws, "doc", "apply", "changed").unwrap();
        assert_eq!(verify_signature(&ws, "doc").unwrap().status, SignatureStatus::Modified);
    }
}
