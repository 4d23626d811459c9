/// Document settings and protection descriptor.
///
/// `word/settings.xml` carries the `w:documentProtection` element that
/// restricts editing. This module reads and writes that element; hashing
/// lives in [`crate::ooxml::docx::protection`].
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use serde::Serialize;
use std::str::FromStr;

/// CT_Settings children allowed before `w:documentProtection`.
const BEFORE_DOCUMENT_PROTECTION: &[&str] = &[
    "writeProtection", "view", "zoom", "removePersonalInformation", "removeDateAndTime",
    "doNotDisplayPageBoundaries", "displayBackgroundShape", "printPostScriptOverText",
    "printFractionalCharacterWidth", "printFormsData", "embedTrueTypeFonts", "embedSystemFonts",
    "saveSubsetFonts", "saveFormsData", "mirrorMargins", "alignBordersAndEdges",
    "bordersDoNotSurroundHeader", "bordersDoNotSurroundFooter", "gutterAtTop",
    "hideSpellingErrors", "hideGrammaticalErrors", "activeWritingStyle", "proofState",
    "formsDesign", "attachedTemplate", "linkStyles", "stylePaneFormatFilter",
    "stylePaneSortMethod", "documentType", "mailMerge", "revisionView", "trackRevisions",
    "doNotTrackMoves", "doNotTrackFormatting",
];

/// Type of document protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditRestriction {
    /// Protection element present without an edit restriction
    None,
    /// No editing allowed
    ReadOnly,
    /// Only comments allowed
    Comments,
    /// Only tracked changes allowed
    TrackedChanges,
    /// Only form fields allowed
    Forms,
}

impl EditRestriction {
    fn from_xml(s: &str) -> Self {
        match s {
            "readOnly" => Self::ReadOnly,
            "comments" => Self::Comments,
            "trackedChanges" => Self::TrackedChanges,
            "forms" => Self::Forms,
            _ => Self::None,
        }
    }

    /// Get XML value for this protection type.
    pub const fn to_xml(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ReadOnly => "readOnly",
            Self::Comments => "comments",
            Self::TrackedChanges => "trackedChanges",
            Self::Forms => "forms",
        }
    }
}

impl FromStr for EditRestriction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "readonly" => Ok(Self::ReadOnly),
            "comments" => Ok(Self::Comments),
            "trackedchanges" => Ok(Self::TrackedChanges),
            "forms" => Ok(Self::Forms),
            _ => Err(Error::Validation(format!(
                "unknown edit restriction '{}' (expected readOnly, comments, trackedChanges or forms)",
                s
            ))),
        }
    }
}

/// Hash algorithm named by a protection descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashAlgorithm {
    /// `w:algorithmName` value.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SHA-1" | "SHA1" => Some(Self::Sha1),
            "SHA-256" | "SHA256" => Some(Self::Sha256),
            "SHA-384" | "SHA384" => Some(Self::Sha384),
            "SHA-512" | "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Legacy `w:cryptAlgorithmSid` value.
    pub fn from_sid(sid: u32) -> Option<Self> {
        match sid {
            4 => Some(Self::Sha1),
            12 => Some(Self::Sha256),
            13 => Some(Self::Sha384),
            14 => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// Stored `w:documentProtection` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionDescriptor {
    pub restriction: EditRestriction,
    pub enforced: bool,
    /// `None` when the descriptor names an algorithm this crate cannot compute
    pub algorithm: Option<HashAlgorithm>,
    pub salt: Option<Vec<u8>>,
    pub hash: Option<Vec<u8>>,
    pub spin_count: u32,
    /// Descriptor uses the `cryptAlgorithmSid`/`w:hash` attribute family
    pub legacy: bool,
}

impl ProtectionDescriptor {
    /// Whether a password hash is stored.
    pub fn has_password(&self) -> bool {
        self.hash.is_some()
    }

    /// Read from a `w:documentProtection` element. Malformed base64 is a
    /// structural error.
    pub fn from_element(el: &XmlElement) -> Result<Self> {
        let decode = |key: &str| -> Result<Option<Vec<u8>>> {
            match el.attr(key) {
                Some(value) if !value.is_empty() => BASE64_ENGINE
                    .decode(value.trim())
                    .map(Some)
                    .map_err(|e| {
                        Error::StructuralInconsistency(format!(
                            "document protection {} is not valid base64: {}",
                            key, e
                        ))
                    }),
                _ => Ok(None),
            }
        };
        let number = |key: &str| {
            el.attr(key)
                .and_then(|v| atoi_simd::parse::<u32>(v.trim().as_bytes()).ok())
        };

        let legacy = el.attr("w:hashValue").is_none() && el.attr("w:hash").is_some();
        let (algorithm, hash, salt, spin_count) = if legacy {
            (
                number("w:cryptAlgorithmSid").and_then(HashAlgorithm::from_sid),
                decode("w:hash")?,
                decode("w:salt")?,
                number("w:cryptSpinCount").unwrap_or(0),
            )
        } else {
            (
                el.attr("w:algorithmName").and_then(HashAlgorithm::from_name),
                decode("w:hashValue")?,
                decode("w:saltValue")?,
                number("w:spinCount").unwrap_or(0),
            )
        };

        Ok(Self {
            restriction: el
                .attr("w:edit")
                .map(EditRestriction::from_xml)
                .unwrap_or(EditRestriction::None),
            enforced: matches!(el.attr("w:enforcement"), Some("1" | "true" | "on")),
            algorithm,
            salt,
            hash,
            spin_count,
            legacy,
        })
    }

    /// Build a `w:documentProtection` element in the modern attribute form.
    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("w:documentProtection")
            .with_attr("w:edit", self.restriction.to_xml())
            .with_attr("w:enforcement", if self.enforced { "1" } else { "0" });
        if let (Some(algorithm), Some(hash), Some(salt)) = (self.algorithm, &self.hash, &self.salt) {
            el.set_attr("w:algorithmName", algorithm.name());
            el.set_attr("w:hashValue", BASE64_ENGINE.encode(hash));
            el.set_attr("w:saltValue", BASE64_ENGINE.encode(salt));
            el.set_attr("w:spinCount", self.spin_count.to_string());
        }
        el
    }
}

/// Parsed `word/settings.xml`.
#[derive(Debug, Clone)]
pub struct Settings {
    xml: XmlDocument,
}

impl Settings {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let xml = XmlDocument::parse(xml)?;
        if !xml.root.is("settings") {
            return Err(Error::InvalidFormat(format!(
                "expected w:settings, found {}",
                xml.root.name()
            )));
        }
        Ok(Self { xml })
    }

    /// The protection descriptor, if the element is present.
    pub fn protection(&self) -> Result<Option<ProtectionDescriptor>> {
        self.xml
            .root
            .child("documentProtection")
            .map(ProtectionDescriptor::from_element)
            .transpose()
    }

    /// Whether editing is currently restricted.
    pub fn is_protected(&self) -> Result<bool> {
        Ok(self.protection()?.is_some_and(|p| p.enforced))
    }

    /// Write the descriptor, replacing any existing one.
    pub fn set_protection(&mut self, descriptor: &ProtectionDescriptor) {
        self.xml
            .root
            .replace_or_insert(descriptor.to_element(), BEFORE_DOCUMENT_PROTECTION);
    }

    /// Remove the descriptor. Returns whether one was present.
    pub fn remove_protection(&mut self) -> bool {
        self.xml.root.remove_children("documentProtection") > 0
    }

    /// Whether revisions are tracked.
    pub fn track_revisions(&self) -> bool {
        self.xml.root.child("trackRevisions").is_some_and(|el| {
            !matches!(el.attr("val"), Some("0" | "false" | "off"))
        })
    }

    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:zoom w:percent="100"/><w:trackRevisions/><w:defaultTabStop w:val="720"/></w:settings>"#;

    #[test]
    fn test_unprotected_settings() {
        let settings = Settings::parse(SETTINGS.as_bytes()).unwrap();
        assert!(settings.protection().unwrap().is_none());
        assert!(!settings.is_protected().unwrap());
        assert!(settings.track_revisions());
    }

    #[test]
    fn test_protection_written_in_schema_order() {
        let mut settings = Settings::parse(SETTINGS.as_bytes()).unwrap();
        let descriptor = ProtectionDescriptor {
            restriction: EditRestriction::ReadOnly,
            enforced: true,
            algorithm: Some(HashAlgorithm::Sha512),
            salt: Some(vec![1; 16]),
            hash: Some(vec![2; 64]),
            spin_count: 100_000,
            legacy: false,
        };
        settings.set_protection(&descriptor);

        let names: Vec<_> = settings
            .xml()
            .root
            .elements()
            .map(|e| e.local_name().to_string())
            .collect();
        assert_eq!(names, ["zoom", "trackRevisions", "documentProtection", "defaultTabStop"]);

        let reparsed = Settings::parse(settings.xml().to_xml().as_bytes()).unwrap();
        assert_eq!(reparsed.protection().unwrap(), Some(descriptor));
        assert!(reparsed.is_protected().unwrap());
    }

    #[test]
    fn test_legacy_descriptor() {
        let xml = r#"<w:settings xmlns:w="urn:w"><w:documentProtection w:edit="forms" w:enforcement="1" w:cryptProviderType="rsaAES" w:cryptAlgorithmClass="hash" w:cryptAlgorithmType="typeAny" w:cryptAlgorithmSid="14" w:cryptSpinCount="100000" w:hash="AAAA" w:salt="AQID"/></w:settings>"#;
        let settings = Settings::parse(xml.as_bytes()).unwrap();
        let p = settings.protection().unwrap().unwrap();
        assert!(p.legacy);
        assert_eq!(p.restriction, EditRestriction::Forms);
        assert_eq!(p.algorithm, Some(HashAlgorithm::Sha512));
        assert_eq!(p.salt.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(p.spin_count, 100_000);
    }

    #[test]
    fn test_restriction_from_str() {
        assert_eq!("read_only".parse::<EditRestriction>().unwrap(), EditRestriction::ReadOnly);
        assert_eq!("trackedChanges".parse::<EditRestriction>().unwrap(), EditRestriction::TrackedChanges);
        assert!(matches!("everything".parse::<EditRestriction>(), Err(Error::Validation(_))));
    }
}
