//! Package fixtures shared by the unit tests.

use crate::ooxml::docx::document::Block;
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::paragraph::Paragraph;
use crate::ooxml::docx::template::blank_package;
use crate::ooxml::metadata::CoreProperties;

/// Serialized blank document.
pub(crate) fn blank_docx() -> Vec<u8> {
    let core = CoreProperties::new_document(Some("Fixture"), Some("Tester"), chrono::Utc::now());
    blank_package(&core).unwrap().to_bytes().unwrap()
}

/// A package whose body holds one paragraph per entry. Entries written as
/// `"# Text"` or `"## Text"` become headings of that level.
pub(crate) fn package_with(paragraphs: &[&str]) -> DocxPackage {
    let mut package = DocxPackage::from_bytes(&blank_docx()).unwrap();
    for text in paragraphs {
        let hashes = text.chars().take_while(|c| *c == '#').count();
        let para = if hashes > 0 {
            let mut p = Paragraph::with_text(text[hashes..].trim_start());
            p.set_style(&format!("Heading{}", hashes));
            p
        } else {
            Paragraph::with_text(text)
        };
        package.document_mut().append(Block::Paragraph(para));
    }
    package
}

/// Paragraph texts of a package.
pub(crate) fn texts(package: &DocxPackage) -> Vec<String> {
    package.document().paragraphs().map(Paragraph::text).collect()
}
