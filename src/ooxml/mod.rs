//! Office Open XML (OOXML) package handling for Word documents.
//!
//! The module is organized into layers:
//!
//! 1. **OPC Layer** (`opc`): zip container, content types, parts and relationships
//! 2. **Package properties** (`metadata`, `custom_properties`): `docProps/*.xml`
//! 3. **Word** (`docx`): the structural model and every edit applied to it
//!
//! # Example
//!
//! ```rust,no_run
//! use docsmith::ooxml::docx::DocxPackage;
//!
//! let pkg = DocxPackage::open("document.docx")?;
//! println!("Document contains {} paragraphs", pkg.document().paragraph_count());
//! # Ok::<(), docsmith::Error>(())
//! ```
pub mod custom_properties;
pub mod docx;
pub mod metadata;
pub mod opc;

pub use custom_properties::{CustomProperties, PropertyValue};
pub use metadata::CoreProperties;
pub use opc::{OpcPackage, PackURI};
