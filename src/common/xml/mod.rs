//! XML helpers shared by every part handler.
//!
//! `escape` holds the entity helpers; `node` holds the mutable element tree that
//! editable parts (document body, notes, settings, styles, numbering) are
//! parsed into and serialized back from.

pub mod escape;
pub mod node;

pub use escape::{escape_text, escape_xml, resolve_reference, unescape_xml};
pub use node::{XmlDocument, XmlElement, XmlNode};
