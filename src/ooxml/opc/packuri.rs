/// Part names inside an OPC package.
///
/// A part name is an absolute, forward-slash separated path such as
/// `/word/document.xml`. Relationship targets are resolved against the
/// directory of their source part.
use crate::ooxml::opc::error::{OpcError, Result};

/// An absolute part name within an OPC package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a part name. The string must begin with `/`.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "part name must begin with '/', got '{}'",
                uri
            )));
        }
        Ok(PackURI { uri })
    }

    /// Part name for a zip member name (`word/document.xml`).
    pub fn from_membername(member: &str) -> Result<Self> {
        Self::new(format!("/{}", member.trim_start_matches('/')))
    }

    /// Resolve a relationship target (`../media/a.png`, `styles.xml`, or an
    /// absolute `/word/x.xml`) against a source directory such as `/word`.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };
        Self::new(normalize(&joined))
    }

    /// Directory portion, e.g. `/word` for `/word/document.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// File name portion, e.g. `document.xml`.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Extension without the leading period, lowercased by callers as needed.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Zip member name (leading slash stripped).
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Reference to this part relative to a source directory.
    ///
    /// `/word/footnotes.xml` relative to `/word` is `footnotes.xml`;
    /// relative to `/` it is `word/footnotes.xml`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        let common = from.iter().zip(to.iter()).take_while(|(a, b)| a == b).count();

        let mut result = "../".repeat(from.len() - common);
        result.push_str(&to[common..].join("/"));
        result
    }

    /// Part name of the relationships part for this part (or for the
    /// package when this is `/`).
    pub fn rels_uri(&self) -> PackURI {
        let base = self.base_uri();
        let uri = if base == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base, self.filename())
        };
        PackURI { uri }
    }

    /// Whether this names a relationships part.
    #[inline]
    pub fn is_rels(&self) -> bool {
        self.uri.ends_with(".rels") && self.uri.contains("/_rels/")
    }

    /// For a relationships part, the part name of its source
    /// (`/word/_rels/document.xml.rels` → `/word/document.xml`).
    pub fn rels_source(&self) -> Option<PackURI> {
        if !self.is_rels() {
            return None;
        }
        let (dir, file) = self.uri.rsplit_once("/_rels/")?;
        let source = file.strip_suffix(".rels")?;
        let uri = if dir.is_empty() {
            format!("/{}", source)
        } else {
            format!("{}/{}", dir, source)
        };
        Some(PackURI { uri })
    }

    /// The full part name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The part name of `[Content_Types].xml`
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_slash() {
        assert!(PackURI::new("/word/document.xml").is_ok());
        assert!(PackURI::new("word/document.xml").is_err());
    }

    #[test]
    fn test_components() {
        let uri = PackURI::new("/word/footnotes.xml").unwrap();
        assert_eq!(uri.base_uri(), "/word");
        assert_eq!(uri.filename(), "footnotes.xml");
        assert_eq!(uri.ext(), "xml");
        assert_eq!(uri.membername(), "word/footnotes.xml");
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/word", "../customXml/item1.xml").unwrap();
        assert_eq!(uri.as_str(), "/customXml/item1.xml");
        let uri = PackURI::from_rel_ref("/", "word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");
        let uri = PackURI::from_rel_ref("/word", "/word/styles.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/styles.xml");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/word/endnotes.xml").unwrap();
        assert_eq!(uri.relative_ref("/word"), "endnotes.xml");
        assert_eq!(uri.relative_ref("/"), "word/endnotes.xml");
        let uri = PackURI::new("/docProps/custom.xml").unwrap();
        assert_eq!(uri.relative_ref("/word"), "../docProps/custom.xml");
    }

    #[test]
    fn test_rels_uri_and_source() {
        let uri = PackURI::new("/word/document.xml").unwrap();
        let rels = uri.rels_uri();
        assert_eq!(rels.as_str(), "/word/_rels/document.xml.rels");
        assert_eq!(rels.rels_source(), Some(uri));

        let pkg = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(pkg.rels_uri().as_str(), "/_rels/.rels");
        assert_eq!(pkg.rels_uri().rels_source().unwrap().as_str(), "/");
    }
}
