//! Physical (ZIP) container access for OPC packages.
//!
//! The reader decompresses every member up front; documents handled here are
//! small enough to live fully in memory for the duration of one edit.

use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::packuri::PackURI;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// In-memory view of a ZIP-based OPC package.
pub struct PhysPkgReader {
    /// Member name → decompressed content
    members: HashMap<String, Vec<u8>>,
    /// Member names in archive order
    order: Vec<String>,
}

impl PhysPkgReader {
    /// Read every member of the archive.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut members = HashMap::with_capacity(archive.len());
        let mut order = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)?;
            order.push(name.clone());
            members.insert(name, content);
        }

        Ok(Self { members, order })
    }

    /// Content of a member, by part name.
    pub fn blob_for(&self, uri: &PackURI) -> Option<&[u8]> {
        self.members.get(uri.membername()).map(Vec::as_slice)
    }

    /// Take ownership of a member's content.
    pub fn take(&mut self, membername: &str) -> Option<Vec<u8>> {
        self.members.remove(membername)
    }

    /// Member names in archive order.
    pub fn member_names(&self) -> &[String] {
        &self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Writer producing a deflated ZIP archive in memory.
pub struct PhysPkgWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PhysPkgWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Write one member.
    pub fn write(&mut self, uri: &PackURI, blob: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(uri.membername(), options)?;
        self.zip.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}
