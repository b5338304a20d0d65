//! TFile header parsing and the top-level read interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::decompress::decompress;
use crate::error::{Result, RootError};
use crate::key::{self, Key, KeyInfo};
use crate::rbuffer::RBuffer;
use crate::tree::{self, BranchInfo, Tree};

const ROOT_MAGIC: &[u8; 4] = b"root";

/// Raw file bytes, either memory-mapped or owned.
#[derive(Debug)]
enum Source {
    Mmap(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl std::ops::Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Source::Mmap(m) => m,
            Source::Owned(v) => v,
        }
    }
}

/// Parsed file-level header.
///
/// Layout (small-file variant, version < 1000000):
/// ```text
/// offset  size  field
///    0      4   magic "root"
///    4      4   fVersion
///    8      4   fBEGIN
///   12    4/8   fEND
///   ...         free-list and compression fields
///   28      4   fNbytesName
/// ```
/// The top-level TDirectory streamer sits at `fBEGIN + fNbytesName` and
/// holds the seek position of the key list.
#[derive(Debug)]
struct Header {
    is_large: bool,
    seek_keys: u64,
}

/// A ROOT file opened for reading trees.
#[derive(Debug)]
pub struct RootFile {
    data: Source,
    header: Header,
    #[allow(dead_code)]
    path: PathBuf,
}

impl RootFile {
    /// Open a ROOT file from disk, memory-mapped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: read-only mapping of scientific data files that are not
        // modified while this process runs.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_source(Source::Mmap(mmap), path)
    }

    /// Parse a ROOT file from an in-memory byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_source(Source::Owned(data), PathBuf::from("<memory>"))
    }

    fn from_source(data: Source, path: PathBuf) -> Result<Self> {
        if data.len() < 64 || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = Self::parse_header(&data)?;
        Ok(Self { data, header, path })
    }

    fn parse_header(data: &[u8]) -> Result<Header> {
        let mut r = RBuffer::at(data, 4);
        let version = r.read_u32()?;
        let is_large = version >= 1_000_000;

        let begin = r.read_u32()? as u64;
        if is_large {
            let _end = r.read_u64()?;
            let _seek_free = r.read_u64()?;
        } else {
            let _end = r.read_u32()?;
            let _seek_free = r.read_u32()?;
        }
        let _nbytes_free = r.read_u32()?;
        let _n_free = r.read_u32()?;
        let nbytes_name = r.read_u32()?;

        let seek_keys = Self::parse_top_directory(data, (begin + nbytes_name as u64) as usize)?;
        Ok(Header { is_large, seek_keys })
    }

    /// Parse the TDirectory streamer to find the key-list position.
    fn parse_top_directory(data: &[u8], offset: usize) -> Result<u64> {
        if offset >= data.len() {
            return Err(RootError::Deserialization(
                "top directory offset past end of file".into(),
            ));
        }
        let mut r = RBuffer::at(data, offset);
        let dir_version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let _nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;

        if dir_version > 1000 {
            let _seek_dir = r.read_u64()?;
            let _seek_parent = r.read_u64()?;
            Ok(r.read_u64()?)
        } else {
            let _seek_dir = r.read_u32()?;
            let _seek_parent = r.read_u32()?;
            Ok(r.read_u32()? as u64)
        }
    }

    fn keys(&self) -> Result<Vec<Key>> {
        key::read_key_list(&self.data, self.header.seek_keys as usize, self.header.is_large)
    }

    /// List the top-level keys in file order.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        Ok(self.keys()?.iter().map(KeyInfo::from).collect())
    }

    /// Names of all top-level TTrees, in file order, duplicates included.
    pub fn tree_names(&self) -> Result<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.class_name == "TTree")
            .map(|k| k.name)
            .collect())
    }

    /// Read a TTree by name.
    pub fn get_tree(&self, name: &str) -> Result<Tree> {
        let keys = self.keys()?;
        let key =
            key::find_key(&keys, name).ok_or_else(|| RootError::TreeNotFound(name.to_string()))?;
        if key.class_name != "TTree" {
            return Err(RootError::TreeNotFound(format!(
                "'{name}' is {} not TTree",
                key.class_name
            )));
        }
        let payload = self.key_payload(key)?;
        tree::parse_ttree(&payload)
    }

    /// Decode a scalar branch into an `f64` column.
    pub fn branch_f64(&self, tree: &Tree, branch: &str) -> Result<Vec<f64>> {
        let info: &BranchInfo = tree.branch(branch).ok_or_else(|| {
            RootError::Branch(format!("tree '{}' has no branch '{branch}'", tree.name))
        })?;
        tree::read_branch_column(&self.data, info, self.header.is_large)
    }

    /// Read and (if compressed) decompress the payload of a key.
    fn key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        let start = key.seek_key as usize + key.key_len as usize;
        let end = key.seek_key as usize + key.n_bytes as usize;
        if end > self.data.len() || start > end {
            return Err(RootError::BufferUnderflow {
                offset: key.seek_key as usize,
                need: key.n_bytes as usize,
                have: self.data.len().saturating_sub(key.seek_key as usize),
            });
        }
        let stored = &self.data[start..end];
        if key.obj_len as usize == stored.len() {
            Ok(stored.to_vec())
        } else {
            decompress(stored, key.obj_len as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_root_bytes() {
        let err = RootFile::from_bytes(vec![0u8; 128]).unwrap_err();
        assert!(matches!(err, RootError::BadMagic));
    }

    #[test]
    fn rejects_short_files() {
        let err = RootFile::from_bytes(b"root".to_vec()).unwrap_err();
        assert!(matches!(err, RootError::BadMagic));
    }
}
