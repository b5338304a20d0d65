//! TKey records and directory key lists.
//!
//! A ROOT directory is an ordered list of TKey records; the order in the
//! file is preserved here so callers can implement first-occurrence-wins
//! deduplication.

use crate::error::Result;
use crate::rbuffer::RBuffer;

/// A parsed TKey record.
#[derive(Debug, Clone)]
pub struct Key {
    /// Total bytes of key header + (compressed) object.
    pub n_bytes: u32,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Length of the key header itself.
    pub key_len: u16,
    /// Cycle number.
    pub cycle: u16,
    /// Absolute file position of this key.
    pub seek_key: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
}

impl Key {
    /// Parse a TKey at the cursor position.
    ///
    /// `is_large` selects 64-bit seek pointers (files >= 2 GB); keys written
    /// with version > 1000 force them regardless.
    pub fn read(r: &mut RBuffer, is_large: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let (seek_key, _seek_pdir) = if version > 1000 || is_large {
            (r.read_u64()?, r.read_u64()?)
        } else {
            (r.read_u32()? as u64, r.read_u32()? as u64)
        };

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let _title = r.read_string()?;

        Ok(Key { n_bytes, obj_len, key_len, cycle, seek_key, class_name, name })
    }
}

/// Public key metadata returned by `RootFile::list_keys`.
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Object class name (e.g. "TTree").
    pub class_name: String,
    /// Cycle number.
    pub cycle: u16,
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self { name: key.name.clone(), class_name: key.class_name.clone(), cycle: key.cycle }
    }
}

/// Read the key list stored at `seek_keys`.
///
/// The list is itself a TKey'd record: one header for the list, a u32
/// count, then that many TKey records. File order is preserved.
pub fn read_key_list(file_data: &[u8], seek_keys: usize, is_large: bool) -> Result<Vec<Key>> {
    let mut r = RBuffer::at(file_data, seek_keys);
    let _list_key = Key::read(&mut r, is_large)?;
    let n_keys = r.read_u32()? as usize;
    let mut keys = Vec::with_capacity(n_keys);
    for _ in 0..n_keys {
        keys.push(Key::read(&mut r, is_large)?);
    }
    Ok(keys)
}

/// Find the first key with the given name, in file order.
pub fn find_key<'a>(keys: &'a [Key], name: &str) -> Option<&'a Key> {
    keys.iter().find(|k| k.name == name)
}
