//! TTree metadata parsing and scalar branch column extraction.
//!
//! Only flat trees with scalar numeric leaves are supported — the event
//! files this tool consumes contain one value per branch per event.

use crate::decompress::decompress;
use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::{K_BYTE_COUNT_MASK, RBuffer};

const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
const K_CLASS_MASK: u32 = 0x8000_0000;

/// Scalar leaf type (maps to ROOT TLeaf class names).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// `TLeafF` — 32-bit float.
    F32,
    /// `TLeafD` — 64-bit float.
    F64,
    /// `TLeafI` — 32-bit signed integer.
    I32,
    /// `TLeafL` — 64-bit signed integer.
    I64,
}

impl LeafKind {
    /// Size in bytes of one stored element.
    pub fn byte_size(self) -> usize {
        match self {
            LeafKind::F32 | LeafKind::I32 => 4,
            LeafKind::F64 | LeafKind::I64 => 8,
        }
    }

    fn from_class(class_name: &str) -> Option<Self> {
        match class_name {
            "TLeafF" => Some(LeafKind::F32),
            "TLeafD" => Some(LeafKind::F64),
            "TLeafI" => Some(LeafKind::I32),
            "TLeafL" => Some(LeafKind::I64),
            _ => None,
        }
    }
}

/// Metadata for one TBranch.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    /// Branch name.
    pub name: String,
    /// Leaf type of the stored values.
    pub leaf: LeafKind,
    /// Number of entries.
    pub entries: u64,
    /// Entry boundaries per basket (`n_baskets + 1` values).
    pub basket_entry: Vec<u64>,
    /// Absolute file offsets of each basket record.
    pub basket_seek: Vec<u64>,
    /// Number of written baskets (`fWriteBasket`).
    pub n_baskets: usize,
}

/// A parsed TTree: name, entry count, and flat branch list.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Tree name.
    pub name: String,
    /// Number of entries.
    pub entries: u64,
    /// All branches in declaration order.
    pub branches: Vec<BranchInfo>,
}

impl Tree {
    /// Find a branch by name.
    pub fn branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// All branch names in declaration order.
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Parse a TTree from a decompressed TKey payload.
///
/// Supports TTree streamer versions 18 through 20 (ROOT 6).
pub fn parse_ttree(payload: &[u8]) -> Result<Tree> {
    let mut r = RBuffer::new(payload);

    let (tree_ver, tree_end) = r.read_version()?;
    let tree_end =
        tree_end.ok_or_else(|| RootError::Deserialization("TTree missing byte count".into()))?;
    if !(18..=20).contains(&tree_ver) {
        return Err(RootError::Deserialization(format!(
            "unsupported TTree streamer version {tree_ver}"
        )));
    }

    let (name, _title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    r.skip_versioned()?;
    r.skip_versioned()?;
    r.skip_versioned()?;

    let entries = r.read_i64()? as u64;
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;
    let _saved_bytes = r.read_i64()?;
    let _flushed_bytes = r.read_i64()?;
    let _weight = r.read_f64()?;
    let _timer_interval = r.read_i32()?;
    let _scan_field = r.read_i32()?;
    let _update = r.read_i32()?;
    let _default_entry_offset_len = r.read_i32()?;
    let n_cluster_range = if tree_ver >= 19 { r.read_i32()? } else { 0 };
    let _max_entries = r.read_i64()?;
    let _max_entry_loop = r.read_i64()?;
    let _max_virtual_size = r.read_i64()?;
    let _auto_save = r.read_i64()?;
    let _auto_flush = r.read_i64()?;
    let _estimate = r.read_i64()?;

    if tree_ver >= 19 {
        // fClusterRangeEnd / fClusterSize: the one-byte array-count header
        // is written even when the range count is zero.
        r.skip(1)?;
        for _ in 0..n_cluster_range {
            r.read_i64()?;
        }
        r.skip(1)?;
        for _ in 0..n_cluster_range {
            r.read_i64()?;
        }
    }
    if tree_ver >= 20 {
        r.skip_versioned()?; // fIOFeatures (TBits)
    }

    let branches = read_branch_array(&mut r)?;

    // Remaining members (fLeaves, aliases, friends) are not needed.
    r.seek(tree_end);

    Ok(Tree { name, entries, branches })
}

// ── TObjArray walking ──────────────────────────────────────────

/// Tracks class names registered in ROOT's byte-offset reference system.
///
/// `kNewClassTag` introduces a class name (null-terminated); later elements
/// reference it as `kClassMask | offset-of-the-tag`.
struct ClassRefs {
    seen: Vec<(usize, String)>,
}

impl ClassRefs {
    fn new() -> Self {
        Self { seen: Vec::new() }
    }

    /// Read one TObjArray element header.
    ///
    /// Returns `(class_name, obj_end)`, where `obj_end` is the absolute
    /// position at which this element's data finishes, or `None` for a
    /// null slot.
    fn next_element(&mut self, r: &mut RBuffer) -> Result<Option<(String, usize)>> {
        let tag = r.read_u32()?;
        if tag == 0 {
            return Ok(None);
        }
        if tag & K_BYTE_COUNT_MASK == 0 {
            return Err(RootError::Deserialization(format!(
                "element tag {tag:#010x} lacks a byte count"
            )));
        }
        let byte_count = (tag & !K_BYTE_COUNT_MASK) as usize;
        let obj_end = r.pos() - 4 + 4 + byte_count;

        let class_tag_pos = r.pos();
        let class_tag = r.read_u32()?;
        let class_name = if class_tag == K_NEW_CLASS_TAG {
            let name = r.read_cstring()?;
            self.seen.push((class_tag_pos, name.clone()));
            name
        } else if class_tag & K_CLASS_MASK != 0 {
            let offset = (class_tag & !K_CLASS_MASK) as usize;
            self.seen
                .iter()
                .find(|(pos, _)| *pos == offset)
                .map(|(_, n)| n.clone())
                .ok_or_else(|| {
                    RootError::Deserialization(format!("unresolved class reference {offset:#x}"))
                })?
        } else {
            return Err(RootError::Deserialization(format!(
                "unexpected class tag {class_tag:#010x}"
            )));
        };

        Ok(Some((class_name, obj_end)))
    }
}

/// Read the common TObjArray prelude and return the element count.
fn read_objarray_header(r: &mut RBuffer) -> Result<(i32, usize)> {
    let (_ver, end) = r.read_version()?;
    let end =
        end.ok_or_else(|| RootError::Deserialization("TObjArray missing byte count".into()))?;
    r.read_tobject()?;
    let _name = r.read_string()?;
    let count = r.read_i32()?;
    let _lower_bound = r.read_i32()?;
    Ok((count, end))
}

/// Read the fBranches TObjArray.
fn read_branch_array(r: &mut RBuffer) -> Result<Vec<BranchInfo>> {
    let (count, arr_end) = read_objarray_header(r)?;
    let mut refs = ClassRefs::new();
    let mut branches = Vec::new();

    for _ in 0..count {
        match refs.next_element(r)? {
            None => {}
            Some((class_name, obj_end)) => {
                if class_name != "TBranch" {
                    log::debug!("skipping branch of class {class_name}");
                    r.seek(obj_end);
                    continue;
                }
                match read_tbranch(r) {
                    Ok(b) => branches.push(b),
                    Err(e) => {
                        log::debug!("unparseable branch skipped: {e}");
                        r.seek(obj_end);
                    }
                }
            }
        }
    }

    r.seek(arr_end);
    Ok(branches)
}

/// Read one TBranch body (streamer versions 11 through 13).
fn read_tbranch(r: &mut RBuffer) -> Result<BranchInfo> {
    let (branch_ver, branch_end) = r.read_version()?;
    let branch_end = branch_end
        .ok_or_else(|| RootError::Deserialization("TBranch missing byte count".into()))?;

    let (name, _title) = r.read_tnamed()?;
    r.skip_versioned()?; // TAttFill

    let _compress = r.read_i32()?;
    let _basket_size = r.read_i32()?;
    let _entry_offset_len = r.read_i32()?;
    let write_basket = r.read_i32()?;
    let _entry_number = r.read_i64()?;
    if branch_ver >= 13 {
        r.skip_versioned()?; // fIOFeatures
    }
    let _offset = r.read_i32()?;
    let max_baskets = r.read_i32()? as usize;
    let _split_level = r.read_i32()?;
    let entries = r.read_i64()? as u64;
    if branch_ver >= 11 {
        let _first_entry = r.read_i64()?;
    }
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;

    r.skip_versioned()?; // fBranches (no sub-branches in flat trees)
    let leaf = read_leaf_array(r)?;
    r.skip_versioned()?; // fBaskets (in-memory, irrelevant)

    let n_baskets = write_basket.max(0) as usize;

    // The three index arrays are fMaxBaskets long, preceded by a one-byte
    // count; only the first fWriteBasket (+1 for entry boundaries) slots
    // are meaningful.
    r.skip(1)?;
    for _ in 0..max_baskets {
        r.read_i32()?; // fBasketBytes — recoverable from each basket's own key
    }

    r.skip(1)?;
    let mut basket_entry = Vec::with_capacity(n_baskets + 1);
    for i in 0..max_baskets {
        let v = r.read_i64()? as u64;
        if i <= n_baskets {
            basket_entry.push(v);
        }
    }

    r.skip(1)?;
    let mut basket_seek = Vec::with_capacity(n_baskets);
    for i in 0..max_baskets {
        let v = r.read_i64()? as u64;
        if i < n_baskets {
            basket_seek.push(v);
        }
    }

    r.seek(branch_end);

    let leaf = leaf.ok_or_else(|| {
        RootError::Deserialization(format!("branch '{name}' has no supported scalar leaf"))
    })?;

    Ok(BranchInfo { name, leaf, entries, basket_entry, basket_seek, n_baskets })
}

/// Read the fLeaves TObjArray and return the first supported leaf type.
fn read_leaf_array(r: &mut RBuffer) -> Result<Option<LeafKind>> {
    let (count, arr_end) = read_objarray_header(r)?;
    let mut refs = ClassRefs::new();
    let mut leaf = None;

    for _ in 0..count {
        if let Some((class_name, obj_end)) = refs.next_element(r)? {
            if leaf.is_none() {
                leaf = LeafKind::from_class(&class_name);
            }
            r.seek(obj_end);
        }
    }

    r.seek(arr_end);
    Ok(leaf)
}

// ── Column extraction ──────────────────────────────────────────

/// Decode all baskets of a scalar branch into an `f64` column.
pub fn read_branch_column(file_data: &[u8], branch: &BranchInfo, is_large: bool) -> Result<Vec<f64>> {
    let elem = branch.leaf.byte_size();
    let mut out = Vec::with_capacity(branch.entries as usize);

    for i in 0..branch.n_baskets {
        let n_entries = basket_entries(branch, i)?;
        let payload = read_basket_payload(file_data, branch.basket_seek[i], is_large)?;
        let need = n_entries * elem;
        if payload.len() < need {
            return Err(RootError::Branch(format!(
                "branch '{}' basket {i}: {} payload bytes for {n_entries} entries",
                branch.name,
                payload.len()
            )));
        }
        decode_values(&payload[..need], branch.leaf, &mut out);
    }

    if out.len() != branch.entries as usize {
        return Err(RootError::Branch(format!(
            "branch '{}' decoded {} values, expected {}",
            branch.name,
            out.len(),
            branch.entries
        )));
    }
    Ok(out)
}

/// Entries covered by basket `i`.
fn basket_entries(branch: &BranchInfo, i: usize) -> Result<usize> {
    let start = branch.basket_entry.get(i).copied();
    let end = branch.basket_entry.get(i + 1).copied().or(Some(branch.entries));
    match (start, end) {
        (Some(s), Some(e)) if e >= s => Ok((e - s) as usize),
        _ => Err(RootError::Branch(format!(
            "branch '{}' has an inconsistent basket index",
            branch.name
        ))),
    }
}

/// Read and (if needed) decompress the data payload of one basket record.
fn read_basket_payload(file_data: &[u8], seek: u64, is_large: bool) -> Result<Vec<u8>> {
    let pos = seek as usize;
    let mut r = RBuffer::at(file_data, pos);
    let key = Key::read(&mut r, is_large)?;

    let data_start = pos + key.key_len as usize;
    let data_end = pos + key.n_bytes as usize;
    if data_end > file_data.len() || data_start > data_end {
        return Err(RootError::BufferUnderflow {
            offset: pos,
            need: key.n_bytes as usize,
            have: file_data.len().saturating_sub(pos),
        });
    }
    let stored = &file_data[data_start..data_end];

    if key.obj_len as usize == stored.len() {
        Ok(stored.to_vec())
    } else {
        decompress(stored, key.obj_len as usize)
    }
}

fn decode_values(bytes: &[u8], leaf: LeafKind, out: &mut Vec<f64>) {
    match leaf {
        LeafKind::F64 => {
            for c in bytes.chunks_exact(8) {
                out.push(f64::from_be_bytes(c.try_into().unwrap()));
            }
        }
        LeafKind::F32 => {
            for c in bytes.chunks_exact(4) {
                out.push(f32::from_be_bytes(c.try_into().unwrap()) as f64);
            }
        }
        LeafKind::I32 => {
            for c in bytes.chunks_exact(4) {
                out.push(i32::from_be_bytes(c.try_into().unwrap()) as f64);
            }
        }
        LeafKind::I64 => {
            for c in bytes.chunks_exact(8) {
                out.push(i64::from_be_bytes(c.try_into().unwrap()) as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_sizes() {
        assert_eq!(LeafKind::F32.byte_size(), 4);
        assert_eq!(LeafKind::F64.byte_size(), 8);
        assert_eq!(LeafKind::I32.byte_size(), 4);
        assert_eq!(LeafKind::I64.byte_size(), 8);
    }

    #[test]
    fn leaf_from_class_names() {
        assert_eq!(LeafKind::from_class("TLeafD"), Some(LeafKind::F64));
        assert_eq!(LeafKind::from_class("TLeafF"), Some(LeafKind::F32));
        assert_eq!(LeafKind::from_class("TLeafC"), None);
    }

    #[test]
    fn decode_f32_widens() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        bytes.extend_from_slice(&(-2.0f32).to_be_bytes());
        let mut out = Vec::new();
        decode_values(&bytes, LeafKind::F32, &mut out);
        assert_eq!(out, vec![1.5, -2.0]);
    }

    #[test]
    fn basket_entry_spans() {
        let b = BranchInfo {
            name: "w".into(),
            leaf: LeafKind::F64,
            entries: 10,
            basket_entry: vec![0, 4, 10],
            basket_seek: vec![100, 200],
            n_baskets: 2,
        };
        assert_eq!(basket_entries(&b, 0).unwrap(), 4);
        assert_eq!(basket_entries(&b, 1).unwrap(), 6);
    }
}
