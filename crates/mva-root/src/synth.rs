//! Synthetic ROOT file builder.
//!
//! Writes minimal but structurally valid files (header, top directory,
//! TKey list, TTree streamers, baskets) for tests and demos. Only flat
//! trees with scalar leaves are produced, which is exactly the shape the
//! reader supports.

use std::fs;
use std::path::Path;

use crate::decompress::compress_zlib_block;
use crate::error::{Result, RootError};
use crate::rbuffer::K_BYTE_COUNT_MASK;
use crate::tree::LeafKind;

const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;

/// File format version stamped into the header (ROOT 6.32 convention).
const FILE_VERSION: u32 = 63200;
const FBEGIN: u32 = 100;
const NBYTES_NAME: u32 = 36;

/// One branch of a tree under construction.
struct BranchSpec {
    name: String,
    leaf: LeafKind,
    values: Vec<f64>,
}

/// One tree under construction.
pub struct TreeSpec {
    name: String,
    branches: Vec<BranchSpec>,
    n_baskets: usize,
}

impl TreeSpec {
    /// Add a `TLeafD` (f64) branch.
    pub fn branch_f64(&mut self, name: &str, values: &[f64]) -> &mut Self {
        self.branch(name, LeafKind::F64, values)
    }

    /// Add a `TLeafF` (f32) branch; values are narrowed on write.
    pub fn branch_f32(&mut self, name: &str, values: &[f64]) -> &mut Self {
        self.branch(name, LeafKind::F32, values)
    }

    /// Add a branch of an explicit leaf type.
    pub fn branch(&mut self, name: &str, leaf: LeafKind, values: &[f64]) -> &mut Self {
        self.branches.push(BranchSpec {
            name: name.to_string(),
            leaf,
            values: values.to_vec(),
        });
        self
    }

    /// Split every branch into `n` baskets (default 1).
    pub fn baskets(&mut self, n: usize) -> &mut Self {
        self.n_baskets = n.max(1);
        self
    }

    fn entries(&self) -> Result<u64> {
        let n = self.branches.first().map_or(0, |b| b.values.len());
        for b in &self.branches {
            if b.values.len() != n {
                return Err(RootError::Branch(format!(
                    "tree '{}': branch '{}' has {} values, expected {n}",
                    self.name,
                    b.name,
                    b.values.len()
                )));
            }
        }
        Ok(n as u64)
    }
}

/// Builder for a complete synthetic file.
pub struct SynthFile {
    trees: Vec<TreeSpec>,
    compress: bool,
}

impl Default for SynthFile {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthFile {
    /// Start an empty file with raw (uncompressed) payloads.
    pub fn new() -> Self {
        Self { trees: Vec::new(), compress: false }
    }

    /// Store payloads zlib-compressed instead of raw.
    pub fn compressed(&mut self, yes: bool) -> &mut Self {
        self.compress = yes;
        self
    }

    /// Start a new tree. Duplicate names are allowed; the file keeps both
    /// keys in insertion order.
    pub fn tree(&mut self, name: &str) -> &mut TreeSpec {
        self.trees.push(TreeSpec {
            name: name.to_string(),
            branches: Vec::new(),
            n_baskets: 1,
        });
        let last = self.trees.len() - 1;
        &mut self.trees[last]
    }

    /// Serialize the file to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; FBEGIN as usize + NBYTES_NAME as usize];
        out[0..4].copy_from_slice(b"root");

        let dir_pos = out.len();
        out.extend_from_slice(&[0u8; 30]); // directory streamer, patched below

        // Baskets first so the tree streamers can point at them.
        let mut tree_baskets = Vec::with_capacity(self.trees.len());
        for tree in &self.trees {
            let entries = tree.entries()?;
            let bounds = basket_bounds(entries as usize, tree.n_baskets);
            let mut per_branch = Vec::with_capacity(tree.branches.len());
            for branch in &tree.branches {
                let mut seeks = Vec::new();
                let mut sizes = Vec::new();
                for w in bounds.windows(2) {
                    let payload = encode_values(&branch.values[w[0]..w[1]], branch.leaf);
                    let seek = out.len() as u32;
                    let n_bytes = self.write_record(
                        &mut out,
                        "TBasket",
                        &branch.name,
                        &tree.name,
                        &payload,
                    )?;
                    seeks.push(seek);
                    sizes.push(n_bytes);
                }
                per_branch.push((seeks, sizes));
            }
            tree_baskets.push((entries, bounds, per_branch));
        }

        // Tree records, collecting directory keys.
        let mut dir_keys = Vec::with_capacity(self.trees.len());
        for (tree, (entries, bounds, per_branch)) in self.trees.iter().zip(&tree_baskets) {
            let payload = tree_payload(tree, *entries, bounds, per_branch);
            let seek = out.len() as u32;
            let n_bytes = self.write_record(&mut out, "TTree", &tree.name, "", &payload)?;
            dir_keys.push((tree.name.clone(), payload.len() as u32, n_bytes, seek));
        }

        // Directory key list.
        let seek_keys = out.len() as u32;
        let mut list = Wr::new();
        list.u32(dir_keys.len() as u32);
        for (name, obj_len, n_bytes, seek) in &dir_keys {
            list.key_header("TTree", name, "", *obj_len, *n_bytes, *seek);
        }
        self.write_record_stored(&mut out, "TFile", "synth", "", list.0.len(), &list.0);

        // Patch the file header and the directory streamer.
        let end = out.len() as u32;
        patch_u32(&mut out, 4, FILE_VERSION);
        patch_u32(&mut out, 8, FBEGIN);
        patch_u32(&mut out, 12, end);
        patch_u32(&mut out, 16, end); // seek_free
        patch_u32(&mut out, 20, 0); // nbytes_free
        patch_u32(&mut out, 24, 0); // n_free
        patch_u32(&mut out, 28, NBYTES_NAME);

        out[dir_pos..dir_pos + 2].copy_from_slice(&5u16.to_be_bytes()); // dir version
        patch_u32(&mut out, dir_pos + 10, (end - seek_keys) as u32); // nbytes_keys
        patch_u32(&mut out, dir_pos + 14, NBYTES_NAME);
        patch_u32(&mut out, dir_pos + 18, FBEGIN); // seek_dir
        patch_u32(&mut out, dir_pos + 26, seek_keys);

        Ok(out)
    }

    /// Serialize and write to disk.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Write one keyed record; payload stored raw or zlib per `compress`.
    /// Returns the record's total byte size (`fNbytes`).
    fn write_record(
        &self,
        out: &mut Vec<u8>,
        class: &str,
        name: &str,
        title: &str,
        payload: &[u8],
    ) -> Result<u32> {
        if self.compress && payload.len() > 64 {
            let stored = compress_zlib_block(payload)?;
            Ok(self.write_record_stored(out, class, name, title, payload.len(), &stored))
        } else {
            Ok(self.write_record_stored(out, class, name, title, payload.len(), payload))
        }
    }

    fn write_record_stored(
        &self,
        out: &mut Vec<u8>,
        class: &str,
        name: &str,
        title: &str,
        obj_len: usize,
        stored: &[u8],
    ) -> u32 {
        let seek = out.len() as u32;
        let key_len = key_len(class, name, title);
        let n_bytes = key_len + stored.len() as u32;
        let mut w = Wr::new();
        w.key_header(class, name, title, obj_len as u32, n_bytes, seek);
        out.extend_from_slice(&w.0);
        out.extend_from_slice(stored);
        n_bytes
    }
}

/// Even entry boundaries for `n_baskets` baskets over `entries` rows.
fn basket_bounds(entries: usize, n_baskets: usize) -> Vec<usize> {
    if entries == 0 {
        return vec![0];
    }
    let k = n_baskets.min(entries).max(1);
    (0..=k).map(|i| i * entries / k).collect()
}

fn encode_values(values: &[f64], leaf: LeafKind) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * leaf.byte_size());
    for &v in values {
        match leaf {
            LeafKind::F64 => out.extend_from_slice(&v.to_be_bytes()),
            LeafKind::F32 => out.extend_from_slice(&(v as f32).to_be_bytes()),
            LeafKind::I32 => out.extend_from_slice(&(v as i32).to_be_bytes()),
            LeafKind::I64 => out.extend_from_slice(&(v as i64).to_be_bytes()),
        }
    }
    out
}

fn leaf_class(leaf: LeafKind) -> &'static str {
    match leaf {
        LeafKind::F32 => "TLeafF",
        LeafKind::F64 => "TLeafD",
        LeafKind::I32 => "TLeafI",
        LeafKind::I64 => "TLeafL",
    }
}

fn key_len(class: &str, name: &str, title: &str) -> u32 {
    (26 + pstr_len(class) + pstr_len(name) + pstr_len(title)) as u32
}

fn pstr_len(s: &str) -> usize {
    if s.len() >= 255 { 5 + s.len() } else { 1 + s.len() }
}

fn patch_u32(out: &mut [u8], at: usize, v: u32) {
    out[at..at + 4].copy_from_slice(&v.to_be_bytes());
}

/// Build a TTree streamer payload (version 20 layout).
fn tree_payload(
    tree: &TreeSpec,
    entries: u64,
    bounds: &[usize],
    per_branch: &[(Vec<u32>, Vec<u32>)],
) -> Vec<u8> {
    let mut body = Wr::new();
    body.u16(20);
    body.tnamed(&tree.name, "");
    body.stub(2); // TAttLine
    body.stub(2); // TAttFill
    body.stub(2); // TAttMarker

    body.i64(entries as i64); // fEntries
    body.i64(0); // fTotBytes
    body.i64(0); // fZipBytes
    body.i64(0); // fSavedBytes
    body.i64(0); // fFlushedBytes
    body.f64(1.0); // fWeight
    body.i32(0); // fTimerInterval
    body.i32(25); // fScanField
    body.i32(0); // fUpdate
    body.i32(1000); // fDefaultEntryOffsetLen
    body.i32(0); // fNClusterRange
    body.i64(entries.max(1) as i64); // fMaxEntries
    body.i64(0); // fMaxEntryLoop
    body.i64(0); // fMaxVirtualSize
    body.i64(0); // fAutoSave
    body.i64(0); // fAutoFlush
    body.i64(1_000_000); // fEstimate
    body.u8(0); // fClusterRangeEnd count
    body.u8(0); // fClusterSize count
    body.stub(1); // fIOFeatures

    let mut arr = Wr::new();
    arr.u16(3);
    arr.tobject();
    arr.string("");
    arr.i32(tree.branches.len() as i32);
    arr.i32(0);
    for (branch, (seeks, sizes)) in tree.branches.iter().zip(per_branch) {
        let inner = branch_body(branch, entries, bounds, seeks, sizes);
        // element tag, new-class tag, class name, versioned body
        let elem_len = 4 + "TBranch".len() + 1 + 4 + inner.0.len();
        arr.u32(K_BYTE_COUNT_MASK | elem_len as u32);
        arr.u32(K_NEW_CLASS_TAG);
        arr.cstring("TBranch");
        arr.u32(K_BYTE_COUNT_MASK | inner.0.len() as u32);
        arr.bytes(&inner.0);
    }
    body.u32(K_BYTE_COUNT_MASK | arr.0.len() as u32);
    body.bytes(&arr.0);

    let mut payload = Wr::new();
    payload.u32(K_BYTE_COUNT_MASK | body.0.len() as u32);
    payload.bytes(&body.0);
    payload.0
}

/// TBranch streamer body (version 13), starting at the version u16.
fn branch_body(
    branch: &BranchSpec,
    entries: u64,
    bounds: &[usize],
    seeks: &[u32],
    sizes: &[u32],
) -> Wr {
    let n_baskets = bounds.len() - 1;
    let max_baskets = n_baskets + 1;

    let mut w = Wr::new();
    w.u16(13);
    w.tnamed(&branch.name, &branch.name);
    w.stub(2); // TAttFill
    w.i32(0); // fCompress
    w.i32(32000); // fBasketSize
    w.i32(0); // fEntryOffsetLen
    w.i32(n_baskets as i32); // fWriteBasket
    w.i64(entries as i64); // fEntryNumber
    w.stub(1); // fIOFeatures
    w.i32(0); // fOffset
    w.i32(max_baskets as i32); // fMaxBaskets
    w.i32(0); // fSplitLevel
    w.i64(entries as i64); // fEntries
    w.i64(0); // fFirstEntry
    w.i64(0); // fTotBytes
    w.i64(0); // fZipBytes
    w.stub(3); // fBranches (empty)

    // fLeaves with a single leaf element; the element body is empty, the
    // reader only needs its class name.
    let leaf = leaf_class(branch.leaf);
    let mut larr = Wr::new();
    larr.u16(3);
    larr.tobject();
    larr.string("");
    larr.i32(1);
    larr.i32(0);
    larr.u32(K_BYTE_COUNT_MASK | (4 + leaf.len() + 1) as u32);
    larr.u32(K_NEW_CLASS_TAG);
    larr.cstring(leaf);
    w.u32(K_BYTE_COUNT_MASK | larr.0.len() as u32);
    w.bytes(&larr.0);

    w.stub(3); // fBaskets (empty)

    w.u8(1);
    for i in 0..max_baskets {
        w.i32(sizes.get(i).copied().unwrap_or(0) as i32); // fBasketBytes
    }
    w.u8(1);
    for i in 0..max_baskets {
        let b = if i <= n_baskets { bounds[i] as i64 } else { 0 };
        w.i64(b); // fBasketEntry
    }
    w.u8(1);
    for i in 0..max_baskets {
        w.i64(seeks.get(i).copied().unwrap_or(0) as i64); // fBasketSeek
    }
    w
}

/// Append-only big-endian writer mirroring `RBuffer`'s conventions.
struct Wr(Vec<u8>);

impl Wr {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn bytes(&mut self, b: &[u8]) {
        self.0.extend_from_slice(b);
    }

    fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    /// Length-prefixed string (255 escapes to a u32 length).
    fn string(&mut self, s: &str) {
        if s.len() >= 255 {
            self.u8(255);
            self.u32(s.len() as u32);
        } else {
            self.u8(s.len() as u8);
        }
        self.bytes(s.as_bytes());
    }

    fn cstring(&mut self, s: &str) {
        self.bytes(s.as_bytes());
        self.u8(0);
    }

    /// Versioned object carrying nothing but its version word.
    fn stub(&mut self, version: u16) {
        self.u32(K_BYTE_COUNT_MASK | 2);
        self.u16(version);
    }

    fn tobject(&mut self) {
        self.u16(1);
        self.u32(0); // fUniqueID
        self.u32(0x0300_0000); // fBits
    }

    fn tnamed(&mut self, name: &str, title: &str) {
        let mut sub = Wr::new();
        sub.u16(1);
        sub.tobject();
        sub.string(name);
        sub.string(title);
        self.u32(K_BYTE_COUNT_MASK | sub.0.len() as u32);
        self.bytes(&sub.0);
    }

    fn key_header(
        &mut self,
        class: &str,
        name: &str,
        title: &str,
        obj_len: u32,
        n_bytes: u32,
        seek_key: u32,
    ) {
        self.u32(n_bytes);
        self.u16(4); // key version
        self.u32(obj_len);
        self.u32(0); // datime
        self.u16(key_len(class, name, title) as u16);
        self.u16(1); // cycle
        self.u32(seek_key);
        self.u32(FBEGIN); // seek_pdir
        self.string(class);
        self.string(name);
        self.string(title);
    }
}
