// crates/mith-tree/src/lib.rs

//! Seed trees and the salted Merkle tree over per-round view digests.
//!
//! Both structures share one heap-indexed layout: a complete binary tree of
//! `depth = ⌈log2 L⌉ + 1` levels truncated on the right so the last `L` node
//! indices are exactly the leaves. Children of node `i` are `2i+1` and
//! `2i+2`; a node "exists" when a leaf lives beneath it (truncation can leave
//! childless interior slots, which are skipped everywhere).
//!
//! Reveal/open sizes are *functions of the hide list*, never parsed from the
//! byte stream: callers recompute them on both sides, and the deterministic
//! node order below is the wire contract between signer and verifier.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::unwrap_used, clippy::expect_used)]

use mith_crypto::{prefix, Xof};
use thiserror::Error;

/// Salt length shared by every tree hash (and the whole signature scheme).
pub const SALT_SIZE: usize = 32;

/// Failures while rebuilding a tree from revealed data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// Revealed seed data does not match the recomputed reveal size.
    #[error("revealed seed data has the wrong length")]
    SeedDataLength,
    /// Provided Merkle node data does not match the recomputed open size.
    #[error("merkle node data has the wrong length")]
    MerkleDataLength,
    /// The Merkle root is not derivable from leaves plus provided nodes.
    #[error("merkle root could not be reconstructed")]
    MerkleIncomplete,
}

/// `⌈log2 x⌉` for `x ≥ 1`.
#[must_use]
pub fn ceil_log2(x: usize) -> usize {
    assert!(x >= 1);
    (usize::BITS - (x - 1).leading_zeros()) as usize
}

/* ------------------------------ tree shape ------------------------------ */

#[derive(Clone)]
struct Shape {
    num_nodes: usize,
    num_leaves: usize,
    depth: usize,
    exists: Vec<bool>,
}

impl Shape {
    fn new(num_leaves: usize) -> Self {
        assert!(num_leaves >= 2);
        let depth = ceil_log2(num_leaves) + 1;
        let num_nodes = ((1usize << depth) - 1) - ((1usize << (depth - 1)) - num_leaves);
        let mut exists = vec![false; num_nodes];
        for e in exists.iter_mut().skip(num_nodes - num_leaves) {
            *e = true;
        }
        for i in (1..num_nodes - num_leaves).rev() {
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            if (l < num_nodes && exists[l]) || (r < num_nodes && exists[r]) {
                exists[i] = true;
            }
        }
        exists[0] = true;
        Self {
            num_nodes,
            num_leaves,
            depth,
            exists,
        }
    }

    #[inline]
    fn first_leaf(&self) -> usize {
        self.num_nodes - self.num_leaves
    }

    #[inline]
    fn exists(&self, i: usize) -> bool {
        i < self.num_nodes && self.exists[i]
    }

    #[inline]
    fn sibling(i: usize) -> usize {
        if i % 2 == 1 {
            i + 1
        } else {
            i - 1
        }
    }

    /// Ancestors of `node` from depth `depth-2` (parent) up to the root,
    /// returned root-first.
    fn path_to_root(&self, mut node: usize) -> Vec<usize> {
        let mut path = vec![node];
        while node != 0 {
            node = (node - 1) / 2;
            path.push(node);
        }
        path.reverse();
        path
    }

    /// Seed-tree reveal list for `hide` (leaf indices): per depth, per hidden
    /// path, the sibling of the path node unless that sibling is itself on a
    /// path; deduplicated in first-occurrence order.
    fn revealed_seed_nodes(&self, hide: &[u16]) -> Vec<usize> {
        let mut on_path = vec![false; self.num_nodes];
        let mut paths = Vec::with_capacity(hide.len());
        for &h in hide {
            let leaf = self.first_leaf() + h as usize;
            let path = self.path_to_root(leaf);
            for &n in &path {
                on_path[n] = true;
            }
            paths.push(path);
        }

        let mut out = Vec::new();
        for d in 1..self.depth {
            for path in &paths {
                let node = path[d];
                let sib = Self::sibling(node);
                if self.exists(sib) && !on_path[sib] && !out.contains(&sib) {
                    out.push(sib);
                }
            }
        }
        out
    }

    /// Merkle open list for `missing` (leaf indices): roots of the maximal
    /// subtrees whose existing leaves are all missing, in index order.
    fn revealed_merkle_nodes(&self, missing: &[u16]) -> Vec<usize> {
        let mut gone = vec![false; self.num_nodes];
        for &m in missing {
            gone[self.first_leaf() + m as usize] = true;
        }
        for i in (1..self.first_leaf()).rev() {
            if !self.exists(i) {
                continue;
            }
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let l_gone = !self.exists(l) || gone[l];
            let r_gone = !self.exists(r) || gone[r];
            if l_gone && r_gone {
                gone[i] = true;
            }
        }

        (0..self.num_nodes)
            .filter(|&i| self.exists(i) && gone[i] && (i == 0 || !gone[(i - 1) / 2]))
            .collect()
    }
}

/* ------------------------------- seed tree ------------------------------ */

/// A tree-PRG: every node holds a `seed_size` seed; children are derived by
/// a domain-prefixed XOF over (parent seed, salt, repetition, node index).
pub struct SeedTree {
    shape: Shape,
    seed_size: usize,
    nodes: Vec<u8>,
    have: Vec<bool>,
}

impl SeedTree {
    fn empty(num_leaves: usize, seed_size: usize) -> Self {
        let shape = Shape::new(num_leaves);
        let nodes = vec![0u8; shape.num_nodes * seed_size];
        let have = vec![false; shape.num_nodes];
        Self {
            shape,
            seed_size,
            nodes,
            have,
        }
    }

    /// Expand `root` into `num_leaves` per-leaf seeds.
    #[must_use]
    pub fn generate(
        num_leaves: usize,
        seed_size: usize,
        root: &[u8],
        salt: &[u8; SALT_SIZE],
        rep: u16,
    ) -> Self {
        let mut t = Self::empty(num_leaves, seed_size);
        t.nodes[..seed_size].copy_from_slice(root);
        t.have[0] = true;
        t.expand(salt, rep);
        t
    }

    /// Rebuild a tree from `data` revealing every leaf except those in
    /// `hide`. Hidden leaves read as all-zero seeds afterwards.
    pub fn reconstruct(
        num_leaves: usize,
        seed_size: usize,
        hide: &[u16],
        data: &[u8],
        salt: &[u8; SALT_SIZE],
        rep: u16,
    ) -> Result<Self, TreeError> {
        let mut t = Self::empty(num_leaves, seed_size);
        let revealed = t.shape.revealed_seed_nodes(hide);
        if data.len() != revealed.len() * seed_size {
            return Err(TreeError::SeedDataLength);
        }
        for (k, &node) in revealed.iter().enumerate() {
            let off = node * seed_size;
            t.nodes[off..off + seed_size].copy_from_slice(&data[k * seed_size..(k + 1) * seed_size]);
            t.have[node] = true;
        }
        t.expand(salt, rep);
        Ok(t)
    }

    /// Derive children for every held node, top-down.
    fn expand(&mut self, salt: &[u8; SALT_SIZE], rep: u16) {
        let ss = self.seed_size;
        for i in 0..self.shape.num_nodes {
            if !self.have[i] {
                continue;
            }
            let l = 2 * i + 1;
            if !self.shape.exists(l) {
                continue;
            }
            let mut h = Xof::with_prefix(prefix::SEED_TREE);
            h.update(&self.nodes[i * ss..(i + 1) * ss]);
            h.update(salt);
            h.update_u16_le(rep);
            h.update_u16_le(i as u16);
            let mut r = h.finalize();
            let mut children = vec![0u8; 2 * ss];
            r.squeeze(&mut children);

            self.nodes[l * ss..(l + 1) * ss].copy_from_slice(&children[..ss]);
            self.have[l] = true;
            let rt = l + 1;
            if self.shape.exists(rt) {
                self.nodes[rt * ss..(rt + 1) * ss].copy_from_slice(&children[ss..]);
                self.have[rt] = true;
            }
        }
    }

    /// Leaf `j`'s seed (all zero when the leaf was hidden at reconstruction).
    #[must_use]
    pub fn leaf(&self, j: usize) -> &[u8] {
        let node = self.shape.first_leaf() + j;
        &self.nodes[node * self.seed_size..(node + 1) * self.seed_size]
    }

    /// Number of leaves.
    #[must_use]
    pub fn num_leaves(&self) -> usize {
        self.shape.num_leaves
    }

    /// Compact reveal of every leaf except those in `hide`.
    #[must_use]
    pub fn reveal(&self, hide: &[u16]) -> Vec<u8> {
        let revealed = self.shape.revealed_seed_nodes(hide);
        let mut out = Vec::with_capacity(revealed.len() * self.seed_size);
        for node in revealed {
            out.extend_from_slice(&self.nodes[node * self.seed_size..(node + 1) * self.seed_size]);
        }
        out
    }

    /// Size of [`SeedTree::reveal`] for the given tree geometry and hide
    /// list, without a tree instance.
    #[must_use]
    pub fn reveal_size(num_leaves: usize, seed_size: usize, hide: &[u16]) -> usize {
        Shape::new(num_leaves).revealed_seed_nodes(hide).len() * seed_size
    }
}

/* ------------------------------ Merkle tree ----------------------------- */

/// Salted Merkle tree over `digest_size` leaves; supports opening exactly
/// the subtrees a verifier cannot recompute.
pub struct MerkleTree {
    shape: Shape,
    digest_size: usize,
    nodes: Vec<u8>,
    have: Vec<bool>,
}

impl MerkleTree {
    /// Empty tree for `num_leaves` digests of `digest_size` bytes.
    #[must_use]
    pub fn new(num_leaves: usize, digest_size: usize) -> Self {
        let shape = Shape::new(num_leaves);
        let nodes = vec![0u8; shape.num_nodes * digest_size];
        let have = vec![false; shape.num_nodes];
        Self {
            shape,
            digest_size,
            nodes,
            have,
        }
    }

    fn node(&self, i: usize) -> &[u8] {
        &self.nodes[i * self.digest_size..(i + 1) * self.digest_size]
    }

    fn set_node(&mut self, i: usize, data: &[u8]) {
        self.nodes[i * self.digest_size..(i + 1) * self.digest_size].copy_from_slice(data);
        self.have[i] = true;
    }

    fn parent_hash(&self, i: usize, salt: &[u8; SALT_SIZE]) -> Vec<u8> {
        let mut h = Xof::with_prefix(prefix::MERKLE);
        h.update(salt);
        h.update_u16_le(i as u16);
        let l = 2 * i + 1;
        if self.shape.exists(l) {
            h.update(self.node(l));
        }
        let r = 2 * i + 2;
        if self.shape.exists(r) {
            h.update(self.node(r));
        }
        h.finalize().squeeze_vec(self.digest_size)
    }

    /// Build the full tree from all leaf digests (signer side).
    pub fn build(&mut self, leaves: &[Vec<u8>], salt: &[u8; SALT_SIZE]) {
        assert_eq!(leaves.len(), self.shape.num_leaves);
        for (j, leaf) in leaves.iter().enumerate() {
            self.set_node(self.shape.first_leaf() + j, leaf);
        }
        for i in (0..self.shape.first_leaf()).rev() {
            if self.shape.exists(i) {
                let h = self.parent_hash(i, salt);
                self.set_node(i, &h);
            }
        }
    }

    /// Root digest; only meaningful once built or verified.
    #[must_use]
    pub fn root(&self) -> &[u8] {
        self.node(0)
    }

    /// Node data covering exactly the `missing` leaves.
    #[must_use]
    pub fn open(&self, missing: &[u16]) -> Vec<u8> {
        let list = self.shape.revealed_merkle_nodes(missing);
        let mut out = Vec::with_capacity(list.len() * self.digest_size);
        for node in list {
            out.extend_from_slice(self.node(node));
        }
        out
    }

    /// Size of [`MerkleTree::open`] for the geometry and missing list.
    #[must_use]
    pub fn open_size(num_leaves: usize, digest_size: usize, missing: &[u16]) -> usize {
        Shape::new(num_leaves).revealed_merkle_nodes(missing).len() * digest_size
    }

    /// Install opened node data for the `missing` leaves (verifier side).
    pub fn add_nodes(&mut self, missing: &[u16], data: &[u8]) -> Result<(), TreeError> {
        let list = self.shape.revealed_merkle_nodes(missing);
        if data.len() != list.len() * self.digest_size {
            return Err(TreeError::MerkleDataLength);
        }
        let ds = self.digest_size;
        for (k, &node) in list.iter().enumerate() {
            self.set_node(node, &data[k * ds..(k + 1) * ds]);
        }
        Ok(())
    }

    /// Recompute the tree from the present leaves plus installed nodes and
    /// fail unless the root becomes derivable.
    pub fn verify(
        &mut self,
        leaves: &[Option<Vec<u8>>],
        salt: &[u8; SALT_SIZE],
    ) -> Result<(), TreeError> {
        assert_eq!(leaves.len(), self.shape.num_leaves);
        for (j, leaf) in leaves.iter().enumerate() {
            if let Some(leaf) = leaf {
                self.set_node(self.shape.first_leaf() + j, leaf);
            }
        }
        for i in (0..self.shape.first_leaf()).rev() {
            if !self.shape.exists(i) || self.have[i] {
                continue;
            }
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let l_ready = !self.shape.exists(l) || self.have[l];
            let r_ready = !self.shape.exists(r) || self.have[r];
            if l_ready && r_ready {
                let h = self.parent_hash(i, salt);
                self.set_node(i, &h);
            }
        }
        if self.have[0] {
            Ok(())
        } else {
            Err(TreeError::MerkleIncomplete)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; SALT_SIZE] = [7u8; SALT_SIZE];

    #[test]
    fn shape_truncation() {
        let s = Shape::new(250);
        assert_eq!(s.depth, 9);
        assert_eq!(s.num_nodes, 505);
        assert_eq!(s.first_leaf(), 255);
        // Childless interior slots produced by truncation do not exist.
        assert!(!s.exists(252));
        assert!(!s.exists(254));
        assert!(s.exists(251));
    }

    #[test]
    fn seed_tree_reveal_reconstruct_round_trip() {
        let root = [0xa5u8; 16];
        let tree = SeedTree::generate(64, 16, &root, &SALT, 3);
        let hide = [17u16];
        let data = tree.reveal(&hide);
        assert_eq!(data.len(), SeedTree::reveal_size(64, 16, &hide));
        // A single hidden leaf in a 64-leaf perfect tree costs one sibling
        // per level.
        assert_eq!(data.len(), 6 * 16);

        let rec = SeedTree::reconstruct(64, 16, &hide, &data, &SALT, 3).expect("reveal data fits");
        for j in 0..64 {
            if j == 17 {
                assert_eq!(rec.leaf(j), &[0u8; 16]);
                assert_ne!(tree.leaf(j), &[0u8; 16]);
            } else {
                assert_eq!(rec.leaf(j), tree.leaf(j), "leaf {j}");
            }
        }
    }

    #[test]
    fn seed_tree_non_power_of_two() {
        let root = [9u8; 16];
        let tree = SeedTree::generate(250, 16, &root, &SALT, 0);
        let hide: Vec<u16> = vec![0, 13, 99, 249];
        let data = tree.reveal(&hide);
        let rec = SeedTree::reconstruct(250, 16, &hide, &data, &SALT, 0).expect("fits");
        for j in 0..250 {
            if hide.contains(&(j as u16)) {
                assert_eq!(rec.leaf(j), &[0u8; 16]);
            } else {
                assert_eq!(rec.leaf(j), tree.leaf(j), "leaf {j}");
            }
        }
    }

    /// Hide lists arrive in challenge-derivation order, not sorted; the
    /// reveal byte stream is a function of that order on both sides.
    #[test]
    fn seed_tree_reveal_respects_hide_order() {
        let root = [4u8; 16];
        let tree = SeedTree::generate(250, 16, &root, &SALT, 2);
        let unsorted: Vec<u16> = vec![201, 7, 116, 9];
        let data = tree.reveal(&unsorted);
        assert_eq!(data.len(), SeedTree::reveal_size(250, 16, &unsorted));
        let rec = SeedTree::reconstruct(250, 16, &unsorted, &data, &SALT, 2).expect("fits");
        for j in 0..250 {
            if unsorted.contains(&(j as u16)) {
                assert_eq!(rec.leaf(j), &[0u8; 16]);
            } else {
                assert_eq!(rec.leaf(j), tree.leaf(j), "leaf {j}");
            }
        }
    }

    #[test]
    fn seed_tree_rejects_bad_length() {
        let root = [1u8; 16];
        let tree = SeedTree::generate(64, 16, &root, &SALT, 0);
        let mut data = tree.reveal(&[5]);
        data.pop();
        assert_eq!(
            SeedTree::reconstruct(64, 16, &[5], &data, &SALT, 0).err(),
            Some(TreeError::SeedDataLength)
        );
    }

    fn leaf_digests(n: usize, ds: usize) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| {
                let mut h = Xof::new();
                h.update(b"leaf");
                h.update_u16_le(i as u16);
                h.finalize().squeeze_vec(ds)
            })
            .collect()
    }

    #[test]
    fn merkle_open_verify_round_trip() {
        let n = 250;
        let ds = 32;
        let leaves = leaf_digests(n, ds);
        let mut tree = MerkleTree::new(n, ds);
        tree.build(&leaves, &SALT);
        let root = tree.root().to_vec();

        // Verifier knows all leaves except the "missing" ones.
        let missing: Vec<u16> = (0..n as u16).filter(|t| t % 7 == 0).collect();
        let info = tree.open(&missing);
        assert_eq!(info.len(), MerkleTree::open_size(n, ds, &missing));

        let mut check = MerkleTree::new(n, ds);
        check.add_nodes(&missing, &info).expect("sizes match");
        let partial: Vec<Option<Vec<u8>>> = (0..n)
            .map(|j| {
                if missing.contains(&(j as u16)) {
                    None
                } else {
                    Some(leaves[j].clone())
                }
            })
            .collect();
        check.verify(&partial, &SALT).expect("root derivable");
        assert_eq!(check.root(), &root[..]);
    }

    #[test]
    fn merkle_missing_nodes_fail_closed() {
        let n = 16;
        let ds = 32;
        let leaves = leaf_digests(n, ds);
        let mut tree = MerkleTree::new(n, ds);
        tree.build(&leaves, &SALT);

        let missing: Vec<u16> = vec![3, 4];
        let mut check = MerkleTree::new(n, ds);
        // Forget to add the opened nodes entirely.
        let partial: Vec<Option<Vec<u8>>> = (0..n)
            .map(|j| {
                if missing.contains(&(j as u16)) {
                    None
                } else {
                    Some(leaves[j].clone())
                }
            })
            .collect();
        assert_eq!(
            check.verify(&partial, &SALT).unwrap_err(),
            TreeError::MerkleIncomplete
        );

        // Wrong-length node data is rejected up front.
        let mut info = tree.open(&missing);
        info.push(0);
        assert_eq!(
            check.add_nodes(&missing, &info).unwrap_err(),
            TreeError::MerkleDataLength
        );
    }
}
