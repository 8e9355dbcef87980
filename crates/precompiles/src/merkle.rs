//! Compressed Merkle multiproofs compatible with OpenZeppelin's `MerkleProof.multiProofVerify`.
//!
//! Pairs are hashed sorted, so proofs carry no left/right information. A multiproof discloses
//! a subset of leaves together with the sibling hashes (`proof`) and one flag per inner node
//! telling whether its second child comes from the disclosed side (`true`) or from `proof`.

use std::collections::VecDeque;

use alloy::primitives::{B256, keccak256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultiProofError {
    #[error("leaves and proof do not add up to the number of flags")]
    InvalidProofLength,
    #[error("multiproof consumed a hash that was not computed yet")]
    InvalidMultiProof,
    #[error("multiproof left {0} proof hashes unused")]
    UnusedProofHashes(usize),
    #[error("cannot build a tree without leaves")]
    EmptyTree,
    #[error("leaf index {0} is out of range")]
    LeafOutOfRange(usize),
    #[error("leaf index {0} is disclosed twice")]
    DuplicateLeaf(usize),
}

/// Hashes a pair of nodes in ascending order.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(low.as_slice());
    buf[32..].copy_from_slice(high.as_slice());
    keccak256(buf)
}

/// Rebuilds the root implied by `leaves`, `proof` and `proof_flags`.
pub fn process_multi_proof(
    leaves: &[B256],
    proof: &[B256],
    proof_flags: &[bool],
) -> Result<B256, MultiProofError> {
    if leaves.len() + proof.len() != proof_flags.len() + 1 {
        return Err(MultiProofError::InvalidProofLength);
    }

    let mut leaves = leaves.iter().copied();
    let mut proof_iter = proof.iter().copied();
    let mut hashes: Vec<B256> = Vec::with_capacity(proof_flags.len());
    let mut hash_pos = 0;

    let mut next_node = |hashes: &Vec<B256>| -> Result<B256, MultiProofError> {
        if let Some(leaf) = leaves.next() {
            return Ok(leaf);
        }
        let hash = hashes
            .get(hash_pos)
            .copied()
            .ok_or(MultiProofError::InvalidMultiProof)?;
        hash_pos += 1;
        Ok(hash)
    };

    for flag in proof_flags {
        let a = next_node(&hashes)?;
        let b = if *flag {
            next_node(&hashes)?
        } else {
            proof_iter.next().ok_or(MultiProofError::InvalidMultiProof)?
        };
        hashes.push(hash_pair(a, b));
    }

    let unused = proof_iter.count();
    if unused != 0 && !proof_flags.is_empty() {
        return Err(MultiProofError::UnusedProofHashes(unused));
    }

    match hashes.last() {
        Some(root) => Ok(*root),
        None => leaves
            .next()
            .or_else(|| proof.first().copied())
            .ok_or(MultiProofError::InvalidProofLength),
    }
}

/// Whether `leaves` belong to the tree committed to by `root`.
pub fn verify_multi_proof(
    root: B256,
    leaves: &[B256],
    proof: &[B256],
    proof_flags: &[bool],
) -> Result<(), MultiProofError> {
    if process_multi_proof(leaves, proof, proof_flags)? == root {
        Ok(())
    } else {
        Err(MultiProofError::InvalidMultiProof)
    }
}

/// Multiproof for a subset of a [`MerkleTree`]'s leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiProof {
    /// Positions of the disclosed leaves in the order the verifier consumes them.
    pub leaf_indices: Vec<usize>,
    pub leaves: Vec<B256>,
    pub proof: Vec<B256>,
    pub proof_flags: Vec<bool>,
}

/// Complete binary tree laid out as an array, with leaf `i` stored at `len - 1 - i`.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    nodes: Vec<B256>,
    leaf_count: usize,
}

impl MerkleTree {
    pub fn new(leaves: &[B256]) -> Result<Self, MultiProofError> {
        if leaves.is_empty() {
            return Err(MultiProofError::EmptyTree);
        }

        let len = 2 * leaves.len() - 1;
        let mut nodes = vec![B256::ZERO; len];
        for (i, leaf) in leaves.iter().enumerate() {
            nodes[len - 1 - i] = *leaf;
        }
        for i in (0..len - leaves.len()).rev() {
            nodes[i] = hash_pair(nodes[2 * i + 1], nodes[2 * i + 2]);
        }

        Ok(Self {
            nodes,
            leaf_count: leaves.len(),
        })
    }

    pub fn root(&self) -> B256 {
        self.nodes[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    fn tree_index(&self, leaf_index: usize) -> usize {
        self.nodes.len() - 1 - leaf_index
    }

    /// Builds the multiproof disclosing the leaves at `leaf_indices`.
    pub fn multi_proof(&self, leaf_indices: &[usize]) -> Result<MultiProof, MultiProofError> {
        let mut indices = Vec::with_capacity(leaf_indices.len());
        for &leaf_index in leaf_indices {
            if leaf_index >= self.leaf_count {
                return Err(MultiProofError::LeafOutOfRange(leaf_index));
            }
            indices.push(self.tree_index(leaf_index));
        }
        indices.sort_unstable_by(|a, b| b.cmp(a));
        if let Some(pair) = indices.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(MultiProofError::DuplicateLeaf(self.nodes.len() - 1 - pair[0]));
        }

        let mut stack: VecDeque<usize> = indices.iter().copied().collect();
        let mut proof = Vec::new();
        let mut proof_flags = Vec::new();

        while let Some(&j) = stack.front() {
            if j == 0 {
                break;
            }
            stack.pop_front();

            let sibling = if j % 2 == 1 { j + 1 } else { j - 1 };
            let parent = (j - 1) / 2;

            if stack.front() == Some(&sibling) {
                proof_flags.push(true);
                stack.pop_front();
            } else {
                proof_flags.push(false);
                proof.push(self.nodes[sibling]);
            }
            stack.push_back(parent);
        }

        if indices.is_empty() {
            proof.push(self.root());
        }

        Ok(MultiProof {
            leaf_indices: indices.iter().map(|i| self.nodes.len() - 1 - i).collect(),
            leaves: indices.iter().map(|i| self.nodes[*i]).collect(),
            proof,
            proof_flags,
        })
    }
}
