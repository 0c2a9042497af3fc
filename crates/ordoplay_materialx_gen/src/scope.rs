// SPDX-License-Identifier: MIT OR Apache-2.0
//! Execution scope of a node relative to conditional branches.
//!
//! Scopes only widen: once a node is `Global` no merge narrows it again.

use crate::node::NodeId;

/// Number of inputs a conditional node may have; branch masks hold one
/// bit per input
pub const MAX_CONDITIONAL_INPUTS: usize = u32::BITS as usize;

/// Mask bit of the input at `index`, zero past [`MAX_CONDITIONAL_INPUTS`]
pub fn branch_bit(index: usize) -> u32 {
    u32::try_from(index)
        .ok()
        .and_then(|shift| 1u32.checked_shl(shift))
        .unwrap_or(0)
}

/// Where a node's result is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeInfo {
    /// Not computed yet
    #[default]
    Unknown,
    /// Needed unconditionally
    Global,
    /// Needed only by some branches of one conditional
    Single {
        /// Conditional node owning the branches
        conditional: NodeId,
        /// Branches that use the node
        mask: u32,
        /// All branch bits of the conditional
        full_mask: u32,
    },
    /// Needed by branches of several conditionals; emitted as global
    Multiple,
}

impl ScopeInfo {
    /// Merge an incoming scope into this one
    pub fn merge(&mut self, incoming: &ScopeInfo) {
        match (*self, *incoming) {
            (Self::Unknown, _) | (_, Self::Global) => *self = *incoming,
            (Self::Global, _) | (_, Self::Unknown) => {}
            (
                Self::Single {
                    conditional,
                    mask,
                    full_mask,
                },
                Self::Single {
                    conditional: other,
                    mask: other_mask,
                    ..
                },
            ) if conditional == other => {
                let merged = mask | other_mask;
                *self = if merged == full_mask {
                    Self::Global
                } else {
                    Self::Single {
                        conditional,
                        mask: merged,
                        full_mask,
                    }
                };
            }
            _ => *self = Self::Multiple,
        }
    }

    /// Scope contributed through branch input `input_index` of a
    /// conditional node
    pub fn adjusted_at_conditional_input(&self, conditional: NodeId, input_index: usize, full_mask: u32) -> ScopeInfo {
        match *self {
            Self::Global => Self::Single {
                conditional,
                mask: branch_bit(input_index),
                full_mask,
            },
            Self::Single {
                mask, full_mask: own_full, ..
            } if mask == own_full => Self::Single {
                conditional,
                mask: branch_bit(input_index),
                full_mask,
            },
            Self::Single { .. } => Self::Multiple,
            other => other,
        }
    }

    /// Whether a node with this scope is emitted inside branch
    /// `input_index` of `conditional`
    pub fn used_by_branch(&self, conditional: NodeId, input_index: usize) -> bool {
        match *self {
            Self::Single {
                conditional: c,
                mask,
                ..
            } => c == conditional && mask & branch_bit(input_index) != 0,
            _ => false,
        }
    }

    /// Whether a node with this scope is emitted at the top level
    pub fn is_top_level(&self) -> bool {
        !matches!(self, Self::Single { .. })
    }
}
