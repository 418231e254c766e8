//! Overload selection by arity.
//!
//! Call-based selection compares the argument count with each overload's
//! parameter count; explicit instantiation compares the type argument count
//! with each overload's generic parameter count. A single-overload group is
//! selected unconditionally. Otherwise the first match in group order wins,
//! and when nothing matches the first overload is used as a fallback.
//! Overloads that share an arity are never told apart.

use std::fmt;

use dynbind_reflect::{MethodDescriptor, MethodGroup, MethodRef};

use crate::config::OverloadPolicy;
use crate::error::ResolveError;

/// Which count overloads are matched on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectBy {
    /// Formal parameter count vs. supplied arguments.
    Arity,
    /// Generic parameter count vs. supplied type arguments.
    TypeArity,
}

impl SelectBy {
    fn count(self, method: &MethodDescriptor) -> usize {
        match self {
            SelectBy::Arity => method.arity(),
            SelectBy::TypeArity => method.generic_params.len(),
        }
    }
}

impl fmt::Display for SelectBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectBy::Arity => write!(f, "argument(s)"),
            SelectBy::TypeArity => write!(f, "type argument(s)"),
        }
    }
}

/// The overload chosen from a group.
#[derive(Clone, Debug)]
pub struct Selection {
    pub method: MethodRef,
    /// Position in the group.
    pub index: usize,
    /// False when the choice is the no-match fallback.
    pub matched: bool,
}

/// Select an overload for `wanted` arguments (or type arguments).
///
/// Returns `None` only for an empty group.
pub fn select(group: &MethodGroup, wanted: usize, by: SelectBy) -> Option<Selection> {
    let first = group.methods.first()?;
    if group.methods.len() == 1 {
        return Some(Selection {
            method: first.clone(),
            index: 0,
            matched: true,
        });
    }
    let found = group
        .methods
        .iter()
        .enumerate()
        .find(|(_, m)| by.count(m) == wanted);
    Some(match found {
        Some((index, method)) => Selection {
            method: method.clone(),
            index,
            matched: true,
        },
        None => Selection {
            method: first.clone(),
            index: 0,
            matched: false,
        },
    })
}

/// `select` plus the overload policy: a fallback choice is logged and kept
/// under `Fallback`, and turned into `OverloadNotFound` under `Strict`.
pub fn choose(
    group: &MethodGroup,
    wanted: usize,
    by: SelectBy,
    policy: OverloadPolicy,
) -> Result<Selection, ResolveError> {
    let miss = || ResolveError::OverloadNotFound {
        method: group.name.clone(),
        by,
        wanted,
        available: group.methods.iter().map(|m| by.count(m)).collect(),
    };
    let selection = select(group, wanted, by).ok_or_else(miss)?;
    if !selection.matched {
        let err = miss();
        if policy == OverloadPolicy::Strict {
            return Err(err);
        }
        tracing::warn!(
            method = %group.name,
            fallback = %selection.method,
            "{}; falling back to the first overload",
            err
        );
    }
    tracing::debug!(
        method = %group.name,
        wanted,
        index = selection.index,
        "selected overload {}",
        selection.method
    );
    Ok(selection)
}
