//! Ordering two resources along their shared lineage.
//!
//! The comparison walks both reference chains in parallel, emitting one
//! `(checksum equality, timestamp order)` pair per link, then folds the
//! pairs from the chosen end. Checksums answer "same content?";
//! timestamps break the tie.

use std::cmp::Ordering;

use crate::error::Result;
use crate::integrity::Integrity;
use crate::reference::Reference;
use crate::resource::Resource;
use crate::Resx;

/// Outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Same content, same instant.
    Eq,
    /// Same instant, provably different content.
    Ne,
    /// The left side is older.
    Lt,
    /// The left side is newer.
    Gt,
    /// Not answerable from the integrity stamps alone.
    Na,
}

/// Which end of the comparison list the fold starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainEnd {
    /// The outermost link first.
    #[default]
    First,
    /// The innermost link first.
    Last,
}

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub order: ChainEnd,
    /// Fall back to comparing materialised content when the stamps end
    /// in `Eq` or `Na`.
    pub content: bool,
    /// Remap an `Na` outcome.
    pub unsure: Option<Comparison>,
}

impl CompareOptions {
    pub fn content(mut self, content: bool) -> Self {
        self.content = content;
        self
    }

    pub fn unsure(mut self, outcome: Comparison) -> Self {
        self.unsure = Some(outcome);
        self
    }
}

/// Walk both source chains in parallel, emitting one integrity pair per
/// shared link.
pub(crate) fn comparison_list(
    rt: &Resx,
    a: &Reference,
    b: &Reference,
) -> Result<Vec<(Option<bool>, Ordering)>> {
    let mut list = Vec::new();
    let mut cursor_a = Some(a.clone());
    let mut cursor_b = Some(b.clone());
    while let (Some(link_a), Some(link_b)) = (&cursor_a, &cursor_b) {
        list.push(Integrity::compare(link_a.integrity(), link_b.integrity()));
        cursor_a = rt.source(link_a)?;
        cursor_b = rt.source(link_b)?;
    }
    Ok(list)
}

/// Fold the comparison list from the chosen end.
pub(crate) fn fold(items: &[(Option<bool>, Ordering)], order: ChainEnd) -> Comparison {
    let mut state = Comparison::Eq;
    let iter: Box<dyn Iterator<Item = &(Option<bool>, Ordering)>> = match order {
        ChainEnd::First => Box::new(items.iter()),
        ChainEnd::Last => Box::new(items.iter().rev()),
    };
    for (equality, ordering) in iter {
        match (equality, ordering) {
            (Some(true), Ordering::Equal) => state = Comparison::Eq,
            (Some(true), ord) => return from_ordering(*ord),
            (Some(false), Ordering::Equal) => return Comparison::Ne,
            (Some(false), ord) => return from_ordering(*ord),
            (None, Ordering::Equal) => state = Comparison::Na,
            (None, ord) => return from_ordering(*ord),
        }
    }
    state
}

fn from_ordering(ord: Ordering) -> Comparison {
    match ord {
        Ordering::Less => Comparison::Lt,
        Ordering::Greater => Comparison::Gt,
        Ordering::Equal => Comparison::Eq,
    }
}

/// Resolve the full comparison, including the optional content pass and
/// the `unsure` remap.
pub(crate) async fn run(
    rt: &Resx,
    a: &Resource,
    b: &Resource,
    opts: &CompareOptions,
) -> Result<Option<Comparison>> {
    if !rt.alike(&a.reference, &b.reference) {
        return Ok(None);
    }
    let list = comparison_list(rt, &a.reference, &b.reference)?;
    let mut outcome = fold(&list, opts.order);
    if matches!(outcome, Comparison::Eq | Comparison::Na) && opts.content {
        let left = a.content.bytes(rt).await?;
        let right = b.content.bytes(rt).await?;
        outcome = if left == right {
            Comparison::Eq
        } else {
            Comparison::Ne
        };
    }
    if outcome == Comparison::Na {
        if let Some(mapped) = opts.unsure {
            outcome = mapped;
        }
    }
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(eq: Option<bool>, ord: Ordering) -> (Option<bool>, Ordering) {
        (eq, ord)
    }

    #[test]
    fn equal_links_stay_equal() {
        let items = vec![
            pair(Some(true), Ordering::Equal),
            pair(Some(true), Ordering::Equal),
        ];
        assert_eq!(fold(&items, ChainEnd::First), Comparison::Eq);
    }

    #[test]
    fn timestamp_breaks_the_tie() {
        let items = vec![pair(Some(true), Ordering::Less)];
        assert_eq!(fold(&items, ChainEnd::First), Comparison::Lt);
        let items = vec![pair(None, Ordering::Greater)];
        assert_eq!(fold(&items, ChainEnd::First), Comparison::Gt);
    }

    #[test]
    fn digest_mismatch_at_the_same_instant_is_ne() {
        let items = vec![pair(Some(false), Ordering::Equal)];
        assert_eq!(fold(&items, ChainEnd::First), Comparison::Ne);
    }

    #[test]
    fn unknowable_links_carry_na() {
        let items = vec![pair(None, Ordering::Equal)];
        assert_eq!(fold(&items, ChainEnd::First), Comparison::Na);
    }

    #[test]
    fn fold_direction_matters() {
        let items = vec![
            pair(Some(true), Ordering::Less),
            pair(Some(false), Ordering::Equal),
        ];
        assert_eq!(fold(&items, ChainEnd::First), Comparison::Lt);
        assert_eq!(fold(&items, ChainEnd::Last), Comparison::Ne);
    }

    #[test]
    fn halting_is_antisymmetric() {
        let forward = vec![pair(Some(true), Ordering::Less)];
        let backward = vec![pair(Some(true), Ordering::Greater)];
        assert_eq!(fold(&forward, ChainEnd::First), Comparison::Lt);
        assert_eq!(fold(&backward, ChainEnd::First), Comparison::Gt);
    }
}
