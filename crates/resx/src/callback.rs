//! The single mechanism behind every user-configurable hook in the
//! pipeline: content combiners, content reducers, access rules, hashers,
//! and the RPC transport are all [`Callback`] values.
//!
//! A callback pairs an async hook over [`Term`] values with a calling
//! convention: an exact arity, a prebound argument list, or a prebound
//! list with explicit input placement.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::term::Term;

/// The function behind a callback. Hooks own their inputs and are shared
/// freely between tasks.
#[derive(Clone)]
pub struct Hook(Arc<dyn Fn(Vec<Term>) -> BoxFuture<'static, Result<Term>> + Send + Sync>);

impl Hook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<Term>) -> BoxFuture<'static, Result<Term>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a synchronous closure.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(Vec<Term>) -> Result<Term> + Send + Sync + 'static,
    {
        Self(Arc::new(move |args| {
            let out = f(args);
            Box::pin(async move { out })
        }))
    }

    pub async fn invoke(&self, args: Vec<Term>) -> Result<Term> {
        (self.0)(args).await
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Hook")
    }
}

/// Where dispatch splices the operation inputs into a prebound argument
/// list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Insert all inputs contiguously at this index.
    Index(usize),
    /// One final position per input, merged in ascending position order.
    Positions(Vec<usize>),
    /// Discard the inputs entirely. Only legal when the call site says
    /// the inputs are optional.
    Ignore,
}

/// Whether the call site insists its inputs reach the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// A hook plus its calling convention.
#[derive(Debug, Clone)]
pub enum Callback {
    /// A hook with a known arity; the input count must match exactly.
    Arity { hook: Hook, arity: usize },
    /// A hook with prebound arguments; inputs are appended.
    Bound { hook: Hook, args: Vec<Term> },
    /// A hook with prebound arguments and explicit input placement.
    Placed {
        hook: Hook,
        args: Vec<Term>,
        placement: Placement,
    },
}

impl Callback {
    /// An arity-checked callback over a synchronous closure.
    pub fn sync<F>(arity: usize, f: F) -> Self
    where
        F: Fn(Vec<Term>) -> Result<Term> + Send + Sync + 'static,
    {
        Callback::Arity {
            hook: Hook::from_sync(f),
            arity,
        }
    }

    /// An arity-checked callback over an async closure.
    pub fn new<F>(arity: usize, f: F) -> Self
    where
        F: Fn(Vec<Term>) -> BoxFuture<'static, Result<Term>> + Send + Sync + 'static,
    {
        Callback::Arity {
            hook: Hook::new(f),
            arity,
        }
    }

    /// Invoke the hook with the given operation inputs.
    pub async fn call(&self, inputs: Vec<Term>, requirement: Requirement) -> Result<Term> {
        match self {
            Callback::Arity { hook, arity } => {
                if inputs.len() != *arity {
                    return Err(Error::Internal(format!(
                        "callback expects {} argument(s), got {}",
                        arity,
                        inputs.len()
                    )));
                }
                hook.invoke(inputs).await
            }
            Callback::Bound { hook, args } => {
                let mut merged = args.clone();
                merged.extend(inputs);
                hook.invoke(merged).await
            }
            Callback::Placed {
                hook,
                args,
                placement,
            } => {
                let merged = place_inputs(args, inputs, placement, requirement)?;
                hook.invoke(merged).await
            }
        }
    }
}

fn place_inputs(
    prebound: &[Term],
    inputs: Vec<Term>,
    placement: &Placement,
    requirement: Requirement,
) -> Result<Vec<Term>> {
    match placement {
        Placement::Index(at) => {
            let at = (*at).min(prebound.len());
            let mut merged = prebound[..at].to_vec();
            merged.extend(inputs);
            merged.extend_from_slice(&prebound[at..]);
            Ok(merged)
        }
        Placement::Positions(positions) => {
            if positions.len() != inputs.len() {
                return Err(Error::Internal(format!(
                    "callback placement names {} position(s) for {} input(s)",
                    positions.len(),
                    inputs.len()
                )));
            }
            // Pair each input with its final position, then insert in
            // ascending position order so earlier inserts do not shift
            // later ones.
            let mut pairs: Vec<(usize, Term)> =
                positions.iter().copied().zip(inputs).collect();
            pairs.sort_by_key(|(pos, _)| *pos);
            let mut merged: Vec<Term> = prebound.to_vec();
            for (pos, input) in pairs {
                let pos = pos.min(merged.len());
                merged.insert(pos, input);
            }
            Ok(merged)
        }
        Placement::Ignore => match requirement {
            Requirement::Optional => Ok(prebound.to_vec()),
            Requirement::Required => Err(Error::Internal(
                "callback discards inputs the caller requires".to_string(),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Hook {
        Hook::from_sync(|args| Ok(Term::List(args)))
    }

    fn terms(items: &[i64]) -> Vec<Term> {
        items.iter().map(|i| Term::Int(*i)).collect()
    }

    #[tokio::test]
    async fn arity_enforced() {
        let cb = Callback::Arity {
            hook: echo(),
            arity: 2,
        };
        let out = cb
            .call(terms(&[1, 2]), Requirement::Required)
            .await
            .unwrap();
        assert_eq!(out, Term::List(terms(&[1, 2])));

        let err = cb.call(terms(&[1]), Requirement::Required).await;
        assert!(matches!(err, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn bound_appends_inputs() {
        let cb = Callback::Bound {
            hook: echo(),
            args: terms(&[10, 11]),
        };
        let out = cb.call(terms(&[1]), Requirement::Required).await.unwrap();
        assert_eq!(out, Term::List(terms(&[10, 11, 1])));
    }

    #[tokio::test]
    async fn index_placement_splits_prebound() {
        let cb = Callback::Placed {
            hook: echo(),
            args: terms(&[10, 11]),
            placement: Placement::Index(1),
        };
        let out = cb
            .call(terms(&[1, 2]), Requirement::Required)
            .await
            .unwrap();
        assert_eq!(out, Term::List(terms(&[10, 1, 2, 11])));
    }

    #[tokio::test]
    async fn position_placement_merges_in_order() {
        let cb = Callback::Placed {
            hook: echo(),
            args: terms(&[10, 11]),
            placement: Placement::Positions(vec![2, 0]),
        };
        // Input 1 lands at final position 2, input 2 at final position 0.
        let out = cb
            .call(terms(&[1, 2]), Requirement::Required)
            .await
            .unwrap();
        assert_eq!(out, Term::List(terms(&[2, 10, 1, 11])));
    }

    #[tokio::test]
    async fn position_count_must_match() {
        let cb = Callback::Placed {
            hook: echo(),
            args: vec![],
            placement: Placement::Positions(vec![0]),
        };
        let err = cb.call(terms(&[1, 2]), Requirement::Required).await;
        assert!(matches!(err, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn ignore_placement_respects_requirement() {
        let cb = Callback::Placed {
            hook: echo(),
            args: terms(&[7]),
            placement: Placement::Ignore,
        };
        let out = cb
            .call(terms(&[1, 2]), Requirement::Optional)
            .await
            .unwrap();
        assert_eq!(out, Term::List(terms(&[7])));

        let err = cb.call(terms(&[1]), Requirement::Required).await;
        assert!(matches!(err, Err(Error::Internal(_))));
    }
}
