// overload.rs — Deterministic overload selection
//
// Candidates are filtered by arity, then by implicit convertibility of every
// argument. Each survivor is scored by its worst argument conversion and,
// among equal worst conversions, by how many arguments need any conversion.
// The unique best score wins; a tie at the best score is an ambiguity.
//
// Preconditions: parameter and argument types are resolved.
// Postconditions: the result depends only on the candidate set, never on
//   candidate order.
// Failure modes: `NoMatch` when nothing is viable, `Ambiguous` on a tie.
// Side effects: none.

use crate::types::{implicit_rank, ConversionRank, TypeDenoter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError<T> {
    /// No candidate accepts the argument list. `arity_matches` counts the
    /// candidates that failed on types rather than on argument count.
    NoMatch { arity_matches: usize },
    /// Candidates tied at the best score, sorted.
    Ambiguous(Vec<T>),
}

/// Ordering key of a viable candidate; smaller is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    worst: ConversionRank,
    converted: usize,
}

fn score(params: &[TypeDenoter], args: &[TypeDenoter]) -> Option<Score> {
    let mut worst = ConversionRank::Exact;
    let mut converted = 0;
    for (arg, param) in args.iter().zip(params) {
        let rank = implicit_rank(arg, param)?;
        if rank != ConversionRank::Exact {
            converted += 1;
        }
        worst = worst.max(rank);
    }
    Some(Score { worst, converted })
}

/// Pick the best candidate for `args` from `(handle, parameter types)` pairs.
pub fn select_overload<T: Copy + Ord>(
    candidates: &[(T, Vec<TypeDenoter>)],
    args: &[TypeDenoter],
) -> Result<T, OverloadError<T>> {
    let by_arity: Vec<_> = candidates
        .iter()
        .filter(|(_, params)| params.len() == args.len())
        .collect();

    let viable: Vec<(T, Score)> = by_arity
        .iter()
        .filter_map(|(handle, params)| score(params, args).map(|s| (*handle, s)))
        .collect();

    let Some(best) = viable.iter().map(|(_, s)| *s).min() else {
        return Err(OverloadError::NoMatch {
            arity_matches: by_arity.len(),
        });
    };

    let mut winners: Vec<T> = viable
        .iter()
        .filter(|(_, s)| *s == best)
        .map(|(handle, _)| *handle)
        .collect();
    winners.sort();
    winners.dedup();

    match winners.as_slice() {
        [only] => Ok(*only),
        _ => Err(OverloadError::Ambiguous(winners)),
    }
}
