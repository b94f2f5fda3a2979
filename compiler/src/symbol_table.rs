// symbol_table.rs — Scoped, overload-aware symbol table
//
// A strict stack of lexical scopes mapping names to declaration handles.
// Overload-capable entities (functions) share one binding per name holding
// every candidate; all other entities bind one handle per scope. When a new
// binding collides with a visible one, the caller's override policy decides
// what happens, so dialect quirks stay out of the table itself.
//
// Preconditions: none; `register` opens an outermost scope if none is open.
// Postconditions: scopes close in exact reverse order of opening.
// Failure modes: closing with no open scope is an `InternalFault`;
//   a policy verdict of `Redefinition` is returned as `SymbolError`.
// Side effects: none.

use std::collections::HashMap;

use crate::diag::InternalFault;

// ── Bindings ────────────────────────────────────────────────────────────────

/// What a name is bound to in one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol<T> {
    Single(T),
    /// Overload set, in registration order.
    Overloads(Vec<T>),
}

impl<T: Copy> Symbol<T> {
    /// Every handle bound under the name.
    pub fn candidates(&self) -> &[T] {
        match self {
            Symbol::Single(handle) => std::slice::from_ref(handle),
            Symbol::Overloads(set) => set,
        }
    }

    pub fn single(&self) -> Option<T> {
        match self {
            Symbol::Single(handle) => Some(*handle),
            Symbol::Overloads(_) => None,
        }
    }
}

/// A visible binding that collides with a new registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict<T> {
    pub existing: T,
    /// True when `existing` lives in the innermost scope.
    pub same_scope: bool,
}

/// Verdict of an override policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    /// Bind the new handle: join the overload set, or shadow/overwrite.
    Accept,
    /// Put the new handle in place of the conflicting one.
    Replace,
    /// Reject the new handle and report a redefinition.
    Redefinition,
    /// Reject the new handle silently; the first binding wins.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError<T> {
    Redefinition { name: String, existing: T },
}

/// Outcome of a successful `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered<T> {
    Bound,
    Replaced(T),
    Ignored,
}

// ── Table ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    scopes: Vec<HashMap<String, Symbol<T>>>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        SymbolTable { scopes: Vec::new() }
    }
}

impl<T: Copy + PartialEq> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn close_scope(&mut self) -> Result<(), InternalFault> {
        self.scopes
            .pop()
            .map(|_| ())
            .ok_or(InternalFault::ScopeUnderflow)
    }

    /// Innermost-first lookup across all open scopes.
    pub fn fetch(&self, name: &str) -> Option<&Symbol<T>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Bind `handle` under `name` in the innermost scope.
    ///
    /// For overload-capable handles the policy is consulted once per visible
    /// candidate of an existing overload set; `Accept` from every candidate
    /// adds the handle to the set. For other handles the policy sees the
    /// innermost visible binding.
    pub fn register(
        &mut self,
        name: &str,
        handle: T,
        overloadable: bool,
        mut policy: impl FnMut(Conflict<T>) -> OverrideAction,
    ) -> Result<Registered<T>, SymbolError<T>> {
        let innermost = match self.scopes.len().checked_sub(1) {
            Some(i) => i,
            None => {
                self.open_scope();
                0
            }
        };
        let found = self
            .scopes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, scope)| scope.contains_key(name))
            .map(|(i, _)| i);

        let Some(level) = found else {
            let symbol = if overloadable {
                Symbol::Overloads(vec![handle])
            } else {
                Symbol::Single(handle)
            };
            self.scopes[innermost].insert(name.to_string(), symbol);
            return Ok(Registered::Bound);
        };
        let same_scope = level == innermost;
        let redefinition = |existing| SymbolError::Redefinition {
            name: name.to_string(),
            existing,
        };

        if let Some(Symbol::Overloads(set)) = self.scopes[level].get_mut(name) {
            if overloadable {
                for slot in 0..set.len() {
                    let existing = set[slot];
                    match policy(Conflict {
                        existing,
                        same_scope,
                    }) {
                        OverrideAction::Accept => {}
                        OverrideAction::Replace => {
                            set[slot] = handle;
                            return Ok(Registered::Replaced(existing));
                        }
                        OverrideAction::Redefinition => return Err(redefinition(existing)),
                        OverrideAction::Ignore => return Ok(Registered::Ignored),
                    }
                }
                set.push(handle);
                return Ok(Registered::Bound);
            }
        }

        let existing = match self.scopes[level].get(name) {
            Some(symbol) => symbol.candidates()[0],
            None => return Ok(Registered::Ignored),
        };
        let fresh = if overloadable {
            Symbol::Overloads(vec![handle])
        } else {
            Symbol::Single(handle)
        };
        match policy(Conflict {
            existing,
            same_scope,
        }) {
            OverrideAction::Accept => {
                self.scopes[innermost].insert(name.to_string(), fresh);
                Ok(Registered::Bound)
            }
            OverrideAction::Replace => {
                self.scopes[level].insert(name.to_string(), fresh);
                Ok(Registered::Replaced(existing))
            }
            OverrideAction::Redefinition => Err(redefinition(existing)),
            OverrideAction::Ignore => Ok(Registered::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shadow_or_redefine(c: Conflict<u32>) -> OverrideAction {
        if c.same_scope {
            OverrideAction::Redefinition
        } else {
            OverrideAction::Accept
        }
    }

    fn table() -> SymbolTable<u32> {
        let mut t = SymbolTable::new();
        t.open_scope();
        t
    }

    #[test]
    fn fetch_searches_innermost_first() {
        let mut t = table();
        t.register("x", 1, false, shadow_or_redefine).unwrap();
        t.open_scope();
        t.register("x", 2, false, shadow_or_redefine).unwrap();
        assert_eq!(t.fetch("x"), Some(&Symbol::Single(2)));
        t.close_scope().unwrap();
        assert_eq!(t.fetch("x"), Some(&Symbol::Single(1)));
    }

    #[test]
    fn bindings_vanish_with_their_scope() {
        let mut t = table();
        t.open_scope();
        t.register("tmp", 7, false, shadow_or_redefine).unwrap();
        t.close_scope().unwrap();
        assert!(t.fetch("tmp").is_none());
    }

    #[test]
    fn same_scope_conflict_is_redefinition() {
        let mut t = table();
        t.register("x", 1, false, shadow_or_redefine).unwrap();
        assert_eq!(
            t.register("x", 2, false, shadow_or_redefine),
            Err(SymbolError::Redefinition {
                name: "x".to_string(),
                existing: 1
            })
        );
        assert_eq!(t.fetch("x"), Some(&Symbol::Single(1)));
    }

    #[test]
    fn overloads_accumulate() {
        let mut t = table();
        t.register("f", 1, true, |_| OverrideAction::Accept).unwrap();
        t.register("f", 2, true, |_| OverrideAction::Accept).unwrap();
        assert_eq!(t.fetch("f").map(Symbol::candidates), Some(&[1, 2][..]));
    }

    #[test]
    fn replace_swaps_one_overload() {
        let mut t = table();
        t.register("f", 1, true, |_| OverrideAction::Accept).unwrap();
        t.register("f", 2, true, |_| OverrideAction::Accept).unwrap();
        let out = t.register("f", 3, true, |c| {
            if c.existing == 2 {
                OverrideAction::Replace
            } else {
                OverrideAction::Accept
            }
        });
        assert_eq!(out, Ok(Registered::Replaced(2)));
        assert_eq!(t.fetch("f").map(Symbol::candidates), Some(&[1, 3][..]));
    }

    #[test]
    fn ignore_keeps_first_binding() {
        let mut t = table();
        t.register("tex", 1, false, |_| OverrideAction::Ignore).unwrap();
        assert_eq!(
            t.register("tex", 2, false, |_| OverrideAction::Ignore),
            Ok(Registered::Ignored)
        );
        assert_eq!(t.fetch("tex"), Some(&Symbol::Single(1)));
    }

    #[test]
    fn closing_without_scope_faults() {
        let mut t: SymbolTable<u32> = SymbolTable::new();
        assert_eq!(t.close_scope(), Err(InternalFault::ScopeUnderflow));
    }
}
