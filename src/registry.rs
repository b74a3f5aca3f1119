use std::{fmt, sync::Arc};

use indexmap::IndexSet;

/// Compiler-generated value. Rendered as `%N`; numbering starts at 1 and is
/// never reused within one compilation.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Temp(pub u32);

/// Anything that has been given storage or a value in the output.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Name {
    /// Storage for a source variable, created by its first assignment.
    Slot(Arc<str>),

    /// A loaded or computed value.
    Temp(Temp),
}

/// Every name declared so far, in declaration order. Grows monotonically.
#[derive(Debug, Default)]
pub struct Registry {
    names: IndexSet<Name>,
}

impl Registry {
    /// Returns true if `name` was not already declared.
    pub fn declare(&mut self, name: Name) -> bool {
        self.names.insert(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.names.contains(name)
    }

    #[cfg(test)]
    pub(crate) fn has_slot(&self, name: &str) -> bool {
        self.contains(&Name::Slot(name.into()))
    }

    #[cfg(test)]
    pub(crate) fn slots(&self) -> impl Iterator<Item=&Arc<str>> + '_ {
        self.names.iter().filter_map(|name| match name {
            Name::Slot(slot) => Some(slot),
            Name::Temp(_) => None,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

impl Temp {
    pub(crate) fn preincrement(&mut self) -> Self {
        self.0 += 1;
        *self
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let &Temp(n) = self;
        write!(f, "%{n}")
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Slot(name) => write!(f, "%{name}"),
            Name::Temp(temp) => write!(f, "{temp}"),
        }
    }
}

#[test]
fn declare_is_idempotent() {
    let mut registry = Registry::default();

    assert!(registry.declare(Name::Slot("x".into())));
    assert!(!registry.declare(Name::Slot("x".into())));
    assert!(registry.declare(Name::Temp(Temp(1))));
    assert!(registry.declare(Name::Slot("y".into())));

    assert_eq!(registry.len(), 3);
    assert!(registry.has_slot("x"));
    assert!(!registry.has_slot("z"));
    assert!(registry.contains(&Name::Temp(Temp(1))));

    let slots: Vec<_> = registry.slots().map(|s| s.as_ref()).collect();
    assert_eq!(slots, ["x", "y"]);
}

#[test]
fn temps_never_collide_with_slots() {
    let mut registry = Registry::default();
    registry.declare(Name::Temp(Temp(1)));

    // A source word spelled like a temporary is still just a slot lookup
    assert!(!registry.has_slot("%1"));
    assert!(!registry.has_slot("1"));
}

#[test]
fn temp_counter() {
    let mut counter = Temp::default();
    assert_eq!(counter.preincrement(), Temp(1));
    assert_eq!(counter.preincrement(), Temp(2));
    assert_eq!(counter.to_string(), "%2");
}
