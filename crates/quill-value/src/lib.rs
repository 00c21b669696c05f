//! Host value model and predicate registry for quill.
//!
//! This crate defines the dynamic values that checkers validate and the
//! process-wide registry mapping type names to value predicates. The
//! registry is the semantic domain of the pipeline; syntactic type
//! expressions (which live in `quill-ast`) resolve against it at build time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use quill_diag::{BuildError, CheckError};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A callable of the dynamic host.
///
/// Both the underlying functions handed to decoration and the wrapped
/// callables it produces have this shape, so wrapping composes.
pub type HostFn = Rc<dyn Fn(&[Value]) -> Result<Vec<Value>, CheckError>>;

/// Opaque host object. The tag lets hosts distinguish handle families
/// inside custom predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Userdata {
    pub tag: String,
}

/// A value of the dynamic host environment.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    Str(Rc<str>),
    Table(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(HostFn),
    Userdata(Rc<Userdata>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into()))
    }

    /// A fresh empty table.
    pub fn table() -> Self {
        Value::Table(Rc::new(RefCell::new(BTreeMap::new())))
    }

    pub fn table_from<const N: usize>(fields: [(&str, Value); N]) -> Self {
        let map = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Value::Table(Rc::new(RefCell::new(map)))
    }

    pub fn userdata(tag: impl Into<String>) -> Self {
        Value::Userdata(Rc::new(Userdata { tag: tag.into() }))
    }

    /// Field lookup on tables. `None` for non-tables and missing keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Table(map) => map.borrow().get(key).cloned(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::Str(_) => ValueKind::Str,
            Value::Table(_) => ValueKind::Table,
            Value::Function(_) => ValueKind::Function,
            Value::Userdata(_) => ValueKind::Userdata,
        }
    }

    /// The kind label used in error messages, e.g. `got string`.
    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Table(map) => {
                write!(f, "table{{")?;
                for (i, (k, v)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v:?}")?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => write!(f, "function"),
            Value::Userdata(u) => write!(f, "userdata<{}>", u.tag),
        }
    }
}

/// The primitive kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Nil,
    Boolean,
    Number,
    Str,
    Table,
    Function,
    Userdata,
}

impl ValueKind {
    pub const ALL: [ValueKind; 7] = [
        ValueKind::Nil,
        ValueKind::Boolean,
        ValueKind::Number,
        ValueKind::Str,
        ValueKind::Table,
        ValueKind::Function,
        ValueKind::Userdata,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::Str => "string",
            ValueKind::Table => "table",
            ValueKind::Function => "function",
            ValueKind::Userdata => "userdata",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A pure unary test on a value. No side effects.
pub type Predicate = Rc<dyn Fn(&Value) -> bool>;

/// Identity of a registered predicate.
///
/// The id is the registration slot, so two distinct predicates sharing a
/// type name compare unequal, and re-registering a name leaves checkers
/// emitted against the old slot untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(pub u32);

/// True when `name` matches the identifier grammar
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_type_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Slot {
    name: String,
    predicate: Predicate,
    /// Primitive predicates test for exactly one value kind, so no two of
    /// them can match the same value. Everything else (host registrations
    /// and `any`) may overlap and feeds the automata builder's
    /// backtracking analysis.
    primitive: bool,
}

/// The named mapping from type names to value predicates.
///
/// Slots are append-only: registration never invalidates an existing
/// [`PredicateId`]. The name index always points at the newest slot for a
/// name.
pub struct Registry {
    slots: Vec<Slot>,
    by_name: BTreeMap<String, PredicateId>,
}

impl Registry {
    /// A registry pre-populated with one predicate per primitive value kind
    /// plus `any`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for kind in ValueKind::ALL {
            registry.register_primitive(kind.name(), Rc::new(move |v: &Value| v.kind() == kind));
        }
        // `any` is core-defined but not primitive: primitives are exact
        // kind tests and never overlap each other, while `any` overlaps
        // everything and must go through the same ambiguity analysis as
        // user predicates.
        registry.insert("any".to_string(), Rc::new(|_: &Value| true), false);
        registry
    }

    /// A registry with no entries. Hosts that want full control over the
    /// type vocabulary start here.
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            by_name: BTreeMap::new(),
        }
    }

    /// Add or replace the predicate for `name`.
    ///
    /// Replacement allocates a fresh slot; checkers already emitted keep
    /// the predicate they were built with.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        predicate: Predicate,
    ) -> Result<PredicateId, BuildError> {
        let name = name.into();
        if !is_valid_type_name(&name) {
            return Err(BuildError::InvalidTypeName(name));
        }
        Ok(self.insert(name, predicate, false))
    }

    fn register_primitive(&mut self, name: &str, predicate: Predicate) {
        self.insert(name.to_string(), predicate, true);
    }

    fn insert(&mut self, name: String, predicate: Predicate, primitive: bool) -> PredicateId {
        let id = PredicateId(self.slots.len() as u32);
        self.slots.push(Slot {
            name: name.clone(),
            predicate,
            primitive,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Whether a slot holds a core-defined predicate.
    pub fn is_primitive(&self, id: PredicateId) -> bool {
        self.slots.get(id.0 as usize).is_some_and(|slot| slot.primitive)
    }

    /// The current slot for `name`.
    pub fn resolve(&self, name: &str) -> Option<PredicateId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The predicate in a slot. Ids only come from this registry, so a
    /// missing slot is a pipeline invariant violation.
    pub fn predicate(&self, id: PredicateId) -> Option<&Predicate> {
        self.slots.get(id.0 as usize).map(|slot| &slot.predicate)
    }

    pub fn name_of(&self, id: PredicateId) -> Option<&str> {
        self.slots.get(id.0 as usize).map(|slot| slot.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("slots", &self.slots.len())
            .field("names", &self.by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}
