//! The B type algebra.
//!
//! Types are plain values. Unknown parts are represented by [`TypeVar`]s that
//! are owned by a [`Unifier`](crate::unify::Unifier); two AST nodes share a
//! type by holding the same variable, never by aliasing a mutable cell.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A type variable, allocated by a [`Unifier`](crate::unify::Unifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeVar(pub u32);

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Identity of a seeded enumerated or deferred set: the machine that
/// declares it and the index of the set's declaration there.
///
/// Two set types are the same type only when they come from the same
/// declaration. Re-checking a copy of a machine yields equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NominalId {
    pub machine: String,
    pub decl: u32,
}

impl NominalId {
    pub fn new(machine: impl Into<String>, decl: u32) -> Self {
        Self {
            machine: machine.into(),
            decl,
        }
    }
}

/// Element type of an enumerated set, e.g. `COLORS = {red, green}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumeratedSetType {
    pub id: NominalId,
    pub name: String,
    pub literals: Vec<String>,
}

impl EnumeratedSetType {
    pub fn new(id: NominalId, name: impl Into<String>, literals: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            literals,
        }
    }
}

/// Element type of a deferred (given) set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeferredSetType {
    pub id: NominalId,
    pub name: String,
}

impl DeferredSetType {
    pub fn new(id: NominalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A record type. Field order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordType {
    pub fields: Vec<(String, Type)>,
}

impl RecordType {
    pub fn new(fields: Vec<(String, Type)>) -> Self {
        Self { fields }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Looks up the type of a field by name.
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }

    /// True when both records declare the same field names in the same order.
    pub fn same_shape(&self, other: &RecordType) -> bool {
        self.fields.len() == other.fields.len() && self.names().eq(other.names())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Untyped(TypeVar),
    Integer,
    Bool,
    String,
    Real,
    Set(Box<Type>),
    Couple(Box<Type>, Box<Type>),
    Record(RecordType),
    EnumeratedSetElement(EnumeratedSetType),
    DeferredSetElement(DeferredSetType),
    /// Either `Integer` or `Set(T)`: the type of an undecided binary `-`.
    SetOrInteger(Box<Type>),
    /// Either `Integer` or `Set(Couple(L, R))`: the type of an undecided `*`.
    IntegerOrPairs(Box<Type>, Box<Type>),
}

impl Type {
    pub fn set(inner: Type) -> Type {
        Type::Set(Box::new(inner))
    }

    pub fn couple(left: Type, right: Type) -> Type {
        Type::Couple(Box::new(left), Box::new(right))
    }

    /// `POW(left * right)`
    pub fn relation(left: Type, right: Type) -> Type {
        Type::set(Type::couple(left, right))
    }

    /// `POW(INTEGER * elem)`
    pub fn sequence(elem: Type) -> Type {
        Type::relation(Type::Integer, elem)
    }

    /// Folds `[t1, t2, t3]` into `((t1*t2)*t3)`. A single type is returned
    /// unchanged; an empty list has no couple.
    pub fn nested_couple(types: Vec<Type>) -> Option<Type> {
        types.into_iter().reduce(Type::couple)
    }

    /// True when the head of this type is a variable.
    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    /// True when no type variable or undecided alternative remains anywhere.
    pub fn is_concrete(&self) -> bool {
        match self {
            Type::Untyped(_) | Type::SetOrInteger(_) | Type::IntegerOrPairs(_, _) => false,
            Type::Integer
            | Type::Bool
            | Type::String
            | Type::Real
            | Type::EnumeratedSetElement(_)
            | Type::DeferredSetElement(_) => true,
            Type::Set(inner) => inner.is_concrete(),
            Type::Couple(left, right) => left.is_concrete() && right.is_concrete(),
            Type::Record(record) => record.fields.iter().all(|(_, ty)| ty.is_concrete()),
        }
    }

    /// Structural equality with nominal set types compared by identity only.
    pub fn same_as(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::EnumeratedSetElement(a), Type::EnumeratedSetElement(b)) => a.id == b.id,
            (Type::DeferredSetElement(a), Type::DeferredSetElement(b)) => a.id == b.id,
            (Type::Set(a), Type::Set(b)) | (Type::SetOrInteger(a), Type::SetOrInteger(b)) => {
                a.same_as(b)
            }
            (Type::Couple(l1, r1), Type::Couple(l2, r2))
            | (Type::IntegerOrPairs(l1, r1), Type::IntegerOrPairs(l2, r2)) => {
                l1.same_as(l2) && r1.same_as(r2)
            }
            (Type::Record(a), Type::Record(b)) => {
                a.same_shape(b)
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|((_, x), (_, y))| x.same_as(y))
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Untyped(var) => write!(f, "{}", var),
            Type::Integer => write!(f, "INTEGER"),
            Type::Bool => write!(f, "BOOL"),
            Type::String => write!(f, "STRING"),
            Type::Real => write!(f, "REAL"),
            Type::Set(inner) => write!(f, "POW({})", inner),
            Type::Couple(left, right) => write!(f, "({}*{})", left, right),
            Type::Record(record) => {
                write!(f, "struct(")?;
                for (i, (name, ty)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", name, ty)?;
                }
                write!(f, ")")
            }
            Type::EnumeratedSetElement(set) => write!(f, "{}", set.name),
            Type::DeferredSetElement(set) => write!(f, "{}", set.name),
            Type::SetOrInteger(elem) => write!(f, "INTEGER|POW({})", elem),
            Type::IntegerOrPairs(left, right) => write!(f, "INTEGER|POW({}*{})", left, right),
        }
    }
}
