//! Unification over [`Type`].
//!
//! The unifier owns a table of type variables. A variable is either bound to
//! a type or unbound, and an unbound variable may carry a pending constraint
//! that records the undecided `Integer`-or-set alternatives introduced by the
//! binary `-` and `*` operators. Binding such a variable to `Integer` or to a
//! set picks the alternative and unifies the constraint payload.
//!
//! `*` additionally links its result to its two operands: once any of the
//! three is known to be `Integer` or a set, the other two follow.

use crate::types::{RecordType, Type, TypeVar};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnificationError {
    #[error("cannot unify {left} with {right}")]
    Mismatch { left: Type, right: Type },
    #[error("type variable {var} occurs in {ty}")]
    Occurs { var: TypeVar, ty: Type },
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Any,
    SetOrInteger(Type),
    IntegerOrPairs(Type, Type),
}

#[derive(Debug, Clone, PartialEq)]
enum VarState {
    Unbound(Pending),
    Bound(Type),
}

/// Operands and result of a `*` whose meaning is not decided yet.
#[derive(Debug, Clone)]
struct ProductLink {
    result: Type,
    left: Type,
    right: Type,
    left_elem: Type,
    right_elem: Type,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Decision {
    Integer,
    Set,
}

#[derive(Debug, Default)]
pub struct Unifier {
    vars: Vec<VarState>,
    products: Vec<ProductLink>,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an unconstrained variable.
    pub fn fresh(&mut self) -> Type {
        self.allocate(Pending::Any)
    }

    /// Allocates a variable that must become `Integer` or `Set(elem)`.
    pub fn set_or_integer(&mut self, elem: Type) -> Type {
        self.allocate(Pending::SetOrInteger(elem))
    }

    /// Allocates a variable that must become `Integer` or `Set(Couple(left, right))`.
    pub fn integer_or_pairs(&mut self, left: Type, right: Type) -> Type {
        self.allocate(Pending::IntegerOrPairs(left, right))
    }

    fn allocate(&mut self, pending: Pending) -> Type {
        let var = TypeVar(self.vars.len() as u32);
        self.vars.push(VarState::Unbound(pending));
        Type::Untyped(var)
    }

    fn state(&self, var: TypeVar) -> VarState {
        self.vars
            .get(var.0 as usize)
            .cloned()
            .unwrap_or(VarState::Unbound(Pending::Any))
    }

    fn set_state(&mut self, var: TypeVar, state: VarState) {
        let index = var.0 as usize;
        if index >= self.vars.len() {
            self.vars
                .resize(index + 1, VarState::Unbound(Pending::Any));
        }
        self.vars[index] = state;
    }

    /// Follows variable bindings until the head of the type is not a bound
    /// variable.
    pub fn head(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        while let Type::Untyped(var) = current {
            match self.state(var) {
                VarState::Bound(next) => current = next,
                VarState::Unbound(_) => return Type::Untyped(var),
            }
        }
        current
    }

    /// Substitutes every bound variable, deeply. Unbound variables with a
    /// pending alternative are shown as [`Type::SetOrInteger`] or
    /// [`Type::IntegerOrPairs`].
    pub fn resolve(&self, ty: &Type) -> Type {
        match self.head(ty) {
            Type::Untyped(var) => match self.state(var) {
                VarState::Unbound(Pending::SetOrInteger(elem)) => {
                    Type::SetOrInteger(Box::new(self.resolve(&elem)))
                }
                VarState::Unbound(Pending::IntegerOrPairs(left, right)) => Type::IntegerOrPairs(
                    Box::new(self.resolve(&left)),
                    Box::new(self.resolve(&right)),
                ),
                _ => Type::Untyped(var),
            },
            Type::Set(inner) => Type::set(self.resolve(&inner)),
            Type::Couple(left, right) => Type::couple(self.resolve(&left), self.resolve(&right)),
            Type::Record(record) => Type::Record(RecordType::new(
                record
                    .fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.resolve(ty)))
                    .collect(),
            )),
            Type::SetOrInteger(elem) => Type::SetOrInteger(Box::new(self.resolve(&elem))),
            Type::IntegerOrPairs(left, right) => Type::IntegerOrPairs(
                Box::new(self.resolve(&left)),
                Box::new(self.resolve(&right)),
            ),
            other => other,
        }
    }

    /// Unifies two types and returns their common type. Pending `*` links
    /// are propagated before returning.
    pub fn unify(&mut self, left: &Type, right: &Type) -> Result<Type, UnificationError> {
        let unified = self.unify_inner(left, right)?;
        self.propagate()?;
        Ok(unified)
    }

    /// Links the result of a `*` to its operand types. `left` and `right`
    /// are the operand types, `left_elem` and `right_elem` the element types
    /// they have if they turn out to be sets.
    pub fn link_product(
        &mut self,
        result: Type,
        left: Type,
        right: Type,
        left_elem: Type,
        right_elem: Type,
    ) -> Result<(), UnificationError> {
        self.products.push(ProductLink {
            result,
            left,
            right,
            left_elem,
            right_elem,
        });
        self.propagate()
    }

    fn decision(&self, ty: &Type) -> Option<Decision> {
        match self.head(ty) {
            Type::Integer => Some(Decision::Integer),
            Type::Set(_) => Some(Decision::Set),
            _ => None,
        }
    }

    fn propagate(&mut self) -> Result<(), UnificationError> {
        loop {
            let ready = self.products.iter().position(|link| {
                [&link.result, &link.left, &link.right]
                    .into_iter()
                    .any(|ty| self.decision(ty).is_some())
            });
            let Some(index) = ready else {
                return Ok(());
            };
            let link = self.products.remove(index);
            let decision = [&link.result, &link.left, &link.right]
                .into_iter()
                .find_map(|ty| self.decision(ty))
                .unwrap_or(Decision::Integer);
            match decision {
                Decision::Integer => {
                    self.unify_inner(&link.result, &Type::Integer)?;
                    self.unify_inner(&link.left, &Type::Integer)?;
                    self.unify_inner(&link.right, &Type::Integer)?;
                }
                Decision::Set => {
                    let pairs = Type::relation(link.left_elem.clone(), link.right_elem.clone());
                    self.unify_inner(&link.result, &pairs)?;
                    self.unify_inner(&link.left, &Type::set(link.left_elem))?;
                    self.unify_inner(&link.right, &Type::set(link.right_elem))?;
                }
            }
        }
    }

    /// Turns a literal ambiguous type into an equivalent pending variable.
    fn materialize(&mut self, ty: Type) -> Type {
        match ty {
            Type::SetOrInteger(elem) => self.set_or_integer(*elem),
            Type::IntegerOrPairs(left, right) => self.integer_or_pairs(*left, *right),
            other => other,
        }
    }

    fn unify_inner(&mut self, left: &Type, right: &Type) -> Result<Type, UnificationError> {
        let left = self.head(left);
        let left = self.materialize(left);
        let right = self.head(right);
        let right = self.materialize(right);

        match (left, right) {
            (Type::Untyped(a), Type::Untyped(b)) => {
                if a == b {
                    Ok(Type::Untyped(a))
                } else {
                    self.merge(a, b)
                }
            }
            (Type::Untyped(var), other) | (other, Type::Untyped(var)) => self.bind(var, other),
            (Type::Integer, Type::Integer) => Ok(Type::Integer),
            (Type::Bool, Type::Bool) => Ok(Type::Bool),
            (Type::String, Type::String) => Ok(Type::String),
            (Type::Real, Type::Real) => Ok(Type::Real),
            (Type::Set(a), Type::Set(b)) => Ok(Type::set(self.unify_inner(&a, &b)?)),
            (Type::Couple(l1, r1), Type::Couple(l2, r2)) => {
                let left = self.unify_inner(&l1, &l2)?;
                let right = self.unify_inner(&r1, &r2)?;
                Ok(Type::couple(left, right))
            }
            (Type::Record(a), Type::Record(b)) if a.same_shape(&b) => {
                let mut fields = Vec::with_capacity(a.fields.len());
                for ((name, x), (_, y)) in a.fields.iter().zip(&b.fields) {
                    fields.push((name.clone(), self.unify_inner(x, y)?));
                }
                Ok(Type::Record(RecordType::new(fields)))
            }
            (Type::EnumeratedSetElement(a), Type::EnumeratedSetElement(b)) if a.id == b.id => {
                Ok(Type::EnumeratedSetElement(a))
            }
            (Type::DeferredSetElement(a), Type::DeferredSetElement(b)) if a.id == b.id => {
                Ok(Type::DeferredSetElement(a))
            }
            (left, right) => Err(UnificationError::Mismatch {
                left: self.resolve(&left),
                right: self.resolve(&right),
            }),
        }
    }

    fn pending(&self, var: TypeVar) -> Pending {
        match self.state(var) {
            VarState::Unbound(pending) => pending,
            VarState::Bound(_) => Pending::Any,
        }
    }

    /// Binds an unbound variable to a type whose head is not a variable.
    fn bind(&mut self, var: TypeVar, ty: Type) -> Result<Type, UnificationError> {
        if self.occurs(var, &ty) {
            return Err(UnificationError::Occurs {
                var,
                ty: self.resolve(&ty),
            });
        }
        match self.pending(var) {
            Pending::Any => {}
            Pending::SetOrInteger(elem) => match &ty {
                Type::Integer => {}
                Type::Set(inner) => {
                    self.unify_inner(&elem, inner)?;
                }
                _ => {
                    return Err(UnificationError::Mismatch {
                        left: Type::SetOrInteger(Box::new(self.resolve(&elem))),
                        right: self.resolve(&ty),
                    })
                }
            },
            Pending::IntegerOrPairs(left, right) => match &ty {
                Type::Integer => {}
                Type::Set(inner) => {
                    self.unify_inner(inner, &Type::couple(left, right))?;
                }
                _ => {
                    return Err(UnificationError::Mismatch {
                        left: Type::IntegerOrPairs(
                            Box::new(self.resolve(&left)),
                            Box::new(self.resolve(&right)),
                        ),
                        right: self.resolve(&ty),
                    })
                }
            },
        }
        self.set_state(var, VarState::Bound(ty.clone()));
        Ok(ty)
    }

    /// Merges two distinct unbound variables, combining their constraints.
    fn merge(&mut self, a: TypeVar, b: TypeVar) -> Result<Type, UnificationError> {
        let (pa, pb) = (self.pending(a), self.pending(b));
        if self.pending_mentions(a, &pb) || self.pending_mentions(b, &pa) {
            return Err(UnificationError::Occurs {
                var: a,
                ty: self.resolve(&Type::Untyped(b)),
            });
        }
        match (pa, pb) {
            (Pending::Any, _) => {
                self.set_state(a, VarState::Bound(Type::Untyped(b)));
                Ok(Type::Untyped(b))
            }
            (_, Pending::Any) => {
                self.set_state(b, VarState::Bound(Type::Untyped(a)));
                Ok(Type::Untyped(a))
            }
            (Pending::SetOrInteger(x), Pending::SetOrInteger(y)) => {
                self.set_state(a, VarState::Bound(Type::Untyped(b)));
                self.unify_inner(&x, &y)?;
                Ok(Type::Untyped(b))
            }
            (Pending::SetOrInteger(elem), Pending::IntegerOrPairs(left, right)) => {
                self.set_state(a, VarState::Bound(Type::Untyped(b)));
                self.unify_inner(&elem, &Type::couple(left, right))?;
                Ok(Type::Untyped(b))
            }
            (Pending::IntegerOrPairs(left, right), Pending::SetOrInteger(elem)) => {
                self.set_state(b, VarState::Bound(Type::Untyped(a)));
                self.unify_inner(&elem, &Type::couple(left, right))?;
                Ok(Type::Untyped(a))
            }
            (Pending::IntegerOrPairs(l1, r1), Pending::IntegerOrPairs(l2, r2)) => {
                self.set_state(a, VarState::Bound(Type::Untyped(b)));
                self.unify_inner(&l1, &l2)?;
                self.unify_inner(&r1, &r2)?;
                Ok(Type::Untyped(b))
            }
        }
    }

    fn pending_mentions(&self, var: TypeVar, pending: &Pending) -> bool {
        match pending {
            Pending::Any => false,
            Pending::SetOrInteger(elem) => self.occurs(var, elem),
            Pending::IntegerOrPairs(left, right) => {
                self.occurs(var, left) || self.occurs(var, right)
            }
        }
    }

    fn occurs(&self, var: TypeVar, ty: &Type) -> bool {
        match ty {
            Type::Untyped(other) => {
                *other == var
                    || match self.state(*other) {
                        VarState::Bound(bound) => self.occurs(var, &bound),
                        VarState::Unbound(pending) => self.pending_mentions(var, &pending),
                    }
            }
            Type::Set(inner) | Type::SetOrInteger(inner) => self.occurs(var, inner),
            Type::Couple(left, right) | Type::IntegerOrPairs(left, right) => {
                self.occurs(var, left) || self.occurs(var, right)
            }
            Type::Record(record) => record.fields.iter().any(|(_, ty)| self.occurs(var, ty)),
            _ => false,
        }
    }
}
