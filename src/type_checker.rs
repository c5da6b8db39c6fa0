//! Structural type checking of B machines and formulas.
//!
//! The checker walks the AST with an expected type, unifying it with what
//! each node kind produces. Declarations start out with a fresh type
//! variable and every occurrence of an identifier unifies against that
//! variable, so constraints flow between occurrences regardless of order.
//!
//! Binary `-` and `*` stay undecided during the walk. After the walk a
//! finalizing pass resolves every slot, rejects anything still containing a
//! variable, and rewrites `-` to set subtraction and `*` to Cartesian
//! product where the resolved type is a set.

use crate::ast::*;
use crate::span::Span;
use crate::types::{DeferredSetType, EnumeratedSetType, NominalId, RecordType, Type};
use crate::unify::{UnificationError, Unifier};
use crate::visitor::{ExprVisitor, LtlVisitor, PredicateVisitor, SubstitutionVisitor};
use log::{debug, error, trace, warn};
use std::fmt;
use thiserror::Error;

/// Where an error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    pub description: String,
    pub span: Option<Span>,
}

impl NodeContext {
    pub fn new(description: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            description: description.into(),
            span,
        }
    }

    pub fn of<N: TypedNode + ?Sized>(node: &N) -> Self {
        Self::new(node.describe(), node.span())
    }
}

impl fmt::Display for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} at {}", self.description, span),
            None => write!(f, "{}", self.description),
        }
    }
}

/// What kind of thing had a type that could not be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedKind {
    Constant,
    Variable,
    IncludedVariable,
    LocalVariable,
    Operator,
    Formula,
    Expression,
}

impl fmt::Display for UnresolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnresolvedKind::Constant => "constant",
            UnresolvedKind::Variable => "variable",
            UnresolvedKind::IncludedVariable => "included variable",
            UnresolvedKind::LocalVariable => "local variable",
            UnresolvedKind::Operator => "operator",
            UnresolvedKind::Formula => "formula",
            UnresolvedKind::Expression => "expression",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        context: NodeContext,
        #[source]
        cause: UnificationError,
    },

    #[error("Can not infer the type of {what} {name}. Type variable: {ty}")]
    Unresolved {
        what: UnresolvedKind,
        name: String,
        ty: Type,
        span: Option<Span>,
    },

    #[error("Unknown field {field} in record {record}")]
    UnknownField {
        record: Type,
        field: String,
        span: Option<Span>,
    },

    #[error("Expected a record to access field {field}, found {found}")]
    ExpectedRecord {
        field: String,
        found: Type,
        span: Option<Span>,
    },

    #[error("Wrong number of arguments in {context}: expected {expected}, found {found}")]
    ArityMismatch {
        expected: usize,
        found: usize,
        context: NodeContext,
    },

    #[error("Operation {name} is not defined")]
    UndefinedOperation { name: String, span: Option<Span> },
}

impl TypeError {
    pub fn span(&self) -> Option<Span> {
        match self {
            TypeError::TypeMismatch { context, .. } | TypeError::ArityMismatch { context, .. } => {
                context.span
            }
            TypeError::Unresolved { span, .. }
            | TypeError::UnknownField { span, .. }
            | TypeError::ExpectedRecord { span, .. }
            | TypeError::UndefinedOperation { span, .. } => *span,
        }
    }
}

pub type TypeResult<T> = Result<T, TypeError>;

#[derive(Debug, Clone)]
struct Signature {
    params: Vec<DeclId>,
    outputs: Vec<DeclId>,
}

/// Type checker over one declaration arena. Use [`check_machine`],
/// [`check_formula`], [`check_expression`], [`check_predicate`] or
/// [`check_ltl_formula`] to run a complete check.
pub struct TypeChecker<'a> {
    decls: &'a mut Declarations,
    unifier: Unifier,
    operations: Vec<Signature>,
    references: &'a [MachineReference],
}

impl<'a> TypeChecker<'a> {
    pub fn new(decls: &'a mut Declarations) -> Self {
        Self {
            decls,
            unifier: Unifier::new(),
            operations: Vec::new(),
            references: &[],
        }
    }

    fn for_machine(
        decls: &'a mut Declarations,
        operations: &[Operation],
        references: &'a [MachineReference],
    ) -> Self {
        let mut checker = Self::new(decls);
        checker.operations = operations
            .iter()
            .map(|op| Signature {
                params: op.params.clone(),
                outputs: op.outputs.clone(),
            })
            .collect();
        checker.references = references;
        checker
    }

    fn fresh(&mut self) -> Type {
        self.unifier.fresh()
    }

    /// Unifies the expected type with the type the node produces and stores
    /// the result in the node's slot.
    fn unify<N: TypedNode + ?Sized>(
        &mut self,
        expected: &Type,
        found: &Type,
        node: &mut N,
    ) -> TypeResult<Type> {
        match self.unifier.unify(expected, found) {
            Ok(ty) => {
                node.set_ty(ty.clone());
                Ok(ty)
            }
            Err(cause) => Err(TypeError::TypeMismatch {
                expected: self.unifier.resolve(expected),
                found: self.unifier.resolve(found),
                context: NodeContext::of(node),
                cause,
            }),
        }
    }

    /// The type of a declaration, seeding a fresh variable if it has none.
    fn declaration_type(&mut self, id: DeclId) -> Option<Type> {
        let unifier = &mut self.unifier;
        let decl = self.decls.get_mut(id)?;
        Some(decl.ty.get_or_insert_with(|| unifier.fresh()).clone())
    }

    fn declare_locals(&mut self, ids: &[DeclId]) {
        for &id in ids {
            self.declaration_type(id);
        }
    }

    /// Gives each declaration a fresh variable, dropping whatever an earlier
    /// check left behind.
    fn reset_locals(&mut self, ids: &[DeclId]) {
        for &id in ids {
            let fresh = self.fresh();
            if let Some(decl) = self.decls.get_mut(id) {
                decl.ty = Some(fresh);
            }
        }
    }

    /// Nested couple of the types of bound identifiers, e.g. for `{x, y | P}`.
    fn bound_tuple<N: TypedNode + ?Sized>(&mut self, ids: &[DeclId], node: &N) -> TypeResult<Type> {
        let types = ids
            .iter()
            .filter_map(|&id| self.declaration_type(id))
            .collect();
        Type::nested_couple(types).ok_or_else(|| TypeError::ArityMismatch {
            expected: 1,
            found: 0,
            context: NodeContext::of(node),
        })
    }

    fn visit_all(&mut self, args: &mut [Expr], expected: &Type) -> TypeResult<()> {
        for arg in args {
            self.visit_expr(arg, expected.clone())?;
        }
        Ok(())
    }

    /// Fails on the first declaration whose type still contains a variable.
    fn require_resolved(&self, ids: &[DeclId], what: UnresolvedKind) -> TypeResult<()> {
        for &id in ids {
            let Some(decl) = self.decls.get(id) else {
                continue;
            };
            let ty = match &decl.ty {
                Some(ty) => self.unifier.resolve(ty),
                None => continue,
            };
            if !ty.is_concrete() {
                return Err(TypeError::Unresolved {
                    what,
                    name: decl.name.clone(),
                    ty,
                    span: decl.span,
                });
            }
        }
        Ok(())
    }

    /// Copies the types of renamed variables (`m1.x`) from the machines they
    /// were included from.
    fn propagate_renamed_variables(&mut self, renamed: &[DeclId]) {
        let references = self.references;
        for reference in references {
            let source = &reference.machine;
            match &reference.prefix {
                Some(prefix) => {
                    let dotted = format!("{}.", prefix);
                    for &id in renamed {
                        let Some(decl) = self.decls.get(id) else {
                            continue;
                        };
                        if let Some(local) = decl.name.strip_prefix(&dotted) {
                            let found = source
                                .variables
                                .iter()
                                .filter_map(|&var| source.decls.get(var))
                                .filter(|other| other.name == local)
                                .last()
                                .and_then(|other| other.ty.clone())
                                .filter(Type::is_concrete);
                            if let Some(ty) = found {
                                self.adopt(id, ty);
                            }
                        }
                        self.adopt_from_same_prefix(id, renamed);
                    }
                }
                None => {
                    for &id in renamed {
                        let Some(name) = self.decls.get(id).map(|decl| decl.name.clone()) else {
                            continue;
                        };
                        let found = source
                            .included_renamed_variables
                            .iter()
                            .filter_map(|&var| source.decls.get(var))
                            .filter(|other| other.name == name)
                            .last()
                            .and_then(|other| other.ty.clone())
                            .filter(Type::is_concrete);
                        if let Some(ty) = found {
                            self.adopt(id, ty);
                        }
                    }
                }
            }
        }
    }

    /// Takes the type of another renamed variable with the same name that
    /// comes from the same included machine.
    fn adopt_from_same_prefix(&mut self, id: DeclId, renamed: &[DeclId]) {
        let Some(decl) = self.decls.get(id) else {
            return;
        };
        let Some(prefix) = decl.origin_prefix.clone() else {
            return;
        };
        if !decl.name.starts_with(&prefix) {
            return;
        }
        let name = decl.name.clone();
        let found = renamed
            .iter()
            .filter(|&&other| other != id)
            .filter_map(|&other| self.decls.get(other))
            .filter(|other| other.name == name)
            .filter_map(|other| other.ty.clone())
            .last();
        if let Some(ty) = found {
            self.adopt(id, ty);
        }
    }

    fn adopt(&mut self, id: DeclId, ty: Type) {
        if let Some(decl) = self.decls.get_mut(id) {
            trace!("renamed variable {} takes type {}", decl.name, ty);
            decl.ty = Some(ty);
        }
    }

    /// The parameter and output types of the called operation.
    fn signature_types(
        &mut self,
        node: &OperationCallSubstitution,
    ) -> TypeResult<(Vec<Type>, Vec<Type>)> {
        let undefined = || TypeError::UndefinedOperation {
            name: node.name.clone(),
            span: node.span,
        };
        match node.target {
            OperationTarget::Local(index) => {
                let signature = self.operations.get(index).cloned().ok_or_else(undefined)?;
                let params = signature
                    .params
                    .iter()
                    .filter_map(|&id| self.declaration_type(id))
                    .collect();
                let outputs = signature
                    .outputs
                    .iter()
                    .filter_map(|&id| self.declaration_type(id))
                    .collect();
                Ok((params, outputs))
            }
            OperationTarget::Included {
                reference,
                operation,
            } => {
                let references = self.references;
                let machine = &references.get(reference).ok_or_else(undefined)?.machine;
                let called = machine.operations.get(operation).ok_or_else(undefined)?;
                let params = called
                    .params
                    .iter()
                    .map(|&id| self.included_type(machine, id))
                    .collect();
                let outputs = called
                    .outputs
                    .iter()
                    .map(|&id| self.included_type(machine, id))
                    .collect();
                Ok((params, outputs))
            }
        }
    }

    /// Type of a declaration in an included machine. Anything not already
    /// checked there is left unconstrained.
    fn included_type(&mut self, machine: &Machine, id: DeclId) -> Type {
        match machine.decls.ty(id) {
            Some(ty) if ty.is_concrete() => ty.clone(),
            _ => self.fresh(),
        }
    }

    // -----------------------------------------------------------------------
    // Finalizing
    // -----------------------------------------------------------------------

    /// Resolves every node slot reachable from `roots` and every
    /// declaration. An undecided operator is reported before an untyped
    /// declaration, and both before any other untyped node.
    fn finalize(&mut self, roots: Vec<NodeMut<'_>>) -> TypeResult<()> {
        let mut failures = Failures::default();
        for root in roots {
            self.finalize_node(root, &mut failures);
        }
        if let Some(err) = failures.operator {
            return Err(err);
        }
        for (_, decl) in self.decls.iter_mut() {
            let Some(ty) = decl.ty.as_ref() else {
                continue;
            };
            let resolved = self.unifier.resolve(ty);
            if !resolved.is_concrete() {
                return Err(TypeError::Unresolved {
                    what: UnresolvedKind::LocalVariable,
                    name: decl.name.clone(),
                    ty: resolved,
                    span: decl.span,
                });
            }
            decl.ty = Some(resolved);
        }
        match failures.other {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn finalize_node(&mut self, node: NodeMut<'_>, failures: &mut Failures) {
        match node {
            NodeMut::Expr(expr) => {
                for child in expr.children_mut() {
                    self.finalize_node(child, failures);
                }
                if let Err(err) = self.finalize_expr(expr) {
                    failures.record(err);
                }
            }
            NodeMut::Predicate(predicate) => {
                for child in predicate.children_mut() {
                    self.finalize_node(child, failures);
                }
                if let Err(err) = self.finalize_slot(predicate, UnresolvedKind::Expression) {
                    failures.record(err);
                }
            }
            other => {
                for child in other.children() {
                    self.finalize_node(child, failures);
                }
            }
        }
    }

    fn finalize_expr(&mut self, expr: &mut Expr) -> TypeResult<()> {
        let what = match expr {
            Expr::Operator(node) if node.op.is_tracked() => UnresolvedKind::Operator,
            _ => UnresolvedKind::Expression,
        };
        self.finalize_slot(expr, what)?;
        if let Expr::Operator(node) = expr {
            let is_set = matches!(node.ty, Some(Type::Set(_)));
            match node.op {
                ExprOperator::Minus if is_set => {
                    trace!("rewriting MINUS to SET_SUBTRACTION");
                    node.op = ExprOperator::SetSubtraction;
                }
                ExprOperator::Mult if is_set => {
                    trace!("rewriting MULT to CARTESIAN_PRODUCT");
                    node.op = ExprOperator::CartesianProduct;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn finalize_slot<N: TypedNode + ?Sized>(
        &mut self,
        node: &mut N,
        what: UnresolvedKind,
    ) -> TypeResult<()> {
        let resolved = match node.ty() {
            Some(ty) => self.unifier.resolve(ty),
            None => self.fresh(),
        };
        if !resolved.is_concrete() {
            let name = match what {
                UnresolvedKind::Operator => node
                    .describe()
                    .trim_start_matches("operator ")
                    .to_string(),
                _ => node.describe(),
            };
            return Err(TypeError::Unresolved {
                what,
                name,
                ty: resolved,
                span: node.span(),
            });
        }
        node.set_ty(resolved);
        Ok(())
    }
}

/// First unresolved node errors seen while finalizing.
#[derive(Default)]
struct Failures {
    operator: Option<TypeError>,
    other: Option<TypeError>,
}

impl Failures {
    fn record(&mut self, err: TypeError) {
        let slot = match err {
            TypeError::Unresolved {
                what: UnresolvedKind::Operator,
                ..
            } => &mut self.operator,
            _ => &mut self.other,
        };
        slot.get_or_insert(err);
    }
}

/// Fixed-arity operands of an operator node, or an arity error.
fn operands<const N: usize>(node: &mut OperatorExpr) -> TypeResult<&mut [Expr; N]> {
    let context = NodeContext::of(&*node);
    let found = node.args.len();
    <&mut [Expr; N]>::try_from(node.args.as_mut_slice()).map_err(|_| TypeError::ArityMismatch {
        expected: N,
        found,
        context,
    })
}

/// Gives every enumerated and deferred set without a type its own nominal
/// element type, identified by the machine and the set's declaration.
fn seed_sets(
    machine: &str,
    decls: &mut Declarations,
    enumerated: &[EnumeratedSet],
    deferred: &[DeclId],
) {
    for set in enumerated {
        let Some(decl) = decls.get(set.set) else {
            continue;
        };
        if decl.ty.is_some() {
            continue;
        }
        let literals = set
            .elements
            .iter()
            .filter_map(|&id| decls.get(id).map(|element| element.name.clone()))
            .collect();
        let id = NominalId::new(machine, set.set.0);
        let element = Type::EnumeratedSetElement(EnumeratedSetType::new(id, decl.name.clone(), literals));
        debug!("seeding enumerated set {}", decl.name);
        if let Some(decl) = decls.get_mut(set.set) {
            decl.ty = Some(Type::set(element.clone()));
        }
        for &id in &set.elements {
            if let Some(decl) = decls.get_mut(id) {
                decl.ty = Some(element.clone());
            }
        }
    }
    for &id in deferred {
        if let Some(decl) = decls.get_mut(id) {
            if decl.ty.is_none() {
                debug!("seeding deferred set {}", decl.name);
                let element = Type::DeferredSetElement(DeferredSetType::new(
                    NominalId::new(machine, id.0),
                    decl.name.clone(),
                ));
                decl.ty = Some(Type::set(element));
            }
        }
    }
}

impl ExprVisitor for TypeChecker<'_> {
    type Error = TypeError;

    fn visit_identifier_expr(&mut self, node: &mut IdentifierExpr, expected: Type) -> TypeResult<Type> {
        let declared = match self.declaration_type(node.decl) {
            Some(ty) => ty,
            None => {
                warn!("identifier {} has no declaration", node.name);
                self.fresh()
            }
        };
        self.unify(&expected, &declared, node)
    }

    fn visit_number(&mut self, node: &mut NumberExpr, expected: Type) -> TypeResult<Type> {
        self.unify(&expected, &Type::Integer, node)
    }

    fn visit_real(&mut self, node: &mut RealExpr, expected: Type) -> TypeResult<Type> {
        self.unify(&expected, &Type::Real, node)
    }

    fn visit_string(&mut self, node: &mut StringExpr, expected: Type) -> TypeResult<Type> {
        self.unify(&expected, &Type::String, node)
    }

    fn visit_operator_expr(&mut self, node: &mut OperatorExpr, expected: Type) -> TypeResult<Type> {
        use ExprOperator::*;
        match node.op {
            Plus | Mod | Divide | PowerOf => {
                let found = self.unify(&expected, &Type::Integer, node)?;
                self.visit_all(operands::<2>(node)?, &Type::Integer)?;
                Ok(found)
            }
            UnaryMinus => {
                let found = self.unify(&expected, &Type::Integer, node)?;
                self.visit_all(operands::<1>(node)?, &Type::Integer)?;
                Ok(found)
            }
            Pred | Succ => {
                let found = self.unify(&expected, &Type::Integer, node)?;
                self.visit_all(operands::<1>(node)?, &Type::Integer)?;
                Ok(found)
            }
            Mult => {
                let (left_elem, right_elem) = (self.fresh(), self.fresh());
                let product = self
                    .unifier
                    .integer_or_pairs(left_elem.clone(), right_elem.clone());
                let found = self.unify(&expected, &product, node)?;
                let left = self.unifier.set_or_integer(left_elem.clone());
                let right = self.unifier.set_or_integer(right_elem.clone());
                if let Err(cause) = self.unifier.link_product(
                    found.clone(),
                    left.clone(),
                    right.clone(),
                    left_elem,
                    right_elem,
                ) {
                    return Err(TypeError::TypeMismatch {
                        expected: self.unifier.resolve(&expected),
                        found: self.unifier.resolve(&product),
                        context: NodeContext::of(&*node),
                        cause,
                    });
                }
                let [l, r] = operands::<2>(node)?;
                self.visit_expr(l, left)?;
                self.visit_expr(r, right)?;
                Ok(found)
            }
            Minus => {
                let elem = self.fresh();
                let ambiguous = self.unifier.set_or_integer(elem);
                let found = self.unify(&expected, &ambiguous, node)?;
                self.visit_all(operands::<2>(node)?, &found)?;
                Ok(found)
            }
            Interval => {
                let found = self.unify(&expected, &Type::set(Type::Integer), node)?;
                self.visit_all(operands::<2>(node)?, &Type::Integer)?;
                Ok(found)
            }
            SetEnumeration | SeqEnumeration => {
                let elem = self.fresh();
                let shape = if node.op == SetEnumeration {
                    Type::set(elem.clone())
                } else {
                    Type::sequence(elem.clone())
                };
                let found = self.unify(&expected, &shape, node)?;
                let mut running = elem;
                for arg in node.args.iter_mut() {
                    running = self.visit_expr(arg, running)?;
                }
                Ok(found)
            }
            Min | Max => {
                let found = self.unify(&expected, &Type::Integer, node)?;
                self.visit_all(operands::<1>(node)?, &Type::set(Type::Integer))?;
                Ok(found)
            }
            MinInt | MaxInt => self.unify(&expected, &Type::Integer, node),
            Integer | Natural | Natural1 | Int | Nat | Nat1 => {
                self.unify(&expected, &Type::set(Type::Integer), node)
            }
            String => self.unify(&expected, &Type::set(Type::String), node),
            Bool => self.unify(&expected, &Type::set(Type::Bool), node),
            True | False => self.unify(&expected, &Type::Bool, node),
            SetSubtraction | Intersection | Union => {
                let elem = self.fresh();
                let found = self.unify(&expected, &Type::set(elem), node)?;
                self.visit_all(operands::<2>(node)?, &found)?;
                Ok(found)
            }
            Couple => {
                let [l, r] = operands::<2>(node)?;
                let left = {
                    let fresh = self.fresh();
                    self.visit_expr(l, fresh)?
                };
                let right = {
                    let fresh = self.fresh();
                    self.visit_expr(r, fresh)?
                };
                self.unify(&expected, &Type::couple(left, right), node)
            }
            Domain => {
                let (a, b) = (self.fresh(), self.fresh());
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::relation(a.clone(), b))?;
                self.unify(&expected, &Type::set(a), node)
            }
            Range => {
                let (a, b) = (self.fresh(), self.fresh());
                let found = self.unify(&expected, &Type::set(b.clone()), node)?;
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::relation(a, b))?;
                Ok(found)
            }
            Identity => {
                let t = self.fresh();
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::set(t.clone()))?;
                self.unify(&expected, &Type::relation(t.clone(), t), node)
            }
            Closure | Closure1 => {
                let relation = Type::relation(self.fresh(), self.fresh());
                let found = self.unify(&expected, &relation, node)?;
                self.visit_all(operands::<1>(node)?, &found)?;
                Ok(found)
            }
            Iterate => {
                let relation = Type::relation(self.fresh(), self.fresh());
                let found = self.unify(&expected, &relation, node)?;
                let [relation, count] = operands::<2>(node)?;
                self.visit_expr(relation, found.clone())?;
                self.visit_expr(count, Type::Integer)?;
                Ok(found)
            }
            Prj1 | Prj2 => {
                let (a, b) = (self.fresh(), self.fresh());
                let projected = if node.op == Prj1 { a.clone() } else { b.clone() };
                let shape = Type::relation(Type::couple(a.clone(), b.clone()), projected);
                let found = self.unify(&expected, &shape, node)?;
                let [s, t] = operands::<2>(node)?;
                self.visit_expr(s, Type::set(a))?;
                self.visit_expr(t, Type::set(b))?;
                Ok(found)
            }
            Fnc => {
                let (a, b) = (self.fresh(), self.fresh());
                let found = self.unify(&expected, &Type::relation(a.clone(), Type::set(b.clone())), node)?;
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::relation(a, b))?;
                Ok(found)
            }
            Rel => {
                let (a, b) = (self.fresh(), self.fresh());
                let found = self.unify(&expected, &Type::relation(a.clone(), b.clone()), node)?;
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::relation(a, Type::set(b)))?;
                Ok(found)
            }
            Concat => {
                let sequence = Type::sequence(self.fresh());
                let found = self.unify(&expected, &sequence, node)?;
                self.visit_all(operands::<2>(node)?, &found)?;
                Ok(found)
            }
            Conc => {
                let sequence = Type::sequence(self.fresh());
                let found = self.unify(&expected, &sequence, node)?;
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::sequence(found.clone()))?;
                Ok(found)
            }
            CartesianProduct => {
                let (a, b) = (self.fresh(), self.fresh());
                let found = self.unify(&expected, &Type::relation(a.clone(), b.clone()), node)?;
                let [l, r] = operands::<2>(node)?;
                self.visit_expr(l, Type::set(a))?;
                self.visit_expr(r, Type::set(b))?;
                Ok(found)
            }
            DirectProduct => {
                let (t, u, v) = (self.fresh(), self.fresh(), self.fresh());
                let shape = Type::relation(t.clone(), Type::couple(u.clone(), v.clone()));
                let found = self.unify(&expected, &shape, node)?;
                let [l, r] = operands::<2>(node)?;
                self.visit_expr(l, Type::relation(t.clone(), u))?;
                self.visit_expr(r, Type::relation(t, v))?;
                Ok(found)
            }
            ParallelProduct => {
                let (a, b, v, w) = (self.fresh(), self.fresh(), self.fresh(), self.fresh());
                let shape = Type::relation(
                    Type::couple(a.clone(), v.clone()),
                    Type::couple(b.clone(), w.clone()),
                );
                let found = self.unify(&expected, &shape, node)?;
                let [l, r] = operands::<2>(node)?;
                self.visit_expr(l, Type::relation(a, b))?;
                self.visit_expr(r, Type::relation(v, w))?;
                Ok(found)
            }
            Composition => {
                let (a, b, c, d) = (self.fresh(), self.fresh(), self.fresh(), self.fresh());
                let [l, r] = operands::<2>(node)?;
                self.visit_expr(l, Type::relation(a.clone(), b))?;
                self.visit_expr(r, Type::relation(c, d.clone()))?;
                self.unify(&expected, &Type::relation(a, d), node)
            }
            DomainRestriction | DomainSubtraction => {
                let (a, b) = (self.fresh(), self.fresh());
                let found = self.unify(&expected, &Type::relation(a.clone(), b), node)?;
                let [set, relation] = operands::<2>(node)?;
                self.visit_expr(relation, found.clone())?;
                self.visit_expr(set, Type::set(a))?;
                Ok(found)
            }
            RangeRestriction | RangeSubtraction => {
                let (a, b) = (self.fresh(), self.fresh());
                let found = self.unify(&expected, &Type::relation(a, b.clone()), node)?;
                let [relation, set] = operands::<2>(node)?;
                self.visit_expr(relation, found.clone())?;
                self.visit_expr(set, Type::set(b))?;
                Ok(found)
            }
            InsertFront => {
                let t = self.fresh();
                let found = self.unify(&expected, &Type::sequence(t.clone()), node)?;
                let [element, sequence] = operands::<2>(node)?;
                self.visit_expr(sequence, found.clone())?;
                self.visit_expr(element, t)?;
                Ok(found)
            }
            InsertTail => {
                let t = self.fresh();
                let found = self.unify(&expected, &Type::sequence(t.clone()), node)?;
                let [sequence, element] = operands::<2>(node)?;
                self.visit_expr(sequence, found.clone())?;
                self.visit_expr(element, t)?;
                Ok(found)
            }
            Overwrite => {
                let relation = Type::relation(self.fresh(), self.fresh());
                let found = self.unify(&expected, &relation, node)?;
                self.visit_all(operands::<2>(node)?, &found)?;
                Ok(found)
            }
            Inverse => {
                let (a, b) = (self.fresh(), self.fresh());
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::relation(a.clone(), b.clone()))?;
                self.unify(&expected, &Type::relation(b, a), node)
            }
            RestrictFront | RestrictTail => {
                let sequence = Type::sequence(self.fresh());
                let found = self.unify(&expected, &sequence, node)?;
                let [sequence, count] = operands::<2>(node)?;
                self.visit_expr(sequence, found.clone())?;
                self.visit_expr(count, Type::Integer)?;
                Ok(found)
            }
            GeneralizedUnion | GeneralizedIntersection => {
                let set = Type::set(self.fresh());
                let found = self.unify(&expected, &set, node)?;
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::set(found.clone()))?;
                Ok(found)
            }
            EmptySequence => {
                let sequence = Type::sequence(self.fresh());
                self.unify(&expected, &sequence, node)
            }
            EmptySet => {
                let set = Type::set(self.fresh());
                self.unify(&expected, &set, node)
            }
            First | Last => {
                let t = self.fresh();
                let [arg] = operands::<1>(node)?;
                self.visit_expr(arg, Type::sequence(t.clone()))?;
                self.unify(&expected, &t, node)
            }
            Front | Tail | Rev => {
                let sequence = Type::sequence(self.fresh());
                let found = self.unify(&expected, &sequence, node)?;
                self.visit_all(operands::<1>(node)?, &found)?;
                Ok(found)
            }
            Seq | Seq1 | Iseq | Iseq1 | Perm => {
                let t = self.fresh();
                let found = self.unify(&expected, &Type::set(Type::sequence(t.clone())), node)?;
                self.visit_all(operands::<1>(node)?, &Type::set(t))?;
                Ok(found)
            }
            FunctionCall => {
                if node.args.len() < 2 {
                    return Err(TypeError::ArityMismatch {
                        expected: 2,
                        found: node.args.len(),
                        context: NodeContext::of(&*node),
                    });
                }
                let context = NodeContext::of(&*node);
                let result = self.fresh();
                if let Some((function, arguments)) = node.args.split_first_mut() {
                    let mut types = Vec::with_capacity(arguments.len());
                    for argument in arguments.iter_mut() {
                        let fresh = self.fresh();
                        types.push(self.visit_expr(argument, fresh)?);
                    }
                    let domain = Type::nested_couple(types).ok_or(TypeError::ArityMismatch {
                        expected: 2,
                        found: 1,
                        context,
                    })?;
                    self.visit_expr(function, Type::relation(domain, result.clone()))?;
                }
                self.unify(&expected, &result, node)
            }
            RelationalImage => {
                let (a, b) = (self.fresh(), self.fresh());
                let [relation, set] = operands::<2>(node)?;
                self.visit_expr(relation, Type::relation(a.clone(), b.clone()))?;
                self.visit_expr(set, Type::set(a))?;
                self.unify(&expected, &Type::set(b), node)
            }
            Size | Card => {
                let set = Type::set(self.fresh());
                self.visit_all(operands::<1>(node)?, &set)?;
                self.unify(&expected, &Type::Integer, node)
            }
            Relation
            | TotalRelation
            | SurjectionRelation
            | TotalSurjectionRelation
            | TotalFunction
            | PartialFunction
            | TotalInjection
            | PartialInjection
            | TotalSurjection
            | PartialSurjection
            | TotalBijection
            | PartialBijection => {
                let (a, b) = (self.fresh(), self.fresh());
                let shape = Type::set(Type::relation(a.clone(), b.clone()));
                let found = self.unify(&expected, &shape, node)?;
                let [domain, range] = operands::<2>(node)?;
                self.visit_expr(domain, Type::set(a))?;
                self.visit_expr(range, Type::set(b))?;
                Ok(found)
            }
            Fin | Fin1 | Pow | Pow1 => {
                let t = self.fresh();
                let found = self.unify(&expected, &Type::set(t.clone()), node)?;
                let mut running = t;
                for arg in operands::<1>(node)?.iter_mut() {
                    running = self.visit_expr(arg, running)?;
                }
                Ok(found)
            }
        }
    }

    fn visit_quantified_expr(&mut self, node: &mut QuantifiedExpr, expected: Type) -> TypeResult<Type> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        let shape = match node.op {
            QuantifiedExprOperator::Sigma | QuantifiedExprOperator::Pi => Type::Integer,
            QuantifiedExprOperator::Union | QuantifiedExprOperator::Inter => Type::set(self.fresh()),
        };
        let found = self.unify(&expected, &shape, node)?;
        self.visit_expr(&mut node.body, found.clone())?;
        Ok(found)
    }

    fn visit_set_comprehension(&mut self, node: &mut SetComprehensionExpr, expected: Type) -> TypeResult<Type> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        let tuple = self.bound_tuple(&node.decls, &*node)?;
        self.unify(&expected, &Type::set(tuple), node)
    }

    fn visit_lambda(&mut self, node: &mut LambdaExpr, expected: Type) -> TypeResult<Type> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        let tuple = self.bound_tuple(&node.decls, &*node)?;
        let body = {
            let fresh = self.fresh();
            self.visit_expr(&mut node.body, fresh)?
        };
        self.unify(&expected, &Type::relation(tuple, body), node)
    }

    fn visit_if_expr(&mut self, node: &mut IfExpr, expected: Type) -> TypeResult<Type> {
        self.visit_predicate(&mut node.condition, Type::Bool)?;
        let then_type = {
            let fresh = self.fresh();
            self.visit_expr(&mut node.then_branch, fresh)?
        };
        let else_type = self.visit_expr(&mut node.else_branch, then_type)?;
        self.unify(&expected, &else_type, node)
    }

    fn visit_let_expr(&mut self, node: &mut LetExpr, expected: Type) -> TypeResult<Type> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        let body = {
            let fresh = self.fresh();
            self.visit_expr(&mut node.body, fresh)?
        };
        self.unify(&expected, &body, node)
    }

    fn visit_record(&mut self, node: &mut RecordExpr, expected: Type) -> TypeResult<Type> {
        let mut fields = Vec::with_capacity(node.fields.len());
        for field in node.fields.iter_mut() {
            let declared = match self.declaration_type(field.decl) {
                Some(ty) => ty,
                None => self.fresh(),
            };
            let ty = self.visit_expr(&mut field.value, declared)?;
            fields.push((field.name.clone(), ty));
        }
        self.unify(&expected, &Type::Record(RecordType::new(fields)), node)
    }

    fn visit_struct(&mut self, node: &mut StructExpr, expected: Type) -> TypeResult<Type> {
        let mut fields = Vec::with_capacity(node.fields.len());
        for field in node.fields.iter_mut() {
            let declared = match self.declaration_type(field.decl) {
                Some(ty) => ty,
                None => self.fresh(),
            };
            self.visit_expr(&mut field.value, Type::set(declared.clone()))?;
            fields.push((field.name.clone(), declared));
        }
        let record = Type::Record(RecordType::new(fields));
        self.unify(&expected, &Type::set(record), node)
    }

    fn visit_field_access(&mut self, node: &mut FieldAccessExpr, expected: Type) -> TypeResult<Type> {
        let record = {
            let fresh = self.fresh();
            self.visit_expr(&mut node.record, fresh)?
        };
        match self.unifier.head(&record) {
            Type::Record(fields) => match fields.field(&node.field) {
                Some(ty) => {
                    let ty = ty.clone();
                    self.unify(&expected, &ty, node)
                }
                None => Err(TypeError::UnknownField {
                    record: self.unifier.resolve(&record),
                    field: node.field.clone(),
                    span: node.span,
                }),
            },
            other => Err(TypeError::ExpectedRecord {
                field: node.field.clone(),
                found: self.unifier.resolve(&other),
                span: node.span,
            }),
        }
    }

    fn visit_bool_cast(&mut self, node: &mut BoolCastExpr, expected: Type) -> TypeResult<Type> {
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        self.unify(&expected, &Type::Bool, node)
    }
}

impl PredicateVisitor for TypeChecker<'_> {
    type Error = TypeError;

    fn visit_connective(&mut self, node: &mut ConnectivePredicate, expected: Type) -> TypeResult<Type> {
        let found = self.unify(&expected, &Type::Bool, node)?;
        for arg in node.args.iter_mut() {
            self.visit_predicate(arg, Type::Bool)?;
        }
        Ok(found)
    }

    fn visit_comparison(&mut self, node: &mut ComparisonPredicate, expected: Type) -> TypeResult<Type> {
        let found = self.unify(&expected, &Type::Bool, node)?;
        let context = NodeContext::of(&*node);
        let count = node.args.len();
        let [left, right] = <&mut [Expr; 2]>::try_from(node.args.as_mut_slice()).map_err(|_| {
            TypeError::ArityMismatch {
                expected: 2,
                found: count,
                context,
            }
        })?;
        match node.op {
            Comparison::Equal | Comparison::NotEqual => {
                let fresh = self.fresh();
                let right_type = self.visit_expr(right, fresh)?;
                self.visit_expr(left, right_type)?;
            }
            Comparison::ElementOf | Comparison::NotBelonging => {
                let fresh = self.fresh();
                let element = self.visit_expr(left, fresh)?;
                self.visit_expr(right, Type::set(element))?;
            }
            Comparison::Less
            | Comparison::LessEqual
            | Comparison::Greater
            | Comparison::GreaterEqual => {
                self.visit_expr(left, Type::Integer)?;
                self.visit_expr(right, Type::Integer)?;
            }
            Comparison::Inclusion
            | Comparison::NonInclusion
            | Comparison::StrictInclusion
            | Comparison::StrictNonInclusion => {
                let set = Type::set(self.fresh());
                let left_type = self.visit_expr(left, set)?;
                self.visit_expr(right, left_type)?;
            }
        }
        Ok(found)
    }

    fn visit_identifier_predicate(&mut self, node: &mut IdentifierPredicate, expected: Type) -> TypeResult<Type> {
        let declared = match self.declaration_type(node.decl) {
            Some(ty) => ty,
            None => {
                warn!("identifier {} has no declaration", node.name);
                self.fresh()
            }
        };
        self.unify(&expected, &declared, node)
    }

    fn visit_quantified_predicate(&mut self, node: &mut QuantifiedPredicate, expected: Type) -> TypeResult<Type> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        self.unify(&expected, &Type::Bool, node)
    }

    fn visit_if_predicate(&mut self, node: &mut IfPredicate, expected: Type) -> TypeResult<Type> {
        self.visit_predicate(&mut node.condition, Type::Bool)?;
        self.visit_predicate(&mut node.then_branch, Type::Bool)?;
        self.visit_predicate(&mut node.else_branch, Type::Bool)?;
        self.unify(&expected, &Type::Bool, node)
    }

    fn visit_let_predicate(&mut self, node: &mut LetPredicate, expected: Type) -> TypeResult<Type> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.where_predicate, Type::Bool)?;
        self.visit_predicate(&mut node.body, Type::Bool)?;
        self.unify(&expected, &Type::Bool, node)
    }
}

impl SubstitutionVisitor for TypeChecker<'_> {
    type Error = TypeError;

    fn visit_assign(&mut self, node: &mut AssignSubstitution) -> TypeResult<()> {
        if node.targets.len() != node.values.len() {
            return Err(TypeError::ArityMismatch {
                expected: node.targets.len(),
                found: node.values.len(),
                context: NodeContext::new("assignment", node.span),
            });
        }
        for (target, value) in node.targets.iter_mut().zip(node.values.iter_mut()) {
            let fresh = self.fresh();
            let target_type = self.visit_expr(target, fresh)?;
            self.visit_expr(value, target_type)?;
        }
        Ok(())
    }

    fn visit_becomes_element_of(&mut self, node: &mut BecomesElementOfSubstitution) -> TypeResult<()> {
        let mut types = Vec::with_capacity(node.targets.len());
        for target in node.targets.iter_mut() {
            let fresh = self.fresh();
            types.push(self.visit_expr(target, fresh)?);
        }
        let tuple = Type::nested_couple(types).ok_or_else(|| TypeError::ArityMismatch {
            expected: 1,
            found: 0,
            context: NodeContext::new("becomes element of", node.span),
        })?;
        self.visit_expr(&mut node.set, Type::set(tuple))?;
        Ok(())
    }

    fn visit_becomes_such_that(&mut self, node: &mut BecomesSuchThatSubstitution) -> TypeResult<()> {
        for target in node.targets.iter_mut() {
            let fresh = self.fresh();
            self.visit_expr(target, fresh)?;
        }
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        Ok(())
    }

    fn visit_any(&mut self, node: &mut AnySubstitution) -> TypeResult<()> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.where_predicate, Type::Bool)?;
        self.visit_substitution(&mut node.body)
    }

    fn visit_let_substitution(&mut self, node: &mut LetSubstitution) -> TypeResult<()> {
        self.declare_locals(&node.decls);
        self.visit_predicate(&mut node.predicate, Type::Bool)?;
        self.visit_substitution(&mut node.body)
    }

    fn visit_var(&mut self, node: &mut VarSubstitution) -> TypeResult<()> {
        self.declare_locals(&node.decls);
        self.visit_substitution(&mut node.body)
    }

    fn visit_condition(&mut self, node: &mut ConditionSubstitution) -> TypeResult<()> {
        self.visit_predicate(&mut node.condition, Type::Bool)?;
        self.visit_substitution(&mut node.body)
    }

    fn visit_if_or_select(&mut self, node: &mut IfOrSelectSubstitution) -> TypeResult<()> {
        for condition in node.conditions.iter_mut() {
            self.visit_predicate(condition, Type::Bool)?;
        }
        for branch in node.branches.iter_mut() {
            self.visit_substitution(branch)?;
        }
        if let Some(else_branch) = node.else_branch.as_deref_mut() {
            self.visit_substitution(else_branch)?;
        }
        Ok(())
    }

    fn visit_choice(&mut self, node: &mut ChoiceSubstitution) -> TypeResult<()> {
        for branch in node.branches.iter_mut() {
            self.visit_substitution(branch)?;
        }
        Ok(())
    }

    fn visit_list(&mut self, node: &mut ListSubstitution) -> TypeResult<()> {
        for substitution in node.substitutions.iter_mut() {
            self.visit_substitution(substitution)?;
        }
        Ok(())
    }

    fn visit_while(&mut self, node: &mut WhileSubstitution) -> TypeResult<()> {
        self.visit_predicate(&mut node.condition, Type::Bool)?;
        self.visit_substitution(&mut node.body)?;
        self.visit_predicate(&mut node.invariant, Type::Bool)?;
        self.visit_expr(&mut node.variant, Type::Integer)?;
        Ok(())
    }

    fn visit_operation_call(&mut self, node: &mut OperationCallSubstitution) -> TypeResult<()> {
        let (params, outputs) = self.signature_types(node)?;
        if node.args.len() != params.len() {
            return Err(TypeError::ArityMismatch {
                expected: params.len(),
                found: node.args.len(),
                context: NodeContext::new(format!("call of operation {}", node.name), node.span),
            });
        }
        if node.assigned.len() != outputs.len() {
            return Err(TypeError::ArityMismatch {
                expected: outputs.len(),
                found: node.assigned.len(),
                context: NodeContext::new(format!("outputs of operation {}", node.name), node.span),
            });
        }
        for (arg, ty) in node.args.iter_mut().zip(params) {
            self.visit_expr(arg, ty)?;
        }
        for (assigned, ty) in node.assigned.iter_mut().zip(outputs) {
            self.visit_expr(assigned, ty)?;
        }
        Ok(())
    }
}

impl LtlVisitor for TypeChecker<'_> {
    type Error = TypeError;

    fn visit_ltl_predicate(&mut self, predicate: &mut Predicate) -> TypeResult<()> {
        self.visit_predicate(predicate, Type::Bool)?;
        Ok(())
    }
}

fn logged<T>(what: &str, result: TypeResult<T>) -> TypeResult<T> {
    if let Err(err) = &result {
        error!("type checking {} failed: {}", what, err);
    }
    result
}

/// Type checks a machine in place.
///
/// Sets are seeded first, then constants (through `PROPERTIES`), `VALUES`,
/// variables (through `INVARIANT` and `ASSERTIONS`), the initialisation and
/// the operations. Constants and variables must be fully typed at the end of
/// their phase. On success every declaration and node carries a concrete
/// type.
pub fn check_machine(machine: &mut Machine) -> TypeResult<()> {
    debug!("type checking machine {}", machine.name);
    let name = machine.name.clone();
    logged(&format!("machine {}", name), check_machine_clauses(machine))
}

fn check_machine_clauses(machine: &mut Machine) -> TypeResult<()> {
    let Machine {
        name,
        decls,
        enumerated_sets,
        deferred_sets,
        constants,
        variables,
        included_renamed_variables,
        references,
        properties,
        values,
        invariant,
        assertions,
        initialisation,
        operations,
    } = machine;

    seed_sets(name, decls, enumerated_sets, deferred_sets);
    let mut checker = TypeChecker::for_machine(decls, operations, references);

    debug!("checking constants");
    checker.declare_locals(constants);
    if let Some(properties) = properties.as_mut() {
        checker.visit_predicate(properties, Type::Bool)?;
    }
    checker.require_resolved(constants, UnresolvedKind::Constant)?;
    for value in values.iter_mut() {
        checker.visit_substitution(value)?;
    }

    debug!("checking variables");
    checker.declare_locals(variables);
    checker.declare_locals(included_renamed_variables);
    checker.propagate_renamed_variables(included_renamed_variables);
    checker.require_resolved(included_renamed_variables, UnresolvedKind::IncludedVariable)?;
    if let Some(invariant) = invariant.as_mut() {
        checker.visit_predicate(invariant, Type::Bool)?;
    }
    for assertion in assertions.iter_mut() {
        checker.visit_predicate(assertion, Type::Bool)?;
    }
    checker.require_resolved(variables, UnresolvedKind::Variable)?;

    debug!("checking initialisation and operations");
    if let Some(initialisation) = initialisation.as_mut() {
        checker.visit_substitution(initialisation)?;
    }
    for operation in operations.iter_mut() {
        checker.declare_locals(&operation.outputs);
        checker.declare_locals(&operation.params);
        checker.visit_substitution(&mut operation.body)?;
    }

    let mut roots = Vec::new();
    roots.extend(properties.as_mut().map(NodeMut::Predicate));
    roots.extend(values.iter_mut().map(NodeMut::Substitution));
    roots.extend(invariant.as_mut().map(NodeMut::Predicate));
    roots.extend(assertions.iter_mut().map(NodeMut::Predicate));
    roots.extend(initialisation.as_mut().map(NodeMut::Substitution));
    roots.extend(
        operations
            .iter_mut()
            .map(|operation| NodeMut::Substitution(&mut operation.body)),
    );
    checker.finalize(roots)
}

/// Type checks a standalone formula and returns the type of its root.
pub fn check_formula(formula: &mut Formula) -> TypeResult<Type> {
    let Formula {
        decls,
        implicit,
        body,
    } = formula;
    let mut checker = TypeChecker::new(decls);
    checker.reset_locals(implicit);
    let result = match body {
        FormulaBody::Predicate(predicate) => check_predicate_root(checker, implicit, predicate),
        FormulaBody::Expr(expr) => check_expr_root(checker, implicit, expr),
    };
    logged("formula", result)
}

/// Type checks a single expression against the declarations it refers to.
pub fn check_expression(decls: &mut Declarations, expr: &mut Expr) -> TypeResult<Type> {
    let checker = TypeChecker::new(decls);
    logged("expression", check_expr_root(checker, &[], expr))
}

/// Type checks a single predicate against the declarations it refers to.
pub fn check_predicate(decls: &mut Declarations, predicate: &mut Predicate) -> TypeResult<Type> {
    let checker = TypeChecker::new(decls);
    logged("predicate", check_predicate_root(checker, &[], predicate))
}

fn check_expr_root(mut checker: TypeChecker<'_>, implicit: &[DeclId], expr: &mut Expr) -> TypeResult<Type> {
    let fresh = checker.fresh();
    let ty = checker.visit_expr(expr, fresh)?;
    if checker.unifier.head(&ty).is_untyped() {
        return Err(TypeError::Unresolved {
            what: UnresolvedKind::Formula,
            name: expr.describe(),
            ty: checker.unifier.resolve(&ty),
            span: expr.span(),
        });
    }
    checker.require_resolved(implicit, UnresolvedKind::LocalVariable)?;
    checker.finalize(vec![NodeMut::Expr(expr)])?;
    root_type(&*expr)
}

fn check_predicate_root(
    mut checker: TypeChecker<'_>,
    implicit: &[DeclId],
    predicate: &mut Predicate,
) -> TypeResult<Type> {
    checker.visit_predicate(predicate, Type::Bool)?;
    checker.require_resolved(implicit, UnresolvedKind::LocalVariable)?;
    checker.finalize(vec![NodeMut::Predicate(predicate)])?;
    root_type(&*predicate)
}

fn root_type<N: TypedNode + ?Sized>(node: &N) -> TypeResult<Type> {
    node.ty().cloned().ok_or_else(|| TypeError::Unresolved {
        what: UnresolvedKind::Formula,
        name: node.describe(),
        ty: Type::Bool,
        span: node.span(),
    })
}

/// Type checks an LTL formula. Every B predicate inside must be boolean.
pub fn check_ltl_formula(formula: &mut LtlFormula) -> TypeResult<()> {
    let LtlFormula {
        decls,
        implicit,
        root,
    } = formula;
    let mut checker = TypeChecker::new(decls);
    checker.reset_locals(implicit);
    let result = checker
        .visit_ltl(root)
        .and_then(|()| checker.finalize(vec![NodeMut::Ltl(root)]));
    logged("LTL formula", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formula(decls: Declarations, body: Predicate) -> Formula {
        let implicit = decls.iter().map(|(id, _)| id).collect();
        Formula {
            decls,
            implicit,
            body: FormulaBody::Predicate(body),
        }
    }

    #[test]
    fn test_number_literal() {
        let mut decls = Declarations::new();
        let mut expr = Expr::int(42);
        assert_eq!(check_expression(&mut decls, &mut expr), Ok(Type::Integer));
    }

    #[test]
    fn test_minus_on_integers_stays_minus() {
        let mut decls = Declarations::new();
        let mut expr = Expr::binary(ExprOperator::Minus, Expr::int(3), Expr::int(2));
        assert_eq!(check_expression(&mut decls, &mut expr), Ok(Type::Integer));
        assert_eq!(expr.operator(), Some(ExprOperator::Minus));
    }

    #[test]
    fn test_minus_on_sets_becomes_set_subtraction() {
        let mut decls = Declarations::new();
        let mut expr = Expr::binary(
            ExprOperator::Minus,
            Expr::set(vec![Expr::int(1), Expr::int(2)]),
            Expr::set(vec![Expr::int(2)]),
        );
        assert_eq!(
            check_expression(&mut decls, &mut expr),
            Ok(Type::set(Type::Integer))
        );
        assert_eq!(expr.operator(), Some(ExprOperator::SetSubtraction));
    }

    #[test]
    fn test_mult_on_sets_becomes_cartesian_product() {
        let mut decls = Declarations::new();
        let mut expr = Expr::binary(
            ExprOperator::Mult,
            Expr::set(vec![Expr::int(1)]),
            Expr::set(vec![Expr::string("a")]),
        );
        assert_eq!(
            check_expression(&mut decls, &mut expr),
            Ok(Type::relation(Type::Integer, Type::String))
        );
        assert_eq!(expr.operator(), Some(ExprOperator::CartesianProduct));
    }

    #[test]
    fn test_unresolved_minus_names_the_operator() {
        let mut decls = Declarations::new();
        let x = decls.declare("x");
        let y = decls.declare("y");
        let z = decls.declare("z");
        let minus = Expr::binary(ExprOperator::Minus, decls.ident(x), decls.ident(y));
        let mut predicate = Predicate::equal(decls.ident(z), minus);
        let result = check_predicate(&mut decls, &mut predicate);
        assert!(matches!(
            result,
            Err(TypeError::Unresolved { what: UnresolvedKind::Operator, ref name, .. }) if name == "MINUS"
        ));
    }

    #[test]
    fn test_equal_mismatch() {
        let mut decls = Declarations::new();
        let mut predicate = Predicate::equal(Expr::int(1), Expr::string("one"));
        let result = check_predicate(&mut decls, &mut predicate);
        match result {
            Err(TypeError::TypeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, Type::String);
                assert_eq!(found, Type::Integer);
            }
            other => panic!("expected a mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_set_comprehension_of_pairs() {
        let mut decls = Declarations::new();
        let x = decls.declare("x");
        let y = decls.declare("y");
        let body = Predicate::and(vec![
            Predicate::member(decls.ident(x), Expr::op(ExprOperator::Natural, vec![])),
            Predicate::member(decls.ident(y), Expr::op(ExprOperator::Bool, vec![])),
        ]);
        let mut expr = Expr::SetComprehension(SetComprehensionExpr {
            decls: vec![x, y],
            predicate: Box::new(body),
            span: None,
            ty: None,
        });
        assert_eq!(
            check_expression(&mut decls, &mut expr),
            Ok(Type::relation(Type::Integer, Type::Bool))
        );
    }

    #[test]
    fn test_function_call_result() {
        let mut decls = Declarations::new();
        let f = decls.declare("f");
        let r = decls.declare("r");
        let body = Predicate::and(vec![
            Predicate::member(
                decls.ident(f),
                Expr::binary(
                    ExprOperator::TotalFunction,
                    Expr::op(ExprOperator::Natural, vec![]),
                    Expr::op(ExprOperator::Bool, vec![]),
                ),
            ),
            Predicate::equal(decls.ident(r), Expr::call(decls.ident(f), vec![Expr::int(1)])),
        ]);
        let mut formula = formula(decls, body);
        assert_eq!(check_formula(&mut formula), Ok(Type::Bool));
        assert_eq!(formula.decls.ty(r), Some(&Type::Bool));
        assert_eq!(
            formula.decls.ty(f),
            Some(&Type::relation(Type::Integer, Type::Bool))
        );
    }

    #[test]
    fn test_unknown_field() {
        let mut decls = Declarations::new();
        let a = decls.declare("a");
        let record = Expr::Record(RecordExpr {
            fields: vec![RecordField {
                decl: a,
                name: "a".into(),
                value: Expr::int(1),
            }],
            span: None,
            ty: None,
        });
        let mut access = Expr::field(record, "b");
        let result = check_expression(&mut decls, &mut access);
        assert!(matches!(result, Err(TypeError::UnknownField { ref field, .. }) if field == "b"));
    }

    #[test]
    fn test_arity_of_binary_operator() {
        let mut decls = Declarations::new();
        let mut expr = Expr::op(ExprOperator::Plus, vec![Expr::int(1)]);
        let result = check_expression(&mut decls, &mut expr);
        assert!(matches!(
            result,
            Err(TypeError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }
}
