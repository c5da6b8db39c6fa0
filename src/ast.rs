//! # Abstract Syntax Tree (AST)
//!
//! The AST of B machines, standalone formulas and LTL formulas as they come
//! out of scoping. Identifier occurrences are already resolved: each one
//! carries the [`DeclId`] of its declaration in a [`Declarations`] arena, and
//! every occurrence of the same name shares that one declaration's type.
//!
//! Expression and predicate nodes have a type slot that is empty before
//! checking and holds a concrete [`Type`] after a successful check.
//! Substitutions and LTL nodes carry no type of their own.

use crate::span::Span;
use crate::types::Type;

/// Index of a declaration in a [`Declarations`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// A declared name: set, constant, variable, parameter or bound identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub span: Option<Span>,
    pub ty: Option<Type>,
    /// Prefix of the machine this declaration was renamed from, e.g. `m1`
    /// for `m1.x`.
    pub origin_prefix: Option<String>,
}

/// Arena holding every declaration of one machine or formula.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    decls: Vec<Declaration>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>) -> DeclId {
        self.push(Declaration {
            name: name.into(),
            span: None,
            ty: None,
            origin_prefix: None,
        })
    }

    pub fn declare_at(&mut self, name: impl Into<String>, span: Span) -> DeclId {
        let id = self.declare(name);
        self.decls[id.0 as usize].span = Some(span);
        id
    }

    /// Declares a variable renamed from an included machine.
    pub fn declare_included(
        &mut self,
        name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> DeclId {
        let id = self.declare(name);
        self.decls[id.0 as usize].origin_prefix = Some(prefix.into());
        id
    }

    fn push(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.decls.get_mut(id.0 as usize)
    }

    /// The declared type, if one has been assigned.
    pub fn ty(&self, id: DeclId) -> Option<&Type> {
        self.get(id).and_then(|decl| decl.ty.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, decl)| (DeclId(i as u32), decl))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (DeclId, &mut Declaration)> {
        self.decls
            .iter_mut()
            .enumerate()
            .map(|(i, decl)| (DeclId(i as u32), decl))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// An identifier expression referring to `id`.
    pub fn ident(&self, id: DeclId) -> Expr {
        let name = self.get(id).map(|decl| decl.name.clone()).unwrap_or_default();
        Expr::Identifier(IdentifierExpr {
            decl: id,
            name,
            span: None,
            ty: None,
        })
    }

    /// An identifier used as a boolean predicate.
    pub fn ident_predicate(&self, id: DeclId) -> Predicate {
        let name = self.get(id).map(|decl| decl.name.clone()).unwrap_or_default();
        Predicate::Identifier(IdentifierPredicate {
            decl: id,
            name,
            span: None,
            ty: None,
        })
    }
}

impl std::ops::Index<DeclId> for Declarations {
    type Output = Declaration;

    fn index(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }
}

/// Common view of the nodes that carry a type slot.
pub trait TypedNode {
    fn ty(&self) -> Option<&Type>;
    fn set_ty(&mut self, ty: Type);
    fn span(&self) -> Option<Span>;
    /// Short human readable description used in error messages.
    fn describe(&self) -> String;
}

macro_rules! typed_node {
    ($node:ty, |$this:ident| $describe:expr) => {
        impl TypedNode for $node {
            fn ty(&self) -> Option<&Type> {
                self.ty.as_ref()
            }

            fn set_ty(&mut self, ty: Type) {
                self.ty = Some(ty);
            }

            fn span(&self) -> Option<Span> {
                self.span
            }

            fn describe(&self) -> String {
                let $this = self;
                $describe
            }
        }
    };
}

typed_node!(Declaration, |this| format!("declaration `{}`", this.name));

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(IdentifierExpr),
    Number(NumberExpr),
    Real(RealExpr),
    String(StringExpr),
    Operator(OperatorExpr),
    Quantified(QuantifiedExpr),
    SetComprehension(SetComprehensionExpr),
    Lambda(LambdaExpr),
    If(IfExpr),
    Let(LetExpr),
    /// `rec(a: E, ...)`
    Record(RecordExpr),
    /// `struct(a: S, ...)`
    Struct(StructExpr),
    /// `E'field`
    FieldAccess(FieldAccessExpr),
    /// `bool(P)`
    BoolCast(BoolCastExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierExpr {
    pub decl: DeclId,
    pub name: String,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberExpr {
    pub value: i64,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

/// A real literal, kept as written.
#[derive(Debug, Clone, PartialEq)]
pub struct RealExpr {
    pub value: String,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringExpr {
    pub value: String,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorExpr {
    pub op: ExprOperator,
    pub args: Vec<Expr>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprOperator {
    // arithmetic
    Plus,
    /// Binary `-`: integer subtraction or set difference.
    Minus,
    UnaryMinus,
    /// `*`: integer multiplication or Cartesian product.
    Mult,
    Divide,
    Mod,
    PowerOf,
    Pred,
    Succ,
    Interval,
    Min,
    Max,
    MinInt,
    MaxInt,
    // built-in sets and literals
    Integer,
    Natural,
    Natural1,
    Int,
    Nat,
    Nat1,
    String,
    Bool,
    True,
    False,
    EmptySet,
    SetEnumeration,
    // sets
    SetSubtraction,
    Intersection,
    Union,
    CartesianProduct,
    GeneralizedUnion,
    GeneralizedIntersection,
    Card,
    Pow,
    Pow1,
    Fin,
    Fin1,
    // relations
    Couple,
    Domain,
    Range,
    Identity,
    Closure,
    Closure1,
    Iterate,
    Prj1,
    Prj2,
    Fnc,
    Rel,
    DirectProduct,
    ParallelProduct,
    Composition,
    DomainRestriction,
    DomainSubtraction,
    RangeRestriction,
    RangeSubtraction,
    Overwrite,
    Inverse,
    RelationalImage,
    FunctionCall,
    // relation and function spaces
    Relation,
    TotalRelation,
    SurjectionRelation,
    TotalSurjectionRelation,
    TotalFunction,
    PartialFunction,
    TotalInjection,
    PartialInjection,
    TotalSurjection,
    PartialSurjection,
    TotalBijection,
    PartialBijection,
    // sequences
    EmptySequence,
    SeqEnumeration,
    Concat,
    Conc,
    InsertFront,
    InsertTail,
    RestrictFront,
    RestrictTail,
    First,
    Last,
    Front,
    Tail,
    Rev,
    Size,
    Seq,
    Seq1,
    Iseq,
    Iseq1,
    Perm,
}

impl ExprOperator {
    pub fn name(self) -> &'static str {
        use ExprOperator::*;
        match self {
            Plus => "PLUS",
            Minus => "MINUS",
            UnaryMinus => "UNARY_MINUS",
            Mult => "MULT",
            Divide => "DIVIDE",
            Mod => "MOD",
            PowerOf => "POWER_OF",
            Pred => "PRED",
            Succ => "SUCC",
            Interval => "INTERVAL",
            Min => "MIN",
            Max => "MAX",
            MinInt => "MININT",
            MaxInt => "MAXINT",
            Integer => "INTEGER",
            Natural => "NATURAL",
            Natural1 => "NATURAL1",
            Int => "INT",
            Nat => "NAT",
            Nat1 => "NAT1",
            String => "STRING",
            Bool => "BOOL",
            True => "TRUE",
            False => "FALSE",
            EmptySet => "EMPTY_SET",
            SetEnumeration => "SET_ENUMERATION",
            SetSubtraction => "SET_SUBTRACTION",
            Intersection => "INTERSECTION",
            Union => "UNION",
            CartesianProduct => "CARTESIAN_PRODUCT",
            GeneralizedUnion => "GENERALIZED_UNION",
            GeneralizedIntersection => "GENERALIZED_INTER",
            Card => "CARD",
            Pow => "POW",
            Pow1 => "POW1",
            Fin => "FIN",
            Fin1 => "FIN1",
            Couple => "COUPLE",
            Domain => "DOMAIN",
            Range => "RANGE",
            Identity => "ID",
            Closure => "CLOSURE",
            Closure1 => "CLOSURE1",
            Iterate => "ITERATE",
            Prj1 => "PRJ1",
            Prj2 => "PRJ2",
            Fnc => "FNC",
            Rel => "REL",
            DirectProduct => "DIRECT_PRODUCT",
            ParallelProduct => "PARALLEL_PRODUCT",
            Composition => "COMPOSITION",
            DomainRestriction => "DOMAIN_RESTRICTION",
            DomainSubtraction => "DOMAIN_SUBTRACTION",
            RangeRestriction => "RANGE_RESTRICTION",
            RangeSubtraction => "RANGE_SUBTRACTION",
            Overwrite => "OVERWRITE_RELATION",
            Inverse => "INVERSE_RELATION",
            RelationalImage => "RELATIONAL_IMAGE",
            FunctionCall => "FUNCTION_CALL",
            Relation => "SET_RELATION",
            TotalRelation => "TOTAL_RELATION",
            SurjectionRelation => "SURJECTION_RELATION",
            TotalSurjectionRelation => "TOTAL_SURJECTION_RELATION",
            TotalFunction => "TOTAL_FUNCTION",
            PartialFunction => "PARTIAL_FUNCTION",
            TotalInjection => "TOTAL_INJECTION",
            PartialInjection => "PARTIAL_INJECTION",
            TotalSurjection => "TOTAL_SURJECTION",
            PartialSurjection => "PARTIAL_SURJECTION",
            TotalBijection => "TOTAL_BIJECTION",
            PartialBijection => "PARTIAL_BIJECTION",
            EmptySequence => "EMPTY_SEQUENCE",
            SeqEnumeration => "SEQ_ENUMERATION",
            Concat => "CONCAT",
            Conc => "CONC",
            InsertFront => "INSERT_FRONT",
            InsertTail => "INSERT_TAIL",
            RestrictFront => "RESTRICT_FRONT",
            RestrictTail => "RESTRICT_TAIL",
            First => "FIRST",
            Last => "LAST",
            Front => "FRONT",
            Tail => "TAIL",
            Rev => "REV",
            Size => "SIZE",
            Seq => "SEQ",
            Seq1 => "SEQ1",
            Iseq => "ISEQ",
            Iseq1 => "ISEQ1",
            Perm => "PERM",
        }
    }

    /// Operators whose type is not fixed by their operands alone; an
    /// unresolved type on one of these is reported against the operator.
    pub fn is_tracked(self) -> bool {
        matches!(
            self,
            ExprOperator::Minus
                | ExprOperator::Mult
                | ExprOperator::EmptySet
                | ExprOperator::EmptySequence
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantifiedExprOperator {
    /// `SIGMA(x).(P | E)`
    Sigma,
    /// `PI(x).(P | E)`
    Pi,
    /// `UNION(x).(P | E)`
    Union,
    /// `INTER(x).(P | E)`
    Inter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantifiedExpr {
    pub op: QuantifiedExprOperator,
    pub decls: Vec<DeclId>,
    pub predicate: Box<Predicate>,
    pub body: Box<Expr>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

/// `{x, y | P}`
#[derive(Debug, Clone, PartialEq)]
pub struct SetComprehensionExpr {
    pub decls: Vec<DeclId>,
    pub predicate: Box<Predicate>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

/// `%(x, y).(P | E)`
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub decls: Vec<DeclId>,
    pub predicate: Box<Predicate>,
    pub body: Box<Expr>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<Predicate>,
    pub then_branch: Box<Expr>,
    pub else_branch: Box<Expr>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetExpr {
    pub decls: Vec<DeclId>,
    pub predicate: Box<Predicate>,
    pub body: Box<Expr>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

/// One `name: value` entry of a record or struct. The field name is a
/// declaration so its type is shared like any other identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub decl: DeclId,
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordExpr {
    pub fields: Vec<RecordField>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructExpr {
    pub fields: Vec<RecordField>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccessExpr {
    pub record: Box<Expr>,
    pub field: String,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolCastExpr {
    pub predicate: Box<Predicate>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

typed_node!(IdentifierExpr, |this| format!("identifier `{}`", this.name));
typed_node!(NumberExpr, |this| format!("number {}", this.value));
typed_node!(RealExpr, |this| format!("real {}", this.value));
typed_node!(StringExpr, |this| format!("string \"{}\"", this.value));
typed_node!(OperatorExpr, |this| format!("operator {}", this.op.name()));
typed_node!(QuantifiedExpr, |this| format!("quantified expression {:?}", this.op));
typed_node!(SetComprehensionExpr, |_this| "set comprehension".to_string());
typed_node!(LambdaExpr, |_this| "lambda expression".to_string());
typed_node!(IfExpr, |_this| "IF expression".to_string());
typed_node!(LetExpr, |_this| "LET expression".to_string());
typed_node!(RecordExpr, |_this| "record".to_string());
typed_node!(StructExpr, |_this| "struct".to_string());
typed_node!(FieldAccessExpr, |this| format!("field access `'{}`", this.field));
typed_node!(BoolCastExpr, |_this| "bool(...)".to_string());

macro_rules! delegate_typed_node {
    ($enum:ident { $($variant:ident),* $(,)? }) => {
        impl TypedNode for $enum {
            fn ty(&self) -> Option<&Type> {
                match self { $($enum::$variant(node) => node.ty(),)* }
            }

            fn set_ty(&mut self, ty: Type) {
                match self { $($enum::$variant(node) => node.set_ty(ty),)* }
            }

            fn span(&self) -> Option<Span> {
                match self { $($enum::$variant(node) => node.span(),)* }
            }

            fn describe(&self) -> String {
                match self { $($enum::$variant(node) => node.describe(),)* }
            }
        }
    };
}

delegate_typed_node!(Expr {
    Identifier,
    Number,
    Real,
    String,
    Operator,
    Quantified,
    SetComprehension,
    Lambda,
    If,
    Let,
    Record,
    Struct,
    FieldAccess,
    BoolCast,
});

impl Expr {
    pub fn int(value: i64) -> Expr {
        Expr::Number(NumberExpr {
            value,
            span: None,
            ty: None,
        })
    }

    pub fn real(value: impl Into<String>) -> Expr {
        Expr::Real(RealExpr {
            value: value.into(),
            span: None,
            ty: None,
        })
    }

    pub fn string(value: impl Into<String>) -> Expr {
        Expr::String(StringExpr {
            value: value.into(),
            span: None,
            ty: None,
        })
    }

    pub fn op(op: ExprOperator, args: Vec<Expr>) -> Expr {
        Expr::Operator(OperatorExpr {
            op,
            args,
            span: None,
            ty: None,
        })
    }

    /// `left op right`
    pub fn binary(op: ExprOperator, left: Expr, right: Expr) -> Expr {
        Expr::op(op, vec![left, right])
    }

    /// `{a, b, ...}`
    pub fn set(elements: Vec<Expr>) -> Expr {
        Expr::op(ExprOperator::SetEnumeration, elements)
    }

    /// `[a, b, ...]`
    pub fn seq(elements: Vec<Expr>) -> Expr {
        Expr::op(ExprOperator::SeqEnumeration, elements)
    }

    /// `f(a, b, ...)`
    pub fn call(function: Expr, args: Vec<Expr>) -> Expr {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(function);
        all.extend(args);
        Expr::op(ExprOperator::FunctionCall, all)
    }

    pub fn field(record: Expr, field: impl Into<String>) -> Expr {
        Expr::FieldAccess(FieldAccessExpr {
            record: Box::new(record),
            field: field.into(),
            span: None,
            ty: None,
        })
    }

    pub fn with_span(mut self, span: Span) -> Expr {
        match &mut self {
            Expr::Identifier(node) => node.span = Some(span),
            Expr::Number(node) => node.span = Some(span),
            Expr::Real(node) => node.span = Some(span),
            Expr::String(node) => node.span = Some(span),
            Expr::Operator(node) => node.span = Some(span),
            Expr::Quantified(node) => node.span = Some(span),
            Expr::SetComprehension(node) => node.span = Some(span),
            Expr::Lambda(node) => node.span = Some(span),
            Expr::If(node) => node.span = Some(span),
            Expr::Let(node) => node.span = Some(span),
            Expr::Record(node) => node.span = Some(span),
            Expr::Struct(node) => node.span = Some(span),
            Expr::FieldAccess(node) => node.span = Some(span),
            Expr::BoolCast(node) => node.span = Some(span),
        }
        self
    }

    /// The operator of an operator node.
    pub fn operator(&self) -> Option<ExprOperator> {
        match self {
            Expr::Operator(node) => Some(node.op),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Vec<NodeMut<'_>> {
        match self {
            Expr::Identifier(_) | Expr::Number(_) | Expr::Real(_) | Expr::String(_) => Vec::new(),
            Expr::Operator(node) => node.args.iter_mut().map(NodeMut::Expr).collect(),
            Expr::Quantified(node) => vec![
                NodeMut::Predicate(&mut node.predicate),
                NodeMut::Expr(&mut node.body),
            ],
            Expr::SetComprehension(node) => vec![NodeMut::Predicate(&mut node.predicate)],
            Expr::Lambda(node) => vec![
                NodeMut::Predicate(&mut node.predicate),
                NodeMut::Expr(&mut node.body),
            ],
            Expr::If(node) => vec![
                NodeMut::Predicate(&mut node.condition),
                NodeMut::Expr(&mut node.then_branch),
                NodeMut::Expr(&mut node.else_branch),
            ],
            Expr::Let(node) => vec![
                NodeMut::Predicate(&mut node.predicate),
                NodeMut::Expr(&mut node.body),
            ],
            Expr::Record(node) => node
                .fields
                .iter_mut()
                .map(|field| NodeMut::Expr(&mut field.value))
                .collect(),
            Expr::Struct(node) => node
                .fields
                .iter_mut()
                .map(|field| NodeMut::Expr(&mut field.value))
                .collect(),
            Expr::FieldAccess(node) => vec![NodeMut::Expr(&mut node.record)],
            Expr::BoolCast(node) => vec![NodeMut::Predicate(&mut node.predicate)],
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Logical connectives over predicates.
    Connective(ConnectivePredicate),
    /// Comparisons, membership and inclusion over expressions.
    Comparison(ComparisonPredicate),
    /// A boolean identifier used as a predicate.
    Identifier(IdentifierPredicate),
    Quantified(QuantifiedPredicate),
    If(IfPredicate),
    Let(LetPredicate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    And,
    Or,
    Implication,
    Equivalence,
    Not,
    True,
    False,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    NotEqual,
    ElementOf,
    NotBelonging,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Inclusion,
    NonInclusion,
    StrictInclusion,
    StrictNonInclusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    ForAll,
    Exists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivePredicate {
    pub op: Connective,
    pub args: Vec<Predicate>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPredicate {
    pub op: Comparison,
    pub args: Vec<Expr>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierPredicate {
    pub decl: DeclId,
    pub name: String,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantifiedPredicate {
    pub quantifier: Quantifier,
    pub decls: Vec<DeclId>,
    pub predicate: Box<Predicate>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfPredicate {
    pub condition: Box<Predicate>,
    pub then_branch: Box<Predicate>,
    pub else_branch: Box<Predicate>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

/// `LET ids BE where_predicate IN body END`
#[derive(Debug, Clone, PartialEq)]
pub struct LetPredicate {
    pub decls: Vec<DeclId>,
    pub where_predicate: Box<Predicate>,
    pub body: Box<Predicate>,
    pub span: Option<Span>,
    pub ty: Option<Type>,
}

typed_node!(ConnectivePredicate, |this| format!("predicate {:?}", this.op));
typed_node!(ComparisonPredicate, |this| format!("predicate {:?}", this.op));
typed_node!(IdentifierPredicate, |this| format!("identifier `{}`", this.name));
typed_node!(QuantifiedPredicate, |this| format!("{:?} predicate", this.quantifier));
typed_node!(IfPredicate, |_this| "IF predicate".to_string());
typed_node!(LetPredicate, |_this| "LET predicate".to_string());

delegate_typed_node!(Predicate {
    Connective,
    Comparison,
    Identifier,
    Quantified,
    If,
    Let,
});

impl Predicate {
    pub fn connective(op: Connective, args: Vec<Predicate>) -> Predicate {
        Predicate::Connective(ConnectivePredicate {
            op,
            args,
            span: None,
            ty: None,
        })
    }

    pub fn and(args: Vec<Predicate>) -> Predicate {
        Predicate::connective(Connective::And, args)
    }

    pub fn truth() -> Predicate {
        Predicate::connective(Connective::True, Vec::new())
    }

    pub fn compare(op: Comparison, left: Expr, right: Expr) -> Predicate {
        Predicate::Comparison(ComparisonPredicate {
            op,
            args: vec![left, right],
            span: None,
            ty: None,
        })
    }

    pub fn equal(left: Expr, right: Expr) -> Predicate {
        Predicate::compare(Comparison::Equal, left, right)
    }

    pub fn member(element: Expr, set: Expr) -> Predicate {
        Predicate::compare(Comparison::ElementOf, element, set)
    }

    pub fn quantified(quantifier: Quantifier, decls: Vec<DeclId>, body: Predicate) -> Predicate {
        Predicate::Quantified(QuantifiedPredicate {
            quantifier,
            decls,
            predicate: Box::new(body),
            span: None,
            ty: None,
        })
    }

    pub fn with_span(mut self, span: Span) -> Predicate {
        match &mut self {
            Predicate::Connective(node) => node.span = Some(span),
            Predicate::Comparison(node) => node.span = Some(span),
            Predicate::Identifier(node) => node.span = Some(span),
            Predicate::Quantified(node) => node.span = Some(span),
            Predicate::If(node) => node.span = Some(span),
            Predicate::Let(node) => node.span = Some(span),
        }
        self
    }

    pub fn children_mut(&mut self) -> Vec<NodeMut<'_>> {
        match self {
            Predicate::Connective(node) => node.args.iter_mut().map(NodeMut::Predicate).collect(),
            Predicate::Comparison(node) => node.args.iter_mut().map(NodeMut::Expr).collect(),
            Predicate::Identifier(_) => Vec::new(),
            Predicate::Quantified(node) => vec![NodeMut::Predicate(&mut node.predicate)],
            Predicate::If(node) => vec![
                NodeMut::Predicate(&mut node.condition),
                NodeMut::Predicate(&mut node.then_branch),
                NodeMut::Predicate(&mut node.else_branch),
            ],
            Predicate::Let(node) => vec![
                NodeMut::Predicate(&mut node.where_predicate),
                NodeMut::Predicate(&mut node.body),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Substitutions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    Skip(Option<Span>),
    /// `x, y := E, F`
    Assign(AssignSubstitution),
    /// `x, y :: S`
    BecomesElementOf(BecomesElementOfSubstitution),
    /// `x, y : (P)`
    BecomesSuchThat(BecomesSuchThatSubstitution),
    /// `ANY ids WHERE P THEN S END`
    Any(AnySubstitution),
    /// `LET ids BE P IN S END`
    Let(LetSubstitution),
    /// `VAR ids IN S END`
    Var(VarSubstitution),
    /// `PRE P THEN S END` and `ASSERT P THEN S END`
    Condition(ConditionSubstitution),
    /// `IF` and `SELECT` with their `ELSIF`/`WHEN` branches
    IfOrSelect(IfOrSelectSubstitution),
    /// `CHOICE S OR T END`
    Choice(ChoiceSubstitution),
    /// `S ; T` and `S || T`
    List(ListSubstitution),
    While(WhileSubstitution),
    OperationCall(OperationCallSubstitution),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignSubstitution {
    pub targets: Vec<Expr>,
    pub values: Vec<Expr>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BecomesElementOfSubstitution {
    pub targets: Vec<Expr>,
    pub set: Expr,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BecomesSuchThatSubstitution {
    pub targets: Vec<Expr>,
    pub predicate: Predicate,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnySubstitution {
    pub decls: Vec<DeclId>,
    pub where_predicate: Predicate,
    pub body: Box<Substitution>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetSubstitution {
    pub decls: Vec<DeclId>,
    pub predicate: Predicate,
    pub body: Box<Substitution>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarSubstitution {
    pub decls: Vec<DeclId>,
    pub body: Box<Substitution>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Precondition,
    Assertion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSubstitution {
    pub kind: ConditionKind,
    pub condition: Predicate,
    pub body: Box<Substitution>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfOrSelectKind {
    If,
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfOrSelectSubstitution {
    pub kind: IfOrSelectKind,
    pub conditions: Vec<Predicate>,
    pub branches: Vec<Substitution>,
    pub else_branch: Option<Box<Substitution>>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceSubstitution {
    pub branches: Vec<Substitution>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListSubstitution {
    pub kind: ListKind,
    pub substitutions: Vec<Substitution>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileSubstitution {
    pub condition: Predicate,
    pub body: Box<Substitution>,
    pub invariant: Predicate,
    pub variant: Expr,
    pub span: Option<Span>,
}

/// Which operation an operation call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationTarget {
    /// Index into the calling machine's own operations.
    Local(usize),
    /// An operation of an included machine: indices into the calling
    /// machine's references and that machine's operations.
    Included { reference: usize, operation: usize },
}

/// `out1, out2 <-- op(arg1, arg2)`
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCallSubstitution {
    pub name: String,
    pub target: OperationTarget,
    pub args: Vec<Expr>,
    pub assigned: Vec<Expr>,
    pub span: Option<Span>,
}

impl Substitution {
    pub fn skip() -> Substitution {
        Substitution::Skip(None)
    }

    pub fn assign(targets: Vec<Expr>, values: Vec<Expr>) -> Substitution {
        Substitution::Assign(AssignSubstitution {
            targets,
            values,
            span: None,
        })
    }

    pub fn sequence(substitutions: Vec<Substitution>) -> Substitution {
        Substitution::List(ListSubstitution {
            kind: ListKind::Sequential,
            substitutions,
            span: None,
        })
    }

    pub fn parallel(substitutions: Vec<Substitution>) -> Substitution {
        Substitution::List(ListSubstitution {
            kind: ListKind::Parallel,
            substitutions,
            span: None,
        })
    }

    pub fn precondition(condition: Predicate, body: Substitution) -> Substitution {
        Substitution::Condition(ConditionSubstitution {
            kind: ConditionKind::Precondition,
            condition,
            body: Box::new(body),
            span: None,
        })
    }

    pub fn call(
        name: impl Into<String>,
        target: OperationTarget,
        args: Vec<Expr>,
        assigned: Vec<Expr>,
    ) -> Substitution {
        Substitution::OperationCall(OperationCallSubstitution {
            name: name.into(),
            target,
            args,
            assigned,
            span: None,
        })
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Substitution::Skip(span) => *span,
            Substitution::Assign(node) => node.span,
            Substitution::BecomesElementOf(node) => node.span,
            Substitution::BecomesSuchThat(node) => node.span,
            Substitution::Any(node) => node.span,
            Substitution::Let(node) => node.span,
            Substitution::Var(node) => node.span,
            Substitution::Condition(node) => node.span,
            Substitution::IfOrSelect(node) => node.span,
            Substitution::Choice(node) => node.span,
            Substitution::List(node) => node.span,
            Substitution::While(node) => node.span,
            Substitution::OperationCall(node) => node.span,
        }
    }

    pub fn children_mut(&mut self) -> Vec<NodeMut<'_>> {
        match self {
            Substitution::Skip(_) => Vec::new(),
            Substitution::Assign(node) => node
                .targets
                .iter_mut()
                .chain(node.values.iter_mut())
                .map(NodeMut::Expr)
                .collect(),
            Substitution::BecomesElementOf(node) => {
                let mut children: Vec<_> = node.targets.iter_mut().map(NodeMut::Expr).collect();
                children.push(NodeMut::Expr(&mut node.set));
                children
            }
            Substitution::BecomesSuchThat(node) => {
                let mut children: Vec<_> = node.targets.iter_mut().map(NodeMut::Expr).collect();
                children.push(NodeMut::Predicate(&mut node.predicate));
                children
            }
            Substitution::Any(node) => vec![
                NodeMut::Predicate(&mut node.where_predicate),
                NodeMut::Substitution(&mut node.body),
            ],
            Substitution::Let(node) => vec![
                NodeMut::Predicate(&mut node.predicate),
                NodeMut::Substitution(&mut node.body),
            ],
            Substitution::Var(node) => vec![NodeMut::Substitution(&mut node.body)],
            Substitution::Condition(node) => vec![
                NodeMut::Predicate(&mut node.condition),
                NodeMut::Substitution(&mut node.body),
            ],
            Substitution::IfOrSelect(node) => {
                let mut children: Vec<_> =
                    node.conditions.iter_mut().map(NodeMut::Predicate).collect();
                children.extend(node.branches.iter_mut().map(NodeMut::Substitution));
                if let Some(else_branch) = node.else_branch.as_deref_mut() {
                    children.push(NodeMut::Substitution(else_branch));
                }
                children
            }
            Substitution::Choice(node) => {
                node.branches.iter_mut().map(NodeMut::Substitution).collect()
            }
            Substitution::List(node) => node
                .substitutions
                .iter_mut()
                .map(NodeMut::Substitution)
                .collect(),
            Substitution::While(node) => vec![
                NodeMut::Predicate(&mut node.condition),
                NodeMut::Substitution(&mut node.body),
                NodeMut::Predicate(&mut node.invariant),
                NodeMut::Expr(&mut node.variant),
            ],
            Substitution::OperationCall(node) => node
                .args
                .iter_mut()
                .chain(node.assigned.iter_mut())
                .map(NodeMut::Expr)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// LTL
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum LtlNode {
    Prefix(LtlPrefix),
    Infix(LtlInfix),
    Keyword(LtlKeyword),
    /// `{P}`: a B predicate evaluated in a state.
    Predicate(Predicate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtlPrefixOperator {
    Globally,
    Finally,
    Next,
    Not,
    Historically,
    Once,
    Yesterday,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LtlPrefix {
    pub op: LtlPrefixOperator,
    pub arg: Box<LtlNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtlInfixOperator {
    And,
    Or,
    Implication,
    Until,
    WeakUntil,
    Release,
    Since,
    Trigger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LtlInfix {
    pub op: LtlInfixOperator,
    pub left: Box<LtlNode>,
    pub right: Box<LtlNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtlKeyword {
    True,
    False,
    Sink,
    Deadlock,
    Current,
}

impl LtlNode {
    pub fn prefix(op: LtlPrefixOperator, arg: LtlNode) -> LtlNode {
        LtlNode::Prefix(LtlPrefix {
            op,
            arg: Box::new(arg),
        })
    }

    pub fn infix(op: LtlInfixOperator, left: LtlNode, right: LtlNode) -> LtlNode {
        LtlNode::Infix(LtlInfix {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn children_mut(&mut self) -> Vec<NodeMut<'_>> {
        match self {
            LtlNode::Prefix(node) => vec![NodeMut::Ltl(&mut node.arg)],
            LtlNode::Infix(node) => vec![NodeMut::Ltl(&mut node.left), NodeMut::Ltl(&mut node.right)],
            LtlNode::Keyword(_) => Vec::new(),
            LtlNode::Predicate(predicate) => vec![NodeMut::Predicate(predicate)],
        }
    }
}

/// A mutable reference to any node, used by whole-tree passes.
#[derive(Debug)]
pub enum NodeMut<'a> {
    Expr(&'a mut Expr),
    Predicate(&'a mut Predicate),
    Substitution(&'a mut Substitution),
    Ltl(&'a mut LtlNode),
}

impl<'a> NodeMut<'a> {
    pub fn children(self) -> Vec<NodeMut<'a>> {
        match self {
            NodeMut::Expr(expr) => expr.children_mut(),
            NodeMut::Predicate(predicate) => predicate.children_mut(),
            NodeMut::Substitution(substitution) => substitution.children_mut(),
            NodeMut::Ltl(node) => node.children_mut(),
        }
    }
}

// ---------------------------------------------------------------------------
// Machines and formulas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct EnumeratedSet {
    pub set: DeclId,
    pub elements: Vec<DeclId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub params: Vec<DeclId>,
    pub outputs: Vec<DeclId>,
    pub body: Substitution,
    pub span: Option<Span>,
}

/// An included machine, with the prefix it was renamed under, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineReference {
    pub prefix: Option<String>,
    pub machine: Machine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub name: String,
    pub decls: Declarations,
    pub enumerated_sets: Vec<EnumeratedSet>,
    pub deferred_sets: Vec<DeclId>,
    pub constants: Vec<DeclId>,
    pub variables: Vec<DeclId>,
    /// Variables of included machines visible here under a renamed,
    /// dotted name such as `m1.x`.
    pub included_renamed_variables: Vec<DeclId>,
    pub references: Vec<MachineReference>,
    pub properties: Option<Predicate>,
    pub values: Vec<Substitution>,
    pub invariant: Option<Predicate>,
    pub assertions: Vec<Predicate>,
    pub initialisation: Option<Substitution>,
    pub operations: Vec<Operation>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decls: Declarations::new(),
            enumerated_sets: Vec::new(),
            deferred_sets: Vec::new(),
            constants: Vec::new(),
            variables: Vec::new(),
            included_renamed_variables: Vec::new(),
            references: Vec::new(),
            properties: None,
            values: Vec::new(),
            invariant: None,
            assertions: Vec::new(),
            initialisation: None,
            operations: Vec::new(),
        }
    }

    /// Declares `name = {elements...}` and returns the set's declaration.
    pub fn add_enumerated_set(&mut self, name: &str, elements: &[&str]) -> DeclId {
        let set = self.decls.declare(name);
        let elements = elements
            .iter()
            .map(|element| self.decls.declare(*element))
            .collect();
        self.enumerated_sets.push(EnumeratedSet { set, elements });
        set
    }

    pub fn add_deferred_set(&mut self, name: &str) -> DeclId {
        let id = self.decls.declare(name);
        self.deferred_sets.push(id);
        id
    }

    pub fn add_constant(&mut self, name: &str) -> DeclId {
        let id = self.decls.declare(name);
        self.constants.push(id);
        id
    }

    pub fn add_variable(&mut self, name: &str) -> DeclId {
        let id = self.decls.declare(name);
        self.variables.push(id);
        id
    }

    pub fn add_included_variable(&mut self, name: &str, prefix: &str) -> DeclId {
        let id = self.decls.declare_included(name, prefix);
        self.included_renamed_variables.push(id);
        id
    }

    /// Declares an operation's parameters and outputs and returns its index.
    pub fn add_operation(
        &mut self,
        name: &str,
        params: &[&str],
        outputs: &[&str],
        body: Substitution,
    ) -> usize {
        let params = params.iter().map(|p| self.decls.declare(*p)).collect();
        let outputs = outputs.iter().map(|o| self.decls.declare(*o)).collect();
        self.operations.push(Operation {
            name: name.to_string(),
            params,
            outputs,
            body,
            span: None,
        });
        self.operations.len() - 1
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Type of a declaration in this machine, looked up by name.
    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.decls
            .iter()
            .find(|(_, decl)| decl.name == name)
            .and_then(|(_, decl)| decl.ty.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaBody {
    Expr(Expr),
    Predicate(Predicate),
}

/// A standalone expression or predicate, with the declarations of its free
/// identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub decls: Declarations,
    /// Free identifiers implicitly declared by the formula.
    pub implicit: Vec<DeclId>,
    pub body: FormulaBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LtlFormula {
    pub decls: Declarations,
    pub implicit: Vec<DeclId>,
    pub root: LtlNode,
}
