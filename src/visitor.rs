//! Visitor traits over the AST.
//!
//! Each node family has its own trait with one method per node kind and a
//! provided `visit_*` method that dispatches on the variant. Expression and
//! predicate visitors thread an expected [`Type`] down and return the type
//! the node ended up with.

use crate::ast::*;
use crate::types::Type;

pub trait ExprVisitor {
    type Error;

    fn visit_expr(&mut self, expr: &mut Expr, expected: Type) -> Result<Type, Self::Error> {
        match expr {
            Expr::Identifier(node) => self.visit_identifier_expr(node, expected),
            Expr::Number(node) => self.visit_number(node, expected),
            Expr::Real(node) => self.visit_real(node, expected),
            Expr::String(node) => self.visit_string(node, expected),
            Expr::Operator(node) => self.visit_operator_expr(node, expected),
            Expr::Quantified(node) => self.visit_quantified_expr(node, expected),
            Expr::SetComprehension(node) => self.visit_set_comprehension(node, expected),
            Expr::Lambda(node) => self.visit_lambda(node, expected),
            Expr::If(node) => self.visit_if_expr(node, expected),
            Expr::Let(node) => self.visit_let_expr(node, expected),
            Expr::Record(node) => self.visit_record(node, expected),
            Expr::Struct(node) => self.visit_struct(node, expected),
            Expr::FieldAccess(node) => self.visit_field_access(node, expected),
            Expr::BoolCast(node) => self.visit_bool_cast(node, expected),
        }
    }

    fn visit_identifier_expr(&mut self, node: &mut IdentifierExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_number(&mut self, node: &mut NumberExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_real(&mut self, node: &mut RealExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_string(&mut self, node: &mut StringExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_operator_expr(&mut self, node: &mut OperatorExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_quantified_expr(&mut self, node: &mut QuantifiedExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_set_comprehension(&mut self, node: &mut SetComprehensionExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_lambda(&mut self, node: &mut LambdaExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_if_expr(&mut self, node: &mut IfExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_let_expr(&mut self, node: &mut LetExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_record(&mut self, node: &mut RecordExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_struct(&mut self, node: &mut StructExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_field_access(&mut self, node: &mut FieldAccessExpr, expected: Type) -> Result<Type, Self::Error>;
    fn visit_bool_cast(&mut self, node: &mut BoolCastExpr, expected: Type) -> Result<Type, Self::Error>;
}

pub trait PredicateVisitor {
    type Error;

    fn visit_predicate(&mut self, predicate: &mut Predicate, expected: Type) -> Result<Type, Self::Error> {
        match predicate {
            Predicate::Connective(node) => self.visit_connective(node, expected),
            Predicate::Comparison(node) => self.visit_comparison(node, expected),
            Predicate::Identifier(node) => self.visit_identifier_predicate(node, expected),
            Predicate::Quantified(node) => self.visit_quantified_predicate(node, expected),
            Predicate::If(node) => self.visit_if_predicate(node, expected),
            Predicate::Let(node) => self.visit_let_predicate(node, expected),
        }
    }

    fn visit_connective(&mut self, node: &mut ConnectivePredicate, expected: Type) -> Result<Type, Self::Error>;
    fn visit_comparison(&mut self, node: &mut ComparisonPredicate, expected: Type) -> Result<Type, Self::Error>;
    fn visit_identifier_predicate(&mut self, node: &mut IdentifierPredicate, expected: Type) -> Result<Type, Self::Error>;
    fn visit_quantified_predicate(&mut self, node: &mut QuantifiedPredicate, expected: Type) -> Result<Type, Self::Error>;
    fn visit_if_predicate(&mut self, node: &mut IfPredicate, expected: Type) -> Result<Type, Self::Error>;
    fn visit_let_predicate(&mut self, node: &mut LetPredicate, expected: Type) -> Result<Type, Self::Error>;
}

pub trait SubstitutionVisitor {
    type Error;

    fn visit_substitution(&mut self, substitution: &mut Substitution) -> Result<(), Self::Error> {
        match substitution {
            Substitution::Skip(_) => Ok(()),
            Substitution::Assign(node) => self.visit_assign(node),
            Substitution::BecomesElementOf(node) => self.visit_becomes_element_of(node),
            Substitution::BecomesSuchThat(node) => self.visit_becomes_such_that(node),
            Substitution::Any(node) => self.visit_any(node),
            Substitution::Let(node) => self.visit_let_substitution(node),
            Substitution::Var(node) => self.visit_var(node),
            Substitution::Condition(node) => self.visit_condition(node),
            Substitution::IfOrSelect(node) => self.visit_if_or_select(node),
            Substitution::Choice(node) => self.visit_choice(node),
            Substitution::List(node) => self.visit_list(node),
            Substitution::While(node) => self.visit_while(node),
            Substitution::OperationCall(node) => self.visit_operation_call(node),
        }
    }

    fn visit_assign(&mut self, node: &mut AssignSubstitution) -> Result<(), Self::Error>;
    fn visit_becomes_element_of(&mut self, node: &mut BecomesElementOfSubstitution) -> Result<(), Self::Error>;
    fn visit_becomes_such_that(&mut self, node: &mut BecomesSuchThatSubstitution) -> Result<(), Self::Error>;
    fn visit_any(&mut self, node: &mut AnySubstitution) -> Result<(), Self::Error>;
    fn visit_let_substitution(&mut self, node: &mut LetSubstitution) -> Result<(), Self::Error>;
    fn visit_var(&mut self, node: &mut VarSubstitution) -> Result<(), Self::Error>;
    fn visit_condition(&mut self, node: &mut ConditionSubstitution) -> Result<(), Self::Error>;
    fn visit_if_or_select(&mut self, node: &mut IfOrSelectSubstitution) -> Result<(), Self::Error>;
    fn visit_choice(&mut self, node: &mut ChoiceSubstitution) -> Result<(), Self::Error>;
    fn visit_list(&mut self, node: &mut ListSubstitution) -> Result<(), Self::Error>;
    fn visit_while(&mut self, node: &mut WhileSubstitution) -> Result<(), Self::Error>;
    fn visit_operation_call(&mut self, node: &mut OperationCallSubstitution) -> Result<(), Self::Error>;
}

pub trait LtlVisitor {
    type Error;

    fn visit_ltl(&mut self, node: &mut LtlNode) -> Result<(), Self::Error> {
        match node {
            LtlNode::Prefix(node) => self.visit_ltl_prefix(node),
            LtlNode::Infix(node) => self.visit_ltl_infix(node),
            LtlNode::Keyword(keyword) => self.visit_ltl_keyword(*keyword),
            LtlNode::Predicate(predicate) => self.visit_ltl_predicate(predicate),
        }
    }

    fn visit_ltl_prefix(&mut self, node: &mut LtlPrefix) -> Result<(), Self::Error> {
        self.visit_ltl(&mut node.arg)
    }

    fn visit_ltl_infix(&mut self, node: &mut LtlInfix) -> Result<(), Self::Error> {
        self.visit_ltl(&mut node.left)?;
        self.visit_ltl(&mut node.right)
    }

    fn visit_ltl_keyword(&mut self, _keyword: LtlKeyword) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_ltl_predicate(&mut self, predicate: &mut Predicate) -> Result<(), Self::Error>;
}
