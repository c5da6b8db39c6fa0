use btype_checker::*;
use pretty_assertions::assert_eq;

fn set_of(values: &[i64]) -> Expr {
    Expr::set(values.iter().map(|&v| Expr::int(v)).collect())
}

fn predicate_formula(decls: Declarations, body: Predicate) -> Formula {
    let implicit = decls.iter().map(|(id, _)| id).collect();
    Formula {
        decls,
        implicit,
        body: FormulaBody::Predicate(body),
    }
}

fn expression_formula(decls: Declarations, body: Expr) -> Formula {
    let implicit = decls.iter().map(|(id, _)| id).collect();
    Formula {
        decls,
        implicit,
        body: FormulaBody::Expr(body),
    }
}

fn check(mut expr: Expr) -> (TypeResult<Type>, Expr) {
    let mut decls = Declarations::new();
    let result = check_expression(&mut decls, &mut expr);
    (result, expr)
}

#[test]
fn test_integer_minus() {
    let (result, expr) = check(Expr::binary(ExprOperator::Minus, Expr::int(3), Expr::int(2)));
    assert_eq!(result, Ok(Type::Integer));
    assert_eq!(expr.operator(), Some(ExprOperator::Minus));
}

#[test]
fn test_set_minus() {
    let (result, expr) = check(Expr::binary(ExprOperator::Minus, set_of(&[1, 2]), set_of(&[2])));
    assert_eq!(result, Ok(Type::set(Type::Integer)));
    assert_eq!(expr.operator(), Some(ExprOperator::SetSubtraction));
}

#[test]
fn test_integer_mult() {
    let (result, expr) = check(Expr::binary(ExprOperator::Mult, Expr::int(2), Expr::int(3)));
    assert_eq!(result, Ok(Type::Integer));
    assert_eq!(expr.operator(), Some(ExprOperator::Mult));
}

#[test]
fn test_cartesian_product() {
    let (result, expr) = check(Expr::binary(ExprOperator::Mult, set_of(&[1, 2]), set_of(&[3, 4])));
    assert_eq!(result, Ok(Type::relation(Type::Integer, Type::Integer)));
    assert_eq!(expr.operator(), Some(ExprOperator::CartesianProduct));
    assert_eq!(expr.ty(), Some(&Type::set(Type::couple(Type::Integer, Type::Integer))));
}

#[test]
fn test_mixed_mult_is_rejected() {
    let (result, _) = check(Expr::binary(ExprOperator::Mult, Expr::int(2), set_of(&[3])));
    assert!(matches!(result, Err(TypeError::TypeMismatch { .. })));
}

#[test]
fn test_minus_decided_by_context() {
    let mut decls = Declarations::new();
    let s = decls.declare("s");
    let t = decls.declare("t");
    let body = Predicate::and(vec![
        Predicate::equal(decls.ident(s), set_of(&[1, 2])),
        Predicate::equal(
            decls.ident(t),
            Expr::binary(ExprOperator::Minus, decls.ident(s), decls.ident(s)),
        ),
    ]);
    let mut formula = predicate_formula(decls, body);

    assert_eq!(check_formula(&mut formula), Ok(Type::Bool));
    assert_eq!(formula.decls.ty(t), Some(&Type::set(Type::Integer)));
    let FormulaBody::Predicate(Predicate::Connective(and)) = &formula.body else {
        panic!("expected a conjunction");
    };
    let Predicate::Comparison(equal) = &and.args[1] else {
        panic!("expected an equality");
    };
    assert_eq!(equal.args[1].operator(), Some(ExprOperator::SetSubtraction));
}

#[test]
fn test_union_equality() {
    let mut decls = Declarations::new();
    let mut predicate = Predicate::equal(
        Expr::binary(ExprOperator::Union, set_of(&[1, 2]), set_of(&[3])),
        set_of(&[1, 2, 3]),
    );
    assert_eq!(check_predicate(&mut decls, &mut predicate), Ok(Type::Bool));
}

#[test]
fn test_union_with_integer_operand() {
    let mut decls = Declarations::new();
    let mut predicate = Predicate::equal(
        Expr::binary(ExprOperator::Union, Expr::int(1), set_of(&[3])),
        set_of(&[1, 2, 3]),
    );
    match check_predicate(&mut decls, &mut predicate) {
        Err(TypeError::TypeMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, Type::set(Type::Integer));
            assert_eq!(found, Type::Integer);
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
}

#[test]
fn test_empty_set_alone_is_unresolved() {
    let (result, _) = check(Expr::op(ExprOperator::EmptySet, vec![]));
    assert!(matches!(result, Err(TypeError::Unresolved { .. })));
}

#[test]
fn test_recheck_rebuilt_tree() {
    let build = || Expr::binary(ExprOperator::Minus, set_of(&[5]), set_of(&[1]));
    let (first, _) = check(build());
    let (second, _) = check(build());
    assert_eq!(first, second);
    assert_eq!(first, Ok(Type::set(Type::Integer)));
}

#[test]
fn test_recheck_checked_tree() {
    let mut decls = Declarations::new();
    let mut expr = Expr::binary(ExprOperator::Minus, set_of(&[5]), set_of(&[1]));
    let first = check_expression(&mut decls, &mut expr);
    let second = check_expression(&mut decls, &mut expr);
    assert_eq!(first, second);
}

#[test]
fn test_expression_formula_with_free_identifier() {
    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let body = Expr::binary(ExprOperator::Plus, decls.ident(x), Expr::int(1));
    let mut formula = expression_formula(decls, body);

    assert_eq!(check_formula(&mut formula), Ok(Type::Integer));
    assert_eq!(formula.decls.ty(x), Some(&Type::Integer));
}

#[test]
fn test_free_identifiers_without_constraint() {
    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let y = decls.declare("y");
    let body = Predicate::equal(decls.ident(x), decls.ident(y));
    let mut formula = predicate_formula(decls, body);

    match check_formula(&mut formula) {
        Err(TypeError::Unresolved { what, name, ty, .. }) => {
            assert_eq!(what, UnresolvedKind::LocalVariable);
            assert_eq!(name, "x");
            assert!(ty.is_untyped());
        }
        other => panic!("expected an unresolved identifier, got {:?}", other),
    }
}

fn record(decls: &mut Declarations, fields: Vec<(&str, Expr)>) -> Expr {
    let fields = fields
        .into_iter()
        .map(|(name, value)| RecordField {
            decl: decls.declare(name),
            name: name.to_string(),
            value,
        })
        .collect();
    Expr::Record(RecordExpr {
        fields,
        span: None,
        ty: None,
    })
}

#[test]
fn test_record_field_access() {
    let mut decls = Declarations::new();
    let r = decls.declare("r");
    let v = decls.declare("v");
    let value = record(
        &mut decls,
        vec![
            ("a", Expr::int(1)),
            ("b", Expr::op(ExprOperator::True, vec![])),
        ],
    );
    let body = Predicate::and(vec![
        Predicate::equal(decls.ident(r), value),
        Predicate::equal(decls.ident(v), Expr::field(decls.ident(r), "b")),
    ]);
    let mut formula = Formula {
        decls,
        implicit: vec![r, v],
        body: FormulaBody::Predicate(body),
    };

    assert_eq!(check_formula(&mut formula), Ok(Type::Bool));
    assert_eq!(formula.decls.ty(v), Some(&Type::Bool));
    let expected = Type::Record(RecordType::new(vec![
        ("a".to_string(), Type::Integer),
        ("b".to_string(), Type::Bool),
    ]));
    assert_eq!(formula.decls.ty(r), Some(&expected));
    assert_eq!(expected.to_string(), "struct(a:INTEGER,b:BOOL)");
}

#[test]
fn test_record_unknown_field() {
    let mut decls = Declarations::new();
    let value = record(&mut decls, vec![("a", Expr::int(1))]);
    let mut access = Expr::field(value, "z");

    match check_expression(&mut decls, &mut access) {
        Err(TypeError::UnknownField { field, record, .. }) => {
            assert_eq!(field, "z");
            assert_eq!(record.to_string(), "struct(a:INTEGER)");
        }
        other => panic!("expected an unknown field, got {:?}", other),
    }
}

#[test]
fn test_field_access_on_integer() {
    let mut decls = Declarations::new();
    let mut access = Expr::field(Expr::int(1), "a");
    assert!(matches!(
        check_expression(&mut decls, &mut access),
        Err(TypeError::ExpectedRecord { .. })
    ));
}

#[test]
fn test_function_space_membership() {
    let mut decls = Declarations::new();
    let f = decls.declare("f");
    let body = Predicate::member(
        decls.ident(f),
        Expr::binary(
            ExprOperator::PartialFunction,
            Expr::op(ExprOperator::String, vec![]),
            Expr::op(ExprOperator::Natural, vec![]),
        ),
    );
    let mut formula = predicate_formula(decls, body);

    assert_eq!(check_formula(&mut formula), Ok(Type::Bool));
    assert_eq!(
        formula.decls.ty(f).map(ToString::to_string),
        Some("POW((STRING*INTEGER))".to_string())
    );
}

#[test]
fn test_sequence_enumeration() {
    let (result, _) = check(Expr::seq(vec![Expr::string("a"), Expr::string("b")]));
    assert_eq!(result, Ok(Type::sequence(Type::String)));
}

#[test]
fn test_mismatch_error_message() {
    let mut decls = Declarations::new();
    let mut predicate = Predicate::equal(Expr::int(1), Expr::op(ExprOperator::True, vec![]));
    let err = check_predicate(&mut decls, &mut predicate).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Type mismatch in number 1"), "{}", message);
    assert!(message.contains("expected BOOL, found INTEGER"), "{}", message);
}

fn tt() -> Expr {
    Expr::op(ExprOperator::True, vec![])
}

fn nat() -> Expr {
    Expr::op(ExprOperator::Natural, vec![])
}

fn pair(left: Expr, right: Expr) -> Expr {
    Expr::binary(ExprOperator::Couple, left, right)
}

fn unary(op: ExprOperator, arg: Expr) -> Expr {
    Expr::op(op, vec![arg])
}

/// `{(1, TRUE)}`
fn int_to_bool() -> Expr {
    Expr::set(vec![pair(Expr::int(1), tt())])
}

/// `{(TRUE, "a")}`
fn bool_to_string() -> Expr {
    Expr::set(vec![pair(tt(), Expr::string("a"))])
}

/// `[1, 2]`
fn int_sequence() -> Expr {
    Expr::seq(vec![Expr::int(1), Expr::int(2)])
}

fn assert_type(expr: Expr, expected: Type) {
    let (result, _) = check(expr);
    assert_eq!(result, Ok(expected));
}

fn assert_mismatch(expr: Expr) {
    let (result, _) = check(expr);
    assert!(
        matches!(result, Err(TypeError::TypeMismatch { .. })),
        "expected a mismatch, got {:?}",
        result
    );
}

#[test]
fn test_composition() {
    assert_type(
        Expr::binary(ExprOperator::Composition, int_to_bool(), bool_to_string()),
        Type::relation(Type::Integer, Type::String),
    );
    assert_mismatch(Expr::binary(ExprOperator::Composition, Expr::int(1), bool_to_string()));
}

#[test]
fn test_parallel_product() {
    let right = Expr::set(vec![pair(Expr::string("a"), Expr::int(2))]);
    assert_type(
        Expr::binary(ExprOperator::ParallelProduct, int_to_bool(), right),
        Type::relation(
            Type::couple(Type::Integer, Type::String),
            Type::couple(Type::Bool, Type::Integer),
        ),
    );
    assert_mismatch(Expr::binary(ExprOperator::ParallelProduct, set_of(&[1]), int_to_bool()));
}

#[test]
fn test_direct_product() {
    let right = Expr::set(vec![pair(Expr::int(1), Expr::string("a"))]);
    assert_type(
        Expr::binary(ExprOperator::DirectProduct, int_to_bool(), right),
        Type::relation(Type::Integer, Type::couple(Type::Bool, Type::String)),
    );
    assert_mismatch(Expr::binary(ExprOperator::DirectProduct, int_to_bool(), bool_to_string()));
}

#[test]
fn test_inverse() {
    assert_type(
        unary(ExprOperator::Inverse, int_to_bool()),
        Type::relation(Type::Bool, Type::Integer),
    );
    assert_mismatch(unary(ExprOperator::Inverse, Expr::int(1)));
}

#[test]
fn test_domain_and_range_restrictions() {
    let int_bool = Type::relation(Type::Integer, Type::Bool);
    for op in [ExprOperator::DomainRestriction, ExprOperator::DomainSubtraction] {
        assert_type(Expr::binary(op, set_of(&[1]), int_to_bool()), int_bool.clone());
        assert_mismatch(Expr::binary(op, Expr::set(vec![tt()]), int_to_bool()));
    }
    for op in [ExprOperator::RangeRestriction, ExprOperator::RangeSubtraction] {
        assert_type(Expr::binary(op, int_to_bool(), Expr::set(vec![tt()])), int_bool.clone());
        assert_mismatch(Expr::binary(op, int_to_bool(), set_of(&[1])));
    }
}

#[test]
fn test_overwrite() {
    let update = Expr::set(vec![pair(Expr::int(2), Expr::op(ExprOperator::False, vec![]))]);
    assert_type(
        Expr::binary(ExprOperator::Overwrite, int_to_bool(), update),
        Type::relation(Type::Integer, Type::Bool),
    );
    assert_mismatch(Expr::binary(ExprOperator::Overwrite, int_to_bool(), bool_to_string()));
}

#[test]
fn test_relational_image() {
    assert_type(
        Expr::binary(ExprOperator::RelationalImage, int_to_bool(), set_of(&[1])),
        Type::set(Type::Bool),
    );
    assert_mismatch(Expr::binary(
        ExprOperator::RelationalImage,
        int_to_bool(),
        Expr::set(vec![tt()]),
    ));
}

#[test]
fn test_projections() {
    let bools = || Expr::op(ExprOperator::Bool, vec![]);
    let domain = Type::couple(Type::Integer, Type::Bool);
    assert_type(
        Expr::binary(ExprOperator::Prj1, nat(), bools()),
        Type::relation(domain.clone(), Type::Integer),
    );
    assert_type(
        Expr::binary(ExprOperator::Prj2, nat(), bools()),
        Type::relation(domain, Type::Bool),
    );
    assert_mismatch(Expr::binary(ExprOperator::Prj1, Expr::int(1), bools()));
}

#[test]
fn test_fnc_and_rel() {
    assert_type(
        unary(ExprOperator::Fnc, int_to_bool()),
        Type::relation(Type::Integer, Type::set(Type::Bool)),
    );
    assert_type(
        unary(ExprOperator::Rel, unary(ExprOperator::Fnc, int_to_bool())),
        Type::relation(Type::Integer, Type::Bool),
    );
    assert_mismatch(unary(ExprOperator::Rel, int_to_bool()));
}

#[test]
fn test_closure_and_iterate() {
    let successor = || Expr::set(vec![pair(Expr::int(1), Expr::int(2))]);
    let int_int = Type::relation(Type::Integer, Type::Integer);
    assert_type(unary(ExprOperator::Closure, successor()), int_int.clone());
    assert_type(unary(ExprOperator::Closure1, successor()), int_int.clone());
    assert_type(
        Expr::binary(ExprOperator::Iterate, successor(), Expr::int(3)),
        int_int,
    );
    assert_mismatch(unary(ExprOperator::Closure, set_of(&[1])));
    assert_mismatch(Expr::binary(ExprOperator::Iterate, successor(), tt()));
}

#[test]
fn test_insert_front_and_tail() {
    let ints = Type::sequence(Type::Integer);
    assert_type(
        Expr::binary(ExprOperator::InsertFront, Expr::int(0), int_sequence()),
        ints.clone(),
    );
    assert_type(
        Expr::binary(ExprOperator::InsertTail, int_sequence(), Expr::int(3)),
        ints,
    );
    assert_mismatch(Expr::binary(ExprOperator::InsertFront, Expr::string("a"), int_sequence()));
    assert_mismatch(Expr::binary(ExprOperator::InsertTail, int_sequence(), tt()));
}

#[test]
fn test_concatenation() {
    assert_type(
        Expr::binary(ExprOperator::Concat, int_sequence(), int_sequence()),
        Type::sequence(Type::Integer),
    );
    assert_mismatch(Expr::binary(
        ExprOperator::Concat,
        int_sequence(),
        Expr::seq(vec![Expr::string("a")]),
    ));

    let nested = Expr::seq(vec![int_sequence(), Expr::seq(vec![Expr::int(3)])]);
    assert_type(unary(ExprOperator::Conc, nested), Type::sequence(Type::Integer));
    assert_mismatch(unary(ExprOperator::Conc, int_sequence()));
}

#[test]
fn test_conc_without_operand() {
    let (result, _) = check(Expr::op(ExprOperator::Conc, vec![]));
    assert!(matches!(
        result,
        Err(TypeError::ArityMismatch {
            expected: 1,
            found: 0,
            ..
        })
    ));
}

#[test]
fn test_pred_and_succ_take_one_operand() {
    assert_type(unary(ExprOperator::Succ, Expr::int(1)), Type::Integer);
    assert_type(unary(ExprOperator::Pred, Expr::int(1)), Type::Integer);
    let (result, _) = check(Expr::op(ExprOperator::Succ, vec![Expr::int(1), Expr::int(2)]));
    assert!(matches!(
        result,
        Err(TypeError::ArityMismatch {
            expected: 1,
            found: 2,
            ..
        })
    ));
}

#[test]
fn test_sequence_accessors() {
    assert_type(unary(ExprOperator::First, int_sequence()), Type::Integer);
    assert_type(unary(ExprOperator::Last, int_sequence()), Type::Integer);
    for op in [ExprOperator::Front, ExprOperator::Tail, ExprOperator::Rev] {
        assert_type(unary(op, int_sequence()), Type::sequence(Type::Integer));
    }
    assert_type(
        Expr::binary(ExprOperator::RestrictFront, int_sequence(), Expr::int(1)),
        Type::sequence(Type::Integer),
    );
    assert_type(unary(ExprOperator::Size, int_sequence()), Type::Integer);
    assert_mismatch(unary(ExprOperator::First, Expr::set(vec![tt()])));
    assert_mismatch(Expr::binary(ExprOperator::RestrictTail, int_sequence(), tt()));
}

#[test]
fn test_sequence_sets() {
    assert_type(
        unary(ExprOperator::Perm, set_of(&[1, 2])),
        Type::set(Type::sequence(Type::Integer)),
    );
    assert_type(
        unary(ExprOperator::Seq, Expr::op(ExprOperator::Bool, vec![])),
        Type::set(Type::sequence(Type::Bool)),
    );
    assert_type(
        unary(ExprOperator::Iseq1, nat()),
        Type::set(Type::sequence(Type::Integer)),
    );
    assert_mismatch(unary(ExprOperator::Seq, Expr::int(1)));
}

#[test]
fn test_generalized_union_and_intersection() {
    let sets = || Expr::set(vec![set_of(&[1]), set_of(&[2])]);
    assert_type(unary(ExprOperator::GeneralizedUnion, sets()), Type::set(Type::Integer));
    assert_type(
        unary(ExprOperator::GeneralizedIntersection, sets()),
        Type::set(Type::Integer),
    );
    assert_mismatch(unary(ExprOperator::GeneralizedUnion, set_of(&[1])));
}

fn quantified(
    decls: &Declarations,
    op: QuantifiedExprOperator,
    x: DeclId,
    body: Expr,
) -> Expr {
    Expr::Quantified(QuantifiedExpr {
        op,
        decls: vec![x],
        predicate: Box::new(Predicate::member(decls.ident(x), nat())),
        body: Box::new(body),
        span: None,
        ty: None,
    })
}

#[test]
fn test_quantified_expressions() {
    for (op, expected) in [
        (QuantifiedExprOperator::Sigma, Type::Integer),
        (QuantifiedExprOperator::Pi, Type::Integer),
    ] {
        let mut decls = Declarations::new();
        let x = decls.declare("x");
        let body = Expr::binary(ExprOperator::Plus, decls.ident(x), Expr::int(1));
        let mut expr = quantified(&decls, op, x, body);
        assert_eq!(check_expression(&mut decls, &mut expr), Ok(expected));
        assert_eq!(decls.ty(x), Some(&Type::Integer));
    }
    for op in [QuantifiedExprOperator::Union, QuantifiedExprOperator::Inter] {
        let mut decls = Declarations::new();
        let x = decls.declare("x");
        let body = Expr::set(vec![decls.ident(x)]);
        let mut expr = quantified(&decls, op, x, body);
        assert_eq!(
            check_expression(&mut decls, &mut expr),
            Ok(Type::set(Type::Integer))
        );
    }

    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let body = Expr::set(vec![decls.ident(x)]);
    let mut expr = quantified(&decls, QuantifiedExprOperator::Sigma, x, body);
    assert!(matches!(
        check_expression(&mut decls, &mut expr),
        Err(TypeError::TypeMismatch { .. })
    ));
}

fn lambda(params: Vec<DeclId>, predicate: Predicate, body: Expr) -> Expr {
    Expr::Lambda(LambdaExpr {
        decls: params,
        predicate: Box::new(predicate),
        body: Box::new(body),
        span: None,
        ty: None,
    })
}

#[test]
fn test_lambda() {
    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let y = decls.declare("y");
    let predicate = Predicate::and(vec![
        Predicate::member(decls.ident(x), nat()),
        Predicate::member(decls.ident(y), Expr::op(ExprOperator::Bool, vec![])),
    ]);
    let mut expr = lambda(vec![x, y], predicate, decls.ident(x));
    assert_eq!(
        check_expression(&mut decls, &mut expr),
        Ok(Type::relation(Type::couple(Type::Integer, Type::Bool), Type::Integer))
    );

    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let predicate = Predicate::member(decls.ident(x), nat());
    let body = Expr::binary(ExprOperator::Plus, decls.ident(x), tt());
    let mut expr = lambda(vec![x], predicate, body);
    assert!(matches!(
        check_expression(&mut decls, &mut expr),
        Err(TypeError::TypeMismatch { .. })
    ));
}

#[test]
fn test_struct() {
    let mut decls = Declarations::new();
    let fields = vec![
        RecordField {
            decl: decls.declare("a"),
            name: "a".to_string(),
            value: nat(),
        },
        RecordField {
            decl: decls.declare("b"),
            name: "b".to_string(),
            value: Expr::op(ExprOperator::Bool, vec![]),
        },
    ];
    let mut expr = Expr::Struct(StructExpr {
        fields,
        span: None,
        ty: None,
    });
    assert_eq!(
        check_expression(&mut decls, &mut expr),
        Ok(Type::set(Type::Record(RecordType::new(vec![
            ("a".to_string(), Type::Integer),
            ("b".to_string(), Type::Bool),
        ]))))
    );

    let mut decls = Declarations::new();
    let fields = vec![RecordField {
        decl: decls.declare("a"),
        name: "a".to_string(),
        value: Expr::int(1),
    }];
    let mut expr = Expr::Struct(StructExpr {
        fields,
        span: None,
        ty: None,
    });
    assert!(matches!(
        check_expression(&mut decls, &mut expr),
        Err(TypeError::TypeMismatch { .. })
    ));
}

fn if_expr(then_branch: Expr, else_branch: Expr) -> Expr {
    Expr::If(IfExpr {
        condition: Box::new(Predicate::compare(Comparison::Less, Expr::int(1), Expr::int(2))),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
        span: None,
        ty: None,
    })
}

#[test]
fn test_if_expression() {
    assert_type(if_expr(Expr::int(1), Expr::int(2)), Type::Integer);
    assert_mismatch(if_expr(Expr::int(1), tt()));
}

fn let_expr(decls: &mut Declarations, value: Expr) -> Expr {
    let x = decls.declare("x");
    Expr::Let(LetExpr {
        decls: vec![x],
        predicate: Box::new(Predicate::equal(decls.ident(x), value)),
        body: Box::new(Expr::binary(ExprOperator::Plus, decls.ident(x), Expr::int(1))),
        span: None,
        ty: None,
    })
}

#[test]
fn test_let_expression() {
    let mut decls = Declarations::new();
    let mut expr = let_expr(&mut decls, Expr::int(1));
    assert_eq!(check_expression(&mut decls, &mut expr), Ok(Type::Integer));

    let mut decls = Declarations::new();
    let mut expr = let_expr(&mut decls, tt());
    assert!(matches!(
        check_expression(&mut decls, &mut expr),
        Err(TypeError::TypeMismatch { .. })
    ));
}

#[test]
fn test_if_predicate() {
    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let y = decls.declare("y");
    let body = Predicate::If(IfPredicate {
        condition: Box::new(Predicate::equal(decls.ident(x), Expr::int(1))),
        then_branch: Box::new(Predicate::equal(decls.ident(y), tt())),
        else_branch: Box::new(Predicate::equal(
            decls.ident(y),
            Expr::op(ExprOperator::False, vec![]),
        )),
        span: None,
        ty: None,
    });
    let mut formula = predicate_formula(decls, body);
    assert_eq!(check_formula(&mut formula), Ok(Type::Bool));
    assert_eq!(formula.decls.ty(x), Some(&Type::Integer));
    assert_eq!(formula.decls.ty(y), Some(&Type::Bool));

    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let body = Predicate::If(IfPredicate {
        condition: Box::new(Predicate::equal(decls.ident(x), Expr::int(1))),
        then_branch: Box::new(Predicate::equal(decls.ident(x), tt())),
        else_branch: Box::new(Predicate::truth()),
        span: None,
        ty: None,
    });
    let mut formula = predicate_formula(decls, body);
    assert!(matches!(
        check_formula(&mut formula),
        Err(TypeError::TypeMismatch { .. })
    ));
}

fn let_predicate(decls: &mut Declarations, value: Expr) -> Predicate {
    let z = decls.declare("z");
    Predicate::Let(LetPredicate {
        decls: vec![z],
        where_predicate: Box::new(Predicate::equal(decls.ident(z), value)),
        body: Box::new(Predicate::compare(Comparison::Greater, decls.ident(z), Expr::int(1))),
        span: None,
        ty: None,
    })
}

#[test]
fn test_let_predicate() {
    let mut decls = Declarations::new();
    let mut predicate = let_predicate(&mut decls, Expr::int(3));
    assert_eq!(check_predicate(&mut decls, &mut predicate), Ok(Type::Bool));
    assert_eq!(decls.ty(DeclId(0)), Some(&Type::Integer));

    let mut decls = Declarations::new();
    let mut predicate = let_predicate(&mut decls, Expr::string("a"));
    assert!(matches!(
        check_predicate(&mut decls, &mut predicate),
        Err(TypeError::TypeMismatch { .. })
    ));
}

#[test]
fn test_formula_recheck_after_failure() {
    let mut decls = Declarations::new();
    let x = decls.declare("x");
    let y = decls.declare("y");
    let body = Predicate::equal(decls.ident(x), decls.ident(y));
    let mut formula = predicate_formula(decls, body);
    assert!(check_formula(&mut formula).is_err());

    let d = &formula.decls;
    formula.body = FormulaBody::Predicate(Predicate::and(vec![
        Predicate::equal(d.ident(y), tt()),
        Predicate::equal(d.ident(x), Expr::int(1)),
    ]));
    assert_eq!(check_formula(&mut formula), Ok(Type::Bool));
    assert_eq!(formula.decls.ty(x), Some(&Type::Integer));
    assert_eq!(formula.decls.ty(y), Some(&Type::Bool));
}
