use btype_checker::diagnostic::DiagnosticRenderer;
use btype_checker::*;
use pretty_assertions::assert_eq;

fn scheduler() -> Machine {
    let mut machine = Machine::new("Scheduler");
    let pid = machine.add_deferred_set("PID");
    let active = machine.add_variable("active");
    machine.invariant = Some(Predicate::compare(
        Comparison::Inclusion,
        machine.decls.ident(active),
        machine.decls.ident(pid),
    ));
    machine.initialisation = Some(Substitution::assign(
        vec![machine.decls.ident(active)],
        vec![Expr::op(ExprOperator::EmptySet, vec![])],
    ));

    let add = machine.add_operation("add", &["p"], &[], Substitution::skip());
    let p = machine.operations[add].params[0];
    let d = &machine.decls;
    machine.operations[add].body = Substitution::precondition(
        Predicate::member(d.ident(p), d.ident(pid)),
        Substitution::assign(
            vec![d.ident(active)],
            vec![Expr::binary(
                ExprOperator::Union,
                d.ident(active),
                Expr::set(vec![d.ident(p)]),
            )],
        ),
    );
    machine
}

#[test]
fn test_report_after_checking() {
    let mut machine = scheduler();
    check_machine(&mut machine).expect("scheduler checks");

    let report = TypeReport::from_machine(&machine);
    assert!(report.is_complete());
    assert_eq!(report.machine, "Scheduler");
    assert_eq!(report.sets[0].name, "PID");
    assert_eq!(
        report.variables[0].ty.as_ref().map(ToString::to_string),
        Some("POW(PID)".to_string())
    );
    assert_eq!(report.operations[0].name, "add");
    assert_eq!(
        report.operations[0].params[0].ty.as_ref().map(ToString::to_string),
        Some("PID".to_string())
    );
}

#[test]
fn test_report_json_round_trip() {
    let mut machine = scheduler();
    check_machine(&mut machine).expect("scheduler checks");

    let report = TypeReport::from_machine(&machine);
    let json = serde_json::to_string(&report).expect("report serializes");
    let back: TypeReport = serde_json::from_str(&json).expect("report deserializes");
    assert_eq!(back, report);
}

#[test]
fn test_rendered_error_points_at_node() {
    let source = "x = 1 + TRUE";
    let mut decls = Declarations::new();
    let x = decls.declare_at("x", Span::new(0, 1));
    let sum = Expr::binary(
        ExprOperator::Plus,
        Expr::int(1).with_span(Span::new(4, 5)),
        Expr::op(ExprOperator::True, vec![]).with_span(Span::new(8, 12)),
    )
    .with_span(Span::new(4, 12));
    let mut predicate = Predicate::equal(decls.ident(x), sum).with_span(Span::new(0, 12));

    let err = check_predicate(&mut decls, &mut predicate).unwrap_err();
    assert_eq!(err.span(), Some(Span::new(8, 12)));

    let output = DiagnosticRenderer::plain().render(&err.to_diagnostic(), source);
    assert!(output.starts_with("error[E0001]"), "{}", output);
    assert!(output.contains("1 | x = 1 + TRUE"), "{}", output);
    assert!(output.contains("^^^^ expected `INTEGER`, found `BOOL`"), "{}", output);
}
