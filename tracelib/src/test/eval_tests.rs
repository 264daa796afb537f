use std::error::Error;
use rstest::rstest;
use crate::error::SimulationError;
use crate::eval::{evaluate, Value, MAX_NESTING};
use crate::formula::{Bindings, Formula};

#[rstest]
#[case("1+1", 2)]
#[case("9 * 10", 90)]
#[case("2 + (-5)", -3)]
#[case("3-2", 1)]
#[case("2-3-4", -5)]
#[case("2+3*4", 14)]
#[case("(2+3)*4", 20)]
#[case("-2*3", -6)]
#[case("2--3", 5)]
#[case("- -4", 4)]
#[case("((7))", 7)]
fn allowed_arithmetic(#[case] formula: &str, #[case] expected: i64) {
    assert_eq!(evaluate(formula).unwrap(), Value::Integer(expected));
}

#[rstest]
#[case("1>0", true)]
#[case("0<1", true)]
#[case("-1<0", true)]
#[case("0>-1", true)]
#[case("5<=5", true)]
#[case("5>=5", true)]
#[case("1<0", false)]
#[case("0>1", false)]
#[case("-10>1", false)]
#[case("2>=3", false)]
#[case("5<=-2", false)]
#[case("28+4<29", false)]
fn allowed_logic(#[case] formula: &str, #[case] expected: bool) {
    assert_eq!(evaluate(formula).unwrap(), Value::Boolean(expected));
}

#[rstest]
#[case("1<2<3", true)]
#[case("3>2>1", true)]
#[case("1<2>0", true)]
#[case("1<3<2", false)]
#[case("2<1<5", false)]
#[case("1<=1<=1<2", true)]
fn chained_comparisons(#[case] formula: &str, #[case] expected: bool) {
    assert_eq!(evaluate(formula).unwrap(), Value::Boolean(expected));
}

#[rstest]
#[case::division("10/2")]
#[case::modulo("10%3")]
#[case::equality("5==2")]
#[case::inequality("5!=2")]
#[case::assignment("a=2")]
#[case::identifier("i+1")]
#[case::call("abs(1)")]
#[case::attribute("(1).real")]
#[case::unsubstituted("{i}+1")]
#[case::power("2**3")]
#[case::unary_plus("+1")]
#[case::float("1.5")]
#[case::empty("")]
#[case::blank("   ")]
#[case::unclosed("(1+2")]
#[case::unopened("1+2)")]
#[case::juxtaposed("1 2")]
#[case::dangling("1+")]
#[case::literal_overflow("9223372036854775808")]
#[case::sum_overflow("9223372036854775807+1")]
#[case::product_overflow("4611686018427387904*2")]
#[case::comparison_as_operand("(1<2)+1")]
#[case::validated_after_false_link("2<1<x")]
fn disallowed(#[case] formula: &str) {
    assert!(matches!(evaluate(formula), Err(SimulationError::RejectedExpression { .. })));
}

fn parenthesised(depth: usize) -> String {
    format!("{}1{}", "(".repeat(depth), ")".repeat(depth))
}

#[test]
fn nesting_is_limited() {
    assert_eq!(evaluate(&parenthesised(MAX_NESTING)).unwrap(), Value::Integer(1));
    assert_eq!(evaluate(&format!("{}5", "-".repeat(MAX_NESTING))).unwrap(), Value::Integer(5));
    for formula in [
        parenthesised(MAX_NESTING + 1),
        parenthesised(100_000),
        "(".repeat(100_000),
        format!("{}1", "-".repeat(100_000)),
        format!("{}1{}", "(-".repeat(50_000), ")".repeat(50_000)),
    ] {
        let result = evaluate(&formula);
        assert!(
            matches!(&result, Err(SimulationError::RejectedExpression { reason, .. }) if reason.contains("nested too deeply")),
            "{result:?}"
        );
    }
}

#[test]
fn results_must_have_the_expected_type() {
    assert_eq!(Value::Integer(3).into_integer("3").unwrap(), 3);
    assert!(Value::Integer(3).into_boolean("3").is_err());
    assert!(Value::Boolean(true).into_boolean("1<2").unwrap());
    assert!(Value::Boolean(true).into_integer("1<2").is_err());
}

#[test]
fn substitutes_bound_variables() -> Result<(), Box<dyn Error>> {
    let bindings = Bindings::from([("i".to_string(), 5), ("j".to_string(), -3), ("unused".to_string(), 1)]);
    let formula = Formula::new("{i} * 4 + {j}");
    assert_eq!(formula.substitute(&bindings)?, "5 * 4 + -3");
    assert_eq!(formula.evaluate_integer(&bindings)?, 17);
    assert!(Formula::new("{i}<{i}+1").evaluate_condition(&bindings)?);
    assert_eq!(Formula::new("7").evaluate(&Bindings::new())?, Value::Integer(7));
    Ok(())
}

#[test]
fn unbound_variables_are_errors() {
    let bindings = Bindings::from([("i".to_string(), 0)]);
    let result = Formula::new("{i}+{k}").evaluate_integer(&bindings);
    assert!(matches!(result, Err(SimulationError::UnboundVariable { variable, .. }) if variable == "k"));
}

#[test]
fn malformed_placeholders_reach_the_evaluator() {
    let bindings = Bindings::from([("i".to_string(), 0)]);
    // Not a placeholder, so left alone and then rejected
    let result = Formula::new("{ i }+1").evaluate_integer(&bindings);
    assert!(matches!(result, Err(SimulationError::RejectedExpression { .. })));
}

#[test]
fn lists_referenced_variables() {
    let formula = Formula::new("{i}*{n}+{i}");
    assert_eq!(formula.variables().collect::<Vec<_>>(), vec!["i", "n", "i"]);
    assert!(formula.references("n"));
    assert!(!formula.references("j"));
}
