use std::error::Error;
use crate::cache::AccessKind;
use crate::error::SimulationError;
use crate::formula::Bindings;
use crate::program::{Body, Definition, Expression, Loop, Statement};
use crate::trace::TraceRecord;

fn bind(variable: &str, value: i64) -> Bindings {
    Bindings::from([(variable.to_string(), value)])
}

fn record(address: u64, size: u64, kind: AccessKind) -> TraceRecord {
    TraceRecord { address, size, kind }
}

#[test]
fn get_address() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(2, vec![16, 64], 6144)?;
    let expression = Expression::new(&definition, ["{i} + 1", "{i} * 4"])?;
    assert_eq!(expression.resolve(&bind("i", 1))?, 6408);
    assert_eq!(expression.resolve(&bind("i", 5))?, 6952);
    Ok(())
}

#[test]
fn byte_offsets_are_added() -> Result<(), Box<dyn Error>> {
    // An array of 16 byte structs, accessing the field at offset 8
    let definition = Definition::new(16, vec![10], 1000)?;
    let expression = Expression::with_offset(&definition, ["{i}"], 8)?;
    assert_eq!(expression.resolve(&bind("i", 2))?, 1040);
    Ok(())
}

#[test]
fn three_dimensions_are_row_major() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(4, vec![2, 3, 5], 0)?;
    let expression = Expression::new(&definition, ["1", "2", "3"])?;
    assert_eq!(expression.resolve(&Bindings::new())?, 4 * (15 + 2 * 5 + 3));
    Ok(())
}

#[test]
fn scalars_have_no_indices() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(4, Vec::new(), 100)?;
    let expression = Expression::new(&definition, std::iter::empty::<&str>())?;
    assert_eq!(expression.resolve(&Bindings::new())?, 100);
    assert_eq!(definition.end_address(), 104);
    Ok(())
}

#[test]
fn definitions_know_where_they_end() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(8, vec![32, 32], 0)?;
    assert_eq!(definition.end_address(), 8192);
    assert_eq!(definition.to_string(), "Definition: size 8, dimensions [32, 32], start address 0");
    Ok(())
}

#[test]
fn rejects_bad_definitions() {
    assert!(matches!(Definition::new(0, vec![4], 0), Err(SimulationError::InvalidProgram(_))));
    assert!(matches!(Definition::new(4, vec![4, 0], 0), Err(SimulationError::InvalidProgram(_))));
    assert!(matches!(Definition::new(8, vec![u64::MAX], 0), Err(SimulationError::AddressOutOfRange(_))));
}

#[test]
fn index_count_must_match_dimensions() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(8, vec![32, 32], 0)?;
    assert!(matches!(Expression::new(&definition, ["{i}"]), Err(SimulationError::InvalidProgram(_))));
    Ok(())
}

#[test]
fn negative_addresses_are_out_of_range() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(8, vec![4], 0)?;
    let expression = Expression::new(&definition, ["{i}-1"])?;
    assert!(matches!(expression.resolve(&bind("i", 0)), Err(SimulationError::AddressOutOfRange(_))));
    Ok(())
}

#[test]
fn missing_bindings_propagate() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(8, vec![4], 0)?;
    let expression = Expression::new(&definition, ["{k}"])?;
    assert!(matches!(expression.resolve(&bind("i", 0)), Err(SimulationError::UnboundVariable { .. })));
    Ok(())
}

#[test]
fn reads_precede_the_write_in_order() -> Result<(), Box<dyn Error>> {
    let doubles = Definition::new(8, vec![16], 0)?;
    let shorts = Definition::new(2, vec![16], doubles.end_address())?;
    // A[i] = B[i+1] + A[i+2] + B[i]
    let statement = Statement::new(
        vec![
            Expression::new(&shorts, ["{i}+1"])?,
            Expression::new(&doubles, ["{i}+2"])?,
            Expression::new(&shorts, ["{i}"])?,
        ],
        Expression::new(&doubles, ["{i}"])?,
    );
    let mut accesses: Vec<TraceRecord> = Vec::new();
    statement.execute(&mut accesses, &bind("i", 3))?;
    assert_eq!(accesses, vec![
        record(128 + 8, 2, AccessKind::Read),
        record(40, 8, AccessKind::Read),
        record(128 + 6, 2, AccessKind::Read),
        record(24, 8, AccessKind::Write),
    ]);
    Ok(())
}

#[test]
fn loops_bind_their_variable() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(8, vec![8], 0)?;
    let body = Statement::write_only(Expression::new(&definition, ["{i}"])?);
    let program = Loop::new("i", 0, "{i}<3", "{i}+1", body);
    let mut accesses: Vec<TraceRecord> = Vec::new();
    let mut bindings = Bindings::new();
    program.execute(&mut accesses, &mut bindings)?;
    let addresses: Vec<u64> = accesses.iter().map(|access| access.address).collect();
    assert_eq!(addresses, vec![0, 8, 16]);
    assert_eq!(bindings.get("i"), Some(&3));
    Ok(())
}

#[test]
fn loops_can_step_and_count_down() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(1, vec![64], 0)?;
    let body = Statement::write_only(Expression::new(&definition, ["{i}"])?);
    let program = Loop::new("i", 30, "{i}>=0", "{i}-10", body);
    let mut accesses: Vec<TraceRecord> = Vec::new();
    program.execute(&mut accesses, &mut Bindings::new())?;
    let addresses: Vec<u64> = accesses.iter().map(|access| access.address).collect();
    assert_eq!(addresses, vec![30, 20, 10, 0]);
    Ok(())
}

#[test]
fn loops_may_not_run_at_all() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(8, vec![8], 0)?;
    let body = Statement::write_only(Expression::new(&definition, ["{i}"])?);
    let program = Body::from(Loop::new("i", 5, "{i}<5", "{i}+1", body));
    let mut accesses: Vec<TraceRecord> = Vec::new();
    program.run(&mut accesses)?;
    assert!(accesses.is_empty());
    Ok(())
}

#[test]
fn inner_loops_see_outer_bindings() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(1, vec![4, 4], 0)?;
    let body = Statement::write_only(Expression::new(&definition, ["{i}", "{j}"])?);
    // Lower triangle: for i in 0..3, for j in 0..i
    let inner_loop = Loop::new("j", 0, "{j}<{i}", "{j}+1", body);
    let outer_loop = Loop::new("i", 0, "{i}<3", "{i}+1", inner_loop);
    let mut accesses: Vec<TraceRecord> = Vec::new();
    Body::from(outer_loop).run(&mut accesses)?;
    let addresses: Vec<u64> = accesses.iter().map(|access| access.address).collect();
    assert_eq!(addresses, vec![4, 8, 9]);
    Ok(())
}

#[test]
fn bodies_run_in_insertion_order() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(4, vec![4], 0)?;
    let mut program = Body::new();
    program.add_statement(Statement::write_only(Expression::new(&definition, ["2"])?));
    program.add_statement(Loop::new(
        "k", 0, "{k}<2", "{k}+1",
        Statement::write_only(Expression::new(&definition, ["{k}"])?),
    ));
    program.add_statement(Statement::write_only(Expression::new(&definition, ["3"])?));
    let mut accesses: Vec<TraceRecord> = Vec::new();
    program.run(&mut accesses)?;
    let addresses: Vec<u64> = accesses.iter().map(|access| access.address).collect();
    assert_eq!(addresses, vec![8, 0, 4, 12]);
    assert_eq!(program.nodes().len(), 3);
    Ok(())
}

#[test]
fn conditions_must_be_comparisons() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(4, vec![4], 0)?;
    let body = Statement::write_only(Expression::new(&definition, ["{i}"])?);
    let arithmetic_condition = Loop::new("i", 0, "{i}+1", "{i}+1", body.clone());
    assert!(matches!(
        arithmetic_condition.execute(&mut Vec::<TraceRecord>::new(), &mut Bindings::new()),
        Err(SimulationError::RejectedExpression { .. })
    ));
    let comparison_increment = Loop::new("i", 0, "{i}<4", "{i}<5", body);
    assert!(matches!(
        comparison_increment.execute(&mut Vec::<TraceRecord>::new(), &mut Bindings::new()),
        Err(SimulationError::RejectedExpression { .. })
    ));
    Ok(())
}

#[test]
fn errors_abort_the_run() -> Result<(), Box<dyn Error>> {
    let definition = Definition::new(4, vec![4], 0)?;
    let mut program = Body::new();
    program.add_statement(Statement::write_only(Expression::new(&definition, ["0"])?));
    program.add_statement(Statement::write_only(Expression::new(&definition, ["10/2"])?));
    program.add_statement(Statement::write_only(Expression::new(&definition, ["1"])?));
    let mut accesses: Vec<TraceRecord> = Vec::new();
    assert!(matches!(program.run(&mut accesses), Err(SimulationError::RejectedExpression { .. })));
    assert_eq!(accesses.len(), 1);
    Ok(())
}
