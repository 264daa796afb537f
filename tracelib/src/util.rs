use crate::cache::Cache;
use crate::error::Result;
use crate::program::{Body, Definition, Expression, Loop, Statement};

/// The direct mapped cache the reference scenarios are measured against: 32 sets of one 64 byte
/// block
pub fn reference_cache() -> Result<Cache> {
    Cache::new(32, 1, 64)
}

/// Walks a 32x32 array of doubles four elements at a time, writing each element
///
/// ```text
/// for (i = 0; i < 32; i++)
///     for (j = 0; j < 29; j += 4)
///         A[i][j] = ...; A[i][j+1] = ...; A[i][j+2] = ...; A[i][j+3] = ...;
/// ```
pub fn row_major_writes() -> Result<Body> {
    let doubles = Definition::new(8, vec![32, 32], 0)?;
    let statements = [
        Expression::new(&doubles, ["{i}", "{j}"])?,
        Expression::new(&doubles, ["{i}", "{j}+1"])?,
        Expression::new(&doubles, ["{i}", "{j}+2"])?,
        Expression::new(&doubles, ["{i}", "{j}+3"])?,
    ].map(Statement::write_only);
    Ok(loop_nest(Body::from_iter(statements)))
}

/// As [`row_major_writes`], with a 32x128 array of shorts placed straight after the doubles, of
/// which `B[i][j]` and `B[i][j+3]` are also written on every inner iteration
pub fn two_array_writes() -> Result<Body> {
    let doubles = Definition::new(8, vec![32, 32], 0)?;
    let shorts = Definition::new(2, vec![32, 128], doubles.end_address())?;
    let statements = [
        Expression::new(&doubles, ["{i}", "{j}"])?,
        Expression::new(&doubles, ["{i}", "{j}+1"])?,
        Expression::new(&doubles, ["{i}", "{j}+2"])?,
        Expression::new(&doubles, ["{i}", "{j}+3"])?,
        Expression::new(&shorts, ["{i}", "{j}"])?,
        Expression::new(&shorts, ["{i}", "{j}+3"])?,
    ].map(Statement::write_only);
    Ok(loop_nest(Body::from_iter(statements)))
}

fn loop_nest(body: Body) -> Body {
    let inner_loop = Loop::new("j", 0, "{j}<29", "{j}+4", body);
    let outer_loop = Loop::new("i", 0, "{i}<32", "{i}+1", inner_loop);
    let mut program = Body::new();
    program.add_statement(outer_loop);
    program
}
