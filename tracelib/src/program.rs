use std::fmt;
use log::{trace, warn};
use crate::cache::{AccessKind, AccessSink};
use crate::error::{Result, SimulationError};
use crate::formula::{Bindings, Formula};

/// A definition for a row-major array. `dimensions[0]` is the outermost, slowest varying index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    element_size: u64,
    dimensions: Vec<u64>,
    base_address: u64,
    end_address: u64,
}

impl Definition {
    /// Creates an array definition
    ///
    /// # Arguments
    ///
    /// * `element_size`: The size of a single element in bytes
    /// * `dimensions`: The extent of each dimension, outermost first. Empty for a scalar
    /// * `base_address`: The address of the first element
    ///
    /// returns: Result<Definition, SimulationError>
    pub fn new(element_size: u64, dimensions: Vec<u64>, base_address: u64) -> Result<Self> {
        if element_size == 0 {
            return Err(SimulationError::InvalidProgram("array elements must have a positive size".to_string()));
        }
        if let Some(dimension) = dimensions.iter().position(|extent| *extent == 0) {
            return Err(SimulationError::InvalidProgram(format!("dimension {dimension} of {dimensions:?} is empty")));
        }
        let end_address = dimensions.iter()
            .try_fold(element_size, |size, extent| size.checked_mul(*extent))
            .and_then(|size| base_address.checked_add(size))
            .ok_or_else(|| SimulationError::AddressOutOfRange(format!(
                "an array of {dimensions:?} {element_size} byte elements at {base_address:#x} doesn't fit in the address space"
            )))?;
        Ok(Self {
            element_size,
            dimensions,
            base_address,
            end_address,
        })
    }

    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// The first address past the end of the array, where a following array can be placed
    pub fn end_address(&self) -> u64 {
        self.end_address
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Definition: size {}, dimensions {:?}, start address {}",
            self.element_size, self.dimensions, self.base_address
        )
    }
}

/// A single element access into an array, such as `A[{i} + 1][{j} * 2]`
///
/// The shape of the array is copied from its definition, so expressions stand alone once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    indices: Vec<Formula>,
    element_size: u64,
    dimensions: Vec<u64>,
    base_address: u64,
    offset: i64,
}

impl Expression {
    pub fn new<I, F>(definition: &Definition, indices: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<Formula>,
    {
        Self::with_offset(definition, indices, 0)
    }

    /// Creates an expression with a constant byte offset added to the element address, used for
    /// fields of arrays of structs
    ///
    /// # Arguments
    ///
    /// * `definition`: The array being accessed
    /// * `indices`: One index formula per dimension, outermost first
    /// * `offset`: The byte offset
    ///
    /// returns: Result<Expression, SimulationError>
    pub fn with_offset<I, F>(definition: &Definition, indices: I, offset: i64) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<Formula>,
    {
        let indices: Vec<Formula> = indices.into_iter().map(Into::into).collect();
        if indices.len() != definition.dimensions.len() {
            return Err(SimulationError::InvalidProgram(format!(
                "{} indices given for an array with dimensions {:?}",
                indices.len(),
                definition.dimensions
            )));
        }
        Ok(Self {
            indices,
            element_size: definition.element_size,
            dimensions: definition.dimensions.clone(),
            base_address: definition.base_address,
            offset,
        })
    }

    /// Computes the address of the accessed element under the given bindings
    ///
    /// Works from the innermost dimension outwards, scaling each index by the size of everything
    /// inside it, which is row-major layout
    ///
    /// # Examples
    ///
    /// ```
    /// use tracelib::formula::Bindings;
    /// use tracelib::program::{Definition, Expression};
    /// let definition = Definition::new(2, vec![16, 64], 6144).unwrap();
    /// let expression = Expression::new(&definition, ["{i} + 1", "{i} * 4"]).unwrap();
    /// let bindings = Bindings::from([("i".to_string(), 1)]);
    /// assert_eq!(expression.resolve(&bindings).unwrap(), 6408);
    /// ```
    pub fn resolve(&self, bindings: &Bindings) -> Result<u64> {
        // i128 holds any index scaled by any in-range footprint
        let mut address = i128::from(self.base_address);
        let mut scale = i128::from(self.element_size);
        for (index, extent) in self.indices.iter().zip(&self.dimensions).rev() {
            let value = index.evaluate_integer(bindings)?;
            address = scale.checked_mul(i128::from(value))
                .and_then(|step| address.checked_add(step))
                .ok_or_else(|| SimulationError::AddressOutOfRange(format!("{self} overflows")))?;
            scale *= i128::from(*extent);
        }
        let address = address.checked_add(i128::from(self.offset))
            .ok_or_else(|| SimulationError::AddressOutOfRange(format!("{self} overflows")))?;
        u64::try_from(address)
            .map_err(|_| SimulationError::AddressOutOfRange(format!("{self} resolves to {address}")))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.base_address)?;
        for index in &self.indices {
            write!(f, "[{index}]")?;
        }
        if self.offset != 0 {
            write!(f, " + {}", self.offset)?;
        }
        Ok(())
    }
}

/// An assignment statement, `write = f(reads...)`. Only the addresses touched matter, so the
/// function itself isn't modelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    reads: Vec<Expression>,
    write: Expression,
}

impl Statement {
    pub fn new(reads: Vec<Expression>, write: Expression) -> Self {
        Self { reads, write }
    }

    /// A statement with nothing on the right hand side worth simulating, such as `A[i] = 0`
    pub fn write_only(write: Expression) -> Self {
        Self::new(Vec::new(), write)
    }

    /// Issues every read in declaration order, then the write
    pub fn execute<S: AccessSink + ?Sized>(&self, sink: &mut S, bindings: &Bindings) -> Result<()> {
        // Making the assumption that subexpressions on the right are evaluated left to right
        for read in &self.reads {
            sink.access(read.resolve(bindings)?, read.element_size, AccessKind::Read)?;
        }
        sink.access(self.write.resolve(bindings)?, self.write.element_size, AccessKind::Write)?;
        Ok(())
    }
}

/// A for loop: `for (variable = initial_value; condition; variable = increment) body`
///
/// The loop variable lives in the shared bindings, so it stays visible to everything nested inside
/// the loop. Note the increment must be written `{i}+1`, there's no `{i}++`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    variable: String,
    initial_value: i64,
    condition: Formula,
    increment: Formula,
    body: Body,
}

impl Loop {
    pub fn new(
        variable: impl Into<String>,
        initial_value: i64,
        condition: impl Into<Formula>,
        increment: impl Into<Formula>,
        body: impl Into<Body>,
    ) -> Self {
        let variable = variable.into();
        let condition = condition.into();
        if !condition.references(&variable) {
            warn!("Loop condition `{condition}` doesn't mention `{variable}`, the loop may never terminate");
        }
        Self {
            variable,
            initial_value,
            condition,
            increment: increment.into(),
            body: body.into(),
        }
    }

    /// Runs the loop to completion. There is no iteration limit: a condition which never becomes
    /// false never returns
    pub fn execute<S: AccessSink + ?Sized>(&self, sink: &mut S, bindings: &mut Bindings) -> Result<()> {
        bindings.insert(self.variable.clone(), self.initial_value);
        while self.condition.evaluate_condition(bindings)? {
            trace!("{} = {:?}", self.variable, bindings.get(&self.variable));
            self.body.execute(sink, bindings)?;
            let next = self.increment.evaluate_integer(bindings)?;
            bindings.insert(self.variable.clone(), next);
        }
        Ok(())
    }
}

/// Either kind of entry in a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Statement(Statement),
    Loop(Loop),
}

impl Node {
    pub fn execute<S: AccessSink + ?Sized>(&self, sink: &mut S, bindings: &mut Bindings) -> Result<()> {
        match self {
            Node::Statement(statement) => statement.execute(sink, bindings),
            Node::Loop(inner) => inner.execute(sink, bindings),
        }
    }
}

impl From<Statement> for Node {
    fn from(value: Statement) -> Self {
        Self::Statement(value)
    }
}

impl From<Loop> for Node {
    fn from(value: Loop) -> Self {
        Self::Loop(value)
    }
}

/// The body of a program or of a loop. Entries run in insertion order, which decides the order of
/// the accesses and so the contents of the cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    nodes: Vec<Node>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_statement(&mut self, statement: impl Into<Node>) {
        self.nodes.push(statement.into());
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn execute<S: AccessSink + ?Sized>(&self, sink: &mut S, bindings: &mut Bindings) -> Result<()> {
        for node in &self.nodes {
            node.execute(sink, bindings)?;
        }
        Ok(())
    }

    /// Runs the body as a whole program, starting with no variables bound
    ///
    /// # Arguments
    ///
    /// * `sink`: Where the generated accesses go, usually a cache
    ///
    /// returns: Result<(), SimulationError>, the first error aborts the run
    pub fn run<S: AccessSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let mut bindings = Bindings::new();
        self.execute(sink, &mut bindings)
    }
}

impl<N: Into<Node>> FromIterator<N> for Body {
    fn from_iter<T: IntoIterator<Item = N>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<N: Into<Node>> From<Vec<N>> for Body {
    fn from(value: Vec<N>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Statement> for Body {
    fn from(value: Statement) -> Self {
        Self { nodes: vec![value.into()] }
    }
}

impl From<Loop> for Body {
    fn from(value: Loop) -> Self {
        Self { nodes: vec![value.into()] }
    }
}
