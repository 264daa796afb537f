use std::collections::HashMap;
use std::io::Write;
use std::time::{Duration, Instant};
use log::debug;
use serde::{Deserialize, Serialize};
use crate::cache::{Cache, CacheStats, GenericCache};
use crate::config::{ArrayConfig, CacheConfig, ExpressionConfig, NodeConfig, ReplacementPolicyConfig, ScenarioConfig};
use crate::error::{Result, SimulationError};
use crate::program::{Body, Definition, Expression, Loop, Node, Statement};
use crate::replacement_policies::{FirstInFirstOut, LeastRecentlyUsed};
use crate::trace::{self, TraceWriter};

/// The simulator drives a program (or a recorded trace) through a cache, and collects results.
///
/// It supports calling simulate multiple times, and will update the time taken to simulate and the
/// results accordingly. The cache is not flushed between runs, so later runs start warm
#[derive(Debug)]
pub struct Simulator {
    cache: GenericCache,
    program: Body,
    result: SimulationResult,
    simulation_time: Duration,
}

/// The result of a simulation. Can be serialised as the output of the command line tool
#[derive(Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct SimulationResult {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub read_misses: u64,
    pub write_misses: u64,
}

impl From<CacheStats> for SimulationResult {
    fn from(stats: CacheStats) -> Self {
        Self {
            accesses: stats.accesses,
            hits: stats.hits(),
            misses: stats.misses,
            read_misses: stats.read_misses,
            write_misses: stats.write_misses,
        }
    }
}

impl Simulator {

    /// Creates a new simulator for a given scenario
    ///
    /// # Arguments
    ///
    /// * `config`: A scenario configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, SimulationError>, failing if the cache geometry or the program
    /// is invalid
    pub fn new(config: &ScenarioConfig) -> Result<Self> {
        let cache = Self::config_to_cache(&config.cache)?;
        let definitions = Self::config_to_definitions(&config.arrays)?;
        let program = Self::config_to_body(&config.program, &definitions)?;
        debug!("Built a program of {} top level entries over {} arrays", program.nodes().len(), definitions.len());
        Ok(Self::from_parts(cache, program))
    }

    /// Creates a simulator from an already built cache and program
    pub fn from_parts(cache: impl Into<GenericCache>, program: Body) -> Self {
        Self {
            cache: cache.into(),
            program,
            result: SimulationResult::default(),
            simulation_time: Duration::new(0, 0),
        }
    }

    /// Runs the program once against the cache
    ///
    /// returns: Result<&SimulationResult, SimulationError>, the counters accumulated over every run
    pub fn simulate(&mut self) -> Result<&SimulationResult> {
        let start = Instant::now();
        let outcome = self.program.run(&mut self.cache);
        self.finish(start);
        outcome?;
        Ok(&self.result)
    }

    /// Runs the program once, also writing every access to `out` as a trace
    ///
    /// # Arguments
    ///
    /// * `out`: The destination of the trace, see [`crate::trace::TraceRecord`] for the format
    ///
    /// returns: Result<&SimulationResult, SimulationError>
    pub fn simulate_with_trace<W: Write>(&mut self, out: W) -> Result<&SimulationResult> {
        let start = Instant::now();
        let mut writer = TraceWriter::new(&mut self.cache, out);
        let outcome = self.program.run(&mut writer);
        let written = writer.written();
        let (_, mut out) = writer.into_inner();
        self.finish(start);
        outcome?;
        out.flush()?;
        debug!("Wrote {written} trace lines");
        Ok(&self.result)
    }

    /// Replays a recorded trace against the cache instead of running the program
    ///
    /// # Arguments
    ///
    /// * `bytes`: The trace, a whole number of 40 byte lines
    ///
    /// returns: Result<&SimulationResult, SimulationError>
    pub fn replay(&mut self, bytes: &[u8]) -> Result<&SimulationResult> {
        let start = Instant::now();
        let outcome = trace::replay(bytes, &mut self.cache);
        self.finish(start);
        let count = outcome?;
        debug!("Replayed {count} accesses");
        Ok(&self.result)
    }

    fn finish(&mut self, start: Instant) {
        self.simulation_time += start.elapsed();
        self.result = self.cache.stats().into();
        debug!("{} after {:?}", self.cache, self.simulation_time);
    }

    pub fn result(&self) -> &SimulationResult {
        &self.result
    }

    pub fn cache(&self) -> &GenericCache {
        &self.cache
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of blocks which have never been filled
    pub fn get_invalid_block_count(&self) -> usize {
        self.cache.invalid_block_count()
    }

    /// Creates a new cache from a cache configuration
    fn config_to_cache(config: &CacheConfig) -> Result<GenericCache> {
        Ok(match config.replacement_policy {
            ReplacementPolicyConfig::LeastRecentlyUsed => {
                GenericCache::from(Cache::with_policy(config.num_sets, config.blocks_per_set, config.block_size, LeastRecentlyUsed)?)
            }
            ReplacementPolicyConfig::FirstInFirstOut => {
                GenericCache::from(Cache::with_policy(config.num_sets, config.blocks_per_set, config.block_size, FirstInFirstOut)?)
            }
        })
    }

    /// Lays the arrays out in memory, in declaration order
    pub(crate) fn config_to_definitions(arrays: &[ArrayConfig]) -> Result<HashMap<String, Definition>> {
        let mut definitions: HashMap<String, Definition> = HashMap::new();
        let mut next_address = 0;
        for array in arrays {
            let base_address = match (array.address, &array.after) {
                (Some(_), Some(_)) => {
                    return Err(SimulationError::InvalidProgram(format!(
                        "array {} has both an address and an array to follow", array.name
                    )));
                }
                (Some(address), None) => address,
                (None, Some(previous)) => definitions.get(previous)
                    .map(Definition::end_address)
                    .ok_or_else(|| SimulationError::InvalidProgram(format!(
                        "array {} follows {previous}, which isn't declared before it", array.name
                    )))?,
                (None, None) => next_address,
            };
            let definition = Definition::new(array.element_size, array.dimensions.clone(), base_address)?;
            debug!("Array {}: {definition}", array.name);
            next_address = definition.end_address();
            if definitions.insert(array.name.clone(), definition).is_some() {
                return Err(SimulationError::InvalidProgram(format!("array {} is declared twice", array.name)));
            }
        }
        Ok(definitions)
    }

    fn config_to_body(nodes: &[NodeConfig], definitions: &HashMap<String, Definition>) -> Result<Body> {
        nodes.iter()
            .map(|node| Self::config_to_node(node, definitions))
            .collect::<Result<Vec<Node>>>()
            .map(Body::from)
    }

    fn config_to_node(node: &NodeConfig, definitions: &HashMap<String, Definition>) -> Result<Node> {
        Ok(match node {
            NodeConfig::Loop(config) => Loop::new(
                config.variable.as_str(),
                config.initial,
                config.condition.as_str(),
                config.increment.as_str(),
                Self::config_to_body(&config.body, definitions)?,
            ).into(),
            NodeConfig::Statement(config) => {
                let reads = config.reads.iter()
                    .map(|read| Self::config_to_expression(read, definitions))
                    .collect::<Result<Vec<_>>>()?;
                Statement::new(reads, Self::config_to_expression(&config.write, definitions)?).into()
            }
        })
    }

    fn config_to_expression(config: &ExpressionConfig, definitions: &HashMap<String, Definition>) -> Result<Expression> {
        let definition = definitions.get(&config.array)
            .ok_or_else(|| SimulationError::InvalidProgram(format!("unknown array {}", config.array)))?;
        Expression::with_offset(definition, config.indices.iter().map(String::as_str), config.offset)
    }
}
