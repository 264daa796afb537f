use serde::Deserialize;

/// A complete simulation scenario: a cache, the arrays in memory, and a program over them
#[derive(Debug, Deserialize)]
pub struct ScenarioConfig {
    pub cache: CacheConfig,
    #[serde(default)]
    pub arrays: Vec<ArrayConfig>,
    #[serde(default)]
    pub program: Vec<NodeConfig>,
}

/// A configuration for a single cache
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    pub num_sets: u64,
    pub blocks_per_set: u64,
    pub block_size: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
}

/// The replacement policy - lru or fifo. Defaults to lru.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum ReplacementPolicyConfig {
    #[default]
    #[serde(alias = "lru")]
    #[value(name = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "fifo")]
    #[value(name = "fifo")]
    FirstInFirstOut,
}

/// An array in memory
///
/// Placement is either an explicit `address`, or `after` another array, starting at its end
/// address. With neither, the array follows the previously declared one, and the first array
/// starts at 0
#[derive(Debug, Deserialize)]
pub struct ArrayConfig {
    pub name: String,
    pub element_size: u64,
    #[serde(default)]
    pub dimensions: Vec<u64>,
    #[serde(default)]
    pub address: Option<u64>,
    #[serde(default)]
    pub after: Option<String>,
}

/// An entry in a program body, written `{"loop": {...}}` or `{"statement": {...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeConfig {
    Loop(LoopConfig),
    Statement(StatementConfig),
}

#[derive(Debug, Deserialize)]
pub struct LoopConfig {
    pub variable: String,
    #[serde(alias = "init")]
    pub initial: i64,
    pub condition: String,
    pub increment: String,
    #[serde(default)]
    pub body: Vec<NodeConfig>,
}

#[derive(Debug, Deserialize)]
pub struct StatementConfig {
    #[serde(default)]
    pub reads: Vec<ExpressionConfig>,
    pub write: ExpressionConfig,
}

/// An element access, such as `{"array": "A", "indices": ["{i}", "{j}+1"]}`
#[derive(Debug, Deserialize)]
pub struct ExpressionConfig {
    pub array: String,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub offset: i64,
}
