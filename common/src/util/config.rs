use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub partition: PartitionConfig,
    #[serde(default)]
    pub floorplan: FloorplanConfig,
    #[serde(default)]
    pub pathfinder: PathfinderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partition: PartitionConfig::default(),
            floorplan: FloorplanConfig::default(),
            pathfinder: PathfinderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PartitionConfig {
    /// Seed for the initial coin-flip partition. Unset draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FloorplanConfig {
    #[serde(default = "default_cooling_factor")]
    pub cooling_factor: f64,
    #[serde(default = "default_initial_temp_per_block")]
    pub initial_temp_per_block: f64,
    #[serde(default = "default_freezing_temp")]
    pub freezing_temp: f64,
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: f64,
    #[serde(default = "default_moves_per_block")]
    pub moves_per_block: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    /// When set, the placed floorplan is rendered to this PNG file.
    #[serde(default)]
    pub render_png: Option<String>,
}

impl Default for FloorplanConfig {
    fn default() -> Self {
        Self {
            cooling_factor: default_cooling_factor(),
            initial_temp_per_block: default_initial_temp_per_block(),
            freezing_temp: default_freezing_temp(),
            reject_threshold: default_reject_threshold(),
            moves_per_block: default_moves_per_block(),
            seed: None,
            render_png: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PathfinderConfig {
    /// Seed for the start-vertex draw of each subpath search.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_cooling_factor() -> f64 {
    0.85
}

fn default_initial_temp_per_block() -> f64 {
    100_000.0
}

fn default_freezing_temp() -> f64 {
    10.0
}

fn default_reject_threshold() -> f64 {
    0.95
}

fn default_moves_per_block() -> usize {
    1
}
