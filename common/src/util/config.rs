use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_present_factor")]
    pub present_factor: f64,
    #[serde(default = "default_present_multiplier")]
    pub present_multiplier: f64,
    #[serde(default = "default_history_increment")]
    pub history_increment: f64,
    #[serde(default = "default_history_weight")]
    pub history_weight: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            present_factor: default_present_factor(),
            present_multiplier: default_present_multiplier(),
            history_increment: default_history_increment(),
            history_weight: default_history_weight(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_graph_file")]
    pub graph_file: String,
    #[serde(default = "default_placement_file")]
    pub placement_file: String,
    #[serde(default = "default_netlist_file")]
    pub netlist_file: String,
    #[serde(default = "default_output_route")]
    pub output_route: String,
    #[serde(default = "default_route_width")]
    pub route_width: u32,
    #[serde(default)]
    pub heatmap: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            graph_file: default_graph_file(),
            placement_file: default_placement_file(),
            netlist_file: default_netlist_file(),
            output_route: default_output_route(),
            route_width: default_route_width(),
            heatmap: None,
        }
    }
}

fn default_max_iterations() -> usize {
    100
}

fn default_present_factor() -> f64 {
    0.5
}

fn default_present_multiplier() -> f64 {
    1.5
}

fn default_history_increment() -> f64 {
    1.0
}

fn default_history_weight() -> f64 {
    1.0
}

fn default_graph_file() -> String {
    "inputs/design.graph".to_string()
}

fn default_placement_file() -> String {
    "inputs/design.place".to_string()
}

fn default_netlist_file() -> String {
    "inputs/design.net".to_string()
}

fn default_output_route() -> String {
    "output/design.route".to_string()
}

// Width code the netlist uses for 1-bit nets.
fn default_route_width() -> u32 {
    16
}
