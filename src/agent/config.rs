// Agent configuration

use super::AgentConfig;
use crate::config::parse_env_var;

impl AgentConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = AgentConfig::default();
        config.max_tool_rounds = parse_env_var("TOOL_MAX_ROUNDS", config.max_tool_rounds);
        config
    }
}
