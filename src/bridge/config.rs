// Execution core configuration - the per-module configs it composes

use crate::agent::AgentConfig;
use crate::auth::AuthConfig;
use crate::brain::{BrainConfig, CliConfig};
use crate::executor::ExecutorConfig;

#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    pub auth: AuthConfig,
    pub brain: BrainConfig,
    pub cli: CliConfig,
    pub executor: ExecutorConfig,
    pub agent: AgentConfig,
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self {
            auth: AuthConfig::from_env(),
            brain: BrainConfig::from_env(),
            cli: CliConfig::from_env(),
            executor: ExecutorConfig::from_env(),
            agent: AgentConfig::from_env(),
        }
    }
}
