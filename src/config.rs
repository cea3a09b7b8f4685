use crate::utils::get_env_var_or;
use ethers::types::Address;
use std::env;
use std::str::FromStr;

/// Environment-provided settings. The chain pieces are optional: without
/// `RPC_URL` and `FACTORY_ADDRESS` the chain-backed endpoints and the
/// watchers are disabled, but the process still serves everything else.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rpc_url: Option<String>,
    pub factory_address: Option<Address>,
}

impl Config {
    pub fn from_env() -> Result<Config, String> {
        let port = get_env_var_or("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| format!("invalid PORT: {}", e))?;

        let rpc_url = env::var("RPC_URL").ok().filter(|v| !v.is_empty());
        let factory_address = match env::var("FACTORY_ADDRESS").ok().filter(|v| !v.is_empty()) {
            Some(raw) => Some(
                Address::from_str(&raw).map_err(|e| format!("invalid FACTORY_ADDRESS: {}", e))?,
            ),
            None => None,
        };

        Ok(Config {
            port,
            rpc_url,
            factory_address,
        })
    }

    /// Both pieces of chain configuration, or `None` if either is missing.
    pub fn chain_settings(&self) -> Option<(&str, Address)> {
        match (&self.rpc_url, self.factory_address) {
            (Some(url), Some(factory)) => Some((url.as_str(), factory)),
            _ => None,
        }
    }
}
