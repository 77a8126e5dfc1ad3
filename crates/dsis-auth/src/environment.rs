//! DSIS gateway environments.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A DSIS API gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Qa,
    Prod,
}

impl Environment {
    /// Every environment, in promotion order.
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Qa, Environment::Prod];

    /// Gateway base URL for this environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Dev => "https://api-dev.gateway.equinor.com",
            Environment::Qa => "https://api-test.gateway.equinor.com",
            Environment::Prod => "https://api.gateway.equinor.com",
        }
    }

    /// Lowercase tag used in configuration files and environment variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "qa" => Ok(Environment::Qa),
            "prod" => Ok(Environment::Prod),
            other => Err(Error::configuration(format!(
                "'environment' must be one of dev, qa, prod (got '{other}')"
            ))),
        }
    }
}
