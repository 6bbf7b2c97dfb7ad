mod app_config;
mod engine;
mod files;
mod modules;

pub use app_config::*;
pub use engine::*;
pub use files::*;
pub use modules::*;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Native platform a digest is computed for
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    /// Union of iOS and Android inputs
    #[default]
    All,
}

impl Platform {
    pub const EVERY: [Platform; 3] = [Platform::Ios, Platform::Android, Platform::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::All => "all",
        }
    }

    pub fn includes_ios(&self) -> bool {
        matches!(self, Platform::Ios | Platform::All)
    }

    pub fn includes_android(&self) -> bool {
        matches!(self, Platform::Android | Platform::All)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
