#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub const DEFAULT_API_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/users";
pub const DEFAULT_OUTPUT_PATH: &str = "user.csv";

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;
