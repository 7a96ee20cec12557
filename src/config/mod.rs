// Configuration management module
// Handles TOML settings, API credentials and interactive setup

pub mod credentials;
pub mod interactive;
pub mod settings;


pub use credentials::Credentials;
pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, DATA_DIR_ENV, GoogleConfig, OpenAiConfig};
