//! Init command implementation
//!
//! Scaffolds `briefsmith.toml` and `.env.example` for a new project.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// briefsmith.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama or openai)
    pub provider: String,
    /// Search backend to configure (duckduckgo or google)
    pub search: String,
}

pub const CONFIG_FILE: &str = "briefsmith.toml";

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Briefsmith");

    let base_path = &config.path;
    if !base_path.exists()
        && let Err(e) = fs::create_dir_all(base_path)
    {
        output.error(&format!("Failed to create {}: {}", base_path.display(), e));
        return InitResult::Error(e.to_string());
    }

    let config_path = base_path.join(CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = write_file(&config_path, &generate_config_toml(&config), config.force) {
        output.error(&format!("Failed to create {}: {}", CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", CONFIG_FILE);

    let env_example_path = base_path.join(".env.example");
    if env_example_path.exists() && !config.force {
        output.skipped(".env.example", "already exists");
    } else if let Err(e) = write_file(&env_example_path, &generate_env_example(&config), true) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("env", ".env.example");
    }

    output.complete("Briefsmith project initialized successfully!");

    output.header("Next Steps");
    let mut step = 1;
    if config.provider == "openai" || config.search == "google" {
        output.info(&format!("{}. Set up environment variables:", step));
        output.command("cp .env.example .env");
        step += 1;
    }
    if config.provider == "ollama" {
        output.info(&format!("{}. Start Ollama (if not running):", step));
        output.command("ollama serve");
        output.command("ollama pull llama3");
        step += 1;
    }
    output.info(&format!("{}. Research something:", step));
    output.command("briefsmith research \"Renewable energy trends\"");

    output.hint("Run 'briefsmith serve' to expose the HTTP API instead");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_config_toml(config: &InitConfig) -> String {
    let llm_section = if config.provider == "openai" {
        r#"[llm]
provider = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
# Name of the environment variable holding the API key
api_key_env = "OPENAI_API_KEY"
"#
    } else {
        r#"[llm]
provider = "ollama"
base_url = "http://localhost:11434"
model = "llama3"
"#
    };

    let search_section = if config.search == "google" {
        r#"[search]
provider = "google"
# Names of the environment variables holding the credentials
api_key_env = "GOOGLE_API_KEY"
cx_env = "GOOGLE_CX"
"#
    } else {
        r#"[search]
provider = "duckduckgo"
"#
    };

    format!(
        r#"# Briefsmith configuration
# Secrets are never stored here; sections name the environment variables to read.

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"

{llm_section}temperature = 0.3
max_tokens = 1024
timeout_secs = 60
max_retries = 2
retry_backoff_ms = 500

{search_section}results_per_query = 5
max_evidence_per_task = 8
timeout_secs = 15
max_retries = 1
retry_backoff_ms = 250

[research]
max_tasks = 5
concurrency = 3
deadline_secs = 120
grace_period_secs = 5
"#
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    let mut content = String::from("# Copy to .env and fill in the values\n\n");
    if config.provider == "openai" {
        content.push_str("OPENAI_API_KEY=sk-...\n");
    }
    if config.search == "google" {
        content.push_str("GOOGLE_API_KEY=\nGOOGLE_CX=\n");
    }
    content.push_str("\n# Log filter, overrides server.log_level\n# RUST_LOG=briefsmith=debug\n");
    content
}
