use anyhow::Context;
use briefsmith::{
    AppState, BriefsmithConfig, Provider, ResearchCoordinator, api,
    cli::{
        Cli, Commands,
        init::{self, InitConfig, InitResult},
        output::Output,
    },
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match run(cli, output).await {
        Ok(code) => code,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins, then `--verbose`, then `server.log_level`.
fn init_logging(verbose: bool, json: bool, log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { log_level };
        EnvFilter::new(format!("briefsmith={level},tower_http={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli, output: Output) -> anyhow::Result<ExitCode> {
    let command = match cli.command {
        Commands::Init {
            path,
            force,
            provider,
            search,
        } => {
            init_logging(cli.verbose, cli.log_json, "warn");
            let result = init::run(
                InitConfig {
                    path,
                    force,
                    provider,
                    search,
                },
                &output,
            );
            return Ok(match result {
                InitResult::Success | InitResult::AlreadyExists => ExitCode::SUCCESS,
                InitResult::Error(_) => ExitCode::FAILURE,
            });
        }
        command => command,
    };

    let config = BriefsmithConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_logging(cli.verbose, cli.log_json, &config.server.log_level);

    match command {
        Commands::Research {
            query,
            concurrency,
            deadline,
            json,
            output: path,
        } => research(config, query, concurrency, deadline, json, path, output).await,
        Commands::Serve { host, port } => serve(config, host, port, output).await,
        Commands::Config { validate } => Ok(show_config(&config, &cli.config, validate, output).await),
        Commands::Init { .. } => Ok(ExitCode::SUCCESS),
    }
}

async fn research(
    config: BriefsmithConfig,
    query: String,
    concurrency: Option<usize>,
    deadline: Option<u64>,
    json: bool,
    path: Option<PathBuf>,
    output: Output,
) -> anyhow::Result<ExitCode> {
    let coordinator = ResearchCoordinator::from_config(&config)
        .await
        .context("Failed to set up research backends")?;
    let settings = coordinator
        .settings()
        .with_overrides(concurrency, deadline);
    let coordinator = coordinator.with_settings(settings);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with partial results");
            interrupt.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            output.progress(&event);
        }
    });

    let result = coordinator.research(&query, &cancel, Some(tx)).await;
    let _ = printer.await;

    let brief = match result {
        Ok(brief) => brief,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    for note in brief.degraded_sections() {
        output.warning(&note);
    }

    let document = if json {
        serde_json::to_string_pretty(&brief)?
    } else {
        brief.render()
    };

    match path {
        Some(path) => {
            std::fs::write(&path, document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!("Brief written to {}", path.display()));
        }
        None => println!("{}", document),
    }

    Ok(ExitCode::SUCCESS)
}

async fn serve(
    config: BriefsmithConfig,
    host: Option<String>,
    port: Option<u16>,
    output: Output,
) -> anyhow::Result<ExitCode> {
    let coordinator = ResearchCoordinator::from_config(&config)
        .await
        .context("Failed to set up research backends")?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let app = api::routes::app(AppState::new(config, coordinator));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.banner();
    output.success(&format!("Listening on http://{}", addr));
    output.hint("POST /api/research or /api/research/stream with {\"query\": \"...\"}");
    info!(%addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(ExitCode::SUCCESS)
}

async fn show_config(
    config: &BriefsmithConfig,
    path: &std::path::Path,
    validate: bool,
    output: Output,
) -> ExitCode {
    output.header("Configuration");
    output.kv("file", &path.display().to_string());

    output.header("Server");
    output.kv("host", &config.server.host);
    output.kv("port", &config.server.port.to_string());
    output.kv("log_level", &config.server.log_level);

    output.header("LLM");
    output.kv("provider", &format!("{:?}", config.llm.provider).to_lowercase());
    output.kv("base_url", &config.llm.base_url);
    output.kv("model", &config.llm.model);
    output.kv("api_key_env", &config.llm.api_key_env);
    output.kv("timeout_secs", &config.llm.timeout_secs.to_string());
    output.kv("max_retries", &config.llm.max_retries.to_string());

    output.header("Search");
    output.kv("provider", &format!("{:?}", config.search.provider).to_lowercase());
    output.kv("api_key_env", &config.search.api_key_env);
    output.kv("cx_env", &config.search.cx_env);
    output.kv("results_per_query", &config.search.results_per_query.to_string());
    output.kv("max_evidence_per_task", &config.search.max_evidence_per_task.to_string());

    output.header("Research");
    output.kv("max_tasks", &config.research.max_tasks.to_string());
    output.kv("concurrency", &config.research.concurrency.to_string());
    output.kv("deadline_secs", &config.research.deadline_secs.to_string());
    output.kv("grace_period_secs", &config.research.grace_period_secs.to_string());

    if !validate {
        return ExitCode::SUCCESS;
    }

    if let Err(e) = config.validate_env() {
        output.error(&e.to_string());
        return ExitCode::FAILURE;
    }

    match check_llm_backend(config).await {
        Ok(()) => {
            output.success("Configuration is valid and the LLM backend is reachable");
            ExitCode::SUCCESS
        }
        Err(e) => {
            output.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn check_llm_backend(config: &BriefsmithConfig) -> briefsmith::Result<()> {
    let provider = Provider::from_config(&config.llm)?;
    let client = provider.create_client().await?;
    client.health_check().await
}
