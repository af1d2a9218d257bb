use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use api_workflow_agent::agent::Agent;
use api_workflow_agent::config::{AppSettings, LlmProvider, WorkflowCatalog};
use api_workflow_agent::error::AgentError;
use api_workflow_agent::prompt::ConsolePrompter;

#[derive(Parser)]
#[command(name = "api-workflow-agent")]
#[command(about = "Turn free-text requests into REST API calls")]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of workflow definitions (*.json)
    #[arg(long)]
    workflows: Option<PathBuf>,

    /// Base URL of the downstream API
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// LLM provider used for extraction, routing and summaries
    #[arg(long, env = "LLM_TYPE", value_enum)]
    llm: Option<LlmChoice>,

    /// Maximum parameter collection passes per request
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LlmChoice {
    #[value(name = "openai")]
    OpenAi,
    Anthropic,
}

impl From<LlmChoice> for LlmProvider {
    fn from(choice: LlmChoice) -> Self {
        match choice {
            LlmChoice::OpenAi => LlmProvider::OpenAI,
            LlmChoice::Anthropic => LlmProvider::Anthropic,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Chat,
    /// Process a single request
    Run {
        /// Request text
        text: String,
    },
    /// List the loaded workflows
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AgentError> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::List => {
            let catalog = WorkflowCatalog::load_dir(&settings.workflows_dir)?;
            print_catalog(&catalog);
            Ok(())
        }
        Commands::Run { text } => {
            let prompter = Arc::new(ConsolePrompter::new());
            let agent = Agent::from_settings(&settings, prompter)?;
            println!("{}", agent.process_request(&text).await);
            Ok(())
        }
        Commands::Chat => {
            let prompter = Arc::new(ConsolePrompter::new());
            let agent = Agent::from_settings(&settings, prompter.clone())?;
            chat(&agent, &prompter).await;
            Ok(())
        }
    }
}

/// 設定ファイルを読み、コマンドライン引数（または対応する環境変数）で上書きする
fn load_settings(cli: &Cli) -> Result<AppSettings, AgentError> {
    let mut settings = match &cli.config {
        Some(path) => AppSettings::from_file(path)?,
        None => AppSettings::default(),
    };

    if let Some(dir) = &cli.workflows {
        settings.workflows_dir = dir.clone();
    }
    if let Some(base_url) = &cli.base_url {
        settings.api.base_url = base_url.clone();
    }
    if let Some(llm) = cli.llm {
        settings.llm.provider = llm.into();
    }
    if let Some(max_iterations) = cli.max_iterations {
        settings.engine.max_iterations = max_iterations;
    }

    settings.validate()?;
    Ok(settings)
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "api-workflow-agent.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(cli.log_dir.is_none());

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}

fn print_catalog(catalog: &WorkflowCatalog) {
    println!("📋 Available workflows ({}):", catalog.len());
    for spec in catalog.iter() {
        println!("  - {}", spec.api_name());
        println!("    {} {}", spec.method(), spec.endpoint());
        println!("    {}", spec.description().unwrap_or("No description"));
    }
}

async fn chat(agent: &Agent, prompter: &ConsolePrompter) {
    println!("{}", "=".repeat(60));
    println!("🚀 API Workflow Agent");
    println!("{}", "=".repeat(60));
    print_catalog(agent.catalog());
    println!("\nType 'exit' to quit\n");

    loop {
        let Some(line) = prompter.read_line("You: ").await else {
            break;
        };

        if matches!(line.to_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let reply = agent.process_request(&line).await;
        println!("\n🤖 Agent: {reply}\n");
    }

    println!("👋 Goodbye!");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn env_of(name: &str) -> Option<String> {
        Cli::command()
            .get_arguments()
            .find(|arg| arg.get_id() == name)
            .and_then(|arg| arg.get_env())
            .map(|env| env.to_string_lossy().into_owned())
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_read_from_environment() {
        assert_eq!(env_of("base_url").as_deref(), Some("API_BASE_URL"));
        assert_eq!(env_of("llm").as_deref(), Some("LLM_TYPE"));
    }

    #[test]
    fn test_load_settings_applies_overrides() {
        let cli = Cli::try_parse_from([
            "api-workflow-agent",
            "--base-url",
            "http://api.internal:9000/api/v1",
            "--llm",
            "anthropic",
            "--max-iterations",
            "3",
            "list",
        ])
        .unwrap();

        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.api.base_url, "http://api.internal:9000/api/v1");
        assert_eq!(settings.llm.provider, LlmProvider::Anthropic);
        assert_eq!(settings.engine.max_iterations, 3);
    }

    #[test]
    fn test_llm_choice_names() {
        let cli = Cli::try_parse_from(["api-workflow-agent", "--llm", "openai", "list"]).unwrap();
        assert_eq!(cli.llm, Some(LlmChoice::OpenAi));
        assert!(Cli::try_parse_from(["api-workflow-agent", "--llm", "gemini", "list"]).is_err());
    }
}
