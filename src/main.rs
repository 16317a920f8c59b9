use anyhow::{bail, Context};
use clap::{ArgGroup, Args, Parser, Subcommand};
use colored::*;
use docforge::{
    cli,
    documents::{write_documents, GeneratedDocument},
    logging,
    pipeline::DocumentationPipeline,
    queue::InstructionQueue,
    sources::{self, build_file_tree},
    Config, OpenAiBackend,
};
use indicatif::ProgressBar;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docforge", author, version, about = "Generate documentation for a code project with an LLM")]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults to <config dir>/docforge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the files of a project directory or ZIP archive
    Files {
        path: PathBuf,
    },
    /// Run one or more instructions over a project and write the documents
    Generate(GenerateArgs),
    /// Ask for instructions and files interactively
    Interactive {
        path: PathBuf,
        /// Model for this run
        #[arg(long)]
        model: Option<String>,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["path", "github"])))]
struct GenerateArgs {
    /// Project directory or ZIP archive
    path: Option<PathBuf>,

    /// GitHub repository to clone (owner/repo or URL)
    #[arg(long)]
    github: Option<String>,

    /// Instruction, repeatable; may end with [markdown|pdf|word|html|zip]
    #[arg(short, long = "instruction", required = true)]
    instructions: Vec<String>,

    /// Comma separated files to analyze, relative to the project
    #[arg(long, value_delimiter = ',')]
    files: Vec<String>,

    /// Model for this run
    #[arg(long)]
    model: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };

    match cli.command {
        Command::Files { path } => list_files(&path, &config),
        Command::Generate(args) => {
            if let Some(output) = &args.output {
                config.output_dir = output.clone();
            }
            config.validate().await?;
            let root = match (&args.path, &args.github) {
                (_, Some(repo)) => clone_project(repo, &config).await?,
                (Some(path), None) => resolve_project(path, &config)?,
                (None, None) => bail!("A project path or --github is required"),
            };
            let queue = InstructionQueue::from_input(&args.instructions.join("\n"));
            run_queue(queue, &root, &args.files, args.model.as_deref(), &config).await
        }
        Command::Interactive { path, model, output } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            config.validate().await?;
            run_interactive(&path, model.as_deref(), &config).await
        }
    }
}

fn list_files(path: &Path, config: &Config) -> anyhow::Result<()> {
    let root = resolve_project(path, config)?;
    let files = sources::list_project_files(&root, &config.sources.ignored_names)?;
    println!("{} {}", "Project:".bright_white().bold(), root.display());
    cli::print_file_tree(&build_file_tree(&files));
    println!("\n{} file(s)", files.len());
    Ok(())
}

/// A directory is used as is; a `.zip` file is extracted under the upload directory first
fn resolve_project(path: &Path, config: &Config) -> anyhow::Result<PathBuf> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }
    let is_zip = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if path.is_file() && is_zip {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let project = sources::extract_zip_upload(
            &bytes,
            &config.sources.upload_dir,
            &config.sources.ignored_names,
        )?;
        info!("Extracted {} into {}", path.display(), project.extract_path.display());
        return Ok(project.extract_path);
    }
    bail!("{} is neither a directory nor a .zip archive", path.display())
}

async fn clone_project(repo: &str, config: &Config) -> anyhow::Result<PathBuf> {
    let slug = sources::parse_repo_slug(repo)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Cloning {}", slug));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let project = sources::clone_repository(
        &slug,
        &config.sources.upload_dir,
        config.api_keys.github_token.as_deref(),
        &config.sources.ignored_names,
    )
    .await;
    spinner.finish_and_clear();

    let project = project?;
    cli::print_info(&format!("Cloned {} ({} files)", slug, project.files.len()));
    Ok(project.extract_path)
}

async fn run_interactive(path: &Path, model: Option<&str>, config: &Config) -> anyhow::Result<()> {
    cli::print_banner();
    let root = resolve_project(path, config)?;
    let files = sources::list_project_files(&root, &config.sources.ignored_names)?;
    cli::print_file_tree(&build_file_tree(&files));

    let selected = cli::select_files(&files)?;
    let queue = cli::prompt_instructions()?;
    if queue.is_empty() {
        cli::print_warning("No instructions given, nothing to do");
        return Ok(());
    }
    run_queue(queue, &root, &selected, model, config).await
}

async fn run_queue(
    mut queue: InstructionQueue,
    root: &Path,
    selected: &[String],
    model: Option<&str>,
    config: &Config,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if config.api_keys.openai_api_key.is_none() {
        config.api_keys.prompt_missing_keys()?;
    }

    let files = sources::collect_sources(root, selected, &config.sources)?;
    let backend = OpenAiBackend::new(&config)?;
    let pipeline = DocumentationPipeline::from_settings(backend, &config.llm);

    let mut progress = cli::QueueProgress::new();
    let outcomes = queue
        .run_all(&pipeline, &files, model, |instruction, state| progress.observe(instruction, state))
        .await;

    let mut documents = Vec::new();
    let mut failures = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(doc) => documents.push(GeneratedDocument::from_result(
                &outcome.instruction.text,
                outcome.instruction.format,
                doc.content,
            )),
            Err(e) => {
                failures += 1;
                cli::print_error(&format!("[ERROR] {}: {}", outcome.instruction.text, e));
            }
        }
    }

    for path in write_documents(&documents, &config.output_dir)? {
        println!("{} {}", "Wrote".green(), path.display());
    }
    if failures > 0 {
        bail!("{} instruction(s) failed", failures);
    }
    Ok(())
}
