use anyhow::{Context, Result};
use bitbucket_runner::cli::commands::{
    pipeline_path, ConfigCommand, ListCommand, RunCommand, ValidateCommand,
};
use bitbucket_runner::cli::output::*;
use bitbucket_runner::cli::{Cli, Command};
use bitbucket_runner::core::{ExecutionContext, ExecutionStatus, PipelineDocument, RunnerConfig};
use bitbucket_runner::execution::{DryRunExecutor, ExecutionEngine, ExecutionEvent};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const MAX_OUTPUT_LINES: usize = 20;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // The runner config decides the default log level, so load it first
    let loaded = RunnerConfig::load_default();
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        loaded
            .as_ref()
            .map(|config| config.logging.level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let runner_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring runner configuration: {}", e);
            RunnerConfig::default()
        }
    };

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &runner_config)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_pipelines(cmd)?,
        Command::Config(cmd) => show_config(cmd, runner_config)?,
    }

    Ok(())
}

fn run_pipeline(cmd: &RunCommand, runner_config: &RunnerConfig) -> Result<()> {
    let path = pipeline_path(cmd.file.as_deref())?;
    let document = PipelineDocument::from_file(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let pipeline = document.select(&cmd.pipeline)?.clone();

    println!(
        "{} Loaded {} from {}",
        INFO,
        style(&cmd.pipeline).bold(),
        style(path.display()).dim()
    );

    let working_dir = cmd
        .workdir
        .clone()
        .unwrap_or_else(|| runner_config.defaults.working_dir.clone());
    let mut context = ExecutionContext::new(Some(pipeline), working_dir);

    for (key, value) in &runner_config.environment {
        context.set_env(key, value);
    }
    for (key, value) in &cmd.env {
        context.set_env(key, value);
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let image = document
        .image
        .clone()
        .unwrap_or_else(|| runner_config.defaults.image.clone());
    let mut engine = ExecutionEngine::new(DryRunExecutor::new().with_fallback_image(image));

    engine.add_event_handler(|event| {
        println!("{}", format_execution_event(event));
        if let ExecutionEvent::StepFinished { result } = event {
            if !result.stdout().is_empty() {
                println!("{}", style(format_output(result.stdout(), MAX_OUTPUT_LINES)).dim());
            }
        }
    });

    println!();
    let status = engine.execute(&mut context)?;

    match status {
        ExecutionStatus::Completed => {
            println!(
                "\n{} {} completed {} in {}",
                CHECK,
                style(&cmd.pipeline).bold(),
                style("successfully").green(),
                format_duration(context.total_duration())
            );
        }
        _ => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&cmd.pipeline).bold(),
                format_status(status)
            );
            if let Some(message) = context.error_message() {
                error!("{}", message);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    let path = pipeline_path(cmd.file.as_deref())?;
    if !cmd.json {
        println!("{} Validating {}...", INFO, style(path.display()).dim());
    }

    match PipelineDocument::from_file(&path) {
        Ok(document) => {
            let pipelines = document.list_pipelines();
            if cmd.json {
                let data = serde_json::json!({
                    "valid": true,
                    "file": path.display().to_string(),
                    "pipelines": pipelines.iter().map(ToString::to_string).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Pipeline configuration is valid!", CHECK);
                if let Some(image) = &document.image {
                    println!("  Image: {}", style(image).bold());
                }
                println!("  Pipelines: {}", style(pipelines.len()).cyan());
            }
            Ok(())
        }
        Err(e) => {
            if cmd.json {
                let data = serde_json::json!({
                    "valid": false,
                    "file": path.display().to_string(),
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Validation failed:", CROSS);
                println!("  {}", style(e).red());
            }
            std::process::exit(1);
        }
    }
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let path = pipeline_path(cmd.file.as_deref())?;
    let document = PipelineDocument::from_file(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let entries: Vec<_> = document
        .list_pipelines()
        .into_iter()
        .map(|selector| {
            let steps = document.select(&selector).map(|p| p.len()).unwrap_or(0);
            (selector, steps)
        })
        .collect();

    if cmd.json {
        let pipelines: Vec<_> = entries
            .iter()
            .map(|(selector, steps)| {
                serde_json::json!({
                    "name": selector.to_string(),
                    "channel": selector.channel(),
                    "steps": steps,
                })
            })
            .collect();
        let data = serde_json::json!({ "pipelines": pipelines });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{} No pipelines found in {}", INFO, path.display());
        return Ok(());
    }

    println!("{} Pipelines in {}:", INFO, style(path.display()).dim());
    for (selector, steps) in &entries {
        if cmd.with_steps {
            println!(
                "  {} ({} steps)",
                style(selector).bold(),
                style(steps).cyan()
            );
        } else {
            println!("  {}", style(selector).bold());
        }
    }

    Ok(())
}

fn show_config(cmd: &ConfigCommand, resolved: RunnerConfig) -> Result<()> {
    let config = match &cmd.file {
        Some(file) => RunnerConfig::from_file(file)
            .with_context(|| format!("Failed to load runner configuration {}", file))?,
        None => resolved,
    };

    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}
