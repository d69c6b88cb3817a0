//! Generate command - run the full pipeline for one prompt.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use forge_agents::AgentConfig;
use forge_core::{EventHub, JobEvent, JobStatus, JobStore, Orchestrator};

#[derive(Args)]
pub struct GenerateArgs {
    /// The application prompt
    #[arg(short, long)]
    prompt: String,

    /// Write generated files into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force the offline mock agents regardless of environment
    #[arg(long, env = "APPFORGE_USE_MOCK")]
    mock: bool,

    /// Do not stream live log entries
    #[arg(long)]
    quiet: bool,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let store = Arc::new(JobStore::new());
    let hub = Arc::new(EventHub::new());

    let config = if args.mock {
        AgentConfig::mock()
    } else {
        AgentConfig::from_env()
    };
    let (executor, analyzer) = config.build(hub.clone());
    let orchestrator = Orchestrator::new(store, hub, executor, analyzer);

    let job_id = orchestrator.submit(&args.prompt).await;
    info!("Submitted job {job_id}");

    let (history, _, mut rx) = orchestrator.subscribe(&job_id).await?;
    if !args.quiet {
        for entry in &history {
            println!("[{}] {}", entry.agent, entry.message);
        }
    }

    // Stream live events until the pipeline's background task finishes.
    let wait = orchestrator.store().wait(&job_id);
    tokio::pin!(wait);
    loop {
        tokio::select! {
            _ = &mut wait => break,
            event = rx.recv() => match event {
                Ok(JobEvent::Log(entry)) => {
                    if !args.quiet {
                        println!("[{}] {}", entry.agent, entry.message);
                    }
                }
                Ok(JobEvent::ProgressUpdate { .. }) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }

    let job = orchestrator.get_job(&job_id).await?;
    match job.status {
        JobStatus::Completed => println!("Job {job_id} completed"),
        JobStatus::Failed => {
            anyhow::bail!(
                "job failed: {}",
                job.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        other => anyhow::bail!("job ended in unexpected state {:?}", other),
    }

    let results = job
        .results
        .context("completed job carries no results")?;

    if let Some(report) = &results.validation {
        if report.valid {
            println!("Validation passed ({} files)", report.file_count);
        } else {
            println!(
                "Validation found {} issues in {} files:",
                report.error_count,
                report.errors.len()
            );
            for (file, errors) in &report.errors {
                for error in errors {
                    println!("  {file}: {error}");
                }
            }
        }
    }

    if let Some(output) = &args.output {
        let files = if results.processed_code.is_empty() {
            &results.code
        } else {
            &results.processed_code
        };
        for (name, content) in files {
            let path = output.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, content)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        println!("Wrote {} files to {}", files.len(), output.display());
    }

    Ok(())
}
