//! The job state machine: submission, sequential stage execution,
//! validation with one bounded auto-fix cycle, and post-processing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use forge_normalize::normalize;
use forge_validate::{fix_code, validate_project, ValidationReport};

use crate::error::{AgentError, CoreError, CoreResult};
use crate::events::{EventHub, JobEvent, LogEntry, LogStatus, ProgressSnapshot};
use crate::executor::{AgentExecutor, PromptAnalyzer};
use crate::job::{Job, JobId, JobStatus};
use crate::requirements::Requirements;
use crate::stage::{Stage, StageContext};
use crate::store::JobStore;

/// Outcome of an on-demand `fix_validation` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FixOutcome {
    /// The report was absent or already clean; nothing to do.
    AlreadyClean,
    Repaired { files_fixed: usize, valid: bool },
}

/// Drives jobs through `analyzing -> running -> completed | failed`.
///
/// One background task per job; jobs never touch each other's state. The
/// store and hub are shared, injected at construction.
pub struct Orchestrator {
    store: Arc<JobStore>,
    hub: Arc<EventHub>,
    executor: Arc<dyn AgentExecutor>,
    analyzer: Arc<dyn PromptAnalyzer>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<JobStore>,
        hub: Arc<EventHub>,
        executor: Arc<dyn AgentExecutor>,
        analyzer: Arc<dyn PromptAnalyzer>,
    ) -> Self {
        Self {
            store,
            hub,
            executor,
            analyzer,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Create a job and launch its pipeline in the background. Returns
    /// immediately with the new id; re-submitting a prompt always creates a
    /// fresh job rather than mutating an existing one.
    pub async fn submit(&self, prompt: &str) -> JobId {
        let job_id = Uuid::new_v4().to_string();
        info!(job_id, "job submitted");

        self.store.insert(Job::new(job_id.clone(), prompt)).await;
        self.hub.register(&job_id).await;

        let store = Arc::clone(&self.store);
        let hub = Arc::clone(&self.hub);
        let executor = Arc::clone(&self.executor);
        let analyzer = Arc::clone(&self.analyzer);
        let id = job_id.clone();
        let prompt = prompt.to_string();

        let handle = tokio::spawn(async move {
            run_job(store, hub, executor, analyzer, id, prompt).await;
        });
        self.store.attach_handle(&job_id, handle).await;

        job_id
    }

    pub async fn get_job(&self, job_id: &str) -> CoreResult<Job> {
        self.store
            .get(job_id)
            .await
            .ok_or_else(|| CoreError::UnknownJob(job_id.to_string()))
    }

    pub async fn get_logs(&self, job_id: &str) -> CoreResult<Vec<LogEntry>> {
        if !self.store.contains(job_id).await {
            return Err(CoreError::UnknownJob(job_id.to_string()));
        }
        Ok(self.hub.logs(job_id).await)
    }

    /// History plus snapshot plus a live receiver; the caller replays the
    /// first two before draining the third.
    pub async fn subscribe(
        &self,
        job_id: &str,
    ) -> CoreResult<(Vec<LogEntry>, ProgressSnapshot, broadcast::Receiver<JobEvent>)> {
        self.hub
            .subscribe(job_id)
            .await
            .ok_or_else(|| CoreError::UnknownJob(job_id.to_string()))
    }

    /// Re-run the best-effort fix + revalidation pass for a finished job.
    ///
    /// A clean or absent report is a reported no-op, not an error.
    pub async fn fix_validation(&self, job_id: &str) -> CoreResult<FixOutcome> {
        let job = self.get_job(job_id).await?;

        let Some(results) = job.results else {
            self.hub
                .append(job_id, "Code Validator", "No validation issues to fix", LogStatus::Completed)
                .await;
            return Ok(FixOutcome::AlreadyClean);
        };
        let needs_fix = results.validation.as_ref().is_some_and(|r| !r.valid);
        if !needs_fix {
            self.hub
                .append(job_id, "Code Validator", "No validation issues to fix", LogStatus::Completed)
                .await;
            return Ok(FixOutcome::AlreadyClean);
        }
        let report = results.validation.as_ref().cloned().unwrap_or_default();

        let mut code = results.code.clone();
        let files_fixed = apply_fix_pass(&mut code, &report);

        if files_fixed > 0 {
            self.hub
                .append(
                    job_id,
                    "Code Validator",
                    &format!("Fixed issues in {files_fixed} files. Re-validating code..."),
                    LogStatus::Completed,
                )
                .await;
        } else {
            self.hub
                .append(
                    job_id,
                    "Code Validator",
                    "Could not auto-fix the reported issues",
                    LogStatus::Warning,
                )
                .await;
        }

        let new_report = validate_project(&categorize(&code)).await;
        let valid = new_report.valid;
        let processed = post_process(&code);
        self.store
            .update(job_id, |job| {
                let results = job.results_mut();
                results.code = code;
                results.processed_code = processed;
                results.validation = Some(new_report);
            })
            .await;

        Ok(FixOutcome::Repaired { files_fixed, valid })
    }
}

/// Top-level wrapper: whatever happens inside the pipeline, the job ends in
/// a terminal state.
async fn run_job(
    store: Arc<JobStore>,
    hub: Arc<EventHub>,
    executor: Arc<dyn AgentExecutor>,
    analyzer: Arc<dyn PromptAnalyzer>,
    job_id: JobId,
    prompt: String,
) {
    match run_pipeline(&store, &hub, &*executor, &*analyzer, &job_id, &prompt).await {
        Ok(()) => {
            store
                .update(&job_id, |job| job.status = JobStatus::Completed)
                .await;
            hub.append(
                &job_id,
                "System",
                "All agents completed successfully",
                LogStatus::Completed,
            )
            .await;
        }
        Err(e) => {
            error!(job_id, "job failed: {e}");
            let message = e.to_string();
            store
                .update(&job_id, |job| {
                    job.status = JobStatus::Failed;
                    job.error = Some(message.clone());
                })
                .await;
            hub.append(&job_id, "System", &format!("Error: {message}"), LogStatus::Failed)
                .await;
        }
    }
}

async fn run_pipeline(
    store: &JobStore,
    hub: &EventHub,
    executor: &dyn AgentExecutor,
    analyzer: &dyn PromptAnalyzer,
    job_id: &str,
    prompt: &str,
) -> CoreResult<()> {
    hub.append(
        job_id,
        "Prompt Analyzer",
        "Analyzing your prompt to extract detailed requirements...",
        LogStatus::Info,
    )
    .await;

    let requirements = match analyzer.analyze(prompt).await {
        Ok(mut req) => {
            if req.original_prompt.is_empty() {
                req.original_prompt = prompt.to_string();
            }
            hub.append(
                job_id,
                "Prompt Analyzer",
                &format!(
                    "Analysis complete: identified {} features and technical requirements",
                    req.features.len()
                ),
                LogStatus::Info,
            )
            .await;
            for line in [
                format!("App Name: {}", req.app_name),
                format!("Framework: {}", display_or(&req.framework)),
                format!("Backend: {}", display_or(&req.backend)),
                format!("Database: {}", display_or(&req.database)),
            ] {
                hub.append(job_id, "Prompt Analyzer", &line, LogStatus::Info).await;
            }
            req
        }
        Err(e) => {
            // Analysis failure is never fatal; fall back to the raw prompt.
            warn!(job_id, "prompt analysis failed: {e}");
            hub.append(
                job_id,
                "Prompt Analyzer",
                &format!("Prompt analysis failed ({e}). Continuing with the original prompt."),
                LogStatus::Warning,
            )
            .await;
            Requirements::fallback(prompt)
        }
    };

    store
        .update(job_id, |job| {
            job.requirements = Some(requirements.clone());
            job.status = JobStatus::Running;
        })
        .await;

    hub.append(job_id, "System", "Setting up agent tasks", LogStatus::Info)
        .await;
    hub.append(job_id, "System", "Starting agents", LogStatus::Info)
        .await;

    let mut stage_outputs: BTreeMap<String, Value> = BTreeMap::new();
    let mut code: BTreeMap<String, String> = BTreeMap::new();

    for stage in Stage::pipeline() {
        let task = stage.task(&requirements);
        let label = stage.agent_label();

        hub.append(
            job_id,
            label,
            &format!("Started working on: {}", task.summary()),
            LogStatus::Running,
        )
        .await;

        let context = StageContext {
            job_id: job_id.to_string(),
            prompt: requirements.effective_prompt().to_string(),
            upstream: stage
                .upstream()
                .iter()
                .filter_map(|dep| {
                    stage_outputs
                        .get(dep.key())
                        .map(|v| (dep.key().to_string(), v.clone()))
                })
                .collect(),
        };

        let raw = match executor.run_stage(&task, &context).await {
            Ok(raw) => raw,
            Err(e) => {
                report_stage_failure(hub, job_id, &e).await;
                return Err(CoreError::StageFailed {
                    stage: stage.key(),
                    source: e,
                });
            }
        };

        let files = normalize(&raw);
        for (name, content) in files {
            if code.get(&name).is_some_and(|existing| *existing != content) {
                hub.append(
                    job_id,
                    "System",
                    &format!("File {name} regenerated by {label}; keeping the newer version"),
                    LogStatus::Warning,
                )
                .await;
            }
            code.insert(name, content);
        }
        stage_outputs.insert(stage.key().to_string(), raw.clone());

        store
            .update(job_id, |job| {
                let results = job.results_mut();
                results.stages.insert(stage.key().to_string(), raw);
                results.code = code.clone();
            })
            .await;

        hub.append(
            job_id,
            label,
            &format!("Completed: {}", task.summary()),
            LogStatus::Completed,
        )
        .await;
    }

    // Validation with at most one fix-and-revalidate cycle.
    hub.append(
        job_id,
        "Code Validator",
        "Running code validation on generated files...",
        LogStatus::Running,
    )
    .await;

    let mut report = validate_project(&categorize(&code)).await;
    if report.valid {
        hub.append(job_id, "Code Validator", "Code validation passed", LogStatus::Completed)
            .await;
    } else {
        hub.append(
            job_id,
            "Code Validator",
            &format!(
                "Found {} issues in generated code. Attempting automatic fixes...",
                report.error_count
            ),
            LogStatus::Running,
        )
        .await;

        let files_fixed = apply_fix_pass(&mut code, &report);
        if files_fixed > 0 {
            hub.append(
                job_id,
                "Code Validator",
                &format!("Fixed issues in {files_fixed} files. Re-validating code..."),
                LogStatus::Completed,
            )
            .await;
            report = validate_project(&categorize(&code)).await;
        } else {
            hub.append(
                job_id,
                "Code Validator",
                "Could not auto-fix all issues; review the validation report",
                LogStatus::Warning,
            )
            .await;
        }
    }

    let processed = post_process(&code);
    hub.append(
        job_id,
        "Code Processor",
        &format!("Successfully processed {} code files", processed.len()),
        LogStatus::Completed,
    )
    .await;

    store
        .update(job_id, |job| {
            let results = job.results_mut();
            results.code = code;
            results.processed_code = processed;
            results.validation = Some(report);
        })
        .await;

    Ok(())
}

/// Narrate an executor failure with a timeout-vs-generic distinction before
/// the job is failed.
async fn report_stage_failure(hub: &EventHub, job_id: &str, error: &AgentError) {
    match error {
        AgentError::Timeout { seconds } => {
            hub.append(
                job_id,
                "System",
                &format!(
                    "Error: agent connection timed out after {seconds} seconds. The task is too complex for the current timeout setting."
                ),
                LogStatus::Failed,
            )
            .await;
            hub.append(
                job_id,
                "System",
                "Suggestion: enable mock mode for testing, or raise the agent timeout in the configuration.",
                LogStatus::Failed,
            )
            .await;
        }
        AgentError::Connection(details) => {
            hub.append(
                job_id,
                "System",
                &format!("Error: connection issue with the agent service. Details: {details}"),
                LogStatus::Failed,
            )
            .await;
        }
        AgentError::Other(details) => {
            hub.append(job_id, "System", &format!("Error: {details}"), LogStatus::Failed)
                .await;
        }
    }
}

fn display_or(value: &str) -> &str {
    if value.trim().is_empty() {
        "Not specified"
    } else {
        value
    }
}

/// Split a merged file map into validator categories by filename.
fn categorize(code: &BTreeMap<String, String>) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut categories: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (name, content) in code {
        let category = if name.ends_with(".py") {
            "backend"
        } else if [".js", ".jsx", ".ts", ".tsx", ".html", ".htm", ".css"]
            .iter()
            .any(|ext| name.ends_with(ext))
        {
            "frontend"
        } else {
            "other"
        };
        categories
            .entry(category.to_string())
            .or_default()
            .insert(name.clone(), content.clone());
    }
    categories
}

/// Apply the heuristic fixer to every file the report flagged. Returns how
/// many files actually changed.
fn apply_fix_pass(code: &mut BTreeMap<String, String>, report: &ValidationReport) -> usize {
    let mut files_fixed = 0;
    for (key, errors) in &report.errors {
        // Keys are `category/filename`; the file map is keyed by filename.
        let Some((_, filename)) = key.split_once('/') else {
            continue;
        };
        let Some(content) = code.get(filename) else {
            continue;
        };
        let fixed = fix_code(filename, content, errors);
        if fixed != *content {
            code.insert(filename.to_string(), fixed);
            files_fixed += 1;
        }
    }
    files_fixed
}

fn import_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:import .+|from .+ import .+)$").expect("import regex is valid")
    })
}

const CODE_EXTENSIONS: [&str; 8] = [".py", ".js", ".jsx", ".ts", ".tsx", ".html", ".htm", ".css"];

/// Final cleanup pass over the merged code: Python imports hoisted to the
/// top, tabs normalized. Stored separately; the pre-processed code is kept.
fn post_process(code: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut processed = BTreeMap::new();
    for (name, content) in code {
        if !CODE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            processed.insert(name.clone(), content.clone());
            continue;
        }

        let mut text = content.clone();
        if name.ends_with(".py") {
            if text.contains("import ") && !text.trim_start().starts_with("import ") {
                text = hoist_python_imports(&text);
            }
            text = text.replace('\t', "    ");
        }
        processed.insert(name.clone(), text);
    }
    processed
}

fn hoist_python_imports(source: &str) -> String {
    let imports: Vec<&str> = import_line_regex()
        .find_iter(source)
        .map(|m| m.as_str())
        .collect();
    if imports.is_empty() {
        return source.to_string();
    }
    let rest: Vec<&str> = source
        .lines()
        .filter(|line| !import_line_regex().is_match(line))
        .collect();

    let mut out = imports.join("\n");
    out.push_str("\n\n");
    out.push_str(&rest.join("\n"));
    if source.ends_with('\n') && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
