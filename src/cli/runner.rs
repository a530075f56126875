//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, FetchArgs, OutputFormat};
use crate::config::JobConfig;
use crate::engine::{FetchEngine, FetchOutcome};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::state::CheckpointStore;
use crate::types::Record;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch(args) => self.fetch(args).await,
            Commands::Status { checkpoint } => self.status(checkpoint.as_deref()).await,
            Commands::Clear { checkpoint } => self.clear(checkpoint.as_deref()).await,
        }
    }

    /// Job file, or an empty job when none was given
    fn load_job(&self) -> Result<JobConfig> {
        match &self.cli.job {
            Some(path) => JobConfig::from_file(path),
            None => Ok(JobConfig::default()),
        }
    }

    /// Checkpoint path from the flag, falling back to the job file
    fn checkpoint_path(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        self.load_job()?
            .fetch
            .checkpoint_path
            .ok_or_else(|| Error::missing_field("checkpoint"))
    }

    async fn fetch(&self, args: &FetchArgs) -> Result<()> {
        let mut job = self.load_job()?;
        args.apply(&mut job)?;
        job.validate()?;

        let target = job.page_target()?;
        let client = HttpClient::with_config(job.http_config())?;
        let cancel = CancellationToken::new();
        let engine = FetchEngine::new(client)
            .with_config(job.fetch_config())
            .with_cancellation(cancel.clone());

        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current step");
                interrupt.cancel();
            }
        });

        let outcome = engine.run(target.as_ref()).await;
        cancel.cancel();
        let outcome = outcome?;

        write_records(&args.output, &outcome.records)?;
        info!(
            path = %args.output.display(),
            records = outcome.records.len(),
            "Results written"
        );

        self.output_message(&summary(&outcome, &args.output));
        Ok(())
    }

    async fn status(&self, checkpoint: Option<&Path>) -> Result<()> {
        let path = self.checkpoint_path(checkpoint)?;
        let store = CheckpointStore::new(&path);

        let message = match store.load().await {
            Some(record) => json!({
                "checkpoint": path.display().to_string(),
                "exists": true,
                "page": record.page,
                "count": record.items.len(),
                "cursor_pending": record.cursor.is_some(),
                "finished": record.finished,
                "updated_at": record.updated_at,
            }),
            None => json!({
                "checkpoint": path.display().to_string(),
                "exists": false,
            }),
        };

        self.output_message(&message);
        Ok(())
    }

    async fn clear(&self, checkpoint: Option<&Path>) -> Result<()> {
        let path = self.checkpoint_path(checkpoint)?;
        CheckpointStore::new(&path).clear().await?;
        info!(path = %path.display(), "Checkpoint cleared");
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Write records as a pretty JSON array
pub(crate) fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(records)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write results to {}", path.display()))
}

fn summary(outcome: &FetchOutcome, output: &Path) -> Value {
    json!({
        "reason": outcome.reason,
        "records": outcome.records.len(),
        "total_count": outcome.total_count,
        "output": output.display().to_string(),
        "stats": outcome.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FetchStats;
    use crate::types::TerminationReason;
    use tempfile::tempdir;

    #[test]
    fn test_write_records_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/leads.json");
        write_records(&path, &[json!({"id": "1"})]).unwrap();

        let written: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, vec![json!({"id": "1"})]);
    }

    #[test]
    fn test_write_records_failure_names_path() {
        let dir = tempdir().unwrap();

        // The output path is an existing directory
        let err = write_records(dir.path(), &[]).unwrap_err();
        assert!(err.to_string().starts_with("Failed to write results to"));
    }

    #[test]
    fn test_summary_shape() {
        let outcome = FetchOutcome {
            records: vec![json!({"id": "1"})],
            reason: TerminationReason::CursorRepeat,
            stats: FetchStats::new(),
            total_count: Some(40),
        };
        let value = summary(&outcome, Path::new("r.json"));

        assert_eq!(value["reason"], "cursor_repeat");
        assert_eq!(value["records"], 1);
        assert_eq!(value["total_count"], 40);
        assert_eq!(value["stats"]["pages"], 0);
    }
}
