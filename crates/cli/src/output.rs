use crate::error::CliError;
use orchestrator::RunSummary;
use std::path::Path;

/// Prints the per-component counts to stdout (§7: "a structured summary at
/// stdout (per-component counts)").
pub fn print_summary(summary: &RunSummary) {
    println!("run {}", summary.run_id);
    println!("{:<28} {:>8} {:>8} {:>8}", "component", "created", "skipped", "failed");
    for outcome in &summary.outcomes {
        println!(
            "{:<28} {:>8} {:>8} {:>8}{}",
            outcome.component,
            outcome.created,
            outcome.skipped,
            outcome.failed,
            if outcome.succeeded { "" } else { "  FAILED" },
        );
    }
    if summary.stopped_early {
        println!("(run stopped early)");
    }
}

/// Writes the full summary as JSON under `results/` (§6 persisted state
/// layout), one file per run keyed by run id.
pub async fn write_results_file(summary: &RunSummary, data_dir: &str) -> Result<(), CliError> {
    let dir = Path::new(data_dir).join("results");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("{}.json", summary.run_id));
    let json = serde_json::to_string_pretty(summary).map_err(CliError::JsonSerialize)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator::ComponentOutcome;

    fn summary() -> RunSummary {
        RunSummary {
            run_id: "run-test123".to_string(),
            outcomes: vec![ComponentOutcome {
                component: "priorities".to_string(),
                succeeded: true,
                created: 5,
                skipped: 1,
                failed: 0,
                errors: vec![],
            }],
            stopped_early: false,
        }
    }

    #[tokio::test]
    async fn writes_results_file_under_results_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        write_results_file(&summary(), data_dir).await.unwrap();

        let path = dir.path().join("results").join("run-test123.json");
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["run_id"], "run-test123");
        assert_eq!(parsed["outcomes"][0]["created"], 5);
    }

    #[tokio::test]
    async fn write_results_file_creates_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("deeper");
        write_results_file(&summary(), data_dir.to_str().unwrap()).await.unwrap();
        assert!(data_dir.join("results").join("run-test123.json").exists());
    }
}
