use crate::data_loader::{self, BatchFileType};
use crate::manager::{QADataManager, StoreSummary};
use crate::model::RawBatch;
use crate::plan::{ExportProfileItem, Plan};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use tracing::{debug, error, info, warn};

use anyhow::{anyhow, Context, Result};

fn plan_dir(plan_file_path: &Path) -> Result<&Path> {
    plan_file_path
        .parent()
        .ok_or_else(|| anyhow!("Plan file has no parent directory"))
}

/// Checks every configuration section before any data is touched
pub fn validate_plan(plan: &Plan) -> Result<()> {
    plan.unify
        .validate()
        .context("Invalid unify configuration")?;
    for profile in &plan.export.profiles {
        let base = Path::new(".");
        profile
            .to_export_config(base)
            .validate()
            .with_context(|| format!("Invalid export profile {}", profile.describe()))?;
        if let Some(filter) = &profile.filter {
            filter
                .validate()
                .with_context(|| format!("Invalid filter in export profile {}", profile.describe()))?;
        }
    }
    Ok(())
}

/// Loads every import profile, relative to the plan file
fn load_batches_from_plan(plan: &Plan, plan_file_path: &Path) -> Result<Vec<RawBatch>> {
    let parent_dir = plan_dir(plan_file_path)?;
    let mut batches = Vec::new();

    for profile in &plan.import.profiles {
        let import_file_path = parent_dir.join(&profile.filename);
        let filetype = match profile.filetype {
            Some(filetype) => filetype,
            None => BatchFileType::from_path(&import_file_path)?,
        };
        info!(
            "Importing file: {} as {:?}",
            import_file_path.display(),
            filetype
        );
        let loaded = data_loader::load_batches(&import_file_path, filetype, profile.origin)
            .with_context(|| format!("Failed to load {}", import_file_path.display()))?;
        batches.extend(loaded);
    }

    Ok(batches)
}

/// Builds the unified store described by the plan
pub fn build_store(plan: &Plan, plan_file_path: &Path) -> Result<QADataManager> {
    let mut manager = QADataManager::new(plan.unify.clone())?;
    let batches = load_batches_from_plan(plan, plan_file_path)?;
    let summary = manager.add_data(batches);

    if summary.rejected_count > 0 {
        warn!("{} items were rejected during normalization", summary.rejected_count);
    }
    info!(
        "Store for plan '{}' holds {} items from {} batches",
        plan.name(),
        manager.len(),
        manager.batches().len()
    );
    Ok(manager)
}

fn export_profile(
    manager: &QADataManager,
    profile: &ExportProfileItem,
    base_dir: &Path,
) -> Result<PathBuf> {
    info!("Starting export: {}", profile.describe());
    let config = profile.to_export_config(base_dir);

    let path = match &profile.filter {
        Some(filter) => {
            let view = manager.filter(None, filter)?;
            debug!("Filter kept {} of {} items", view.len(), manager.len());
            manager.export_to_file(Some(&view), &config)?
        }
        None => manager.export_to_file(None, &config)?,
    };
    Ok(path)
}

/// Executes a single plan run and returns the files written
pub fn run_plan(plan: &Plan, plan_file_path: &Path) -> Result<Vec<PathBuf>> {
    validate_plan(plan)?;
    let manager = build_store(plan, plan_file_path)?;
    let base_dir = plan_dir(plan_file_path)?;

    let mut written = Vec::new();
    for profile in &plan.export.profiles {
        match export_profile(&manager, profile, base_dir) {
            Ok(path) => written.push(path),
            Err(e) => error!("Failed to export {}: {}", profile.describe(), e),
        }
    }

    Ok(written)
}

fn read_plan(plan: &str) -> Result<Plan> {
    let plan_file_path = Path::new(plan);
    let path_content = std::fs::read_to_string(plan_file_path)
        .with_context(|| format!("Failed to read plan {}", plan))?;
    let plan: Plan = serde_yaml::from_str(&path_content)?;
    debug!("Parsed plan: {:?}", plan);
    Ok(plan)
}

/// Main function to execute a plan, with optional file watching
pub fn execute_plan(plan: String, watch: bool) -> Result<()> {
    info!("Executing plan {}", plan);

    let plan_file_path = Path::new(&plan);
    let parsed = read_plan(&plan)?;
    run_plan(&parsed, plan_file_path)?;

    if watch {
        watch_for_changes(parsed, plan_file_path)?;
    }

    Ok(())
}

/// Store summary for the plan's inputs, without exporting
pub fn plan_statistics(plan: String) -> Result<StoreSummary> {
    let plan_file_path = Path::new(&plan);
    let parsed = read_plan(&plan)?;
    validate_plan(&parsed)?;
    let manager = build_store(&parsed, plan_file_path)?;
    Ok(manager.summary())
}

/// Sets up file watching for input files to re-run the plan on changes
fn watch_for_changes(plan: Plan, plan_file_path: &Path) -> Result<()> {
    info!("Watching for changes");
    let parent_dir = plan_dir(plan_file_path)?;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    for profile in &plan.import.profiles {
        let path = parent_dir.join(&profile.filename);
        watcher.watch(&path, RecursiveMode::NonRecursive)?;
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                if let Ok(event) = event {
                    if let EventKind::Modify(_) = event.kind {
                        debug!("File modified {:?}", event.paths);
                        info!("Change detected, re-executing plan");
                        if let Err(e) = run_plan(&plan, plan_file_path) {
                            error!("Plan run failed: {:#}", e);
                        }
                    }
                }
            }
            Err(e) => {
                error!("Watch error: {:?}", e);
                return Err(anyhow!("File watcher disconnected"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_plan(dir: &Path, plan: &str) -> PathBuf {
        let path = dir.join("plan.yaml");
        fs::write(&path, plan).unwrap();
        path
    }

    #[test]
    fn invalid_filter_fails_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let plan: Plan = serde_yaml::from_str(
            r#"
import:
  profiles:
    - filename: missing.json
export:
  profiles:
    - format: csv
      filter:
        min_confidence: 0.9
        max_confidence: 0.1
"#,
        )
        .unwrap();
        let err = run_plan(&plan, &dir.path().join("plan.yaml")).unwrap_err();
        assert!(format!("{:#}", err).contains("min_confidence"));
    }

    #[test]
    fn run_plan_writes_each_profile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("batch.json"),
            r#"{"origin": "prompt", "items": [
                {"question": "¿Qué es IA?", "answer": "Inteligencia Artificial", "confidence": 0.9, "level": "avanzado"},
                {"question": "que es ia", "answer": "Inteligencia artificial.", "confidence": 0.6},
                {"question": "¿Qué es ML?", "answer": "Aprendizaje automático", "level": "basico"}
            ]}"#,
        )
        .unwrap();
        let plan_path = write_plan(
            dir.path(),
            r#"
meta:
  name: test
import:
  profiles:
    - filename: batch.json
export:
  profiles:
    - filename: all
      format: csv
    - filename: advanced.json
      output_dir: out
      format: json
      filter:
        level: [avanzado]
"#,
        );

        let plan = read_plan(plan_path.to_str().unwrap()).unwrap();
        let written = run_plan(&plan, &plan_path).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("all.csv"),
                dir.path().join("out").join("advanced.json")
            ]
        );

        let csv = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["confidence"], 0.9);
    }

    #[test]
    fn plan_statistics_counts_batches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("items.csv"),
            "question,answer,category\nq1,a1,Ciencia\n,sin pregunta,\n",
        )
        .unwrap();
        let plan_path = write_plan(
            dir.path(),
            "import:\n  profiles:\n    - filename: items.csv\n      origin: document\n",
        );

        let summary = plan_statistics(plan_path.to_str().unwrap().to_string()).unwrap();
        assert_eq!(summary.total_batches, 1);
        assert_eq!(summary.origin_distribution["document"], 1);
        assert_eq!(summary.statistics.by_category["ciencia"], 1);
    }
}
