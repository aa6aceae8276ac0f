use crate::config::RunConfig;
use crate::core::compare::{CompareOptions, compare_images};
use crate::core::fingerprint::{ReadOptions, read_image};
use crate::core::matcher::{MatchField, MatchMap, find_matching};
use crate::core::scanner::{ScanError, ScanOptions, get_image_files};
use crate::database::{DatabaseError, FingerprintStore, StoreLocation};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Decides whether a secondary file matched to a primary file goes.
pub trait RemovalPolicy {
    fn should_remove(
        &mut self,
        primary: &Path,
        secondary: &Path,
        field: MatchField,
    ) -> Result<bool, RemoveError>;
}

/// Remove every match without asking.
pub struct AutomaticRemoval;

impl RemovalPolicy for AutomaticRemoval {
    fn should_remove(&mut self, _: &Path, _: &Path, _: MatchField) -> Result<bool, RemoveError> {
        Ok(true)
    }
}

/// Ask on the terminal before each removal.
pub struct ConfirmRemoval;

impl RemovalPolicy for ConfirmRemoval {
    fn should_remove(
        &mut self,
        primary: &Path,
        secondary: &Path,
        field: MatchField,
    ) -> Result<bool, RemoveError> {
        let prompt = format!(
            "Remove {} (same {} as {})?",
            secondary.display(),
            field,
            primary.display()
        );
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub primary_count: usize,
    pub secondary_count: usize,
    pub hash_matches: MatchMap,
    /// Pairs sharing only a file size, where at least one side has no hash.
    pub size_matches: MatchMap,
    /// Files deleted, or in a dry run the files that would have been.
    pub removed: Vec<PathBuf>,
    /// Matched files left in place by the policy, verification or an error.
    pub kept: Vec<PathBuf>,
    pub dry_run: bool,
}

pub struct DuplicateRemover {
    config: RunConfig,
    policy: Box<dyn RemovalPolicy>,
}

impl DuplicateRemover {
    pub fn new(config: RunConfig, policy: Box<dyn RemovalPolicy>) -> Self {
        Self { config, policy }
    }

    /// Policy chosen by `config.interactive`.
    pub fn from_config(config: RunConfig) -> Self {
        let policy: Box<dyn RemovalPolicy> = if config.interactive {
            Box::new(ConfirmRemoval)
        } else {
            Box::new(AutomaticRemoval)
        };
        Self::new(config, policy)
    }

    /// Remove files under `secondary_dir` that duplicate files under
    /// `primary_dir`. The primary side is never modified.
    pub async fn run(
        &mut self,
        primary_dir: &Path,
        secondary_dir: &Path,
    ) -> Result<RunSummary, RemoveError> {
        self.config.validate().map_err(RemoveError::Configuration)?;

        let scan_options = ScanOptions {
            verbose: self.config.verbose,
        };
        let primary = get_image_files(primary_dir, &scan_options)?;
        let mut secondary = get_image_files(secondary_dir, &scan_options)?;

        // Overlapping directory arguments must not make a file its own duplicate.
        let primary_set: HashSet<&PathBuf> = primary.iter().collect();
        secondary.retain(|path| !primary_set.contains(path));

        println!(
            "▶ Found {} primary and {} secondary media files",
            primary.len(),
            secondary.len()
        );

        let mut summary = RunSummary {
            primary_count: primary.len(),
            secondary_count: secondary.len(),
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        let location = StoreLocation::from_option(self.config.database.as_deref());
        let store = FingerprintStore::connect(&location)?;

        if self.config.skip_reading {
            match store.len() {
                Ok(count) => info!("Reusing {} stored fingerprints", count),
                Err(e) => error!("Could not count stored fingerprints: {}", e),
            }
        } else {
            self.populate(&store, &primary, "primary");
            self.populate(&store, &secondary, "secondary");
        }

        let mut handled = HashSet::new();

        let by_hash = find_matching(&primary, &secondary, &store, MatchField::Hash).await;
        summary.hash_matches = match by_hash {
            Ok(map) => map,
            Err(e) => {
                error!("Matching by content hash failed: {}", e);
                MatchMap::new()
            }
        };
        if !summary.hash_matches.is_empty() {
            println!("\n🔍 Identical content:");
        }
        let hash_matches = summary.hash_matches.clone();
        self.resolve(&hash_matches, MatchField::Hash, &mut handled, &mut summary)?;

        let removed: HashSet<&PathBuf> = summary.removed.iter().collect();
        secondary.retain(|path| !removed.contains(path));

        let by_size = find_matching(&primary, &secondary, &store, MatchField::FileSize).await;
        let size_matches = match by_size {
            Ok(map) => self.inconclusive_by_hash(&store, map)?,
            Err(e) => {
                error!("Matching by file size failed: {}", e);
                MatchMap::new()
            }
        };
        if !size_matches.is_empty() {
            println!("\n⚖️  Same size, content hash unavailable:");
        }
        self.resolve(&size_matches, MatchField::FileSize, &mut handled, &mut summary)?;
        summary.size_matches = size_matches;

        if let Err(e) = store.snapshot_to_file(&self.config.snapshot_path) {
            error!(
                "Could not write {}: {}",
                self.config.snapshot_path.display(),
                e
            );
        }
        close_store(store);

        self.report(&summary);
        Ok(summary)
    }

    /// Fingerprint each path and store the result. Unreadable files and
    /// failed writes are logged and skipped.
    fn populate(&self, store: &FingerprintStore, paths: &[PathBuf], side: &str) {
        let progress = if self.config.verbose {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(paths.len() as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        };
        progress.set_message(format!("Reading {} files…", side));

        let options = ReadOptions {
            identify_program: self
                .config
                .identify
                .then(|| self.config.gm_program.clone()),
        };

        for path in paths {
            info!("Reading {}", path.display());
            match read_image(path, &options) {
                Ok(record) => {
                    if let Err(e) = store.upsert(&record) {
                        warn!("Could not store fingerprint of {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
    }

    /// Keep only size matches a content hash cannot settle: at least one
    /// side of the pair has no stored hash.
    fn inconclusive_by_hash(
        &self,
        store: &FingerprintStore,
        map: MatchMap,
    ) -> Result<MatchMap, RemoveError> {
        let mut filtered = MatchMap::new();
        for (primary, matches) in map {
            let primary_hash = stored_hash(store, &primary)?;
            let mut kept = Vec::new();
            for secondary in matches {
                if primary_hash.is_none() || stored_hash(store, &secondary)?.is_none() {
                    kept.push(secondary);
                } else {
                    debug!(
                        "{} and {} share a size but not content",
                        primary.display(),
                        secondary.display()
                    );
                }
            }
            if !kept.is_empty() {
                filtered.insert(primary, kept);
            }
        }
        Ok(filtered)
    }

    fn resolve(
        &mut self,
        groups: &MatchMap,
        field: MatchField,
        handled: &mut HashSet<PathBuf>,
        summary: &mut RunSummary,
    ) -> Result<(), RemoveError> {
        for (primary, matches) in groups {
            println!("   🏆 Keeping → {}", primary.display());

            for secondary in matches {
                if !handled.insert(secondary.clone()) {
                    continue;
                }

                if self.remove_one(primary, secondary, field)? {
                    summary.removed.push(secondary.clone());
                } else {
                    summary.kept.push(secondary.clone());
                }
            }
        }
        Ok(())
    }

    /// Returns whether `secondary` was removed (or would be, in a dry run).
    fn remove_one(
        &mut self,
        primary: &Path,
        secondary: &Path,
        field: MatchField,
    ) -> Result<bool, RemoveError> {
        if self.config.verify && !self.pixels_identical(primary, secondary) {
            println!("   ⏭️  Kept {} (pixels differ)", secondary.display());
            return Ok(false);
        }

        if !self.policy.should_remove(primary, secondary, field)? {
            println!("   ⏭️  Kept {}", secondary.display());
            return Ok(false);
        }

        info!(
            "Removing {} since it is the same as {}",
            secondary.display(),
            primary.display()
        );

        if self.config.dry_run {
            println!("   🗑️  [dry-run] DELETE {}", secondary.display());
            return Ok(true);
        }

        match fs::remove_file(secondary) {
            Ok(()) => {
                println!("   🗑️  Deleted {}", secondary.display());
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", secondary.display(), e);
                Ok(false)
            }
        }
    }

    fn pixels_identical(&self, a: &Path, b: &Path) -> bool {
        let options = CompareOptions {
            program: self.config.gm_program.clone(),
            metric: self.config.metric,
        };
        match compare_images(a, b, &options) {
            Ok(diff) => {
                debug!("{} vs {}: {:?}", a.display(), b.display(), diff);
                diff.is_identical()
            }
            Err(e) => {
                warn!("Comparing {} with {} failed: {}", a.display(), b.display(), e);
                false
            }
        }
    }

    fn report(&self, summary: &RunSummary) {
        if summary.hash_matches.is_empty() && summary.size_matches.is_empty() {
            println!("No duplicates found.");
            return;
        }
        if summary.dry_run {
            println!(
                "\n⚠️  Dry-run only; {} file(s) would be removed, no files were changed.",
                summary.removed.len()
            );
        } else {
            println!(
                "\n✅ Removed total of {} duplicate file(s), kept {}",
                summary.removed.len(),
                summary.kept.len()
            );
        }
    }
}

/// Close the store at the end of a run. Files may already be gone by now,
/// so a failure is logged rather than returned.
fn close_store(store: FingerprintStore) {
    if let Err(e) = store.close() {
        error!("Could not close the fingerprint store: {}", e);
    }
}

fn stored_hash(store: &FingerprintStore, path: &Path) -> Result<Option<String>, RemoveError> {
    let Some(key) = path.to_str() else {
        return Ok(None);
    };
    Ok(store.get(key)?.and_then(|record| record.hash))
}
