// Report export
// Writes statistic_<tag>.json and details_<tag>.json for downstream plotting

use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::report::ScoreReport;
use crate::scoring::types::{MatchRecord, ScoringError};

/// Writes scoring reports into one results directory
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ReportWriter { dir: dir.into() }
    }

    pub fn statistic_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("statistic_{}.json", tag))
    }

    pub fn details_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("details_{}.json", tag))
    }

    /// Write both files, creating the directory if needed
    /// Returns the statistic and details paths
    pub fn write(
        &self,
        report: &ScoreReport,
        tag: &str,
    ) -> Result<(PathBuf, PathBuf), ScoringError> {
        fs::create_dir_all(&self.dir)?;

        let statistic_path = self.statistic_path(tag);
        fs::write(&statistic_path, serde_json::to_vec(&report.statistics)?)?;

        let details_path = self.details_path(tag);
        fs::write(&details_path, serde_json::to_vec(&report.details)?)?;

        log::info!("Wrote scoring report '{}' to {}", tag, self.dir.display());

        Ok((statistic_path, details_path))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Read a details file back
pub fn read_details(path: &Path) -> Result<Vec<MatchRecord>, ScoringError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
