//! Result file writer.
//!
//! Each successful query becomes one delimited text file in the output
//! directory, named after the query title.

use crate::db::QueryResult;
use crate::error::{GcamError, Result};
use crate::query::Query;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Returns the result file name for a query title.
///
/// The title is lowercased and spaces become underscores, so the same title
/// always maps to the same file.
pub fn output_file_name(title: &str) -> String {
    format!("{}.csv", title.replace(' ', "_").to_lowercase())
}

/// Resolves `path` against the current directory for display.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Writes query results into an output directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
    delimiter: u8,
}

impl ResultWriter {
    /// Creates a writer for `output_dir` using the given field delimiter.
    pub fn new(output_dir: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            delimiter,
        }
    }

    /// Returns the output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns where the result of `query` is written.
    pub fn output_path(&self, query: &Query) -> PathBuf {
        self.output_dir.join(output_file_name(query.title()))
    }

    /// Returns true if the result of `query` lands directly in the output
    /// directory.
    ///
    /// Titles are used as file names unchanged apart from case and spaces, so
    /// a title holding `/` or `..` resolves elsewhere.
    pub fn stays_in_output_dir(&self, query: &Query) -> bool {
        let name = output_file_name(query.title());
        let mut components = Path::new(&name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }

    /// Writes `result` for `query`, replacing any existing file.
    ///
    /// The table goes to a `.partial` sibling first and is renamed into place
    /// once complete, so an interrupted run never leaves a truncated result
    /// under the final name.
    pub fn write(&self, query: &Query, result: &QueryResult) -> Result<PathBuf> {
        let path = self.output_path(query);
        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        if let Err(e) = self.write_table(&partial, result) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        fs::rename(&partial, &path).map_err(|e| {
            let _ = fs::remove_file(&partial);
            GcamError::io(format!("Failed to move result into {}: {}", path.display(), e))
        })?;

        Ok(path)
    }

    fn write_table(&self, path: &Path, result: &QueryResult) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)
            .map_err(|e| GcamError::io(format!("Failed to create {}: {}", path.display(), e)))?;

        let write_err = |e: csv::Error| GcamError::io(format!("Failed to write {}: {}", path.display(), e));

        writer.write_record(&result.columns).map_err(write_err)?;
        for row in &result.rows {
            writer.write_record(row).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| GcamError::io(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(())
    }
}
