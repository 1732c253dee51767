//! RON program loader

use crate::error::{Error, Result};
use cytosol_core::{DeclTable, Program, RunConfig, Runtime};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loader for RON program fragments and run configuration
#[derive(Debug, Default)]
pub struct Loader {
    program: Program,
    config: RunConfig,
    records: HashSet<String>,
    externs: HashSet<String>,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a program fragment from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let fragment: Program = ron::from_str(content)?;
        self.merge(fragment)
    }

    /// Load a program fragment from a RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading program fragment");
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Load every `.ron` file under a directory, recursively, in path order
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::NotADirectory(path.display().to_string()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        paths.sort();

        for file_path in paths {
            if file_path.is_dir() {
                self.load_directory(&file_path)?;
            } else if file_path.extension().is_some_and(|e| e == "ron") {
                self.load_file(&file_path)?;
            }
        }
        Ok(())
    }

    /// Load the run configuration from a RON string
    pub fn load_config_str(&mut self, content: &str) -> Result<()> {
        self.config = ron::from_str(content)?;
        Ok(())
    }

    /// Load the run configuration from a RON file
    pub fn load_config_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading run configuration");
        let content = fs::read_to_string(path)?;
        self.load_config_str(&content)
    }

    /// Get the merged program so far
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Validate the merged program
    pub fn finish(self) -> Result<DeclTable> {
        Ok(DeclTable::new(self.program)?)
    }

    /// Validate the merged program and build a runtime with the loaded
    /// configuration
    pub fn into_runtime(self) -> Result<Runtime> {
        let config = self.config.clone();
        let table = Arc::new(self.finish()?);
        Ok(Runtime::new(table, config)?)
    }

    fn merge(&mut self, fragment: Program) -> Result<()> {
        for record in &fragment.records {
            if !self.records.insert(record.as_str().to_string()) {
                return Err(Error::DuplicateDefinition(format!("record `{}`", record)));
            }
        }
        for ext in &fragment.externs {
            if !self.externs.insert(ext.name.as_str().to_string()) {
                return Err(Error::DuplicateDefinition(format!("extern `{}`", ext.name)));
            }
        }
        tracing::trace!(
            records = fragment.records.len(),
            externs = fragment.externs.len(),
            genes = fragment.genes.len(),
            rules = fragment.rules.len(),
            "merged program fragment"
        );
        self.program.merge(fragment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytosol_core::{NullHost, RecordingHost, Termination};

    const RECORDS: &str = r#"
    (
        records: ["Start", "Inhibitor", "A"],
        externs: [(name: "print", params: [(name: "message", ty: "string")])],
    )
    "#;

    const GENES: &str = r#"
    (
        genes: [(
            factors: [(record: "Start")],
            when: Some(Cmp(Eq, Concentration("Inhibitor"), Literal(Int(0)))),
            body: [
                Call(name: "print", args: [("message", Literal(String("A")))]),
                Express((record: "Inhibitor")),
                Express((record: "A")),
            ],
        )],
    )
    "#;

    #[test]
    fn test_fragments_merge() {
        let mut loader = Loader::new();
        loader.load_str(RECORDS).unwrap();
        loader.load_str(GENES).unwrap();
        assert_eq!(loader.program().records.len(), 3);
        assert_eq!(loader.program().genes.len(), 1);

        let table = loader.finish().unwrap();
        assert_eq!(table.genes().len(), 1);
    }

    #[test]
    fn test_duplicate_record_across_fragments() {
        let mut loader = Loader::new();
        loader.load_str(RECORDS).unwrap();
        let err = loader.load_str(r#"(records: ["A"])"#).unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(msg) if msg.contains("`A`")));
    }

    #[test]
    fn test_duplicate_extern() {
        let mut loader = Loader::new();
        loader.load_str(RECORDS).unwrap();
        let err = loader
            .load_str(r#"(externs: [(name: "print", params: [])])"#)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(_)));
    }

    #[test]
    fn test_validation_error_on_finish() {
        let mut loader = Loader::new();
        loader.load_str(GENES).unwrap();
        assert!(matches!(loader.finish(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_parse_error() {
        let mut loader = Loader::new();
        assert!(matches!(loader.load_str("(records: [\"A\""), Err(Error::Ron(_))));
    }

    #[test]
    fn test_config_and_run() {
        let mut loader = Loader::new();
        loader.load_str(RECORDS).unwrap();
        loader.load_str(GENES).unwrap();
        loader
            .load_config_str(r#"(step_limit: 10, seed: { "Start": 1 })"#)
            .unwrap();
        assert_eq!(loader.config().step_limit(), 10);

        let mut runtime = loader.into_runtime().unwrap();
        let mut host = RecordingHost::new();
        let report = runtime.run(&mut host).unwrap();
        assert_eq!(report.termination, Some(Termination::Fixpoint));
        assert_eq!(report.count("A"), 1);
        assert_eq!(host.calls().len(), 1);
    }

    #[test]
    fn test_unknown_seed_rejected() {
        let mut loader = Loader::new();
        loader.load_str(RECORDS).unwrap();
        loader.load_config_str(r#"(seed: { "Ghost": 1 })"#).unwrap();
        assert!(matches!(loader.into_runtime(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_load_directory_in_path_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a_records.ron"), RECORDS).unwrap();
        fs::create_dir_all(dir.join("b_genes")).unwrap();
        fs::write(dir.join("b_genes").join("start.ron"), GENES).unwrap();
        fs::write(dir.join("notes.txt"), "not a program").unwrap();
        fs::write(dir.join("run.cfg"), "(step_limit: 3)").unwrap();

        let mut loader = Loader::new();
        loader.load_directory(dir).unwrap();
        loader.load_config_file(dir.join("run.cfg")).unwrap();
        let names: Vec<_> = loader.program().records.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["Start", "Inhibitor", "A"]);
        assert_eq!(loader.config().step_limit(), 3);

        let mut runtime = loader.into_runtime().unwrap();
        let report = runtime.run(&mut NullHost).unwrap();
        assert!(report.is_fixpoint());
        assert_eq!(report.count("A"), 0);
    }

    #[test]
    fn test_load_directory_rejects_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("program.ron");
        fs::write(&file, RECORDS).unwrap();

        let mut loader = Loader::new();
        assert!(matches!(loader.load_directory(&file), Err(Error::NotADirectory(_))));
        loader.load_file(&file).unwrap();
        assert_eq!(loader.program().externs.len(), 1);
    }
}
