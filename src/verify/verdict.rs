use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Not attempted because an earlier check failed.
    Pending,
    Passed,
    Warned,
    Failed,
}

impl CheckStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pending => "pending",
            CheckStatus::Passed => "passed",
            CheckStatus::Warned => "warned",
            CheckStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub name: String,
    pub status: CheckStatus,
    pub messages: Vec<String>,
    /// Every offending artifact found by a failed check, relative to the outputs dir.
    pub missing: Vec<String>,
}

impl CheckRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pending,
            messages: Vec::new(),
            missing: Vec::new(),
        }
    }

    fn raise(&mut self, status: CheckStatus) {
        if status > self.status {
            self.status = status;
        }
    }

    pub fn pass(&mut self, msg: impl Into<String>) {
        self.raise(CheckStatus::Passed);
        self.messages.push(msg.into());
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.raise(CheckStatus::Warned);
        self.messages.push(msg.into());
    }

    pub fn fail(&mut self, msg: impl Into<String>, missing: Vec<String>) {
        self.raise(CheckStatus::Failed);
        self.messages.push(msg.into());
        self.missing.extend(missing);
    }
}

/// Accumulated outcome of one verification run. Rebuilt from the tree every time.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub outputs_dir: PathBuf,
    pub verified: bool,
    pub halted_at: Option<String>,
    pub checks: Vec<CheckRecord>,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl Verdict {
    pub fn new(outputs_dir: PathBuf) -> Self {
        Self {
            outputs_dir,
            verified: false,
            halted_at: None,
            checks: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Files the record into the verdict and returns its final status. A record
    /// that neither passed, warned nor failed counts as passed.
    pub fn record(&mut self, mut rec: CheckRecord) -> CheckStatus {
        if rec.status == CheckStatus::Pending {
            rec.status = CheckStatus::Passed;
        }
        match rec.status {
            CheckStatus::Failed => {
                self.failures
                    .extend(rec.messages.iter().map(|m| format!("{}: {m}", rec.name)));
                self.halted_at = Some(rec.name.clone());
            }
            CheckStatus::Warned => {
                self.warnings
                    .extend(rec.messages.iter().map(|m| format!("{}: {m}", rec.name)));
            }
            CheckStatus::Passed | CheckStatus::Pending => {}
        }
        let status = rec.status;
        self.checks.push(rec);
        status
    }

    /// Marks a check that was never attempted.
    pub fn skip(&mut self, name: impl Into<String>) {
        self.checks.push(CheckRecord::new(name));
    }

    pub fn finish(mut self) -> Self {
        self.verified = self.failures.is_empty();
        self
    }

    pub fn check(&self, name: &str) -> Option<&CheckRecord> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn missing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .flat_map(|c| c.missing.iter().map(|m| m.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_escalates() {
        let mut rec = CheckRecord::new("x");
        rec.warn("careful");
        rec.pass("fine");
        assert_eq!(rec.status, CheckStatus::Warned);
        rec.fail("broken", vec!["a.csv".to_string()]);
        rec.pass("fine again");
        assert_eq!(rec.status, CheckStatus::Failed);
    }

    #[test]
    fn warnings_do_not_block_verification() {
        let mut v = Verdict::new(PathBuf::from("outputs"));
        let mut rec = CheckRecord::new("optional");
        rec.warn("absent");
        assert_eq!(v.record(rec), CheckStatus::Warned);
        let v = v.finish();
        assert!(v.verified);
        assert_eq!(v.warnings, vec!["optional: absent".to_string()]);
    }

    #[test]
    fn failure_halts_and_collects_missing() {
        let mut v = Verdict::new(PathBuf::from("outputs"));
        let mut rec = CheckRecord::new("files");
        rec.fail("missing", vec!["a.json".to_string(), "b.csv".to_string()]);
        assert_eq!(v.record(rec), CheckStatus::Failed);
        v.skip("later");
        let v = v.finish();
        assert!(!v.verified);
        assert_eq!(v.halted_at.as_deref(), Some("files"));
        assert_eq!(v.missing(), vec!["a.json", "b.csv"]);
        assert_eq!(v.check("later").map(|c| c.status), Some(CheckStatus::Pending));
    }

    #[test]
    fn status_names_match_json() {
        for st in [
            CheckStatus::Pending,
            CheckStatus::Passed,
            CheckStatus::Warned,
            CheckStatus::Failed,
        ] {
            let json = serde_json::to_string(&st).expect("serialize");
            assert_eq!(json, format!("\"{}\"", st.as_str()));
        }
    }
}
