use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Pass,
    Warn,
    Fail,
    Info,
}

impl LineStatus {
    fn marker(&self) -> &'static str {
        match self {
            LineStatus::Pass => "[ok]  ",
            LineStatus::Warn => "[warn]",
            LineStatus::Fail => "[FAIL]",
            LineStatus::Info => "      ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckLine {
    pub status: LineStatus,
    pub label: String,
    pub detail: String,
}

/// Human-readable outcome of one diagnostic run
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub title: String,
    pub lines: Vec<CheckLine>,
}

impl CheckReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    fn push(&mut self, status: LineStatus, label: impl Into<String>, detail: impl Into<String>) {
        self.lines.push(CheckLine {
            status,
            label: label.into(),
            detail: detail.into(),
        });
    }

    pub fn pass(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.push(LineStatus::Pass, label, detail);
    }

    pub fn warn(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.push(LineStatus::Warn, label, detail);
    }

    pub fn fail(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.push(LineStatus::Fail, label, detail);
    }

    pub fn info(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.push(LineStatus::Info, label, detail);
    }

    /// Appends every line of `other` under a label prefix.
    pub fn absorb(&mut self, prefix: &str, other: CheckReport) {
        for line in other.lines {
            self.lines.push(CheckLine {
                label: format!("{} {}", prefix, line.label),
                ..line
            });
        }
    }

    /// A report passes unless one of its lines failed; warnings are advisory.
    pub fn passed(&self) -> bool {
        !self.lines.iter().any(|l| l.status == LineStatus::Fail)
    }

    pub fn count(&self, status: LineStatus) -> usize {
        self.lines.iter().filter(|l| l.status == status).count()
    }

    #[cfg(test)]
    pub fn find(&self, label: &str) -> Option<&CheckLine> {
        self.lines.iter().find(|l| l.label == label)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(50))?;
        for line in &self.lines {
            if line.detail.is_empty() {
                writeln!(f, "{} {}", line.status.marker(), line.label)?;
            } else {
                writeln!(f, "{} {}: {}", line.status.marker(), line.label, line.detail)?;
            }
        }
        writeln!(f, "{}", "-".repeat(50))?;
        write!(
            f,
            "{} ({} passed, {} warnings, {} failed)",
            if self.passed() { "PASSED" } else { "FAILED" },
            self.count(LineStatus::Pass),
            self.count(LineStatus::Warn),
            self.count(LineStatus::Fail)
        )
    }
}
