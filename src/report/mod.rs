use std::fmt;

use indexmap::IndexMap;

use crate::error::OpsError;

/// Workflow stage a device outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Collect,
    Render,
    Deploy,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Collect, Stage::Render, Stage::Deploy];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Collect => "collect",
            Stage::Render => "render",
            Stage::Deploy => "deploy",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct DeviceFailure {
    pub device: String,
    pub stage: Stage,
    pub error: OpsError,
}

/// RunReport aggregates per-device outcomes of one workflow run
#[derive(Debug, Default)]
pub struct RunReport {
    pub dry_run: bool,
    completed: Vec<(Stage, String)>,
    /// Lines a dry run would have sent, per device
    pub planned: IndexMap<String, Vec<String>>,
    pub failures: Vec<DeviceFailure>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn record_ok(&mut self, stage: Stage, device: &str) {
        self.completed.push((stage, device.to_string()));
    }

    pub fn record_failure(&mut self, stage: Stage, device: &str, error: OpsError) {
        tracing::warn!("{} [{}]: {}", device, stage, error);
        self.failures.push(DeviceFailure {
            device: device.to_string(),
            stage,
            error,
        });
    }

    pub fn plan(&mut self, device: &str, lines: Vec<String>) {
        self.planned.insert(device.to_string(), lines);
    }

    pub fn succeeded(&self, stage: Stage) -> Vec<&str> {
        self.completed
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, device)| device.as_str())
            .collect()
    }

    pub fn failed(&self, stage: Stage) -> Vec<&DeviceFailure> {
        self.failures.iter().filter(|f| f.stage == stage).collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Operator-facing summary: counts per stage, then each failure
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for stage in Stage::ALL {
            let ok = self.succeeded(stage).len();
            let failed = self.failed(stage).len();
            if ok == 0 && failed == 0 {
                continue;
            }
            out.push_str(&format!("{}: {} ok, {} failed\n", stage, ok, failed));
        }
        if self.dry_run {
            out.push_str(&format!("dry run: {} devices not changed\n", self.planned.len()));
        }
        for failure in &self.failures {
            out.push_str(&format!(
                "  {} [{}]: {}\n",
                failure.device, failure.stage, failure.error
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_failures() {
        let mut report = RunReport::new(false);
        report.record_ok(Stage::Collect, "a-swn-01");
        report.record_ok(Stage::Render, "a-swn-01");
        report.record_failure(Stage::Collect, "b-swn-01", OpsError::connection("b-swn-01", "timeout"));

        let summary = report.summary();
        assert!(summary.contains("collect: 1 ok, 1 failed"));
        assert!(summary.contains("render: 1 ok, 0 failed"));
        assert!(!summary.contains("deploy:"));
        assert!(summary.contains("b-swn-01 [collect]: connection to b-swn-01 failed: timeout"));
        assert!(report.has_failures());
    }

    #[test]
    fn test_dry_run_summary() {
        let mut report = RunReport::new(true);
        report.plan("a-swn-01", vec!["ip dhcp snooping".into()]);
        assert!(report.summary().contains("dry run: 1 devices not changed"));
        assert!(!report.has_failures());
    }
}
