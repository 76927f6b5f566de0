//! Policy violation reporting (CSP and frame embedding).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// How many recent violations are kept for inspection.
pub const VIOLATION_HISTORY: usize = 64;

/// A Content-Security-Policy violation as delivered in a CSP report body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CspViolation {
    #[serde(default)]
    pub document_uri: String,
    #[serde(default)]
    pub violated_directive: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_directive: Option<String>,
    #[serde(default)]
    pub blocked_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

impl CspViolation {
    /// Parse a `{"csp-report": {...}}` body.
    pub fn from_report_json(body: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Report {
            #[serde(rename = "csp-report")]
            report: CspViolation,
        }
        serde_json::from_str::<Report>(body).map(|r| r.report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyViolation {
    Csp(CspViolation),
    FrameEmbedding { origin: String },
}

impl PolicyViolation {
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyViolation::Csp(_) => "csp",
            PolicyViolation::FrameEmbedding { .. } => "frame_embedding",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub at_ms: u64,
    pub violation: PolicyViolation,
}

/// Bounded history of recent violations, oldest dropped first.
#[derive(Debug)]
pub struct PolicyMonitor {
    recent: Mutex<VecDeque<ViolationRecord>>,
    capacity: usize,
}

impl PolicyMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(&self, at_ms: u64, violation: PolicyViolation) {
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(ViolationRecord { at_ms, violation });
    }

    pub fn recent(&self) -> Vec<ViolationRecord> {
        let recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        recent.iter().cloned().collect()
    }
}

impl Default for PolicyMonitor {
    fn default() -> Self {
        Self::new(VIOLATION_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csp_report() {
        let body = r#"{
            "csp-report": {
                "document-uri": "https://app.example.com/lesson/3",
                "referrer": "",
                "violated-directive": "script-src-elem",
                "effective-directive": "script-src-elem",
                "original-policy": "default-src 'self'",
                "blocked-uri": "https://evil.example.net/x.js",
                "line-number": 12,
                "status-code": 200
            }
        }"#;
        let v = CspViolation::from_report_json(body).unwrap();
        assert_eq!(v.violated_directive, "script-src-elem");
        assert_eq!(v.blocked_uri, "https://evil.example.net/x.js");
        assert_eq!(v.line_number, Some(12));
        assert!(v.source_file.is_none());
    }

    #[test]
    fn test_rejects_non_report() {
        assert!(CspViolation::from_report_json(r#"{"other": {}}"#).is_err());
    }

    #[test]
    fn test_history_is_bounded() {
        let monitor = PolicyMonitor::new(2);
        for i in 0..3 {
            monitor.record(
                i,
                PolicyViolation::FrameEmbedding {
                    origin: format!("o{i}"),
                },
            );
        }
        let recent = monitor.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].at_ms, 1);
        assert_eq!(recent[1].violation.kind(), "frame_embedding");
    }

    #[test]
    fn test_recording_survives_poisoned_lock() {
        let monitor = std::sync::Arc::new(PolicyMonitor::new(4));
        let poisoner = monitor.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.recent.lock().unwrap();
            panic!("poison the history lock");
        })
        .join();
        assert!(monitor.recent.is_poisoned());

        monitor.record(
            5,
            PolicyViolation::FrameEmbedding {
                origin: "https://evil.example.net".into(),
            },
        );
        assert_eq!(monitor.recent().len(), 1);
    }
}
