//! Execution-only learning of per-rule priors.
//!
//! Plan discovery alone never touches a prior; only a reported
//! execution outcome can move it, and only through this store. Priors
//! are clamped into `[0.01, 10.0]` the way the teacher's
//! `PriorityCalculator` clamps its deadline boost ratio, and every
//! adjustment is appended to an in-memory audit trail grounded on
//! `AuditLogService`'s append-and-cap pattern.

use std::collections::HashMap;

use tokio::sync::RwLock;

const MIN_PRIOR: f64 = 0.01;
const MAX_PRIOR: f64 = 10.0;
const DEFAULT_PRIOR: f64 = 1.0;
const SUCCESS_ADJUSTMENT: f64 = 0.1;
const FAILURE_ADJUSTMENT: f64 = -0.2;

/// One report of a rule's outcome during a single execution request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcomeReport {
    pub rule_id: String,
    pub success: bool,
    pub failure_reason: Option<String>,
}

/// Record of a single prior adjustment, kept for inspection and replay.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditAuditEntry {
    pub request_hash: String,
    pub rule_id: String,
    pub adjustment: f64,
    pub prior_before: f64,
    pub prior_after: f64,
}

/// In-memory store of per-rule priors, adjusted only via reported
/// execution outcomes.
pub struct CreditStore {
    priors: RwLock<HashMap<String, f64>>,
    audit_log: RwLock<Vec<CreditAuditEntry>>,
}

impl Default for CreditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditStore {
    pub fn new() -> Self {
        Self {
            priors: RwLock::new(HashMap::new()),
            audit_log: RwLock::new(Vec::new()),
        }
    }

    /// Current prior for a rule, `1.0` if never reported on.
    pub async fn get_prior(&self, rule_id: &str) -> f64 {
        self.priors.read().await.get(rule_id).copied().unwrap_or(DEFAULT_PRIOR)
    }

    /// Apply a batch of execution outcome reports, each nudging its
    /// rule's prior and appending an audit entry.
    pub async fn report_execution_outcome(
        &self,
        request_hash: &str,
        reports: &[ExecutionOutcomeReport],
    ) {
        let mut priors = self.priors.write().await;
        let mut audit_log = self.audit_log.write().await;

        for report in reports {
            let adjustment = if report.success { SUCCESS_ADJUSTMENT } else { FAILURE_ADJUSTMENT };
            let prior_before = priors.get(&report.rule_id).copied().unwrap_or(DEFAULT_PRIOR);
            let prior_after = (prior_before + adjustment).clamp(MIN_PRIOR, MAX_PRIOR);

            priors.insert(report.rule_id.clone(), prior_after);
            audit_log.push(CreditAuditEntry {
                request_hash: request_hash.to_string(),
                rule_id: report.rule_id.clone(),
                adjustment,
                prior_before,
                prior_after,
            });
        }
    }

    /// Snapshot of every adjustment applied so far, oldest first.
    pub async fn audit_log(&self) -> Vec<CreditAuditEntry> {
        self.audit_log.read().await.clone()
    }
}
