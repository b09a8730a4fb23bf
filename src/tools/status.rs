//! Arcadia Status Tool
//!
//! Runtime status of the service, the active diet rules and the caller's role.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::access::{Caller, Permission};
use crate::build_info::BuildInfo;
use crate::diet::RuleSet;

/// Usage notes for assistants driving the tools
pub const TOOL_GUIDE: &str = r#"
# Arcadia Tool Guide

- Dates use ISO format: YYYY-MM-DD
- Weights are kilograms, ages are years, food quantities are grams per day
- recommend_food shows the computed value, its breakdown and any stored override
- Only veterinarians may store or clear an override (set/clear_recommended_food_quantity)
- Health records, vaccinations and daily checks are attributed to the caller
- A habitat cannot be deleted while animals live in it; move them first
"#;

/// Summary of the diet rule table in use
#[derive(Debug, Clone, Serialize)]
pub struct RulesSummary {
    pub species_rates: usize,
    pub default_rate: f64,
    pub dietary_need_rules: Vec<String>,
}

impl From<&RuleSet> for RulesSummary {
    fn from(rules: &RuleSet) -> Self {
        Self {
            species_rates: rules.species.rates.len(),
            default_rate: rules.species.default_rate,
            dietary_need_rules: rules.dietary_needs.iter().map(|r| r.pattern.clone()).collect(),
        }
    }
}

/// Runtime status of the Arcadia service
#[derive(Debug, Clone, Serialize)]
pub struct ArcadiaStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,

    /// Session information
    pub caller_role: &'static str,
    pub caller_user_id: Option<i64>,
    pub permissions: Vec<&'static str>,
    pub diet_rules: RulesSummary,

    pub guide: &'static str,
}

const ALL_PERMISSIONS: [Permission; 8] = [
    Permission::ViewAnimals,
    Permission::ManageAnimals,
    Permission::ManageHabitats,
    Permission::ViewFeeding,
    Permission::OverrideFeeding,
    Permission::RecordHealth,
    Permission::CommentHabitat,
    Permission::ViewReports,
];

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, caller: &Caller, rules: &RuleSet) -> ArcadiaStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        let permissions = ALL_PERMISSIONS
            .iter()
            .filter(|p| caller.role.grants(**p))
            .map(|p| p.as_str())
            .collect();

        ArcadiaStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
            caller_role: caller.role.as_str(),
            caller_user_id: caller.user_id,
            permissions,
            diet_rules: RulesSummary::from(rules),
            guide: TOOL_GUIDE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;

    #[test]
    fn test_status_reports_session() {
        let tracker = StatusTracker::new(PathBuf::from("/nonexistent/arcadia.db"));
        let status = tracker.get_status(&Caller::new(Some(9), Role::Veterinarian), &RuleSet::default());

        assert_eq!(status.process_id, std::process::id());
        assert_eq!(status.database_size_bytes, None);
        assert_eq!(status.caller_role, "veterinarian");
        assert!(status.permissions.contains(&"override_feeding"));
        assert!(!status.permissions.contains(&"manage_habitats"));
        assert_eq!(status.diet_rules.default_rate, 0.02);
        assert_eq!(status.diet_rules.dietary_need_rules, vec!["high protein", "low calorie"]);
    }

    #[test]
    fn test_anonymous_can_only_view() {
        let tracker = StatusTracker::new(PathBuf::from("arcadia.db"));
        let status = tracker.get_status(&Caller::anonymous(), &RuleSet::default());
        assert_eq!(status.permissions, vec!["view_animals"]);
    }
}
