//! Monitored records
//!
//! One record per observed runtime event. Records are immutable once built
//! and (de)serialize to the JSON layout used by monitoring dumps.

use crate::parameters::ServiceParameters;
use serde::{Deserialize, Serialize};

/// Sentinel for a branch record whose branch executed no transition
pub const BRANCH_NOT_TAKEN: &str = "<not set>";

/// A service (or external) call observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCallRecord {
    #[serde(default)]
    pub session_id: String,
    pub service_execution_id: String,
    /// Id of the called service
    pub service_id: String,
    #[serde(default)]
    pub parameters: ServiceParameters,
    /// Execution id of the calling service, absent for entry calls
    #[serde(default)]
    pub caller_service_execution_id: Option<String>,
    /// Id of the calling action (external call action for external calls)
    #[serde(default)]
    pub caller_id: Option<String>,
    #[serde(default)]
    pub entry_time: u64,
    #[serde(default)]
    pub exit_time: u64,
    #[serde(default)]
    pub return_value: ServiceParameters,
}

impl ServiceCallRecord {
    pub fn new(
        service_execution_id: impl Into<String>,
        service_id: impl Into<String>,
        parameters: ServiceParameters,
    ) -> Self {
        Self {
            session_id: String::new(),
            service_execution_id: service_execution_id.into(),
            service_id: service_id.into(),
            parameters,
            caller_service_execution_id: None,
            caller_id: None,
            entry_time: 0,
            exit_time: 0,
            return_value: ServiceParameters::new(),
        }
    }

    pub fn with_caller(
        mut self,
        caller_service_execution_id: impl Into<String>,
        caller_id: impl Into<String>,
    ) -> Self {
        self.caller_service_execution_id = Some(caller_service_execution_id.into());
        self.caller_id = Some(caller_id.into());
        self
    }

    pub fn with_times(mut self, entry_time: u64, exit_time: u64) -> Self {
        self.entry_time = entry_time;
        self.exit_time = exit_time;
        self
    }

    pub fn with_return_value(mut self, return_value: ServiceParameters) -> Self {
        self.return_value = return_value;
        self
    }

    pub fn response_time(&self) -> u64 {
        self.exit_time.saturating_sub(self.entry_time)
    }
}

/// Iteration count of one loop execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopRecord {
    #[serde(default)]
    pub session_id: String,
    pub service_execution_id: String,
    pub loop_id: String,
    pub loop_iteration_count: i64,
}

impl LoopRecord {
    pub fn new(
        service_execution_id: impl Into<String>,
        loop_id: impl Into<String>,
        loop_iteration_count: i64,
    ) -> Self {
        Self {
            session_id: String::new(),
            service_execution_id: service_execution_id.into(),
            loop_id: loop_id.into(),
            loop_iteration_count,
        }
    }
}

/// Executed transition of one branch execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    #[serde(default)]
    pub session_id: String,
    pub service_execution_id: String,
    pub branch_id: String,
    #[serde(default)]
    pub executed_branch_id: String,
}

impl BranchRecord {
    pub fn new(
        service_execution_id: impl Into<String>,
        branch_id: impl Into<String>,
        executed_branch_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: String::new(),
            service_execution_id: service_execution_id.into(),
            branch_id: branch_id.into(),
            executed_branch_id: executed_branch_id.into(),
        }
    }

    /// Executed transition id with "not taken" normalized to the sentinel
    pub fn executed_transition(&self) -> &str {
        if self.executed_branch_id.is_empty() {
            BRANCH_NOT_TAKEN
        } else {
            &self.executed_branch_id
        }
    }

    pub fn is_not_taken(&self) -> bool {
        self.executed_transition() == BRANCH_NOT_TAKEN
    }
}

/// Sampled utilization of a processing resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilizationRecord {
    pub resource_id: String,
    pub timestamp: u64,
    /// Utilization in `[0, 1]` since the previous sample
    pub utilization: f64,
}

/// Response time of one internal action execution on a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeRecord {
    #[serde(default)]
    pub session_id: String,
    pub service_execution_id: String,
    pub internal_action_id: String,
    pub resource_id: String,
    pub start_time: u64,
    pub stop_time: u64,
}

impl ResponseTimeRecord {
    pub fn response_time(&self) -> u64 {
        self.stop_time.saturating_sub(self.start_time)
    }
}

/// Any monitored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitoredRecord {
    ServiceCall(ServiceCallRecord),
    ExternalCall(ServiceCallRecord),
    Loop(LoopRecord),
    Branch(BranchRecord),
    ResourceUtilization(ResourceUtilizationRecord),
    ResponseTime(ResponseTimeRecord),
}
