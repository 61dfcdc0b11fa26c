//! Monitoring dataset
//!
//! Groups the records of one monitoring run by kind and answers the lookups
//! the estimators need: parameters of a service execution, records of one
//! entity, and external calls issued by one caller.

use crate::parameters::ServiceParameters;
use crate::records::{
    BranchRecord, LoopRecord, MonitoredRecord, ResourceUtilizationRecord, ResponseTimeRecord,
    ServiceCallRecord,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

/// Service calls indexed by service execution id
#[derive(Debug, Clone, Default)]
pub struct ServiceCallDataSet {
    calls: Vec<ServiceCallRecord>,
    by_execution: HashMap<String, usize>,
}

impl ServiceCallDataSet {
    pub fn new(calls: Vec<ServiceCallRecord>) -> Self {
        let by_execution = calls
            .iter()
            .enumerate()
            .map(|(i, c)| (c.service_execution_id.clone(), i))
            .collect();
        Self {
            calls,
            by_execution,
        }
    }

    pub fn calls(&self) -> &[ServiceCallRecord] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn by_execution_id(&self, service_execution_id: &str) -> Option<&ServiceCallRecord> {
        self.by_execution
            .get(service_execution_id)
            .map(|&i| &self.calls[i])
    }

    /// Parameters of a service execution, empty if the execution is unknown
    pub fn parameters_of(&self, service_execution_id: &str) -> ServiceParameters {
        self.by_execution_id(service_execution_id)
            .map(|c| c.parameters.clone())
            .unwrap_or_default()
    }

    /// Calls of `service_id` issued by the action `caller_id`
    pub fn calls_by_caller(&self, service_id: &str, caller_id: &str) -> Vec<&ServiceCallRecord> {
        self.calls
            .iter()
            .filter(|c| c.service_id == service_id && c.caller_id.as_deref() == Some(caller_id))
            .collect()
    }

    /// Calls issued from within one caller execution
    pub fn calls_in_execution(&self, caller_service_execution_id: &str) -> Vec<&ServiceCallRecord> {
        self.calls
            .iter()
            .filter(|c| c.caller_service_execution_id.as_deref() == Some(caller_service_execution_id))
            .collect()
    }
}

/// Serialized layout of a monitoring dump
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringDump {
    pub service_calls: Vec<ServiceCallRecord>,
    pub external_calls: Vec<ServiceCallRecord>,
    pub loops: Vec<LoopRecord>,
    pub branches: Vec<BranchRecord>,
    pub resource_utilizations: Vec<ResourceUtilizationRecord>,
    pub response_times: Vec<ResponseTimeRecord>,
    /// Flat record stream, merged into the typed lists above
    pub records: Vec<MonitoredRecord>,
}

/// All records of one monitoring run
#[derive(Debug, Clone, Default)]
pub struct MonitoringDataSet {
    service_calls: ServiceCallDataSet,
    external_calls: ServiceCallDataSet,
    loops: Vec<LoopRecord>,
    branches: Vec<BranchRecord>,
    utilizations: Vec<ResourceUtilizationRecord>,
    response_times: Vec<ResponseTimeRecord>,
}

impl MonitoringDataSet {
    pub fn from_records(records: impl IntoIterator<Item = MonitoredRecord>) -> Self {
        Self::from_dump(MonitoringDump {
            records: records.into_iter().collect(),
            ..Default::default()
        })
    }

    pub fn from_dump(dump: MonitoringDump) -> Self {
        let MonitoringDump {
            mut service_calls,
            mut external_calls,
            mut loops,
            mut branches,
            mut resource_utilizations,
            mut response_times,
            records,
        } = dump;

        for record in records {
            match record {
                MonitoredRecord::ServiceCall(r) => service_calls.push(r),
                MonitoredRecord::ExternalCall(r) => external_calls.push(r),
                MonitoredRecord::Loop(r) => loops.push(r),
                MonitoredRecord::Branch(r) => branches.push(r),
                MonitoredRecord::ResourceUtilization(r) => resource_utilizations.push(r),
                MonitoredRecord::ResponseTime(r) => response_times.push(r),
            }
        }
        resource_utilizations.sort_by_key(|r| r.timestamp);

        Self {
            service_calls: ServiceCallDataSet::new(service_calls),
            external_calls: ServiceCallDataSet::new(external_calls),
            loops,
            branches,
            utilizations: resource_utilizations,
            response_times,
        }
    }

    /// Load a JSON monitoring dump
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read monitoring data: {}", path.as_ref().display())
        })?;
        let dump: MonitoringDump = serde_json::from_str(&content)
            .with_context(|| "Failed to parse monitoring data JSON")?;
        Ok(Self::from_dump(dump))
    }

    pub fn service_calls(&self) -> &ServiceCallDataSet {
        &self.service_calls
    }

    pub fn external_calls(&self) -> &ServiceCallDataSet {
        &self.external_calls
    }

    pub fn loops(&self) -> &[LoopRecord] {
        &self.loops
    }

    pub fn branches(&self) -> &[BranchRecord] {
        &self.branches
    }

    pub fn resource_utilizations(&self) -> &[ResourceUtilizationRecord] {
        &self.utilizations
    }

    pub fn response_times(&self) -> &[ResponseTimeRecord] {
        &self.response_times
    }

    /// Loop records grouped by loop id
    pub fn loops_by_id(&self) -> BTreeMap<&str, Vec<&LoopRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&LoopRecord>> = BTreeMap::new();
        for record in &self.loops {
            grouped.entry(record.loop_id.as_str()).or_default().push(record);
        }
        grouped
    }

    /// Branch records grouped by branch id
    pub fn branches_by_id(&self) -> BTreeMap<&str, Vec<&BranchRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&BranchRecord>> = BTreeMap::new();
        for record in &self.branches {
            grouped
                .entry(record.branch_id.as_str())
                .or_default()
                .push(record);
        }
        grouped
    }

    /// Ids of internal actions with at least one response time record
    pub fn monitored_internal_actions(&self) -> BTreeSet<&str> {
        self.response_times
            .iter()
            .map(|r| r.internal_action_id.as_str())
            .collect()
    }

    /// Parameters of an execution, searching service calls then external calls
    pub fn parameters_of(&self, service_execution_id: &str) -> ServiceParameters {
        self.service_calls
            .by_execution_id(service_execution_id)
            .or_else(|| self.external_calls.by_execution_id(service_execution_id))
            .map(|c| c.parameters.clone())
            .unwrap_or_default()
    }

    /// Utilization samples of one resource, ordered by time
    pub fn utilization_of(&self, resource_id: &str) -> Vec<&ResourceUtilizationRecord> {
        self.utilizations
            .iter()
            .filter(|u| u.resource_id == resource_id)
            .collect()
    }
}
