//! Architecture model receiving the estimated expressions
//!
//! A flat JSON rendition of the performance model: loops with an iteration
//! count slot, branches whose transitions carry a probability slot,
//! internal actions with per-resource demand slots, and external call
//! actions with their variable usages. Estimation only writes slots; the
//! structure is read as-is.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Characterisation written for estimated argument usages
pub const VALUE_CHARACTERISATION: &str = "VALUE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopAction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_count: Option<String>,
}

impl LoopAction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            iteration_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTransition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchAction {
    pub id: String,
    #[serde(default)]
    pub transitions: Vec<BranchTransition>,
}

impl BranchAction {
    pub fn new<I, S>(id: impl Into<String>, transitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            transitions: transitions
                .into_iter()
                .map(|t| BranchTransition {
                    id: t.into(),
                    probability: None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDemand {
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
}

impl ResourceDemand {
    /// The specification as a number, when it is a plain constant
    pub fn constant_value(&self) -> Option<f64> {
        self.specification
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
    }
}

/// Transition of an enclosing branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchContext {
    pub branch_id: String,
    pub transition_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalAction {
    pub id: String,
    /// Service whose executions run this action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing_loop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing_branch: Option<BranchContext>,
    #[serde(default)]
    pub resource_demands: Vec<ResourceDemand>,
}

impl InternalAction {
    pub fn new<I, S>(id: impl Into<String>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            service_id: None,
            enclosing_loop: None,
            enclosing_branch: None,
            resource_demands: resources
                .into_iter()
                .map(|r| ResourceDemand {
                    resource_id: r.into(),
                    specification: None,
                })
                .collect(),
        }
    }

    pub fn in_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn in_loop(mut self, loop_id: impl Into<String>) -> Self {
        self.enclosing_loop = Some(loop_id.into());
        self
    }

    pub fn in_branch(mut self, branch_id: impl Into<String>, transition_id: impl Into<String>) -> Self {
        self.enclosing_branch = Some(BranchContext {
            branch_id: branch_id.into(),
            transition_id: transition_id.into(),
        });
        self
    }

    pub fn with_constant_demand(mut self, resource_id: &str, demand: f64) -> Self {
        for slot in &mut self.resource_demands {
            if slot.resource_id == resource_id {
                slot.specification = Some(demand.to_string());
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableUsage {
    /// Dotted parameter reference, e.g. `count.VALUE`
    pub name: String,
    pub characterisation: String,
    pub specification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCallAction {
    pub id: String,
    pub called_service_id: String,
    /// Services called earlier in the same behaviour, in call order
    #[serde(default)]
    pub predecessor_service_ids: Vec<String>,
    #[serde(default)]
    pub variable_usages: Vec<VariableUsage>,
}

impl ExternalCallAction {
    pub fn new(id: impl Into<String>, called_service_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            called_service_id: called_service_id.into(),
            predecessor_service_ids: Vec::new(),
            variable_usages: Vec::new(),
        }
    }

    /// Insert or replace the usage for `name`
    pub fn set_variable_usage(&mut self, name: &str, specification: String) {
        match self.variable_usages.iter_mut().find(|u| u.name == name) {
            Some(usage) => usage.specification = specification,
            None => self.variable_usages.push(VariableUsage {
                name: name.to_string(),
                characterisation: VALUE_CHARACTERISATION.to_string(),
                specification,
            }),
        }
    }
}

/// The target model, enumerable per entity kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureModel {
    pub loops: Vec<LoopAction>,
    pub branches: Vec<BranchAction>,
    pub internal_actions: Vec<InternalAction>,
    pub external_calls: Vec<ExternalCallAction>,
}

impl ArchitectureModel {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read architecture model: {}", path.as_ref().display())
        })?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse architecture model JSON: {}",
                path.as_ref().display()
            )
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize architecture model")
    }

    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json_pretty()?;
        fs::write(path.as_ref(), json).with_context(|| {
            format!("Failed to write architecture model: {}", path.as_ref().display())
        })
    }

    pub fn internal_action(&self, id: &str) -> Option<&InternalAction> {
        self.internal_actions.iter().find(|a| a.id == id)
    }

    /// Number of filled and empty slots, in that order
    pub fn slot_summary(&self) -> (usize, usize) {
        let mut slots: Vec<bool> = Vec::new();
        slots.extend(self.loops.iter().map(|l| l.iteration_count.is_some()));
        for branch in &self.branches {
            slots.extend(branch.transitions.iter().map(|t| t.probability.is_some()));
        }
        for action in &self.internal_actions {
            slots.extend(action.resource_demands.iter().map(|d| d.specification.is_some()));
        }
        let filled = slots.iter().filter(|s| **s).count();
        (filled, slots.len() - filled)
    }
}
