//! pardep - parametric dependency estimation for performance models
//!
//! Turns runtime monitoring records into stochastic expressions for the
//! loops, branches, resource demands and external call arguments of an
//! architecture model. Each quantity is modelled per entity by a linear
//! regression or a decision tree over the observed call parameters, and
//! can be refined by a symbolic regression search.

pub mod architecture;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod estimation;
pub mod estimator;
pub mod expression;
pub mod monitoring;
pub mod optimizer;
pub mod parameters;
pub mod records;
pub mod stoex;
