// src/engine/runtime.rs

use std::sync::Arc;

use tracing::info;

use crate::config::model::ConfigFile;
use crate::engine::core::plan;
use crate::engine::discovery::discover_all;
use crate::engine::{Plan, PlanOptions};
use crate::errors::Result;
use crate::walk::HandlerRegistry;

/// Discover dependencies of every task, then plan.
///
/// This is the async shell around [`plan`]: the walks run on Tokio's
/// blocking pool, planning itself is synchronous.
pub async fn plan_build(cfg: &ConfigFile, options: &PlanOptions) -> Result<Plan> {
    plan_build_with(cfg, options, Arc::new(HandlerRegistry::with_defaults())).await
}

/// [`plan_build`] with a caller-supplied handler registry.
pub async fn plan_build_with(
    cfg: &ConfigFile,
    options: &PlanOptions,
    registry: Arc<HandlerRegistry>,
) -> Result<Plan> {
    info!(tasks = cfg.task.len(), "planning build");
    let discoveries = discover_all(cfg, registry).await?;
    plan(cfg, &discoveries, options)
}
