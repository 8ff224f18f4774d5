use std::str::FromStr;
use serde::Deserialize;

/// Which end of the ready queue the scheduler dispatches from.
///
/// - `First`: oldest ready task first (`poll_first`, default behaviour).
/// - `Last`: most recently readied task first (`poll_last`). Useful to
///   finish one chain before starting unrelated work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOrder {
    First,
    Last,
}

impl Default for DispatchOrder {
    fn default() -> Self {
        DispatchOrder::First
    }
}

impl FromStr for DispatchOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "fifo" => Ok(DispatchOrder::First),
            "last" | "lifo" => Ok(DispatchOrder::Last),
            other => Err(format!(
                "invalid dispatch_order: {other} (expected \"first\" or \"last\")"
            )),
        }
    }
}
