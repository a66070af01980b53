//! Cost Estimator
//!
//! Recursive walk over the selection tree computing a cost/depth pair
//! before execution. The walk is pure: estimating the same unchanged tree
//! twice yields the same result.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::schema::SchemaMeta;
use crate::error::GovernanceError;
use crate::request::{Document, Selection};

/// Default cost ceiling
pub const DEFAULT_MAXIMUM_COST: u64 = 1000;

/// Default base cost for a field with nested selections
pub const DEFAULT_FIELD_COST: u64 = 1;

/// Default cost of a scalar leaf field
pub const DEFAULT_SCALAR_COST: u64 = 1;

/// Default amplification for list-typed fields, whose cardinality is
/// unknown statically and assumed worst-case
pub const DEFAULT_LIST_MULTIPLIER: u64 = 10;

/// Cost estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Reject queries whose total cost exceeds this ceiling
    pub maximum_cost: u64,

    /// Base cost for a field with nested selections
    pub default_cost: u64,

    /// Cost of a scalar leaf field
    pub scalar_cost: u64,

    /// Base cost for object fields; accepted for option-surface parity,
    /// currently equivalent to `default_cost`
    pub object_cost: u64,

    /// Multiplier applied to the child-selection cost of list-typed fields
    pub list_multiplier: u64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            maximum_cost: DEFAULT_MAXIMUM_COST,
            default_cost: DEFAULT_FIELD_COST,
            scalar_cost: DEFAULT_SCALAR_COST,
            object_cost: DEFAULT_FIELD_COST,
            list_multiplier: DEFAULT_LIST_MULTIPLIER,
        }
    }
}

/// Result of estimating one operation, computed bottom-up per selection.
/// Never persisted; lives for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostResult {
    /// Total estimated cost of the operation
    pub cost: u64,

    /// Maximum selection nesting depth reached
    pub depth: u32,
}

/// Static query-cost estimator
#[derive(Debug, Clone)]
pub struct CostEstimator {
    config: CostConfig,
}

impl CostEstimator {
    /// Create an estimator with the given configuration
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    /// The configured cost ceiling
    pub fn maximum_cost(&self) -> u64 {
        self.config.maximum_cost
    }

    /// Estimate the cost and depth of one operation.
    ///
    /// Per field: introspection fields (`__`-prefixed) are skipped; a leaf
    /// field costs `scalar_cost`; a field with children costs
    /// `default_cost` plus the child-selection sum, with the sum first
    /// multiplied by `list_multiplier` when the schema declares the field
    /// list-typed. Fragment spreads resolve against the document's fragment
    /// definitions and are costed at the spread site's depth, once per
    /// reference site.
    pub fn estimate(&self, document: &Document, schema: &SchemaMeta) -> CostResult {
        let result = self.selection_set_cost(&document.selections, document, schema, 1);
        debug!(cost = result.cost, depth = result.depth, "estimated query cost");
        result
    }

    /// Estimate and enforce the ceiling in one step
    pub fn enforce(
        &self,
        document: &Document,
        schema: &SchemaMeta,
    ) -> Result<CostResult, GovernanceError> {
        let result = self.estimate(document, schema);
        self.check(result)?;
        Ok(result)
    }

    /// Check an already-computed result against the ceiling
    pub fn check(&self, result: CostResult) -> Result<(), GovernanceError> {
        if result.cost > self.config.maximum_cost {
            return Err(GovernanceError::CostExceeded {
                cost: result.cost,
                maximum_cost: self.config.maximum_cost,
            });
        }
        Ok(())
    }

    fn selection_set_cost(
        &self,
        selections: &[Selection],
        document: &Document,
        schema: &SchemaMeta,
        depth: u32,
    ) -> CostResult {
        let mut total: u64 = 0;
        let mut max_depth = depth;

        for selection in selections {
            match selection {
                Selection::Field { name, children, .. } => {
                    if name.starts_with("__") {
                        continue;
                    }

                    let field_cost = if children.is_empty() {
                        self.config.scalar_cost
                    } else {
                        let nested =
                            self.selection_set_cost(children, document, schema, depth + 1);
                        max_depth = max_depth.max(nested.depth);

                        let amplified = if schema.is_list(name) {
                            nested.cost.saturating_mul(self.config.list_multiplier)
                        } else {
                            nested.cost
                        };
                        self.config.default_cost.saturating_add(amplified)
                    };

                    total = total.saturating_add(field_cost);
                }
                Selection::InlineFragment { selections } => {
                    let nested = self.selection_set_cost(selections, document, schema, depth);
                    total = total.saturating_add(nested.cost);
                    max_depth = max_depth.max(nested.depth);
                }
                Selection::FragmentSpread { name } => {
                    // Costed once per reference site; no memoization across
                    // sites, matching actual execution cost.
                    if let Some(fragment) = document.fragments.get(name) {
                        let nested =
                            self.selection_set_cost(&fragment.selections, document, schema, depth);
                        total = total.saturating_add(nested.cost);
                        max_depth = max_depth.max(nested.depth);
                    }
                }
            }
        }

        CostResult {
            cost: total,
            depth: max_depth,
        }
    }
}
