//! Valuation Calculator: quantities → money at the lot's acquisition cost.

use serde::{Deserialize, Serialize};

use crate::consumption::ConsumptionRecord;
use crate::layers::CostLayer;

/// Monetary split of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerValuation {
    pub value_consumed: f64,
    pub value_remaining: f64,
    pub value_total: f64,
}

/// Value the consumed and remaining parts of a layer at its unit cost.
pub fn value(layer: &CostLayer, record: &ConsumptionRecord) -> LayerValuation {
    LayerValuation {
        value_consumed: record.quantity_consumed * layer.unit_cost,
        value_remaining: record.quantity_remaining * layer.unit_cost,
        value_total: layer.quantity * layer.unit_cost,
    }
}

/// Neumaier compensated summation.
///
/// Callers feed values in chronological order so the result does not depend on
/// how the input happened to be arranged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl core::iter::FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        for x in iter {
            acc.add(x);
        }
        acc
    }
}
