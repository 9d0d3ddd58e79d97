//! Sliding-window estimate of the typical cap side length

use crate::object::DetectedObject;
use crate::Result;
use capscan_core::CapScanError;
use serde::{Deserialize, Serialize};

/// Winning window of the size scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapSizeEstimate {
    /// Mean side length of the objects in the winning window
    pub avg_size: f64,
    /// Start of the winning window
    pub best_pos: i32,
    /// Mean squared distance from the window center
    pub cost: f64,
    /// Gathered objects plus circular inner objects
    pub weight: usize,
}

impl CapSizeEstimate {
    /// Expected size in whole pixels, as used by the classifier
    pub fn expected_size(&self) -> i32 {
        self.avg_size as i32
    }
}

pub struct SizeEstimator {
    window_size: i32,
}

impl SizeEstimator {
    pub fn new(window_size: i32) -> Self {
        Self { window_size }
    }

    /// Slide a window of fixed width over the side lengths and keep the
    /// heaviest one. Equal weights go to the lower cost, later windows win
    /// exact ties.
    pub fn estimate(&self, objects: &[DetectedObject]) -> Result<CapSizeEstimate> {
        if objects.is_empty() {
            return Err(CapScanError::validation("size estimation needs at least one object").into());
        }

        let min_side = objects.iter().map(|o| o.max_side_length as i32).min().unwrap_or(0);
        let max_side = objects.iter().map(|o| o.max_side_length as i32).max().unwrap_or(0);

        let mut best: Option<(CapSizeEstimate, Vec<i32>)> = None;
        for pos in min_side..=max_side {
            let upper = (pos + self.window_size) as f64;
            let gathered: Vec<&DetectedObject> = objects
                .iter()
                .filter(|o| o.max_side_length >= pos as f64 && o.max_side_length <= upper)
                .collect();
            if gathered.is_empty() {
                continue;
            }

            let sides: Vec<i32> = gathered.iter().map(|o| o.max_side_length as i32).collect();
            let bonus = gathered.iter().filter(|o| o.is_inner_object && o.is_circle).count();
            let weight = gathered.len() + bonus;

            let center = pos + self.window_size / 2;
            let cost = sides
                .iter()
                .map(|s| ((center - s) as f64).powi(2))
                .sum::<f64>()
                / sides.len() as f64;

            let better = match &best {
                None => true,
                Some((b, _)) => weight > b.weight || (weight == b.weight && cost <= b.cost),
            };
            if better {
                let estimate = CapSizeEstimate {
                    avg_size: 0.0,
                    best_pos: pos,
                    cost,
                    weight,
                };
                best = Some((estimate, sides));
            }
        }

        let Some((mut estimate, sides)) = best else {
            return Err(CapScanError::validation("no size window gathered any object").into());
        };
        estimate.avg_size = sides.iter().map(|&s| s as f64).sum::<f64>() / sides.len() as f64;

        tracing::info!(
            "Expected cap size: {:.2} px (optimization value {:.2}, weight {})",
            estimate.avg_size,
            estimate.cost,
            estimate.weight
        );
        Ok(estimate)
    }
}
