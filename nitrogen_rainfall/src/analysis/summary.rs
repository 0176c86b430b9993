/// Descriptive statistics per tributary and species.

use serde::Serialize;

use crate::model::{Measurement, NitrogenSpecies};
use crate::stats::ranks::{mad, median};
use crate::tributaries::Tributary;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeciesSummary {
    pub tributary: Tributary,
    pub species: NitrogenSpecies,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    /// Median absolute deviation, unscaled.
    pub mad: Option<f64>,
}

/// One summary row per (tributary, species), in registry then species order.
pub fn summarize(measurements: &[Measurement]) -> Vec<SpeciesSummary> {
    let mut rows = Vec::with_capacity(Tributary::ALL.len() * NitrogenSpecies::ALL.len());
    for tributary in Tributary::ALL {
        let site: Vec<&Measurement> = measurements.iter().filter(|m| m.tributary == tributary).collect();
        for species in NitrogenSpecies::ALL {
            let values: Vec<f64> = site.iter().filter_map(|m| species.value(m)).collect();
            let count = values.len();
            let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
            rows.push(SpeciesSummary {
                tributary,
                species,
                count,
                missing: site.len() - count,
                min: values.iter().copied().reduce(f64::min),
                median: median(&values),
                mean,
                max: values.iter().copied().reduce(f64::max),
                mad: mad(&values),
            });
        }
    }
    rows
}
