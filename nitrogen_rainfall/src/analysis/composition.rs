/// Ternary composition of the nitrogen pool.
///
/// Each sample with nitrate, ammonium and organic N all present is reduced
/// to the three fractions of their sum, i.e. a point on a ternary diagram.
/// Samples with a missing component or a zero sum have no point.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::Measurement;
use crate::tributaries::Tributary;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TernaryPoint {
    pub date: NaiveDate,
    pub tributary: Tributary,
    pub nitrate: f64,
    pub ammonium: f64,
    pub organic: f64,
}

impl TernaryPoint {
    pub fn from_measurement(m: &Measurement) -> Option<Self> {
        let (no3, nh4, org) = (m.nitrate?, m.ammonium?, m.organic_nitrogen?);
        let total = no3 + nh4 + org;
        if total <= 0.0 {
            return None;
        }
        Some(Self {
            date: m.date,
            tributary: m.tributary,
            nitrate: no3 / total,
            ammonium: nh4 / total,
            organic: org / total,
        })
    }
}

pub fn ternary_points(measurements: &[Measurement]) -> Vec<TernaryPoint> {
    measurements.iter().filter_map(TernaryPoint::from_measurement).collect()
}

/// Mean composition of one tributary's samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositionSummary {
    pub tributary: Tributary,
    pub n: usize,
    pub mean_nitrate: f64,
    pub mean_ammonium: f64,
    pub mean_organic: f64,
}

/// Average the ternary points per tributary. Tributaries without any
/// point are omitted.
pub fn composition_by_tributary(points: &[TernaryPoint]) -> Vec<CompositionSummary> {
    Tributary::ALL
        .iter()
        .filter_map(|&tributary| {
            let site: Vec<&TernaryPoint> = points.iter().filter(|p| p.tributary == tributary).collect();
            if site.is_empty() {
                return None;
            }
            let n = site.len() as f64;
            Some(CompositionSummary {
                tributary,
                n: site.len(),
                mean_nitrate: site.iter().map(|p| p.nitrate).sum::<f64>() / n,
                mean_ammonium: site.iter().map(|p| p.ammonium).sum::<f64>() / n,
                mean_organic: site.iter().map(|p| p.organic).sum::<f64>() / n,
            })
        })
        .collect()
}
