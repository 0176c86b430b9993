/// Per-tributary series for one nitrogen species.
///
/// Each tributary gets its own date-keyed map so that any two sites can be
/// paired on the dates both were sampled (pairwise-complete), regardless of
/// what the third site did.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::logging::{self, Stage};
use crate::model::{JoinedRecord, NitrogenSpecies};
use crate::tributaries::Tributary;

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesSeries {
    pub species: NitrogenSpecies,
    by_tributary: [BTreeMap<NaiveDate, f64>; 3],
}

impl SpeciesSeries {
    /// Build the series from joined records. Missing concentrations are
    /// skipped; if a site has two samples on one date the first is kept.
    pub fn pivot(records: &[JoinedRecord], species: NitrogenSpecies) -> Self {
        let mut by_tributary: [BTreeMap<NaiveDate, f64>; 3] = Default::default();
        let mut duplicates = 0;

        for record in records {
            let m = &record.measurement;
            let Some(value) = species.value(m) else {
                continue;
            };
            let series = &mut by_tributary[m.tributary.index()];
            if series.contains_key(&m.date) {
                duplicates += 1;
                continue;
            }
            series.insert(m.date, value);
        }

        if duplicates > 0 {
            logging::warn(
                Stage::Analyze,
                Some(species.label()),
                &format!("{} same-day duplicate sample(s) ignored; first kept", duplicates),
            );
        }

        Self { species, by_tributary }
    }

    pub fn get(&self, tributary: Tributary) -> &BTreeMap<NaiveDate, f64> {
        &self.by_tributary[tributary.index()]
    }

    /// Values of two sites on the dates both have a value, date-ordered.
    pub fn paired(&self, a: Tributary, b: Tributary) -> (Vec<f64>, Vec<f64>) {
        let other = self.get(b);
        self.get(a)
            .iter()
            .filter_map(|(date, va)| other.get(date).map(|vb| (*va, *vb)))
            .unzip()
    }
}
