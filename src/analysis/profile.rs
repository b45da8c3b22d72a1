use chrono::{Datelike, Timelike};
use itertools::Itertools;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::domain::{DispatchRecord, DispatchResult, Metric};

/// Values of every metric for one calendar bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow<K> {
    pub key: K,
    /// Hours that fell into the bucket
    pub hours: usize,
    pub values: Vec<(Metric, f64)>,
}

impl<K> ProfileRow<K> {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.iter().find(|(m, _)| *m == metric).map(|(_, v)| *v)
    }
}

/// Mean of every metric per hour of day, ordered by hour.
///
/// Hours absent from the result have no row.
pub fn hourly_profile(result: &DispatchResult) -> Vec<ProfileRow<u32>> {
    result
        .records
        .iter()
        .into_group_map_by(|r| r.timestamp.hour())
        .into_iter()
        .sorted_by_key(|(hour, _)| *hour)
        .map(|(hour, records)| {
            let n = records.len() as f64;
            ProfileRow {
                key: hour,
                hours: records.len(),
                values: sums(&records).into_iter().map(|(m, s)| (m, s / n)).collect(),
            }
        })
        .collect()
}

/// Sum of every metric per calendar month, keyed by `(year, month)`
pub fn monthly_totals(result: &DispatchResult) -> Vec<ProfileRow<(i32, u32)>> {
    result
        .records
        .iter()
        .into_group_map_by(|r| (r.timestamp.year(), r.timestamp.month()))
        .into_iter()
        .sorted_by_key(|(key, _)| *key)
        .map(|(key, records)| ProfileRow {
            key,
            hours: records.len(),
            values: sums(&records),
        })
        .collect()
}

fn sums(records: &[&DispatchRecord]) -> Vec<(Metric, f64)> {
    Metric::iter()
        .map(|m| (m, records.iter().map(|r| r.metric(m)).sum()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FormulationKind;
    use chrono::{Duration, TimeZone, Utc};

    fn result() -> DispatchResult {
        // 2024-01-31 22:00 .. 2024-02-01 01:00
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap();
        let records = (0..28)
            .map(|h| {
                let gas = f64::from(h as u32 % 3);
                DispatchRecord {
                    timestamp: start + Duration::hours(h),
                    chp_gas_in: gas,
                    chp_el_out: 0.4 * gas,
                    chp_heat_out: 0.5 * gas,
                    chp_status: u8::from(gas > 0.0),
                    boiler_gas_in: 1.0,
                    boiler_heat_out: 0.8,
                }
            })
            .collect();
        DispatchResult::new(FormulationKind::Direct, records)
    }

    #[test]
    fn test_hourly_profile() {
        let profile = hourly_profile(&result());
        assert_eq!(profile.len(), 24);
        assert_eq!(profile[0].key, 0);
        // hour 22 occurs twice: h = 0 and h = 24
        let late = profile.iter().find(|r| r.key == 22).unwrap();
        assert_eq!(late.hours, 2);
        assert_eq!(late.get(Metric::ChpGasIn), Some(0.0));
        assert_eq!(late.get(Metric::BoilerGasIn), Some(1.0));
    }

    #[test]
    fn test_monthly_totals() {
        let totals = monthly_totals(&result());
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].key, (2024, 1));
        assert_eq!(totals[0].hours, 2);
        assert_eq!(totals[1].hours, 26);
        let boiler: f64 = totals.iter().filter_map(|r| r.get(Metric::BoilerGasIn)).sum();
        assert!((boiler - 28.0).abs() < 1e-12);
    }
}
