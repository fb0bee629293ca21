use crate::error::SoilwatchError;
use soilwatch_schemas::reading::SensorRecord;

/// Append-only history of every record absorbed during a session.
///
/// Arrival order is the identity of a record: nothing is ever reordered, removed or
/// deduplicated by content.
#[derive(Debug, Clone, Default)]
pub struct IngestionLog {
    records: Vec<SensorRecord>,
}

impl IngestionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: SensorRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SensorRecord> {
        self.records.get(index)
    }

    /// Returns `[start, end)`. Callers clamp first; an out-of-range request is a defect.
    pub fn slice(&self, start: usize, end: usize) -> Result<&[SensorRecord], SoilwatchError> {
        if start > end || end > self.records.len() {
            return Err(SoilwatchError::Range {
                start,
                end,
                len: self.records.len(),
            });
        }
        Ok(&self.records[start..end])
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// A record whose every metric carries `seed`, stamped `seed` minutes after a fixed epoch.
    pub(crate) fn record(seed: u32) -> SensorRecord {
        let v = f64::from(seed);
        SensorRecord {
            soil_moisture: [v, v + 0.1, v + 0.2],
            gas: [v + 100.0, v + 100.1, v + 100.2],
            temperature: v + 200.0,
            humidity: v + 300.0,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
                + chrono::Duration::minutes(i64::from(seed)),
        }
    }

    #[test]
    fn appends_in_arrival_order_without_deduplicating() {
        let mut log = IngestionLog::new();
        log.append(record(1));
        log.append(record(1));
        log.append(record(2));
        assert_eq!(log.len(), 3);
        assert_eq!(log.get(0), log.get(1));
        assert_eq!(log.get(2), Some(&record(2)));
    }

    #[test]
    fn slice_returns_half_open_range() {
        let mut log = IngestionLog::new();
        for seed in 0..5 {
            log.append(record(seed));
        }
        let slice = log.slice(1, 4).unwrap();
        assert_eq!(slice, &[record(1), record(2), record(3)]);
        assert!(log.slice(5, 5).unwrap().is_empty());
    }

    #[test]
    fn slice_rejects_out_of_range_bounds() {
        let mut log = IngestionLog::new();
        log.append(record(0));
        assert!(matches!(
            log.slice(0, 2),
            Err(SoilwatchError::Range { start: 0, end: 2, len: 1 })
        ));
        assert!(matches!(log.slice(1, 0), Err(SoilwatchError::Range { .. })));
    }
}
