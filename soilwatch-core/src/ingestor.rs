use crate::{
    adapter,
    error::SoilwatchError,
    ingestion_log::IngestionLog,
    views::DerivedViews,
};
use log::{debug, info, warn};
use soilwatch_schemas::{
    feed::RawFeedEntry,
    file_formats::AbsorbPolicy,
    reading::SensorRecord,
};

/// What a single poll cycle did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The snapshot held nothing past the cursor.
    NoChange,
    /// `count` records were appended; the cursor now sits at `cursor`.
    Appended { count: usize, cursor: usize },
}

/// Running counters for the whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub cycles: u64,
    pub idle_cycles: u64,
    pub fetch_failures: u64,
    pub malformed_rejections: u64,
    pub records_absorbed: u64,
}

/// Owns the log, its derived series and the cursor tying them to the feed.
///
/// Invariant: `views.len() == log.len() == next_unprocessed`. Each record is absorbed into
/// the views exactly once, at the moment it is appended.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    log: IngestionLog,
    views: DerivedViews,
    next_unprocessed: usize,
    policy: AbsorbPolicy,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(policy: AbsorbPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn log(&self) -> &IngestionLog {
        &self.log
    }

    pub fn views(&self) -> &DerivedViews {
        &self.views
    }

    pub fn next_unprocessed(&self) -> usize {
        self.next_unprocessed
    }

    pub fn policy(&self) -> AbsorbPolicy {
        self.policy
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Absorbs whatever part of `snapshot` lies past the cursor.
    ///
    /// Entries are appended in order up to the first malformed one. The cursor stops on
    /// that entry, the cycle reports it, and the same index is retried next cycle.
    pub fn absorb_snapshot(&mut self, snapshot: &[RawFeedEntry]) -> Result<CycleOutcome, SoilwatchError> {
        self.stats.cycles += 1;

        if snapshot.len() <= self.next_unprocessed {
            self.stats.idle_cycles += 1;
            debug!(
                "Snapshot of {} entries holds nothing past cursor {}",
                snapshot.len(),
                self.next_unprocessed
            );
            return Ok(CycleOutcome::NoChange);
        }

        let end = match self.policy {
            AbsorbPolicy::WholeSuffix => snapshot.len(),
            AbsorbPolicy::OnePerCycle => self.next_unprocessed + 1,
        };

        let mut count = 0;
        let mut rejected = None;
        for (index, entry) in snapshot.iter().enumerate().take(end).skip(self.next_unprocessed) {
            match adapter::adapt(entry) {
                Ok(record) => {
                    self.append(record);
                    count += 1;
                }
                Err(reason) => {
                    rejected = Some((index, reason));
                    break;
                }
            }
        }

        if count > 0 {
            info!(
                "Absorbed {} new record(s); log length is now {}",
                count,
                self.log.len()
            );
        }

        if let Some((index, reason)) = rejected {
            self.stats.malformed_rejections += 1;
            warn!("Rejecting feed entry {}: {}", index, reason);
            return Err(SoilwatchError::MalformedRecord { index, reason });
        }

        Ok(CycleOutcome::Appended {
            count,
            cursor: self.next_unprocessed,
        })
    }

    fn append(&mut self, record: SensorRecord) {
        self.views.absorb(&record);
        self.log.append(record);
        self.next_unprocessed += 1;
        self.stats.records_absorbed += 1;
    }

    /// Records a cycle whose fetch never produced a snapshot.
    pub fn record_fetch_failure(&mut self, error: &SoilwatchError) {
        self.stats.cycles += 1;
        self.stats.fetch_failures += 1;
        warn!("Poll cycle failed, retrying next tick: {}", error);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    pub(crate) fn raw(seed: u32) -> Value {
        let v = f64::from(seed);
        json!({
            "soilMoisture_sensor1": v,
            "soilMoisture_sensor2": v + 1.0,
            "soilMoisture_sensor3": v + 2.0,
            "gas_sensor1": 400.0 + v,
            "gas_sensor2": 410.0 + v,
            "gas_sensor3": 420.0 + v,
            "temperature": 20.0 + v,
            "humidity": 50.0 + v,
            "date": 1_714_550_400_000_i64 + i64::from(seed) * 60_000,
            "time": 1_714_550_400_000_i64 + i64::from(seed) * 60_000,
        })
    }

    fn snapshot(n: u32) -> Vec<Value> {
        (0..n).map(raw).collect()
    }

    fn assert_aligned(ingestor: &Ingestor) {
        assert_eq!(ingestor.next_unprocessed(), ingestor.log().len());
        assert_eq!(ingestor.views().len(), ingestor.log().len());
    }

    #[test]
    fn empty_snapshot_is_a_no_op() {
        let mut ingestor = Ingestor::new(AbsorbPolicy::WholeSuffix);
        assert_eq!(ingestor.absorb_snapshot(&[]).unwrap(), CycleOutcome::NoChange);
        assert!(ingestor.log().is_empty());
        assert_eq!(ingestor.stats().idle_cycles, 1);
    }

    #[test]
    fn whole_suffix_absorbs_only_new_entries() {
        let mut ingestor = Ingestor::new(AbsorbPolicy::WholeSuffix);
        assert_eq!(
            ingestor.absorb_snapshot(&snapshot(3)).unwrap(),
            CycleOutcome::Appended { count: 3, cursor: 3 }
        );
        assert_eq!(
            ingestor.absorb_snapshot(&snapshot(5)).unwrap(),
            CycleOutcome::Appended { count: 2, cursor: 5 }
        );
        assert_eq!(ingestor.absorb_snapshot(&snapshot(5)).unwrap(), CycleOutcome::NoChange);
        assert_eq!(ingestor.log().len(), 5);
        assert_eq!(ingestor.log().get(4).unwrap().temperature, 24.0);
        assert_aligned(&ingestor);
    }

    #[test]
    fn one_per_cycle_throttles_absorption() {
        let mut ingestor = Ingestor::new(AbsorbPolicy::OnePerCycle);
        let feed = snapshot(3);
        for expected in 1..=3 {
            assert_eq!(
                ingestor.absorb_snapshot(&feed).unwrap(),
                CycleOutcome::Appended { count: 1, cursor: expected }
            );
        }
        assert_eq!(ingestor.absorb_snapshot(&feed).unwrap(), CycleOutcome::NoChange);
        assert_aligned(&ingestor);
    }

    #[test]
    fn malformed_entry_stalls_cursor_after_valid_prefix() {
        let mut ingestor = Ingestor::new(AbsorbPolicy::WholeSuffix);
        ingestor.absorb_snapshot(&snapshot(1)).unwrap();

        let mut feed = snapshot(4);
        feed[3]["humidity"] = json!("n/a");
        let err = ingestor.absorb_snapshot(&feed).unwrap_err();
        assert!(matches!(err, SoilwatchError::MalformedRecord { index: 3, .. }));
        assert_eq!(ingestor.log().len(), 3);
        assert_eq!(ingestor.next_unprocessed(), 3);
        assert_eq!(ingestor.stats().malformed_rejections, 1);
        assert_aligned(&ingestor);

        assert!(ingestor.absorb_snapshot(&feed).is_err());
        assert_eq!(ingestor.log().len(), 3);

        feed[3] = raw(3);
        assert_eq!(
            ingestor.absorb_snapshot(&feed).unwrap(),
            CycleOutcome::Appended { count: 1, cursor: 4 }
        );
        assert_eq!(ingestor.log().get(3).unwrap().temperature, 23.0);
        assert_aligned(&ingestor);
    }

    #[test]
    fn both_policies_keep_every_entry_before_a_bad_one() {
        let mut feed = snapshot(4);
        feed[3]["humidity"] = json!("n/a");
        for policy in [AbsorbPolicy::WholeSuffix, AbsorbPolicy::OnePerCycle] {
            let mut ingestor = Ingestor::new(policy);
            for _ in 0..5 {
                let _ = ingestor.absorb_snapshot(&feed);
            }
            assert_eq!(ingestor.log().len(), 3, "{:?}", policy);
            assert_eq!(ingestor.next_unprocessed(), 3, "{:?}", policy);
            assert_aligned(&ingestor);
        }
    }

    #[test]
    fn n_cycles_with_n_new_entries_grow_log_by_n() {
        let mut ingestor = Ingestor::new(AbsorbPolicy::OnePerCycle);
        for n in 1..=12 {
            ingestor.absorb_snapshot(&snapshot(n)).unwrap();
            assert_eq!(ingestor.log().len(), n as usize);
            assert_aligned(&ingestor);
        }
        assert_eq!(ingestor.stats().records_absorbed, 12);
    }

    #[test]
    fn fetch_failure_counts_without_touching_cursor() {
        let mut ingestor = Ingestor::new(AbsorbPolicy::WholeSuffix);
        ingestor.absorb_snapshot(&snapshot(1)).unwrap();
        ingestor.record_fetch_failure(&SoilwatchError::FetchFailure("connection reset".into()));
        assert_eq!(ingestor.next_unprocessed(), 1);
        assert_eq!(ingestor.stats().fetch_failures, 1);
        assert_eq!(ingestor.stats().cycles, 2);
    }
}
