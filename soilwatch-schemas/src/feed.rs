//! Field names of the remote spreadsheet feed.
//!
//! The feed is a JSON array of loosely typed objects. Entries stay untyped until the
//! record schema adapter in `soilwatch-core` turns them into `SensorRecord`s.

use crate::reading::Metric;

/// One entry of a feed snapshot, as delivered over the wire.
pub type RawFeedEntry = serde_json::Value;

pub const SOIL_MOISTURE_FIELDS: [&str; 3] = [
    "soilMoisture_sensor1",
    "soilMoisture_sensor2",
    "soilMoisture_sensor3",
];
pub const GAS_FIELDS: [&str; 3] = ["gas_sensor1", "gas_sensor2", "gas_sensor3"];
pub const TEMPERATURE_FIELD: &str = "temperature";
pub const HUMIDITY_FIELD: &str = "humidity";
pub const DATE_FIELD: &str = "date";
pub const TIME_FIELD: &str = "time";

/// Name of the feed field carrying a metric.
pub fn field_name(metric: Metric) -> &'static str {
    match metric {
        Metric::SoilMoisture(c) => SOIL_MOISTURE_FIELDS[c.index()],
        Metric::Gas(c) => GAS_FIELDS[c.index()],
        Metric::Temperature => TEMPERATURE_FIELD,
        Metric::Humidity => HUMIDITY_FIELD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Channel;

    #[test]
    fn every_metric_maps_to_a_distinct_field() {
        let mut names: Vec<&str> = Metric::ALL.iter().map(|&m| field_name(m)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Metric::ALL.len());
        assert_eq!(field_name(Metric::Gas(Channel::Two)), "gas_sensor2");
    }
}
