use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of independent channels on the soil moisture and gas probes.
pub const CHANNELS: usize = 3;

/// One canonical reading from the field station.
///
/// Produced only by the record schema adapter; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub soil_moisture: [f64; CHANNELS],
    pub gas: [f64; CHANNELS],
    pub temperature: f64,
    pub humidity: f64,
    /// The feed reports a single instant; it drives both the date and the time columns.
    pub timestamp: DateTime<Utc>,
}

impl SensorRecord {
    /// Reads the value of a single metric out of this record.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::SoilMoisture(channel) => self.soil_moisture[channel.index()],
            Metric::Gas(channel) => self.gas[channel.index()],
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }
}

/// A probe channel, 1-based in every user-facing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    One,
    Two,
    Three,
}

impl Channel {
    pub const ALL: [Channel; CHANNELS] = [Channel::One, Channel::Two, Channel::Three];

    pub fn index(self) -> usize {
        match self {
            Channel::One => 0,
            Channel::Two => 1,
            Channel::Three => 2,
        }
    }

    pub fn number(self) -> usize {
        self.index() + 1
    }
}

/// A single scalar series derivable from every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    SoilMoisture(Channel),
    Gas(Channel),
    Temperature,
    Humidity,
}

impl Metric {
    /// All eight metrics in export column order.
    pub const ALL: [Metric; 8] = [
        Metric::SoilMoisture(Channel::One),
        Metric::SoilMoisture(Channel::Two),
        Metric::SoilMoisture(Channel::Three),
        Metric::Gas(Channel::One),
        Metric::Gas(Channel::Two),
        Metric::Gas(Channel::Three),
        Metric::Temperature,
        Metric::Humidity,
    ];

    /// Position of this metric in `Metric::ALL`.
    pub fn index(self) -> usize {
        match self {
            Metric::SoilMoisture(c) => c.index(),
            Metric::Gas(c) => CHANNELS + c.index(),
            Metric::Temperature => 2 * CHANNELS,
            Metric::Humidity => 2 * CHANNELS + 1,
        }
    }

    pub fn group(self) -> MetricGroup {
        match self {
            Metric::SoilMoisture(_) => MetricGroup::SoilMoisture,
            Metric::Gas(_) => MetricGroup::Gas,
            Metric::Temperature => MetricGroup::Temperature,
            Metric::Humidity => MetricGroup::Humidity,
        }
    }

    /// Column heading used by the export document.
    pub fn column_name(self) -> String {
        match self {
            Metric::SoilMoisture(c) => format!("Soil Moisture Sensor {}", c.number()),
            Metric::Gas(c) => format!("CO2 Sensor {}", c.number()),
            Metric::Temperature => "Temperature".to_string(),
            Metric::Humidity => "Humidity".to_string(),
        }
    }
}

/// The four panels of the dashboard. Each panel has one table and one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    SoilMoisture,
    Gas,
    Temperature,
    Humidity,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 4] = [
        MetricGroup::SoilMoisture,
        MetricGroup::Gas,
        MetricGroup::Temperature,
        MetricGroup::Humidity,
    ];

    /// Metrics shown in this panel, in channel order.
    pub fn metrics(self) -> Vec<Metric> {
        match self {
            MetricGroup::SoilMoisture => Channel::ALL.iter().map(|&c| Metric::SoilMoisture(c)).collect(),
            MetricGroup::Gas => Channel::ALL.iter().map(|&c| Metric::Gas(c)).collect(),
            MetricGroup::Temperature => vec![Metric::Temperature],
            MetricGroup::Humidity => vec![Metric::Humidity],
        }
    }

    pub fn is_multi_channel(self) -> bool {
        matches!(self, MetricGroup::SoilMoisture | MetricGroup::Gas)
    }

    /// Prefix used in dataset labels, e.g. "CO2" in "CO2 Sensor 2".
    pub fn label_prefix(self) -> &'static str {
        match self {
            MetricGroup::SoilMoisture => "Soil Moisture",
            MetricGroup::Gas => "CO2",
            MetricGroup::Temperature => "Temperature",
            MetricGroup::Humidity => "Humidity",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MetricGroup::SoilMoisture => "Soil Moisture Sensors",
            MetricGroup::Gas => "CO2 Sensors",
            MetricGroup::Temperature => "Temperature Sensor",
            MetricGroup::Humidity => "Humidity Sensor",
        }
    }

    /// Short identifier accepted on the console (`toggle co2`).
    pub fn slug(self) -> &'static str {
        match self {
            MetricGroup::SoilMoisture => "moisture",
            MetricGroup::Gas => "co2",
            MetricGroup::Temperature => "temperature",
            MetricGroup::Humidity => "humidity",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.trim().to_ascii_lowercase().as_str() {
            "moisture" | "soil" | "soil_moisture" => Some(MetricGroup::SoilMoisture),
            "co2" | "gas" => Some(MetricGroup::Gas),
            "temperature" | "temp" => Some(MetricGroup::Temperature),
            "humidity" => Some(MetricGroup::Humidity),
            _ => None,
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
