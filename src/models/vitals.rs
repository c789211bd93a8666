//! Vitals model
//!
//! Vital sign readings exactly as entered on the intake form, plus the body-mass
//! index derived from weight and height when the reading is built.

use serde::{Deserialize, Serialize};

use crate::clinical::measure::parse_measurement;

/// Kind of vital sign shown on the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    Weight,
    Height,
    Bmi,
    OxygenSaturation,
    Temperature,
    PulseRate,
    BloodPressure,
}

impl VitalKind {
    /// Row order of the vitals table
    pub const TABLE_ORDER: [VitalKind; 7] = [
        VitalKind::Weight,
        VitalKind::Height,
        VitalKind::Bmi,
        VitalKind::OxygenSaturation,
        VitalKind::Temperature,
        VitalKind::PulseRate,
        VitalKind::BloodPressure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VitalKind::Weight => "weight",
            VitalKind::Height => "height",
            VitalKind::Bmi => "bmi",
            VitalKind::OxygenSaturation => "o2_level",
            VitalKind::Temperature => "temperature",
            VitalKind::PulseRate => "pulse_rate",
            VitalKind::BloodPressure => "blood_pressure",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VitalKind::Weight => "Weight",
            VitalKind::Height => "Height",
            VitalKind::Bmi => "BMI",
            VitalKind::OxygenSaturation => "SpO2",
            VitalKind::Temperature => "Temperature",
            VitalKind::PulseRate => "Pulse Rate",
            VitalKind::BloodPressure => "BP",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            VitalKind::Weight => "kg",
            VitalKind::Height => "cm",
            VitalKind::Bmi => "kg/m²",
            VitalKind::OxygenSaturation => "%",
            VitalKind::Temperature => "°F",
            VitalKind::PulseRate => "bpm",
            VitalKind::BloodPressure => "mmHg",
        }
    }

    /// Reference range printed in the report table; "-" when none applies
    pub fn reference_range(&self) -> &'static str {
        match self {
            VitalKind::Weight | VitalKind::Height => "-",
            VitalKind::Bmi => "18.5-24.9",
            VitalKind::OxygenSaturation => "94-100%",
            VitalKind::Temperature => "97.8-99.1",
            VitalKind::PulseRate => "60-100",
            VitalKind::BloodPressure => "90/60 - 140/90",
        }
    }
}

/// Raw form values. Empty strings mean "not entered".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalEntries {
    /// kg
    pub weight: String,
    /// cm
    pub height: String,
    pub pulse_rate: String,
    /// "systolic/diastolic"
    pub blood_pressure: String,
    pub o2_level: String,
    /// °F
    pub temperature: String,
}

/// One submission's vitals. BMI is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalsReading {
    #[serde(flatten)]
    entries: VitalEntries,
    bmi: Option<f64>,
}

impl VitalsReading {
    pub fn new(entries: VitalEntries) -> Self {
        let bmi = calculate_bmi(&entries.weight, &entries.height);
        Self { entries, bmi }
    }

    pub fn entries(&self) -> &VitalEntries {
        &self.entries
    }

    pub fn bmi(&self) -> Option<f64> {
        self.bmi
    }

    pub fn weight_kg(&self) -> Option<f64> {
        parse_measurement(&self.entries.weight)
    }

    pub fn height_cm(&self) -> Option<f64> {
        parse_measurement(&self.entries.height)
    }

    /// Raw entry for a kind; BMI has no raw entry
    pub fn raw(&self, kind: VitalKind) -> &str {
        match kind {
            VitalKind::Weight => &self.entries.weight,
            VitalKind::Height => &self.entries.height,
            VitalKind::Bmi => "",
            VitalKind::OxygenSaturation => &self.entries.o2_level,
            VitalKind::Temperature => &self.entries.temperature,
            VitalKind::PulseRate => &self.entries.pulse_rate,
            VitalKind::BloodPressure => &self.entries.blood_pressure,
        }
    }

    /// Result cell text for the report table
    pub fn format_value(&self, kind: VitalKind) -> String {
        match kind {
            VitalKind::Bmi => self.bmi.map(|b| format!("{:.1}", b)).unwrap_or_default(),
            VitalKind::Weight => with_unit(&self.entries.weight, " kg"),
            VitalKind::Height => with_unit(&self.entries.height, " cm"),
            VitalKind::Temperature => with_unit(&self.entries.temperature, "°F"),
            VitalKind::PulseRate => with_unit(&self.entries.pulse_rate, " bpm"),
            VitalKind::OxygenSaturation | VitalKind::BloodPressure => {
                self.raw(kind).trim().to_string()
            }
        }
    }
}

fn with_unit(raw: &str, suffix: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.ends_with(suffix.trim()) {
        raw.to_string()
    } else {
        format!("{}{}", raw, suffix)
    }
}

/// BMI from kg and cm, rounded to one decimal
pub fn calculate_bmi(weight: &str, height: &str) -> Option<f64> {
    let weight = parse_measurement(weight)?;
    let height = parse_measurement(height)?;
    if height <= 0.0 || weight <= 0.0 {
        return None;
    }
    let height_m = height / 100.0;
    Some((weight / (height_m * height_m) * 10.0).round() / 10.0)
}
