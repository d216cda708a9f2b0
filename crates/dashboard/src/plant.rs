//! The plant record served by the device bridge and the request bodies used
//! to update it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Time;

// ---------------------------------------------------------------------------
// Watering slot
// ---------------------------------------------------------------------------

/// A daily watering slot in 24-hour `HH:mm` form.
///
/// Only zero-padded `00:00`..=`23:59` parses; seconds are always zero. A
/// trailing `:00` is accepted on read for bridges that store `HH:mm:ss`, but
/// the value is always written back as `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WateringTime(Time);

impl WateringTime {
    pub fn as_time(self) -> Time {
        self.0
    }

    pub fn hour(self) -> u8 {
        self.0.hour()
    }

    pub fn minute(self) -> u8 {
        self.0.minute()
    }
}

impl FromStr for WateringTime {
    type Err = time::error::Parse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hm = s.strip_suffix(":00").filter(|hm| hm.len() == 5).unwrap_or(s);
        Time::parse(hm, format_description!("[hour]:[minute]")).map(Self)
    }
}

impl TryFrom<String> for WateringTime {
    type Error = time::error::Parse;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WateringTime> for String {
    fn from(t: WateringTime) -> Self {
        t.to_string()
    }
}

impl fmt::Display for WateringTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// ---------------------------------------------------------------------------
// Plant record
// ---------------------------------------------------------------------------

/// Full plant record as stored by the bridge. Field names are camelCase on
/// the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: i64,
    pub name: String,
    /// Last sensor reading, percent.
    pub soil_moisture: f64,
    /// User-configured threshold, percent.
    pub required_soil_moisture: f64,
    /// ISO timestamp set by the bridge; never written by this side.
    pub last_watered: String,
    /// Owned by the bridge: false when weather or soil already cover the plant.
    pub is_watering_scheduled: bool,
    pub watering_time1: WateringTime,
    pub watering_time2: WateringTime,
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringTimesPatch {
    pub watering_time1: WateringTime,
    pub watering_time2: WateringTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdealMoisturePatch {
    pub required_soil_moisture: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    On,
    Off,
}

impl From<bool> for LightState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LightCommand {
    pub state: LightState,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BASIL_JSON: &str = r#"{
        "id": 1,
        "name": "Basil",
        "soilMoisture": 42,
        "requiredSoilMoisture": 60,
        "lastWatered": "2024-11-02T06:30:00.000Z",
        "isWateringScheduled": true,
        "wateringTime1": "06:30",
        "wateringTime2": "18:00"
    }"#;

    // -- WateringTime parsing ---------------------------------------------

    #[test]
    fn parse_valid_times() {
        let t: WateringTime = "06:30".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (6, 30));

        let t: WateringTime = "23:59".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (23, 59));

        let t: WateringTime = "00:00".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (0, 0));
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert!("24:00".parse::<WateringTime>().is_err());
        assert!("12:60".parse::<WateringTime>().is_err());
    }

    #[test]
    fn parse_rejects_unpadded_and_garbage() {
        assert!("7:00".parse::<WateringTime>().is_err());
        assert!("".parse::<WateringTime>().is_err());
        assert!("noon".parse::<WateringTime>().is_err());
    }

    #[test]
    fn parse_accepts_zero_seconds_suffix() {
        let t: WateringTime = "06:30:00".parse().unwrap();
        assert_eq!(t, "06:30".parse().unwrap());
        assert_eq!(t.to_string(), "06:30");

        let t: WateringTime = "18:00:00".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (18, 0));
    }

    #[test]
    fn parse_rejects_nonzero_seconds() {
        assert!("06:30:15".parse::<WateringTime>().is_err());
        assert!("06:30:".parse::<WateringTime>().is_err());
        assert!("6:30:00".parse::<WateringTime>().is_err());
    }

    #[test]
    fn plant_with_seconds_in_slots_reads_and_writes_hh_mm() {
        let json = BASIL_JSON.replace("\"18:00\"", "\"18:00:00\"");
        let p: Plant = serde_json::from_str(&json).unwrap();
        assert_eq!(p.watering_time2.to_string(), "18:00");
        assert_eq!(serde_json::to_value(&p).unwrap()["wateringTime2"], "18:00");
    }

    #[test]
    fn display_is_zero_padded() {
        let t: WateringTime = "07:05".parse().unwrap();
        assert_eq!(t.to_string(), "07:05");
        assert_eq!(t.as_time(), Time::from_hms(7, 5, 0).unwrap());
    }

    // -- Plant deserialization --------------------------------------------

    #[test]
    fn plant_deserializes_camel_case() {
        let p: Plant = serde_json::from_str(BASIL_JSON).unwrap();
        assert_eq!(p.id, 1);
        assert_eq!(p.name, "Basil");
        assert_eq!(p.soil_moisture, 42.0);
        assert_eq!(p.required_soil_moisture, 60.0);
        assert!(p.is_watering_scheduled);
        assert_eq!(p.watering_time1.to_string(), "06:30");
        assert_eq!(p.watering_time2.to_string(), "18:00");
    }

    #[test]
    fn plant_with_bad_watering_time_fails() {
        let json = BASIL_JSON.replace("\"18:00\"", "\"6pm\"");
        assert!(serde_json::from_str::<Plant>(&json).is_err());
    }

    #[test]
    fn plant_missing_field_fails() {
        let json = r#"{"id":1,"name":"Basil"}"#;
        assert!(serde_json::from_str::<Plant>(json).is_err());
    }

    #[test]
    fn plant_serializes_watering_times_as_strings() {
        let p: Plant = serde_json::from_str(BASIL_JSON).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["wateringTime1"], "06:30");
        assert_eq!(json["isWateringScheduled"], true);
    }

    // -- Patch bodies -----------------------------------------------------

    #[test]
    fn watering_times_patch_has_exactly_two_fields() {
        let patch = WateringTimesPatch {
            watering_time1: "07:00".parse().unwrap(),
            watering_time2: "19:00".parse().unwrap(),
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["wateringTime1"], "07:00");
        assert_eq!(json["wateringTime2"], "19:00");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn ideal_moisture_patch_field_name() {
        let json = serde_json::to_value(IdealMoisturePatch {
            required_soil_moisture: 55.0,
        })
        .unwrap();
        assert_eq!(json["requiredSoilMoisture"], 55.0);
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn light_command_serializes_lowercase() {
        let on = serde_json::to_string(&LightCommand { state: true.into() }).unwrap();
        let off = serde_json::to_string(&LightCommand { state: false.into() }).unwrap();
        assert_eq!(on, r#"{"state":"on"}"#);
        assert_eq!(off, r#"{"state":"off"}"#);
    }
}
