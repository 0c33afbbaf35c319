use jiff::civil::{Date, DateTime, Time, Weekday};
use serde::{Deserialize, Serialize};

use crate::{coordinates::Coordinates, transportation_mode::TransportationMode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
    pub mode: TransportationMode,

    /// Local departure time sent to the provider. `None` means "now".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<DateTime>,
}

impl DistanceRequest {
    pub fn new(origin: Coordinates, destination: Coordinates, mode: TransportationMode) -> Self {
        Self {
            origin,
            destination,
            mode,
            departure: None,
        }
    }

    pub fn with_departure(mut self, departure: Option<DateTime>) -> Self {
        self.departure = departure;
        self
    }
}

/// The next `weekday` strictly after `today`, at `time`.
pub fn next_weekday_at(today: Date, weekday: Weekday, time: Time) -> Result<DateTime, jiff::Error> {
    let date = today.nth_weekday(1, weekday)?;
    Ok(date.to_datetime(time))
}
