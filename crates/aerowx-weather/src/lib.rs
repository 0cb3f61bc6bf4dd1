//! METAR and TAF decoding for AeroWx.
//!
//! Turns the loosely typed JSON served by the aviation weather data API into
//! structured observations and forecasts. Decoding never fails as a whole:
//! a field that cannot be read is logged at debug level and left empty.

pub mod category;
pub mod clouds;
pub mod derived;
pub mod field;
pub mod metar;
pub mod raw;
pub mod record;
pub mod taf;
pub mod time;
pub mod visibility;
pub mod wind;
pub mod wx;

pub use category::{resolve_category, CategorySource, FlightCategory, ResolvedCategory};
pub use clouds::{decode_clouds, CloudLayer, CloudLayers};
pub use derived::{relative_humidity, Pressure, PressureUnit};
pub use field::MalformedField;
pub use metar::{decode_observation, DecodedObservation};
pub use raw::{RawForecastPeriod, RawMetar, RawTaf};
pub use record::AirportRecord;
pub use taf::{decode_taf, ChangeType, ForecastPeriod, TafHeader, TafReport, MAX_FORECAST_PERIODS};
pub use time::{LocalZone, ObservationTime};
pub use visibility::{decode_visibility, parse_visibility};
pub use wind::Wind;
pub use wx::{decode_weather, WeatherPhenomena};
