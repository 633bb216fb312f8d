mod geocoding;
mod pollution;

pub use geocoding::{GeocodingClient, PlaceResolver, UNKNOWN_PLACE};
pub use pollution::{PollutionClient, PollutionSource};
