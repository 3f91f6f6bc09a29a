mod battery;
mod inverter;
mod poller;

pub use battery::BatteryMonitorClient;
pub use inverter::InverterClient;
pub use poller::{Poller, TelemetryFetcher};
