//! Test data builders for telemetry lines and configs

use serial_plotter::config::AcquisitionConfig;
use serial_plotter::SensorChannel;

/// Builder for device telemetry lines
#[derive(Default)]
pub struct LineBuilder {
    segments: Vec<String>,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, channel: SensorChannel, values: [i32; 3]) -> Self {
        self.segments.push(format!(
            "{}: [{},{},{}]",
            channel.prefix(),
            values[0],
            values[1],
            values[2]
        ));
        self
    }

    pub fn accel(self, values: [i32; 3]) -> Self {
        self.channel(SensorChannel::Accelerometer, values)
    }

    pub fn gyro(self, values: [i32; 3]) -> Self {
        self.channel(SensorChannel::Gyroscope, values)
    }

    pub fn enc(self, values: [i32; 3]) -> Self {
        self.channel(SensorChannel::Encoders, values)
    }

    pub fn build(self) -> String {
        self.segments.join("; ")
    }
}

/// `count` accelerometer lines numbered 1..=count on the x axis
pub fn numbered_accel_lines(count: i32) -> Vec<String> {
    (1..=count)
        .map(|i| LineBuilder::new().accel([i, -i, 300]).build())
        .collect()
}

/// Acquisition settings with short timeouts so tests stay fast
pub fn fast_acquisition_config(channels: &[SensorChannel]) -> AcquisitionConfig {
    AcquisitionConfig {
        timebase_ms: 100,
        poll_interval_ms: 5,
        join_timeout_ms: 2_000,
        retention_cap: None,
        channels: channels.to_vec(),
    }
}
