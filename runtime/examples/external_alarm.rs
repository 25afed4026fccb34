//! Power-user example — engine driven by an external alarm.
//!
//! Builds the manager against a custom [`AlarmService`] and invokes
//! `on_alarm_fired` by hand, the way a host with its own timer wheel or
//! companion service would.
//!
//! ```bash
//! cargo run -p nouto-runtime --example external_alarm
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nouto_runtime::prelude::*;

/// Alarm service that only logs what the engine asks for.
struct LoggingAlarm;

impl AlarmService for LoggingAlarm {
    fn request_alarm(&self, interval: Option<Duration>) {
        println!("engine requested alarm: {interval:?}");
    }
}

struct FakeSource;

#[async_trait]
impl PullSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn code(&self) -> PullCode {
        PullCode(7)
    }

    fn metric_names(&self) -> &'static [&'static str] {
        &["fake.metric"]
    }

    async fn pull(&self, _timestamp_ms: u64) -> std::result::Result<Bytes, PluginError> {
        Ok(Bytes::from_static(b"{\"name\": \"fake.metric\"}"))
    }
}

struct PrintReceiver;

#[async_trait]
impl Receiver for PrintReceiver {
    fn name(&self) -> &'static str {
        "print"
    }

    async fn deliver(
        &self,
        code: PullCode,
        timestamp_ms: u64,
        events: &[Arc<MetricEvent>],
    ) -> std::result::Result<(), PluginError> {
        println!("delivered {} events for {code} at {timestamp_ms}", events.len());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = PullHub::new()
        .source(FakeSource)
        .build_with_alarm(Arc::new(LoggingAlarm));

    let receiver: Arc<dyn Receiver> = Arc::new(PrintReceiver);
    manager.register_receiver(PullCode(7), &receiver, Duration::from_secs(2));

    // Three hand-driven ticks at the cadence the engine asked for.
    for _ in 0..3 {
        manager.on_alarm_fired().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    Ok(())
}
