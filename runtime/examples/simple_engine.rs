//! Minimal NOUTO engine — demonstrates the runtime API.
//!
//! ```bash
//! cargo run -p nouto-runtime --example simple_engine
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nouto_runtime::prelude::*;

/// Fake source producing one uptime record per pull.
struct UptimeSource;

#[async_trait]
impl PullSource for UptimeSource {
    fn name(&self) -> &'static str {
        "uptime"
    }

    fn code(&self) -> PullCode {
        PullCode(1)
    }

    fn metric_names(&self) -> &'static [&'static str] {
        &["system.uptime"]
    }

    async fn pull(&self, timestamp_ms: u64) -> std::result::Result<Bytes, PluginError> {
        let record = format!("{{\"name\": \"system.uptime\", \"fields\": {{\"ms\": {timestamp_ms}}}}}");
        Ok(Bytes::from(record))
    }
}

/// Receiver printing every delivered batch.
struct StdoutReceiver;

#[async_trait]
impl Receiver for StdoutReceiver {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn deliver(
        &self,
        code: PullCode,
        timestamp_ms: u64,
        events: &[Arc<MetricEvent>],
    ) -> std::result::Result<(), PluginError> {
        for event in events {
            println!("[{code} @ {timestamp_ms}] {} {:?}", event.name, event.fields);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    RuntimeBuilder::new()
        .on_ready(|manager| async move {
            let receiver: Arc<dyn Receiver> = Arc::new(StdoutReceiver);
            let code = manager
                .pull_code("system.uptime")
                .ok_or_else(|| anyhow::anyhow!("unknown metric"))?;
            manager.register_receiver(code, &receiver, Duration::from_secs(5));

            // The manager holds only a weak handle; keep the receiver alive
            // for the process lifetime.
            std::mem::forget(receiver);
            Ok(())
        })
        .configure(|hub| async move { Ok(hub.source(UptimeSource)) })
        .await
}
