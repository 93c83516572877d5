use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;
use tracing::info;

/// 依序執行 extract / transform / load 三個階段
pub struct Engine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> Engine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        info!("🚀 Starting {} pipeline", name);
        self.monitor.log_stats("Start");

        let started = Instant::now();
        let input = self.pipeline.extract().await?;
        info!("📥 Extract finished in {:.2?}", started.elapsed());
        self.monitor.log_stats("Extract");

        let started = Instant::now();
        let output = self.pipeline.transform(input).await?;
        info!("⚙️ Transform finished in {:.2?}", started.elapsed());
        self.monitor.log_stats("Transform");

        let started = Instant::now();
        let output_path = self.pipeline.load(output).await?;
        info!("💾 Load finished in {:.2?}", started.elapsed());
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        info!("✅ {} pipeline wrote {}", name, output_path);

        Ok(output_path)
    }
}
