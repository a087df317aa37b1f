use crate::core::Job;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct JobEngine<J: Job> {
    job: J,
    monitor: SystemMonitor,
}

impl<J: Job> JobEngine<J> {
    pub fn new(job: J) -> Self {
        Self {
            job,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(job: J, monitor_enabled: bool) -> Self {
        Self {
            job,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub async fn run(&self) -> Result<J::Report> {
        let name = self.job.name();
        tracing::info!("🚀 Starting job: {}", name);
        self.monitor.log_stats(&format!("{} - start", name));

        let result = self.job.run().await;

        match &result {
            Ok(report) => {
                tracing::info!("✅ Job {} finished: {}", name, report);
            }
            Err(e) => {
                tracing::error!(
                    "❌ Job {} failed: {} (Category: {:?}, Severity: {:?})",
                    name,
                    e,
                    e.category(),
                    e.severity()
                );
            }
        }

        self.monitor.log_stats(&format!("{} - end", name));
        self.monitor.log_final_stats();
        result
    }
}
