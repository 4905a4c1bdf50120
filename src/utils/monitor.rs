#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub phase_time: Duration,
    pub elapsed_time: Duration,
}

/// 記錄每個階段（map / discover / load）的耗時與記憶體
#[cfg(feature = "cli")]
pub struct RunMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    phase_start: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let system = if enabled {
            System::new_all()
        } else {
            System::new()
        };

        let pid = sysinfo::get_current_pid().ok();
        if enabled && pid.is_none() {
            tracing::warn!("Unable to resolve current PID, memory stats disabled");
        }

        Self {
            system: Mutex::new(system),
            pid,
            start_time: Instant::now(),
            phase_start: Mutex::new(Instant::now()),
            peak_memory: Mutex::new(0),
            enabled,
        }
    }

    pub fn start_phase(&self) {
        if let Ok(mut start) = self.phase_start.lock() {
            *start = Instant::now();
        }
    }

    pub fn phase_stats(&self) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let memory_mb = self.current_memory_mb().unwrap_or(0);
        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }
        let phase_time = self.phase_start.lock().ok()?.elapsed();

        Some(PhaseStats {
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            phase_time,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    fn current_memory_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        system.process(pid).map(|p| p.memory() / 1024 / 1024)
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(stats) = self.phase_stats() {
            tracing::info!(
                "📊 {} - Phase: {:?}, Memory: {}MB, Peak: {}MB, Total: {:?}",
                phase,
                stats.phase_time,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置不帶 sysinfo
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct RunMonitor;

#[cfg(not(feature = "cli"))]
impl RunMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn start_phase(&self) {}

    pub fn log_phase(&self, _phase: &str) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
