//! Host CPU and memory sampling for the exported gauges

use std::fs;
use std::thread;

/// Seam between the exporter and the host OS
///
/// `None` means the sample could not be taken; the exporter then omits the
/// corresponding gauge for that interval instead of reporting a stale or
/// made-up value.
pub trait SystemSampler: Send + Sync {
    /// 1-minute load average over logical core count, as a percentage of one
    /// core (exceeds 100 on an overloaded host)
    fn cpu_usage_percent(&self) -> Option<f64>;

    /// Used physical memory as a percentage of total
    fn memory_usage_percent(&self) -> Option<f64>;
}

/// Sampler backed by the Linux procfs text interfaces
#[derive(Debug, Default)]
pub struct ProcSampler;

impl SystemSampler for ProcSampler {
    fn cpu_usage_percent(&self) -> Option<f64> {
        let loadavg = fs::read_to_string("/proc/loadavg").ok()?;
        let one_minute: f64 = loadavg.split_whitespace().next()?.parse().ok()?;
        let cores = thread::available_parallelism().ok()?.get();
        Some(cpu_percent(one_minute, cores))
    }

    fn memory_usage_percent(&self) -> Option<f64> {
        let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
        memory_percent_from_meminfo(&meminfo)
    }
}

/// Load per core rounded to 2 decimals, then scaled to a percentage
pub(crate) fn cpu_percent(load_one_minute: f64, cores: usize) -> f64 {
    let per_core = load_one_minute / cores as f64;
    round2(per_core) * 100.0
}

pub(crate) fn memory_percent_from_meminfo(meminfo: &str) -> Option<f64> {
    let mut total_kb: Option<u64> = None;
    let mut free_kb: Option<u64> = None;

    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("MemFree:") {
            free_kb = parse_kb(rest);
        }
    }

    let total = total_kb? as f64;
    let free = free_kb? as f64;
    if total <= 0.0 {
        return None;
    }

    let used = total - free;
    Some(round2(used / total * 100.0))
}

fn parse_kb(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse().ok()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percent_rounds_before_scaling() {
        // 1.234 load over 4 cores = 0.3085 per core, rounds to 0.31 -> 31%
        assert_eq!(cpu_percent(1.234, 4), 31.0);
    }

    #[test]
    fn test_cpu_percent_can_exceed_one_hundred() {
        assert_eq!(cpu_percent(6.0, 4), 150.0);
    }

    #[test]
    fn test_memory_percent_from_meminfo() {
        let meminfo = "MemTotal:       16384000 kB\n\
                       MemFree:         4096000 kB\n\
                       MemAvailable:    8192000 kB\n";
        assert_eq!(memory_percent_from_meminfo(meminfo), Some(75.0));
    }

    #[test]
    fn test_memory_percent_missing_fields() {
        assert_eq!(memory_percent_from_meminfo("MemTotal: 100 kB\n"), None);
        assert_eq!(memory_percent_from_meminfo(""), None);
    }

    #[test]
    fn test_memory_percent_rounding() {
        let meminfo = "MemTotal: 3000 kB\nMemFree: 1000 kB\n";
        // 2000/3000 = 66.666... -> 66.67
        assert_eq!(memory_percent_from_meminfo(meminfo), Some(66.67));
    }
}
