//! Honest total-RAM probe used to auto-derive `memory_constrained` when the
//! caller does not set it explicitly.

const CONSTRAINED_THRESHOLD_BYTES: u64 = 512 * 1024 * 1024;

/// Returns true when total physical RAM is at or below 512 MiB.
pub fn is_memory_constrained() -> bool {
    match total_ram_bytes() {
        Some(total) => total <= CONSTRAINED_THRESHOLD_BYTES,
        None => false,
    }
}

#[cfg(target_os = "linux")]
fn total_ram_bytes() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kib: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kib * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn total_ram_bytes() -> Option<u64> {
    // SAFETY: sysconf with these names returns a plain non-negative count;
    // no pointers involved.
    unsafe {
        let pages = libc::sysconf(libc::_SC_PHYS_PAGES);
        let page_size = libc::sysconf(libc::_SC_PAGE_SIZE);
        if pages < 0 || page_size < 0 {
            return None;
        }
        Some(pages as u64 * page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_half_a_gib() {
        assert_eq!(CONSTRAINED_THRESHOLD_BYTES, 512 * 1024 * 1024);
    }

    #[test]
    fn probe_does_not_panic() {
        let _ = is_memory_constrained();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn parses_mem_total_line() {
        let sample = "MemTotal:       16330000 kB\nMemFree:         100 kB\n";
        let mut found = None;
        for line in sample.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                let kib: u64 = rest.trim().trim_end_matches(" kB").trim().parse().unwrap();
                found = Some(kib * 1024);
            }
        }
        assert_eq!(found, Some(16330000 * 1024));
    }
}
