// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! Platform probes that feed into `tsched` eligibility (spec §6: "forced off ... inside a VM, or
//! without high-resolution timers").

use std::fs;
use std::time::Duration;

/// Best-effort detection of running inside a virtual machine.
///
/// Real hardware interrupt/timer jitter characteristics do not hold up under a hypervisor's own
/// scheduling, which is why `tsched` is disabled there. This is a heuristic, not a guarantee: a
/// `false` negative only costs the (safe) interrupt-driven fallback path, not correctness.
pub fn running_in_vm() -> bool {
    if let Ok(vendor) = fs::read_to_string("/sys/class/dmi/id/sys_vendor") {
        let vendor = vendor.trim();
        const KNOWN_HYPERVISOR_VENDORS: &[&str] =
            &["QEMU", "KVM", "VMware", "innotek GmbH", "Xen", "Microsoft Corporation", "Bochs"];
        if KNOWN_HYPERVISOR_VENDORS.iter().any(|v| vendor.eq_ignore_ascii_case(v)) {
            return true;
        }
    }
    if let Ok(product) = fs::read_to_string("/sys/class/dmi/id/product_name") {
        let product = product.trim();
        if product.eq_ignore_ascii_case("KVM") || product.contains("Virtual Machine") {
            return true;
        }
    }
    false
}

/// Whether `CLOCK_MONOTONIC` resolves to sub-millisecond granularity.
///
/// `tsched` relies on arming a timer with millisecond-scale precision; on a kernel/hardware
/// combination with only jiffy-scale resolution, the scheduling algorithm's assumptions about
/// sleep accuracy do not hold and the driver should fall back to interrupt-driven wakeups.
pub fn has_high_res_timers() -> bool {
    clock_resolution().map(|res| res < Duration::from_millis(1)).unwrap_or(false)
}

#[cfg(target_os = "linux")]
fn clock_resolution() -> Option<Duration> {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    let rc = unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return None;
    }
    Some(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
}

#[cfg(not(target_os = "linux"))]
fn clock_resolution() -> Option<Duration> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_do_not_panic() {
        let _ = running_in_vm();
        let _ = has_high_res_timers();
    }
}
