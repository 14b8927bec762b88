//! Check command implementation.
//!
//! Validates that the proc root is readable and that smaps parsing works.

use std::path::Path;

use memchart::process::{collect_pids, is_kernel_process, probe_process};
use memchart::error::display_chain;
use memchart::ProbeError;

use crate::config::{validate_effective_config, Config};

/// Validates proc access and configuration. Returns whether all checks passed.
pub fn command_check(all: bool, config: &Config) -> bool {
    println!("🔍 memchart - System Check");
    println!("==========================");

    let mut all_ok = true;
    let settings = config.sampler_settings(Vec::new());
    let root = settings.proc_root.as_path();

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📁 Checking {}...", root.display());
    let pids = match collect_pids(root) {
        Ok(pids) => {
            println!("   ✅ Found {} process entries", pids.len());
            pids
        }
        Err(e) => {
            println!("   ❌ {}", display_chain(&e));
            return false;
        }
    };

    println!("\n💾 Checking smaps parsing...");
    all_ok &= check_self(root);

    if all {
        println!("\n🔄 Probing all {} processes...", pids.len());
        let (mut ok, mut kernel, mut vanished, mut failed) = (0usize, 0usize, 0usize, 0usize);
        for pid in &pids {
            match probe_process(root, pid) {
                Ok(record) if is_kernel_process(&record) => kernel += 1,
                Ok(_) => ok += 1,
                Err(ProbeError::NotFound { .. }) => vanished += 1,
                Err(e) => {
                    failed += 1;
                    println!("   ⚠️  {}", display_chain(&e));
                }
            }
        }
        println!(
            "   {} readable, {} kernel threads, {} vanished, {} unreadable",
            ok, kernel, vanished, failed
        );
        if failed > 0 {
            println!("   ℹ️  Run as root to sample every process");
        }
    }

    println!();
    if all_ok {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
    all_ok
}

/// Probes the running process, which must always be readable.
fn check_self(root: &Path) -> bool {
    let pid = std::process::id().to_string();
    match probe_process(root, &pid) {
        Ok(record) => {
            println!(
                "   ✅ pid {} ({}): RSS {} kB, PSS {} kB, USS {} kB",
                pid, record.name, record.rss, record.pss, record.uss
            );
            true
        }
        Err(e) => {
            println!("   ❌ Cannot probe own process: {}", display_chain(&e));
            false
        }
    }
}
