//! Network IRQ affinity
//!
//! Multi-queue NICs land one interrupt per queue on CPU 0 unless told
//! otherwise. The agent spreads network interrupts round-robin across CPUs
//! and logs every assignment so the serial console shows the layout.

use crate::InitError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// One row of /proc/interrupts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrqEntry {
    pub irq: u32,
    pub label: String,
}

/// A planned IRQ-to-CPU assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrqAssignment {
    pub irq: u32,
    pub cpu: usize,
    /// Hex CPU mask as written to smp_affinity
    pub mask: String,
    pub label: String,
}

/// Parse /proc/interrupts into numbered entries.
///
/// Non-numeric rows (ERR, MIS, the CPU header) are skipped. The label is
/// the final whitespace-separated token, which for MSI-X vectors is the
/// device queue name (e.g. `virtio0-input.0`, `eth0-rx-1`).
pub fn parse_interrupts(content: &str) -> Vec<IrqEntry> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let Some((number, rest)) = line.split_once(':') else {
            continue;
        };

        let Ok(irq) = number.trim().parse::<u32>() else {
            continue;
        };

        let Some(label) = rest.split_whitespace().last() else {
            continue;
        };

        entries.push(IrqEntry {
            irq,
            label: label.to_string(),
        });
    }

    entries
}

/// Does this interrupt belong to a network interface?
pub fn is_network_irq(label: &str, interfaces: &[String]) -> bool {
    // virtio net queues: virtioN-input.M / virtioN-output.M
    if label.starts_with("virtio") && (label.contains("-input") || label.contains("-output")) {
        return true;
    }

    interfaces
        .iter()
        .any(|iface| label == iface || label.starts_with(&format!("{}-", iface)))
}

/// Assign network IRQs round-robin across CPUs
pub fn plan_affinity(irqs: &[IrqEntry], cpu_count: usize) -> Vec<IrqAssignment> {
    // smp_affinity masks are written as a single u64 here; boxes with more
    // CPUs than that still get a valid spread over the first 64
    let cpus = cpu_count.clamp(1, 64);

    irqs.iter()
        .enumerate()
        .map(|(idx, entry)| {
            let cpu = idx % cpus;
            IrqAssignment {
                irq: entry.irq,
                cpu,
                mask: format!("{:x}", 1u64 << cpu),
                label: entry.label.clone(),
            }
        })
        .collect()
}

/// Non-loopback network interface names
pub async fn list_network_interfaces(net_dir: &Path) -> Result<Vec<String>, InitError> {
    let mut interfaces = Vec::new();

    if !net_dir.exists() {
        return Ok(interfaces);
    }

    let mut read_dir = fs::read_dir(net_dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            if name != "lo" {
                interfaces.push(name.to_string());
            }
        }
    }

    interfaces.sort();
    Ok(interfaces)
}

/// Spread network IRQ affinity across CPUs and log the assignments
pub async fn apply_irq_affinity() -> Result<Vec<IrqAssignment>, InitError> {
    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    apply_with_roots(Path::new("/proc"), Path::new("/sys/class/net"), cpu_count).await
}

/// Implementation with injectable roots (for testing)
pub async fn apply_with_roots(
    proc_root: &Path,
    net_dir: &Path,
    cpu_count: usize,
) -> Result<Vec<IrqAssignment>, InitError> {
    let interrupts_path = proc_root.join("interrupts");
    if !interrupts_path.exists() {
        debug!("{} not present, skipping IRQ affinity", interrupts_path.display());
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&interrupts_path).await?;
    let interfaces = list_network_interfaces(net_dir).await?;

    let network_irqs: Vec<IrqEntry> = parse_interrupts(&content)
        .into_iter()
        .filter(|entry| is_network_irq(&entry.label, &interfaces))
        .collect();

    if network_irqs.is_empty() {
        info!("No network interrupts found, IRQ affinity unchanged");
        return Ok(Vec::new());
    }

    let plan = plan_affinity(&network_irqs, cpu_count);

    let mut applied = Vec::new();
    for assignment in plan {
        let affinity_path = affinity_file(proc_root, assignment.irq);

        match fs::write(&affinity_path, &assignment.mask).await {
            Ok(()) => {
                info!(
                    "Pinned IRQ {} ({}) to CPU {} (mask {})",
                    assignment.irq, assignment.label, assignment.cpu, assignment.mask
                );
                applied.push(assignment);
            }
            Err(e) => {
                // Typically EPERM when not root, or a vanished IRQ
                debug!(
                    "Could not set affinity for IRQ {} ({}): {}",
                    assignment.irq, assignment.label, e
                );
            }
        }
    }

    Ok(applied)
}

fn affinity_file(proc_root: &Path, irq: u32) -> PathBuf {
    proc_root.join("irq").join(irq.to_string()).join("smp_affinity")
}
