//! Boot diagnostics
//!
//! Information an operator wants on the serial console after a fresh boot:
//! how network interrupts were spread across CPUs, and the SSH host key
//! fingerprints for out-of-band verification.

pub mod hostkeys;
pub mod irq;
