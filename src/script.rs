//! Startup-script decoding and execution
//!
//! Payloads may arrive gzip-compressed or as base64-wrapped gzip; both are
//! decoded transparently. The resolved script runs to completion with its
//! output captured and logged; a failing script never fails the boot.

use crate::InitError;
use base64::Engine;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Gzip magic bytes
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decode a startup-script payload into plain bytes.
///
/// Handles raw gzip and base64-wrapped gzip. Anything else passes through
/// unchanged; base64 decoding is only accepted when the result is gzip, so
/// ordinary text that happens to be valid base64 is left alone.
pub fn normalize(data: &[u8]) -> Result<Vec<u8>, InitError> {
    if is_gzip(data) {
        debug!("Decompressing gzip startup script");
        return gunzip(data);
    }

    if let Some(decoded) = try_base64(data) {
        if is_gzip(&decoded) {
            debug!("Decompressing base64-wrapped gzip startup script");
            return gunzip(&decoded);
        }
    }

    Ok(data.to_vec())
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, InitError> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| InitError::InvalidData(format!("Gzip decompression failed: {}", e)))?;
    Ok(decompressed)
}

/// Attempt a strict base64 decode; `None` when the payload is not base64
fn try_base64(data: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(data).ok()?;

    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() || cleaned.len() % 4 != 0 {
        return None;
    }
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return None;
    }

    base64::engine::general_purpose::STANDARD.decode(&cleaned).ok()
}

/// Execute the startup script at `path`, returning its exit code.
///
/// Scripts beginning with `#!` are executed directly; anything else runs
/// via `sh`. A non-zero exit is logged but not treated as an agent error.
pub async fn execute(path: &Path) -> Result<i32, InitError> {
    let content = tokio::fs::read(path).await?;

    let mut command = if content.starts_with(b"#!") {
        tokio::process::Command::new(path)
    } else {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg(path);
        cmd
    };

    info!("Executing startup script: {}", path.display());

    let output = command
        .output()
        .await
        .map_err(|e| InitError::Command(e.to_string()))?;

    let exit_code = output.status.code().unwrap_or(-1);

    if !output.stdout.is_empty() {
        debug!(
            "startup script stdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
    }

    if output.status.success() {
        info!("Startup script finished successfully");
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            "Startup script exited with status {}: {}",
            exit_code, stderr
        );
        // The boot continues even when the user's script fails
    }

    Ok(exit_code)
}
