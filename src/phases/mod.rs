//! Boot phases
//!
//! Phases run in order during boot:
//! 1. Setup - state directories, metadata wait, instance identity
//! 2. Diagnostics - IRQ affinity spread, host key fingerprints
//! 3. Hooks - operator hook scripts with idempotency guards
//! 4. StartupScript - fetch and run the user's startup script

pub mod diagnostics;
pub mod hooks;
pub mod setup;
pub mod startup_script;
