//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `deskhub_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    // Tiny probe to validate core crate wiring independently from any
    // embedding UI runtime setup.
    println!("deskhub_core ping={}", deskhub_core::ping());
    println!("deskhub_core version={}", deskhub_core::core_version());
}
