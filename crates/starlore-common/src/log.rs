//! Leveled print helpers, converted from `myq2_common::common::{com_printf,
//! com_dprintf, com_error}`. StarLore has no cvar system to gate a
//! "developer" flag, so `log_debug` is gated on the `STARLORE_DEBUG`
//! environment variable instead, checked once and cached.

use std::sync::OnceLock;

fn debug_enabled() -> bool {
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| std::env::var_os("STARLORE_DEBUG").is_some())
}

pub fn log_info(msg: &str) {
    println!("[info] {msg}");
}

pub fn log_warn(msg: &str) {
    eprintln!("[warn] {msg}");
}

pub fn log_error(msg: &str) {
    eprintln!("[error] {msg}");
}

pub fn log_debug(msg: &str) {
    if debug_enabled() {
        println!("[debug] {msg}");
    }
}

/// Prints and exits the process with a non-zero code. Mirrors `com_error`'s
/// `ERR_FATAL` path (spec §7: bind failure, addrinfo failure, poll error).
pub fn log_fatal(msg: &str) -> ! {
    eprintln!("[fatal] {msg}");
    std::process::exit(1);
}
