//! Log backend selection, mirroring the teacher's own `logger.rs`: the rest
//! of the crate logs through the `log` facade only, and a host opts into an
//! actual backend by enabling a feature (or by calling `log::set_logger`
//! itself before touching this crate).

use cfg_if::cfg_if;
use std::sync::atomic::{AtomicBool, Ordering};

static INIT: AtomicBool = AtomicBool::new(false);

/// Initializes the logger at `trace` level. A no-op if already initialized.
pub fn init_logger_debug() {
    if !INIT.swap(true, Ordering::SeqCst) {
        init(true);
    }
}

/// Initializes the logger at `error` level. A no-op if already initialized.
pub fn init_logger() {
    if !INIT.swap(true, Ordering::SeqCst) {
        init(false);
    }
}

cfg_if! {
    if #[cfg(feature = "flexi_logger_backend")] {
        fn init(debug: bool) {
            let env = if debug { "wl=trace" } else { "wl=error" };
            flexi_logger::Logger::try_with_env_or_str(env)
                .expect("failed to initialize logger")
                .start()
                .expect("failed to start logger");
        }
    } else {
        fn init(_debug: bool) {
            // No backend feature enabled: `log` calls throughout the crate
            // are simply discarded. Hosts that want output either enable
            // `flexi_logger_backend` or call `log::set_logger` themselves.
        }
    }
}
