//! Log macros gated by a module-level `ENABLE_LOGS` const.
//!
//! The capture path logs per-frame timings; defining `ENABLE_LOGS: bool` in
//! the module and using these macros lets that chatter be silenced wholesale
//! without touching the global log filter.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
