//! Logging macros
//!
//! One set of macros for every build:
//! - `rp2040`: forwarded to defmt (RTT transport)
//! - host unit tests: printed with a level prefix
//! - anything else: arguments are type-checked and discarded
//!
//! Format strings must stay within the syntax both defmt and `core::fmt`
//! accept (`{}` and `{:?}`).

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "rp2040")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "rp2040"), test))]
        println!("[INFO] {}", format!($($arg)*));

        #[cfg(all(not(feature = "rp2040"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "rp2040")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "rp2040"), test))]
        println!("[WARN] {}", format!($($arg)*));

        #[cfg(all(not(feature = "rp2040"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "rp2040")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "rp2040"), test))]
        eprintln!("[ERROR] {}", format!($($arg)*));

        #[cfg(all(not(feature = "rp2040"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "rp2040")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "rp2040"), test))]
        println!("[DEBUG] {}", format!($($arg)*));

        #[cfg(all(not(feature = "rp2040"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "rp2040")]
        ::defmt::trace!($($arg)*);

        #[cfg(all(not(feature = "rp2040"), test))]
        println!("[TRACE] {}", format!($($arg)*));

        #[cfg(all(not(feature = "rp2040"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}
