//! Logger setup: `[<unix ms>][<thread>] LEVEL message` lines on stderr.

use std::io::Write;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use env_logger::{Builder, Env};
use log::debug;

/// Install the global logger. `RUST_LOG` overrides `default_filter`.
///
/// Returns `false` when a logger was already installed; that logger stays in place.
pub fn init(default_filter: &str) -> bool {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            let current = thread::current();
            let thread_name = current.name().unwrap_or("unnamed");
            writeln!(
                buf,
                "[{ts}ms][{thread_name}] {} {}",
                record.level(),
                record.args()
            )
        })
        .try_init();
    match result {
        Ok(()) => true,
        Err(err) => {
            debug!("[LOG] keeping existing logger: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_first_logger() {
        // Another test may have installed the logger already.
        let _ = init("warn");
        assert!(!init("debug"));
    }
}
