use env_logger::Env;
use std::io::Write;

/// Initializes the process-wide logger. Defaults to `info` unless
/// `RUST_LOG` overrides it. Safe to call more than once (tests).
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:<5}] {}",
                record.level(),
                record.args()
            )
        })
        .try_init();
}
