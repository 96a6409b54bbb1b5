//! A [`log`] backend that stamps every record with the simulated time of whichever window is
//! currently executing on the calling thread, alongside the usual wall-clock/level/location
//! fields. Worker threads update the stamp via [`bind_current_time`]/[`clear_current_time`] as
//! they move between hosts; the single-threaded master-queue drain and any code running outside
//! an active window simply logs with no simulated time (`n/a`).

use std::cell::Cell;
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::{Lazy, OnceCell};

use sim_time::SimulationTime;

thread_local! {
    static CURRENT_TIME: Cell<Option<SimulationTime>> = const { Cell::new(None) };
}

/// Record the simulated time this thread is currently processing events at. Call with `None` to
/// clear it once the thread is no longer bound to a host (e.g. between windows).
pub fn bind_current_time(time: SimulationTime) {
    CURRENT_TIME.with(|cell| cell.set(Some(time)));
}

pub fn clear_current_time() {
    CURRENT_TIME.with(|cell| cell.set(None));
}

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Install [`SimLogger`] as the global `log` backend. Safe to call at most once per process; a
/// second call returns `Err` just like [`log::set_logger`] itself.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    Lazy::force(&START);
    SIM_LOGGER.max_level.set(max_level).ok();
    log::set_logger(&*SIM_LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}

static SIM_LOGGER: Lazy<SimLogger> = Lazy::new(SimLogger::new);

struct SimLogger {
    max_level: OnceCell<LevelFilter>,
    out: Mutex<std::io::Stdout>,
}

impl SimLogger {
    fn new() -> Self {
        Self {
            max_level: OnceCell::new(),
            out: Mutex::new(std::io::stdout()),
        }
    }
}

impl Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level.get().copied().unwrap_or(LevelFilter::Info)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let wall_elapsed = START.elapsed();
        let sim_time = CURRENT_TIME.with(Cell::get);
        let file = record
            .file()
            .and_then(|f| f.rsplit('/').next())
            .unwrap_or("n/a");
        let line = record
            .line()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "n/a".to_string());

        let mut line_out = format!(
            "{:>10.3}s ",
            wall_elapsed.as_secs_f64(),
        );
        match sim_time {
            Some(t) => line_out.push_str(&format!("[sim {t}] ")),
            None => line_out.push_str("[sim n/a] "),
        }
        line_out.push_str(&format!(
            "[{level:<5}] [{file}:{line}] [{module}] {args}\n",
            level = record.level(),
            module = record.module_path().unwrap_or("n/a"),
            args = record.args(),
        ));

        let mut out = self.out.lock().unwrap();
        let _ = out.write_all(line_out.as_bytes());
        if record.level() == Level::Error {
            let _ = out.flush();
        }
    }

    fn flush(&self) {
        let _ = self.out.lock().unwrap().flush();
    }
}
