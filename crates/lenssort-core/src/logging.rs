use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Run log file name at the archive root.
pub const LOG_FILENAME: &str = "organize.log";

/// Backend for the `log` facade: every record is appended to the run log;
/// errors, warnings and info always echo to the console, debug only when
/// verbose.
struct RunLogger {
    file: Option<Mutex<File>>,
    verbose: bool,
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(
                    f,
                    "{} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    record.args()
                );
            }
        }

        match record.level() {
            Level::Error => eprintln!("error: {}", record.args()),
            Level::Warn => eprintln!("warning: {}", record.args()),
            Level::Info => eprintln!("{}", record.args()),
            _ => {
                if self.verbose {
                    eprintln!("{}", record.args());
                }
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// Install the run logger. `log_path` is None in dry-run mode, which must
/// leave the filesystem untouched, so output goes to the console only.
pub fn init(log_path: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let file = match log_path {
        Some(path) => Some(Mutex::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    log::set_boxed_logger(Box::new(RunLogger { file, verbose }))
        .map_err(|e| anyhow::anyhow!("logger already installed: {}", e))?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}
