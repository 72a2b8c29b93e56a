// Licensed under the Apache-2.0 license

use std::io::Write;
use std::process::ExitCode;

use bsc_echo_slave::bsc::pigpio::PigpioBsc;
use bsc_echo_slave::bsc::{SlaveConfigBuilder, DEFAULT_SLAVE_ADDRESS};
use bsc_echo_slave::delay::SleepDelay;
use bsc_echo_slave::signal::InterruptListener;
use bsc_echo_slave::slave::{ShutdownSignal, SlaveError, SlaveLoop};
use log::{error, LevelFilter, Log, Metadata, Record};

static SHUTDOWN: ShutdownSignal = ShutdownSignal::new();

struct StdoutLogger;

impl Log for StdoutLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

static LOGGER: StdoutLogger = StdoutLogger;

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let config = match SlaveConfigBuilder::new().address(DEFAULT_SLAVE_ADDRESS).build() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let address = config.address;

    let mut slave = SlaveLoop::new(PigpioBsc::new(), SleepDelay, config, &SHUTDOWN);
    if let Err(err) = slave.initialize() {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    // The driver was initialized with the library's signal handlers off; the
    // listener raises the shutdown flag and `run` closes the slave
    let _listener = match InterruptListener::spawn(&SHUTDOWN, PigpioBsc::new(), address, |code| {
        log::logger().flush();
        std::process::exit(code)
    }) {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to install signal handlers: {err}");
            slave.close();
            return ExitCode::FAILURE;
        }
    };

    match slave.run() {
        Ok(end) => exit_code(end.exit_code()),
        Err(SlaveError::OpenRejected(_) | SlaveError::InitFailed(_)) => ExitCode::FAILURE,
    }
}
