use rstest::*;
use std::sync::Once;
use tokio::runtime::*;

static LOG_INIT: Once = Once::new();

struct TestLogger;

impl log::Log for TestLogger {
    fn enabled(&self, _meta: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        println!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: TestLogger = TestLogger;

#[fixture]
pub fn setup_log() {
    LOG_INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER).map(|_| log::set_max_level(log::LevelFilter::Debug));
    });
}

#[allow(dead_code)]
pub fn get_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()
}
