use std::sync::Mutex;

/// Destination of user facing command output.
///
/// `log` carries results, `err` carries warnings and failures. Diagnostics go
/// through `tracing` instead.
pub trait Output: Send + Sync {
    fn log(
        &self,
        msg: &str,
    );

    fn err(
        &self,
        msg: &str,
    );
}

/// Writes results to stdout and warnings to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl Output for Console {
    fn log(
        &self,
        msg: &str,
    ) {
        println!("{msg}");
    }

    fn err(
        &self,
        msg: &str,
    ) {
        eprintln!("{msg}");
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    logs: Mutex<Vec<String>>,
    errs: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn logs(&self) -> Vec<String> {
        lines(&self.logs)
    }

    pub fn errs(&self) -> Vec<String> {
        lines(&self.errs)
    }
}

impl Output for Recorder {
    fn log(
        &self,
        msg: &str,
    ) {
        push(&self.logs, msg);
    }

    fn err(
        &self,
        msg: &str,
    ) {
        push(&self.errs, msg);
    }
}

fn push(
    channel: &Mutex<Vec<String>>,
    msg: &str,
) {
    // a poisoned channel still holds every message pushed before the panic
    channel
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(msg.to_string());
}

fn lines(channel: &Mutex<Vec<String>>) -> Vec<String> {
    channel
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}
