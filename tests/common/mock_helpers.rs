//! Mock construction helpers
//!
//! - [`ScriptedPort`] - In-memory serial stream with timeouts and injected faults
//! - [`MockSurface`] - mockall mock of the display surface
//! - [`MockOpener`] - mockall mock of the port opener

use mockall::mock;
use parking_lot::Mutex;
use serial_plotter::backend::{ChannelWindow, DisplaySurface, PortOpener, PortStream};
use serial_plotter::config::SerialConfig;
use serial_plotter::{Result, SensorChannel};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Surface {}

    impl DisplaySurface for Surface {
        fn on_line(&mut self, text: &str);
        fn on_sample_window(&mut self, channel: SensorChannel, window: &ChannelWindow);
        fn on_port_opened(&mut self, port: &str);
        fn on_port_closed(&mut self, port: &str);
        fn on_error(&mut self, message: &str);
    }
}

mock! {
    pub Opener {}

    impl PortOpener for Opener {
        fn open(&self, config: &SerialConfig, read_timeout: Duration) -> Result<PortStream>;
    }
}

/// One scripted read result
#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    Timeout,
    Fault(io::ErrorKind),
}

/// What the port does once the script runs out
#[derive(Debug, Clone)]
pub enum End {
    /// Time out forever, like a silent device
    Idle,
    /// Report end of stream, like an unplugged adapter
    Eof,
    /// Keep sending the same bytes forever
    Repeat(Vec<u8>),
}

/// Simulated read timeout
const READ_DELAY: Duration = Duration::from_millis(1);

/// Serial stream that replays a script; more steps can be fed while it runs
pub struct ScriptedPort {
    steps: Arc<Mutex<VecDeque<Step>>>,
    end: End,
}

/// Pushes steps into a running [`ScriptedPort`]
#[derive(Clone)]
pub struct PortFeeder(Arc<Mutex<VecDeque<Step>>>);

impl PortFeeder {
    pub fn push(&self, step: Step) {
        self.0.lock().push_back(step);
    }

    pub fn push_line(&self, line: &str) {
        self.push(Step::Data(format!("{}\n", line).into_bytes()));
    }
}

impl ScriptedPort {
    pub fn new(end: End) -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::new())),
            end,
        }
    }

    /// Send each line in its own read, then behave like `end`
    pub fn lines<S: AsRef<str>>(lines: impl IntoIterator<Item = S>, end: End) -> Self {
        let port = Self::new(end);
        let feeder = port.feeder();
        for line in lines {
            feeder.push_line(line.as_ref());
        }
        port
    }

    /// Send `line` forever
    pub fn endless(line: &str) -> Self {
        Self::new(End::Repeat(format!("{}\n", line).into_bytes()))
    }

    pub fn feeder(&self) -> PortFeeder {
        PortFeeder(self.steps.clone())
    }
}

fn copy_into(bytes: &[u8], buf: &mut [u8]) -> usize {
    let n = bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    n
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let step = {
            let mut steps = self.steps.lock();
            match steps.pop_front() {
                Some(Step::Data(bytes)) => {
                    let n = copy_into(&bytes, buf);
                    if n < bytes.len() {
                        steps.push_front(Step::Data(bytes[n..].to_vec()));
                    }
                    return Ok(n);
                }
                other => other,
            }
        };

        match step {
            Some(Step::Timeout) => {
                std::thread::sleep(READ_DELAY);
                Err(io::Error::new(io::ErrorKind::TimedOut, "scripted timeout"))
            }
            Some(Step::Fault(kind)) => Err(io::Error::new(kind, "scripted fault")),
            Some(Step::Data(_)) => unreachable!("data steps return early"),
            None => match &self.end {
                End::Idle => {
                    std::thread::sleep(READ_DELAY);
                    Err(io::Error::new(io::ErrorKind::TimedOut, "scripted timeout"))
                }
                End::Eof => Ok(0),
                End::Repeat(bytes) => {
                    std::thread::sleep(READ_DELAY);
                    Ok(copy_into(bytes, buf))
                }
            },
        }
    }
}

/// Opener mock that hands out `port` exactly once
pub fn opener_with(port: ScriptedPort) -> MockOpener {
    let mut opener = MockOpener::new();
    opener
        .expect_open()
        .times(1)
        .return_once(move |_, _| Ok(Box::new(port) as PortStream));
    opener
}
