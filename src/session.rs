use {
    crate::config::Config,
    anyhow::{Context, Result},
    log::{debug, info},
    serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits},
    std::{
        io::{self, BufRead, BufReader, ErrorKind, Read, Write},
        time::Duration,
    },
};

const START: &[u8] = b"STA\r\n";
const STOP: &[u8] = b"STP\r\n";

/// How long a single read may block before the caller gets a chance to
/// check for shutdown.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A byte stream to the sensor that can be closed explicitly.
pub trait Port: Read + Write {
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

impl Port for Box<dyn SerialPort> {
    fn close(mut self) -> io::Result<()> {
        self.flush()?;
        drop(self);
        Ok(())
    }
}

/// An open, streaming connection to the sensor.
pub struct Session<P: Port> {
    reader: BufReader<P>,
    pending: Vec<u8>,
}

impl Session<Box<dyn SerialPort>> {
    pub fn open(config: &Config) -> Result<Self> {
        info!("Opening {} at {} baud", config.device, config.baud);
        let port = serialport::new(&config.device, config.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open {}", config.device))?;

        Self::start(port).context("Failed to start sensor streaming")
    }
}

impl<P: Port> Session<P> {
    /// Puts the sensor on `port` into streaming mode.
    pub fn start(port: P) -> io::Result<Self> {
        let mut session = Self {
            reader: BufReader::new(port),
            pending: Vec::new(),
        };
        session.command(START)?;
        Ok(session)
    }

    /// Blocks until the next line arrives and returns it without its
    /// terminator.
    ///
    /// Returns `Ok(None)` if the port timed out first; bytes of an unfinished
    /// line are kept for the next call. End of stream is an error.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "serial device closed the stream",
            )),
            Ok(_) => {
                let mut line = std::mem::take(&mut self.pending);
                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }
                Ok(Some(String::from_utf8_lossy(&line).into_owned()))
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stops streaming and closes the port.
    ///
    /// If the stop command cannot be sent the port is not closed explicitly,
    /// it is only dropped.
    pub fn close(mut self) -> io::Result<()> {
        self.command(STOP)?;
        self.reader.into_inner().close()
    }

    fn command(&mut self, command: &[u8]) -> io::Result<()> {
        debug!("Sending {:?}", String::from_utf8_lossy(command).trim_end());
        let port = self.reader.get_mut();
        port.write_all(command)?;
        port.flush()
    }
}
