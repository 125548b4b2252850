use {
    crate::{
        parser::parse_line,
        session::{Port, Session},
        sink::Sink,
    },
    anyhow::Result,
    chrono::Utc,
    log::{debug, error, info, warn},
    tokio::{sync::watch, task},
};

/// Reads, corrects and stores readings until the device fails or `stop`
/// turns true.
///
/// A read error ends the loop and is returned as is. Bad lines and failed
/// writes are logged and skipped.
pub async fn run<P, S>(
    session: &mut Session<P>,
    sink: &mut S,
    stop: watch::Receiver<bool>,
) -> Result<()>
where
    P: Port,
    S: Sink,
{
    loop {
        if *stop.borrow() {
            info!("Stop requested");
            return Ok(());
        }

        let line = match task::block_in_place(|| session.read_line())? {
            Some(line) => line,
            None => continue,
        };

        let raw = match parse_line(&line) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Sensor acknowledged start");
                continue;
            }
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        let corrected = raw.correct();
        if !corrected.is_finite() {
            error!("Dropping reading '{}': correction is not finite", line);
            continue;
        }

        debug!("{}", corrected);
        if let Err(e) = sink.write(&corrected, Utc::now()).await {
            warn!("{:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            reading::RawReading,
            session::mock::{Call, MockPort},
            sink::mock::MockSink,
        },
        std::io::{self, ErrorKind},
    };

    fn running() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_corrected_readings_in_order() {
        let port = MockPort::lines(&[
            "OK STA",
            "garbage",
            "CO2=512,HUM=45.20,TMP=23.10",
            "CO2=600,HUM=50.00,TMP=-2.00",
        ]);
        let mut session = Session::start(port).unwrap();
        let mut sink = MockSink::default();
        let (_tx, rx) = running();

        let err = run(&mut session, &mut sink, rx).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<io::Error>().unwrap().kind(),
            ErrorKind::UnexpectedEof
        );

        let written: Vec<_> = sink.written.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            written,
            vec![
                RawReading::new(512.0, 45.20, 23.10).correct(),
                RawReading::new(600.0, 50.00, -2.00).correct(),
            ]
        );
        assert!(sink.written[0].1 <= sink.written[1].1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_error_is_returned_unchanged_and_stops_reading() {
        let port = MockPort::new(vec![
            Ok(b"CO2=512,HUM=45.20,TMP=23.10\r\n".to_vec()),
            Err(io::Error::new(ErrorKind::Other, "unplugged")),
            Ok(b"CO2=513,HUM=45.20,TMP=23.10\r\n".to_vec()),
        ]);
        let calls = port.calls.clone();
        let mut session = Session::start(port).unwrap();
        let mut sink = MockSink::default();
        let (_tx, rx) = running();

        let err = run(&mut session, &mut sink, rx).await.unwrap_err();
        let err = err.downcast_ref::<io::Error>().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.to_string(), "unplugged");

        assert_eq!(sink.written.len(), 1);
        let reads = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == Call::Read)
            .count();
        assert_eq!(reads, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stops_when_signalled() {
        let port = MockPort::new(vec![
            Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            Ok(b"CO2=512,HUM=45.20,TMP=23.10\r\n".to_vec()),
        ]);
        let mut session = Session::start(port).unwrap();
        let mut sink = MockSink::default();
        let (tx, rx) = running();
        tx.send(true).unwrap();

        run(&mut session, &mut sink, rx).await.unwrap();
        assert!(sink.written.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timeouts_are_not_fatal() {
        let port = MockPort::new(vec![
            Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            Ok(b"CO2=512,HUM=45.20,TMP=23.10\r\n".to_vec()),
        ]);
        let mut session = Session::start(port).unwrap();
        let mut sink = MockSink::default();
        let (_tx, rx) = running();

        run(&mut session, &mut sink, rx).await.unwrap_err();
        assert_eq!(sink.written.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn skips_non_finite_corrections() {
        let port = MockPort::lines(&["CO2=400,HUM=50.00,TMP=4.50", "CO2=400,HUM=50.00,TMP=4.60"]);
        let mut session = Session::start(port).unwrap();
        let mut sink = MockSink::default();
        let (_tx, rx) = running();

        run(&mut session, &mut sink, rx).await.unwrap_err();
        assert_eq!(sink.written.len(), 1);
        assert!(sink.written[0].0.is_finite());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn write_failures_do_not_stop_the_loop() {
        let port = MockPort::lines(&["CO2=400,HUM=50.00,TMP=20.00", "CO2=401,HUM=50.00,TMP=20.00"]);
        let mut session = Session::start(port).unwrap();
        let mut sink = MockSink {
            failures: vec![true, false].into(),
            ..Default::default()
        };
        let (_tx, rx) = running();

        run(&mut session, &mut sink, rx).await.unwrap_err();
        assert_eq!(sink.written.len(), 1);
        assert_eq!(sink.written[0].0.co2, 401.0);
    }
}
