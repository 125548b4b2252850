use std::fmt;

/// Offset between the sensor's internal temperature and ambient, in °C.
const TMP_OFFSET: f64 = 4.5;
/// Magnus formula constant, in °C.
const MAGNUS_B: f64 = 237.3;

/// Values as reported by the sensor, before calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub co2: f64,
    pub hum: f64,
    pub tmp: f64,
}

/// Values after the calibration formula has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedReading {
    pub co2: f64,
    pub hum: f64,
    pub tmp: f64,
}

impl RawReading {
    pub fn new(co2: f64, hum: f64, tmp: f64) -> Self {
        Self { co2, hum, tmp }
    }

    /// Shift the temperature down to ambient and rescale relative humidity to
    /// the new temperature so that absolute humidity stays the same.
    ///
    /// Nothing is guarded here: a raw temperature of 4.5 or -237.3 yields an
    /// infinite or NaN humidity. Check [`CorrectedReading::is_finite`].
    pub fn correct(self) -> CorrectedReading {
        let tmp = self.tmp - TMP_OFFSET;
        let hum = self.hum * self.tmp * (tmp + MAGNUS_B) / (tmp * (self.tmp + MAGNUS_B));

        CorrectedReading {
            co2: self.co2,
            hum,
            tmp,
        }
    }
}

/// Renders the reading the way the sensor puts it on the wire.
impl fmt::Display for RawReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CO2={:.0},HUM={},TMP={}",
            self.co2,
            decimal(self.hum),
            decimal(self.tmp)
        )
    }
}

// The wire format always carries a fractional part.
fn decimal(value: f64) -> String {
    let s = value.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

impl CorrectedReading {
    pub fn is_finite(&self) -> bool {
        self.co2.is_finite() && self.hum.is_finite() && self.tmp.is_finite()
    }
}

impl fmt::Display for CorrectedReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "co2: {} ppm, humidity: {:.2} %, temperature: {:.2} °C",
            self.co2, self.hum, self.tmp
        )
    }
}
