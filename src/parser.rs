use {
    crate::reading::RawReading,
    lazy_static::lazy_static,
    regex::Regex,
    std::num::ParseFloatError,
};

/// Sent by the sensor once streaming has been started.
pub const START_ACK: &str = "OK STA";

lazy_static! {
    static ref LINE: Regex =
        Regex::new(r"CO2=(?P<co2>\d+),HUM=(?P<hum>\d+\.\d+),TMP=(?P<tmp>-?\d+\.\d+)")
            .expect("line pattern is valid");
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid format: '{0}'")]
    Malformed(String),
    #[error("invalid number '{value}': {source}")]
    Number {
        value: String,
        source: ParseFloatError,
    },
}

/// Parses one line from the sensor, without its terminator.
///
/// The start acknowledgement carries no data and yields `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<RawReading>, ParseError> {
    if line == START_ACK {
        return Ok(None);
    }

    let captures = LINE
        .captures(line)
        .ok_or_else(|| ParseError::Malformed(line.to_string()))?;

    let mut values = [0f64; 3];
    for (value, name) in values.iter_mut().zip(["co2", "hum", "tmp"]) {
        let text = &captures[name];
        *value = text.parse().map_err(|source| ParseError::Number {
            value: text.to_string(),
            source,
        })?;
    }

    let [co2, hum, tmp] = values;
    Ok(Some(RawReading::new(co2, hum, tmp)))
}
