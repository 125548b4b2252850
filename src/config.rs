use {
    anyhow::{anyhow, Context, Result},
    std::env,
};

const DEFAULT_DEVICE: &str = "/dev/ttyACM0";
const DEFAULT_BAUD: u32 = 115_200;
const DEFAULT_BUCKET: &str = "CO2";
const DEFAULT_MEASUREMENT: &str = "co2";

/// Everything needed to open a sensor session and its database sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub device: String,
    pub baud: u32,
    pub db_address: String,
    pub db_port: u16,
    pub bucket: String,
    pub measurement: String,
    pub token: Option<String>,
}

impl Config {
    pub fn new(device: impl Into<String>, db_address: impl Into<String>, db_port: u16) -> Self {
        Self {
            device: device.into(),
            baud: DEFAULT_BAUD,
            db_address: db_address.into(),
            db_port,
            bucket: DEFAULT_BUCKET.to_string(),
            measurement: DEFAULT_MEASUREMENT.to_string(),
            token: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow!("Failed to find {} environment variable", key))
        };

        let db_address = required("DB_ADDR")?;
        let db_port = required("DB_PORT")?
            .parse()
            .context("DB_PORT is not a valid port")?;

        let mut config = Self::new(
            lookup("CO2_DEVICE").unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            db_address,
            db_port,
        );

        if let Some(baud) = lookup("CO2_BAUD") {
            config.baud = baud.parse().context("CO2_BAUD is not a valid baud rate")?;
        }
        if let Some(bucket) = lookup("DB_BUCKET") {
            config.bucket = bucket;
        }
        if let Some(measurement) = lookup("DB_MEASUREMENT") {
            config.measurement = measurement;
        }
        config.token = lookup("DB_TOKEN");

        Ok(config)
    }

    pub fn db_url(&self) -> String {
        format!("http://{}:{}", self.db_address, self.db_port)
    }
}
