use {
    crate::{config::Config, reading::CorrectedReading},
    anyhow::{Context, Result},
    chrono::{DateTime, Utc},
    influxdb::{Client as DbClient, InfluxDbWriteable, Timestamp},
    log::info,
};

/// Somewhere corrected readings get persisted.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Called once, before the first write.
    async fn connect(&mut self) -> Result<()>;

    async fn write(&mut self, reading: &CorrectedReading, time: DateTime<Utc>) -> Result<()>;
}

pub struct InfluxSink {
    client: DbClient,
    url: String,
    measurement: String,
}

impl InfluxSink {
    pub fn new(config: &Config) -> Self {
        let url = config.db_url();
        let mut client = DbClient::new(url.clone(), config.bucket.clone());
        if let Some(token) = &config.token {
            client = client.with_token(token.clone());
        }

        Self {
            client,
            url,
            measurement: config.measurement.clone(),
        }
    }
}

impl Sink for InfluxSink {
    async fn connect(&mut self) -> Result<()> {
        info!("INFLUXDB connecting to {}", self.url);
        let (build, version) = self
            .client
            .ping()
            .await
            .with_context(|| format!("Failed to reach InfluxDB at {}", self.url))?;
        info!("INFLUXDB {} ({}) ready", version, build);
        Ok(())
    }

    async fn write(&mut self, reading: &CorrectedReading, time: DateTime<Utc>) -> Result<()> {
        let query = Timestamp::from(time)
            .into_query(self.measurement.as_str())
            .add_field("CO2", reading.co2)
            .add_field("HUM", reading.hum)
            .add_field("TMP", reading.tmp);

        self.client
            .query(query)
            .await
            .context("Failed to write reading to InfluxDB")?;
        Ok(())
    }
}
