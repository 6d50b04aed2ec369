//! Configuration for the realtime STT session.

use url::Url;

use crate::base::SttError;

/// Default audio sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default WebSocket endpoint of the local realtime STT engine.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8012";

/// Configuration for a [`RealtimeStt`](crate::RealtimeStt) session.
#[derive(Debug, Clone)]
pub struct RealtimeSttConfig {
    /// WebSocket endpoint of the STT engine.
    pub endpoint: Url,
    /// Sample rate of the audio that will be sent, in Hz.
    ///
    /// Advertised to the engine in the metadata header of every outbound
    /// audio frame. Immutable for the lifetime of the session.
    pub sample_rate: u32,
}

impl Default for RealtimeSttConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl RealtimeSttConfig {
    /// Validate the configuration.
    ///
    /// Checks that the sample rate is positive and that the endpoint uses a
    /// WebSocket scheme.
    pub fn validate(&self) -> Result<(), SttError> {
        if self.sample_rate == 0 {
            return Err(SttError::ConfigurationError(
                "sample rate must be greater than zero".to_string(),
            ));
        }

        match self.endpoint.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(SttError::ConfigurationError(format!(
                    "unsupported endpoint scheme '{other}', expected ws or wss"
                )));
            }
        }

        Ok(())
    }
}
