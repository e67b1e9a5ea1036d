use std::convert::TryFrom;
use tokio::time::Duration;

#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Session timeout suggested to the cluster at registration. The cluster
    /// may answer with a different value, and its answer wins.
    pub session_timeout_hint: Option<Duration>,
    /// How long a graceful close waits for the unregister acknowledgement.
    pub unregister_timeout: Option<Duration>,
}

pub(super) struct ClientOptionsValidated {
    pub session_timeout_hint: Duration,
    pub unregister_timeout: Duration,
}

impl ClientOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.session_timeout_hint.is_zero() {
            return Err("Session timeout hint must be non-zero");
        }
        if self.unregister_timeout.is_zero() {
            return Err("Unregister timeout must be non-zero");
        }

        Ok(())
    }
}

impl TryFrom<ClientOptions> for ClientOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ClientOptions) -> Result<Self, Self::Error> {
        let values = ClientOptionsValidated {
            session_timeout_hint: options.session_timeout_hint.unwrap_or(Duration::from_secs(10)),
            unregister_timeout: options.unregister_timeout.unwrap_or(Duration::from_secs(5)),
        };

        values.validate()?;
        Ok(values)
    }
}
