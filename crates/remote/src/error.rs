use builder_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} responded with {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} query failed: {message}")]
    GraphQl {
        service: &'static str,
        message: String,
    },

    #[error("{service} call failed: {message}")]
    Rpc {
        service: &'static str,
        message: String,
    },

    #[error("Invalid {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("Object store error: {0}")]
    Storage(String),
}

impl RemoteError {
    pub fn service(&self) -> &'static str {
        match self {
            Self::Transport { service, .. }
            | Self::Status { service, .. }
            | Self::GraphQl { service, .. }
            | Self::Rpc { service, .. }
            | Self::Decode { service, .. } => service,
            Self::Storage(_) => "object store",
        }
    }
}

impl From<RemoteError> for CoreError {
    fn from(err: RemoteError) -> Self {
        CoreError::UpstreamUnavailable {
            service: err.service(),
            message: err.to_string(),
        }
    }
}
