use tonic::{
    Request, Status,
    metadata::{Ascii, MetadataValue},
    service::Interceptor,
};

/// Metadata key carrying the client name and version.
pub const CLIENT_HEADER: &str = "x-sendwire-client";

/// Logs every outbound call and tags it with [`CLIENT_HEADER`].
///
/// Interceptors only see call metadata; message bodies are logged by the
/// adapters that send and receive them.
#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    client: MetadataValue<Ascii>,
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self {
            client: MetadataValue::from_static(concat!("sendwire/", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl Interceptor for LoggingInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        tracing::debug!(metadata = ?request.metadata(), "Outbound call");
        request
            .metadata_mut()
            .insert(CLIENT_HEADER, self.client.clone());
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_outbound_calls() {
        let request = LoggingInterceptor::default()
            .call(Request::new(()))
            .unwrap();
        let value = request.metadata().get(CLIENT_HEADER).unwrap();
        assert!(value.to_str().unwrap().starts_with("sendwire/"));
    }
}
