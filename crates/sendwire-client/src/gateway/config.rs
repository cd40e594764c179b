use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `sendwire-gateway` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sendwire-gateway",
    version,
    about = "HTTP front end over the blocking sendwire client adapters"
)]
pub struct GatewayArgs {
    /// URI of the sendwire gRPC server.
    ///
    /// Environment variable: `SERVER_URI`
    #[arg(long, env = "SERVER_URI", default_value_t = String::from("http://127.0.0.1:50051"))]
    pub server_uri: String,

    /// Address the HTTP gateway listens on.
    ///
    /// Environment variable: `LISTEN_ADDR`
    #[arg(long, env = "LISTEN_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub listen_addr: String,

    /// Upper bound in milliseconds for each bidirectional step. Unset waits
    /// indefinitely.
    ///
    /// Environment variable: `RESPONSE_TIMEOUT_MS`
    #[arg(long, env = "RESPONSE_TIMEOUT_MS")]
    pub response_timeout_ms: Option<u64>,

    /// Capacity of the outbound channel of a streaming call.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub server_uri: String,
    pub listen_addr: String,
    pub response_timeout: Option<Duration>,
    pub stream_buffer_size: usize,
}

impl TryFrom<GatewayArgs> for GatewayConfig {
    type Error = anyhow::Error;

    fn try_from(args: GatewayArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.response_timeout_ms == Some(0) {
            bail!("RESPONSE_TIMEOUT_MS must be greater than 0");
        }

        Ok(Self {
            server_uri: args.server_uri,
            listen_addr: args.listen_addr,
            response_timeout: args.response_timeout_ms.map(Duration::from_millis),
            stream_buffer_size: args.stream_buffer_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<GatewayConfig> {
        let args = GatewayArgs::try_parse_from(
            core::iter::once("sendwire-gateway").chain(args.iter().copied()),
        )?;
        GatewayConfig::try_from(args)
    }

    #[test]
    fn timeout_is_optional() {
        let config = parse(&[]).unwrap();
        assert!(config.response_timeout.is_none());

        let config = parse(&["--response-timeout-ms", "250"]).unwrap();
        assert_eq!(config.response_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(parse(&["--response-timeout-ms", "0"]).is_err());
        assert!(parse(&["--stream-buffer-size", "0"]).is_err());
    }
}
