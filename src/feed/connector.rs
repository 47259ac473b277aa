use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

/// Errors raised while talking to a relay
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Feed transport error: {0}")]
    Transport(String),
}

/// Text payloads of one open feed connection. The stream ends when the peer closes.
pub type FeedStream = BoxStream<'static, Result<String, FeedError>>;

/// Opens feed connections. Each call is one connection attempt.
#[async_trait]
pub trait FeedConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<FeedStream, FeedError>;

    /// Where this connector points, for logging
    fn endpoint(&self) -> &str;
}

/// WebSocket connector for a running relay (`ws://host:port/ws`)
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl FeedConnector for WsConnector {
    async fn connect(&self) -> Result<FeedStream, FeedError> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        // Only text frames carry records; pings are answered by tungstenite
        let stream = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(FeedError::Transport(e.to_string()))),
            }
        });

        Ok(stream.boxed())
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
