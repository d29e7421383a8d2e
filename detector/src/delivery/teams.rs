use picam_motion_common::config::TeamsConfig;
use serde_json::{json, Value};
use tracing::debug;

use super::{DeliveryError, Notifier, CONNECT_TIMEOUT, IO_TIMEOUT};

/// Posts a MessageCard with the capture image to a Teams incoming webhook.
pub struct TeamsNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl TeamsNotifier {
    pub fn new(config: &TeamsConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(IO_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Http(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
        })
    }
}

pub fn message_card(message: &str, image_url: &str) -> Value {
    json!({
        "@type": "MessageCard",
        "text": message,
        "sections": [
            { "images": [ { "image": image_url } ] }
        ]
    })
}

impl Notifier for TeamsNotifier {
    async fn notify(&self, message: &str, image_url: &str) -> Result<(), DeliveryError> {
        let card = message_card(message, image_url);
        debug!(url = self.webhook_url, %card, "posting webhook notification");

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&card)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::sync::mpsc;

    async fn serve(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                        let _ = tx.send(body);
                        (status, "1")
                    },
                ),
            )
            .with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), rx)
    }

    fn notifier(url: String) -> TeamsNotifier {
        TeamsNotifier::new(&TeamsConfig {
            webhook_url: url,
            image_base_url: String::new(),
        })
        .unwrap()
    }

    #[test]
    fn card_shape() {
        let card = message_card("hello", "https://x/img.jpg");
        assert_eq!(card["@type"], "MessageCard");
        assert_eq!(card["text"], "hello");
        assert_eq!(card["sections"][0]["images"][0]["image"], "https://x/img.jpg");
    }

    #[tokio::test]
    async fn posts_card_to_webhook() {
        let (url, mut rx) = serve(StatusCode::OK).await;
        notifier(url)
            .notify("Motion detected", "https://x/mo-1.jpg")
            .await
            .unwrap();

        let body = rx.recv().await.unwrap();
        assert_eq!(body, message_card("Motion detected", "https://x/mo-1.jpg"));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let (url, _rx) = serve(StatusCode::BAD_REQUEST).await;
        let err = notifier(url)
            .notify("Motion detected", "https://x/mo-1.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Status { status: 400, .. }));
    }
}
