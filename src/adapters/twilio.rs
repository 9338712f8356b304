//! Twilio messaging adapter.
//!
//! [`TwilioClient`] is the raw messaging API: one message from a sender to a
//! recipient. [`TwilioWhatsApp`] pins both ends to WhatsApp numbers and is
//! what the scheduler dispatches reminders through.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{DeliveryError, NotificationDispatcher};

const SERVICE: &str = "Twilio";

/// Twilio REST client (Messages resource only)
pub struct TwilioClient {
    account_sid: String,
    auth_token: String,
    /// API root (overridable for tests)
    api_base: String,
    client: reqwest::Client,
}

/// Successful Messages.json response
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Error body returned by Twilio
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        Self {
            account_sid,
            auth_token,
            api_base: "https://api.twilio.com".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }

    /// Send `body` from `from` to `to`, returning the message SID
    pub async fn send_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<String, DeliveryError> {
        let transport = |source: reqwest::Error| DeliveryError::Transport {
            service: SERVICE,
            source,
        };

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TwilioErrorBody>(&text) {
                Ok(TwilioErrorBody {
                    message: Some(message),
                    code,
                }) => match code {
                    Some(code) => format!("{} (code {})", message, code),
                    None => message,
                },
                _ => text,
            };
            return Err(DeliveryError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response.json().await.map_err(transport)?;
        Ok(resource.sid)
    }
}

/// WhatsApp delivery to one fixed recipient
pub struct TwilioWhatsApp {
    client: TwilioClient,
    from: String,
    to: String,
}

impl TwilioWhatsApp {
    /// `sender` and `recipient` are plain phone numbers (e.g. "+15551234567")
    pub fn new(client: TwilioClient, sender: &str, recipient: &str) -> Self {
        Self {
            client,
            from: whatsapp_address(sender),
            to: whatsapp_address(recipient),
        }
    }
}

/// Prefix a number with the WhatsApp channel unless it already has one
fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait]
impl NotificationDispatcher for TwilioWhatsApp {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        let sid = self.client.send_message(&self.from, &self.to, message).await?;
        info!(%sid, "WhatsApp message sent");
        Ok(())
    }
}
