//! Report dispatcher
//!
//! `send` checks the request, makes sure the order exists, renders the
//! report page to PDF and hands it to the requested channel. Nothing is
//! retried; the first failing step ends the request.

use std::sync::Arc;
use std::time::Duration;

use so_core::config::AppConfig;
use so_db::{Collection, RecordStore};
use so_models::{Channel, DeliveryRequest};
use tracing::{error, info, instrument};

use crate::email::{Attachment, EmailAddress, EmailMessage, EmailSender};
use crate::error::{ReportError, ReportResult};
use crate::messaging::{normalize_phone, MessagingClient};
use crate::renderer::{DocumentRenderer, RenderOptions};
use crate::{report_filename, report_title};

const EMAIL_BODY: &str = "Segue em anexo o relatório solicitado.";

/// Dispatcher settings taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Base URL the renderer loads `/order/service/{id}` from
    pub public_base_url: String,
    pub render_timeout: Duration,
    pub render_options: RenderOptions,
    pub sender: EmailAddress,
}

impl DispatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let address = config
            .email
            .smtp
            .as_ref()
            .map(|smtp| smtp.username.clone())
            .unwrap_or_else(|| "no-reply@localhost".to_string());
        Self {
            public_base_url: config.reports.public_base_url.clone(),
            render_timeout: Duration::from_secs(config.reports.render_timeout_seconds),
            render_options: RenderOptions::default().with_margin(config.reports.margin_inches),
            sender: EmailAddress::new(address).with_name(config.email.from_name.clone()),
        }
    }
}

enum Recipient {
    Email(EmailAddress),
    Phone(String),
}

pub struct ReportDispatcher {
    store: Arc<dyn RecordStore>,
    renderer: Arc<dyn DocumentRenderer>,
    email: Arc<dyn EmailSender>,
    messaging: Option<Arc<dyn MessagingClient>>,
    settings: DispatchSettings,
}

impl ReportDispatcher {
    pub fn new(
        store: Arc<dyn RecordStore>,
        renderer: Arc<dyn DocumentRenderer>,
        email: Arc<dyn EmailSender>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            renderer,
            email,
            messaging: None,
            settings,
        }
    }

    pub fn with_messaging(mut self, messaging: Arc<dyn MessagingClient>) -> Self {
        self.messaging = Some(messaging);
        self
    }

    /// Page the renderer prints
    pub fn report_url(&self, order_id: so_core::Id) -> String {
        format!(
            "{}/order/service/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            order_id
        )
    }

    #[instrument(skip(self, request), fields(order_id = request.id, channel = %request.channel))]
    pub async fn send(&self, request: &DeliveryRequest) -> ReportResult<()> {
        let recipient = self.recipient(request)?;

        if !self.store.exists(Collection::Services, request.id).await? {
            return Err(ReportError::OrderNotFound(request.id));
        }

        let pdf = self.render(request.id).await?;
        let filename = report_filename(request.id);
        let title = report_title(request.id);

        let outcome = match recipient {
            Recipient::Email(to) => {
                let message = EmailMessage::new(self.settings.sender.clone(), vec![to], title, EMAIL_BODY)
                    .attach(Attachment::pdf(filename, pdf));
                self.email.send(&message).await
            }
            Recipient::Phone(phone) => {
                let messaging = self.messaging()?;
                let media_id = messaging.upload_document(pdf, &filename).await?;
                messaging
                    .send_document(&phone, &media_id, &filename, &title)
                    .await
            }
        };

        match &outcome {
            Ok(()) => info!("report delivered"),
            Err(e) => error!(error = %e, "report delivery failed"),
        }
        outcome
    }

    fn messaging(&self) -> ReportResult<&Arc<dyn MessagingClient>> {
        self.messaging
            .as_ref()
            .ok_or(ReportError::NotConfigured("whatsapp"))
    }

    /// Validate the destination before any rendering work
    fn recipient(&self, request: &DeliveryRequest) -> ReportResult<Recipient> {
        match request.channel {
            Channel::Email => {
                if !self.email.is_configured() {
                    return Err(ReportError::NotConfigured("email"));
                }
                let address = request.destination.trim();
                address
                    .parse::<lettre::Address>()
                    .map_err(|_| ReportError::InvalidDestination(address.to_string()))?;
                Ok(Recipient::Email(EmailAddress::new(address)))
            }
            Channel::Whatsapp => {
                let messaging = self.messaging()?;
                normalize_phone(&request.destination, messaging.country_code())
                    .map(Recipient::Phone)
                    .ok_or_else(|| ReportError::InvalidDestination(request.destination.clone()))
            }
        }
    }

    async fn render(&self, order_id: so_core::Id) -> ReportResult<Vec<u8>> {
        let url = self.report_url(order_id);
        let timeout = self.settings.render_timeout;
        match tokio::time::timeout(timeout, self.renderer.render(&url, &self.settings.render_options)).await {
            Ok(rendered) => rendered,
            Err(_) => Err(ReportError::RenderTimeout(timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use so_db::MemoryRecordStore;

    use crate::email::ConsoleEmailSender;

    #[derive(Default)]
    struct FakeRenderer {
        delay: Option<Duration>,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentRenderer for FakeRenderer {
        async fn render(&self, url: &str, _options: &RenderOptions) -> ReportResult<Vec<u8>> {
            self.urls.lock().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(b"%PDF-1.4".to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> ReportResult<()> {
            self.sent.lock().push(message.clone());
            Ok(())
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        media_id: Option<String>,
        sent: Mutex<Vec<(String, String, String, String)>>,
    }

    #[async_trait]
    impl MessagingClient for RecordingMessenger {
        async fn upload_document(&self, _content: Vec<u8>, _filename: &str) -> ReportResult<String> {
            self.media_id.clone().ok_or(ReportError::MissingMediaId)
        }

        async fn send_document(&self, to: &str, media_id: &str, filename: &str, caption: &str) -> ReportResult<()> {
            self.sent.lock().push((
                to.to_string(),
                media_id.to_string(),
                filename.to_string(),
                caption.to_string(),
            ));
            Ok(())
        }

        fn country_code(&self) -> &str {
            "55"
        }
    }

    struct Harness {
        renderer: Arc<FakeRenderer>,
        mailer: Arc<RecordingMailer>,
        messenger: Arc<RecordingMessenger>,
        dispatcher: ReportDispatcher,
    }

    async fn harness(renderer: FakeRenderer, messenger: RecordingMessenger) -> Harness {
        let store = MemoryRecordStore::new();
        store
            .insert_one(
                Collection::Services,
                json!({ "type": "Troca", "ps": "SF-06" }).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let renderer = Arc::new(renderer);
        let mailer = Arc::new(RecordingMailer::default());
        let messenger = Arc::new(messenger);
        let settings = DispatchSettings {
            public_base_url: "http://app.local/".to_string(),
            render_timeout: Duration::from_millis(200),
            render_options: RenderOptions::default(),
            sender: EmailAddress::new("relatorios@example.com").with_name("Serviços"),
        };
        let dispatcher = ReportDispatcher::new(Arc::new(store), renderer.clone(), mailer.clone(), settings)
            .with_messaging(messenger.clone());
        Harness {
            renderer,
            mailer,
            messenger,
            dispatcher,
        }
    }

    fn request(channel: Channel, destination: &str, id: so_core::Id) -> DeliveryRequest {
        DeliveryRequest {
            id,
            channel,
            destination: destination.to_string(),
        }
    }

    #[tokio::test]
    async fn test_email_delivery() {
        let h = harness(FakeRenderer::default(), RecordingMessenger::default()).await;

        h.dispatcher
            .send(&request(Channel::Email, "cliente@example.com", 1))
            .await
            .unwrap();

        assert_eq!(h.renderer.urls.lock().as_slice(), ["http://app.local/order/service/1"]);
        let sent = h.mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Relatório do Serviço #1");
        assert_eq!(sent[0].text_body, EMAIL_BODY);
        assert_eq!(sent[0].from.name.as_deref(), Some("Serviços"));
        assert_eq!(sent[0].to[0].email, "cliente@example.com");
        assert_eq!(sent[0].attachments[0].filename, "servico-1.pdf");
        assert_eq!(sent[0].attachments[0].content, b"%PDF-1.4".to_vec());
    }

    #[tokio::test]
    async fn test_whatsapp_delivery() {
        let messenger = RecordingMessenger {
            media_id: Some("media-1".to_string()),
            ..Default::default()
        };
        let h = harness(FakeRenderer::default(), messenger).await;

        h.dispatcher
            .send(&request(Channel::Whatsapp, "(11) 98765-4321", 1))
            .await
            .unwrap();

        let sent = h.messenger.sent.lock();
        assert_eq!(
            sent[0],
            (
                "5511987654321".to_string(),
                "media-1".to_string(),
                "servico-1.pdf".to_string(),
                "Relatório do Serviço #1".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_missing_media_id_stops_delivery() {
        let h = harness(FakeRenderer::default(), RecordingMessenger::default()).await;

        let result = h.dispatcher.send(&request(Channel::Whatsapp, "11987654321", 1)).await;

        assert!(matches!(result, Err(ReportError::MissingMediaId)));
        assert!(h.messenger.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_checks_happen_before_rendering() {
        let h = harness(FakeRenderer::default(), RecordingMessenger::default()).await;

        let bad_address = h.dispatcher.send(&request(Channel::Email, "not-an-address", 1)).await;
        assert!(matches!(bad_address, Err(ReportError::InvalidDestination(_))));

        let missing = h.dispatcher.send(&request(Channel::Email, "cliente@example.com", 42)).await;
        assert!(matches!(missing, Err(ReportError::OrderNotFound(42))));

        assert!(h.renderer.urls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let renderer = FakeRenderer {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let h = harness(renderer, RecordingMessenger::default()).await;

        let result = h.dispatcher.send(&request(Channel::Email, "cliente@example.com", 1)).await;

        assert!(matches!(result, Err(ReportError::RenderTimeout(_))));
        assert!(h.mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_whatsapp_requires_configuration() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let settings = DispatchSettings::from_config(&AppConfig::default());
        let dispatcher = ReportDispatcher::new(
            store,
            Arc::new(FakeRenderer::default()),
            Arc::new(RecordingMailer::default()),
            settings,
        );

        let result = dispatcher.send(&request(Channel::Whatsapp, "11987654321", 1)).await;
        assert!(matches!(result, Err(ReportError::NotConfigured("whatsapp"))));
    }

    #[tokio::test]
    async fn test_email_requires_transport() {
        let h = harness(FakeRenderer::default(), RecordingMessenger::default()).await;
        let dispatcher = ReportDispatcher::new(
            h.dispatcher.store.clone(),
            h.renderer.clone(),
            Arc::new(ConsoleEmailSender::new()),
            h.dispatcher.settings.clone(),
        );

        let result = dispatcher.send(&request(Channel::Email, "cliente@example.com", 1)).await;

        assert!(matches!(result, Err(ReportError::NotConfigured("email"))));
        assert!(h.renderer.urls.lock().is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = DispatchSettings::from_config(&AppConfig::default());
        assert_eq!(settings.sender.name.as_deref(), Some("Serviços"));
        assert_eq!(settings.render_timeout, Duration::from_secs(30));
        assert_eq!(settings.render_options.margin, 0.4);
    }
}
