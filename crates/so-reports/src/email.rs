//! Email delivery

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use so_core::config::SmtpConfig;
use tracing::info;

use crate::error::{ReportError, ReportResult};

/// Email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub email: String,
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Format as RFC 5322
    pub fn to_rfc5322(&self) -> String {
        match &self.name {
            Some(name) => format!("\"{}\" <{}>", name, self.email),
            None => self.email.clone(),
        }
    }

    fn mailbox(&self) -> ReportResult<Mailbox> {
        let address: Address = self
            .email
            .parse()
            .map_err(|_| ReportError::InvalidDestination(self.email.clone()))?;
        Ok(Mailbox::new(self.name.clone(), address))
    }
}

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            content,
        }
    }
}

/// Plain-text email with attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub text_body: String,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    pub fn new(
        from: EmailAddress,
        to: Vec<EmailAddress>,
        subject: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            text_body: text_body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    fn to_mime(&self) -> ReportResult<Message> {
        let mut builder = Message::builder()
            .from(self.from.mailbox()?)
            .subject(self.subject.as_str());
        for recipient in &self.to {
            builder = builder.to(recipient.mailbox()?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(self.text_body.clone()));
        for attachment in &self.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| ReportError::Email(e.to_string()))?;
            body = body.singlepart(
                MailAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        builder
            .multipart(body)
            .map_err(|e| ReportError::Email(e.to_string()))
    }
}

/// Email sender trait
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> ReportResult<()>;

    /// Whether messages actually leave the process
    fn is_configured(&self) -> bool;
}

/// SMTP sender
///
/// Port 465 connects with implicit TLS, any other port upgrades with STARTTLS.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> ReportResult<Self> {
        let builder = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| ReportError::Email(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> ReportResult<()> {
        let mime = message.to_mime()?;
        self.transport
            .send(mime)
            .await
            .map_err(|e| ReportError::Email(e.to_string()))?;
        info!(subject = %message.subject, recipients = message.to.len(), "email sent");
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in when no SMTP transport is configured; the dispatcher refuses
/// email delivery through it, and a direct send only logs
#[derive(Debug, Default)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for ConsoleEmailSender {
    async fn send(&self, message: &EmailMessage) -> ReportResult<()> {
        let to = message
            .to
            .iter()
            .map(EmailAddress::to_rfc5322)
            .collect::<Vec<_>>()
            .join(", ");
        let attachments = message
            .attachments
            .iter()
            .map(|a| format!("{} ({} bytes)", a.filename, a.content.len()))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            from = %message.from.to_rfc5322(),
            to = %to,
            subject = %message.subject,
            attachments = %attachments,
            body = %message.text_body,
            "email not sent, no SMTP transport configured"
        );
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_mail() -> EmailMessage {
        EmailMessage::new(
            EmailAddress::new("relatorios@example.com").with_name("Serviços"),
            vec![EmailAddress::new("cliente@example.com")],
            "Relatório do Serviço #7",
            "Segue em anexo o relatório solicitado.",
        )
        .attach(Attachment::pdf("servico-7.pdf", b"%PDF-1.4".to_vec()))
    }

    #[test]
    fn test_display_name() {
        let address = EmailAddress::new("relatorios@example.com").with_name("Serviços");
        assert_eq!(address.to_rfc5322(), "\"Serviços\" <relatorios@example.com>");
    }

    #[test]
    fn test_mime_message_carries_attachment() {
        let formatted = String::from_utf8(report_mail().to_mime().unwrap().formatted()).unwrap();
        assert!(formatted.contains("servico-7.pdf"));
        assert!(formatted.contains("application/pdf"));
        assert!(formatted.contains("To: cliente@example.com"));
    }

    #[test]
    fn test_bad_recipient() {
        let mut mail = report_mail();
        mail.to = vec![EmailAddress::new("not an address")];
        assert!(matches!(
            mail.to_mime(),
            Err(ReportError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn test_console_sender_reports_unconfigured() {
        let sender = ConsoleEmailSender::new();
        assert!(sender.send(&report_mail()).await.is_ok());
        assert!(!sender.is_configured());
    }
}
