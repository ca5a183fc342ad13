//! # so-reports
//!
//! Printable order reports and their delivery.
//!
//! - [`ReportPage`]: the HTML report served at `/order/service/{id}`
//! - [`DocumentRenderer`]: turns that page into a PDF through a rendering service
//! - [`EmailSender`] / [`MessagingClient`]: the two delivery channels
//! - [`ReportDispatcher`]: validate, render, deliver

pub mod dispatcher;
pub mod email;
pub mod error;
pub mod messaging;
pub mod renderer;
pub mod template;

pub use dispatcher::{DispatchSettings, ReportDispatcher};
pub use email::{Attachment, ConsoleEmailSender, EmailAddress, EmailMessage, EmailSender, SmtpEmailSender};
pub use error::{ReportError, ReportResult};
pub use messaging::{normalize_phone, MessagingClient, WhatsAppCloudClient};
pub use renderer::{DocumentRenderer, HttpDocumentRenderer, RenderOptions};
pub use template::ReportPage;

/// Subject and caption of a delivered report
pub fn report_title(order_id: so_core::Id) -> String {
    format!("Relatório do Serviço #{}", order_id)
}

/// Attachment name of a delivered report
pub fn report_filename(order_id: so_core::Id) -> String {
    format!("servico-{}.pdf", order_id)
}
