//! Document renderer
//!
//! The bundled renderer posts the report URL to a Chromium conversion
//! service speaking the Gotenberg `forms/chromium/convert/url` API and gets
//! PDF bytes back.

use async_trait::async_trait;
use reqwest::multipart::Form;
use tracing::debug;

use crate::error::{ReportError, ReportResult};

/// Page setup for a rendered report
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Inches
    pub paper_width: f32,
    /// Inches
    pub paper_height: f32,
    /// Inches, applied to every side
    pub margin: f32,
    pub print_background: bool,
    /// Emulate `@media print`
    pub print_media: bool,
}

impl Default for RenderOptions {
    /// A4 with print styles
    fn default() -> Self {
        Self {
            paper_width: 8.27,
            paper_height: 11.7,
            margin: 0.4,
            print_background: true,
            print_media: true,
        }
    }
}

impl RenderOptions {
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Form fields understood by the conversion service
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let margin = self.margin.to_string();
        vec![
            ("paperWidth", self.paper_width.to_string()),
            ("paperHeight", self.paper_height.to_string()),
            ("marginTop", margin.clone()),
            ("marginBottom", margin.clone()),
            ("marginLeft", margin.clone()),
            ("marginRight", margin),
            ("printBackground", self.print_background.to_string()),
            (
                "emulatedMediaType",
                if self.print_media { "print" } else { "screen" }.to_string(),
            ),
        ]
    }
}

/// Renders a web page into a PDF document
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> ReportResult<Vec<u8>>;
}

/// [`DocumentRenderer`] backed by an HTTP conversion service
pub struct HttpDocumentRenderer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentRenderer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/forms/chromium/convert/url",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl DocumentRenderer for HttpDocumentRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> ReportResult<Vec<u8>> {
        let form = options
            .form_fields()
            .into_iter()
            .fold(Form::new().text("url", url.to_string()), |form, (name, value)| {
                form.text(name, value)
            });

        debug!(url, endpoint = %self.endpoint(), "rendering report");
        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReportError::Render(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Render(format!("{}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReportError::Render(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
