//! Ink service: enrichment and conversion of Universal Ink Model
//! streams.
//!
//! Every operation is a single POST with the UIM bytes as the body;
//! responses are either enriched UIM bytes, an exported rendition or,
//! for the plain-text recognizer, a bare string.

use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::LocaleCode;
use crate::transport::{CallOptions, RequestSpec};

const UIM_CONTENT_TYPE: &str = "application/octet-stream";

/// Export rendition for UIM conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpg,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// PDF rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfMode {
    Vector,
    Raster,
}

impl PdfMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfMode::Vector => "vector",
            PdfMode::Raster => "raster",
        }
    }
}

/// Writing orientation hint for handwriting recognition.
///
/// Only meaningful, and only accepted, for Japanese content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingOrientation {
    Horizontal,
    Vertical,
    Auto,
}

impl WritingOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingOrientation::Horizontal => "horizontal",
            WritingOrientation::Vertical => "vertical",
            WritingOrientation::Auto => "auto",
        }
    }
}

pub(crate) mod wire {
    use super::*;

    /// `text_direction` is permitted only for `ja_JP`.
    pub fn check_text_direction(
        locale: &LocaleCode,
        text_direction: Option<WritingOrientation>,
    ) -> ServiceResult<()> {
        if text_direction.is_some() && locale.as_str() != "ja_JP" {
            return Err(ServiceError::validation(format!(
                "text direction is only supported for ja_JP, not {}",
                locale
            )));
        }
        Ok(())
    }

    pub fn enrich(
        base: &Url,
        segments: &[&str],
        uim: Vec<u8>,
        locale: &LocaleCode,
        text_direction: Option<WritingOrientation>,
    ) -> ServiceResult<RequestSpec> {
        check_text_direction(locale, text_direction)?;
        let url = crate::transport::join_url(base, segments)?;
        Ok(RequestSpec::post(url)
            .param("locale", locale.as_str())
            .opt_param(
                "textDirection",
                text_direction.map(|d| d.as_str().to_string()),
            )
            .bytes(uim, UIM_CONTENT_TYPE))
    }

    pub fn export(
        base: &Url,
        uim: Vec<u8>,
        format: ExportFormat,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["conversion", "export-uim", ""])?;
        Ok(RequestSpec::post(url)
            .param("format", format.as_str())
            .bytes(uim, UIM_CONTENT_TYPE))
    }

    pub fn to_pdf(base: &Url, uim: Vec<u8>, mode: PdfMode) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["conversion", "uim-to-pdf", ""])?;
        Ok(RequestSpec::post(url)
            .param("mode", mode.as_str())
            .bytes(uim, UIM_CONTENT_TYPE))
    }
}

/// Async ink client.
#[derive(Clone)]
pub struct InkClient {
    pub(crate) base: ClientBase,
}

impl InkClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: ClientBase::new(config)?,
        })
    }

    pub fn core(&self) -> &ClientBase {
        &self.base
    }

    pub fn core_mut(&mut self) -> &mut ClientBase {
        &mut self.base
    }

    async fn bytes(&self, spec: RequestSpec) -> ServiceResult<Vec<u8>> {
        self.base
            .transport
            .execute_bytes(spec, self.base.auth()?, CallOptions::default())
            .await
    }

    /// Enrich a UIM stream with named-entity links.
    pub async fn perform_ner(&self, uim: Vec<u8>, locale: &LocaleCode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ner", "enrich-uim", ""],
            uim,
            locale,
            None,
        )?)
        .await
    }

    /// Enrich a UIM stream with handwriting-recognition results.
    pub async fn perform_hwr(
        &self,
        uim: Vec<u8>,
        locale: &LocaleCode,
        text_direction: Option<WritingOrientation>,
    ) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ink-to-text", "enrich-uim", ""],
            uim,
            locale,
            text_direction,
        )?)
        .await
    }

    /// Recognize a UIM stream and return plain text.
    pub async fn perform_ink_to_text_plain(
        &self,
        uim: Vec<u8>,
        locale: &LocaleCode,
        text_direction: Option<WritingOrientation>,
    ) -> ServiceResult<String> {
        let spec = wire::enrich(
            &self.base.base,
            &["ink-to-text", "uim-to-text", ""],
            uim,
            locale,
            text_direction,
        )?;
        self.base
            .transport
            .execute_text(spec, self.base.auth()?, CallOptions::default())
            .await
    }

    /// Enrich a UIM stream with math recognition.
    pub async fn perform_math(&self, uim: Vec<u8>, locale: &LocaleCode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ink-to-math", "enrich-uim", ""],
            uim,
            locale,
            None,
        )?)
        .await
    }

    /// Run the full Ink-to-X pipeline over a UIM stream.
    pub async fn perform_ink_to_x(
        &self,
        uim: Vec<u8>,
        locale: &LocaleCode,
    ) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ink-to-x", "enrich-uim", ""],
            uim,
            locale,
            None,
        )?)
        .await
    }

    /// Export a UIM stream as PNG, JPG, SVG or PDF.
    pub async fn export_uim(&self, uim: Vec<u8>, format: ExportFormat) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::export(&self.base.base, uim, format)?).await
    }

    /// Convert a UIM stream to PDF (vector or raster).
    pub async fn uim_to_pdf(&self, uim: Vec<u8>, mode: PdfMode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::to_pdf(&self.base.base, uim, mode)?).await
    }
}

/// Blocking ink client.
#[derive(Clone)]
pub struct BlockingInkClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingInkClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: BlockingClientBase::new(config)?,
        })
    }

    pub fn core(&self) -> &BlockingClientBase {
        &self.base
    }

    pub fn core_mut(&mut self) -> &mut BlockingClientBase {
        &mut self.base
    }

    fn bytes(&self, spec: RequestSpec) -> ServiceResult<Vec<u8>> {
        self.base
            .transport
            .execute_bytes(spec, self.base.auth()?, CallOptions::default())
    }

    pub fn perform_ner(&self, uim: Vec<u8>, locale: &LocaleCode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ner", "enrich-uim", ""],
            uim,
            locale,
            None,
        )?)
    }

    pub fn perform_hwr(
        &self,
        uim: Vec<u8>,
        locale: &LocaleCode,
        text_direction: Option<WritingOrientation>,
    ) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ink-to-text", "enrich-uim", ""],
            uim,
            locale,
            text_direction,
        )?)
    }

    pub fn perform_ink_to_text_plain(
        &self,
        uim: Vec<u8>,
        locale: &LocaleCode,
        text_direction: Option<WritingOrientation>,
    ) -> ServiceResult<String> {
        let spec = wire::enrich(
            &self.base.base,
            &["ink-to-text", "uim-to-text", ""],
            uim,
            locale,
            text_direction,
        )?;
        self.base
            .transport
            .execute_text(spec, self.base.auth()?, CallOptions::default())
    }

    pub fn perform_math(&self, uim: Vec<u8>, locale: &LocaleCode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ink-to-math", "enrich-uim", ""],
            uim,
            locale,
            None,
        )?)
    }

    pub fn perform_ink_to_x(&self, uim: Vec<u8>, locale: &LocaleCode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::enrich(
            &self.base.base,
            &["ink-to-x", "enrich-uim", ""],
            uim,
            locale,
            None,
        )?)
    }

    pub fn export_uim(&self, uim: Vec<u8>, format: ExportFormat) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::export(&self.base.base, uim, format)?)
    }

    pub fn uim_to_pdf(&self, uim: Vec<u8>, mode: PdfMode) -> ServiceResult<Vec<u8>> {
        self.bytes(wire::to_pdf(&self.base.base, uim, mode)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_direction_is_japanese_only() {
        assert!(wire::check_text_direction(
            &LocaleCode::ja_jp(),
            Some(WritingOrientation::Vertical)
        )
        .is_ok());
        assert!(wire::check_text_direction(&LocaleCode::ja_jp(), None).is_ok());
        assert!(wire::check_text_direction(&LocaleCode::en_us(), None).is_ok());
        let err = wire::check_text_direction(
            &LocaleCode::en_us(),
            Some(WritingOrientation::Horizontal),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[test]
    fn enrich_spec_shape() {
        let base = Url::parse("https://ink.example.com/ink/v1").unwrap();
        let spec = wire::enrich(
            &base,
            &["ner", "enrich-uim", ""],
            vec![0x55, 0x49, 0x4d],
            &LocaleCode::en_us(),
            None,
        )
        .unwrap();
        assert!(spec.url.path().ends_with("/ner/enrich-uim/"));
        assert!(matches!(
            spec.body,
            crate::transport::RequestBody::Bytes { .. }
        ));
    }
}
