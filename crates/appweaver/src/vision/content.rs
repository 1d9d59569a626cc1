//! Assemble the multi-part user message for a generation request.
//!
//! [`ContentBuilder::build`] always emits one text block (the prompt plus
//! attachment notes) followed by one image block per image attachment.
//! Inline images over the byte ceiling are pushed through
//! [`normalize`](super::normalize::normalize); images that cannot be decoded
//! or shrunk are dropped with a warning so one bad upload never sinks the
//! whole request.

use super::normalize::{DEFAULT_MAX_IMAGE_BYTES, normalize, validate_size};
use crate::ImageError;
use crate::conversation::{ContentBlock, ImageSource};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A user-uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Base64 payload; a `data:` URL prefix is tolerated.
    #[serde(default)]
    pub base64_data: String,
    /// Where the file is publicly hosted, if it was uploaded somewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

impl Attachment {
    pub fn inline(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        base64_data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            base64_data: base64_data.into(),
            remote_url: None,
        }
    }

    /// Wrap raw file bytes, inferring the MIME type from `name`.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let mut attachment = Self::inline(name, "", BASE64.encode(bytes));
        attachment.mime_type = if attachment.is_image() {
            attachment.media_type().to_string()
        } else {
            "application/octet-stream".to_string()
        };
        attachment
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Whether this attachment takes the vision path.
    pub fn is_image(&self) -> bool {
        self.mime_type.to_ascii_lowercase().starts_with("image/")
            || IMAGE_EXTENSIONS.contains(&self.extension().as_str())
    }

    /// Media type for the image block. An `image/*` MIME type wins over
    /// the file name; JPEG unless one of them says PNG, GIF or WebP.
    pub fn media_type(&self) -> &'static str {
        let mime = self.mime_type.to_ascii_lowercase();
        let kind = match mime.strip_prefix("image/") {
            Some(subtype) => subtype.to_string(),
            None => self.extension(),
        };
        match kind.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "image/jpeg",
        }
    }

    /// The base64 payload without any `data:...;base64,` prefix.
    pub fn payload(&self) -> &str {
        let data = self.base64_data.trim();
        match data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        }
    }

    /// Decode the inline payload.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>, ImageError> {
        Ok(BASE64.decode(self.payload())?)
    }
}

/// Builds the content blocks for the initial user turn.
#[derive(Debug, Clone)]
pub struct ContentBuilder {
    max_image_bytes: usize,
}

impl Default for ContentBuilder {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-image byte ceiling (decoded bytes).
    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Build the text block and image blocks for `prompt` and `attachments`.
    pub fn build(&self, prompt: &str, attachments: &[Attachment]) -> Vec<ContentBlock> {
        let (images, others): (Vec<&Attachment>, Vec<&Attachment>) =
            attachments.iter().partition(|a| a.is_image());

        let mut text = prompt.to_string();

        if !others.is_empty() {
            let names: Vec<&str> = others.iter().map(|a| a.name.as_str()).collect();
            text.push_str(&format!("\n\nAttached files: {}", names.join(", ")));
        }

        let hosted: Vec<(&str, &str)> = images
            .iter()
            .filter_map(|a| a.remote_url.as_deref().map(|url| (a.name.as_str(), url)))
            .collect();
        if !hosted.is_empty() {
            text.push_str(&hosted_image_instructions(&hosted));
        }

        let mut blocks = vec![ContentBlock::Text(text)];
        for image in images {
            let source = match &image.remote_url {
                Some(url) => ImageSource::Url(url.clone()),
                None => ImageSource::Base64 {
                    media_type: image.media_type().to_string(),
                    data: image.payload().to_string(),
                },
            };
            blocks.push(ContentBlock::Image(source));
        }

        enforce_image_limits(blocks, self.max_image_bytes)
    }
}

/// Prompt section telling the model to reference hosted images by URL.
fn hosted_image_instructions(hosted: &[(&str, &str)]) -> String {
    let mut out = String::from(
        "\n\nIMPORTANT: The user uploaded images that are hosted at the URLs below. \
         Wherever an uploaded image belongs in the app, embed it with an \
         <img src=\"...\"> tag using the exact URL. Do NOT inline image data \
         and do NOT use base64 data URIs.\n",
    );
    for (i, (name, url)) in hosted.iter().enumerate() {
        out.push_str(&format!("{}. {name}: {url}\n", i + 1));
    }
    out
}

/// Check an upload the content builder would otherwise drop, and shrink an
/// oversized image once so later builds pass it through untouched.
///
/// Fails for an inline image with no data, a payload that is not base64,
/// or an image over `max_bytes` that cannot be shrunk below it. Hosted
/// images and empty non-image files pass as-is. Decoding and re-encoding
/// are CPU-bound; async callers should run this on a blocking thread.
pub fn prepare_attachment(
    attachment: Attachment,
    max_bytes: usize,
) -> Result<Attachment, ImageError> {
    if attachment.remote_url.is_some() {
        return Ok(attachment);
    }
    if attachment.payload().is_empty() {
        return if attachment.is_image() {
            Err(ImageError::Empty)
        } else {
            Ok(attachment)
        };
    }
    let bytes = attachment.decoded_bytes()?;
    if !attachment.is_image() || validate_size(&bytes, max_bytes) {
        return Ok(attachment);
    }
    let out = normalize(&bytes, max_bytes)?;
    debug!(
        "Normalized attachment {}: {} -> {} bytes",
        attachment.name,
        bytes.len(),
        out.bytes.len()
    );
    Ok(Attachment {
        mime_type: "image/jpeg".to_string(),
        base64_data: BASE64.encode(&out.bytes),
        ..attachment
    })
}

/// Check every inline image block against `max_bytes`, normalizing
/// oversized ones and dropping any that cannot be decoded or shrunk.
pub fn enforce_image_limits(blocks: Vec<ContentBlock>, max_bytes: usize) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Image(ImageSource::Base64 { media_type, data }) => {
                fit_inline_image(media_type, data, max_bytes).map(ContentBlock::Image)
            }
            other => Some(other),
        })
        .collect()
}

fn fit_inline_image(media_type: String, data: String, max_bytes: usize) -> Option<ImageSource> {
    if data.is_empty() {
        warn!("Dropping image attachment: no data");
        return None;
    }
    let bytes = match BASE64.decode(data.as_bytes()) {
        Ok(b) => b,
        Err(e) => {
            warn!("Dropping image attachment: invalid base64 ({e})");
            return None;
        }
    };
    if validate_size(&bytes, max_bytes) {
        return Some(ImageSource::Base64 { media_type, data });
    }
    match normalize(&bytes, max_bytes) {
        Ok(out) => {
            debug!(
                "Normalized image: {} -> {} bytes ({}x{}, q{})",
                bytes.len(),
                out.bytes.len(),
                out.width,
                out.height,
                out.quality
            );
            Some(ImageSource::Base64 {
                media_type: "image/jpeg".to_string(),
                data: BASE64.encode(&out.bytes),
            })
        }
        Err(e) => {
            warn!("Dropping image attachment ({} bytes): {e}", bytes.len());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::normalize::test_images::{gradient_png, noise_png};
    use super::*;

    fn png_attachment(name: &str, bytes: &[u8]) -> Attachment {
        Attachment::inline(name, "image/png", BASE64.encode(bytes))
    }

    #[test]
    fn from_bytes_infers_mime_from_name() {
        let png = Attachment::from_bytes("Shot.PNG", b"\x89PNG");
        assert_eq!(png.mime_type, "image/png");
        assert_eq!(png.decoded_bytes().unwrap(), b"\x89PNG");
        let notes = Attachment::from_bytes("notes.txt", b"hello");
        assert_eq!(notes.mime_type, "application/octet-stream");
        assert!(!notes.is_image());
    }

    #[test]
    fn prompt_only_yields_single_text_block() {
        let blocks = ContentBuilder::new().build("a countdown timer", &[]);
        assert_eq!(blocks, vec![ContentBlock::Text("a countdown timer".into())]);
    }

    #[test]
    fn non_image_attachments_are_referenced_by_name() {
        let attachments = vec![
            Attachment::inline("notes.txt", "text/plain", BASE64.encode("hi")),
            Attachment::inline("spec.pdf", "application/pdf", ""),
        ];
        let blocks = ContentBuilder::new().build("build it", &attachments);
        assert_eq!(blocks.len(), 1);
        let ContentBlock::Text(text) = &blocks[0] else {
            panic!("first block must be text");
        };
        assert!(text.contains("Attached files: notes.txt, spec.pdf"));
    }

    #[test]
    fn media_type_inference() {
        let a = |name: &str, mime: &str| Attachment::inline(name, mime, "");
        assert_eq!(a("x.png", "").media_type(), "image/png");
        assert_eq!(a("x", "image/gif").media_type(), "image/gif");
        assert_eq!(a("x.WEBP", "application/octet-stream").media_type(), "image/webp");
        assert_eq!(a("photo.heic", "image/heic").media_type(), "image/jpeg");
        assert_eq!(a("x.jpg", "").media_type(), "image/jpeg");
        assert!(a("x.jpeg", "").is_image());
        assert!(!a("x.txt", "text/plain").is_image());
    }

    #[test]
    fn small_inline_image_passes_through() {
        let png = gradient_png(32, 32);
        let blocks = ContentBuilder::new().build("logo", &[png_attachment("logo.png", &png)]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[1],
            ContentBlock::Image(ImageSource::Base64 {
                media_type: "image/png".into(),
                data: BASE64.encode(&png),
            })
        );
    }

    #[test]
    fn remote_url_replaces_inline_data_and_adds_instructions() {
        let png = gradient_png(16, 16);
        let attachment =
            png_attachment("hero.png", &png).with_remote_url("https://cdn.example.com/hero.png");
        let blocks = ContentBuilder::new().build("landing page", &[attachment]);

        let ContentBlock::Text(text) = &blocks[0] else {
            panic!("first block must be text");
        };
        assert!(text.contains("<img src="));
        assert!(text.contains("1. hero.png: https://cdn.example.com/hero.png"));
        assert_eq!(
            blocks[1],
            ContentBlock::Image(ImageSource::Url(
                "https://cdn.example.com/hero.png".into()
            ))
        );
    }

    #[test]
    fn oversized_image_is_normalized_to_jpeg() {
        let png = noise_png(400, 300);
        let ceiling = png.len() / 2;
        let blocks = ContentBuilder::new()
            .with_max_image_bytes(ceiling)
            .build("gallery", &[png_attachment("big.png", &png)]);

        assert_eq!(blocks.len(), 2);
        let ContentBlock::Image(ImageSource::Base64 { media_type, data }) = &blocks[1] else {
            panic!("expected inline image");
        };
        assert_eq!(media_type, "image/jpeg");
        assert!(BASE64.decode(data).unwrap().len() <= ceiling);
    }

    #[test]
    fn uncompressible_image_is_dropped_not_fatal() {
        let png = noise_png(64, 64);
        let blocks = ContentBuilder::new()
            .with_max_image_bytes(50)
            .build("gallery", &[png_attachment("noise.png", &png)]);
        assert_eq!(blocks.len(), 1, "only the text block survives");
    }

    #[test]
    fn invalid_base64_is_dropped() {
        let bad = Attachment::inline("broken.png", "image/png", "!!!not base64!!!");
        let blocks = ContentBuilder::new().build("x", &[bad]);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn empty_inline_image_is_dropped() {
        let empty = Attachment::inline("logo.png", "image/png", "");
        let blocks = ContentBuilder::new().build("x", &[empty]);
        assert_eq!(blocks, vec![ContentBlock::Text("x".into())]);
    }

    #[test]
    fn prepare_attachment_flags_what_build_would_drop() {
        let ok = png_attachment("small.png", &gradient_png(16, 16));
        assert_eq!(
            prepare_attachment(ok.clone(), DEFAULT_MAX_IMAGE_BYTES).unwrap(),
            ok
        );

        let hosted = Attachment::inline("hero.png", "image/png", "")
            .with_remote_url("https://cdn.example.com/hero.png");
        assert!(prepare_attachment(hosted, 10).is_ok());

        let notes = Attachment::inline("spec.pdf", "application/pdf", "");
        assert!(prepare_attachment(notes, 10).is_ok());

        let empty = Attachment::inline("logo.png", "image/png", "");
        assert!(matches!(
            prepare_attachment(empty, DEFAULT_MAX_IMAGE_BYTES),
            Err(ImageError::Empty)
        ));

        let bad = Attachment::inline("broken.png", "image/png", "!!!not base64!!!");
        assert!(matches!(
            prepare_attachment(bad, DEFAULT_MAX_IMAGE_BYTES),
            Err(ImageError::InvalidBase64(_))
        ));

        let noise = png_attachment("noise.png", &noise_png(64, 64));
        assert!(matches!(
            prepare_attachment(noise, 50),
            Err(ImageError::Compression { .. })
        ));
    }

    #[test]
    fn prepared_oversized_image_passes_build_unchanged() {
        let png = noise_png(400, 300);
        let ceiling = png.len() / 2;
        let prepared = prepare_attachment(png_attachment("big.png", &png), ceiling).unwrap();
        assert_eq!(prepared.name, "big.png");
        assert_eq!(prepared.media_type(), "image/jpeg");
        assert!(prepared.decoded_bytes().unwrap().len() <= ceiling);

        let blocks = ContentBuilder::new()
            .with_max_image_bytes(ceiling)
            .build("gallery", std::slice::from_ref(&prepared));
        assert_eq!(
            blocks[1],
            ContentBlock::Image(ImageSource::Base64 {
                media_type: "image/jpeg".into(),
                data: prepared.base64_data.clone(),
            })
        );
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let a = Attachment::inline("a.png", "image/png", "data:image/png;base64,AAAA");
        assert_eq!(a.payload(), "AAAA");
        assert_eq!(a.decoded_bytes().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn attachment_deserializes_from_camel_case() {
        let a: Attachment = serde_json::from_str(
            r#"{"name":"a.png","mimeType":"image/png","base64Data":"AAAA","remoteUrl":"https://x/a.png"}"#,
        )
        .unwrap();
        assert_eq!(a.mime_type, "image/png");
        assert_eq!(a.remote_url.as_deref(), Some("https://x/a.png"));
    }
}
