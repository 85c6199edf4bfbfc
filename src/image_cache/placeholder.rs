//! Fixed SVG placeholders served when no real image is available

use bytes::Bytes;

use super::key::ImageKind;
use super::response::{CacheStatus, ImageResponse};

pub const PLACEHOLDER_MEDIA_TYPE: &str = "image/svg+xml";

const CHANNEL_PLACEHOLDER: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="176" height="176" viewBox="0 0 176 176">"##,
    r##"<circle cx="88" cy="88" r="88" fill="#3f3f46"/>"##,
    r##"<circle cx="88" cy="68" r="30" fill="#a1a1aa"/>"##,
    r##"<path d="M34 146c8-30 30-44 54-44s46 14 54 44" fill="#a1a1aa"/>"##,
    r##"</svg>"##,
);

const VIDEO_PLACEHOLDER: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="480" height="270" viewBox="0 0 480 270">"##,
    r##"<rect width="480" height="270" fill="#27272a"/>"##,
    r##"<circle cx="240" cy="135" r="42" fill="#52525b"/>"##,
    r##"<path d="M226 112v46l38-23z" fill="#e4e4e7"/>"##,
    r##"</svg>"##,
);

/// Stateless source of placeholder responses
pub struct PlaceholderGenerator;

impl PlaceholderGenerator {
    pub fn svg(kind: ImageKind) -> &'static str {
        match kind {
            ImageKind::Channel => CHANNEL_PLACEHOLDER,
            ImageKind::Video => VIDEO_PLACEHOLDER,
        }
    }

    pub fn serve(kind: ImageKind) -> ImageResponse {
        ImageResponse::new(
            Bytes::from_static(Self::svg(kind).as_bytes()),
            PLACEHOLDER_MEDIA_TYPE,
            CacheStatus::Placeholder,
        )
    }
}
