use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;

use crate::error::ThumbnailError;

/// A request to fetch one book's icon
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailRequest {
    pub url: String,
    pub book_id: String,
}

/// A fetched icon, ready to be handed back to the table model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub book_id: String,
    pub url: String,
    /// PNG-encoded image bytes
    pub data: Vec<u8>,
}

/// Fetch an icon and scale it down to at most `size`x`size`
///
/// `http://` and `https://` URLs go over the network; `file://` URLs and
/// plain paths are read from disk.
pub async fn fetch_thumbnail(
    request: ThumbnailRequest,
    size: u32,
) -> Result<Thumbnail, ThumbnailError> {
    let raw = if request.url.starts_with("http://") || request.url.starts_with("https://") {
        reqwest::get(&request.url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    } else {
        let path = request.url.strip_prefix("file://").unwrap_or(&request.url);
        tokio::fs::read(path).await?
    };

    // Spawn blocking task for CPU-bound decoding
    let data = tokio::task::spawn_blocking(move || scale_thumbnail(&raw, size)).await??;

    tracing::debug!("📸 Fetched thumbnail for {} ({} bytes)", request.book_id, data.len());
    Ok(Thumbnail {
        book_id: request.book_id,
        url: request.url,
        data,
    })
}

/// Decode an icon and re-encode it as PNG, shrinking it if it is larger than `size`
pub fn scale_thumbnail(data: &[u8], size: u32) -> Result<Vec<u8>, ThumbnailError> {
    let img = image::load_from_memory(data)?;

    let img = if img.width() > size || img.height() > size {
        img.resize(size, size, FilterType::Lanczos3)
    } else {
        img
    };

    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, ImageFormat::Png)?;
    Ok(encoded.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_large_icons_are_shrunk() {
        let scaled = scale_thumbnail(&png(200, 100), 48).unwrap();
        let img = image::load_from_memory(&scaled).unwrap();

        assert_eq!(img.width(), 48);
        assert_eq!(img.height(), 24);
    }

    #[test]
    fn test_small_icons_keep_their_size() {
        let scaled = scale_thumbnail(&png(16, 16), 48).unwrap();
        let img = image::load_from_memory(&scaled).unwrap();

        assert_eq!((img.width(), img.height()), (16, 16));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result = scale_thumbnail(&[0x00, 0x01, 0x02], 48);
        assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    }

    #[test]
    fn test_fetch_from_local_file() {
        let path = std::env::temp_dir().join(format!("zim-catalog-icon-{}.png", std::process::id()));
        std::fs::write(&path, png(64, 64)).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let request = ThumbnailRequest {
            url: format!("file://{}", path.display()),
            book_id: "book1".to_string(),
        };
        let thumbnail = runtime.block_on(fetch_thumbnail(request.clone(), 32)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(thumbnail.book_id, "book1");
        assert_eq!(thumbnail.url, request.url);
        let img = image::load_from_memory(&thumbnail.data).unwrap();
        assert_eq!((img.width(), img.height()), (32, 32));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let request = ThumbnailRequest {
            url: "/definitely/not/here.png".to_string(),
            book_id: "book1".to_string(),
        };

        let result = runtime.block_on(fetch_thumbnail(request, 32));
        assert!(matches!(result, Err(ThumbnailError::Io(_))));
    }
}
