//! Storage for uploaded post images.

use crate::forms::UploadedImage;
use std::path::Path;
use tokio::{fs, io::AsyncWriteExt};

/// Directory under the media root that post images are written to.
pub const POST_IMAGE_DIR: &str = "posts";

/// Longest stored image path, `posts/<name>`, the `posts.image` column holds.
pub const MAX_IMAGE_PATH_LEN: usize = 100;

const SUFFIX_LEN: usize = 7;
const MAX_NAME_LEN: usize = MAX_IMAGE_PATH_LEN - POST_IMAGE_DIR.len() - 1 - (SUFFIX_LEN + 1);
const MAX_EXTENSION_LEN: usize = 10;

/// Write an upload under `<media_root>/posts/` and return its path relative
/// to the media root. An existing file with the same name is never
/// overwritten; the new one gets a random suffix instead.
pub async fn save_post_image(media_root: &Path, image: &UploadedImage) -> std::io::Result<String> {
    let dir = media_root.join(POST_IMAGE_DIR);
    fs::create_dir_all(&dir).await?;

    let base = sanitize_file_name(&image.file_name);
    let mut name = base.clone();
    loop {
        let open = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(dir.join(&name))
            .await;
        match open {
            Ok(mut file) => {
                file.write_all(&image.bytes).await?;
                file.flush().await?;
                break;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                name = with_suffix(&base, &uuid::Uuid::new_v4().simple().to_string()[..SUFFIX_LEN]);
            }
            Err(err) => return Err(err),
        }
    }

    tracing::info!(file = %name, bytes = image.bytes.len(), "stored post image");
    Ok(format!("{POST_IMAGE_DIR}/{name}"))
}

/// Delete an image written by [`save_post_image`] whose post was never saved.
pub async fn discard_post_image(media_root: &Path, stored: &str) {
    if let Err(err) = fs::remove_file(media_root.join(stored)).await {
        tracing::warn!(file = stored, %err, "could not remove orphaned image");
    }
}

fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        truncate_file_name(cleaned)
    }
}

/// Shorten an ASCII name to [`MAX_NAME_LEN`], keeping a short extension.
fn truncate_file_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_owned();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= MAX_EXTENSION_LEN => {
            let keep = MAX_NAME_LEN - ext.len() - 1;
            format!("{}.{ext}", &stem[..keep.min(stem.len())])
        }
        _ => name[..MAX_NAME_LEN].to_owned(),
    }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{name}_{suffix}"),
    }
}
