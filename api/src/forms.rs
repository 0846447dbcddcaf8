//! Reading and validating submitted forms.

use crate::{AppError, context::CSRF_FORM_FIELD};
use axum::extract::Multipart;
use entity::group;
use file_format::FileFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw fields of the create/edit post form.
#[derive(Clone, Debug, Default)]
pub struct PostFormData {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<UploadedImage>,
    pub csrf_token: Option<String>,
}

/// A post form that passed validation.
#[derive(Clone, Debug)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: Option<UploadedImage>,
}

/// Field name to messages, as shown next to the inputs.
pub type FormErrors = BTreeMap<&'static str, Vec<String>>;

impl PostFormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut data = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if !file_name.is_empty() || !bytes.is_empty() {
                        data.image = Some(UploadedImage {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                "text" | "group" | CSRF_FORM_FIELD => {
                    let value = field.text().await?;
                    if value.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(AppError::BadRequest(format!("field {name} is too large")));
                    }
                    match name.as_str() {
                        "text" => data.text = value,
                        "group" => data.group = Some(value),
                        _ => data.csrf_token = Some(value),
                    }
                }
                _ => {}
            }
        }

        Ok(data)
    }

    pub fn validate(self, groups: &[group::Model]) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();

        let text = self.text.trim().to_owned();
        if text.is_empty() {
            errors.entry("text").or_default().push("This field is required.".to_owned());
        }

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(id) if groups.iter().any(|group| group.id == id) => Some(id),
                _ => {
                    errors.entry("group").or_default().push(
                        "Select a valid choice. That choice is not one of the available choices."
                            .to_owned(),
                    );
                    None
                }
            },
        };

        if let Some(image) = &self.image {
            if let Err(message) = check_image(image) {
                errors.entry("image").or_default().push(message.to_owned());
            }
        }

        if errors.is_empty() {
            Ok(ValidPost {
                text,
                group_id,
                image: self.image,
            })
        } else {
            Err(errors)
        }
    }
}

/// Values echoed back into the form when it is re-rendered.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PostFormValues {
    pub text: String,
    pub group_id: Option<i32>,
}

impl From<&PostFormData> for PostFormValues {
    fn from(data: &PostFormData) -> Self {
        Self {
            text: data.text.clone(),
            group_id: data.group.as_deref().and_then(|raw| raw.trim().parse().ok()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommentFormData {
    #[serde(default)]
    pub text: String,
    pub csrfmiddlewaretoken: Option<String>,
}

impl CommentFormData {
    /// The trimmed comment text, or `None` when blank.
    pub fn text(&self) -> Option<&str> {
        Some(self.text.trim()).filter(|text| !text.is_empty())
    }
}

/// Body of forms whose only field is the anti-forgery token.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CsrfFormData {
    pub csrfmiddlewaretoken: Option<String>,
}

fn check_image(image: &UploadedImage) -> Result<(), &'static str> {
    const INVALID: &str =
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

    if image.bytes.is_empty() {
        return Err("The submitted file is empty.");
    }
    if let Some(content_type) = &image.content_type {
        if !content_type.starts_with("image/") {
            return Err(INVALID);
        }
    }
    match sniff_image_format(&image.bytes) {
        Some(_) => Ok(()),
        None => Err(INVALID),
    }
}

/// The accepted image format an upload's contents belong to, if any.
pub fn sniff_image_format(bytes: &[u8]) -> Option<FileFormat> {
    match FileFormat::from_bytes(bytes) {
        format @ (FileFormat::GraphicsInterchangeFormat
        | FileFormat::PortableNetworkGraphics
        | FileFormat::JointPhotographicExpertsGroup
        | FileFormat::Webp) => Some(format),
        other => {
            tracing::debug!(format = %other, "rejecting upload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

    fn group(id: i32) -> group::Model {
        group::Model {
            id,
            title: "Test group".to_owned(),
            slug: "test-slug".to_owned(),
            description: String::new(),
        }
    }

    fn form(text: &str, group: Option<&str>) -> PostFormData {
        PostFormData {
            text: text.to_owned(),
            group: group.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn text_is_required() {
        let errors = form("   ", None).validate(&[]).unwrap_err();
        assert_eq!(errors["text"], vec!["This field is required.".to_owned()]);
    }

    #[test]
    fn group_must_exist() {
        let groups = [group(1)];
        assert_eq!(form("Text", Some("1")).validate(&groups).unwrap().group_id, Some(1));
        assert_eq!(form("Text", Some("")).validate(&groups).unwrap().group_id, None);
        assert!(form("Text", Some("2")).validate(&groups).unwrap_err().contains_key("group"));
        assert!(form("Text", Some("x")).validate(&groups).unwrap_err().contains_key("group"));
    }

    #[test]
    fn images_are_checked() {
        let mut data = form("Text", None);
        data.image = Some(UploadedImage {
            file_name: "small.gif".to_owned(),
            content_type: Some("image/gif".to_owned()),
            bytes: SMALL_GIF.to_vec(),
        });
        assert!(data.clone().validate(&[]).is_ok());

        data.image = Some(UploadedImage {
            file_name: "notes.txt".to_owned(),
            content_type: Some("text/plain".to_owned()),
            bytes: b"hello".to_vec(),
        });
        assert!(data.validate(&[]).unwrap_err().contains_key("image"));
    }

    #[test]
    fn sniffing() {
        assert_eq!(
            sniff_image_format(SMALL_GIF),
            Some(FileFormat::GraphicsInterchangeFormat)
        );
        assert_eq!(
            sniff_image_format(b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR"),
            Some(FileFormat::PortableNetworkGraphics)
        );
        assert_eq!(
            sniff_image_format(b"\xFF\xD8\xFF\xE0\0\x10JFIF\0"),
            Some(FileFormat::JointPhotographicExpertsGroup)
        );
        assert_eq!(sniff_image_format(b"plain text"), None);
        assert_eq!(sniff_image_format(b"%PDF-1.7\n"), None);
    }

    #[test]
    fn blank_comments_are_rejected() {
        let comment = CommentFormData {
            text: "  \n".to_owned(),
            csrfmiddlewaretoken: None,
        };
        assert_eq!(comment.text(), None);

        let comment = CommentFormData {
            text: " Comment ".to_owned(),
            csrfmiddlewaretoken: None,
        };
        assert_eq!(comment.text(), Some("Comment"));
    }
}
