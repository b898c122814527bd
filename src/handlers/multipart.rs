use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::services::ImageUpload;

/// A drained multipart body: text parts by name, file parts in order
#[derive(Debug, Default)]
pub struct FormParts {
    pub text: HashMap<String, String>,
    pub files: Vec<(String, ImageUpload)>,
}

impl FormParts {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut parts = FormParts::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await?;

            match file_name {
                // Browsers submit an empty part for an untouched file input
                Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
                Some(file_name) => parts.files.push((
                    name,
                    ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    },
                )),
                None => {
                    let value = String::from_utf8(bytes.to_vec())
                        .map_err(|_| ApiError::bad_request(format!("Form field '{}' is not valid UTF-8", name)))?;
                    parts.text.insert(name, value);
                }
            }
        }

        Ok(parts)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.text.remove(name)
    }

    /// File parts submitted under `name`
    pub fn take_files(&mut self, name: &str) -> Vec<ImageUpload> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }
}
