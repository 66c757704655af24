// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Multipart form collection.

use crate::error::{AppError, Result};
use crate::services::Upload;
use axum::extract::Multipart;
use std::collections::HashMap;

/// Largest request body accepted on upload routes.
pub const UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// Text fields plus at most one file from a multipart body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    file: Option<Upload>,
}

impl FormData {
    /// Read every field, keeping the file sent under `file_field`.
    ///
    /// Empty file parts (a form submitted with no file chosen) are ignored.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid form data: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == file_field {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file upload: {}", e)))?;

                if !bytes.is_empty() {
                    form.file = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid form field: {}", e)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Trimmed text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Field exactly as sent, or empty if absent.
    pub fn raw(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self) -> Option<Upload> {
        self.file.take()
    }
}
