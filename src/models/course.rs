// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course catalog model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::{MediaKind, MediaRef};

/// A lecture entry, owned by exactly one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: String,
    #[validate(length(min = 1, message = "Lecture title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Lecture description is required"))]
    pub description: String,
    /// Uploaded video, if any
    #[serde(default)]
    pub lecture: Option<MediaRef>,
}

/// Course record stored in Firestore (`courses/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Document ID
    pub id: String,
    #[validate(length(
        min = 3,
        max = 60,
        message = "Title should be between 3 and 60 characters"
    ))]
    pub title: String,
    #[validate(length(
        min = 3,
        max = 120,
        message = "Description should be between 3 and 120 characters"
    ))]
    pub description: String,
    #[validate(length(min = 1, message = "Please define category"))]
    pub category: String,
    #[serde(default)]
    pub thumbnail: Option<MediaRef>,
    #[serde(default)]
    #[validate(nested)]
    pub lectures: Vec<Lecture>,
    /// Always equal to `lectures.len()`
    #[serde(default)]
    pub number_of_lectures: u32,
    #[validate(length(min = 1, message = "Created by is required"))]
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Course {
    /// Append a lecture, keeping the derived count in sync.
    pub fn push_lecture(&mut self, lecture: Lecture) {
        self.lectures.push(lecture);
        self.number_of_lectures = self.lectures.len() as u32;
    }

    /// Trim user-supplied text fields in place.
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();
        self.created_by = self.created_by.trim().to_string();
    }

    /// All media assets referenced by this course.
    pub fn media_assets(&self) -> Vec<(MediaKind, String)> {
        self.thumbnail
            .iter()
            .map(|m| (MediaKind::Image, m.public_id.clone()))
            .chain(
                self.lectures
                    .iter()
                    .filter_map(|l| l.lecture.as_ref())
                    .map(|m| (MediaKind::Video, m.public_id.clone())),
            )
            .collect()
    }
}

/// Catalog listing entry: a course without its lecture bodies.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub thumbnail: Option<MediaRef>,
    pub number_of_lectures: u32,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Course> for CourseSummary {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            category: c.category,
            thumbnail: c.thumbnail,
            number_of_lectures: c.number_of_lectures,
            created_by: c.created_by,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
