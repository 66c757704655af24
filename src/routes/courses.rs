// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course catalog routes.
//!
//! Listing needs an active subscription (or admin); everything else is
//! admin-only. The session middleware is applied in routes/mod.rs.

use crate::db::new_document_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::{require_roles, require_subscriber, ADMIN_ONLY};
use crate::models::{Course, CourseSummary, Lecture, MediaKind};
use crate::routes::extract::{JsonBody, MultipartBody};
use crate::routes::form::{FormData, UPLOAD_BODY_LIMIT};
use crate::routes::MessageResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    let admin = || middleware::from_fn_with_state(ADMIN_ONLY, require_roles);

    Router::new()
        .route(
            "/api/courses",
            get(list_courses)
                .route_layer(middleware::from_fn(require_subscriber))
                .merge(
                    axum::routing::post(create_course)
                        .route_layer(admin())
                        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
                ),
        )
        .route(
            "/api/courses/{id}",
            get(get_lectures)
                .put(update_course)
                .delete(remove_course)
                .post(add_lecture)
                .route_layer(admin())
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CoursesResponse {
    pub success: bool,
    pub message: String,
    pub courses: Vec<CourseSummary>,
}

#[derive(Serialize)]
pub struct CourseResponse {
    pub success: bool,
    pub message: String,
    pub course: Course,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LecturesResponse {
    pub success: bool,
    pub message: String,
    pub lectures: Vec<Lecture>,
}

fn not_found() -> AppError {
    AppError::NotFound("Course doesn't exist!".to_string())
}

/// All courses, without lecture bodies.
async fn list_courses(State(state): State<Arc<AppState>>) -> Result<Json<CoursesResponse>> {
    let courses = state.db.list_courses().await?;

    Ok(Json(CoursesResponse {
        success: true,
        message: "All courses".to_string(),
        courses: courses.into_iter().map(CourseSummary::from).collect(),
    }))
}

async fn get_lectures(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LecturesResponse>> {
    let course = state.db.get_course(&id).await?.ok_or_else(not_found)?;

    Ok(Json(LecturesResponse {
        success: true,
        message: "Course lectures fetched successfully".to_string(),
        lectures: course.lectures,
    }))
}

/// Create a course (multipart: `title`, `description`, `category`,
/// `createdBy`, optional `thumbnail`).
///
/// The thumbnail is uploaded before anything is written, so the course is
/// stored once with its final media reference.
async fn create_course(
    State(state): State<Arc<AppState>>,
    MultipartBody(multipart): MultipartBody,
) -> Result<Json<CourseResponse>> {
    let mut form = FormData::read(multipart, "thumbnail").await?;

    let (Some(title), Some(description), Some(category), Some(created_by)) = (
        form.text("title"),
        form.text("description"),
        form.text("category"),
        form.text("createdBy"),
    ) else {
        return Err(AppError::Validation("All fields are required!".to_string()));
    };

    let now = now_rfc3339();
    let mut course = Course {
        id: new_document_id()?,
        title,
        description,
        category,
        thumbnail: None,
        lectures: Vec::new(),
        number_of_lectures: 0,
        created_by,
        created_at: now.clone(),
        updated_at: now,
    };
    course.normalize();
    course.validate()?;

    if let Some(file) = form.take_file() {
        course.thumbnail = Some(state.media.upload(file, MediaKind::Image, None).await?);
    }

    if let Err(e) = state.db.save_course(&course).await {
        if let Some(thumbnail) = &course.thumbnail {
            state
                .media
                .destroy_best_effort(&thumbnail.public_id, MediaKind::Image)
                .await;
        }
        return Err(e);
    }

    tracing::info!(course_id = %course.id, title = %course.title, "Course created");
    Ok(Json(CourseResponse {
        success: true,
        message: "Course created successfully".to_string(),
        course,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_by: Option<String>,
}

async fn update_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateCourseRequest>,
) -> Result<Json<CourseResponse>> {
    let mut course = state.db.get_course(&id).await?.ok_or_else(not_found)?;

    if let Some(title) = req.title {
        course.title = title;
    }
    if let Some(description) = req.description {
        course.description = description;
    }
    if let Some(category) = req.category {
        course.category = category;
    }
    if let Some(created_by) = req.created_by {
        course.created_by = created_by;
    }
    course.normalize();
    course.validate()?;

    course.updated_at = now_rfc3339();
    state.db.save_course(&course).await?;

    Ok(Json(CourseResponse {
        success: true,
        message: "Course updated successfully".to_string(),
        course,
    }))
}

/// Delete a course and its media. Deleting an unknown ID succeeds.
async fn remove_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let Some(course) = state.db.get_course(&id).await? else {
        tracing::debug!(course_id = %id, "Delete of absent course");
        return Ok(MessageResponse::new("Course deleted successfully"));
    };

    state.db.delete_course(&id).await?;

    let assets = course.media_assets();
    join_all(
        assets
            .iter()
            .map(|(kind, public_id)| state.media.destroy_best_effort(public_id, *kind)),
    )
    .await;

    tracing::info!(course_id = %id, assets = assets.len(), "Course deleted");
    Ok(MessageResponse::new("Course deleted successfully"))
}

/// Append a lecture (multipart: `title`, `description`, optional `lecture`).
async fn add_lecture(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    MultipartBody(multipart): MultipartBody,
) -> Result<Json<LecturesResponse>> {
    let mut form = FormData::read(multipart, "lecture").await?;

    let (Some(title), Some(description)) = (form.text("title"), form.text("description"))
    else {
        return Err(AppError::Validation("All fields are required!".to_string()));
    };

    let mut course = state.db.get_course(&id).await?.ok_or_else(not_found)?;

    let mut lecture = Lecture {
        id: new_document_id()?,
        title,
        description,
        lecture: None,
    };
    lecture.validate()?;

    if let Some(file) = form.take_file() {
        lecture.lecture = Some(state.media.upload(file, MediaKind::Video, None).await?);
    }

    course.push_lecture(lecture);
    course.updated_at = now_rfc3339();

    if let Err(e) = state.db.save_course(&course).await {
        if let Some(video) = course.lectures.last().and_then(|l| l.lecture.as_ref()) {
            state
                .media
                .destroy_best_effort(&video.public_id, MediaKind::Video)
                .await;
        }
        return Err(e);
    }

    tracing::info!(
        course_id = %course.id,
        lectures = course.number_of_lectures,
        "Lecture added"
    );
    Ok(Json(LecturesResponse {
        success: true,
        message: "Lecture added successfully".to_string(),
        lectures: course.lectures,
    }))
}
