// src/db/courses.rs

use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Row};
use utoipa::ToSchema;

use crate::models::{Course, CourseDetail, CourseSection, CourseVideo, SectionDetail};

const COURSE_COLUMNS: &str = "id, title, slug, description, thumbnail_url, instructor, level, price, \
     original_price, currency, is_published, is_deleted, deleted_at, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VideoInput {
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub duration_seconds: i32,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SectionInput {
    pub title: String,
    #[serde(default)]
    pub videos: Vec<VideoInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseInput {
    pub title: String,
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor: Option<String>,
    pub level: Option<String>,
    /// Minor units.
    pub price: i64,
    pub original_price: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
}

impl CourseInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.price < 0 {
            return Err("price must not be negative".into());
        }
        if self.original_price.is_some_and(|p| p < 0) {
            return Err("original_price must not be negative".into());
        }
        if self.slug().is_empty() {
            return Err("slug must contain at least one letter or digit".into());
        }
        for (i, section) in self.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                return Err(format!("section {} needs a title", i + 1));
            }
            for (j, video) in section.videos.iter().enumerate() {
                if video.title.trim().is_empty() || video.video_url.trim().is_empty() {
                    return Err(format!("section {} video {} needs a title and url", i + 1, j + 1));
                }
                if video.duration_seconds < 0 {
                    return Err(format!("section {} video {} has a negative duration", i + 1, j + 1));
                }
            }
        }
        Ok(())
    }

    pub fn slug(&self) -> String {
        super::slugify(self.slug.as_deref().unwrap_or(&self.title))
    }

    fn currency(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("INR")
            .to_ascii_uppercase()
    }
}

async fn insert_curriculum(
    conn: &mut PgConnection,
    course_id: i32,
    sections: &[SectionInput],
) -> Result<(), sqlx::Error> {
    for (s_pos, section) in sections.iter().enumerate() {
        let section_id: i32 = sqlx::query(
            "INSERT INTO course_sections (course_id, title, position) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(course_id)
        .bind(section.title.trim())
        .bind(s_pos as i32)
        .fetch_one(&mut *conn)
        .await?
        .get("id");

        for (v_pos, video) in section.videos.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO course_videos (section_id, title, video_url, duration_seconds, is_preview, position)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(section_id)
            .bind(video.title.trim())
            .bind(video.video_url.trim())
            .bind(video.duration_seconds)
            .bind(video.is_preview)
            .bind(v_pos as i32)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

pub async fn create_course(pool: &PgPool, input: &CourseInput) -> Result<i32, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let course_id: i32 = sqlx::query(
        r#"INSERT INTO courses
               (title, slug, description, thumbnail_url, instructor, level, price, original_price, currency, is_published)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           RETURNING id"#,
    )
    .bind(input.title.trim())
    .bind(input.slug())
    .bind(&input.description)
    .bind(&input.thumbnail_url)
    .bind(&input.instructor)
    .bind(&input.level)
    .bind(input.price)
    .bind(input.original_price)
    .bind(input.currency())
    .bind(input.is_published)
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    insert_curriculum(&mut tx, course_id, &input.sections).await?;
    tx.commit().await?;

    Ok(course_id)
}

/// Replaces fields and curriculum. Returns false for unknown or deleted courses.
///
/// Video progress rows reference videos, so replacing the curriculum resets
/// learner progress for that course.
pub async fn update_course(pool: &PgPool, course_id: i32, input: &CourseInput) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"UPDATE courses
           SET title = $1, slug = $2, description = $3, thumbnail_url = $4, instructor = $5, level = $6,
               price = $7, original_price = $8, currency = $9, is_published = $10, updated_at = NOW()
           WHERE id = $11 AND is_deleted = FALSE"#,
    )
    .bind(input.title.trim())
    .bind(input.slug())
    .bind(&input.description)
    .bind(&input.thumbnail_url)
    .bind(&input.instructor)
    .bind(&input.level)
    .bind(input.price)
    .bind(input.original_price)
    .bind(input.currency())
    .bind(input.is_published)
    .bind(course_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("DELETE FROM course_sections WHERE course_id = $1")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    insert_curriculum(&mut tx, course_id, &input.sections).await?;
    tx.commit().await?;

    Ok(true)
}

pub async fn list_courses(pool: &PgPool, published_only: bool) -> Result<Vec<Course>, sqlx::Error> {
    let sql = format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE is_deleted = FALSE AND (is_published OR NOT $1)
         ORDER BY created_at DESC"
    );
    sqlx::query_as::<_, Course>(&sql)
        .bind(published_only)
        .fetch_all(pool)
        .await
}

pub async fn get_course(pool: &PgPool, course_id: i32, published_only: bool) -> Result<Option<Course>, sqlx::Error> {
    let sql = format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE id = $1 AND is_deleted = FALSE AND (is_published OR NOT $2)"
    );
    sqlx::query_as::<_, Course>(&sql)
        .bind(course_id)
        .bind(published_only)
        .fetch_optional(pool)
        .await
}

pub async fn get_course_detail(
    pool: &PgPool,
    course_id: i32,
    published_only: bool,
) -> Result<Option<CourseDetail>, sqlx::Error> {
    let Some(course) = get_course(pool, course_id, published_only).await? else {
        return Ok(None);
    };

    let sections = sqlx::query_as::<_, CourseSection>(
        "SELECT id, course_id, title, position FROM course_sections WHERE course_id = $1 ORDER BY position",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let videos = sqlx::query_as::<_, CourseVideo>(
        r#"SELECT v.id, v.section_id, v.title, v.video_url, v.duration_seconds, v.is_preview, v.position
           FROM course_videos v
           JOIN course_sections s ON s.id = v.section_id
           WHERE s.course_id = $1
           ORDER BY s.position, v.position"#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let sections = sections
        .into_iter()
        .map(|section| {
            let videos = videos
                .iter()
                .filter(|v| v.section_id == section.id)
                .cloned()
                .collect();
            SectionDetail { section, videos }
        })
        .collect();

    Ok(Some(CourseDetail::new(course, sections)))
}

pub async fn soft_delete_course(pool: &PgPool, course_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE courses
           SET is_deleted = TRUE, is_published = FALSE, deleted_at = NOW(), updated_at = NOW()
           WHERE id = $1 AND is_deleted = FALSE"#,
    )
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Any purchase row, whatever its status, pins the course.
pub async fn has_purchases(pool: &PgPool, course_id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM purchases WHERE course_id = $1) AS found")
        .bind(course_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("found"))
}

/// Fails with a foreign key violation while purchases reference the course.
pub async fn hard_delete_course(pool: &PgPool, course_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_videos(pool: &PgPool, course_id: i32) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS total
           FROM course_videos v
           JOIN course_sections s ON s.id = v.section_id
           WHERE s.course_id = $1"#,
    )
    .bind(course_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get("total"))
}

pub async fn video_in_course(pool: &PgPool, course_id: i32, video_id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT EXISTS (
               SELECT 1 FROM course_videos v
               JOIN course_sections s ON s.id = v.section_id
               WHERE s.course_id = $1 AND v.id = $2
           ) AS found"#,
    )
    .bind(course_id)
    .bind(video_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get("found"))
}
