// src/db/email_templates.rs

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use utoipa::ToSchema;

use crate::models::{EmailTemplate, TemplateVariable};
use crate::templating::DefaultTemplate;

const TEMPLATE_COLUMNS: &str = "id, name, subject, html_body, variables, is_active, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TemplateInput {
    pub name: String,
    pub subject: String,
    pub html_body: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TemplateInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.subject.trim().is_empty() {
            return Err("subject is required".into());
        }
        if self.html_body.trim().is_empty() {
            return Err("html_body is required".into());
        }
        if let Some(v) = self.variables.iter().find(|v| v.name.trim().is_empty()) {
            return Err(format!("variable with example {:?} has no name", v.example));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
}

pub async fn list_templates(pool: &PgPool) -> Result<Vec<EmailTemplate>, sqlx::Error> {
    let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates ORDER BY name");
    sqlx::query_as::<_, EmailTemplate>(&sql).fetch_all(pool).await
}

pub async fn get_template(pool: &PgPool, template_id: i32) -> Result<Option<EmailTemplate>, sqlx::Error> {
    let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE id = $1");
    sqlx::query_as::<_, EmailTemplate>(&sql)
        .bind(template_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_active_by_name(pool: &PgPool, name: &str) -> Result<Option<EmailTemplate>, sqlx::Error> {
    let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE name = $1 AND is_active");
    sqlx::query_as::<_, EmailTemplate>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await
}

pub async fn create_template(pool: &PgPool, input: &TemplateInput) -> Result<EmailTemplate, sqlx::Error> {
    let sql = format!(
        r#"INSERT INTO email_templates (name, subject, html_body, variables, is_active)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING {TEMPLATE_COLUMNS}"#
    );
    sqlx::query_as::<_, EmailTemplate>(&sql)
        .bind(input.name.trim())
        .bind(&input.subject)
        .bind(&input.html_body)
        .bind(Json(&input.variables))
        .bind(input.is_active)
        .fetch_one(pool)
        .await
}

pub async fn update_template(
    pool: &PgPool,
    template_id: i32,
    input: &TemplateInput,
) -> Result<Option<EmailTemplate>, sqlx::Error> {
    let sql = format!(
        r#"UPDATE email_templates
           SET name = $2, subject = $3, html_body = $4, variables = $5, is_active = $6, updated_at = NOW()
           WHERE id = $1
           RETURNING {TEMPLATE_COLUMNS}"#
    );
    sqlx::query_as::<_, EmailTemplate>(&sql)
        .bind(template_id)
        .bind(input.name.trim())
        .bind(&input.subject)
        .bind(&input.html_body)
        .bind(Json(&input.variables))
        .bind(input.is_active)
        .fetch_optional(pool)
        .await
}

pub async fn delete_template(pool: &PgPool, template_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM email_templates WHERE id = $1")
        .bind(template_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Upserts the built-in templates by name inside one transaction.
pub async fn seed(pool: &PgPool, templates: &[DefaultTemplate]) -> Result<SeedReport, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for template in templates {
        // xmax = 0 only for freshly inserted tuples.
        let row = sqlx::query(
            r#"INSERT INTO email_templates (name, subject, html_body, variables, is_active)
               VALUES ($1, $2, $3, $4, TRUE)
               ON CONFLICT (name)
               DO UPDATE SET subject = EXCLUDED.subject,
                             html_body = EXCLUDED.html_body,
                             variables = EXCLUDED.variables,
                             updated_at = NOW()
               RETURNING (xmax = 0) AS inserted"#,
        )
        .bind(template.name)
        .bind(template.subject)
        .bind(template.html_body)
        .bind(Json(template.variables()))
        .fetch_one(&mut *tx)
        .await?;

        if row.get::<bool, _>("inserted") {
            report.inserted += 1;
        } else {
            report.updated += 1;
        }
    }

    tx.commit().await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_input_validation() {
        let input: TemplateInput =
            serde_json::from_str(r#"{"name":"welcome","subject":"Hi","html_body":"<p>{{userName}}</p>"}"#).unwrap();
        assert!(input.is_active);
        assert_eq!(input.validate(), Ok(()));

        let mut blank = input.clone();
        blank.subject = " ".into();
        assert_eq!(blank.validate(), Err("subject is required".into()));
    }
}
