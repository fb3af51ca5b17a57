//! Comment entity with abuse reports embedded as JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Maximum comment length in characters, after trimming.
pub const MAX_CONTENT_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportCategory {
    Spam,
    Hate,
    Violence,
}

impl ReportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Spam => "spam",
            ReportCategory::Hate => "hate",
            ReportCategory::Violence => "violence",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(ReportCategory::Spam),
            "hate" => Ok(ReportCategory::Hate),
            "violence" => Ok(ReportCategory::Violence),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

/// One user's report against a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub category: ReportCategory,
    #[serde(default)]
    pub text: String,
}

/// Reports keyed by reporting user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Reports(pub BTreeMap<String, Report>);

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub node_id: String,
    /// Author
    pub user_id: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub is_deleted: bool,
    pub modified: bool,
    #[sea_orm(column_type = "Json")]
    pub reports: Reports,
    pub created_at: DateTimeWithTimeZone,
    pub modified_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::node::Entity",
        from = "Column::NodeId",
        to = "super::node::Column::Id",
        on_delete = "Cascade"
    )]
    Node,
}

impl Related<super::node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Node.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommentError {
    #[error("Comment cannot be empty.")]
    EmptyContent,
    #[error("Ensure this field has no more than 500 characters.")]
    ContentTooLong,
    #[error("Cannot edit a deleted comment.")]
    Deleted,
    #[error("Comment cannot be reported by its own author.")]
    OwnComment,
    #[error("User has not reported comment as abuse.")]
    NotReported,
}

/// Trimmed content, if it has an allowed length.
pub fn validate_content(content: &str) -> Result<String, CommentError> {
    let trimmed = content.trim();
    match trimmed.chars().count() {
        0 => Err(CommentError::EmptyContent),
        n if n > MAX_CONTENT_LENGTH => Err(CommentError::ContentTooLong),
        _ => Ok(trimmed.to_string()),
    }
}

impl Model {
    /// Replace the content and mark the comment as modified.
    pub fn edit(&mut self, content: &str, now: DateTimeWithTimeZone) -> Result<(), CommentError> {
        if self.is_deleted {
            return Err(CommentError::Deleted);
        }
        let content = validate_content(content)?;
        if content != self.content {
            self.content = content;
            self.modified = true;
            self.modified_at = now;
        }
        Ok(())
    }

    /// Record or overwrite `user_id`'s report.
    pub fn report_abuse(
        &mut self,
        user_id: &str,
        category: ReportCategory,
        text: String,
    ) -> Result<(), CommentError> {
        if user_id == self.user_id {
            return Err(CommentError::OwnComment);
        }
        self.reports
            .0
            .insert(user_id.to_string(), Report { category, text });
        Ok(())
    }

    pub fn unreport_abuse(&mut self, user_id: &str) -> Result<Report, CommentError> {
        self.reports
            .0
            .remove(user_id)
            .ok_or(CommentError::NotReported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment() -> Model {
        let now = chrono::Utc::now();
        Model {
            id: "c1".into(),
            node_id: "abc12".into(),
            user_id: "author".into(),
            content: "First!".into(),
            is_deleted: false,
            modified: false,
            reports: Reports::default(),
            created_at: now.into(),
            modified_at: now.into(),
        }
    }

    #[test]
    fn content_is_trimmed_and_bounded() {
        assert_eq!(validate_content("  hi  "), Ok("hi".to_string()));
        assert_eq!(validate_content("   "), Err(CommentError::EmptyContent));
        assert!(validate_content(&"x".repeat(MAX_CONTENT_LENGTH)).is_ok());
        assert_eq!(
            validate_content(&"x".repeat(MAX_CONTENT_LENGTH + 1)),
            Err(CommentError::ContentTooLong)
        );
    }

    #[test]
    fn editing_marks_modified() {
        let mut c = comment();
        c.edit(" Second ", chrono::Utc::now().into()).unwrap();
        assert_eq!(c.content, "Second");
        assert!(c.modified);
    }

    #[test]
    fn deleted_comment_cannot_be_edited() {
        let mut c = comment();
        c.is_deleted = true;
        assert_eq!(
            c.edit("new", chrono::Utc::now().into()),
            Err(CommentError::Deleted)
        );
    }

    #[test]
    fn author_cannot_report_own_comment() {
        let mut c = comment();
        assert_eq!(
            c.report_abuse("author", ReportCategory::Spam, String::new()),
            Err(CommentError::OwnComment)
        );
    }

    #[test]
    fn reporting_twice_overwrites() {
        let mut c = comment();
        c.report_abuse("u2", ReportCategory::Spam, "ads".into()).unwrap();
        c.report_abuse("u2", ReportCategory::Hate, "slur".into()).unwrap();

        assert_eq!(c.reports.0.len(), 1);
        assert_eq!(c.reports.0["u2"].category, ReportCategory::Hate);
    }

    #[test]
    fn unreport_requires_existing_report() {
        let mut c = comment();
        assert_eq!(c.unreport_abuse("u2"), Err(CommentError::NotReported));

        c.report_abuse("u2", ReportCategory::Violence, String::new()).unwrap();
        assert!(c.unreport_abuse("u2").is_ok());
        assert!(c.reports.0.is_empty());
    }

    #[test]
    fn category_parsing() {
        assert_eq!("hate".parse::<ReportCategory>(), Ok(ReportCategory::Hate));
        assert_eq!(
            "rude".parse::<ReportCategory>(),
            Err("\"rude\" is not a valid choice.".to_string())
        );
    }

    #[test]
    fn reports_serialize_as_plain_map() {
        let mut reports = Reports::default();
        reports.0.insert(
            "u1".to_string(),
            Report {
                category: ReportCategory::Spam,
                text: "ads".to_string(),
            },
        );

        let json = serde_json::to_value(&reports).unwrap();
        assert_eq!(json, serde_json::json!({"u1": {"category": "spam", "text": "ads"}}));
    }
}
