use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Domain data structures shared across modules.

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub login: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Clone, Debug)]
pub struct DashboardSnapshot {
    pub viewer: UserProfile,
    pub prs_to_review: Vec<PullRequest>,
    pub my_open_prs: Vec<PullRequest>,
    pub involved_prs: Vec<PullRequest>,
    pub assigned_issues: Vec<Issue>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryRef {
    pub name_with_owner: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub url: String,
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_draft: bool,
    pub mergeable: Mergeable,
    pub repository: RepositoryRef,
    pub author: Option<Actor>,
    pub commits: Vec<CommitStatus>,
    pub reviews: Vec<Review>,
    pub review_requests: Vec<RequestedReviewer>,
    pub comments: Vec<Comment>,
    pub labels: Vec<Label>,
}

impl PullRequest {
    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|author| author.login.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub url: String,
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub repository: RepositoryRef,
    pub author: Option<Actor>,
    pub labels: Vec<Label>,
    pub comment_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mergeable {
    Mergeable,
    Conflicting,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckState {
    Success,
    Failure,
    Pending,
    Error,
    Expected,
}

impl CheckState {
    pub fn label(&self) -> &'static str {
        match self {
            CheckState::Success => "SUCCESS",
            CheckState::Failure => "FAILURE",
            CheckState::Pending => "PENDING",
            CheckState::Error => "ERROR",
            CheckState::Expected => "EXPECTED",
        }
    }

    pub fn is_failing(&self) -> bool {
        matches!(self, CheckState::Failure | CheckState::Error)
    }
}

#[derive(Clone, Debug)]
pub struct CommitStatus {
    pub oid: String,
    pub check_state: Option<CheckState>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Pending,
    Commented,
    Dismissed,
}

#[derive(Clone, Debug)]
pub struct Review {
    pub author: Option<Actor>,
    pub state: ReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// When the review was submitted, or started for a pending one.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.submitted_at.unwrap_or(self.created_at)
    }
}

/// Target of a pending review request. GitHub hands back either a user or a
/// team; anything else (bots, mannequins) is dropped while mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestedReviewer {
    User { login: String },
    Team { name: String, slug: String },
}

#[derive(Clone, Debug)]
pub struct Comment {
    pub author: Option<Actor>,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusKind {
    #[serde(rename = "pr")]
    PullRequest,
    #[serde(rename = "issue")]
    Issue,
}

impl FocusKind {
    pub fn label(&self) -> &'static str {
        match self {
            FocusKind::PullRequest => "PR",
            FocusKind::Issue => "ISSUE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusItem {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: FocusKind,
    pub repository: String,
    #[serde(default)]
    pub number: u64,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_item_uses_browser_compatible_field_names() {
        let item = FocusItem {
            id: "focus-1".into(),
            title: "Fix flaky test".into(),
            url: "https://github.com/acme/widgets/pull/7".into(),
            kind: FocusKind::PullRequest,
            repository: "acme/widgets".into(),
            number: 7,
            added_at: "2024-05-01T10:00:00Z".parse().expect("timestamp"),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["type"], "pr");
        assert_eq!(json["addedAt"], "2024-05-01T10:00:00Z");
        assert_eq!(json["repository"], "acme/widgets");
    }

    #[test]
    fn pending_review_activity_falls_back_to_creation() {
        let created_at: DateTime<Utc> = "2024-05-01T10:00:00Z".parse().expect("timestamp");
        let submitted_at: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().expect("timestamp");
        let mut review = Review {
            author: None,
            state: ReviewState::Pending,
            submitted_at: None,
            created_at,
        };
        assert_eq!(review.activity_at(), created_at);

        review.submitted_at = Some(submitted_at);
        assert_eq!(review.activity_at(), submitted_at);
    }

    #[test]
    fn focus_item_without_number_still_loads() {
        let json = r#"{
            "id": "focus-abc",
            "title": "Docs",
            "url": "https://github.com/acme/widgets/issues/3",
            "type": "issue",
            "repository": "acme/widgets",
            "addedAt": "2024-05-01T10:00:00Z"
        }"#;
        let item: FocusItem = serde_json::from_str(json).expect("deserialize");
        assert_eq!(item.kind, FocusKind::Issue);
        assert_eq!(item.number, 0);
    }
}
