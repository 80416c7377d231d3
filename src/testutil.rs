use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{
    Actor, Comment, Mergeable, PullRequest, RepositoryRef, RequestedReviewer, Review, ReviewState,
};

pub fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().expect("valid RFC 3339 timestamp")
}

pub fn hours_ago(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now - TimeDelta::hours(hours)
}

pub fn actor(login: &str) -> Actor {
    Actor {
        login: login.to_owned(),
        avatar_url: Some(format!("https://avatars.example/{login}")),
    }
}

/// A minimal open pull request created and last updated at `updated_at`.
pub fn pull_request(id: &str, updated_at: DateTime<Utc>) -> PullRequest {
    PullRequest {
        id: id.to_owned(),
        title: format!("Pull request {id}"),
        url: format!("https://github.com/acme/widgets/pull/{id}"),
        number: 1,
        created_at: updated_at,
        updated_at,
        is_draft: false,
        mergeable: Mergeable::Mergeable,
        repository: RepositoryRef {
            name_with_owner: "acme/widgets".to_owned(),
            url: "https://github.com/acme/widgets".to_owned(),
        },
        author: Some(actor("author")),
        commits: Vec::new(),
        reviews: Vec::new(),
        review_requests: Vec::new(),
        comments: Vec::new(),
        labels: Vec::new(),
    }
}

pub fn user_request(login: &str) -> RequestedReviewer {
    RequestedReviewer::User {
        login: login.to_owned(),
    }
}

pub fn team_request(name: &str) -> RequestedReviewer {
    RequestedReviewer::Team {
        name: name.to_owned(),
        slug: name.to_lowercase(),
    }
}

pub fn review_by(login: &str, state: ReviewState, submitted_at: Option<DateTime<Utc>>) -> Review {
    Review {
        author: Some(actor(login)),
        state,
        submitted_at,
        created_at: submitted_at.unwrap_or_else(Utc::now),
    }
}

pub fn comment_by(login: &str, created_at: DateTime<Utc>) -> Comment {
    Comment {
        author: Some(actor(login)),
        created_at,
        body: "Looks reasonable".to_owned(),
    }
}
