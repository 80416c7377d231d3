use chrono::{DateTime, Utc};
use reqwest::{
    StatusCode,
    blocking::Client,
    header::{ACCEPT, USER_AGENT},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, DeserializeOwned},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    domain::{
        Actor, CheckState, Comment, CommitStatus, DashboardSnapshot, Issue, Label, Mergeable,
        PullRequest, RepositoryRef, RequestedReviewer, Review, ReviewState, UserProfile,
    },
    session::ProfileSource,
};

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";
const USER_AGENT_HEADER: &str = "workday-egui/0.1";

const VIEWER_QUERY: &str = r#"
query GetCurrentUser {
  viewer {
    login
    name
    avatarUrl
  }
}
"#;

const DASHBOARD_QUERY: &str = r#"
query GetWorkdayDashboard {
  viewer {
    login
    name
    avatarUrl
  }
  prsToReview: search(query: "is:open is:pr review-requested:@me -author:@me", type: ISSUE, first: 20) {
    nodes { ... on PullRequest { ...PullRequestFragment } }
  }
  myOpenPRs: search(query: "is:open is:pr author:@me", type: ISSUE, first: 20) {
    nodes { ... on PullRequest { ...PullRequestFragment } }
  }
  involvedPRs: search(query: "is:open is:pr involves:@me -author:@me", type: ISSUE, first: 30) {
    nodes { ... on PullRequest { ...PullRequestFragment } }
  }
  assignedIssues: search(query: "is:open is:issue assignee:@me", type: ISSUE, first: 10) {
    nodes { ... on Issue { ...IssueFragment } }
  }
}

fragment PullRequestFragment on PullRequest {
  id
  title
  url
  number
  createdAt
  updatedAt
  mergeable
  isDraft
  repository { nameWithOwner url }
  author { login avatarUrl }
  commits(last: 1) {
    nodes { commit { statusCheckRollup { state } oid } }
  }
  reviews(first: 10, states: [APPROVED, CHANGES_REQUESTED, PENDING]) {
    nodes { author { login } state submittedAt createdAt }
  }
  reviewRequests(first: 10) {
    nodes {
      requestedReviewer {
        __typename
        ... on User { login }
        ... on Team { name slug }
      }
    }
  }
  comments(last: 5) {
    nodes { author { login } createdAt body }
  }
  labels(first: 5) {
    nodes { name color }
  }
}

fragment IssueFragment on Issue {
  id
  title
  url
  number
  createdAt
  updatedAt
  repository { nameWithOwner url }
  author { login avatarUrl }
  labels(first: 5) {
    nodes { name color }
  }
  comments { totalCount }
}
"#;

pub fn build_client() -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(USER_AGENT_HEADER)
        .build()
        .map_err(FetchError::Http)
}

pub fn fetch_viewer(
    client: &Client,
    endpoint: &str,
    token: &str,
) -> Result<UserProfile, FetchError> {
    let data: ViewerData = post_query(client, endpoint, token, VIEWER_QUERY)?;
    Ok(data.viewer.into())
}

pub fn fetch_dashboard(
    client: &Client,
    endpoint: &str,
    token: &str,
) -> Result<DashboardSnapshot, FetchError> {
    let data: DashboardData = post_query(client, endpoint, token, DASHBOARD_QUERY)?;
    Ok(data.into_snapshot(Utc::now()))
}

fn post_query<T: DeserializeOwned>(
    client: &Client,
    endpoint: &str,
    token: &str,
    query: &str,
) -> Result<T, FetchError> {
    if token.is_empty() {
        return Err(FetchError::MissingToken);
    }

    debug!(endpoint, "posting GraphQL query");
    let response = client
        .post(endpoint)
        .header(USER_AGENT, USER_AGENT_HEADER)
        .header(ACCEPT, "application/json")
        .bearer_auth(token)
        .json(&GraphQlRequest { query })
        .send()?;

    if response.status() == StatusCode::UNAUTHORIZED {
        return Err(FetchError::Unauthorized);
    }

    let envelope: GraphQlEnvelope<T> = response.error_for_status()?.json()?;
    envelope.into_data()
}

/// Adapter that lets the session store validate tokens against GitHub.
pub struct GitHubViewerSource<'a> {
    client: &'a Client,
    endpoint: &'a str,
}

impl<'a> GitHubViewerSource<'a> {
    pub fn new(client: &'a Client, endpoint: &'a str) -> Self {
        Self { client, endpoint }
    }
}

impl ProfileSource for GitHubViewerSource<'_> {
    fn fetch_profile(&self, token: &str) -> Result<UserProfile, FetchError> {
        fetch_viewer(self.client, self.endpoint, token)
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Access token is missing")]
    MissingToken,
    #[error("GitHub rejected the access token (401); it may be invalid or expired")]
    Unauthorized,
    #[error("GitHub GraphQL query failed: {0}")]
    GraphQl(String),
    #[error("GitHub GraphQL response contained no data")]
    MissingData,
    #[error("Background worker disconnected before returning a result")]
    BackgroundWorkerGone,
}

impl FetchError {
    pub fn is_auth_failure(&self) -> bool {
        match self {
            FetchError::Unauthorized | FetchError::MissingToken => true,
            FetchError::Http(err) => err.status() == Some(StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }
}

// Request / response payloads -----------------------------------------------

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorPayload>,
}

impl<T> GraphQlEnvelope<T> {
    // Partial data is accepted; GitHub returns it alongside errors for nodes
    // the token cannot see.
    fn into_data(self) -> Result<T, FetchError> {
        let messages: Vec<String> = self.errors.into_iter().map(|err| err.message).collect();
        match self.data {
            Some(data) => {
                if !messages.is_empty() {
                    warn!(errors = ?messages, "GraphQL response carried partial errors");
                }
                Ok(data)
            }
            None if messages.is_empty() => Err(FetchError::MissingData),
            None => Err(FetchError::GraphQl(messages.join("; "))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorPayload {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: ViewerPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerPayload {
    login: String,
    name: Option<String>,
    avatar_url: String,
}

impl From<ViewerPayload> for UserProfile {
    fn from(viewer: ViewerPayload) -> Self {
        let name = viewer
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| viewer.login.clone());
        UserProfile {
            login: viewer.login,
            name,
            avatar_url: viewer.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DashboardData {
    viewer: ViewerPayload,
    #[serde(rename = "prsToReview")]
    prs_to_review: SearchConnection<PullRequestNode>,
    #[serde(rename = "myOpenPRs")]
    my_open_prs: SearchConnection<PullRequestNode>,
    #[serde(rename = "involvedPRs")]
    involved_prs: SearchConnection<PullRequestNode>,
    #[serde(rename = "assignedIssues")]
    assigned_issues: SearchConnection<IssueNode>,
}

impl DashboardData {
    fn into_snapshot(self, fetched_at: DateTime<Utc>) -> DashboardSnapshot {
        DashboardSnapshot {
            viewer: self.viewer.into(),
            prs_to_review: self.prs_to_review.into_items(),
            my_open_prs: self.my_open_prs.into_items(),
            involved_prs: self.involved_prs.into_items(),
            assigned_issues: self.assigned_issues.into_items(),
            fetched_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct SearchConnection<T> {
    #[serde(default)]
    nodes: Vec<Option<SearchNode<T>>>,
}

// Search results that do not match the inline fragment arrive as `{}`.
// Anything else must decode as `T`.
#[derive(Debug)]
enum SearchNode<T> {
    Hit(T),
    Other,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for SearchNode<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.as_object().is_some_and(|fields| fields.is_empty()) {
            return Ok(SearchNode::Other);
        }
        serde_json::from_value(value)
            .map(SearchNode::Hit)
            .map_err(de::Error::custom)
    }
}

impl<T> SearchConnection<T> {
    fn into_items<U: From<T>>(self) -> Vec<U> {
        let total = self.nodes.len();
        let items: Vec<U> = self
            .nodes
            .into_iter()
            .filter_map(|node| match node {
                Some(SearchNode::Hit(item)) => Some(item.into()),
                _ => None,
            })
            .collect();
        if items.len() != total {
            debug!(skipped = total - items.len(), "ignored non-matching search nodes");
        }
        items
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Nodes<T> {
    #[serde(default)]
    nodes: Vec<Option<T>>,
}

impl<T> Nodes<T> {
    fn flatten(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryPayload {
    name_with_owner: String,
    url: String,
}

impl From<RepositoryPayload> for RepositoryRef {
    fn from(repo: RepositoryPayload) -> Self {
        RepositoryRef {
            name_with_owner: repo.name_with_owner,
            url: repo.url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorPayload {
    login: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<ActorPayload> for Actor {
    fn from(actor: ActorPayload) -> Self {
        Actor {
            login: actor.login,
            avatar_url: actor.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
    color: String,
}

impl From<LabelPayload> for Label {
    fn from(label: LabelPayload) -> Self {
        Label {
            name: label.name,
            color: label.color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    id: String,
    title: String,
    url: String,
    number: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    mergeable: Mergeable,
    is_draft: bool,
    repository: RepositoryPayload,
    author: Option<ActorPayload>,
    commits: Nodes<CommitNode>,
    reviews: Nodes<ReviewNode>,
    review_requests: Nodes<ReviewRequestNode>,
    comments: Nodes<CommentNode>,
    labels: Nodes<LabelPayload>,
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        PullRequest {
            id: node.id,
            title: node.title,
            url: node.url,
            number: node.number,
            created_at: node.created_at,
            updated_at: node.updated_at,
            is_draft: node.is_draft,
            mergeable: node.mergeable,
            repository: node.repository.into(),
            author: node.author.map(Actor::from),
            commits: node
                .commits
                .flatten()
                .map(|node| CommitStatus {
                    oid: node.commit.oid,
                    check_state: node.commit.status_check_rollup.map(|rollup| rollup.state),
                })
                .collect(),
            reviews: node
                .reviews
                .flatten()
                .map(|review| Review {
                    author: review.author.map(Actor::from),
                    state: review.state,
                    submitted_at: review.submitted_at,
                    created_at: review.created_at,
                })
                .collect(),
            review_requests: node
                .review_requests
                .flatten()
                .filter_map(|request| request.requested_reviewer)
                .filter_map(ReviewerPayload::into_reviewer)
                .collect(),
            comments: node
                .comments
                .flatten()
                .map(|comment| Comment {
                    author: comment.author.map(Actor::from),
                    created_at: comment.created_at,
                    body: comment.body,
                })
                .collect(),
            labels: node.labels.flatten().map(Label::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    commit: CommitPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitPayload {
    oid: String,
    status_check_rollup: Option<StatusRollupPayload>,
}

#[derive(Debug, Deserialize)]
struct StatusRollupPayload {
    state: CheckState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewNode {
    author: Option<ActorPayload>,
    state: ReviewState,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequestNode {
    requested_reviewer: Option<ReviewerPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum ReviewerPayload {
    User {
        login: String,
    },
    Team {
        name: String,
        slug: String,
    },
    #[serde(other)]
    Other,
}

impl ReviewerPayload {
    fn into_reviewer(self) -> Option<RequestedReviewer> {
        match self {
            ReviewerPayload::User { login } => Some(RequestedReviewer::User { login }),
            ReviewerPayload::Team { name, slug } => Some(RequestedReviewer::Team { name, slug }),
            ReviewerPayload::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    author: Option<ActorPayload>,
    created_at: DateTime<Utc>,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    id: String,
    title: String,
    url: String,
    number: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    repository: RepositoryPayload,
    author: Option<ActorPayload>,
    labels: Nodes<LabelPayload>,
    comments: TotalCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

impl From<IssueNode> for Issue {
    fn from(node: IssueNode) -> Self {
        Issue {
            id: node.id,
            title: node.title,
            url: node.url,
            number: node.number,
            created_at: node.created_at,
            updated_at: node.updated_at,
            repository: node.repository.into(),
            author: node.author.map(Actor::from),
            labels: node.labels.flatten().map(Label::from).collect(),
            comment_count: node.comments.total_count,
        }
    }
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DASHBOARD_FIXTURE: &str = r#"{
      "data": {
        "viewer": { "login": "octo", "name": null, "avatarUrl": "https://avatars/octo" },
        "prsToReview": {
          "nodes": [
            {
              "id": "PR_1",
              "title": "Add retry budget",
              "url": "https://github.com/acme/api/pull/12",
              "number": 12,
              "createdAt": "2024-05-01T09:00:00Z",
              "updatedAt": "2024-05-03T09:00:00Z",
              "mergeable": "CONFLICTING",
              "isDraft": false,
              "repository": { "nameWithOwner": "acme/api", "url": "https://github.com/acme/api" },
              "author": { "login": "hubot", "avatarUrl": "https://avatars/hubot" },
              "commits": { "nodes": [ { "commit": { "statusCheckRollup": { "state": "FAILURE" }, "oid": "abc123" } } ] },
              "reviews": { "nodes": [
                { "author": { "login": "octo" }, "state": "CHANGES_REQUESTED", "submittedAt": "2024-05-02T09:00:00Z", "createdAt": "2024-05-02T08:00:00Z" },
                { "author": null, "state": "PENDING", "submittedAt": null, "createdAt": "2024-05-02T10:00:00Z" }
              ] },
              "reviewRequests": { "nodes": [
                { "requestedReviewer": { "__typename": "User", "login": "octo" } },
                { "requestedReviewer": { "__typename": "Team", "name": "infra", "slug": "infra" } },
                { "requestedReviewer": { "__typename": "Mannequin" } },
                { "requestedReviewer": null }
              ] },
              "comments": { "nodes": [ { "author": { "login": "octo" }, "createdAt": "2024-05-02T11:00:00Z", "body": "lgtm?" } ] },
              "labels": { "nodes": [ { "name": "bug", "color": "d73a4a" } ] }
            },
            {}
          ]
        },
        "myOpenPRs": { "nodes": [] },
        "involvedPRs": { "nodes": [ null ] },
        "assignedIssues": {
          "nodes": [
            {
              "id": "I_1",
              "title": "Crash on empty config",
              "url": "https://github.com/acme/api/issues/40",
              "number": 40,
              "createdAt": "2024-04-01T09:00:00Z",
              "updatedAt": "2024-04-02T09:00:00Z",
              "repository": { "nameWithOwner": "acme/api", "url": "https://github.com/acme/api" },
              "author": null,
              "labels": { "nodes": [] },
              "comments": { "totalCount": 3 }
            }
          ]
        }
      }
    }"#;

    fn parse_fixture() -> DashboardSnapshot {
        let envelope: GraphQlEnvelope<DashboardData> =
            serde_json::from_str(DASHBOARD_FIXTURE).expect("fixture parses");
        let fetched_at = "2024-05-04T00:00:00Z".parse().expect("timestamp");
        envelope.into_data().expect("data").into_snapshot(fetched_at)
    }

    #[test]
    fn dashboard_payload_maps_into_snapshot() {
        let snapshot = parse_fixture();
        assert_eq!(snapshot.viewer.login, "octo");
        assert_eq!(snapshot.viewer.name, "octo", "null name falls back to login");
        assert_eq!(snapshot.prs_to_review.len(), 1, "empty node is skipped");
        assert!(snapshot.my_open_prs.is_empty());
        assert!(snapshot.involved_prs.is_empty(), "null node is skipped");
        assert_eq!(snapshot.assigned_issues.len(), 1);
        assert_eq!(snapshot.assigned_issues[0].comment_count, 3);
    }

    #[test]
    fn pull_request_fields_are_mapped() {
        let snapshot = parse_fixture();
        let pr = &snapshot.prs_to_review[0];
        assert_eq!(pr.number, 12);
        assert_eq!(pr.mergeable, Mergeable::Conflicting);
        assert_eq!(pr.author_login(), Some("hubot"));
        assert_eq!(pr.commits[0].check_state, Some(CheckState::Failure));
        assert_eq!(pr.reviews.len(), 2);
        assert_eq!(pr.reviews[0].state, ReviewState::ChangesRequested);
        assert!(pr.reviews[1].submitted_at.is_none());
        assert_eq!(pr.labels[0].color, "d73a4a");
    }

    #[test]
    fn review_requests_become_tagged_reviewers() {
        let snapshot = parse_fixture();
        let pr = &snapshot.prs_to_review[0];
        assert_eq!(
            pr.review_requests,
            vec![
                RequestedReviewer::User {
                    login: "octo".into()
                },
                RequestedReviewer::Team {
                    name: "infra".into(),
                    slug: "infra".into()
                },
            ]
        );
    }

    #[test]
    fn undecodable_search_node_fails_the_payload() {
        let payload = DASHBOARD_FIXTURE.replace("\"CONFLICTING\"", "\"SOMETHING_NEW\"");
        let result = serde_json::from_str::<GraphQlEnvelope<DashboardData>>(&payload);
        let err = result.expect_err("unknown mergeable state must not be skipped");
        assert!(err.to_string().contains("SOMETHING_NEW"), "{err}");
    }

    #[test]
    fn only_empty_objects_are_skipped() {
        let connection: SearchConnection<LabelPayload> = serde_json::from_str(
            r#"{ "nodes": [ {}, null, { "name": "bug", "color": "d73a4a" } ] }"#,
        )
        .unwrap();
        let labels: Vec<Label> = connection.into_items();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name, "bug");

        let partial = serde_json::from_str::<SearchConnection<LabelPayload>>(
            r#"{ "nodes": [ { "name": "bug" } ] }"#,
        );
        assert!(partial.is_err(), "a node missing fields is an error, not a skip");
    }

    #[test]
    fn errors_without_data_are_reported() {
        let envelope: GraphQlEnvelope<ViewerData> = serde_json::from_str(
            r#"{ "data": null, "errors": [ { "message": "Bad credentials" }, { "message": "Try again" } ] }"#,
        )
        .unwrap();
        match envelope.into_data() {
            Err(FetchError::GraphQl(message)) => assert_eq!(message, "Bad credentials; Try again"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_envelope_is_missing_data() {
        let envelope: GraphQlEnvelope<ViewerData> = serde_json::from_str("{}").unwrap();
        assert!(matches!(envelope.into_data(), Err(FetchError::MissingData)));
    }

    #[test]
    fn partial_errors_keep_data() {
        let envelope: GraphQlEnvelope<ViewerData> = serde_json::from_str(
            r#"{ "data": { "viewer": { "login": "octo", "name": "Octo Cat", "avatarUrl": "a" } },
                 "errors": [ { "message": "Resource not accessible" } ] }"#,
        )
        .unwrap();
        let viewer = envelope.into_data().expect("partial data accepted").viewer;
        assert_eq!(UserProfile::from(viewer).name, "Octo Cat");
    }

    #[test]
    fn fetch_requires_token() {
        let client = build_client().expect("client");
        let result = fetch_dashboard(&client, DEFAULT_GRAPHQL_ENDPOINT, "");
        assert!(matches!(result, Err(FetchError::MissingToken)));
        assert!(FetchError::MissingToken.is_auth_failure());
        assert!(!FetchError::MissingData.is_auth_failure());
    }
}
