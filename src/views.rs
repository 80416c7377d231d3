//! Derived view models for the dashboard widgets.
//!
//! Everything here is a pure function over an already fetched snapshot. The
//! UI recomputes these every frame; inputs are capped at a few dozen items.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{Actor, CheckState, PullRequest, RequestedReviewer, Review, ReviewState};

pub const DIRECT_GROUP_LABEL: &str = "Directly Assigned";
pub const UNASSIGNED_GROUP_LABEL: &str = "No Assignment";
pub const UNKNOWN_AUTHOR: &str = "unknown";

const STALE_MIN_AGE_DAYS: i64 = 7;
const STALE_MIN_IDLE_DAYS: i64 = 3;

// -----------------------------------------------------------------------------
// Triage: grouping by review request
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssignmentTarget {
    Direct,
    Team(String),
    Unassigned,
}

#[derive(Clone, Debug)]
pub struct AssignmentGroup<'a> {
    pub target: AssignmentTarget,
    pub pull_requests: Vec<&'a PullRequest>,
}

impl AssignmentGroup<'_> {
    pub fn label(&self) -> &str {
        match &self.target {
            AssignmentTarget::Direct => DIRECT_GROUP_LABEL,
            AssignmentTarget::Team(name) => name,
            AssignmentTarget::Unassigned => UNASSIGNED_GROUP_LABEL,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.target == AssignmentTarget::Direct
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.pull_requests.iter().map(|pr| pr.updated_at).max()
    }
}

/// Groups pull requests by who their review was requested from.
///
/// A request naming `viewer_login` puts the pull request in the direct group
/// and nowhere else. Otherwise it joins one group per distinct requested
/// team, or the unassigned group when no team was asked. Members are ordered
/// newest update first; the direct group leads and the remaining groups follow
/// by their newest member.
pub fn group_by_assignment<'a, I>(prs: I, viewer_login: &str) -> Vec<AssignmentGroup<'a>>
where
    I: IntoIterator<Item = &'a PullRequest>,
{
    let mut groups: Vec<AssignmentGroup<'a>> = Vec::new();
    for pr in prs {
        for target in assignment_targets(pr, viewer_login) {
            match groups.iter_mut().find(|group| group.target == target) {
                Some(group) => group.pull_requests.push(pr),
                None => groups.push(AssignmentGroup {
                    target,
                    pull_requests: vec![pr],
                }),
            }
        }
    }

    for group in &mut groups {
        group
            .pull_requests
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
    groups.sort_by(|a, b| {
        b.is_direct()
            .cmp(&a.is_direct())
            .then_with(|| b.last_updated().cmp(&a.last_updated()))
    });
    groups
}

fn assignment_targets(pr: &PullRequest, viewer_login: &str) -> Vec<AssignmentTarget> {
    let direct = pr.review_requests.iter().any(|request| {
        matches!(request, RequestedReviewer::User { login } if login == viewer_login)
    });
    if direct {
        return vec![AssignmentTarget::Direct];
    }

    let mut targets = Vec::new();
    for request in &pr.review_requests {
        if let RequestedReviewer::Team { name, .. } = request {
            let target = AssignmentTarget::Team(name.clone());
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    if targets.is_empty() {
        targets.push(AssignmentTarget::Unassigned);
    }
    targets
}

// -----------------------------------------------------------------------------
// Triage: author tally and filter
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorTally<'a> {
    pub login: &'a str,
    pub avatar_url: Option<&'a str>,
    pub count: usize,
}

pub fn tally_by_author<'a, I>(prs: I) -> Vec<AuthorTally<'a>>
where
    I: IntoIterator<Item = &'a PullRequest>,
{
    let mut tallies: Vec<AuthorTally<'a>> = Vec::new();
    for pr in prs {
        let login = pr.author_login().unwrap_or(UNKNOWN_AUTHOR);
        match tallies.iter_mut().find(|tally| tally.login == login) {
            Some(tally) => tally.count += 1,
            None => tallies.push(AuthorTally {
                login,
                avatar_url: pr.author.as_ref().and_then(|a| a.avatar_url.as_deref()),
                count: 1,
            }),
        }
    }
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies
}

/// `None` keeps everything; otherwise an exact, case-sensitive login match.
/// Pull requests without an author match the tally's `unknown` bucket.
pub fn filter_by_author<'a>(prs: &'a [PullRequest], login: Option<&str>) -> Vec<&'a PullRequest> {
    match login {
        None => prs.iter().collect(),
        Some(login) => prs
            .iter()
            .filter(|pr| pr.author_login().unwrap_or(UNKNOWN_AUTHOR) == login)
            .collect(),
    }
}

/// Open for more than a week and untouched for more than three days.
pub fn is_stale(pr: &PullRequest, now: DateTime<Utc>) -> bool {
    now - pr.created_at > TimeDelta::days(STALE_MIN_AGE_DAYS)
        && now - pr.updated_at > TimeDelta::days(STALE_MIN_IDLE_DAYS)
}

// -----------------------------------------------------------------------------
// Radar
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Involvement {
    Reviewed,
    Commented,
    Involved,
}

impl Involvement {
    pub fn label(&self) -> &'static str {
        match self {
            Involvement::Reviewed => "Reviewed",
            Involvement::Commented => "Commented",
            Involvement::Involved => "Involved",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RadarEntry<'a> {
    pub pull_request: &'a PullRequest,
    pub involvement: Involvement,
    pub has_new_commits: bool,
}

/// The viewer's last review in list order. GitHub returns reviews oldest
/// first, but the timestamps are not compared.
pub fn viewer_last_review<'a>(pr: &'a PullRequest, viewer_login: &str) -> Option<&'a Review> {
    pr.reviews
        .iter()
        .rev()
        .find(|review| is_authored_by(review.author.as_ref(), viewer_login))
}

pub fn has_new_commits_since_review(pr: &PullRequest, viewer_login: &str) -> bool {
    viewer_last_review(pr, viewer_login)
        .and_then(|review| review.submitted_at)
        .is_some_and(|submitted_at| pr.updated_at > submitted_at)
}

pub fn involvement(pr: &PullRequest, viewer_login: &str) -> Involvement {
    let reviewed = pr
        .reviews
        .iter()
        .any(|review| is_authored_by(review.author.as_ref(), viewer_login));
    if reviewed {
        return Involvement::Reviewed;
    }
    let commented = pr
        .comments
        .iter()
        .any(|comment| is_authored_by(comment.author.as_ref(), viewer_login));
    if commented {
        Involvement::Commented
    } else {
        Involvement::Involved
    }
}

/// Annotates involved pull requests; the ones with activity since the
/// viewer's last review come first, each partition newest update first.
pub fn compute_radar<'a, I>(prs: I, viewer_login: &str) -> Vec<RadarEntry<'a>>
where
    I: IntoIterator<Item = &'a PullRequest>,
{
    let mut entries: Vec<RadarEntry<'a>> = prs
        .into_iter()
        .map(|pr| RadarEntry {
            pull_request: pr,
            involvement: involvement(pr, viewer_login),
            has_new_commits: has_new_commits_since_review(pr, viewer_login),
        })
        .collect();
    entries.sort_by(|a, b| {
        b.has_new_commits
            .cmp(&a.has_new_commits)
            .then_with(|| b.pull_request.updated_at.cmp(&a.pull_request.updated_at))
    });
    entries
}

pub fn count_new_commits(entries: &[RadarEntry<'_>]) -> usize {
    entries.iter().filter(|entry| entry.has_new_commits).count()
}

fn is_authored_by(author: Option<&Actor>, viewer_login: &str) -> bool {
    author.is_some_and(|author| author.login == viewer_login)
}

// -----------------------------------------------------------------------------
// In flight
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrStatus {
    Draft,
    ChangesRequested,
    Approved,
    InReview,
    AwaitingReview,
}

impl PrStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PrStatus::Draft => "Draft",
            PrStatus::ChangesRequested => "Changes Requested",
            PrStatus::Approved => "Approved",
            PrStatus::InReview => "In Review",
            PrStatus::AwaitingReview => "Awaiting Review",
        }
    }
}

pub fn pr_status(pr: &PullRequest) -> PrStatus {
    if pr.is_draft {
        return PrStatus::Draft;
    }
    let has_state = |state: ReviewState| pr.reviews.iter().any(|review| review.state == state);
    if has_state(ReviewState::ChangesRequested) {
        PrStatus::ChangesRequested
    } else if has_state(ReviewState::Approved) {
        PrStatus::Approved
    } else if !pr.reviews.is_empty() {
        PrStatus::InReview
    } else {
        PrStatus::AwaitingReview
    }
}

pub fn latest_check_state(pr: &PullRequest) -> Option<CheckState> {
    pr.commits.first().and_then(|commit| commit.check_state)
}
