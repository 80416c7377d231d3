use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{FocusItem, FocusKind, Issue, PullRequest},
    storage::{LocalStorage, StorageError},
};

pub const FOCUS_ITEMS_KEY: &str = "github_focus_items";
pub const MAX_FOCUS_ITEMS: usize = 5;

static ITEM_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+/[^/]+)/(pull|issues)/(\d+)")
        .expect("item url pattern is valid")
});

/// Anything that can be pinned: a fetched pull request or issue, or a raw url.
#[derive(Clone, Copy, Debug)]
pub struct FocusSource<'a> {
    pub title: &'a str,
    pub url: &'a str,
}

impl<'a> From<&'a PullRequest> for FocusSource<'a> {
    fn from(pr: &'a PullRequest) -> Self {
        FocusSource {
            title: &pr.title,
            url: &pr.url,
        }
    }
}

impl<'a> From<&'a Issue> for FocusSource<'a> {
    fn from(issue: &'a Issue) -> Self {
        FocusSource {
            title: &issue.title,
            url: &issue.url,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedItemUrl {
    pub kind: FocusKind,
    pub repository: String,
    pub number: u64,
}

pub fn parse_item_url(url: &str) -> Option<ParsedItemUrl> {
    let captures = ITEM_URL.captures(url)?;
    let kind = match &captures[2] {
        "pull" => FocusKind::PullRequest,
        _ => FocusKind::Issue,
    };
    let number = captures[3].parse().ok()?;
    Some(ParsedItemUrl {
        kind,
        repository: captures[1].to_owned(),
        number,
    })
}

pub struct FocusStore {
    storage: LocalStorage,
    items: Vec<FocusItem>,
}

impl FocusStore {
    pub fn load(storage: LocalStorage) -> Self {
        let items = match storage.read::<Vec<FocusItem>>(FOCUS_ITEMS_KEY) {
            Ok(Some(mut items)) => {
                items.truncate(MAX_FOCUS_ITEMS);
                items
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "stored focus items are unreadable; starting empty");
                Vec::new()
            }
        };
        Self { storage, items }
    }

    pub fn items(&self) -> &[FocusItem] {
        &self.items
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_FOCUS_ITEMS
    }

    pub fn contains(&self, url: &str) -> bool {
        self.items.iter().any(|item| item.url == url)
    }

    pub fn find(&self, url: &str) -> Option<&FocusItem> {
        self.items.iter().find(|item| item.url == url)
    }

    /// Pins `source` at the front of the list, evicting the oldest entries
    /// past the capacity. Pinning an already pinned url returns the existing
    /// item untouched.
    pub fn add(&mut self, source: FocusSource<'_>) -> Result<&FocusItem, FocusError> {
        if let Some(pos) = self.items.iter().position(|item| item.url == source.url) {
            return Ok(&self.items[pos]);
        }

        let parsed = parse_item_url(source.url)
            .ok_or_else(|| FocusError::InvalidUrl(source.url.to_owned()))?;
        let item = FocusItem {
            id: format!("focus-{}", Uuid::new_v4().simple()),
            title: source.title.to_owned(),
            url: source.url.to_owned(),
            kind: parsed.kind,
            repository: parsed.repository,
            number: parsed.number,
            added_at: Utc::now(),
        };

        let mut next = Vec::with_capacity(MAX_FOCUS_ITEMS + 1);
        next.push(item);
        next.extend(self.items.iter().cloned());
        next.truncate(MAX_FOCUS_ITEMS);
        self.commit(next)?;
        info!(url = %source.url, "pinned focus item");
        Ok(&self.items[0])
    }

    /// Pins a pasted url. Without a custom title the item is labelled
    /// `PR #<n>` or `ISSUE #<n>`.
    pub fn add_url(
        &mut self,
        url: &str,
        custom_title: Option<&str>,
    ) -> Result<&FocusItem, FocusError> {
        let url = url.trim();
        let parsed = parse_item_url(url).ok_or_else(|| FocusError::InvalidUrl(url.to_owned()))?;
        let title = match custom_title.map(str::trim).filter(|title| !title.is_empty()) {
            Some(title) => title.to_owned(),
            None => format!("{} #{}", parsed.kind.label(), parsed.number),
        };
        self.add(FocusSource { title: &title, url })
    }

    pub fn remove(&mut self, id: &str) -> Result<(), FocusError> {
        if !self.items.iter().any(|item| item.id == id) {
            return Ok(());
        }
        let next = self
            .items
            .iter()
            .filter(|item| item.id != id)
            .cloned()
            .collect();
        self.commit(next)
    }

    /// Unpins when pinned, pins otherwise. Returns whether the url is pinned
    /// afterwards.
    pub fn toggle(&mut self, source: FocusSource<'_>) -> Result<bool, FocusError> {
        match self.find(source.url).map(|item| item.id.clone()) {
            Some(id) => {
                self.remove(&id)?;
                Ok(false)
            }
            None => {
                self.add(source)?;
                Ok(true)
            }
        }
    }

    fn commit(&mut self, next: Vec<FocusItem>) -> Result<(), FocusError> {
        self.storage.write(FOCUS_ITEMS_KEY, &next)?;
        self.items = next;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Not a GitHub pull request or issue URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to save focus items: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, FocusStore) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::at(dir.path().to_path_buf()).unwrap();
        (dir, FocusStore::load(storage))
    }

    fn pr_url(n: u64) -> String {
        format!("https://github.com/acme/widgets/pull/{n}")
    }

    #[test]
    fn parses_pull_request_and_issue_urls() {
        assert_eq!(
            parse_item_url("https://github.com/acme/widgets/pull/42/files"),
            Some(ParsedItemUrl {
                kind: FocusKind::PullRequest,
                repository: "acme/widgets".into(),
                number: 42,
            })
        );
        let issue = parse_item_url("https://github.com/acme/widgets/issues/7").unwrap();
        assert_eq!(issue.kind, FocusKind::Issue);
        assert_eq!(issue.number, 7);
    }

    #[test]
    fn rejects_non_item_urls() {
        assert!(parse_item_url("https://github.com/acme/widgets").is_none());
        assert!(parse_item_url("https://gitlab.com/acme/widgets/pull/1").is_none());
        assert!(parse_item_url("https://github.com/acme/widgets/pull/abc").is_none());
    }

    #[test]
    fn add_prepends_and_persists() {
        let (dir, mut store) = store();
        store
            .add(FocusSource {
                title: "first",
                url: &pr_url(1),
            })
            .unwrap();
        store
            .add(FocusSource {
                title: "second",
                url: &pr_url(2),
            })
            .unwrap();

        let titles: Vec<_> = store.items().iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);

        let reloaded = FocusStore::load(LocalStorage::at(dir.path().to_path_buf()).unwrap());
        assert_eq!(reloaded.items(), store.items());
    }

    #[test]
    fn adding_same_url_twice_is_a_no_op() {
        let (_dir, mut store) = store();
        let url = pr_url(9);
        let first_id = store
            .add(FocusSource { title: "a", url: &url })
            .unwrap()
            .id
            .clone();
        let second_id = store
            .add(FocusSource { title: "b", url: &url })
            .unwrap()
            .id
            .clone();

        assert_eq!(first_id, second_id);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].title, "a");
    }

    #[test]
    fn sixth_item_evicts_the_oldest() {
        let (_dir, mut store) = store();
        for n in 1..=5 {
            store
                .add(FocusSource {
                    title: "item",
                    url: &pr_url(n),
                })
                .unwrap();
        }
        assert!(store.is_full());

        store
            .add(FocusSource {
                title: "newest",
                url: &pr_url(6),
            })
            .unwrap();

        assert_eq!(store.items().len(), MAX_FOCUS_ITEMS);
        assert_eq!(store.items()[0].url, pr_url(6));
        assert!(!store.contains(&pr_url(1)), "oldest item is evicted");
        assert!(store.contains(&pr_url(2)));
    }

    #[test]
    fn invalid_url_is_rejected_without_change() {
        let (_dir, mut store) = store();
        let result = store.add_url("not a url", None);
        assert!(matches!(result, Err(FocusError::InvalidUrl(_))));
        assert!(store.items().is_empty());
    }

    #[test]
    fn add_url_defaults_title_from_kind_and_number() {
        let (_dir, mut store) = store();
        let item = store
            .add_url("  https://github.com/acme/widgets/issues/15  ", Some("   "))
            .unwrap();
        assert_eq!(item.title, "ISSUE #15");
        assert_eq!(item.url, "https://github.com/acme/widgets/issues/15");
        assert_eq!(item.repository, "acme/widgets");

        let item = store.add_url(&pr_url(3), Some("Release blocker")).unwrap();
        assert_eq!(item.title, "Release blocker");
        assert_eq!(item.kind, FocusKind::PullRequest);
    }

    #[test]
    fn remove_and_toggle() {
        let (_dir, mut store) = store();
        let url = pr_url(4);
        assert!(store.toggle(FocusSource { title: "t", url: &url }).unwrap());
        let id = store.find(&url).unwrap().id.clone();

        store.remove("focus-missing").unwrap();
        assert_eq!(store.items().len(), 1);

        assert!(!store.toggle(FocusSource { title: "t", url: &url }).unwrap());
        assert!(store.find(&url).is_none());
        store.remove(&id).unwrap();
    }

    #[test]
    fn corrupt_storage_loads_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("github_focus_items.json"), "[{\"id\": 3}]").unwrap();
        let store = FocusStore::load(LocalStorage::at(dir.path().to_path_buf()).unwrap());
        assert!(store.items().is_empty());
    }
}
