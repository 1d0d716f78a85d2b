//! Escalation filters and cursor pagination

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::model::{Escalation, ProjectId, Responsibility, ResponsibilityId};
use crate::projects::ProjectKey;

/// Opaque page position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    const PREFIX: &'static str = "offset:";

    pub(crate) fn at(offset: usize) -> Self {
        Self(format!("{}{}", Self::PREFIX, offset))
    }

    pub(crate) fn offset(&self) -> TrackerResult<usize> {
        self.0
            .strip_prefix(Self::PREFIX)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| TrackerError::validation("cursor", "invalid cursor"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filter for escalation listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationFilter {
    /// Owning project by id or code
    pub project: Option<ProjectKey>,
    pub responsibility_id: Option<ResponsibilityId>,
    /// `None` lists both open and resolved
    pub resolved: Option<bool>,
    /// Inclusive lower bound on the creation date
    pub created_from: Option<NaiveDate>,
    /// Inclusive upper bound on the creation date
    pub created_to: Option<NaiveDate>,
    pub page_size: Option<usize>,
    pub cursor: Option<Cursor>,
}

impl EscalationFilter {
    pub fn open() -> Self {
        Self {
            resolved: Some(false),
            ..Default::default()
        }
    }

    pub fn resolved() -> Self {
        Self {
            resolved: Some(true),
            ..Default::default()
        }
    }

    pub fn for_project(mut self, project: impl Into<ProjectKey>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn for_responsibility(mut self, responsibility_id: ResponsibilityId) -> Self {
        self.responsibility_id = Some(responsibility_id);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub(crate) fn validate(&self) -> TrackerResult<()> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(TrackerError::validation(
                    "created_from",
                    "created_from must not be after created_to",
                ));
            }
        }
        Ok(())
    }

    /// Row-level predicate; the project constraint is applied by the caller
    /// once it has resolved the project's responsibilities.
    pub(crate) fn matches(&self, escalation: &Escalation) -> bool {
        if let Some(resolved) = self.resolved {
            if escalation.resolved != resolved {
                return false;
            }
        }
        if let Some(id) = self.responsibility_id {
            if escalation.responsibility_id != id {
                return false;
            }
        }
        let day = escalation.created_at.date_naive();
        if self.created_from.is_some_and(|from| day < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| day > to) {
            return false;
        }
        true
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total matching rows across all pages
    pub count: usize,
    pub results: Vec<T>,
    pub next: Option<Cursor>,
    pub previous: Option<Cursor>,
}

impl<T> Page<T> {
    /// Slice `rows` at `cursor`
    pub(crate) fn paginate(
        rows: Vec<T>,
        cursor: Option<&Cursor>,
        size: usize,
    ) -> TrackerResult<Self> {
        let count = rows.len();
        let offset = match cursor {
            Some(c) => c.offset()?,
            None => 0,
        };
        if offset > count {
            return Err(TrackerError::validation("cursor", "cursor is past the end"));
        }
        let size = size.max(1);
        let results: Vec<T> = rows.into_iter().skip(offset).take(size).collect();
        let end = offset + results.len();

        Ok(Self {
            count,
            results,
            next: (end < count).then(|| Cursor::at(end)),
            previous: (offset > 0).then(|| Cursor::at(offset.saturating_sub(size))),
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            results: self.results.into_iter().map(f).collect(),
            next: self.next,
            previous: self.previous,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Escalation joined with its responsibility and owning project
#[derive(Debug, Clone)]
pub(crate) struct Scoped {
    pub escalation: Escalation,
    pub responsibility: Responsibility,
    pub project_id: ProjectId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_walks_forward_and_back() {
        let rows: Vec<u32> = (1..=5).collect();
        let first = Page::paginate(rows.clone(), None, 2).unwrap();
        assert_eq!(first.count, 5);
        assert_eq!(first.results, vec![1, 2]);
        assert!(first.previous.is_none());

        let second = Page::paginate(rows.clone(), first.next.as_ref(), 2).unwrap();
        assert_eq!(second.results, vec![3, 4]);

        let third = Page::paginate(rows.clone(), second.next.as_ref(), 2).unwrap();
        assert_eq!(third.results, vec![5]);
        assert!(third.next.is_none());

        let back = Page::paginate(rows, third.previous.as_ref(), 2).unwrap();
        assert_eq!(back.results, vec![3, 4]);
    }

    #[test]
    fn test_bad_cursor_rejected() {
        let err = Page::paginate(vec![1, 2], Some(&Cursor::from("garbage".to_string())), 10)
            .unwrap_err();
        assert_eq!(err.field(), Some("cursor"));
    }

    #[test]
    fn test_date_range_validation() {
        let filter = EscalationFilter {
            created_from: NaiveDate::from_ymd_opt(2024, 2, 1),
            created_to: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }
}
