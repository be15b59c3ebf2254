//! Performers and the session roster.

use incruste_common::config::PerformerEntry;
use serde::{Deserialize, Serialize};

/// Static per-session identity of a performer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performer {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Performer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

impl Default for Performer {
    fn default() -> Self {
        PerformerEntry::default().into()
    }
}

impl From<PerformerEntry> for Performer {
    fn from(entry: PerformerEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            color: entry.color,
        }
    }
}

/// The performers of a session plus which one the editing controls drive.
#[derive(Debug, Clone)]
pub struct PerformerRoster {
    performers: Vec<Performer>,
    selected: usize,
}

impl PerformerRoster {
    /// Build a roster. An empty list falls back to the default performer.
    pub fn new(performers: Vec<Performer>) -> Self {
        let performers = if performers.is_empty() {
            vec![Performer::default()]
        } else {
            performers
        };
        Self {
            performers,
            selected: 0,
        }
    }

    pub fn from_entries(entries: &[PerformerEntry]) -> Self {
        Self::new(entries.iter().cloned().map(Performer::from).collect())
    }

    pub fn performers(&self) -> &[Performer] {
        &self.performers
    }

    /// The performer that mark-in currently targets.
    pub fn selected(&self) -> &Performer {
        &self.performers[self.selected]
    }

    /// Select a performer by id. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> Option<&Performer> {
        let idx = self.performers.iter().position(|p| p.id == id)?;
        self.selected = idx;
        Some(&self.performers[idx])
    }

    pub fn get(&self, id: &str) -> Option<&Performer> {
        self.performers.iter().find(|p| p.id == id)
    }
}

impl Default for PerformerRoster {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roster_gets_default_performer() {
        let roster = PerformerRoster::new(vec![]);
        assert_eq!(roster.performers().len(), 1);
        assert_eq!(roster.selected().id, "p1");
    }

    #[test]
    fn select_switches_target() {
        let mut roster = PerformerRoster::new(vec![
            Performer::new("p1", "Lead", "#ef4444"),
            Performer::new("p2", "Double", "#3b82f6"),
        ]);
        assert_eq!(roster.selected().id, "p1");
        assert_eq!(roster.select("p2").map(|p| p.name.as_str()), Some("Double"));
        assert_eq!(roster.selected().id, "p2");
    }

    #[test]
    fn unknown_selection_keeps_current() {
        let mut roster = PerformerRoster::default();
        assert!(roster.select("ghost").is_none());
        assert_eq!(roster.selected().id, "p1");
        assert!(roster.get("ghost").is_none());
    }
}
