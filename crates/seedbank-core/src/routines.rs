use chrono::{DateTime, Utc};
use seedbank_common::{RoutineTemplate, WeekdaySet};
use seedbank_db::queries::{MemberQueries, RoutineQueries};
use seedbank_db::{Database, NewRoutineTemplate, RoutineItemWrite, RoutineTemplateUpdate};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineItemDraft {
    /// Existing item to edit in place; None appends a new item.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    pub point_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Empty means every day.
    #[serde(default)]
    pub weekdays: WeekdaySet,
    pub items: Vec<RoutineItemDraft>,
    #[serde(default)]
    pub child_ids: Vec<Uuid>,
}

impl RoutineDraft {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::validation("routine name must not be empty"));
        }
        if self.items.is_empty() {
            return Err(EngineError::validation("routine needs at least one item"));
        }
        for item in &self.items {
            if item.title.trim().is_empty() {
                return Err(EngineError::validation("routine item title must not be empty"));
            }
            if item.point_value < 0 {
                return Err(EngineError::Validation(format!(
                    "routine item '{}' has negative points",
                    item.title
                )));
            }
        }
        Ok(())
    }

    fn item_writes(&self) -> Vec<RoutineItemWrite> {
        self.items
            .iter()
            .map(|item| RoutineItemWrite {
                id: item.id.map(|id| id.to_string()),
                title: item.title.trim().to_string(),
                point_value: item.point_value,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct RoutineManager {
    db: Database,
}

impl RoutineManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Assigned members must be children of the routine's family.
    async fn child_ids(&self, family_id: Uuid, draft: &RoutineDraft) -> Result<Vec<String>> {
        let children = MemberQueries::list_children(&self.db, &family_id.to_string()).await?;

        let mut ids = Vec::with_capacity(draft.child_ids.len());
        for child_id in &draft.child_ids {
            let id = child_id.to_string();
            if !children.iter().any(|c| c.id == id) {
                return Err(EngineError::Validation(format!(
                    "member {} is not a child of family {}",
                    child_id, family_id
                )));
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    pub async fn create(
        &self,
        family_id: Uuid,
        draft: RoutineDraft,
        now: DateTime<Utc>,
    ) -> Result<RoutineTemplate> {
        draft.validate()?;
        let child_ids = self.child_ids(family_id, &draft).await?;

        let template = RoutineQueries::create(
            &self.db,
            NewRoutineTemplate {
                id: Uuid::new_v4().to_string(),
                family_id: family_id.to_string(),
                name: draft.name.trim().to_string(),
                items: draft.item_writes(),
                description: draft.description,
                weekdays: draft.weekdays,
                child_ids,
                created_at: now,
            },
        )
        .await?;

        info!(
            "Created routine {} with {} items for family {}",
            template.name,
            template.items.len(),
            family_id
        );
        Ok(template)
    }

    /// Rewrites a routine. Already materialized task instances are left untouched.
    pub async fn update(
        &self,
        template: &RoutineTemplate,
        draft: RoutineDraft,
        now: DateTime<Utc>,
    ) -> Result<RoutineTemplate> {
        draft.validate()?;
        let child_ids = self.child_ids(template.family_id, &draft).await?;

        let updated = RoutineQueries::update(
            &self.db,
            RoutineTemplateUpdate {
                id: template.id.to_string(),
                name: draft.name.trim().to_string(),
                items: draft.item_writes(),
                description: draft.description,
                weekdays: draft.weekdays,
                child_ids,
                updated_at: now,
            },
        )
        .await?;

        info!("Updated routine {}", updated.id);
        Ok(updated)
    }

    pub async fn archive(&self, template_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        RoutineQueries::set_active(&self.db, &template_id.to_string(), false, now).await?;
        info!("Archived routine {}", template_id);
        Ok(())
    }

    pub async fn get(&self, template_id: Uuid) -> Result<RoutineTemplate> {
        RoutineQueries::load(&self.db, &template_id.to_string())
            .await?
            .ok_or_else(|| EngineError::not_found("Routine", template_id))
    }

    pub async fn list(&self, family_id: Uuid, include_archived: bool) -> Result<Vec<RoutineTemplate>> {
        Ok(RoutineQueries::list_for_family(&self.db, &family_id.to_string(), include_archived)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RoutineDraft {
        RoutineDraft {
            name: "Morning".to_string(),
            description: None,
            weekdays: WeekdaySet::default(),
            items: vec![RoutineItemDraft { id: None, title: "Brush teeth".to_string(), point_value: 5 }],
            child_ids: vec![],
        }
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut negative = draft();
        negative.items[0].point_value = -1;
        assert!(negative.validate().is_err());

        let mut empty = draft();
        empty.items.clear();
        assert!(empty.validate().is_err());

        let mut unnamed = draft();
        unnamed.name = String::new();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let parsed: RoutineDraft = serde_json::from_value(serde_json::json!({
            "name": "Evening",
            "weekdays": ["MON", "FRI"],
            "items": [{"title": "Homework", "point_value": 10}]
        }))
        .unwrap();

        assert_eq!(parsed.weekdays.to_key_string(), "MON,FRI");
        assert!(parsed.child_ids.is_empty());
        assert!(parsed.items[0].id.is_none());
    }
}
