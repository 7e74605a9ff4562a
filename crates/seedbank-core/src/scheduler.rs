// Recurring routine expansion
//
// Routine templates are expanded lazily: the first read of the family's current day
// materializes one PENDING instance per (item, child) and every later read finds them already
// present. Future days are only previewed from the templates as they stand, so edits made
// before the day arrives still apply to it.

use chrono::{DateTime, NaiveDate, Utc};
use seedbank_common::{RoutineTemplate, TaskInstance, TaskStatus};
use seedbank_db::queries::{RoutineQueries, TaskQueries};
use seedbank_db::{Database, NewTaskInstance};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// One instance a day's expansion must guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub template_id: Uuid,
    pub item_id: Uuid,
    pub child_id: Uuid,
    pub title: String,
    pub point_value: i64,
}

impl PlannedTask {
    /// Unsaved instance for `day`. The id is derived from (item, child, day), so repeated
    /// previews agree; the stored instance gets its own id once the day is materialized.
    pub fn preview(&self, family_id: Uuid, day: NaiveDate, now: DateTime<Utc>) -> TaskInstance {
        let key = format!("{}/{}/{}", self.item_id, self.child_id, day);
        TaskInstance {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()),
            family_id,
            template_id: Some(self.template_id),
            item_id: Some(self.item_id),
            child_id: self.child_id,
            title: self.title.clone(),
            point_value: self.point_value,
            status: TaskStatus::Pending,
            day,
            completed_at: None,
            created_at: now,
        }
    }
}

/// Instances due on `day` for the given templates. Inactive templates and templates whose
/// weekday set excludes the day contribute nothing.
pub fn plan_day(templates: &[RoutineTemplate], day: NaiveDate) -> Vec<PlannedTask> {
    let mut planned = Vec::new();

    for template in templates.iter().filter(|t| t.active && t.is_due_on(day)) {
        for child_id in &template.assigned_children {
            for item in &template.items {
                planned.push(PlannedTask {
                    template_id: template.id,
                    item_id: item.id,
                    child_id: *child_id,
                    title: item.title.clone(),
                    point_value: item.point_value,
                });
            }
        }
    }

    planned
}

#[derive(Clone)]
pub struct RecurrenceScheduler {
    db: Database,
}

impl RecurrenceScheduler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ensures every routine instance due on `day` exists. Returns how many were created.
    pub async fn expand(
        &self,
        family_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let templates =
            RoutineQueries::list_for_family(&self.db, &family_id.to_string(), false).await?;
        let planned = plan_day(&templates, day);

        if planned.is_empty() {
            debug!("No routine instances due for family {} on {}", family_id, day);
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;
        let mut created = 0;
        for task in &planned {
            let row = NewTaskInstance {
                id: Uuid::new_v4().to_string(),
                family_id: family_id.to_string(),
                template_id: Some(task.template_id.to_string()),
                item_id: Some(task.item_id.to_string()),
                child_id: task.child_id.to_string(),
                title: task.title.clone(),
                point_value: task.point_value,
                day,
                created_at: now,
            };
            if TaskQueries::insert_if_absent(&mut *tx, &row).await? {
                created += 1;
            }
        }
        tx.commit().await?;

        if created > 0 {
            info!(
                "Materialized {} of {} routine instances for family {} on {}",
                created,
                planned.len(),
                family_id,
                day
            );
        }

        Ok(created)
    }

    /// Instances for `day`. Today is materialized first; past days list only what exists and
    /// future days add a preview of the routine instances not stored yet.
    pub async fn tasks_for_day(
        &self,
        family_id: Uuid,
        child_id: Option<Uuid>,
        day: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskInstance>> {
        if day == today {
            self.expand(family_id, day, now).await?;
        }

        let child = child_id.map(|id| id.to_string());
        let stored = TaskQueries::list_for_day(
            self.db.pool()?,
            &family_id.to_string(),
            child.as_deref(),
            day,
        )
        .await?
        .into_iter()
        .map(|row| TaskInstance::try_from(row).map_err(EngineError::from))
        .collect::<Result<Vec<_>>>()?;

        if day <= today {
            return Ok(stored);
        }

        let templates =
            RoutineQueries::list_for_family(&self.db, &family_id.to_string(), false).await?;
        let mut tasks: Vec<TaskInstance> = plan_day(&templates, day)
            .into_iter()
            .filter(|task| child_id.map_or(true, |id| task.child_id == id))
            .filter(|task| {
                !stored
                    .iter()
                    .any(|s| s.item_id == Some(task.item_id) && s.child_id == task.child_id)
            })
            .map(|task| task.preview(family_id, day, now))
            .collect();

        debug!("Previewing {} routine instances for family {} on {}", tasks.len(), family_id, day);
        tasks.extend(stored);
        Ok(tasks)
    }
}
