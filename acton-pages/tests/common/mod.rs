//! Shared fixture: a small activity-tracking domain
//!
//! Statuses are referenced by activities and workflows. Status 2 ("In
//! Progress") is used by three activities, status 4 ("Archived") by nothing,
//! status 5 ("System") is flagged non-deletable.

#![allow(dead_code)]

use acton_pages::crud::RecordingNotifier;
use acton_pages::prelude::*;
use acton_pages::storage::InMemoryStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Default, FieldSet)]
pub struct NamedBase {
    #[field(id)]
    pub id: Option<EntityId>,
    #[field(required, max_length = 60)]
    pub name: String,
    #[field(max_length = 1000)]
    pub description: String,
}

pub fn named(id: EntityId, name: &str) -> NamedBase {
    NamedBase {
        id: Some(id),
        name: name.to_string(),
        description: String::new(),
    }
}

#[derive(Debug, Clone, Default, Entity, Validate)]
#[entity(key = "ActivityStatus", view_name = "Activity Status View")]
pub struct ActivityStatus {
    #[field(embed)]
    pub base: NamedBase,
    #[field(label = "Colour", data_provider = "StatusColors")]
    pub color: String,
    #[validate(range(min = 0, max = 999))]
    pub sort_order: i32,
    #[field(non_deletable, read_only)]
    pub system: bool,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(key = "Activity", view_name = "Activities View")]
pub struct Activity {
    #[field(embed)]
    pub base: NamedBase,
    pub status: Option<EntityRef<ActivityStatus>>,
    #[field(label = "Estimate (hours)")]
    pub estimate: f64,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(key = "Workflow", view_name = "Workflows View")]
pub struct Workflow {
    #[field(embed)]
    pub base: NamedBase,
    pub initial_status: Option<EntityRef<ActivityStatus>>,
    pub final_status: Option<EntityRef<ActivityStatus>>,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(key = "SystemSettings", view_name = "System Settings View")]
pub struct SystemSettings {
    #[field(id)]
    pub id: Option<EntityId>,
    #[field(required)]
    pub company_name: String,
    #[field(label = "Session timeout (minutes)")]
    pub session_timeout: u32,
    pub maintenance_mode: bool,
}

/// Status persistence with the usage rules of the domain
pub struct ActivityStatusService {
    statuses: Arc<InMemoryStore<ActivityStatus>>,
    activities: Arc<InMemoryStore<Activity>>,
    workflows: Arc<InMemoryStore<Workflow>>,
    usage_checks: Arc<AtomicUsize>,
}

#[async_trait]
impl DataService<ActivityStatus> for ActivityStatusService {
    fn new_entity(&self) -> ActivityStatus {
        ActivityStatus {
            sort_order: i32::try_from(self.statuses.len() + 1).unwrap_or(i32::MAX),
            ..ActivityStatus::default()
        }
    }

    async fn list(&self) -> Result<Vec<ActivityStatus>, ServiceError> {
        let mut rows = self.statuses.list().await?;
        rows.sort_by_key(|status| status.sort_order);
        Ok(rows)
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<ActivityStatus>, ServiceError> {
        self.statuses.get_by_id(id).await
    }

    async fn save(&self, entity: ActivityStatus) -> Result<ActivityStatus, ServiceError> {
        self.statuses.save(entity).await
    }

    async fn delete(&self, id: EntityId) -> Result<(), ServiceError> {
        self.statuses.delete(id).await
    }

    fn delete_checks(&self, chain: DeleteChain<ActivityStatus>) -> DeleteChain<ActivityStatus> {
        let activities = Arc::clone(&self.activities);
        let workflows = Arc::clone(&self.workflows);
        let usage_checks = Arc::clone(&self.usage_checks);
        chain
            .then_fn("used_by_activities", move |status| {
                usage_checks.fetch_add(1, Ordering::SeqCst);
                let id = status.base.id?;
                let used = activities.count_where(|activity| {
                    activity.status.map(|status| status.id()) == Some(id)
                });
                let noun = if used == 1 { "activity" } else { "activities" };
                (used > 0).then(|| format!("Cannot delete: this status is used by {used} {noun}"))
            })
            .then_fn("used_by_workflows", move |status| {
                let id = status.base.id?;
                let names: Vec<String> = workflows
                    .find_where(|workflow| {
                        [workflow.initial_status, workflow.final_status]
                            .iter()
                            .flatten()
                            .any(|status| status.id() == id)
                    })
                    .into_iter()
                    .map(|workflow| workflow.base.name)
                    .collect();
                (!names.is_empty()).then(|| {
                    format!("Cannot delete: this status is used in workflows: {}", names.join(", "))
                })
            })
    }

    async fn validate_save(
        &self,
        entity: &ActivityStatus,
        errors: &mut ValidationErrors,
    ) -> Result<(), ServiceError> {
        if let Err(invalid) = entity.validate() {
            errors.merge(&invalid.into());
        }
        let duplicate = self.statuses.count_where(|other| {
            other.base.id != entity.base.id && other.base.name.eq_ignore_ascii_case(&entity.base.name)
        });
        if duplicate > 0 {
            errors.add("name", format!("A status named '{}' already exists", entity.base.name));
        }
        Ok(())
    }
}

struct SettingsPages;

impl PageBehavior<SystemSettings> for SettingsPages {
    fn toolbar(&self) -> Option<ToolbarVisibility> {
        Some(ToolbarVisibility::from_tuple((
            false, true, false, true, false, false,
        )))
    }
}

struct SettingsDefaults;

impl Initializer<SystemSettings> for SettingsDefaults {
    fn initialize(&self, entity: &mut SystemSettings) {
        entity.session_timeout = 30;
    }
}

pub const DEFINITIONS: &str = r#"
[[pages]]
id = 1
title = "Activity Statuses"
grid = 10
detail = 20

[[pages]]
id = 2
title = "Activities"
grid = 11
detail = 21

[[pages]]
id = 3
title = "Workflows"
grid = 12
detail = 22

[[pages]]
id = 5
title = "System Settings"
grid = 13
detail = 23

[[pages]]
id = 9
title = "Administration"
requires_authentication = true
detail = 23

[[grids]]
id = 10
entity_type = "ActivityStatus"
columns = ["name", "color", "sort_order"]

[[grids]]
id = 11
entity_type = "Activity"
columns = ["name", "status", "estimate"]

[[grids]]
id = 12
entity_type = "Workflow"
columns = ["name"]
data_provider = "WorkflowService"

[[grids]]
id = 13
entity_type = "SystemSettings"
attribute_none = true

[[details]]
id = 20
name = "Activity Status View"
entity_type = "ActivityStatus"
lines = [
    { section = "Basic" },
    { field = "name" },
    { field = "description" },
    { section = "Display" },
    { field = "color" },
    { field = "sort_order", caption = "Order" },
    { field = "system" },
]

[[details]]
id = 21
name = "Activities View"
entity_type = "Activity"
lines = [
    { field = "name" },
    { field = "status" },
    { field = "color", relation = "status", caption = "Status colour" },
    { field = "estimate" },
]

[[details]]
id = 22
name = "Workflows View"
entity_type = "Workflow"
lines = [
    { field = "name" },
    { field = "initial_status" },
    { field = "final_status" },
]

[[details]]
id = 23
name = "System Settings View"
entity_type = "SystemSettings"
lines = [
    { field = "company_name" },
    { field = "session_timeout" },
    { field = "maintenance_mode" },
]
"#;

/// Stores, registry and notifier of one test
pub struct Fixture {
    pub statuses: Arc<InMemoryStore<ActivityStatus>>,
    pub activities: Arc<InMemoryStore<Activity>>,
    pub workflows: Arc<InMemoryStore<Workflow>>,
    pub settings: Arc<InMemoryStore<SystemSettings>>,
    pub usage_checks: Arc<AtomicUsize>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Fixture {
    pub fn new() -> Self {
        let status = |id, name: &str, sort_order, color: &str| ActivityStatus {
            base: named(id, name),
            color: color.to_string(),
            sort_order,
            system: false,
        };
        let statuses = InMemoryStore::with_rows(vec![
            status(1, "Open", 1, "#1565c0"),
            status(2, "In Progress", 2, "#f9a825"),
            status(3, "Done", 3, "#2e7d32"),
            status(4, "Archived", 4, "#757575"),
            ActivityStatus {
                system: true,
                ..status(5, "System", 5, "#000000")
            },
        ]);

        let activity = |id, name: &str, status: EntityId| Activity {
            base: named(id, name),
            status: Some(EntityRef::new(status)),
            estimate: 1.5,
        };
        let activities = InMemoryStore::with_rows(vec![
            activity(40, "Write notes", 2),
            activity(41, "Review", 2),
            activity(42, "Ship release", 2),
            activity(43, "Plan sprint", 1),
        ]);

        let workflows = InMemoryStore::with_rows(vec![
            Workflow {
                base: named(1, "Default"),
                initial_status: Some(EntityRef::new(1)),
                final_status: Some(EntityRef::new(3)),
            },
            Workflow {
                base: named(2, "Fast track"),
                initial_status: Some(EntityRef::new(3)),
                final_status: None,
            },
        ]);

        let settings = InMemoryStore::with_rows(vec![SystemSettings {
            id: Some(1),
            company_name: "Acme".to_string(),
            session_timeout: 45,
            maintenance_mode: false,
        }]);

        Self {
            statuses: Arc::new(statuses),
            activities: Arc::new(activities),
            workflows: Arc::new(workflows),
            settings: Arc::new(settings),
            usage_checks: Arc::new(AtomicUsize::new(0)),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    pub fn registry(&self) -> EntityTypeRegistry {
        let mut registry = EntityTypeRegistry::new();
        registry
            .register(
                EntityServices::new(ActivityStatusService {
                    statuses: Arc::clone(&self.statuses),
                    activities: Arc::clone(&self.activities),
                    workflows: Arc::clone(&self.workflows),
                    usage_checks: Arc::clone(&self.usage_checks),
                })
                .titles("Activity Status", "Activity Statuses"),
            )
            .unwrap()
            .register(EntityServices::from_arc(Arc::clone(&self.activities)))
            .unwrap()
            .register(EntityServices::from_arc(Arc::clone(&self.workflows)))
            .unwrap()
            .register(
                EntityServices::from_arc(Arc::clone(&self.settings))
                    .page_behavior(SettingsPages)
                    .initializer(SettingsDefaults)
                    .titles("System Settings", "System Settings"),
            )
            .unwrap()
            .register_data_provider(
                "StatusColors",
                StaticOptions::from_labels(["#1565c0", "#f9a825", "#2e7d32", "#757575"]),
            )
            .unwrap();
        registry
    }

    pub fn engine(&self) -> PageEngine {
        self.engine_with(ActonPagesConfig::default())
    }

    pub fn engine_with(&self, config: ActonPagesConfig) -> PageEngine {
        let store = InMemoryDefinitionStore::from_toml_str(DEFINITIONS).unwrap();
        store.validate().unwrap();
        PageEngine::with_config(config, Arc::new(self.registry()), Arc::new(store))
            .with_notifier(Arc::clone(&self.notifier) as Arc<dyn Notifier>)
    }

    pub fn usage_checks(&self) -> usize {
        self.usage_checks.load(Ordering::SeqCst)
    }
}

/// Router already showing `token`
pub async fn open(engine: &PageEngine, token: &str) -> Router {
    let mut router = engine.router();
    router.navigate(token, &Actor::Anonymous).await.unwrap();
    router
}
