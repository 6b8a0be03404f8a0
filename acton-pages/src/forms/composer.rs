//! Form and grid composer with reuse-vs-rebuild memoization

use std::sync::Arc;

use super::{
    ComposedField, ComposedForm, ComposedToolbar, FormKey, FormSection, GridColumn, GridLayout,
    ToolbarVisibility,
};
use crate::crud::CrudContext;
use crate::definitions::{DetailDefinition, DetailLine, FieldLine, GridDefinition};
use crate::error::ConfigError;
use crate::introspect::FieldIntrospector;
use crate::model::{Entity, SemanticType};
use crate::registry::{DataProvider, EntityOptions, EntityTypeRegistry};

/// Whether [`FormComposer::apply`] kept or replaced the current form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Same key: values rebound into the existing form
    Reused,
    /// New form built and installed
    Rebuilt,
}

/// Form prepared for an entity but not yet installed in a context
///
/// Produced by [`FormComposer::stage`]. Options can be loaded into a rebuilt
/// form before [`StagedForm::install`] swaps it in.
#[derive(Debug)]
pub enum StagedForm {
    /// The context's current form serves the entity
    Reuse,
    /// A newly built form replaces the current one
    Rebuild {
        /// Key of the new form
        key: FormKey,
        /// Bound form
        form: ComposedForm,
        /// Toolbar matching the form
        toolbar: ComposedToolbar,
    },
}

impl StagedForm {
    /// Outcome reported once installed
    #[must_use]
    pub const fn outcome(&self) -> ComposeOutcome {
        match self {
            Self::Reuse => ComposeOutcome::Reused,
            Self::Rebuild { .. } => ComposeOutcome::Rebuilt,
        }
    }

    /// The new form, when one was built
    #[must_use]
    pub const fn form(&self) -> Option<&ComposedForm> {
        match self {
            Self::Reuse => None,
            Self::Rebuild { form, .. } => Some(form),
        }
    }

    /// The new form, mutably
    pub fn form_mut(&mut self) -> Option<&mut ComposedForm> {
        match self {
            Self::Reuse => None,
            Self::Rebuild { form, .. } => Some(form),
        }
    }

    /// Make `ctx` show `entity` with the staged form
    pub fn install(self, ctx: &mut CrudContext, entity: &dyn Entity) -> ComposeOutcome {
        let outcome = self.outcome();
        match self {
            Self::Reuse => {
                if let Some(form) = ctx.form.as_mut() {
                    form.bind(entity);
                    tracing::trace!(form = %form.id(), key = %form.key(), "Reused form");
                }
                if let Some(toolbar) = ctx.toolbar.as_mut() {
                    toolbar.update(Some(entity));
                }
            }
            Self::Rebuild { key, form, mut toolbar } => {
                toolbar.update(Some(entity));
                ctx.form_key = Some(key);
                ctx.form = Some(form);
                ctx.toolbar = Some(toolbar);
            }
        }
        outcome
    }
}

/// Builds composed forms and grid layouts from definitions
#[derive(Debug, Clone)]
pub struct FormComposer {
    registry: Arc<EntityTypeRegistry>,
    introspector: Arc<FieldIntrospector>,
    reuse_forms: bool,
}

impl FormComposer {
    /// Create a composer that reuses forms when the key is unchanged
    #[must_use]
    pub const fn new(registry: Arc<EntityTypeRegistry>, introspector: Arc<FieldIntrospector>) -> Self {
        Self {
            registry,
            introspector,
            reuse_forms: true,
        }
    }

    /// Enable or disable form reuse
    #[must_use]
    pub const fn with_reuse(mut self, reuse_forms: bool) -> Self {
        self.reuse_forms = reuse_forms;
        self
    }

    /// Memoization key of an entity's form
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredEntityType`] or
    /// [`ConfigError::MissingViewName`].
    pub fn form_key(&self, entity: &dyn Entity) -> Result<FormKey, ConfigError> {
        let descriptor = self.registry.resolve(entity.entity_key())?;
        Ok(FormKey {
            entity_type: descriptor.entity_type_key(),
            view_name: descriptor.view_name()?,
        })
    }

    /// Build a new form for `entity` and bind its values
    ///
    /// Every field line must resolve against the entity type, or against the
    /// referenced type for relation lines.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] hit while resolving the definition.
    pub fn compose(
        &self,
        detail: &DetailDefinition,
        entity: &dyn Entity,
    ) -> Result<ComposedForm, ConfigError> {
        let key = self.form_key(entity)?;
        if detail.entity_type != key.entity_type {
            return Err(ConfigError::EntityTypeMismatch {
                expected: detail.entity_type.clone(),
                actual: key.entity_type.to_string(),
            });
        }
        if detail.name != key.view_name {
            tracing::warn!(
                detail = detail.id,
                detail_name = %detail.name,
                view_name = key.view_name,
                "Detail definition name differs from the entity view name"
            );
        }

        let mut fields = Vec::new();
        let mut sections: Vec<FormSection> = Vec::new();
        let mut providers = Vec::new();
        for line in &detail.lines {
            match line {
                DetailLine::Section(section) => sections.push(FormSection {
                    name: Some(section.section.clone()),
                    fields: Vec::new(),
                }),
                DetailLine::Field(line) => {
                    let field = self.compose_field(key.entity_type, line)?;
                    let index = fields.len();
                    if let Some(provider) = self.resolve_provider(&field)? {
                        providers.push((index, provider));
                    }
                    match sections.last_mut() {
                        Some(section) => section.fields.push(index),
                        None => sections.push(FormSection {
                            name: None,
                            fields: vec![index],
                        }),
                    }
                    fields.push(field);
                }
            }
        }

        let mut form = ComposedForm::new(key, detail.id, fields, sections, providers);
        form.bind(entity);
        tracing::debug!(
            form = %form.id(),
            key = %key,
            fields = form.fields().len(),
            "Composed form"
        );
        Ok(form)
    }

    fn compose_field(&self, entity_type: &str, line: &FieldLine) -> Result<ComposedField, ConfigError> {
        let Some(relation) = &line.relation else {
            let metadata = self.introspector.field(entity_type, &line.field)?;
            return Ok(ComposedField::new(
                metadata,
                line.caption.as_deref(),
                None,
                line.data_provider.as_deref(),
            ));
        };

        let reference = self.introspector.field(entity_type, relation)?;
        let target = match (reference.semantic_type, reference.reference_target) {
            (SemanticType::Reference, Some(target)) => target,
            _ => {
                return Err(ConfigError::InvalidRelation {
                    entity_type: entity_type.to_string(),
                    relation: relation.clone(),
                })
            }
        };
        let metadata = self.introspector.field(target, &line.field)?;
        Ok(ComposedField::new(
            metadata,
            line.caption.as_deref(),
            Some(relation),
            line.data_provider.as_deref(),
        ))
    }

    fn resolve_provider(
        &self,
        field: &ComposedField,
    ) -> Result<Option<Arc<dyn DataProvider>>, ConfigError> {
        if let Some(locator) = &field.data_provider {
            return self
                .registry
                .resolve_data_provider(locator)
                .map(Some)
                .ok_or_else(|| ConfigError::UnresolvedDataProvider {
                    field: field.path.clone(),
                    locator: locator.clone(),
                });
        }
        if field.relation.is_some() || field.flags.hidden {
            return Ok(None);
        }
        match field.metadata.reference_target {
            Some(target) if field.metadata.semantic_type == SemanticType::Reference => {
                let descriptor = self.registry.resolve(target)?;
                Ok(Some(Arc::new(EntityOptions::new(Arc::clone(
                    descriptor.data_service(),
                )))))
            }
            _ => Ok(None),
        }
    }

    /// Validated column layout of a grid definition
    ///
    /// A grid without columns lists every visible field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredEntityType`] or
    /// [`ConfigError::UnknownField`] for columns that do not resolve.
    pub fn compose_grid(&self, grid: &GridDefinition) -> Result<GridLayout, ConfigError> {
        let descriptor = self.registry.resolve(&grid.entity_type)?;
        let entity_type = descriptor.entity_type_key();

        let columns = if grid.columns.is_empty() {
            self.introspector
                .describe_fields(entity_type)?
                .iter()
                .filter(|field| !field.hidden)
                .map(|field| GridColumn {
                    field: field.name.to_string(),
                    caption: field.display_name.clone(),
                    semantic: field.semantic_type,
                })
                .collect()
        } else {
            grid.columns
                .iter()
                .map(|column| {
                    self.introspector
                        .field(entity_type, column)
                        .map(|field| GridColumn {
                            field: field.name.to_string(),
                            caption: field.display_name,
                            semantic: field.semantic_type,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(GridLayout {
            grid_id: grid.id,
            entity_type,
            columns,
        })
    }

    /// Decide between reuse and rebuild for `entity` without touching `ctx`
    ///
    /// The form is reused when its key equals the entity's key; otherwise a
    /// new form is built.
    ///
    /// # Errors
    ///
    /// Propagates composition errors.
    pub fn stage(
        &self,
        ctx: &CrudContext,
        detail: &DetailDefinition,
        entity: &dyn Entity,
        visibility: ToolbarVisibility,
    ) -> Result<StagedForm, ConfigError> {
        let key = self.form_key(entity)?;
        if self.reuse_forms && ctx.form_key == Some(key) && ctx.form.is_some() {
            return Ok(StagedForm::Reuse);
        }
        Ok(StagedForm::Rebuild {
            key,
            form: self.compose(detail, entity)?,
            toolbar: ComposedToolbar::new(visibility),
        })
    }

    /// Show `entity` in the context's detail form, reusing the form when possible
    ///
    /// # Errors
    ///
    /// Propagates composition errors; `ctx` is unchanged on error.
    pub fn apply(
        &self,
        ctx: &mut CrudContext,
        detail: &DetailDefinition,
        entity: &dyn Entity,
        visibility: ToolbarVisibility,
    ) -> Result<ComposeOutcome, ConfigError> {
        let staged = self.stage(ctx, detail, entity, visibility)?;
        Ok(staged.install(ctx, entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::FieldLine;
    use crate::model::{EntityId, EntityRef};
    use crate::registry::{EntityServices, StaticOptions};
    use crate::storage::InMemoryStore;

    #[derive(Debug, Clone, Default, crate::Entity)]
    #[entity(key = "Board", view_name = "Boards View")]
    struct Board {
        #[field(id)]
        id: Option<EntityId>,
        #[field(required)]
        name: String,
    }

    #[derive(Debug, Clone, Default, crate::Entity)]
    #[entity(key = "Card", view_name = "Cards View")]
    struct Card {
        #[field(id)]
        id: Option<EntityId>,
        #[field(required)]
        title: String,
        board: Option<EntityRef<Board>>,
        #[field(data_provider = "sizes")]
        size: String,
        archived: bool,
    }

    #[derive(Debug, Clone, Default, crate::Entity)]
    #[entity(key = "Lane", view_name = "Cards View")]
    struct Lane {
        #[field(id)]
        id: Option<EntityId>,
        title: String,
    }

    fn composer() -> FormComposer {
        let mut registry = EntityTypeRegistry::new();
        registry
            .register(EntityServices::new(InMemoryStore::<Board>::new()))
            .unwrap()
            .register(EntityServices::new(InMemoryStore::<Card>::new()))
            .unwrap()
            .register(EntityServices::new(InMemoryStore::<Lane>::new()))
            .unwrap()
            .register_data_provider("sizes", StaticOptions::from_labels(["S", "M", "L"]))
            .unwrap();
        let registry = Arc::new(registry);
        FormComposer::new(
            Arc::clone(&registry),
            Arc::new(FieldIntrospector::new(registry)),
        )
    }

    fn card_detail() -> DetailDefinition {
        DetailDefinition::new(1, "Cards View", "Card")
            .field("title")
            .section("Placement")
            .line(FieldLine::new("board").caption("On board"))
            .line(FieldLine::new("name").relation("board").caption("Board name"))
            .field("size")
            .section("State")
            .field("archived")
    }

    fn card() -> Card {
        Card {
            id: Some(7),
            title: "Ship it".to_string(),
            board: Some(EntityRef::new(1)),
            ..Card::default()
        }
    }

    #[test]
    fn test_compose_groups_fields_into_sections() {
        let form = composer().compose(&card_detail(), &card()).unwrap();
        let names: Vec<_> = form
            .sections()
            .iter()
            .map(|section| section.name.as_deref())
            .collect();
        assert_eq!(names, vec![None, Some("Placement"), Some("State")]);
        assert_eq!(form.section("Placement").unwrap().fields, vec![1, 2, 3]);

        let board_name = form.field("board.name").unwrap();
        assert!(board_name.flags.read_only);
        assert_eq!(board_name.caption, "Board name");
        assert_eq!(form.field("title").unwrap().value.to_string(), "Ship it");
        assert_eq!(form.relations(), vec!["board"]);
    }

    #[test]
    fn test_unknown_field_fails_fast() {
        let detail = DetailDefinition::new(1, "Cards View", "Card").field("colour");
        assert!(matches!(
            composer().compose(&detail, &card()),
            Err(ConfigError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_relation_must_be_reference() {
        let detail = DetailDefinition::new(1, "Cards View", "Card")
            .line(FieldLine::new("name").relation("title"));
        assert_eq!(
            composer().compose(&detail, &card()).unwrap_err(),
            ConfigError::InvalidRelation {
                entity_type: "Card".to_string(),
                relation: "title".to_string(),
            }
        );
    }

    #[test]
    fn test_unresolved_data_provider() {
        let detail = DetailDefinition::new(1, "Cards View", "Card")
            .line(FieldLine::new("title").data_provider("titles"));
        assert!(matches!(
            composer().compose(&detail, &card()),
            Err(ConfigError::UnresolvedDataProvider { .. })
        ));
    }

    #[test]
    fn test_apply_reuses_same_key_and_rebuilds_on_change() {
        let composer = composer();
        let detail = card_detail();
        let mut ctx = CrudContext::default();

        let outcome = composer
            .apply(&mut ctx, &detail, &card(), ToolbarVisibility::default())
            .unwrap();
        assert_eq!(outcome, ComposeOutcome::Rebuilt);
        let first = ctx.form().unwrap().id();

        let other = Card {
            id: Some(8),
            title: "Other".to_string(),
            ..Card::default()
        };
        let outcome = composer
            .apply(&mut ctx, &detail, &other, ToolbarVisibility::default())
            .unwrap();
        assert_eq!(outcome, ComposeOutcome::Reused);
        assert_eq!(ctx.form().unwrap().id(), first);
        assert_eq!(ctx.form().unwrap().field("title").unwrap().value.to_string(), "Other");

        let lane_detail = DetailDefinition::new(2, "Cards View", "Lane").field("title");
        let outcome = composer
            .apply(&mut ctx, &lane_detail, &Lane::default(), ToolbarVisibility::default())
            .unwrap();
        assert_eq!(outcome, ComposeOutcome::Rebuilt);
        assert_ne!(ctx.form().unwrap().id(), first);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_form() {
        let composer = composer();
        let mut ctx = CrudContext::default();
        composer
            .apply(&mut ctx, &card_detail(), &card(), ToolbarVisibility::default())
            .unwrap();
        let first = ctx.form().unwrap().id();

        let broken = DetailDefinition::new(2, "Cards View", "Lane").field("missing");
        assert!(composer
            .apply(&mut ctx, &broken, &Lane::default(), ToolbarVisibility::default())
            .is_err());
        assert_eq!(ctx.form().unwrap().id(), first);
        assert_eq!(ctx.form_key().unwrap().entity_type, "Card");
    }

    #[test]
    fn test_reuse_can_be_disabled() {
        let composer = composer().with_reuse(false);
        let mut ctx = CrudContext::default();
        let detail = card_detail();
        composer
            .apply(&mut ctx, &detail, &card(), ToolbarVisibility::default())
            .unwrap();
        let outcome = composer
            .apply(&mut ctx, &detail, &card(), ToolbarVisibility::default())
            .unwrap();
        assert_eq!(outcome, ComposeOutcome::Rebuilt);
    }

    #[tokio::test]
    async fn test_reference_and_provider_options() {
        let composer = composer();
        let mut form = composer.compose(&card_detail(), &card()).unwrap();
        form.load_options().await.unwrap();

        let sizes: Vec<_> = form
            .field("size")
            .unwrap()
            .options()
            .iter()
            .map(|option| option.value.clone())
            .collect();
        assert_eq!(sizes, vec!["", "S", "M", "L"]);
        assert_eq!(form.field("board").unwrap().options().len(), 1);
    }

    #[test]
    fn test_compose_grid_validates_columns() {
        let composer = composer();
        let layout = composer
            .compose_grid(&GridDefinition::new(3, "Card", ["title", "archived"]))
            .unwrap();
        assert_eq!(layout.columns[1].caption, "Archived");

        let err = composer
            .compose_grid(&GridDefinition::new(3, "Card", ["nope"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField { .. }));

        let all = composer.compose_grid(&GridDefinition::new(4, "Board", Vec::<String>::new())).unwrap();
        assert_eq!(all.columns.len(), 2);
    }
}
