//! Mapping profiles derived from ORM metadata, cached per context.

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use sqlbulk_core::{DbContext, Model, Result};

use super::{MappingProfile, MappingResolver};

/// Cache of profiles keyed by (context type, model type).
///
/// Concurrent first access for the same pair may build the profile more than
/// once, but every caller receives the one instance that won the insert.
#[derive(Debug, Default)]
pub struct ModelMetadata {
    profiles: DashMap<(TypeId, TypeId), Arc<MappingProfile>>,
}

impl ModelMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache.
    pub fn global() -> &'static Arc<ModelMetadata> {
        static GLOBAL: OnceLock<Arc<ModelMetadata>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(ModelMetadata::new()))
    }

    /// Profile for model `T` in context `Ctx`, built on first use.
    pub fn get_or_create<Ctx: DbContext, T: Model>(&self) -> Result<Arc<MappingProfile>> {
        let key = (TypeId::of::<Ctx>(), TypeId::of::<T>());
        if let Some(found) = self.profiles.get(&key) {
            return Ok(Arc::clone(found.value()));
        }

        let built = Arc::new(MappingProfile::from_model::<T>(Ctx::default_schema())?);
        let entry = self.profiles.entry(key).or_insert_with(|| {
            tracing::debug!(
                type_name = built.type_name(),
                table = built.table().quoted_name(),
                "Cached model mapping"
            );
            Arc::clone(&built)
        });
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Resolver for models of one [`DbContext`].
pub struct ContextMappings<Ctx> {
    cache: Arc<ModelMetadata>,
    _ctx: PhantomData<fn() -> Ctx>,
}

impl<Ctx> Clone for ContextMappings<Ctx> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            _ctx: PhantomData,
        }
    }
}

impl<Ctx: DbContext> ContextMappings<Ctx> {
    /// Resolve through the process-wide cache.
    pub fn new() -> Self {
        Self::with_cache(Arc::clone(ModelMetadata::global()))
    }

    pub fn with_cache(cache: Arc<ModelMetadata>) -> Self {
        Self {
            cache,
            _ctx: PhantomData,
        }
    }

    pub fn cache(&self) -> &Arc<ModelMetadata> {
        &self.cache
    }
}

impl<Ctx: DbContext> Default for ContextMappings<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx: DbContext, T: Model> MappingResolver<T> for ContextMappings<Ctx> {
    fn resolve_mapping(&self, name: Option<&str>) -> Result<Arc<MappingProfile>> {
        if let Some(name) = name {
            tracing::debug!(
                profile = name,
                "Mapping name ignored for context-resolved models"
            );
        }
        self.cache.get_or_create::<Ctx, T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::{
        Entity, Error, FieldInfo, FromValue, PropertyInfo, ScalarType, Value,
    };

    #[derive(Default)]
    struct Account {
        id: i64,
        owner: String,
    }

    impl Entity for Account {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 2] = [
                PropertyInfo::new("id", ScalarType::I64),
                PropertyInfo::new("owner", ScalarType::String),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "id" => Some(self.id.into()),
                "owner" => Some(self.owner.clone().into()),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id = FromValue::from_value(&value)?,
                "owner" => self.owner = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Account", other)),
            }
            Ok(())
        }
    }

    impl Model for Account {
        const TABLE_NAME: &'static str = "accounts";

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: [FieldInfo; 2] = [
                FieldInfo::new("id", "id", ScalarType::I64)
                    .primary_key(true)
                    .auto_increment(true),
                FieldInfo::new("owner", "owner", ScalarType::String),
            ];
            &FIELDS
        }
    }

    struct Ledger;
    impl DbContext for Ledger {
        fn default_schema() -> Option<&'static str> {
            Some("ledger")
        }
    }

    struct Reporting;
    impl DbContext for Reporting {}

    #[test]
    fn same_instance_per_context() {
        let cache = ModelMetadata::new();
        let a = cache.get_or_create::<Ledger, Account>().unwrap();
        let b = cache.get_or_create::<Ledger, Account>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.table().quoted_name(), "`ledger`.`accounts`");

        let other = cache.get_or_create::<Reporting, Account>().unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(other.table().quoted_name(), "`accounts`");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn auto_increment_key_is_server_generated() {
        let cache = Arc::new(ModelMetadata::new());
        let resolver = ContextMappings::<Ledger>::with_cache(Arc::clone(&cache));
        let profile =
            <ContextMappings<Ledger> as MappingResolver<Account>>::resolve_mapping(&resolver, Some("ignored"))
                .unwrap();
        assert_eq!(
            profile.output_id().map(|o| o.mode),
            Some(super::super::OutputIdMode::ServerGenerated)
        );
        assert_eq!(profile.insertable_properties(), ["owner"]);
    }

    #[test]
    fn concurrent_first_access_agrees() {
        let cache = Arc::new(ModelMetadata::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_or_create::<Ledger, Account>().unwrap())
            })
            .collect();
        let profiles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for p in &profiles[1..] {
            assert!(Arc::ptr_eq(&profiles[0], p));
        }
    }
}
