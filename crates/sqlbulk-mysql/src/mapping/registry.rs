//! Explicit mapping registrations.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use sqlbulk_core::{Entity, MappingError, Result};

use super::{MappingProfile, ProfileBuilder};

/// Source of mapping profiles for `T`.
///
/// Builders only see the resolved profile, so a registry and an ORM
/// metadata cache are interchangeable behind this trait.
pub trait MappingResolver<T: Entity>: Send + Sync {
    /// Resolve the default profile (`None`) or a named one.
    fn resolve_mapping(&self, name: Option<&str>) -> Result<Arc<MappingProfile>>;
}

impl<T: Entity, R: MappingResolver<T>> MappingResolver<T> for Arc<R> {
    fn resolve_mapping(&self, name: Option<&str>) -> Result<Arc<MappingProfile>> {
        (**self).resolve_mapping(name)
    }
}

type RegistryKey = (TypeId, Option<String>);

/// Thread-safe store of profiles keyed by record type and optional name.
///
/// Registration normally happens once at startup; lookups happen on every
/// bulk call from any thread.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    profiles: DashMap<RegistryKey, Arc<MappingProfile>>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static Arc<MappingRegistry> {
        static GLOBAL: OnceLock<Arc<MappingRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(MappingRegistry::new()))
    }

    /// Register (or replace) the default profile for `T`.
    pub fn register<T: Entity>(&self, profile: MappingProfile) -> Result<Arc<MappingProfile>> {
        self.insert::<T>(None, profile)
    }

    /// Register (or replace) a named profile for `T`.
    pub fn register_named<T: Entity>(
        &self,
        name: &str,
        profile: MappingProfile,
    ) -> Result<Arc<MappingProfile>> {
        self.insert::<T>(Some(name.to_string()), profile)
    }

    /// Build and register the default profile for `T` in one step.
    pub fn configure<T, F>(&self, configure: F) -> Result<Arc<MappingProfile>>
    where
        T: Entity,
        F: FnOnce(ProfileBuilder<T>) -> ProfileBuilder<T>,
    {
        let profile = configure(ProfileBuilder::new()).build()?;
        self.register::<T>(profile)
    }

    /// Build and register a named profile for `T` in one step.
    pub fn configure_named<T, F>(&self, name: &str, configure: F) -> Result<Arc<MappingProfile>>
    where
        T: Entity,
        F: FnOnce(ProfileBuilder<T>) -> ProfileBuilder<T>,
    {
        let profile = configure(ProfileBuilder::new()).build()?;
        self.register_named::<T>(name, profile)
    }

    fn insert<T: Entity>(&self, name: Option<String>, profile: MappingProfile) -> Result<Arc<MappingProfile>> {
        profile.check_type::<T>()?;
        let profile = Arc::new(profile);
        tracing::debug!(
            type_name = profile.type_name(),
            profile = name.as_deref().unwrap_or("<default>"),
            table = profile.table().quoted_name(),
            "Registered mapping profile"
        );
        self.profiles
            .insert((TypeId::of::<T>(), name), Arc::clone(&profile));
        Ok(profile)
    }

    pub fn resolve<T: Entity>(&self) -> Result<Arc<MappingProfile>> {
        self.resolve_named_opt::<T>(None)
    }

    pub fn resolve_named<T: Entity>(&self, name: &str) -> Result<Arc<MappingProfile>> {
        self.resolve_named_opt::<T>(Some(name))
    }

    fn resolve_named_opt<T: Entity>(&self, name: Option<&str>) -> Result<Arc<MappingProfile>> {
        self.lookup::<T>(name).ok_or_else(|| {
            MappingError::not_registered(std::any::type_name::<T>(), name).into()
        })
    }

    pub fn try_resolve<T: Entity>(&self) -> Option<Arc<MappingProfile>> {
        self.lookup::<T>(None)
    }

    pub fn try_resolve_named<T: Entity>(&self, name: &str) -> Option<Arc<MappingProfile>> {
        self.lookup::<T>(Some(name))
    }

    fn lookup<T: Entity>(&self, name: Option<&str>) -> Option<Arc<MappingProfile>> {
        let key = (TypeId::of::<T>(), name.map(str::to_string));
        self.profiles.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop one registration; returns it if present.
    pub fn remove<T: Entity>(&self, name: Option<&str>) -> Option<Arc<MappingProfile>> {
        let key = (TypeId::of::<T>(), name.map(str::to_string));
        self.profiles.remove(&key).map(|(_, profile)| profile)
    }

    pub fn clear(&self) {
        self.profiles.clear();
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl<T: Entity> MappingResolver<T> for MappingRegistry {
    fn resolve_mapping(&self, name: Option<&str>) -> Result<Arc<MappingProfile>> {
        self.resolve_named_opt::<T>(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::{Error, FromValue, MappingErrorKind, PropertyInfo, ScalarType, Value};

    #[derive(Default)]
    struct Invoice {
        number: String,
        total: f64,
    }

    impl Entity for Invoice {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 2] = [
                PropertyInfo::new("number", ScalarType::String),
                PropertyInfo::new("total", ScalarType::F64),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "number" => Some(self.number.clone().into()),
                "total" => Some(self.total.into()),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "number" => self.number = FromValue::from_value(&value)?,
                "total" => self.total = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Invoice", other)),
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Unregistered;

    impl Entity for Unregistered {
        fn properties() -> &'static [PropertyInfo] {
            &[]
        }

        fn get(&self, _property: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, property: &str, _value: Value) -> Result<()> {
            Err(Error::unknown_property("Unregistered", property))
        }
    }

    #[test]
    fn default_and_named_profiles_are_distinct() {
        let registry = MappingRegistry::new();
        registry
            .configure::<Invoice, _>(|b| b.table("invoices").primary_key("number"))
            .unwrap();
        registry
            .configure_named::<Invoice, _>("archive", |b| {
                b.table("invoices_archive").primary_key("number")
            })
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve::<Invoice>().unwrap().table().name(),
            "invoices"
        );
        assert_eq!(
            registry
                .resolve_named::<Invoice>("archive")
                .unwrap()
                .table()
                .name(),
            "invoices_archive"
        );
    }

    #[test]
    fn missing_profile_names_type() {
        let registry = MappingRegistry::new();
        let err = registry.resolve::<Unregistered>().unwrap_err();
        match err {
            Error::Mapping(m) => {
                assert_eq!(m.kind, MappingErrorKind::NotRegistered);
                assert!(m.type_name.ends_with("Unregistered"));
            }
            other => panic!("unexpected error: {other}"),
        }

        registry
            .configure::<Invoice, _>(|b| b.table("invoices"))
            .unwrap();
        let err = registry.resolve_named::<Invoice>("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(registry.try_resolve_named::<Invoice>("missing").is_none());
    }

    #[test]
    fn profile_for_other_type_is_rejected() {
        let registry = MappingRegistry::new();
        let profile = MappingProfile::builder::<Invoice>().build().unwrap();
        assert!(registry.register::<Unregistered>(profile).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let registry = MappingRegistry::new();
        registry.configure::<Invoice, _>(|b| b).unwrap();
        assert!(registry.remove::<Invoice>(None).is_some());
        assert!(registry.try_resolve::<Invoice>().is_none());

        registry.configure::<Invoice, _>(|b| b).unwrap();
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn resolver_through_arc() {
        let registry = Arc::new(MappingRegistry::new());
        registry
            .configure::<Invoice, _>(|b| b.table("invoices"))
            .unwrap();
        let resolved =
            <Arc<MappingRegistry> as MappingResolver<Invoice>>::resolve_mapping(&registry, None)
                .unwrap();
        assert_eq!(resolved.table().name(), "invoices");
    }
}
