//! Entry points binding a mapping resolver to the builders.

use std::sync::Arc;

use sqlbulk_core::{DbContext, Entity, Result};

use crate::builder::{BulkDelete, BulkInsert, BulkMatch, BulkMerge, BulkUpdate};
use crate::mapping::{ContextMappings, MappingRegistry, MappingResolver};
use crate::options::{
    BulkDeleteOptions, BulkInsertOptions, BulkMatchOptions, BulkMergeOptions, BulkUpdateOptions,
};
use crate::types::TypeMappings;

/// Hands out builders whose mapping comes from one resolver.
///
/// The resolver is either a [`MappingRegistry`] of explicit profiles or a
/// [`ContextMappings`] deriving profiles from model metadata. Each builder
/// resolves with the `mapping_name` of the options it is given.
///
/// ```ignore
/// let bulk = BulkSession::global();
/// let result = bulk
///     .update::<Product>(BulkUpdateOptions::new().collation("utf8mb4_bin"))?
///     .columns(columns!(Product { price, stock += }))
///     .execute(&cx, &conn, &products)
///     .await;
/// ```
#[derive(Debug, Clone)]
pub struct BulkSession<R> {
    resolver: R,
    types: Arc<TypeMappings>,
}

impl BulkSession<Arc<MappingRegistry>> {
    /// Session over the process-wide registry.
    pub fn global() -> Self {
        Self::registered(Arc::clone(MappingRegistry::global()))
    }

    pub fn registered(registry: Arc<MappingRegistry>) -> Self {
        Self::new(registry)
    }
}

impl<Ctx: DbContext> BulkSession<ContextMappings<Ctx>> {
    /// Session resolving from the model metadata of context `Ctx`.
    pub fn for_context() -> Self {
        Self::new(ContextMappings::new())
    }
}

impl<R> BulkSession<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            types: Arc::clone(TypeMappings::shared()),
        }
    }

    /// Use `types` instead of the shared type mappings.
    pub fn with_type_mappings(mut self, types: Arc<TypeMappings>) -> Self {
        self.types = types;
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn type_mappings(&self) -> &Arc<TypeMappings> {
        &self.types
    }

    pub fn insert<T>(&self, options: BulkInsertOptions) -> Result<BulkInsert<T>>
    where
        T: Entity,
        R: MappingResolver<T>,
    {
        let profile = self.resolver.resolve_mapping(options.bulk.mapping_name.as_deref())?;
        Ok(BulkInsert::new(profile)
            .type_mappings(Arc::clone(&self.types))
            .options(options))
    }

    pub fn update<T>(&self, options: BulkUpdateOptions) -> Result<BulkUpdate<T>>
    where
        T: Entity,
        R: MappingResolver<T>,
    {
        let profile = self.resolver.resolve_mapping(options.bulk.mapping_name.as_deref())?;
        Ok(BulkUpdate::new(profile)
            .type_mappings(Arc::clone(&self.types))
            .options(options))
    }

    pub fn delete<T>(&self, options: BulkDeleteOptions) -> Result<BulkDelete<T>>
    where
        T: Entity,
        R: MappingResolver<T>,
    {
        let profile = self.resolver.resolve_mapping(options.bulk.mapping_name.as_deref())?;
        Ok(BulkDelete::new(profile)
            .type_mappings(Arc::clone(&self.types))
            .options(options))
    }

    pub fn merge<T>(&self, options: BulkMergeOptions) -> Result<BulkMerge<T>>
    where
        T: Entity,
        R: MappingResolver<T>,
    {
        let profile = self.resolver.resolve_mapping(options.bulk.mapping_name.as_deref())?;
        Ok(BulkMerge::new(profile)
            .type_mappings(Arc::clone(&self.types))
            .options(options))
    }

    pub fn matching<T>(&self, options: BulkMatchOptions) -> Result<BulkMatch<T>>
    where
        T: Entity + Default,
        R: MappingResolver<T>,
    {
        let profile = self.resolver.resolve_mapping(options.bulk.mapping_name.as_deref())?;
        Ok(BulkMatch::new(profile)
            .type_mappings(Arc::clone(&self.types))
            .options(options))
    }
}
