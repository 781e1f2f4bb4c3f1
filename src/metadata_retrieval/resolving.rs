//! Title-resolving catalog
//!
//! This module wraps a metadata provider with a fuzzy resolver, so a title
//! scraped from the streaming site can be turned into the catalog entry it
//! refers to.

use super::{CatalogDetail, CatalogId, CatalogSummary, MetadataProvider, MetadataRetrievalError};
use crate::fuzzy_match::{FuzzyResolver, Similarity, TitleSimilarity};

/// A metadata provider that resolves free-text titles
///
/// The provider's search results are used as the candidate set; the fuzzy
/// resolver then picks the single best match or rejects them all. Nothing is
/// remembered between calls.
pub struct ResolvingCatalog<P, S = TitleSimilarity>
where
    P: MetadataProvider,
    S: Similarity,
{
    /// The underlying metadata provider
    provider: P,
    /// Resolver ranking the provider's candidates
    resolver: FuzzyResolver<S>,
}

impl<P, S> ResolvingCatalog<P, S>
where
    P: MetadataProvider,
    S: Similarity,
{
    /// Creates a new resolving catalog around the given provider
    ///
    /// # Arguments
    ///
    /// * `provider` - The metadata provider to search
    /// * `resolver` - The fuzzy resolver used to pick among search results
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let anilist = AniListProvider::new(client, "https://graphql.anilist.co");
    /// let catalog = ResolvingCatalog::new(anilist, FuzzyResolver::default());
    /// let id = catalog.resolve_id("Shingeki no Kyojin").await?;
    /// ```
    pub fn new(provider: P, resolver: FuzzyResolver<S>) -> Self {
        Self { provider, resolver }
    }

    /// Returns the wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolves a title to the summary of the best-matching catalog entry
    ///
    /// # Errors
    ///
    /// Returns `MetadataRetrievalError::NoMatch` when no search result clears
    /// the similarity threshold, or the provider's error if the search fails.
    pub async fn resolve_summary(
        &self,
        title: &str,
    ) -> Result<CatalogSummary, MetadataRetrievalError> {
        let candidates = self.provider.search(title).await?;
        let found = self.resolver.resolve(title, &candidates)?;

        Ok(found.candidate.summary.clone())
    }

    /// Resolves a title to the identifier of the best-matching catalog entry
    ///
    /// # Errors
    ///
    /// Same as [`ResolvingCatalog::resolve_summary`].
    pub async fn resolve_id(&self, title: &str) -> Result<CatalogId, MetadataRetrievalError> {
        let candidates = self.provider.search(title).await?;
        let found = self.resolver.resolve(title, &candidates)?;

        Ok(found.candidate.summary.id)
    }

    /// Fetches the full record of a catalog entry
    pub async fn fetch_detail(&self, id: CatalogId) -> Result<CatalogDetail, MetadataRetrievalError> {
        self.provider.fetch_detail(id).await
    }
}
