//! Replacement candidates for vanished types.
//!
//! Given the stored `"TypeName, AssemblyName"` of a type that no longer
//! resolves, searches the loaded assemblies for similarly named types and
//! ranks them by edit distance. Each surviving type is matched to its source
//! asset through the asset index.
//!
//! Results are memoized per descriptor in a [`SearchCache`] owned by the
//! caller, together with the exported types of every assembly searched.

use crate::config::SearchConfig;
use crate::distance::distance;
use crate::host::{AssemblyInfo, AssemblyUniverse, AssetHandle, AssetIndex, TypeInfo};
use crate::identifier::TypeDescriptor;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, warn};

/// A type proposed as a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateMatch {
    pub assembly: String,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    /// Edit distance between the vanished and candidate simple names.
    pub distance: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetHandle>,
}

/// Memoized search results and exported-type listings.
///
/// A cached `None` records a failed search so it is not retried.
#[derive(Debug, Default)]
pub struct SearchCache {
    results: HashMap<String, Option<Vec<CandidateMatch>>>,
    exported: HashMap<String, Vec<TypeInfo>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_result(&self, descriptor: &str) -> Option<&Option<Vec<CandidateMatch>>> {
        self.results.get(descriptor)
    }

    /// Number of assemblies whose exported types have been enumerated.
    pub fn enumerated_assemblies(&self) -> usize {
        self.exported.len()
    }

    fn exported_types<U>(&mut self, universe: &U, assembly: &AssemblyInfo) -> &[TypeInfo]
    where
        U: AssemblyUniverse + ?Sized,
    {
        self.exported
            .entry(assembly.name.clone())
            .or_insert_with(|| match universe.exported_types(assembly) {
                Ok(types) => types,
                Err(err) => {
                    debug!(assembly = %assembly.name, "no exported types: {err:#}");
                    Vec::new()
                }
            })
    }
}

/// Searches assemblies for replacements of vanished types.
pub struct CandidateSearch<'a, U: ?Sized, A: ?Sized> {
    universe: &'a U,
    assets: &'a A,
    config: &'a SearchConfig,
    exclusions: Vec<glob::Pattern>,
}

impl<'a, U, A> CandidateSearch<'a, U, A>
where
    U: AssemblyUniverse + ?Sized,
    A: AssetIndex + ?Sized,
{
    /// Fails if an exclusion pattern does not compile.
    pub fn new(universe: &'a U, assets: &'a A, config: &'a SearchConfig) -> Result<Self> {
        Ok(Self {
            universe,
            assets,
            config,
            exclusions: config.exclusion_patterns()?,
        })
    }

    /// Returns candidates for `descriptor`, ranked by ascending distance.
    ///
    /// Malformed descriptors yield an empty list. Results, including failed
    /// searches, are cached under the descriptor.
    pub fn search(&self, cache: &mut SearchCache, descriptor: &str) -> Vec<CandidateMatch> {
        let Some(target) = TypeDescriptor::parse(descriptor) else {
            return Vec::new();
        };

        if let Some(cached) = cache.results.get(descriptor) {
            return cached.clone().unwrap_or_default();
        }

        let outcome = match self.collect(cache, &target) {
            Ok(candidates) => Some(candidates),
            Err(err) => {
                error!(
                    descriptor,
                    "candidate search failed, please file a report with this message: {err:#}"
                );
                None
            }
        };

        cache.results.insert(descriptor.to_string(), outcome.clone());
        outcome.unwrap_or_default()
    }

    fn collect(&self, cache: &mut SearchCache, target: &TypeDescriptor) -> Result<Vec<CandidateMatch>> {
        let started = Instant::now();
        let budget = self.config.fuzzy_budget();
        let wanted = target.simple_name();
        let mut candidates = Vec::new();

        for assembly in self.universe.assemblies()? {
            if self.is_excluded(&assembly.name) {
                continue;
            }

            let exact = assembly.name.eq_ignore_ascii_case(&target.assembly_name);
            let fuzzy = !exact
                && started.elapsed() < budget
                && distance(&assembly.name, &target.assembly_name) < self.config.assembly_distance_limit;
            if !exact && !fuzzy {
                continue;
            }

            for type_info in cache.exported_types(self.universe, &assembly) {
                let score = distance(wanted, &type_info.name);
                if score >= self.config.type_distance_limit {
                    continue;
                }
                match self.resolve_asset(&type_info.name) {
                    Ok((asset_path, asset)) => candidates.push(CandidateMatch {
                        assembly: assembly.name.clone(),
                        type_info: type_info.clone(),
                        distance: score,
                        asset_path,
                        asset,
                    }),
                    Err(err) => {
                        warn!(type_name = %type_info.full_name, "skipping candidate: {err:#}");
                    }
                }
            }
        }

        candidates.sort_by_key(|c| c.distance);
        debug!(
            type_name = %target.type_name,
            found = candidates.len(),
            "candidate search finished"
        );
        Ok(candidates)
    }

    fn is_excluded(&self, assembly: &str) -> bool {
        self.exclusions.iter().any(|p| p.matches(assembly))
    }

    /// Finds the source asset declaring `type_name`.
    ///
    /// Only a file named exactly `<type_name>.<ext>` counts.
    fn resolve_asset(&self, type_name: &str) -> Result<(Option<String>, Option<AssetHandle>)> {
        let suffix = format!("/{}.{}", type_name, self.config.source_extension);
        let Some(path) = self
            .assets
            .find_by_name(type_name)
            .into_iter()
            .find(|p| p.ends_with(&suffix))
        else {
            return Ok((None, None));
        };
        let handle = self.assets.load(&path)?;
        Ok((Some(path), Some(handle)))
    }
}
