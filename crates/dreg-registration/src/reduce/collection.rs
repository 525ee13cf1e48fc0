//! Piecewise transform assembled from bounded block transforms.

use dreg_core::region::PhysicalRegion;
use dreg_core::spatial::{Point, Vector};
use dreg_core::{ImageDomain, Transform, TransformRef};

use crate::error::{RegistrationError, Result};

/// Weight of transforms without a domain, and of points on a domain edge.
pub const MIN_WEIGHT: f64 = 1e-9;

/// How candidates from overlapping domains are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMethod {
    /// Unweighted mean of all candidates. May be discontinuous at domain
    /// edges.
    SimpleMean,
    /// Candidates weighted by the physical distance of the input point to
    /// the nearest edge of their domain.
    #[default]
    DistanceWeightedMean,
}

/// A transform and the domain it is valid over.
///
/// Without a domain the transform is valid everywhere. Only the sampled
/// physical box of the domain matters; its voxel grid is ignored.
#[derive(Debug, Clone)]
pub struct TransformEntry<const D: usize> {
    pub transform: TransformRef<D>,
    pub domain: Option<ImageDomain<D>>,
}

impl<const D: usize> TransformEntry<D> {
    pub fn new(transform: TransformRef<D>, domain: Option<ImageDomain<D>>) -> Self {
        Self { transform, domain }
    }

    pub fn unbounded(transform: TransformRef<D>) -> Self {
        Self::new(transform, None)
    }
}

/// Collection of possibly bounded transforms.
///
/// A point is mapped by every entry whose domain contains it (inclusive
/// bounds); the candidates are blended with the collection's
/// [`BlendMethod`].
#[derive(Debug, Clone)]
pub struct TransformCollection<const D: usize> {
    entries: Vec<TransformEntry<D>>,
    bounds: Vec<Option<PhysicalRegion<D>>>,
    blend: BlendMethod,
}

impl<const D: usize> Default for TransformCollection<D> {
    fn default() -> Self {
        Self::new(BlendMethod::default())
    }
}

impl<const D: usize> TransformCollection<D> {
    pub fn new(blend: BlendMethod) -> Self {
        Self {
            entries: Vec::new(),
            bounds: Vec::new(),
            blend,
        }
    }

    pub fn from_entries(entries: Vec<TransformEntry<D>>, blend: BlendMethod) -> Self {
        let mut collection = Self::new(blend);
        for entry in entries {
            collection.push(entry);
        }
        collection
    }

    pub fn push(&mut self, entry: TransformEntry<D>) {
        self.bounds.push(entry.domain.as_ref().map(ImageDomain::sample_bounds));
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TransformEntry<D>] {
        &self.entries
    }

    pub fn transforms(&self) -> impl Iterator<Item = &TransformRef<D>> {
        self.entries.iter().map(|e| &e.transform)
    }

    pub fn domains(&self) -> impl Iterator<Item = Option<&ImageDomain<D>>> {
        self.entries.iter().map(|e| e.domain.as_ref())
    }

    pub fn blend_method(&self) -> BlendMethod {
        self.blend
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose domain contains `point`.
    pub fn contributors(&self, point: &Point<D>) -> Vec<&TransformEntry<D>> {
        self.entries
            .iter()
            .zip(&self.bounds)
            .filter(|(_, bounds)| bounds.as_ref().map_or(true, |b| b.contains(point)))
            .map(|(entry, _)| entry)
            .collect()
    }

    /// Map `point`, failing when no domain contains it.
    pub fn try_transform_point(&self, point: &Point<D>) -> Result<Point<D>> {
        let contributors = self.contributors(point);
        if contributors.is_empty() {
            return Err(RegistrationError::transform(format!(
                "No candidates found: {:?} lies outside all transform domains",
                point.to_vec()
            )));
        }
        Ok(match self.blend {
            BlendMethod::SimpleMean => blend_simple_mean(point, &contributors),
            BlendMethod::DistanceWeightedMean => blend_distance_weighted_mean(point, &contributors),
        })
    }
}

fn blend_simple_mean<const D: usize>(point: &Point<D>, contributors: &[&TransformEntry<D>]) -> Point<D> {
    let mut sum = Vector::<D>::zeros();
    for entry in contributors {
        sum += entry.transform.transform_point(point) - Point::origin();
    }
    Point::origin() + sum / contributors.len() as f64
}

fn blend_distance_weighted_mean<const D: usize>(point: &Point<D>, contributors: &[&TransformEntry<D>]) -> Point<D> {
    let mut sum = Vector::<D>::zeros();
    let mut total_weight = 0.0;
    for entry in contributors {
        let weight = match &entry.domain {
            Some(domain) => domain.physical_distance_from_edge(point).0,
            None => MIN_WEIGHT,
        };
        // domains are inclusive, so a point on an edge still contributes
        let weight = if weight.abs() < 1e-8 { MIN_WEIGHT } else { weight };
        sum += (entry.transform.transform_point(point) - Point::origin()) * weight;
        total_weight += weight;
    }
    Point::origin() + sum / total_weight
}

impl<const D: usize> Transform<D> for TransformCollection<D> {
    /// Points outside every domain are returned unchanged.
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        self.try_transform_point(point).unwrap_or(*point)
    }

    fn name(&self) -> &'static str {
        "TransformCollection"
    }
}
