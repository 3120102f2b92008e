//! Geometry adapter: precision snapping, boolean operations, and
//! tolerance-aware predicates.
//!
//! This module provides:
//! - [`GeometryOps`]: boolean ops, validity, area, covered-by and equality
//!   tests, all on a fixed-precision grid
//! - [`Relation`]: the one-shot classification of an (object, mask) pair used
//!   by the chopper
//! - [`RegionKey`]: a hashable, canonicalized form of a snapped geometry
//! - WKT parsing and [`BBox`] bounds for feature sources
//!
//! # Design
//!
//! A `GeometryOps` is built for one working extent. It fixes a dyadic grid
//! (spacing `2^-e`) fine enough for the configured `grid_scale` yet coarse
//! enough that its working frame, the extent padded by half its larger side,
//! fits the overlay's 29-bit integer range. Every boolean operation runs
//! through one `i_overlay` adapter on that grid, so coordinates convert to
//! integers exactly and repeated operations on the same locus round the same
//! way.
//!
//! Every geometry that enters the engine goes through [`GeometryOps::snap`],
//! and every boolean result comes back on the grid. Predicates that would be
//! brittle under floating point (covered-by, equality, the chop relation)
//! fall back to an area test. The tolerance is never below the residual a
//! single grid step can leave along the frame, so results derived from
//! different operation orders compare equal.

use crate::config::CoverageConfig;
use crate::error::{CoverageError, Result};
use crate::frame;
use geo::{Area, BooleanOps, BoundingRect, CoordsIter, Relate, Validation};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay::ShapeType;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::overlay::FloatOverlay;
use i_overlay::i_float::adapter::FloatPointAdapter;
use i_overlay::i_float::float::rect::FloatRect;

/// Integer bits the overlay may use for a coordinate's offset from the frame
/// center.
const OVERLAY_BITS: i32 = 29;

/// Frame padding around the working extent, as a fraction of its larger side.
const FRAME_MARGIN: f64 = 0.5;

/// Grid steps of drift, per unit of frame side, tolerated between two
/// computations of the same region.
const NOISE_FACTOR: f64 = 64.0;

/// Relationship between a region being chopped (`object`) and a `mask`.
///
/// Classified once per pair; the chopper then acts on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No shared points.
    Disjoint,
    /// Boundaries meet, interiors do not (or share less than the tolerance).
    Touching,
    /// Same footprint within the area tolerance.
    Equal,
    /// `object` contains `mask`.
    Contains,
    /// `mask` contains `object`.
    ContainedBy,
    /// Interiors overlap partially.
    Overlapping,
}

#[derive(Debug, Clone, Copy)]
enum BoolOp {
    Intersection,
    Union,
    Difference,
    Xor,
}

impl BoolOp {
    fn rule(self) -> OverlayRule {
        match self {
            BoolOp::Intersection => OverlayRule::Intersect,
            BoolOp::Union => OverlayRule::Union,
            BoolOp::Difference => OverlayRule::Difference,
            BoolOp::Xor => OverlayRule::Xor,
        }
    }
}

/// Geometry operations on a fixed-precision grid.
#[derive(Debug, Clone)]
pub struct GeometryOps {
    area_tolerance: f64,
    /// `2^e`
    scale: f64,
    /// `2^-e`
    spacing: f64,
    /// Working frame, with grid-aligned edges.
    frame: BBox,
}

impl GeometryOps {
    /// Create an adapter for geometries within `extent`.
    ///
    /// Geometries may reach into the padded working frame around `extent`;
    /// anything beyond it has to be cut back with
    /// [`restrict_to_frame`](Self::restrict_to_frame) before it takes part
    /// in boolean operations on the grid.
    pub fn new(config: &CoverageConfig, extent: &BBox) -> Self {
        let side = extent.width().max(extent.height());
        let margin = if side.is_finite() && side > 0.0 {
            side * FRAME_MARGIN
        } else {
            1.0
        };
        let padded = BBox::new(
            extent.min_x - margin,
            extent.min_y - margin,
            extent.max_x + margin,
            extent.max_y + margin,
        );
        let half_side = padded.width().max(padded.height()) * 0.5;

        let finest = config.grid_scale.log2().floor() as i32;
        let fits = OVERLAY_BITS - half_side.log2().ceil() as i32;
        let exponent = finest.min(fits);
        let scale = 2f64.powi(exponent);
        let spacing = 2f64.powi(-exponent);

        let frame = BBox::new(
            (padded.min_x * scale).floor() * spacing,
            (padded.min_y * scale).floor() * spacing,
            (padded.max_x * scale).ceil() * spacing,
            (padded.max_y * scale).ceil() * spacing,
        );
        let area_tolerance = config
            .area_tolerance
            .max(NOISE_FACTOR * spacing * 2.0 * half_side);

        Self {
            area_tolerance,
            scale,
            spacing,
            frame,
        }
    }

    /// Area tolerance used by the fallback predicates: the configured
    /// tolerance, raised to what the grid can resolve over the frame.
    pub fn area_tolerance(&self) -> f64 {
        self.area_tolerance
    }

    /// Grid spacing; every snapped coordinate is an integer multiple of it.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Bring an input geometry onto the grid as a `MultiPolygon`.
    ///
    /// Polygon, MultiPolygon, Rect, and Triangle are converted; any other
    /// type yields an empty MultiPolygon, which fails
    /// [`is_valid_polygonal`](Self::is_valid_polygonal). Non-finite
    /// coordinates are a fatal error.
    pub fn snap(&self, geom: &Geometry<f64>) -> Result<MultiPolygon<f64>> {
        if let Some(bad) = geom.coords_iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(CoverageError::InvalidGeometry(format!(
                "non-finite coordinate ({}, {})",
                bad.x, bad.y
            )));
        }
        Ok(match to_multi_polygon(geom) {
            Some(mp) => self.snap_multi(&mp),
            None => MultiPolygon::new(Vec::new()),
        })
    }

    /// Snap a `MultiPolygon` with finite coordinates onto the grid.
    ///
    /// Repeated vertices are collapsed; rings and polygons that degenerate to
    /// zero area are dropped.
    pub fn snap_multi(&self, mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        MultiPolygon::new(
            mp.0.iter()
                .filter_map(|polygon| self.snap_polygon(polygon))
                .collect(),
        )
    }

    fn snap_polygon(&self, polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
        let exterior = self.snap_ring(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .filter_map(|ring| self.snap_ring(ring))
            .collect();
        Some(Polygon::new(exterior, interiors))
    }

    fn snap_ring(&self, ring: &LineString<f64>) -> Option<LineString<f64>> {
        let mut coords: Vec<Coord<f64>> = ring.coords().map(|c| self.snap_coord(*c)).collect();
        coords.dedup();
        if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
            if first != last {
                coords.push(first);
            }
        }
        if coords.len() < 4 {
            return None;
        }
        let ring = LineString::new(coords);
        let ring_area = Polygon::new(ring.clone(), Vec::new()).unsigned_area();
        (ring_area > 0.0).then_some(ring)
    }

    fn snap_coord(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x * self.scale).round() * self.spacing,
            y: (c.y * self.scale).round() * self.spacing,
        }
    }

    /// Cut `geom` back to the working frame and snap the result.
    ///
    /// Geometries already inside the frame come back snapped but otherwise
    /// unchanged.
    pub fn restrict_to_frame(&self, geom: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if self.in_frame(geom) {
            return self.snap_multi(geom);
        }
        self.snap_multi(&frame::clip_to_rect(geom, &self.frame))
    }

    fn in_frame(&self, geom: &MultiPolygon<f64>) -> bool {
        BBox::from_multi_polygon(geom).map_or(true, |bounds| self.frame.contains(&bounds))
    }

    /// `a ∩ b`, snapped.
    pub fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        self.overlay(a, b, BoolOp::Intersection)
    }

    /// `a ∪ b`, snapped.
    pub fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        self.overlay(a, b, BoolOp::Union)
    }

    /// `a − b`, snapped.
    pub fn difference(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        self.overlay(a, b, BoolOp::Difference)
    }

    /// `a XOR b`, snapped.
    pub fn sym_difference(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> MultiPolygon<f64> {
        self.overlay(a, b, BoolOp::Xor)
    }

    fn overlay(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>, op: BoolOp) -> MultiPolygon<f64> {
        if self.in_frame(a) && self.in_frame(b) {
            return self.snap_multi(&self.grid_overlay(a, b, op));
        }
        // Operands past the frame would overflow the grid's integer range.
        tracing::debug!(?op, "operand outside working frame; adaptive overlay");
        let raw = match op {
            BoolOp::Intersection => a.intersection(b),
            BoolOp::Union => a.union(b),
            BoolOp::Difference => a.difference(b),
            BoolOp::Xor => a.xor(b),
        };
        self.snap_multi(&raw)
    }

    fn grid_overlay(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
        op: BoolOp,
    ) -> MultiPolygon<f64> {
        let subject = contours(a);
        let clip = contours(b);
        let capacity = subject.iter().chain(&clip).map(Vec::len).sum();
        let shapes = FloatOverlay::with_adapter(self.adapter(), capacity)
            .unsafe_add_source(&subject, ShapeType::Subject)
            .unsafe_add_source(&clip, ShapeType::Clip)
            .overlay(op.rule(), FillRule::EvenOdd);
        MultiPolygon::new(shapes.into_iter().filter_map(shape_to_polygon).collect())
    }

    /// Float/integer conversion pinned to the grid: the scale is `2^e` and
    /// the offset a grid point, so snapped coordinates convert exactly.
    fn adapter(&self) -> FloatPointAdapter<[f64; 2], f64> {
        let center = |lo: f64, hi: f64| ((lo + hi) * 0.5 * self.scale).round() * self.spacing;
        FloatPointAdapter {
            dir_scale: self.scale,
            inv_scale: self.spacing,
            offset: [
                center(self.frame.min_x, self.frame.max_x),
                center(self.frame.min_y, self.frame.max_y),
            ],
            rect: FloatRect::new(
                self.frame.min_x,
                self.frame.max_x,
                self.frame.min_y,
                self.frame.max_y,
            ),
        }
    }

    /// Union of every geometry in `geoms`, or `None` when there are none.
    pub fn union_all<'a>(
        &self,
        geoms: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
    ) -> Option<MultiPolygon<f64>> {
        geoms.into_iter().fold(None, |acc, geom| match acc {
            None => Some(geom.clone()),
            Some(acc) => Some(self.union(&acc, geom)),
        })
    }

    /// True iff the geometry is a non-empty, topologically valid
    /// Polygon/MultiPolygon.
    pub fn is_valid_polygonal(&self, geom: &MultiPolygon<f64>) -> bool {
        !geom.0.is_empty() && geom.is_valid()
    }

    /// Valid and at least as large as the area tolerance.
    pub fn is_significant(&self, geom: &MultiPolygon<f64>) -> bool {
        self.is_valid_polygonal(geom) && self.area(geom) >= self.area_tolerance
    }

    /// Unsigned area.
    pub fn area(&self, geom: &MultiPolygon<f64>) -> f64 {
        geom.unsigned_area()
    }

    /// Polygonal components, each as its own single-part geometry.
    pub fn parts<'a>(
        &self,
        geom: &'a MultiPolygon<f64>,
    ) -> impl Iterator<Item = MultiPolygon<f64>> + 'a {
        geom.0.iter().map(|p| MultiPolygon::new(vec![p.clone()]))
    }

    /// `a` is covered by `b`: literally, or with a residual `a − b` smaller
    /// than the tolerance.
    pub fn covered_by(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        if a.relate(b).is_coveredby() {
            return true;
        }
        self.area(&self.difference(a, b)) < self.area_tolerance
    }

    /// Structural equality, or a symmetric difference smaller than the
    /// tolerance.
    pub fn geometrically_equal(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        if a == b {
            return true;
        }
        self.area(&self.sym_difference(a, b)) < self.area_tolerance
    }

    /// Classify how `object` relates to `mask`.
    ///
    /// Checked in chop order: disjoint, touching, equal, contains,
    /// contained-by, and otherwise overlapping. When the exact predicates
    /// see a partial overlap, the shared and unshared areas decide instead:
    /// a side that differs by less than the tolerance counts as contained,
    /// and a shared area below it counts as touching.
    pub fn relation(&self, object: &MultiPolygon<f64>, mask: &MultiPolygon<f64>) -> Relation {
        let matrix = object.relate(mask);
        if matrix.is_disjoint() {
            return Relation::Disjoint;
        }
        if matrix.is_touches() {
            return Relation::Touching;
        }
        if self.geometrically_equal(object, mask) {
            return Relation::Equal;
        }
        if matrix.is_contains() {
            return Relation::Contains;
        }
        if matrix.is_within() {
            return Relation::ContainedBy;
        }

        let shared = self.area(&self.intersection(object, mask));
        if shared < self.area_tolerance {
            Relation::Touching
        } else if self.area(object) - shared < self.area_tolerance {
            Relation::ContainedBy
        } else if self.area(mask) - shared < self.area_tolerance {
            Relation::Contains
        } else {
            Relation::Overlapping
        }
    }

    /// Canonical hash key of a snapped geometry.
    pub fn region_key(&self, geom: &MultiPolygon<f64>) -> RegionKey {
        RegionKey::new(geom, self.scale)
    }
}

/// Every ring of `mp` as an open path; even-odd fill recovers the holes.
fn contours(mp: &MultiPolygon<f64>) -> Vec<Vec<[f64; 2]>> {
    mp.0.iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| {
            let mut path: Vec<[f64; 2]> = ring.coords().map(|c| [c.x, c.y]).collect();
            if path.len() > 1 && path.first() == path.last() {
                path.pop();
            }
            path
        })
        .collect()
}

/// Overlay output shape (outer path first, then holes) as a `Polygon`.
/// Paths come back clockwise, so they are reversed into the usual winding.
fn shape_to_polygon(shape: Vec<Vec<[f64; 2]>>) -> Option<Polygon<f64>> {
    let mut rings = shape.into_iter().map(|path| {
        let mut ring: LineString<f64> = path.into_iter().map(|[x, y]| Coord { x, y }).collect();
        ring.close();
        ring.0.reverse();
        ring
    });
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

/// Convert the polygonal geometry variants to a `MultiPolygon`.
pub fn to_multi_polygon(geom: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

type QuantizedRing = Vec<(i64, i64)>;

/// Hashable identity of a snapped geometry.
///
/// Coordinates are quantized to the snapping grid; each ring drops its
/// closing vertex and is rotated to start at its minimum vertex in the
/// lexicographically smaller direction; interior rings and polygons are
/// sorted. Equal keys imply equal geometries. Unequal keys do not imply
/// inequality (extra collinear vertices, sub-tolerance slivers), so callers
/// fall back to [`GeometryOps::geometrically_equal`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionKey(Vec<Vec<QuantizedRing>>);

impl RegionKey {
    fn new(geom: &MultiPolygon<f64>, grid_scale: f64) -> Self {
        let quantize = |c: &Coord<f64>| {
            (
                (c.x * grid_scale).round() as i64,
                (c.y * grid_scale).round() as i64,
            )
        };
        let mut polygons: Vec<Vec<QuantizedRing>> = geom
            .0
            .iter()
            .map(|polygon| {
                let mut interiors: Vec<QuantizedRing> = polygon
                    .interiors()
                    .iter()
                    .map(|ring| canonical_ring(ring.coords().map(quantize).collect()))
                    .collect();
                interiors.sort();
                let mut rings = Vec::with_capacity(interiors.len() + 1);
                rings.push(canonical_ring(
                    polygon.exterior().coords().map(quantize).collect(),
                ));
                rings.extend(interiors);
                rings
            })
            .collect();
        polygons.sort();
        Self(polygons)
    }
}

fn canonical_ring(mut ring: QuantizedRing) -> QuantizedRing {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    let Some(start) = ring
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| **c)
        .map(|(i, _)| i)
    else {
        return ring;
    };
    ring.rotate_left(start);
    let mut reversed = ring.clone();
    reversed[1..].reverse();
    ring.min(reversed)
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check if this bbox intersects another (closed intervals).
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// True iff `other` lies within this bbox (closed intervals).
    pub fn contains(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// All four bounds are finite.
    pub fn is_finite(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Compute from a geo-types Geometry.
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        geom.bounding_rect().map(Self::from_rect)
    }

    /// Compute from a MultiPolygon.
    pub fn from_multi_polygon(geom: &MultiPolygon<f64>) -> Option<Self> {
        geom.bounding_rect().map(Self::from_rect)
    }

    pub(crate) fn from_line_string(ring: &LineString<f64>) -> Option<Self> {
        ring.bounding_rect().map(Self::from_rect)
    }

    fn from_rect(rect: geo_types::Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Parse WKT string to geo-types Geometry.
pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>> {
    use std::str::FromStr;
    wkt::Wkt::from_str(wkt)
        .map_err(|e| CoverageError::WktParse(format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| CoverageError::WktParse(format!("{:?}", e)))
        })
}
