//! Collision detection and response
//!
//! Bots are circles. Overlapping bots are pushed apart in proportion to
//! their mass and given a knockback impulse; projectiles and beams are
//! tested against bot circles.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::actor::{ActorId, Bot};
use super::projectile::Projectile;
use super::rng::RandomSource;
use crate::consts::*;
use crate::direction_from_angle;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point (if hit)
    pub point: Vec2,
    /// Unit normal from the first shape toward the second
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        Self {
            min: center - Vec2::splat(radius),
            max: center + Vec2::splat(radius),
        }
    }

    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Shrink by `margin` on every side
    pub fn inset(&self, margin: f32) -> Self {
        Self {
            min: self.min + Vec2::splat(margin),
            max: self.max - Vec2::splat(margin),
        }
    }
}

/// True if two circles overlap (touching does not count)
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) < reach * reach
}

/// Contact between two circles; the normal points from `a` toward `b`
pub fn circle_circle_collision(a: Vec2, ra: f32, b: Vec2, rb: f32) -> CollisionResult {
    if !circles_overlap(a, ra, b, rb) {
        return CollisionResult::miss();
    }
    let delta = b - a;
    let dist = delta.length();
    let normal = if dist > 0.0 { delta / dist } else { Vec2::X };
    CollisionResult {
        hit: true,
        point: a + normal * ra,
        normal,
        penetration: ra + rb - dist,
    }
}

/// Roots of |p0 + t(p1 - p0) - center| = radius, smallest first
fn segment_circle_roots(p0: Vec2, p1: Vec2, center: Vec2, radius: f32) -> Option<(f32, f32)> {
    let d = p1 - p0;
    let f = p0 - center;
    let a = d.dot(d);
    let c = f.dot(f) - radius * radius;
    if a <= 1e-12 {
        // Degenerate segment: a point
        return (c <= 0.0).then_some((0.0, 0.0));
    }
    let b = 2.0 * f.dot(d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt = discriminant.sqrt();
    Some(((-b - sqrt) / (2.0 * a), (-b + sqrt) / (2.0 * a)))
}

/// Line segment vs circle: hit if either intersection root lies in [0, 1]
pub fn segment_circle_intersection(p0: Vec2, p1: Vec2, center: Vec2, radius: f32) -> bool {
    match segment_circle_roots(p0, p1, center, radius) {
        Some((t1, t2)) => (0.0..=1.0).contains(&t1) || (0.0..=1.0).contains(&t2),
        None => false,
    }
}

/// Parametric `t` in [0, 1] where the segment first meets the circle
pub fn segment_circle_entry(p0: Vec2, p1: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let (t1, t2) = segment_circle_roots(p0, p1, center, radius)?;
    [t1, t2].into_iter().find(|t| (0.0..=1.0).contains(t))
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Separate one pair of overlapping bots.
///
/// Returns the overlap that was corrected, or `None` if they did not
/// overlap. Resolving (a, b) or (b, a) moves both bots identically.
pub fn resolve_pair<R: RandomSource + ?Sized>(a: &mut Bot, b: &mut Bot, rng: &mut R) -> Option<f32> {
    let contact = circle_circle_collision(a.pos, a.radius, b.pos, b.radius);
    if !contact.hit {
        return None;
    }

    if a.pos == b.pos {
        // Stacked exactly: no normal to use, pick a random axis
        let min_dist = contact.penetration;
        let axis = direction_from_angle(rng.next_f32() * std::f32::consts::TAU);
        a.pos -= axis * (min_dist / 2.0);
        b.pos += axis * (min_dist / 2.0);
        return Some(min_dist);
    }

    let CollisionResult {
        normal,
        penetration: overlap,
        ..
    } = contact;
    let (mass_a, mass_b) = (a.mass(), b.mass());
    let total = mass_a + mass_b;

    // The heavier bot moves less
    a.pos -= normal * (overlap * mass_b / total);
    b.pos += normal * (overlap * mass_a / total);

    a.vel -= normal * (KNOCKBACK_COEFFICIENT * mass_b);
    b.vel += normal * (KNOCKBACK_COEFFICIENT * mass_a);

    Some(overlap)
}

/// Resolve every overlapping pair of living bots, in index order.
///
/// Returns the number of pairs corrected.
pub fn resolve_actor_overlaps<R: RandomSource + ?Sized>(actors: &mut [Bot], rng: &mut R) -> usize {
    let mut resolved = 0;
    for j in 1..actors.len() {
        let (head, tail) = actors.split_at_mut(j);
        let b = &mut tail[0];
        for a in head.iter_mut() {
            if !a.is_alive() || !b.is_alive() {
                continue;
            }
            if resolve_pair(a, b, rng).is_some() {
                resolved += 1;
            }
        }
    }
    resolved
}

/// First candidate (in iteration order) the projectile can hit.
///
/// Bots whose bounding box misses the swept path are rejected before the
/// exact test.
pub fn find_projectile_hit<'a, I>(projectile: &Projectile, candidates: I) -> Option<ActorId>
where
    I: IntoIterator<Item = &'a Bot>,
{
    let bounds = projectile.swept_bounds();
    candidates
        .into_iter()
        .filter(|bot| Aabb::from_circle(bot.pos, bot.radius).overlaps(&bounds))
        .find(|bot| projectile.check_hit(bot))
        .map(|bot| bot.id)
}

/// Nearest living bot along a beam, excluding `owner`.
///
/// Returns the bot and the point where the beam meets it.
pub fn find_beam_target<'a, I>(
    origin: Vec2,
    angle: f32,
    range: f32,
    owner: ActorId,
    candidates: I,
) -> Option<(ActorId, Vec2)>
where
    I: IntoIterator<Item = &'a Bot>,
{
    let end = origin + direction_from_angle(angle) * range;
    candidates
        .into_iter()
        .filter(|bot| bot.id != owner && bot.is_alive())
        .filter_map(|bot| {
            segment_circle_entry(origin, end, bot.pos, bot.radius).map(|t| (bot.id, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, t)| (id, origin.lerp(end, t)))
}
