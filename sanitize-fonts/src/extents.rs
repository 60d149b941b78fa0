//! bounds accumulation over a paint tree
//!
//! A paint tree is rendered through a balanced callback protocol: transforms,
//! clips and groups are pushed and popped around the primitives that actually
//! paint. [`PaintExtents`] implements that protocol to answer a narrower
//! question: how much space would the painting cover? Three stacks mirror the
//! protocol's nesting, and every primitive unions its device-space footprint
//! into the innermost group.

/// A 2×3 affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub xx: f32,
    pub yx: f32,
    pub xy: f32,
    pub yy: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Transform = Transform {
        xx: 1.0,
        yx: 0.0,
        xy: 0.0,
        yy: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    /// A pure translation.
    pub const fn translate(dx: f32, dy: f32) -> Transform {
        Transform {
            xx: 1.0,
            yx: 0.0,
            xy: 0.0,
            yy: 1.0,
            dx,
            dy,
        }
    }

    /// A pure (anisotropic) scale.
    pub const fn scale(sx: f32, sy: f32) -> Transform {
        Transform {
            xx: sx,
            yx: 0.0,
            xy: 0.0,
            yy: sy,
            dx: 0.0,
            dy: 0.0,
        }
    }

    /// The composition applying `other` first, then `self`.
    pub fn pre_transform(&self, other: &Transform) -> Transform {
        Transform {
            xx: self.xx * other.xx + self.xy * other.yx,
            yx: self.yx * other.xx + self.yy * other.yx,
            xy: self.xx * other.xy + self.xy * other.yy,
            yy: self.yx * other.xy + self.yy * other.yy,
            dx: self.xx * other.dx + self.xy * other.dy + self.dx,
            dy: self.yx * other.dx + self.yy * other.dy + self.dy,
        }
    }

    /// Map a point.
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.xx * x + self.xy * y + self.dx,
            self.yx * x + self.yy * y + self.dy,
        )
    }

    /// Map a rectangle, returning the axis-aligned box around its image.
    ///
    /// Under rotation or shear the image is a parallelogram; all four
    /// corners are mapped and the result is their bounding box.
    pub fn transform_extents(&self, e: Extents) -> Extents {
        if e.is_empty() {
            return Extents::EMPTY;
        }
        let corners = [
            self.transform_point(e.x_min, e.y_min),
            self.transform_point(e.x_min, e.y_max),
            self.transform_point(e.x_max, e.y_min),
            self.transform_point(e.x_max, e.y_max),
        ];
        let mut out = Extents::EMPTY;
        for (x, y) in corners {
            out.x_min = out.x_min.min(x);
            out.y_min = out.y_min.min(y);
            out.x_max = out.x_max.max(x);
            out.y_max = out.y_max.max(y);
        }
        out
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

/// An axis-aligned rectangle in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Extents {
    /// The empty rectangle, the identity for [`union`](Extents::union).
    pub const EMPTY: Extents = Extents {
        x_min: f32::INFINITY,
        y_min: f32::INFINITY,
        x_max: f32::NEG_INFINITY,
        y_max: f32::NEG_INFINITY,
    };

    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Extents {
        Extents {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// `true` if the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.x_min >= self.x_max || self.y_min >= self.y_max
    }

    /// The smallest rectangle covering both inputs.
    pub fn union(&self, other: &Extents) -> Extents {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Extents {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// The overlap of both inputs.
    pub fn intersect(&self, other: &Extents) -> Extents {
        let out = Extents {
            x_min: self.x_min.max(other.x_min),
            y_min: self.y_min.max(other.y_min),
            x_max: self.x_max.min(other.x_max),
            y_max: self.y_max.min(other.y_max),
        };
        if out.is_empty() {
            Extents::EMPTY
        } else {
            out
        }
    }
}

/// An accumulated region: either everything, or a bounded rectangle.
///
/// Clips start unbounded (no clip restricts nothing); groups start bounded
/// and empty (nothing painted yet).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Unbounded,
    Bounded(Extents),
}

impl Bounds {
    /// The smallest region covering both inputs.
    pub fn union(&self, other: &Bounds) -> Bounds {
        match (self, other) {
            (Bounds::Unbounded, _) | (_, Bounds::Unbounded) => Bounds::Unbounded,
            (Bounds::Bounded(a), Bounds::Bounded(b)) => Bounds::Bounded(a.union(b)),
        }
    }

    /// The overlap of both inputs.
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        match (self, other) {
            (Bounds::Unbounded, b) => *b,
            (a, Bounds::Unbounded) => *a,
            (Bounds::Bounded(a), Bounds::Bounded(b)) => Bounds::Bounded(a.intersect(b)),
        }
    }

    /// The bounded extents, if any.
    pub fn extents(&self) -> Option<Extents> {
        match self {
            Bounds::Unbounded => None,
            Bounds::Bounded(e) => Some(*e),
        }
    }
}

/// Bounds accumulation over the paint callback protocol.
///
/// Push and pop calls must balance, as guaranteed by the paint API driving
/// them. Clip rectangles are mapped to device space when pushed, so the
/// footprint of a primitive is always `current clip ∩ its own extents`,
/// both in device space.
pub struct PaintExtents {
    clips: Vec<Bounds>,
    groups: Vec<Bounds>,
    transforms: Vec<Transform>,
}

impl PaintExtents {
    pub fn new() -> Self {
        PaintExtents {
            clips: vec![Bounds::Unbounded],
            groups: vec![Bounds::Bounded(Extents::EMPTY)],
            transforms: vec![Transform::IDENTITY],
        }
    }

    fn current_transform(&self) -> &Transform {
        self.transforms.last().unwrap()
    }

    fn current_clip(&self) -> &Bounds {
        self.clips.last().unwrap()
    }

    /// The bounds accumulated by the innermost open group.
    pub fn current_bounds(&self) -> &Bounds {
        self.groups.last().unwrap()
    }

    /// Compose `t` onto the current transform.
    pub fn push_transform(&mut self, t: &Transform) {
        let composed = self.current_transform().pre_transform(t);
        self.transforms.push(composed);
    }

    pub fn pop_transform(&mut self) {
        self.transforms.pop();
    }

    /// Restrict painting to a rectangle given in the current user space.
    pub fn push_clip_rect(&mut self, x_min: f32, y_min: f32, x_max: f32, y_max: f32) {
        let device = self
            .current_transform()
            .transform_extents(Extents::new(x_min, y_min, x_max, y_max));
        let clip = self.current_clip().intersect(&Bounds::Bounded(device));
        self.clips.push(clip);
    }

    /// Restrict painting to extents already expressed in device space.
    pub fn push_clip_extents(&mut self, extents: Extents) {
        let clip = self.current_clip().intersect(&Bounds::Bounded(extents));
        self.clips.push(clip);
    }

    pub fn pop_clip(&mut self) {
        self.clips.pop();
    }

    /// Begin a fresh bounds accumulator.
    pub fn push_group(&mut self) {
        self.groups.push(Bounds::Bounded(Extents::EMPTY));
    }

    /// Finish the innermost group, yielding what it accumulated.
    ///
    /// The result also becomes part of the enclosing group: a composited
    /// group occupies the space its contents painted.
    pub fn pop_group(&mut self) -> Bounds {
        let bounds = self.groups.pop().unwrap();
        let parent = self.groups.last_mut().unwrap();
        *parent = parent.union(&bounds);
        bounds
    }

    fn add_extents(&mut self, bounds: &Bounds) {
        let footprint = self.current_clip().intersect(bounds);
        let group = self.groups.last_mut().unwrap();
        *group = group.union(&footprint);
    }

    /// A solid paint: fills whatever the current clip allows.
    pub fn paint_color(&mut self) {
        self.add_extents(&Bounds::Unbounded);
    }

    /// An image with known extents in the current user space.
    pub fn paint_image(&mut self, extents: Extents) {
        let device = self.current_transform().transform_extents(extents);
        self.add_extents(&Bounds::Bounded(device));
    }

    /// A linear gradient: unbounded paint, clipped like a solid fill.
    pub fn paint_linear_gradient(&mut self) {
        self.add_extents(&Bounds::Unbounded);
    }

    /// A radial gradient: unbounded paint, clipped like a solid fill.
    pub fn paint_radial_gradient(&mut self) {
        self.add_extents(&Bounds::Unbounded);
    }

    /// A sweep gradient: unbounded paint, clipped like a solid fill.
    pub fn paint_sweep_gradient(&mut self) {
        self.add_extents(&Bounds::Unbounded);
    }
}

impl Default for PaintExtents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_order() {
        // translate then scale: the translation is scaled
        let scale = Transform::scale(2.0, 2.0);
        let composed = scale.pre_transform(&Transform::translate(3.0, 4.0));
        assert_eq!(composed.transform_point(0.0, 0.0), (6.0, 8.0));
        assert_eq!(composed.transform_point(1.0, 1.0), (8.0, 10.0));
    }

    #[test]
    fn rotated_extents_take_corner_bounds() {
        // quarter turn: (x, y) -> (-y, x)
        let rot = Transform {
            xx: 0.0,
            yx: 1.0,
            xy: -1.0,
            yy: 0.0,
            dx: 0.0,
            dy: 0.0,
        };
        let out = rot.transform_extents(Extents::new(1.0, 0.0, 3.0, 2.0));
        assert_eq!(out, Extents::new(-2.0, 1.0, 0.0, 3.0));
    }

    #[test]
    fn color_fills_the_clip() {
        let mut c = PaintExtents::new();
        c.push_clip_rect(0.0, 0.0, 10.0, 5.0);
        c.paint_color();
        c.pop_clip();
        assert_eq!(
            c.current_bounds().extents(),
            Some(Extents::new(0.0, 0.0, 10.0, 5.0))
        );
    }

    #[test]
    fn unclipped_color_is_unbounded() {
        let mut c = PaintExtents::new();
        c.paint_color();
        assert_eq!(*c.current_bounds(), Bounds::Unbounded);
    }

    #[test]
    fn transform_applies_to_clips() {
        let mut c = PaintExtents::new();
        c.push_transform(&Transform::translate(100.0, 0.0));
        c.push_clip_rect(0.0, 0.0, 1.0, 1.0);
        c.paint_color();
        c.pop_clip();
        c.pop_transform();
        assert_eq!(
            c.current_bounds().extents(),
            Some(Extents::new(100.0, 0.0, 101.0, 1.0))
        );
    }

    #[test]
    fn nested_clips_intersect() {
        let mut c = PaintExtents::new();
        c.push_clip_rect(0.0, 0.0, 10.0, 10.0);
        c.push_clip_rect(5.0, 5.0, 20.0, 20.0);
        c.paint_color();
        c.pop_clip();
        c.pop_clip();
        assert_eq!(
            c.current_bounds().extents(),
            Some(Extents::new(5.0, 5.0, 10.0, 10.0))
        );
    }

    #[test]
    fn groups_accumulate_into_parents() {
        let mut c = PaintExtents::new();
        c.push_group();
        c.push_clip_rect(0.0, 0.0, 2.0, 2.0);
        c.paint_color();
        c.pop_clip();
        let inner = c.pop_group();
        assert_eq!(inner.extents(), Some(Extents::new(0.0, 0.0, 2.0, 2.0)));
        // the parent saw the group's bounds too
        assert_eq!(c.current_bounds().extents(), inner.extents());
    }

    #[test]
    fn image_extents_are_transformed_and_clipped() {
        let mut c = PaintExtents::new();
        c.push_clip_rect(0.0, 0.0, 6.0, 6.0);
        c.push_transform(&Transform::scale(2.0, 2.0));
        c.paint_image(Extents::new(1.0, 1.0, 4.0, 4.0));
        c.pop_transform();
        c.pop_clip();
        // image maps to (2, 2, 8, 8), clipped to (2, 2, 6, 6)
        assert_eq!(
            c.current_bounds().extents(),
            Some(Extents::new(2.0, 2.0, 6.0, 6.0))
        );
    }

    #[test]
    fn disjoint_clip_paints_nothing() {
        let mut c = PaintExtents::new();
        c.push_clip_rect(0.0, 0.0, 1.0, 1.0);
        c.push_clip_rect(5.0, 5.0, 6.0, 6.0);
        c.paint_color();
        c.pop_clip();
        c.pop_clip();
        assert!(c.current_bounds().extents().unwrap().is_empty());
    }
}
