//! Coordinate spaces and the spatial-node contract

use orrery_geom::{Frame, Vec3};

use super::SceneError;

/// The three spaces a frame can be read or written in.
///
/// `Object` is relative to the parent, `Scene` is relative to the scene
/// root and `World` additionally applies the scene root transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordSpace {
    World,
    Scene,
    Object,
}

/// Anything with a position in the hierarchy.
pub trait SpatialNode {
    fn local_frame(&self, space: CoordSpace) -> Result<Frame, SceneError>;

    fn local_scale(&self) -> Vec3;
}

/// A spatial node whose frame and scale can be written.
pub trait Transformable: SpatialNode {
    fn set_local_frame(&mut self, frame: Frame, space: CoordSpace) -> Result<(), SceneError>;

    fn supports_scaling(&self) -> bool;

    /// Fails with [`SceneError::UnsupportedOperation`] when
    /// [`Transformable::supports_scaling`] is false.
    fn set_local_scale(&mut self, scale: Vec3) -> Result<(), SceneError>;
}

pub(crate) fn check_scale(scale: Vec3) -> Result<(), SceneError> {
    if scale.x < 0.0 || scale.y < 0.0 || scale.z < 0.0 || !scale.x.is_finite()
        || !scale.y.is_finite() || !scale.z.is_finite()
    {
        return Err(SceneError::InvalidArgument(format!("invalid scale {:?}", scale)));
    }
    Ok(())
}
