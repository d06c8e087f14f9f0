use crate::notification::domain::identity::Identity;
use crate::shared::bounding_box::BoundingBox;

/// Outcome of matching one detected face in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    pub bbox: BoundingBox,
    pub identity: Identity,
    pub score: f32,
    /// Whether this recognition passed the cooldown and was sent to the sinks.
    pub emitted: bool,
}
