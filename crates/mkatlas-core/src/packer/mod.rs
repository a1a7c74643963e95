use serde::{Deserialize, Serialize};

use crate::model::Rect;

pub mod maxrects;

/// Handle for a rectangle submitted to a packer; indexes its [`Placement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) usize);

impl RequestId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Requested size of a rectangle and, once packed, where it went.
///
/// `width`/`height` always hold the requested (unrotated) size; `flipped`
/// says whether the footprint in the bin is rotated by 90°.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub flipped: bool,
    /// Destination bin; `None` while unassigned, for zero-area requests,
    /// and for requests left over when the bin limit was hit.
    pub bin: Option<usize>,
}

impl Placement {
    pub(crate) fn unplaced(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            flipped: false,
            bin: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Area occupied inside the bin (post-rotation width/height).
    pub fn footprint(&self) -> Rect {
        if self.flipped {
            Rect::new(self.x, self.y, self.height, self.width)
        } else {
            Rect::new(self.x, self.y, self.width, self.height)
        }
    }
}
