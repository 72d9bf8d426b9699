//! Plane projections and the plane-to-screen mapping
//!
//! A rotated view-space point first maps onto the 2D projection plane
//! (orthographic, Mercator, or cylindrical), then an affine [`ScreenMap`]
//! carries plane coordinates to pixel coordinates. Inverse maps exist for
//! every step so shading can walk pixels back onto the sphere.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Sentinel plane coordinate standing in for the pole singularities
///
/// Mercator and cylindrical vertical maps blow up as |y| approaches 1; the
/// projection clamps to this value instead of producing infinities.
pub const BIG_NUMBER: f64 = 1e6;

/// Threshold just inside 1.0 guarding the tan()/ln() pole blowup
const POLE_LIMIT: f64 = 0.9999999999;

/// Supported projections from view space onto the plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Orthographic,
    Mercator,
    Cylindrical,
}

impl Projection {
    /// True when the projection unrolls the sphere and has a ±π longitude
    /// seam instead of a visibility horizon
    #[inline]
    pub fn has_seam(self) -> bool {
        !matches!(self, Projection::Orthographic)
    }

    /// Horizontal plane coordinate (the longitude angle) of a view-space
    /// point; only meaningful for the seam projections
    #[inline]
    pub fn plane_x(self, x: f64, z: f64) -> f64 {
        x.atan2(z)
    }

    /// Vertical plane coordinate of a view-space y, clamped at the poles
    #[inline]
    pub fn plane_y(self, y: f64) -> f64 {
        match self {
            Projection::Orthographic => y,
            Projection::Mercator => {
                if y >= POLE_LIMIT {
                    BIG_NUMBER
                } else if y <= -POLE_LIMIT {
                    -BIG_NUMBER
                } else {
                    (y.asin() / 2.0 + PI / 4.0).tan().ln()
                }
            }
            Projection::Cylindrical => {
                if y >= POLE_LIMIT {
                    BIG_NUMBER
                } else if y <= -POLE_LIMIT {
                    -BIG_NUMBER
                } else {
                    y.asin().tan()
                }
            }
        }
    }

    /// Inverse of [`plane_y`](Self::plane_y), back to view-space y
    #[inline]
    pub fn inv_plane_y(self, y: f64) -> f64 {
        match self {
            Projection::Orthographic => y,
            Projection::Mercator => (2.0 * (y.exp().atan() - PI / 4.0)).sin(),
            Projection::Cylindrical => y.atan().sin(),
        }
    }
}

/// Affine mapping from plane coordinates to screen pixels
///
/// Screen y grows downward, so the vertical map is mirrored.
#[derive(Debug, Clone, Copy)]
pub struct ScreenMap {
    pub scale: f64,
    pub x_ofs: f64,
    pub y_ofs: f64,
    pub inv_scale: f64,
}

impl ScreenMap {
    /// Build the per-frame mapping for an image and magnification
    ///
    /// Orthographic fits the unit disc to the short image dimension (with a
    /// 1% margin so the limb stays inside the frame); the seam projections
    /// fit the full 2π of longitude to the image width.
    pub fn new(
        projection: Projection,
        width: usize,
        height: usize,
        magnification: f64,
        shift_x: i32,
        shift_y: i32,
    ) -> Self {
        let scale = match projection {
            Projection::Orthographic => {
                width.min(height) as f64 * (magnification / 2.0) * 0.99
            }
            Projection::Mercator | Projection::Cylindrical => {
                magnification * width as f64 / (2.0 * PI)
            }
        };
        Self {
            scale,
            x_ofs: width as f64 / 2.0 + f64::from(shift_x),
            y_ofs: height as f64 / 2.0 + f64::from(shift_y),
            inv_scale: 1.0 / scale,
        }
    }

    #[inline]
    pub fn x_project(&self, x: f64) -> f64 {
        self.scale * x + self.x_ofs
    }

    #[inline]
    pub fn y_project(&self, y: f64) -> f64 {
        self.y_ofs - self.scale * y
    }

    #[inline]
    pub fn inv_x_project(&self, sx: f64) -> f64 {
        (sx - self.x_ofs) * self.inv_scale
    }

    #[inline]
    pub fn inv_y_project(&self, sy: f64) -> f64 {
        (self.y_ofs - sy) * self.inv_scale
    }
}

impl Default for ScreenMap {
    /// Identity plane-to-pixel mapping; real frames always rebuild via `new`
    fn default() -> Self {
        Self {
            scale: 1.0,
            x_ofs: 0.0,
            y_ofs: 0.0,
            inv_scale: 1.0,
        }
    }
}
