//! 3D math for the spherical rendering pipeline
//!
//! Provides an f64 vector type, the viewer rotation applied to every map
//! point before projection, and the sun direction used by shading.

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point on the unit sphere at a latitude/longitude, in degrees
    ///
    /// Latitude is positive north, longitude positive east; (0, 0) sits on
    /// the +z axis so an identity view rotation faces it directly.
    #[inline]
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        let lat = lat.to_radians();
        let lon = lon.to_radians();
        Self {
            x: lon.sin() * lat.cos(),
            y: lat.sin(),
            z: lon.cos() * lat.cos(),
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

/// Viewer orientation as precomputed cos/sin of the three view angles
///
/// Rotation order is fixed: longitude roll, then latitude tilt, then the
/// final in-plane rotation. The composition is not commutative; reordering
/// the steps changes which hemisphere faces the viewer.
#[derive(Debug, Clone, Copy)]
pub struct ViewRotation {
    cos_lat: f64,
    sin_lat: f64,
    cos_lon: f64,
    sin_lon: f64,
    cos_rot: f64,
    sin_rot: f64,
}

impl ViewRotation {
    /// Build from view angles in degrees
    pub fn from_degrees(lat: f64, lon: f64, rot: f64) -> Self {
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
        let (sin_rot, cos_rot) = rot.to_radians().sin_cos();
        Self {
            cos_lat,
            sin_lat,
            cos_lon,
            sin_lon,
            cos_rot,
            sin_rot,
        }
    }

    /// Identity rotation: viewer above lat 0, lon 0, north up
    pub fn identity() -> Self {
        Self::from_degrees(0.0, 0.0, 0.0)
    }

    /// Rotate a point into view space (view-space +z faces the viewer)
    #[inline]
    pub fn rotate(&self, p: Vec3) -> Vec3 {
        let t = self.cos_lon * p.x - self.sin_lon * p.z;
        let z = self.sin_lon * p.x + self.cos_lon * p.z;
        let x = t;

        let t = self.cos_lat * p.y - self.sin_lat * z;
        let z = self.sin_lat * p.y + self.cos_lat * z;
        let y = t;

        let t = self.cos_rot * x - self.sin_rot * y;
        let y = self.sin_rot * x + self.cos_rot * y;
        let x = t;

        Vec3::new(x, y, z)
    }
}

impl Default for ViewRotation {
    fn default() -> Self {
        Self::identity()
    }
}

/// Unit vector toward the sun, in view space
///
/// The sun's sub-solar point is given in degrees and rotated by the same
/// viewer transform as every map point, so shading happens in one space.
pub fn sun_direction(sun_lat: f64, sun_lon: f64, view: &ViewRotation) -> Vec3 {
    view.rotate(Vec3::from_lat_lon(sun_lat, sun_lon))
}
