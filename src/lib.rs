//! globescan - software scanline renderer for views of the Earth
//!
//! Renders a view of the planet from a database of coastline and border
//! curves on the unit sphere: orthographic from space, or unrolled through
//! a Mercator or cylindrical projection. Curves are rotated into view
//! space, clipped against the horizon or the ±180° seam, scan-converted
//! into per-row coverage runs, decorated with stars and an optional
//! latitude/longitude grid, shaded against the sun, and streamed to a
//! caller-supplied row sink one RGB row at a time.
//!
//! ```no_run
//! use globescan::{MapData, Renderer, Settings};
//!
//! let settings = Settings::default();
//! let map = MapData::empty();
//! let mut frame = vec![0u8; settings.width * settings.height * 3];
//!
//! let mut renderer = Renderer::new();
//! let width = settings.width;
//! renderer.render(&settings, &map, &mut |y: usize, row: &[u8]| {
//!     frame[y * width * 3..(y + 1) * width * 3].copy_from_slice(row);
//! });
//! ```

pub mod dots;
pub mod mapdata;
pub mod math3d;
pub mod project;
pub mod render;
pub mod scan;
pub mod settings;
pub mod util;

pub use mapdata::{Curve, MapData, MapDataError};
pub use project::Projection;
pub use render::{Renderer, RowSink};
pub use scan::ScanBit;
pub use settings::Settings;
