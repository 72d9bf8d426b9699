//! Row rendering and shading
//!
//! Consumes the frame's scanbit and dot streams in row order, classifies
//! every pixel from accumulated coverage, optionally lights it against the
//! sun direction, and hands finished RGB rows to the caller's sink.

use log::debug;

use crate::dots::{self, DotKind, ScanDot};
use crate::mapdata::MapData;
use crate::math3d::{sun_direction, Vec3, ViewRotation};
use crate::project::{Projection, ScreenMap};
use crate::scan::Scanner;
use crate::settings::Settings;

/// Receives each finished row of `width * 3` interleaved RGB bytes
///
/// Rows arrive strictly in order, 0 through height-1. Implementations own
/// all format-specific encoding; the renderer never sees the output format.
pub trait RowSink {
    fn emit(&mut self, y: usize, row: &[u8]);
}

impl<F: FnMut(usize, &[u8])> RowSink for F {
    fn emit(&mut self, y: usize, row: &[u8]) {
        self(y, row);
    }
}

/// Pixel classification after the coverage and decoration passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelKind {
    Space,
    Land,
    Water,
    Star,
    GridLand,
    GridWater,
}

/// Coverage byte → pixel kind, on the unsigned view of the wrapped sum
///
/// The 64 split is a design constant: the globe silhouette contributes
/// exactly 64 everywhere, so bare silhouette reads as water and any land
/// curve stacked on it pushes the sum past the threshold.
#[inline]
fn classify(cover: i8) -> PixelKind {
    match cover as u8 {
        0 => PixelKind::Space,
        1..=64 => PixelKind::Water,
        _ => PixelKind::Land,
    }
}

/// Shading constants precomputed once per frame
struct ShadeParams {
    sun: Vec3,
    night_val: i32,
    day_val_base: i32,
    day_val_delta: f64,
    fast_sqrt: bool,
}

impl ShadeParams {
    fn new(settings: &Settings, view: &ViewRotation) -> Self {
        let day = f64::from(settings.day);
        let night = f64::from(settings.night);
        let t = f64::from(settings.terminator) / 100.0;

        let night_val = (night * (255.99 / 100.0)) as i32;
        let day_val_base = ((t * day + (1.0 - t) * night) * (255.99 / 100.0)) as i32;
        let day_val_delta = day * (255.99 / 100.0) - f64::from(day_val_base);

        Self {
            sun: sun_direction(settings.sun_lat, settings.sun_lon, view),
            night_val,
            day_val_base,
            day_val_delta,
            fast_sqrt: settings.fast_shade_sqrt,
        }
    }

    /// Brightness for a surface point whose direction dots the sun to `scale`
    #[inline]
    fn brightness(&self, scale: f64) -> u8 {
        if scale < 0.0 {
            self.night_val as u8
        } else {
            let val = (f64::from(self.day_val_base) + scale * self.day_val_delta) as i32;
            debug_assert!(val >= 0);
            val.min(255) as u8
        }
    }
}

/// sqrt clamped to zero for slightly-negative limb values
#[inline]
fn limb_sqrt(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x.sqrt()
    }
}

/// Historical 2-piece quadratic approximation of sqrt over [0, 1]
///
/// Kept as an opt-in fast path for orthographic shading; see
/// `Settings::fast_shade_sqrt`.
#[inline]
fn quad_sqrt(x: f64) -> f64 {
    if x > 0.13 {
        ((-0.3751672414 * x) + 1.153263483) * x + 0.2219037586
    } else if x > 0.0 {
        ((-9.637346154 * x) + 3.56143) * x + 0.065372935
    } else {
        0.0
    }
}

/// Frame renderer owning every reusable buffer
///
/// One instance renders any number of frames; buffers are cleared, never
/// reallocated, between frames of the same size.
pub struct Renderer {
    scanner: Scanner,
    dots: Vec<ScanDot>,
    cover: Vec<i8>,
    kinds: Vec<PixelKind>,
    row: Vec<u8>,
    inv_x: Vec<f64>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            scanner: Scanner::new(),
            dots: Vec::new(),
            cover: Vec::new(),
            kinds: Vec::new(),
            row: Vec::new(),
            inv_x: Vec::new(),
        }
    }

    /// Render one complete frame, emitting rows 0..height-1 to `sink`
    ///
    /// The frame is a pure function of the settings and map: identical
    /// inputs (including the star seed) produce byte-identical output.
    pub fn render<S: RowSink + ?Sized>(
        &mut self,
        settings: &Settings,
        map: &MapData,
        sink: &mut S,
    ) {
        let width = settings.width;
        let height = settings.height;
        let view =
            ViewRotation::from_degrees(settings.view_lat, settings.view_lon, settings.view_rot);
        let screen = ScreenMap::new(
            settings.projection,
            width,
            height,
            settings.magnification,
            settings.shift_x,
            settings.shift_y,
        );

        self.scanner.scan_frame(settings, view, screen, map);
        dots::scan_dots(settings, &view, &screen, &mut self.dots);

        self.cover.clear();
        self.cover.resize(width, 0);
        self.kinds.clear();
        self.kinds.resize(width, PixelKind::Space);
        self.row.clear();
        self.row.resize(width * 3, 0);

        let shade = settings.shade.then(|| ShadeParams::new(settings, &view));
        if settings.shade && settings.projection == Projection::Orthographic {
            // orthographic shading reuses the same inverse-x value for every
            // row, so the table is computed once per frame
            self.inv_x.clear();
            self.inv_x
                .extend((0..width).map(|i| screen.inv_x_project(i as f64)));
        }

        let scanbits = self.scanner.scanbits();
        let mut sb_idx = 0;
        let mut dot_idx = 0;

        for y in 0..height {
            // accumulate coverage for this row
            for c in &mut self.cover {
                *c = 0;
            }
            while sb_idx < scanbits.len() && scanbits[sb_idx].y == y as i32 {
                let sb = scanbits[sb_idx];
                let v = sb.value as i8;
                for c in &mut self.cover[sb.lo_x as usize..=sb.hi_x as usize] {
                    *c = c.wrapping_add(v);
                }
                sb_idx += 1;
            }

            for (k, &c) in self.kinds.iter_mut().zip(self.cover.iter()) {
                *k = classify(c);
            }

            // overlay decorations: stars only onto space, grid onto terrain
            while dot_idx < self.dots.len() && self.dots[dot_idx].y == y as i32 {
                let d = self.dots[dot_idx];
                let k = &mut self.kinds[d.x as usize];
                match d.kind {
                    DotKind::Star => {
                        if *k == PixelKind::Space {
                            *k = PixelKind::Star;
                        }
                    }
                    DotKind::Grid => {
                        *k = match *k {
                            PixelKind::Land => PixelKind::GridLand,
                            PixelKind::Water => PixelKind::GridWater,
                            other => other,
                        };
                    }
                }
                dot_idx += 1;
            }

            match &shade {
                None => no_shade_row(&self.kinds, &mut self.row),
                Some(sp) => match settings.projection {
                    Projection::Orthographic => {
                        orth_shade_row(y, &self.kinds, sp, &self.inv_x, &screen, &mut self.row);
                    }
                    proj => seam_shade_row(y, &self.kinds, sp, proj, &screen, &mut self.row),
                },
            }

            sink.emit(y, &self.row);
        }

        debug!("rendered {width}x{height} frame");
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat palette: black space, white decorations, green land, blue water
fn no_shade_row(kinds: &[PixelKind], row: &mut [u8]) {
    for (k, px) in kinds.iter().zip(row.chunks_exact_mut(3)) {
        let rgb = match k {
            PixelKind::Space => [0, 0, 0],
            PixelKind::Star | PixelKind::GridLand | PixelKind::GridWater => [255, 255, 255],
            PixelKind::Land => [0, 255, 0],
            PixelKind::Water => [0, 0, 255],
        };
        px.copy_from_slice(&rgb);
    }
}

/// Shade one orthographic row
///
/// The view-space surface direction comes straight from the pixel position:
/// (x, y) from the inverse projection tables and z completing the unit
/// vector on the near hemisphere.
fn orth_shade_row(
    y: usize,
    kinds: &[PixelKind],
    sp: &ShadeParams,
    inv_x: &[f64],
    screen: &ScreenMap,
    row: &mut [u8],
) {
    let py = screen.inv_y_project(y as f64);
    let tmp = 1.0 - py * py;
    let y_sol = py * sp.sun.y;

    for (i, (k, px)) in kinds.iter().zip(row.chunks_exact_mut(3)).enumerate() {
        match k {
            PixelKind::Space => px.copy_from_slice(&[0, 0, 0]),
            PixelKind::Star | PixelKind::GridLand | PixelKind::GridWater => {
                px.copy_from_slice(&[255, 255, 255]);
            }
            PixelKind::Land | PixelKind::Water => {
                let x = inv_x[i];
                let z2 = tmp - x * x;
                let z = if sp.fast_sqrt {
                    quad_sqrt(z2)
                } else {
                    limb_sqrt(z2)
                };
                let scale = x * sp.sun.x + y_sol + z * sp.sun.z;
                let val = sp.brightness(scale);
                if *k == PixelKind::Land {
                    px.copy_from_slice(&[0, val, 0]);
                } else {
                    px.copy_from_slice(&[0, 0, val]);
                }
            }
        }
    }
}

/// Shade one Mercator or cylindrical row
///
/// Only the first pixel's surface direction uses trig; every following
/// pixel advances (x, z) by a 2D rotation of one pixel's worth of
/// longitude. The two projections differ solely in the inverse vertical
/// map that recovers view-space y for the row.
fn seam_shade_row(
    y: usize,
    kinds: &[PixelKind],
    sp: &ShadeParams,
    projection: Projection,
    screen: &ScreenMap,
    row: &mut [u8],
) {
    let py = projection.inv_plane_y(screen.inv_y_project(y as f64));

    let tmp = (1.0 - py * py).sqrt();
    let lon0 = screen.inv_x_project(0.0);
    let mut x = lon0.sin() * tmp;
    let mut z = lon0.cos() * tmp;
    let (sin_theta, cos_theta) = screen.inv_scale.sin_cos();
    let y_sol = py * sp.sun.y;

    for (k, px) in kinds.iter().zip(row.chunks_exact_mut(3)) {
        match k {
            PixelKind::Space => px.copy_from_slice(&[0, 0, 0]),
            PixelKind::Star | PixelKind::GridLand | PixelKind::GridWater => {
                px.copy_from_slice(&[255, 255, 255]);
            }
            PixelKind::Land | PixelKind::Water => {
                let scale = x * sp.sun.x + y_sol + z * sp.sun.z;
                let val = sp.brightness(scale);
                if *k == PixelKind::Land {
                    px.copy_from_slice(&[0, val, 0]);
                } else {
                    px.copy_from_slice(&[0, 0, val]);
                }
            }
        }

        // advance to the next pixel's longitude
        let t = cos_theta * z - sin_theta * x;
        x = sin_theta * z + cos_theta * x;
        z = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapdata::Curve;

    fn settings(width: usize, height: usize) -> Settings {
        Settings {
            width,
            height,
            shade: false,
            stars: false,
            grid: false,
            ..Settings::default()
        }
    }

    fn center_square_map(value: i32) -> MapData {
        MapData {
            curves: vec![Curve {
                value,
                points: vec![
                    Vec3::from_lat_lon(-2.0, -2.0),
                    Vec3::from_lat_lon(-2.0, 2.0),
                    Vec3::from_lat_lon(2.0, 2.0),
                    Vec3::from_lat_lon(2.0, -2.0),
                ],
            }],
        }
    }

    fn render_frame(settings: &Settings, map: &MapData) -> Vec<u8> {
        let mut frame = vec![0u8; settings.width * settings.height * 3];
        let width = settings.width;
        let mut seen = 0usize;
        let mut sink = |y: usize, row: &[u8]| {
            assert_eq!(y, seen, "rows must arrive in order");
            assert_eq!(row.len(), width * 3);
            frame[y * width * 3..(y + 1) * width * 3].copy_from_slice(row);
            seen += 1;
        };
        let mut renderer = Renderer::new();
        renderer.render(settings, map, &mut sink);
        drop(sink);
        assert_eq!(seen, settings.height);
        frame
    }

    fn pixel(frame: &[u8], width: usize, x: usize, y: usize) -> [u8; 3] {
        let i = (y * width + x) * 3;
        [frame[i], frame[i + 1], frame[i + 2]]
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(0), PixelKind::Space);
        assert_eq!(classify(1), PixelKind::Water);
        assert_eq!(classify(64), PixelKind::Water);
        assert_eq!(classify(65), PixelKind::Land);
        // a wrapped negative byte reads as a high unsigned value: land
        assert_eq!(classify(64i8.wrapping_add(100)), PixelKind::Land);
    }

    #[test]
    fn test_center_is_land_corner_is_space() {
        let s = settings(200, 200);
        let frame = render_frame(&s, &center_square_map(100));

        assert_eq!(pixel(&frame, 200, 100, 100), [0, 255, 0]); // land
        assert_eq!(pixel(&frame, 200, 0, 0), [0, 0, 0]); // space
        assert_eq!(pixel(&frame, 200, 100, 20), [0, 0, 255]); // water
    }

    #[test]
    fn test_far_side_point_never_renders() {
        // same curve moved to the antipode: the center must stay water
        let s = settings(200, 200);
        let map = MapData {
            curves: vec![Curve {
                value: 100,
                points: vec![
                    Vec3::from_lat_lon(-2.0, 178.0),
                    Vec3::from_lat_lon(-2.0, -178.0),
                    Vec3::from_lat_lon(2.0, -178.0),
                    Vec3::from_lat_lon(2.0, 178.0),
                ],
            }],
        };
        let frame = render_frame(&s, &map);
        assert_eq!(pixel(&frame, 200, 100, 100), [0, 0, 255]);
    }

    #[test]
    fn test_deterministic_with_stars_and_shade() {
        let mut s = settings(120, 90);
        s.shade = true;
        s.stars = true;
        s.grid = true;
        s.star_seed = 4242;
        s.sun_lon = 30.0;
        s.sun_lat = 10.0;

        let map = center_square_map(100);
        let a = render_frame(&s, &map);
        let b = render_frame(&s, &map);
        assert_eq!(a, b);
    }

    #[test]
    fn test_stars_only_on_space() {
        let mut s = settings(200, 200);
        s.stars = true;
        s.star_freq = 0.01;
        s.star_seed = 9;

        let plain = render_frame(&settings(200, 200), &MapData::empty());
        let starred = render_frame(&s, &MapData::empty());

        let mut star_pixels = 0;
        for y in 0..200 {
            for x in 0..200 {
                let before = pixel(&plain, 200, x, y);
                let after = pixel(&starred, 200, x, y);
                if after != before {
                    // only black space pixels may change, and only to white
                    assert_eq!(before, [0, 0, 0]);
                    assert_eq!(after, [255, 255, 255]);
                    star_pixels += 1;
                }
            }
        }
        assert!(star_pixels > 0);
    }

    #[test]
    fn test_grid_overlays_terrain_white() {
        let mut s = settings(200, 200);
        s.grid = true;

        let plain = render_frame(&settings(200, 200), &MapData::empty());
        let gridded = render_frame(&s, &MapData::empty());

        let mut grid_pixels = 0;
        for y in 0..200 {
            for x in 0..200 {
                let before = pixel(&plain, 200, x, y);
                let after = pixel(&gridded, 200, x, y);
                if after != before {
                    // grid promotes water pixels to white, never space
                    assert_eq!(before, [0, 0, 255]);
                    assert_eq!(after, [255, 255, 255]);
                    grid_pixels += 1;
                }
            }
        }
        assert!(grid_pixels > 0);
    }

    #[test]
    fn test_night_side_uses_night_value() {
        let mut s = settings(200, 200);
        s.shade = true;
        s.sun_lon = 180.0; // sun behind the globe
        s.day = 100;
        s.night = 5;

        let frame = render_frame(&s, &MapData::empty());
        let night_val = (5.0 * (255.99 / 100.0)) as u8;
        assert_eq!(pixel(&frame, 200, 100, 100), [0, 0, night_val]);
    }

    #[test]
    fn test_day_side_brighter_than_limb() {
        let mut s = settings(200, 200);
        s.shade = true;
        s.sun_lat = 0.0;
        s.sun_lon = 0.0;

        let frame = render_frame(&s, &MapData::empty());
        let center = pixel(&frame, 200, 100, 100);
        let limb = pixel(&frame, 200, 12, 100);
        assert!(center[2] > limb[2], "center {center:?} limb {limb:?}");
        assert_eq!(center[2], 255); // sub-solar pixel saturates at full day
    }

    #[test]
    fn test_shaded_seam_projection_lights_subsolar_point() {
        let mut s = settings(360, 180);
        s.projection = Projection::Mercator;
        s.shade = true;
        s.sun_lat = 0.0;
        s.sun_lon = 0.0;

        let frame = render_frame(&s, &MapData::empty());
        let center = pixel(&frame, 360, 180, 90);
        let near_seam = pixel(&frame, 360, 4, 90);
        assert_eq!(center[2], 255);
        // the antipodal meridian sits in darkness
        let night_val = (f64::from(s.night) * (255.99 / 100.0)) as u8;
        assert_eq!(near_seam[2], night_val);
    }

    #[test]
    fn test_quad_sqrt_tracks_exact_sqrt() {
        let mut x = 0.05;
        while x <= 1.0 {
            let err = (quad_sqrt(x) - x.sqrt()).abs();
            assert!(err < 0.02, "error {err} at {x}");
            x += 0.01;
        }
        assert_eq!(quad_sqrt(-0.5), 0.0);
        assert_eq!(limb_sqrt(-0.5), 0.0);
    }

    #[test]
    fn test_fast_sqrt_mode_stays_close() {
        let mut s = settings(100, 100);
        s.shade = true;
        let exact = render_frame(&s, &MapData::empty());
        s.fast_shade_sqrt = true;
        let fast = render_frame(&s, &MapData::empty());

        for (a, b) in exact.iter().zip(fast.iter()) {
            assert!(a.abs_diff(*b) <= 16, "fast sqrt diverged: {a} vs {b}");
        }
    }
}
