//! Star and grid decorations
//!
//! Stars scatter uniformly over the whole image; grid dots sample meridians
//! and parallels on the sphere and pass through the same rotation,
//! visibility test, and projection as map points. Both kinds land in one
//! per-frame list sorted by row, mirroring the scanbit ordering contract.

use std::f64::consts::PI;

use log::debug;

use crate::math3d::{Vec3, ViewRotation};
use crate::project::{Projection, ScreenMap};
use crate::settings::Settings;
use crate::util::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotKind {
    Star,
    Grid,
}

/// A single decorative pixel
#[derive(Debug, Clone, Copy)]
pub struct ScanDot {
    pub x: i32,
    pub y: i32,
    pub kind: DotKind,
}

/// Regenerate the frame's decoration list into `dots`
pub fn scan_dots(
    settings: &Settings,
    view: &ViewRotation,
    screen: &ScreenMap,
    dots: &mut Vec<ScanDot>,
) {
    dots.clear();

    if settings.stars {
        scatter_stars(settings, dots);
    }
    if settings.grid {
        sample_grid(settings, view, screen, dots);
    }

    dots.sort_by_key(|d| d.y);
    debug!("generated {} decoration dots", dots.len());
}

fn scatter_stars(settings: &Settings, dots: &mut Vec<ScanDot>) {
    let mut rng = Rng::new(settings.star_seed);
    let width = settings.width as i32;
    let count = ((settings.width * settings.height) as f64 * settings.star_freq) as usize;

    for _ in 0..count {
        let x = rng.index(settings.width) as i32;
        let y = rng.index(settings.height) as i32;
        dots.push(ScanDot {
            x,
            y,
            kind: DotKind::Star,
        });

        // double-wide stars get a partner pixel immediately to the right
        if settings.big_stars > 0 && x + 1 < width && rng.percent(settings.big_stars) {
            dots.push(ScanDot {
                x: x + 1,
                y,
                kind: DotKind::Star,
            });
        }
    }
}

fn sample_grid(
    settings: &Settings,
    view: &ViewRotation,
    screen: &ScreenMap,
    dots: &mut Vec<ScanDot>,
) {
    let big = settings.grid_big;
    let small = settings.grid_small;

    // meridians: fixed longitudes, walked in latitude
    let lon_scale = PI / f64::from(2 * big);
    let lat_scale = PI / f64::from(2 * big * small);
    for i in (-2 * big)..(2 * big) {
        let lon = f64::from(i) * lon_scale;
        let (sin_lon, cos_lon) = lon.sin_cos();

        for j in (-(big * small) + 1)..(big * small) {
            let lat = f64::from(j) * lat_scale;
            let (sin_lat, cos_lat) = lat.sin_cos();
            grid_dot(settings, view, screen, sin_lat, cos_lat, sin_lon, cos_lon, dots);
        }
    }

    // parallels: dot count tracks the shrinking circumference
    let lat_scale = PI / f64::from(2 * big);
    for i in (1 - big)..big {
        let lat = f64::from(i) * lat_scale;
        let (sin_lat, cos_lat) = lat.sin_cos();

        let cnt = 2 * ((cos_lat * f64::from(small) + 0.5) as i32) * big;
        if cnt == 0 {
            continue; // parallel too close to a pole to carry any dots
        }
        let lon_scale = PI / f64::from(cnt);

        for j in -cnt..cnt {
            let lon = f64::from(j) * lon_scale;
            let (sin_lon, cos_lon) = lon.sin_cos();
            grid_dot(settings, view, screen, sin_lat, cos_lat, sin_lon, cos_lon, dots);
        }
    }
}

fn grid_dot(
    settings: &Settings,
    view: &ViewRotation,
    screen: &ScreenMap,
    sin_lat: f64,
    cos_lat: f64,
    sin_lon: f64,
    cos_lon: f64,
    dots: &mut Vec<ScanDot>,
) {
    let pos = view.rotate(Vec3::new(sin_lon * cos_lat, sin_lat, cos_lon * cos_lat));

    let (px, py) = match settings.projection {
        Projection::Orthographic => {
            if pos.z <= 0.0 {
                return; // back hemisphere
            }
            (pos.x, pos.y)
        }
        proj => (proj.plane_x(pos.x, pos.z), proj.plane_y(pos.y)),
    };

    let x = screen.x_project(px) as i32;
    let y = screen.y_project(py) as i32;
    if x >= 0 && x < settings.width as i32 && y >= 0 && y < settings.height as i32 {
        dots.push(ScanDot {
            x,
            y,
            kind: DotKind::Grid,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(stars: bool, grid: bool) -> Settings {
        Settings {
            width: 200,
            height: 150,
            stars,
            grid,
            star_freq: 0.01,
            star_seed: 77,
            ..Settings::default()
        }
    }

    fn generate(settings: &Settings) -> Vec<ScanDot> {
        let view = ViewRotation::from_degrees(settings.view_lat, settings.view_lon, settings.view_rot);
        let screen = ScreenMap::new(
            settings.projection,
            settings.width,
            settings.height,
            settings.magnification,
            settings.shift_x,
            settings.shift_y,
        );
        let mut dots = Vec::new();
        scan_dots(settings, &view, &screen, &mut dots);
        dots
    }

    #[test]
    fn test_star_count_and_bounds() {
        let s = settings(true, false);
        let dots = generate(&s);

        assert_eq!(dots.len(), 200 * 150 / 100);
        assert!(dots
            .iter()
            .all(|d| d.x >= 0 && d.x < 200 && d.y >= 0 && d.y < 150));
        assert!(dots.iter().all(|d| d.kind == DotKind::Star));
    }

    #[test]
    fn test_stars_deterministic_per_seed() {
        let s = settings(true, false);
        let a = generate(&s);
        let b = generate(&s);
        assert_eq!(a.len(), b.len());
        assert!(a
            .iter()
            .zip(b.iter())
            .all(|(x, y)| x.x == y.x && x.y == y.y));

        let mut s2 = settings(true, false);
        s2.star_seed = 78;
        let c = generate(&s2);
        assert!(a.iter().zip(c.iter()).any(|(x, y)| x.x != y.x || x.y != y.y));
    }

    #[test]
    fn test_big_stars_get_partners() {
        let mut s = settings(true, false);
        s.big_stars = 100;
        let dots = generate(&s);

        // every star whose partner fits emits exactly one extra dot
        let singles = generate(&settings(true, false));
        assert!(dots.len() > singles.len());
        assert!(dots.len() <= 2 * singles.len());
    }

    #[test]
    fn test_dots_sorted_by_row() {
        let mut s = settings(true, true);
        s.big_stars = 25;
        let dots = generate(&s);
        assert!(dots.windows(2).all(|w| w[0].y <= w[1].y));
    }

    #[test]
    fn test_orthographic_grid_stays_on_disc() {
        let s = settings(false, true);
        let dots = generate(&s);
        assert!(!dots.is_empty());
        assert!(dots.iter().all(|d| d.kind == DotKind::Grid));

        // visible grid dots all sit inside the projected disc
        let radius = 150.0 / 2.0 * 0.99;
        for d in &dots {
            let dx = f64::from(d.x) - 100.0;
            let dy = f64::from(d.y) - 75.0;
            assert!(
                dx * dx + dy * dy <= (radius + 1.5) * (radius + 1.5),
                "grid dot off the disc: {d:?}"
            );
        }
    }

    #[test]
    fn test_grid_culls_far_hemisphere() {
        // under an identity view the antipode's meridian ring is invisible,
        // so well under half of all sampled grid points survive
        let s = settings(false, true);
        let dots = generate(&s);
        let meridian_samples = 4 * s.grid_big * (2 * s.grid_big * s.grid_small - 1);
        assert!(dots.len() < meridian_samples as usize);
    }

    #[test]
    fn test_mercator_grid_spans_width() {
        let mut s = settings(false, true);
        s.projection = Projection::Mercator;
        let dots = generate(&s);

        // the unrolled projection keeps both hemispheres visible
        assert!(dots.iter().any(|d| d.x < 50));
        assert!(dots.iter().any(|d| d.x > 150));
        assert!(dots
            .iter()
            .all(|d| d.x >= 0 && d.x < 200 && d.y >= 0 && d.y < 150));
    }
}
