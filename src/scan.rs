//! Outline scan-conversion
//!
//! Walks every map curve in screen space, clips it against the projection's
//! discontinuity (the horizon circle in orthographic mode, the ±π longitude
//! seam otherwise), and compacts the per-scanline crossings into coverage
//! runs ("scanbits") sorted by row for the renderer.
//!
//! Curves are closed, so whenever one leaves the visible region a synthetic
//! edge crossing is recorded on the boundary. After a full curve has been
//! walked the crossings are sorted and paired exit→entry, and each gap is
//! closed along the boundary itself — a horizon arc or a run along the rim
//! of the projected plane rectangle — so the rasterizer still sees a closed
//! interior with an even number of crossings on every scanline.

use std::f64::consts::PI;

use log::debug;

use crate::mapdata::MapData;
use crate::math3d::{Vec3, ViewRotation};
use crate::project::{Projection, ScreenMap, BIG_NUMBER};
use crate::settings::Settings;

/// Weight of the globe silhouette baseline fill
///
/// Together with the coverage classification split this makes bare globe
/// render as water and any land curve on top of it push past the threshold.
pub const OUTLINE_VALUE: i32 = 64;

/// A horizontal coverage run contributed to one scanline by one curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBit {
    pub y: i32,
    pub lo_x: i32,
    pub hi_x: i32,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XingKind {
    Entry,
    Exit,
}

/// Synthetic point where a curve crosses the orthographic horizon circle
#[derive(Debug, Clone, Copy)]
struct HorizonXing {
    kind: XingKind,
    curve: usize,
    x: f64,
    y: f64,
    angle: f64,
}

/// Which vertical seam edge a crossing sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeamSide {
    Right,
    Left,
}

impl SeamSide {
    /// Sort rank; doubles as the starting state of the rim corner walk
    #[inline]
    fn rank(self) -> u8 {
        match self {
            SeamSide::Right => 0,
            SeamSide::Left => 2,
        }
    }

    #[inline]
    fn plane_x(self) -> f64 {
        match self {
            SeamSide::Right => PI,
            SeamSide::Left => -PI,
        }
    }
}

/// Synthetic point where a curve crosses the ±π seam
#[derive(Debug, Clone, Copy)]
struct SeamXing {
    kind: XingKind,
    curve: usize,
    side: SeamSide,
    y: f64,
}

/// Rotated curve point carrying its plane projection
#[derive(Debug, Clone, Copy)]
struct PlanePoint {
    pos: Vec3,
    px: f64,
    py: f64,
}

/// Scan-converter state, reusable across frames
///
/// All buffers are cleared, never shrunk, between frames, so a long-lived
/// `Scanner` settles into steady-state allocations.
pub struct Scanner {
    width: i32,
    height: i32,
    projection: Projection,
    view: ViewRotation,
    screen: ScreenMap,
    view_lat: f64,
    view_lon: f64,
    scanbits: Vec<ScanBit>,
    scanbuf: Vec<Vec<f64>>,
    horizon_xings: Vec<HorizonXing>,
    seam_xings: Vec<SeamXing>,
    min_y: i32,
    max_y: i32,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            projection: Projection::Orthographic,
            view: ViewRotation::identity(),
            screen: ScreenMap::default(),
            view_lat: 0.0,
            view_lon: 0.0,
            scanbits: Vec::new(),
            scanbuf: Vec::new(),
            horizon_xings: Vec::new(),
            seam_xings: Vec::new(),
            min_y: 0,
            max_y: -1,
        }
    }

    /// Scan one frame: the globe silhouette plus every map curve
    ///
    /// Afterwards [`scanbits`](Self::scanbits) holds the frame's coverage
    /// runs sorted by row.
    pub fn scan_frame(
        &mut self,
        settings: &Settings,
        view: ViewRotation,
        screen: ScreenMap,
        map: &MapData,
    ) {
        self.width = settings.width as i32;
        self.height = settings.height as i32;
        self.projection = settings.projection;
        self.view = view;
        self.screen = screen;
        self.view_lat = settings.view_lat;
        self.view_lon = settings.view_lon;

        self.scanbits.clear();
        self.horizon_xings.clear();
        self.seam_xings.clear();
        for buf in &mut self.scanbuf {
            buf.clear();
        }
        self.scanbuf.resize_with(settings.height, Vec::new);

        if self.projection.has_seam() {
            self.seam_scan_outline();
            self.seam_scan_curves(map);
        } else {
            self.orth_scan_outline();
            self.orth_scan_curves(map);
        }

        self.scanbits.sort_by_key(|sb| sb.y);
        debug!(
            "scanned {} curves into {} scanbits",
            map.curves.len(),
            self.scanbits.len()
        );
    }

    /// The frame's coverage runs, sorted by row
    pub fn scanbits(&self) -> &[ScanBit] {
        &self.scanbits
    }

    // ========================================================================
    // Segment scanner and compactor
    // ========================================================================

    /// Record one x crossing per scanline crossed by a screen-space segment
    ///
    /// Rows sample at their centers (y = row + 0.5); an endpoint sitting
    /// exactly on a row center belongs to the row above it.
    fn scan_segment(&mut self, x_0: f64, y_0: f64, x_1: f64, y_1: f64) {
        let mut lo_y;
        let mut hi_y;

        if y_0 < y_1 {
            lo_y = (y_0 - 0.5).ceil() as i32;
            hi_y = (y_1 - 0.5).floor() as i32;
            if f64::from(hi_y) == y_1 - 0.5 {
                hi_y -= 1;
            }
        } else {
            lo_y = (y_1 - 0.5).ceil() as i32;
            hi_y = (y_0 - 0.5).floor() as i32;
            if f64::from(hi_y) == y_0 - 0.5 {
                hi_y -= 1;
            }
        }

        if lo_y < 0 {
            lo_y = 0;
        }
        if hi_y >= self.height {
            hi_y = self.height - 1;
        }
        if lo_y > hi_y {
            return; // no scanlines crossed
        }

        if lo_y < self.min_y {
            self.min_y = lo_y;
        }
        if hi_y > self.max_y {
            self.max_y = hi_y;
        }

        let x_delta = (x_1 - x_0) / (y_1 - y_0);
        let mut x_value = x_0 + x_delta * ((f64::from(lo_y) + 0.5) - y_0);
        for row in lo_y..=hi_y {
            self.scanbuf[row as usize].push(x_value);
            x_value += x_delta;
        }
    }

    /// Scan a segment given in plane coordinates
    fn scan_plane_segment(&mut self, x_0: f64, y_0: f64, x_1: f64, y_1: f64) {
        self.scan_segment(
            self.screen.x_project(x_0),
            self.screen.y_project(y_0),
            self.screen.x_project(x_1),
            self.screen.y_project(y_1),
        );
    }

    /// Pair each dirty row's sorted crossings into clamped coverage runs
    /// carrying one weight value, then reset the row buffers
    fn compact_scanbits(&mut self, value: i32) {
        let (min_y, max_y, width) = (self.min_y, self.max_y, self.width);
        let Self {
            scanbuf, scanbits, ..
        } = self;

        for row in min_y..=max_y {
            let vals = &mut scanbuf[row as usize];
            assert!(
                vals.len() % 2 == 0,
                "odd crossing count {} on row {row}",
                vals.len()
            );
            vals.sort_by(|a, b| a.partial_cmp(b).unwrap());

            for pair in vals.chunks_exact(2) {
                let mut lo_x = (pair[0] - 0.5).ceil() as i32;
                let mut hi_x = (pair[1] - 0.5).floor() as i32;

                if lo_x < 0 {
                    lo_x = 0;
                }
                if hi_x >= width {
                    hi_x = width - 1;
                }
                if lo_x <= hi_x {
                    scanbits.push(ScanBit {
                        y: row,
                        lo_x,
                        hi_x,
                        value,
                    });
                }
            }
            vals.clear();
        }
    }

    /// Abort on a corrupted crossing sequence
    ///
    /// This means a bad curve database or a projection bug, never a
    /// recoverable runtime condition; retrying would fail identically.
    fn xing_failure(&self, what: &str, curve: usize) -> ! {
        panic!(
            "{what} (curve {curve}, view_lat {}, view_lon {})",
            self.view_lat, self.view_lon
        );
    }

    // ========================================================================
    // Orthographic: horizon culling and arc closing
    // ========================================================================

    fn orth_scan_outline(&mut self) {
        self.min_y = self.height;
        self.max_y = -1;

        self.orth_scan_arc(1.0, 0.0, 0.0, 1.0, 0.0, 2.0 * PI);

        self.compact_scanbits(OUTLINE_VALUE);
    }

    fn orth_scan_curves(&mut self, map: &MapData) {
        for (cidx, curve) in map.curves.iter().enumerate() {
            if curve.points.is_empty() {
                continue;
            }
            let pos: Vec<Vec3> = curve.points.iter().map(|&p| self.view.rotate(p)).collect();

            self.min_y = self.height;
            self.max_y = -1;

            let mut prev = pos[pos.len() - 1];
            for &curr in &pos {
                self.orth_scan_along(prev, curr, cidx);
                prev = curr;
            }

            if !self.horizon_xings.is_empty() {
                self.orth_handle_xings();
            }
            if self.min_y <= self.max_y {
                self.compact_scanbits(curve.value);
            }
        }
    }

    /// Scan the visible portion of one curve segment, recording a horizon
    /// crossing when exactly one endpoint is on the far hemisphere
    fn orth_scan_along(&mut self, prev: Vec3, curr: Vec3, cidx: usize) {
        let mut prev = prev;
        let mut curr = curr;

        if prev.z <= 0.0 {
            if curr.z <= 0.0 {
                return; // neither endpoint visible
            }
            let extra = horizon_crossing(prev, curr);
            self.horizon_xings.push(HorizonXing {
                kind: XingKind::Entry,
                curve: cidx,
                x: extra.x,
                y: extra.y,
                angle: extra.y.atan2(extra.x),
            });
            prev = extra;
        } else if curr.z <= 0.0 {
            let extra = horizon_crossing(prev, curr);
            self.horizon_xings.push(HorizonXing {
                kind: XingKind::Exit,
                curve: cidx,
                x: extra.x,
                y: extra.y,
                angle: extra.y.atan2(extra.x),
            });
            curr = extra;
        }

        self.scan_plane_segment(prev.x, prev.y, curr.x, curr.y);
    }

    /// Sort the curve's horizon crossings by angle and close each exit→entry
    /// gap with an arc along the horizon circle
    fn orth_handle_xings(&mut self) {
        let mut xings = std::mem::take(&mut self.horizon_xings);

        if xings.len() % 2 != 0 {
            self.xing_failure("odd horizon crossing count", xings[0].curve);
        }
        xings.sort_by(|a, b| a.angle.partial_cmp(&b.angle).unwrap());

        if xings[0].kind == XingKind::Exit {
            for pair in xings.chunks_exact(2) {
                let (from, to) = (pair[0], pair[1]);
                if from.kind != XingKind::Exit || to.kind != XingKind::Entry {
                    self.xing_failure("mismatched exit/entry pair", from.curve);
                }
                self.orth_scan_arc(from.x, from.y, from.angle, to.x, to.y, to.angle);
            }
        } else {
            // first crossing is an entry: the matching exit wraps past 2π
            let from = xings[xings.len() - 1];
            let to = xings[0];
            if from.kind != XingKind::Exit || to.kind != XingKind::Entry || from.angle < to.angle {
                self.xing_failure("mismatched wrapped exit/entry pair", from.curve);
            }
            self.orth_scan_arc(from.x, from.y, from.angle, to.x, to.y, to.angle + 2.0 * PI);

            for pair in xings[1..xings.len() - 1].chunks_exact(2) {
                let (from, to) = (pair[0], pair[1]);
                if from.kind != XingKind::Exit || to.kind != XingKind::Entry {
                    self.xing_failure("mismatched exit/entry pair", from.curve);
                }
                self.orth_scan_arc(from.x, from.y, from.angle, to.x, to.y, to.angle);
            }
        }

        xings.clear();
        self.horizon_xings = xings;
    }

    /// Scan a horizon arc between two crossings
    ///
    /// The arc samples by incrementally rotating a unit vector one step at a
    /// time instead of calling cos/sin for every sample.
    fn orth_scan_arc(&mut self, x_0: f64, y_0: f64, a_0: f64, x_1: f64, y_1: f64, a_1: f64) {
        assert!(a_0 < a_1);

        let mut step = self.screen.inv_scale * 10.0;
        if step > 0.05 {
            step = 0.05;
        }
        let lo = (a_0 / step).ceil() as i64;
        let hi = (a_1 / step).floor() as i64;

        let mut prev_x = self.screen.x_project(x_0);
        let mut prev_y = self.screen.y_project(y_0);

        if lo <= hi {
            let (s_step, c_step) = step.sin_cos();
            let angle = lo as f64 * step;
            let mut arc_x = angle.cos();
            let mut arc_y = angle.sin();

            for _ in lo..=hi {
                let curr_x = self.screen.x_project(arc_x);
                let curr_y = self.screen.y_project(arc_y);
                self.scan_segment(prev_x, prev_y, curr_x, curr_y);

                let t = c_step * arc_x - s_step * arc_y;
                arc_y = s_step * arc_x + c_step * arc_y;
                arc_x = t;

                prev_x = curr_x;
                prev_y = curr_y;
            }
        }

        let curr_x = self.screen.x_project(x_1);
        let curr_y = self.screen.y_project(y_1);
        self.scan_segment(prev_x, prev_y, curr_x, curr_y);
    }

    // ========================================================================
    // Mercator/cylindrical: seam splitting and rim closing
    // ========================================================================

    /// Scan the rim of the projected plane rectangle as the baseline fill
    fn seam_scan_outline(&mut self) {
        self.min_y = self.height;
        self.max_y = -1;

        let left = self.screen.x_project(-PI);
        let right = self.screen.x_project(PI);
        let top = self.screen.y_project(BIG_NUMBER);
        let bottom = self.screen.y_project(-BIG_NUMBER);

        self.scan_segment(right, top, left, top);
        self.scan_segment(left, top, left, bottom);
        self.scan_segment(left, bottom, right, bottom);
        self.scan_segment(right, bottom, right, top);

        self.compact_scanbits(OUTLINE_VALUE);
    }

    fn seam_scan_curves(&mut self, map: &MapData) {
        for (cidx, curve) in map.curves.iter().enumerate() {
            if curve.points.is_empty() {
                continue;
            }
            let pos: Vec<PlanePoint> = curve
                .points
                .iter()
                .map(|&p| {
                    let pos = self.view.rotate(p);
                    PlanePoint {
                        pos,
                        px: self.projection.plane_x(pos.x, pos.z),
                        py: self.projection.plane_y(pos.y),
                    }
                })
                .collect();

            self.min_y = self.height;
            self.max_y = -1;

            let mut prev = pos[pos.len() - 1];
            for &curr in &pos {
                self.seam_scan_along(prev, curr, cidx);
                prev = curr;
            }

            if !self.seam_xings.is_empty() {
                self.seam_handle_xings();
            }
            if self.min_y <= self.max_y {
                self.compact_scanbits(curve.value);
            }
        }
    }

    /// Scan one curve segment, splitting it at the ±π seam when the plane
    /// delta takes the long way around
    fn seam_scan_along(&mut self, prev: PlanePoint, curr: PlanePoint, cidx: usize) {
        let dx = curr.px - prev.px;

        if dx > 0.0 {
            if dx > 2.0 * PI - dx {
                // curr is right of prev but closer the other way: the
                // segment leaves through the left edge
                let my = self.seam_crossing_y(prev.pos, curr.pos);

                self.scan_plane_segment(prev.px, prev.py, -PI, my);
                self.seam_xings.push(SeamXing {
                    kind: XingKind::Exit,
                    curve: cidx,
                    side: SeamSide::Left,
                    y: my,
                });

                self.scan_plane_segment(PI, my, curr.px, curr.py);
                self.seam_xings.push(SeamXing {
                    kind: XingKind::Entry,
                    curve: cidx,
                    side: SeamSide::Right,
                    y: my,
                });
            } else {
                self.scan_plane_segment(prev.px, prev.py, curr.px, curr.py);
            }
        } else {
            let dx = -dx;
            if dx > 2.0 * PI - dx {
                // leaves through the right edge
                let my = self.seam_crossing_y(prev.pos, curr.pos);

                self.scan_plane_segment(prev.px, prev.py, PI, my);
                self.seam_xings.push(SeamXing {
                    kind: XingKind::Exit,
                    curve: cidx,
                    side: SeamSide::Right,
                    y: my,
                });

                self.scan_plane_segment(-PI, my, curr.px, curr.py);
                self.seam_xings.push(SeamXing {
                    kind: XingKind::Entry,
                    curve: cidx,
                    side: SeamSide::Left,
                    y: my,
                });
            } else {
                self.scan_plane_segment(prev.px, prev.py, curr.px, curr.py);
            }
        }
    }

    /// Vertical plane coordinate where a segment crosses the seam
    ///
    /// Derived from the ratio of the endpoints' 3D components so the
    /// crossing stays geometrically correct near the poles, where linear
    /// interpolation in plane space drifts.
    fn seam_crossing_y(&self, prev: Vec3, curr: Vec3) -> f64 {
        let (z1, z2) = if curr.x != 0.0 {
            let ratio = prev.x / curr.x;
            (prev.y - ratio * curr.y, prev.z - ratio * curr.z)
        } else {
            (curr.y, curr.z)
        };

        let scale = if z2 > 0.0 { -1.0 } else { 1.0 } / (z1 * z1 + z2 * z2).sqrt();
        self.projection.plane_y(z1 * scale)
    }

    /// Sort the curve's seam crossings around the plane rim and close each
    /// exit→entry gap along the rim
    ///
    /// Right-edge crossings sort first (ascending y), then left-edge ones
    /// (descending y), so adjacent pairs take the short way around.
    fn seam_handle_xings(&mut self) {
        let mut xings = std::mem::take(&mut self.seam_xings);

        if xings.len() % 2 != 0 {
            self.xing_failure("odd seam crossing count", xings[0].curve);
        }
        xings.sort_by(|a, b| {
            a.side.rank().cmp(&b.side.rank()).then_with(|| match a.side {
                SeamSide::Right => a.y.partial_cmp(&b.y).unwrap(),
                SeamSide::Left => b.y.partial_cmp(&a.y).unwrap(),
            })
        });

        if xings[0].kind == XingKind::Exit {
            for pair in xings.chunks_exact(2) {
                let (from, to) = (pair[0], pair[1]);
                if from.kind != XingKind::Exit || to.kind != XingKind::Entry {
                    self.xing_failure("mismatched exit/entry pair", from.curve);
                }
                self.seam_scan_edge(from, to);
            }
        } else {
            // first crossing is an entry: the matching exit wraps around
            let from = xings[xings.len() - 1];
            let to = xings[0];
            if from.kind != XingKind::Exit
                || to.kind != XingKind::Entry
                || from.side.rank() < to.side.rank()
            {
                self.xing_failure("mismatched wrapped exit/entry pair", from.curve);
            }
            self.seam_scan_edge(from, to);

            for pair in xings[1..xings.len() - 1].chunks_exact(2) {
                let (from, to) = (pair[0], pair[1]);
                if from.kind != XingKind::Exit || to.kind != XingKind::Entry {
                    self.xing_failure("mismatched exit/entry pair", from.curve);
                }
                self.seam_scan_edge(from, to);
            }
        }

        xings.clear();
        self.seam_xings = xings;
    }

    /// Close a rim gap by walking plane-rectangle corners from one crossing
    /// to the other
    ///
    /// States cycle right edge → top → left edge → bottom → right edge.
    fn seam_scan_edge(&mut self, from: SeamXing, to: SeamXing) {
        let mut state = from.side.rank();
        let target = to.side.rank();

        let mut x_0 = self.screen.x_project(from.side.plane_x());
        let mut y_0 = self.screen.y_project(from.y);
        let x_1 = self.screen.x_project(to.side.plane_x());
        let y_1 = self.screen.y_project(to.y);

        while state != target {
            let (corner_x, corner_y, next) = match state {
                0 => (PI, BIG_NUMBER, 1),
                1 => (-PI, BIG_NUMBER, 2),
                2 => (-PI, -BIG_NUMBER, 3),
                _ => (PI, -BIG_NUMBER, 0),
            };
            let cx = self.screen.x_project(corner_x);
            let cy = self.screen.y_project(corner_y);
            self.scan_segment(x_0, y_0, cx, cy);
            x_0 = cx;
            y_0 = cy;
            state = next;
        }

        self.scan_segment(x_0, y_0, x_1, y_1);
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpolate where a segment pierces the horizon plane and push the point
/// out onto the unit horizon circle
fn horizon_crossing(prev: Vec3, curr: Vec3) -> Vec3 {
    let t = curr.z / (curr.z - prev.z);
    let x = curr.x - t * (curr.x - prev.x);
    let y = curr.y - t * (curr.y - prev.y);
    let len = (x * x + y * y).sqrt();
    Vec3::new(x / len, y / len, 0.0)
}
