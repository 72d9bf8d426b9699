//! Render settings
//!
//! One flat parameter struct covers the whole pipeline, with JSON
//! persistence for driver configuration files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::project::Projection;

/// Everything a frame render depends on besides the map itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub width: usize,
    pub height: usize,
    pub projection: Projection,
    /// Viewpoint latitude in degrees, positive north
    pub view_lat: f64,
    /// Viewpoint longitude in degrees, positive east
    pub view_lon: f64,
    /// Final in-plane view rotation in degrees
    pub view_rot: f64,
    pub magnification: f64,
    /// Extra pixel shift of the projection center
    pub shift_x: i32,
    pub shift_y: i32,
    /// Light the globe against the sun instead of flat colors
    pub shade: bool,
    pub sun_lat: f64,
    pub sun_lon: f64,
    /// Daylight brightness, percent
    pub day: i32,
    /// Night-side brightness, percent
    pub night: i32,
    /// Terminator softness, percent
    pub terminator: i32,
    /// Use the historical quadratic sqrt approximation in orthographic
    /// shading instead of the exact square root
    pub fast_shade_sqrt: bool,
    pub stars: bool,
    /// Stars per pixel of image area
    pub star_freq: f64,
    /// Percentage of stars that get a double-wide partner pixel
    pub big_stars: i32,
    pub star_seed: u64,
    pub grid: bool,
    /// Grid line spacing: lines per quarter turn
    pub grid_big: i32,
    /// Dot spacing along grid lines
    pub grid_small: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            projection: Projection::Orthographic,
            view_lat: 0.0,
            view_lon: 0.0,
            view_rot: 0.0,
            magnification: 1.0,
            shift_x: 0,
            shift_y: 0,
            shade: true,
            sun_lat: 0.0,
            sun_lon: 0.0,
            day: 100,
            night: 5,
            terminator: 1,
            fast_shade_sqrt: false,
            stars: true,
            star_freq: 0.002,
            big_stars: 0,
            star_seed: 0x5eed,
            grid: false,
            grid_big: 6,
            grid_small: 15,
        }
    }
}

impl Settings {
    /// Check every parameter range the renderer assumes
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("image size must be positive".into());
        }
        if self.magnification <= 0.0 {
            return Err("magnification must be positive".into());
        }
        if !(-90.0..=90.0).contains(&self.view_lat) {
            return Err("view latitude must be in [-90, 90]".into());
        }
        if !(-90.0..=90.0).contains(&self.sun_lat) {
            return Err("sun latitude must be in [-90, 90]".into());
        }
        if !(0..=100).contains(&self.day) {
            return Err("day brightness must be in [0, 100]".into());
        }
        if !(0..=100).contains(&self.night) {
            return Err("night brightness must be in [0, 100]".into());
        }
        if !(0..=100).contains(&self.terminator) {
            return Err("terminator softness must be in [0, 100]".into());
        }
        if !(0.0..=1.0).contains(&self.star_freq) {
            return Err("star frequency must be in [0, 1]".into());
        }
        if !(0..=100).contains(&self.big_stars) {
            return Err("big star percentage must be in [0, 100]".into());
        }
        if self.grid_big <= 0 || self.grid_small <= 0 {
            return Err("grid spacing must be positive".into());
        }
        Ok(())
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut s = Settings::default();
        s.width = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.magnification = -1.0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.star_freq = 1.5;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.grid_small = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.view_lat = 91.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut s = Settings::default();
        s.projection = Projection::Mercator;
        s.view_lat = -33.5;
        s.grid = true;
        s.star_seed = 12345;

        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.projection, Projection::Mercator);
        assert_eq!(back.view_lat, -33.5);
        assert!(back.grid);
        assert_eq!(back.star_seed, 12345);
    }
}
