//! PPM demo driver
//!
//! Thin glue around the library: hand-parsed flags, an optional JSON
//! settings file and raw map database, one frame streamed as a binary
//! PPM (P6) to a file or stdout.

use std::fs;
use std::fs::File;
use std::io::{self, Write};

use globescan::{MapData, Renderer, Settings};

struct DriverOptions {
    settings: Settings,
    map_path: Option<String>,
    out_path: Option<String>,
}

fn print_usage() {
    println!("Usage: globescan [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --settings FILE     Load settings from a JSON file first");
    println!("  --size WxH          Image size (default: 512x512)");
    println!("  --proj NAME         Projection: orth, merc, or cyl");
    println!("  --pos LAT/LON       Viewpoint latitude/longitude in degrees");
    println!("  --rot DEG           In-plane view rotation");
    println!("  --mag FACTOR        Magnification (default: 1.0)");
    println!("  --shift X,Y         Shift the projection center by pixels");
    println!("  --shade / --no-shade");
    println!("  --sun LAT/LON       Sun position in degrees");
    println!("  --day PCT           Daylight brightness (default: 100)");
    println!("  --night PCT         Night-side brightness (default: 5)");
    println!("  --term PCT          Terminator softness (default: 1)");
    println!("  --stars / --no-stars");
    println!("  --starfreq F        Stars per pixel (default: 0.002)");
    println!("  --bigstars PCT      Percent of double-wide stars");
    println!("  --seed N            Star placement seed");
    println!("  --grid / --no-grid");
    println!("  --grid1 N           Grid line spacing (default: 6)");
    println!("  --grid2 N           Grid dot spacing (default: 15)");
    println!("  --map FILE          Curve database (raw little-endian words)");
    println!("  --out FILE, -o FILE Write the PPM here instead of stdout");
    println!("  --help              Show this help message");
}

fn arg_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument to {flag}"))
}

fn parse_pair(text: &str, sep: char, flag: &str) -> Result<(f64, f64), String> {
    let mut parts = text.splitn(2, sep);
    let a = parts.next().unwrap_or("");
    let b = parts.next().ok_or_else(|| format!("bad argument to {flag}: {text}"))?;
    let a = a.parse().map_err(|_| format!("bad argument to {flag}: {text}"))?;
    let b = b.parse().map_err(|_| format!("bad argument to {flag}: {text}"))?;
    Ok((a, b))
}

fn parse_num<T: std::str::FromStr>(text: &str, flag: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("bad argument to {flag}: {text}"))
}

fn parse_args(args: &[String]) -> Result<DriverOptions, String> {
    let mut opts = DriverOptions {
        settings: Settings::default(),
        map_path: None,
        out_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" => {
                i += 1;
                opts.settings = Settings::load(arg_value(args, i, "--settings")?)?;
            },
            "--size" => {
                i += 1;
                let text = arg_value(args, i, "--size")?;
                let (w, h) = text
                    .split_once('x')
                    .ok_or_else(|| format!("bad argument to --size: {text}"))?;
                opts.settings.width = parse_num(w, "--size")?;
                opts.settings.height = parse_num(h, "--size")?;
            },
            "--proj" => {
                i += 1;
                opts.settings.projection = match arg_value(args, i, "--proj")? {
                    "orth" | "orthographic" => globescan::Projection::Orthographic,
                    "merc" | "mercator" => globescan::Projection::Mercator,
                    "cyl" | "cylindrical" => globescan::Projection::Cylindrical,
                    other => return Err(format!("unknown projection: {other}")),
                };
            },
            "--pos" => {
                i += 1;
                let (lat, lon) = parse_pair(arg_value(args, i, "--pos")?, '/', "--pos")?;
                opts.settings.view_lat = lat;
                opts.settings.view_lon = lon;
            },
            "--rot" => {
                i += 1;
                opts.settings.view_rot = parse_num(arg_value(args, i, "--rot")?, "--rot")?;
            },
            "--mag" => {
                i += 1;
                opts.settings.magnification = parse_num(arg_value(args, i, "--mag")?, "--mag")?;
            },
            "--shift" => {
                i += 1;
                let (x, y) = parse_pair(arg_value(args, i, "--shift")?, ',', "--shift")?;
                opts.settings.shift_x = x as i32;
                opts.settings.shift_y = y as i32;
            },
            "--shade" => opts.settings.shade = true,
            "--no-shade" => opts.settings.shade = false,
            "--sun" => {
                i += 1;
                let (lat, lon) = parse_pair(arg_value(args, i, "--sun")?, '/', "--sun")?;
                opts.settings.sun_lat = lat;
                opts.settings.sun_lon = lon;
            },
            "--day" => {
                i += 1;
                opts.settings.day = parse_num(arg_value(args, i, "--day")?, "--day")?;
            },
            "--night" => {
                i += 1;
                opts.settings.night = parse_num(arg_value(args, i, "--night")?, "--night")?;
            },
            "--term" => {
                i += 1;
                opts.settings.terminator = parse_num(arg_value(args, i, "--term")?, "--term")?;
            },
            "--stars" => opts.settings.stars = true,
            "--no-stars" => opts.settings.stars = false,
            "--starfreq" => {
                i += 1;
                opts.settings.star_freq = parse_num(arg_value(args, i, "--starfreq")?, "--starfreq")?;
            },
            "--bigstars" => {
                i += 1;
                opts.settings.big_stars = parse_num(arg_value(args, i, "--bigstars")?, "--bigstars")?;
            },
            "--seed" => {
                i += 1;
                opts.settings.star_seed = parse_num(arg_value(args, i, "--seed")?, "--seed")?;
            },
            "--grid" => opts.settings.grid = true,
            "--no-grid" => opts.settings.grid = false,
            "--grid1" => {
                i += 1;
                opts.settings.grid_big = parse_num(arg_value(args, i, "--grid1")?, "--grid1")?;
            },
            "--grid2" => {
                i += 1;
                opts.settings.grid_small = parse_num(arg_value(args, i, "--grid2")?, "--grid2")?;
            },
            "--map" => {
                i += 1;
                opts.map_path = Some(arg_value(args, i, "--map")?.to_string());
            },
            "--out" | "-o" => {
                i += 1;
                opts.out_path = Some(arg_value(args, i, "--out")?.to_string());
            },
            "--help" => {
                print_usage();
                std::process::exit(0);
            },
            other => return Err(format!("unknown option: {other} (try --help)")),
        }
        i += 1;
    }

    Ok(opts)
}

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    let opts = parse_args(&args)?;
    opts.settings.validate()?;

    let map = match &opts.map_path {
        Some(path) => {
            let bytes = fs::read(path).map_err(|e| format!("{path}: {e}"))?;
            MapData::from_bytes(&bytes).map_err(|e| format!("{path}: {e}"))?
        },
        None => MapData::empty(),
    };

    let mut out: Box<dyn Write> = match &opts.out_path {
        Some(path) => Box::new(io::BufWriter::new(
            File::create(path).map_err(|e| format!("{path}: {e}"))?,
        )),
        None => Box::new(io::BufWriter::new(io::stdout())),
    };

    // P6 header, then raw rows straight from the sink
    write!(
        out,
        "P6\n{} {}\n255\n",
        opts.settings.width, opts.settings.height
    )
    .map_err(|e| e.to_string())?;

    let mut write_err: Option<io::Error> = None;
    let mut sink = |_y: usize, row: &[u8]| {
        if write_err.is_none() {
            if let Err(e) = out.write_all(row) {
                write_err = Some(e);
            }
        }
    };

    let mut renderer = Renderer::new();
    renderer.render(&opts.settings, &map, &mut sink);
    drop(sink);

    if let Some(e) = write_err {
        return Err(e.to_string());
    }
    out.flush().map_err(|e| e.to_string())?;
    Ok(())
}
