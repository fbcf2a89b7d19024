//! Shape a string with a font file and print the resulting glyph run.
//!
//! ```text
//! shapeview Roboto-Regular.ttf "office" --features -liga,kern
//! ```

use std::path::PathBuf;

use clap::Parser;
use mota::{Direction, Feature, ShapeBuffer, Shaper};
use read_otl::FontRef;

#[derive(Parser)]
#[command(about = "Shape a string with a font and print the glyph run")]
struct Args {
    /// Path to a TrueType- or CFF-flavored font file.
    font: PathBuf,
    /// The text to shape.
    text: String,
    /// Comma-separated feature settings, e.g. "-liga,+kern,aalt=2".
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,
    /// Force the run direction instead of guessing it.
    #[arg(long, value_parser = parse_direction)]
    direction: Option<Direction>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse font: {0}")]
    Font(read_otl::ReadError),
    #[error("bad feature string {feature:?}: {source}")]
    Feature {
        feature: String,
        source: mota::ParseFeatureError,
    },
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    match s {
        "ltr" => Ok(Direction::LeftToRight),
        "rtl" => Ok(Direction::RightToLeft),
        "ttb" => Ok(Direction::TopToBottom),
        "btt" => Ok(Direction::BottomToTop),
        other => Err(format!("unknown direction {other:?} (try ltr/rtl/ttb/btt)")),
    }
}

fn run(args: Args) -> Result<(), Error> {
    let font_data = std::fs::read(&args.font).map_err(|source| Error::Io {
        path: args.font.clone(),
        source,
    })?;
    let font = FontRef::new(font_data.as_slice()).map_err(Error::Font)?;
    let shaper = Shaper::new(&font);

    let features = args
        .features
        .iter()
        .filter(|feature| !feature.is_empty())
        .map(|feature| {
            feature.parse::<Feature>().map_err(|source| Error::Feature {
                feature: feature.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut buffer = ShapeBuffer::new();
    buffer.add_str(&args.text);
    if let Some(direction) = args.direction {
        buffer.set_direction(direction);
    }
    shaper.shape(&mut buffer, &features);

    let mut pen_x = 0i64;
    for (item, position) in buffer.items().iter().zip(buffer.positions()) {
        println!(
            "gid {:>5}  cluster {:>3}  advance {:>5}  offset ({:>5}, {:>5})  x {:>6}",
            item.glyph_id.to_u16(),
            item.cluster,
            position.x_advance,
            position.x_offset,
            position.y_offset,
            pen_x + position.x_offset as i64,
        );
        pen_x += position.x_advance as i64;
    }
    println!("total advance: {pen_x}");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
