use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use geo::Geometry;
use pigeon_udf::io::write_geometry;
use pigeon_udf::{connect_files, convex_hull_files, difference_files, SegmentFields};

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .num_args(1)
        .help("Write the resulting GeoJSON here instead of stdout")
}

fn files_arg() -> Arg {
    Arg::new("files")
        .num_args(1..)
        .required(true)
        .help("Input GeoJSON files")
}

fn cli() -> Command {
    Command::new("Pigeon")
        .version("1.0")
        .author("Jesper Fjellin")
        .about("Spatial functions over GeoJSON: reconnect segments, convex hull, difference")
        .subcommand_required(true)
        .subcommand(
            Command::new("connect")
                .about("Reconnect labelled segments into polygons and line strings")
                .arg(files_arg())
                .arg(
                    Arg::new("start-field")
                        .long("start-field")
                        .num_args(1)
                        .default_value("start_id")
                        .help("Feature property holding the id of a segment's first point"),
                )
                .arg(
                    Arg::new("end-field")
                        .long("end-field")
                        .num_args(1)
                        .default_value("end_id")
                        .help("Feature property holding the id of a segment's last point"),
                )
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .num_args(1)
                        .value_parser(clap::value_parser!(usize))
                        .help("Feed segments to the accumulator in batches of this size"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("convex-hull")
                .about("Convex hull of every geometry in the input files")
                .arg(files_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("difference")
                .about("First geometry of A minus the first geometry of B")
                .arg(Arg::new("a").required(true).help("GeoJSON file holding A"))
                .arg(Arg::new("b").required(true).help("GeoJSON file holding B"))
                .arg(output_arg()),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Do not print the summary line"),
        )
}

fn input_files(matches: &ArgMatches) -> Vec<PathBuf> {
    matches
        .try_get_many::<String>("files")
        .ok()
        .flatten()
        .into_iter()
        .flatten()
        .map(PathBuf::from)
        .collect()
}

fn emit(matches: &ArgMatches, geometry: Option<&Geometry<f64>>) -> pigeon_udf::Result<()> {
    match matches.get_one::<String>("output") {
        Some(path) => write_geometry(BufWriter::new(File::create(path)?), geometry),
        None => write_geometry(io::stdout().lock(), geometry),
    }
}

fn run(matches: &ArgMatches) -> pigeon_udf::Result<String> {
    match matches.subcommand() {
        Some(("connect", sub)) => {
            let files = input_files(sub);
            let mut fields = SegmentFields::default();
            if let Some(start) = sub.get_one::<String>("start-field") {
                fields.start = start.clone();
            }
            if let Some(end) = sub.get_one::<String>("end-field") {
                fields.end = end.clone();
            }
            let batch_size = sub.get_one::<usize>("batch-size").copied();

            let result = connect_files(&files, &fields, batch_size)?;
            emit(sub, result.as_ref())?;
            Ok(match result {
                Some(_) => format!("Connected segments from {} files", files.len()),
                None => "No segments found, nothing to connect".to_string(),
            })
        }
        Some(("convex-hull", sub)) => {
            let files = input_files(sub);
            let result = convex_hull_files(&files)?;
            emit(sub, result.as_ref())?;
            Ok(format!("Computed convex hull over {} files", files.len()))
        }
        Some(("difference", sub)) => {
            let (Some(a), Some(b)) = (sub.get_one::<String>("a"), sub.get_one::<String>("b")) else {
                return Ok(String::new());
            };
            let result = difference_files(Path::new(a), Path::new(b))?;
            emit(sub, Some(&result))?;
            Ok(format!("Computed {} minus {}", a, b))
        }
        _ => Ok(String::new()),
    }
}

fn main() {
    env_logger::init();
    let matches = cli().get_matches();

    // Validate that input files exist
    let (_, sub) = matches.subcommand().unzip();
    let mut inputs: Vec<PathBuf> = sub.map(input_files).unwrap_or_default();
    if let Some(sub) = sub {
        for key in ["a", "b"] {
            if let Ok(Some(path)) = sub.try_get_one::<String>(key) {
                inputs.push(PathBuf::from(path));
            }
        }
    }
    for file in &inputs {
        if !file.exists() {
            eprintln!("Error: File not found: {}", file.display());
            std::process::exit(1);
        }
    }

    match run(&matches) {
        Ok(summary) => {
            if !matches.get_flag("quiet") && !summary.is_empty() {
                eprintln!("{}", summary);
            }
        }
        Err(e) => {
            eprintln!("Error processing files: {}", e);
            if matches!(e, pigeon_udf::Error::MissingProperty { .. }) {
                eprintln!("Use --start-field and --end-field to name the endpoint id properties.");
            }
            std::process::exit(1);
        }
    }
}
