use argh::FromArgs;
use std::path::PathBuf;

use usnav::nav::{NavigationSession, TrackingEvent};
use usnav::pose::{ImageToProbeCalibration, Pose};

#[derive(FromArgs)]
/// Summarize a tracked ultrasound sequence and rank its frames against a pointer pose
struct Args {
    /// path to the .mha sequence file
    #[argh(option, short = 's')]
    sequence_path: PathBuf,

    /// path to an image-to-probe calibration json file
    #[argh(option, short = 'c')]
    calibration_path: Option<PathBuf>,

    /// pointer pose as 12 row-major values of a 3x4 transform
    #[argh(option, short = 'p')]
    pointer: Option<String>,

    /// number of ranked frames to print
    #[argh(option, short = 'k', default = "5")]
    top_k: usize,

    /// print the ranking as json
    #[argh(switch)]
    json: bool,
}

fn parse_pose(text: &str) -> Result<Pose, Box<dyn std::error::Error>> {
    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pose::try_from(values.as_slice())?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let calibration = match &args.calibration_path {
        Some(path) => ImageToProbeCalibration::from_json_file(path)?,
        None => ImageToProbeCalibration::default(),
    };

    let mut session = NavigationSession::new(calibration);
    let report = session.load_sequence(&args.sequence_path)?;

    let (width, height) = session.image_dimensions();
    println!("sequence: {}", args.sequence_path.display());
    println!("image size: {width}x{height}");
    println!("frames: {}", report.declared_frames);
    println!(
        "transform records: {} ({} invalid){}",
        report.parsed_frames,
        report.invalid_frames,
        if report.is_partial() { ", truncated" } else { "" }
    );
    println!(
        "transforms: {}",
        session
            .available_transform_tags()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if session.frame_count() > 0 {
        let first_invalid = session.next_invalid_frame();
        if !session.current_frame_status().is_valid() {
            println!("first invalid frame after 0: {first_invalid}");
        }
        let first_valid = session.next_valid_frame();
        if session.current_frame_status().is_valid() {
            println!("next valid frame: {first_valid}");
        }
    }

    let Some(pointer) = args.pointer.as_deref() else {
        return Ok(());
    };
    let pointer = parse_pose(pointer)?;

    match session.handle_event(TrackingEvent::PointerPose(pointer)) {
        Some(best) => {
            session.go_to_frame(best.frame_index as isize);
            log::info!("Closest frame: {}", best.frame_index);
        }
        None => log::warn!("No valid frame to match against"),
    }

    let ranking = session.last_matches().iter().take(args.top_k);
    if args.json {
        let entries = ranking
            .map(|m| {
                serde_json::json!({
                    "frame": m.frame_index,
                    "status": session.library().status(m.frame_index).to_string(),
                    "distance": m.is_valid().then_some(m.distance),
                    "orientation_distance": m.is_valid().then_some(m.orientation_distance),
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for m in ranking {
            if m.is_valid() {
                println!(
                    "frame {:>5}  distance {:>10.3}  orientation {:>7.4}",
                    m.frame_index, m.distance, m.orientation_distance
                );
            } else {
                println!("frame {:>5}  INVALID", m.frame_index);
            }
        }
    }

    if let Some(pose) = session.image_to_world() {
        println!("image to world: {:?}", pose.to_rows());
    }

    Ok(())
}
