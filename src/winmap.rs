use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use spatial_voting::*;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::winmap::config_reader::*;

pub mod config_reader;
pub mod io_csv;

#[derive(Debug, Snafu)]
pub enum WinMapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error parsing a number in the configuration"))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("CSV line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("CSV line {lineno}: cannot read a number from {content:?}"))]
    CsvNumber { lineno: usize, content: String },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No configuration file given (use --config)"))]
    MissingConfig {},
    #[snafu(display("Cannot find the directory of the configuration file"))]
    MissingParentDir {},
    #[snafu(display("Unknown voting method"))]
    UnknownMethod { source: UnknownMethod },
    #[snafu(display("Voting error"))]
    Voting { source: VotingErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type WinMapResult<T> = Result<T, WinMapError>;

// Symbols of the candidates in the printed map, in candidate order.
const LEGEND_SYMBOLS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest accepted map side, in sample points.
const MAX_MAP_SIDE: u32 = 4096;
// Each sample point runs (2 * steps + 1)^2 lattice voters.
const MAX_INFLUENCE_STEPS: u32 = 32;

/// The winner of every sample point of the unit square.
///
/// Row 0 is the top of the map (`y` close to 0), as on a canvas.
#[derive(PartialEq, Debug, Clone)]
pub struct WinMap {
    pub width: u32,
    pub height: u32,
    // Candidate positions, row by row.
    pub cells: Vec<usize>,
}

impl WinMap {
    pub fn rows(&self) -> Vec<String> {
        let symbols: Vec<char> = LEGEND_SYMBOLS.chars().collect();
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|cidx| symbols[*cidx]).collect())
            .collect()
    }
}

/// Checked inputs of one run.
#[derive(PartialEq, Debug, Clone)]
pub struct Election {
    pub method: VotingMethod,
    pub candidates: Vec<Candidate>,
    pub params: VotingParams,
}

pub fn validate_config(config: &WinMapConfig, method_override: Option<&str>) -> WinMapResult<Election> {
    let method: VotingMethod = method_override
        .unwrap_or(config.method.as_str())
        .parse()
        .context(UnknownMethodSnafu {})?;

    if config.candidates.is_empty() {
        whatever!("the configuration does not list any candidate")
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for c in config.candidates.iter() {
        if !seen.insert(c.id.as_str()) {
            whatever!("duplicate candidate id {:?}", c.id)
        }
        let inside = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !inside(c.x) || !inside(c.y) {
            whatever!(
                "candidate {:?} is outside the unit square: ({}, {})",
                c.id,
                c.x,
                c.y
            )
        }
    }

    let approval_threshold = config
        .approval_threshold
        .unwrap_or(VotingParams::DEFAULT_PARAMS.approval_threshold);
    if !approval_threshold.is_finite() || approval_threshold <= 0.0 {
        whatever!(
            "the approval threshold must be positive, got {}",
            approval_threshold
        )
    }

    if let Some(settings) = &config.win_map {
        if settings.width == 0 || settings.height == 0 {
            whatever!(
                "the win map must not be empty: {}x{}",
                settings.width,
                settings.height
            )
        }
        if settings.width > MAX_MAP_SIDE || settings.height > MAX_MAP_SIDE {
            whatever!(
                "the win map is too large: {}x{} (at most {} per side)",
                settings.width,
                settings.height,
                MAX_MAP_SIDE
            )
        }
        if config.candidates.len() > LEGEND_SYMBOLS.len() {
            whatever!(
                "cannot draw a win map for more than {} candidates",
                LEGEND_SYMBOLS.len()
            )
        }
        if let Some(radius) = settings.influence_radius {
            if !radius.is_finite() || radius <= 0.0 {
                whatever!("the influence radius must be positive, got {}", radius)
            }
        }
        if let Some(steps) = settings.influence_steps {
            if steps > MAX_INFLUENCE_STEPS {
                whatever!(
                    "too many influence steps: {} (at most {})",
                    steps,
                    MAX_INFLUENCE_STEPS
                )
            }
        }
    }

    let candidates: Vec<Candidate> = config
        .candidates
        .iter()
        .map(|c| Candidate {
            id: c.id.clone(),
            x: c.x,
            y: c.y,
            name: c.name.clone(),
            color: c.color.clone(),
        })
        .collect();

    Ok(Election {
        method,
        candidates,
        params: VotingParams { approval_threshold },
    })
}

fn influence_cloud(settings: &WinMapSettings) -> InfluenceCloud {
    match settings.influence_radius {
        Some(radius) => InfluenceCloud {
            radius,
            steps: settings.influence_steps.unwrap_or(3),
        },
        None => InfluenceCloud {
            radius: 0.0,
            steps: 0,
        },
    }
}

/// Runs the election once per sample point.
pub fn compute_win_map(election: &Election, settings: &WinMapSettings) -> WinMapResult<WinMap> {
    let cloud = influence_cloud(settings);
    info!(
        "Computing a {}x{} win map, influence {:?}",
        settings.width, settings.height, cloud
    );
    let mut cells: Vec<usize> = Vec::with_capacity(settings.width as usize * settings.height as usize);
    for row in 0..settings.height {
        let y = (row as f64 + 0.5) / settings.height as f64;
        for col in 0..settings.width {
            let x = (col as f64 + 0.5) / settings.width as f64;
            let res = run_election_around(
                election.method,
                x,
                y,
                &cloud,
                &election.candidates,
                &election.params,
            )
            .context(VotingSnafu {})?;
            let cidx = election
                .candidates
                .iter()
                .position(|c| c.id == res.winner)
                .whatever_context("the winner is not a candidate")?;
            cells.push(cidx);
        }
        debug!("compute_win_map: row {} done", row);
    }
    Ok(WinMap {
        width: settings.width,
        height: settings.height,
        cells,
    })
}

fn tally_to_json(tally: &[(String, f64)]) -> JSValue {
    let mut js: JSMap<String, JSValue> = JSMap::new();
    for (name, count) in tally.iter() {
        js.insert(name.clone(), json!(count));
    }
    JSValue::Object(js)
}

fn result_stats_to_json(rs: &ElectionResult) -> JSValue {
    let rounds: Vec<JSValue> = rs
        .round_stats
        .iter()
        .map(|round_stat| {
            let mut js = json!({"round": round_stat.round, "tally": tally_to_json(&round_stat.tally)});
            if let Some(elected) = &round_stat.elected {
                js["elected"] = json!(elected);
            }
            if let Some(eliminated) = &round_stat.eliminated {
                js["eliminated"] = json!(eliminated);
            }
            js
        })
        .collect();
    json!({
        "winner": rs.winner,
        "tally": tally_to_json(&rs.tally),
        "eliminated": rs.elimination_order,
        "rounds": rounds,
    })
}

fn win_map_to_json(map: &WinMap, candidates: &[Candidate]) -> JSValue {
    let mut legend: JSMap<String, JSValue> = JSMap::new();
    for (c, symbol) in candidates.iter().zip(LEGEND_SYMBOLS.chars()) {
        legend.insert(symbol.to_string(), json!(c.id));
    }
    json!({
        "width": map.width,
        "height": map.height,
        "legend": legend,
        "rows": map.rows(),
    })
}

pub fn build_summary_js(
    config: &WinMapConfig,
    election: &Election,
    num_voters: usize,
    result: Option<&ElectionResult>,
    map: Option<&WinMap>,
) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        method: election.method.to_string(),
        approval_threshold: election.params.approval_threshold,
        voters: num_voters,
    };
    json!({
        "config": c,
        "results": result.map(result_stats_to_json),
        "winMap": map.map(|m| win_map_to_json(m, &election.candidates)),
    })
}

fn load_voter_source(root_path: &Path, source: &VoterSource) -> WinMapResult<Vec<WeightedVoter>> {
    let p: PathBuf = root_path.join(&source.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read voter file {:?}", p2);
    match source.provider.as_str() {
        "csv" => io_csv::read_csv_voters(&p2, source),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn write_summary(summary: &str, out: Option<&str>, config: &WinMapConfig) -> WinMapResult<()> {
    let target: Option<String> = match out {
        Some("stdout") => None,
        Some(path) => Some(path.to_string()),
        None => config
            .output_settings
            .output_directory
            .as_ref()
            .map(|dir| Path::new(dir).join("summary.json").display().to_string()),
    };
    match target {
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(&path, summary).context(WritingOutputSnafu { path: path.clone() })
        }
        None => {
            println!("{}", summary);
            Ok(())
        }
    }
}

pub fn run_winmap(args: &Args) -> WinMapResult<()> {
    let config_path = args.config.as_deref().context(MissingConfigSnafu {})?;
    let config = read_config(config_path)?;
    debug!("config: {:?}", config);

    let election = validate_config(&config, args.method.as_deref())?;
    info!(
        "Contest {:?}: {} candidates, method {}",
        config.output_settings.contest_name,
        election.candidates.len(),
        election.method
    );

    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let mut voters: Vec<WeightedVoter> = Vec::new();
    for source in config.voter_sources.iter() {
        let mut file_voters = load_voter_source(root_p, source)?;
        voters.append(&mut file_voters);
    }

    let result = if config.voter_sources.is_empty() {
        None
    } else {
        let res = run_weighted_election(
            election.method,
            &voters,
            &election.candidates,
            &election.params,
        )
        .context(VotingSnafu {})?;
        info!("Winner: {}", res.winner);
        Some(res)
    };

    let map = match &config.win_map {
        Some(settings) => Some(compute_win_map(&election, settings)?),
        None => None,
    };

    let summary_js = build_summary_js(&config, &election, voters.len(), result.as_ref(), map.as_ref());
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    write_summary(&pretty_js_stats, args.out.as_deref(), &config)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(js: &str) -> WinMapConfig {
        parse_config(js).unwrap()
    }

    const TWO_CANDIDATES: &str = r#"{
        "outputSettings": {"contestName": "left right"},
        "method": "plurality",
        "candidates": [
            {"id": "L", "x": 0.25, "y": 0.5, "name": "Left", "color": "red"},
            {"id": "R", "x": 0.75, "y": 0.5}
        ],
        "winMap": {"width": 4, "height": 2}
    }"#;

    #[test]
    fn validates_a_good_config() {
        let cfg = config(TWO_CANDIDATES);
        let election = validate_config(&cfg, None).unwrap();
        assert_eq!(election.method, VotingMethod::Plurality);
        assert_eq!(election.candidates.len(), 2);
        assert_eq!(election.candidates[0].name, Some("Left".to_string()));
        assert_eq!(election.params, VotingParams::DEFAULT_PARAMS);

        let election = validate_config(&cfg, Some("smithApproval")).unwrap();
        assert_eq!(election.method, VotingMethod::SmithApproval);
    }

    #[test]
    fn rejects_bad_configs() {
        let mut cfg = config(TWO_CANDIDATES);
        assert!(matches!(
            validate_config(&cfg, Some("condorcet")),
            Err(WinMapError::UnknownMethod { .. })
        ));

        cfg.approval_threshold = Some(0.0);
        assert!(validate_config(&cfg, None).is_err());

        let mut cfg = config(TWO_CANDIDATES);
        cfg.candidates[1].id = "L".to_string();
        assert!(validate_config(&cfg, None).is_err());

        let mut cfg = config(TWO_CANDIDATES);
        cfg.candidates[0].x = 1.5;
        assert!(validate_config(&cfg, None).is_err());

        let mut cfg = config(TWO_CANDIDATES);
        cfg.candidates.clear();
        assert!(validate_config(&cfg, None).is_err());

        let mut cfg = config(TWO_CANDIDATES);
        if let Some(settings) = cfg.win_map.as_mut() {
            settings.width = 0;
        }
        assert!(validate_config(&cfg, None).is_err());
    }

    #[test]
    fn rejects_oversized_maps() {
        let mut cfg = config(TWO_CANDIDATES);
        if let Some(settings) = cfg.win_map.as_mut() {
            settings.width = 65536;
            settings.height = 65536;
        }
        assert!(matches!(
            validate_config(&cfg, None),
            Err(WinMapError::Whatever { .. })
        ));

        let mut cfg = config(TWO_CANDIDATES);
        if let Some(settings) = cfg.win_map.as_mut() {
            settings.width = MAX_MAP_SIDE;
            settings.height = MAX_MAP_SIDE;
        }
        assert!(validate_config(&cfg, None).is_ok());

        let mut cfg = config(TWO_CANDIDATES);
        if let Some(settings) = cfg.win_map.as_mut() {
            settings.influence_radius = Some(0.1);
            settings.influence_steps = Some(1_000_000);
        }
        assert!(validate_config(&cfg, None).is_err());
        if let Some(settings) = cfg.win_map.as_mut() {
            settings.influence_steps = Some(MAX_INFLUENCE_STEPS);
        }
        assert!(validate_config(&cfg, None).is_ok());
    }

    #[test]
    fn win_map_splits_left_and_right() {
        let cfg = config(TWO_CANDIDATES);
        let election = validate_config(&cfg, None).unwrap();
        let settings = cfg.win_map.clone().unwrap();
        for method in VotingMethod::ALL {
            let election = Election {
                method,
                ..election.clone()
            };
            let map = compute_win_map(&election, &settings).unwrap();
            assert_eq!(map.rows(), vec!["AABB".to_string(), "AABB".to_string()]);
        }
    }

    #[test]
    fn win_map_with_influence() {
        let mut cfg = config(TWO_CANDIDATES);
        if let Some(settings) = cfg.win_map.as_mut() {
            settings.influence_radius = Some(0.1);
            settings.influence_steps = Some(2);
        }
        let election = validate_config(&cfg, Some("irv")).unwrap();
        let map = compute_win_map(&election, cfg.win_map.as_ref().unwrap()).unwrap();
        assert_eq!(map.cells.len(), 8);
        assert_eq!(map.rows()[0], "AABB");
    }

    #[test]
    fn summary_layout() {
        let cfg = config(TWO_CANDIDATES);
        let election = validate_config(&cfg, None).unwrap();
        let voters = vec![
            Voter::new(0.1, 0.5),
            Voter::new(0.2, 0.5),
            Voter::new(0.9, 0.5),
        ];
        let res = run_election(
            election.method,
            &voters,
            &election.candidates,
            &election.params,
        )
        .unwrap();
        let map = compute_win_map(&election, cfg.win_map.as_ref().unwrap()).unwrap();
        let js = build_summary_js(&cfg, &election, voters.len(), Some(&res), Some(&map));
        assert_eq!(js["config"]["contest"], json!("left right"));
        assert_eq!(js["config"]["voters"], json!(3));
        assert_eq!(js["results"]["winner"], json!("L"));
        assert_eq!(js["results"]["tally"]["L"], json!(2.0));
        assert_eq!(js["results"]["tally"]["R"], json!(1.0));
        assert_eq!(js["results"]["rounds"][0]["elected"], json!("L"));
        assert_eq!(js["winMap"]["legend"]["B"], json!("R"));
        assert_eq!(js["winMap"]["rows"][1], json!("AABB"));

        let js = build_summary_js(&cfg, &election, 0, None, None);
        assert!(js["results"].is_null());
        assert!(js["winMap"].is_null());
    }

    #[test]
    fn end_to_end_with_reference() {
        let dir = std::env::temp_dir().join(format!("winmap-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("voters.csv"), "x,y\n0.1,0.5\n0.3,0.5\n0.8,0.5\n").unwrap();
        let config_js = r#"{
            "outputSettings": {"contestName": "e2e"},
            "method": "borda",
            "candidates": [
                {"id": "L", "x": 0.25, "y": 0.5},
                {"id": "R", "x": 0.75, "y": 0.5}
            ],
            "voterSources": [{"provider": "csv", "filePath": "voters.csv",
                              "firstVoterRowIndex": 2, "xColumnIndex": 1, "yColumnIndex": 2}],
            "winMap": {"width": 2, "height": 1}
        }"#;
        let config_path = dir.join("config.json");
        fs::write(&config_path, config_js).unwrap();
        let out_path = dir.join("summary.json");

        let mut args = Args {
            config: Some(config_path.display().to_string()),
            reference: None,
            out: Some(out_path.display().to_string()),
            method: None,
            verbose: false,
        };
        run_winmap(&args).unwrap();
        let summary = read_summary(&out_path.display().to_string()).unwrap();
        assert_eq!(summary["results"]["winner"], json!("L"));
        assert_eq!(summary["results"]["tally"]["L"], json!(2.0));
        assert_eq!(summary["winMap"]["rows"][0], json!("AB"));

        // The same run checked against its own output succeeds.
        let reference_path = dir.join("reference.json");
        fs::copy(&out_path, &reference_path).unwrap();
        args.reference = Some(reference_path.display().to_string());
        run_winmap(&args).unwrap();

        // A different method no longer matches the reference.
        args.method = Some("plurality".to_string());
        assert!(run_winmap(&args).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_config_is_reported() {
        let args = Args {
            config: None,
            reference: None,
            out: None,
            method: None,
            verbose: false,
        };
        assert!(matches!(
            run_winmap(&args),
            Err(WinMapError::MissingConfig {})
        ));
    }
}
