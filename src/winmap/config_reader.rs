use crate::winmap::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub method: String,
    #[serde(rename = "approvalThreshold")]
    pub approval_threshold: f64,
    pub voters: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoterSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoterRowIndex")]
    _first_voter_row_index: Option<JSValue>,
    #[serde(rename = "xColumnIndex")]
    _x_column_index: Option<JSValue>,
    #[serde(rename = "yColumnIndex")]
    _y_column_index: Option<JSValue>,
    #[serde(rename = "weightColumnIndex")]
    pub weight_column_index: Option<JSValue>,
}

impl VoterSource {
    /// The first row holding a voter, 1-based. Defaults to 1 (no header).
    pub fn first_voter_row_index(&self) -> WinMapResult<usize> {
        if self._first_voter_row_index.is_none() {
            return Ok(1);
        }
        read_js_int(&self._first_voter_row_index)
    }

    /// 0-based index of the x column.
    pub fn x_column_index(&self) -> WinMapResult<usize> {
        read_js_column(&self._x_column_index)
    }

    /// 0-based index of the y column.
    pub fn y_column_index(&self) -> WinMapResult<usize> {
        read_js_column(&self._y_column_index)
    }

    pub fn weight_column_index_int(&self) -> WinMapResult<Option<usize>> {
        if self.weight_column_index.is_some() {
            read_js_column(&self.weight_column_index).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MapCandidate {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WinMapSettings {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "influenceRadius")]
    pub influence_radius: Option<f64>,
    #[serde(rename = "influenceSteps")]
    pub influence_steps: Option<u32>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WinMapConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub method: String,
    #[serde(rename = "approvalThreshold")]
    pub approval_threshold: Option<f64>,
    pub candidates: Vec<MapCandidate>,
    #[serde(rename = "voterSources", default)]
    pub voter_sources: Vec<VoterSource>,
    #[serde(rename = "winMap")]
    pub win_map: Option<WinMapSettings>,
}

pub fn read_config(path: &str) -> WinMapResult<WinMapConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> WinMapResult<WinMapConfig> {
    serde_json::from_str(contents).context(ParsingJsonSnafu {})
}

pub fn read_summary(path: &str) -> WinMapResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

fn read_js_int(x: &Option<JSValue>) -> WinMapResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

// Columns are 1-based in the configuration, 0-based everywhere else.
fn read_js_column(x: &Option<JSValue>) -> WinMapResult<usize> {
    let idx = read_js_int(x)?;
    if idx == 0 {
        whatever!("column indexes start at 1")
    }
    Ok(idx - 1)
}
