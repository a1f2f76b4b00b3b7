use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub counting: CountingConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub route: Option<RouteConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory searched recursively for `.jsonl` observation recordings
    pub input_dir: String,
    pub frame_width: u32,
    pub frame_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub max_age: u32,
    pub proximity: ProximityKind,
    /// Radial association radius in pixels
    pub distance_threshold: f32,
    pub association: AssociationPolicy,
    pub max_history: usize,
    /// Minimum observation area = frame area / area_divisor
    pub area_divisor: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_age: 15,
            proximity: ProximityKind::Radial,
            distance_threshold: 75.0,
            association: AssociationPolicy::Nearest,
            max_history: 64,
            area_divisor: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityKind {
    Radial,
    BoxTolerance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationPolicy {
    /// Greedy assignment by ascending centroid distance
    Nearest,
    /// Observation takes the first live track that passes the proximity test
    FirstMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingConfig {
    pub mode: CountingMode,
    /// Which physical motion counts as an entry
    pub entry_motion: Motion,
    // single_line
    pub line_fraction: f32,
    pub one_shot: bool,
    // dead_zone (fractions of frame height, y grows downward)
    pub up_limit_fraction: f32,
    pub line_up_fraction: f32,
    pub line_down_fraction: f32,
    pub down_limit_fraction: f32,
    /// dead_zone only: ignore observations outside [up_limit, down_limit)
    pub band_gate: bool,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            mode: CountingMode::SingleLine,
            entry_motion: Motion::Down,
            line_fraction: 0.5,
            one_shot: false,
            up_limit_fraction: 1.0 / 5.0,
            line_up_fraction: 2.0 / 5.0,
            line_down_fraction: 3.0 / 5.0,
            down_limit_fraction: 4.0 / 5.0,
            band_gate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    SingleLine,
    DeadZone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub enabled: bool,
    pub url: String,
    pub camera_id: String,
    pub timeout_ms: u64,
    pub every_frames: u64,
    pub count_source: CountSource,
    /// Pushes allowed in flight at once; further pushes are skipped
    pub max_in_flight: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:5000/update_count".to_string(),
            camera_id: "camera_0".to_string(),
            timeout_ms: 1000,
            every_frames: 1,
            count_source: CountSource::Visible,
            max_in_flight: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    /// Live tracks in the current frame
    Visible,
    /// Entries minus exits, clamped at zero
    Occupancy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind: String,
    /// Keep serving after the replay finishes (until ctrl-c)
    pub linger: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:8081".to_string(),
            linger: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub capacity: u32,
    pub stops: Vec<String>,
    #[serde(default = "default_direction_label")]
    pub direction_label: String,
    #[serde(default = "default_reverse_label")]
    pub reverse_label: String,
}

fn default_direction_label() -> String {
    "outbound".to_string()
}

fn default_reverse_label() -> String {
    "inbound".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned box, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

// ============================================================================
// DIRECTIONS
// ============================================================================

/// Physical motion across a horizontal line (image y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    Up,
    Down,
}

impl Motion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// Counted meaning of a crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingDirection {
    Entering,
    Exiting,
}

impl CrossingDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entering => "entering",
            Self::Exiting => "exiting",
        }
    }
}

// ============================================================================
// TIME
// ============================================================================

/// Wall clock as float seconds since the Unix epoch
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
