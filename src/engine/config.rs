// Room configuration.
//
// Every field has a default matching the shipped scene, so a RON file only
// needs the values it overrides:
//
//   (thresholds: (walls: (visible: -0.1, hidden: -0.14)), camera: (auto_rotate: false))

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::visibility::{SurfaceCategory, VisibilityThreshold};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("{category} thresholds must satisfy hidden < visible (got visible {visible}, hidden {hidden})")]
    InvertedThreshold {
        category: &'static str,
        visible: f32,
        hidden: f32,
    },
    #[error("invalid camera settings: {0}")]
    InvalidCamera(&'static str),
    #[error("door clip duration must be positive, got {0}")]
    InvalidDoorDuration(f32),
    #[error("invalid lighting settings: {0}")]
    InvalidLighting(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub walls: VisibilityThreshold,
    pub floor: VisibilityThreshold,
    pub ceiling: VisibilityThreshold,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            walls: VisibilityThreshold::WALLS,
            floor: VisibilityThreshold::FLOOR,
            ceiling: VisibilityThreshold::CEILING,
        }
    }
}

impl ThresholdConfig {
    pub fn for_category(&self, category: SurfaceCategory) -> VisibilityThreshold {
        match category {
            SurfaceCategory::Walls => self.walls,
            SurfaceCategory::Floor => self.floor,
            SurfaceCategory::Ceiling => self.ceiling,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub look_at: Vec3,
    pub auto_rotate: bool,
    /// three.js units: 1.0 is one revolution per minute.
    pub auto_rotate_speed: f32,
    /// Fraction of the pending rotation applied per frame.
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle limits, measured from +Y.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.5,
            far: 60.0,
            position: Vec3::new(5.2, 1.5, 5.0),
            look_at: Vec3::new(0.0, 1.0, 0.0),
            auto_rotate: true,
            auto_rotate_speed: 0.1,
            damping_factor: 0.01,
            min_distance: 1.0,
            max_distance: 20.0,
            min_polar_angle: PI * 0.25,
            max_polar_angle: PI * 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Seconds per open or close clip.
    pub clip_duration: f32,
    /// Hinge swing in radians when fully open.
    pub open_angle: f32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            clip_duration: 1.0,
            open_angle: 1.4,
        }
    }
}

/// Tone-mapping operator applied after lighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Raw lit color; exposure is ignored.
    None,
    Linear,
    #[default]
    Reinhard,
    Cineon,
    AcesFilmic,
}

impl ToneMapping {
    pub const ALL: [ToneMapping; 5] = [
        ToneMapping::None,
        ToneMapping::Linear,
        ToneMapping::Reinhard,
        ToneMapping::Cineon,
        ToneMapping::AcesFilmic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToneMapping::None => "None",
            ToneMapping::Linear => "Linear",
            ToneMapping::Reinhard => "Reinhard",
            ToneMapping::Cineon => "Cineon",
            ToneMapping::AcesFilmic => "ACESFilmic",
        }
    }

    /// Operator index the shader reads from `params.w`.
    pub fn shader_index(self) -> f32 {
        match self {
            ToneMapping::None => 0.0,
            ToneMapping::Linear => 1.0,
            ToneMapping::Reinhard => 2.0,
            ToneMapping::Cineon => 3.0,
            ToneMapping::AcesFilmic => 4.0,
        }
    }
}

/// Upper end of the exposure range offered by the debug panel.
pub const MAX_EXPOSURE: f32 = 5.0;
/// Upper end of the light intensity sliders.
pub const MAX_LIGHT_INTENSITY: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub directional_position: Vec3,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub background: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.5,
            directional_intensity: 1.0,
            directional_position: Vec3::new(1.0, 4.0, 1.0),
            tone_mapping: ToneMapping::Reinhard,
            exposure: 1.5,
            // #8f97b3
            background: [0x8f as f32 / 255.0, 0x97 as f32 / 255.0, 0xb3 as f32 / 255.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub thresholds: ThresholdConfig,
    pub camera: CameraConfig,
    pub doors: DoorConfig,
    pub lighting: LightingConfig,
}

impl RoomConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text)?;
        log::info!("Loaded room config from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bands = [
            ("walls", self.thresholds.walls),
            ("floor", self.thresholds.floor),
            ("ceiling", self.thresholds.ceiling),
        ];
        for (category, band) in bands {
            if !band.is_valid() {
                return Err(ConfigError::InvertedThreshold {
                    category,
                    visible: band.visible,
                    hidden: band.hidden,
                });
            }
        }

        let cam = &self.camera;
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(ConfigError::InvalidCamera("fov must be in (0, 180) degrees"));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(ConfigError::InvalidCamera("need 0 < near < far"));
        }
        if !(cam.min_distance >= 0.0 && cam.min_distance <= cam.max_distance) {
            return Err(ConfigError::InvalidCamera("need 0 <= min_distance <= max_distance"));
        }
        if !(cam.min_polar_angle >= 0.0
            && cam.min_polar_angle <= cam.max_polar_angle
            && cam.max_polar_angle <= PI)
        {
            return Err(ConfigError::InvalidCamera("need 0 <= min_polar_angle <= max_polar_angle <= PI"));
        }
        if !(cam.damping_factor > 0.0 && cam.damping_factor <= 1.0) {
            return Err(ConfigError::InvalidCamera("damping_factor must be in (0, 1]"));
        }

        if !(self.doors.clip_duration > 0.0) {
            return Err(ConfigError::InvalidDoorDuration(self.doors.clip_duration));
        }

        let light = &self.lighting;
        if !(0.0..=MAX_EXPOSURE).contains(&light.exposure) {
            return Err(ConfigError::InvalidLighting("exposure must be in [0, 5]"));
        }
        let intensity = 0.0..=MAX_LIGHT_INTENSITY;
        if !(intensity.contains(&light.ambient_intensity) && intensity.contains(&light.directional_intensity)) {
            return Err(ConfigError::InvalidLighting("light intensities must be in [0, 10]"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        RoomConfig::default().validate().unwrap();
    }

    #[test]
    fn defaults_survive_ron() {
        let config = RoomConfig::default();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(RoomConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = RoomConfig::from_ron(
            "(thresholds: (walls: (visible: -0.1, hidden: -0.2)), camera: (auto_rotate: false))",
        )
        .unwrap();

        assert_eq!(config.thresholds.walls, VisibilityThreshold { visible: -0.1, hidden: -0.2 });
        assert_eq!(config.thresholds.floor, VisibilityThreshold::FLOOR);
        assert!(!config.camera.auto_rotate);
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert_eq!(config.doors, DoorConfig::default());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let err = RoomConfig::from_ron("(thresholds: (floor: (visible: -0.2, hidden: -0.1)))").unwrap_err();
        assert!(matches!(err, ConfigError::InvertedThreshold { category: "floor", .. }));
    }

    #[test]
    fn tone_mapping_is_configurable() {
        let config = RoomConfig::from_ron("(lighting: (tone_mapping: AcesFilmic, exposure: 0.8))").unwrap();
        assert_eq!(config.lighting.tone_mapping, ToneMapping::AcesFilmic);
        assert_eq!(config.lighting.exposure, 0.8);
        assert_eq!(RoomConfig::default().lighting.tone_mapping, ToneMapping::Reinhard);

        let indices = ToneMapping::ALL.map(ToneMapping::shader_index);
        assert_eq!(indices, [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn out_of_range_lighting_is_rejected() {
        let err = RoomConfig::from_ron("(lighting: (exposure: 7.5))").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLighting(_)));

        let err = RoomConfig::from_ron("(lighting: (ambient_intensity: -1.0))").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLighting(_)));
    }

    #[test]
    fn bad_camera_is_rejected() {
        let err = RoomConfig::from_ron("(camera: (near: 10.0, far: 5.0))").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCamera(_)));
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        assert!(matches!(RoomConfig::from_ron("(thresholds: "), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(doors: (clip_duration: 2.5))").unwrap();

        let config = RoomConfig::load(file.path()).unwrap();
        assert_eq!(config.doors.clip_duration, 2.5);
        assert_eq!(config.doors.open_angle, DoorConfig::default().open_angle);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = RoomConfig::load(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn category_lookup() {
        let t = ThresholdConfig::default();
        assert_eq!(t.for_category(SurfaceCategory::Ceiling), VisibilityThreshold::CEILING);
        assert_eq!(t.for_category(SurfaceCategory::Walls), VisibilityThreshold::WALLS);
    }
}
