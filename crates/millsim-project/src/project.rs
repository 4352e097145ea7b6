//! Simulation project: options, NC files and tool table.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use millsim_math::{format_vec3, parse_vec3, Bounds3, Point3};
use millsim_tool::{ToolTable, ToolUnits};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::error::xml_error;
use crate::files::{absolute_path, decode_filename, encode_filename, NcFile};
use crate::workpiece::{compute_resolution, estimate_workpiece, ResolutionMode};
use crate::{ProjectError, Result, Settings, ToolPath};

const ROOT_ELEMENT: &str = "camotics";
const OPTIONS_ELEMENT: &str = "options";
const TOOL_TABLE_ELEMENT: &str = "tool_table";
const UNITS_NOTE: &str = " Note, all values are in mm regardless of 'units' option. ";

/// How the renderer extracts a surface from the simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Marching cubes.
    #[default]
    #[serde(rename = "mcubes")]
    MarchingCubes,
    /// Cubic marching squares.
    #[serde(rename = "cms")]
    CubicMarchingSquares,
    /// Surface nets.
    #[serde(rename = "surface-nets")]
    SurfaceNets,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderMode::MarchingCubes => "mcubes",
            RenderMode::CubicMarchingSquares => "cms",
            RenderMode::SurfaceNets => "surface-nets",
        })
    }
}

impl FromStr for RenderMode {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "mcubes" => Ok(RenderMode::MarchingCubes),
            "cms" => Ok(RenderMode::CubicMarchingSquares),
            "surface-nets" => Ok(RenderMode::SurfaceNets),
            _ => Err(ProjectError::UnknownRenderMode(s.to_string())),
        }
    }
}

/// A simulation project.
///
/// Every setter compares against the current value first; only real
/// changes mark the project dirty. Loading and saving mark it clean.
///
/// In any resolution mode other than manual the resolution follows the
/// workpiece volume (see [`compute_resolution`]).
#[derive(Debug, Clone)]
pub struct Project {
    filename: Option<PathBuf>,
    units: ToolUnits,
    resolution_mode: ResolutionMode,
    resolution: f64,
    render_mode: RenderMode,
    watch: bool,
    automatic_workpiece: Option<bool>,
    workpiece_margin: f64,
    workpiece_min: Option<Point3>,
    workpiece_max: Option<Point3>,
    files: Vec<NcFile>,
    tools: ToolTable,
    dirty: bool,
    last_watch: Option<u64>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    /// Create an unnamed project with default settings.
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    /// Create an unnamed project seeded from `settings`.
    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            filename: None,
            units: settings.units,
            resolution_mode: settings.resolution_mode,
            resolution: 1.0,
            render_mode: settings.render_mode,
            watch: settings.watch,
            automatic_workpiece: None,
            workpiece_margin: settings.workpiece_margin,
            workpiece_min: None,
            workpiece_max: None,
            files: Vec::new(),
            tools: ToolTable::new(),
            dirty: false,
            last_watch: None,
        }
    }

    /// Create a project and load `path` if it exists.
    pub fn open(path: impl AsRef<Path>, settings: &Settings) -> Result<Self> {
        let mut project = Self::with_settings(settings);
        project.load(path)?;
        Ok(project)
    }

    /// True if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the unsaved changes flag.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Project file path, if named.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Rename the project. Empty or unchanged names are ignored.
    pub fn set_filename(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || self.filename.as_deref() == Some(path) {
            return;
        }
        self.filename = Some(path.to_path_buf());
        self.mark_dirty();
    }

    /// Directory NC file paths are relative to: the project file's
    /// directory, or the working directory for an unnamed project.
    pub fn directory(&self) -> PathBuf {
        match self.filename.as_deref().and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Display units.
    pub fn units(&self) -> ToolUnits {
        self.units
    }

    /// Set display units. Stored values are not rescaled.
    pub fn set_units(&mut self, units: ToolUnits) {
        if self.units == units {
            return;
        }
        self.units = units;
        self.mark_dirty();
    }

    /// Grid resolution policy.
    pub fn resolution_mode(&self) -> ResolutionMode {
        self.resolution_mode
    }

    /// Change the resolution policy and recompute the resolution.
    pub fn set_resolution_mode(&mut self, mode: ResolutionMode) {
        if self.resolution_mode == mode {
            return;
        }
        self.resolution_mode = mode;
        self.mark_dirty();
        self.update_resolution();
    }

    /// Grid cell size in mm.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Set the grid cell size. Only marks the project dirty in manual mode,
    /// since in other modes the value is derived.
    pub fn set_resolution(&mut self, resolution: f64) {
        if self.resolution == resolution {
            return;
        }
        self.resolution = resolution;
        if self.resolution_mode == ResolutionMode::Manual {
            self.mark_dirty();
        }
    }

    /// Switch to manual mode with the given cell size.
    pub fn set_manual_resolution(&mut self, resolution: f64) {
        self.set_resolution_mode(ResolutionMode::Manual);
        self.set_resolution(resolution);
    }

    /// Recompute the resolution from the workpiece unless in manual mode.
    pub fn update_resolution(&mut self) {
        if self.resolution_mode != ResolutionMode::Manual {
            let resolution = compute_resolution(self.resolution_mode, &self.workpiece_bounds());
            log::debug!("resolution {} ({})", resolution, self.resolution_mode);
            self.set_resolution(resolution);
        }
    }

    /// Surface generation method.
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Set the surface generation method.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if self.render_mode == mode {
            return;
        }
        self.render_mode = mode;
        self.mark_dirty();
    }

    /// Whether NC files are watched for changes.
    pub fn watch(&self) -> bool {
        self.watch
    }

    /// Enable or disable file watching.
    pub fn set_watch(&mut self, watch: bool) {
        if self.watch == watch {
            return;
        }
        self.watch = watch;
        self.mark_dirty();
    }

    /// Whether the workpiece is estimated from the tool path.
    ///
    /// True when explicitly enabled, or when no workpiece corners are set.
    pub fn automatic_workpiece(&self) -> bool {
        self.automatic_workpiece == Some(true)
            || (self.workpiece_min.is_none() && self.workpiece_max.is_none())
    }

    /// Enable or disable workpiece estimation.
    pub fn set_automatic_workpiece(&mut self, automatic: bool) {
        if self.automatic_workpiece() != automatic {
            self.mark_dirty();
        }
        self.automatic_workpiece = Some(automatic);
    }

    /// Percent margin added around an estimated workpiece.
    pub fn workpiece_margin(&self) -> f64 {
        self.workpiece_margin
    }

    /// Set the estimation margin.
    pub fn set_workpiece_margin(&mut self, margin: f64) {
        if self.workpiece_margin == margin {
            return;
        }
        self.workpiece_margin = margin;
        self.mark_dirty();
    }

    /// Workpiece cuboid. Unset corners are at the origin.
    pub fn workpiece_bounds(&self) -> Bounds3 {
        Bounds3::new(
            self.workpiece_min.unwrap_or_else(Point3::origin),
            self.workpiece_max.unwrap_or_else(Point3::origin),
        )
    }

    /// Set the workpiece cuboid and recompute the resolution.
    ///
    /// Only marks the project dirty when the workpiece is not automatic.
    pub fn set_workpiece_bounds(&mut self, bounds: Bounds3) {
        self.workpiece_min = Some(bounds.min());
        self.workpiece_max = Some(bounds.max());
        self.update_resolution();
        if !self.automatic_workpiece() {
            self.mark_dirty();
        }
    }

    /// Re-estimate the workpiece from `path` if the workpiece is automatic.
    ///
    /// Leaves the workpiece alone when nothing in the path cuts.
    pub fn update_automatic_workpiece(&mut self, path: &ToolPath) {
        if !self.automatic_workpiece() {
            return;
        }
        self.set_automatic_workpiece(true);

        if let Some(bounds) = estimate_workpiece(path, &self.tools, self.workpiece_margin) {
            self.set_workpiece_bounds(bounds);
        }
    }

    /// Tool table.
    pub fn tools(&self) -> &ToolTable {
        &self.tools
    }

    /// Mutable tool table. Call [`Project::mark_dirty`] after edits.
    pub fn tools_mut(&mut self) -> &mut ToolTable {
        &mut self.tools
    }

    /// Replace the tool table.
    pub fn set_tools(&mut self, tools: ToolTable) {
        if self.tools == tools {
            return;
        }
        self.tools = tools;
        self.mark_dirty();
    }

    /// NC files in order.
    pub fn files(&self) -> &[NcFile] {
        &self.files
    }

    /// NC file at `index`.
    pub fn file(&self, index: usize) -> Result<&NcFile> {
        self.files
            .get(index)
            .ok_or(ProjectError::InvalidFileIndex(index))
    }

    /// NC file with the same absolute path as `path`.
    pub fn find_file(&self, path: impl AsRef<Path>) -> Option<&NcFile> {
        let abs = absolute_path(path.as_ref()).ok()?;
        self.files.iter().find(|f| f.path() == abs)
    }

    /// Add an NC file. Duplicates are ignored.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let abs = absolute_path(path.as_ref())?;
        if self.files.iter().any(|f| f.path() == abs) {
            return Ok(());
        }
        self.files.push(NcFile::new(abs));
        self.mark_dirty();
        Ok(())
    }

    /// Remove the NC file at `index`; out of range is a no-op.
    pub fn remove_file(&mut self, index: usize) {
        if index < self.files.len() {
            self.files.remove(index);
            self.mark_dirty();
        }
    }

    /// True if any watched NC file changed since the last check.
    ///
    /// Checks at most once per second and only while watching.
    pub fn check_files(&mut self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.check_files_at(now)
    }

    fn check_files_at(&mut self, now: u64) -> bool {
        if !self.watch || self.last_watch.is_some_and(|last| last >= now) {
            return false;
        }

        let dir = self.directory();
        let mut changed = false;
        for file in &mut self.files {
            if file.changed() {
                log::info!("File changed: {}", file.relative_to(&dir).display());
                changed = true;
            }
        }

        self.last_watch = Some(now);
        changed
    }

    /// Load a project file. A missing file only sets the filename.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.set_filename(path);

        if path.exists() {
            let xml = fs::read_to_string(path)?;
            let nc_files = self.read_xml(&xml)?;

            let dir = self.directory();
            self.files.clear();
            for name in nc_files {
                self.add_file(dir.join(decode_filename(&name)))?;
            }

            log::info!(
                "loaded project {} with {} tools and {} files",
                path.display(),
                self.tools.len(),
                self.files.len()
            );
        }

        self.mark_clean();
        Ok(())
    }

    /// Save to the current filename.
    pub fn save(&mut self) -> Result<()> {
        let path = self.filename.clone().ok_or(ProjectError::NoFilename)?;
        self.save_as(path)
    }

    /// Save to `path` and make it the project filename.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.set_filename(path);

        let xml = self.to_xml_string()?;
        fs::write(path, xml)?;
        log::info!("saved project {}", path.display());

        self.mark_clean();
        Ok(())
    }

    /// Serialize as project XML. NC file paths are written relative to
    /// [`Project::directory`].
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new(ROOT_ELEMENT)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Comment(BytesText::from_escaped(UNITS_NOTE)))
            .map_err(xml_error)?;

        writer
            .write_event(Event::Start(BytesStart::new(OPTIONS_ELEMENT)))
            .map_err(xml_error)?;
        for (name, value) in self.options() {
            let mut elem = BytesStart::new(name);
            elem.push_attribute(("v", value.as_str()));
            writer.write_event(Event::Empty(elem)).map_err(xml_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(OPTIONS_ELEMENT)))
            .map_err(xml_error)?;

        self.tools.write_xml(&mut writer)?;

        writer
            .write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))
            .map_err(xml_error)?;

        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    fn options(&self) -> Vec<(&'static str, String)> {
        let mut options = vec![
            ("units", self.units.to_string()),
            ("resolution-mode", self.resolution_mode.to_string()),
            ("resolution", self.resolution.to_string()),
            ("render-mode", self.render_mode.to_string()),
            ("watch", self.watch.to_string()),
            ("automatic-workpiece", self.automatic_workpiece().to_string()),
            ("workpiece-margin", self.workpiece_margin.to_string()),
        ];
        if let Some(min) = &self.workpiece_min {
            options.push(("workpiece-min", format_vec3(min)));
        }
        if let Some(max) = &self.workpiece_max {
            options.push(("workpiece-max", format_vec3(max)));
        }

        let dir = self.directory();
        let nc_files: Vec<String> = self
            .files
            .iter()
            .map(|f| encode_filename(&f.relative_to(&dir).to_string_lossy()))
            .collect();
        if !nc_files.is_empty() {
            options.push(("nc-files", nc_files.join(" ")));
        }

        options
    }

    /// Apply options and the tool table from project XML. Returns the
    /// encoded NC file names.
    fn read_xml(&mut self, xml: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut nc_files = Vec::new();
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) if e.name().as_ref() == TOOL_TABLE_ELEMENT.as_bytes() => {
                    self.tools.clear();
                    self.tools.read_xml(&mut reader)?;
                }
                Event::Start(e) | Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name == ROOT_ELEMENT || name == OPTIONS_ELEMENT {
                        continue;
                    }
                    if let Some(value) = option_value(&e)? {
                        if name == "nc-files" {
                            nc_files = value.split_whitespace().map(String::from).collect();
                        } else {
                            self.apply_option(&name, &value)?;
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(nc_files)
    }

    fn apply_option(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "units" => self.units = value.parse()?,
            "resolution-mode" => self.resolution_mode = value.parse()?,
            "resolution" => self.resolution = parse_number(name, value)?,
            "render-mode" => self.render_mode = value.parse()?,
            "watch" => self.watch = parse_bool(name, value)?,
            "automatic-workpiece" => self.automatic_workpiece = Some(parse_bool(name, value)?),
            "workpiece-margin" => self.workpiece_margin = parse_number(name, value)?,
            "workpiece-min" => self.workpiece_min = Some(parse_vec3(value)?),
            "workpiece-max" => self.workpiece_max = Some(parse_vec3(value)?),
            _ => log::debug!("ignoring unknown project option '{}'", name),
        }
        Ok(())
    }
}

fn option_value(e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() == b"v" {
            return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
        }
    }
    Ok(None)
}

fn invalid(name: &str, value: &str) -> ProjectError {
    ProjectError::InvalidOption {
        option: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_number(name: &str, value: &str) -> Result<f64> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Move;
    use approx::assert_relative_eq;
    use millsim_tool::{Tool, ToolShape};

    fn cutting_path(tool: i32) -> ToolPath {
        [Move::cutting(Point3::origin(), Point3::new(10.0, 0.0, 0.0), tool)]
            .into_iter()
            .collect()
    }

    fn flat_tool(number: u32, radius: f64, length: f64) -> Tool {
        let mut tool = Tool::new(number, number, ToolUnits::Mm);
        tool.set_radius(radius);
        tool.set_length(length);
        tool
    }

    #[test]
    fn test_new_project() {
        let project = Project::new();
        assert!(!project.is_dirty());
        assert!(project.automatic_workpiece());
        assert_eq!(project.resolution(), 1.0);
        assert_eq!(project.workpiece_margin(), 5.0);
        assert_eq!(project.resolution_mode(), ResolutionMode::Medium);
        assert!(project.workpiece_bounds().volume() == 0.0);
    }

    #[test]
    fn test_setters_only_dirty_on_change() {
        let mut project = Project::new();
        project.set_units(ToolUnits::Mm);
        project.set_watch(true);
        project.set_workpiece_margin(5.0);
        project.set_render_mode(RenderMode::MarchingCubes);
        project.set_resolution_mode(ResolutionMode::Medium);
        project.set_filename("");
        assert!(!project.is_dirty());

        project.set_units(ToolUnits::Inch);
        assert!(project.is_dirty());

        project.mark_clean();
        project.set_render_mode(RenderMode::SurfaceNets);
        assert!(project.is_dirty());
    }

    #[test]
    fn test_resolution_dirty_only_in_manual() {
        let mut project = Project::new();
        project.set_resolution(2.0);
        assert_eq!(project.resolution(), 2.0);
        assert!(!project.is_dirty());

        project.set_manual_resolution(0.5);
        assert_eq!(project.resolution_mode(), ResolutionMode::Manual);
        assert_eq!(project.resolution(), 0.5);
        assert!(project.is_dirty());

        project.mark_clean();
        project.set_resolution(0.25);
        assert!(project.is_dirty());
    }

    #[test]
    fn test_mode_change_recomputes_resolution() {
        let mut project = Project::new();
        project.set_automatic_workpiece(false);
        project.set_workpiece_bounds(Bounds3::new(
            Point3::origin(),
            Point3::new(100.0, 50.0, 50.0),
        ));
        assert_relative_eq!(project.resolution(), 1.0);

        project.set_resolution_mode(ResolutionMode::Low);
        assert_relative_eq!(project.resolution(), 2.5f64.cbrt());

        project.set_resolution_mode(ResolutionMode::Manual);
        project.set_workpiece_bounds(Bounds3::new(
            Point3::origin(),
            Point3::new(1000.0, 1000.0, 1000.0),
        ));
        assert_relative_eq!(project.resolution(), 2.5f64.cbrt());
    }

    #[test]
    fn test_automatic_workpiece_minimum_thickness() {
        let mut project = Project::new();
        project.tools_mut().add(flat_tool(1, 5.0, 1.0));
        project.set_workpiece_margin(0.0);
        project.mark_clean();

        project.update_automatic_workpiece(&cutting_path(1));

        let bounds = project.workpiece_bounds();
        assert_relative_eq!(bounds.max().z, 0.0);
        assert!(bounds.height() >= 2.0);
        assert_relative_eq!(bounds.width(), 20.0);
        assert_relative_eq!(project.resolution(), (bounds.volume() / 250_000.0).cbrt());
        assert!(project.automatic_workpiece());
        assert!(!project.is_dirty());
    }

    #[test]
    fn test_manual_workpiece_is_kept() {
        let mut project = Project::new();
        let manual = Bounds3::new(Point3::new(-1.0, -1.0, -1.0), Point3::origin());
        project.set_workpiece_bounds(manual);
        assert!(!project.automatic_workpiece());
        assert!(project.is_dirty());

        project.update_automatic_workpiece(&cutting_path(1));
        assert_eq!(project.workpiece_bounds(), manual);
    }

    #[test]
    fn test_no_cutting_leaves_workpiece() {
        let mut project = Project::new();
        project.update_automatic_workpiece(&ToolPath::new());
        assert_eq!(project.workpiece_bounds(), Bounds3::zero());
        assert_eq!(project.resolution(), 1.0);
    }

    #[test]
    fn test_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.nc");
        let b = dir.path().join("b.nc");

        let mut project = Project::new();
        project.add_file(&a).unwrap();
        project.add_file(&b).unwrap();
        project.add_file(dir.path().join("sub/../a.nc")).unwrap();
        assert_eq!(project.files().len(), 2);
        assert!(project.is_dirty());

        assert_eq!(project.file(1).unwrap().path(), b.as_path());
        assert!(matches!(project.file(2), Err(ProjectError::InvalidFileIndex(2))));
        assert!(project.find_file(&a).is_some());
        assert!(project.find_file(dir.path().join("c.nc")).is_none());

        project.mark_clean();
        project.remove_file(5);
        assert!(!project.is_dirty());
        project.remove_file(0);
        assert!(project.is_dirty());
        assert_eq!(project.files().len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("job.camotics");
        let nc_path = dir.path().join("sub dir").join("part 1.nc");

        let mut project = Project::new();
        project.set_units(ToolUnits::Inch);
        project.set_render_mode(RenderMode::CubicMarchingSquares);
        project.set_workpiece_margin(7.5);
        project.set_automatic_workpiece(false);
        project.set_workpiece_bounds(Bounds3::new(
            Point3::new(-10.0, -20.0, -5.0),
            Point3::new(10.0, 20.0, 0.0),
        ));
        let mut tool = flat_tool(3, 1.5, 12.0);
        tool.set_shape(ToolShape::Ballnose);
        tool.set_description("ball & chain");
        project.tools_mut().add(tool);
        project.add_file(&nc_path).unwrap();

        project.save_as(&project_path).unwrap();
        assert!(!project.is_dirty());

        let xml = fs::read_to_string(&project_path).unwrap();
        assert!(xml.contains("<!-- Note, all values are in mm regardless of 'units' option. -->"));
        assert!(xml.contains(r#"<nc-files v="sub%20dir/part%201.nc"/>"#));
        assert!(xml.contains(r#"<render-mode v="cms"/>"#));

        let loaded = Project::open(&project_path, &Settings::default()).unwrap();
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.filename(), Some(project_path.as_path()));
        assert_eq!(loaded.units(), ToolUnits::Inch);
        assert_eq!(loaded.render_mode(), RenderMode::CubicMarchingSquares);
        assert_eq!(loaded.workpiece_margin(), 7.5);
        assert!(!loaded.automatic_workpiece());
        assert_eq!(loaded.workpiece_bounds(), project.workpiece_bounds());
        assert_relative_eq!(loaded.resolution(), project.resolution());

        assert_eq!(loaded.files().len(), 1);
        assert_eq!(loaded.file(0).unwrap().path(), nc_path.as_path());

        let tool = loaded.tools().get(3).unwrap();
        assert_eq!(tool.shape(), ToolShape::Ballnose);
        assert_relative_eq!(tool.radius(), 1.5, epsilon = 1e-9);
        assert_eq!(tool.description(), "ball & chain");
    }

    #[test]
    fn test_load_options_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.xml");
        fs::write(
            &path,
            r#"<camotics>
                <resolution-mode v="manual"/>
                <resolution v="0.3"/>
                <watch v="false"/>
                <tool_table>
                  <tool number="1" length="10" diameter="4"/>
                  <tool number="2" diameter="4"/>
                </tool_table>
              </camotics>"#,
        )
        .unwrap();

        let project = Project::open(&path, &Settings::default()).unwrap();
        assert_eq!(project.resolution_mode(), ResolutionMode::Manual);
        assert_eq!(project.resolution(), 0.3);
        assert!(!project.watch());
        assert!(project.automatic_workpiece());
        assert_eq!(project.tools().len(), 1);
    }

    #[test]
    fn test_load_rejects_bad_option() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xml");
        fs::write(&path, r#"<camotics><options><render-mode v="raytrace"/></options></camotics>"#)
            .unwrap();

        assert!(matches!(
            Project::open(&path, &Settings::default()),
            Err(ProjectError::UnknownRenderMode(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.camotics");

        let settings = Settings {
            resolution_mode: ResolutionMode::High,
            ..Settings::default()
        };
        let project = Project::open(&path, &settings).unwrap();
        assert_eq!(project.filename(), Some(path.as_path()));
        assert_eq!(project.directory(), dir.path());
        assert_eq!(project.resolution_mode(), ResolutionMode::High);
        assert!(!project.is_dirty());
    }

    #[test]
    fn test_check_files() {
        let dir = tempfile::tempdir().unwrap();
        let nc = dir.path().join("part.nc");
        fs::write(&nc, "G1 X1\n").unwrap();

        let mut project = Project::new();
        project.add_file(&nc).unwrap();
        assert!(!project.check_files_at(100));

        let later = SystemTime::now() + std::time::Duration::from_secs(10);
        fs::File::options()
            .write(true)
            .open(&nc)
            .unwrap()
            .set_modified(later)
            .unwrap();

        // Same second: throttled
        assert!(!project.check_files_at(100));
        assert!(project.check_files_at(101));
        assert!(!project.check_files_at(102));

        project.set_watch(false);
        fs::remove_file(&nc).unwrap();
        assert!(!project.check_files_at(200));
    }

    #[test]
    fn test_save_without_filename() {
        let mut project = Project::new();
        assert!(matches!(project.save(), Err(ProjectError::NoFilename)));
    }

    #[test]
    fn test_render_mode_tokens() {
        assert_eq!("MCUBES".parse::<RenderMode>().unwrap(), RenderMode::MarchingCubes);
        assert_eq!("surface_nets".parse::<RenderMode>().unwrap(), RenderMode::SurfaceNets);
        assert!("voxels".parse::<RenderMode>().is_err());
    }
}
