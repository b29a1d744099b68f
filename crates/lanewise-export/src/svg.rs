//! SVG preview serializer.
//!
//! Renders planned segments as a top-down view of the XY plane using the
//! [`svg`] crate for document construction, XML escaping, and path data
//! formatting. Z and orientation are ignored.
//!
//! Each segment becomes a separate `<path>` element using `M` (move to)
//! and `L` (line to) commands, in traversal order. Optional dashed travel
//! moves connect each segment's exit to the next segment's entry, and
//! optional markers show where each segment starts, so the direction
//! choices made by the sequencer are visible at a glance.
//!
//! Model Y points up; SVG Y points down. Coordinates are flipped and
//! shifted so the `viewBox` tightly fits the segments plus padding.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use lanewise_pipeline::Segment;

/// Rendered document width in pixels; height follows the aspect ratio.
const DOCUMENT_WIDTH_PX: f64 = 800.0;

/// Padding around the segments, as a fraction of the larger extent.
const PADDING_FRACTION: f64 = 0.05;

/// Default stroke width, as a fraction of the larger extent.
const STROKE_FRACTION: f64 = 1.0 / 400.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the input file stem.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized planner configuration, emitted inside `<metadata>`
    /// wrapped in a namespaced `<lanewise:plan>` element so exported
    /// files carry the settings that produced them.
    pub config_json: Option<&'a str>,
}

/// What to draw besides the segments themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgOptions {
    /// Draw dashed travel moves between consecutive segments.
    pub show_travel: bool,

    /// Draw a marker at the first pose of every segment.
    pub show_start_markers: bool,

    /// Stroke width in model units. `None` scales with the drawing.
    pub stroke_width: Option<f64>,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            show_travel: true,
            show_start_markers: true,
            stroke_width: None,
        }
    }
}

/// Mapping from model XY to `viewBox` coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewport {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    extent: f64,
}

impl Viewport {
    /// Fit every pose position, padded on all sides.
    fn fit(segments: &[Segment]) -> Self {
        let mut positions = segments
            .iter()
            .flat_map(Segment::poses)
            .map(lanewise_pipeline::Pose::position);

        let Some(first) = positions.next() else {
            return Self {
                left: 0.0,
                top: 0.0,
                width: 1.0,
                height: 1.0,
                extent: 1.0,
            };
        };

        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in positions {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        let extent = (max_x - min_x).max(max_y - min_y);
        let extent = if extent > 0.0 { extent } else { 1.0 };
        let pad = extent * PADDING_FRACTION;
        Self {
            left: min_x - pad,
            top: max_y + pad,
            width: 2.0f64.mul_add(pad, max_x - min_x),
            height: 2.0f64.mul_add(pad, max_y - min_y),
            extent,
        }
    }

    /// Model XY to `viewBox` XY.
    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (round(x - self.left), round(self.top - y))
    }
}

/// Round to a micro-unit so documents don't carry float noise.
fn round(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Build an SVG path `d` attribute string from a segment's XY positions.
///
/// Uses `M` for the first pose and `L` for subsequent poses, with model
/// coordinates unchanged. Returns an empty string for single-pose
/// segments.
///
/// Coordinates are formatted by the [`svg`] crate using `f32` precision.
///
/// # Examples
///
/// ```
/// use lanewise_pipeline::{Pose, Segment};
/// use lanewise_export::build_path_data;
///
/// let segment = Segment::new(vec![
///     Pose::from_xyz(10.0, 20.0, 0.0),
///     Pose::from_xyz(30.0, 40.0, 5.0),
/// ])
/// .unwrap();
/// assert_eq!(build_path_data(&segment), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(segment: &Segment) -> String {
    path_data(segment, |x, y| (x, y))
}

/// Path data for `segment` with every XY passed through `map`.
fn path_data(segment: &Segment, map: impl Fn(f64, f64) -> (f64, f64)) -> String {
    let poses = segment.poses();
    if poses.len() < 2 {
        return String::new();
    }

    let at = |i: usize| {
        let p = poses[i].position();
        map(p.x, p.y)
    };
    let mut data = Data::new().move_to(at(0));
    for i in 1..poses.len() {
        data = data.line_to(at(i));
    }
    String::from(Value::from(data))
}

/// Serialize planned segments into an SVG preview document.
///
/// Segments are drawn in the order given, which for planner output is
/// traversal order. Single-pose segments produce no `<path>` but still
/// get a start marker.
///
/// # Examples
///
/// ```
/// use lanewise_pipeline::{Pose, Segment};
/// use lanewise_export::{SvgMetadata, SvgOptions, to_svg};
///
/// let segments = vec![
///     Segment::new(vec![Pose::from_xyz(0.0, 0.0, 0.0), Pose::from_xyz(10.0, 0.0, 0.0)])
///         .unwrap(),
/// ];
/// let metadata = SvgMetadata {
///     title: Some("panel-7"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&segments, &SvgOptions::default(), &metadata);
/// assert!(svg.contains("<title>panel-7</title>"));
/// assert!(svg.contains("M0.5,0.5 L10.5,0.5"));
/// ```
#[must_use]
pub fn to_svg(segments: &[Segment], options: &SvgOptions, metadata: &SvgMetadata<'_>) -> String {
    let view = Viewport::fit(segments);
    let stroke = options
        .stroke_width
        .unwrap_or_else(|| round(view.extent * STROKE_FRACTION));

    let mut doc = Document::new()
        .set("width", round(DOCUMENT_WIDTH_PX))
        .set("height", round(DOCUMENT_WIDTH_PX * view.height / view.width))
        .set(
            "viewBox",
            format!("0 0 {} {}", round(view.width), round(view.height)),
        );

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    // Optional <metadata> element with the planner configuration
    if let Some(config_json) = metadata.config_json {
        let mut plan_el = Element::new("lanewise:plan");
        plan_el.assign("xmlns:lanewise", "urn:lanewise:plan:1");
        plan_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(plan_el);
        doc = doc.add(metadata_el);
    }

    if options.show_travel && segments.len() > 1 {
        let mut travel = Group::new()
            .set("id", "travel")
            .set("fill", "none")
            .set("stroke", "gray")
            .set("stroke-width", stroke)
            .set("stroke-dasharray", format!("{} {}", round(stroke * 4.0), round(stroke * 2.0)));
        for pair in segments.windows(2) {
            let exit = pair[0].last().position();
            let entry = pair[1].first().position();
            let data = Data::new()
                .move_to(view.map(exit.x, exit.y))
                .line_to(view.map(entry.x, entry.y));
            travel = travel.add(Path::new().set("d", data));
        }
        doc = doc.add(travel);
    }

    // One <path> per segment, skipping single-pose segments.
    for segment in segments {
        let d = path_data(segment, |x, y| view.map(x, y));
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", stroke);
        doc = doc.add(path);
    }

    if options.show_start_markers && !segments.is_empty() {
        let mut starts = Group::new().set("id", "starts").set("fill", "green");
        for segment in segments {
            let p = segment.first().position();
            let (cx, cy) = view.map(p.x, p.y);
            starts = starts.add(
                Circle::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", round(stroke * 2.0)),
            );
        }
        doc = doc.add(starts);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
