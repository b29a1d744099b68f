//! lanewise-export: Pure format serializers (sans-IO)
//!
//! Converts planned segments into output formats. Currently supports a
//! JSON segment codec and an SVG top-down preview.

pub mod json;
pub mod svg;

pub use json::{ExportError, plan_to_json, segments_from_json, segments_to_json};
pub use svg::{SvgMetadata, SvgOptions, build_path_data, to_svg};
