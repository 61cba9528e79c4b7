//! Reply parsing: loosely-typed JSON documents into typed records.
//!
//! The policy throughout: required shape violations (an array where an
//! object was expected, a wrongly-typed scalar) fail with
//! [`Error::MalformedReply`] carrying the offending field path; missing or
//! null fields take the type's default instead of failing; enum-like
//! strings outside the known vocabulary fall back to the `Unknown` sentinel
//! with the original text preserved verbatim, and a warning is logged so
//! newer servers keep working.

use serde_json::Value;
use tracing::warn;

use sash_types::{
    Binding, BorderStyle, CommandResult, Container, InputType, Layout, Output, Rect, Version,
    Workspace,
};

use crate::error::{Error, Result};

/// Parse a reply payload into a JSON document.
///
/// # Errors
///
/// Returns [`Error::Json`] when the payload is not valid JSON.
pub fn parse_document(payload: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(payload)?)
}

/// Field lookup on an object document. Missing and explicit-null both count
/// as absent.
pub(crate) fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    }
}

fn require_object<'a>(value: &'a Value, path: &str) -> Result<&'a Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::malformed(path, "an object"))
    }
}

fn require_array<'a>(value: &'a Value, path: &str) -> Result<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| Error::malformed(path, "an array"))
}

fn get_i64(value: &Value, path: &str, key: &str) -> Result<i64> {
    match field(value, key) {
        None => Ok(0),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| Error::malformed(format!("{path}.{key}"), "an integer")),
    }
}

#[allow(clippy::cast_possible_truncation)] // geometry values fit i32 on any real display
fn get_i32(value: &Value, path: &str, key: &str) -> Result<i32> {
    Ok(get_i64(value, path, key)? as i32)
}

fn get_u64(value: &Value, path: &str, key: &str) -> Result<u64> {
    match field(value, key) {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| Error::malformed(format!("{path}.{key}"), "an unsigned integer")),
    }
}

#[allow(clippy::cast_possible_truncation)] // version numbers are small
fn get_u32(value: &Value, path: &str, key: &str) -> Result<u32> {
    Ok(get_u64(value, path, key)? as u32)
}

fn get_bool(value: &Value, path: &str, key: &str) -> Result<bool> {
    match field(value, key) {
        None => Ok(false),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| Error::malformed(format!("{path}.{key}"), "a bool")),
    }
}

fn get_string(value: &Value, path: &str, key: &str) -> Result<String> {
    match field(value, key) {
        None => Ok(String::new()),
        Some(v) => v
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::malformed(format!("{path}.{key}"), "a string")),
    }
}

fn get_opt_string(value: &Value, path: &str, key: &str) -> Result<Option<String>> {
    match field(value, key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| Error::malformed(format!("{path}.{key}"), "a string")),
    }
}

fn get_f64_or(value: &Value, path: &str, key: &str, default: f64) -> Result<f64> {
    match field(value, key) {
        None => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| Error::malformed(format!("{path}.{key}"), "a number")),
    }
}

pub(crate) fn parse_rect(value: &Value, path: &str) -> Result<Rect> {
    require_object(value, path)?;
    Ok(Rect {
        x: get_i32(value, path, "x")?,
        y: get_i32(value, path, "y")?,
        width: get_i32(value, path, "width")?,
        height: get_i32(value, path, "height")?,
    })
}

fn get_rect(value: &Value, path: &str, key: &str) -> Result<Rect> {
    match field(value, key) {
        None => Ok(Rect::default()),
        Some(v) => parse_rect(v, &format!("{path}.{key}")),
    }
}

pub(crate) fn parse_workspace(value: &Value, path: &str) -> Result<Workspace> {
    require_object(value, path)?;
    Ok(Workspace {
        num: get_i32(value, path, "num")?,
        name: get_string(value, path, "name")?,
        visible: get_bool(value, path, "visible")?,
        focused: get_bool(value, path, "focused")?,
        urgent: get_bool(value, path, "urgent")?,
        rect: get_rect(value, path, "rect")?,
        output: get_string(value, path, "output")?,
    })
}

/// Parse a get-workspaces reply (an array of workspace objects).
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] when the root is not an array or an
/// element violates the record shape.
pub fn parse_workspaces(root: &Value) -> Result<Vec<Workspace>> {
    require_array(root, "root")?
        .iter()
        .enumerate()
        .map(|(i, v)| parse_workspace(v, &format!("root[{i}]")))
        .collect()
}

fn parse_output(value: &Value, path: &str) -> Result<Output> {
    require_object(value, path)?;
    Ok(Output {
        name: get_string(value, path, "name")?,
        active: get_bool(value, path, "active")?,
        current_workspace: get_opt_string(value, path, "current_workspace")?,
        rect: get_rect(value, path, "rect")?,
    })
}

/// Parse a get-outputs reply.
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] on a shape violation.
pub fn parse_outputs(root: &Value) -> Result<Vec<Output>> {
    require_array(root, "root")?
        .iter()
        .enumerate()
        .map(|(i, v)| parse_output(v, &format!("root[{i}]")))
        .collect()
}

/// Parse a get-version reply.
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] on a shape violation.
pub fn parse_version(root: &Value) -> Result<Version> {
    require_object(root, "root")?;
    Ok(Version {
        human_readable: get_string(root, "root", "human_readable")?,
        loaded_config_file_name: get_string(root, "root", "loaded_config_file_name")?,
        major: get_u32(root, "root", "major")?,
        minor: get_u32(root, "root", "minor")?,
        patch: get_u32(root, "root", "patch")?,
    })
}

fn parse_border(value: &Value, path: &str) -> Result<(BorderStyle, Option<String>)> {
    let raw = get_string(value, path, "border")?;
    let style = match raw.as_str() {
        "none" => BorderStyle::None,
        "normal" => BorderStyle::Normal,
        "1pixel" => BorderStyle::OnePixel,
        "pixel" => BorderStyle::Pixel,
        "" => return Ok((BorderStyle::Unknown, None)),
        other => {
            warn!(border = other, "unknown \"border\" property, keeping raw value");
            return Ok((BorderStyle::Unknown, Some(raw)));
        }
    };
    Ok((style, None))
}

fn parse_layout(value: &Value, path: &str) -> Result<(Layout, Option<String>)> {
    let raw = get_string(value, path, "layout")?;
    let layout = match raw.as_str() {
        "splith" => Layout::SplitH,
        "splitv" => Layout::SplitV,
        "stacked" => Layout::Stacked,
        "tabbed" => Layout::Tabbed,
        "dockarea" => Layout::Dockarea,
        "output" => Layout::Output,
        "" => return Ok((Layout::Unknown, None)),
        other => {
            warn!(layout = other, "unknown \"layout\" property, keeping raw value");
            return Ok((Layout::Unknown, Some(raw)));
        }
    };
    Ok((layout, None))
}

/// Parse one tree node and, recursively, its children.
///
/// Recursion depth is bounded by the actual window tree depth, which is
/// small in practice.
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] when the node or a required field has
/// the wrong shape.
pub fn parse_container(value: &Value, path: &str) -> Result<Container> {
    require_object(value, path)?;

    let (border, border_raw) = parse_border(value, path)?;
    let (layout, layout_raw) = parse_layout(value, path)?;

    let mut nodes = Vec::new();
    if let Some(children) = field(value, "nodes") {
        let child_path = format!("{path}.nodes");
        for (i, child) in require_array(children, &child_path)?.iter().enumerate() {
            nodes.push(parse_container(child, &format!("{child_path}[{i}]"))?);
        }
    }

    Ok(Container {
        id: get_u64(value, path, "id")?,
        window_id: get_u64(value, path, "window")?,
        name: get_string(value, path, "name")?,
        node_type: get_string(value, path, "type")?,
        border,
        border_raw,
        current_border_width: get_i32(value, path, "current_border_width")?,
        layout,
        layout_raw,
        percent: get_f64_or(value, path, "percent", -1.0)?,
        rect: get_rect(value, path, "rect")?,
        window_rect: get_rect(value, path, "window_rect")?,
        deco_rect: get_rect(value, path, "deco_rect")?,
        geometry: get_rect(value, path, "geometry")?,
        urgent: get_bool(value, path, "urgent")?,
        focused: get_bool(value, path, "focused")?,
        nodes,
    })
}

/// Parse a run-command reply: an array of per-command outcomes.
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] when the root is not an array or an
/// element is not an object.
pub fn parse_command_results(root: &Value) -> Result<Vec<CommandResult>> {
    require_array(root, "root")?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let path = format!("root[{i}]");
            require_object(v, &path)?;
            Ok(CommandResult {
                success: get_bool(v, &path, "success")?,
                error: get_opt_string(v, &path, "error")?,
            })
        })
        .collect()
}

/// Parse a `{"success": bool}` reply (subscribe acknowledgements).
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] on a shape violation.
pub fn parse_success(root: &Value) -> Result<bool> {
    require_object(root, "root")?;
    get_bool(root, "root", "success")
}

/// Parse a reply that is a plain array of strings (bar config IDs, marks).
///
/// # Errors
///
/// Returns [`Error::MalformedReply`] on a shape violation.
pub fn parse_string_list(root: &Value) -> Result<Vec<String>> {
    require_array(root, "root")?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| Error::malformed(format!("root[{i}]"), "a string"))
        })
        .collect()
}

pub(crate) fn parse_binding(value: &Value, path: &str) -> Result<Binding> {
    require_object(value, path)?;

    let input_type = match get_string(value, path, "input_type")?.as_str() {
        "keyboard" => InputType::Keyboard,
        "mouse" => InputType::Mouse,
        other => {
            if !other.is_empty() {
                warn!(input_type = other, "unknown \"input_type\" property");
            }
            InputType::Unknown
        }
    };

    let mut event_state_mask = Vec::new();
    if let Some(mods) = field(value, "event_state_mask") {
        let mods_path = format!("{path}.event_state_mask");
        for (i, m) in require_array(mods, &mods_path)?.iter().enumerate() {
            let name = m
                .as_str()
                .ok_or_else(|| Error::malformed(format!("{mods_path}[{i}]"), "a string"))?;
            event_state_mask.push(name.to_owned());
        }
    }

    Ok(Binding {
        command: get_string(value, path, "command")?,
        event_state_mask,
        input_code: get_i32(value, path, "input_code")?,
        symbol: get_opt_string(value, path, "symbol")?,
        input_type,
    })
}
