//! Table layouts written by hand as XML.
//!
//! ```xml
//! <layout>
//!     <mesh>
//!         <id>card-1</id>
//!         <shape>card</shape>
//!         <position>0 0 0</position>
//!         <behaviors>movable flippable stackable</behaviors>
//!     </mesh>
//! </layout>
//! ```

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};

use crate::behaviors::{Anchor, AnchorBehavior, Behavior, BehaviorKind, DetailBehavior};
use crate::mesh::{MeshKind, MeshSpec};

/// Parses a layout document into mesh documents.
pub fn parse_layout(xml: &str) -> Result<Vec<MeshSpec>> {
    let document = Document::parse(xml).context("invalid layout XML")?;
    let mut meshes = Vec::new();

    for node in document.descendants().filter(|n| n.has_tag_name("mesh")) {
        let id = required_text(&node, "id")?;
        let kind = match optional_text(&node, "shape") {
            Some(shape) => {
                MeshKind::from_name(&shape).ok_or_else(|| anyhow!("{id}: unknown shape {shape}"))?
            }
            None => MeshKind::Card,
        };
        let mut spec = MeshSpec::new(id.clone(), kind);
        spec.texture = optional_text(&node, "texture");
        spec.position = parse_vec3(optional_text(&node, "position"), Vec3::ZERO)
            .with_context(|| format!("{id}: invalid position"))?;
        spec.rotation = parse_vec3(optional_text(&node, "rotation"), Vec3::ZERO)
            .with_context(|| format!("{id}: invalid rotation"))?;
        if let Some(dimensions) = optional_text(&node, "dimensions") {
            spec.dimensions = Some(
                parse_vec3(Some(dimensions), kind.default_dimensions())
                    .with_context(|| format!("{id}: invalid dimensions"))?,
            );
        }

        let names = optional_text(&node, "behaviors").unwrap_or_default();
        for name in names.split_whitespace() {
            let kind = BehaviorKind::from_name(name)
                .ok_or_else(|| anyhow!("{id}: unknown behavior {name}"))?;
            spec.behaviors.push(behavior_from_node(&node, kind, spec.texture.as_deref())?);
        }
        meshes.push(spec);
    }

    Ok(meshes)
}

fn behavior_from_node(node: &Node<'_, '_>, kind: BehaviorKind, texture: Option<&str>) -> Result<Behavior> {
    let mut behavior = Behavior::default_for(kind);
    match &mut behavior {
        Behavior::Flip(flip) => {
            flip.is_flipped = parse_bool(optional_text(node, "flipped"))?;
        }
        Behavior::Anchor(anchors) => {
            *anchors = parse_anchors(node)?;
        }
        Behavior::Detail(detail) => {
            *detail = DetailBehavior {
                front: optional_text(node, "front")
                    .or_else(|| texture.map(str::to_string))
                    .unwrap_or_default(),
                back: optional_text(node, "back"),
            };
        }
        Behavior::Randomize(randomize) => {
            if let Some(max) = optional_text(node, "faces") {
                randomize.max = max
                    .parse::<u8>()
                    .map_err(|err| anyhow!("failed to parse face count: {err}"))?;
                if randomize.max == 0 {
                    return Err(anyhow!("a randomizable mesh needs at least one face"));
                }
            }
        }
        Behavior::Move(_)
        | Behavior::Rotate(_)
        | Behavior::Stack(_)
        | Behavior::Target(_) => {}
    }
    Ok(behavior)
}

fn parse_anchors(node: &Node<'_, '_>) -> Result<AnchorBehavior> {
    let mut anchors = Vec::new();
    for anchor in node.children().filter(|n| n.has_tag_name("anchor")) {
        let id = required_text(&anchor, "id")?;
        let offset = parse_vec3(optional_text(&anchor, "offset"), Vec3::ZERO)?;
        let width = parse_f32(optional_text(&anchor, "width"), 1.0)?;
        let depth = parse_f32(optional_text(&anchor, "depth"), 1.0)?;
        anchors.push(Anchor::new(id, offset, width, depth));
    }
    Ok(AnchorBehavior { anchors })
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let numbers = value
        .split_whitespace()
        .map(|component| component.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow!("failed to parse vector: {err}"))?;
    match numbers.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("vector needs 3 components, got {}", numbers.len())),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>) -> Result<bool> {
    match value.as_deref() {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(anyhow!("expected true or false, got {other}")),
    }
}
