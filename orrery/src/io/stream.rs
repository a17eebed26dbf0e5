//! Structured attribute streams

use orrery_geom::{Quaternion, Vec2, Vec3};
use serde::Serialize;
use serde_json::{json, Value as JValue};

use crate::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Float(f32),
    Int(i64),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Quat(Quaternion),
    Color(Color),
    Vec2List(Vec<Vec2>),
    Vec3List(Vec<Vec3>),
    IntList(Vec<i64>),
    /// Rendered as base64.
    Bytes(Vec<u8>),
}

impl AttrValue {
    pub fn to_json(&self) -> JValue {
        let v2 = |v: &Vec2| json!([v.x, v.y]);
        let v3 = |v: &Vec3| json!([v.x, v.y, v.z]);
        match self {
            AttrValue::Str(s) => json!(s),
            AttrValue::Float(f) => json!(f),
            AttrValue::Int(i) => json!(i),
            AttrValue::Bool(b) => json!(b),
            AttrValue::Vec2(v) => v2(v),
            AttrValue::Vec3(v) => v3(v),
            AttrValue::Quat(q) => json!([q.x(), q.y(), q.z(), q.w()]),
            AttrValue::Color(c) => json!([c.r, c.g, c.b]),
            AttrValue::Vec2List(vs) => JValue::Array(vs.iter().map(v2).collect()),
            AttrValue::Vec3List(vs) => JValue::Array(vs.iter().map(v3).collect()),
            AttrValue::IntList(is) => json!(is),
            AttrValue::Bytes(b) => json!(base64::encode(b)),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<f32> for AttrValue {
    fn from(f: f32) -> Self {
        AttrValue::Float(f)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<Vec2> for AttrValue {
    fn from(v: Vec2) -> Self {
        AttrValue::Vec2(v)
    }
}

impl From<Vec3> for AttrValue {
    fn from(v: Vec3) -> Self {
        AttrValue::Vec3(v)
    }
}

impl From<Quaternion> for AttrValue {
    fn from(q: Quaternion) -> Self {
        AttrValue::Quat(q)
    }
}

impl From<Color> for AttrValue {
    fn from(c: Color) -> Self {
        AttrValue::Color(c)
    }
}

/// Sink for a tree of named structs carrying ordered attributes.
pub trait OutputStream {
    fn begin_struct(&mut self, kind: &str, identifier: Option<&str>);

    /// `inline` is a layout hint for text formats that support it.
    fn add_attribute(&mut self, name: &str, value: AttrValue, inline: bool);

    fn end_struct(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: JValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructNode {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<StructNode>,
}

impl StructNode {
    pub fn attribute(&self, name: &str) -> Option<&JValue> {
        self.attributes.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn child(&self, kind: &str) -> Option<&StructNode> {
        self.children.iter().find(|c| c.kind == kind)
    }
}

/// Builds the struct tree in memory and renders it as JSON.
#[derive(Debug, Default)]
pub struct JsonOutputStream {
    open: Vec<StructNode>,
    roots: Vec<StructNode>,
}

#[derive(Serialize)]
struct Document<'a> {
    format: &'static str,
    version: u32,
    structs: &'a [StructNode],
}

impl JsonOutputStream {
    pub fn new() -> JsonOutputStream {
        JsonOutputStream::default()
    }

    /// Completed top-level structs. Structs still open are not included.
    pub fn structs(&self) -> &[StructNode] {
        &self.roots
    }

    pub fn is_balanced(&self) -> bool {
        self.open.is_empty()
    }

    pub fn to_value(&self) -> Result<JValue, serde_json::Error> {
        serde_json::to_value(self.document())
    }

    pub fn to_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document())
    }

    fn document(&self) -> Document<'_> {
        Document {
            format: "orrery-scene",
            version: 1,
            structs: &self.roots,
        }
    }
}

impl OutputStream for JsonOutputStream {
    fn begin_struct(&mut self, kind: &str, identifier: Option<&str>) {
        self.open.push(StructNode {
            kind: kind.to_string(),
            id: identifier.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
        });
    }

    fn add_attribute(&mut self, name: &str, value: AttrValue, _inline: bool) {
        match self.open.last_mut() {
            Some(node) => node.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_json(),
            }),
            None => log::warn!("Attribute {} written outside of any struct", name),
        }
    }

    fn end_struct(&mut self) {
        let node = match self.open.pop() {
            Some(node) => node,
            None => {
                log::warn!("Unbalanced end_struct");
                return;
            }
        };
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }
}
