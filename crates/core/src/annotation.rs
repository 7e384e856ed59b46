//! Annotation data model
//!
//! Provides the canonical image-space record for one annotation plus the loose
//! interchange record used for persistence and export. All coordinates are stored
//! in original-image pixel space, independent of view zoom, pan or container size.

use crate::coords::{Bounds, Point};
use crate::error::RecordError;

/// Unique identifier for an annotation
///
/// Stable across history navigation and persisted in saved files.
/// Generated using UUID v4 when an imported record does not carry one.
pub type AnnotationId = uuid::Uuid;

/// Closed set of annotation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rect,
    Circle,
}

impl ShapeKind {
    /// Name used in interchange records
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "Rect",
            ShapeKind::Circle => "Circle",
        }
    }

    /// Parse an interchange kind, accepting lowercase spellings
    pub fn parse(kind: &str) -> Option<ShapeKind> {
        match kind {
            "Rect" | "rect" => Some(ShapeKind::Rect),
            "Circle" | "circle" => Some(ShapeKind::Circle),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific extent of an annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Rectangle anchored at its top-left corner
    Rect { width: f64, height: f64 },
    /// Circle anchored at its center
    Circle { radius: f64 },
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rect { .. } => ShapeKind::Rect,
            Shape::Circle { .. } => ShapeKind::Circle,
        }
    }

    /// Multiply every length by `factor`
    pub fn scaled(&self, factor: f64) -> Shape {
        match *self {
            Shape::Rect { width, height } => Shape::Rect {
                width: width * factor,
                height: height * factor,
            },
            Shape::Circle { radius } => Shape::Circle {
                radius: radius * factor,
            },
        }
    }

    /// Bounding box relative to the anchor position
    pub fn local_bounds(&self) -> Bounds {
        match *self {
            Shape::Rect { width, height } => Bounds::new(0.0, 0.0, width, height),
            Shape::Circle { radius } => Bounds::new(-radius, -radius, radius * 2.0, radius * 2.0),
        }
    }

    /// Fold negative rectangle sides into a shifted anchor.
    ///
    /// Returns the adjusted anchor together with the normalized shape.
    pub fn normalized(&self, anchor: Point) -> (Point, Shape) {
        match *self {
            Shape::Rect { width, height } => {
                let mut anchor = anchor;
                if width < 0.0 {
                    anchor.x += width;
                }
                if height < 0.0 {
                    anchor.y += height;
                }
                (
                    anchor,
                    Shape::Rect {
                        width: width.abs(),
                        height: height.abs(),
                    },
                )
            }
            Shape::Circle { radius } => (anchor, Shape::Circle { radius: radius.abs() }),
        }
    }
}

/// Canonical annotation record in image space
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Identifier; `None` until the store assigns one on import
    pub id: Option<AnnotationId>,
    /// Top-left corner for rectangles, center for circles
    pub position: Point,
    pub shape: Shape,
    /// Display color, also the default label background
    pub stroke: String,
    pub label: Option<String>,
}

impl Annotation {
    /// Create a rectangle annotation without an id
    pub fn rect(x: f64, y: f64, width: f64, height: f64, stroke: impl Into<String>) -> Self {
        Self {
            id: None,
            position: Point::new(x, y),
            shape: Shape::Rect { width, height },
            stroke: stroke.into(),
            label: None,
        }
    }

    /// Create a circle annotation without an id
    pub fn circle(x: f64, y: f64, radius: f64, stroke: impl Into<String>) -> Self {
        Self {
            id: None,
            position: Point::new(x, y),
            shape: Shape::Circle { radius },
            stroke: stroke.into(),
            label: None,
        }
    }

    pub fn with_id(mut self, id: AnnotationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// Image-space bounding box
    pub fn bounds(&self) -> Bounds {
        self.shape.local_bounds().offset(self.position)
    }

    /// Bounding-box export record
    pub fn bounding_box(&self) -> BoundingBox {
        let bounds = self.bounds();
        BoundingBox {
            id: self.id,
            label: self.label.clone(),
            xmin: bounds.x,
            ymin: bounds.y,
            xmax: bounds.max_x(),
            ymax: bounds.max_y(),
        }
    }
}

/// Interchange record, one per annotation.
///
/// Kept loose on purpose: unknown kinds and missing fields must survive parsing
/// so that a file with one malformed record still loads the rest.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_id"
    )]
    pub id: Option<AnnotationId>,
    #[serde(alias = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub stroke: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TryFrom<AnnotationRecord> for Annotation {
    type Error = RecordError;

    fn try_from(record: AnnotationRecord) -> Result<Self, Self::Error> {
        let kind = ShapeKind::parse(&record.kind)
            .ok_or_else(|| RecordError::UnknownKind(record.kind.clone()))?;

        let shape = match kind {
            ShapeKind::Rect => Shape::Rect {
                width: record.width.ok_or(RecordError::MissingField {
                    kind: "Rect",
                    field: "width",
                })?,
                height: record.height.ok_or(RecordError::MissingField {
                    kind: "Rect",
                    field: "height",
                })?,
            },
            ShapeKind::Circle => {
                let radius = record.radius.ok_or(RecordError::MissingField {
                    kind: "Circle",
                    field: "radius",
                })?;
                if radius.is_finite() && radius <= 0.0 {
                    return Err(RecordError::NonPositiveRadius(radius));
                }
                Shape::Circle { radius }
            }
        };

        let position = Point::new(record.x, record.y);
        let lengths_finite = match shape {
            Shape::Rect { width, height } => width.is_finite() && height.is_finite(),
            Shape::Circle { radius } => radius.is_finite(),
        };
        if !position.is_finite() || !lengths_finite {
            return Err(RecordError::NonFinite);
        }

        // Negative sides from foreign tools are folded, as after a drawing gesture
        let (position, shape) = shape.normalized(position);

        Ok(Annotation {
            id: record.id,
            position,
            shape,
            stroke: record.stroke,
            label: record.label.filter(|label| !label.is_empty()),
        })
    }
}

impl From<&Annotation> for AnnotationRecord {
    fn from(annotation: &Annotation) -> Self {
        let (width, height, radius) = match annotation.shape {
            Shape::Rect { width, height } => (Some(width), Some(height), None),
            Shape::Circle { radius } => (None, None, Some(radius)),
        };
        AnnotationRecord {
            id: annotation.id,
            kind: annotation.kind().as_str().to_string(),
            x: annotation.position.x,
            y: annotation.position.y,
            width,
            height,
            radius,
            stroke: annotation.stroke.clone(),
            label: annotation.label.clone(),
        }
    }
}

impl From<Annotation> for AnnotationRecord {
    fn from(annotation: Annotation) -> Self {
        AnnotationRecord::from(&annotation)
    }
}

/// Axis-aligned bounding box export in image pixels
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_id"
    )]
    pub id: Option<AnnotationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Rectangle record spanning this box. Inverted boxes are normalized when
    /// the record is converted to an [`Annotation`].
    pub fn to_record(&self, stroke: &str) -> AnnotationRecord {
        AnnotationRecord {
            id: self.id,
            kind: ShapeKind::Rect.as_str().to_string(),
            x: self.xmin,
            y: self.ymin,
            width: Some(self.xmax - self.xmin),
            height: Some(self.ymax - self.ymin),
            radius: None,
            stroke: stroke.to_string(),
            label: self.label.clone(),
        }
    }
}

/// Accepts any string or number as an id. Strings that are not UUIDs and
/// numbers are replaced with a fresh v4 id.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<AnnotationId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = <Option<Value> as serde::Deserialize>::deserialize(deserializer)?;
    let foreign = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) => match AnnotationId::parse_str(&text) {
            Ok(id) => return Ok(Some(id)),
            Err(_) => text,
        },
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => {
            return Err(D::Error::custom(format!(
                "annotation id must be a string or number, got {other}"
            )))
        }
    };
    let id = AnnotationId::new_v4();
    tracing::warn!(%foreign, %id, "annotation id is not a UUID, assigning a new one");
    Ok(Some(id))
}

/// Parse a JSON array element by element, logging and dropping the elements
/// that do not deserialize.
fn parse_array<T>(json: &str, what: &str) -> Result<Vec<T>, serde_json::Error>
where
    T: serde::de::DeserializeOwned,
{
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(error) => {
                tracing::warn!(index, %error, "skipping malformed {what}");
                None
            }
        })
        .collect())
}

/// Parse a JSON array of interchange records.
///
/// Only a document that is not a JSON array fails. Elements missing required
/// fields are logged and skipped; records with unknown kinds are kept and
/// rejected later at load time.
pub fn parse_records(json: &str) -> Result<Vec<AnnotationRecord>, serde_json::Error> {
    parse_array(json, "annotation record")
}

/// Parse a JSON array of image-space bounding boxes, skipping malformed ones
pub fn parse_boxes(json: &str) -> Result<Vec<BoundingBox>, serde_json::Error> {
    parse_array(json, "bounding box")
}

/// Serialize annotations to a pretty JSON array of interchange records
pub fn to_json(annotations: &[Annotation]) -> Result<String, serde_json::Error> {
    let records: Vec<AnnotationRecord> = annotations.iter().map(AnnotationRecord::from).collect();
    serde_json::to_string_pretty(&records)
}
