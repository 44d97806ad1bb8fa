//! Per-tile metadata descriptors.
//!
//! Each lidar tile in a USGS project is described by an FGDC CSDGM XML
//! document. Only two parts of it matter here:
//!
//! ```xml
//! <metadata>
//!   <idinfo><spdom><bounding>
//!     <westbc>-83.0</westbc><eastbc>-82.0</eastbc>
//!     <northbc>41.0</northbc><southbc>40.0</southbc>
//!   </bounding></spdom></idinfo>
//!   <distinfo>... <networkr>https://.../tile.laz</networkr> ...</distinfo>
//! </metadata>
//! ```
//!
//! FGDC bounding coordinates are always geographic, so parsed boxes are in
//! [`Crs::WGS84`].

use crate::error::DescriptorError;
use reqwest::Url;
use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use tileseek_geo::{BoundingBox, Crs};

/// Element holding the four bounding coordinates.
const BOUNDING: &str = "bounding";
const WEST: &str = "westbc";
const EAST: &str = "eastbc";
const NORTH: &str = "northbc";
const SOUTH: &str = "southbc";

/// Element holding the data file reference.
const NETWORK_RESOURCE: &str = "networkr";

/// URL of one descriptor document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorReference(Url);

impl DescriptorReference {
    /// Wrap a descriptor URL.
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    /// The descriptor URL.
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// The descriptor URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DescriptorReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Reference to the downloadable data file of a tile (usually a LAZ URL).
///
/// The resolver does not interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataLink(pub String);

impl DataLink {
    /// The link as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed tile metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Tile coverage.
    pub bbox: BoundingBox,
    /// Location of the tile's data file.
    pub data_link: DataLink,
}

impl Descriptor {
    /// Parse an FGDC metadata document.
    ///
    /// # Errors
    /// - [`DescriptorError::Malformed`] if the document is not well-formed XML
    ///   or a bounding coordinate is not a number.
    /// - [`DescriptorError::MissingField`] if the bounding box, one of its four
    ///   coordinates, or the data link is absent or empty.
    pub fn parse(xml: &str) -> Result<Self, DescriptorError> {
        // FGDC documents commonly reference the CSDGM DTD
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };

        let doc = Document::parse_with_options(xml, options)
            .map_err(|e| DescriptorError::Malformed(e.to_string()))?;
        let root = doc.root_element();

        let bounding = find_descendant(root, BOUNDING).ok_or(DescriptorError::MissingField(BOUNDING))?;
        let bbox = BoundingBox::new(
            coordinate(bounding, WEST)?,
            coordinate(bounding, EAST)?,
            coordinate(bounding, NORTH)?,
            coordinate(bounding, SOUTH)?,
            Crs::WGS84,
        );

        let data_link = find_descendant(root, NETWORK_RESOURCE)
            .and_then(non_empty_text)
            .ok_or(DescriptorError::MissingField(NETWORK_RESOURCE))?;

        Ok(Self {
            bbox,
            data_link: DataLink(data_link.to_string()),
        })
    }
}

/// First element named `name` below `node`, in document order.
fn find_descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn non_empty_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

/// Numeric text of the direct child `name` of the bounding element.
fn coordinate(bounding: Node<'_, '_>, name: &'static str) -> Result<f64, DescriptorError> {
    let text = bounding
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(non_empty_text)
        .ok_or(DescriptorError::MissingField(name))?;

    text.parse::<f64>().map_err(|_| {
        DescriptorError::Malformed(format!("{} is not a number: '{}'", name, text))
    })
}
