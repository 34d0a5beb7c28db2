//! Navigation over the flattened rulebook stream
//!
//! Every extractor works on the same primitive: a flat, ordered slice of
//! `ContentNode`s produced by the flattener. The locator finds named sections
//! and `PART n:` boundaries inside that slice, and the segmenter cuts bounded
//! ranges into `(heading, body)` blocks.

pub mod heading;
pub mod locator;
pub mod segmenter;
pub mod stream;

pub use heading::{FontFaceHeadingDetector, HeadingDetector};
pub use locator::{find_part, find_section};
pub use segmenter::{
    collect_sections, elements_between, elements_between_parts, segment_into_blocks, Block,
};
pub use stream::{flatten, ContentNode, Flatten, NodeKind};
