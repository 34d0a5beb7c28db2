use crate::dom::Element;

/// Decides whether a node is a section heading, and what its title is.
///
/// The rulebook marks headings only through incidental styling, so callers
/// never inspect attributes themselves; they ask a detector.
pub trait HeadingDetector {
    /// Heading title when `element` carries the heading sentinel.
    fn heading_text(&self, element: &Element) -> Option<String>;

    fn is_heading(&self, element: &Element) -> bool {
        self.heading_text(element).is_some()
    }
}

/// Heading sentinel: a `<p>` containing a `<font face="...">` with the
/// configured face. The title is the whitespace-collapsed font text.
#[derive(Debug, Clone)]
pub struct FontFaceHeadingDetector {
    face: String,
}

impl FontFaceHeadingDetector {
    pub fn new(face: impl Into<String>) -> Self {
        Self { face: face.into() }
    }

    pub fn face(&self) -> &str {
        &self.face
    }
}

impl Default for FontFaceHeadingDetector {
    fn default() -> Self {
        Self::new("SoutaneBlack")
    }
}

impl HeadingDetector for FontFaceHeadingDetector {
    fn heading_text(&self, element: &Element) -> Option<String> {
        if !element.is("p") {
            return None;
        }
        let face = self.face.as_str();
        element
            .find_descendant(|el| el.is("font") && el.attr("face") == Some(face))
            .map(|font| font.text())
    }
}

/// Part titles are recognised by text alone: `PART ...` in any case.
pub fn is_part_title(element: &Element, collapsed_text: &str) -> bool {
    element.is("p") && collapsed_text.to_uppercase().starts_with("PART")
}
