//! Character formatting shared by insertion, styling and range formatting.

use crate::common::error::{Error, Result};
use crate::common::xml::XmlElement;
use serde::{Deserialize, Serialize};

/// Child order of `w:rPr` (CT_RPr).
pub(crate) const RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr",
    "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish",
    "oMath",
];

/// Child order of `w:pPr` (CT_PPr).
pub(crate) const PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap", "jc",
    "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId", "cnfStyle", "rPr",
    "sectPr", "pPrChange",
];

/// Local names allowed before `local` in a schema sequence.
pub(crate) fn preceding<'a>(order: &'a [&'a str], local: &str) -> &'a [&'a str] {
    match order.iter().position(|name| *name == local) {
        Some(pos) => &order[..pos],
        None => order,
    }
}

/// Replace or insert `child` into `parent` following a schema sequence.
pub(crate) fn set_ordered(parent: &mut XmlElement, child: XmlElement, order: &[&str]) {
    let local = child.local_name().to_string();
    parent.replace_or_insert(child, preceding(order, &local));
}

/// Optional character formatting applied with set-if-present semantics.
///
/// Fields left `None` are not touched; a present field overwrites whatever
/// the run carried before.
///
/// # Examples
///
/// ```
/// use docsmith::ooxml::docx::RunFormat;
///
/// let format = RunFormat { bold: Some(true), font_size: Some(14.0), ..Default::default() };
/// assert!(format.validate().is_ok());
/// assert!(!format.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    /// Six hex digits, with or without a leading `#`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    /// Size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
}

impl RunFormat {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.color.is_none()
            && self.font_name.is_none()
            && self.font_size.is_none()
    }

    /// Check the color and size values.
    pub fn validate(&self) -> Result<()> {
        if let Some(color) = &self.color {
            normalize_color(color)?;
        }
        if let Some(size) = self.font_size {
            if !(size.is_finite() && (1.0..=1638.0).contains(&size)) {
                return Err(Error::Validation(format!(
                    "font size {} is outside 1..=1638 points",
                    size
                )));
            }
        }
        Ok(())
    }

    /// Write the present fields into a `w:rPr` element.
    pub fn apply(&self, rpr: &mut XmlElement) -> Result<()> {
        self.validate()?;

        if let Some(font) = &self.font_name {
            let fonts = XmlElement::new("w:rFonts")
                .with_attr("w:ascii", font.as_str())
                .with_attr("w:hAnsi", font.as_str())
                .with_attr("w:cs", font.as_str())
                .with_attr("w:eastAsia", font.as_str());
            set_ordered(rpr, fonts, RPR_ORDER);
        }
        if let Some(bold) = self.bold {
            set_ordered(rpr, toggle("w:b", bold), RPR_ORDER);
        }
        if let Some(italic) = self.italic {
            set_ordered(rpr, toggle("w:i", italic), RPR_ORDER);
        }
        if let Some(color) = &self.color {
            let color = XmlElement::new("w:color").with_attr("w:val", normalize_color(color)?);
            set_ordered(rpr, color, RPR_ORDER);
        }
        if let Some(size) = self.font_size {
            let half_points = (size * 2.0).round() as u32;
            set_ordered(
                rpr,
                XmlElement::new("w:sz").with_attr("w:val", half_points.to_string()),
                RPR_ORDER,
            );
            set_ordered(
                rpr,
                XmlElement::new("w:szCs").with_attr("w:val", half_points.to_string()),
                RPR_ORDER,
            );
        }
        if let Some(underline) = self.underline {
            let val = if underline { "single" } else { "none" };
            set_ordered(rpr, XmlElement::new("w:u").with_attr("w:val", val), RPR_ORDER);
        }
        Ok(())
    }

    /// Apply to the `w:rPr` of a run, creating it when needed.
    pub fn apply_to_run(&self, run: &mut XmlElement) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let rpr = run.child_or_insert("w:rPr", &[]);
        self.apply(rpr)
    }

    /// Read the formatting carried directly by a `w:rPr` element.
    pub fn from_rpr(rpr: &XmlElement) -> Self {
        let flag = |local: &str| rpr.child(local).map(toggle_value);
        Self {
            bold: flag("b"),
            italic: flag("i"),
            underline: rpr
                .child("u")
                .map(|u| !matches!(u.attr("val"), Some("none"))),
            color: rpr
                .child("color")
                .and_then(|c| c.attr("val"))
                .map(str::to_string),
            font_name: rpr
                .child("rFonts")
                .and_then(|f| f.attr("ascii").or_else(|| f.attr("hAnsi")))
                .map(str::to_string),
            font_size: rpr
                .child("sz")
                .and_then(|s| s.attr("val"))
                .and_then(|v| atoi_simd::parse::<u32>(v.as_bytes()).ok())
                .map(|half| half as f32 / 2.0),
        }
    }
}

fn toggle(name: &str, on: bool) -> XmlElement {
    let el = XmlElement::new(name);
    if on { el } else { el.with_attr("w:val", "0") }
}

/// `w:b` and friends are on unless `w:val` is a false value.
fn toggle_value(el: &XmlElement) -> bool {
    !matches!(el.attr("val"), Some("0" | "false" | "off"))
}

/// Uppercase six-digit hex without `#`.
pub fn normalize_color(color: &str) -> Result<String> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Validation(format!(
            "color '{}' is not a six-digit hex value",
            color
        )));
    }
    Ok(hex.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_schema_order() {
        let mut rpr = XmlElement::new("w:rPr").with_child(
            XmlElement::new("w:sz").with_attr("w:val", "20"),
        );
        let format = RunFormat {
            bold: Some(true),
            underline: Some(true),
            color: Some("#ff0000".into()),
            font_size: Some(12.0),
            font_name: Some("Arial".into()),
            ..Default::default()
        };
        format.apply(&mut rpr).unwrap();

        let names: Vec<_> = rpr.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["rFonts", "b", "color", "sz", "szCs", "u"]);
        assert_eq!(rpr.child("sz").unwrap().attr("val"), Some("24"));
        assert_eq!(rpr.child("color").unwrap().attr("val"), Some("FF0000"));
    }

    #[test]
    fn test_absent_fields_untouched() {
        let mut rpr = XmlElement::new("w:rPr").with_child(XmlElement::new("w:i"));
        RunFormat {
            bold: Some(false),
            ..Default::default()
        }
        .apply(&mut rpr)
        .unwrap();

        let read = RunFormat::from_rpr(&rpr);
        assert_eq!(read.italic, Some(true));
        assert_eq!(read.bold, Some(false));
        assert_eq!(read.font_size, None);
    }

    #[test]
    fn test_invalid_values() {
        let bad_color = RunFormat {
            color: Some("red".into()),
            ..Default::default()
        };
        assert!(matches!(bad_color.validate(), Err(Error::Validation(_))));

        let bad_size = RunFormat {
            font_size: Some(0.0),
            ..Default::default()
        };
        assert!(bad_size.validate().is_err());
    }
}
